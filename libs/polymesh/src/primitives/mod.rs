//! # Primitives
//!
//! Mesh generation for the fixed set of parametric shapes.
//!
//! Every shape is centered at the origin, uses per-face vertices welded into
//! shared groups, and gets automatic UVs. Curved side faces share smoothing
//! group 1; flat faces are hard.

pub mod cube;
pub mod cylinder;
pub mod plane;

#[cfg(test)]
mod tests;

use config::constants::DEFAULT_SEGMENTS;
use glam::{DMat4, DVec3};

use crate::error::{MeshError, MeshResult};
use crate::mesh::{EditableMesh, Face, Vertex};
use crate::triangulate::fan_triangulate;
use crate::uv::refresh_uvs;

pub use cube::create_cube;
pub use cylinder::{create_cone, create_cylinder};
pub use plane::create_plane;

/// A parametric shape.
///
/// # Example
///
/// ```rust
/// use polymesh::primitives::Shape;
///
/// let mesh = Shape::Cylinder { radius: 1.0, height: 2.0, segments: 8 }
///     .generate()
///     .unwrap();
/// assert_eq!(mesh.face_count(), 8 + 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Box with the given edge lengths.
    Cube {
        /// Edge lengths along X, Y and Z.
        size: DVec3,
    },
    /// Single-sided grid in the XZ plane facing +Y.
    Plane {
        /// Extent along X.
        width: f64,
        /// Extent along Z.
        height: f64,
        /// Cells along X.
        width_segments: u32,
        /// Cells along Z.
        height_segments: u32,
    },
    /// Capped cylinder along Y.
    Cylinder {
        /// Radius.
        radius: f64,
        /// Extent along Y.
        height: f64,
        /// Sides around the axis.
        segments: u32,
    },
    /// Capped cone along Y with its apex at `+height / 2`.
    Cone {
        /// Base radius.
        radius: f64,
        /// Extent along Y.
        height: f64,
        /// Sides around the axis.
        segments: u32,
    },
}

impl Shape {
    /// A cube with equal edges.
    pub fn cube(edge: f64) -> Self {
        Shape::Cube {
            size: DVec3::splat(edge),
        }
    }

    /// A cylinder with the default number of segments.
    pub fn cylinder(radius: f64, height: f64) -> Self {
        Shape::Cylinder {
            radius,
            height,
            segments: DEFAULT_SEGMENTS,
        }
    }

    /// A cone with the default number of segments.
    pub fn cone(radius: f64, height: f64) -> Self {
        Shape::Cone {
            radius,
            height,
            segments: DEFAULT_SEGMENTS,
        }
    }

    /// Builds the shape's mesh.
    pub fn generate(&self) -> MeshResult<EditableMesh> {
        match *self {
            Shape::Cube { size } => create_cube(size),
            Shape::Plane {
                width,
                height,
                width_segments,
                height_segments,
            } => create_plane(width, height, width_segments, height_segments),
            Shape::Cylinder {
                radius,
                height,
                segments,
            } => create_cylinder(radius, height, segments),
            Shape::Cone {
                radius,
                height,
                segments,
            } => create_cone(radius, height, segments),
        }
    }
}

/// Checks that a dimension is finite and strictly positive.
pub(crate) fn require_positive(name: &str, value: f64) -> MeshResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MeshError::invalid_parameter(format!(
            "{name} must be positive: {value}"
        )))
    }
}

/// Accumulates convex polygons as faces with their own vertices.
#[derive(Debug, Default)]
pub(crate) struct ShapeBuilder {
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
}

impl ShapeBuilder {
    /// Adds a convex polygon as one fan-triangulated face.
    pub(crate) fn polygon(&mut self, points: &[DVec3], smoothing_group: i32) {
        let base = self.vertices.len();
        self.vertices.extend(points.iter().map(|&p| Vertex::new(p)));
        let indices = fan_triangulate(points.len())
            .into_iter()
            .map(|i| base + i)
            .collect();
        let mut face = Face::new(indices);
        face.smoothing_group = smoothing_group;
        self.faces.push(face);
    }

    /// Welds the vertices and projects UVs.
    pub(crate) fn finish(self) -> MeshResult<EditableMesh> {
        let mut mesh = EditableMesh::from_vertices(&self.vertices, self.faces)?;
        refresh_uvs(&mut mesh, &DMat4::IDENTITY)?;
        Ok(mesh)
    }
}
