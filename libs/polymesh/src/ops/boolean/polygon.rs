//! # Polygon for BSP Operations
//!
//! Convex polygon with its plane and the face attributes it came from.

use super::plane::Plane;
use super::vertex::Vertex;
use crate::mesh::{AutoUv, Face};

// =============================================================================
// SOURCE FACE
// =============================================================================

/// Face attributes inherited by every fragment of a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SourceFace {
    /// Submesh (material) index.
    pub submesh: usize,
    /// Smoothing group.
    pub smoothing_group: i32,
    /// Texture group.
    pub texture_group: i32,
    /// User-authored UVs.
    pub manual_uv: bool,
    /// Procedural UV settings.
    pub uv: AutoUv,
}

impl From<&Face> for SourceFace {
    fn from(face: &Face) -> Self {
        Self {
            submesh: face.submesh,
            smoothing_group: face.smoothing_group,
            texture_group: face.texture_group,
            manual_uv: face.manual_uv,
            uv: face.uv,
        }
    }
}

impl SourceFace {
    /// A face over `indices` carrying these attributes.
    pub fn to_face(&self, indices: Vec<usize>) -> Face {
        let mut face = Face::new(indices);
        face.submesh = self.submesh;
        face.smoothing_group = self.smoothing_group;
        face.texture_group = self.texture_group;
        face.manual_uv = self.manual_uv;
        face.uv = self.uv;
        face
    }
}

// =============================================================================
// POLYGON
// =============================================================================

/// A convex polygon with associated plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Vertices in counter-clockwise order.
    pub vertices: Vec<Vertex>,
    /// Plane containing this polygon.
    pub plane: Plane,
    /// Attributes of the face this polygon was cut from.
    pub source: SourceFace,
}

impl Polygon {
    /// Create polygon from vertices, taking its plane from the first three.
    ///
    /// Returns `None` if there are fewer than three vertices or the first
    /// three are collinear.
    pub fn new(vertices: Vec<Vertex>, source: SourceFace) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(
            vertices[0].position,
            vertices[1].position,
            vertices[2].position,
        )?;
        Some(Self {
            vertices,
            plane,
            source,
        })
    }

    /// A fragment of this polygon with the same plane and source face.
    pub fn with_vertices(&self, vertices: Vec<Vertex>) -> Self {
        Self {
            vertices,
            plane: self.plane,
            source: self.source,
        }
    }

    /// Flip the polygon (reverse winding order, vertex normals and plane).
    pub fn flip(&mut self) {
        self.vertices.reverse();
        for v in &mut self.vertices {
            v.flip();
        }
        self.plane.flip();
    }
}

// =============================================================================
// TESTS
// =============================================================================
