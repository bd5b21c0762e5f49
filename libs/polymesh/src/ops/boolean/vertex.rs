//! # Vertex for BSP Operations
//!
//! Position plus the attributes that survive a boolean operation. Splitting
//! interpolates every attribute; flipping a polygon flips its vertex normals.

use glam::{DVec2, DVec3, Vec4};

use crate::mesh;

// =============================================================================
// VERTEX
// =============================================================================

/// Vertex carried through BSP clipping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position.
    pub position: DVec3,
    /// Unit normal, when the source mesh had normals.
    pub normal: Option<DVec3>,
    /// Primary texture coordinate.
    pub uv: Option<DVec2>,
    /// Vertex color.
    pub color: Option<Vec4>,
}

impl Vertex {
    /// Create a vertex with only a position.
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            normal: None,
            uv: None,
            color: None,
        }
    }

    /// Linear interpolation between two vertices.
    ///
    /// ## Parameters
    ///
    /// - `other`: Target vertex
    /// - `t`: Interpolation factor (0.0 = self, 1.0 = other)
    pub fn interpolate(&self, other: &Vertex, t: f64) -> Vertex {
        Vertex::from(mesh::Vertex::from(*self).lerp(&mesh::Vertex::from(*other), t))
    }

    /// Reverses the normal.
    pub fn flip(&mut self) {
        if let Some(n) = self.normal.as_mut() {
            *n = -*n;
        }
    }
}

impl From<mesh::Vertex> for Vertex {
    fn from(v: mesh::Vertex) -> Self {
        Self {
            normal: v.normal,
            uv: v.uv0,
            color: v.color,
            ..Self::new(v.position)
        }
    }
}

impl From<Vertex> for mesh::Vertex {
    fn from(v: Vertex) -> Self {
        mesh::Vertex {
            position: v.position,
            normal: v.normal,
            uv0: v.uv,
            color: v.color,
            ..mesh::Vertex::default()
        }
    }
}
