//! # Plane for BSP Operations
//!
//! Plane representation with point classification and polygon splitting.

use glam::DVec3;

use super::polygon::Polygon;
use super::vertex::Vertex;

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classification of a point relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Point is in front of plane (positive side).
    Front,
    /// Point is behind plane (negative side).
    Back,
    /// Point is on the plane.
    Coplanar,
    /// Polygon spans the plane (has vertices on both sides).
    Spanning,
}

impl Classification {
    fn combine(self, other: Classification) -> Classification {
        match (self, other) {
            (a, b) if a == b => a,
            (Classification::Coplanar, x) | (x, Classification::Coplanar) => x,
            _ => Classification::Spanning,
        }
    }
}

/// Destination lists for [`Plane::split_polygon`].
#[derive(Debug, Default)]
pub struct Partition {
    /// Coplanar polygons facing the same way as the plane.
    pub coplanar_front: Vec<Polygon>,
    /// Coplanar polygons facing the opposite way.
    pub coplanar_back: Vec<Polygon>,
    /// Polygons (or pieces) in front of the plane.
    pub front: Vec<Polygon>,
    /// Polygons (or pieces) behind the plane.
    pub back: Vec<Polygon>,
}

// =============================================================================
// PLANE
// =============================================================================

/// A plane in 3D space defined by unit normal and distance from origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (unit length).
    pub normal: DVec3,
    /// Distance from origin along normal.
    pub w: f64,
}

impl Plane {
    /// Create plane from normal and distance.
    pub fn new(normal: DVec3, w: f64) -> Self {
        Self { normal, w }
    }

    /// Create plane from three points, counter-clockwise when viewed from
    /// the front. Returns `None` for collinear points.
    pub fn from_points(a: DVec3, b: DVec3, c: DVec3) -> Option<Self> {
        let normal = (b - a).cross(c - a).try_normalize()?;
        Some(Self::new(normal, normal.dot(a)))
    }

    /// Reverse the plane in place.
    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Signed distance from point to plane.
    ///
    /// Positive = front, negative = back, zero = on plane.
    #[inline]
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.w
    }

    /// Classify a point against a plane of thickness `2 * epsilon`.
    pub fn classify_point(&self, point: DVec3, epsilon: f64) -> Classification {
        let dist = self.signed_distance(point);
        if dist > epsilon {
            Classification::Front
        } else if dist < -epsilon {
            Classification::Back
        } else {
            Classification::Coplanar
        }
    }

    /// Split `polygon` by this plane into `out`.
    ///
    /// Coplanar polygons go to `coplanar_front` or `coplanar_back` by facing.
    /// Spanning polygons are cut along the plane; both pieces keep the
    /// original polygon's plane and metadata.
    pub fn split_polygon(&self, polygon: Polygon, epsilon: f64, out: &mut Partition) {
        let types: Vec<Classification> = polygon
            .vertices
            .iter()
            .map(|v| self.classify_point(v.position, epsilon))
            .collect();
        let kind = types
            .iter()
            .fold(Classification::Coplanar, |acc, &t| acc.combine(t));

        match kind {
            Classification::Coplanar => {
                if self.normal.dot(polygon.plane.normal) > 0.0 {
                    out.coplanar_front.push(polygon);
                } else {
                    out.coplanar_back.push(polygon);
                }
            }
            Classification::Front => out.front.push(polygon),
            Classification::Back => out.back.push(polygon),
            Classification::Spanning => {
                let n = polygon.vertices.len();
                let mut front: Vec<Vertex> = Vec::with_capacity(n + 1);
                let mut back: Vec<Vertex> = Vec::with_capacity(n + 1);

                for i in 0..n {
                    let j = (i + 1) % n;
                    let (ti, tj) = (types[i], types[j]);
                    let vi = polygon.vertices[i];
                    let vj = polygon.vertices[j];

                    if ti != Classification::Back {
                        front.push(vi);
                    }
                    if ti != Classification::Front {
                        back.push(vi);
                    }
                    if ti.combine(tj) == Classification::Spanning {
                        let t = (self.w - self.normal.dot(vi.position))
                            / self.normal.dot(vj.position - vi.position);
                        let v = vi.interpolate(&vj, t);
                        front.push(v);
                        back.push(v);
                    }
                }

                if front.len() >= 3 {
                    out.front.push(polygon.with_vertices(front));
                }
                if back.len() >= 3 {
                    out.back.push(polygon.with_vertices(back));
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
