//! # Boolean Operations (CSG)
//!
//! Constructive Solid Geometry operations on [`EditableMesh`] using BSP trees.
//!
//! ## Algorithm
//!
//! Based on the csg.js algorithm by Evan Wallace:
//! - Union: A.clipTo(B); B.clipTo(A); B.invert(); B.clipTo(A); B.invert(); A.build(B)
//! - Subtract: A.invert(); A.clipTo(B); B.clipTo(A); B.invert(); B.clipTo(A); B.invert(); A.build(B); A.invert()
//! - Intersect: A.invert(); B.clipTo(A); B.invert(); A.clipTo(B); B.clipTo(A); A.build(B); A.invert()
//!
//! ## Output
//!
//! Surviving polygons are snapped together and T-junctions along split edges
//! are stitched, so the result is closed when both inputs were. Each polygon
//! is then ear-clipped, triangles below the sliver area are discarded, and
//! the result is re-welded into a fresh mesh. Each polygon becomes one face
//! that keeps its source face's submesh, smoothing group, texture group and
//! UV settings. UVs and colors survive when an input carried them.
//!
//! ## Preconditions
//!
//! Inputs must be closed. With [`CsgOptions::require_closed`] unset this is
//! the caller's responsibility and open inputs give an ill-defined result.
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec3;
//! use polymesh::ops::boolean::{subtract, CsgOptions};
//! use polymesh::ops::measure::signed_volume;
//! use polymesh::primitives::Shape;
//!
//! let a = Shape::cube(2.0).generate().unwrap();
//! let mut b = Shape::cube(2.0).generate().unwrap();
//! b.translate(DVec3::new(1.0, 0.0, 0.0));
//!
//! let (result, _) = subtract(&a, &b, &CsgOptions::default()).unwrap();
//! assert!((signed_volume(&result) - 4.0).abs() < 1e-6);
//! ```

mod bsp;
mod plane;
mod polygon;
mod vertex;


use config::constants::{KernelConfig, AREA_EPSILON, CSG_EPSILON};
use glam::DVec3;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::{MeshError, MeshResult};
use crate::mesh::{self, triangle_cross, EditableMesh};
use crate::topology::WingedEdgeGraph;
use crate::triangulate::{fan_triangulate, triangulate};
use crate::weld::build_shared_vertices;
use bsp::BspNode;
use polygon::{Polygon, SourceFace};
use vertex::Vertex;

// =============================================================================
// OPTIONS
// =============================================================================

/// Boolean operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    /// Everything inside either input.
    Union,
    /// Inside the first input and outside the second.
    Subtract,
    /// Inside both inputs.
    Intersect,
}

/// Boolean operation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CsgOptions {
    /// Reject inputs with boundary or non-manifold edges.
    pub require_closed: bool,
    /// BSP plane thickness.
    pub epsilon: f64,
    /// Output triangles with a smaller area are discarded.
    pub sliver_area: f64,
}

impl Default for CsgOptions {
    fn default() -> Self {
        Self {
            require_closed: false,
            epsilon: CSG_EPSILON,
            sliver_area: AREA_EPSILON,
        }
    }
}

impl From<&KernelConfig> for CsgOptions {
    fn from(config: &KernelConfig) -> Self {
        Self {
            require_closed: false,
            epsilon: config.csg_epsilon,
            sliver_area: config.area_epsilon,
        }
    }
}

/// Non-fatal statistics of a boolean operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CsgReport {
    /// Polygons surviving the BSP combination.
    pub polygon_count: usize,
    /// Triangles dropped for having less than the sliver area.
    pub discarded_slivers: usize,
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Compute union of two meshes.
pub fn union(
    a: &EditableMesh,
    b: &EditableMesh,
    options: &CsgOptions,
) -> MeshResult<(EditableMesh, CsgReport)> {
    boolean(BooleanOp::Union, a, b, options)
}

/// Compute difference of two meshes (A - B).
pub fn subtract(
    a: &EditableMesh,
    b: &EditableMesh,
    options: &CsgOptions,
) -> MeshResult<(EditableMesh, CsgReport)> {
    boolean(BooleanOp::Subtract, a, b, options)
}

/// Compute intersection of two meshes.
pub fn intersect(
    a: &EditableMesh,
    b: &EditableMesh,
    options: &CsgOptions,
) -> MeshResult<(EditableMesh, CsgReport)> {
    boolean(BooleanOp::Intersect, a, b, options)
}

/// Combines `a` and `b` with `op`.
///
/// An empty operand short-circuits: union and subtract return a copy of
/// the other (or first) mesh, intersect returns an empty mesh.
///
/// # Errors
///
/// `InvalidCsgInput` when `require_closed` is set and an input is open.
pub fn boolean(
    op: BooleanOp,
    a: &EditableMesh,
    b: &EditableMesh,
    options: &CsgOptions,
) -> MeshResult<(EditableMesh, CsgReport)> {
    if options.require_closed {
        check_closed(a, "first")?;
        check_closed(b, "second")?;
    }

    let polys_a = mesh_to_polygons(a);
    let polys_b = mesh_to_polygons(b);

    match op {
        BooleanOp::Intersect if polys_a.is_empty() || polys_b.is_empty() => {
            return Ok((EditableMesh::new(), CsgReport::default()));
        }
        BooleanOp::Union if polys_a.is_empty() => return Ok((b.clone(), CsgReport::default())),
        BooleanOp::Union | BooleanOp::Subtract if polys_b.is_empty() => {
            return Ok((a.clone(), CsgReport::default()));
        }
        BooleanOp::Subtract if polys_a.is_empty() => {
            return Ok((EditableMesh::new(), CsgReport::default()));
        }
        _ => {}
    }

    let eps = options.epsilon;
    let mut bsp_a = BspNode::new(polys_a, eps);
    let mut bsp_b = BspNode::new(polys_b, eps);

    match op {
        BooleanOp::Union => {
            bsp_a.clip_to(&bsp_b, eps);
            bsp_b.clip_to(&bsp_a, eps);
            bsp_b.invert();
            bsp_b.clip_to(&bsp_a, eps);
            bsp_b.invert();
            bsp_a.build(bsp_b.all_polygons(), eps);
        }
        BooleanOp::Subtract => {
            bsp_a.invert();
            bsp_a.clip_to(&bsp_b, eps);
            bsp_b.clip_to(&bsp_a, eps);
            bsp_b.invert();
            bsp_b.clip_to(&bsp_a, eps);
            bsp_b.invert();
            bsp_a.build(bsp_b.all_polygons(), eps);
            bsp_a.invert();
        }
        BooleanOp::Intersect => {
            bsp_a.invert();
            bsp_b.clip_to(&bsp_a, eps);
            bsp_b.invert();
            bsp_a.clip_to(&bsp_b, eps);
            bsp_b.clip_to(&bsp_a, eps);
            bsp_a.build(bsp_b.all_polygons(), eps);
            bsp_a.invert();
        }
    }

    let polygons = stitch_t_junctions(bsp_a.all_polygons(), eps)?;
    let (mesh, discarded_slivers) = polygons_to_mesh(&polygons, options.sliver_area)?;
    let report = CsgReport {
        polygon_count: polygons.len(),
        discarded_slivers,
    };
    debug!(
        ?op,
        polygons = report.polygon_count,
        slivers = report.discarded_slivers,
        faces = mesh.face_count(),
        "boolean operation complete"
    );
    Ok((mesh, report))
}

/// Runs independent boolean operations in parallel.
pub fn batch(
    jobs: &[(BooleanOp, &EditableMesh, &EditableMesh)],
    options: &CsgOptions,
) -> Vec<MeshResult<(EditableMesh, CsgReport)>> {
    jobs.par_iter()
        .map(|&(op, a, b)| boolean(op, a, b, options))
        .collect()
}

// =============================================================================
// CONVERSION HELPERS
// =============================================================================

fn check_closed(mesh: &EditableMesh, which: &str) -> MeshResult<()> {
    let graph = WingedEdgeGraph::from_mesh(mesh)?;
    if graph.is_closed() {
        return Ok(());
    }
    Err(MeshError::invalid_csg_input(format!(
        "{which} mesh is not closed: {} boundary edges, {} non-manifold edges",
        graph.border_edges().len(),
        graph.non_manifold_edges().len()
    )))
}

/// Convert every non-degenerate triangle of a mesh to a polygon.
fn mesh_to_polygons(mesh: &EditableMesh) -> Vec<Polygon> {
    let mut polygons = Vec::new();

    for face in mesh.faces() {
        let source = SourceFace::from(face);
        for triangle in face.triangles() {
            let vertices: Vec<Vertex> = triangle
                .iter()
                .filter_map(|&i| mesh.vertex(i))
                .map(Vertex::from)
                .collect();
            match Polygon::new(vertices, source) {
                Some(polygon) => polygons.push(polygon),
                None => trace!(?triangle, "skipping degenerate triangle"),
            }
        }
    }

    polygons
}

/// Snaps coincident vertices together and inserts every vertex that lies
/// inside another polygon's edge into that edge.
///
/// BSP splitting leaves T-junctions wherever one side of an edge was cut and
/// the other was not. After stitching, both sides of every edge carry the
/// same split points, so the welded output is closed.
fn stitch_t_junctions(polygons: Vec<Polygon>, epsilon: f64) -> MeshResult<Vec<Polygon>> {
    let positions: Vec<DVec3> = polygons
        .iter()
        .flat_map(|p| p.vertices.iter().map(|v| v.position))
        .collect();
    let report = build_shared_vertices(&positions, epsilon)?;

    let mut snapped = positions.clone();
    let mut points = Vec::with_capacity(report.groups.len());
    for group in &report.groups {
        let Some(first) = group.first() else {
            continue;
        };
        let anchor = positions[first];
        for &i in group.indices() {
            snapped[i] = anchor;
        }
        if anchor.is_finite() {
            points.push(anchor);
        }
    }

    let mut offsets = Vec::with_capacity(polygons.len());
    let mut next = 0;
    for polygon in &polygons {
        offsets.push(next);
        next += polygon.vertices.len();
    }

    let stitched: Vec<Polygon> = polygons
        .par_iter()
        .zip(offsets.par_iter())
        .filter_map(|(polygon, &offset)| {
            let corners: Vec<Vertex> = polygon
                .vertices
                .iter()
                .enumerate()
                .map(|(k, v)| Vertex {
                    position: snapped[offset + k],
                    ..*v
                })
                .collect();

            let n = corners.len();
            let mut ring = Vec::with_capacity(n);
            for k in 0..n {
                let (a, b) = (corners[k], corners[(k + 1) % n]);
                ring.push(a);
                for (t, position) in points_inside_edge(&points, a.position, b.position, epsilon) {
                    ring.push(Vertex {
                        position,
                        ..a.interpolate(&b, t)
                    });
                }
            }

            ring.dedup_by(|x, y| x.position == y.position);
            while ring.len() > 1
                && ring.first().map(|v| v.position) == ring.last().map(|v| v.position)
            {
                ring.pop();
            }
            (ring.len() >= 3).then(|| polygon.with_vertices(ring))
        })
        .collect();

    trace!(
        before = next,
        after = stitched.iter().map(|p| p.vertices.len()).sum::<usize>(),
        "stitched T-junctions"
    );
    Ok(stitched)
}

/// Points strictly inside the segment `a`-`b` within `epsilon` of it, with
/// their parameter along the segment, ordered from `a` to `b`.
fn points_inside_edge(points: &[DVec3], a: DVec3, b: DVec3, epsilon: f64) -> Vec<(f64, DVec3)> {
    let edge = b - a;
    let length = edge.length();
    if length <= 2.0 * epsilon {
        return Vec::new();
    }
    let direction = edge / length;

    let mut hits: Vec<(f64, DVec3)> = points
        .iter()
        .filter_map(|&p| {
            let along = (p - a).dot(direction);
            if along <= epsilon || along >= length - epsilon {
                return None;
            }
            let off_line = (p - (a + direction * along)).length();
            (off_line <= epsilon).then_some((along / length, p))
        })
        .collect();
    hits.sort_by(|x, y| x.0.total_cmp(&y.0));
    hits
}

/// Convert polygons back to a welded mesh, one face per polygon.
///
/// Only vertices referenced by a kept triangle are emitted.
fn polygons_to_mesh(polygons: &[Polygon], sliver_area: f64) -> MeshResult<(EditableMesh, usize)> {
    let mut vertices: Vec<mesh::Vertex> = Vec::new();
    let mut faces = Vec::with_capacity(polygons.len());
    let mut discarded = 0;

    for polygon in polygons {
        let points: Vec<DVec3> = polygon.vertices.iter().map(|v| v.position).collect();
        let triangles = triangulate(&points, true).unwrap_or_else(|error| {
            trace!(?error, "falling back to fan triangulation");
            fan_triangulate(points.len())
        });

        let mut slots: Vec<Option<usize>> = vec![None; points.len()];
        let mut indices = Vec::with_capacity(triangles.len());
        for t in triangles.chunks_exact(3) {
            let area = triangle_cross(points[t[0]], points[t[1]], points[t[2]]).length() * 0.5;
            if area < sliver_area {
                discarded += 1;
                continue;
            }
            for &i in t {
                let slot = *slots[i].get_or_insert_with(|| {
                    vertices.push(mesh::Vertex::from(polygon.vertices[i]));
                    vertices.len() - 1
                });
                indices.push(slot);
            }
        }
        if indices.is_empty() {
            continue;
        }

        faces.push(polygon.source.to_face(indices));
    }

    if discarded > 0 {
        debug!(discarded, "discarded sliver triangles");
    }
    let mesh = EditableMesh::from_vertices(&vertices, faces)?;
    Ok((mesh, discarded))
}
