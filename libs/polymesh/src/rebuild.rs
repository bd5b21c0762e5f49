//! # Face Rebuilding
//!
//! Replaces one face with one or more new faces built from new vertex data,
//! extending the shared-vertex and shared-UV tables to match.
//!
//! ## Transactions
//!
//! Every operation computes all of its output (triangulation, group
//! assignments, orientation) before touching the mesh. If any sub-polygon
//! fails to triangulate the mesh is returned unchanged and the error is
//! propagated, so the shared-vertex partition holds after failures too.
//!
//! ## Metadata
//!
//! Derived faces inherit the origin face's submesh, smoothing group, texture
//! group, manual-UV flag and AutoUV settings. Their winding is flipped as a
//! whole when it disagrees with the origin face's normal.

use config::constants::WELD_EPSILON;
use glam::DVec3;
use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult, TriangulationError};
use crate::mesh::{triangle_cross, EditableMesh, Face, Vertex};
use crate::triangulate::{fan_triangulate, triangulate, triangulate_with_interior};
use crate::weld::SharedVertex;

// =============================================================================
// REBUILD DATA
// =============================================================================

/// A new face with its own vertices, ready to be appended to a mesh.
///
/// `face` indexes into `vertices`. `shared_indices[k]` names the existing
/// shared group vertex `k` joins; `None` (or a missing table) gives the
/// vertex a new singleton group. `shared_uv_indices` works the same way for
/// UV groups.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRebuildData {
    /// Face with indices local to `vertices`.
    pub face: Face,
    /// Vertices to append.
    pub vertices: Vec<Vertex>,
    /// Optional existing shared group per vertex.
    pub shared_indices: Option<Vec<Option<usize>>>,
    /// Optional existing shared UV group per vertex.
    pub shared_uv_indices: Option<Vec<Option<usize>>>,
}

impl FaceRebuildData {
    /// Creates rebuild data whose vertices all get new groups.
    pub fn new(face: Face, vertices: Vec<Vertex>) -> Self {
        Self {
            face,
            vertices,
            shared_indices: None,
            shared_uv_indices: None,
        }
    }

    fn check(&self, shared_count: usize, uv_count: usize) -> MeshResult<()> {
        let n = self.vertices.len();
        let len = self.face.indices().len();
        if len == 0 || len % 3 != 0 {
            return Err(MeshError::invalid_parameter(format!(
                "rebuilt face has {len} indices"
            )));
        }
        for &i in self.face.indices() {
            MeshError::check_index(i, n)?;
        }
        for (table, groups) in [
            (&self.shared_indices, shared_count),
            (&self.shared_uv_indices, uv_count),
        ] {
            if let Some(table) = table {
                if table.len() != n {
                    return Err(MeshError::invalid_parameter(format!(
                        "shared table has {} entries for {n} vertices",
                        table.len()
                    )));
                }
                for &g in table.iter().flatten() {
                    MeshError::check_index(g, groups)?;
                }
            }
        }
        Ok(())
    }

    /// Appends every entry to `mesh`. Returns the new face indices.
    ///
    /// All entries are checked first; on error the mesh is untouched.
    pub fn apply(mesh: &mut EditableMesh, data: Vec<FaceRebuildData>) -> MeshResult<Vec<usize>> {
        let shared_count = mesh.shared_vertices().len();
        let uv_count = mesh.shared_uvs().len();
        for entry in &data {
            entry.check(shared_count, uv_count)?;
        }

        let mut faces = Vec::with_capacity(data.len());
        for entry in data {
            let offset = mesh.push_vertices(&entry.vertices);
            assign_groups(mesh.shared_vertices_mut(), &entry.shared_indices, offset, entry.vertices.len());
            assign_groups(mesh.shared_uvs_mut(), &entry.shared_uv_indices, offset, entry.vertices.len());
            let mut face = entry.face;
            face.offset_indices(offset);
            faces.push(mesh.push_face(face));
        }
        Ok(faces)
    }
}

fn assign_groups(
    groups: &mut Vec<SharedVertex>,
    table: &Option<Vec<Option<usize>>>,
    offset: usize,
    count: usize,
) {
    for k in 0..count {
        let target = table.as_ref().and_then(|t| t[k]);
        match target {
            Some(g) => groups[g].insert(offset + k),
            None => groups.push(SharedVertex::new(vec![offset + k])),
        }
    }
}

// =============================================================================
// REBUILD
// =============================================================================

/// A triangulated sub-polygon awaiting commit.
struct Piece {
    vertices: Vec<Vertex>,
    triangles: Vec<usize>,
}

/// Replaces `face` with one face per polygon in `polygons`.
///
/// Each polygon is an ordered vertex loop. Loops that cannot be ear-clipped
/// because they self-intersect fall back to a fan; any other triangulation
/// failure aborts the whole rebuild.
///
/// Returns the indices of the new faces (valid after the original face has
/// been removed).
pub fn rebuild_face(
    mesh: &mut EditableMesh,
    face: usize,
    polygons: &[Vec<Vertex>],
) -> MeshResult<Vec<usize>> {
    MeshError::check_index(face, mesh.face_count())?;

    let mut pieces = Vec::with_capacity(polygons.len());
    for polygon in polygons {
        let points: Vec<DVec3> = polygon.iter().map(|v| v.position).collect();
        let triangles = match triangulate(&points, true) {
            Ok(triangles) => triangles,
            Err(TriangulationError::NoEar { remaining }) => {
                warn!(face, remaining, "ear clipping failed, using fan triangulation");
                fan_triangulate(points.len())
            }
            Err(error) => {
                warn!(face, %error, "face rebuild aborted");
                return Err(error.into());
            }
        };
        pieces.push(Piece {
            vertices: polygon.clone(),
            triangles,
        });
    }

    commit(mesh, face, pieces)
}

fn commit(mesh: &mut EditableMesh, face: usize, pieces: Vec<Piece>) -> MeshResult<Vec<usize>> {
    let origin = mesh.faces()[face].clone();
    let old_normal = mesh.face_normal(face);
    let lookup = mesh.shared_lookup()?;
    let anchors: Vec<(DVec3, usize)> = origin
        .distinct_indices()
        .into_iter()
        .filter_map(|i| Some((mesh.positions()[i], lookup.get(i)?)))
        .collect();

    let data: Vec<FaceRebuildData> = pieces
        .into_iter()
        .map(|piece| {
            let mut new_face = Face::with_metadata_from(piece.triangles, &origin);
            let new_normal: DVec3 = new_face
                .triangles()
                .map(|[a, b, c]| {
                    triangle_cross(
                        piece.vertices[a].position,
                        piece.vertices[b].position,
                        piece.vertices[c].position,
                    )
                })
                .sum();
            if let Some(old) = old_normal {
                if old.dot(new_normal) < 0.0 {
                    new_face.reverse();
                }
            }
            let shared = piece
                .vertices
                .iter()
                .map(|v| {
                    anchors
                        .iter()
                        .find(|(p, _)| p.distance(v.position) <= WELD_EPSILON)
                        .map(|&(_, g)| g)
                })
                .collect();
            FaceRebuildData {
                face: new_face,
                vertices: piece.vertices,
                shared_indices: Some(shared),
                shared_uv_indices: None,
            }
        })
        .collect();

    let count = data.len();
    FaceRebuildData::apply(mesh, data)?;
    mesh.delete_faces(&[face])?;

    let first = mesh.face_count() - count;
    debug!(face, new_faces = count, "rebuilt face");
    Ok((first..first + count).collect())
}

fn perimeter_vertices(mesh: &EditableMesh, face: usize) -> MeshResult<Vec<Vertex>> {
    MeshError::check_index(face, mesh.face_count())?;
    let ring = mesh.faces()[face]
        .perimeter_loop()
        .ok_or_else(|| MeshError::invalid_face(face, "face has no single perimeter loop"))?;
    Ok(ring.into_iter().filter_map(|i| mesh.vertex(i)).collect())
}

// =============================================================================
// EDITING OPERATIONS
// =============================================================================

/// Re-triangulates a face from its own perimeter.
pub fn retriangulate_face(mesh: &mut EditableMesh, face: usize) -> MeshResult<usize> {
    let ring = perimeter_vertices(mesh, face)?;
    let faces = rebuild_face(mesh, face, &[ring])?;
    faces
        .first()
        .copied()
        .ok_or_else(|| MeshError::invalid_face(face, "rebuild produced no face"))
}

/// Inserts each point into the face perimeter on its nearest edge.
///
/// Attributes of the new vertices are interpolated along that edge. Returns
/// the index of the rebuilt face.
pub fn append_vertices_to_face(
    mesh: &mut EditableMesh,
    face: usize,
    points: &[DVec3],
) -> MeshResult<usize> {
    let mut ring = perimeter_vertices(mesh, face)?;

    for &point in points {
        let n = ring.len();
        let (edge, t, _) = (0..n)
            .map(|i| {
                let (a, b) = (ring[i].position, ring[(i + 1) % n].position);
                let ab = b - a;
                let t = if ab.length_squared() > 0.0 {
                    ((point - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (i, t, point.distance_squared(a + ab * t))
            })
            .fold((0, 0.0, f64::INFINITY), |best, c| if c.2 < best.2 { c } else { best });

        let mut vertex = ring[edge].lerp(&ring[(edge + 1) % n], t);
        vertex.position = point;
        ring.insert(edge + 1, vertex);
    }

    let faces = rebuild_face(mesh, face, &[ring])?;
    faces
        .first()
        .copied()
        .ok_or_else(|| MeshError::invalid_face(face, "rebuild produced no face"))
}

/// Inserts a point inside a face, connecting it to the surrounding corners.
///
/// A point strictly inside a triangle splits it in three; a point on an
/// internal edge splits both neighbours in two. The new vertex takes the
/// averaged attributes of the perimeter. Returns the rebuilt face index.
pub fn insert_point_in_face(mesh: &mut EditableMesh, face: usize, point: DVec3) -> MeshResult<usize> {
    let ring = perimeter_vertices(mesh, face)?;
    let boundary: Vec<DVec3> = ring.iter().map(|v| v.position).collect();

    let triangles = triangulate_with_interior(&boundary, &[point]).map_err(|error| {
        warn!(face, %error, "point insertion aborted");
        MeshError::from(error)
    })?;

    let mut center = Vertex::average(&ring).unwrap_or_default();
    center.position = point;
    let mut vertices = ring;
    vertices.push(center);

    let faces = commit(mesh, face, vec![Piece { vertices, triangles }])?;
    faces
        .first()
        .copied()
        .ok_or_else(|| MeshError::invalid_face(face, "rebuild produced no face"))
}

/// Splits a face in two along the segment between perimeter vertices `a`
/// and `b`, which must not be neighbours on the perimeter.
pub fn split_face(mesh: &mut EditableMesh, face: usize, a: usize, b: usize) -> MeshResult<Vec<usize>> {
    MeshError::check_index(face, mesh.face_count())?;
    let ring = mesh.faces()[face]
        .perimeter_loop()
        .ok_or_else(|| MeshError::invalid_face(face, "face has no single perimeter loop"))?;
    let n = ring.len();
    let find = |v: usize| {
        ring.iter()
            .position(|&r| r == v)
            .ok_or_else(|| MeshError::invalid_parameter(format!("vertex {v} is not on face {face}")))
    };
    let (ia, ib) = (find(a)?, find(b)?);
    let (lo, hi) = (ia.min(ib), ia.max(ib));
    if hi - lo < 2 || (lo == 0 && hi == n - 1) {
        return Err(MeshError::invalid_parameter(
            "split vertices must not be adjacent",
        ));
    }

    let vertices: Vec<Vertex> = ring.iter().filter_map(|&i| mesh.vertex(i)).collect();
    let first: Vec<Vertex> = vertices[lo..=hi].to_vec();
    let second: Vec<Vertex> = vertices[hi..]
        .iter()
        .chain(&vertices[..=lo])
        .copied()
        .collect();

    rebuild_face(mesh, face, &[first, second])
}
