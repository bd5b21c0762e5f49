//! # Mesh Validation
//!
//! Filtering of degenerate primitives. Degenerate triangles are recovered
//! locally: they are dropped and the rest of the mesh is kept.

use tracing::debug;

use crate::error::MeshResult;
use crate::mesh::{triangle_cross, EditableMesh};

/// Removes triangles whose area is below `area_epsilon` or whose corners
/// collapse onto one shared vertex group.
///
/// Faces left without triangles are deleted along with their unused
/// vertices. Returns the number of triangles removed.
///
/// # Example
///
/// ```rust
/// use glam::DVec3;
/// use polymesh::mesh::{EditableMesh, Face};
/// use polymesh::ops::validation::remove_degenerate_triangles;
///
/// let positions = vec![DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::new(2.0, 0.0, 0.0)];
/// let faces = vec![Face::new(vec![0, 1, 2, 0, 1, 3])];
/// let mut mesh = EditableMesh::from_positions(positions, faces).unwrap();
/// assert_eq!(remove_degenerate_triangles(&mut mesh, 1e-9).unwrap(), 1);
/// ```
pub fn remove_degenerate_triangles(mesh: &mut EditableMesh, area_epsilon: f64) -> MeshResult<usize> {
    let lookup = mesh.shared_lookup()?;
    let positions = mesh.positions().to_vec();
    let mut removed = 0;
    let mut touched: Vec<usize> = Vec::new();
    let mut emptied = Vec::new();

    for (face_index, face) in mesh.faces_mut().iter_mut().enumerate() {
        let mut kept = Vec::with_capacity(face.indices().len());
        for [a, b, c] in face.triangles() {
            let (ga, gb, gc) = (lookup.get(a), lookup.get(b), lookup.get(c));
            let collapsed = ga == gb || gb == gc || gc == ga;
            let area = triangle_cross(positions[a], positions[b], positions[c]).length() * 0.5;
            if collapsed || area < area_epsilon {
                removed += 1;
                touched.extend_from_slice(&[a, b, c]);
            } else {
                kept.extend_from_slice(&[a, b, c]);
            }
        }
        if kept.is_empty() {
            emptied.push(face_index);
        }
        face.set_indices(kept);
    }

    if removed == 0 {
        return Ok(0);
    }

    let mut used = vec![false; mesh.vertex_count()];
    for face in mesh.faces() {
        for &v in face.indices() {
            used[v] = true;
        }
    }
    touched.retain(|&v| !used[v]);
    touched.sort_unstable();
    touched.dedup();

    // Emptied faces hold no indices, so deleting them removes no vertices.
    mesh.delete_faces(&emptied)?;
    mesh.remove_vertices(&touched);

    debug!(removed, faces_deleted = emptied.len(), "removed degenerate triangles");
    Ok(removed)
}
