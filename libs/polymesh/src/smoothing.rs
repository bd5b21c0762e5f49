//! # Smoothing Groups
//!
//! Faces sharing a positive smoothing group get averaged normals across
//! their shared vertices. Group `0` and the hard range `25..=42` mark faces
//! whose normals are never averaged.
//!
//! ## Auto-smoothing
//!
//! [`apply_smoothing_groups`] flood-fills across the winged-edge graph,
//! joining neighbouring faces whose normals differ by no more than a
//! threshold angle.

use std::collections::{BTreeSet, HashMap, VecDeque};

use config::constants::{HARD_RANGE_MAX, HARD_RANGE_MIN, SMOOTHING_GROUP_NONE, SMOOTH_RANGE_MIN};
use glam::DVec3;
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::mesh::EditableMesh;
use crate::topology::WingedEdgeGraph;

/// True if faces in `group` get averaged normals.
///
/// ```rust
/// use polymesh::smoothing::is_smooth;
/// assert!(is_smooth(1));
/// assert!(!is_smooth(0));
/// assert!(!is_smooth(30));
/// ```
#[inline]
pub fn is_smooth(group: i32) -> bool {
    group > SMOOTHING_GROUP_NONE && !is_hard(group)
}

/// True if `group` lies in the reserved hard range.
#[inline]
pub fn is_hard(group: i32) -> bool {
    (HARD_RANGE_MIN..=HARD_RANGE_MAX).contains(&group)
}

/// Smallest smooth group no face of `mesh` uses.
pub fn next_unused_smoothing_group(mesh: &EditableMesh) -> i32 {
    let used: BTreeSet<i32> = mesh.faces().iter().map(|f| f.smoothing_group).collect();
    next_free(SMOOTH_RANGE_MIN, &used)
}

fn next_free(mut group: i32, used: &BTreeSet<i32>) -> i32 {
    while used.contains(&group) || is_hard(group) {
        group = if is_hard(group) { HARD_RANGE_MAX + 1 } else { group + 1 };
    }
    group
}

/// Per-vertex normals derived from face geometry and smoothing groups.
///
/// Every vertex takes the normal of the face that uses it. Vertices of
/// smooth faces instead take the average of all face normals sharing both
/// their shared-vertex group and their smoothing group.
pub fn compute_normals(mesh: &EditableMesh) -> MeshResult<Vec<DVec3>> {
    let lookup = mesh.shared_lookup()?;
    let mut normals = vec![DVec3::ZERO; mesh.vertex_count()];
    let mut averaged: HashMap<(usize, i32), DVec3> = HashMap::new();
    let mut smooth_members: Vec<(usize, usize, i32)> = Vec::new();

    for (f, face) in mesh.faces().iter().enumerate() {
        let normal = mesh.face_normal(f).unwrap_or(DVec3::ZERO);
        let smooth = is_smooth(face.smoothing_group);
        for v in face.distinct_indices() {
            normals[v] += normal;
            if smooth {
                let group = lookup
                    .get(v)
                    .ok_or(MeshError::IndexOutOfRange { index: v, len: lookup.len() })?;
                *averaged.entry((group, face.smoothing_group)).or_default() += normal;
                smooth_members.push((v, group, face.smoothing_group));
            }
        }
    }

    for (v, group, smoothing) in smooth_members {
        if let Some(sum) = averaged.get(&(group, smoothing)) {
            normals[v] = *sum;
        }
    }

    Ok(normals.into_iter().map(DVec3::normalize_or_zero).collect())
}

/// Assigns smoothing groups to `faces` by angle.
///
/// Selected faces are first reset to [`SMOOTHING_GROUP_NONE`]. Connected
/// runs of selected faces whose neighbouring normals differ by at most
/// `angle_degrees` then share a fresh group; isolated faces stay hard.
///
/// Returns the number of groups assigned.
pub fn apply_smoothing_groups(
    mesh: &mut EditableMesh,
    faces: &[usize],
    angle_degrees: f64,
) -> MeshResult<usize> {
    if !angle_degrees.is_finite() || angle_degrees < 0.0 {
        return Err(MeshError::invalid_parameter(format!(
            "smoothing angle must be non-negative, got {angle_degrees}"
        )));
    }
    for &f in faces {
        MeshError::check_index(f, mesh.face_count())?;
    }

    let graph = WingedEdgeGraph::from_mesh(mesh)?;
    let threshold = angle_degrees.to_radians();
    let selected: BTreeSet<usize> = faces.iter().copied().collect();
    let normals: Vec<Option<DVec3>> = (0..mesh.face_count()).map(|f| mesh.face_normal(f)).collect();

    for &f in &selected {
        mesh.faces_mut()[f].smoothing_group = SMOOTHING_GROUP_NONE;
    }
    let mut used: BTreeSet<i32> = mesh.faces().iter().map(|f| f.smoothing_group).collect();

    let mut visited: BTreeSet<usize> = BTreeSet::new();
    let mut assigned = 0;
    let mut group = SMOOTH_RANGE_MIN;

    for &seed in &selected {
        if !visited.insert(seed) {
            continue;
        }
        let mut component = vec![seed];
        let mut queue = VecDeque::from([seed]);
        while let Some(face) = queue.pop_front() {
            for neighbour in graph.adjacent_faces(face) {
                if !selected.contains(&neighbour) || visited.contains(&neighbour) {
                    continue;
                }
                let close = match (normals[face], normals[neighbour]) {
                    (Some(a), Some(b)) => a.angle_between(b) <= threshold,
                    _ => false,
                };
                if close {
                    visited.insert(neighbour);
                    component.push(neighbour);
                    queue.push_back(neighbour);
                }
            }
        }

        if component.len() > 1 {
            group = next_free(group, &used);
            used.insert(group);
            for f in component {
                mesh.faces_mut()[f].smoothing_group = group;
            }
            assigned += 1;
        }
    }

    debug!(faces = selected.len(), groups = assigned, "applied smoothing groups");
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Face;
    use crate::primitives::Shape;
    use approx::assert_relative_eq;

    /// Two unit quads meeting at a right angle along the X axis.
    fn roof(smoothing: i32) -> EditableMesh {
        let positions = vec![
            // floor, normal +Y
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 0.0),
            // wall, normal +Z
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.0, -1.0, 0.0),
            DVec3::new(1.0, -1.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
        ];
        let mut floor = Face::new(vec![0, 1, 2, 0, 2, 3]);
        let mut wall = Face::new(vec![4, 5, 6, 4, 6, 7]);
        floor.smoothing_group = smoothing;
        wall.smoothing_group = smoothing;
        EditableMesh::from_positions(positions, vec![floor, wall]).unwrap()
    }

    #[test]
    fn test_ranges() {
        assert!(is_smooth(24));
        assert!(is_hard(25));
        assert!(is_hard(42));
        assert!(is_smooth(43));
        assert!(!is_smooth(-1));
    }

    #[test]
    fn test_next_unused_skips_hard_range() {
        let mut mesh = roof(1);
        assert_eq!(next_unused_smoothing_group(&mesh), 2);
        let used: BTreeSet<i32> = (1..=24).collect();
        assert_eq!(next_free(1, &used), 43);
        mesh.faces_mut()[0].smoothing_group = 2;
        assert_eq!(next_unused_smoothing_group(&mesh), 3);
    }

    #[test]
    fn test_hard_normals_follow_faces() {
        let normals = compute_normals(&roof(0)).unwrap();
        assert_relative_eq!(normals[0], DVec3::Y);
        assert_relative_eq!(normals[4], DVec3::Z);
    }

    #[test]
    fn test_smooth_normals_average_across_seam() {
        let normals = compute_normals(&roof(1)).unwrap();
        let expected = DVec3::new(0.0, 1.0, 1.0).normalize();
        assert_relative_eq!(normals[0], expected, epsilon = 1e-12);
        assert_relative_eq!(normals[4], expected, epsilon = 1e-12);
        assert_relative_eq!(normals[1], DVec3::Y, epsilon = 1e-12);
    }

    #[test]
    fn test_auto_smoothing_respects_angle() {
        let mut mesh = roof(0);
        assert_eq!(apply_smoothing_groups(&mut mesh, &[0, 1], 45.0).unwrap(), 0);
        assert!(mesh.faces().iter().all(|f| f.smoothing_group == 0));

        assert_eq!(apply_smoothing_groups(&mut mesh, &[0, 1], 95.0).unwrap(), 1);
        assert_eq!(mesh.faces()[0].smoothing_group, 1);
        assert_eq!(mesh.faces()[1].smoothing_group, 1);
    }

    #[test]
    fn test_auto_smoothing_cube() {
        let mut cube = Shape::cube(1.0).generate().unwrap();
        let all: Vec<usize> = (0..cube.face_count()).collect();
        assert_eq!(apply_smoothing_groups(&mut cube, &all, 30.0).unwrap(), 0);
        assert_eq!(apply_smoothing_groups(&mut cube, &all, 91.0).unwrap(), 1);
        assert!(cube.faces().iter().all(|f| f.smoothing_group == 1));
    }

    #[test]
    fn test_rejects_negative_angle() {
        let mut mesh = roof(0);
        assert!(apply_smoothing_groups(&mut mesh, &[0], -1.0).is_err());
    }
}
