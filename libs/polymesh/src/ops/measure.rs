//! # Mesh Measurement
//!
//! Volume, area and bounds. Volume uses the signed tetrahedral decomposition
//! against the origin, so it is exact for closed meshes regardless of
//! T-junctions, and its sign follows the face winding (positive for outward
//! counter-clockwise faces).

use glam::DVec3;

use crate::mesh::{triangle_cross, EditableMesh};

/// Signed enclosed volume.
///
/// # Example
///
/// ```rust
/// use polymesh::ops::measure::signed_volume;
/// use polymesh::primitives::Shape;
///
/// let cube = Shape::cube(2.0).generate().unwrap();
/// assert!((signed_volume(&cube) - 8.0).abs() < 1e-9);
/// ```
pub fn signed_volume(mesh: &EditableMesh) -> f64 {
    let p = mesh.positions();
    mesh.faces()
        .iter()
        .flat_map(|f| f.triangles())
        .map(|[a, b, c]| p[a].dot(p[b].cross(p[c])))
        .sum::<f64>()
        / 6.0
}

/// Total triangle area.
pub fn surface_area(mesh: &EditableMesh) -> f64 {
    let p = mesh.positions();
    mesh.faces()
        .iter()
        .flat_map(|f| f.triangles())
        .map(|[a, b, c]| triangle_cross(p[a], p[b], p[c]).length() * 0.5)
        .sum()
}

/// Axis-aligned bounds as `(min, max)`, `None` for a mesh with no vertices.
pub fn bounding_box(mesh: &EditableMesh) -> Option<(DVec3, DVec3)> {
    let mut points = mesh.positions().iter();
    let first = *points.next()?;
    Some(points.fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Shape;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_measurements() {
        let cube = Shape::cube(1.0).generate().unwrap();
        assert_relative_eq!(signed_volume(&cube), 1.0, epsilon = 1e-12);
        assert_relative_eq!(surface_area(&cube), 6.0, epsilon = 1e-12);
        let (min, max) = bounding_box(&cube).unwrap();
        assert_eq!(min, DVec3::splat(-0.5));
        assert_eq!(max, DVec3::splat(0.5));
    }

    #[test]
    fn test_inverted_mesh_has_negative_volume() {
        let mut cube = Shape::cube(1.0).generate().unwrap();
        for face in cube.faces_mut() {
            face.reverse();
        }
        assert_relative_eq!(signed_volume(&cube), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_bounds() {
        assert!(bounding_box(&EditableMesh::new()).is_none());
    }
}
