//! # Cube Primitive
//!
//! Generates mesh for cube and rectangular prism shapes.

use glam::DVec3;

use super::{require_positive, ShapeBuilder};
use crate::error::MeshResult;
use crate::mesh::EditableMesh;

/// Face normal with its in-plane axes, `u × v = normal`.
const SIDES: [(DVec3, DVec3, DVec3); 6] = [
    (DVec3::X, DVec3::Y, DVec3::Z),
    (DVec3::NEG_X, DVec3::Z, DVec3::Y),
    (DVec3::Y, DVec3::Z, DVec3::X),
    (DVec3::NEG_Y, DVec3::X, DVec3::Z),
    (DVec3::Z, DVec3::X, DVec3::Y),
    (DVec3::NEG_Z, DVec3::Y, DVec3::X),
];

/// Creates a rectangular prism centered at the origin.
///
/// # Arguments
///
/// * `size` - Dimensions [x, y, z]
///
/// # Returns
///
/// A mesh with six quad faces, 24 vertices and 8 shared vertices.
///
/// # Example
///
/// ```rust
/// use polymesh::primitives::create_cube;
/// use glam::DVec3;
///
/// let mesh = create_cube(DVec3::splat(10.0)).unwrap();
/// assert_eq!(mesh.vertex_count(), 24);
/// assert_eq!(mesh.shared_vertices().len(), 8);
/// ```
pub fn create_cube(size: DVec3) -> MeshResult<EditableMesh> {
    require_positive("cube width", size.x)?;
    require_positive("cube height", size.y)?;
    require_positive("cube depth", size.z)?;

    let half = size * 0.5;
    let mut builder = ShapeBuilder::default();

    for (n, u, v) in SIDES {
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
            .map(|(su, sv)| (n + u * su + v * sv) * half);
        builder.polygon(&corners, 0);
    }

    builder.finish()
}
