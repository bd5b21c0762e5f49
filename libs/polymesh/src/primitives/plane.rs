//! # Plane Primitive
//!
//! Generates a subdivided single-sided grid.

use glam::DVec3;

use super::{require_positive, ShapeBuilder};
use crate::error::{MeshError, MeshResult};
use crate::mesh::EditableMesh;

/// Creates a grid in the XZ plane, centered at the origin and facing +Y.
///
/// Each cell is one quad face.
///
/// # Arguments
///
/// * `width` - Extent along X
/// * `height` - Extent along Z
/// * `width_segments` - Cells along X (at least 1)
/// * `height_segments` - Cells along Z (at least 1)
pub fn create_plane(
    width: f64,
    height: f64,
    width_segments: u32,
    height_segments: u32,
) -> MeshResult<EditableMesh> {
    require_positive("plane width", width)?;
    require_positive("plane height", height)?;
    if width_segments == 0 || height_segments == 0 {
        return Err(MeshError::invalid_parameter(format!(
            "plane needs at least one segment per axis, got {width_segments}x{height_segments}"
        )));
    }

    let x_at = |i: u32| -width * 0.5 + width * f64::from(i) / f64::from(width_segments);
    let z_at = |j: u32| -height * 0.5 + height * f64::from(j) / f64::from(height_segments);

    let mut builder = ShapeBuilder::default();
    for i in 0..width_segments {
        for j in 0..height_segments {
            let (x0, x1) = (x_at(i), x_at(i + 1));
            let (z0, z1) = (z_at(j), z_at(j + 1));
            builder.polygon(
                &[
                    DVec3::new(x0, 0.0, z0),
                    DVec3::new(x0, 0.0, z1),
                    DVec3::new(x1, 0.0, z1),
                    DVec3::new(x1, 0.0, z0),
                ],
                0,
            );
        }
    }

    builder.finish()
}
