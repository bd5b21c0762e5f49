//! # Cylinder Primitive
//!
//! Generates mesh for cylinder and cone shapes.

use std::f64::consts::TAU;

use config::constants::MIN_SEGMENTS;
use glam::DVec3;

use super::{require_positive, ShapeBuilder};
use crate::error::{MeshError, MeshResult};
use crate::mesh::EditableMesh;

/// Smoothing group shared by curved side faces.
const SIDE_SMOOTHING: i32 = 1;

fn check(radius: f64, height: f64, segments: u32) -> MeshResult<()> {
    require_positive("radius", radius)?;
    require_positive("height", height)?;
    if segments < MIN_SEGMENTS {
        return Err(MeshError::invalid_parameter(format!(
            "need at least {MIN_SEGMENTS} segments, got {segments}"
        )));
    }
    Ok(())
}

/// Points around the Y axis at height `y`, counter-clockwise seen from +Y.
fn ring(radius: f64, y: f64, segments: u32) -> Vec<DVec3> {
    (0..segments)
        .map(|i| {
            let theta = TAU * f64::from(i) / f64::from(segments);
            DVec3::new(radius * theta.sin(), y, radius * theta.cos())
        })
        .collect()
}

/// Creates a capped cylinder along Y, centered at the origin.
///
/// # Arguments
///
/// * `radius` - Radius of both caps
/// * `height` - Extent along Y
/// * `segments` - Number of side quads (at least 3)
///
/// # Example
///
/// ```rust
/// use polymesh::primitives::create_cylinder;
///
/// let mesh = create_cylinder(1.0, 2.0, 16).unwrap();
/// assert_eq!(mesh.face_count(), 18);
/// ```
pub fn create_cylinder(radius: f64, height: f64, segments: u32) -> MeshResult<EditableMesh> {
    check(radius, height, segments)?;

    let bottom = ring(radius, -height * 0.5, segments);
    let top = ring(radius, height * 0.5, segments);
    let n = bottom.len();
    let mut builder = ShapeBuilder::default();

    for i in 0..n {
        let j = (i + 1) % n;
        builder.polygon(&[bottom[i], bottom[j], top[j], top[i]], SIDE_SMOOTHING);
    }
    builder.polygon(&top, 0);
    builder.polygon(&bottom.into_iter().rev().collect::<Vec<_>>(), 0);

    builder.finish()
}

/// Creates a capped cone along Y with its apex at `+height / 2`.
pub fn create_cone(radius: f64, height: f64, segments: u32) -> MeshResult<EditableMesh> {
    check(radius, height, segments)?;

    let bottom = ring(radius, -height * 0.5, segments);
    let apex = DVec3::new(0.0, height * 0.5, 0.0);
    let n = bottom.len();
    let mut builder = ShapeBuilder::default();

    for i in 0..n {
        builder.polygon(&[bottom[i], bottom[(i + 1) % n], apex], SIDE_SMOOTHING);
    }
    builder.polygon(&bottom.into_iter().rev().collect::<Vec<_>>(), 0);

    builder.finish()
}
