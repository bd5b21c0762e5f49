//! # Primitive Tests

use super::*;
use crate::ops::measure::{bounding_box, signed_volume, surface_area};
use crate::topology::WingedEdgeGraph;
use approx::assert_relative_eq;
use std::f64::consts::TAU;

/// Area of a regular n-gon inscribed in a circle of radius `r`.
fn ngon_area(r: f64, n: u32) -> f64 {
    0.5 * f64::from(n) * r * r * (TAU / f64::from(n)).sin()
}

// =============================================================================
// CUBE
// =============================================================================

#[test]
fn test_cube_counts() {
    let mesh = Shape::cube(2.0).generate().unwrap();
    assert_eq!(mesh.face_count(), 6);
    assert_eq!(mesh.vertex_count(), 24);
    assert_eq!(mesh.shared_vertices().len(), 8);
    assert!(mesh.faces().iter().all(|f| f.to_quad().is_some()));
    mesh.validate().unwrap();
}

#[test]
fn test_cube_centered() {
    let mesh = create_cube(DVec3::new(2.0, 4.0, 6.0)).unwrap();
    let (min, max) = bounding_box(&mesh).unwrap();
    assert_relative_eq!(min, DVec3::new(-1.0, -2.0, -3.0));
    assert_relative_eq!(max, DVec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_cube_outward_normals() {
    let mesh = Shape::cube(1.0).generate().unwrap();
    assert_relative_eq!(signed_volume(&mesh), 1.0, epsilon = 1e-12);
    assert_relative_eq!(surface_area(&mesh), 6.0, epsilon = 1e-12);
    for face in 0..mesh.face_count() {
        let normal = mesh.face_normal(face).unwrap();
        let center = mesh.faces()[face]
            .distinct_indices()
            .iter()
            .map(|&i| mesh.positions()[i])
            .sum::<DVec3>()
            / 4.0;
        assert!(normal.dot(center) > 0.0);
    }
}

#[test]
fn test_cube_closed() {
    let mesh = Shape::cube(1.0).generate().unwrap();
    let graph = WingedEdgeGraph::from_mesh(&mesh).unwrap();
    assert_eq!(graph.len(), 24);
    assert!(graph.is_closed());
    assert!(graph.border_edges().is_empty());
    assert!(graph.non_manifold_edges().is_empty());
}

#[test]
fn test_cube_has_uvs() {
    let mesh = Shape::cube(1.0).generate().unwrap();
    let uvs = mesh.uv0().unwrap();
    assert_eq!(uvs.len(), 24);
    assert!(uvs.iter().all(|uv| uv.is_finite()));
}

#[test]
fn test_cube_invalid_size() {
    assert!(matches!(
        create_cube(DVec3::new(1.0, 0.0, 1.0)),
        Err(MeshError::InvalidParameter { .. })
    ));
    assert!(create_cube(DVec3::new(1.0, -1.0, 1.0)).is_err());
    assert!(create_cube(DVec3::new(f64::NAN, 1.0, 1.0)).is_err());
}

// =============================================================================
// PLANE
// =============================================================================

#[test]
fn test_plane_grid() {
    let mesh = create_plane(4.0, 2.0, 4, 2).unwrap();
    assert_eq!(mesh.face_count(), 8);
    assert_eq!(mesh.vertex_count(), 32);
    assert_eq!(mesh.shared_vertices().len(), 15);
    assert_relative_eq!(surface_area(&mesh), 8.0, epsilon = 1e-12);
    for face in 0..mesh.face_count() {
        assert_relative_eq!(mesh.face_normal(face).unwrap(), DVec3::Y);
    }
}

#[test]
fn test_plane_is_open() {
    let mesh = create_plane(1.0, 1.0, 2, 2).unwrap();
    let graph = WingedEdgeGraph::from_mesh(&mesh).unwrap();
    assert!(!graph.is_closed());
    assert_eq!(graph.border_edges().len(), 8);
}

#[test]
fn test_plane_invalid_segments() {
    assert!(create_plane(1.0, 1.0, 0, 1).is_err());
    assert!(create_plane(0.0, 1.0, 1, 1).is_err());
}

// =============================================================================
// CYLINDER & CONE
// =============================================================================

#[test]
fn test_cylinder_volume_and_topology() {
    let mesh = create_cylinder(1.0, 2.0, 12).unwrap();
    assert_eq!(mesh.face_count(), 14);
    assert_eq!(mesh.shared_vertices().len(), 24);
    assert_relative_eq!(signed_volume(&mesh), ngon_area(1.0, 12) * 2.0, epsilon = 1e-9);

    let graph = WingedEdgeGraph::from_mesh(&mesh).unwrap();
    assert!(graph.is_closed());
    assert!(graph.non_manifold_edges().is_empty());
}

#[test]
fn test_cylinder_smoothing_groups() {
    let mesh = create_cylinder(1.0, 1.0, 8).unwrap();
    let smooth = mesh.faces().iter().filter(|f| f.smoothing_group == 1).count();
    let flat = mesh.faces().iter().filter(|f| f.smoothing_group == 0).count();
    assert_eq!(smooth, 8);
    assert_eq!(flat, 2);
}

#[test]
fn test_cone_volume() {
    let mesh = Shape::Cone {
        radius: 2.0,
        height: 3.0,
        segments: 16,
    }
    .generate()
    .unwrap();
    assert_eq!(mesh.face_count(), 17);
    assert_eq!(mesh.shared_vertices().len(), 17);
    assert_relative_eq!(
        signed_volume(&mesh),
        ngon_area(2.0, 16) * 3.0 / 3.0,
        epsilon = 1e-9
    );
    assert!(WingedEdgeGraph::from_mesh(&mesh).unwrap().is_closed());
}

#[test]
fn test_default_segments() {
    let mesh = Shape::cylinder(1.0, 1.0).generate().unwrap();
    let n = config::constants::DEFAULT_SEGMENTS as usize;
    assert_eq!(mesh.face_count(), n + 2);
    assert_eq!(Shape::cone(1.0, 1.0).generate().unwrap().face_count(), n + 1);
}

#[test]
fn test_too_few_segments() {
    assert!(matches!(
        create_cylinder(1.0, 1.0, 2),
        Err(MeshError::InvalidParameter { .. })
    ));
    assert!(create_cone(1.0, 1.0, 2).is_err());
    assert!(create_cone(1.0, 1.0, config::constants::MIN_SEGMENTS).is_ok());
}
