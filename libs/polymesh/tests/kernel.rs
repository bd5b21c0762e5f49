use approx::assert_relative_eq;
use glam::DVec3;
use polymesh::compile::{compile, decompile, CompileOptions, CompileStatus};
use polymesh::ops::measure::{signed_volume, surface_area};
use polymesh::ops::{intersect, subtract, union, CsgOptions};
use polymesh::rebuild::insert_point_in_face;
use polymesh::triangulate::triangulate;
use polymesh::weld::{rebuild_shared_vertices, weld_vertices, WeldOptions};
use polymesh::{EditableMesh, Face, Shape, WingedEdgeGraph};

fn unit_quad() -> EditableMesh {
    let positions = vec![
        DVec3::new(0.0, 0.0, 0.0),
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(1.0, 1.0, 0.0),
        DVec3::new(0.0, 1.0, 0.0),
    ];
    EditableMesh::from_positions(positions, vec![Face::new(vec![0, 1, 2, 0, 2, 3])]).unwrap()
}

#[test]
fn welding_is_idempotent() {
    let positions = vec![
        DVec3::ZERO,
        DVec3::new(1e-7, 0.0, 0.0),
        DVec3::X,
        DVec3::new(1.0, 1e-7, 0.0),
        DVec3::Y,
        DVec3::new(0.0, 1.0, 1e-7),
    ];
    let faces = vec![Face::new(vec![0, 2, 4]), Face::new(vec![1, 3, 5])];
    let mut mesh = EditableMesh::from_positions(positions, faces).unwrap();

    let first = rebuild_shared_vertices(&mut mesh, &WeldOptions::default()).unwrap();
    assert_eq!(first.groups.len(), 3);
    let groups = mesh.shared_vertices().to_vec();
    let lookup = mesh.shared_lookup().unwrap();

    let second = rebuild_shared_vertices(&mut mesh, &WeldOptions::default()).unwrap();
    assert_eq!(second.groups, first.groups);
    assert_eq!(mesh.shared_vertices(), groups.as_slice());
    assert_eq!(mesh.shared_lookup().unwrap(), lookup);
}

#[test]
fn manual_weld_is_idempotent() {
    let mut mesh = Shape::cube(1.0).generate().unwrap();
    let picked = [0, 5, 9];

    weld_vertices(&mut mesh, &picked).unwrap();
    let groups = mesh.shared_vertices().to_vec();
    let lookup = mesh.shared_lookup().unwrap();
    assert_eq!(lookup.get(0), lookup.get(5));
    assert_eq!(lookup.get(5), lookup.get(9));

    weld_vertices(&mut mesh, &picked).unwrap();
    assert_eq!(mesh.shared_vertices(), groups.as_slice());
    assert_eq!(mesh.shared_lookup().unwrap(), lookup);
}

#[test]
fn concave_polygon_gets_n_minus_two_triangles() {
    // Arrow pointing +X with a pointed tail.
    let points = [
        DVec3::new(0.0, 0.0, 0.0),
        DVec3::new(1.0, 1.0, 0.0),
        DVec3::new(3.0, 1.0, 0.0),
        DVec3::new(4.0, 2.0, 0.0),
        DVec3::new(4.0, -2.0, 0.0),
        DVec3::new(3.0, -1.0, 0.0),
        DVec3::new(1.0, -1.0, 0.0),
    ];
    let triangles = triangulate(&points, true).unwrap();
    assert_eq!(triangles.len(), (points.len() - 2) * 3);

    let area: f64 = triangles
        .chunks_exact(3)
        .map(|t| {
            (points[t[1]] - points[t[0]])
                .cross(points[t[2]] - points[t[0]])
                .z
                * 0.5
        })
        .sum();
    // tail 1, shaft 4, head 3
    assert_relative_eq!(area.abs(), 8.0, epsilon = 1e-12);
}

#[test]
fn cube_is_a_closed_manifold() {
    let cube = Shape::cube(1.0).generate().unwrap();
    let graph = WingedEdgeGraph::from_mesh(&cube).unwrap();
    assert!(graph.is_closed());
    assert!(graph.border_edges().is_empty());
    assert!(graph.non_manifold_edges().is_empty());
    for face in 0..cube.face_count() {
        assert_eq!(graph.adjacent_faces(face).len(), 4);
    }
}

#[test]
fn compile_reaches_a_fixed_point() {
    let mesh = Shape::Cylinder {
        radius: 1.0,
        height: 2.0,
        segments: 8,
    }
    .generate()
    .unwrap();
    let options = CompileOptions::default();

    let (first, status) = compile(&mesh, &options, None).unwrap();
    assert_eq!(status, CompileStatus::Complete);

    let restored = decompile(&first).unwrap();
    let (second, _) = compile(&restored, &options, None).unwrap();
    assert_eq!(second.vertices.len(), first.vertices.len());
    assert_eq!(second.submeshes, first.submeshes);
}

#[test]
fn boolean_volumes_of_overlapping_cubes() {
    let a = Shape::cube(1.0).generate().unwrap();
    let mut b = Shape::cube(1.0).generate().unwrap();
    b.translate(DVec3::new(0.5, 0.0, 0.0));
    let options = CsgOptions::default();

    let (u, _) = union(&a, &b, &options).unwrap();
    let (s, _) = subtract(&a, &b, &options).unwrap();
    let (i, _) = intersect(&a, &b, &options).unwrap();

    assert_relative_eq!(signed_volume(&u), 1.5, epsilon = 1e-9);
    assert_relative_eq!(signed_volume(&s), 0.5, epsilon = 1e-9);
    assert_relative_eq!(signed_volume(&i), 0.5, epsilon = 1e-9);
    for result in [&u, &s, &i] {
        assert!(WingedEdgeGraph::from_mesh(result).unwrap().is_closed());
    }
}

#[test]
fn boolean_of_cube_and_cylinder_is_closed() {
    let cube = Shape::cube(1.0).generate().unwrap();
    let mut rod = Shape::cylinder(0.25, 1.0).generate().unwrap();
    // Pokes out through the +X and +Y faces of the cube.
    rod.translate(DVec3::new(0.4, 0.25, 0.1));
    let options = CsgOptions::default();

    let (u, _) = union(&cube, &rod, &options).unwrap();
    let (s, _) = subtract(&cube, &rod, &options).unwrap();
    let (i, _) = intersect(&cube, &rod, &options).unwrap();

    let v = signed_volume;
    assert_relative_eq!(v(&u) + v(&i), v(&cube) + v(&rod), epsilon = 1e-9);
    assert_relative_eq!(v(&s) + v(&i), v(&cube), epsilon = 1e-9);
    for result in [&u, &s, &i] {
        let graph = WingedEdgeGraph::from_mesh(result).unwrap();
        assert!(graph.border_edges().is_empty());
        assert!(graph.is_closed());
    }
}

#[test]
fn center_point_splits_quad_into_four() {
    let mut mesh = unit_quad();
    let face = insert_point_in_face(&mut mesh, 0, DVec3::new(0.5, 0.5, 0.0)).unwrap();
    assert_eq!(mesh.face_count(), 1);
    assert_eq!(mesh.faces()[face].triangle_count(), 4);
    assert_relative_eq!(surface_area(&mesh), 1.0, epsilon = 1e-12);
    mesh.validate().unwrap();
}
