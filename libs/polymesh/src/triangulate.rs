//! # Triangulation
//!
//! Converts simple polygons (convex or concave, optionally with interior
//! constraint points) into triangle index lists.
//!
//! ## Algorithm
//!
//! 1. Reject degenerate loops (too few points, duplicate consecutive points,
//!    zero area)
//! 2. Project onto the best-fit plane, oriented by the loop's Newell normal so
//!    that counter-clockwise in 3D stays counter-clockwise in 2D
//! 3. Ear clipping: an ear is a convex corner whose triangle contains no other
//!    remaining vertex
//! 4. Interior points are inserted by splitting the triangle (or the pair of
//!    triangles across an edge) that contains them
//!
//! Output triangles keep the input winding. Callers that need a particular
//! facing compare normals and reverse the whole list.

use config::constants::{AREA_EPSILON, EPSILON};
use glam::{DVec2, DVec3};
use tracing::trace;

use crate::error::TriangulationError;

// =============================================================================
// PLANE FITTING
// =============================================================================

/// Newell normal of an ordered loop, `None` if the loop encloses no area.
///
/// The length of the unnormalized Newell vector is twice the polygon area.
pub fn polygon_normal(points: &[DVec3]) -> Option<DVec3> {
    let mut normal = DVec3::ZERO;
    for (i, &current) in points.iter().enumerate() {
        let next = points[(i + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    if normal.length() * 0.5 <= AREA_EPSILON {
        None
    } else {
        Some(normal.normalize())
    }
}

/// Least-squares plane through a point cloud.
///
/// Returns `(normal, centroid)`, or `None` when the points are collinear or
/// fewer than three. The normal's sign is arbitrary.
pub fn find_best_plane(points: &[DVec3]) -> Option<(DVec3, DVec3)> {
    if points.len() < 3 {
        return None;
    }
    let centroid = points.iter().copied().sum::<DVec3>() / points.len() as f64;

    let (mut xx, mut xy, mut xz, mut yy, mut yz, mut zz) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    for p in points {
        let r = *p - centroid;
        xx += r.x * r.x;
        xy += r.x * r.y;
        xz += r.x * r.z;
        yy += r.y * r.y;
        yz += r.y * r.z;
        zz += r.z * r.z;
    }

    let det_x = yy * zz - yz * yz;
    let det_y = xx * zz - xz * xz;
    let det_z = xx * yy - xy * xy;
    let det_max = det_x.max(det_y).max(det_z);
    if det_max <= EPSILON * EPSILON {
        return None;
    }

    let direction = if det_max == det_x {
        DVec3::new(det_x, xz * yz - xy * zz, xy * yz - xz * yy)
    } else if det_max == det_y {
        DVec3::new(xz * yz - xy * zz, det_y, xy * xz - yz * xx)
    } else {
        DVec3::new(xy * yz - xz * yy, xy * xz - yz * xx, det_z)
    };

    direction.try_normalize().map(|n| (n, centroid))
}

/// Orthonormal `(u, v)` basis of the plane with normal `normal`, such that
/// `u × v = normal`.
///
/// The reference axis depends on the dominant component of the normal, so
/// faces pointing along an axis project to axis-aligned UVs.
pub fn projection_axes(normal: DVec3) -> (DVec3, DVec3) {
    let n = normal.normalize_or_zero();
    let a = n.abs();
    let reference = if a.x >= a.y && a.x >= a.z {
        DVec3::Y
    } else if a.y >= a.z {
        DVec3::Z
    } else {
        DVec3::Y
    };
    let u = reference.cross(n).normalize_or_zero();
    let v = n.cross(u);
    (u, v)
}

/// Projects points onto the plane with the given normal.
pub fn planar_project(points: &[DVec3], normal: DVec3) -> Vec<DVec2> {
    let (u, v) = projection_axes(normal);
    points
        .iter()
        .map(|p| DVec2::new(p.dot(u), p.dot(v)))
        .collect()
}

/// Signed area of a 2D loop; positive when counter-clockwise.
pub fn signed_area_2d(points: &[DVec2]) -> f64 {
    let mut twice = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice += p.perp_dot(q);
    }
    twice * 0.5
}

// =============================================================================
// TRIANGULATION
// =============================================================================

/// Fan triangulation `(0, i, i + 1)` of a loop with `count` points.
pub fn fan_triangulate(count: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(count.saturating_sub(2) * 3);
    for i in 1..count.saturating_sub(1) {
        out.extend_from_slice(&[0, i, i + 1]);
    }
    out
}

/// Triangulates an ordered loop of 3D points.
///
/// With `allow_concave` the loop is ear-clipped; without it, a fan is emitted
/// once the degeneracy checks pass. Indices refer to `points`.
///
/// # Example
///
/// ```rust
/// use glam::DVec3;
/// use polymesh::triangulate::triangulate;
///
/// // L-shaped hexagon
/// let points = [
///     DVec3::new(0.0, 0.0, 0.0),
///     DVec3::new(2.0, 0.0, 0.0),
///     DVec3::new(2.0, 1.0, 0.0),
///     DVec3::new(1.0, 1.0, 0.0),
///     DVec3::new(1.0, 2.0, 0.0),
///     DVec3::new(0.0, 2.0, 0.0),
/// ];
/// let triangles = triangulate(&points, true).unwrap();
/// assert_eq!(triangles.len(), 4 * 3);
/// ```
pub fn triangulate(points: &[DVec3], allow_concave: bool) -> Result<Vec<usize>, TriangulationError> {
    let normal = check_loop(points)?;
    if points.len() == 3 {
        return Ok(vec![0, 1, 2]);
    }
    if !allow_concave {
        return Ok(fan_triangulate(points.len()));
    }
    let projected = planar_project(points, normal);
    triangulate_2d(&projected)
}

/// Validates a loop and returns its oriented projection normal.
fn check_loop(points: &[DVec3]) -> Result<DVec3, TriangulationError> {
    let n = points.len();
    if n < 3 {
        return Err(TriangulationError::TooFewPoints(n));
    }
    for i in 0..n {
        if points[i].distance(points[(i + 1) % n]) <= EPSILON {
            return Err(TriangulationError::DuplicateConsecutive(i));
        }
    }
    let newell = polygon_normal(points).ok_or(TriangulationError::ZeroArea)?;
    let normal = match find_best_plane(points) {
        Some((fit, _)) if fit.dot(newell) < 0.0 => -fit,
        Some((fit, _)) => fit,
        None => newell,
    };
    Ok(normal)
}

/// Ear-clips a 2D loop. Indices refer to `points`; output keeps its winding.
pub fn triangulate_2d(points: &[DVec2]) -> Result<Vec<usize>, TriangulationError> {
    let n = points.len();
    if n < 3 {
        return Err(TriangulationError::TooFewPoints(n));
    }
    let area = signed_area_2d(points);
    if area.abs() <= AREA_EPSILON {
        return Err(TriangulationError::ZeroArea);
    }
    let orientation = area.signum();

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut out = Vec::with_capacity((n - 2) * 3);

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&k| {
            let p = remaining[(k + m - 1) % m];
            let i = remaining[k];
            let q = remaining[(k + 1) % m];
            is_ear(points, &remaining, [p, i, q], orientation)
        });
        let Some(k) = ear else {
            trace!(remaining = m, "ear clipping stalled");
            return Err(TriangulationError::NoEar { remaining: m });
        };
        out.extend_from_slice(&[
            remaining[(k + m - 1) % m],
            remaining[k],
            remaining[(k + 1) % m],
        ]);
        remaining.remove(k);
    }

    out.extend_from_slice(&remaining);
    Ok(out)
}

fn is_ear(points: &[DVec2], remaining: &[usize], [p, i, q]: [usize; 3], orientation: f64) -> bool {
    let (a, b, c) = (points[p], points[i], points[q]);
    if (b - a).perp_dot(c - b) * orientation <= EPSILON {
        return false;
    }
    remaining.iter().all(|&r| {
        if r == p || r == i || r == q {
            return true;
        }
        let x = points[r];
        // Duplicate positions (bridges) never block an ear.
        if x.distance(a) <= EPSILON || x.distance(b) <= EPSILON || x.distance(c) <= EPSILON {
            return true;
        }
        !point_in_triangle(x, a, b, c, orientation)
    })
}

/// Inclusive point-in-triangle test for a triangle of known orientation.
fn point_in_triangle(x: DVec2, a: DVec2, b: DVec2, c: DVec2, orientation: f64) -> bool {
    let d1 = (b - a).perp_dot(x - a) * orientation;
    let d2 = (c - b).perp_dot(x - b) * orientation;
    let d3 = (a - c).perp_dot(x - c) * orientation;
    d1 >= -EPSILON && d2 >= -EPSILON && d3 >= -EPSILON
}

// =============================================================================
// INTERIOR POINTS
// =============================================================================

/// Where a point falls relative to one triangle.
enum Location {
    Inside,
    /// On the edge opposite the given corner (0, 1 or 2).
    OnEdge(usize),
    Vertex,
    Outside,
}

/// Triangulates `boundary` and then inserts every `interior` point.
///
/// Indices `0..boundary.len()` refer to the boundary and
/// `boundary.len()..` to the interior points, in order.
///
/// A point strictly inside a triangle splits it in three. A point on an edge
/// splits the triangle on each side of that edge in two.
pub fn triangulate_with_interior(
    boundary: &[DVec3],
    interior: &[DVec3],
) -> Result<Vec<usize>, TriangulationError> {
    let normal = check_loop(boundary)?;
    let base = triangulate(boundary, true)?;

    let all: Vec<DVec3> = boundary.iter().chain(interior).copied().collect();
    let projected = planar_project(&all, normal);
    let orientation = signed_area_2d(&projected[..boundary.len()]).signum();
    let scale = bounding_diagonal(&projected[..boundary.len()]).max(1.0);
    let tolerance = scale * 1e-9;

    let mut triangles: Vec<[usize; 3]> = base.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();

    for j in 0..interior.len() {
        let p = boundary.len() + j;
        let x = projected[p];

        let hit = triangles.iter().enumerate().find_map(|(t, tri)| {
            match locate(x, tri.map(|k| projected[k]), orientation, tolerance) {
                Location::Outside => None,
                location => Some((t, location)),
            }
        });

        match hit {
            None | Some((_, Location::Outside)) => {
                return Err(TriangulationError::PointOutside(j))
            }
            Some((_, Location::Vertex)) => return Err(TriangulationError::CoincidentPoint(j)),
            Some((t, Location::Inside)) => {
                let [a, b, c] = triangles[t];
                triangles[t] = [a, b, p];
                triangles.push([b, c, p]);
                triangles.push([c, a, p]);
            }
            Some((t, Location::OnEdge(corner))) => {
                let tri = triangles[t];
                let w = tri[corner];
                let u = tri[(corner + 1) % 3];
                let v = tri[(corner + 2) % 3];
                triangles[t] = [u, p, w];
                triangles.push([p, v, w]);

                let neighbour = triangles.iter().position(|n| has_directed_edge(n, v, u));
                if let Some(n) = neighbour {
                    let x_corner = triangles[n]
                        .iter()
                        .copied()
                        .find(|&k| k != u && k != v)
                        .unwrap_or(u);
                    triangles[n] = [v, p, x_corner];
                    triangles.push([p, u, x_corner]);
                }
            }
        }
    }

    Ok(triangles.into_iter().flatten().collect())
}

fn locate(x: DVec2, [a, b, c]: [DVec2; 3], orientation: f64, tolerance: f64) -> Location {
    // Signed distance of `x` to the edge opposite each corner.
    let distance = |from: DVec2, to: DVec2| {
        let edge = to - from;
        let len = edge.length();
        if len <= EPSILON {
            0.0
        } else {
            edge.perp_dot(x - from) * orientation / len
        }
    };
    let d = [distance(b, c), distance(c, a), distance(a, b)];

    if d.iter().any(|&di| di < -tolerance) {
        return Location::Outside;
    }
    let on: Vec<usize> = (0..3).filter(|&k| d[k].abs() <= tolerance).collect();
    match on.as_slice() {
        [] => Location::Inside,
        [corner] => Location::OnEdge(*corner),
        _ => Location::Vertex,
    }
}

fn has_directed_edge(tri: &[usize; 3], from: usize, to: usize) -> bool {
    (0..3).any(|k| tri[k] == from && tri[(k + 1) % 3] == to)
}

fn bounding_diagonal(points: &[DVec2]) -> f64 {
    let mut min = DVec2::splat(f64::INFINITY);
    let mut max = DVec2::splat(f64::NEG_INFINITY);
    for p in points {
        min = min.min(*p);
        max = max.max(*p);
    }
    (max - min).length()
}
