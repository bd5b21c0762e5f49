//! # Automatic UVs
//!
//! Regenerates primary UVs for faces not marked `manual_uv`. Each face is
//! planar-projected along its normal; faces sharing a positive texture group
//! are projected together along their summed normal so the group unwraps as
//! one continuous island. The face's [`AutoUv`] settings are applied after
//! projection.

use std::collections::BTreeMap;

use glam::{DMat4, DVec2, DVec3};
use tracing::trace;

use crate::error::MeshResult;
use crate::mesh::{Anchor, AutoUv, EditableMesh, Fill};
use crate::triangulate::planar_project;

/// Regenerates UV0 for every automatically unwrapped face.
///
/// `world` is used only by faces whose settings request world-space
/// projection. Returns the number of projections performed (one per face or
/// texture group).
pub fn refresh_uvs(mesh: &mut EditableMesh, world: &DMat4) -> MeshResult<usize> {
    let mut uvs: Vec<DVec2> = mesh
        .uv0()
        .map(<[DVec2]>::to_vec)
        .unwrap_or_else(|| vec![DVec2::ZERO; mesh.vertex_count()]);

    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    let mut islands: Vec<Vec<usize>> = Vec::new();
    for (f, face) in mesh.faces().iter().enumerate() {
        if face.manual_uv {
            continue;
        }
        if face.texture_group > 0 {
            groups.entry(face.texture_group).or_default().push(f);
        } else {
            islands.push(vec![f]);
        }
    }
    islands.extend(groups.into_values());

    let mut projected = 0;
    for island in &islands {
        let Some(&first) = island.first() else {
            continue;
        };
        let settings = mesh.faces()[first].uv;
        let to_world = |p: DVec3| {
            if settings.use_world_space {
                world.transform_point3(p)
            } else {
                p
            }
        };

        let direction: DVec3 = island
            .iter()
            .filter_map(|&f| mesh.face_normal(f))
            .map(|n| {
                if settings.use_world_space {
                    world.transform_vector3(n)
                } else {
                    n
                }
            })
            .sum();
        if direction.length_squared() == 0.0 {
            trace!(face = first, "skipping UV projection of degenerate face");
            continue;
        }

        let mut indices: Vec<usize> = Vec::new();
        for &f in island {
            for i in mesh.faces()[f].distinct_indices() {
                if !indices.contains(&i) {
                    indices.push(i);
                }
            }
        }
        let points: Vec<DVec3> = indices.iter().map(|&i| to_world(mesh.positions()[i])).collect();
        let mut island_uvs = planar_project(&points, direction);
        apply_uv_settings(&mut island_uvs, &settings);

        for (&i, uv) in indices.iter().zip(island_uvs) {
            uvs[i] = uv;
        }
        projected += 1;
    }

    mesh.set_uv0(Some(uvs))?;
    Ok(projected)
}

/// Applies fill, scale, rotation, anchor, flip, swap and offset to one
/// projected island, in that order.
///
/// # Example
///
/// ```rust
/// use glam::DVec2;
/// use polymesh::mesh::{AutoUv, Fill};
/// use polymesh::uv::apply_uv_settings;
///
/// let mut uvs = vec![DVec2::new(0.0, 0.0), DVec2::new(4.0, 2.0)];
/// let settings = AutoUv { fill: Fill::Stretch, ..AutoUv::default() };
/// apply_uv_settings(&mut uvs, &settings);
/// assert_eq!(uvs[1], DVec2::new(1.0, 1.0));
/// ```
pub fn apply_uv_settings(uvs: &mut [DVec2], settings: &AutoUv) {
    let Some((min, max)) = bounds(uvs) else {
        return;
    };
    let size = max - min;
    let mut center = (min + max) * 0.5;

    match settings.fill {
        Fill::Tile => {}
        Fill::Fit => {
            let largest = size.max_element();
            if largest > 0.0 {
                uvs.iter_mut().for_each(|uv| *uv /= largest);
                center /= largest;
            }
        }
        Fill::Stretch => {
            let divisor = DVec2::new(nonzero(size.x), nonzero(size.y));
            uvs.iter_mut().for_each(|uv| *uv /= divisor);
            center /= divisor;
        }
    }

    if settings.scale != DVec2::ONE || settings.rotation != 0.0 {
        // Rotation pivots on the scaled bounds center.
        let pivot = center * settings.scale;
        let rotation = DVec2::from_angle(settings.rotation.to_radians());
        for uv in uvs.iter_mut() {
            *uv = pivot + rotation.rotate(*uv * settings.scale - pivot);
        }
    }

    if !settings.use_world_space && settings.anchor != Anchor::None {
        apply_anchor(uvs, settings.anchor);
    }

    if settings.flip_u || settings.flip_v || settings.swap_uv {
        for uv in uvs.iter_mut() {
            let u = if settings.flip_u { -uv.x } else { uv.x };
            let v = if settings.flip_v { -uv.y } else { uv.y };
            *uv = if settings.swap_uv {
                DVec2::new(v, u)
            } else {
                DVec2::new(u, v)
            };
        }
    }

    for uv in uvs.iter_mut() {
        *uv -= settings.offset;
    }
}

fn nonzero(value: f64) -> f64 {
    if value == 0.0 {
        1.0
    } else {
        value
    }
}

fn bounds(uvs: &[DVec2]) -> Option<(DVec2, DVec2)> {
    let first = *uvs.first()?;
    Some(
        uvs.iter()
            .fold((first, first), |(lo, hi), &uv| (lo.min(uv), hi.max(uv))),
    )
}

/// Moves the island so the anchored side of its bounds sits on the unit
/// square's matching side.
fn apply_anchor(uvs: &mut [DVec2], anchor: Anchor) {
    let Some((min, max)) = bounds(uvs) else {
        return;
    };
    let mid = (min + max) * 0.5 - DVec2::splat(0.5);

    let x = match anchor {
        Anchor::UpperLeft | Anchor::MiddleLeft | Anchor::LowerLeft => min.x,
        Anchor::UpperRight | Anchor::MiddleRight | Anchor::LowerRight => max.x - 1.0,
        _ => mid.x,
    };
    let y = match anchor {
        Anchor::UpperLeft | Anchor::UpperCenter | Anchor::UpperRight => max.y - 1.0,
        Anchor::MiddleLeft | Anchor::MiddleCenter | Anchor::MiddleRight => mid.y,
        _ => min.y,
    };

    let shift = DVec2::new(x, y);
    for uv in uvs.iter_mut() {
        *uv -= shift;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Face;
    use approx::assert_relative_eq;

    fn square(offset: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(offset, offset),
            DVec2::new(offset + 2.0, offset),
            DVec2::new(offset + 2.0, offset + 2.0),
            DVec2::new(offset, offset + 2.0),
        ]
    }

    fn quad_mesh() -> EditableMesh {
        let positions = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(2.0, 3.0, 0.0),
            DVec3::new(0.0, 3.0, 0.0),
        ];
        EditableMesh::from_positions(positions, vec![Face::new(vec![0, 1, 2, 0, 2, 3])]).unwrap()
    }

    #[test]
    fn test_fit_keeps_aspect() {
        let mut uvs = vec![DVec2::ZERO, DVec2::new(4.0, 2.0)];
        apply_uv_settings(&mut uvs, &AutoUv { fill: Fill::Fit, ..AutoUv::default() });
        assert_relative_eq!(uvs[1], DVec2::new(1.0, 0.5));
    }

    #[test]
    fn test_anchor_lower_left() {
        let mut uvs = square(3.0);
        apply_uv_settings(
            &mut uvs,
            &AutoUv {
                anchor: Anchor::LowerLeft,
                ..AutoUv::default()
            },
        );
        assert_relative_eq!(uvs[0], DVec2::ZERO);
        assert_relative_eq!(uvs[2], DVec2::new(2.0, 2.0));
    }

    #[test]
    fn test_anchor_upper_right() {
        let mut uvs = square(0.0);
        apply_uv_settings(
            &mut uvs,
            &AutoUv {
                anchor: Anchor::UpperRight,
                ..AutoUv::default()
            },
        );
        assert_relative_eq!(uvs[2], DVec2::ONE);
    }

    #[test]
    fn test_flip_swap_and_offset() {
        let mut uvs = vec![DVec2::new(1.0, 2.0)];
        apply_uv_settings(
            &mut uvs,
            &AutoUv {
                flip_u: true,
                swap_uv: true,
                offset: DVec2::new(0.5, 0.5),
                ..AutoUv::default()
            },
        );
        assert_relative_eq!(uvs[0], DVec2::new(1.5, -1.5));
    }

    #[test]
    fn test_rotation_preserves_extent() {
        let mut uvs = square(0.0);
        apply_uv_settings(
            &mut uvs,
            &AutoUv {
                rotation: 90.0,
                ..AutoUv::default()
            },
        );
        let (min, max) = bounds(&uvs).unwrap();
        assert_relative_eq!(max - min, DVec2::new(2.0, 2.0), epsilon = 1e-12);
        assert_relative_eq!((min + max) * 0.5, DVec2::ONE, epsilon = 1e-12);
    }

    #[test]
    fn test_refresh_projects_face_plane() {
        let mut mesh = quad_mesh();
        assert_eq!(refresh_uvs(&mut mesh, &DMat4::IDENTITY).unwrap(), 1);
        let uvs = mesh.uv0().unwrap();
        assert_relative_eq!(uvs[2], DVec2::new(2.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_refresh_skips_manual_faces() {
        let mut mesh = quad_mesh();
        mesh.faces_mut()[0].manual_uv = true;
        mesh.set_uv0(Some(vec![DVec2::splat(7.0); 4])).unwrap();
        assert_eq!(refresh_uvs(&mut mesh, &DMat4::IDENTITY).unwrap(), 0);
        assert_eq!(mesh.uv0().unwrap()[0], DVec2::splat(7.0));
    }

    #[test]
    fn test_world_space_uses_transform() {
        let mut mesh = quad_mesh();
        mesh.faces_mut()[0].uv.use_world_space = true;
        let world = DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0));
        refresh_uvs(&mut mesh, &world).unwrap();
        assert_relative_eq!(mesh.uv0().unwrap()[0], DVec2::new(10.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_texture_group_projects_once() {
        let positions = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(2.0, 1.0, 0.0),
        ];
        let mut a = Face::new(vec![0, 1, 2]);
        let mut b = Face::new(vec![3, 4, 5]);
        a.texture_group = 4;
        b.texture_group = 4;
        b.uv.anchor = Anchor::LowerLeft;
        let mut mesh = EditableMesh::from_positions(positions, vec![a, b]).unwrap();
        assert_eq!(refresh_uvs(&mut mesh, &DMat4::IDENTITY).unwrap(), 1);
        let uvs = mesh.uv0().unwrap();
        assert_relative_eq!(uvs[4], DVec2::new(2.0, 0.0), epsilon = 1e-12);
    }
}
