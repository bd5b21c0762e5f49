//! # Mesh Compiler
//!
//! Collapses an [`EditableMesh`] into a render-ready vertex buffer and one
//! index buffer per submesh (material).
//!
//! ## Vertex Collapse
//!
//! With `collapse_duplicates`, vertices are merged when they belong to the
//! same shared-vertex group **and** carry identical normal, UVs, color and
//! tangent (compared after quantizing to `ATTRIBUTE_EPSILON`). Vertices on a
//! UV seam or a hard edge therefore stay distinct. Quad submeshes are never
//! collapsed.
//!
//! ## Hook
//!
//! A [`CompileHook`] lets the host opt a mesh out of collapsing. The mesh is
//! still compiled and the result carries [`CompileStatus::OptimizationSkipped`].

use std::collections::{BTreeMap, HashMap};

use config::constants::ATTRIBUTE_EPSILON;
use glam::DVec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};
use crate::mesh::{EditableMesh, Face, Vertex};
use crate::smoothing::compute_normals;

// =============================================================================
// OPTIONS & OUTPUT
// =============================================================================

/// Primitive type of a submesh index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeshTopology {
    /// Three indices per triangle.
    #[default]
    Triangles,
    /// Four indices per quad.
    Quads,
}

/// Compiler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Merge coincident vertices with identical attributes.
    pub collapse_duplicates: bool,
    /// Preferred topology. A submesh is emitted as quads only when every one
    /// of its faces is a quad.
    pub topology: MeshTopology,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            collapse_duplicates: true,
            topology: MeshTopology::Triangles,
        }
    }
}

/// Host callback consulted before vertex collapse.
pub trait CompileHook: Sync {
    /// Returns true to compile `mesh` without collapsing duplicates.
    fn skip_optimization(&self, mesh: &EditableMesh) -> bool;
}

/// Outcome of a successful compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStatus {
    /// Compiled with the requested options.
    Complete,
    /// Compiled, but the hook vetoed collapsing duplicates.
    OptimizationSkipped,
}

/// One material's index buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submesh {
    /// Material (submesh) index.
    pub material: usize,
    /// Primitive type of `indices`.
    pub topology: MeshTopology,
    /// Indices into [`CompiledMesh::vertices`].
    pub indices: Vec<usize>,
}

/// Render-ready mesh.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompiledMesh {
    /// Vertex buffer; every vertex carries a normal.
    pub vertices: Vec<Vertex>,
    /// Index buffers ordered by material.
    pub submeshes: Vec<Submesh>,
}

impl CompiledMesh {
    /// Number of triangles across all submeshes, counting a quad as two.
    pub fn triangle_count(&self) -> usize {
        self.submeshes
            .iter()
            .map(|s| match s.topology {
                MeshTopology::Triangles => s.indices.len() / 3,
                MeshTopology::Quads => s.indices.len() / 4 * 2,
            })
            .sum()
    }
}

// =============================================================================
// COMPILE
// =============================================================================

type Quantized = [i64; 4];

/// Attribute identity of a vertex within its shared group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CollapseKey {
    group: usize,
    normal: Option<Quantized>,
    uv0: Option<Quantized>,
    uv1: Option<Quantized>,
    color: Option<Quantized>,
    tangent: Option<Quantized>,
}

fn quantize(values: [f64; 4]) -> Quantized {
    values.map(|v| (v / ATTRIBUTE_EPSILON).round() as i64)
}

impl CollapseKey {
    fn new(group: usize, v: &Vertex) -> Self {
        Self {
            group,
            normal: v.normal.map(|n| quantize([n.x, n.y, n.z, 0.0])),
            uv0: v.uv0.map(|uv| quantize([uv.x, uv.y, 0.0, 0.0])),
            uv1: v.uv1.map(|uv| quantize([uv.x, uv.y, 0.0, 0.0])),
            color: v.color.map(|c| quantize(c.as_dvec4().to_array())),
            tangent: v.tangent.map(|t| quantize(t.to_array())),
        }
    }
}

/// Emits output vertices in first-use order.
struct VertexBuffer<'a> {
    source: &'a [Vertex],
    vertices: Vec<Vertex>,
    by_source: HashMap<usize, usize>,
    by_key: HashMap<CollapseKey, usize>,
}

impl<'a> VertexBuffer<'a> {
    fn new(source: &'a [Vertex]) -> Self {
        Self {
            source,
            vertices: Vec::new(),
            by_source: HashMap::new(),
            by_key: HashMap::new(),
        }
    }

    fn emit(&mut self, index: usize, collapse: Option<usize>) -> usize {
        if let Some(&out) = self.by_source.get(&index) {
            return out;
        }
        let vertex = self.source[index];
        let out = match collapse {
            Some(group) => {
                let key = CollapseKey::new(group, &vertex);
                let next = self.vertices.len();
                let out = *self.by_key.entry(key).or_insert(next);
                if out == next {
                    self.vertices.push(vertex);
                }
                out
            }
            None => {
                self.vertices.push(vertex);
                self.vertices.len() - 1
            }
        };
        self.by_source.insert(index, out);
        out
    }
}

/// Compiles `mesh` into vertex and index buffers.
///
/// Normals come from the mesh when it has them, otherwise from face
/// geometry and smoothing groups.
///
/// # Example
///
/// ```rust
/// use polymesh::compile::{compile, CompileOptions, CompileStatus};
/// use polymesh::primitives::Shape;
///
/// let cube = Shape::cube(1.0).generate().unwrap();
/// let (compiled, status) = compile(&cube, &CompileOptions::default(), None).unwrap();
/// assert_eq!(status, CompileStatus::Complete);
/// assert_eq!(compiled.vertices.len(), 24);
/// assert_eq!(compiled.triangle_count(), 12);
/// ```
pub fn compile(
    mesh: &EditableMesh,
    options: &CompileOptions,
    hook: Option<&dyn CompileHook>,
) -> MeshResult<(CompiledMesh, CompileStatus)> {
    mesh.validate()?;

    let skipped = options.collapse_duplicates && hook.is_some_and(|h| h.skip_optimization(mesh));
    if skipped {
        warn!(faces = mesh.face_count(), "mesh optimization skipped by hook");
    }
    let collapse = options.collapse_duplicates && !skipped;

    let normals: Vec<DVec3> = match mesh.normals() {
        Some(normals) => normals.to_vec(),
        None => compute_normals(mesh)?,
    };
    let source: Vec<Vertex> = mesh
        .vertices()
        .into_iter()
        .zip(normals)
        .map(|(mut v, n)| {
            v.normal = Some(n);
            v
        })
        .collect();
    let lookup = mesh.shared_lookup()?;

    let mut buckets: BTreeMap<usize, Vec<&Face>> = BTreeMap::new();
    for face in mesh.faces() {
        buckets.entry(face.submesh).or_default().push(face);
    }

    let mut buffer = VertexBuffer::new(&source);
    let mut submeshes = Vec::with_capacity(buckets.len());

    for (material, faces) in buckets {
        let quads: Option<Vec<[usize; 4]>> = match options.topology {
            MeshTopology::Quads => faces.iter().map(|f| f.to_quad()).collect(),
            MeshTopology::Triangles => None,
        };

        let submesh = match quads {
            Some(quads) => Submesh {
                material,
                topology: MeshTopology::Quads,
                indices: quads
                    .into_iter()
                    .flatten()
                    .map(|i| buffer.emit(i, None))
                    .collect(),
            },
            None => {
                let mut indices = Vec::new();
                for face in faces {
                    for &i in face.indices() {
                        let group = if collapse {
                            Some(lookup.get(i).ok_or(MeshError::IndexOutOfRange {
                                index: i,
                                len: lookup.len(),
                            })?)
                        } else {
                            None
                        };
                        indices.push(buffer.emit(i, group));
                    }
                }
                Submesh {
                    material,
                    topology: MeshTopology::Triangles,
                    indices,
                }
            }
        };
        submeshes.push(submesh);
    }

    let compiled = CompiledMesh {
        vertices: buffer.vertices,
        submeshes,
    };
    debug!(
        source_vertices = mesh.vertex_count(),
        vertices = compiled.vertices.len(),
        submeshes = compiled.submeshes.len(),
        "compiled mesh"
    );

    let status = if skipped {
        CompileStatus::OptimizationSkipped
    } else {
        CompileStatus::Complete
    };
    Ok((compiled, status))
}

/// Converts a compiled mesh back to per-face form: one face per submesh,
/// quads split into two triangles, positions welded with the default
/// tolerance and normals kept as explicit normals.
pub fn decompile(compiled: &CompiledMesh) -> MeshResult<EditableMesh> {
    let mut faces = Vec::with_capacity(compiled.submeshes.len());
    for submesh in &compiled.submeshes {
        let indices = match submesh.topology {
            MeshTopology::Triangles => submesh.indices.clone(),
            MeshTopology::Quads => {
                if submesh.indices.len() % 4 != 0 {
                    return Err(MeshError::invalid_parameter(format!(
                        "quad submesh {} has {} indices",
                        submesh.material,
                        submesh.indices.len()
                    )));
                }
                submesh
                    .indices
                    .chunks_exact(4)
                    .flat_map(|q| [q[0], q[1], q[2], q[0], q[2], q[3]])
                    .collect()
            }
        };
        if indices.is_empty() {
            continue;
        }
        let mut face = Face::new(indices);
        face.submesh = submesh.material;
        face.manual_uv = true;
        faces.push(face);
    }
    EditableMesh::from_vertices(&compiled.vertices, faces)
}

/// Compiles independent meshes in parallel.
pub fn compile_all(
    meshes: &[EditableMesh],
    options: &CompileOptions,
    hook: Option<&dyn CompileHook>,
) -> Vec<MeshResult<(CompiledMesh, CompileStatus)>> {
    meshes
        .par_iter()
        .map(|mesh| compile(mesh, options, hook))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Shape;
    use glam::DVec2;

    struct Veto;

    impl CompileHook for Veto {
        fn skip_optimization(&self, _mesh: &EditableMesh) -> bool {
            true
        }
    }

    /// Two triangles of a quad stored as separate faces with duplicated
    /// diagonal vertices.
    fn split_quad() -> EditableMesh {
        let positions = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        EditableMesh::from_positions(
            positions,
            vec![Face::new(vec![0, 1, 2]), Face::new(vec![3, 4, 5])],
        )
        .unwrap()
    }

    #[test]
    fn test_collapses_coplanar_duplicates() {
        let mesh = split_quad();
        let (compiled, _) = compile(&mesh, &CompileOptions::default(), None).unwrap();
        assert_eq!(compiled.vertices.len(), 4);
        assert_eq!(compiled.submeshes[0].indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_keeps_uv_seams() {
        let mut mesh = split_quad();
        mesh.set_uv0(Some(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(5.0, 5.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
        ]))
        .unwrap();
        let (compiled, _) = compile(&mesh, &CompileOptions::default(), None).unwrap();
        assert_eq!(compiled.vertices.len(), 5);
    }

    #[test]
    fn test_keeps_hard_edges() {
        let cube = Shape::cube(2.0).generate().unwrap();
        let (compiled, _) = compile(&cube, &CompileOptions::default(), None).unwrap();
        assert_eq!(compiled.vertices.len(), 24);
        assert!(compiled.vertices.iter().all(|v| v.normal.is_some()));
    }

    #[test]
    fn test_hook_skips_collapse() {
        let mesh = split_quad();
        let (compiled, status) = compile(&mesh, &CompileOptions::default(), Some(&Veto)).unwrap();
        assert_eq!(status, CompileStatus::OptimizationSkipped);
        assert_eq!(compiled.vertices.len(), 6);
    }

    #[test]
    fn test_submeshes_ordered_by_material() {
        let mut mesh = split_quad();
        mesh.faces_mut()[0].submesh = 3;
        mesh.faces_mut()[1].submesh = 1;
        let (compiled, _) = compile(&mesh, &CompileOptions::default(), None).unwrap();
        let materials: Vec<usize> = compiled.submeshes.iter().map(|s| s.material).collect();
        assert_eq!(materials, vec![1, 3]);
    }

    #[test]
    fn test_quad_topology() {
        let cube = Shape::cube(1.0).generate().unwrap();
        let options = CompileOptions {
            topology: MeshTopology::Quads,
            ..CompileOptions::default()
        };
        let (compiled, _) = compile(&cube, &options, None).unwrap();
        assert_eq!(compiled.submeshes[0].topology, MeshTopology::Quads);
        assert_eq!(compiled.submeshes[0].indices.len(), 24);
        assert_eq!(compiled.triangle_count(), 12);
    }

    #[test]
    fn test_quad_topology_falls_back_for_triangles() {
        let options = CompileOptions {
            topology: MeshTopology::Quads,
            ..CompileOptions::default()
        };
        let (compiled, _) = compile(&split_quad(), &options, None).unwrap();
        assert_eq!(compiled.submeshes[0].topology, MeshTopology::Triangles);
    }

    #[test]
    fn test_decompile_rejects_ragged_quads() {
        let compiled = CompiledMesh {
            vertices: vec![Vertex::new(DVec3::ZERO); 3],
            submeshes: vec![Submesh {
                material: 0,
                topology: MeshTopology::Quads,
                indices: vec![0, 1, 2],
            }],
        };
        assert!(decompile(&compiled).is_err());
    }

    #[test]
    fn test_compile_all_matches_serial() {
        let meshes = vec![split_quad(), Shape::cube(1.0).generate().unwrap()];
        let options = CompileOptions::default();
        let results = compile_all(&meshes, &options, None);
        assert_eq!(results.len(), 2);
        for (mesh, result) in meshes.iter().zip(results) {
            assert_eq!(result.unwrap(), compile(mesh, &options, None).unwrap());
        }
    }

    #[test]
    fn test_compiled_mesh_serializes() {
        let (compiled, _) = compile(&split_quad(), &CompileOptions::default(), None).unwrap();
        let json = serde_json::to_string(&compiled).unwrap();
        let back: CompiledMesh = serde_json::from_str(&json).unwrap();
        assert_eq!(back, compiled);
    }
}
