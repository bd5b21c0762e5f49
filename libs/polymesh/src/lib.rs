//! # Polymesh
//!
//! Editable polygon meshes with shared-vertex topology, and a BSP boolean
//! kernel on top of them.
//!
//! ## Architecture
//!
//! ```text
//! primitives ──► EditableMesh ──► compile ──► CompiledMesh
//!                  │    ▲
//!       weld/topology   rebuild / smoothing / uv
//!                  │    │
//!                  └► ops::boolean (BSP CSG) ─┘
//! ```
//!
//! ## Modules
//!
//! - [`mesh`]: vertices, faces and the [`EditableMesh`] container
//! - [`weld`]: shared-vertex groups (coincident vertex sets)
//! - [`topology`]: winged-edge adjacency snapshot
//! - [`triangulate`]: planar projection and ear clipping
//! - [`rebuild`]: transactional face replacement and splitting
//! - [`smoothing`]: smoothing groups and per-vertex normals
//! - [`uv`]: automatic planar UV projection
//! - [`compile`]: flattening to vertex and submesh index buffers
//! - [`ops`]: boolean operations, measurement and cleanup
//! - [`primitives`]: cube, plane, cylinder and cone generators
//!
//! ## Usage
//!
//! ```rust
//! use glam::DVec3;
//! use polymesh::compile::{compile, CompileOptions};
//! use polymesh::ops::{subtract, CsgOptions};
//! use polymesh::primitives::Shape;
//!
//! let block = Shape::cube(2.0).generate().unwrap();
//! let mut tool = Shape::cube(1.0).generate().unwrap();
//! tool.translate(DVec3::splat(1.0));
//!
//! let (carved, _) = subtract(&block, &tool, &CsgOptions::default()).unwrap();
//! let (compiled, _) = compile(&carved, &CompileOptions::default(), None).unwrap();
//! assert!(compiled.triangle_count() > 12);
//! ```

pub mod compile;
pub mod error;
pub mod mesh;
pub mod ops;
pub mod primitives;
pub mod rebuild;
pub mod smoothing;
pub mod topology;
pub mod triangulate;
pub mod uv;
pub mod weld;

pub use compile::{compile, decompile, CompileOptions, CompiledMesh, MeshTopology};
pub use error::{MeshError, MeshResult, TriangulationError};
pub use mesh::{EditableMesh, Face, Vertex};
pub use primitives::Shape;
pub use topology::WingedEdgeGraph;
pub use weld::SharedVertex;
