//! # Mesh Data Model
//!
//! Authoritative editable mesh record: per-vertex attribute arrays, faces stored
//! as triangle lists, and the shared-vertex groups that tie positionally
//! coincident vertices together.
//!
//! ## Ownership
//!
//! Vertices are owned by exactly one mesh and addressed by their position in
//! the mesh arrays. Faces normally own their vertices exclusively (no two faces
//! reference the same vertex index); connectivity between faces comes from the
//! shared-vertex groups, not from shared indices.
//!
//! ## Derived Data
//!
//! Edges, perimeters, normals and adjacency are derived on demand and never
//! cached on the mesh.

use std::collections::HashMap;

use config::constants::{EPSILON, WELD_EPSILON};
use glam::{DMat4, DVec2, DVec3, DVec4, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};
use crate::weld::{self, SharedVertex, SharedVertexLookup};

// =============================================================================
// VERTEX
// =============================================================================

/// A single vertex with all optional attributes gathered together.
///
/// This is the value type used when reading from or appending to an
/// [`EditableMesh`]; the mesh itself stores attributes in parallel arrays.
///
/// # Example
///
/// ```rust
/// use glam::{DVec2, DVec3};
/// use polymesh::mesh::Vertex;
///
/// let a = Vertex::new(DVec3::ZERO).with_uv0(DVec2::ZERO);
/// let b = Vertex::new(DVec3::X).with_uv0(DVec2::ONE);
/// let mid = a.lerp(&b, 0.5);
/// assert_eq!(mid.position, DVec3::new(0.5, 0.0, 0.0));
/// assert_eq!(mid.uv0, Some(DVec2::splat(0.5)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    /// Position in model space.
    pub position: DVec3,
    /// Unit normal.
    pub normal: Option<DVec3>,
    /// Primary texture coordinate.
    pub uv0: Option<DVec2>,
    /// Secondary texture coordinate (lightmaps).
    pub uv1: Option<DVec2>,
    /// Linear RGBA color.
    pub color: Option<Vec4>,
    /// Tangent with handedness in `w`.
    pub tangent: Option<DVec4>,
}

impl Vertex {
    /// Creates a vertex with only a position.
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Returns this vertex with a normal.
    pub fn with_normal(mut self, normal: DVec3) -> Self {
        self.normal = Some(normal);
        self
    }

    /// Returns this vertex with a primary UV.
    pub fn with_uv0(mut self, uv: DVec2) -> Self {
        self.uv0 = Some(uv);
        self
    }

    /// Returns this vertex with a color.
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = Some(color);
        self
    }

    /// Linearly interpolates every attribute toward `other`.
    ///
    /// Attributes present on only one side are carried over unchanged.
    /// Interpolated normals are renormalized.
    pub fn lerp(&self, other: &Vertex, t: f64) -> Vertex {
        Vertex {
            position: self.position.lerp(other.position, t),
            normal: mix(self.normal, other.normal, |a, b| {
                a.lerp(b, t).normalize_or_zero()
            }),
            uv0: mix(self.uv0, other.uv0, |a, b| a.lerp(b, t)),
            uv1: mix(self.uv1, other.uv1, |a, b| a.lerp(b, t)),
            color: mix(self.color, other.color, |a, b| a.lerp(b, t as f32)),
            tangent: mix(self.tangent, other.tangent, |a, b| a.lerp(b, t)),
        }
    }

    /// Averages a set of vertices. Returns `None` for an empty slice.
    ///
    /// Each attribute is averaged over the vertices that carry it.
    pub fn average(vertices: &[Vertex]) -> Option<Vertex> {
        if vertices.is_empty() {
            return None;
        }
        let count = vertices.len() as f64;
        let position = vertices.iter().map(|v| v.position).sum::<DVec3>() / count;
        let normal = average_of(vertices.iter().filter_map(|v| v.normal))
            .map(DVec3::normalize_or_zero);
        let uv0 = average_of(vertices.iter().filter_map(|v| v.uv0));
        let uv1 = average_of(vertices.iter().filter_map(|v| v.uv1));
        let tangent = average_of(vertices.iter().filter_map(|v| v.tangent));
        let colors: Vec<Vec4> = vertices.iter().filter_map(|v| v.color).collect();
        let color = if colors.is_empty() {
            None
        } else {
            Some(colors.iter().copied().sum::<Vec4>() / colors.len() as f32)
        };
        Some(Vertex {
            position,
            normal,
            uv0,
            uv1,
            color,
            tangent,
        })
    }
}

fn mix<T: Copy>(a: Option<T>, b: Option<T>, f: impl FnOnce(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

fn average_of<T>(values: impl Iterator<Item = T>) -> Option<T>
where
    T: std::ops::Add<Output = T> + std::ops::Div<f64, Output = T> + Copy,
{
    let mut count = 0usize;
    let mut sum: Option<T> = None;
    for value in values {
        count += 1;
        sum = Some(match sum {
            Some(s) => s + value,
            None => value,
        });
    }
    sum.map(|s| s / count as f64)
}

// =============================================================================
// EDGE
// =============================================================================

/// A directed pair of vertex indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    /// Start vertex.
    pub a: usize,
    /// End vertex.
    pub b: usize,
}

impl Edge {
    /// Creates a directed edge.
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }

    /// Returns the same edge with `a <= b`.
    pub fn canonical(self) -> Self {
        if self.a <= self.b {
            self
        } else {
            Self::new(self.b, self.a)
        }
    }

    /// Returns the edge pointing the other way.
    pub fn reversed(self) -> Self {
        Self::new(self.b, self.a)
    }

    /// True if either endpoint is `index`.
    pub fn contains(self, index: usize) -> bool {
        self.a == index || self.b == index
    }
}

/// Orders edges so each edge starts where the previous one ended.
///
/// Disconnected loops are emitted one after another.
pub fn sort_edges_by_adjacency(edges: Vec<Edge>) -> Vec<Edge> {
    let mut remaining = edges;
    let mut sorted = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut current = remaining.remove(0);
        sorted.push(current);
        while let Some(pos) = remaining.iter().position(|e| e.a == current.b) {
            current = remaining.remove(pos);
            sorted.push(current);
        }
    }

    sorted
}

// =============================================================================
// AUTO UV SETTINGS
// =============================================================================

/// How projected UVs are fitted to the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Fill {
    /// Uniformly scaled to fit `0..1` keeping aspect ratio.
    Fit,
    /// World-scale coordinates, repeated.
    #[default]
    Tile,
    /// Each axis independently stretched to `0..1`.
    Stretch,
}

/// Where projected UV bounds are pinned inside the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Anchor {
    UpperLeft,
    UpperCenter,
    UpperRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
    #[default]
    None,
}

/// Procedural UV parameters stored per face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoUv {
    /// Project from world space instead of model space.
    pub use_world_space: bool,
    /// Mirror horizontally.
    pub flip_u: bool,
    /// Mirror vertically.
    pub flip_v: bool,
    /// Exchange U and V.
    pub swap_uv: bool,
    /// Fit mode.
    pub fill: Fill,
    /// Scale applied around the UV bounds center.
    pub scale: DVec2,
    /// Subtracted after every other transform.
    pub offset: DVec2,
    /// Rotation in degrees around the UV bounds center.
    pub rotation: f64,
    /// Bounds anchor.
    pub anchor: Anchor,
}

impl Default for AutoUv {
    fn default() -> Self {
        Self {
            use_world_space: false,
            flip_u: false,
            flip_v: false,
            swap_uv: false,
            fill: Fill::Tile,
            scale: DVec2::ONE,
            offset: DVec2::ZERO,
            rotation: 0.0,
            anchor: Anchor::None,
        }
    }
}

// =============================================================================
// FACE
// =============================================================================

/// A polygon stored as a triangle list plus editing metadata.
///
/// # Example
///
/// ```rust
/// use polymesh::mesh::Face;
///
/// let quad = Face::new(vec![0, 1, 2, 0, 2, 3]);
/// assert_eq!(quad.triangle_count(), 2);
/// assert_eq!(quad.perimeter_loop(), Some(vec![0, 1, 2, 3]));
/// assert_eq!(quad.to_quad(), Some([0, 1, 2, 3]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    indices: Vec<usize>,
    /// Submesh (material) index.
    pub submesh: usize,
    /// Smoothing group; see [`crate::smoothing`].
    pub smoothing_group: i32,
    /// Faces sharing a positive texture group are UV-projected together.
    pub texture_group: i32,
    /// When set, UVs are user-authored and never regenerated.
    pub manual_uv: bool,
    /// Procedural UV settings.
    pub uv: AutoUv,
}

impl Face {
    /// Creates a face from a triangle list with default metadata.
    pub fn new(indices: Vec<usize>) -> Self {
        Self {
            indices,
            submesh: 0,
            smoothing_group: 0,
            texture_group: 0,
            manual_uv: false,
            uv: AutoUv::default(),
        }
    }

    /// Creates a face with the same metadata as `origin`.
    pub fn with_metadata_from(indices: Vec<usize>, origin: &Face) -> Self {
        Self {
            indices,
            submesh: origin.submesh,
            smoothing_group: origin.smoothing_group,
            texture_group: origin.texture_group,
            manual_uv: origin.manual_uv,
            uv: origin.uv,
        }
    }

    /// Triangle list indices.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Replaces the triangle list.
    pub fn set_indices(&mut self, indices: Vec<usize>) {
        self.indices = indices;
    }

    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterates triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Distinct indices in order of first appearance.
    pub fn distinct_indices(&self) -> Vec<usize> {
        let mut seen = Vec::with_capacity(self.indices.len());
        for &i in &self.indices {
            if !seen.contains(&i) {
                seen.push(i);
            }
        }
        seen
    }

    /// True if `index` is referenced by this face.
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Perimeter edges (edges used by exactly one triangle), sorted by adjacency.
    pub fn edges(&self) -> Vec<Edge> {
        let mut counts: HashMap<Edge, usize> = HashMap::new();
        let mut directed = Vec::with_capacity(self.indices.len());

        for [a, b, c] in self.triangles() {
            for edge in [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)] {
                *counts.entry(edge.canonical()).or_insert(0) += 1;
                directed.push(edge);
            }
        }

        let perimeter = directed
            .into_iter()
            .filter(|e| counts.get(&e.canonical()).copied() == Some(1))
            .collect();

        sort_edges_by_adjacency(perimeter)
    }

    /// The single closed perimeter loop, or `None` if the perimeter is
    /// empty or splits into several loops.
    pub fn perimeter_loop(&self) -> Option<Vec<usize>> {
        let edges = self.edges();
        if edges.len() < 3 {
            return None;
        }
        let closed = edges
            .windows(2)
            .all(|w| w[0].b == w[1].a);
        let wraps = edges.last().map(|e| e.b) == edges.first().map(|e| e.a);
        if closed && wraps {
            Some(edges.iter().map(|e| e.a).collect())
        } else {
            None
        }
    }

    /// Returns the four corners if this face is two triangles forming a quad.
    pub fn to_quad(&self) -> Option<[usize; 4]> {
        if self.indices.len() != 6 {
            return None;
        }
        match self.perimeter_loop()?.as_slice() {
            &[a, b, c, d] => Some([a, b, c, d]),
            _ => None,
        }
    }

    /// Reverses winding of every triangle.
    pub fn reverse(&mut self) {
        self.indices.reverse();
    }

    pub(crate) fn remap_indices(&mut self, remap: &[usize]) {
        for i in &mut self.indices {
            *i = remap[*i];
        }
    }

    pub(crate) fn offset_indices(&mut self, offset: usize) {
        for i in &mut self.indices {
            *i += offset;
        }
    }
}

// =============================================================================
// EDITABLE MESH
// =============================================================================

/// The authoritative mesh record edited by every kernel operation.
///
/// Invariants, checked by [`EditableMesh::validate`]:
/// - every face index list is a non-empty multiple of three and in range
/// - shared vertex groups (and shared UV groups) partition `0..vertex_count`
/// - attribute arrays, when present, have one entry per vertex
///
/// # Example
///
/// ```rust
/// use glam::DVec3;
/// use polymesh::mesh::{EditableMesh, Face};
///
/// let positions = vec![DVec3::ZERO, DVec3::X, DVec3::Y];
/// let mesh = EditableMesh::from_positions(positions, vec![Face::new(vec![0, 1, 2])]).unwrap();
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.shared_vertices().len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditableMesh {
    positions: Vec<DVec3>,
    faces: Vec<Face>,
    shared_vertices: Vec<SharedVertex>,
    shared_uvs: Vec<SharedVertex>,
    normals: Option<Vec<DVec3>>,
    uv0: Option<Vec<DVec2>>,
    uv1: Option<Vec<DVec2>>,
    colors: Option<Vec<Vec4>>,
    tangents: Option<Vec<DVec4>>,
}

impl EditableMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mesh from positions and faces, welding coincident positions
    /// with the default tolerance.
    pub fn from_positions(positions: Vec<DVec3>, faces: Vec<Face>) -> MeshResult<Self> {
        let vertices: Vec<Vertex> = positions.into_iter().map(Vertex::new).collect();
        Self::from_vertices(&vertices, faces)
    }

    /// Creates a mesh from full vertices and faces, welding coincident
    /// positions with the default tolerance.
    ///
    /// An attribute array is created when any vertex carries that attribute;
    /// vertices without it get a zero value.
    pub fn from_vertices(vertices: &[Vertex], faces: Vec<Face>) -> MeshResult<Self> {
        let mut mesh = Self::new();
        mesh.push_vertices(vertices);
        mesh.faces = faces;
        mesh.shared_uvs = weld::singleton_groups(mesh.vertex_count());
        mesh.shared_vertices =
            weld::build_shared_vertices(&mesh.positions, WELD_EPSILON)?.groups;
        mesh.validate()?;
        Ok(mesh)
    }

    /// Creates a mesh from explicit parts, validating every invariant.
    pub fn from_parts(
        positions: Vec<DVec3>,
        faces: Vec<Face>,
        shared_vertices: Vec<SharedVertex>,
        shared_uvs: Vec<SharedVertex>,
    ) -> MeshResult<Self> {
        let mesh = Self {
            positions,
            faces,
            shared_vertices,
            shared_uvs,
            ..Self::default()
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Checks face ranges, attribute lengths and the shared-group partitions.
    pub fn validate(&self) -> MeshResult<()> {
        let count = self.vertex_count();

        for (face_index, face) in self.faces.iter().enumerate() {
            let len = face.indices().len();
            if len == 0 || len % 3 != 0 {
                return Err(MeshError::invalid_face(
                    face_index,
                    format!("index count {len} is not a positive multiple of 3"),
                ));
            }
            for &i in face.indices() {
                MeshError::check_index(i, count)?;
            }
        }

        let lengths = [
            self.normals.as_ref().map(Vec::len),
            self.uv0.as_ref().map(Vec::len),
            self.uv1.as_ref().map(Vec::len),
            self.colors.as_ref().map(Vec::len),
            self.tangents.as_ref().map(Vec::len),
        ];
        if let Some(len) = lengths.into_iter().flatten().find(|&len| len != count) {
            return Err(MeshError::invalid_parameter(format!(
                "attribute array has {len} entries for {count} vertices"
            )));
        }

        weld::validate_partition(&self.shared_vertices, count)?;
        weld::validate_partition(&self.shared_uvs, count)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True if the mesh has no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Vertex positions.
    #[inline]
    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    /// Faces.
    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Mutable faces, for metadata edits. Index edits must be followed by
    /// [`EditableMesh::validate`].
    #[inline]
    pub fn faces_mut(&mut self) -> &mut [Face] {
        &mut self.faces
    }

    /// Shared vertex groups.
    #[inline]
    pub fn shared_vertices(&self) -> &[SharedVertex] {
        &self.shared_vertices
    }

    /// Shared UV groups.
    #[inline]
    pub fn shared_uvs(&self) -> &[SharedVertex] {
        &self.shared_uvs
    }

    /// Builds the vertex-to-group lookup for the current shared vertices.
    pub fn shared_lookup(&self) -> MeshResult<SharedVertexLookup> {
        SharedVertexLookup::from_groups(&self.shared_vertices, self.vertex_count())
    }

    /// Replaces the shared vertex groups after checking they partition the
    /// vertex range. The mesh is untouched on error.
    pub fn set_shared_vertices(&mut self, groups: Vec<SharedVertex>) -> MeshResult<()> {
        weld::validate_partition(&groups, self.vertex_count())?;
        self.shared_vertices = groups;
        Ok(())
    }

    /// Replaces the shared UV groups after checking they partition the
    /// vertex range.
    pub fn set_shared_uvs(&mut self, groups: Vec<SharedVertex>) -> MeshResult<()> {
        weld::validate_partition(&groups, self.vertex_count())?;
        self.shared_uvs = groups;
        Ok(())
    }

    pub(crate) fn shared_vertices_mut(&mut self) -> &mut Vec<SharedVertex> {
        &mut self.shared_vertices
    }

    pub(crate) fn shared_uvs_mut(&mut self) -> &mut Vec<SharedVertex> {
        &mut self.shared_uvs
    }

    /// Explicit normals, if any.
    pub fn normals(&self) -> Option<&[DVec3]> {
        self.normals.as_deref()
    }

    /// Primary UVs, if any.
    pub fn uv0(&self) -> Option<&[DVec2]> {
        self.uv0.as_deref()
    }

    /// Secondary UVs, if any.
    pub fn uv1(&self) -> Option<&[DVec2]> {
        self.uv1.as_deref()
    }

    /// Vertex colors, if any.
    pub fn colors(&self) -> Option<&[Vec4]> {
        self.colors.as_deref()
    }

    /// Tangents, if any.
    pub fn tangents(&self) -> Option<&[DVec4]> {
        self.tangents.as_deref()
    }

    /// Sets or clears explicit normals.
    pub fn set_normals(&mut self, normals: Option<Vec<DVec3>>) -> MeshResult<()> {
        check_len(normals.as_ref().map(Vec::len), self.vertex_count())?;
        self.normals = normals;
        Ok(())
    }

    /// Sets or clears primary UVs.
    pub fn set_uv0(&mut self, uvs: Option<Vec<DVec2>>) -> MeshResult<()> {
        check_len(uvs.as_ref().map(Vec::len), self.vertex_count())?;
        self.uv0 = uvs;
        Ok(())
    }

    /// Sets or clears vertex colors.
    pub fn set_colors(&mut self, colors: Option<Vec<Vec4>>) -> MeshResult<()> {
        check_len(colors.as_ref().map(Vec::len), self.vertex_count())?;
        self.colors = colors;
        Ok(())
    }

    /// Gathers every attribute of one vertex.
    pub fn vertex(&self, index: usize) -> Option<Vertex> {
        let position = *self.positions.get(index)?;
        Some(Vertex {
            position,
            normal: self.normals.as_ref().map(|a| a[index]),
            uv0: self.uv0.as_ref().map(|a| a[index]),
            uv1: self.uv1.as_ref().map(|a| a[index]),
            color: self.colors.as_ref().map(|a| a[index]),
            tangent: self.tangents.as_ref().map(|a| a[index]),
        })
    }

    /// All vertices with their attributes.
    pub fn vertices(&self) -> Vec<Vertex> {
        (0..self.vertex_count())
            .filter_map(|i| self.vertex(i))
            .collect()
    }

    /// Overwrites positions and attributes of existing vertices.
    ///
    /// `vertices` must have one entry per vertex. Shared groups are kept.
    pub fn set_vertices(&mut self, vertices: &[Vertex]) -> MeshResult<()> {
        if vertices.len() != self.vertex_count() {
            return Err(MeshError::invalid_parameter(format!(
                "expected {} vertices, got {}",
                self.vertex_count(),
                vertices.len()
            )));
        }
        self.positions.clear();
        self.normals = None;
        self.uv0 = None;
        self.uv1 = None;
        self.colors = None;
        self.tangents = None;
        self.push_vertices(vertices);
        Ok(())
    }

    /// Appends vertices to the attribute arrays and returns the first new index.
    ///
    /// Shared groups are not touched; callers must extend them.
    pub(crate) fn push_vertices(&mut self, vertices: &[Vertex]) -> usize {
        let offset = self.vertex_count();
        extend_attribute(&mut self.normals, offset, vertices.iter().map(|v| v.normal));
        extend_attribute(&mut self.uv0, offset, vertices.iter().map(|v| v.uv0));
        extend_attribute(&mut self.uv1, offset, vertices.iter().map(|v| v.uv1));
        extend_attribute(&mut self.colors, offset, vertices.iter().map(|v| v.color));
        extend_attribute(&mut self.tangents, offset, vertices.iter().map(|v| v.tangent));
        self.positions.extend(vertices.iter().map(|v| v.position));
        offset
    }

    pub(crate) fn set_position(&mut self, index: usize, position: DVec3) {
        self.positions[index] = position;
    }

    pub(crate) fn set_vertex(&mut self, index: usize, vertex: &Vertex) {
        let count = self.vertex_count();
        self.positions[index] = vertex.position;
        set_attribute(&mut self.normals, count, index, vertex.normal);
        set_attribute(&mut self.uv0, count, index, vertex.uv0);
        set_attribute(&mut self.uv1, count, index, vertex.uv1);
        set_attribute(&mut self.colors, count, index, vertex.color);
        set_attribute(&mut self.tangents, count, index, vertex.tangent);
    }

    // -------------------------------------------------------------------------
    // Face editing
    // -------------------------------------------------------------------------

    /// Appends a face referencing existing vertices. Returns its index.
    pub fn add_face(&mut self, face: Face) -> MeshResult<usize> {
        let len = face.indices().len();
        if len == 0 || len % 3 != 0 {
            return Err(MeshError::invalid_face(
                self.faces.len(),
                format!("index count {len} is not a positive multiple of 3"),
            ));
        }
        for &i in face.indices() {
            MeshError::check_index(i, self.vertex_count())?;
        }
        self.faces.push(face);
        Ok(self.faces.len() - 1)
    }

    pub(crate) fn push_face(&mut self, face: Face) -> usize {
        self.faces.push(face);
        self.faces.len() - 1
    }

    /// Removes faces and compacts away the vertices only they used.
    ///
    /// Returns the removed vertex indices (ascending, pre-removal numbering).
    pub fn delete_faces(&mut self, faces: &[usize]) -> MeshResult<Vec<usize>> {
        for &f in faces {
            MeshError::check_index(f, self.face_count())?;
        }
        let mut doomed: Vec<usize> = faces.to_vec();
        doomed.sort_unstable();
        doomed.dedup();

        let mut candidates: Vec<usize> = doomed
            .iter()
            .flat_map(|&f| self.faces[f].distinct_indices())
            .collect();

        let mut index = 0;
        self.faces.retain(|_| {
            let keep = doomed.binary_search(&index).is_err();
            index += 1;
            keep
        });

        let mut used = vec![false; self.vertex_count()];
        for face in &self.faces {
            for &i in face.indices() {
                used[i] = true;
            }
        }
        candidates.retain(|&i| !used[i]);
        candidates.sort_unstable();
        candidates.dedup();

        self.remove_vertices(&candidates);
        Ok(candidates)
    }

    /// Removes unreferenced-by-contract vertices. `removed` must be sorted,
    /// deduplicated, and not referenced by any face.
    pub(crate) fn remove_vertices(&mut self, removed: &[usize]) {
        if removed.is_empty() {
            return;
        }
        let count = self.vertex_count();
        let mut remap = vec![usize::MAX; count];
        let mut next = 0;
        let mut cursor = 0;
        for (i, slot) in remap.iter_mut().enumerate() {
            if cursor < removed.len() && removed[cursor] == i {
                cursor += 1;
                continue;
            }
            *slot = next;
            next += 1;
        }

        let keep = |i: &usize| remap[*i] != usize::MAX;
        retain_indexed(&mut self.positions, keep);
        if let Some(a) = self.normals.as_mut() {
            retain_indexed(a, keep);
        }
        if let Some(a) = self.uv0.as_mut() {
            retain_indexed(a, keep);
        }
        if let Some(a) = self.uv1.as_mut() {
            retain_indexed(a, keep);
        }
        if let Some(a) = self.colors.as_mut() {
            retain_indexed(a, keep);
        }
        if let Some(a) = self.tangents.as_mut() {
            retain_indexed(a, keep);
        }

        for face in &mut self.faces {
            face.remap_indices(&remap);
        }
        weld::remove_and_shift(&mut self.shared_vertices, removed);
        weld::remove_and_shift(&mut self.shared_uvs, removed);
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    /// Area-weighted unit normal of a face, `None` for degenerate faces.
    pub fn face_normal(&self, face: usize) -> Option<DVec3> {
        let face = self.faces.get(face)?;
        let sum: DVec3 = face
            .triangles()
            .map(|[a, b, c]| {
                triangle_cross(self.positions[a], self.positions[b], self.positions[c])
            })
            .sum();
        sum.try_normalize()
    }

    /// Total area of a face.
    pub fn face_area(&self, face: usize) -> Option<f64> {
        let face = self.faces.get(face)?;
        Some(
            face.triangles()
                .map(|[a, b, c]| {
                    triangle_cross(self.positions[a], self.positions[b], self.positions[c])
                        .length()
                        * 0.5
                })
                .sum(),
        )
    }

    /// Translates every position.
    pub fn translate(&mut self, offset: DVec3) {
        for p in &mut self.positions {
            *p += offset;
        }
    }

    /// Transforms positions and normals by an affine matrix.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the matrix is singular.
    pub fn transform(&mut self, matrix: &DMat4) -> MeshResult<()> {
        let determinant = matrix.determinant();
        if determinant.is_nan() || determinant.abs() <= EPSILON {
            return Err(MeshError::invalid_parameter(format!(
                "transform is singular (determinant {determinant})"
            )));
        }
        for p in &mut self.positions {
            *p = matrix.transform_point3(*p);
        }
        if let Some(normals) = &mut self.normals {
            let normal_matrix = matrix.inverse().transpose();
            for n in normals.iter_mut() {
                *n = normal_matrix.transform_vector3(*n).normalize_or_zero();
            }
        }
        if determinant < 0.0 {
            for face in &mut self.faces {
                face.reverse();
            }
        }
        Ok(())
    }

    /// Appends another mesh, offsetting its indices and groups.
    pub fn merge(&mut self, other: &EditableMesh) {
        let offset = self.push_vertices(&other.vertices());
        for face in &other.faces {
            let mut face = face.clone();
            face.offset_indices(offset);
            self.faces.push(face);
        }
        for group in &other.shared_vertices {
            self.shared_vertices.push(group.offset(offset));
        }
        for group in &other.shared_uvs {
            self.shared_uvs.push(group.offset(offset));
        }
    }
}

/// Unnormalized triangle normal (twice the area).
#[inline]
pub(crate) fn triangle_cross(a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    (b - a).cross(c - a)
}

fn check_len(len: Option<usize>, expected: usize) -> MeshResult<()> {
    match len {
        Some(len) if len != expected => Err(MeshError::invalid_parameter(format!(
            "attribute array has {len} entries for {expected} vertices"
        ))),
        _ => Ok(()),
    }
}

fn extend_attribute<T: Copy + Default>(
    array: &mut Option<Vec<T>>,
    existing: usize,
    values: impl Iterator<Item = Option<T>> + Clone,
) {
    if array.is_none() && values.clone().any(|v| v.is_some()) {
        *array = Some(vec![T::default(); existing]);
    }
    if let Some(array) = array {
        array.extend(values.map(Option::unwrap_or_default));
    }
}

fn set_attribute<T: Copy + Default>(
    array: &mut Option<Vec<T>>,
    count: usize,
    index: usize,
    value: Option<T>,
) {
    if let Some(value) = value {
        // Other vertices keep the zero default.
        array.get_or_insert_with(|| vec![T::default(); count])[index] = value;
    }
}

fn retain_indexed<T>(values: &mut Vec<T>, keep: impl Fn(&usize) -> bool) {
    let mut i = 0;
    values.retain(|_| {
        let k = keep(&i);
        i += 1;
        k
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad_mesh() -> EditableMesh {
        let positions = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        EditableMesh::from_positions(positions, vec![Face::new(vec![0, 1, 2, 0, 2, 3])]).unwrap()
    }

    #[test]
    fn test_face_perimeter_of_quad() {
        let face = Face::new(vec![0, 1, 2, 0, 2, 3]);
        let edges = face.edges();
        assert_eq!(
            edges,
            vec![Edge::new(0, 1), Edge::new(1, 2), Edge::new(2, 3), Edge::new(3, 0)]
        );
    }

    #[test]
    fn test_face_to_quad_rejects_triangle() {
        assert_eq!(Face::new(vec![0, 1, 2]).to_quad(), None);
    }

    #[test]
    fn test_sort_edges_by_adjacency_chains() {
        let edges = vec![Edge::new(2, 0), Edge::new(0, 1), Edge::new(1, 2)];
        let sorted = sort_edges_by_adjacency(edges);
        assert_eq!(sorted, vec![Edge::new(2, 0), Edge::new(0, 1), Edge::new(1, 2)]);
    }

    #[test]
    fn test_validate_rejects_bad_index_count() {
        let result = EditableMesh::from_positions(
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            vec![Face::new(vec![0, 1])],
        );
        assert!(matches!(result, Err(MeshError::InvalidFace { face: 0, .. })));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let result = EditableMesh::from_positions(
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            vec![Face::new(vec![0, 1, 7])],
        );
        assert!(matches!(result, Err(MeshError::IndexOutOfRange { index: 7, .. })));
    }

    #[test]
    fn test_face_normal_and_area() {
        let mesh = quad_mesh();
        assert_relative_eq!(mesh.face_normal(0).unwrap().z, 1.0);
        assert_relative_eq!(mesh.face_area(0).unwrap(), 1.0);
    }

    #[test]
    fn test_push_vertices_creates_attribute_with_defaults() {
        let mut mesh = quad_mesh();
        assert!(mesh.uv0().is_none());
        mesh.push_vertices(&[Vertex::new(DVec3::Z).with_uv0(DVec2::ONE)]);
        let uvs = mesh.uv0().unwrap();
        assert_eq!(uvs.len(), 5);
        assert_eq!(uvs[0], DVec2::ZERO);
        assert_eq!(uvs[4], DVec2::ONE);
    }

    #[test]
    fn test_delete_faces_compacts_vertices_and_groups() {
        let positions = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![Face::new(vec![0, 1, 2]), Face::new(vec![3, 4, 5])];
        let mut mesh = EditableMesh::from_positions(positions, faces).unwrap();
        assert_eq!(mesh.shared_vertices().len(), 4);

        let removed = mesh.delete_faces(&[0]).unwrap();
        assert_eq!(removed, vec![0, 1, 2]);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces()[0].indices(), &[0, 1, 2]);
        assert_eq!(mesh.shared_vertices().len(), 3);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_vertex_average() {
        let avg = Vertex::average(&[
            Vertex::new(DVec3::ZERO).with_uv0(DVec2::ZERO),
            Vertex::new(DVec3::new(2.0, 0.0, 0.0)).with_uv0(DVec2::ONE),
        ])
        .unwrap();
        assert_eq!(avg.position, DVec3::X);
        assert_eq!(avg.uv0, Some(DVec2::splat(0.5)));
        assert!(Vertex::average(&[]).is_none());
    }

    #[test]
    fn test_merge_offsets_groups() {
        let mut a = quad_mesh();
        let b = quad_mesh();
        a.merge(&b);
        assert_eq!(a.vertex_count(), 8);
        assert_eq!(a.faces()[1].indices(), &[4, 5, 6, 4, 6, 7]);
        a.validate().unwrap();
    }

    #[test]
    fn test_transform_mirror_flips_winding() {
        let mut mesh = quad_mesh();
        mesh.set_normals(Some(vec![DVec3::Z; 4])).unwrap();
        mesh.transform(&DMat4::from_scale(DVec3::new(1.0, 1.0, -1.0))).unwrap();
        assert_relative_eq!(mesh.normals().unwrap()[0], -DVec3::Z);
        assert_relative_eq!(mesh.face_normal(0).unwrap(), -DVec3::Z);
    }

    #[test]
    fn test_transform_rejects_singular_matrix() {
        let mut mesh = quad_mesh();
        mesh.set_normals(Some(vec![DVec3::Z; 4])).unwrap();
        let before = mesh.clone();
        let flatten = DMat4::from_scale(DVec3::new(1.0, 0.0, 1.0));
        assert!(matches!(
            mesh.transform(&flatten),
            Err(MeshError::InvalidParameter { .. })
        ));
        assert_eq!(mesh, before);
        assert!(mesh.normals().unwrap().iter().all(|n| n.is_finite()));
    }

    #[test]
    fn test_serde_round_trip_keeps_faces() {
        let mesh = quad_mesh();
        let json = serde_json::to_string(&mesh).unwrap();
        let back: EditableMesh = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mesh);
    }
}
