//! # Vertex Welding
//!
//! Shared-vertex groups: sets of vertex indices that occupy the same position
//! and are treated as one topological point.
//!
//! ## Invariant
//!
//! The groups of a mesh always partition `0..vertex_count`: every vertex is in
//! exactly one group. Every function here either preserves that or returns an
//! error without touching its input.
//!
//! ## Grouping
//!
//! [`build_shared_vertices`] hashes positions into cubic cells of side
//! `epsilon` and compares each vertex only against the 27 neighbouring cells,
//! joining close pairs with a disjoint-set forest. Grouping is transitive: a
//! chain of vertices each within `epsilon` of the next ends up in one group.

use std::collections::HashMap;

use config::constants::{KernelConfig, WELD_EPSILON};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};
use crate::mesh::{EditableMesh, Vertex};
use crate::ops::validation::remove_degenerate_triangles;

// =============================================================================
// SHARED VERTEX
// =============================================================================

/// A set of coincident vertex indices, kept sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SharedVertex {
    indices: Vec<usize>,
}

impl SharedVertex {
    /// Creates a group; indices are sorted and deduplicated.
    pub fn new(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    /// Member vertex indices, ascending.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True if the group has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// True if `index` is a member.
    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Smallest member.
    pub fn first(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    pub(crate) fn insert(&mut self, index: usize) {
        if let Err(pos) = self.indices.binary_search(&index) {
            self.indices.insert(pos, index);
        }
    }

    pub(crate) fn remove(&mut self, index: usize) -> bool {
        match self.indices.binary_search(&index) {
            Ok(pos) => {
                self.indices.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub(crate) fn offset(&self, offset: usize) -> Self {
        Self {
            indices: self.indices.iter().map(|i| i + offset).collect(),
        }
    }
}

/// One singleton group per vertex.
pub fn singleton_groups(vertex_count: usize) -> Vec<SharedVertex> {
    (0..vertex_count).map(|i| SharedVertex::new(vec![i])).collect()
}

/// Checks that `groups` partition `0..vertex_count`.
pub fn validate_partition(groups: &[SharedVertex], vertex_count: usize) -> MeshResult<()> {
    let mut seen = vec![false; vertex_count];
    for (g, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(MeshError::partition(format!("group {g} is empty")));
        }
        for &i in group.indices() {
            if i >= vertex_count {
                return Err(MeshError::partition(format!(
                    "group {g} references vertex {i} of {vertex_count}"
                )));
            }
            if std::mem::replace(&mut seen[i], true) {
                return Err(MeshError::partition(format!(
                    "vertex {i} belongs to more than one group"
                )));
            }
        }
    }
    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(MeshError::partition(format!(
            "vertex {missing} belongs to no group"
        )));
    }
    Ok(())
}

// =============================================================================
// LOOKUP
// =============================================================================

/// Vertex index to group index table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedVertexLookup {
    group_of: Vec<usize>,
}

impl SharedVertexLookup {
    /// Builds the lookup, failing if `groups` do not partition the range.
    pub fn from_groups(groups: &[SharedVertex], vertex_count: usize) -> MeshResult<Self> {
        validate_partition(groups, vertex_count)?;
        let mut group_of = vec![0; vertex_count];
        for (g, group) in groups.iter().enumerate() {
            for &i in group.indices() {
                group_of[i] = g;
            }
        }
        Ok(Self { group_of })
    }

    /// Group containing `vertex`.
    #[inline]
    pub fn get(&self, vertex: usize) -> Option<usize> {
        self.group_of.get(vertex).copied()
    }

    /// Number of vertices covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.group_of.len()
    }

    /// True if no vertices are covered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.group_of.is_empty()
    }

    /// Rebuilds groups from the table, ordered by their smallest member.
    pub fn to_groups(&self) -> Vec<SharedVertex> {
        let mut order: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (vertex, &group) in self.group_of.iter().enumerate() {
            let slot = *order.entry(group).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(vertex);
        }
        groups.into_iter().map(SharedVertex::new).collect()
    }
}

// =============================================================================
// BUILD
// =============================================================================

/// Tolerances for grouping coincident vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldOptions {
    /// Maximum distance between two vertices of the same group.
    pub epsilon: f64,
}

impl Default for WeldOptions {
    fn default() -> Self {
        Self {
            epsilon: WELD_EPSILON,
        }
    }
}

impl From<&KernelConfig> for WeldOptions {
    fn from(config: &KernelConfig) -> Self {
        Self {
            epsilon: config.weld_epsilon,
        }
    }
}

/// Result of grouping a position set.
#[derive(Debug, Clone, PartialEq)]
pub struct WeldReport {
    /// Groups partitioning every index, ordered by smallest member.
    pub groups: Vec<SharedVertex>,
    /// Vertices with NaN or infinite coordinates. Each is left in its own
    /// singleton group.
    pub degenerate: Vec<usize>,
}

/// Partitions vertex indices into groups of coincident positions.
///
/// # Arguments
///
/// * `positions` - Vertex positions
/// * `epsilon` - Maximum linking distance, must be positive and finite
///
/// # Example
///
/// ```rust
/// use glam::DVec3;
/// use polymesh::weld::build_shared_vertices;
///
/// let positions = [DVec3::ZERO, DVec3::X, DVec3::new(1e-7, 0.0, 0.0)];
/// let report = build_shared_vertices(&positions, 1e-5).unwrap();
/// assert_eq!(report.groups.len(), 2);
/// assert_eq!(report.groups[0].indices(), &[0, 2]);
/// ```
pub fn build_shared_vertices(positions: &[DVec3], epsilon: f64) -> MeshResult<WeldReport> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(MeshError::invalid_parameter(format!(
            "weld epsilon must be positive and finite: {epsilon}"
        )));
    }

    let mut sets = DisjointSet::new(positions.len());
    let mut cells: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
    let mut degenerate = Vec::new();
    let epsilon_sq = epsilon * epsilon;

    for (i, &p) in positions.iter().enumerate() {
        if !p.is_finite() {
            degenerate.push(i);
            continue;
        }
        let cell = cell_of(p, epsilon);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = [
                        cell[0].saturating_add(dx),
                        cell[1].saturating_add(dy),
                        cell[2].saturating_add(dz),
                    ];
                    if let Some(members) = cells.get(&key) {
                        for &j in members {
                            if positions[j].distance_squared(p) <= epsilon_sq {
                                sets.union(i, j);
                            }
                        }
                    }
                }
            }
        }
        cells.entry(cell).or_default().push(i);
    }

    if !degenerate.is_empty() {
        warn!(count = degenerate.len(), "non-finite positions excluded from welding");
    }

    let mut by_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in 0..positions.len() {
        let root = sets.find(i);
        let slot = *by_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }

    debug!(
        vertices = positions.len(),
        groups = groups.len(),
        "built shared vertices"
    );

    Ok(WeldReport {
        groups: groups.into_iter().map(SharedVertex::new).collect(),
        degenerate,
    })
}

#[inline]
fn cell_of(p: DVec3, size: f64) -> [i64; 3] {
    let c = (p / size).floor();
    [c.x as i64, c.y as i64, c.z as i64]
}

/// Union-find with path halving and union by size.
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }
}

// =============================================================================
// GROUP EDITING
// =============================================================================

/// Merges every group containing one of `indices` into a single group.
///
/// The merged group takes the slot of the first affected group. Welding an
/// already-welded set is a no-op.
pub fn weld(groups: &mut Vec<SharedVertex>, indices: &[usize]) -> MeshResult<()> {
    let mut affected: Vec<usize> = Vec::new();
    for &index in indices {
        match groups.iter().position(|g| g.contains(index)) {
            Some(g) => {
                if !affected.contains(&g) {
                    affected.push(g);
                }
            }
            None => {
                return Err(MeshError::partition(format!(
                    "vertex {index} belongs to no group"
                )))
            }
        }
    }
    if affected.len() < 2 {
        return Ok(());
    }

    affected.sort_unstable();
    let target = affected[0];
    let mut merged: Vec<usize> = groups[target].indices().to_vec();
    for &g in affected[1..].iter().rev() {
        merged.extend_from_slice(groups.remove(g).indices());
    }
    groups[target] = SharedVertex::new(merged);
    Ok(())
}

/// Moves `index` out of its group into a new singleton group.
///
/// Splitting a vertex that is already alone is a no-op.
pub fn split(groups: &mut Vec<SharedVertex>, index: usize) -> MeshResult<()> {
    let g = groups
        .iter()
        .position(|g| g.contains(index))
        .ok_or_else(|| MeshError::partition(format!("vertex {index} belongs to no group")))?;
    if groups[g].len() == 1 {
        return Ok(());
    }
    groups[g].remove(index);
    groups.push(SharedVertex::new(vec![index]));
    Ok(())
}

/// Removes `removed` indices (sorted ascending) from every group, drops
/// emptied groups, and shifts remaining indices down to stay contiguous.
pub fn remove_and_shift(groups: &mut Vec<SharedVertex>, removed: &[usize]) {
    if removed.is_empty() {
        return;
    }
    groups.retain_mut(|group| {
        let shifted: Vec<usize> = group
            .indices()
            .iter()
            .filter(|i| removed.binary_search(i).is_err())
            .map(|&i| i - removed.partition_point(|&r| r < i))
            .collect();
        *group = SharedVertex::new(shifted);
        !group.is_empty()
    });
}

// =============================================================================
// MESH-LEVEL OPERATIONS
// =============================================================================

/// Regroups the whole mesh by position.
pub fn rebuild_shared_vertices(
    mesh: &mut EditableMesh,
    options: &WeldOptions,
) -> MeshResult<WeldReport> {
    let report = build_shared_vertices(mesh.positions(), options.epsilon)?;
    mesh.set_shared_vertices(report.groups.clone())?;
    Ok(report)
}

/// Joins the groups of `indices` without moving any vertex.
pub fn weld_vertices(mesh: &mut EditableMesh, indices: &[usize]) -> MeshResult<()> {
    for &i in indices {
        MeshError::check_index(i, mesh.vertex_count())?;
    }
    weld(mesh.shared_vertices_mut(), indices)
}

/// Detaches every index into its own group.
pub fn split_vertices(mesh: &mut EditableMesh, indices: &[usize]) -> MeshResult<()> {
    for &i in indices {
        MeshError::check_index(i, mesh.vertex_count())?;
    }
    let groups = mesh.shared_vertices_mut();
    for &i in indices {
        split(groups, i)?;
    }
    Ok(())
}

/// Welds the groups of `indices` that lie within `radius` of each other,
/// moving every member of a welded cluster to the cluster's average position.
///
/// Returns the number of groups that were merged away.
pub fn weld_within_radius(
    mesh: &mut EditableMesh,
    indices: &[usize],
    radius: f64,
) -> MeshResult<usize> {
    for &i in indices {
        MeshError::check_index(i, mesh.vertex_count())?;
    }
    let lookup = mesh.shared_lookup()?;

    let mut selected: Vec<usize> = indices.iter().filter_map(|&i| lookup.get(i)).collect();
    selected.sort_unstable();
    selected.dedup();

    let representatives: Vec<DVec3> = selected
        .iter()
        .map(|&g| group_center(mesh, g))
        .collect();
    let report = build_shared_vertices(&representatives, radius)?;

    let clusters: Vec<Vec<usize>> = report
        .groups
        .iter()
        .filter(|c| c.len() > 1)
        .map(|cluster| {
            cluster
                .indices()
                .iter()
                .flat_map(|&c| mesh.shared_vertices()[selected[c]].indices().to_vec())
                .collect()
        })
        .collect();

    let before = mesh.shared_vertices().len();
    for members in &clusters {
        let center = members
            .iter()
            .map(|&i| mesh.positions()[i])
            .sum::<DVec3>()
            / members.len() as f64;
        for &i in members {
            mesh.set_position(i, center);
        }
        weld(mesh.shared_vertices_mut(), members)?;
    }
    let merged = before - mesh.shared_vertices().len();

    debug!(merged, "welded within radius");
    Ok(merged)
}

fn group_center(mesh: &EditableMesh, group: usize) -> DVec3 {
    let members = mesh.shared_vertices()[group].indices();
    members.iter().map(|&i| mesh.positions()[i]).sum::<DVec3>() / members.len() as f64
}

/// Collapses `indices` to a single point and joins their groups.
///
/// With `collapse_to_first` every vertex takes the attributes of the first
/// index; otherwise all attributes are averaged. Triangles that become
/// degenerate are removed; the return value counts them.
pub fn merge_vertices(
    mesh: &mut EditableMesh,
    indices: &[usize],
    collapse_to_first: bool,
) -> MeshResult<usize> {
    for &i in indices {
        MeshError::check_index(i, mesh.vertex_count())?;
    }
    let vertices: Vec<Vertex> = indices.iter().filter_map(|&i| mesh.vertex(i)).collect();
    let target = if collapse_to_first {
        vertices.first().copied()
    } else {
        Vertex::average(&vertices)
    };
    let Some(target) = target else {
        return Ok(0);
    };

    for &i in indices {
        mesh.set_vertex(i, &target);
    }
    weld(mesh.shared_vertices_mut(), indices)?;
    remove_degenerate_triangles(mesh, config::constants::AREA_EPSILON)
}
