//! # Winged-Edge Topology
//!
//! Adjacency snapshot over a face list. Every directed perimeter edge of every
//! face becomes one [`WingedEdge`]; edges are matched across faces by their
//! *common* identity, the unordered pair of shared-vertex groups at their ends.
//!
//! ## Snapshot Semantics
//!
//! A [`WingedEdgeGraph`] is an arena built from the current faces and never
//! mutated afterwards. Nodes refer to each other by arena index. Any topology
//! edit invalidates it; rebuild instead of patching.
//!
//! ## Non-Manifold Edges
//!
//! A common edge used by more than two faces links only its first two
//! occurrences. The rest stay unlinked (treated as boundaries by queries) and
//! the edge is listed in [`WingedEdgeGraph::non_manifold_edges`].

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};
use crate::mesh::{EditableMesh, Edge, Face};
use crate::weld::SharedVertexLookup;

// =============================================================================
// NODES
// =============================================================================

/// An edge expressed both in raw vertex indices and in shared-group indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLookup {
    /// Directed edge in vertex indices, in face winding order.
    pub local: Edge,
    /// Canonical (`a <= b`) edge in shared-group indices.
    pub common: Edge,
}

/// One directed edge occurrence on one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WingedEdge {
    /// The edge.
    pub edge: EdgeLookup,
    /// Owning face, as an index into the face slice the graph was built from.
    pub face: usize,
    /// Next edge in the face's winding.
    pub next: usize,
    /// Previous edge in the face's winding.
    pub previous: usize,
    /// The matching edge on the neighbouring face, `None` on a boundary.
    pub opposite: Option<usize>,
}

// =============================================================================
// GRAPH
// =============================================================================

/// Immutable winged-edge adjacency over a face list.
///
/// # Example
///
/// ```rust
/// use polymesh::primitives::Shape;
/// use polymesh::topology::WingedEdgeGraph;
///
/// let cube = Shape::cube(1.0).generate().unwrap();
/// let graph = WingedEdgeGraph::from_mesh(&cube).unwrap();
/// assert_eq!(graph.len(), 24);
/// assert!(graph.is_closed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct WingedEdgeGraph {
    wings: Vec<WingedEdge>,
    face_first: Vec<Option<usize>>,
    non_manifold: Vec<Edge>,
}

impl WingedEdgeGraph {
    /// Builds the graph for every face of `mesh`.
    pub fn from_mesh(mesh: &EditableMesh) -> MeshResult<Self> {
        let lookup = mesh.shared_lookup()?;
        Self::build(mesh.faces(), &lookup)
    }

    /// Builds the graph for `faces` using `lookup` to find common edges.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` if a face references a vertex the lookup does not cover.
    pub fn build(faces: &[Face], lookup: &SharedVertexLookup) -> MeshResult<Self> {
        let mut wings: Vec<WingedEdge> = Vec::new();
        let mut face_first = Vec::with_capacity(faces.len());

        for (face_index, face) in faces.iter().enumerate() {
            let perimeter = face.edges();
            if perimeter.is_empty() {
                face_first.push(None);
                continue;
            }
            let start = wings.len();
            let count = perimeter.len();
            face_first.push(Some(start));

            for (k, local) in perimeter.into_iter().enumerate() {
                let ga = lookup.get(local.a).ok_or(MeshError::IndexOutOfRange {
                    index: local.a,
                    len: lookup.len(),
                })?;
                let gb = lookup.get(local.b).ok_or(MeshError::IndexOutOfRange {
                    index: local.b,
                    len: lookup.len(),
                })?;
                wings.push(WingedEdge {
                    edge: EdgeLookup {
                        local,
                        common: Edge::new(ga, gb).canonical(),
                    },
                    face: face_index,
                    next: start + (k + 1) % count,
                    previous: start + (k + count - 1) % count,
                    opposite: None,
                });
            }
        }

        let mut occurrences: HashMap<Edge, Vec<usize>> = HashMap::new();
        let mut order: Vec<Edge> = Vec::new();
        for (i, wing) in wings.iter().enumerate() {
            let list = occurrences.entry(wing.edge.common).or_default();
            if list.is_empty() {
                order.push(wing.edge.common);
            }
            list.push(i);
        }

        let mut non_manifold = Vec::new();
        for common in order {
            let Some(list) = occurrences.get(&common) else {
                continue;
            };
            if list.len() >= 2 {
                let (x, y) = (list[0], list[1]);
                wings[x].opposite = Some(y);
                wings[y].opposite = Some(x);
            }
            if list.len() > 2 {
                non_manifold.push(common);
            }
        }

        if !non_manifold.is_empty() {
            warn!(
                edges = non_manifold.len(),
                "non-manifold edges found while building winged edges"
            );
        }
        debug!(faces = faces.len(), wings = wings.len(), "built winged-edge graph");

        Ok(Self {
            wings,
            face_first,
            non_manifold,
        })
    }

    /// Number of winged edges.
    #[inline]
    pub fn len(&self) -> usize {
        self.wings.len()
    }

    /// True if the graph has no edges.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.wings.is_empty()
    }

    /// All winged edges.
    #[inline]
    pub fn wings(&self) -> &[WingedEdge] {
        &self.wings
    }

    /// One winged edge.
    #[inline]
    pub fn wing(&self, index: usize) -> Option<&WingedEdge> {
        self.wings.get(index)
    }

    /// Common edges shared by three or more faces.
    #[inline]
    pub fn non_manifold_edges(&self) -> &[Edge] {
        &self.non_manifold
    }

    /// The first winged edge of every face that has a perimeter.
    pub fn one_wing_per_face(&self) -> Vec<&WingedEdge> {
        self.face_first
            .iter()
            .flatten()
            .map(|&w| &self.wings[w])
            .collect()
    }

    /// Walks the perimeter of `face` in winding order.
    pub fn face_wings(&self, face: usize) -> Vec<usize> {
        let Some(&Some(start)) = self.face_first.get(face) else {
            return Vec::new();
        };
        let mut out = vec![start];
        let mut current = self.wings[start].next;
        while current != start {
            out.push(current);
            current = self.wings[current].next;
        }
        out
    }

    /// Faces sharing at least one linked edge with `face`.
    pub fn adjacent_faces(&self, face: usize) -> Vec<usize> {
        let mut out = Vec::new();
        for w in self.face_wings(face) {
            if let Some(o) = self.wings[w].opposite {
                let neighbour = self.wings[o].face;
                if neighbour != face && !out.contains(&neighbour) {
                    out.push(neighbour);
                }
            }
        }
        out
    }

    /// Edges with no linked opposite.
    pub fn border_edges(&self) -> Vec<usize> {
        (0..self.wings.len())
            .filter(|&i| self.wings[i].opposite.is_none())
            .collect()
    }

    /// True if every edge is linked and none is non-manifold.
    pub fn is_closed(&self) -> bool {
        self.non_manifold.is_empty() && self.wings.iter().all(|w| w.opposite.is_some())
    }

    /// Steps to the next edge around `common_vertex`.
    ///
    /// Takes the other edge of `wing`'s face that touches the vertex, then
    /// crosses to its opposite. Returns `None` at a boundary or if `wing`
    /// does not touch the vertex.
    pub fn next_edge_around_vertex(&self, wing: usize, common_vertex: usize) -> Option<usize> {
        let current = self.wings.get(wing)?;
        if !current.edge.common.contains(common_vertex) {
            return None;
        }
        let next = &self.wings[current.next];
        let previous = &self.wings[current.previous];
        let sibling = if next.edge.common.contains(common_vertex) && current.next != wing {
            current.next
        } else if previous.edge.common.contains(common_vertex) && current.previous != wing {
            current.previous
        } else {
            return None;
        };
        self.wings[sibling].opposite
    }

    /// Every winged edge touching each common vertex.
    pub fn spokes(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut spokes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, wing) in self.wings.iter().enumerate() {
            spokes.entry(wing.edge.common.a).or_default().push(i);
            if wing.edge.common.b != wing.edge.common.a {
                spokes.entry(wing.edge.common.b).or_default().push(i);
            }
        }
        spokes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weld::SharedVertex;
    use glam::DVec3;

    /// Two triangles sharing the diagonal (0,0)-(1,1) through distinct vertices.
    fn two_triangles() -> EditableMesh {
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
    fn test_links_shared_edge_through_groups() {
        let mesh = two_triangles();
        let graph = WingedEdgeGraph::from_mesh(&mesh).unwrap();
        assert_eq!(graph.len(), 6);
        let linked: Vec<_> = graph.wings().iter().filter(|w| w.opposite.is_some()).collect();
        assert_eq!(linked.len(), 2);
        assert_eq!(graph.border_edges().len(), 4);
        assert!(!graph.is_closed());
        assert_eq!(graph.adjacent_faces(0), vec![1]);
    }

    #[test]
    fn test_next_and_previous_wrap() {
        let graph = WingedEdgeGraph::from_mesh(&two_triangles()).unwrap();
        let face = graph.face_wings(0);
        assert_eq!(face.len(), 3);
        for &w in &face {
            let wing = graph.wing(w).unwrap();
            assert_eq!(graph.wing(wing.next).unwrap().previous, w);
            assert_eq!(wing.edge.local.b, graph.wing(wing.next).unwrap().edge.local.a);
        }
    }

    #[test]
    fn test_non_manifold_edge_is_reported() {
        // Three triangles fanning off the same edge.
        let positions = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.5, 1.0, 0.0),
            DVec3::new(0.5, -1.0, 0.0),
            DVec3::new(0.5, 0.0, 1.0),
        ];
        let faces = vec![
            Face::new(vec![0, 1, 2]),
            Face::new(vec![1, 0, 3]),
            Face::new(vec![0, 1, 4]),
        ];
        let mesh = EditableMesh::from_positions(positions, faces).unwrap();
        let graph = WingedEdgeGraph::from_mesh(&mesh).unwrap();
        assert_eq!(graph.non_manifold_edges().len(), 1);
        let on_edge: Vec<_> = graph
            .wings()
            .iter()
            .filter(|w| w.edge.common == Edge::new(0, 1))
            .collect();
        assert_eq!(on_edge.len(), 3);
        assert_eq!(on_edge.iter().filter(|w| w.opposite.is_some()).count(), 2);
    }

    #[test]
    fn test_build_rejects_uncovered_vertex() {
        let lookup = SharedVertexLookup::from_groups(&[SharedVertex::new(vec![0])], 1).unwrap();
        let result = WingedEdgeGraph::build(&[Face::new(vec![0, 1, 2])], &lookup);
        assert!(matches!(result, Err(MeshError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_spokes_collect_edges_per_vertex() {
        let graph = WingedEdgeGraph::from_mesh(&two_triangles()).unwrap();
        let spokes = graph.spokes();
        // Group of the shared corner (0,0,0) touches four directed edges.
        assert_eq!(spokes[&0].len(), 4);
    }

    #[test]
    fn test_next_edge_around_vertex_crosses_faces() {
        let graph = WingedEdgeGraph::from_mesh(&two_triangles()).unwrap();
        // Edge 0->1 of face 0 touches group 0; its sibling around group 0 is
        // the diagonal 2->0, whose opposite lies on face 1.
        let start = graph.face_wings(0)[0];
        let next = graph.next_edge_around_vertex(start, 0).unwrap();
        assert_eq!(graph.wing(next).unwrap().face, 1);
        assert!(graph.wing(next).unwrap().edge.common.contains(0));
    }

    #[test]
    fn test_one_wing_per_face() {
        let graph = WingedEdgeGraph::from_mesh(&two_triangles()).unwrap();
        let firsts = graph.one_wing_per_face();
        assert_eq!(firsts.len(), 2);
        assert_eq!(firsts[1].face, 1);
    }
}
