//! # BSP Tree
//!
//! Binary Space Partitioning tree for CSG boolean operations.
//! Based on the csg.js algorithm by Evan Wallace.
//!
//! ## Algorithm
//!
//! Each BSP node contains:
//! - A dividing plane
//! - Polygons coplanar with the plane
//! - Front subtree (polygons in front of plane)
//! - Back subtree (polygons behind plane)
//!
//! ## Operations
//!
//! - `build`: Insert polygons, splitting them down the tree
//! - `clip_to`: Remove polygons from this tree that are inside another tree
//! - `invert`: Flip all polygons and swap front/back subtrees
//! - `all_polygons`: Collect all polygons from the tree
//!
//! ## Stack Safety
//!
//! All operations use iterative algorithms with explicit stacks, so deep
//! trees built from large or badly balanced inputs cannot overflow the
//! call stack.

use super::plane::{Partition, Plane};
use super::polygon::Polygon;

/// A node in the BSP tree.
///
/// Each node partitions space using a plane and stores polygons
/// coplanar with that plane.
#[derive(Debug, Clone, Default)]
pub struct BspNode {
    /// Splitting plane, taken from the first polygon inserted here
    plane: Option<Plane>,
    /// Polygons coplanar with this node's plane
    polygons: Vec<Polygon>,
    /// Front subtree (polygons in front of plane)
    front: Option<Box<BspNode>>,
    /// Back subtree (polygons behind plane)
    back: Option<Box<BspNode>>,
}

impl BspNode {
    /// Creates a new BSP tree from polygons.
    ///
    /// # Arguments
    ///
    /// * `polygons` - Polygons to build the tree from
    /// * `epsilon` - Plane thickness used to classify points
    pub fn new(polygons: Vec<Polygon>, epsilon: f64) -> Self {
        let mut root = Self::default();
        root.build(polygons, epsilon);
        root
    }

    /// Inserts polygons into the tree.
    ///
    /// Polygons coplanar with a node's plane stay at that node regardless of
    /// facing; the rest are split and pushed down to the front and back
    /// subtrees, which are created on demand.
    pub fn build(&mut self, polygons: Vec<Polygon>, epsilon: f64) {
        let mut stack: Vec<(&mut BspNode, Vec<Polygon>)> = vec![(self, polygons)];

        while let Some((node, polygons)) = stack.pop() {
            let Some(first) = polygons.first() else {
                continue;
            };
            let BspNode {
                plane,
                polygons: coplanar,
                front,
                back,
            } = node;
            let plane = *plane.get_or_insert(first.plane);

            let mut partition = Partition::default();
            for polygon in polygons {
                plane.split_polygon(polygon, epsilon, &mut partition);
            }
            coplanar.extend(partition.coplanar_front);
            coplanar.extend(partition.coplanar_back);

            if !partition.front.is_empty() {
                let child = front.get_or_insert_with(Box::default);
                stack.push((child.as_mut(), partition.front));
            }
            if !partition.back.is_empty() {
                let child = back.get_or_insert_with(Box::default);
                stack.push((child.as_mut(), partition.back));
            }
        }
    }

    /// Inverts this BSP tree (flips all polygons and planes, swaps subtrees).
    ///
    /// Converts the solid into its complement.
    pub fn invert(&mut self) {
        let mut stack: Vec<&mut BspNode> = vec![self];

        while let Some(node) = stack.pop() {
            for polygon in &mut node.polygons {
                polygon.flip();
            }
            if let Some(plane) = node.plane.as_mut() {
                plane.flip();
            }
            std::mem::swap(&mut node.front, &mut node.back);

            if let Some(front) = node.front.as_deref_mut() {
                stack.push(front);
            }
            if let Some(back) = node.back.as_deref_mut() {
                stack.push(back);
            }
        }
    }

    /// Clips polygons to this BSP tree.
    ///
    /// Removes the parts of `polygons` that are inside the solid represented
    /// by this tree. Coplanar pieces follow their facing: same-facing pieces
    /// continue down the front, opposite-facing pieces down the back.
    ///
    /// # Returns
    ///
    /// Polygons that are outside this tree's solid.
    pub fn clip_polygons(&self, polygons: Vec<Polygon>, epsilon: f64) -> Vec<Polygon> {
        let mut result = Vec::new();
        let mut stack: Vec<(&BspNode, Vec<Polygon>)> = vec![(self, polygons)];

        while let Some((node, polygons)) = stack.pop() {
            if polygons.is_empty() {
                continue;
            }
            let Some(plane) = node.plane else {
                result.extend(polygons);
                continue;
            };

            let mut partition = Partition::default();
            for polygon in polygons {
                plane.split_polygon(polygon, epsilon, &mut partition);
            }
            let mut front = partition.coplanar_front;
            front.extend(partition.front);
            let mut back = partition.coplanar_back;
            back.extend(partition.back);

            match node.front.as_deref() {
                Some(child) => stack.push((child, front)),
                None => result.extend(front),
            }
            // Without a back subtree, back polygons are inside the solid.
            if let Some(child) = node.back.as_deref() {
                stack.push((child, back));
            }
        }

        result
    }

    /// Clips this tree's polygons to another tree.
    ///
    /// Removes the parts of this tree's polygons that are inside `other`.
    pub fn clip_to(&mut self, other: &BspNode, epsilon: f64) {
        let mut stack: Vec<&mut BspNode> = vec![self];

        while let Some(node) = stack.pop() {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = other.clip_polygons(polygons, epsilon);

            if let Some(front) = node.front.as_deref_mut() {
                stack.push(front);
            }
            if let Some(back) = node.back.as_deref_mut() {
                stack.push(back);
            }
        }
    }

    /// Collects all polygons from this tree.
    pub fn all_polygons(&self) -> Vec<Polygon> {
        let mut result = Vec::new();
        let mut stack: Vec<&BspNode> = vec![self];

        while let Some(node) = stack.pop() {
            result.extend(node.polygons.iter().cloned());

            if let Some(front) = node.front.as_deref() {
                stack.push(front);
            }
            if let Some(back) = node.back.as_deref() {
                stack.push(back);
            }
        }

        result
    }

    /// Returns the number of polygons in this tree.
    #[cfg(test)]
    pub fn polygon_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&BspNode> = vec![self];

        while let Some(node) = stack.pop() {
            count += node.polygons.len();

            if let Some(front) = node.front.as_deref() {
                stack.push(front);
            }
            if let Some(back) = node.back.as_deref() {
                stack.push(back);
            }
        }

        count
    }
}

impl Drop for BspNode {
    fn drop(&mut self) {
        // Iterative drop to avoid stack overflow
        let mut stack = Vec::new();

        if let Some(front) = self.front.take() {
            stack.push(front);
        }
        if let Some(back) = self.back.take() {
            stack.push(back);
        }

        while let Some(mut node) = stack.pop() {
            if let Some(front) = node.front.take() {
                stack.push(front);
            }
            if let Some(back) = node.back.take() {
                stack.push(back);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::polygon::SourceFace;
    use super::super::vertex::Vertex;
    use super::*;
    use config::constants::CSG_EPSILON;
    use glam::DVec3;

    fn make_triangle_polygon(z: f64) -> Polygon {
        Polygon::new(
            vec![
                Vertex::new(DVec3::new(0.0, 0.0, z)),
                Vertex::new(DVec3::new(1.0, 0.0, z)),
                Vertex::new(DVec3::new(0.0, 1.0, z)),
            ],
            SourceFace::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_bsp_new_empty() {
        let tree = BspNode::new(vec![], CSG_EPSILON);
        assert_eq!(tree.polygon_count(), 0);
        assert!(tree.plane.is_none());
    }

    #[test]
    fn test_bsp_new_multiple() {
        let polys = vec![
            make_triangle_polygon(0.0),
            make_triangle_polygon(1.0),
            make_triangle_polygon(-1.0),
        ];
        let tree = BspNode::new(polys, CSG_EPSILON);
        assert_eq!(tree.polygon_count(), 3);
        assert_eq!(tree.all_polygons().len(), 3);
        assert!(tree.front.is_some());
        assert!(tree.back.is_some());
    }

    #[test]
    fn test_bsp_coplanar_polygons_share_node() {
        let mut flipped = make_triangle_polygon(0.0);
        flipped.flip();
        let tree = BspNode::new(vec![make_triangle_polygon(0.0), flipped], CSG_EPSILON);
        assert_eq!(tree.polygons.len(), 2);
        assert!(tree.front.is_none() && tree.back.is_none());
    }

    #[test]
    fn test_bsp_invert() {
        let mut tree = BspNode::new(vec![make_triangle_polygon(0.0)], CSG_EPSILON);
        tree.invert();
        assert!(tree.plane.is_some_and(|p| p.normal.z < 0.0));
        assert!(tree.polygons[0].plane.normal.z < 0.0);
    }

    #[test]
    fn test_bsp_clip_polygons_front() {
        let tree = BspNode::new(vec![make_triangle_polygon(0.0)], CSG_EPSILON);
        let result = tree.clip_polygons(vec![make_triangle_polygon(1.0)], CSG_EPSILON);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_bsp_clip_polygons_back() {
        let tree = BspNode::new(vec![make_triangle_polygon(0.0)], CSG_EPSILON);
        let result = tree.clip_polygons(vec![make_triangle_polygon(-1.0)], CSG_EPSILON);
        assert!(result.is_empty());
    }

    #[test]
    fn test_bsp_deep_tree_drops() {
        let polys: Vec<Polygon> = (0..5000).map(|i| make_triangle_polygon(i as f64)).collect();
        let tree = BspNode::new(polys, CSG_EPSILON);
        assert_eq!(tree.polygon_count(), 5000);
        drop(tree);
    }
}
