//! # Mesh Operations
//!
//! Whole-mesh operations: boolean combination (CSG), measurement and
//! cleanup of degenerate geometry.

pub mod boolean;
pub mod measure;
pub mod validation;

pub use boolean::{batch, boolean, intersect, subtract, union, BooleanOp, CsgOptions, CsgReport};
pub use measure::{bounding_box, signed_volume, surface_area};
