//! # Config Crate
//!
//! Centralized configuration constants for the polymesh kernel.
//! All tolerances and tunable parameters are defined here so that the
//! welder, triangulator, compiler and CSG engine agree on what "equal",
//! "coincident" and "degenerate" mean.
//!
//! ## Usage
//!
//! ```rust
//! use config::constants::{EPSILON, WELD_EPSILON};
//!
//! // Use EPSILON for floating-point comparisons
//! let value: f64 = 0.00000000001;
//! assert!(value.abs() < EPSILON);
//!
//! // Two points closer than WELD_EPSILON end up in the same shared vertex group
//! let distance = 1e-6;
//! assert!(distance < WELD_EPSILON);
//! ```
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All constants defined once, used everywhere
//! - **No Global State**: Constants only; runtime settings live in option structs
//! - **Well-Documented**: Every constant has clear documentation

pub mod constants;

#[cfg(test)]
mod tests;
