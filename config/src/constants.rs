//! # Configuration Constants
//!
//! Centralized constants for the mesh kernel. All geometry tolerances,
//! smoothing-group ranges and tessellation defaults are defined here.
//!
//! ## Categories
//!
//! - **Precision**: Floating-point comparison tolerances
//! - **Smoothing**: Reserved smoothing group ranges
//! - **Resolution**: Default tessellation parameters for primitive shapes

use std::fmt;

// =============================================================================
// PRECISION CONSTANTS
// =============================================================================

/// Epsilon for floating-point comparisons.
///
/// Used for determining if two floating-point values are "equal" within
/// numerical tolerance.
///
/// # Example
///
/// ```rust
/// use config::constants::EPSILON;
///
/// fn approximately_equal(a: f64, b: f64) -> bool {
///     (a - b).abs() < EPSILON
/// }
///
/// assert!(approximately_equal(1.0, 1.0 + 1e-11));
/// ```
pub const EPSILON: f64 = 1e-10;

/// Default distance under which two vertex positions are considered coincident
/// and placed in the same shared vertex group.
///
/// # Example
///
/// ```rust
/// use config::constants::WELD_EPSILON;
///
/// let a = [0.0_f64, 0.0, 0.0];
/// let b = [0.000_001_f64, 0.0, 0.0];
/// assert!((b[0] - a[0]).abs() < WELD_EPSILON);
/// ```
pub const WELD_EPSILON: f64 = 1e-5;

/// Plane thickness used by the BSP tree when classifying points.
///
/// Points closer than this to a splitting plane are treated as coplanar.
///
/// # Example
///
/// ```rust
/// use config::constants::CSG_EPSILON;
///
/// let signed_distance: f64 = 5e-6;
/// assert!(signed_distance.abs() < CSG_EPSILON); // coplanar
/// ```
pub const CSG_EPSILON: f64 = 1e-5;

/// Minimum triangle area. Triangles below this are slivers and are dropped.
///
/// # Example
///
/// ```rust
/// use config::constants::AREA_EPSILON;
///
/// let sliver_area = 1e-12;
/// assert!(sliver_area < AREA_EPSILON);
/// ```
pub const AREA_EPSILON: f64 = 1e-9;

/// Tolerance used when comparing vertex attributes (normals, UVs, colors)
/// for duplicate collapsing.
///
/// # Example
///
/// ```rust
/// use config::constants::ATTRIBUTE_EPSILON;
///
/// let u0 = 0.25_f64;
/// let u1 = 0.25_f64 + 1e-9;
/// assert!((u0 - u1).abs() < ATTRIBUTE_EPSILON);
/// ```
pub const ATTRIBUTE_EPSILON: f64 = 1e-6;

// =============================================================================
// SMOOTHING GROUP CONSTANTS
// =============================================================================

/// Smoothing group id meaning "no smoothing" (hard edges everywhere).
///
/// # Example
///
/// ```rust
/// use config::constants::SMOOTHING_GROUP_NONE;
/// assert_eq!(SMOOTHING_GROUP_NONE, 0);
/// ```
pub const SMOOTHING_GROUP_NONE: i32 = 0;

/// First smoothing group id that produces averaged normals.
///
/// # Example
///
/// ```rust
/// use config::constants::{SMOOTH_RANGE_MIN, SMOOTHING_GROUP_NONE};
/// assert!(SMOOTH_RANGE_MIN > SMOOTHING_GROUP_NONE);
/// ```
pub const SMOOTH_RANGE_MIN: i32 = 1;

/// Last smoothing group id of the smooth range.
pub const SMOOTH_RANGE_MAX: i32 = 24;

/// First id of the reserved hard range. Faces in this range are not smoothed.
pub const HARD_RANGE_MIN: i32 = 25;

/// Last id of the reserved hard range.
///
/// # Example
///
/// ```rust
/// use config::constants::{HARD_RANGE_MAX, HARD_RANGE_MIN};
/// assert!(HARD_RANGE_MAX > HARD_RANGE_MIN);
/// ```
pub const HARD_RANGE_MAX: i32 = 42;

// =============================================================================
// RESOLUTION CONSTANTS
// =============================================================================

/// Default number of radial segments for round primitives (cylinder, cone).
///
/// # Example
///
/// ```rust
/// use config::constants::DEFAULT_SEGMENTS;
/// assert!(DEFAULT_SEGMENTS >= 3);
/// ```
pub const DEFAULT_SEGMENTS: u32 = 16;

/// Minimum number of radial segments. Fewer cannot enclose a volume.
pub const MIN_SEGMENTS: u32 = 3;

// =============================================================================
// KERNEL CONFIG
// =============================================================================

/// Immutable snapshot of the tolerances a kernel session runs with.
///
/// # Examples
/// ```
/// use config::constants::KernelConfig;
/// let config = KernelConfig::default();
/// assert!(config.weld_epsilon > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelConfig {
    /// Distance under which positions are welded into one shared group.
    pub weld_epsilon: f64,
    /// BSP plane thickness.
    pub csg_epsilon: f64,
    /// Minimum area for an emitted triangle.
    pub area_epsilon: f64,
}

impl KernelConfig {
    /// Builds a configuration, rejecting non-positive or non-finite tolerances.
    ///
    /// # Examples
    /// ```
    /// use config::constants::KernelConfig;
    /// let cfg = KernelConfig::new(1.0e-4, 1.0e-5, 1.0e-9).expect("valid config");
    /// assert_eq!(cfg.weld_epsilon, 1.0e-4);
    /// assert!(KernelConfig::new(0.0, 1.0e-5, 1.0e-9).is_err());
    /// ```
    pub fn new(weld_epsilon: f64, csg_epsilon: f64, area_epsilon: f64) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("weld_epsilon", weld_epsilon),
            ("csg_epsilon", csg_epsilon),
            ("area_epsilon", area_epsilon),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        Ok(Self {
            weld_epsilon,
            csg_epsilon,
            area_epsilon,
        })
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            weld_epsilon: WELD_EPSILON,
            csg_epsilon: CSG_EPSILON,
            area_epsilon: AREA_EPSILON,
        }
    }
}

/// Error returned when invalid configuration values are provided.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Raised when a tolerance is zero, negative or not finite.
    InvalidTolerance {
        /// Name of the offending field.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTolerance { name, value } => {
                write!(f, "{name} must be positive and finite: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
