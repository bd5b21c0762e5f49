//! # Tests for Config Constants
//!
//! Unit tests verifying the correctness of configuration constants
//! and the kernel config builder.

use crate::constants::*;

// =============================================================================
// PRECISION TESTS
// =============================================================================

#[test]
fn test_epsilon_is_positive() {
    assert!(EPSILON > 0.0, "EPSILON must be positive");
}

#[test]
fn test_weld_epsilon_larger_than_epsilon() {
    assert!(
        WELD_EPSILON >= EPSILON,
        "WELD_EPSILON should be >= EPSILON"
    );
}

#[test]
fn test_area_epsilon_is_small() {
    // Slivers are discarded, real triangles of a unit-scale mesh must survive
    assert!(AREA_EPSILON < 1e-6);
}

#[test]
fn test_csg_epsilon_not_tighter_than_epsilon() {
    assert!(CSG_EPSILON > EPSILON);
}

// =============================================================================
// SMOOTHING TESTS
// =============================================================================

#[test]
fn test_smoothing_ranges_do_not_overlap() {
    assert!(SMOOTHING_GROUP_NONE < SMOOTH_RANGE_MIN);
    assert!(SMOOTH_RANGE_MIN <= SMOOTH_RANGE_MAX);
    assert!(SMOOTH_RANGE_MAX < HARD_RANGE_MIN);
    assert!(HARD_RANGE_MIN <= HARD_RANGE_MAX);
}

// =============================================================================
// RESOLUTION TESTS
// =============================================================================

#[test]
fn test_default_segments_at_least_minimum() {
    assert!(DEFAULT_SEGMENTS >= MIN_SEGMENTS);
    assert!(MIN_SEGMENTS >= 3);
}

// =============================================================================
// KERNEL CONFIG TESTS
// =============================================================================

#[test]
fn test_kernel_config_default_matches_constants() {
    let cfg = KernelConfig::default();
    assert_eq!(cfg.weld_epsilon, WELD_EPSILON);
    assert_eq!(cfg.csg_epsilon, CSG_EPSILON);
    assert_eq!(cfg.area_epsilon, AREA_EPSILON);
}

#[test]
fn test_kernel_config_rejects_invalid_tolerances() {
    assert_eq!(
        KernelConfig::new(0.0, 1e-5, 1e-9).unwrap_err(),
        ConfigError::InvalidTolerance {
            name: "weld_epsilon",
            value: 0.0
        }
    );
    assert!(KernelConfig::new(1e-5, -1.0, 1e-9).is_err());
    assert!(KernelConfig::new(1e-5, 1e-5, f64::NAN).is_err());
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::InvalidTolerance {
        name: "csg_epsilon",
        value: -1.0,
    };
    assert!(err.to_string().contains("csg_epsilon"));
}
