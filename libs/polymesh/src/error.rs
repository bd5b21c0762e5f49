//! # Mesh Errors
//!
//! Error types for topology, triangulation, compilation and boolean operations.
//!
//! Conditions that are recoverable (degenerate vertices found while welding,
//! non-manifold edges, skipped optimization, discarded slivers) are reported as
//! values on the operation's result, not through this enum.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors that can occur while editing, compiling or combining meshes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    /// Degenerate geometry (zero-area triangle, coincident points, NaN position)
    #[error("Degenerate geometry: {message}")]
    DegenerateGeometry { message: String },

    /// A polygon could not be triangulated
    #[error("Triangulation failed: {0}")]
    TriangulationFailure(#[from] TriangulationError),

    /// Topology is not 2-manifold where the operation requires it
    #[error("Non-manifold topology: {message}")]
    NonManifoldTopology { message: String },

    /// Boolean input rejected by the closedness precondition
    #[error("Invalid CSG input: {message}")]
    InvalidCsgInput { message: String },

    /// A face references too few or inconsistent indices
    #[error("Invalid face {face}: {message}")]
    InvalidFace { face: usize, message: String },

    /// An index points past the end of its array
    #[error("Index {index} out of range (len: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Shared vertex groups no longer partition the vertex range
    #[error("Shared vertex partition violated: {message}")]
    PartitionViolated { message: String },

    /// A caller-provided parameter is outside its valid domain
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },
}

impl MeshError {
    /// Creates a degenerate geometry error.
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            message: message.into(),
        }
    }

    /// Creates a non-manifold topology error.
    pub fn non_manifold(message: impl Into<String>) -> Self {
        Self::NonManifoldTopology {
            message: message.into(),
        }
    }

    /// Creates an invalid CSG input error.
    pub fn invalid_csg_input(message: impl Into<String>) -> Self {
        Self::InvalidCsgInput {
            message: message.into(),
        }
    }

    /// Creates an invalid face error.
    pub fn invalid_face(face: usize, message: impl Into<String>) -> Self {
        Self::InvalidFace {
            face,
            message: message.into(),
        }
    }

    /// Creates a partition violation error.
    pub fn partition(message: impl Into<String>) -> Self {
        Self::PartitionViolated {
            message: message.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Returns `Err(IndexOutOfRange)` when `index >= len`.
    pub fn check_index(index: usize, len: usize) -> MeshResult<()> {
        if index < len {
            Ok(())
        } else {
            Err(Self::IndexOutOfRange { index, len })
        }
    }
}

/// Reasons a single polygon cannot be triangulated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TriangulationError {
    /// Fewer than three points were supplied
    #[error("polygon needs at least 3 points, got {0}")]
    TooFewPoints(usize),

    /// Two consecutive points coincide
    #[error("duplicate consecutive points at {0}")]
    DuplicateConsecutive(usize),

    /// All points are collinear or coincident
    #[error("polygon has zero area")]
    ZeroArea,

    /// Ear clipping stalled; the loop is self-intersecting
    #[error("no ear found with {remaining} points remaining")]
    NoEar { remaining: usize },

    /// An interior constraint point lies outside the polygon
    #[error("interior point {0} lies outside the polygon")]
    PointOutside(usize),

    /// An interior constraint point coincides with an existing corner
    #[error("interior point {0} coincides with an existing point")]
    CoincidentPoint(usize),
}
