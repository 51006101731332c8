//! Error types for tiepoint-transform

use thiserror::Error;

/// Errors that can occur while fitting or evaluating a transform
#[derive(Debug, Error)]
pub enum TransformError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] tiepoint_core::Error),

    /// Too few correspondences for the requested family
    #[error("insufficient points: need at least {needed}, got {got}")]
    InsufficientPoints { needed: usize, got: usize },

    /// Destination and source point lists differ in length
    #[error("mismatched point lists: {to} destination vs {from} source")]
    MismatchedPoints { to: usize, from: usize },

    /// The optimizer gave up before converging
    #[error("fit did not converge after {evaluations} evaluations")]
    FitDidNotConverge { evaluations: usize },

    /// The fitted matrix cannot be inverted
    #[error("singular transformation matrix")]
    SingularTransform,

    /// The problem is numerically degenerate
    #[error("ill-conditioned: {0}")]
    IllConditioned(String),

    /// No camera metadata is known for the image
    #[error("camera metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// A camera ray does not intersect the Earth
    #[error("ray misses the Earth")]
    RayMissesEarth,

    /// A quadratic correction has no real inverse at this point
    #[error("no real solution for quadratic term")]
    NoRealSolution,

    /// A serialized transform record is malformed
    #[error("invalid serialized transform: {0}")]
    InvalidSerialization(String),
}

impl TransformError {
    /// Whether the error describes the data rather than a programming or
    /// configuration fault.
    ///
    /// Recoverable errors can be handled by skipping a point, falling back
    /// to a simpler family or keeping the previous alignment.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientPoints { .. }
                | Self::FitDidNotConverge { .. }
                | Self::SingularTransform
                | Self::IllConditioned(_)
                | Self::RayMissesEarth
                | Self::NoRealSolution
        )
    }
}

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;

impl From<serde_json::Error> for TransformError {
    fn from(e: serde_json::Error) -> Self {
        TransformError::InvalidSerialization(e.to_string())
    }
}
