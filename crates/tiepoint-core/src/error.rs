//! Error types for tiepoint-core
//!
//! Provides a unified error type for all operations in the core crate.

use thiserror::Error;

/// tiepoint-core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid raster dimensions
    #[error("invalid raster dimensions: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Geotransform carries rotation terms, which are not supported
    #[error("rotated geotransform is not supported (rot_x={rot_x}, rot_y={rot_y})")]
    RotatedGeoTransform { rot_x: f64, rot_y: f64 },

    /// Matrix is not invertible
    #[error("singular transformation matrix")]
    SingularMatrix,
}

/// Result type alias for tiepoint-core operations
pub type Result<T> = std::result::Result<T, Error>;
