//! Error types for tiepoint-tiles

use thiserror::Error;

/// Errors that can occur while building generators or producing tiles
#[derive(Debug, Error)]
pub enum TileError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] tiepoint_core::Error),

    /// Transform fitting or evaluation error
    #[error("transform error: {0}")]
    Transform(#[from] tiepoint_transform::TransformError),

    /// PNG encoding or file error
    #[error("io error: {0}")]
    Io(#[from] tiepoint_io::IoError),

    /// Requested zoom is finer than the source supports
    #[error("zoom {zoom} exceeds maximum zoom {max_zoom}")]
    ZoomTooBig { zoom: u32, max_zoom: u32 },

    /// Requested tile does not overlap the image
    #[error("tile {zoom}/{x}/{y} is outside the image bounds")]
    OutOfBounds { zoom: u32, x: u64, y: u64 },

    /// No image corner maps onto the map
    #[error("image has no map bounds")]
    NoBounds,

    /// The generator source has no quadtree with this id
    #[error("quadtree {0} not found")]
    NotFound(u64),

    /// Malformed configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TileError {
    /// Whether the request should be answered with a transparent tile.
    pub fn is_blank_tile(&self) -> bool {
        matches!(self, Self::ZoomTooBig { .. } | Self::OutOfBounds { .. })
    }
}

/// Result type for tile operations
pub type TileResult<T> = Result<T, TileError>;

impl From<serde_json::Error> for TileError {
    fn from(e: serde_json::Error) -> Self {
        TileError::InvalidConfig(e.to_string())
    }
}
