//! tiepoint - Tie-point georeferencing and map tile pyramids
//!
//! Fits the mapping between an image and Web Mercator from user-placed tie
//! points, then serves the image as a pyramid of 256x256 map tiles.
//!
//! # Overview
//!
//! - Geometry, rasters and Web Mercator math ([`mercator`], [`geodesy`])
//! - PNG input and output ([`io`])
//! - Transform families and fitting ([`transform`])
//! - Quadtree tile generation and serving ([`tiles`])
//!
//! # Example
//!
//! ```
//! use tiepoint::transform::{TransformKind, fit_transform};
//! use tiepoint::TiePoints;
//!
//! // [to_x, to_y, from_x, from_y]
//! let points = TiePoints::from_rows(&[
//!     [10.0, 10.0, 0.0, 0.0],
//!     [10.0, 110.0, 100.0, 0.0],
//!     [110.0, 10.0, 0.0, 100.0],
//! ]);
//! let record = fit_transform(&points).unwrap();
//! assert_eq!(record.kind, TransformKind::Affine);
//! ```

// Re-export core types (primary data structures used everywhere)
pub use tiepoint_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use tiepoint_io as io;
pub use tiepoint_tiles as tiles;
pub use tiepoint_transform as transform;
