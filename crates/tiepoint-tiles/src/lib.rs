//! tiepoint-tiles - Quadtree map tiles for tie-point aligned images
//!
//! This crate turns a source image, and optionally a fitted transform, into
//! a pyramid of 256x256 PNG tiles:
//!
//! - **Bounds** - map footprint and zoom range of an aligned image
//! - **Generation** - on-demand tile rendering and whole-pyramid walks
//! - **Serving** - cached tile lookup with transparent blank tiles
//! - **Alignment** - refitting tie points into a stored transform record
//!
//! # Examples
//!
//! ```
//! use tiepoint_core::{Raster, color};
//! use tiepoint_tiles::{GeneratorConfig, QuadTreeGenerator};
//!
//! let image = Raster::new_filled(600, 400, color::compose_rgb(10, 20, 30)).unwrap();
//! let generator = QuadTreeGenerator::simple(1, image, GeneratorConfig::default());
//! assert_eq!(generator.min_zoom(), 3);
//! assert_eq!(generator.max_zoom(), 5);
//!
//! let tile = generator.tile(5, 2, 1).unwrap();
//! assert_eq!(tile.content_type, "image/png");
//! ```

pub mod alignment;
pub mod bounds;
pub mod cache;
pub mod config;
mod error;
pub mod generator;
pub mod service;

pub use alignment::{Alignment, update_alignment};
pub use bounds::{MapBounds, compute_bounds, map_bounds, meters_bounds, zoom_range};
pub use cache::{GeneratorCache, TileCache, TileKey, tile_cache_key};
pub use config::{GeneratorConfig, ServiceConfig};
pub use error::{TileError, TileResult};
pub use generator::{MemorySink, PNG_CONTENT_TYPE, QuadTreeGenerator, Tile, TileSink};
pub use service::{
    GeneratorSource, MemoryGeneratorSource, QuadTreeRecord, TileService, transparent_tile,
};
