//! Generator and service configuration

use crate::error::TileResult;
use serde::{Deserialize, Serialize};
use tiepoint_core::Resample;

/// Options for building a [`QuadTreeGenerator`](crate::QuadTreeGenerator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Spacing in tile pixels of the grid on which the inverse transform is
    /// evaluated exactly; pixels in between are interpolated.
    pub patch_size: u32,
    /// Source sampling method
    pub resample: Resample,
    /// Zoom of the whole-image tile in unaligned trees
    pub zoom_offset: u32,
    /// Upper clamp on the computed maximum zoom
    pub max_zoom_limit: u32,
    /// Extra samples per image edge when computing map bounds
    pub edge_samples: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            patch_size: 32,
            resample: Resample::Bilinear,
            zoom_offset: 3,
            max_zoom_limit: 23,
            edge_samples: 0,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json(json: &str) -> TileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Options for [`TileService`](crate::TileService).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Generators kept in memory
    pub generator_cache_capacity: usize,
    /// Encoded tiles kept in memory
    pub tile_cache_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            generator_cache_capacity: 8,
            tile_cache_capacity: 4096,
        }
    }
}

impl ServiceConfig {
    pub fn from_json(json: &str) -> TileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
