//! Tile serving
//!
//! [`TileService`] answers tile requests for many quadtrees. Generators come
//! from a [`GeneratorSource`] and are kept in a bounded cache; encoded tiles
//! are cached by identity. Requests outside a tree's zoom range or bounds are
//! answered with [`transparent_tile`].

use crate::cache::{GeneratorCache, TileCache, TileKey};
use crate::config::{GeneratorConfig, ServiceConfig};
use crate::error::{TileError, TileResult};
use crate::generator::{QuadTreeGenerator, Tile};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tiepoint_core::mercator::TILE_SIZE;
use tiepoint_core::{Raster, RasterMut};
use tiepoint_transform::SerializedTransform;

/// Loads generators by quadtree id.
pub trait GeneratorSource: Send + Sync {
    /// # Errors
    ///
    /// [`TileError::NotFound`] for an unknown id.
    fn load(&self, quad_tree_id: u64) -> TileResult<QuadTreeGenerator>;
}

/// Stored state of one quadtree: its image and optional alignment.
#[derive(Debug, Clone)]
pub struct QuadTreeRecord {
    pub image: Raster,
    pub transform: Option<SerializedTransform>,
}

/// Generator source backed by a map of records.
#[derive(Debug, Default)]
pub struct MemoryGeneratorSource {
    records: HashMap<u64, QuadTreeRecord>,
    config: GeneratorConfig,
}

impl MemoryGeneratorSource {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            records: HashMap::new(),
            config,
        }
    }

    pub fn insert(&mut self, quad_tree_id: u64, record: QuadTreeRecord) {
        self.records.insert(quad_tree_id, record);
    }

    pub fn remove(&mut self, quad_tree_id: u64) -> Option<QuadTreeRecord> {
        self.records.remove(&quad_tree_id)
    }
}

impl GeneratorSource for MemoryGeneratorSource {
    fn load(&self, quad_tree_id: u64) -> TileResult<QuadTreeGenerator> {
        let record = self
            .records
            .get(&quad_tree_id)
            .ok_or(TileError::NotFound(quad_tree_id))?;
        QuadTreeGenerator::from_record(
            quad_tree_id,
            record.image.clone(),
            record.transform.as_ref(),
            self.config.clone(),
        )
    }
}

static TRANSPARENT_PNG: OnceLock<Arc<[u8]>> = OnceLock::new();

/// The fully transparent 256x256 PNG served for blank requests.
pub fn transparent_tile() -> TileResult<Tile> {
    if let Some(data) = TRANSPARENT_PNG.get() {
        return Ok(Tile::png_shared(data.clone()));
    }
    let raster: Raster = RasterMut::new(TILE_SIZE, TILE_SIZE)?.into();
    let data: Arc<[u8]> = tiepoint_io::encode_png(&raster)?.into();
    Ok(Tile::png_shared(TRANSPARENT_PNG.get_or_init(|| data).clone()))
}

/// Cached tile server over a generator source.
pub struct TileService<S> {
    source: S,
    generators: GeneratorCache,
    tiles: TileCache,
}

impl<S: GeneratorSource> TileService<S> {
    pub fn new(source: S, config: &ServiceConfig) -> Self {
        Self {
            source,
            generators: GeneratorCache::new(config.generator_cache_capacity),
            tiles: TileCache::new(config.tile_cache_capacity),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Generator for `quad_tree_id`, loaded on a cache miss.
    pub fn generator(&self, quad_tree_id: u64) -> TileResult<Arc<QuadTreeGenerator>> {
        self.generators
            .get_or_load(quad_tree_id, || self.source.load(quad_tree_id))
    }

    /// Encoded tile `(zoom, x, y)` of a quadtree.
    ///
    /// Tiles above the maximum zoom or outside the bounds come back as
    /// [`transparent_tile`].
    ///
    /// # Errors
    ///
    /// [`TileError::NotFound`] for an unknown quadtree, or any error from
    /// loading the generator or rendering the tile.
    pub fn get_tile(&self, quad_tree_id: u64, zoom: u32, x: u64, y: u64) -> TileResult<Tile> {
        let key = TileKey::new(quad_tree_id, zoom, x, y);
        if let Some(tile) = self.tiles.get(&key) {
            return Ok(tile);
        }
        let generator = self.generator(quad_tree_id)?;
        let tile = match generator.tile(zoom, x, y) {
            Ok(tile) => tile,
            Err(e) if e.is_blank_tile() => {
                debug!("{}: {e}, serving transparent tile", key.cache_key());
                transparent_tile()?
            }
            Err(e) => return Err(e),
        };
        self.tiles.insert(key, tile.clone());
        Ok(tile)
    }

    /// Forget the generator and every cached tile of a quadtree, e.g. after
    /// its alignment changed.
    pub fn invalidate(&self, quad_tree_id: u64) {
        self.generators.remove(quad_tree_id);
        self.tiles.evict_quad_tree(quad_tree_id);
    }

    pub fn cached_generators(&self) -> usize {
        self.generators.len()
    }

    pub fn cached_tiles(&self) -> usize {
        self.tiles.len()
    }
}
