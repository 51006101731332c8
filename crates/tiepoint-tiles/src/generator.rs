//! Quadtree tile generation
//!
//! A [`QuadTreeGenerator`] renders 256x256 tiles of one source image on
//! demand. An unaligned tree serves the image in its own pixel space; an
//! aligned tree warps it through a fitted [`Transform`] into the Web
//! Mercator tile pyramid.
//!
//! Warping evaluates the inverse transform exactly on a grid of patch
//! corners and interpolates bilinearly inside each patch. Patches with a
//! corner the transform cannot map fall back to exact per-pixel
//! evaluation.

use crate::bounds::{MapBounds, map_bounds};
use crate::config::GeneratorConfig;
use crate::error::{TileError, TileResult};
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;
use tiepoint_core::mercator::{self, TILE_SIZE};
use tiepoint_core::{Point, Raster, RasterMut};
use tiepoint_transform::{PointTransform, SerializedTransform, Transform};

/// MIME type of every tile.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// An encoded tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub data: Arc<[u8]>,
    pub content_type: &'static str,
}

impl Tile {
    pub fn png(data: Vec<u8>) -> Self {
        Self::png_shared(data.into())
    }

    pub fn png_shared(data: Arc<[u8]>) -> Self {
        Self {
            data,
            content_type: PNG_CONTENT_TYPE,
        }
    }
}

/// Destination for a whole-pyramid walk.
pub trait TileSink {
    fn write_tile(&mut self, path: &str, data: &[u8]) -> TileResult<()>;
}

/// Sink collecting tiles in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub tiles: BTreeMap<String, Vec<u8>>,
}

impl TileSink for MemorySink {
    fn write_tile(&mut self, path: &str, data: &[u8]) -> TileResult<()> {
        self.tiles.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

#[derive(Debug)]
enum Layout {
    /// Image pixel space; `native_zoom` levels below the full-image tile
    Simple { native_zoom: u32 },
    Warped {
        transform: Transform,
        bounds: MapBounds,
    },
}

/// Tile renderer for one source image.
#[derive(Debug)]
pub struct QuadTreeGenerator {
    id: u64,
    image: Raster,
    config: GeneratorConfig,
    layout: Layout,
}

impl QuadTreeGenerator {
    /// Unaligned tree serving the raw image.
    ///
    /// The whole image fits in tile `(0, 0)` at `zoom_offset`; the image is
    /// shown at full resolution `ceil(log2(max(w, h) / 256))` levels deeper.
    pub fn simple(id: u64, image: Raster, config: GeneratorConfig) -> Self {
        let longest = f64::from(image.width().max(image.height()));
        let native_zoom = (longest / f64::from(TILE_SIZE)).log2().ceil().max(0.0) as u32;
        info!(
            "quadtree {id}: unaligned {}x{}, zoom {}..={}",
            image.width(),
            image.height(),
            config.zoom_offset,
            config.zoom_offset + native_zoom
        );
        Self {
            id,
            image,
            config,
            layout: Layout::Simple { native_zoom },
        }
    }

    /// Aligned tree warping the image through `transform`.
    ///
    /// # Errors
    ///
    /// [`TileError::NoBounds`] if no image corner maps onto the map.
    pub fn from_transform(
        id: u64,
        image: Raster,
        transform: Transform,
        config: GeneratorConfig,
    ) -> TileResult<Self> {
        let bounds = map_bounds(
            image.size(),
            &transform,
            config.edge_samples,
            config.max_zoom_limit,
        )?;
        info!(
            "quadtree {id}: {:?} aligned, bounds {:?}, zoom {}..={}",
            transform.kind(),
            bounds.lon_lat(),
            bounds.min_zoom,
            bounds.max_zoom
        );
        Ok(Self {
            id,
            image,
            config,
            layout: Layout::Warped { transform, bounds },
        })
    }

    /// Aligned tree from a stored transform record.
    pub fn warped(
        id: u64,
        image: Raster,
        record: &SerializedTransform,
        config: GeneratorConfig,
    ) -> TileResult<Self> {
        let transform = Transform::from_serialized(record)?;
        Self::from_transform(id, image, transform, config)
    }

    /// Unaligned tree when there is no transform, aligned otherwise.
    pub fn from_record(
        id: u64,
        image: Raster,
        record: Option<&SerializedTransform>,
        config: GeneratorConfig,
    ) -> TileResult<Self> {
        match record {
            Some(record) => Self::warped(id, image, record, config),
            None => Ok(Self::simple(id, image, config)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn image(&self) -> &Raster {
        &self.image
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn is_warped(&self) -> bool {
        matches!(self.layout, Layout::Warped { .. })
    }

    pub fn transform(&self) -> Option<&Transform> {
        match &self.layout {
            Layout::Warped { transform, .. } => Some(transform),
            Layout::Simple { .. } => None,
        }
    }

    pub fn map_bounds(&self) -> Option<&MapBounds> {
        match &self.layout {
            Layout::Warped { bounds, .. } => Some(bounds),
            Layout::Simple { .. } => None,
        }
    }

    pub fn min_zoom(&self) -> u32 {
        match &self.layout {
            Layout::Simple { .. } => self.config.zoom_offset,
            Layout::Warped { bounds, .. } => bounds.min_zoom,
        }
    }

    pub fn max_zoom(&self) -> u32 {
        match &self.layout {
            Layout::Simple { native_zoom } => self.config.zoom_offset + native_zoom,
            Layout::Warped { bounds, .. } => bounds.max_zoom,
        }
    }

    /// Source pixels per tile pixel of an unaligned tree at `zoom`.
    fn simple_scale(&self, zoom: u32) -> f64 {
        2f64.powi((self.max_zoom() - zoom) as i32)
    }

    /// Inclusive range of tiles that can hold image content at `zoom`.
    pub fn tile_extent(&self, zoom: u32) -> ((u64, u64), (u64, u64)) {
        match &self.layout {
            Layout::Simple { .. } => {
                let span = f64::from(TILE_SIZE) * self.simple_scale(zoom.min(self.max_zoom()));
                let nx = (f64::from(self.image.width()) / span).ceil().max(1.0) as u64;
                let ny = (f64::from(self.image.height()) / span).ceil().max(1.0) as u64;
                ((0, 0), (nx - 1, ny - 1))
            }
            Layout::Warped { bounds, .. } => mercator::tile_range(zoom, &bounds.meters),
        }
    }

    fn check_tile(&self, zoom: u32, x: u64, y: u64) -> TileResult<()> {
        let max_zoom = self.max_zoom();
        if zoom > max_zoom {
            return Err(TileError::ZoomTooBig { zoom, max_zoom });
        }
        let out_of_bounds = TileError::OutOfBounds { zoom, x, y };
        match &self.layout {
            Layout::Simple { .. } => {
                let ((_, _), (x1, y1)) = self.tile_extent(zoom);
                if x > x1 || y > y1 {
                    return Err(out_of_bounds);
                }
            }
            Layout::Warped { bounds, .. } => {
                let n = mercator::tiles_at_zoom(zoom);
                if x >= n || y >= n {
                    return Err(out_of_bounds);
                }
                if !mercator::tile_bounds_meters(zoom, x, y).intersects(&bounds.meters) {
                    return Err(out_of_bounds);
                }
            }
        }
        Ok(())
    }

    /// Render tile `(zoom, x, y)` as a raster.
    ///
    /// # Errors
    ///
    /// [`TileError::ZoomTooBig`] above the maximum zoom and
    /// [`TileError::OutOfBounds`] for tiles that miss the image.
    pub fn render(&self, zoom: u32, x: u64, y: u64) -> TileResult<Raster> {
        self.check_tile(zoom, x, y)?;
        match &self.layout {
            Layout::Simple { .. } => self.render_simple(zoom, x, y),
            Layout::Warped { transform, .. } => self.render_warped(transform, zoom, x, y),
        }
    }

    /// Render and PNG-encode tile `(zoom, x, y)`.
    pub fn tile(&self, zoom: u32, x: u64, y: u64) -> TileResult<Tile> {
        let raster = self.render(zoom, x, y)?;
        Ok(Tile::png(tiepoint_io::encode_png(&raster)?))
    }

    fn render_simple(&self, zoom: u32, x: u64, y: u64) -> TileResult<Raster> {
        let scale = self.simple_scale(zoom);
        let size = TILE_SIZE;
        let x0 = (x * u64::from(size)) as f64;
        let y0 = (y * u64::from(size)) as f64;
        let mut out = RasterMut::new(size, size)?;
        for j in 0..size {
            let sy = (y0 + f64::from(j) + 0.5) * scale;
            for i in 0..size {
                let sx = (x0 + f64::from(i) + 0.5) * scale;
                out.set_pixel_unchecked(i, j, self.image.sample(sx, sy, self.config.resample));
            }
        }
        Ok(out.into())
    }

    fn render_warped(&self, transform: &Transform, zoom: u32, x: u64, y: u64) -> TileResult<Raster> {
        let size = TILE_SIZE;
        let patch = self.config.patch_size.clamp(1, size);
        let nodes = size.div_ceil(patch) as usize + 1;
        let node_pos = |k: usize| (k as u32 * patch).min(size) as f64;
        let origin_x = (x * u64::from(size)) as f64;
        let origin_y = (y * u64::from(size)) as f64;

        let source_at = |u: f64, v: f64| -> Option<Point> {
            let m = mercator::pixels_to_meters(origin_x + u, origin_y + v, zoom);
            transform.reverse(m).ok().filter(Point::is_finite)
        };

        let mut grid = Vec::with_capacity(nodes * nodes);
        for gj in 0..nodes {
            for gi in 0..nodes {
                grid.push(source_at(node_pos(gi), node_pos(gj)));
            }
        }

        let mut out = RasterMut::new(size, size)?;
        let mut exact = 0usize;
        for j in 0..size {
            let v = f64::from(j) + 0.5;
            let gj = (j / patch) as usize;
            let fy = (v - node_pos(gj)) / (node_pos(gj + 1) - node_pos(gj));
            for i in 0..size {
                let u = f64::from(i) + 0.5;
                let gi = (i / patch) as usize;
                let fx = (u - node_pos(gi)) / (node_pos(gi + 1) - node_pos(gi));

                let corners = (
                    grid[gj * nodes + gi],
                    grid[gj * nodes + gi + 1],
                    grid[(gj + 1) * nodes + gi],
                    grid[(gj + 1) * nodes + gi + 1],
                );
                let src = match corners {
                    (Some(a), Some(b), Some(c), Some(d)) => Some(bilerp(a, b, c, d, fx, fy)),
                    _ => {
                        exact += 1;
                        source_at(u, v)
                    }
                };
                if let Some(s) = src {
                    out.set_pixel_unchecked(i, j, self.image.sample(s.x, s.y, self.config.resample));
                }
            }
        }
        if exact > 0 {
            debug!("tile {zoom}/{x}/{y}: {exact} pixels evaluated exactly");
        }
        Ok(out.into())
    }

    /// Walk every tile from the minimum to the maximum zoom and hand the
    /// non-blank ones to `sink` as `{slug}/{z}/{x}/{y}.png`.
    ///
    /// Returns the number of tiles written.
    pub fn write_quad_tree(&self, sink: &mut dyn TileSink, slug: &str) -> TileResult<usize> {
        let mut written = 0;
        for zoom in self.min_zoom()..=self.max_zoom() {
            let ((x0, y0), (x1, y1)) = self.tile_extent(zoom);
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let raster = match self.render(zoom, x, y) {
                        Ok(raster) => raster,
                        Err(e) if e.is_blank_tile() => continue,
                        Err(e) => return Err(e),
                    };
                    if raster.is_fully_transparent() {
                        continue;
                    }
                    let data = tiepoint_io::encode_png(&raster)?;
                    sink.write_tile(&format!("{slug}/{zoom}/{x}/{y}.png"), &data)?;
                    written += 1;
                }
            }
        }
        info!("quadtree {}: wrote {written} tiles under {slug}", self.id);
        Ok(written)
    }
}

/// Bilinear blend of patch corners `a` (top left), `b` (top right),
/// `c` (bottom left) and `d` (bottom right).
#[inline]
fn bilerp(a: Point, b: Point, c: Point, d: Point, fx: f64, fy: f64) -> Point {
    let top_x = a.x + (b.x - a.x) * fx;
    let top_y = a.y + (b.y - a.y) * fx;
    let bottom_x = c.x + (d.x - c.x) * fx;
    let bottom_y = c.y + (d.y - c.y) * fx;
    Point::new(
        top_x + (bottom_x - top_x) * fy,
        top_y + (bottom_y - top_y) * fy,
    )
}
