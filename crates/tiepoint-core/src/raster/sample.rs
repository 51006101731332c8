//! Sampling at fractional pixel coordinates
//!
//! Coordinates are continuous: pixel `(i, j)` covers `[i, i+1) x [j, j+1)`
//! and its center sits at `(i + 0.5, j + 0.5)`. Any coordinate outside
//! `[0, width) x [0, height)` samples as [`TRANSPARENT`].

use super::{Raster, TRANSPARENT};
use serde::{Deserialize, Serialize};

/// Resampling method used when reading a raster at fractional coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resample {
    /// Nearest neighbor
    Nearest,
    /// Bilinear interpolation of the four surrounding pixel centers
    #[default]
    Bilinear,
}

impl Raster {
    /// Sample the raster at a continuous coordinate.
    pub fn sample(&self, x: f64, y: f64, method: Resample) -> u32 {
        match method {
            Resample::Nearest => self.sample_nearest(x, y),
            Resample::Bilinear => self.sample_bilinear(x, y),
        }
    }

    /// Nearest-neighbor sample; transparent outside the raster.
    pub fn sample_nearest(&self, x: f64, y: f64) -> u32 {
        if !self.contains(x, y) {
            return TRANSPARENT;
        }
        self.get_pixel_unchecked(x as u32, y as u32)
    }

    /// Bilinear sample; transparent outside the raster.
    ///
    /// Near the border the missing neighbors are clamped to the edge pixel.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> u32 {
        if !self.contains(x, y) {
            return TRANSPARENT;
        }
        let max_x = self.width() as i64 - 1;
        let max_y = self.height() as i64 - 1;

        let sx = x - 0.5;
        let sy = y - 0.5;
        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = (sx - x0) as f32;
        let fy = (sy - y0) as f32;

        let cx = |v: i64| v.clamp(0, max_x) as u32;
        let cy = |v: i64| v.clamp(0, max_y) as u32;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let p00 = self.get_pixel_unchecked(cx(x0), cy(y0));
        let p10 = self.get_pixel_unchecked(cx(x0 + 1), cy(y0));
        let p01 = self.get_pixel_unchecked(cx(x0), cy(y0 + 1));
        let p11 = self.get_pixel_unchecked(cx(x0 + 1), cy(y0 + 1));

        let mut out = 0u32;
        for shift in [24u32, 16, 8, 0] {
            let ch = |p: u32| (p >> shift) & 0xff;
            let v = interpolate_channel(ch(p00), ch(p10), ch(p01), ch(p11), fx, fy);
            out |= v.min(255) << shift;
        }
        out
    }

    #[inline]
    fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width() as f64 && y < self.height() as f64
    }
}

fn interpolate_channel(p00: u32, p10: u32, p01: u32, p11: u32, fx: f32, fy: f32) -> u32 {
    let top = p00 as f32 * (1.0 - fx) + p10 as f32 * fx;
    let bottom = p01 as f32 * (1.0 - fx) + p11 as f32 * fx;
    let result = top * (1.0 - fy) + bottom * fy;
    result.round() as u32
}
