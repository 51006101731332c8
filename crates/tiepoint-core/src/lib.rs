//! tiepoint core - geometry, raster and projection primitives
//!
//! This crate provides the data structures shared by the transform fitting
//! engine and the tile generator:
//!
//! - [`Point`] / [`Correspondence`] / [`TiePoints`] - Tie-point sets
//! - [`Raster`] / [`RasterMut`] - RGBA image container with fractional sampling
//! - [`Bounds`] / [`LonLatBounds`] - Bounding boxes
//! - [`GeoTransform`] / [`GeoImage`] - North-up georeferenced rasters
//! - [`mercator`] - Web Mercator tile math
//! - [`geodesy`] - ECEF conversion and ray/sphere intersection

pub mod bounds;
pub mod error;
pub mod geodesy;
pub mod geotransform;
pub mod mercator;
pub mod point;
pub mod raster;

pub use bounds::{Bounds, LonLatBounds};
pub use error::{Error, Result};
pub use geodesy::{Ellipsoid, LonLatAlt, Ray3, Sphere};
pub use geotransform::{GeoImage, GeoTransform, MapProjection, WebMercator};
pub use point::{Correspondence, Point, TiePoints};
pub use raster::{Raster, RasterMut, Resample};

/// Color channel helpers for 32-bit RGBA pixels.
///
/// # Pixel format
///
/// 32-bit pixels are stored as `0xRRGGBBAA` (red in MSB, alpha in LSB).
pub mod color {
    /// Shift amounts for extracting color channels
    pub const RED_SHIFT: u32 = 24;
    pub const GREEN_SHIFT: u32 = 16;
    pub const BLUE_SHIFT: u32 = 8;
    pub const ALPHA_SHIFT: u32 = 0;

    /// Extract red component from a 32-bit pixel.
    #[inline]
    pub fn red(pixel: u32) -> u8 {
        ((pixel >> RED_SHIFT) & 0xff) as u8
    }

    /// Extract green component from a 32-bit pixel.
    #[inline]
    pub fn green(pixel: u32) -> u8 {
        ((pixel >> GREEN_SHIFT) & 0xff) as u8
    }

    /// Extract blue component from a 32-bit pixel.
    #[inline]
    pub fn blue(pixel: u32) -> u8 {
        ((pixel >> BLUE_SHIFT) & 0xff) as u8
    }

    /// Extract alpha component from a 32-bit pixel.
    #[inline]
    pub fn alpha(pixel: u32) -> u8 {
        ((pixel >> ALPHA_SHIFT) & 0xff) as u8
    }

    /// Compose an opaque 32-bit pixel.
    #[inline]
    pub fn compose_rgb(r: u8, g: u8, b: u8) -> u32 {
        compose_rgba(r, g, b, 255)
    }

    /// Compose a 32-bit RGBA pixel.
    #[inline]
    pub fn compose_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
        ((r as u32) << RED_SHIFT)
            | ((g as u32) << GREEN_SHIFT)
            | ((b as u32) << BLUE_SHIFT)
            | ((a as u32) << ALPHA_SHIFT)
    }

    /// Extract RGBA values from a 32-bit pixel.
    #[inline]
    pub fn extract_rgba(pixel: u32) -> (u8, u8, u8, u8) {
        (red(pixel), green(pixel), blue(pixel), alpha(pixel))
    }

}
