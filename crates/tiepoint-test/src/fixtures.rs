//! Synthetic fixtures
//!
//! Deterministic rasters and tie-point sets built from known mappings, so
//! fitted transforms can be checked against ground truth.

use crate::error::TestResult;
use tiepoint_core::{Point, Raster, RasterMut, TiePoints, color};

/// Checkerboard of opaque black and white cells of `cell` pixels.
pub fn checkerboard(width: u32, height: u32, cell: u32) -> TestResult<Raster> {
    let cell = cell.max(1);
    let black = color::compose_rgb(0, 0, 0);
    let white = color::compose_rgb(255, 255, 255);
    let mut raster = RasterMut::new(width, height)?;
    for y in 0..height {
        for x in 0..width {
            let v = if ((x / cell) + (y / cell)) % 2 == 0 {
                white
            } else {
                black
            };
            raster.set_pixel_unchecked(x, y, v);
        }
    }
    Ok(raster.into())
}

/// Opaque gradient: red grows with x, green with y, blue is constant.
pub fn gradient(width: u32, height: u32) -> TestResult<Raster> {
    let mut raster = RasterMut::new(width, height)?;
    let sx = 255.0 / (width.max(2) - 1) as f64;
    let sy = 255.0 / (height.max(2) - 1) as f64;
    for y in 0..height {
        for x in 0..width {
            let r = (x as f64 * sx).round() as u8;
            let g = (y as f64 * sy).round() as u8;
            raster.set_pixel_unchecked(x, y, color::compose_rgb(r, g, 128));
        }
    }
    Ok(raster.into())
}

/// `nx * ny` points evenly spread over `[0, width] x [0, height]`,
/// corners included.
pub fn grid_points(width: f64, height: f64, nx: usize, ny: usize) -> Vec<Point> {
    let nx = nx.max(2);
    let ny = ny.max(2);
    let mut points = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            points.push(Point::new(
                width * i as f64 / (nx - 1) as f64,
                height * j as f64 / (ny - 1) as f64,
            ));
        }
    }
    points
}

/// Pair each source point with its image under `map`.
pub fn tie_points_from_map<F>(from: &[Point], map: F) -> TiePoints
where
    F: Fn(Point) -> Point,
{
    let mut points = TiePoints::new();
    for &p in from {
        points.push(map(p), p);
    }
    points
}

/// A homography given as a row-major 3x3 matrix, applied with projective
/// division.
pub fn apply_homography(h: &[[f64; 3]; 3], p: Point) -> Point {
    let w = h[2][0] * p.x + h[2][1] * p.y + h[2][2];
    Point::new(
        (h[0][0] * p.x + h[0][1] * p.y + h[0][2]) / w,
        (h[1][0] * p.x + h[1][1] * p.y + h[1][2]) / w,
    )
}
