//! Spherical (web) Mercator tile math
//!
//! Conversions between WGS84 longitude/latitude, projected meters and the
//! global pixel space of the power-of-two tile pyramid. Pixel and tile
//! coordinates follow the Google Maps convention: the origin is the
//! top-left corner of the world and `y` grows southward.

use crate::bounds::Bounds;
use crate::point::Point;
use std::f64::consts::PI;

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 256;

/// Equatorial radius of the spherical Mercator datum in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the world extent in projected meters.
pub const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS;

/// Meters per pixel at zoom 0.
pub const INITIAL_RESOLUTION: f64 = 2.0 * PI * EARTH_RADIUS / TILE_SIZE as f64;

/// Deepest zoom level the tile math supports.
pub const MAX_ZOOM: u32 = 30;

/// Convert WGS84 longitude/latitude in degrees to projected meters.
pub fn lon_lat_to_meters(lon: f64, lat: f64) -> Point {
    let mx = lon * ORIGIN_SHIFT / 180.0;
    let my = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    Point::new(mx, my * ORIGIN_SHIFT / 180.0)
}

/// Convert projected meters to `(lon, lat)` in degrees.
pub fn meters_to_lon_lat(m: Point) -> (f64, f64) {
    let lon = m.x / ORIGIN_SHIFT * 180.0;
    let lat = m.y / ORIGIN_SHIFT * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    (lon, lat)
}

/// Meters per pixel at `zoom`.
#[inline]
pub fn resolution(zoom: u32) -> f64 {
    INITIAL_RESOLUTION / 2f64.powi(zoom as i32)
}

/// Number of tiles along one axis at `zoom`.
#[inline]
pub fn tiles_at_zoom(zoom: u32) -> u64 {
    1u64 << zoom.min(MAX_ZOOM)
}

/// Convert global pixel coordinates at `zoom` to projected meters.
pub fn pixels_to_meters(px: f64, py: f64, zoom: u32) -> Point {
    let res = resolution(zoom);
    Point::new(px * res - ORIGIN_SHIFT, -py * res + ORIGIN_SHIFT)
}

/// Convert projected meters to global pixel coordinates at `zoom`.
pub fn meters_to_pixels(m: Point, zoom: u32) -> (f64, f64) {
    let res = resolution(zoom);
    ((m.x + ORIGIN_SHIFT) / res, (-m.y + ORIGIN_SHIFT) / res)
}

/// Footprint of tile `(x, y)` at `zoom` in projected meters.
pub fn tile_bounds_meters(zoom: u32, x: u64, y: u64) -> Bounds {
    let size = TILE_SIZE as f64;
    let top_left = pixels_to_meters(x as f64 * size, y as f64 * size, zoom);
    let bottom_right = pixels_to_meters((x + 1) as f64 * size, (y + 1) as f64 * size, zoom);
    Bounds::new(top_left.x, bottom_right.y, bottom_right.x, top_left.y)
}

/// Tile containing a projected point at `zoom`, clamped to the pyramid.
pub fn tile_index(zoom: u32, m: Point) -> (u64, u64) {
    let (px, py) = meters_to_pixels(m, zoom);
    let last = (tiles_at_zoom(zoom) - 1) as f64;
    let tx = (px / TILE_SIZE as f64).floor().clamp(0.0, last);
    let ty = (py / TILE_SIZE as f64).floor().clamp(0.0, last);
    (tx as u64, ty as u64)
}

/// Inclusive range of tiles covering `bounds` at `zoom`, as
/// `((min_x, min_y), (max_x, max_y))`.
pub fn tile_range(zoom: u32, bounds: &Bounds) -> ((u64, u64), (u64, u64)) {
    let (x0, y0) = tile_index(zoom, Point::new(bounds.min_x, bounds.max_y));
    let (x1, y1) = tile_index(zoom, Point::new(bounds.max_x, bounds.min_y));
    ((x0, y0), (x1, y1))
}

/// Largest zoom at which `bounds` still fits inside a single tile.
pub fn largest_zoom_containing(bounds: &Bounds) -> u32 {
    for zoom in 1..=MAX_ZOOM {
        let ((x0, y0), (x1, y1)) = tile_range(zoom, bounds);
        if x0 != x1 || y0 != y1 {
            return zoom - 1;
        }
    }
    MAX_ZOOM
}

/// Smallest zoom whose resolution is at least as fine as
/// `meters_per_pixel`.
pub fn zoom_for_pixel_size(meters_per_pixel: f64) -> u32 {
    if !(meters_per_pixel > 0.0) {
        return MAX_ZOOM;
    }
    let zoom = (INITIAL_RESOLUTION / meters_per_pixel).log2().ceil();
    zoom.clamp(0.0, MAX_ZOOM as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lon_lat_round_trip() {
        for &(lon, lat) in &[(0.0, 0.0), (-122.4, 37.8), (179.9, -84.9), (-87.4, 29.3)] {
            let m = lon_lat_to_meters(lon, lat);
            let (lon2, lat2) = meters_to_lon_lat(m);
            assert_abs_diff_eq!(lon, lon2, epsilon = 1e-9);
            assert_abs_diff_eq!(lat, lat2, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_world_extent() {
        let m = lon_lat_to_meters(180.0, 0.0);
        assert_abs_diff_eq!(m.x, ORIGIN_SHIFT, epsilon = 1e-6);
        assert_abs_diff_eq!(m.y, 0.0, epsilon = 1e-6);
        let b = tile_bounds_meters(0, 0, 0);
        assert_abs_diff_eq!(b.min_x, -ORIGIN_SHIFT, epsilon = 1e-6);
        assert_abs_diff_eq!(b.max_y, ORIGIN_SHIFT, epsilon = 1e-6);
    }

    #[test]
    fn test_pixels_meters_inverse() {
        let m = Point::new(1234567.0, -7654321.0);
        let (px, py) = meters_to_pixels(m, 12);
        let back = pixels_to_meters(px, py, 12);
        assert_abs_diff_eq!(back.x, m.x, epsilon = 1e-6);
        assert_abs_diff_eq!(back.y, m.y, epsilon = 1e-6);
    }

    #[test]
    fn test_tile_index_google_convention() {
        // North-west quadrant is tile (0, 0) at zoom 1
        assert_eq!(tile_index(1, Point::new(-1.0, 1.0)), (0, 0));
        assert_eq!(tile_index(1, Point::new(1.0, -1.0)), (1, 1));
    }

    #[test]
    fn test_largest_zoom_containing() {
        // A box straddling the origin never fits in one tile past zoom 0
        let b = Bounds::new(-10.0, -10.0, 10.0, 10.0);
        assert_eq!(largest_zoom_containing(&b), 0);
        let t = tile_bounds_meters(5, 3, 7);
        let inner = Bounds::new(t.min_x + 1.0, t.min_y + 1.0, t.max_x - 1.0, t.max_y - 1.0);
        assert_eq!(largest_zoom_containing(&inner), 5);
    }

    #[test]
    fn test_zoom_for_pixel_size() {
        assert_eq!(zoom_for_pixel_size(INITIAL_RESOLUTION), 0);
        assert_eq!(zoom_for_pixel_size(resolution(10)), 10);
        assert_eq!(zoom_for_pixel_size(resolution(10) * 0.9), 11);
        assert_eq!(zoom_for_pixel_size(0.0), MAX_ZOOM);
    }
}
