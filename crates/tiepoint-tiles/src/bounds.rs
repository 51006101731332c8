//! Map footprint of a transformed image
//!
//! The footprint is the bounding box, in Web Mercator meters, of the image
//! corners (and optionally points along the edges) pushed through the
//! forward transform. It fixes the zoom range of a warped quadtree.

use crate::error::{TileError, TileResult};
use log::warn;
use tiepoint_core::{Bounds, LonLatBounds, Point, mercator};
use tiepoint_transform::{PointTransform, Transform};

/// Footprint and zoom range of an aligned image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    /// Footprint in projected meters
    pub meters: Bounds,
    pub min_zoom: u32,
    pub max_zoom: u32,
}

impl MapBounds {
    /// Geographic form of the footprint.
    pub fn lon_lat(&self) -> LonLatBounds {
        meters_to_lon_lat_bounds(&self.meters)
    }
}

/// Image corners followed by `edge_samples` interior points per edge.
pub fn image_sample_points(width: u32, height: u32, edge_samples: usize) -> Vec<Point> {
    let (w, h) = (f64::from(width), f64::from(height));
    let mut points = vec![
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(0.0, h),
        Point::new(w, h),
    ];
    for i in 1..=edge_samples {
        let t = i as f64 / (edge_samples + 1) as f64;
        points.push(Point::new(t * w, 0.0));
        points.push(Point::new(t * w, h));
        points.push(Point::new(0.0, t * h));
        points.push(Point::new(w, t * h));
    }
    points
}

/// Bounding box in meters of the sample points that map successfully.
///
/// Points the transform cannot map (a camera ray past the horizon, a
/// point on the projective line at infinity) are skipped.
///
/// # Errors
///
/// [`TileError::NoBounds`] if no point maps; unrecoverable transform
/// errors are passed through.
pub fn meters_bounds(
    image_size: (u32, u32),
    transform: &Transform,
    edge_samples: usize,
) -> TileResult<Bounds> {
    let mut mapped = Vec::new();
    for p in image_sample_points(image_size.0, image_size.1, edge_samples) {
        match transform.forward(p) {
            Ok(m) => mapped.push(m),
            Err(e) if e.is_recoverable() => {
                warn!("skipping image point ({}, {}) in bounds: {e}", p.x, p.y);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Bounds::from_points(&mapped).ok_or(TileError::NoBounds)
}

fn meters_to_lon_lat_bounds(b: &Bounds) -> LonLatBounds {
    let (min_lon, min_lat) = mercator::meters_to_lon_lat(Point::new(b.min_x, b.min_y));
    let (max_lon, max_lat) = mercator::meters_to_lon_lat(Point::new(b.max_x, b.max_y));
    LonLatBounds::new(min_lon, min_lat, max_lon, max_lat)
}

/// Geographic bounds of an image under `transform`, from its corners.
pub fn compute_bounds(image_size: (u32, u32), transform: &Transform) -> TileResult<LonLatBounds> {
    let meters = meters_bounds(image_size, transform, 0)?;
    Ok(meters_to_lon_lat_bounds(&meters))
}

/// Zoom range for a footprint covered by an image of `image_size` pixels.
///
/// The minimum is the deepest zoom at which the footprint fits in one
/// tile; the maximum is the first zoom at least as fine as the image's own
/// meters per pixel. Both are clamped to `max_zoom_limit`.
pub fn zoom_range(meters: &Bounds, image_size: (u32, u32), max_zoom_limit: u32) -> (u32, u32) {
    let limit = max_zoom_limit.min(mercator::MAX_ZOOM);
    let min_zoom = mercator::largest_zoom_containing(meters).min(limit);
    let image_diagonal = f64::from(image_size.0).hypot(f64::from(image_size.1));
    let meters_per_pixel = meters.diagonal() / image_diagonal;
    let max_zoom = mercator::zoom_for_pixel_size(meters_per_pixel).clamp(min_zoom, limit);
    (min_zoom, max_zoom)
}

/// Footprint and zoom range of an image under `transform`.
pub fn map_bounds(
    image_size: (u32, u32),
    transform: &Transform,
    edge_samples: usize,
    max_zoom_limit: u32,
) -> TileResult<MapBounds> {
    let meters = meters_bounds(image_size, transform, edge_samples)?;
    let (min_zoom, max_zoom) = zoom_range(&meters, image_size, max_zoom_limit);
    Ok(MapBounds {
        meters,
        min_zoom,
        max_zoom,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tiepoint_transform::TranslateTransform;

    fn shift(tx: f64, ty: f64) -> Transform {
        Transform::Translate(TranslateTransform::new(tx, ty))
    }

    #[test]
    fn test_sample_points() {
        assert_eq!(image_sample_points(10, 20, 0).len(), 4);
        let pts = image_sample_points(10, 20, 3);
        assert_eq!(pts.len(), 16);
        assert!(pts.contains(&Point::new(5.0, 0.0)));
        assert!(pts.contains(&Point::new(10.0, 10.0)));
    }

    #[test]
    fn test_compute_bounds_translation() {
        let t = shift(1000.0, 2000.0);
        let b = compute_bounds((100, 50), &t).unwrap();
        let (lon, lat) = mercator::meters_to_lon_lat(Point::new(1000.0, 2000.0));
        assert_abs_diff_eq!(b.min_lon, lon, epsilon = 1e-12);
        assert_abs_diff_eq!(b.min_lat, lat, epsilon = 1e-12);
        assert!(b.max_lon > b.min_lon && b.max_lat > b.min_lat);
    }

    #[test]
    fn test_zoom_range() {
        // Slightly coarser than zoom 10 at 250 px across
        let footprint = mercator::tile_bounds_meters(10, 100, 200);
        let inset = Bounds::new(
            footprint.min_x + 1.0,
            footprint.min_y + 1.0,
            footprint.max_x - 1.0,
            footprint.max_y - 1.0,
        );
        let (min_zoom, max_zoom) = zoom_range(&inset, (250, 250), 23);
        assert_eq!(min_zoom, 10);
        assert_eq!(max_zoom, 10);
        assert_eq!(zoom_range(&inset, (250, 250), 8), (8, 8));
        assert_eq!(zoom_range(&inset, (1000, 1000), 23), (10, 12));
    }
}
