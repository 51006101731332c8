//! Georeferenced raster coordinates
//!
//! A [`GeoTransform`] maps raster pixel coordinates of a north-up image to
//! projected map coordinates. [`GeoImage`] bundles one with its inverse, the
//! raster shape and a [`MapProjection`] so pixels, projected coordinates and
//! geodetic positions can be converted in any direction.

use crate::error::{Error, Result};
use crate::geodesy::LonLatAlt;
use crate::mercator;
use crate::point::Point;
use nalgebra::{Matrix2x3, Matrix3, Vector3};

/// Affine pixel-to-map transform stored as a 2x3 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    matrix: Matrix2x3<f64>,
}

impl GeoTransform {
    /// Build from a GDAL-style `[x0, dx, rot_x, y0, rot_y, dy]` array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RotatedGeoTransform`] if either rotation term is
    /// nonzero.
    pub fn from_gdal(coeffs: [f64; 6]) -> Result<Self> {
        let [x0, dx, rot_x, y0, rot_y, dy] = coeffs;
        if rot_x != 0.0 || rot_y != 0.0 {
            return Err(Error::RotatedGeoTransform { rot_x, rot_y });
        }
        Ok(Self {
            matrix: Matrix2x3::new(dx, 0.0, x0, 0.0, dy, y0),
        })
    }

    /// Wrap an arbitrary 2x3 affine matrix.
    pub fn from_matrix(matrix: Matrix2x3<f64>) -> Self {
        Self { matrix }
    }

    /// The 2x3 matrix.
    pub fn matrix(&self) -> &Matrix2x3<f64> {
        &self.matrix
    }

    /// Invert by augmenting to 3x3 with a `[0, 0, 1]` row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SingularMatrix`] if the transform is not invertible.
    pub fn invert(&self) -> Result<Self> {
        let m = &self.matrix;
        let aug = Matrix3::new(
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            0.0,
            0.0,
            1.0,
        );
        let inv = aug.try_inverse().ok_or(Error::SingularMatrix)?;
        Ok(Self {
            matrix: inv.fixed_view::<2, 3>(0, 0).into_owned(),
        })
    }

    /// Apply to a single point.
    #[inline]
    pub fn apply_point(&self, p: Point) -> Point {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        Point::new(v.x, v.y)
    }

    /// Apply to every point.
    pub fn apply(&self, points: &[Point]) -> Vec<Point> {
        points.iter().map(|&p| self.apply_point(p)).collect()
    }
}

/// A map projection between geodetic and projected coordinates.
pub trait MapProjection {
    /// Projected coordinates to `(lon, lat)` in degrees.
    fn inverse(&self, projected: Point) -> (f64, f64);

    /// `(lon, lat)` in degrees to projected coordinates.
    fn forward(&self, lon: f64, lat: f64) -> Point;
}

/// Spherical Mercator with `a = b = 6378137`, as used by web map tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebMercator;

impl MapProjection for WebMercator {
    fn inverse(&self, projected: Point) -> (f64, f64) {
        mercator::meters_to_lon_lat(projected)
    }

    fn forward(&self, lon: f64, lat: f64) -> Point {
        mercator::lon_lat_to_meters(lon, lat)
    }
}

/// A north-up georeferenced raster.
#[derive(Debug, Clone)]
pub struct GeoImage<P: MapProjection> {
    geo_transform: GeoTransform,
    inverse: GeoTransform,
    width: u32,
    height: u32,
    projection: P,
}

impl<P: MapProjection> GeoImage<P> {
    /// Create from a geotransform, raster shape and projection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SingularMatrix`] if the geotransform cannot be
    /// inverted.
    pub fn new(geo_transform: GeoTransform, shape: (u32, u32), projection: P) -> Result<Self> {
        let inverse = geo_transform.invert()?;
        Ok(Self {
            geo_transform,
            inverse,
            width: shape.0,
            height: shape.1,
            projection,
        })
    }

    pub fn geo_transform(&self) -> &GeoTransform {
        &self.geo_transform
    }

    pub fn map_projected_from_pixels(&self, pixels: &[Point]) -> Vec<Point> {
        self.geo_transform.apply(pixels)
    }

    pub fn pixels_from_map_projected(&self, projected: &[Point]) -> Vec<Point> {
        self.inverse.apply(projected)
    }

    /// Projected coordinates to geodetic positions at altitude zero.
    pub fn lon_lat_alts_from_map_projected(&self, projected: &[Point]) -> Vec<LonLatAlt> {
        projected
            .iter()
            .map(|&p| {
                let (lon, lat) = self.projection.inverse(p);
                LonLatAlt::new(lon, lat, 0.0)
            })
            .collect()
    }

    /// Geodetic positions to projected coordinates; altitude is ignored.
    pub fn map_projected_from_lon_lat_alts(&self, positions: &[LonLatAlt]) -> Vec<Point> {
        positions
            .iter()
            .map(|lla| self.projection.forward(lla.lon, lla.lat))
            .collect()
    }

    pub fn lon_lat_alts_from_pixels(&self, pixels: &[Point]) -> Vec<LonLatAlt> {
        self.lon_lat_alts_from_map_projected(&self.map_projected_from_pixels(pixels))
    }

    pub fn pixels_from_lon_lat_alts(&self, positions: &[LonLatAlt]) -> Vec<Point> {
        self.pixels_from_map_projected(&self.map_projected_from_lon_lat_alts(positions))
    }

    /// Raster `(width, height)`.
    pub fn shape(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Geodetic position of the raster center.
    pub fn center_lon_lat_alt(&self) -> LonLatAlt {
        let center = Point::new(self.width as f64 / 2.0, self.height as f64 / 2.0);
        let (lon, lat) = self
            .projection
            .inverse(self.geo_transform.apply_point(center));
        LonLatAlt::new(lon, lat, 0.0)
    }
}
