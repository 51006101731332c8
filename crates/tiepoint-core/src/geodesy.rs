//! Geodesy primitives
//!
//! Earth-centered, Earth-fixed (ECEF) conversions on a reference ellipsoid
//! and ray/sphere intersection. Angles are in degrees, distances in meters.
//!
//! The free functions [`lon_lat_alt_to_ecef`] and [`ecef_to_lon_lat_alt`]
//! use WGS84. Code that intersects rays with the spherical Earth of radius
//! [`EARTH_RADIUS_METERS`] should convert with [`Ellipsoid::SPHERE`] so that
//! points on the sphere come back at altitude zero.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for ray intersection.
pub const EARTH_RADIUS_METERS: f64 = 6_371_010.0;

/// Geodetic position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LonLatAlt {
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
    /// Height above the ellipsoid in meters
    pub alt: f64,
}

impl LonLatAlt {
    pub const fn new(lon: f64, lat: f64, alt: f64) -> Self {
        Self { lon, lat, alt }
    }
}

/// Reference ellipsoid of revolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis
    pub a: f64,
    /// Semi-minor axis
    pub b: f64,
}

impl Ellipsoid {
    /// WGS84 datum.
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        b: 6_356_752.314_245_179,
    };

    /// Sphere of radius [`EARTH_RADIUS_METERS`].
    pub const SPHERE: Ellipsoid = Ellipsoid {
        a: EARTH_RADIUS_METERS,
        b: EARTH_RADIUS_METERS,
    };

    /// First eccentricity squared.
    #[inline]
    pub fn e2(&self) -> f64 {
        1.0 - (self.b * self.b) / (self.a * self.a)
    }

    /// Convert a geodetic position to ECEF.
    pub fn lon_lat_alt_to_ecef(&self, lla: LonLatAlt) -> Point3<f64> {
        let lon = lla.lon.to_radians();
        let lat = lla.lat.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let e2 = self.e2();
        let n = self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let r = (n + lla.alt) * cos_lat;
        Point3::new(
            r * lon.cos(),
            r * lon.sin(),
            (n * (1.0 - e2) + lla.alt) * sin_lat,
        )
    }

    /// Convert an ECEF position to geodetic coordinates.
    ///
    /// Latitude is refined by fixed-point iteration, which converges to
    /// well below a millimeter for points near the Earth's surface.
    pub fn ecef_to_lon_lat_alt(&self, ecef: &Point3<f64>) -> LonLatAlt {
        let (x, y, z) = (ecef.x, ecef.y, ecef.z);
        let e2 = self.e2();
        let p = x.hypot(y);
        let lon = y.atan2(x);

        let mut lat = z.atan2(p * (1.0 - e2));
        for _ in 0..8 {
            let sin_lat = lat.sin();
            let n = self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
            let alt = p * lat.cos() + z * sin_lat - self.a * self.a / n;
            lat = z.atan2(p * (1.0 - e2 * n / (n + alt)));
        }

        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let alt = p * cos_lat + z * sin_lat - self.a * self.a / n;
        LonLatAlt::new(lon.to_degrees(), lat.to_degrees(), alt)
    }
}

/// Convert a WGS84 geodetic position to ECEF.
pub fn lon_lat_alt_to_ecef(lla: LonLatAlt) -> Point3<f64> {
    Ellipsoid::WGS84.lon_lat_alt_to_ecef(lla)
}

/// Convert an ECEF position to WGS84 geodetic coordinates.
pub fn ecef_to_lon_lat_alt(ecef: &Point3<f64>) -> LonLatAlt {
    Ellipsoid::WGS84.ecef_to_lon_lat_alt(ecef)
}

/// Half-line with an origin and a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3 {
    pub origin: Point3<f64>,
    pub dir: Vector3<f64>,
}

impl Ray3 {
    /// Create a ray; the direction is normalized.
    pub fn new(origin: Point3<f64>, dir: Vector3<f64>) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
        }
    }

    /// Point at distance `t` along the ray.
    #[inline]
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.dir * t
    }
}

/// Sphere in 3D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

impl Sphere {
    pub const fn new(center: Point3<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    /// The spherical Earth used for ray intersection.
    pub fn earth() -> Self {
        Self::new(Point3::origin(), EARTH_RADIUS_METERS)
    }

    /// Distance along `ray` to the first intersection with the sphere
    /// surface, or `None` if the ray misses.
    ///
    /// A ray starting inside the sphere hits the far side.
    pub fn intersect(&self, ray: &Ray3) -> Option<f64> {
        let oc = ray.origin - self.center;
        let b = oc.dot(&ray.dir);
        let c = oc.norm_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if !(disc >= 0.0) {
            return None;
        }
        let sq = disc.sqrt();
        let near = -b - sq;
        let far = -b + sq;
        if near >= 0.0 {
            Some(near)
        } else if far >= 0.0 {
            Some(far)
        } else {
            None
        }
    }
}
