//! Orbital camera model
//!
//! Maps image pixels to Web Mercator meters by casting rays from a nadir
//! pinhole camera onto the spherical Earth. The five parameters
//! `[lat, lon, alt, fx, fy]` are seeded from per-image metadata and refined
//! against the tie points.

use crate::error::{TransformError, TransformResult};
use crate::optimize::SolveOptions;
use crate::ray::{CAMERA_DATUM, ecef_to_image_coord, image_coord_to_ecef};
use crate::transform::{PointTransform, check_points, refine};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tiepoint_core::geodesy::LonLatAlt;
use tiepoint_core::{Point, mercator};

/// Identifier of a mission photograph, e.g. `ISS039-E-1640`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId {
    pub mission: String,
    pub roll: String,
    pub frame: String,
}

impl ImageId {
    pub fn new(mission: &str, roll: &str, frame: &str) -> Self {
        Self {
            mission: mission.to_string(),
            roll: roll.to_string(),
            frame: frame.to_string(),
        }
    }
}

impl FromStr for ImageId {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        match parts.as_slice() {
            [mission, roll, frame] if !mission.is_empty() && !frame.is_empty() => {
                Ok(Self::new(mission, roll, frame))
            }
            _ => Err(TransformError::MetadataUnavailable(format!(
                "malformed image id {s:?}"
            ))),
        }
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.mission, self.roll, self.frame)
    }
}

/// Camera position and intrinsics at exposure time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraMetadata {
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Meters above the sphere
    pub altitude: f64,
    /// `(fx, fy)` in pixels
    pub focal_length: (f64, f64),
    pub width: u32,
    pub height: u32,
}

/// Lookup of camera metadata by image id.
pub trait CameraMetadataSource: Send + Sync {
    fn lookup(&self, id: &ImageId) -> Option<CameraMetadata>;
}

/// In-memory metadata table.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataSource {
    entries: HashMap<ImageId, CameraMetadata>,
}

impl StaticMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ImageId, metadata: CameraMetadata) {
        self.entries.insert(id, metadata);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CameraMetadataSource for StaticMetadataSource {
    fn lookup(&self, id: &ImageId) -> Option<CameraMetadata> {
        self.entries.get(id).copied()
    }
}

/// Nadir pinhole camera over a spherical Earth.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraModelTransform {
    /// `[lat, lon, alt, fx, fy]`
    params: [f64; 5],
    width: u32,
    height: u32,
    image_id: Option<ImageId>,
}

impl CameraModelTransform {
    pub fn new(params: [f64; 5], width: u32, height: u32) -> Self {
        Self {
            params,
            width,
            height,
            image_id: None,
        }
    }

    pub fn with_image_id(mut self, id: ImageId) -> Self {
        self.image_id = Some(id);
        self
    }

    /// Unrefined model built directly from metadata.
    pub fn from_metadata(meta: &CameraMetadata) -> Self {
        Self::new(
            [
                meta.latitude,
                meta.longitude,
                meta.altitude,
                meta.focal_length.0,
                meta.focal_length.1,
            ],
            meta.width,
            meta.height,
        )
    }

    /// Look up metadata for `image_id` and refine the camera against the
    /// tie points.
    ///
    /// # Errors
    ///
    /// [`TransformError::MetadataUnavailable`] if the source has no entry;
    /// otherwise any optimizer error.
    pub fn fit(
        to: &[Point],
        from: &[Point],
        image_id: &ImageId,
        source: &dyn CameraMetadataSource,
        opts: &SolveOptions,
    ) -> TransformResult<Self> {
        check_points(to, from, 2)?;
        let meta = source
            .lookup(image_id)
            .ok_or_else(|| TransformError::MetadataUnavailable(image_id.to_string()))?;
        let seed = Self::from_metadata(&meta);
        let (width, height) = (meta.width, meta.height);
        let x0 = DVector::from_row_slice(&seed.params);
        let fitted = refine(to, from, x0, opts, |p| {
            Self::new([p[0], p[1], p[2], p[3], p[4]], width, height)
        })?;
        Ok(fitted.with_image_id(image_id.clone()))
    }

    pub fn params(&self) -> [f64; 5] {
        self.params
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn image_id(&self) -> Option<&ImageId> {
        self.image_id.as_ref()
    }

    fn camera(&self) -> LonLatAlt {
        LonLatAlt::new(self.params[1], self.params[0], self.params[2])
    }

    fn focal_length(&self) -> (f64, f64) {
        (self.params[3], self.params[4])
    }

    fn optical_center(&self) -> Point {
        Point::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}

impl PointTransform for CameraModelTransform {
    fn forward(&self, p: Point) -> TransformResult<Point> {
        let ground = image_coord_to_ecef(self.camera(), p, self.optical_center(), self.focal_length())
            .ok_or(TransformError::RayMissesEarth)?;
        let lla = CAMERA_DATUM.ecef_to_lon_lat_alt(&ground);
        Ok(mercator::lon_lat_to_meters(lla.lon, lla.lat))
    }

    fn reverse(&self, p: Point) -> TransformResult<Point> {
        let (lon, lat) = mercator::meters_to_lon_lat(p);
        let ground = CAMERA_DATUM.lon_lat_alt_to_ecef(LonLatAlt::new(lon, lat, 0.0));
        ecef_to_image_coord(self.camera(), &ground, self.optical_center(), self.focal_length())
            .ok_or_else(|| {
                TransformError::IllConditioned("ground point is behind the camera".to_string())
            })
    }
}
