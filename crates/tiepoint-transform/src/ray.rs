//! Camera ray geometry
//!
//! A pinhole camera in orbit looks straight down at the Earth. The camera
//! frame has `z` toward the Earth's center, `x` toward local east and `y`
//! completing the right-handed frame (local south), so image rows grow
//! southward for a north-up photograph.
//!
//! Positions are converted with [`Ellipsoid::SPHERE`], the same sphere the
//! rays are intersected with, so a ground point found by
//! [`image_coord_to_ecef`] projects back to its pixel through
//! [`ecef_to_image_coord`].

use nalgebra::{Matrix3, Point3, Vector3};
use tiepoint_core::Point;
use tiepoint_core::geodesy::{Ellipsoid, LonLatAlt, Ray3, Sphere};

/// Datum used for camera and ground positions.
pub const CAMERA_DATUM: Ellipsoid = Ellipsoid::SPHERE;

/// Unit direction, in the camera frame, of the ray through `pixel`.
pub fn pixel_to_ray(
    pixel: Point,
    optical_center: Point,
    focal_length: (f64, f64),
) -> Vector3<f64> {
    Vector3::new(
        (pixel.x - optical_center.x) / focal_length.0,
        (pixel.y - optical_center.y) / focal_length.1,
        1.0,
    )
    .normalize()
}

/// Rotation taking camera-frame vectors to ECEF.
///
/// Columns are `c1 = (-sin lon, cos lon, 0)`, `c3 = -camera / |camera|` and
/// `c2 = normalize(c3 x c1)`.
pub fn rotation_camera_to_ecef(longitude_deg: f64, camera_ecef: &Point3<f64>) -> Matrix3<f64> {
    let lon = longitude_deg.to_radians();
    let c1 = Vector3::new(-lon.sin(), lon.cos(), 0.0);
    let c3 = -camera_ecef.coords.normalize();
    let c2 = c3.cross(&c1).normalize();
    Matrix3::from_columns(&[c1, c2, c3])
}

/// Rotation taking ECEF vectors to the camera frame.
pub fn rotation_ecef_to_camera(longitude_deg: f64, camera_ecef: &Point3<f64>) -> Matrix3<f64> {
    rotation_camera_to_ecef(longitude_deg, camera_ecef).transpose()
}

/// ECEF position of the camera.
pub fn camera_ecef(camera: LonLatAlt) -> Point3<f64> {
    CAMERA_DATUM.lon_lat_alt_to_ecef(camera)
}

/// Intersect the ray through `pixel` with the spherical Earth.
///
/// Returns `None` when the ray misses, which is expected for pixels that
/// image space above the horizon.
pub fn image_coord_to_ecef(
    camera: LonLatAlt,
    pixel: Point,
    optical_center: Point,
    focal_length: (f64, f64),
) -> Option<Point3<f64>> {
    let origin = camera_ecef(camera);
    let rotation = rotation_camera_to_ecef(camera.lon, &origin);
    let dir = rotation * pixel_to_ray(pixel, optical_center, focal_length);
    let ray = Ray3::new(origin, dir);
    let t = Sphere::earth().intersect(&ray)?;
    Some(ray.at(t))
}

/// Project an ECEF point into the image with `K * [R | -R*C]`.
///
/// Returns `None` for points at or behind the image plane.
pub fn ecef_to_image_coord(
    camera: LonLatAlt,
    ground: &Point3<f64>,
    optical_center: Point,
    focal_length: (f64, f64),
) -> Option<Point> {
    let origin = camera_ecef(camera);
    let rotation = rotation_ecef_to_camera(camera.lon, &origin);
    let v = rotation * (ground - origin);
    if !(v.z > 0.0) {
        return None;
    }
    Some(Point::new(
        focal_length.0 * v.x / v.z + optical_center.x,
        focal_length.1 * v.y / v.z + optical_center.y,
    ))
}
