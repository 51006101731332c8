//! Georeferenced raster regression test
//!
//! A north-up Web Mercator image converts between pixels, projected meters
//! and geodetic positions in both directions; ECEF conversion round trips
//! on both datums.

use tiepoint_core::geodesy::{ecef_to_lon_lat_alt, lon_lat_alt_to_ecef};
use tiepoint_core::{
    Ellipsoid, Error, GeoImage, GeoTransform, LonLatAlt, Point, WebMercator, mercator,
};
use tiepoint_test::RegParams;

#[test]
fn geotransform_reg_geo_image() {
    let mut rp = RegParams::new("geotransform_image");

    let origin = mercator::lon_lat_to_meters(-105.0, 40.0);
    let gt = GeoTransform::from_gdal([origin.x, 30.0, 0.0, origin.y, 0.0, -30.0])
        .expect("geotransform");
    let image = GeoImage::new(gt, (1000, 800), WebMercator).expect("geo image");
    rp.compare_values(1000.0, image.shape().0 as f64, 0.0);

    let pixels = [
        Point::new(0.0, 0.0),
        Point::new(1000.0, 0.0),
        Point::new(250.5, 640.25),
    ];
    let projected = image.map_projected_from_pixels(&pixels);
    rp.compare_points(&[origin], &projected[..1], 1e-6);
    rp.compare_values(origin.x + 30_000.0, projected[1].x, 1e-6);

    let positions = image.lon_lat_alts_from_pixels(&pixels);
    rp.compare_values(-105.0, positions[0].lon, 1e-9);
    rp.compare_values(40.0, positions[0].lat, 1e-9);
    rp.compare_values(0.0, positions[2].alt, 0.0);
    let back = image.pixels_from_lon_lat_alts(&positions);
    rp.compare_points(&pixels, &back, 1e-6);

    // Rows grow southward
    let center = image.center_lon_lat_alt();
    rp.compare_values(1.0, (center.lon > -105.0 && center.lat < 40.0) as u8 as f64, 0.0);

    let inverse = gt.invert().expect("invert");
    let p = inverse.apply_point(gt.apply_point(Point::new(12.0, 34.0)));
    rp.compare_points(&[Point::new(12.0, 34.0)], &[p], 1e-9);

    assert!(rp.cleanup(), "geotransform image test failed");
}

#[test]
fn geotransform_reg_rejects() {
    let mut rp = RegParams::new("geotransform_rejects");

    let rotated = GeoTransform::from_gdal([0.0, 1.0, 0.2, 0.0, 0.0, -1.0]);
    rp.compare_values(
        1.0,
        matches!(rotated, Err(Error::RotatedGeoTransform { .. })) as u8 as f64,
        0.0,
    );
    let flat = GeoTransform::from_gdal([0.0, 0.0, 0.0, 0.0, 0.0, -1.0]).expect("geotransform");
    rp.compare_values(
        1.0,
        matches!(flat.invert(), Err(Error::SingularMatrix)) as u8 as f64,
        0.0,
    );
    rp.compare_values(
        1.0,
        GeoImage::new(flat, (10, 10), WebMercator).is_err() as u8 as f64,
        0.0,
    );

    assert!(rp.cleanup(), "geotransform rejects test failed");
}

#[test]
fn geotransform_reg_ecef() {
    let mut rp = RegParams::new("geotransform_ecef");

    for lla in [
        LonLatAlt::new(0.0, 0.0, 0.0),
        LonLatAlt::new(-87.4, 29.3, 409_000.0),
        LonLatAlt::new(151.2, -33.9, 58.0),
        LonLatAlt::new(12.0, 78.2, -20.0),
    ] {
        let back = ecef_to_lon_lat_alt(&lon_lat_alt_to_ecef(lla));
        rp.compare_values(lla.lon, back.lon, 1e-9);
        rp.compare_values(lla.lat, back.lat, 1e-9);
        rp.compare_values(lla.alt, back.alt, 1e-4);

        let sphere = Ellipsoid::SPHERE;
        let back = sphere.ecef_to_lon_lat_alt(&sphere.lon_lat_alt_to_ecef(lla));
        rp.compare_values(lla.lat, back.lat, 1e-9);
        rp.compare_values(lla.alt, back.alt, 1e-4);
    }

    // The equator at the prime meridian lies on the x axis at radius a
    let p = lon_lat_alt_to_ecef(LonLatAlt::new(0.0, 0.0, 0.0));
    rp.compare_values(Ellipsoid::WGS84.a, p.x, 1e-6);
    rp.compare_values(0.0, p.y, 1e-6);

    assert!(rp.cleanup(), "geotransform ecef test failed");
}
