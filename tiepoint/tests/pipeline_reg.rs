//! End-to-end regression test
//!
//! Tie points to stored record to tiles, once for a plain affine alignment
//! and once for a photograph taken from orbit.

use tiepoint::tiles::{
    GeneratorConfig, MemoryGeneratorSource, QuadTreeGenerator, QuadTreeRecord, ServiceConfig,
    TileService, transparent_tile,
};
use tiepoint::transform::{
    CameraMetadata, CameraModelTransform, ImageId, PointTransform, SerializedTransform,
    SolveOptions, StaticMetadataSource, Transform, fit_transform,
};
use tiepoint::{Point, color, mercator};
use tiepoint_test::RegParams;
use tiepoint_test::fixtures::{checkerboard, grid_points, tie_points_from_map};

#[test]
fn pipeline_reg_affine() {
    let mut rp = RegParams::new("pipeline_affine");

    let origin = mercator::lon_lat_to_meters(-71.06, 42.36);
    let points = tie_points_from_map(&grid_points(256.0, 256.0, 2, 2)[..3], |p| {
        Point::new(origin.x + 30.0 * p.x, origin.y - 30.0 * p.y)
    });
    let record = fit_transform(&points).expect("fit");
    let json = record.to_json().expect("json");
    rp.compare_strings(b"affine", record_tag(&json).as_bytes());

    let mut source = MemoryGeneratorSource::new(GeneratorConfig::default());
    source.insert(
        7,
        QuadTreeRecord {
            image: checkerboard(256, 256, 16).expect("checkerboard"),
            transform: Some(SerializedTransform::from_json(&json).expect("record")),
        },
    );
    let service = TileService::new(source, &ServiceConfig::default());
    let generator = service.generator(7).expect("generator");

    let zoom = generator.max_zoom();
    let (x, y) = mercator::tile_index(zoom, Point::new(origin.x + 3840.0, origin.y - 3840.0));
    let tile = service.get_tile(7, zoom, x, y).expect("tile");
    rp.compare_values(0.0, (tile == transparent_tile().expect("blank")) as u8 as f64, 0.0);
    let raster = tiepoint::io::decode_png(&tile.data).expect("decode");
    rp.write_raster_and_check(&raster).expect("write tile");

    assert!(rp.cleanup(), "pipeline affine test failed");
}

/// Pull the `type` tag out of a record without the serde types.
fn record_tag(json: &str) -> String {
    let start = json.find("\"type\":\"").map(|i| i + 8).unwrap_or(0);
    json[start..].chars().take_while(|&c| c != '"').collect()
}

#[test]
fn pipeline_reg_orbital_photo() {
    let mut rp = RegParams::new("pipeline_orbital");

    let meta = CameraMetadata {
        latitude: 36.1,
        longitude: -115.2,
        altitude: 400_000.0,
        focal_length: (2_000.0, 2_000.0),
        width: 400,
        height: 300,
    };
    let truth = CameraModelTransform::from_metadata(&meta);
    let from = grid_points(380.0, 280.0, 3, 3)
        .into_iter()
        .map(|p| Point::new(p.x + 10.0, p.y + 10.0))
        .collect::<Vec<_>>();
    let points = tie_points_from_map(&from, |p| truth.forward(p).expect("forward"));

    let id: ImageId = "ISS030-E-254011".parse().expect("image id");
    let mut source = StaticMetadataSource::new();
    source.insert(id.clone(), meta);
    let fitted =
        Transform::fit_camera(&points, &id, &source, &SolveOptions::default()).expect("fit");

    let image = checkerboard(400, 300, 20).expect("checkerboard");
    let config = GeneratorConfig::default();
    let generator =
        QuadTreeGenerator::from_transform(9, image, fitted, config).expect("generator");
    let bounds = generator.map_bounds().expect("bounds").lon_lat();
    rp.compare_values(1.0, (bounds.min_lon < -115.2 && -115.2 < bounds.max_lon) as u8 as f64, 0.0);
    rp.compare_values(1.0, (bounds.min_lat < 36.1 && 36.1 < bounds.max_lat) as u8 as f64, 0.0);

    // The sub-camera point is the image center
    let nadir = mercator::lon_lat_to_meters(-115.2, 36.1);
    let zoom = generator.max_zoom();
    let (x, y) = mercator::tile_index(zoom, nadir);
    let tile = generator.render(zoom, x, y).expect("render");
    let (px, py) = mercator::meters_to_pixels(nadir, zoom);
    let center = tile
        .get_pixel((px - x as f64 * 256.0) as u32, (py - y as f64 * 256.0) as u32)
        .expect("pixel");
    rp.compare_values(255.0, color::alpha(center) as f64, 0.0);

    let back = generator
        .transform()
        .expect("transform")
        .reverse(nadir)
        .expect("reverse");
    rp.compare_points(&[Point::new(200.0, 150.0)], &[back], 0.5);

    assert!(rp.cleanup(), "pipeline orbital test failed");
}
