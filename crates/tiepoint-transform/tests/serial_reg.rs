//! Transform record regression test
//!
//! Fits each family, writes its JSON record and checks that records parse
//! back into transforms with identical behavior.

use tiepoint_core::{Point, TiePoints};
use tiepoint_test::RegParams;
use tiepoint_test::fixtures::{apply_homography, tie_points_from_map};
use tiepoint_transform::{
    PointTransform, SerializedTransform, SolveOptions, Transform, TransformKind, fit_transform,
};

const H: [[f64; 3]; 3] = [[30.0, 2.0, -9.7e6], [1.5, -29.0, 3.4e6], [1e-5, -2e-5, 1.0]];

fn points(n: usize) -> TiePoints {
    // Corners first so every prefix of three or more is non-collinear
    let from: Vec<Point> = [
        (0.0, 0.0),
        (800.0, 0.0),
        (0.0, 600.0),
        (800.0, 600.0),
        (400.0, 300.0),
        (200.0, 450.0),
        (600.0, 150.0),
        (100.0, 100.0),
        (700.0, 500.0),
    ]
    .into_iter()
    .take(n)
    .map(Point::from)
    .collect();
    tie_points_from_map(&from, |p| apply_homography(&H, p))
}

#[test]
fn serial_reg_records() {
    let mut rp = RegParams::new("serial_records");

    for n in [2, 3, 5, 9] {
        let pts = points(n);
        let record = fit_transform(&pts).expect("fit");
        let json = record.to_json().expect("to json");
        eprintln!("  {n} points: {json}");
        rp.write_data_and_check(json.as_bytes(), "json")
            .expect("write record");

        let parsed = SerializedTransform::from_json(&json).expect("parse record");
        rp.compare_strings(
            json.as_bytes(),
            parsed.to_json().expect("to json").as_bytes(),
        );

        let t = Transform::from_serialized(&parsed).expect("rebuild");
        let direct = Transform::fit_auto(&pts, &SolveOptions::default()).expect("fit");
        let (_, from) = pts.split();
        rp.compare_points(
            &direct.forward_points(&from).expect("forward"),
            &t.forward_points(&from).expect("forward"),
            1e-6,
        );
    }

    assert!(rp.cleanup(), "serial records test failed");
}

#[test]
fn serial_reg_family_tags() {
    let mut rp = RegParams::new("serial_tags");

    let expected = [
        (2, "rotateScaleTranslate", TransformKind::RotateScaleTranslate),
        (3, "affine", TransformKind::Affine),
        (4, "projective", TransformKind::Projective),
        (7, "quadratic2", TransformKind::Quadratic2),
    ];
    for (n, tag, kind) in expected {
        let record = fit_transform(&points(n)).expect("fit");
        rp.compare_values(1.0, (record.kind == kind) as u8 as f64, 0.0);
        let json = record.to_json().expect("to json");
        let needle = format!(r#""type":"{tag}""#);
        rp.compare_values(1.0, json.contains(&needle) as u8 as f64, 0.0);
    }

    assert!(rp.cleanup(), "serial tags test failed");
}
