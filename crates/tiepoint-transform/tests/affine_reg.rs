//! Linear family regression test
//!
//! Fits translation, similarity and affine transforms to tie points
//! generated from known mappings and checks residuals, parameter recovery
//! and invertibility.

use tiepoint_core::{Point, TiePoints};
use tiepoint_test::RegParams;
use tiepoint_test::fixtures::{grid_points, tie_points_from_map};
use tiepoint_transform::{
    AffineTransform, PointTransform, RotateScaleTranslateTransform, RstParams, SolveOptions,
    Transform, TransformError, TransformKind, TranslateTransform,
};

/// Roughly 30 m/pixel, slightly rotated, rows growing southward.
fn truth(p: Point) -> Point {
    let (s, c) = 0.1f64.sin_cos();
    Point::new(
        -9_730_000.0 + 30.0 * (c * p.x + s * p.y),
        3_410_000.0 + 30.0 * (s * p.x - c * p.y),
    )
}

#[test]
fn affine_reg_exact_recovery() {
    let mut rp = RegParams::new("affine_exact");

    let from = grid_points(640.0, 480.0, 3, 3);
    let points = tie_points_from_map(&from, truth);
    let (to, from) = points.split();

    let fit = AffineTransform::fit(&to, &from).expect("affine fit");
    let mapped = fit.forward_points(&from).expect("forward");
    rp.compare_points(&to, &mapped, 1e-6);

    // Pixel (320, 240) round trips through the inverse
    let center = Point::new(320.0, 240.0);
    let back = fit
        .reverse(fit.forward(center).expect("forward"))
        .expect("reverse");
    rp.compare_points(&[center], &[back], 1e-6);

    assert!(rp.cleanup(), "affine exact recovery test failed");
}

#[test]
fn affine_reg_auto_selection() {
    let mut rp = RegParams::new("affine_auto");

    let from = [
        Point::new(0.0, 0.0),
        Point::new(640.0, 0.0),
        Point::new(0.0, 480.0),
    ];
    let points = tie_points_from_map(&from, truth);

    let t = Transform::fit_auto(&points, &SolveOptions::default()).expect("fit");
    rp.compare_values(1.0, (t.kind() == TransformKind::Affine) as u8 as f64, 0.0);
    let (to, from) = points.split();
    rp.compare_points(&to, &t.forward_points(&from).expect("forward"), 1e-6);

    // Two points select the similarity family
    let two: TiePoints = points.iter().take(2).copied().collect();
    let t = Transform::fit_auto(&two, &SolveOptions::default()).expect("fit");
    rp.compare_values(
        1.0,
        (t.kind() == TransformKind::RotateScaleTranslate) as u8 as f64,
        0.0,
    );

    assert!(rp.cleanup(), "affine auto selection test failed");
}

#[test]
fn affine_reg_similarity_parameters() {
    let mut rp = RegParams::new("affine_rst");

    let from = grid_points(640.0, 480.0, 2, 2);
    let truth = RotateScaleTranslateTransform::from_params(RstParams {
        tx: -9_730_000.0,
        ty: 3_410_000.0,
        scale: 30.0,
        theta: 0.1,
    });
    let points = tie_points_from_map(&from, |p| truth.forward(p).expect("forward"));
    let (to, from) = points.split();

    let fit = RotateScaleTranslateTransform::fit(&to, &from, &SolveOptions::default())
        .expect("similarity fit");
    let params = fit.params();
    eprintln!("  fitted {params:?}");
    rp.compare_values(30.0, params.scale, 1e-6);
    rp.compare_values(0.1, params.theta, 1e-8);
    rp.compare_values(-9_730_000.0, params.tx, 1e-3);
    rp.compare_values(3_410_000.0, params.ty, 1e-3);

    assert!(rp.cleanup(), "affine similarity test failed");
}

#[test]
fn affine_reg_two_point_similarity() {
    let mut rp = RegParams::new("affine_two_points");

    let truth = RotateScaleTranslateTransform::from_params(RstParams {
        tx: 1000.0,
        ty: -500.0,
        scale: 30.0,
        theta: -0.2,
    });
    let from = [Point::new(0.0, 0.0), Point::new(640.0, 480.0)];
    let points = tie_points_from_map(&from, |p| truth.forward(p).expect("forward"));

    // Two points select the similarity family, which must keep its scale
    let fit = Transform::fit_auto(&points, &SolveOptions::default()).expect("fit");
    rp.compare_values(
        1.0,
        (fit.kind() == TransformKind::RotateScaleTranslate) as u8 as f64,
        0.0,
    );
    let (to, from) = points.split();
    rp.compare_points(&to, &fit.forward_points(&from).expect("forward"), 1e-4);

    let Transform::RotateScaleTranslate(rst) = &fit else {
        panic!("expected a similarity");
    };
    rp.compare_values(30.0, rst.params().scale, 1e-6);
    rp.compare_values(-0.2, rst.params().theta, 1e-9);

    // The two sources stay distinct on the map
    let a = fit.forward(from[0]).expect("forward");
    let b = fit.forward(from[1]).expect("forward");
    rp.compare_values(30.0 * 800.0, (b.x - a.x).hypot(b.y - a.y), 1e-3);

    assert!(rp.cleanup(), "two point similarity test failed");
}

#[test]
fn affine_reg_translation_and_errors() {
    let mut rp = RegParams::new("affine_translate");

    let from = grid_points(100.0, 100.0, 2, 2);
    let points = tie_points_from_map(&from, |p| Point::new(p.x + 5.0, p.y - 7.0));
    let (to, from) = points.split();
    let t = TranslateTransform::fit(&to, &from).expect("translate fit");
    let (tx, ty) = t.offset();
    rp.compare_values(5.0, tx, 1e-12);
    rp.compare_values(-7.0, ty, 1e-12);

    let err = AffineTransform::fit(&to[..2], &from).unwrap_err();
    rp.compare_values(
        1.0,
        matches!(err, TransformError::MismatchedPoints { .. }) as u8 as f64,
        0.0,
    );

    let single: TiePoints = points.iter().take(1).copied().collect();
    let err = Transform::fit_auto(&single, &SolveOptions::default()).unwrap_err();
    rp.compare_values(1.0, err.is_recoverable() as u8 as f64, 0.0);

    assert!(rp.cleanup(), "affine translation test failed");
}
