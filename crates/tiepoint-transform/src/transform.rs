//! Transform families and automatic selection
//!
//! Every family maps image pixels (`from`) to Web Mercator meters (`to`).
//! [`Transform`] is the closed set of families; [`select_transform_kind`]
//! picks the family a tie-point count supports and [`fit_transform`] fits
//! it.

use crate::camera::{CameraMetadataSource, CameraModelTransform, ImageId};
use crate::error::{TransformError, TransformResult};
use crate::linear::{AffineTransform, RotateScaleTranslateTransform, TranslateTransform};
use crate::optimize::{SolveOptions, optimize};
use crate::projective::ProjectiveTransform;
use crate::quadratic::{Quadratic2Transform, QuadraticTransform};
use crate::serial::SerializedTransform;
use log::{debug, info, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tiepoint_core::point::flatten_points;
use tiepoint_core::{Point, TiePoints};

/// A mapping from image pixels to map meters and back.
pub trait PointTransform {
    /// Map an image pixel to projected meters.
    fn forward(&self, p: Point) -> TransformResult<Point>;

    /// Map projected meters back to an image pixel.
    fn reverse(&self, p: Point) -> TransformResult<Point>;

    /// Map many pixels, failing on the first point that fails.
    fn forward_points(&self, points: &[Point]) -> TransformResult<Vec<Point>> {
        points.iter().map(|&p| self.forward(p)).collect()
    }
}

/// Check that the point lists pair up and hold at least `needed` entries.
pub(crate) fn check_points(to: &[Point], from: &[Point], needed: usize) -> TransformResult<()> {
    if to.len() != from.len() {
        return Err(TransformError::MismatchedPoints {
            to: to.len(),
            from: from.len(),
        });
    }
    if to.len() < needed {
        return Err(TransformError::InsufficientPoints {
            needed,
            got: to.len(),
        });
    }
    Ok(())
}

/// Refine the parameters of a family so its forward mapping of `from`
/// matches `to` in the least-squares sense.
pub(crate) fn refine<T, B>(
    to: &[Point],
    from: &[Point],
    x0: DVector<f64>,
    opts: &SolveOptions,
    build: B,
) -> TransformResult<T>
where
    T: PointTransform,
    B: Fn(&DVector<f64>) -> T,
{
    let target = flatten_points(to);
    let report = optimize(
        &target,
        |p: &DVector<f64>| {
            let mapped = build(p).forward_points(from).ok()?;
            Some(DVector::from_vec(flatten_points(&mapped)))
        },
        x0,
        opts,
    )?;
    let rms = (report.sum_of_squares / to.len().max(1) as f64).sqrt();
    debug!(
        "refined {} parameters in {} evaluations, rms {:.6}",
        report.params.len(),
        report.evaluations,
        rms
    );
    let spread = target_spread(to);
    if spread > 0.0 && report.sum_of_squares > COLLAPSED_FIT_RATIO * spread {
        warn!("fit residual rms {rms:.3} is comparable to the spread of the targets");
        return Err(TransformError::IllConditioned(format!(
            "fit collapsed with residual rms {rms:.3}"
        )));
    }
    Ok(build(&report.params))
}

/// A refined fit leaving more than this share of the targets' squared
/// spread unexplained is rejected.
const COLLAPSED_FIT_RATIO: f64 = 0.5;

/// Sum of squared distances of the points from their centroid.
fn target_spread(points: &[Point]) -> f64 {
    let Some(c) = tiepoint_core::point::mean_point(points) else {
        return 0.0;
    };
    points
        .iter()
        .map(|p| (p.x - c.x).powi(2) + (p.y - c.y).powi(2))
        .sum()
}

/// Transform family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformKind {
    Translate,
    RotateScaleTranslate,
    Affine,
    Projective,
    Quadratic,
    Quadratic2,
    #[serde(alias = "CameraModelTransform")]
    CameraModel,
}

impl TransformKind {
    /// Fewest correspondences the family accepts.
    pub fn min_points(self) -> usize {
        match self {
            Self::Translate | Self::Affine => 1,
            Self::RotateScaleTranslate | Self::CameraModel => 2,
            Self::Projective | Self::Quadratic2 => 4,
            Self::Quadratic => 6,
        }
    }

    /// Fit a family that needs nothing beyond the tie points.
    ///
    /// # Errors
    ///
    /// [`TransformError::MetadataUnavailable`] for [`TransformKind::CameraModel`],
    /// which must be fitted with [`CameraModelTransform::fit`].
    pub fn fit(self, to: &[Point], from: &[Point], opts: &SolveOptions) -> TransformResult<Transform> {
        Ok(match self {
            Self::Translate => Transform::Translate(TranslateTransform::fit(to, from)?),
            Self::RotateScaleTranslate => {
                Transform::RotateScaleTranslate(RotateScaleTranslateTransform::fit(to, from, opts)?)
            }
            Self::Affine => Transform::Affine(AffineTransform::fit(to, from)?),
            Self::Projective => Transform::Projective(ProjectiveTransform::fit(to, from, opts)?),
            Self::Quadratic => Transform::Quadratic(QuadraticTransform::fit(to, from, opts)?),
            Self::Quadratic2 => Transform::Quadratic2(Quadratic2Transform::fit(to, from, opts)?),
            Self::CameraModel => {
                return Err(TransformError::MetadataUnavailable(
                    "camera model fit needs an image id and metadata source".to_string(),
                ));
            }
        })
    }
}

/// Family supported by `n` correspondences.
///
/// # Errors
///
/// Returns [`TransformError::InsufficientPoints`] for fewer than two.
pub fn select_transform_kind(n: usize) -> TransformResult<TransformKind> {
    match n {
        0 | 1 => Err(TransformError::InsufficientPoints { needed: 2, got: n }),
        2 => Ok(TransformKind::RotateScaleTranslate),
        3 => Ok(TransformKind::Affine),
        4..=6 => Ok(TransformKind::Projective),
        _ => Ok(TransformKind::Quadratic2),
    }
}

/// A fitted transform of any family.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Translate(TranslateTransform),
    RotateScaleTranslate(RotateScaleTranslateTransform),
    Affine(AffineTransform),
    Projective(ProjectiveTransform),
    Quadratic(QuadraticTransform),
    Quadratic2(Quadratic2Transform),
    CameraModel(CameraModelTransform),
}

impl Transform {
    pub fn kind(&self) -> TransformKind {
        match self {
            Self::Translate(_) => TransformKind::Translate,
            Self::RotateScaleTranslate(_) => TransformKind::RotateScaleTranslate,
            Self::Affine(_) => TransformKind::Affine,
            Self::Projective(_) => TransformKind::Projective,
            Self::Quadratic(_) => TransformKind::Quadratic,
            Self::Quadratic2(_) => TransformKind::Quadratic2,
            Self::CameraModel(_) => TransformKind::CameraModel,
        }
    }

    fn as_point_transform(&self) -> &dyn PointTransform {
        match self {
            Self::Translate(t) => t,
            Self::RotateScaleTranslate(t) => t,
            Self::Affine(t) => t,
            Self::Projective(t) => t,
            Self::Quadratic(t) => t,
            Self::Quadratic2(t) => t,
            Self::CameraModel(t) => t,
        }
    }

    /// Fit the family chosen by [`select_transform_kind`].
    pub fn fit_auto(points: &TiePoints, opts: &SolveOptions) -> TransformResult<Self> {
        let kind = select_transform_kind(points.len())?;
        info!("fitting {kind:?} transform to {} tie points", points.len());
        let (to, from) = points.split();
        kind.fit(&to, &from, opts)
    }

    /// Fit a camera model for a known photograph.
    pub fn fit_camera(
        points: &TiePoints,
        image_id: &ImageId,
        source: &dyn CameraMetadataSource,
        opts: &SolveOptions,
    ) -> TransformResult<Self> {
        info!("fitting camera model for {image_id} to {} tie points", points.len());
        let (to, from) = points.split();
        CameraModelTransform::fit(&to, &from, image_id, source, opts).map(Self::CameraModel)
    }
}

impl PointTransform for Transform {
    fn forward(&self, p: Point) -> TransformResult<Point> {
        self.as_point_transform().forward(p)
    }

    fn reverse(&self, p: Point) -> TransformResult<Point> {
        self.as_point_transform().reverse(p)
    }
}

/// Fit the best-supported family and return its serialized record.
pub fn fit_transform(points: &TiePoints) -> TransformResult<SerializedTransform> {
    Transform::fit_auto(points, &SolveOptions::default()).map(|t| t.to_serialized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_transform_is_send_sync() {
        assert_send_sync::<Transform>();
    }

    #[test]
    fn test_select_transform_kind() {
        assert!(matches!(
            select_transform_kind(1),
            Err(TransformError::InsufficientPoints { needed: 2, got: 1 })
        ));
        assert_eq!(select_transform_kind(2).unwrap(), TransformKind::RotateScaleTranslate);
        assert_eq!(select_transform_kind(3).unwrap(), TransformKind::Affine);
        assert_eq!(select_transform_kind(4).unwrap(), TransformKind::Projective);
        assert_eq!(select_transform_kind(6).unwrap(), TransformKind::Projective);
        assert_eq!(select_transform_kind(7).unwrap(), TransformKind::Quadratic2);
        assert_eq!(select_transform_kind(40).unwrap(), TransformKind::Quadratic2);
    }

    #[test]
    fn test_refine_rejects_collapsed_fit() {
        // A translation cannot swap two points
        let from = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let to = [Point::new(10.0, 0.0), Point::new(0.0, 0.0)];
        let err = refine(
            &to,
            &from,
            DVector::from_vec(vec![0.0, 0.0]),
            &SolveOptions::default(),
            |p| TranslateTransform::new(p[0], p[1]),
        )
        .unwrap_err();
        assert!(matches!(err, TransformError::IllConditioned(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_two_point_fit_keeps_scale() {
        // [to_x, to_y, from_x, from_y] for tx 1000, ty -500, scale 30, theta -0.2
        let (sin, cos) = (-0.2f64).sin_cos();
        let far = Point::new(
            1000.0 + 30.0 * (cos * 640.0 - sin * 480.0),
            -500.0 + 30.0 * (sin * 640.0 + cos * 480.0),
        );
        let points = TiePoints::from_rows(&[
            [1000.0, -500.0, 0.0, 0.0],
            [far.x, far.y, 640.0, 480.0],
        ]);
        let t = Transform::fit_auto(&points, &SolveOptions::default()).unwrap();
        let Transform::RotateScaleTranslate(rst) = &t else {
            panic!("expected a similarity, got {:?}", t.kind());
        };
        assert_abs_diff_eq!(rst.params().scale, 30.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rst.params().theta, -0.2, epsilon = 1e-9);
        let p = t.forward(Point::new(640.0, 480.0)).unwrap();
        assert_abs_diff_eq!(p.x, far.x, epsilon = 1e-4);
        assert_abs_diff_eq!(p.y, far.y, epsilon = 1e-4);
    }

    #[test]
    fn test_check_points() {
        let a = [Point::new(0.0, 0.0)];
        let b = [Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert!(matches!(
            check_points(&a, &b, 1),
            Err(TransformError::MismatchedPoints { to: 1, from: 2 })
        ));
        assert!(matches!(
            check_points(&a, &a, 3),
            Err(TransformError::InsufficientPoints { needed: 3, got: 1 })
        ));
    }

    #[test]
    fn test_fit_auto_three_points_is_affine() {
        let points = TiePoints::from_rows(&[
            [10.0, 10.0, 0.0, 0.0],
            [10.0, 110.0, 100.0, 0.0],
            [110.0, 10.0, 0.0, 100.0],
        ]);
        let t = Transform::fit_auto(&points, &SolveOptions::default()).unwrap();
        assert_eq!(t.kind(), TransformKind::Affine);
        let p = t.forward(Point::new(100.0, 0.0)).unwrap();
        assert_abs_diff_eq!(p.x, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 110.0, epsilon = 1e-9);
    }

    #[test]
    fn test_camera_kind_needs_metadata() {
        let p = [Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let err = TransformKind::CameraModel
            .fit(&p, &p, &SolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, TransformError::MetadataUnavailable(_)));
    }
}
