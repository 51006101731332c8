//! Linear transform families
//!
//! Translation, rotation/scale/translation and affine transforms all act on
//! homogeneous points through a 3x3 matrix whose last row is `[0, 0, 1]`, so
//! no projective division is needed. The inverse used by `reverse` is
//! computed on first use and cached.

use crate::error::{TransformError, TransformResult};
use crate::optimize::SolveOptions;
use crate::transform::{PointTransform, check_points, refine};
use log::warn;
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use std::sync::OnceLock;
use tiepoint_core::Point;
use tiepoint_core::point::mean_point;

/// Relative singular-value cutoff for the affine least-squares solve.
const AFFINE_RCOND: f64 = 1e-12;

/// A 3x3 matrix acting on `[x, y, 1]` with a lazily inverted copy.
#[derive(Debug, Clone)]
pub struct LinearTransform {
    matrix: Matrix3<f64>,
    inverse: OnceLock<Option<Matrix3<f64>>>,
}

impl LinearTransform {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        Self {
            matrix,
            inverse: OnceLock::new(),
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Apply the matrix, keeping the first two coordinates.
    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        Point::new(v.x, v.y)
    }

    /// Apply the cached inverse.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::SingularTransform`] if the matrix has no
    /// inverse.
    pub fn apply_inverse(&self, p: Point) -> TransformResult<Point> {
        let inv = self
            .inverse
            .get_or_init(|| self.matrix.try_inverse())
            .as_ref()
            .ok_or(TransformError::SingularTransform)?;
        let u = inv * Vector3::new(p.x, p.y, 1.0);
        Ok(Point::new(u.x, u.y))
    }
}

impl PartialEq for LinearTransform {
    fn eq(&self, other: &Self) -> bool {
        self.matrix == other.matrix
    }
}

/// Pure translation by the mean offset between point sets.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateTransform {
    tx: f64,
    ty: f64,
    linear: LinearTransform,
}

impl TranslateTransform {
    pub fn new(tx: f64, ty: f64) -> Self {
        let matrix = Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0);
        Self {
            tx,
            ty,
            linear: LinearTransform::new(matrix),
        }
    }

    /// Closed-form fit: difference of the two centroids.
    pub fn fit(to: &[Point], from: &[Point]) -> TransformResult<Self> {
        check_points(to, from, 1)?;
        let (Some(mt), Some(mf)) = (mean_point(to), mean_point(from)) else {
            return Err(TransformError::InsufficientPoints { needed: 1, got: 0 });
        };
        Ok(Self::new(mt.x - mf.x, mt.y - mf.y))
    }

    /// Offset as `(tx, ty)`.
    pub fn offset(&self) -> (f64, f64) {
        (self.tx, self.ty)
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        self.linear.matrix()
    }
}

impl PointTransform for TranslateTransform {
    fn forward(&self, p: Point) -> TransformResult<Point> {
        Ok(self.linear.apply(p))
    }

    fn reverse(&self, p: Point) -> TransformResult<Point> {
        self.linear.apply_inverse(p)
    }
}

/// Parameters of a similarity transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RstParams {
    pub tx: f64,
    pub ty: f64,
    pub scale: f64,
    /// Rotation in radians
    pub theta: f64,
}

impl RstParams {
    pub fn to_vec(self) -> Vec<f64> {
        vec![self.tx, self.ty, self.scale, self.theta]
    }

    fn from_slice(p: &[f64]) -> Self {
        Self {
            tx: p[0],
            ty: p[1],
            scale: p[2],
            theta: p[3],
        }
    }
}

/// Similarity transform `T * S * R`.
#[derive(Debug, Clone, PartialEq)]
pub struct RotateScaleTranslateTransform {
    params: RstParams,
    linear: LinearTransform,
}

impl RotateScaleTranslateTransform {
    pub fn from_params(params: RstParams) -> Self {
        let (sin, cos) = params.theta.sin_cos();
        let s = params.scale;
        let matrix = Matrix3::new(
            s * cos,
            -s * sin,
            params.tx,
            s * sin,
            s * cos,
            params.ty,
            0.0,
            0.0,
            1.0,
        );
        Self {
            params,
            linear: LinearTransform::new(matrix),
        }
    }

    /// Recover parameters from a similarity matrix.
    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        Self::from_params(RstParams {
            tx: m[(0, 2)],
            ty: m[(1, 2)],
            scale: m[(0, 0)].hypot(m[(1, 0)]),
            theta: m[(1, 0)].atan2(m[(0, 0)]),
        })
    }

    /// Closed-form least-squares similarity, refined by the optimizer.
    ///
    /// With centered points `f` and `t`, the guess is
    /// `s*cos = sum(f.t) / sum|f|^2` and `s*sin = sum(f x t) / sum|f|^2`,
    /// which is exact for two points.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::IllConditioned`] when all source points
    /// coincide.
    pub fn fit(to: &[Point], from: &[Point], opts: &SolveOptions) -> TransformResult<Self> {
        check_points(to, from, 2)?;
        let seed = similarity_seed(to, from)?;
        refine(to, from, DVector::from_vec(seed.to_vec()), opts, |p| {
            Self::from_params(RstParams::from_slice(p.as_slice()))
        })
    }

    pub fn params(&self) -> RstParams {
        self.params
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        self.linear.matrix()
    }
}

/// Least-squares similarity between centered point sets.
fn similarity_seed(to: &[Point], from: &[Point]) -> TransformResult<RstParams> {
    let (Some(mt), Some(mf)) = (mean_point(to), mean_point(from)) else {
        return Err(TransformError::InsufficientPoints { needed: 2, got: 0 });
    };
    let (mut dot, mut cross, mut norm) = (0.0, 0.0, 0.0);
    for (t, f) in to.iter().zip(from) {
        let (fx, fy) = (f.x - mf.x, f.y - mf.y);
        let (tx, ty) = (t.x - mt.x, t.y - mt.y);
        dot += fx * tx + fy * ty;
        cross += fx * ty - fy * tx;
        norm += fx * fx + fy * fy;
    }
    if norm <= f64::EPSILON * (mf.x * mf.x + mf.y * mf.y).max(1.0) {
        return Err(TransformError::IllConditioned(
            "similarity fit needs two distinct source points".to_string(),
        ));
    }
    let (a, b) = (dot / norm, cross / norm);
    Ok(RstParams {
        tx: mt.x - (a * mf.x - b * mf.y),
        ty: mt.y - (b * mf.x + a * mf.y),
        scale: a.hypot(b),
        theta: b.atan2(a),
    })
}

impl PointTransform for RotateScaleTranslateTransform {
    fn forward(&self, p: Point) -> TransformResult<Point> {
        Ok(self.linear.apply(p))
    }

    fn reverse(&self, p: Point) -> TransformResult<Point> {
        self.linear.apply_inverse(p)
    }
}

/// General affine transform.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform {
    linear: LinearTransform,
}

impl AffineTransform {
    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self {
            linear: LinearTransform::new(matrix),
        }
    }

    /// Closed-form least squares over two stacked rows per correspondence.
    ///
    /// Underdetermined sets (fewer than three points) get the minimum-norm
    /// solution.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::IllConditioned`] when three or more points
    /// are collinear or coincident.
    pub fn fit(to: &[Point], from: &[Point]) -> TransformResult<Self> {
        check_points(to, from, 1)?;
        let n = to.len();
        let mut u = DMatrix::zeros(2 * n, 6);
        let mut v = DVector::zeros(2 * n);
        for (i, (t, f)) in to.iter().zip(from).enumerate() {
            v[2 * i] = t.x;
            v[2 * i + 1] = t.y;
            u[(2 * i, 0)] = f.x;
            u[(2 * i, 1)] = f.y;
            u[(2 * i, 2)] = 1.0;
            u[(2 * i + 1, 3)] = f.x;
            u[(2 * i + 1, 4)] = f.y;
            u[(2 * i + 1, 5)] = 1.0;
        }

        let svd = u.svd(true, true);
        let cutoff = svd.singular_values.max() * AFFINE_RCOND;
        if n >= 3 && svd.rank(cutoff) < 6 {
            warn!("affine fit of {n} points is rank deficient");
            return Err(TransformError::IllConditioned(
                "affine fit needs three non-collinear points".to_string(),
            ));
        }
        let p = svd
            .solve(&v, cutoff)
            .map_err(|e| TransformError::IllConditioned(e.to_string()))?;

        let matrix = Matrix3::new(p[0], p[1], p[2], p[3], p[4], p[5], 0.0, 0.0, 1.0);
        Ok(Self::from_matrix(matrix))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        self.linear.matrix()
    }
}

impl PointTransform for AffineTransform {
    fn forward(&self, p: Point) -> TransformResult<Point> {
        Ok(self.linear.apply(p))
    }

    fn reverse(&self, p: Point) -> TransformResult<Point> {
        self.linear.apply_inverse(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pts(v: &[(f64, f64)]) -> Vec<Point> {
        v.iter().map(|&p| p.into()).collect()
    }

    #[test]
    fn test_affine_exact_three_points() {
        let from = pts(&[(0.0, 0.0), (100.0, 0.0), (0.0, 100.0)]);
        let to = pts(&[(10.0, 10.0), (10.0, 110.0), (110.0, 10.0)]);
        let t = AffineTransform::fit(&to, &from).unwrap();
        for (f, expected) in from.iter().zip(&to) {
            let mapped = t.forward(*f).unwrap();
            assert_abs_diff_eq!(mapped.x, expected.x, epsilon = 1e-9);
            assert_abs_diff_eq!(mapped.y, expected.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_affine_collinear_is_ill_conditioned() {
        let from = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        let to = pts(&[(0.0, 0.0), (2.0, 1.0), (4.0, 2.0), (6.0, 3.0)]);
        let err = AffineTransform::fit(&to, &from).unwrap_err();
        assert!(matches!(err, TransformError::IllConditioned(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_affine_underdetermined_min_norm() {
        // Two points leave the affine family underdetermined but the fit
        // still maps both exactly
        let from = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        let to = pts(&[(5.0, 5.0), (25.0, 5.0)]);
        let t = AffineTransform::fit(&to, &from).unwrap();
        let p = t.forward(from[1]).unwrap();
        assert_abs_diff_eq!(p.x, 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_translate_fit() {
        let from = pts(&[(0.0, 0.0), (2.0, 4.0)]);
        let to = pts(&[(10.0, -1.0), (12.0, 3.0)]);
        let t = TranslateTransform::fit(&to, &from).unwrap();
        assert_eq!(t.offset(), (10.0, -1.0));
        let back = t.reverse(Point::new(0.0, 0.0)).unwrap();
        assert_eq!(back, Point::new(-10.0, 1.0));
    }

    #[test]
    fn test_rst_from_params_and_matrix() {
        let params = RstParams {
            tx: 3.0,
            ty: -2.0,
            scale: 2.5,
            theta: 0.3,
        };
        let t = RotateScaleTranslateTransform::from_params(params);
        let again = RotateScaleTranslateTransform::from_matrix(t.matrix());
        assert_abs_diff_eq!(again.params().scale, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(again.params().theta, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_rst_fit_two_points() {
        let truth = RotateScaleTranslateTransform::from_params(RstParams {
            tx: 1000.0,
            ty: -500.0,
            scale: 30.0,
            theta: -0.2,
        });
        let from = pts(&[(0.0, 0.0), (640.0, 480.0)]);
        let to: Vec<Point> = from.iter().map(|&p| truth.forward(p).unwrap()).collect();
        let fit = RotateScaleTranslateTransform::fit(&to, &from, &SolveOptions::default())
            .unwrap();
        for (f, t) in from.iter().zip(&to) {
            let p = fit.forward(*f).unwrap();
            assert_abs_diff_eq!(p.x, t.x, epsilon = 1e-4);
            assert_abs_diff_eq!(p.y, t.y, epsilon = 1e-4);
        }
        assert_abs_diff_eq!(fit.params().scale, 30.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rst_seed_exact_for_two_points() {
        let truth = RotateScaleTranslateTransform::from_params(RstParams {
            tx: -3.0,
            ty: 7.0,
            scale: 0.5,
            theta: 2.0,
        });
        let from = pts(&[(10.0, 20.0), (-40.0, 5.0)]);
        let to: Vec<Point> = from.iter().map(|&p| truth.forward(p).unwrap()).collect();
        let seed = similarity_seed(&to, &from).unwrap();
        assert_abs_diff_eq!(seed.tx, -3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(seed.ty, 7.0, epsilon = 1e-9);
        assert_abs_diff_eq!(seed.scale, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(seed.theta, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rst_coincident_sources() {
        let from = pts(&[(5.0, 5.0), (5.0, 5.0)]);
        let to = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        let err = RotateScaleTranslateTransform::fit(&to, &from, &SolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, TransformError::IllConditioned(_)));
    }

    #[test]
    fn test_linear_round_trip() {
        let t = AffineTransform::from_matrix(Matrix3::new(
            2.0, 0.5, 10.0, -0.3, 1.5, -4.0, 0.0, 0.0, 1.0,
        ));
        for p in pts(&[(0.0, 0.0), (123.4, -56.7), (1e4, 3e3)]) {
            let back = t.reverse(t.forward(p).unwrap()).unwrap();
            assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-6);
            assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_singular_reverse() {
        let t = AffineTransform::from_matrix(Matrix3::new(
            1.0, 2.0, 0.0, 2.0, 4.0, 0.0, 0.0, 0.0, 1.0,
        ));
        assert!(matches!(
            t.reverse(Point::new(1.0, 1.0)),
            Err(TransformError::SingularTransform)
        ));
    }
}
