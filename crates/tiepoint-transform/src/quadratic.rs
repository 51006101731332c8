//! Quadratic transform families
//!
//! [`QuadraticTransform`] is a 3x5 matrix acting on `[x^2, y^2, x, y, 1]`
//! with a projective division. Its reverse has no closed form and is found
//! by optimization seeded from the projective part.
//!
//! [`Quadratic2Transform`] composes a homography with four separable
//! quadratic corrections, which keeps an analytic inverse. The homography
//! maps into meters divided by [`QUADRATIC2_SCALE`] so the correction
//! terms stay well scaled.

use crate::error::{TransformError, TransformResult};
use crate::linear::AffineTransform;
use crate::optimize::{SolveOptions, optimize};
use crate::projective::{ProjectiveTransform, dehomogenize, projective_inverse};
use crate::transform::{PointTransform, check_points, refine};
use nalgebra::{DVector, Matrix3, Matrix3x5, Vector3, Vector5};
use std::sync::OnceLock;
use tiepoint_core::Point;
use tiepoint_core::point::mean_point;

/// Output scaling of [`Quadratic2Transform`].
pub const QUADRATIC2_SCALE: f64 = 1e7;

/// Below this `a^2` the quadratic term is treated as absent.
const QUAD_TERM_EPS: f64 = 1e-20;

/// Solve `x + a*x^2 = p` for the root nearest `p`.
///
/// # Errors
///
/// Returns [`TransformError::NoRealSolution`] if the discriminant is
/// negative.
pub fn solve_quad(a: f64, p: f64) -> TransformResult<f64> {
    if a * a <= QUAD_TERM_EPS {
        return Ok(p);
    }
    let disc = 4.0 * a * p + 1.0;
    if disc < 0.0 {
        return Err(TransformError::NoRealSolution);
    }
    let h = disc.sqrt();
    // (-1 + h) / 2a, rewritten to avoid cancellation when a is small
    let near = 2.0 * p / (1.0 + h);
    let far = (-1.0 - h) / (2.0 * a);
    if (far - p).abs() < (near - p).abs() {
        Ok(far)
    } else {
        Ok(near)
    }
}

/// Projective transform over quadratic monomials.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticTransform {
    matrix: Matrix3x5<f64>,
}

impl QuadraticTransform {
    pub fn from_matrix(matrix: Matrix3x5<f64>) -> Self {
        Self { matrix }
    }

    /// Build from twelve parameters: two full rows, then the linear part
    /// of the last row.
    pub fn from_params(p: &[f64]) -> Self {
        Self::from_matrix(Matrix3x5::new(
            p[0], p[1], p[2], p[3], p[4], //
            p[5], p[6], p[7], p[8], p[9], //
            0.0, 0.0, p[10], p[11], 1.0,
        ))
    }

    pub fn fit(to: &[Point], from: &[Point], opts: &SolveOptions) -> TransformResult<Self> {
        check_points(to, from, 6)?;
        let affine = AffineTransform::fit(to, from)?;
        let m = affine.matrix();
        let mut x0 = DVector::zeros(12);
        for j in 0..3 {
            x0[2 + j] = m[(0, j)];
            x0[7 + j] = m[(1, j)];
        }
        x0[10] = m[(2, 0)];
        x0[11] = m[(2, 1)];
        refine(to, from, x0, opts, |p| Self::from_params(p.as_slice()))
    }

    pub fn matrix(&self) -> &Matrix3x5<f64> {
        &self.matrix
    }

    pub fn params(&self) -> Vec<f64> {
        let m = &self.matrix;
        let mut out: Vec<f64> = m.row(0).iter().chain(m.row(1).iter()).copied().collect();
        out.push(m[(2, 2)]);
        out.push(m[(2, 3)]);
        out
    }

    /// The homography formed by the last three columns.
    pub fn projective_part(&self) -> ProjectiveTransform {
        ProjectiveTransform::from_matrix(self.matrix.fixed_columns::<3>(2).into_owned())
    }
}

impl PointTransform for QuadraticTransform {
    fn forward(&self, p: Point) -> TransformResult<Point> {
        let u = Vector5::new(p.x * p.x, p.y * p.y, p.x, p.y, 1.0);
        dehomogenize(&(self.matrix * u))
    }

    /// Seeded from the projective part, then refined numerically.
    fn reverse(&self, p: Point) -> TransformResult<Point> {
        let seed = self.projective_part().reverse(p)?;
        let report = optimize(
            &[p.x, p.y],
            |u: &DVector<f64>| {
                self.forward(Point::new(u[0], u[1]))
                    .ok()
                    .map(|q| DVector::from_vec(vec![q.x, q.y]))
            },
            DVector::from_vec(vec![seed.x, seed.y]),
            &SolveOptions::default(),
        )?;
        Ok(Point::new(report.params[0], report.params[1]))
    }
}

/// Homography followed by separable quadratic corrections.
#[derive(Debug, Clone)]
pub struct Quadratic2Transform {
    matrix: Matrix3<f64>,
    /// Correction coefficients `[a, b, c, d]`
    quadratic_terms: [f64; 4],
    proj_inverse: OnceLock<Option<Matrix3<f64>>>,
}

impl Quadratic2Transform {
    pub fn new(matrix: Matrix3<f64>, quadratic_terms: [f64; 4]) -> Self {
        Self {
            matrix,
            quadratic_terms,
            proj_inverse: OnceLock::new(),
        }
    }

    /// Build from eight homography entries followed by the four terms.
    pub fn from_params(p: &[f64]) -> Self {
        Self::new(
            Matrix3::new(p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7], 1.0),
            [p[8], p[9], p[10], p[11]],
        )
    }

    /// Fit starting from an affine solution in scaled meters with zero
    /// quadratic terms.
    ///
    /// Pixels are centered and scaled to unit spread for the refinement and
    /// the normalization is folded back into the homography afterwards, so
    /// the projective entries are not several orders of magnitude below
    /// the rest.
    pub fn fit(to: &[Point], from: &[Point], opts: &SolveOptions) -> TransformResult<Self> {
        check_points(to, from, 4)?;
        let normalize = pixel_normalization(from)?;
        let unit: Vec<Point> = from
            .iter()
            .map(|p| {
                let v = normalize * Vector3::new(p.x, p.y, 1.0);
                Point::new(v.x, v.y)
            })
            .collect();
        let scaled: Vec<Point> = to
            .iter()
            .map(|p| Point::new(p.x / QUADRATIC2_SCALE, p.y / QUADRATIC2_SCALE))
            .collect();
        let affine = AffineTransform::fit(&scaled, &unit)?;
        let mut x0 = DVector::zeros(12);
        for (i, v) in affine.matrix().transpose().iter().take(8).enumerate() {
            x0[i] = *v;
        }
        let fitted = refine(to, &unit, x0, opts, |p| Self::from_params(p.as_slice()))?;

        let h = fitted.matrix * normalize;
        let w = h[(2, 2)];
        if w.abs() < f64::EPSILON * h.amax() {
            return Err(TransformError::IllConditioned(
                "fitted homography sends the pixel centroid to infinity".to_string(),
            ));
        }
        Ok(Self::new(h / w, fitted.quadratic_terms))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn quadratic_terms(&self) -> [f64; 4] {
        self.quadratic_terms
    }

    pub fn params(&self) -> Vec<f64> {
        let mut out: Vec<f64> = self.matrix.transpose().iter().take(8).copied().collect();
        out.extend_from_slice(&self.quadratic_terms);
        out
    }
}

/// Similarity taking pixels to zero mean and unit mean distance.
fn pixel_normalization(from: &[Point]) -> TransformResult<Matrix3<f64>> {
    let Some(c) = mean_point(from) else {
        return Err(TransformError::InsufficientPoints { needed: 4, got: 0 });
    };
    let spread = from
        .iter()
        .map(|p| (p.x - c.x).hypot(p.y - c.y))
        .sum::<f64>()
        / from.len() as f64;
    if spread <= 0.0 {
        return Err(TransformError::IllConditioned(
            "all source points coincide".to_string(),
        ));
    }
    let k = 1.0 / spread;
    Ok(Matrix3::new(k, 0.0, -k * c.x, 0.0, k, -k * c.y, 0.0, 0.0, 1.0))
}

impl PartialEq for Quadratic2Transform {
    fn eq(&self, other: &Self) -> bool {
        self.matrix == other.matrix && self.quadratic_terms == other.quadratic_terms
    }
}

impl PointTransform for Quadratic2Transform {
    fn forward(&self, p: Point) -> TransformResult<Point> {
        let [a, b, c, d] = self.quadratic_terms;
        let v = dehomogenize(&(self.matrix * Vector3::new(p.x, p.y, 1.0)))?;
        let p = v.x + a * v.x * v.x;
        let q = v.y + b * v.y * v.y;
        let r = p + c * q * q;
        let s = q + d * r * r;
        Ok(Point::new(r * QUADRATIC2_SCALE, s * QUADRATIC2_SCALE))
    }

    fn reverse(&self, p: Point) -> TransformResult<Point> {
        let [a, b, c, d] = self.quadratic_terms;
        let r = p.x / QUADRATIC2_SCALE;
        let s = p.y / QUADRATIC2_SCALE;
        let q = s - d * r * r;
        let p = r - c * q * q;
        let x0 = solve_quad(a, p)?;
        let y0 = solve_quad(b, q)?;

        let inv = self
            .proj_inverse
            .get_or_init(|| projective_inverse(&self.matrix).ok())
            .as_ref()
            .ok_or_else(|| {
                TransformError::IllConditioned("homography is not invertible".to_string())
            })?;
        dehomogenize(&(inv * Vector3::new(x0, y0, 1.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_q2() -> Quadratic2Transform {
        // ~30 m per pixel around (1e6, 2e6) meters
        let m = Matrix3::new(3e-6, 1e-7, 0.1, -2e-7, -3e-6, 0.2, 0.0, 0.0, 1.0);
        Quadratic2Transform::new(m, [0.02, -0.01, 0.005, 0.003])
    }

    #[test]
    fn test_solve_quad() {
        assert_eq!(solve_quad(0.0, 3.5).unwrap(), 3.5);
        let x = solve_quad(0.1, 2.0).unwrap();
        assert_abs_diff_eq!(x + 0.1 * x * x, 2.0, epsilon = 1e-12);
        // Small a keeps full precision
        let x = solve_quad(1e-9, 0.25).unwrap();
        assert_abs_diff_eq!(x + 1e-9 * x * x, 0.25, epsilon = 1e-15);
        assert!(matches!(
            solve_quad(1.0, -1.0),
            Err(TransformError::NoRealSolution)
        ));
    }

    #[test]
    fn test_quadratic2_round_trip() {
        let t = sample_q2();
        for p in [Point::new(0.0, 0.0), Point::new(1000.0, 800.0), Point::new(250.0, 640.0)] {
            let m = t.forward(p).unwrap();
            let back = t.reverse(m).unwrap();
            assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-6);
            assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_quadratic2_params_layout() {
        let t = sample_q2();
        let p = t.params();
        assert_eq!(p.len(), 12);
        assert_eq!(Quadratic2Transform::from_params(&p), t);
    }

    #[test]
    fn test_quadratic2_fit() {
        let truth = sample_q2();
        let mut from = Vec::new();
        for y in [0.0, 400.0, 800.0] {
            for x in [0.0, 500.0, 1000.0] {
                from.push(Point::new(x, y));
            }
        }
        let to: Vec<Point> = from.iter().map(|&p| truth.forward(p).unwrap()).collect();
        let fit = Quadratic2Transform::fit(&to, &from, &SolveOptions::default()).unwrap();
        for (f, t) in from.iter().zip(&to) {
            let p = fit.forward(*f).unwrap();
            assert_abs_diff_eq!(p.x, t.x, epsilon = 1e-2);
            assert_abs_diff_eq!(p.y, t.y, epsilon = 1e-2);
        }
        // The stored homography acts on raw pixels again
        assert_eq!(fit.matrix()[(2, 2)], 1.0);
    }

    #[test]
    fn test_quadratic_params_and_forward() {
        let mut params = vec![0.0; 12];
        // x' = x + 0.001 x^2, y' = 2y + 5
        params[0] = 0.001;
        params[2] = 1.0;
        params[8] = 2.0;
        params[9] = 5.0;
        let t = QuadraticTransform::from_params(&params);
        assert_eq!(t.params(), params);
        let p = t.forward(Point::new(10.0, 3.0)).unwrap();
        assert_abs_diff_eq!(p.x, 10.1, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_quadratic_reverse_by_optimization() {
        let mut params = vec![0.0; 12];
        params[0] = 1e-4;
        params[2] = 1.0;
        params[4] = 7.0;
        params[6] = -2e-4;
        params[8] = 1.0;
        let t = QuadraticTransform::from_params(&params);
        let p = Point::new(120.0, 80.0);
        let back = t.reverse(t.forward(p).unwrap()).unwrap();
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-5);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-5);
    }
}
