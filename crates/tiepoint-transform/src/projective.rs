//! Projective (homography) transform
//!
//! A 3x3 matrix with `m22 = 1` and a division by the third homogeneous
//! coordinate. The reverse mapping uses the adjugate of the matrix, scaled
//! so its last entry is one.

use crate::error::{TransformError, TransformResult};
use crate::linear::AffineTransform;
use crate::optimize::SolveOptions;
use crate::transform::{PointTransform, check_points, refine};
use log::warn;
use nalgebra::{DVector, Matrix3, Vector3};
use std::sync::OnceLock;
use tiepoint_core::Point;

/// Relative size below which a homogeneous normalizer counts as zero.
pub const NORMALIZER_EPS: f64 = 1e-12;

/// Divide a homogeneous vector by its last coordinate.
///
/// # Errors
///
/// Returns [`TransformError::IllConditioned`] if the point maps to the line
/// at infinity.
pub(crate) fn dehomogenize(v: &Vector3<f64>) -> TransformResult<Point> {
    if !(v.z.abs() > NORMALIZER_EPS * v.norm()) {
        return Err(TransformError::IllConditioned(
            "point maps to infinity".to_string(),
        ));
    }
    Ok(Point::new(v.x / v.z, v.y / v.z))
}

/// Inverse of a homography via cofactors, normalized so `[2][2] = 1`.
///
/// # Errors
///
/// Returns [`TransformError::IllConditioned`] if the normalizing cofactor
/// vanishes relative to the others.
pub fn projective_inverse(m: &Matrix3<f64>) -> TransformResult<Matrix3<f64>> {
    let (c0, c1, c2) = (m[(0, 0)], m[(0, 1)], m[(0, 2)]);
    let (c3, c4, c5) = (m[(1, 0)], m[(1, 1)], m[(1, 2)]);
    let (c6, c7) = (m[(2, 0)], m[(2, 1)]);

    let adj = Matrix3::new(
        c4 - c5 * c7,
        c2 * c7 - c1,
        c1 * c5 - c2 * c4,
        c5 * c6 - c3,
        c0 - c2 * c6,
        c3 * c2 - c0 * c5,
        c3 * c7 - c4 * c6,
        c1 * c6 - c0 * c7,
        c0 * c4 - c1 * c3,
    );
    let norm = adj[(2, 2)];
    if !(norm.abs() > NORMALIZER_EPS * adj.amax()) {
        warn!("homography inverse normalizer {norm:e} is near zero");
        return Err(TransformError::IllConditioned(
            "homography is not invertible".to_string(),
        ));
    }
    Ok(adj / norm)
}

/// A plane homography.
#[derive(Debug, Clone)]
pub struct ProjectiveTransform {
    matrix: Matrix3<f64>,
    inverse: OnceLock<Option<Matrix3<f64>>>,
}

impl ProjectiveTransform {
    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self {
            matrix,
            inverse: OnceLock::new(),
        }
    }

    /// Build from the eight free entries in row-major order.
    pub fn from_params(p: &[f64]) -> Self {
        Self::from_matrix(Matrix3::new(
            p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7], 1.0,
        ))
    }

    /// Fit by refining the affine solution.
    pub fn fit(to: &[Point], from: &[Point], opts: &SolveOptions) -> TransformResult<Self> {
        check_points(to, from, 4)?;
        let affine = AffineTransform::fit(to, from)?;
        let x0 = DVector::from_iterator(8, affine.matrix().transpose().iter().take(8).copied());
        refine(to, from, x0, opts, |p| Self::from_params(p.as_slice()))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// The eight free entries in row-major order.
    pub fn params(&self) -> Vec<f64> {
        self.matrix.transpose().iter().take(8).copied().collect()
    }
}

impl PartialEq for ProjectiveTransform {
    fn eq(&self, other: &Self) -> bool {
        self.matrix == other.matrix
    }
}

impl PointTransform for ProjectiveTransform {
    fn forward(&self, p: Point) -> TransformResult<Point> {
        dehomogenize(&(self.matrix * Vector3::new(p.x, p.y, 1.0)))
    }

    fn reverse(&self, p: Point) -> TransformResult<Point> {
        let inv = self
            .inverse
            .get_or_init(|| projective_inverse(&self.matrix).ok())
            .as_ref()
            .ok_or_else(|| {
                TransformError::IllConditioned("homography is not invertible".to_string())
            })?;
        dehomogenize(&(inv * Vector3::new(p.x, p.y, 1.0)))
    }
}
