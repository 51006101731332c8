//! Nonlinear least-squares refinement
//!
//! [`optimize`] minimizes `sum((predict(params) - target)^2)` with
//! Levenberg-Marquardt. The Jacobian is estimated by forward differences
//! with step `sqrt(eps) * |x_j|` (or `sqrt(eps)` for a zero parameter), so
//! every family only needs to supply a prediction closure.

use crate::error::{TransformError, TransformResult};
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Dyn, storage::Owned};
use serde::{Deserialize, Serialize};

/// Residual reported for parameters at which the prediction fails, so the
/// trial step is rejected.
const FAILED_RESIDUAL: f64 = 1e50;

/// Options controlling the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Relative tolerance on the reduction of the sum of squares.
    pub ftol: f64,
    /// Relative tolerance on the parameter update.
    pub xtol: f64,
    /// Orthogonality tolerance between residuals and Jacobian columns.
    pub gtol: f64,
    /// Evaluation budget, in units of `(n_params + 1)` evaluations.
    pub patience: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
            patience: 200,
        }
    }
}

impl SolveOptions {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> TransformResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Outcome of a successful optimization.
#[derive(Debug, Clone)]
pub struct OptimizeReport {
    /// Optimized parameters
    pub params: DVector<f64>,
    /// Number of residual evaluations used
    pub evaluations: usize,
    /// Final sum of squared residuals
    pub sum_of_squares: f64,
}

struct Problem<'a, F> {
    target: &'a [f64],
    predict: F,
    params: DVector<f64>,
    /// Residual rows, at least as many as parameters
    rows: usize,
}

impl<F> Problem<'_, F>
where
    F: Fn(&DVector<f64>) -> Option<DVector<f64>>,
{
    fn residuals_at(&self, x: &DVector<f64>) -> Option<DVector<f64>> {
        let predicted = (self.predict)(x)?;
        if predicted.len() != self.target.len() || predicted.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mut r = DVector::zeros(self.rows);
        for (i, (p, t)) in predicted.iter().zip(self.target).enumerate() {
            r[i] = p - t;
        }
        Some(r)
    }
}

impl<F> LeastSquaresProblem<f64, Dyn, Dyn> for Problem<'_, F>
where
    F: Fn(&DVector<f64>) -> Option<DVector<f64>>,
{
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(
            self.residuals_at(&self.params)
                .unwrap_or_else(|| DVector::from_element(self.rows, FAILED_RESIDUAL)),
        )
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let r0 = self.residuals_at(&self.params)?;
        let n = self.params.len();
        let sqrt_eps = f64::EPSILON.sqrt();
        let mut jac = DMatrix::zeros(self.rows, n);
        let mut x = self.params.clone();

        for j in 0..n {
            let xj = self.params[j];
            let h = if xj == 0.0 {
                sqrt_eps
            } else {
                sqrt_eps * xj.abs()
            };
            x[j] = xj + h;
            let column = match self.residuals_at(&x) {
                Some(r1) => (r1 - &r0) / h,
                None => {
                    // Step back instead when the forward step leaves the domain
                    x[j] = xj - h;
                    match self.residuals_at(&x) {
                        Some(r1) => (&r0 - r1) / h,
                        None => DVector::zeros(self.rows),
                    }
                }
            };
            jac.set_column(j, &column);
            x[j] = xj;
        }
        Some(jac)
    }
}

/// Minimize the squared distance between `predict(params)` and `target`.
///
/// `predict` returns `None` where the model is undefined (for example a
/// camera ray that misses the Earth); such parameters are never accepted.
///
/// # Errors
///
/// - [`TransformError::IllConditioned`] if the prediction fails at `x0` or
///   the optimizer hits a numerical breakdown.
/// - [`TransformError::FitDidNotConverge`] if the evaluation budget is
///   exhausted or the optimizer stops for any other unsuccessful reason.
pub fn optimize<F>(
    target: &[f64],
    predict: F,
    x0: DVector<f64>,
    opts: &SolveOptions,
) -> TransformResult<OptimizeReport>
where
    F: Fn(&DVector<f64>) -> Option<DVector<f64>>,
{
    let n_params = x0.len();
    let problem = Problem {
        target,
        predict,
        params: x0,
        rows: target.len().max(n_params),
    };
    if problem.residuals_at(&problem.params).is_none() {
        return Err(TransformError::IllConditioned(
            "model is undefined at the initial guess".to_string(),
        ));
    }

    let lm = LevenbergMarquardt::new()
        .with_ftol(opts.ftol)
        .with_xtol(opts.xtol)
        .with_gtol(opts.gtol)
        .with_patience(opts.patience.max(1));
    let (problem, report) = lm.minimize(problem);
    let evaluations = report.number_of_evaluations;

    match report.termination {
        TerminationReason::Numerical(what) => {
            return Err(TransformError::IllConditioned(format!(
                "numerical breakdown in {what}"
            )));
        }
        ref reason if reason.was_successful() => {
            debug!("optimizer converged after {evaluations} evaluations: {reason:?}");
        }
        ref reason => {
            warn!("optimizer stopped after {evaluations} evaluations: {reason:?}");
            return Err(TransformError::FitDidNotConverge { evaluations });
        }
    }

    let params = problem.params();
    let residuals = problem
        .residuals_at(&params)
        .filter(|_| params.iter().all(|v| v.is_finite()))
        .ok_or_else(|| {
            TransformError::IllConditioned("optimizer produced a non-finite result".to_string())
        })?;

    Ok(OptimizeReport {
        params,
        evaluations,
        sum_of_squares: residuals.norm_squared(),
    })
}
