//! Class-weighted, L2-regularized logistic regression.
//!
//! Minimizes `C * sum_i s_i * logloss_i + 0.5 * |w|^2` (intercept not
//! penalized) with damped Newton steps. `s_i` is the weight of the sample's
//! class, which lets the minority positive class count for more.

use super::Frame;
use crate::error::PipelineError;
use nalgebra::{DMatrix, DVector};
use ndarray::{s, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyperparameters of the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Inverse regularization strength
    pub c: f64,
    /// Weight of positive samples relative to negatives (negatives weigh 1)
    pub positive_class_weight: f64,
    /// Iteration cap of the optimizer
    pub max_iter: usize,
    /// Stop once the largest gradient component falls below this
    pub tolerance: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            positive_class_weight: 10.0,
            max_iter: 2000,
            tolerance: 1e-4,
        }
    }
}

/// Outcome of a fit. Not converging is reported here, never as an error.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub converged: bool,
    pub iterations: usize,
    pub final_loss: f64,
}

/// Binary logistic regression classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: ClassifierParams,
    coefficients: Option<Array1<f64>>,
    intercept: Option<f64>,
}

/// Training data laid out for the optimizer: a design matrix whose last
/// column is the constant intercept term, plus per-row targets and weights
struct Problem {
    design: Array2<f64>,
    targets: Array1<f64>,
    weights: Array1<f64>,
    /// 1 for every penalized parameter, 0 for the intercept
    penalty_mask: Array1<f64>,
    c: f64,
}

impl Problem {
    /// Penalized weighted log-loss at `theta` (weights followed by intercept)
    fn objective(&self, theta: &Array1<f64>) -> f64 {
        let z = self.design.dot(theta);
        let data_loss: f64 = z
            .iter()
            .zip(&self.targets)
            .zip(&self.weights)
            .map(|((&z, &y), &s)| s * (softplus(z) - y * z))
            .sum();
        let penalty = 0.5 * (&self.penalty_mask * theta).dot(theta);

        self.c * data_loss + penalty
    }

    /// Gradient and Hessian of the objective at `theta`
    fn derivatives(&self, theta: &Array1<f64>) -> (Array1<f64>, Array2<f64>) {
        let p = self.design.dot(theta).mapv_into(sigmoid);

        let residual = (&p - &self.targets) * &self.weights * self.c;
        let curvature = p.mapv(|v| v * (1.0 - v)) * &self.weights * self.c;

        let grad = self.design.t().dot(&residual) + &self.penalty_mask * theta;

        let weighted = &self.design * &curvature.insert_axis(Axis(1));
        let mut hess = self.design.t().dot(&weighted);
        hess.diag_mut()
            .zip_mut_with(&self.penalty_mask, |h, &m| *h += m + 1e-10);

        (grad, hess)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp_z = z.exp();
        exp_z / (1.0 + exp_z)
    }
}

/// ln(1 + e^z) without overflow
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

impl LogisticRegression {
    pub fn new(params: ClassifierParams) -> Self {
        Self {
            params,
            coefficients: None,
            intercept: None,
        }
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    /// Learned feature weights, in input column order
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> Option<f64> {
        self.intercept
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn sample_weight(&self, label: u8) -> f64 {
        if label == 1 {
            self.params.positive_class_weight
        } else {
            1.0
        }
    }

    /// Fit on a preprocessed feature frame and binary labels
    pub fn fit(&mut self, x: &Frame, y: &[u8]) -> Result<FitSummary, PipelineError> {
        if x.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        if x.n_rows() != y.len() {
            return Err(PipelineError::LabelMismatch {
                rows: x.n_rows(),
                labels: y.len(),
            });
        }

        let n_features = x.n_cols();
        let dim = n_features + 1;

        let mut design: Array2<f64> = Array2::ones((x.n_rows(), dim));
        design.slice_mut(s![.., ..n_features]).assign(x.values());
        let mut penalty_mask: Array1<f64> = Array1::ones(dim);
        penalty_mask[n_features] = 0.0;

        let problem = Problem {
            design,
            targets: y.iter().map(|&label| f64::from(label)).collect(),
            weights: y.iter().map(|&label| self.sample_weight(label)).collect(),
            penalty_mask,
            c: self.params.c,
        };

        let mut theta: Array1<f64> = Array1::zeros(dim);
        let mut loss = problem.objective(&theta);
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.params.max_iter {
            let (grad, hess) = problem.derivatives(&theta);

            let grad_norm = grad.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
            if grad_norm <= self.params.tolerance {
                converged = true;
                break;
            }

            let step = newton_step(&hess, &grad).ok_or(PipelineError::Singular(iterations))?;
            let slope = grad.dot(&step);

            // backtracking line search on the objective
            let mut t = 1.0;
            let (candidate, candidate_loss) = loop {
                let mut candidate = theta.clone();
                candidate.scaled_add(t, &step);
                let candidate_loss = problem.objective(&candidate);
                if candidate_loss <= loss + 1e-4 * t * slope || t < 1e-10 {
                    break (candidate, candidate_loss);
                }
                t *= 0.5;
            };

            theta = candidate;
            loss = candidate_loss;
            iterations += 1;
        }

        debug!(iterations, converged, loss, "Logistic regression fit finished");

        self.intercept = Some(theta[n_features]);
        self.coefficients = Some(theta.slice(s![..n_features]).to_owned());

        Ok(FitSummary {
            converged,
            iterations,
            final_loss: loss,
        })
    }

    /// Probability of the positive class for every row
    pub fn predict_proba(&self, x: &Frame) -> Result<Vec<f64>, PipelineError> {
        let w = self.coefficients.as_ref().ok_or(PipelineError::NotFitted)?;
        let b = self.intercept.ok_or(PipelineError::NotFitted)?;

        if x.n_cols() != w.len() {
            return Err(PipelineError::WidthMismatch {
                expected: w.len(),
                got: x.n_cols(),
            });
        }

        Ok(x
            .values()
            .outer_iter()
            .map(|row| sigmoid(row.dot(w) + b))
            .collect())
    }
}

/// Solve `hess * step = -grad` by LU decomposition; `None` if the system
/// is singular
fn newton_step(hess: &Array2<f64>, grad: &Array1<f64>) -> Option<Array1<f64>> {
    let dim = grad.len();
    let flat: Vec<f64> = hess.iter().copied().collect();
    let h = DMatrix::from_row_slice(dim, dim, &flat);
    let rhs = DVector::from_iterator(dim, grad.iter().map(|g| -g));

    let step = h.lu().solve(&rhs)?;
    if step.iter().all(|v| v.is_finite()) {
        Some(step.iter().copied().collect())
    } else {
        None
    }
}
