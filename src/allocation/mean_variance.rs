//! Mean-variance portfolio optimization with L2 regularization.
//!
//! Solves the long-only maximum-Sharpe problem through the standard convex
//! transform: minimize `w'(Sigma + gamma*I)w` subject to `(mu - rf)'w = 1`
//! and `w >= 0`, then rescale the solution to sum to 1. The `gamma` ridge
//! penalizes concentrated portfolios the same way an L2 objective term does.

use crate::allocation::{linalg, Allocation, PortfolioPerformance};
use crate::error::{BacktestError, Result};

/// Mean-variance allocation model.
#[derive(Debug, Clone)]
pub struct MeanVariance {
    expected_returns: Vec<f64>,
    covariance: Vec<Vec<f64>>,
    risk_free_rate: f64,
    l2_gamma: f64,
}

impl MeanVariance {
    /// Create a model from an expected-returns vector and covariance matrix.
    ///
    /// `l2_gamma >= 0` controls the regularization strength; 0 recovers the
    /// unregularized problem.
    pub fn new(
        expected_returns: Vec<f64>,
        covariance: Vec<Vec<f64>>,
        risk_free_rate: f64,
        l2_gamma: f64,
    ) -> Result<Self> {
        let n = expected_returns.len();
        if n == 0 {
            return Err(BacktestError::InvalidInput(
                "Need at least one asset".to_string(),
            ));
        }
        if covariance.len() != n || covariance.iter().any(|row| row.len() != n) {
            return Err(BacktestError::InvalidInput(
                "Covariance matrix must be square and match the number of assets".to_string(),
            ));
        }
        if l2_gamma < 0.0 {
            return Err(BacktestError::InvalidInput(
                "L2 regularization strength must be non-negative".to_string(),
            ));
        }

        Ok(Self {
            expected_returns,
            covariance,
            risk_free_rate,
            l2_gamma,
        })
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.expected_returns.len()
    }

    /// Maximum-Sharpe weights.
    ///
    /// Falls back to the minimum-variance portfolio when no asset has a
    /// positive excess return, since the Sharpe transform is undefined there.
    pub fn max_sharpe(&self) -> Result<Allocation> {
        let excess: Vec<f64> = self
            .expected_returns
            .iter()
            .map(|&r| r - self.risk_free_rate)
            .collect();

        if excess.iter().all(|&r| r <= 0.0) {
            return self.minimum_variance();
        }

        // One equality row: (mu - rf)'w = 1.
        let raw = self.solve_qp(&excess, 1.0)?;
        let total: f64 = raw.iter().sum();
        if total.abs() < 1e-12 {
            return Err(BacktestError::AllocationError(
                "Max-Sharpe solution has zero total weight".to_string(),
            ));
        }
        let weights: Vec<f64> = raw.iter().map(|&w| (w / total).max(0.0)).collect();
        let performance = self.performance(&weights);
        Ok(Allocation {
            weights,
            performance,
        })
    }

    /// Minimum-variance weights (expected returns ignored).
    pub fn minimum_variance(&self) -> Result<Allocation> {
        let ones = vec![1.0; self.n_assets()];
        let weights: Vec<f64> = self
            .solve_qp(&ones, 1.0)?
            .into_iter()
            .map(|w| w.max(0.0))
            .collect();
        let performance = self.performance(&weights);
        Ok(Allocation {
            weights,
            performance,
        })
    }

    /// Performance summary at the given weights, on the unregularized inputs.
    pub fn performance(&self, weights: &[f64]) -> PortfolioPerformance {
        let expected_return = linalg::dot(&self.expected_returns, weights);
        let volatility = linalg::quadratic_form(&self.covariance, weights).max(0.0).sqrt();
        let sharpe_ratio = if volatility > 0.0 {
            (expected_return - self.risk_free_rate) / volatility
        } else {
            0.0
        };
        PortfolioPerformance {
            expected_return,
            volatility,
            sharpe_ratio,
        }
    }

    /// Solve `min w'(Sigma + gamma*I)w  s.t.  a'w = rhs, w >= 0`.
    fn solve_qp(&self, equality_row: &[f64], rhs: f64) -> Result<Vec<f64>> {
        use clarabel::algebra::*;
        use clarabel::solver::*;

        let n = self.n_assets();

        // P = Sigma + gamma*I in CSC format, column by column.
        let mut p_data = Vec::new();
        let mut p_indices = Vec::new();
        let mut p_indptr = vec![0];
        for j in 0..n {
            for i in 0..n {
                let mut val = self.covariance[i][j];
                if i == j {
                    val += self.l2_gamma;
                }
                if val.abs() > 1e-12 {
                    p_data.push(val);
                    p_indices.push(i);
                }
            }
            p_indptr.push(p_data.len());
        }
        let p = CscMatrix::new(n, n, p_indptr, p_indices, p_data);

        let q = vec![0.0; n];

        // Constraints: one equality row, then -w <= 0 for non-negativity.
        let mut a_data = Vec::new();
        let mut a_indices = Vec::new();
        let mut a_indptr = vec![0];
        for (j, &coeff) in equality_row.iter().enumerate() {
            a_data.push(coeff);
            a_indices.push(0);

            a_data.push(-1.0);
            a_indices.push(1 + j);

            a_indptr.push(a_data.len());
        }
        let a = CscMatrix::new(1 + n, n, a_indptr, a_indices, a_data);

        let mut b = vec![rhs];
        b.extend(vec![0.0; n]);

        let cones = [ZeroConeT(1), NonnegativeConeT(n)];

        let settings = DefaultSettingsBuilder::default()
            .max_iter(100)
            .verbose(false)
            .build()
            .map_err(|e| {
                BacktestError::AllocationError(format!("Failed to build solver settings: {}", e))
            })?;

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);

        solver.solve();

        if !matches!(solver.solution.status, SolverStatus::Solved) {
            return Err(BacktestError::AllocationError(format!(
                "Optimization failed with status: {:?}",
                solver.solution.status
            )));
        }

        Ok(solver.solution.x.clone())
    }
}
