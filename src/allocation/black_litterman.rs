//! Black-Litterman posterior blending.
//!
//! Combines a market-implied equilibrium prior with absolute investor views
//! via Bayesian updating:
//!
//! - prior: `Pi = delta * Sigma * w_mkt`
//! - posterior mean: `[(tau*Sigma)^-1 + P'Omega^-1 P]^-1 [(tau*Sigma)^-1 Pi + P'Omega^-1 Q]`
//! - posterior covariance: `Sigma + [(tau*Sigma)^-1 + P'Omega^-1 P]^-1`
//!
//! View uncertainty `Omega` follows the Idzorek mapping: a view held with
//! confidence `c` in (0, 1] gets variance `p (tau*Sigma) p' * (1 - c) / c`.
//! With no views the posterior is exactly the prior.

use crate::allocation::estimators::market_implied_prior_returns;
use crate::allocation::{linalg, Allocation, MeanVariance};
use crate::error::{BacktestError, Result};

/// Variance floor for a view held with full confidence, keeping `Omega`
/// invertible.
const OMEGA_FLOOR: f64 = 1e-8;

/// Posterior estimates produced by the blend.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    /// Blended expected returns, one per asset.
    pub returns: Vec<f64>,
    /// Blended covariance matrix.
    pub covariance: Vec<Vec<f64>>,
}

/// Black-Litterman allocation model over a fixed asset universe.
#[derive(Debug, Clone)]
pub struct BlackLitterman {
    assets: Vec<String>,
    market_weights: Vec<f64>,
    covariance: Vec<Vec<f64>>,
    tau: f64,
    risk_aversion: f64,
    risk_free_rate: f64,
    /// Absolute views: (asset, believed per-period return).
    views: Vec<(String, f64)>,
    /// Confidence in (0, 1] for each view, paired by position.
    confidences: Vec<f64>,
}

impl BlackLitterman {
    /// Create a model.
    ///
    /// The views/confidences pairing is validated first, before any matrix
    /// work, so a mismatch is rejected without touching the covariance.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        assets: Vec<String>,
        market_caps: Vec<f64>,
        covariance: Vec<Vec<f64>>,
        tau: f64,
        risk_aversion: f64,
        risk_free_rate: f64,
        views: Vec<(String, f64)>,
        confidences: Vec<f64>,
    ) -> Result<Self> {
        if views.len() != confidences.len() {
            return Err(BacktestError::ViewConfidenceMismatch {
                views: views.len(),
                confidences: confidences.len(),
            });
        }

        let n = assets.len();
        if n == 0 {
            return Err(BacktestError::InvalidInput(
                "Need at least one asset".to_string(),
            ));
        }
        if market_caps.len() != n {
            return Err(BacktestError::InvalidInput(
                "Market caps length must match the number of assets".to_string(),
            ));
        }
        if covariance.len() != n || covariance.iter().any(|row| row.len() != n) {
            return Err(BacktestError::InvalidInput(
                "Covariance matrix must be square and match the number of assets".to_string(),
            ));
        }
        if tau <= 0.0 || tau > 1.0 {
            return Err(BacktestError::InvalidInput(
                "Tau must be in (0, 1], typically 0.025-0.05".to_string(),
            ));
        }
        if risk_aversion <= 0.0 {
            return Err(BacktestError::InvalidInput(
                "Risk aversion must be positive".to_string(),
            ));
        }
        for (asset, _) in &views {
            if !assets.contains(asset) {
                return Err(BacktestError::InvalidInput(format!(
                    "View references unknown asset: {}",
                    asset
                )));
            }
        }
        if confidences.iter().any(|&c| c <= 0.0 || c > 1.0) {
            return Err(BacktestError::InvalidInput(
                "View confidences must be in (0, 1]".to_string(),
            ));
        }

        let total_cap: f64 = market_caps.iter().sum();
        if total_cap <= 0.0 {
            return Err(BacktestError::InvalidInput(
                "Total market cap must be positive".to_string(),
            ));
        }
        let market_weights = market_caps.iter().map(|&cap| cap / total_cap).collect();

        Ok(Self {
            assets,
            market_weights,
            covariance,
            tau,
            risk_aversion,
            risk_free_rate,
            views,
            confidences,
        })
    }

    /// Asset identifiers, in weight order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Market-implied equilibrium prior returns.
    pub fn prior_returns(&self) -> Vec<f64> {
        market_implied_prior_returns(&self.market_weights, self.risk_aversion, &self.covariance)
    }

    /// Blend the prior with the views.
    pub fn posterior(&self) -> Result<Posterior> {
        let n = self.assets.len();
        let k = self.views.len();
        let prior = self.prior_returns();

        // No views: no belief shift, the posterior is the prior.
        if k == 0 {
            return Ok(Posterior {
                returns: prior,
                covariance: self.covariance.clone(),
            });
        }

        // Pick matrix P (k x n) and view returns Q.
        let mut p_matrix = vec![vec![0.0; n]; k];
        let mut q_vector = vec![0.0; k];
        for (view_idx, (asset, expected)) in self.views.iter().enumerate() {
            // Asset membership was validated at construction.
            let asset_idx = self.assets.iter().position(|a| a == asset).ok_or_else(|| {
                BacktestError::InvalidInput(format!("View references unknown asset: {}", asset))
            })?;
            p_matrix[view_idx][asset_idx] = 1.0;
            q_vector[view_idx] = *expected;
        }

        let tau_cov = linalg::mat_scale(&self.covariance, self.tau);

        // Idzorek mapping from confidence to view variance.
        let omega_diag: Vec<f64> = p_matrix
            .iter()
            .zip(self.confidences.iter())
            .map(|(p_row, &c)| {
                let view_var = linalg::quadratic_form(&tau_cov, p_row);
                (view_var * (1.0 - c) / c).max(OMEGA_FLOOR)
            })
            .collect();

        let tau_cov_inv = linalg::invert_matrix(&tau_cov)?;

        // P'Omega^-1 P.
        let mut pt_omega_inv_p = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                let mut sum = 0.0;
                for view_idx in 0..k {
                    sum += p_matrix[view_idx][i] * p_matrix[view_idx][j] / omega_diag[view_idx];
                }
                pt_omega_inv_p[i][j] = sum;
            }
        }

        let combined_precision = linalg::mat_add(&tau_cov_inv, &pt_omega_inv_p);
        let blend_cov = linalg::invert_matrix(&combined_precision)?;

        // Right-hand side: (tau*Sigma)^-1 Pi + P'Omega^-1 Q.
        let mut rhs = linalg::mat_vec(&tau_cov_inv, &prior);
        for (i, entry) in rhs.iter_mut().enumerate() {
            for view_idx in 0..k {
                *entry += p_matrix[view_idx][i] * q_vector[view_idx] / omega_diag[view_idx];
            }
        }

        let returns = linalg::mat_vec(&blend_cov, &rhs);
        let covariance = linalg::mat_add(&self.covariance, &blend_cov);

        Ok(Posterior {
            returns,
            covariance,
        })
    }

    /// Posterior blend followed by regularized max-Sharpe optimization.
    pub fn allocate(&self, l2_gamma: f64) -> Result<Allocation> {
        let posterior = self.posterior()?;
        MeanVariance::new(
            posterior.returns,
            posterior.covariance,
            self.risk_free_rate,
            l2_gamma,
        )?
        .max_sharpe()
    }
}
