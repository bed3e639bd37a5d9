//! Multi-factor expected-return model.
//!
//! For each asset, regresses its excess log return on a fixed set of common
//! risk factors via ordinary least squares with intercept. The fitted
//! loadings times the current factor values, plus the risk-free rate, become
//! that asset's expected return.

use crate::allocation::linalg;
use crate::error::{BacktestError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A panel of common risk factors plus the risk-free rate, indexed by date.
///
/// Supplied by the data layer the same way the price panel is; the classic
/// instance is the Fama-French three-factor file (Mkt-RF, SMB, HML, RF).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorData {
    names: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
    risk_free: Vec<f64>,
}

impl FactorData {
    /// Create a factor panel, validating shape and date ordering.
    pub fn new(
        names: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<f64>>,
        risk_free: Vec<f64>,
    ) -> Result<Self> {
        if names.is_empty() {
            return Err(BacktestError::DataError(
                "Factor panel needs at least one factor".to_string(),
            ));
        }
        if dates.len() != rows.len() || dates.len() != risk_free.len() {
            return Err(BacktestError::DataError(format!(
                "Factor panel misaligned: {} dates, {} rows, {} risk-free entries",
                dates.len(),
                rows.len(),
                risk_free.len()
            )));
        }
        if rows.iter().any(|row| row.len() != names.len()) {
            return Err(BacktestError::DataError(
                "Every factor row must have one value per factor".to_string(),
            ));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(BacktestError::DataError(
                "Factor dates must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            names,
            dates,
            rows,
            risk_free,
        })
    }

    /// Factor names, in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of dated rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    fn row_for_date(&self, date: NaiveDate) -> Option<(&[f64], f64)> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| (self.rows[i].as_slice(), self.risk_free[i]))
    }
}

/// Fitted factor model: per-asset loadings, fit quality, and the expected
/// returns implied by the latest factor observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorModel {
    assets: Vec<String>,
    factor_names: Vec<String>,
    /// Per-asset factor loadings, excluding the intercept.
    loadings: Vec<Vec<f64>>,
    /// Per-asset regression intercepts.
    intercepts: Vec<f64>,
    /// Per-asset coefficient of determination.
    r_squared: Vec<f64>,
    /// Per-asset expected return: loadings x latest factors + risk-free.
    expected_returns: Vec<f64>,
}

impl FactorModel {
    /// Fit one OLS regression per asset.
    ///
    /// `asset_returns` holds one row per date in `return_dates` (log
    /// returns); rows are matched with the factor panel by date, and dates
    /// missing from either side are dropped.
    pub fn fit(
        assets: &[String],
        asset_returns: &[Vec<f64>],
        return_dates: &[NaiveDate],
        factors: &FactorData,
    ) -> Result<Self> {
        if asset_returns.len() != return_dates.len() {
            return Err(BacktestError::InvalidInput(format!(
                "{} return rows for {} dates",
                asset_returns.len(),
                return_dates.len()
            )));
        }

        let m = factors.names.len();

        // Align asset returns with factor rows by date.
        let mut design = Vec::new(); // [1, f_1, ..., f_m] per matched date
        let mut matched_returns = Vec::new();
        let mut matched_rf = Vec::new();
        for (date, row) in return_dates.iter().zip(asset_returns.iter()) {
            if let Some((factor_row, rf)) = factors.row_for_date(*date) {
                let mut x = Vec::with_capacity(m + 1);
                x.push(1.0);
                x.extend_from_slice(factor_row);
                design.push(x);
                matched_returns.push(row.clone());
                matched_rf.push(rf);
            }
        }

        let t = design.len();
        if t < m + 2 {
            return Err(BacktestError::AllocationError(format!(
                "Factor regression needs more than {} aligned observations, have {}",
                m + 1,
                t
            )));
        }

        // X'X once; shared across assets.
        let mut xtx = vec![vec![0.0; m + 1]; m + 1];
        for x in &design {
            for i in 0..=m {
                for j in 0..=m {
                    xtx[i][j] += x[i] * x[j];
                }
            }
        }
        let xtx_inv = linalg::invert_matrix(&xtx)?;

        let mut loadings = Vec::with_capacity(assets.len());
        let mut intercepts = Vec::with_capacity(assets.len());
        let mut r_squared = Vec::with_capacity(assets.len());

        for asset_idx in 0..assets.len() {
            // Dependent variable: excess return of this asset.
            let y: Vec<f64> = matched_returns
                .iter()
                .zip(matched_rf.iter())
                .map(|(row, rf)| row[asset_idx] - rf)
                .collect();

            let mut xty = vec![0.0; m + 1];
            for (x, &yi) in design.iter().zip(y.iter()) {
                for i in 0..=m {
                    xty[i] += x[i] * yi;
                }
            }
            let beta = linalg::mat_vec(&xtx_inv, &xty);

            let y_mean = y.iter().sum::<f64>() / t as f64;
            let ss_tot: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
            let ss_res: f64 = design
                .iter()
                .zip(y.iter())
                .map(|(x, &yi)| (yi - linalg::dot(x, &beta)).powi(2))
                .sum();
            let r2 = if ss_tot > 0.0 {
                1.0 - ss_res / ss_tot
            } else {
                0.0
            };

            intercepts.push(beta[0]);
            loadings.push(beta[1..].to_vec());
            r_squared.push(r2);
        }

        // Expected returns from the most recent aligned factor observation.
        let (last_factors, last_rf) = design
            .last()
            .map(|x| (&x[1..], *matched_rf.last().unwrap_or(&0.0)))
            .ok_or_else(|| {
                BacktestError::AllocationError("No aligned factor observations".to_string())
            })?;
        let expected_returns = loadings
            .iter()
            .map(|beta| linalg::dot(beta, last_factors) + last_rf)
            .collect();

        Ok(Self {
            assets: assets.to_vec(),
            factor_names: factors.names.clone(),
            loadings,
            intercepts,
            r_squared,
            expected_returns,
        })
    }

    /// Factor loadings for an asset, excluding the intercept.
    pub fn loadings(&self, asset: &str) -> Option<&[f64]> {
        self.asset_index(asset).map(|i| self.loadings[i].as_slice())
    }

    /// Regression intercept for an asset.
    pub fn intercept(&self, asset: &str) -> Option<f64> {
        self.asset_index(asset).map(|i| self.intercepts[i])
    }

    /// Goodness of fit for an asset.
    pub fn r_squared(&self, asset: &str) -> Option<f64> {
        self.asset_index(asset).map(|i| self.r_squared[i])
    }

    /// Expected returns, one per asset in fit order.
    pub fn expected_returns(&self) -> &[f64] {
        &self.expected_returns
    }

    /// Factor names, in loading order.
    pub fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }
}
