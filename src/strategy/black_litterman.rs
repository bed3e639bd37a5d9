//! Black-Litterman strategy: equilibrium prior blended with investor views.

use crate::allocation::{estimators, BlackLitterman};
use crate::error::{BacktestError, Result};
use crate::panel::{PanelSlice, PricePanel};
use crate::strategy::{PeriodState, Strategy, WeightAssignment, DEFAULT_MIN_OBSERVATIONS};
use std::collections::BTreeMap;
use tracing::debug;

/// Default uncertainty scaling for the prior.
const DEFAULT_TAU: f64 = 0.05;

/// Derives the market-implied prior from market capitalizations and a risk
/// aversion estimated from a benchmark return series, blends it with the
/// configured views, and feeds the posterior to the regularized max-Sharpe
/// model.
///
/// Market caps and the benchmark series are supplied by the caller, the same
/// way the price panel is: the strategy performs no data acquisition.
#[derive(Debug)]
pub struct BlackLittermanStrategy {
    state: PeriodState,
    market_caps: BTreeMap<String, f64>,
    benchmark_returns: Vec<f64>,
    views: Vec<(String, f64)>,
    confidences: Vec<f64>,
    tau: f64,
    risk_free_rate: f64,
    l2_gamma: f64,
    min_observations: usize,
}

impl BlackLittermanStrategy {
    /// Create a strategy.
    ///
    /// `views` are absolute per-period return beliefs keyed by asset,
    /// paired positionally with `confidences` in (0, 1]. A length mismatch
    /// is rejected here, before any window is processed.
    pub fn new(
        market_caps: BTreeMap<String, f64>,
        benchmark_returns: Vec<f64>,
        views: Vec<(String, f64)>,
        confidences: Vec<f64>,
    ) -> Result<Self> {
        if views.len() != confidences.len() {
            return Err(BacktestError::ViewConfidenceMismatch {
                views: views.len(),
                confidences: confidences.len(),
            });
        }

        Ok(Self {
            state: PeriodState::default(),
            market_caps,
            benchmark_returns,
            views,
            confidences,
            tau: DEFAULT_TAU,
            risk_free_rate: 0.0,
            l2_gamma: 0.0,
            min_observations: DEFAULT_MIN_OBSERVATIONS,
        })
    }

    /// Override the prior uncertainty scaling (typically 0.025-0.05).
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    /// Override the per-period risk-free rate.
    pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
        self.risk_free_rate = risk_free_rate;
        self
    }

    /// Override the L2 regularization strength of the final optimization.
    pub fn with_l2_gamma(mut self, l2_gamma: f64) -> Self {
        self.l2_gamma = l2_gamma;
        self
    }

    /// Override the minimum slice length required before optimizing.
    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations;
        self
    }

    #[allow(clippy::too_many_arguments)]
    fn solve(
        panel: &PricePanel,
        market_caps: &BTreeMap<String, f64>,
        benchmark_returns: &[f64],
        views: &[(String, f64)],
        confidences: &[f64],
        tau: f64,
        risk_free_rate: f64,
        l2_gamma: f64,
        min_observations: usize,
    ) -> Result<WeightAssignment> {
        if panel.len() < min_observations {
            return Err(BacktestError::AllocationError(format!(
                "Need at least {} observations, have {}",
                min_observations,
                panel.len()
            )));
        }

        let returns = panel.as_slice().returns();
        let cov = estimators::ledoit_wolf(returns.rows())?;

        let delta = estimators::market_implied_risk_aversion(benchmark_returns, risk_free_rate)?;
        if delta <= 0.0 {
            return Err(BacktestError::AllocationError(format!(
                "Benchmark implies a non-positive risk aversion: {:.4}",
                delta
            )));
        }
        debug!(delta, "market-implied risk aversion");

        let caps = panel
            .assets()
            .iter()
            .map(|asset| {
                market_caps.get(asset).copied().ok_or_else(|| {
                    BacktestError::AllocationError(format!("No market cap for asset: {}", asset))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let model = BlackLitterman::new(
            panel.assets().to_vec(),
            caps,
            cov,
            tau,
            delta,
            risk_free_rate,
            views.to_vec(),
            confidences.to_vec(),
        )?;

        let allocation = model.allocate(l2_gamma)?;
        Ok(WeightAssignment::uniform(
            panel.dates().to_vec(),
            allocation.weights,
        ))
    }
}

impl Strategy for BlackLittermanStrategy {
    fn name(&self) -> &str {
        "Black-Litterman"
    }

    fn set_period_data(&mut self, slice: PanelSlice<'_>) {
        self.state.set_period(slice);
    }

    fn execute(&mut self) -> Result<()> {
        let (tau, rf, gamma, min_obs) = (
            self.tau,
            self.risk_free_rate,
            self.l2_gamma,
            self.min_observations,
        );
        let caps = &self.market_caps;
        let benchmark = &self.benchmark_returns;
        let views = &self.views;
        let confidences = &self.confidences;
        self.state.run("Black-Litterman", |panel| {
            Self::solve(
                panel, caps, benchmark, views, confidences, tau, rf, gamma, min_obs,
            )
        })
    }

    fn executed(&self) -> bool {
        self.state.executed()
    }

    fn weights(&self) -> Option<&WeightAssignment> {
        self.state.weights()
    }
}
