//! Mean-variance strategy: historical estimates into the regularized
//! max-Sharpe model.

use crate::allocation::{estimators, MeanVariance};
use crate::error::{BacktestError, Result};
use crate::panel::{PanelSlice, PricePanel};
use crate::strategy::{PeriodState, Strategy, WeightAssignment, DEFAULT_MIN_OBSERVATIONS};
use tracing::debug;

/// Estimates mean returns and a Ledoit-Wolf shrunk covariance from the
/// period slice, maximizes the regularized Sharpe ratio, and replicates the
/// resulting weight vector across every date of the slice.
#[derive(Debug)]
pub struct MeanVarianceStrategy {
    state: PeriodState,
    risk_free_rate: f64,
    l2_gamma: f64,
    min_observations: usize,
}

impl MeanVarianceStrategy {
    /// Create a strategy with the given per-period risk-free rate and L2
    /// regularization strength.
    pub fn new(risk_free_rate: f64, l2_gamma: f64) -> Self {
        Self {
            state: PeriodState::default(),
            risk_free_rate,
            l2_gamma,
            min_observations: DEFAULT_MIN_OBSERVATIONS,
        }
    }

    /// Override the minimum slice length required before optimizing.
    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations;
        self
    }

    fn solve(
        panel: &PricePanel,
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
        let mu = estimators::mean_historical_return(returns.rows())?;
        let cov = estimators::ledoit_wolf(returns.rows())?;
        debug!(assets = mu.len(), observations = returns.len(), "optimizing");

        let allocation = MeanVariance::new(mu, cov, risk_free_rate, l2_gamma)?.max_sharpe()?;
        Ok(WeightAssignment::uniform(
            panel.dates().to_vec(),
            allocation.weights,
        ))
    }
}

impl Strategy for MeanVarianceStrategy {
    fn name(&self) -> &str {
        "Mean-Variance"
    }

    fn set_period_data(&mut self, slice: PanelSlice<'_>) {
        self.state.set_period(slice);
    }

    fn execute(&mut self) -> Result<()> {
        let (rf, gamma, min_obs) = (self.risk_free_rate, self.l2_gamma, self.min_observations);
        self.state
            .run("Mean-Variance", |panel| Self::solve(panel, rf, gamma, min_obs))
    }

    fn executed(&self) -> bool {
        self.state.executed()
    }

    fn weights(&self) -> Option<&WeightAssignment> {
        self.state.weights()
    }
}
