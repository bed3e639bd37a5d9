//! Factor-model strategy: regression-implied expected returns into the
//! mean-variance optimizer.

use crate::allocation::{estimators, FactorData, FactorModel, MeanVariance};
use crate::error::{BacktestError, Result};
use crate::panel::{PanelSlice, PricePanel};
use crate::strategy::{PeriodState, Strategy, WeightAssignment, DEFAULT_MIN_OBSERVATIONS};
use tracing::debug;

/// Fits a per-asset factor regression on the slice's excess log returns,
/// takes the fitted loadings times the latest factor values (plus the
/// risk-free rate) as expected returns, and optimizes against a Ledoit-Wolf
/// shrunk covariance.
#[derive(Debug)]
pub struct FactorModelStrategy {
    state: PeriodState,
    factors: FactorData,
    risk_free_rate: f64,
    l2_gamma: f64,
    min_observations: usize,
}

impl FactorModelStrategy {
    /// Create a strategy over the given factor panel.
    pub fn new(factors: FactorData) -> Self {
        Self {
            state: PeriodState::default(),
            factors,
            risk_free_rate: 0.0,
            l2_gamma: 0.0,
            min_observations: DEFAULT_MIN_OBSERVATIONS,
        }
    }

    /// Override the per-period risk-free rate used by the optimizer.
    pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
        self.risk_free_rate = risk_free_rate;
        self
    }

    /// Override the L2 regularization strength.
    pub fn with_l2_gamma(mut self, l2_gamma: f64) -> Self {
        self.l2_gamma = l2_gamma;
        self
    }

    /// Override the minimum slice length required before fitting.
    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations;
        self
    }

    fn solve(
        panel: &PricePanel,
        factors: &FactorData,
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

        let slice = panel.as_slice();
        let log_returns = slice.log_returns();
        let return_dates = &slice.dates()[1..];

        let model = FactorModel::fit(slice.assets(), &log_returns, return_dates, factors)?;
        debug!(
            assets = slice.n_assets(),
            factors = model.factor_names().len(),
            "factor regression fitted"
        );

        let cov = estimators::ledoit_wolf(slice.returns().rows())?;
        let allocation = MeanVariance::new(
            model.expected_returns().to_vec(),
            cov,
            risk_free_rate,
            l2_gamma,
        )?
        .max_sharpe()?;

        Ok(WeightAssignment::uniform(
            panel.dates().to_vec(),
            allocation.weights,
        ))
    }
}

impl Strategy for FactorModelStrategy {
    fn name(&self) -> &str {
        "Factor Model"
    }

    fn set_period_data(&mut self, slice: PanelSlice<'_>) {
        self.state.set_period(slice);
    }

    fn execute(&mut self) -> Result<()> {
        let (rf, gamma, min_obs) = (self.risk_free_rate, self.l2_gamma, self.min_observations);
        let factors = &self.factors;
        self.state.run("Factor Model", |panel| {
            Self::solve(panel, factors, rf, gamma, min_obs)
        })
    }

    fn executed(&self) -> bool {
        self.state.executed()
    }

    fn weights(&self) -> Option<&WeightAssignment> {
        self.state.weights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PricePanel;
    use chrono::NaiveDate;

    fn date(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(offset)
    }

    fn panel_and_factors(rows: usize) -> (PricePanel, FactorData) {
        let dates: Vec<NaiveDate> = (0..rows).map(|i| date(i as u64)).collect();
        let prices = (0..rows)
            .map(|i| {
                let t = i as f64;
                vec![
                    150.0 * (1.0 + 0.0008 * (t * 0.6).sin()).powf(t.min(40.0)),
                    60.0 + t * 0.04 + (t * 1.1).cos() * 0.8,
                ]
            })
            .collect();
        let panel =
            PricePanel::new(dates.clone(), vec!["AAA".to_string(), "BBB".to_string()], prices)
                .unwrap();

        let factor_rows = (0..rows)
            .map(|i| vec![((i as f64) * 0.6).sin() * 0.01, ((i as f64) * 0.3).cos() * 0.005])
            .collect();
        let factors = FactorData::new(
            vec!["MKT".to_string(), "SMB".to_string()],
            dates,
            factor_rows,
            vec![0.0001; rows],
        )
        .unwrap();

        (panel, factors)
    }

    #[test]
    fn produces_weights_from_aligned_factors() {
        let (panel, factors) = panel_and_factors(60);
        let mut strategy = FactorModelStrategy::new(factors).with_l2_gamma(0.1);
        strategy.set_period_data(panel.as_slice());
        strategy.execute().unwrap();

        assert!(strategy.executed());
        let assignment = strategy.weights().unwrap();
        assert_eq!(assignment.len(), 60);
        let total: f64 = assignment.rows()[0].iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_factor_dates_skip_the_window() {
        let (panel, _) = panel_and_factors(60);
        // Factor panel from a different year: no overlap with the slice.
        let far_dates: Vec<NaiveDate> = (0..60)
            .map(|i| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(i))
            .collect();
        let factors = FactorData::new(
            vec!["MKT".to_string()],
            far_dates.clone(),
            far_dates.iter().map(|_| vec![0.001]).collect(),
            vec![0.0001; far_dates.len()],
        )
        .unwrap();

        let mut strategy = FactorModelStrategy::new(factors);
        strategy.set_period_data(panel.as_slice());
        strategy.execute().unwrap();

        assert!(!strategy.executed());
    }
}
