//! Backtest orchestration.
//!
//! The [`Backtester`] drives the window generator, hands each period slice
//! to the registered strategy, and merges produced weights with realized
//! returns into the performance accumulator. One call to
//! [`step`](Backtester::step) processes exactly one window; windows are
//! strictly sequential and a caller may stop between steps with valid
//! partial results.

use crate::error::{BacktestError, Result};
use crate::panel::{PricePanel, ReturnsPanel};
use crate::performance::{CumulativePoint, EnrichedReturn, PerformanceAccumulator};
use crate::strategy::Strategy;
use crate::window::WindowGenerator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Row count of the first window.
    pub initial_period: usize,
    /// Row increment per subsequent window.
    pub window_size: usize,
    /// Capital basis the cumulative curve is scaled by.
    pub initial_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_period: 252,
            window_size: 21,
            initial_capital: 100.0,
        }
    }
}

/// What one step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The strategy executed and its weights were merged; `rows` is the
    /// size of the merged series contributed by this window.
    Merged { rows: usize },
    /// The strategy did not execute; the window was a no-op.
    Skipped,
}

/// Summary of a completed (or partial) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Name of the registered strategy.
    pub strategy_name: String,
    /// Windows in the full schedule: `ceil(total_rows / window_size)`.
    pub windows_planned: usize,
    /// Windows whose weights were merged.
    pub windows_executed: usize,
    /// Windows skipped because the strategy did not execute.
    pub windows_skipped: usize,
    /// Rows in the enriched return series.
    pub rows: usize,
    /// Final cumulative growth factor.
    pub final_growth: f64,
    /// Capital basis.
    pub initial_capital: f64,
    /// Final capital at that basis.
    pub final_capital: f64,
}

/// Walk-forward backtest orchestrator.
pub struct Backtester {
    config: BacktestConfig,
    windows: WindowGenerator,
    returns: ReturnsPanel,
    strategy: Option<Box<dyn Strategy>>,
    accumulator: PerformanceAccumulator,
    windows_executed: usize,
    windows_skipped: usize,
}

impl Backtester {
    /// Create a backtester over the given panel.
    pub fn new(panel: PricePanel, config: BacktestConfig) -> Result<Self> {
        if config.initial_capital <= 0.0 {
            return Err(BacktestError::InvalidInput(
                "initial_capital must be positive".to_string(),
            ));
        }
        let returns = panel.returns();
        let windows = WindowGenerator::new(panel, config.initial_period, config.window_size)?;
        let accumulator = PerformanceAccumulator::new(config.initial_capital);

        Ok(Self {
            config,
            windows,
            returns,
            strategy: None,
            accumulator,
            windows_executed: 0,
            windows_skipped: 0,
        })
    }

    /// Register the strategy. Must happen before the first step.
    pub fn set_strategy(&mut self, strategy: Box<dyn Strategy>) {
        self.strategy = Some(strategy);
    }

    /// Process one window: pull the next slice, execute the strategy, and
    /// merge its weights with realized returns if it executed.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let strategy = self.strategy.as_mut().ok_or(BacktestError::NoStrategy)?;

        let Some(slice) = self.windows.next_slice() else {
            return Ok(StepOutcome::Skipped);
        };
        let slice_rows = slice.len();
        strategy.set_period_data(slice);
        debug!(
            iteration = self.windows.iteration_count(),
            rows = slice_rows,
            "processing window"
        );

        strategy.execute()?;

        if !strategy.executed() {
            self.windows_skipped += 1;
            return Ok(StepOutcome::Skipped);
        }

        let assignment = strategy.weights().ok_or_else(|| {
            BacktestError::InvalidInput(
                "Strategy reported executed but produced no weights".to_string(),
            )
        })?;
        let rows = self.accumulator.merge(assignment, &self.returns)?;
        self.windows_executed += 1;
        Ok(StepOutcome::Merged { rows })
    }

    /// Run the full window schedule: `ceil(total_rows / window_size)` steps.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.run_steps(self.planned_windows())
    }

    /// Run up to `steps` windows; fewer than the planned schedule is fine.
    pub fn run_steps(&mut self, steps: usize) -> Result<RunSummary> {
        let name = self
            .strategy
            .as_ref()
            .map(|s| s.name().to_string())
            .ok_or(BacktestError::NoStrategy)?;
        info!(
            strategy = %name,
            windows = steps,
            rows = self.windows.panel().len(),
            assets = self.windows.panel().n_assets(),
            "running backtest"
        );

        for _ in 0..steps {
            self.step()?;
        }
        Ok(self.summary())
    }

    /// Number of windows in the full schedule.
    pub fn planned_windows(&self) -> usize {
        WindowGenerator::planned_windows(self.windows.panel().len(), self.config.window_size)
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            strategy_name: self
                .strategy
                .as_ref()
                .map(|s| s.name().to_string())
                .unwrap_or_default(),
            windows_planned: self.planned_windows(),
            windows_executed: self.windows_executed,
            windows_skipped: self.windows_skipped,
            rows: self.accumulator.len(),
            final_growth: self.accumulator.final_growth(),
            initial_capital: self.accumulator.initial_capital(),
            final_capital: self.accumulator.final_capital(),
        }
    }

    /// The price panel being walked.
    pub fn panel(&self) -> &PricePanel {
        self.windows.panel()
    }

    /// The realized returns panel derived from the prices.
    pub fn returns(&self) -> &ReturnsPanel {
        &self.returns
    }

    /// The performance accumulator.
    pub fn accumulator(&self) -> &PerformanceAccumulator {
        &self.accumulator
    }

    /// The enriched return series accumulated so far.
    pub fn enriched_returns(&self) -> &[EnrichedReturn] {
        self.accumulator.rows()
    }

    /// The cumulative return curve accumulated so far.
    pub fn cumulative_curve(&self) -> &[CumulativePoint] {
        self.accumulator.curve()
    }

    /// The configuration in effect.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::EqualWeightStrategy;
    use chrono::NaiveDate;

    fn panel(rows: usize) -> PricePanel {
        let dates = (0..rows)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64))
            .collect();
        let prices = (0..rows)
            .map(|i| {
                let t = i as f64;
                vec![100.0 + t, 50.0 + (t * 0.5).sin()]
            })
            .collect();
        PricePanel::new(dates, vec!["AAA".to_string(), "BBB".to_string()], prices).unwrap()
    }

    fn config(initial_period: usize, window_size: usize) -> BacktestConfig {
        BacktestConfig {
            initial_period,
            window_size,
            initial_capital: 100.0,
        }
    }

    #[test]
    fn stepping_without_a_strategy_fails() {
        let mut backtester = Backtester::new(panel(10), config(5, 3)).unwrap();
        assert!(matches!(
            backtester.step(),
            Err(BacktestError::NoStrategy)
        ));
    }

    #[test]
    fn full_run_covers_every_return_row() {
        let mut backtester = Backtester::new(panel(10), config(5, 3)).unwrap();
        backtester.set_strategy(Box::new(EqualWeightStrategy::new()));
        let summary = backtester.run().unwrap();

        assert_eq!(summary.windows_planned, 4);
        assert_eq!(summary.windows_executed, 4);
        assert_eq!(summary.windows_skipped, 0);
        // 10 price rows -> 9 return rows, all eventually covered.
        assert_eq!(summary.rows, 9);
    }

    #[test]
    fn partial_run_leaves_valid_state() {
        let mut backtester = Backtester::new(panel(10), config(5, 3)).unwrap();
        backtester.set_strategy(Box::new(EqualWeightStrategy::new()));
        backtester.run_steps(1).unwrap();

        // First window: 5 price rows -> 4 return rows.
        assert_eq!(backtester.enriched_returns().len(), 4);
        let curve = backtester.cumulative_curve();
        assert_eq!(curve.len(), 4);
    }

    #[test]
    fn rejects_invalid_capital() {
        let result = Backtester::new(
            panel(10),
            BacktestConfig {
                initial_period: 5,
                window_size: 3,
                initial_capital: 0.0,
            },
        );
        assert!(result.is_err());
    }
}
