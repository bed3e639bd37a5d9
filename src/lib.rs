//! Lookback - a walk-forward portfolio backtesting engine.
//!
//! # Overview
//!
//! Lookback walks a price history forward in expanding windows, asks a
//! pluggable allocation strategy for portfolio weights at each step, and
//! compounds the realized portfolio returns into a cumulative performance
//! curve:
//!
//! - **Expanding windows**: an explicit, saturating window generator - no
//!   surprise out-of-bounds behavior at the end of the panel
//! - **Pluggable strategies**: equal weight, mean-variance, Black-Litterman,
//!   and factor-model variants behind one `Strategy` trait
//! - **Allocation models**: regularized max-Sharpe optimization,
//!   Black-Litterman posterior blending, OLS factor regressions
//! - **Deterministic accounting**: append-only enriched return series and an
//!   idempotently recomputed cumulative curve
//! - **Configuration files**: TOML-based configuration for reproducible runs
//!
//! # Quick Start
//!
//! ```no_run
//! use lookback::{Backtester, BacktestConfig, EqualWeightStrategy, PricePanel};
//!
//! // Load a rectangular price panel (date,ASSET1,ASSET2,... CSV).
//! let panel = PricePanel::load_csv("data/panel.csv").unwrap();
//!
//! let config = BacktestConfig {
//!     initial_period: 252,
//!     window_size: 21,
//!     ..Default::default()
//! };
//! let mut backtester = Backtester::new(panel, config).unwrap();
//! backtester.set_strategy(Box::new(EqualWeightStrategy::new()));
//!
//! let summary = backtester.run().unwrap();
//! println!("Growth: {:.2}x over {} rows", summary.final_growth, summary.rows);
//! ```
//!
//! # Creating Custom Strategies
//!
//! Implement the [`Strategy`] trait to plug in your own allocation logic:
//!
//! ```
//! use lookback::{PanelSlice, Strategy, WeightAssignment};
//! use lookback::error::Result;
//!
//! struct FirstAssetOnly {
//!     weights: Option<WeightAssignment>,
//!     executed: bool,
//!     period: Option<(Vec<chrono::NaiveDate>, usize)>,
//! }
//!
//! impl Strategy for FirstAssetOnly {
//!     fn name(&self) -> &str {
//!         "First Asset Only"
//!     }
//!
//!     fn set_period_data(&mut self, slice: PanelSlice<'_>) {
//!         self.period = Some((slice.dates().to_vec(), slice.n_assets()));
//!         self.executed = false;
//!     }
//!
//!     fn execute(&mut self) -> Result<()> {
//!         if let Some((dates, n)) = self.period.take() {
//!             let mut weights = vec![0.0; n];
//!             weights[0] = 1.0;
//!             self.weights = Some(WeightAssignment::uniform(dates, weights));
//!             self.executed = true;
//!         }
//!         Ok(())
//!     }
//!
//!     fn executed(&self) -> bool {
//!         self.executed
//!     }
//!
//!     fn weights(&self) -> Option<&WeightAssignment> {
//!         self.weights.as_ref()
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! - [`panel`]: price and returns panels, slices, CSV loading
//! - [`window`]: the expanding window generator
//! - [`strategy`]: the `Strategy` trait and built-in variants
//! - [`allocation`]: allocation models and their estimators
//! - [`engine`]: the backtest orchestrator
//! - [`performance`]: enriched return series and cumulative curve
//! - [`config`]: TOML configuration file support

pub mod allocation;
pub mod config;
pub mod engine;
pub mod error;
pub mod panel;
pub mod performance;
pub mod strategy;
pub mod window;

// Re-exports for convenience
pub use allocation::{
    Allocation, BlackLitterman, FactorData, FactorModel, MeanVariance, PortfolioPerformance,
    Posterior,
};
pub use config::BacktestFileConfig;
pub use engine::{BacktestConfig, Backtester, RunSummary, StepOutcome};
pub use error::{BacktestError, Result};
pub use panel::{PanelSlice, PricePanel, ReturnsPanel};
pub use performance::{CumulativePoint, EnrichedReturn, PerformanceAccumulator};
pub use strategy::{
    BlackLittermanStrategy, EqualWeightStrategy, FactorModelStrategy, MeanVarianceStrategy,
    Strategy, WeightAssignment,
};
pub use window::WindowGenerator;
