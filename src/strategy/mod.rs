//! Strategy capability: mapping a period slice to per-date portfolio weights.
//!
//! The engine is polymorphic over [`Strategy`] and only ever talks to the
//! trait: hand the current slice over with
//! [`set_period_data`](Strategy::set_period_data), call
//! [`execute`](Strategy::execute), then inspect
//! [`executed`](Strategy::executed) and [`weights`](Strategy::weights).
//! An empty slice or a failed allocation leaves the strategy not-executed
//! and the window becomes a no-op; only calling `execute` before
//! `set_period_data` is a hard error.

mod black_litterman;
mod equal_weight;
mod factor_model;
mod mean_variance;

pub use black_litterman::BlackLittermanStrategy;
pub use equal_weight::EqualWeightStrategy;
pub use factor_model::FactorModelStrategy;
pub use mean_variance::MeanVarianceStrategy;

use crate::error::{BacktestError, Result};
use crate::panel::{PanelSlice, PricePanel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default minimum slice length for the model-backed strategies: below this
/// the covariance estimate is too noisy to hand to an optimizer.
pub const DEFAULT_MIN_OBSERVATIONS: usize = 20;

/// Per-date portfolio weights produced by a strategy for one period slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightAssignment {
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl WeightAssignment {
    /// Create an assignment from parallel date and weight-row vectors.
    pub fn new(dates: Vec<NaiveDate>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if dates.len() != rows.len() {
            return Err(BacktestError::InvalidInput(format!(
                "{} dates for {} weight rows",
                dates.len(),
                rows.len()
            )));
        }
        Ok(Self { dates, rows })
    }

    /// Replicate a single weight vector across every date.
    pub fn uniform(dates: Vec<NaiveDate>, weights: Vec<f64>) -> Self {
        let rows = vec![weights; dates.len()];
        Self { dates, rows }
    }

    /// Number of dated rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the assignment has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Dates covered, in order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Weight rows, one per date.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Iterate `(date, weight vector)` pairs in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[f64])> {
        self.dates
            .iter()
            .copied()
            .zip(self.rows.iter().map(|r| r.as_slice()))
    }
}

/// Trait that all allocation strategies implement.
pub trait Strategy: Send + Sync {
    /// Returns the name of the strategy.
    fn name(&self) -> &str;

    /// Store the current period slice. Must be called before
    /// [`execute`](Strategy::execute); resets any previous execution state.
    fn set_period_data(&mut self, slice: PanelSlice<'_>);

    /// Compute weights for the stored slice.
    ///
    /// Leaves [`executed`](Strategy::executed) false on an empty slice or an
    /// allocation failure; errors only if no slice was ever set.
    fn execute(&mut self) -> Result<()>;

    /// Whether the last [`execute`](Strategy::execute) produced weights.
    fn executed(&self) -> bool;

    /// The last computed weight assignment, if any.
    fn weights(&self) -> Option<&WeightAssignment>;
}

/// Shared execution state for the built-in strategies: the stored period
/// slice plus the outcome of the last `execute`.
#[derive(Debug, Default)]
struct PeriodState {
    period: Option<PricePanel>,
    weights: Option<WeightAssignment>,
    executed: bool,
}

impl PeriodState {
    fn set_period(&mut self, slice: PanelSlice<'_>) {
        self.period = Some(slice.to_panel());
        self.weights = None;
        self.executed = false;
    }

    fn executed(&self) -> bool {
        self.executed
    }

    fn weights(&self) -> Option<&WeightAssignment> {
        self.weights.as_ref()
    }

    /// Run one execution: precondition-check the stored slice, skip empty
    /// slices, and convert allocation failures into "not executed".
    fn run<F>(&mut self, name: &str, compute: F) -> Result<()>
    where
        F: FnOnce(&PricePanel) -> Result<WeightAssignment>,
    {
        self.weights = None;
        self.executed = false;

        let outcome = match self.period.as_ref() {
            None => return Err(BacktestError::NoPeriodData),
            Some(panel) if panel.is_empty() => {
                debug!("{}: empty period slice, nothing to execute", name);
                return Ok(());
            }
            Some(panel) => compute(panel),
        };

        match outcome {
            Ok(weights) => {
                self.weights = Some(weights);
                self.executed = true;
                Ok(())
            }
            Err(e) => {
                warn!("{}: allocation failed, skipping window: {}", name, e);
                Ok(())
            }
        }
    }
}
