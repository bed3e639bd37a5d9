//! Constant equal-weight reference strategy.

use crate::error::Result;
use crate::panel::PanelSlice;
use crate::strategy::{PeriodState, Strategy, WeightAssignment};
use tracing::debug;

/// Assigns `1/n` to each of the `n` assets, replicated for every date in the
/// period slice. Always succeeds on a non-empty slice.
#[derive(Debug, Default)]
pub struct EqualWeightStrategy {
    state: PeriodState,
}

impl EqualWeightStrategy {
    /// Create the strategy.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for EqualWeightStrategy {
    fn name(&self) -> &str {
        "Equal Weight"
    }

    fn set_period_data(&mut self, slice: PanelSlice<'_>) {
        self.state.set_period(slice);
    }

    fn execute(&mut self) -> Result<()> {
        self.state.run("Equal Weight", |panel| {
            debug!(
                rows = panel.len(),
                assets = panel.n_assets(),
                "computing equal weights"
            );
            let n = panel.n_assets();
            let weights = vec![1.0 / n as f64; n];
            Ok(WeightAssignment::uniform(panel.dates().to_vec(), weights))
        })
    }

    fn executed(&self) -> bool {
        self.state.executed()
    }

    fn weights(&self) -> Option<&WeightAssignment> {
        self.state.weights()
    }
}
