//! Expanding-window generation for walk-forward backtests.
//!
//! The generator owns the price panel and walks it as a sequence of growing
//! prefixes: the first slice covers `initial_period` rows, each subsequent
//! slice `window_size` more. The sequence never terminates on its own; once
//! the cursor passes the end of the panel every further slice is simply the
//! full panel. Callers bound the walk with [`WindowGenerator::has_more`] or
//! [`WindowGenerator::planned_windows`].

use crate::error::{BacktestError, Result};
use crate::panel::{PanelSlice, PricePanel};

/// Stateful iterator over expanding prefixes of a price panel.
#[derive(Debug)]
pub struct WindowGenerator {
    panel: PricePanel,
    window_size: usize,
    /// Exclusive upper bound of the next slice.
    window_selection: usize,
    /// Number of slices emitted so far.
    iteration_count: usize,
    /// Length of the most recently emitted slice.
    emitted: usize,
}

impl WindowGenerator {
    /// Create a generator over `panel`.
    ///
    /// `initial_period` is the row count of the first window and
    /// `window_size` the increment per subsequent window; both must be
    /// positive and `initial_period` must not exceed the panel length.
    pub fn new(panel: PricePanel, initial_period: usize, window_size: usize) -> Result<Self> {
        if initial_period == 0 || window_size == 0 {
            return Err(BacktestError::InvalidInput(
                "initial_period and window_size must be positive".to_string(),
            ));
        }
        if initial_period > panel.len() {
            return Err(BacktestError::InvalidInput(format!(
                "initial_period {} exceeds panel length {}",
                initial_period,
                panel.len()
            )));
        }

        Ok(Self {
            panel,
            window_size,
            window_selection: initial_period,
            iteration_count: 0,
            emitted: 0,
        })
    }

    /// Emit the next slice and advance the cursor.
    ///
    /// Never returns `None` today: past the end of the panel the slice
    /// saturates to the full panel instead of failing. Use [`has_more`] to
    /// decide when to stop pulling; a saturated pull contains no rows that
    /// the previous pull did not.
    ///
    /// [`has_more`]: WindowGenerator::has_more
    pub fn next_slice(&mut self) -> Option<PanelSlice<'_>> {
        let end = self.window_selection.min(self.panel.len());
        self.window_selection += self.window_size;
        self.iteration_count += 1;
        self.emitted = end;
        Some(self.panel.prefix(end))
    }

    /// Whether the next slice would contain rows not yet emitted.
    pub fn has_more(&self) -> bool {
        self.emitted < self.panel.len()
    }

    /// Number of slices emitted so far.
    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    /// The panel being walked.
    pub fn panel(&self) -> &PricePanel {
        &self.panel
    }

    /// Upper bound on the number of windows a full run can need:
    /// `ceil(total_rows / window_size)`.
    pub fn planned_windows(total_rows: usize, window_size: usize) -> usize {
        total_rows.div_ceil(window_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn panel(rows: usize) -> PricePanel {
        let dates = (0..rows)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64))
            .collect();
        let prices = (0..rows).map(|i| vec![100.0 + i as f64]).collect();
        PricePanel::new(dates, vec!["AAA".to_string()], prices).unwrap()
    }

    #[test]
    fn slices_grow_by_window_size() {
        let mut generator = WindowGenerator::new(panel(10), 5, 3).unwrap();
        assert_eq!(generator.next_slice().unwrap().len(), 5);
        assert_eq!(generator.next_slice().unwrap().len(), 8);
        assert_eq!(generator.next_slice().unwrap().len(), 10);
        assert_eq!(generator.iteration_count(), 3);
    }

    #[test]
    fn saturates_instead_of_failing() {
        let mut generator = WindowGenerator::new(panel(10), 5, 3).unwrap();
        for _ in 0..3 {
            generator.next_slice();
        }
        // Past the end: full panel again, no new rows.
        let slice = generator.next_slice().unwrap();
        assert_eq!(slice.len(), 10);
        assert!(!generator.has_more());
    }

    #[test]
    fn has_more_tracks_saturation() {
        let mut generator = WindowGenerator::new(panel(10), 5, 3).unwrap();
        assert!(generator.has_more());
        generator.next_slice();
        assert!(generator.has_more());
        generator.next_slice();
        assert!(generator.has_more());
        generator.next_slice();
        assert!(!generator.has_more());
    }

    #[test]
    fn kth_slice_length_formula() {
        let total = 23;
        let (initial, step) = (7, 4);
        let mut generator = WindowGenerator::new(panel(total), initial, step).unwrap();
        for k in 1..=8 {
            let expected = (initial + (k - 1) * step).min(total);
            assert_eq!(generator.next_slice().unwrap().len(), expected);
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(WindowGenerator::new(panel(10), 0, 3).is_err());
        assert!(WindowGenerator::new(panel(10), 5, 0).is_err());
        assert!(WindowGenerator::new(panel(10), 11, 3).is_err());
    }

    #[test]
    fn planned_window_count() {
        assert_eq!(WindowGenerator::planned_windows(10, 3), 4);
        assert_eq!(WindowGenerator::planned_windows(9, 3), 3);
        assert_eq!(WindowGenerator::planned_windows(1, 3), 1);
    }
}
