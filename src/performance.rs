//! Accumulation of realized portfolio performance.
//!
//! The accumulator owns the enriched return series (date, weights, realized
//! asset returns, portfolio return) and the cumulative return curve derived
//! from it. Rows only ever append or get rebuilt to identical values;
//! nothing is deleted during a run, so a partial run is always a valid
//! result.

use crate::allocation::linalg;
use crate::error::{BacktestError, Result};
use crate::panel::ReturnsPanel;
use crate::strategy::WeightAssignment;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io;

/// One merged row: a date's weight vector paired with its realized returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedReturn {
    /// Date of the realized returns.
    pub date: NaiveDate,
    /// Portfolio weights applied on this date.
    pub weights: Vec<f64>,
    /// Realized per-asset returns on this date.
    pub asset_returns: Vec<f64>,
    /// `dot(weights, asset_returns)`.
    pub portfolio_return: f64,
}

/// One point of the cumulative return curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CumulativePoint {
    /// Date of the observation.
    pub date: NaiveDate,
    /// Running product of `1 + portfolio_return` up to this date.
    pub growth: f64,
    /// Growth scaled by the initial capital basis.
    pub capital: f64,
}

/// Running enriched return series plus its cumulative curve.
#[derive(Debug, Clone)]
pub struct PerformanceAccumulator {
    initial_capital: f64,
    rows: Vec<EnrichedReturn>,
    curve: Vec<CumulativePoint>,
}

impl PerformanceAccumulator {
    /// Create an empty accumulator with the given capital basis.
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            rows: Vec::new(),
            curve: Vec::new(),
        }
    }

    /// Merge a weight assignment with the realized returns panel.
    ///
    /// Each assignment date is paired with that date's return row; dates
    /// with no return row (the panel's first date) are skipped. Expanding
    /// windows re-cover earlier dates, so previously accumulated rows from
    /// the first merged date onward are rebuilt; identical inputs rebuild
    /// identical rows. The cumulative curve is recomputed over the full
    /// series after every merge.
    ///
    /// Returns the number of rows in the merged series contributed by this
    /// assignment.
    pub fn merge(
        &mut self,
        assignment: &WeightAssignment,
        returns: &ReturnsPanel,
    ) -> Result<usize> {
        let mut merged = Vec::new();
        for (date, weights) in assignment.iter() {
            let Some(asset_returns) = returns.row_for_date(date) else {
                continue;
            };
            if weights.len() != asset_returns.len() {
                return Err(BacktestError::InvalidInput(format!(
                    "Weight vector has {} entries for {} assets",
                    weights.len(),
                    asset_returns.len()
                )));
            }
            let portfolio_return = linalg::dot(weights, asset_returns);
            merged.push(EnrichedReturn {
                date,
                weights: weights.to_vec(),
                asset_returns: asset_returns.to_vec(),
                portfolio_return,
            });
        }

        let Some(first) = merged.first() else {
            return Ok(0);
        };

        let cut = self
            .rows
            .iter()
            .position(|row| row.date >= first.date)
            .unwrap_or(self.rows.len());
        self.rows.truncate(cut);
        let count = merged.len();
        self.rows.extend(merged);
        self.rebuild_curve();
        Ok(count)
    }

    fn rebuild_curve(&mut self) {
        self.curve.clear();
        let mut growth = 1.0;
        for row in &self.rows {
            growth *= 1.0 + row.portfolio_return;
            self.curve.push(CumulativePoint {
                date: row.date,
                growth,
                capital: self.initial_capital * growth,
            });
        }
    }

    /// The enriched return series accumulated so far.
    pub fn rows(&self) -> &[EnrichedReturn] {
        &self.rows
    }

    /// The cumulative return curve.
    pub fn curve(&self) -> &[CumulativePoint] {
        &self.curve
    }

    /// Number of accumulated rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing has been accumulated yet.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The capital basis the curve is scaled by.
    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Final cumulative growth factor (1.0 when nothing accumulated).
    pub fn final_growth(&self) -> f64 {
        self.curve.last().map(|p| p.growth).unwrap_or(1.0)
    }

    /// Final capital at the configured basis.
    pub fn final_capital(&self) -> f64 {
        self.curve
            .last()
            .map(|p| p.capital)
            .unwrap_or(self.initial_capital)
    }

    /// Serialize the enriched return series as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rows)?)
    }

    /// Write the series and curve as CSV: one row per date.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["date", "portfolio_return", "growth", "capital"])?;
        for (row, point) in self.rows.iter().zip(self.curve.iter()) {
            csv_writer.write_record([
                row.date.to_string(),
                row.portfolio_return.to_string(),
                point.growth.to_string(),
                point.capital.to_string(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
