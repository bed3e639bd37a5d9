//! Price and returns panels: the rectangular data the engine walks over.
//!
//! A [`PricePanel`] is an ordered sequence of dates crossed with a fixed set
//! of assets. It is supplied once, validated on construction, and never
//! mutated afterwards. Derived data (the [`ReturnsPanel`]) and borrowed
//! prefixes ([`PanelSlice`]) are the only other shapes the engine deals in.

use crate::error::{BacktestError, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Immutable rectangular panel of prices: dates x assets.
///
/// Invariants enforced on construction:
/// - at least one asset column,
/// - every row has exactly one price per asset,
/// - dates strictly increasing,
/// - all prices finite and positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePanel {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl PricePanel {
    /// Create a panel, validating the rectangular-data invariants.
    pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if assets.is_empty() {
            return Err(BacktestError::DataError(
                "Panel must have at least one asset".to_string(),
            ));
        }
        if dates.len() != rows.len() {
            return Err(BacktestError::DataError(format!(
                "Panel has {} dates but {} price rows",
                dates.len(),
                rows.len()
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != assets.len() {
                return Err(BacktestError::DataError(format!(
                    "Row {} has {} prices for {} assets",
                    i,
                    row.len(),
                    assets.len()
                )));
            }
            if let Some(price) = row.iter().find(|p| !p.is_finite() || **p <= 0.0) {
                return Err(BacktestError::DataError(format!(
                    "Row {} contains a non-positive or non-finite price: {}",
                    i, price
                )));
            }
        }
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(BacktestError::DataError(format!(
                "Dates must be strictly increasing: {} followed by {}",
                w[0], w[1]
            )));
        }

        Ok(Self {
            dates,
            assets,
            rows,
        })
    }

    /// Load a panel from a CSV file with a `date,ASSET,...` header.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading price panel from: {}", path.display());

        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

        let headers = reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(BacktestError::DataError(
                "Panel CSV needs a date column and at least one asset column".to_string(),
            ));
        }
        let assets: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

        let mut dates = Vec::new();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let date = NaiveDate::parse_from_str(record.get(0).unwrap_or("").trim(), "%Y-%m-%d")?;
            let row = record
                .iter()
                .skip(1)
                .map(|field| {
                    field.trim().parse::<f64>().map_err(|e| {
                        BacktestError::DataError(format!("Bad price for {}: {}", date, e))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            dates.push(date);
            rows.push(row);
        }

        Self::new(dates, assets, rows)
    }

    /// Number of date rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Asset identifiers, in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Dates, in row order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Price rows, one per date.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Borrow the prefix `[0, end)` as a slice; `end` is clamped to the
    /// panel length, so an over-long request yields the full panel.
    pub fn prefix(&self, end: usize) -> PanelSlice<'_> {
        let end = end.min(self.rows.len());
        PanelSlice {
            dates: &self.dates[..end],
            assets: &self.assets,
            rows: &self.rows[..end],
        }
    }

    /// Borrow the whole panel as a slice.
    pub fn as_slice(&self) -> PanelSlice<'_> {
        self.prefix(self.len())
    }

    /// Derive the period-over-period percentage-change panel.
    ///
    /// The first price row has no predecessor and is consumed, so
    /// `returns.len() == prices.len() - 1`.
    pub fn returns(&self) -> ReturnsPanel {
        self.as_slice().returns()
    }
}

/// Borrowed contiguous prefix of a [`PricePanel`].
///
/// Cheap to copy; owned by the window generator and handed to the strategy
/// for the duration of one step.
#[derive(Debug, Clone, Copy)]
pub struct PanelSlice<'a> {
    dates: &'a [NaiveDate],
    assets: &'a [String],
    rows: &'a [Vec<f64>],
}

impl<'a> PanelSlice<'a> {
    /// Number of date rows in the slice.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the slice has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Asset identifiers.
    pub fn assets(&self) -> &'a [String] {
        self.assets
    }

    /// Dates covered by the slice.
    pub fn dates(&self) -> &'a [NaiveDate] {
        self.dates
    }

    /// Price rows covered by the slice.
    pub fn rows(&self) -> &'a [Vec<f64>] {
        self.rows
    }

    /// First date of the slice, if any.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// Last date of the slice, if any.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Copy the slice into an owned panel.
    ///
    /// Validation is skipped: a slice of a valid panel is valid.
    pub fn to_panel(&self) -> PricePanel {
        PricePanel {
            dates: self.dates.to_vec(),
            assets: self.assets.to_vec(),
            rows: self.rows.to_vec(),
        }
    }

    /// Percentage-change returns over the slice.
    pub fn returns(&self) -> ReturnsPanel {
        let dates = self.dates.iter().skip(1).copied().collect();
        let rows = self
            .rows
            .windows(2)
            .map(|w| {
                w[0].iter()
                    .zip(w[1].iter())
                    .map(|(prev, curr)| curr / prev - 1.0)
                    .collect()
            })
            .collect();
        ReturnsPanel {
            dates,
            assets: self.assets.to_vec(),
            rows,
        }
    }

    /// Natural-log returns over the slice, one row per date after the first.
    ///
    /// Used by the factor regression, which fits on log returns.
    pub fn log_returns(&self) -> Vec<Vec<f64>> {
        self.rows
            .windows(2)
            .map(|w| {
                w[0].iter()
                    .zip(w[1].iter())
                    .map(|(prev, curr)| (curr / prev).ln())
                    .collect()
            })
            .collect()
    }
}

/// Realized per-asset returns, derived from a [`PricePanel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsPanel {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl ReturnsPanel {
    /// Number of return rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Asset identifiers.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Dates, in row order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return rows, one per date.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Look up the return row for a date. Dates are sorted, so this is a
    /// binary search. The panel's first price date has no return row.
    pub fn row_for_date(&self, date: NaiveDate) -> Option<&[f64]> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.rows[i].as_slice())
    }
}
