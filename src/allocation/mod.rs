//! Quantitative allocation models.
//!
//! Models consume an expected-returns vector and a covariance matrix (plus,
//! for Black-Litterman, absolute views with confidences) and produce a single
//! weight vector summing to 1 together with a performance summary. The
//! backtest engine never calls a model directly; strategies do, and translate
//! numerical failures into "no weights for this window".

pub mod black_litterman;
pub mod estimators;
pub mod factor;
pub mod linalg;
pub mod mean_variance;

pub use black_litterman::{BlackLitterman, Posterior};
pub use factor::{FactorData, FactorModel};
pub use mean_variance::MeanVariance;

use serde::{Deserialize, Serialize};

/// Summary statistics of an allocated portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPerformance {
    /// Expected portfolio return per period.
    pub expected_return: f64,
    /// Portfolio volatility (standard deviation) per period.
    pub volatility: f64,
    /// Sharpe-like ratio: excess expected return over volatility.
    pub sharpe_ratio: f64,
}

/// Result of running an allocation model: one weight per asset plus the
/// performance summary at those weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Portfolio weights, one per asset, summing to 1.
    pub weights: Vec<f64>,
    /// Performance at these weights.
    pub performance: PortfolioPerformance,
}
