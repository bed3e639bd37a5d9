//! Configuration file support for backtests.
//!
//! Allows loading backtest configurations from TOML files for
//! reproducibility.

use crate::engine::BacktestConfig;
use crate::error::{BacktestError, Result};
use crate::panel::PricePanel;
use crate::strategy::{
    BlackLittermanStrategy, EqualWeightStrategy, MeanVarianceStrategy, Strategy,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Complete backtest configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestFileConfig {
    /// General backtest settings.
    #[serde(default)]
    pub backtest: BacktestSettings,
    /// Data settings.
    #[serde(default)]
    pub data: DataSettings,
    /// Strategy settings.
    #[serde(default)]
    pub strategy: StrategySettings,
}

/// General backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Row count of the first window.
    #[serde(default = "default_initial_period")]
    pub initial_period: usize,
    /// Row increment per subsequent window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Capital basis of the cumulative curve.
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
}

fn default_initial_period() -> usize { 252 }
fn default_window_size() -> usize { 21 }
fn default_capital() -> f64 { 100.0 }

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_period: 252,
            window_size: 21,
            initial_capital: 100.0,
        }
    }
}

/// Data settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSettings {
    /// Path to the price panel CSV.
    pub path: Option<String>,
}

/// Strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySettings {
    /// Strategy type: "equal-weight", "mean-variance" or "black-litterman".
    #[serde(default = "default_strategy")]
    pub name: String,
    /// Strategy parameters.
    #[serde(default)]
    pub params: StrategyParams,
}

fn default_strategy() -> String { "equal-weight".to_string() }

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            name: "equal-weight".to_string(),
            params: StrategyParams::default(),
        }
    }
}

/// Strategy parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Per-period risk-free rate.
    #[serde(default)]
    pub risk_free_rate: f64,
    /// L2 regularization strength.
    #[serde(default)]
    pub l2_gamma: f64,
    /// Minimum slice length before the model-backed strategies optimize.
    pub min_observations: Option<usize>,
    /// Prior uncertainty scaling for Black-Litterman.
    pub tau: Option<f64>,
    /// Market capitalization per asset (Black-Litterman).
    #[serde(default)]
    pub market_caps: BTreeMap<String, f64>,
    /// Benchmark return series for the implied risk aversion
    /// (Black-Litterman).
    #[serde(default)]
    pub benchmark_returns: Vec<f64>,
    /// Assets the views refer to, paired positionally with `view_returns`
    /// and `view_confidences`.
    #[serde(default)]
    pub view_assets: Vec<String>,
    /// Believed per-period returns, one per view.
    #[serde(default)]
    pub view_returns: Vec<f64>,
    /// Confidence in (0, 1] per view.
    #[serde(default)]
    pub view_confidences: Vec<f64>,
}

impl BacktestFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: BacktestFileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BacktestError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert to the engine's [`BacktestConfig`].
    pub fn to_backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            initial_period: self.backtest.initial_period,
            window_size: self.backtest.window_size,
            initial_capital: self.backtest.initial_capital,
        }
    }

    /// Load the price panel named by `[data] path`.
    pub fn load_panel(&self) -> Result<PricePanel> {
        let path = self.data.path.as_ref().ok_or_else(|| {
            BacktestError::ConfigError("No data path configured".to_string())
        })?;
        PricePanel::load_csv(path)
    }

    /// Build the configured strategy.
    ///
    /// The factor-model strategy needs a factor panel and is constructed in
    /// code rather than from a file.
    pub fn build_strategy(&self) -> Result<Box<dyn Strategy>> {
        let params = &self.strategy.params;
        match self.strategy.name.to_lowercase().as_str() {
            "equal-weight" => Ok(Box::new(EqualWeightStrategy::new())),
            "mean-variance" => {
                let mut strategy =
                    MeanVarianceStrategy::new(params.risk_free_rate, params.l2_gamma);
                if let Some(min_obs) = params.min_observations {
                    strategy = strategy.with_min_observations(min_obs);
                }
                Ok(Box::new(strategy))
            }
            "black-litterman" => {
                if params.view_assets.len() != params.view_returns.len() {
                    return Err(BacktestError::ConfigError(format!(
                        "{} view assets for {} view returns",
                        params.view_assets.len(),
                        params.view_returns.len()
                    )));
                }
                let views: Vec<(String, f64)> = params
                    .view_assets
                    .iter()
                    .cloned()
                    .zip(params.view_returns.iter().copied())
                    .collect();

                let mut strategy = BlackLittermanStrategy::new(
                    params.market_caps.clone(),
                    params.benchmark_returns.clone(),
                    views,
                    params.view_confidences.clone(),
                )?
                .with_risk_free_rate(params.risk_free_rate)
                .with_l2_gamma(params.l2_gamma);
                if let Some(tau) = params.tau {
                    strategy = strategy.with_tau(tau);
                }
                if let Some(min_obs) = params.min_observations {
                    strategy = strategy.with_min_observations(min_obs);
                }
                Ok(Box::new(strategy))
            }
            "factor-model" => Err(BacktestError::ConfigError(
                "The factor-model strategy needs a factor panel; construct it with \
                 FactorModelStrategy::new instead of a config file"
                    .to_string(),
            )),
            other => Err(BacktestError::ConfigError(format!(
                "Unknown strategy: {}",
                other
            ))),
        }
    }
}
