//! Return and risk estimators shared by the allocation models.
//!
//! All estimators take a returns matrix laid out as one row per period and
//! one column per asset, the shape produced by
//! [`PanelSlice::returns`](crate::panel::PanelSlice::returns).

use crate::allocation::linalg::mat_vec;
use crate::error::{BacktestError, Result};

/// Arithmetic mean return per asset.
pub fn mean_historical_return(returns: &[Vec<f64>]) -> Result<Vec<f64>> {
    if returns.is_empty() {
        return Err(BacktestError::AllocationError(
            "Cannot estimate mean returns from an empty series".to_string(),
        ));
    }
    let n = returns[0].len();
    let t = returns.len() as f64;
    let mut means = vec![0.0; n];
    for row in returns {
        for (m, r) in means.iter_mut().zip(row.iter()) {
            *m += r / t;
        }
    }
    Ok(means)
}

/// Unbiased sample covariance matrix (denominator `T - 1`).
pub fn sample_covariance(returns: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    if returns.len() < 2 {
        return Err(BacktestError::AllocationError(format!(
            "Covariance needs at least 2 observations, have {}",
            returns.len()
        )));
    }
    let means = mean_historical_return(returns)?;
    let n = means.len();
    let t = returns.len() as f64;

    let mut cov = vec![vec![0.0; n]; n];
    for row in returns {
        for i in 0..n {
            let di = row[i] - means[i];
            for j in 0..n {
                cov[i][j] += di * (row[j] - means[j]) / (t - 1.0);
            }
        }
    }
    Ok(cov)
}

/// Ledoit-Wolf shrinkage covariance estimator.
///
/// Shrinks the sample covariance toward a scaled identity target, with the
/// optimal intensity of Ledoit & Wolf (2004), "A well-conditioned estimator
/// for large-dimensional covariance matrices". Keeps short-window estimates
/// invertible where the raw sample covariance frequently is not.
pub fn ledoit_wolf(returns: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    if returns.len() < 2 {
        return Err(BacktestError::AllocationError(format!(
            "Shrinkage covariance needs at least 2 observations, have {}",
            returns.len()
        )));
    }

    let means = mean_historical_return(returns)?;
    let n = means.len();
    let t = returns.len() as f64;

    // Maximum-likelihood sample covariance (denominator T), per the paper.
    let mut sample = vec![vec![0.0; n]; n];
    let demeaned: Vec<Vec<f64>> = returns
        .iter()
        .map(|row| row.iter().zip(means.iter()).map(|(r, m)| r - m).collect())
        .collect();
    for row in &demeaned {
        for i in 0..n {
            for j in 0..n {
                sample[i][j] += row[i] * row[j] / t;
            }
        }
    }

    // Target: mu * I with mu the average variance.
    let mu = (0..n).map(|i| sample[i][i]).sum::<f64>() / n as f64;

    // Dispersion of the sample around the target.
    let mut d2 = 0.0;
    for i in 0..n {
        for j in 0..n {
            let target = if i == j { mu } else { 0.0 };
            d2 += (sample[i][j] - target).powi(2);
        }
    }
    d2 /= n as f64;

    if d2 < 1e-16 {
        // Sample already equals the target; nothing to shrink.
        return Ok(sample);
    }

    // Estimation error of the sample covariance.
    let mut b2_bar = 0.0;
    for row in &demeaned {
        let mut norm = 0.0;
        for i in 0..n {
            for j in 0..n {
                norm += (row[i] * row[j] - sample[i][j]).powi(2);
            }
        }
        b2_bar += norm / n as f64;
    }
    b2_bar /= t * t;
    let b2 = b2_bar.min(d2);

    let shrinkage = b2 / d2;
    let mut shrunk = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            let target = if i == j { mu } else { 0.0 };
            shrunk[i][j] = shrinkage * target + (1.0 - shrinkage) * sample[i][j];
        }
    }
    Ok(shrunk)
}

/// Market-implied risk aversion from a benchmark return series:
/// `delta = (mean - risk_free) / variance`, per period.
pub fn market_implied_risk_aversion(benchmark_returns: &[f64], risk_free_rate: f64) -> Result<f64> {
    if benchmark_returns.len() < 2 {
        return Err(BacktestError::AllocationError(
            "Risk aversion estimate needs at least 2 benchmark returns".to_string(),
        ));
    }
    let t = benchmark_returns.len() as f64;
    let mean = benchmark_returns.iter().sum::<f64>() / t;
    let variance = benchmark_returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / (t - 1.0);

    if variance <= 0.0 {
        return Err(BacktestError::AllocationError(
            "Benchmark variance is zero; cannot imply risk aversion".to_string(),
        ));
    }
    Ok((mean - risk_free_rate) / variance)
}

/// Market-implied equilibrium prior returns: `Pi = delta * Sigma * w_mkt`.
pub fn market_implied_prior_returns(
    market_weights: &[f64],
    risk_aversion: f64,
    covariance: &[Vec<f64>],
) -> Vec<f64> {
    mat_vec(covariance, market_weights)
        .into_iter()
        .map(|v| risk_aversion * v)
        .collect()
}
