//! Integration tests for the walk-forward backtest engine.

use chrono::NaiveDate;
use lookback::{
    BacktestConfig, BacktestError, Backtester, BlackLitterman, EqualWeightStrategy,
    MeanVarianceStrategy, PricePanel, StepOutcome, Strategy, WeightAssignment,
};

/// Create a synthetic panel with deterministic drift and wiggle per asset.
fn create_synthetic_panel(rows: usize, assets: usize) -> PricePanel {
    let dates = (0..rows)
        .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64))
        .collect();
    let names = (0..assets).map(|j| format!("ASSET{j}")).collect();
    let prices = (0..rows)
        .map(|i| {
            (0..assets)
                .map(|j| {
                    let t = i as f64;
                    let base = 100.0 * (1.0 + j as f64 * 0.5);
                    base * (1.0 + 0.0005 * (j + 1) as f64).powf(t)
                        + (t * (0.7 + j as f64 * 0.3)).sin()
                })
                .collect()
        })
        .collect();
    PricePanel::new(dates, names, prices).unwrap()
}

/// Scenario: 10 dates x 2 assets, initial period 5, window size 3, equal
/// weights. The first window covers dates 0-4 with [0.5, 0.5] throughout,
/// and every portfolio return is the average of the two assets' returns.
#[test]
fn equal_weight_two_asset_walkthrough() {
    let panel = create_synthetic_panel(10, 2);
    let returns = panel.returns();
    let config = BacktestConfig {
        initial_period: 5,
        window_size: 3,
        initial_capital: 100.0,
    };

    let mut backtester = Backtester::new(panel, config).unwrap();
    backtester.set_strategy(Box::new(EqualWeightStrategy::new()));

    // First window: dates 0-4 -> 4 return rows merged.
    let outcome = backtester.step().unwrap();
    assert_eq!(outcome, StepOutcome::Merged { rows: 4 });

    for row in backtester.enriched_returns() {
        assert_eq!(row.weights, vec![0.5, 0.5]);
        let average = (row.asset_returns[0] + row.asset_returns[1]) / 2.0;
        assert!((row.portfolio_return - average).abs() < 1e-12);
    }

    let summary = backtester.run().unwrap();
    assert_eq!(summary.windows_planned, 4);
    assert_eq!(summary.rows, returns.len());
    assert!(summary.final_growth > 0.0);
}

#[test]
fn cumulative_curve_recurrence_holds_over_a_full_run() {
    let panel = create_synthetic_panel(120, 3);
    let config = BacktestConfig {
        initial_period: 30,
        window_size: 10,
        initial_capital: 100.0,
    };
    let mut backtester = Backtester::new(panel, config).unwrap();
    backtester.set_strategy(Box::new(EqualWeightStrategy::new()));
    backtester.run().unwrap();

    let rows = backtester.enriched_returns();
    let curve = backtester.cumulative_curve();
    assert_eq!(rows.len(), curve.len());
    assert!(rows.len() <= backtester.returns().len());

    assert!((curve[0].growth - (1.0 + rows[0].portfolio_return)).abs() < 1e-12);
    for i in 1..curve.len() {
        let expected = curve[i - 1].growth * (1.0 + rows[i].portfolio_return);
        assert!(
            (curve[i].growth - expected).abs() < 1e-12,
            "recurrence broken at {i}"
        );
    }
}

/// Re-running the identical configuration reproduces identical output.
#[test]
fn reruns_are_idempotent() {
    let run = || {
        let panel = create_synthetic_panel(90, 4);
        let config = BacktestConfig {
            initial_period: 40,
            window_size: 7,
            initial_capital: 100.0,
        };
        let mut backtester = Backtester::new(panel, config).unwrap();
        backtester
            .set_strategy(Box::new(MeanVarianceStrategy::new(0.0, 0.2)));
        backtester.run().unwrap();
        (
            backtester.enriched_returns().to_vec(),
            backtester.cumulative_curve().to_vec(),
        )
    };

    let (rows_a, curve_a) = run();
    let (rows_b, curve_b) = run();
    assert_eq!(rows_a, rows_b);
    assert_eq!(curve_a, curve_b);
}

/// A strategy whose model never produces weights: every window must be
/// skipped and the accumulator must stay empty, without the run failing.
struct NeverExecutes {
    period_set: bool,
}

impl Strategy for NeverExecutes {
    fn name(&self) -> &str {
        "Never Executes"
    }

    fn set_period_data(&mut self, _slice: lookback::PanelSlice<'_>) {
        self.period_set = true;
    }

    fn execute(&mut self) -> lookback::Result<()> {
        if !self.period_set {
            return Err(BacktestError::NoPeriodData);
        }
        Ok(())
    }

    fn executed(&self) -> bool {
        false
    }

    fn weights(&self) -> Option<&WeightAssignment> {
        None
    }
}

#[test]
fn failed_allocations_skip_windows_but_keep_running() {
    let panel = create_synthetic_panel(30, 2);
    let config = BacktestConfig {
        initial_period: 10,
        window_size: 10,
        initial_capital: 100.0,
    };
    let mut backtester = Backtester::new(panel, config).unwrap();
    backtester.set_strategy(Box::new(NeverExecutes { period_set: false }));

    let summary = backtester.run().unwrap();
    assert_eq!(summary.windows_executed, 0);
    assert_eq!(summary.windows_skipped, 3);
    assert_eq!(summary.rows, 0);
    assert!((summary.final_growth - 1.0).abs() < 1e-12);
    assert!((summary.final_capital - 100.0).abs() < 1e-12);
}

/// A mean-variance strategy that never has enough observations behaves like
/// an allocation failure on every window: skipped, not fatal.
#[test]
fn insufficient_data_windows_are_skipped() {
    let panel = create_synthetic_panel(12, 2);
    let config = BacktestConfig {
        initial_period: 4,
        window_size: 4,
        initial_capital: 100.0,
    };
    let mut backtester = Backtester::new(panel, config).unwrap();
    backtester.set_strategy(Box::new(
        MeanVarianceStrategy::new(0.0, 0.1).with_min_observations(1000),
    ));

    let summary = backtester.run().unwrap();
    assert_eq!(summary.windows_executed, 0);
    assert_eq!(summary.rows, 0);
}

#[test]
fn saturated_windows_do_not_grow_the_series() {
    let panel = create_synthetic_panel(10, 2);
    let config = BacktestConfig {
        initial_period: 5,
        window_size: 3,
        initial_capital: 100.0,
    };
    let mut backtester = Backtester::new(panel, config).unwrap();
    backtester.set_strategy(Box::new(EqualWeightStrategy::new()));
    backtester.run().unwrap();
    let rows_after_run = backtester.enriched_returns().len();
    let growth_after_run = backtester.accumulator().final_growth();

    // Extra steps past the schedule re-merge the full panel, changing
    // nothing.
    backtester.step().unwrap();
    backtester.step().unwrap();
    assert_eq!(backtester.enriched_returns().len(), rows_after_run);
    assert!((backtester.accumulator().final_growth() - growth_after_run).abs() < 1e-15);
}

#[test]
fn mean_variance_run_produces_unit_weights() {
    let panel = create_synthetic_panel(100, 3);
    let config = BacktestConfig {
        initial_period: 50,
        window_size: 25,
        initial_capital: 100.0,
    };
    let mut backtester = Backtester::new(panel, config).unwrap();
    backtester.set_strategy(Box::new(MeanVarianceStrategy::new(0.0, 0.3)));

    let summary = backtester.run().unwrap();
    assert!(summary.windows_executed > 0);
    for row in backtester.enriched_returns() {
        let total: f64 = row.weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(row.weights.iter().all(|&w| w >= -1e-9));
    }
}

/// Black-Litterman with zero views must reproduce the market prior exactly;
/// mismatched views must be rejected before any computation.
#[test]
fn black_litterman_prior_and_precondition_scenarios() {
    let assets = vec!["AAA".to_string(), "BBB".to_string()];
    let covariance = vec![vec![0.04, 0.006], vec![0.006, 0.02]];

    let no_views = BlackLitterman::new(
        assets.clone(),
        vec![2.0e12, 1.0e12],
        covariance.clone(),
        0.05,
        2.5,
        0.0,
        vec![],
        vec![],
    )
    .unwrap();
    let posterior = no_views.posterior().unwrap();
    assert_eq!(posterior.returns, no_views.prior_returns());

    let mismatch = BlackLitterman::new(
        assets,
        vec![2.0e12, 1.0e12],
        covariance,
        0.05,
        2.5,
        0.0,
        vec![("AAA".to_string(), 0.02), ("BBB".to_string(), 0.01)],
        vec![0.5],
    );
    assert!(matches!(
        mismatch,
        Err(BacktestError::ViewConfidenceMismatch { .. })
    ));
}

#[test]
fn config_file_drives_a_full_run() {
    use lookback::BacktestFileConfig;

    let toml_str = r#"
        [backtest]
        initial_period = 20
        window_size = 10
        initial_capital = 100.0

        [strategy]
        name = "equal-weight"
    "#;
    let file_config: BacktestFileConfig = toml::from_str(toml_str).unwrap();

    let panel = create_synthetic_panel(60, 2);
    let mut backtester =
        Backtester::new(panel, file_config.to_backtest_config()).unwrap();
    backtester.set_strategy(file_config.build_strategy().unwrap());

    let summary = backtester.run().unwrap();
    assert_eq!(summary.strategy_name, "Equal Weight");
    assert_eq!(summary.windows_planned, 6);
    assert_eq!(summary.rows, 59);
}

#[test]
fn exported_series_round_trips_as_json() {
    let panel = create_synthetic_panel(30, 2);
    let config = BacktestConfig {
        initial_period: 15,
        window_size: 15,
        initial_capital: 100.0,
    };
    let mut backtester = Backtester::new(panel, config).unwrap();
    backtester.set_strategy(Box::new(EqualWeightStrategy::new()));
    backtester.run().unwrap();

    let json = backtester.accumulator().to_json().unwrap();
    let parsed: Vec<lookback::EnrichedReturn> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), backtester.enriched_returns().len());
    assert_eq!(parsed[0], backtester.enriched_returns()[0]);
}
