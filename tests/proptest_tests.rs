//! Property-based tests using proptest for invariant testing.
//!
//! These tests verify that:
//! 1. Equal-weight assignments always sum to 1 with one entry per asset
//! 2. Window slice lengths follow the deterministic growth formula
//! 3. The cumulative curve always satisfies its compounding recurrence
//! 4. The enriched series never outgrows the returns panel

use chrono::NaiveDate;
use lookback::{
    BacktestConfig, Backtester, EqualWeightStrategy, PricePanel, Strategy, WindowGenerator,
};
use proptest::prelude::*;
use proptest::strategy::Strategy as PropStrategy;

/// Strategy generating a panel shape: (rows, assets, initial_period,
/// window_size) with a valid initial period.
fn panel_shape() -> impl proptest::strategy::Strategy<Value = (usize, usize, usize, usize)> {
    (2usize..80, 1usize..6).prop_flat_map(|(rows, assets)| {
        (
            Just(rows),
            Just(assets),
            1usize..=rows,
            1usize..20,
        )
    })
}

/// Deterministic positive price for a given cell.
fn price_at(row: usize, asset: usize) -> f64 {
    let t = row as f64;
    let base = 50.0 * (asset + 1) as f64;
    base + t * 0.3 + ((t + asset as f64) * 0.9).sin()
}

fn build_panel(rows: usize, assets: usize) -> PricePanel {
    let dates = (0..rows)
        .map(|i| NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Days::new(i as u64))
        .collect();
    let names = (0..assets).map(|j| format!("A{j}")).collect();
    let prices = (0..rows)
        .map(|i| (0..assets).map(|j| price_at(i, j)).collect())
        .collect();
    PricePanel::new(dates, names, prices).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn equal_weights_sum_to_one((rows, assets, initial, _) in panel_shape()) {
        let panel = build_panel(rows, assets);
        let mut strategy = EqualWeightStrategy::new();
        strategy.set_period_data(panel.prefix(initial));
        strategy.execute().unwrap();

        prop_assert!(strategy.executed());
        let assignment = strategy.weights().unwrap();
        prop_assert_eq!(assignment.len(), initial);
        for (_, row) in assignment.iter() {
            prop_assert_eq!(row.len(), assets);
            let total: f64 = row.iter().sum();
            prop_assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn window_lengths_follow_the_formula((rows, assets, initial, step) in panel_shape()) {
        let panel = build_panel(rows, assets);
        let mut generator = WindowGenerator::new(panel, initial, step).unwrap();

        for k in 1..=(rows / step + 3) {
            let expected = (initial + (k - 1) * step).min(rows);
            let slice = generator.next_slice().unwrap();
            prop_assert_eq!(slice.len(), expected, "window {}", k);
        }
    }

    #[test]
    fn has_more_is_false_exactly_once_saturated((rows, assets, initial, step) in panel_shape()) {
        let panel = build_panel(rows, assets);
        let mut generator = WindowGenerator::new(panel, initial, step).unwrap();

        while generator.has_more() {
            generator.next_slice();
            prop_assert!(generator.iteration_count() <= rows + 1, "generator failed to saturate");
        }
        // Once saturated, further slices cover the whole panel.
        prop_assert_eq!(generator.next_slice().unwrap().len(), rows);
        prop_assert!(!generator.has_more());
    }

    #[test]
    fn full_runs_respect_accounting_invariants((rows, assets, initial, step) in panel_shape()) {
        let panel = build_panel(rows, assets);
        let returns_len = panel.returns().len();
        let config = BacktestConfig {
            initial_period: initial,
            window_size: step,
            initial_capital: 100.0,
        };

        let mut backtester = Backtester::new(panel, config).unwrap();
        backtester.set_strategy(Box::new(EqualWeightStrategy::new()));
        let summary = backtester.run().unwrap();

        let series = backtester.enriched_returns();
        let curve = backtester.cumulative_curve();

        prop_assert!(series.len() <= returns_len);
        prop_assert_eq!(series.len(), curve.len());
        prop_assert_eq!(summary.windows_executed + summary.windows_skipped,
            summary.windows_planned);

        if !curve.is_empty() {
            prop_assert!((curve[0].growth - (1.0 + series[0].portfolio_return)).abs() < 1e-12);
            for i in 1..curve.len() {
                let expected = curve[i - 1].growth * (1.0 + series[i].portfolio_return);
                prop_assert!((curve[i].growth - expected).abs() < 1e-12);
            }
        }

        // Dates in the series are strictly increasing and unique.
        for pair in series.windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
        }
    }
}
