//! Walk-forward backtest demo: equal weight vs mean-variance on a
//! synthetic three-asset panel.
//!
//! Run with: cargo run --example walkforward

use chrono::NaiveDate;
use lookback::{
    BacktestConfig, Backtester, EqualWeightStrategy, MeanVarianceStrategy, PricePanel, Strategy,
};

fn synthetic_panel(rows: usize) -> PricePanel {
    let dates = (0..rows)
        .map(|i| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(i as u64))
        .collect();
    let assets = vec![
        "GROWTH".to_string(),
        "VALUE".to_string(),
        "BONDS".to_string(),
    ];
    let prices = (0..rows)
        .map(|i| {
            let t = i as f64;
            vec![
                100.0 * 1.0008_f64.powf(t) + (t * 0.9).sin() * 3.0,
                80.0 * 1.0004_f64.powf(t) + (t * 1.7).cos() * 1.5,
                50.0 * 1.0001_f64.powf(t) + (t * 0.3).sin() * 0.2,
            ]
        })
        .collect();
    PricePanel::new(dates, assets, prices).expect("synthetic panel is valid")
}

fn run(strategy: Box<dyn Strategy>, panel: PricePanel) {
    let config = BacktestConfig {
        initial_period: 126,
        window_size: 21,
        initial_capital: 100.0,
    };
    let mut backtester = Backtester::new(panel, config).expect("valid configuration");
    backtester.set_strategy(strategy);

    let summary = backtester.run().expect("backtest runs");
    println!(
        "{:<16} windows {:>2}/{:<2}  rows {:>4}  growth {:>7.4}x  capital {:>8.2}",
        summary.strategy_name,
        summary.windows_executed,
        summary.windows_planned,
        summary.rows,
        summary.final_growth,
        summary.final_capital,
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let panel = synthetic_panel(504);
    run(Box::new(EqualWeightStrategy::new()), panel.clone());
    run(
        Box::new(MeanVarianceStrategy::new(0.0, 0.2)),
        panel,
    );
}
