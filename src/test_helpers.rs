use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;

use crate::analysis::MarketContext;
use crate::config::Config;
use crate::core::fusion::FusionPolicy;
use crate::models::{Bar, BarSeries, Timeframe, Trend};

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: base_time() + Duration::minutes(15 * i as i64),
        open,
        high,
        low,
        close,
        volume: 100.0,
    }
}

/// Monday 2024-01-15 12:00 UTC, inside the trading window.
pub fn monday_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// Bars from (open, high, low, close) tuples, 15 minutes apart.
pub fn make_bars(data: &[(f64, f64, f64, f64)]) -> BarSeries {
    BarSeries::new(
        data.iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| bar(i, o, h, l, c))
            .collect(),
    )
}

/// n rising bars starting from `start` price.
pub fn make_bullish_trend(n: usize, start: f64) -> BarSeries {
    BarSeries::new(
        (0..n)
            .map(|i| {
                let open = start + i as f64 * 10.0;
                let close = open + 8.0;
                bar(i, open, close + 2.0, open - 1.0, close)
            })
            .collect(),
    )
}

/// n falling bars starting from `start` price.
pub fn make_bearish_trend(n: usize, start: f64) -> BarSeries {
    BarSeries::new(
        (0..n)
            .map(|i| {
                let open = start - i as f64 * 10.0;
                let close = open - 8.0;
                bar(i, open, open + 1.0, close - 2.0, close)
            })
            .collect(),
    )
}

/// n identical bars: open = close = price, one unit of range either side.
pub fn make_flat(n: usize, price: f64) -> BarSeries {
    BarSeries::new(
        (0..n)
            .map(|i| bar(i, price, price + 1.0, price - 1.0, price))
            .collect(),
    )
}

/// n bars swinging around `base` with roughly `amplitude` of movement.
pub fn make_oscillating(n: usize, base: f64, amplitude: f64) -> BarSeries {
    let mut prev_close = base;
    BarSeries::new(
        (0..n)
            .map(|i| {
                let t = i as f64;
                let close = base + amplitude * (t * 0.37).sin() + amplitude * 0.3 * (t * 0.11).cos();
                let open = prev_close;
                prev_close = close;
                let pad = amplitude * 0.2;
                bar(i, open, open.max(close) + pad, open.min(close) - pad, close)
            })
            .collect(),
    )
}

/// A neutral market context: nothing is oversold, overbought or moving.
pub fn make_context() -> MarketContext {
    MarketContext {
        symbol: "XAUUSD".to_string(),
        timeframe: Timeframe::M15,
        current_price: 2000.0,
        price_change_pct: 0.0,
        volume_change_pct: 0.0,
        rsi: 50.0,
        macd: 0.0,
        bb_position: 0.5,
        recent_high: 2010.0,
        recent_low: 1990.0,
        volatility: 5.0,
        short_term_up: false,
        trend: Trend::Sideways,
        support: Vec::new(),
        resistance: Vec::new(),
        indicators: BTreeMap::new(),
    }
}

/// A Config suitable for testing: paper mode, no API keys, quiet logging.
pub fn default_test_config() -> Config {
    Config {
        symbols: vec!["XAUUSD".to_string(), "BTCUSD".to_string()],
        timeframe: Timeframe::M15,
        lookback_bars: 300,
        data_dir: std::env::temp_dir()
            .join("fusion_bot_test")
            .to_string_lossy()
            .to_string(),
        paper_trade: true,
        initial_balance: 10_000.0,
        account_currency: "USD".to_string(),
        cycle_interval_secs: 1,
        max_positions: 3,
        risk_per_trade: 0.02,
        max_daily_loss: 0.05,
        max_drawdown: 0.15,
        min_lot: 0.01,
        max_lot: 10.0,
        lot_step: 0.01,
        pip_value_per_lot: 10.0,
        pip_scale: 10_000.0,
        market_timezone: "UTC".to_string(),
        friday_close_hour: 20,
        monday_open_hour: 0,
        fusion_policy: FusionPolicy::ConfidenceWeighted,
        collaborator_timeout_secs: 2,
        analyst_api_key: String::new(),
        analyst_base_url: "http://localhost:1".to_string(),
        analyst_model: "test".to_string(),
        log_level: "ERROR".to_string(),
    }
}
