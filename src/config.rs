use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::core::fusion::FusionPolicy;
use crate::core::risk::RiskConfig;
use crate::core::trading_hours::TradingWindow;
use crate::models::Timeframe;

pub type SharedConfig = Arc<RwLock<Config>>;

/// Bars requested per symbol each cycle.
pub const DEFAULT_LOOKBACK_BARS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Market
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub lookback_bars: usize,
    pub data_dir: String,

    // Mode
    pub paper_trade: bool,
    pub initial_balance: f64,
    pub account_currency: String,
    pub cycle_interval_secs: u64,

    // Risk
    pub max_positions: usize,
    pub risk_per_trade: f64,
    pub max_daily_loss: f64,
    pub max_drawdown: f64,
    pub min_lot: f64,
    pub max_lot: f64,
    pub lot_step: f64,
    pub pip_value_per_lot: f64,
    pub pip_scale: f64,

    // Trading window (hours in `market_timezone`)
    pub market_timezone: String,
    pub friday_close_hour: u32,
    pub monday_open_hour: u32,

    // Fusion
    pub fusion_policy: FusionPolicy,

    // Collaborators
    pub collaborator_timeout_secs: u64,
    pub analyst_api_key: String,
    pub analyst_base_url: String,
    pub analyst_model: String,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let paper_trade = env("PAPER_TRADE", "true").to_lowercase() == "true";
        // Exploratory (paper) runs poll faster than live ones.
        let default_interval = if paper_trade { "30" } else { "300" };

        let symbols: Vec<String> = env("SYMBOLS", "XAUUSD,BTCUSD")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let fusion_policy = match env("FUSION_POLICY", "confidence_weighted")
            .to_lowercase()
            .as_str()
        {
            "external_model_blend" | "blend" => FusionPolicy::external_model_blend(),
            _ => FusionPolicy::ConfidenceWeighted,
        };

        Config {
            symbols,
            timeframe: Timeframe::from_str_loose(&env("TIMEFRAME", "M15")).unwrap_or(Timeframe::M15),
            lookback_bars: env("LOOKBACK_BARS", "1000")
                .parse()
                .unwrap_or(DEFAULT_LOOKBACK_BARS),
            data_dir: env("DATA_DIR", "data"),
            paper_trade,
            initial_balance: env("INITIAL_BALANCE", "10000")
                .parse()
                .unwrap_or(10_000.0),
            account_currency: env("ACCOUNT_CURRENCY", "USD"),
            cycle_interval_secs: env("CYCLE_INTERVAL_SECS", default_interval)
                .parse()
                .unwrap_or(30),
            max_positions: env("MAX_POSITIONS", "3").parse().unwrap_or(3),
            risk_per_trade: env("RISK_PER_TRADE", "0.02").parse().unwrap_or(0.02), // 2% of balance
            max_daily_loss: env("MAX_DAILY_LOSS", "0.05").parse().unwrap_or(0.05),
            max_drawdown: env("MAX_DRAWDOWN", "0.15").parse().unwrap_or(0.15),
            min_lot: 0.01,
            max_lot: 10.0,
            lot_step: 0.01,
            pip_value_per_lot: env("PIP_VALUE_PER_LOT", "10").parse().unwrap_or(10.0),
            pip_scale: env("PIP_SCALE", "10000").parse().unwrap_or(10_000.0),
            market_timezone: env("MARKET_TIMEZONE", "UTC"),
            friday_close_hour: env("FRIDAY_CLOSE_HOUR", "20").parse().unwrap_or(20),
            monday_open_hour: env("MONDAY_OPEN_HOUR", "0").parse().unwrap_or(0),
            fusion_policy,
            collaborator_timeout_secs: env("COLLABORATOR_TIMEOUT_SECS", "10")
                .parse()
                .unwrap_or(10),
            analyst_api_key: env("ANALYST_API_KEY", ""),
            analyst_base_url: env("ANALYST_BASE_URL", "https://api.openai.com/v1"),
            analyst_model: env("ANALYST_MODEL", "gpt-4o-mini"),
            log_level: env("LOG_LEVEL", "INFO"),
        }
    }

    pub fn risk_config(&self) -> RiskConfig {
        RiskConfig {
            max_positions: self.max_positions,
            risk_per_trade: self.risk_per_trade,
            max_daily_loss: self.max_daily_loss,
            max_drawdown: self.max_drawdown,
            min_lot: self.min_lot,
            max_lot: self.max_lot,
            lot_step: self.lot_step,
            pip_value_per_lot: self.pip_value_per_lot,
            pip_scale: self.pip_scale,
        }
    }

    pub fn trading_window(&self) -> TradingWindow {
        TradingWindow::from_config(self)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs.max(1))
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs.max(1))
    }

    pub fn shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }
}
