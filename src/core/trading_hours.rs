use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use std::fmt;
use tracing::warn;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketPhase {
    Open,
    Weekend,
    FridayBlackout,
    MondayBlackout,
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketPhase::Open => write!(f, "open"),
            MarketPhase::Weekend => write!(f, "weekend"),
            MarketPhase::FridayBlackout => write!(f, "friday_blackout"),
            MarketPhase::MondayBlackout => write!(f, "monday_blackout"),
        }
    }
}

/// Weekly trading window: closed all weekend, from `friday_close_hour` on
/// Friday, and before `monday_open_hour` on Monday (hours in `timezone`).
#[derive(Debug, Clone)]
pub struct TradingWindow {
    pub timezone: Tz,
    pub friday_close_hour: u32,
    pub monday_open_hour: u32,
}

impl Default for TradingWindow {
    fn default() -> Self {
        Self::new(chrono_tz::UTC, 20, 0)
    }
}

impl TradingWindow {
    pub fn new(timezone: Tz, friday_close_hour: u32, monday_open_hour: u32) -> Self {
        Self {
            timezone,
            friday_close_hour,
            monday_open_hour,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let timezone = cfg.market_timezone.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "Unknown market timezone '{}', falling back to UTC",
                cfg.market_timezone
            );
            chrono_tz::UTC
        });
        Self::new(timezone, cfg.friday_close_hour, cfg.monday_open_hour)
    }

    pub fn phase(&self, utc_now: DateTime<Utc>) -> MarketPhase {
        let local = utc_now.with_timezone(&self.timezone);
        let hour = local.hour();

        match local.weekday() {
            Weekday::Sat | Weekday::Sun => MarketPhase::Weekend,
            Weekday::Fri if hour >= self.friday_close_hour => MarketPhase::FridayBlackout,
            Weekday::Mon if hour < self.monday_open_hour => MarketPhase::MondayBlackout,
            _ => MarketPhase::Open,
        }
    }

    pub fn is_open(&self, utc_now: DateTime<Utc>) -> bool {
        self.phase(utc_now) == MarketPhase::Open
    }

    /// Calendar date used for the daily risk rollover.
    pub fn local_date(&self, utc_now: DateTime<Utc>) -> NaiveDate {
        utc_now.with_timezone(&self.timezone).date_naive()
    }
}
