use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::trading_hours::{MarketPhase, TradingWindow};
use crate::models::{AccountSnapshot, OpenPosition};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_positions: usize,
    pub risk_per_trade: f64,
    pub max_daily_loss: f64,
    pub max_drawdown: f64,
    pub min_lot: f64,
    pub max_lot: f64,
    pub lot_step: f64,
    pub pip_value_per_lot: f64,
    pub pip_scale: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_positions: 3,
            risk_per_trade: 0.02,
            max_daily_loss: 0.05,
            max_drawdown: 0.15,
            min_lot: 0.01,
            max_lot: 10.0,
            lot_step: 0.01,
            pip_value_per_lot: 10.0,
            pip_scale: 10_000.0,
        }
    }
}

/// Why the risk gate refused a trade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskBlock {
    #[error("execution gateway not connected")]
    NotConnected,

    #[error("account information unavailable")]
    AccountUnavailable,

    #[error("max positions reached: {open}/{max}")]
    MaxPositions { open: usize, max: usize },

    #[error("position already open in {0}")]
    SymbolAlreadyOpen(String),

    #[error("daily loss limit reached: {loss:.2} >= {limit:.2}")]
    DailyLossLimit { loss: f64, limit: f64 },

    #[error("max drawdown reached: {drawdown:.2}% >= {limit:.2}%")]
    MaxDrawdown { drawdown: f64, limit: f64 },

    #[error("outside trading hours ({0})")]
    OutsideTradingHours(MarketPhase),
}

#[derive(Debug, Clone, Default)]
pub struct RiskState {
    pub daily_start_balance: Option<f64>,
    pub daily_reset_date: Option<NaiveDate>,
    pub peak_balance: Option<f64>,
    /// Open symbol -> exposure (volume * entry).
    pub open_positions: HashMap<String, f64>,
    pub trades_today: usize,
}

impl RiskState {
    pub fn open_position_count(&self) -> usize {
        self.open_positions.len()
    }

    pub fn total_exposure(&self) -> f64 {
        self.open_positions.values().sum()
    }

    /// Captures the day's starting balance on the first observation of a new
    /// date and ratchets the peak balance.
    fn observe(&mut self, balance: f64, date: NaiveDate) {
        let new_day = match self.daily_reset_date {
            None => true,
            Some(prev) => date > prev,
        };
        if new_day {
            self.daily_start_balance = Some(balance);
            self.daily_reset_date = Some(date);
            self.trades_today = 0;
            info!("Daily tracking reset. Start balance: {:.2}", balance);
        }
        if self.peak_balance.map_or(true, |peak| balance > peak) {
            self.peak_balance = Some(balance);
        }
    }

    fn daily_loss(&self, balance: f64, max_daily_loss: f64) -> Option<(f64, f64)> {
        let start = self.daily_start_balance.filter(|s| *s > 0.0)?;
        let loss = start - balance;
        let limit = start * max_daily_loss;
        (loss >= limit).then_some((loss, limit))
    }

    fn drawdown(&self, balance: f64, max_drawdown: f64) -> Option<f64> {
        let peak = self.peak_balance.filter(|p| *p > 0.0)?;
        let dd = (peak - balance) / peak;
        (dd >= max_drawdown).then_some(dd)
    }
}

/// A reserved slot plus the size to trade it with.
#[derive(Debug, Clone, PartialEq)]
pub struct Authorization {
    pub symbol: String,
    pub volume: f64,
    pub risk_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSummary {
    pub timestamp: DateTime<Utc>,
    pub open_positions: usize,
    pub max_positions: usize,
    pub total_exposure: f64,
    pub balance: Option<f64>,
    pub equity: Option<f64>,
    pub daily_pnl: f64,
    pub daily_pnl_percent: f64,
    pub current_drawdown: f64,
    pub trades_today: usize,
    pub can_trade: bool,
}

/// Exposure, loss and drawdown gate. The only holder of cross-cycle state.
pub struct RiskManager {
    config: RiskConfig,
    window: TradingWindow,
    state: Mutex<RiskState>,
}

impl RiskManager {
    pub fn new(config: RiskConfig, window: TradingWindow) -> Self {
        Self {
            config,
            window,
            state: Mutex::new(RiskState::default()),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, RiskState> {
        // A panic mid-update leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> RiskState {
        self.state().clone()
    }

    pub fn open_position_count(&self) -> usize {
        self.state().open_position_count()
    }

    pub fn can_open_trade(
        &self,
        symbol: &str,
        account: Option<&AccountSnapshot>,
        connected: bool,
        now: DateTime<Utc>,
    ) -> bool {
        self.check(symbol, account, connected, now).is_ok()
    }

    pub fn check(
        &self,
        symbol: &str,
        account: Option<&AccountSnapshot>,
        connected: bool,
        now: DateTime<Utc>,
    ) -> Result<(), RiskBlock> {
        let mut state = self.state();
        self.check_locked(&mut state, symbol, account, connected, now)
    }

    /// Check, reserve the symbol's slot and size the trade in one critical
    /// section, so two symbols can never both take the last slot.
    pub fn authorize(
        &self,
        symbol: &str,
        account: Option<&AccountSnapshot>,
        connected: bool,
        now: DateTime<Utc>,
        entry: f64,
        stop_loss: f64,
    ) -> Result<Authorization, RiskBlock> {
        let mut state = self.state();
        self.check_locked(&mut state, symbol, account, connected, now)?;

        let balance = account.map(|a| a.balance);
        let volume = self.position_size(balance, entry, stop_loss);
        let risk_amount = balance.unwrap_or(0.0) * self.config.risk_per_trade;

        let exposure = OpenPosition::new(symbol, volume, entry).exposure();
        state.open_positions.insert(symbol.to_string(), exposure);
        state.trades_today += 1;

        info!(
            "Position size for {}: {:.2} lots (risk: {:.2} {})",
            symbol,
            volume,
            risk_amount,
            account.map(|a| a.currency.as_str()).unwrap_or("")
        );

        Ok(Authorization {
            symbol: symbol.to_string(),
            volume,
            risk_amount,
        })
    }

    fn check_locked(
        &self,
        state: &mut RiskState,
        symbol: &str,
        account: Option<&AccountSnapshot>,
        connected: bool,
        now: DateTime<Utc>,
    ) -> Result<(), RiskBlock> {
        if !connected {
            return Err(RiskBlock::NotConnected);
        }

        let account = account
            .filter(|a| a.is_usable())
            .ok_or(RiskBlock::AccountUnavailable)?;

        state.observe(account.balance, self.window.local_date(now));

        let open = state.open_position_count();
        if open >= self.config.max_positions {
            return Err(RiskBlock::MaxPositions {
                open,
                max: self.config.max_positions,
            });
        }

        if state.open_positions.contains_key(symbol) {
            return Err(RiskBlock::SymbolAlreadyOpen(symbol.to_string()));
        }

        if let Some((loss, limit)) = state.daily_loss(account.balance, self.config.max_daily_loss) {
            warn!("Daily loss limit reached: {:.2} >= {:.2}", loss, limit);
            return Err(RiskBlock::DailyLossLimit { loss, limit });
        }

        if let Some(dd) = state.drawdown(account.balance, self.config.max_drawdown) {
            warn!(
                "Max drawdown reached: {:.2}% >= {:.2}%",
                dd * 100.0,
                self.config.max_drawdown * 100.0
            );
            return Err(RiskBlock::MaxDrawdown {
                drawdown: dd * 100.0,
                limit: self.config.max_drawdown * 100.0,
            });
        }

        let phase = self.window.phase(now);
        if phase != MarketPhase::Open {
            return Err(RiskBlock::OutsideTradingHours(phase));
        }

        Ok(())
    }

    /// Lots to trade so that hitting the stop loses `risk_per_trade` of the
    /// balance. Degenerate inputs get the minimum lot.
    pub fn position_size(&self, balance: Option<f64>, entry: f64, stop_loss: f64) -> f64 {
        let c = &self.config;
        let Some(balance) = balance.filter(|b| b.is_finite() && *b > 0.0) else {
            return c.min_lot;
        };
        if stop_loss == 0.0 {
            return c.min_lot;
        }
        let distance = (entry - stop_loss).abs();
        if !distance.is_finite() || distance == 0.0 {
            return c.min_lot;
        }

        let risk_amount = balance * c.risk_per_trade;
        let lots = risk_amount / (distance * c.pip_value_per_lot * c.pip_scale);
        let lots = if c.lot_step > 0.0 {
            (lots / c.lot_step).round() * c.lot_step
        } else {
            lots
        };
        lots.clamp(c.min_lot, c.max_lot)
    }

    /// Frees a slot reserved by `authorize`. Returns false if none was held.
    pub fn release(&self, symbol: &str) -> bool {
        let released = self.state().open_positions.remove(symbol).is_some();
        if released {
            info!("Released position slot for {}", symbol);
        }
        released
    }

    /// Replaces the tracked open set with the gateway's view.
    pub fn sync_open_positions(&self, positions: &[OpenPosition]) {
        let mut state = self.state();
        let fresh: HashMap<String, f64> = positions
            .iter()
            .map(|p| (p.symbol.clone(), p.exposure()))
            .collect();
        if fresh != state.open_positions {
            info!(
                "Reconciled open positions: {} -> {}",
                state.open_positions.len(),
                fresh.len()
            );
            state.open_positions = fresh;
        }
    }

    pub fn daily_loss_breached(&self, balance: f64) -> bool {
        self.state()
            .daily_loss(balance, self.config.max_daily_loss)
            .is_some()
    }

    pub fn drawdown_breached(&self, balance: f64) -> bool {
        self.state()
            .drawdown(balance, self.config.max_drawdown)
            .is_some()
    }

    pub fn summary(&self, account: Option<&AccountSnapshot>) -> RiskSummary {
        let state = self.state();
        let open = state.open_position_count();

        let mut summary = RiskSummary {
            timestamp: Utc::now(),
            open_positions: open,
            max_positions: self.config.max_positions,
            total_exposure: state.total_exposure(),
            balance: None,
            equity: None,
            daily_pnl: 0.0,
            daily_pnl_percent: 0.0,
            current_drawdown: 0.0,
            trades_today: state.trades_today,
            can_trade: false,
        };

        if let Some(acc) = account.filter(|a| a.is_usable()) {
            summary.balance = Some(acc.balance);
            summary.equity = Some(acc.equity);

            if let Some(start) = state.daily_start_balance.filter(|s| *s > 0.0) {
                summary.daily_pnl = acc.balance - start;
                summary.daily_pnl_percent = summary.daily_pnl / start * 100.0;
            }
            if let Some(peak) = state.peak_balance.filter(|p| *p > 0.0) {
                summary.current_drawdown = (peak - acc.balance) / peak * 100.0;
            }

            summary.can_trade = open < self.config.max_positions
                && state
                    .daily_loss(acc.balance, self.config.max_daily_loss)
                    .is_none()
                && state
                    .drawdown(acc.balance, self.config.max_drawdown)
                    .is_none();
        }

        summary
    }
}
