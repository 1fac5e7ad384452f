use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::exchange::{AccountSource, CollaboratorError, ExecutionGateway, MarketDataFeed, OrderRef};
use crate::models::{AccountSnapshot, Bar, BarSeries, OpenPosition, Timeframe, TradeDirection, TradeIntent};

#[derive(Debug, Clone)]
pub struct PaperPosition {
    pub id: u64,
    pub symbol: String,
    pub direction: TradeDirection,
    pub volume: f64,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl PaperPosition {
    fn pnl_at(&self, price: f64, units_per_lot: f64) -> f64 {
        let diff = match self.direction {
            TradeDirection::Buy => price - self.entry,
            TradeDirection::Sell => self.entry - price,
        };
        diff * self.volume * units_per_lot
    }

    /// Exit price if `bar` touched the stop or the target. The stop wins
    /// when both were touched inside one bar.
    fn exit_on(&self, bar: &Bar) -> Option<f64> {
        match self.direction {
            TradeDirection::Buy if bar.low <= self.stop_loss => Some(self.stop_loss),
            TradeDirection::Buy if bar.high >= self.take_profit => Some(self.take_profit),
            TradeDirection::Sell if bar.high >= self.stop_loss => Some(self.stop_loss),
            TradeDirection::Sell if bar.low <= self.take_profit => Some(self.take_profit),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct PaperState {
    /// Number of bars past the warmup that are visible.
    step: usize,
    balance: f64,
    positions: HashMap<String, PaperPosition>,
    next_id: u64,
    closed_trades: usize,
}

/// Replays stored bars one step per cycle and fills intents against them.
/// Serves as market data feed, account source and execution gateway.
pub struct PaperExchange {
    data: HashMap<String, Vec<Bar>>,
    timeframe: Timeframe,
    warmup: usize,
    currency: String,
    /// Price units per lot, so that pnl = price move * lots * units.
    units_per_lot: f64,
    state: Mutex<PaperState>,
}

impl PaperExchange {
    pub fn new(timeframe: Timeframe, initial_balance: f64, currency: &str, warmup: usize) -> Self {
        Self {
            data: HashMap::new(),
            timeframe,
            warmup,
            currency: currency.to_string(),
            units_per_lot: 100_000.0,
            state: Mutex::new(PaperState {
                step: 0,
                balance: initial_balance,
                positions: HashMap::new(),
                next_id: 1,
                closed_trades: 0,
            }),
        }
    }

    pub fn with_units_per_lot(mut self, units: f64) -> Self {
        self.units_per_lot = units;
        self
    }

    /// Bars must be sorted oldest first.
    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    /// Loads `{data_dir}/{symbol}_{timeframe}.json` for every configured
    /// symbol. Missing files are skipped with a warning.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut exchange = Self::new(
            cfg.timeframe,
            cfg.initial_balance,
            &cfg.account_currency,
            cfg.lookback_bars,
        )
        .with_units_per_lot(cfg.pip_value_per_lot * cfg.pip_scale);

        for symbol in &cfg.symbols {
            let path = Path::new(&cfg.data_dir).join(format!("{}_{}.json", symbol, cfg.timeframe));
            if !path.exists() {
                warn!("No bar file for {} at {}", symbol, path.display());
                continue;
            }
            let bars = load_bars(&path)?;
            info!("Loaded {} {} bars for {}", bars.len(), cfg.timeframe, symbol);
            exchange.data.insert(symbol.clone(), bars);
        }

        Ok(exchange)
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    fn visible_end(&self, bars: &[Bar], step: usize) -> usize {
        (self.warmup + step).min(bars.len())
    }

    /// True once every series has been fully revealed.
    pub async fn is_exhausted(&self) -> bool {
        let step = self.state.lock().await.step;
        self.data
            .values()
            .all(|bars| self.warmup + step >= bars.len())
    }

    /// Reveals the next bar of every series and settles positions whose
    /// stop or target it touched.
    pub async fn advance(&self) {
        let mut state = self.state.lock().await;
        state.step += 1;
        let step = state.step;

        let mut exits: Vec<(String, f64)> = Vec::new();
        for (symbol, position) in &state.positions {
            let Some(bars) = self.data.get(symbol) else {
                continue;
            };
            let end = self.visible_end(bars, step);
            if end == 0 {
                continue;
            }
            if let Some(price) = position.exit_on(&bars[end - 1]) {
                exits.push((symbol.clone(), price));
            }
        }

        for (symbol, price) in exits {
            if let Some(position) = state.positions.remove(&symbol) {
                let pnl = position.pnl_at(price, self.units_per_lot);
                state.balance += pnl;
                state.closed_trades += 1;
                info!(
                    "Paper position #{} {} {} closed at {:.5} | PnL: {:+.2} | Balance: {:.2}",
                    position.id, position.direction, symbol, price, pnl, state.balance
                );
            }
        }
    }

    fn last_close(&self, symbol: &str, step: usize) -> Option<f64> {
        let bars = self.data.get(symbol)?;
        let end = self.visible_end(bars, step);
        end.checked_sub(1).map(|i| bars[i].close)
    }

    pub async fn closed_trades(&self) -> usize {
        self.state.lock().await.closed_trades
    }
}

fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut bars: Vec<Bar> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse bars in {}", path.display()))?;
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    Ok(bars)
}

#[async_trait]
impl MarketDataFeed for PaperExchange {
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<BarSeries, CollaboratorError> {
        if timeframe != self.timeframe {
            return Err(CollaboratorError::Unavailable(format!(
                "paper data is {}, not {}",
                self.timeframe, timeframe
            )));
        }
        let bars = self
            .data
            .get(symbol)
            .ok_or_else(|| CollaboratorError::Unavailable(format!("no data for {}", symbol)))?;

        let step = self.state.lock().await.step;
        let end = self.visible_end(bars, step);
        let start = end.saturating_sub(count);
        Ok(BarSeries::new(bars[start..end].to_vec()))
    }
}

#[async_trait]
impl AccountSource for PaperExchange {
    async fn get_account(&self) -> Result<AccountSnapshot, CollaboratorError> {
        let state = self.state.lock().await;
        let unrealized: f64 = state
            .positions
            .values()
            .filter_map(|p| {
                self.last_close(&p.symbol, state.step)
                    .map(|price| p.pnl_at(price, self.units_per_lot))
            })
            .sum();
        Ok(AccountSnapshot::new(
            state.balance,
            state.balance + unrealized,
            &self.currency,
        ))
    }
}

#[async_trait]
impl ExecutionGateway for PaperExchange {
    async fn is_connected(&self) -> bool {
        true
    }

    async fn submit(&self, intent: &TradeIntent) -> Result<OrderRef, CollaboratorError> {
        if !self.data.contains_key(&intent.symbol) {
            return Err(CollaboratorError::Rejected(format!(
                "unknown symbol {}",
                intent.symbol
            )));
        }
        if !(intent.volume > 0.0) {
            return Err(CollaboratorError::Rejected(format!(
                "invalid volume {}",
                intent.volume
            )));
        }

        let mut state = self.state.lock().await;
        if state.positions.contains_key(&intent.symbol) {
            return Err(CollaboratorError::Rejected(format!(
                "position already open in {}",
                intent.symbol
            )));
        }

        let id = state.next_id;
        state.next_id += 1;
        state.positions.insert(
            intent.symbol.clone(),
            PaperPosition {
                id,
                symbol: intent.symbol.clone(),
                direction: intent.direction,
                volume: intent.volume,
                entry: intent.entry,
                stop_loss: intent.stop_loss,
                take_profit: intent.take_profit,
            },
        );

        info!(
            "Paper {} {} {:.2} lots @ {:.5} | SL: {:.5} | TP: {:.5}",
            intent.direction, intent.symbol, intent.volume, intent.entry, intent.stop_loss, intent.take_profit
        );

        Ok(OrderRef {
            id: format!("paper-{}", id),
            symbol: intent.symbol.clone(),
            volume: intent.volume,
        })
    }

    async fn open_positions(&self) -> Result<Vec<OpenPosition>, CollaboratorError> {
        let state = self.state.lock().await;
        let mut open: Vec<OpenPosition> = state
            .positions
            .values()
            .map(|p| OpenPosition::new(&p.symbol, p.volume, p.entry))
            .collect();
        open.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(open)
    }
}
