use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use fusion_trading_bot::config::SharedConfig;
use fusion_trading_bot::exchange::{AccountSource, PaperExchange};
use fusion_trading_bot::strategies::{DecisionEngine, SymbolOutcome};

pub struct FusionBot {
    config: SharedConfig,
    engine: DecisionEngine,
    account: Arc<dyn AccountSource>,
    paper: Option<Arc<PaperExchange>>,

    cycles: u64,
    submitted: usize,
    rejected: usize,
}

impl FusionBot {
    pub async fn new(
        config: SharedConfig,
        engine: DecisionEngine,
        account: Arc<dyn AccountSource>,
        paper: Option<Arc<PaperExchange>>,
    ) -> Self {
        let cfg = config.read().await;

        info!("{}", "=".repeat(60));
        info!("Signal fusion bot starting up");
        info!(
            "Mode: {}",
            if cfg.paper_trade {
                "PAPER TRADING"
            } else {
                "LIVE TRADING"
            }
        );
        info!("Symbols: {}", cfg.symbols.join(", "));
        info!("Timeframe: {} | Lookback: {} bars", cfg.timeframe, cfg.lookback_bars);
        info!("Fusion policy: {}", engine.fusion_policy());
        info!(
            "Risk: {:.1}% per trade | max {} positions | daily loss {:.1}% | drawdown {:.1}%",
            cfg.risk_per_trade * 100.0,
            cfg.max_positions,
            cfg.max_daily_loss * 100.0,
            cfg.max_drawdown * 100.0
        );
        info!("Cycle interval: {}s", cfg.cycle_interval_secs);
        info!("{}", "=".repeat(60));

        drop(cfg);

        Self {
            config,
            engine,
            account,
            paper,
            cycles: 0,
            submitted: 0,
            rejected: 0,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("Bot is now running. Press Ctrl+C to stop.");
        self.print_status().await;

        // Stop requests are only acted on between cycles.
        let (stop_tx, mut stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    let _ = stop_tx.send(true);
                }
                Err(e) => {
                    warn!("Could not listen for Ctrl+C: {}", e);
                    // Keep the sender alive so the loop never sees a closed channel.
                    std::future::pending::<()>().await;
                }
            }
        });

        loop {
            let keep_going = self.tick().await;
            if !keep_going || *stop_rx.borrow() {
                break;
            }

            let interval = self.config.read().await.cycle_interval();
            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// One decision cycle. Returns false once a paper replay has run out of bars.
    async fn tick(&mut self) -> bool {
        let symbols = self.config.read().await.symbols.clone();
        self.cycles += 1;
        info!("--- Cycle {} ---", self.cycles);

        let outcomes = self.engine.run_cycle(&symbols).await;
        for outcome in &outcomes {
            match outcome {
                SymbolOutcome::Submitted { .. } => {
                    self.submitted += 1;
                    info!("  {}", outcome);
                }
                SymbolOutcome::Rejected { .. } => {
                    self.rejected += 1;
                    error!("  {}", outcome);
                }
                SymbolOutcome::Hold { .. } => info!("  {}", outcome),
            }
        }

        if self.cycles % 10 == 0 {
            self.print_status().await;
        }

        if let Some(paper) = &self.paper {
            paper.advance().await;
            if paper.is_exhausted().await {
                info!("Paper replay reached the end of its data");
                return false;
            }
        }
        true
    }

    async fn print_status(&self) {
        let account = match self.account.get_account().await {
            Ok(a) => Some(a),
            Err(e) => {
                warn!("Account unavailable for status: {}", e);
                None
            }
        };
        let summary = self.engine.risk().summary(account.as_ref());

        if let Some(balance) = summary.balance {
            info!(
                "Balance: {:.2} | Equity: {:.2}",
                balance,
                summary.equity.unwrap_or(balance)
            );
        }
        info!(
            "Daily PnL: {:+.2} ({:+.2}%) | Drawdown: {:.2}%",
            summary.daily_pnl, summary.daily_pnl_percent, summary.current_drawdown
        );
        info!(
            "Open: {}/{} | Exposure: {:.2} | Trades today: {} | Can trade: {}",
            summary.open_positions,
            summary.max_positions,
            summary.total_exposure,
            summary.trades_today,
            summary.can_trade
        );
        info!(
            "Cycles: {} | Submitted: {} | Rejected: {}",
            self.cycles, self.submitted, self.rejected
        );
        if let Some(paper) = &self.paper {
            info!("Paper trades closed: {}", paper.closed_trades().await);
        }
    }

    async fn shutdown(&mut self) {
        info!("Shutting down...");
        self.print_status().await;
        info!("Bot stopped.");
    }
}
