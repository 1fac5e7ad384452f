use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::analysis::{ExternalAnalyst, FeatureVector, MarketContext, ModelPredictor};
use crate::config::Config;
use crate::core::fusion::{FusionPolicy, SignalFusion};
use crate::core::indicators::IndicatorEngine;
use crate::core::risk::RiskManager;
use crate::core::trade_params::TradeParameterizer;
use crate::exchange::{with_timeout, AccountSource, ExecutionGateway, MarketDataFeed};
use crate::models::{Timeframe, TradeIntent};
use crate::strategies::fallback;
use crate::strategies::signals::{Analysis, HoldReason, SymbolOutcome};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The external systems the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub feed: Arc<dyn MarketDataFeed>,
    pub model: Arc<dyn ModelPredictor>,
    pub analyst: Arc<dyn ExternalAnalyst>,
    pub gateway: Arc<dyn ExecutionGateway>,
    pub account: Arc<dyn AccountSource>,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub timeframe: Timeframe,
    pub lookback_bars: usize,
    pub collaborator_timeout: Duration,
    pub fusion_policy: FusionPolicy,
}

impl EngineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            timeframe: cfg.timeframe,
            lookback_bars: cfg.lookback_bars,
            collaborator_timeout: cfg.collaborator_timeout(),
            fusion_policy: cfg.fusion_policy.clone(),
        }
    }
}

/// Stateless per-symbol analysis, shared by the spawned tasks.
struct Pipeline {
    feed: Arc<dyn MarketDataFeed>,
    model: Arc<dyn ModelPredictor>,
    analyst: Arc<dyn ExternalAnalyst>,
    indicators: IndicatorEngine,
    fusion: SignalFusion,
    timeframe: Timeframe,
    lookback_bars: usize,
    timeout: Duration,
}

impl Pipeline {
    async fn analyze(&self, symbol: &str, now: DateTime<Utc>) -> Analysis {
        let hold = |reason: HoldReason| Analysis::Hold {
            symbol: symbol.to_string(),
            reason,
        };

        let bars = match with_timeout(
            self.timeout,
            self.feed.get_bars(symbol, self.timeframe, self.lookback_bars),
        )
        .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!("Market data for {} unavailable: {}", symbol, e);
                return hold(HoldReason::FeedUnavailable(e.to_string()));
            }
        };

        if !bars.is_strictly_ordered() {
            warn!("Market data for {} is out of order, skipping", symbol);
            return hold(HoldReason::FeedUnavailable("bars out of order".to_string()));
        }

        let required = self.indicators.min_bars();
        let Some(view) = self.indicators.analyze(&bars) else {
            debug!("{}: {} bars, need {}", symbol, bars.len(), required);
            return hold(HoldReason::DataInsufficient {
                bars: bars.len(),
                required,
            });
        };

        let features = FeatureVector::from_view(&view);
        let context = MarketContext::build(symbol, self.timeframe, &bars, &view);

        let (model_result, analyst_result) = tokio::join!(
            with_timeout(self.timeout, self.model.predict(symbol, &features)),
            with_timeout(self.timeout, self.analyst.analyze(symbol, &context)),
        );

        if let Err(e) = &model_result {
            debug!("Model for {}: {}", symbol, e);
        }
        if let Err(e) = &analyst_result {
            warn!("External analyst for {} unavailable: {}", symbol, e);
        }

        let model = fallback::model_signal(model_result);
        let external = fallback::external_signal(analyst_result, &context);
        let decision = self.fusion.fuse(symbol, now, &view.signal, &model, &external);

        let params = if decision.should_trade {
            TradeParameterizer::parameterize(decision.strength, view.current_price, view.snapshot.atr)
        } else {
            None
        };
        let decision = decision.with_trade_params(params.as_ref());

        info!(
            "{} | {} | score {:+.2} | conf {:.1}% | trade {}",
            symbol,
            decision.strength,
            decision.score,
            decision.confidence * 100.0,
            decision.should_trade
        );
        debug!("{} rationale: {}", symbol, decision.rationale);

        Analysis::Decision { decision, params }
    }
}

/// Runs the per-cycle pipeline: analysis for all symbols in parallel, then
/// the risk gate and submission one symbol at a time.
pub struct DecisionEngine {
    pipeline: Arc<Pipeline>,
    gateway: Arc<dyn ExecutionGateway>,
    account: Arc<dyn AccountSource>,
    risk: Arc<RiskManager>,
    timeout: Duration,
    clock: Clock,
}

impl DecisionEngine {
    pub fn new(collaborators: Collaborators, risk: Arc<RiskManager>, settings: EngineSettings) -> Self {
        let pipeline = Pipeline {
            feed: collaborators.feed,
            model: collaborators.model,
            analyst: collaborators.analyst,
            indicators: IndicatorEngine::new(),
            fusion: SignalFusion::new(settings.fusion_policy),
            timeframe: settings.timeframe,
            lookback_bars: settings.lookback_bars,
            timeout: settings.collaborator_timeout,
        };
        Self {
            pipeline: Arc::new(pipeline),
            gateway: collaborators.gateway,
            account: collaborators.account,
            risk,
            timeout: settings.collaborator_timeout,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the wall clock used for the trading window and day rollover.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn risk(&self) -> &Arc<RiskManager> {
        &self.risk
    }

    pub fn fusion_policy(&self) -> &FusionPolicy {
        self.pipeline.fusion.policy()
    }

    /// Analysis phase for one symbol; touches no risk state.
    pub async fn evaluate_symbol(&self, symbol: &str) -> Analysis {
        self.pipeline.analyze(symbol, (self.clock)()).await
    }

    /// Analyzes every symbol in parallel, then gates tradeable decisions
    /// most confident first. Outcomes come back in input order.
    pub async fn run_cycle(&self, symbols: &[String]) -> Vec<SymbolOutcome> {
        self.reconcile_positions().await;
        let now = (self.clock)();

        let handles: Vec<_> = symbols
            .iter()
            .map(|symbol| {
                let pipeline = Arc::clone(&self.pipeline);
                let symbol = symbol.clone();
                tokio::spawn(async move { pipeline.analyze(&symbol, now).await })
            })
            .collect();

        let mut analyses = Vec::with_capacity(symbols.len());
        for (symbol, handle) in symbols.iter().zip(handles) {
            match handle.await {
                Ok(analysis) => analyses.push(analysis),
                Err(e) => {
                    error!("Analysis task for {} failed: {}", symbol, e);
                    analyses.push(Analysis::Hold {
                        symbol: symbol.clone(),
                        reason: HoldReason::TaskFailed(e.to_string()),
                    });
                }
            }
        }

        let mut order: Vec<usize> = (0..analyses.len()).collect();
        order.sort_by(|&a, &b| gate_priority(&analyses[b]).total_cmp(&gate_priority(&analyses[a])));

        let mut pending: Vec<Option<Analysis>> = analyses.into_iter().map(Some).collect();
        let mut outcomes: Vec<Option<SymbolOutcome>> = (0..pending.len()).map(|_| None).collect();
        for index in order {
            if let Some(analysis) = pending[index].take() {
                outcomes[index] = Some(self.gate_and_submit(analysis, now).await);
            }
        }
        outcomes.into_iter().flatten().collect()
    }

    async fn reconcile_positions(&self) {
        match with_timeout(self.timeout, self.gateway.open_positions()).await {
            Ok(open) => self.risk.sync_open_positions(&open),
            Err(e) => warn!("Could not reconcile open positions: {}", e),
        }
    }

    async fn gate_and_submit(&self, analysis: Analysis, now: DateTime<Utc>) -> SymbolOutcome {
        let (decision, params) = match analysis {
            Analysis::Hold { symbol, reason } => {
                return SymbolOutcome::Hold {
                    symbol,
                    reason,
                    decision: None,
                }
            }
            Analysis::Decision { decision, params } => (decision, params),
        };

        let (Some(params), Some(direction)) = (params, decision.direction()) else {
            return SymbolOutcome::Hold {
                symbol: decision.symbol.clone(),
                reason: HoldReason::NoSignal,
                decision: Some(decision),
            };
        };
        if !decision.should_trade {
            return SymbolOutcome::Hold {
                symbol: decision.symbol.clone(),
                reason: HoldReason::NoSignal,
                decision: Some(decision),
            };
        }

        let symbol = decision.symbol.clone();

        // Network polls happen before the risk lock is taken.
        let account = match with_timeout(self.timeout, self.account.get_account()).await {
            Ok(a) => Some(a),
            Err(e) => {
                warn!("Account unavailable: {}", e);
                None
            }
        };
        let connected = tokio::time::timeout(self.timeout, self.gateway.is_connected())
            .await
            .unwrap_or(false);

        let auth = match self.risk.authorize(
            &symbol,
            account.as_ref(),
            connected,
            now,
            params.entry,
            params.stop_loss,
        ) {
            Ok(auth) => auth,
            Err(block) => {
                info!("{} blocked by risk gate: {}", symbol, block);
                return SymbolOutcome::Hold {
                    symbol,
                    reason: HoldReason::RiskBlocked(block),
                    decision: Some(decision),
                };
            }
        };

        let intent = TradeIntent {
            symbol: symbol.clone(),
            direction,
            volume: auth.volume,
            entry: params.entry,
            stop_loss: params.stop_loss,
            take_profit: params.take_profit,
            comment: format!(
                "{} {:.0}% {}",
                decision.strength,
                decision.confidence * 100.0,
                decision.policy
            ),
        };

        match with_timeout(self.timeout, self.gateway.submit(&intent)).await {
            Ok(order) => {
                info!(
                    "Submitted {} {} {:.2} lots @ {:.5} | SL: {:.5} | TP: {:.5} [{}]",
                    intent.direction,
                    symbol,
                    intent.volume,
                    intent.entry,
                    intent.stop_loss,
                    intent.take_profit,
                    order.id
                );
                SymbolOutcome::Submitted {
                    intent,
                    order,
                    decision,
                }
            }
            Err(e) => {
                error!("Execution rejected for {}: {}", symbol, e);
                self.risk.release(&symbol);
                SymbolOutcome::Rejected {
                    intent,
                    reason: e.to_string(),
                    decision,
                }
            }
        }
    }
}

/// Tradeable decisions rank by confidence; everything else goes last.
fn gate_priority(analysis: &Analysis) -> f64 {
    match analysis {
        Analysis::Decision { decision, .. } if decision.should_trade => decision.confidence,
        _ => f64::NEG_INFINITY,
    }
}
