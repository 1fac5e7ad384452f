mod common;

use std::sync::Arc;
use std::time::Duration;

use fusion_trading_bot::analysis::{ExternalAnalyst, ModelPredictor, UntrainedModel};
use fusion_trading_bot::core::fusion::FusionPolicy;
use fusion_trading_bot::core::risk::{RiskBlock, RiskConfig, RiskManager};
use fusion_trading_bot::core::trading_hours::{MarketPhase, TradingWindow};
use fusion_trading_bot::exchange::{AccountSource, ExecutionGateway, PaperExchange};
use fusion_trading_bot::models::{SignalSource, SignalStrength, Timeframe};
use fusion_trading_bot::strategies::decision_engine::Clock;
use fusion_trading_bot::strategies::{
    Analysis, Collaborators, DecisionEngine, EngineSettings, HoldReason, SymbolOutcome,
};

use common::{
    make_oscillating_bars, monday_noon, saturday_noon, sunday_evening, DownAnalyst, FixedAnalyst,
    FixedModel, HangingAnalyst,
};

const WARMUP: usize = 260;

struct Setup {
    analyst: Arc<dyn ExternalAnalyst>,
    model: Arc<dyn ModelPredictor>,
    policy: FusionPolicy,
    clock: Clock,
    max_positions: usize,
    symbols: Vec<&'static str>,
    bars: usize,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            analyst: Arc::new(FixedAnalyst {
                strength: SignalStrength::StrongBuy,
                confidence: 0.9,
            }),
            model: Arc::new(FixedModel {
                value: 2.0,
                confidence: 0.9,
            }),
            policy: FusionPolicy::ConfidenceWeighted,
            clock: monday_noon(),
            max_positions: 3,
            symbols: vec!["XAUUSD"],
            bars: 300,
        }
    }
}

fn build(setup: Setup) -> (DecisionEngine, Arc<PaperExchange>) {
    let mut paper = PaperExchange::new(Timeframe::M15, 10_000.0, "USD", WARMUP).with_units_per_lot(100.0);
    for (i, symbol) in setup.symbols.iter().enumerate() {
        let base = 2000.0 + i as f64 * 500.0;
        paper = paper.with_bars(symbol, make_oscillating_bars(setup.bars, base, 12.0));
    }
    let paper = Arc::new(paper);

    let collaborators = Collaborators {
        feed: paper.clone(),
        model: setup.model,
        analyst: setup.analyst,
        gateway: paper.clone(),
        account: paper.clone(),
    };
    let risk = Arc::new(RiskManager::new(
        RiskConfig {
            max_positions: setup.max_positions,
            ..RiskConfig::default()
        },
        TradingWindow::default(),
    ));
    let settings = EngineSettings {
        timeframe: Timeframe::M15,
        lookback_bars: 300,
        collaborator_timeout: Duration::from_millis(200),
        fusion_policy: setup.policy,
    };
    let engine = DecisionEngine::new(collaborators, risk, settings).with_clock(setup.clock);
    (engine, paper)
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn paper_cycle_submits_then_blocks_the_same_symbol() {
    let (engine, paper) = build(Setup::default());
    let symbols = names(&["XAUUSD"]);

    let first = engine.run_cycle(&symbols).await;
    assert_eq!(first.len(), 1);
    assert!(first[0].is_submitted(), "{}", first[0]);
    let open = paper.open_positions().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].symbol, "XAUUSD");

    if let SymbolOutcome::Submitted { intent, order, decision } = &first[0] {
        assert!(order.id.starts_with("paper-"));
        assert!(intent.stop_loss < intent.entry && intent.entry < intent.take_profit);
        assert!(intent.volume >= 0.01);
        assert!(decision.should_trade);
        assert_eq!(decision.policy, "confidence_weighted");
        assert!((open[0].volume - intent.volume).abs() < 1e-12);
        assert_eq!(decision.entry, Some(intent.entry));
    }

    let second = engine.run_cycle(&symbols).await;
    assert!(matches!(
        second[0].hold_reason(),
        Some(HoldReason::RiskBlocked(RiskBlock::SymbolAlreadyOpen(s))) if s == "XAUUSD"
    ));
    assert_eq!(engine.risk().open_position_count(), 1);
}

#[tokio::test]
async fn weekend_clock_blocks_every_symbol() {
    let (engine, paper) = build(Setup {
        clock: saturday_noon(),
        symbols: vec!["XAUUSD", "BTCUSD"],
        ..Setup::default()
    });

    let outcomes = engine.run_cycle(&names(&["XAUUSD", "BTCUSD"])).await;
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert!(matches!(
            outcome.hold_reason(),
            Some(HoldReason::RiskBlocked(RiskBlock::OutsideTradingHours(MarketPhase::Weekend)))
        ));
        assert!(outcome.decision().map(|d| d.should_trade).unwrap_or(false));
    }
    assert!(paper.open_positions().await.unwrap().is_empty());
}

#[tokio::test]
async fn sunday_evening_is_still_closed() {
    let (engine, paper) = build(Setup {
        clock: sunday_evening(),
        ..Setup::default()
    });

    let outcomes = engine.run_cycle(&names(&["XAUUSD"])).await;
    assert!(matches!(
        outcomes[0].hold_reason(),
        Some(HoldReason::RiskBlocked(RiskBlock::OutsideTradingHours(MarketPhase::Weekend)))
    ));
    assert!(paper.open_positions().await.unwrap().is_empty());
}

#[tokio::test]
async fn summary_reports_exposure_of_reconciled_positions() {
    let (engine, paper) = build(Setup::default());
    let symbols = names(&["XAUUSD"]);

    engine.run_cycle(&symbols).await;
    // The next cycle reconciles against the paper book before gating.
    engine.run_cycle(&symbols).await;

    let open = paper.open_positions().await.unwrap();
    let expected: f64 = open.iter().map(|p| p.volume * p.entry).sum();
    let account = paper.get_account().await.unwrap();
    let summary = engine.risk().summary(Some(&account));
    assert_eq!(summary.open_positions, 1);
    assert!(expected > 0.0);
    assert!((summary.total_exposure - expected).abs() < 1e-9);
}

#[tokio::test]
async fn outcomes_follow_input_order_and_share_the_position_cap() {
    let (engine, _) = build(Setup {
        max_positions: 1,
        symbols: vec!["XAUUSD", "BTCUSD", "EURUSD"],
        ..Setup::default()
    });

    let outcomes = engine.run_cycle(&names(&["EURUSD", "XAUUSD", "BTCUSD"])).await;
    let order: Vec<&str> = outcomes.iter().map(|o| o.symbol()).collect();
    assert_eq!(order, vec!["EURUSD", "XAUUSD", "BTCUSD"]);

    assert!(outcomes[0].is_submitted());
    for outcome in &outcomes[1..] {
        assert!(matches!(
            outcome.hold_reason(),
            Some(HoldReason::RiskBlocked(RiskBlock::MaxPositions { open: 1, max: 1 }))
        ));
    }
}

#[tokio::test]
async fn unknown_symbol_holds_without_touching_the_others() {
    let (engine, _) = build(Setup::default());
    let outcomes = engine.run_cycle(&names(&["NOPE", "XAUUSD"])).await;
    assert!(matches!(
        outcomes[0].hold_reason(),
        Some(HoldReason::FeedUnavailable(_))
    ));
    assert!(outcomes[1].is_submitted());
}

#[tokio::test]
async fn downed_analyst_falls_back_to_capped_technical_view() {
    let (engine, _) = build(Setup {
        analyst: Arc::new(DownAnalyst),
        model: Arc::new(UntrainedModel),
        ..Setup::default()
    });

    let Analysis::Decision { decision, .. } = engine.evaluate_symbol("XAUUSD").await else {
        panic!("expected a decision");
    };
    let external = decision.component(SignalSource::ExternalAnalysis).unwrap();
    assert!(external.confidence <= 0.5);
    assert!(external.rationale.contains("analyst unavailable"));

    let model = decision.component(SignalSource::Model).unwrap();
    assert_eq!(model.strength, SignalStrength::Neutral);
    assert!((model.confidence - 0.5).abs() < 1e-9);
    assert!(decision.confidence <= 0.95);
}

#[tokio::test]
async fn hanging_analyst_times_out_into_the_fallback() {
    let (engine, _) = build(Setup {
        analyst: Arc::new(HangingAnalyst),
        ..Setup::default()
    });

    let started = std::time::Instant::now();
    let outcomes = engine.run_cycle(&names(&["XAUUSD"])).await;
    assert!(started.elapsed() < Duration::from_secs(5));

    let decision = outcomes[0].decision().unwrap();
    let external = decision.component(SignalSource::ExternalAnalysis).unwrap();
    assert!(external.confidence <= 0.5);
}

#[tokio::test]
async fn blend_policy_uses_the_model_alone_when_the_analyst_is_unsure() {
    let (engine, _) = build(Setup {
        analyst: Arc::new(FixedAnalyst {
            strength: SignalStrength::Sell,
            confidence: 0.3,
        }),
        policy: FusionPolicy::external_model_blend(),
        ..Setup::default()
    });

    let Analysis::Decision { decision, params } = engine.evaluate_symbol("XAUUSD").await else {
        panic!("expected a decision");
    };
    assert_eq!(decision.policy, "external_model_blend");
    assert!(decision.rationale.starts_with("model only"));
    assert_eq!(decision.strength, SignalStrength::StrongBuy);
    assert!((decision.confidence - 0.9).abs() < 1e-9);
    assert!(decision.should_trade);
    assert!(params.is_some());
}

#[tokio::test]
async fn neutral_consensus_never_reaches_the_gateway() {
    let (engine, paper) = build(Setup {
        analyst: Arc::new(FixedAnalyst {
            strength: SignalStrength::Neutral,
            confidence: 0.9,
        }),
        model: Arc::new(FixedModel {
            value: 0.0,
            confidence: 0.9,
        }),
        policy: FusionPolicy::external_model_blend(),
        ..Setup::default()
    });

    let outcomes = engine.run_cycle(&names(&["XAUUSD"])).await;
    assert!(matches!(outcomes[0].hold_reason(), Some(HoldReason::NoSignal)));
    assert!(paper.open_positions().await.unwrap().is_empty());
    assert_eq!(engine.risk().snapshot().trades_today, 0);
}

#[tokio::test]
async fn replay_runs_to_exhaustion_with_consistent_bookkeeping() {
    let (engine, paper) = build(Setup {
        symbols: vec!["XAUUSD", "BTCUSD"],
        bars: 320,
        ..Setup::default()
    });
    let symbols = names(&["XAUUSD", "BTCUSD"]);

    let mut cycles = 0;
    while !paper.is_exhausted().await {
        let outcomes = engine.run_cycle(&symbols).await;
        assert_eq!(outcomes.len(), 2);
        assert!(engine.risk().open_position_count() <= 2);
        paper.advance().await;
        cycles += 1;
        assert!(cycles <= 100, "replay never finished");
    }
    assert_eq!(cycles, 320 - WARMUP);

    let account = paper.get_account().await.unwrap();
    assert!(account.balance.is_finite() && account.balance > 0.0);
    let open = paper.open_positions().await.unwrap();
    let summary = engine.risk().summary(Some(&account));
    assert!(summary.trades_today >= open.len());
}
