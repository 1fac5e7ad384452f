mod bot;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use fusion_trading_bot::analysis::{ExternalAnalyst, LlmAnalyst, TechnicalAnalyst, UntrainedModel};
use fusion_trading_bot::config::Config;
use fusion_trading_bot::core::risk::RiskManager;
use fusion_trading_bot::exchange::PaperExchange;
use fusion_trading_bot::strategies::{Collaborators, DecisionEngine, EngineSettings};

use crate::bot::FusionBot;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    if !cfg.paper_trade {
        anyhow::bail!("No live execution gateway is available; set PAPER_TRADE=true");
    }

    let paper = Arc::new(PaperExchange::from_config(&cfg)?);

    let analyst: Arc<dyn ExternalAnalyst> = if cfg.analyst_api_key.is_empty() {
        info!("No analyst API key, using technical analyst");
        Arc::new(TechnicalAnalyst)
    } else {
        Arc::new(LlmAnalyst::from_config(&cfg))
    };

    let collaborators = Collaborators {
        feed: paper.clone(),
        model: Arc::new(UntrainedModel),
        analyst,
        gateway: paper.clone(),
        account: paper.clone(),
    };
    let risk = Arc::new(RiskManager::new(cfg.risk_config(), cfg.trading_window()));
    let engine = DecisionEngine::new(collaborators, risk, EngineSettings::from_config(&cfg));

    let shared_config = cfg.shared();
    let mut bot = FusionBot::new(shared_config, engine, paper.clone(), Some(paper)).await;
    bot.run().await?;

    Ok(())
}
