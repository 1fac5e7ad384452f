pub mod paper;

pub use paper::PaperExchange;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::models::{AccountSnapshot, BarSeries, OpenPosition, Timeframe, TradeIntent};

/// Failure reported by (or on behalf of) an external collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("model not trained for {0}")]
    NotTrained(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Gateway's acknowledgement of a submitted intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRef {
    pub id: String,
    pub symbol: String,
    pub volume: f64,
}

#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Most recent `count` bars, oldest first.
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<BarSeries, CollaboratorError>;
}

#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn get_account(&self) -> Result<AccountSnapshot, CollaboratorError>;
}

#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn is_connected(&self) -> bool;
    async fn submit(&self, intent: &TradeIntent) -> Result<OrderRef, CollaboratorError>;
    async fn open_positions(&self) -> Result<Vec<OpenPosition>, CollaboratorError>;
}

/// Bounds a collaborator call; an elapsed deadline becomes `Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout(limit)),
    }
}
