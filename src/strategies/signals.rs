use std::fmt;

use crate::core::risk::RiskBlock;
use crate::exchange::OrderRef;
pub use crate::models::{DirectionalSignal, FusedDecision, TradeIntent, TradeParams};

#[derive(Debug, Clone, PartialEq)]
pub enum HoldReason {
    DataInsufficient { bars: usize, required: usize },
    FeedUnavailable(String),
    /// Fusion did not clear the trade threshold.
    NoSignal,
    RiskBlocked(RiskBlock),
    /// The symbol's analysis task panicked or was cancelled.
    TaskFailed(String),
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldReason::DataInsufficient { bars, required } => {
                write!(f, "insufficient data ({} of {} bars)", bars, required)
            }
            HoldReason::FeedUnavailable(e) => write!(f, "market data unavailable: {}", e),
            HoldReason::NoSignal => write!(f, "no actionable signal"),
            HoldReason::RiskBlocked(b) => write!(f, "risk blocked: {}", b),
            HoldReason::TaskFailed(e) => write!(f, "analysis task failed: {}", e),
        }
    }
}

/// Result of the analysis phase for one symbol.
#[derive(Debug, Clone)]
pub enum Analysis {
    Hold {
        symbol: String,
        reason: HoldReason,
    },
    Decision {
        decision: FusedDecision,
        params: Option<TradeParams>,
    },
}

impl Analysis {
    pub fn symbol(&self) -> &str {
        match self {
            Analysis::Hold { symbol, .. } => symbol,
            Analysis::Decision { decision, .. } => &decision.symbol,
        }
    }

    pub fn decision(&self) -> Option<&FusedDecision> {
        match self {
            Analysis::Decision { decision, .. } => Some(decision),
            Analysis::Hold { .. } => None,
        }
    }
}

/// What happened to one symbol in one cycle.
#[derive(Debug, Clone)]
pub enum SymbolOutcome {
    Hold {
        symbol: String,
        reason: HoldReason,
        decision: Option<FusedDecision>,
    },
    Submitted {
        intent: TradeIntent,
        order: OrderRef,
        decision: FusedDecision,
    },
    Rejected {
        intent: TradeIntent,
        reason: String,
        decision: FusedDecision,
    },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolOutcome::Hold { symbol, .. } => symbol,
            SymbolOutcome::Submitted { intent, .. } | SymbolOutcome::Rejected { intent, .. } => {
                &intent.symbol
            }
        }
    }

    pub fn decision(&self) -> Option<&FusedDecision> {
        match self {
            SymbolOutcome::Hold { decision, .. } => decision.as_ref(),
            SymbolOutcome::Submitted { decision, .. } | SymbolOutcome::Rejected { decision, .. } => {
                Some(decision)
            }
        }
    }

    pub fn hold_reason(&self) -> Option<&HoldReason> {
        match self {
            SymbolOutcome::Hold { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, SymbolOutcome::Submitted { .. })
    }
}

impl fmt::Display for SymbolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolOutcome::Hold { symbol, reason, .. } => write!(f, "{}: HOLD ({})", symbol, reason),
            SymbolOutcome::Submitted { intent, order, .. } => write!(
                f,
                "{}: {} {:.2} lots @ {:.5} [{}]",
                intent.symbol, intent.direction, intent.volume, intent.entry, order.id
            ),
            SymbolOutcome::Rejected { intent, reason, .. } => {
                write!(f, "{}: REJECTED ({})", intent.symbol, reason)
            }
        }
    }
}
