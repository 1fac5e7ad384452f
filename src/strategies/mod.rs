pub mod decision_engine;
pub mod fallback;
pub mod signals;

pub use decision_engine::{Collaborators, DecisionEngine, EngineSettings};
pub use signals::{Analysis, HoldReason, SymbolOutcome};
