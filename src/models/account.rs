use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub balance: f64,
    pub equity: f64,
    pub currency: String,
}

impl AccountSnapshot {
    pub fn new(balance: f64, equity: f64, currency: &str) -> Self {
        Self {
            balance,
            equity,
            currency: currency.to_string(),
        }
    }

    /// A snapshot the risk gate can reason about: finite, non-negative balance.
    pub fn is_usable(&self) -> bool {
        self.balance.is_finite() && self.balance >= 0.0
    }
}

/// A position the execution gateway reports as open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    pub volume: f64,
    pub entry: f64,
}

impl OpenPosition {
    pub fn new(symbol: &str, volume: f64, entry: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            volume,
            entry,
        }
    }

    /// volume * entry, zero when either side is not a usable number.
    pub fn exposure(&self) -> f64 {
        let exposure = self.volume * self.entry;
        if exposure.is_finite() {
            exposure.abs()
        } else {
            0.0
        }
    }
}
