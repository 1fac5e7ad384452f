use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDirection::Buy => write!(f, "buy"),
            TradeDirection::Sell => write!(f, "sell"),
        }
    }
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
        }
    }
}

/// Categorical recommendation, ordered from most bearish to most bullish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStrength {
    StrongSell,
    Sell,
    Neutral,
    Buy,
    StrongBuy,
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SignalStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStrength::StrongSell => "STRONG_SELL",
            SignalStrength::Sell => "SELL",
            SignalStrength::Neutral => "NEUTRAL",
            SignalStrength::Buy => "BUY",
            SignalStrength::StrongBuy => "STRONG_BUY",
        }
    }

    /// StrongBuy=+2, Buy=+1, Neutral=0, Sell=-1, StrongSell=-2
    pub fn numeric(self) -> f64 {
        match self {
            SignalStrength::StrongSell => -2.0,
            SignalStrength::Sell => -1.0,
            SignalStrength::Neutral => 0.0,
            SignalStrength::Buy => 1.0,
            SignalStrength::StrongBuy => 2.0,
        }
    }

    /// Maps a numeric model output in [-2, 2] back to a category.
    pub fn from_model_output(value: f64) -> Self {
        if value >= 1.5 {
            SignalStrength::StrongBuy
        } else if value >= 0.5 {
            SignalStrength::Buy
        } else if value <= -1.5 {
            SignalStrength::StrongSell
        } else if value <= -0.5 {
            SignalStrength::Sell
        } else {
            SignalStrength::Neutral
        }
    }

    /// Parses analyst vocabulary. "HOLD" is treated as neutral.
    pub fn parse_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "STRONG_BUY" => Some(SignalStrength::StrongBuy),
            "BUY" => Some(SignalStrength::Buy),
            "NEUTRAL" | "HOLD" => Some(SignalStrength::Neutral),
            "SELL" => Some(SignalStrength::Sell),
            "STRONG_SELL" => Some(SignalStrength::StrongSell),
            _ => None,
        }
    }

    pub fn direction(self) -> Option<TradeDirection> {
        match self {
            SignalStrength::Buy | SignalStrength::StrongBuy => Some(TradeDirection::Buy),
            SignalStrength::Sell | SignalStrength::StrongSell => Some(TradeDirection::Sell),
            SignalStrength::Neutral => None,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == SignalStrength::Neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Technical,
    Model,
    ExternalAnalysis,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::Technical => write!(f, "technical"),
            SignalSource::Model => write!(f, "model"),
            SignalSource::ExternalAnalysis => write!(f, "external_analysis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Uptrend => write!(f, "uptrend"),
            Trend::Downtrend => write!(f, "downtrend"),
            Trend::Sideways => write!(f, "sideways"),
        }
    }
}

impl Trend {
    pub fn is_directional(self) -> bool {
        self != Trend::Sideways
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_mapping_is_symmetric() {
        assert!((SignalStrength::StrongBuy.numeric() - 2.0).abs() < 1e-9);
        assert!((SignalStrength::StrongSell.numeric() + 2.0).abs() < 1e-9);
        assert!(SignalStrength::Neutral.numeric().abs() < 1e-9);
    }

    #[test]
    fn model_output_thresholds() {
        assert_eq!(SignalStrength::from_model_output(2.0), SignalStrength::StrongBuy);
        assert_eq!(SignalStrength::from_model_output(0.5), SignalStrength::Buy);
        assert_eq!(SignalStrength::from_model_output(0.49), SignalStrength::Neutral);
        assert_eq!(SignalStrength::from_model_output(-0.5), SignalStrength::Sell);
        assert_eq!(SignalStrength::from_model_output(-1.7), SignalStrength::StrongSell);
    }

    #[test]
    fn parse_loose_accepts_hold_and_spacing() {
        assert_eq!(SignalStrength::parse_loose("hold"), Some(SignalStrength::Neutral));
        assert_eq!(SignalStrength::parse_loose("strong buy"), Some(SignalStrength::StrongBuy));
        assert_eq!(SignalStrength::parse_loose("Strong-Sell"), Some(SignalStrength::StrongSell));
        assert_eq!(SignalStrength::parse_loose("maybe"), None);
    }

    #[test]
    fn direction_of_strength() {
        assert_eq!(SignalStrength::StrongBuy.direction(), Some(TradeDirection::Buy));
        assert_eq!(SignalStrength::Sell.direction(), Some(TradeDirection::Sell));
        assert_eq!(SignalStrength::Neutral.direction(), None);
    }
}
