use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "M1")]
    M1,
    #[serde(rename = "M5")]
    M5,
    #[serde(rename = "M15")]
    M15,
    #[serde(rename = "M30")]
    M30,
    #[serde(rename = "H1")]
    H1,
    #[serde(rename = "H4")]
    H4,
    #[serde(rename = "D1")]
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        }
    }

    pub fn as_duration(&self) -> Duration {
        match self {
            Timeframe::M1 => Duration::from_secs(60),
            Timeframe::M5 => Duration::from_secs(300),
            Timeframe::M15 => Duration::from_secs(900),
            Timeframe::M30 => Duration::from_secs(1800),
            Timeframe::H1 => Duration::from_secs(3600),
            Timeframe::H4 => Duration::from_secs(14400),
            Timeframe::D1 => Duration::from_secs(86400),
        }
    }

    /// Accepts both broker style ("M15") and exchange style ("15m") names.
    pub fn from_str_loose(s: &str) -> Option<Timeframe> {
        match s.trim() {
            "M1" | "1m" | "1" => Some(Timeframe::M1),
            "M5" | "5m" | "5" => Some(Timeframe::M5),
            "M15" | "15m" | "15" => Some(Timeframe::M15),
            "M30" | "30m" | "30" => Some(Timeframe::M30),
            "H1" | "1h" | "60" => Some(Timeframe::H1),
            "H4" | "4h" | "240" => Some(Timeframe::H4),
            "D1" | "1d" => Some(Timeframe::D1),
            _ => None,
        }
    }

    pub fn as_seconds(&self) -> u64 {
        self.as_duration().as_secs()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_parsing_accepts_both_styles() {
        assert_eq!(Timeframe::from_str_loose("M15"), Some(Timeframe::M15));
        assert_eq!(Timeframe::from_str_loose("15m"), Some(Timeframe::M15));
        assert_eq!(Timeframe::from_str_loose("5"), Some(Timeframe::M5));
        assert_eq!(Timeframe::from_str_loose("W1"), None);
    }

    #[test]
    fn seconds_match_duration() {
        assert_eq!(Timeframe::H4.as_seconds(), 14400);
        assert_eq!(Timeframe::M30.to_string(), "M30");
    }
}
