use serde::{Deserialize, Serialize};

/// Consecutive sorted prices closer than this (relative) share a cluster.
const CLUSTER_THRESHOLD: f64 = 0.002;
pub const DEFAULT_MAX_LEVELS: usize = 3;
/// Bars scanned for support/resistance.
pub const LEVEL_LOOKBACK: usize = 100;

/// Clusters prices on one side of `current` into at most `max_levels`
/// levels, nearest first.
pub struct SupportResistanceLocator;

impl SupportResistanceLocator {
    pub fn locate(prices: &[f64], current: f64, above: bool, max_levels: usize) -> Vec<f64> {
        let mut side: Vec<f64> = prices
            .iter()
            .copied()
            .filter(|p| p.is_finite())
            .filter(|&p| if above { p > current } else { p < current })
            .collect();

        if side.is_empty() || max_levels == 0 {
            return Vec::new();
        }

        side.sort_by(|a, b| a.total_cmp(b));

        let mut clusters: Vec<f64> = Vec::new();
        let mut cluster: Vec<f64> = vec![side[0]];

        for &price in &side[1..] {
            let anchor = cluster[cluster.len() - 1];
            if anchor != 0.0 && ((price - anchor) / anchor).abs() < CLUSTER_THRESHOLD {
                cluster.push(price);
            } else {
                clusters.push(mean(&cluster));
                cluster = vec![price];
            }
        }
        clusters.push(mean(&cluster));

        // Support levels sit below price: nearest is the highest one.
        if !above {
            clusters.reverse();
        }
        clusters.truncate(max_levels);
        clusters
    }

    pub fn resistance(highs: &[f64], current: f64) -> Vec<f64> {
        Self::locate(highs, current, true, DEFAULT_MAX_LEVELS)
    }

    pub fn support(lows: &[f64], current: f64) -> Vec<f64> {
        Self::locate(lows, current, false, DEFAULT_MAX_LEVELS)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Classic floor-trader pivots from the previous bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoints {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl PivotPoints {
    pub fn from_hlc(high: f64, low: f64, close: f64) -> Self {
        let pivot = (high + low + close) / 3.0;
        Self {
            pivot,
            r1: 2.0 * pivot - low,
            r2: pivot + (high - low),
            r3: high + 2.0 * (pivot - low),
            s1: 2.0 * pivot - high,
            s2: pivot - (high - low),
            s3: low - 2.0 * (high - pivot),
        }
    }
}

/// Retracement and extension levels measured down from a range's high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevels {
    pub level_0: f64,
    pub level_23_6: f64,
    pub level_38_2: f64,
    pub level_50: f64,
    pub level_61_8: f64,
    pub level_78_6: f64,
    pub level_100: f64,
    pub level_161_8: f64,
    pub level_261_8: f64,
}

impl FibonacciLevels {
    pub fn from_range(high: f64, low: f64) -> Self {
        let diff = high - low;
        Self {
            level_0: high,
            level_23_6: high - 0.236 * diff,
            level_38_2: high - 0.382 * diff,
            level_50: high - 0.5 * diff,
            level_61_8: high - 0.618 * diff,
            level_78_6: high - 0.786 * diff,
            level_100: low,
            level_161_8: high + 0.618 * diff,
            level_261_8: high + 1.618 * diff,
        }
    }
}
