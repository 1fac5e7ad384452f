use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::levels::{FibonacciLevels, PivotPoints, SupportResistanceLocator, LEVEL_LOOKBACK};
use crate::models::{BarSeries, DirectionalSignal, SignalSource, SignalStrength, Trend};

/// Below this many bars the snapshot is empty.
pub const MIN_BARS: usize = 200;

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BB_PERIOD: usize = 20;
const BB_STD: f64 = 2.0;
const ATR_PERIOD: usize = 14;
const STOCH_PERIOD: usize = 14;
const STOCH_SMOOTH: usize = 3;
const CCI_PERIOD: usize = 20;
const CCI_FACTOR: f64 = 0.015;
const ADX_PERIOD: usize = 14;

const BASE_CONFIDENCE: f64 = 0.7;
const TREND_CONFIDENCE_BONUS: f64 = 0.8 * 0.2;
const MAX_CONFIDENCE: f64 = 0.95;

// ── Series primitives ───────────────────────────────────────────────

fn rolling_mean_opt(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let sum: Option<f64> = slice.iter().try_fold(0.0, |acc, v| v.map(|x| acc + x));
            sum.map(|s| s / window as f64)
        })
        .collect()
}

fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    rolling_mean_opt(&wrapped, window)
}

/// Sample standard deviation (n - 1) over a trailing window.
fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let var = slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
            Some(var.sqrt())
        })
        .collect()
}

fn last_some(values: &[Option<f64>]) -> Option<f64> {
    values.last().copied().flatten()
}

pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_mean(values, period)
}

/// Recursive EMA seeded with the first value, alpha = 2 / (span + 1).
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    for (i, &v) in values.iter().enumerate() {
        if i == 0 {
            out.push(v);
        } else {
            let prev = out[i - 1];
            out.push(alpha * v + (1.0 - alpha) * prev);
        }
    }
    out
}

pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut gains = vec![None; closes.len()];
    let mut losses = vec![None; closes.len()];
    for i in 1..closes.len() {
        let delta = closes[i] - closes[i - 1];
        gains[i] = Some(delta.max(0.0));
        losses[i] = Some((-delta).max(0.0));
    }
    let avg_gain = rolling_mean_opt(&gains, period);
    let avg_loss = rolling_mean_opt(&losses, period);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(g, l)| match (g, l) {
            (Some(g), Some(l)) => Some(rsi_from_averages(*g, *l)),
            _ => None,
        })
        .collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let macd: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&macd, signal);
    let histogram = macd.iter().zip(signal.iter()).map(|(m, s)| m - s).collect();
    MacdSeries {
        macd,
        signal,
        histogram,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// (close - lower) / (upper - lower); 0.5 for zero-width bands.
    pub position: f64,
}

pub fn bollinger(closes: &[f64], period: usize, num_std: f64) -> Vec<Option<BollingerPoint>> {
    let middle = rolling_mean(closes, period);
    let std = rolling_std(closes, period);

    (0..closes.len())
        .map(|i| {
            let (m, s) = (middle[i]?, std[i]?);
            let upper = m + num_std * s;
            let lower = m - num_std * s;
            let width = upper - lower;
            let position = if width > 0.0 {
                (closes[i] - lower) / width
            } else {
                0.5
            };
            Some(BollingerPoint {
                upper,
                middle: m,
                lower,
                position,
            })
        })
        .collect()
}

pub fn atr(series: &BarSeries, period: usize) -> Vec<Option<f64>> {
    rolling_mean(&series.true_ranges(), period)
}

/// Returns (smoothed %K, %D).
pub fn stochastic(
    series: &BarSeries,
    period: usize,
    smooth_k: usize,
    smooth_d: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let highs = series.highs();
    let lows = series.lows();
    let closes = series.closes();

    let raw_k: Vec<Option<f64>> = (0..closes.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            let start = i + 1 - period;
            let hh = highs[start..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let ll = lows[start..=i].iter().copied().fold(f64::INFINITY, f64::min);
            let range = hh - ll;
            if range > 0.0 {
                Some(100.0 * (closes[i] - ll) / range)
            } else {
                Some(50.0)
            }
        })
        .collect();

    let k = rolling_mean_opt(&raw_k, smooth_k);
    let d = rolling_mean_opt(&k, smooth_d);
    (k, d)
}

pub fn cci(series: &BarSeries, period: usize) -> Vec<Option<f64>> {
    let tp = series.typical_prices();
    let mean = rolling_mean(&tp, period);

    (0..tp.len())
        .map(|i| {
            let m = mean[i]?;
            let window = &tp[i + 1 - period..=i];
            let mad = window.iter().map(|x| (x - m).abs()).sum::<f64>() / period as f64;
            if mad == 0.0 {
                Some(0.0)
            } else {
                Some((tp[i] - m) / (CCI_FACTOR * mad))
            }
        })
        .collect()
}

pub fn adx(series: &BarSeries, period: usize) -> Vec<Option<f64>> {
    let highs = series.highs();
    let lows = series.lows();
    let n = highs.len();

    let mut pos_dm = vec![0.0; n];
    let mut neg_dm = vec![0.0; n];
    for i in 1..n {
        let up = highs[i] - highs[i - 1];
        let down = lows[i - 1] - lows[i];
        if up > down && up > 0.0 {
            pos_dm[i] = up;
        }
        if down > up && down > 0.0 {
            neg_dm[i] = down;
        }
    }

    let atr = atr(series, period);
    let pos_avg = rolling_mean(&pos_dm, period);
    let neg_avg = rolling_mean(&neg_dm, period);

    let dx: Vec<Option<f64>> = (0..n)
        .map(|i| {
            let a = atr[i]?;
            if a <= 0.0 {
                return Some(0.0);
            }
            let pdi = 100.0 * pos_avg[i]? / a;
            let ndi = 100.0 * neg_avg[i]? / a;
            let sum = pdi + ndi;
            if sum == 0.0 {
                Some(0.0)
            } else {
                Some(100.0 * (pdi - ndi).abs() / sum)
            }
        })
        .collect();

    rolling_mean_opt(&dx, period)
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Latest value of every indicator. All fields are `None` when the window
/// was too short.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_position: Option<f64>,
    pub atr: Option<f64>,
    pub stochastic_k: Option<f64>,
    pub stochastic_d: Option<f64>,
    pub cci: Option<f64>,
    pub adx: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_20: Option<f64>,
    pub ema_50: Option<f64>,
    pub ema_200: Option<f64>,
    pub pivots: Option<PivotPoints>,
    /// Over the support/resistance lookback.
    pub fibonacci: Option<FibonacciLevels>,
}

impl IndicatorSnapshot {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Name → value for every indicator that has one.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        let mut fields: Vec<(&'static str, Option<f64>)> = vec![
            ("close", self.close),
            ("rsi_14", self.rsi_14),
            ("macd", self.macd),
            ("macd_signal", self.macd_signal),
            ("macd_histogram", self.macd_histogram),
            ("bb_upper", self.bb_upper),
            ("bb_middle", self.bb_middle),
            ("bb_lower", self.bb_lower),
            ("bb_position", self.bb_position),
            ("atr", self.atr),
            ("stochastic_k", self.stochastic_k),
            ("stochastic_d", self.stochastic_d),
            ("cci", self.cci),
            ("adx", self.adx),
            ("sma_20", self.sma_20),
            ("sma_50", self.sma_50),
            ("sma_200", self.sma_200),
            ("ema_20", self.ema_20),
            ("ema_50", self.ema_50),
            ("ema_200", self.ema_200),
        ];
        if let Some(p) = self.pivots {
            fields.extend([
                ("pivot", Some(p.pivot)),
                ("r1", Some(p.r1)),
                ("r2", Some(p.r2)),
                ("r3", Some(p.r3)),
                ("s1", Some(p.s1)),
                ("s2", Some(p.s2)),
                ("s3", Some(p.s3)),
            ]);
        }
        if let Some(f) = self.fibonacci {
            fields.extend([
                ("fib_0", Some(f.level_0)),
                ("fib_23_6", Some(f.level_23_6)),
                ("fib_38_2", Some(f.level_38_2)),
                ("fib_50", Some(f.level_50)),
                ("fib_61_8", Some(f.level_61_8)),
                ("fib_78_6", Some(f.level_78_6)),
                ("fib_100", Some(f.level_100)),
                ("fib_161_8", Some(f.level_161_8)),
                ("fib_261_8", Some(f.level_261_8)),
            ]);
        }
        fields
            .into_iter()
            .filter_map(|(k, v)| v.filter(|x| x.is_finite()).map(|x| (k, x)))
            .collect()
    }

    pub fn ma_trend(&self) -> Trend {
        match (self.close, self.sma_20, self.sma_50) {
            (Some(c), Some(s20), Some(s50)) if c > s20 && s20 > s50 => Trend::Uptrend,
            (Some(c), Some(s20), Some(s50)) if c < s20 && s20 < s50 => Trend::Downtrend,
            _ => Trend::Sideways,
        }
    }
}

// ── Sub-signal policy ───────────────────────────────────────────────

pub fn rsi_signal(rsi: f64) -> f64 {
    if rsi < 30.0 {
        1.0
    } else if rsi > 70.0 {
        -1.0
    } else {
        ((50.0 - rsi) / 20.0).clamp(-1.0, 1.0)
    }
}

pub fn macd_signal(histogram: f64) -> f64 {
    if histogram > 0.0 {
        1.0
    } else {
        -1.0
    }
}

pub fn bb_signal(position: f64) -> f64 {
    if position < 0.2 {
        1.0
    } else if position > 0.8 {
        -1.0
    } else {
        (0.5 - position) * 2.0
    }
}

pub fn stochastic_signal(k: f64) -> f64 {
    if k < 20.0 {
        1.0
    } else if k > 80.0 {
        -1.0
    } else {
        (50.0 - k) / 30.0
    }
}

pub fn cci_signal(cci: f64) -> f64 {
    if cci < -100.0 {
        1.0
    } else if cci > 100.0 {
        -1.0
    } else {
        -cci / 100.0
    }
}

pub fn trend_signal(trend: Trend) -> f64 {
    match trend {
        Trend::Uptrend => 1.0,
        Trend::Downtrend => -1.0,
        Trend::Sideways => 0.0,
    }
}

/// Each indicator mapped onto [-1, 1]; positive is bullish.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubSignals {
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub bollinger: Option<f64>,
    pub stochastic: Option<f64>,
    pub cci: Option<f64>,
    pub ma_trend: Option<f64>,
}

impl SubSignals {
    pub fn from_snapshot(snapshot: &IndicatorSnapshot) -> Self {
        if snapshot.is_empty() {
            return Self::default();
        }
        Self {
            rsi: snapshot.rsi_14.map(rsi_signal),
            macd: snapshot.macd_histogram.map(macd_signal),
            bollinger: snapshot.bb_position.map(bb_signal),
            stochastic: snapshot.stochastic_k.map(stochastic_signal),
            cci: snapshot.cci.map(cci_signal),
            ma_trend: Some(trend_signal(snapshot.ma_trend())),
        }
    }

    fn values(&self) -> impl Iterator<Item = f64> + '_ {
        [
            self.rsi,
            self.macd,
            self.bollinger,
            self.stochastic,
            self.cci,
            self.ma_trend,
        ]
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
    }

    /// Mean of the available sub-signals, or `None` if there are none.
    pub fn aggregate(&self) -> Option<f64> {
        let values: Vec<f64> = self.values().collect();
        if values.is_empty() {
            None
        } else {
            Some((values.iter().sum::<f64>() / values.len() as f64).clamp(-1.0, 1.0))
        }
    }

    pub fn bullish_count(&self) -> usize {
        self.values().filter(|v| *v > 0.0).count()
    }

    pub fn bearish_count(&self) -> usize {
        self.values().filter(|v| *v < 0.0).count()
    }
}

pub fn strength_from_aggregate(aggregate: f64) -> SignalStrength {
    if aggregate > 0.5 {
        SignalStrength::StrongBuy
    } else if aggregate > 0.2 {
        SignalStrength::Buy
    } else if aggregate < -0.5 {
        SignalStrength::StrongSell
    } else if aggregate < -0.2 {
        SignalStrength::Sell
    } else {
        SignalStrength::Neutral
    }
}

/// Collapses sub-signals into the technical source's directional signal.
pub fn technical_signal(
    snapshot: &IndicatorSnapshot,
    subs: &SubSignals,
    support: &[f64],
    resistance: &[f64],
) -> DirectionalSignal {
    let Some(aggregate) = subs.aggregate() else {
        return DirectionalSignal::neutral(SignalSource::Technical, 0.0, "no indicators available");
    };

    let trend = snapshot.ma_trend();
    let strength = strength_from_aggregate(aggregate);
    let mut confidence = BASE_CONFIDENCE;
    if trend.is_directional() {
        confidence += TREND_CONFIDENCE_BONUS;
    }
    let confidence = confidence.min(MAX_CONFIDENCE);

    let mut rationale = format!(
        "Trend: {} | {} bullish / {} bearish indicators | aggregate {:.2}",
        trend,
        subs.bullish_count(),
        subs.bearish_count(),
        aggregate
    );
    if let Some(s) = support.first() {
        rationale.push_str(&format!(" | support {:.2}", s));
    }
    if let Some(r) = resistance.first() {
        rationale.push_str(&format!(" | resistance {:.2}", r));
    }

    DirectionalSignal::new(SignalSource::Technical, strength, confidence, rationale)
}

// ── Engine ──────────────────────────────────────────────────────────

/// Everything the technical stage derives from one window.
#[derive(Debug, Clone)]
pub struct TechnicalView {
    pub snapshot: IndicatorSnapshot,
    pub sub_signals: SubSignals,
    pub trend: Trend,
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
    pub current_price: f64,
    pub price_change_pct: Option<f64>,
    pub signal: DirectionalSignal,
}

pub struct IndicatorEngine {
    min_bars: usize,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self { min_bars: MIN_BARS }
    }

    pub fn min_bars(&self) -> usize {
        self.min_bars
    }

    pub fn compute(&self, window: &BarSeries) -> IndicatorSnapshot {
        if window.len() < self.min_bars {
            return IndicatorSnapshot::default();
        }

        let closes = window.closes();
        let macd = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        let bb = bollinger(&closes, BB_PERIOD, BB_STD).last().copied().flatten();
        let (stoch_k, stoch_d) = stochastic(window, STOCH_PERIOD, STOCH_SMOOTH, STOCH_SMOOTH);

        let pivots = window
            .len()
            .checked_sub(2)
            .and_then(|i| window.get(i))
            .map(|prev| PivotPoints::from_hlc(prev.high, prev.low, prev.close));
        let recent = window.tail(LEVEL_LOOKBACK);
        let fibonacci = Some(FibonacciLevels::from_range(recent.highs_max(), recent.lows_min()));

        IndicatorSnapshot {
            close: closes.last().copied(),
            rsi_14: last_some(&rsi(&closes, RSI_PERIOD)),
            macd: macd.macd.last().copied(),
            macd_signal: macd.signal.last().copied(),
            macd_histogram: macd.histogram.last().copied(),
            bb_upper: bb.map(|b| b.upper),
            bb_middle: bb.map(|b| b.middle),
            bb_lower: bb.map(|b| b.lower),
            bb_position: bb.map(|b| b.position),
            atr: last_some(&atr(window, ATR_PERIOD)),
            stochastic_k: last_some(&stoch_k),
            stochastic_d: last_some(&stoch_d),
            cci: last_some(&cci(window, CCI_PERIOD)),
            adx: last_some(&adx(window, ADX_PERIOD)),
            sma_20: last_some(&sma(&closes, 20)),
            sma_50: last_some(&sma(&closes, 50)),
            sma_200: last_some(&sma(&closes, 200)),
            ema_20: ema(&closes, 20).last().copied(),
            ema_50: ema(&closes, 50).last().copied(),
            ema_200: ema(&closes, 200).last().copied(),
            pivots,
            fibonacci,
        }
    }

    /// Snapshot, sub-signals, nearby levels and the technical signal.
    /// `None` when the window is too short to say anything.
    pub fn analyze(&self, window: &BarSeries) -> Option<TechnicalView> {
        let snapshot = self.compute(window);
        if snapshot.is_empty() {
            return None;
        }
        let current_price = window.last()?.close;

        let recent = window.tail(LEVEL_LOOKBACK);
        let support = SupportResistanceLocator::support(&recent.lows(), current_price);
        let resistance = SupportResistanceLocator::resistance(&recent.highs(), current_price);

        let sub_signals = SubSignals::from_snapshot(&snapshot);
        let signal = technical_signal(&snapshot, &sub_signals, &support, &resistance);

        Some(TechnicalView {
            trend: snapshot.ma_trend(),
            price_change_pct: window.pct_change(1),
            snapshot,
            sub_signals,
            support,
            resistance,
            current_price,
            signal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bearish_trend, make_bullish_trend, make_flat, make_oscillating};

    #[test]
    fn rsi_is_fifty_on_flat_series() {
        let closes = vec![100.0; 30];
        let values = rsi(&closes, 14);
        assert!(values[13].is_none());
        assert_eq!(values[29], Some(50.0));
    }

    #[test]
    fn rsi_extremes_on_monotonic_series() {
        let up: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let down: Vec<f64> = (0..40).map(|i| 100.0 - i as f64).collect();
        assert_eq!(last_some(&rsi(&up, 14)), Some(100.0));
        assert_eq!(last_some(&rsi(&down, 14)), Some(0.0));
    }

    #[test]
    fn rsi_stays_in_range() {
        let series = make_oscillating(300, 2000.0, 15.0);
        for v in rsi(&series.closes(), 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "rsi out of range: {}", v);
        }
    }

    #[test]
    fn ema_is_seeded_with_first_value() {
        let e = ema(&[10.0, 20.0], 3);
        assert_eq!(e[0], 10.0);
        // alpha = 0.5
        assert!((e[1] - 15.0).abs() < 1e-9);
    }

    #[test]
    fn bollinger_uses_sample_std() {
        let closes = [1.0, 2.0, 3.0, 4.0];
        let bb = bollinger(&closes, 4, 2.0);
        let last = bb[3].unwrap();
        // mean 2.5, sample std sqrt(5/3)
        let std = (5.0f64 / 3.0).sqrt();
        assert!((last.middle - 2.5).abs() < 1e-9);
        assert!((last.upper - (2.5 + 2.0 * std)).abs() < 1e-9);
        assert!((last.lower - (2.5 - 2.0 * std)).abs() < 1e-9);
    }

    #[test]
    fn flat_bands_put_price_in_the_middle() {
        let bb = bollinger(&[5.0; 25], 20, 2.0);
        assert_eq!(bb[24].unwrap().position, 0.5);
    }

    #[test]
    fn sub_signal_mappings() {
        assert_eq!(bb_signal(0.1), 1.0);
        assert_eq!(bb_signal(0.9), -1.0);
        assert!((bb_signal(0.5)).abs() < 1e-9);
        assert!((bb_signal(0.3) - 0.4).abs() < 1e-9);

        assert_eq!(rsi_signal(25.0), 1.0);
        assert_eq!(rsi_signal(75.0), -1.0);
        assert!((rsi_signal(40.0) - 0.5).abs() < 1e-9);

        assert_eq!(stochastic_signal(10.0), 1.0);
        assert_eq!(stochastic_signal(90.0), -1.0);
        assert!((stochastic_signal(35.0) - 0.5).abs() < 1e-9);

        assert_eq!(cci_signal(-150.0), 1.0);
        assert_eq!(cci_signal(150.0), -1.0);
        assert!((cci_signal(50.0) + 0.5).abs() < 1e-9);

        assert_eq!(macd_signal(0.01), 1.0);
        assert_eq!(macd_signal(0.0), -1.0);
    }

    #[test]
    fn atr_and_stochastic_on_flat_bars() {
        // Every flat bar spans 2.0 with no gaps.
        let series = make_flat(30, 100.0);
        assert!((last_some(&atr(&series, 14)).unwrap() - 2.0).abs() < 1e-9);
        let (k, d) = stochastic(&series, 14, 3, 3);
        assert_eq!(last_some(&k), Some(50.0));
        assert_eq!(last_some(&d), Some(50.0));
        assert_eq!(last_some(&cci(&series, 20)), Some(0.0));
    }

    #[test]
    fn adx_is_maximal_in_a_clean_trend() {
        let series = make_bullish_trend(60, 1000.0);
        let value = last_some(&adx(&series, 14)).unwrap();
        assert!((value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn short_window_yields_empty_snapshot() {
        let engine = IndicatorEngine::new();
        let snapshot = engine.compute(&make_bullish_trend(MIN_BARS - 1, 1000.0));
        assert!(snapshot.is_empty());
        assert!(snapshot.to_map().is_empty());
        assert!(engine.analyze(&make_bullish_trend(50, 1000.0)).is_none());
    }

    #[test]
    fn full_window_populates_every_indicator() {
        let engine = IndicatorEngine::new();
        let snapshot = engine.compute(&make_oscillating(MIN_BARS, 2000.0, 10.0));
        assert!(!snapshot.is_empty());
        let map = snapshot.to_map();
        for key in ["rsi_14", "macd_histogram", "bb_position", "atr", "stochastic_k", "cci", "adx", "sma_200", "pivot", "fib_61_8"] {
            assert!(map.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn uptrend_raises_technical_confidence() {
        let engine = IndicatorEngine::new();
        let view = engine.analyze(&make_bullish_trend(250, 1000.0)).unwrap();
        assert_eq!(view.trend, Trend::Uptrend);
        assert!((view.signal.confidence - 0.86).abs() < 1e-9);
        assert_eq!(view.signal.source, SignalSource::Technical);
        assert!(!view.support.is_empty());
        assert!(view.support.iter().all(|s| *s < view.current_price));

        let view = engine.analyze(&make_bearish_trend(250, 5000.0)).unwrap();
        assert_eq!(view.trend, Trend::Downtrend);
        assert!(view.sub_signals.aggregate().unwrap() <= 1.0);
    }

    #[test]
    fn sideways_market_uses_base_confidence() {
        let engine = IndicatorEngine::new();
        let view = engine.analyze(&make_flat(MIN_BARS, 100.0)).unwrap();
        assert_eq!(view.trend, Trend::Sideways);
        assert!((view.signal.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn strength_thresholds() {
        assert_eq!(strength_from_aggregate(0.6), SignalStrength::StrongBuy);
        assert_eq!(strength_from_aggregate(0.3), SignalStrength::Buy);
        assert_eq!(strength_from_aggregate(0.2), SignalStrength::Neutral);
        assert_eq!(strength_from_aggregate(-0.3), SignalStrength::Sell);
        assert_eq!(strength_from_aggregate(-0.6), SignalStrength::StrongSell);
    }
}
