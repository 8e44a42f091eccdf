use serde::{Deserialize, Serialize};

/// Default RSI lookback (transitions, not samples).
pub const RSI_PERIOD: usize = 14;
/// Default Bollinger window and band width.
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;

/// MACD trend classification derived from the histogram sign.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MacdTrend {
    Bullish,
    Bearish,
    Neutral,
}

/// Where the current price sits relative to the Bollinger bands.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BollingerPosition {
    Upper,
    Middle,
    Lower,
}

/// Classic single-period pivot levels. Only s1/r1 are surfaced as
/// support/resistance by the strategy layer; the rest are kept for logging.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PivotLevels {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub s1: f64,
    pub s2: f64,
}

/// Relative Strength Index over the last `period` price transitions.
///
/// Uses the simple average of up-moves and down-moves (not Wilder smoothing).
/// Returns 50.0 when fewer than `period + 1` samples are available and 100.0
/// when there are no down-moves in the window. Output is in [0, 100] by
/// construction.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let window = &prices[prices.len() - (period + 1)..];
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for pair in window.windows(2) {
        let delta = pair[1] - pair[0];
        if delta >= 0.0 {
            gain_sum += delta;
        } else {
            loss_sum += -delta;
        }
    }

    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Exponential moving average seeded with the first element,
/// smoothing factor `k = 2 / (period + 1)`.
pub fn ema(prices: &[f64], period: usize) -> f64 {
    let mut series = ema_series(prices, period);
    series.pop().unwrap_or(0.0)
}

/// Pointwise EMA series over the whole input (same seeding as `ema`).
fn ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = prices.first() else {
        return Vec::new();
    };
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(prices.len());
    let mut value = first;
    out.push(value);
    for &price in &prices[1..] {
        value = price * k + value * (1.0 - k);
        out.push(value);
    }
    out
}

/// MACD(12, 26) with a 9-period signal line computed over the rolling MACD
/// series. Returns `(macd, signal, histogram)`; `Neutral` classification with
/// zeroed components when fewer than 27 samples are supplied.
pub fn macd(prices: &[f64]) -> (f64, f64, f64) {
    if prices.len() < 27 {
        return (0.0, 0.0, 0.0);
    }

    let fast = ema_series(prices, 12);
    let slow = ema_series(prices, 26);
    let macd_line: Vec<f64> = fast
        .iter()
        .zip(slow.iter())
        .map(|(f, s)| f - s)
        .collect();

    let signal = ema(&macd_line, 9);
    let macd_value = *macd_line.last().unwrap_or(&0.0);
    let histogram = macd_value - signal;

    (macd_value, signal, histogram)
}

/// Classify the MACD histogram into a trend.
pub fn macd_trend(prices: &[f64]) -> MacdTrend {
    let (macd_value, signal, histogram) = macd(prices);
    if histogram > 0.0 && macd_value > signal {
        MacdTrend::Bullish
    } else if histogram < 0.0 && macd_value < signal {
        MacdTrend::Bearish
    } else {
        MacdTrend::Neutral
    }
}

/// Bollinger bands over the last `period` closes: `(upper, middle, lower)`.
///
/// Middle is the simple mean, band width is `mult` population standard
/// deviations. Shorter series use whatever window is available.
pub fn bollinger_bands(prices: &[f64], period: usize, mult: f64) -> (f64, f64, f64) {
    if prices.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let window = if prices.len() < period {
        prices
    } else {
        &prices[prices.len() - period..]
    };

    let middle = window.iter().sum::<f64>() / window.len() as f64;
    let variance = window
        .iter()
        .map(|p| (p - middle).powi(2))
        .sum::<f64>()
        / window.len() as f64;
    let std_dev = variance.sqrt();

    (middle + mult * std_dev, middle, middle - mult * std_dev)
}

/// Classify where `price` sits between the bands.
///
/// Boundary-inclusive: a price exactly on the upper (lower) band classifies
/// as `Upper` (`Lower`). The 20% shoulder keeps near-band prices out of the
/// `Middle` bucket.
pub fn bollinger_position(price: f64, upper: f64, middle: f64, lower: f64) -> BollingerPosition {
    if price >= upper - 0.2 * (upper - middle) {
        BollingerPosition::Upper
    } else if price <= lower + 0.2 * (middle - lower) {
        BollingerPosition::Lower
    } else {
        BollingerPosition::Middle
    }
}

/// Classic floor-trader pivot points for a single period.
pub fn pivot_points(high: f64, low: f64, close: f64) -> PivotLevels {
    let pivot = (high + low + close) / 3.0;
    PivotLevels {
        pivot,
        r1: 2.0 * pivot - low,
        r2: pivot + (high - low),
        s1: 2.0 * pivot - high,
        s2: pivot - (high - low),
    }
}

/// Annualized volatility of the series as a percentage.
///
/// Log returns over the full window, population standard deviation,
/// annualized with sqrt(365). Returns 0.0 for fewer than two samples.
pub fn annualized_volatility(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = prices
        .windows(2)
        .filter(|pair| pair[0] > 0.0 && pair[1] > 0.0)
        .map(|pair| (pair[1] / pair[0]).ln())
        .collect();
    if returns.is_empty() {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / returns.len() as f64;

    variance.sqrt() * 365.0_f64.sqrt() * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: f64, step: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn rsi_neutral_on_short_series() {
        assert_eq!(rsi(&[100.0, 101.0, 102.0], RSI_PERIOD), 50.0);
        assert_eq!(rsi(&[], RSI_PERIOD), 50.0);
    }

    #[test]
    fn rsi_bounds() {
        let up = ramp(100.0, 1.0, 20);
        assert_eq!(rsi(&up, RSI_PERIOD), 100.0);

        let down = ramp(100.0, -1.0, 20);
        let v = rsi(&down, RSI_PERIOD);
        assert!((0.0..=100.0).contains(&v));
        assert!(v < 1e-9);

        // Mixed series stays strictly inside the bounds.
        let mixed: Vec<f64> = (0..30)
            .map(|i| 100.0 + if i % 2 == 0 { 1.5 } else { -1.0 })
            .collect();
        let v = rsi(&mixed, RSI_PERIOD);
        assert!(v > 0.0 && v < 100.0);
    }

    #[test]
    fn ema_seeds_with_first_element() {
        assert!((ema(&[42.0], 10) - 42.0).abs() < 1e-12);
        // k = 2/3 for period 2: 10 -> 10*(1/3) + 13*(2/3) = 12.0
        assert!((ema(&[10.0, 13.0], 2) - 12.0).abs() < 1e-12);
    }

    #[test]
    fn macd_neutral_on_short_series() {
        let prices = ramp(100.0, 1.0, 26);
        assert_eq!(macd_trend(&prices), MacdTrend::Neutral);
    }

    #[test]
    fn macd_trend_follows_direction() {
        // Steady uptrend: fast EMA above slow, histogram positive once the
        // signal lags the widening spread.
        let up: Vec<f64> = (0..60).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        assert_eq!(macd_trend(&up), MacdTrend::Bullish);

        // An accelerating decline keeps the MACD line falling below its
        // lagging signal.
        let down: Vec<f64> = (0..60).map(|i| 1_000.0 - 0.2 * (i as f64).powi(2)).collect();
        assert_eq!(macd_trend(&down), MacdTrend::Bearish);

        // A geometric decay is different: the absolute moves shrink, so the
        // MACD line rises toward zero ahead of its signal and the histogram
        // reads the fading momentum as bullish.
        let decay: Vec<f64> = (0..60).map(|i| 100.0 * 0.99_f64.powi(i)).collect();
        assert_eq!(macd_trend(&decay), MacdTrend::Bullish);
    }

    #[test]
    fn bollinger_boundaries_inclusive() {
        let prices = vec![
            98.0, 99.0, 100.0, 101.0, 102.0, 98.0, 99.0, 100.0, 101.0, 102.0, 98.0, 99.0, 100.0,
            101.0, 102.0, 98.0, 99.0, 100.0, 101.0, 102.0,
        ];
        let (upper, middle, lower) = bollinger_bands(&prices, BOLLINGER_PERIOD, BOLLINGER_STD_DEV);
        assert!(upper > middle && middle > lower);

        assert_eq!(
            bollinger_position(upper, upper, middle, lower),
            BollingerPosition::Upper
        );
        assert_eq!(
            bollinger_position(lower, upper, middle, lower),
            BollingerPosition::Lower
        );
        assert_eq!(
            bollinger_position(middle, upper, middle, lower),
            BollingerPosition::Middle
        );
    }

    #[test]
    fn pivot_formula() {
        let levels = pivot_points(110.0, 90.0, 100.0);
        assert!((levels.pivot - 100.0).abs() < 1e-12);
        assert!((levels.r1 - 110.0).abs() < 1e-12);
        assert!((levels.s1 - 90.0).abs() < 1e-12);
        assert!((levels.r2 - 120.0).abs() < 1e-12);
        assert!((levels.s2 - 80.0).abs() < 1e-12);
    }

    #[test]
    fn volatility_zero_for_flat_series() {
        let flat = vec![100.0; 30];
        assert_eq!(annualized_volatility(&flat), 0.0);
        assert_eq!(annualized_volatility(&[100.0]), 0.0);
    }

    #[test]
    fn volatility_non_negative_and_scales() {
        let calm: Vec<f64> = (0..48).map(|i| 100.0 + (i % 2) as f64 * 0.1).collect();
        let wild: Vec<f64> = (0..48).map(|i| 100.0 + (i % 2) as f64 * 5.0).collect();
        let calm_vol = annualized_volatility(&calm);
        let wild_vol = annualized_volatility(&wild);
        assert!(calm_vol >= 0.0);
        assert!(wild_vol > calm_vol);
    }
}
