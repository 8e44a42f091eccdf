use serde::{Deserialize, Serialize};

pub mod candidates;
pub mod decision;
pub mod position;

pub use candidates::{HeuristicPremiumEstimator, PremiumEstimator, StrikeCandidate};
pub use decision::{DecisionAction, DecisionParams, TradingDecision};
pub use position::{PositionLeg, UserPosition};

use crate::indicators::{self, BollingerPosition, MacdTrend};

/// Normalized snapshot of the underlying market for one engine run.
///
/// `price_history` holds the most recent period closes, oldest first. All
/// users in a run are evaluated against the same snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub volume_24h: f64,
    pub price_history: Vec<f64>,
}

/// Derived technical picture for one run. Immutable; recomputed every
/// invocation and never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub price: f64,
    /// RSI in [0, 100]; 50 when history is too short.
    pub rsi: f64,
    pub macd_trend: MacdTrend,
    pub bollinger_position: BollingerPosition,
    /// Pivot s1, surfaced as support.
    pub support: f64,
    /// Pivot r1, surfaced as resistance.
    pub resistance: f64,
    /// Annualized volatility as a percentage, non-negative.
    pub volatility_24h: f64,
}

/// Compute the full technical picture from a snapshot.
///
/// Insufficient history degrades to neutral defaults (RSI 50, MACD neutral,
/// volatility 0) rather than failing; the strike ladder still runs on the
/// floor premium in that case.
pub fn analyze(snapshot: &MarketSnapshot) -> TechnicalAnalysis {
    let prices = &snapshot.price_history;

    let rsi = indicators::rsi(prices, indicators::RSI_PERIOD);
    let macd_trend = indicators::macd_trend(prices);

    let (upper, middle, lower) = indicators::bollinger_bands(
        prices,
        indicators::BOLLINGER_PERIOD,
        indicators::BOLLINGER_STD_DEV,
    );
    let bollinger_position = indicators::bollinger_position(snapshot.price, upper, middle, lower);

    let pivots = indicators::pivot_points(snapshot.high_24h, snapshot.low_24h, snapshot.price);
    let volatility_24h = indicators::annualized_volatility(prices);

    TechnicalAnalysis {
        price: snapshot.price,
        rsi,
        macd_trend,
        bollinger_position,
        support: pivots.s1,
        resistance: pivots.r1,
        volatility_24h,
    }
}
