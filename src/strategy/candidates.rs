use serde::{Deserialize, Serialize};

use crate::utils::math::round_to_strike;

/// Fixed ladder of put-strike offsets evaluated each run, in percent below
/// spot.
pub const STRIKE_OFFSETS_PCT: [f64; 5] = [-1.0, -2.0, -3.0, -3.5, -5.0];

/// Floor for estimated premium, in percent of capital.
pub const PREMIUM_FLOOR_PCT: f64 = 0.05;

/// One evaluated strike. Ephemeral: recomputed per run, ranked and discarded.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StrikeCandidate {
    /// Offset from spot in percent; negative means below spot.
    pub offset_pct: f64,
    pub strike_price: f64,
    pub estimated_premium_pct: f64,
    pub score: f64,
}

/// Premium estimation seam so the heuristic below can be swapped for a real
/// pricing model without touching decision logic.
pub trait PremiumEstimator: Send + Sync {
    /// Estimated premium in percent of capital for selling at `strike`
    /// against `spot`, given annualized volatility in percent.
    fn premium_pct(&self, strike: f64, spot: f64, volatility_pct: f64) -> f64;
}

/// Heuristic stand-in for an options premium: moneyness scaled by the
/// volatility factor, floored. NOT a pricing model (no time value, no rates,
/// no smile); accuracy is an explicit non-goal.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicPremiumEstimator;

impl PremiumEstimator for HeuristicPremiumEstimator {
    fn premium_pct(&self, strike: f64, spot: f64, volatility_pct: f64) -> f64 {
        let moneyness = (strike - spot).abs() / spot;
        let volatility_factor = volatility_pct / 100.0;
        (moneyness * volatility_factor * 1000.0).max(PREMIUM_FLOOR_PCT)
    }
}

/// Evaluate the full ladder against spot, sorted descending by score.
///
/// Strikes are rounded to the nearest 100 currency units. The score trades
/// premium against distance from spot: far strikes earn less even when the
/// raw premium estimate is higher.
pub fn evaluate_candidates(
    spot: f64,
    volatility_pct: f64,
    estimator: &dyn PremiumEstimator,
) -> Vec<StrikeCandidate> {
    let mut candidates: Vec<StrikeCandidate> = STRIKE_OFFSETS_PCT
        .iter()
        .map(|&offset_pct| {
            let strike_price = round_to_strike(spot * (1.0 + offset_pct / 100.0));
            let estimated_premium_pct = estimator.premium_pct(strike_price, spot, volatility_pct);
            let distance_penalty = (strike_price - spot).abs() / spot * 0.3;
            StrikeCandidate {
                offset_pct,
                strike_price,
                estimated_premium_pct,
                score: estimated_premium_pct * (1.0 - distance_penalty),
            }
        })
        .collect();

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}
