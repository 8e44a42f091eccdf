use serde::{Deserialize, Serialize};

use crate::indicators::{BollingerPosition, MacdTrend};
use crate::strategy::{
    candidates::{evaluate_candidates, PremiumEstimator, StrikeCandidate},
    position::{will_be_filled, PositionLeg, UserPosition},
    TechnicalAnalysis,
};
use crate::types::EngineConfig;
use crate::utils::math::implied_apy_pct;

/// Action emitted by the decision engine, one per user per run.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    SellPut,
    SellCall,
    Hold,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::SellPut => "SELL_PUT",
            DecisionAction::SellCall => "SELL_CALL",
            DecisionAction::Hold => "HOLD",
        }
    }
}

/// The engine's sole persisted output per user per run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradingDecision {
    pub action: DecisionAction,
    pub strike_price: Option<f64>,
    pub expected_premium_pct: f64,
    /// In [0, 1].
    pub confidence: f64,
    pub reasoning: String,
}

impl TradingDecision {
    /// A HOLD is the only decision that activates insurance accrual.
    pub fn activates_insurance(&self) -> bool {
        self.action == DecisionAction::Hold
    }
}

/// Tunable decision parameters, derived from high-level engine config.
#[derive(Clone, Debug)]
pub struct DecisionParams {
    /// Premium below this (in percent of capital) means HOLD + insurance.
    pub min_premium_pct: f64,
    /// Covered-call strike offset above spot after a put assignment.
    pub covered_call_offset_pct: f64,
    /// Re-entry put strike offset below spot after a call assignment.
    pub reentry_put_offset_pct: f64,
    /// Fixed confidence for rotation decisions after an assignment.
    pub rotation_confidence: f64,
}

impl Default for DecisionParams {
    fn default() -> Self {
        Self {
            min_premium_pct: 0.10,
            covered_call_offset_pct: 3.5,
            reentry_put_offset_pct: 3.5,
            rotation_confidence: 0.85,
        }
    }
}

impl From<&EngineConfig> for DecisionParams {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            min_premium_pct: cfg.min_premium_pct,
            covered_call_offset_pct: cfg.covered_call_offset_pct,
            reentry_put_offset_pct: cfg.reentry_put_offset_pct,
            rotation_confidence: cfg.rotation_confidence,
        }
    }
}

/// Evaluate one user against the shared technical picture.
///
/// Priority order: position rotation after an assignment, then the strike
/// ladder with indicator preference filters, then the low-premium HOLD
/// fallback. Stateless: the wheel leg is derived fresh from the position
/// every run.
pub fn decide(
    analysis: &TechnicalAnalysis,
    position: &UserPosition,
    params: &DecisionParams,
    estimator: &dyn PremiumEstimator,
) -> TradingDecision {
    let spot = analysis.price;

    if will_be_filled(position, spot) {
        match position.leg {
            PositionLeg::ShortPut => {
                // Assigned the underlying; rotate into a covered call above spot.
                let strike = spot * (1.0 + params.covered_call_offset_pct / 100.0);
                let premium = estimator.premium_pct(strike, spot, analysis.volatility_24h);
                return TradingDecision {
                    action: DecisionAction::SellCall,
                    strike_price: Some(strike),
                    expected_premium_pct: premium,
                    confidence: params.rotation_confidence,
                    reasoning: format!(
                        "Short put {:.0} assigned at spot {:.0}; now holding the underlying. \
                         Selling covered call at {:.0} ({}% above spot) for ~{:.2}% premium.",
                        position.strike_price.unwrap_or(0.0),
                        spot,
                        strike,
                        params.covered_call_offset_pct,
                        premium,
                    ),
                };
            }
            PositionLeg::ShortCall => {
                // Called away; re-enter the wheel with a put below spot.
                let strike = spot * (1.0 - params.reentry_put_offset_pct / 100.0);
                let premium = estimator.premium_pct(strike, spot, analysis.volatility_24h);
                return TradingDecision {
                    action: DecisionAction::SellPut,
                    strike_price: Some(strike),
                    expected_premium_pct: premium,
                    confidence: params.rotation_confidence,
                    reasoning: format!(
                        "Short call {:.0} assigned at spot {:.0}; underlying sold. \
                         Re-entering with short put at {:.0} ({}% below spot) for ~{:.2}% premium.",
                        position.strike_price.unwrap_or(0.0),
                        spot,
                        strike,
                        params.reentry_put_offset_pct,
                        premium,
                    ),
                };
            }
            PositionLeg::None => {}
        }
    }

    let ladder = evaluate_candidates(spot, analysis.volatility_24h, estimator);
    let mut pool = apply_preference_filters(&ladder, analysis);
    pool.sort_by(|a, b| b.score.total_cmp(&a.score));

    // Non-empty by the filter fallback rule; the ladder itself is never empty.
    let best = pool[0];
    let alternatives = describe_alternatives(&pool);

    if best.estimated_premium_pct < params.min_premium_pct {
        return TradingDecision {
            action: DecisionAction::Hold,
            strike_price: None,
            expected_premium_pct: best.estimated_premium_pct,
            confidence: 0.95,
            reasoning: format!(
                "Best premium {:.2}% is below the {:.2}% threshold; holding. \
                 Evaluated: {}. Guaranteed-minimum coverage accrues for today.",
                best.estimated_premium_pct, params.min_premium_pct, alternatives,
            ),
        };
    }

    let confidence = sell_put_confidence(analysis, best.score);
    let implied_apy = implied_apy_pct(best.estimated_premium_pct);

    TradingDecision {
        action: DecisionAction::SellPut,
        strike_price: Some(best.strike_price),
        expected_premium_pct: best.estimated_premium_pct,
        confidence,
        reasoning: format!(
            "Selling put at {:.0} ({:+.1}% from spot {:.0}) for ~{:.2}% premium \
             (implied APY {:.1}%). Alternatives: {}.",
            best.strike_price,
            best.offset_pct,
            spot,
            best.estimated_premium_pct,
            implied_apy,
            alternatives,
        ),
    }
}

/// Narrow the ladder by indicator-driven preferences.
///
/// Filters apply in a fixed order and each is skipped if it would empty the
/// pool, so the result is never empty.
fn apply_preference_filters(
    ladder: &[StrikeCandidate],
    analysis: &TechnicalAnalysis,
) -> Vec<StrikeCandidate> {
    let mut pool: Vec<StrikeCandidate> = ladder.to_vec();

    // Oversold: stand further from spot.
    if analysis.rsi < 35.0 {
        retain_if_nonempty(&mut pool, |c| c.offset_pct <= -3.0);
    }
    // Overbought: strikes closer to spot are acceptable.
    if analysis.rsi > 65.0 {
        retain_if_nonempty(&mut pool, |c| c.offset_pct >= -3.0);
    }
    // Bearish momentum at the top of the band: back off.
    if analysis.macd_trend == MacdTrend::Bearish
        && analysis.bollinger_position == BollingerPosition::Upper
    {
        retain_if_nonempty(&mut pool, |c| c.offset_pct <= -2.5);
    }
    // Bullish momentum at the bottom: lean in.
    if analysis.macd_trend == MacdTrend::Bullish
        && analysis.bollinger_position == BollingerPosition::Lower
    {
        retain_if_nonempty(&mut pool, |c| c.offset_pct >= -3.5);
    }

    pool
}

fn retain_if_nonempty<F>(pool: &mut Vec<StrikeCandidate>, keep: F)
where
    F: Fn(&StrikeCandidate) -> bool,
{
    let narrowed: Vec<StrikeCandidate> = pool.iter().copied().filter(|c| keep(c)).collect();
    if !narrowed.is_empty() {
        *pool = narrowed;
    }
}

/// Confidence for a fresh SELL_PUT, capped at 0.95.
fn sell_put_confidence(analysis: &TechnicalAnalysis, score: f64) -> f64 {
    let mut confidence: f64 = 0.7;
    if analysis.rsi < 40.0 || analysis.rsi > 60.0 {
        confidence += 0.1;
    }
    if analysis.macd_trend != MacdTrend::Neutral {
        confidence += 0.05;
    }
    if analysis.volatility_24h < 50.0 {
        confidence += 0.1;
    }
    if score > 0.10 {
        confidence += 0.05;
    }
    confidence.min(0.95)
}

/// Top-3 strikes of the (already sorted) pool for transparent reasoning.
fn describe_alternatives(pool: &[StrikeCandidate]) -> String {
    pool.iter()
        .take(3)
        .map(|c| format!("{:.0} ({:.2}%)", c.strike_price, c.estimated_premium_pct))
        .collect::<Vec<_>>()
        .join(", ")
}
