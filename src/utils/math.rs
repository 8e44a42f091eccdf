/// Granularity for ladder strike prices, in quote currency.
pub const STRIKE_STEP: f64 = 100.0;

/// Round a raw strike to the nearest `STRIKE_STEP`.
///
/// Only ladder strikes are rounded; rotation strikes after an assignment are
/// quoted raw.
pub fn round_to_strike(price: f64) -> f64 {
    (price / STRIKE_STEP).round() * STRIKE_STEP
}

/// Naive implied APY for a per-cycle premium percentage, assuming the
/// premium could be collected daily all year.
pub fn implied_apy_pct(premium_pct: f64) -> f64 {
    premium_pct * 365.0
}
