use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::ports::TradeRecord;

/// Which leg of the wheel the user currently has open.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PositionLeg {
    None,
    ShortPut,
    ShortCall,
}

/// Current wheel position derived from the user's most recent trade record.
///
/// This engine only reads positions; trade booking downstream owns mutation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserPosition {
    pub leg: PositionLeg,
    pub strike_price: Option<f64>,
    pub expiration: Option<DateTime<Utc>>,
}

impl UserPosition {
    pub fn flat() -> Self {
        Self {
            leg: PositionLeg::None,
            strike_price: None,
            expiration: None,
        }
    }
}

/// Derive the wheel leg from the latest trade record, if any.
///
/// Trade types are free-form strings from the trade store; anything
/// containing "PUT" or "CALL" (case-insensitive) maps to the matching short
/// leg, everything else to no position.
pub fn position_from_trade(trade: Option<&TradeRecord>) -> UserPosition {
    let Some(trade) = trade else {
        return UserPosition::flat();
    };

    let trade_type = trade.trade_type.to_uppercase();
    let leg = if trade_type.contains("PUT") {
        PositionLeg::ShortPut
    } else if trade_type.contains("CALL") {
        PositionLeg::ShortCall
    } else {
        PositionLeg::None
    };

    if leg == PositionLeg::None {
        return UserPosition::flat();
    }

    UserPosition {
        leg,
        strike_price: trade.strike_price,
        expiration: trade.expiration_date,
    }
}

/// Whether the open leg would be assigned at the current spot price.
///
/// A short put fills when spot is at or below the strike; a short call when
/// spot is at or above it. A position without a strike never fills.
pub fn will_be_filled(position: &UserPosition, spot: f64) -> bool {
    let Some(strike) = position.strike_price else {
        return false;
    };
    match position.leg {
        PositionLeg::ShortPut => spot <= strike,
        PositionLeg::ShortCall => spot >= strike,
        PositionLeg::None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn trade(trade_type: &str, strike: Option<f64>) -> TradeRecord {
        TradeRecord {
            user_id: Uuid::new_v4(),
            trade_type: trade_type.to_string(),
            strike_price: strike,
            expiration_date: None,
        }
    }

    #[test]
    fn no_trade_means_flat() {
        let pos = position_from_trade(None);
        assert_eq!(pos.leg, PositionLeg::None);
        assert!(!will_be_filled(&pos, 30_000.0));
    }

    #[test]
    fn trade_type_substring_maps_leg() {
        let put = position_from_trade(Some(&trade("SELL_PUT", Some(30_000.0))));
        assert_eq!(put.leg, PositionLeg::ShortPut);

        let call = position_from_trade(Some(&trade("covered_call", Some(31_000.0))));
        assert_eq!(call.leg, PositionLeg::ShortCall);

        let other = position_from_trade(Some(&trade("deposit", None)));
        assert_eq!(other.leg, PositionLeg::None);
    }

    #[test]
    fn short_put_fills_at_or_below_strike() {
        let pos = position_from_trade(Some(&trade("SELL_PUT", Some(30_000.0))));
        assert!(will_be_filled(&pos, 29_000.0));
        assert!(will_be_filled(&pos, 30_000.0));
        assert!(!will_be_filled(&pos, 30_001.0));
    }

    #[test]
    fn short_call_fills_at_or_above_strike() {
        let pos = position_from_trade(Some(&trade("SELL_CALL", Some(30_000.0))));
        assert!(will_be_filled(&pos, 31_000.0));
        assert!(will_be_filled(&pos, 30_000.0));
        assert!(!will_be_filled(&pos, 29_999.0));
    }

    #[test]
    fn missing_strike_never_fills() {
        let pos = position_from_trade(Some(&trade("SELL_PUT", None)));
        assert!(!will_be_filled(&pos, 0.0));
    }
}
