use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::engine::ports::TradeRecord;
use crate::insurance::InsuranceCoveragePeriod;

/// Row model for the trade store this engine reads positions from.
///
/// The expected schema (created via migrations, owned by trade booking) is:
/// ```sql
/// CREATE TABLE IF NOT EXISTS trades (
///   id              UUID PRIMARY KEY,
///   user_id         UUID        NOT NULL,
///   trade_type      TEXT        NOT NULL,
///   strike_price    DOUBLE PRECISION,
///   expiration_date TIMESTAMPTZ,
///   created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradeRow {
    pub user_id: Uuid,
    pub trade_type: String,
    pub strike_price: Option<f64>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl From<TradeRow> for TradeRecord {
    fn from(row: TradeRow) -> Self {
        Self {
            user_id: row.user_id,
            trade_type: row.trade_type,
            strike_price: row.strike_price,
            expiration_date: row.expiration_date,
        }
    }
}

/// Row model for insurance coverage periods.
///
/// The expected schema is:
/// ```sql
/// CREATE TABLE IF NOT EXISTS insurance_coverage_periods (
///   id                        UUID PRIMARY KEY,
///   user_id                   UUID        NOT NULL,
///   config_id                 UUID        NOT NULL,
///   start_date                TIMESTAMPTZ NOT NULL,
///   end_date                  TIMESTAMPTZ,
///   base_capital              DOUBLE PRECISION NOT NULL,
///   days_covered              INTEGER     NOT NULL,
///   total_premium_accumulated DOUBLE PRECISION NOT NULL,
///   is_active                 BOOLEAN     NOT NULL,
///   payable                   BOOLEAN     NOT NULL
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InsuranceCoveragePeriodRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub config_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub base_capital: f64,
    pub days_covered: i32,
    pub total_premium_accumulated: f64,
    pub is_active: bool,
    pub payable: bool,
}

impl From<InsuranceCoveragePeriodRow> for InsuranceCoveragePeriod {
    fn from(row: InsuranceCoveragePeriodRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            config_id: row.config_id,
            start_date: row.start_date,
            end_date: row.end_date,
            base_capital: row.base_capital,
            days_covered: row.days_covered,
            total_premium_accumulated: row.total_premium_accumulated,
            is_active: row.is_active,
            payable: row.payable,
        }
    }
}

impl From<&InsuranceCoveragePeriod> for InsuranceCoveragePeriodRow {
    fn from(p: &InsuranceCoveragePeriod) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            config_id: p.config_id,
            start_date: p.start_date,
            end_date: p.end_date,
            base_capital: p.base_capital,
            days_covered: p.days_covered,
            total_premium_accumulated: p.total_premium_accumulated,
            is_active: p.is_active,
            payable: p.payable,
        }
    }
}

/// Row model for active wheel configurations, the per-run unit of work.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS wheel_configs (
///   id       UUID PRIMARY KEY,
///   user_id  UUID             NOT NULL,
///   capital  DOUBLE PRECISION NOT NULL,
///   is_active BOOLEAN         NOT NULL DEFAULT true
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WheelConfigRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub capital: f64,
}
