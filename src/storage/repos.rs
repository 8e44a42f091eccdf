use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, Pool, Postgres};
use uuid::Uuid;

use crate::engine::ports::{
    BillingRepository, DecisionRepository, InsuranceCoverageRepository, PositionRepository,
    TradeRecord, WheelConfig,
};
use crate::insurance::InsuranceCoveragePeriod;
use crate::storage::models::{InsuranceCoveragePeriodRow, TradeRow, WheelConfigRow};
use crate::strategy::TradingDecision;

/// Postgres-backed position reads (`trades` table, latest per user).
pub struct PgPositionRepository {
    pool: Pool<Postgres>,
}

impl PgPositionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PositionRepository for PgPositionRepository {
    async fn latest_trade(&self, user_id: Uuid) -> anyhow::Result<Option<TradeRecord>> {
        let row: Option<TradeRow> = query_as(
            "SELECT user_id, trade_type, strike_price, expiration_date \
             FROM trades WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TradeRecord::from))
    }
}

/// Postgres-backed decision persistence.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS trading_decisions (
///   id                   UUID PRIMARY KEY,
///   user_id              UUID        NOT NULL,
///   action               TEXT        NOT NULL,
///   strike_price         DOUBLE PRECISION,
///   expected_premium_pct DOUBLE PRECISION NOT NULL,
///   confidence           DOUBLE PRECISION NOT NULL,
///   reasoning            TEXT        NOT NULL,
///   created_at           TIMESTAMPTZ NOT NULL
/// );
/// ```
pub struct PgDecisionRepository {
    pool: Pool<Postgres>,
}

impl PgDecisionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DecisionRepository for PgDecisionRepository {
    async fn record_decision(
        &self,
        user_id: Uuid,
        decision: &TradingDecision,
    ) -> anyhow::Result<()> {
        query(
            "INSERT INTO trading_decisions \
             (id, user_id, action, strike_price, expected_premium_pct, confidence, reasoning, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(decision.action.as_str())
        .bind(decision.strike_price)
        .bind(decision.expected_premium_pct)
        .bind(decision.confidence)
        .bind(&decision.reasoning)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Postgres-backed monthly billing lookups (`insurance_payments` table).
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS insurance_payments (
///   user_id UUID NOT NULL,
///   month   TEXT NOT NULL,  -- 'YYYY-MM'
///   paid    BOOLEAN NOT NULL,
///   PRIMARY KEY (user_id, month)
/// );
/// ```
pub struct PgBillingRepository {
    pool: Pool<Postgres>,
}

impl PgBillingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingRepository for PgBillingRepository {
    async fn is_paid_for_month(&self, user_id: Uuid, month: &str) -> anyhow::Result<bool> {
        let paid: Option<(bool,)> = query_as(
            "SELECT paid FROM insurance_payments WHERE user_id = $1 AND month = $2",
        )
        .bind(user_id)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;

        Ok(paid.map(|(p,)| p).unwrap_or(false))
    }
}

/// Postgres-backed coverage period upserts (`insurance_coverage_periods`).
pub struct PgInsuranceCoverageRepository {
    pool: Pool<Postgres>,
}

impl PgInsuranceCoverageRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InsuranceCoverageRepository for PgInsuranceCoverageRepository {
    async fn active_period(
        &self,
        user_id: Uuid,
        config_id: Uuid,
    ) -> anyhow::Result<Option<InsuranceCoveragePeriod>> {
        let row: Option<InsuranceCoveragePeriodRow> = query_as(
            "SELECT id, user_id, config_id, start_date, end_date, base_capital, \
                    days_covered, total_premium_accumulated, is_active, payable \
             FROM insurance_coverage_periods \
             WHERE user_id = $1 AND config_id = $2 AND is_active = true \
             ORDER BY start_date DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(config_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(InsuranceCoveragePeriod::from))
    }

    async fn insert_period(&self, period: &InsuranceCoveragePeriod) -> anyhow::Result<()> {
        let row = InsuranceCoveragePeriodRow::from(period);
        query(
            "INSERT INTO insurance_coverage_periods \
             (id, user_id, config_id, start_date, end_date, base_capital, \
              days_covered, total_premium_accumulated, is_active, payable) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.config_id)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.base_capital)
        .bind(row.days_covered)
        .bind(row.total_premium_accumulated)
        .bind(row.is_active)
        .bind(row.payable)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_period(&self, period: &InsuranceCoveragePeriod) -> anyhow::Result<()> {
        let row = InsuranceCoveragePeriodRow::from(period);
        query(
            "UPDATE insurance_coverage_periods \
             SET end_date = $2, days_covered = $3, total_premium_accumulated = $4, \
                 is_active = $5, payable = $6 \
             WHERE id = $1",
        )
        .bind(row.id)
        .bind(row.end_date)
        .bind(row.days_covered)
        .bind(row.total_premium_accumulated)
        .bind(row.is_active)
        .bind(row.payable)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Load the active wheel configs to process in a run.
pub async fn load_active_configs(pool: &Pool<Postgres>) -> anyhow::Result<Vec<WheelConfig>> {
    let rows: Vec<WheelConfigRow> = query_as(
        "SELECT id, user_id, capital FROM wheel_configs WHERE is_active = true",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| WheelConfig {
            id: r.id,
            user_id: r.user_id,
            capital: r.capital,
        })
        .collect())
}
