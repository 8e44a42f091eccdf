use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::insurance::InsuranceCoveragePeriod;
use crate::strategy::{MarketSnapshot, TradingDecision};

/// Most recent trade on record for a user, as provided by the trade store.
/// `trade_type` is a free-form string; see `strategy::position` for mapping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradeRecord {
    pub user_id: Uuid,
    pub trade_type: String,
    pub strike_price: Option<f64>,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Per-user wheel configuration: the unit of work for one engine run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WheelConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Base capital in quote currency; drives insurance accrual.
    pub capital: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

/// Message queued for the downstream notification sender.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: Uuid,
    pub priority: NotificationPriority,
    pub body: String,
    pub scheduled_at: DateTime<Utc>,
}

/// Per-user outcome collected into the run result list. A failure for one
/// user never aborts the others.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UserOutcome {
    Success {
        action: crate::strategy::DecisionAction,
        premium_pct: f64,
    },
    Error {
        error: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRunResult {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub outcome: UserOutcome,
}

/// Blocking external call shared by all users; fetched once per run, before
/// fan-out. Failure is fatal to the whole run.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_snapshot(&self) -> anyhow::Result<MarketSnapshot>;
}

#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Most recent trade for the user, if any.
    async fn latest_trade(&self, user_id: Uuid) -> anyhow::Result<Option<TradeRecord>>;
}

#[async_trait]
pub trait DecisionRepository: Send + Sync {
    async fn record_decision(
        &self,
        user_id: Uuid,
        decision: &TradingDecision,
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait BillingRepository: Send + Sync {
    /// Whether the user has a paid insurance status for the calendar month
    /// (key format `YYYY-MM`). Unpaid users are skipped before any
    /// position work.
    async fn is_paid_for_month(&self, user_id: Uuid, month: &str) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait InsuranceCoverageRepository: Send + Sync {
    /// The active coverage period for the (user, config) pair, if one exists.
    async fn active_period(
        &self,
        user_id: Uuid,
        config_id: Uuid,
    ) -> anyhow::Result<Option<InsuranceCoveragePeriod>>;

    async fn insert_period(&self, period: &InsuranceCoveragePeriod) -> anyhow::Result<()>;

    async fn update_period(&self, period: &InsuranceCoveragePeriod) -> anyhow::Result<()>;
}

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    async fn enqueue(&self, notification: &Notification) -> anyhow::Result<()>;
}
