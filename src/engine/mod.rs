pub mod ports;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::insurance::{InsuranceCoverageManager, InsuranceParams};
use crate::monitoring::metrics::METRICS;
use crate::strategy::{
    self, decision::decide, position::position_from_trade, DecisionAction, DecisionParams,
    PremiumEstimator, TechnicalAnalysis, TradingDecision,
};
use crate::utils::time::month_key;

use ports::{
    BillingRepository, DecisionRepository, InsuranceCoverageRepository, MarketDataSource,
    Notification, NotificationPriority, NotificationQueue, PositionRepository, UserOutcome,
    UserRunResult, WheelConfig,
};

/// Collaborator ports wired together for one engine run. The engine itself
/// is pure given these; tests swap in in-memory implementations.
pub struct EnginePorts<'a> {
    pub market: &'a dyn MarketDataSource,
    pub positions: &'a dyn PositionRepository,
    pub decisions: &'a dyn DecisionRepository,
    pub billing: &'a dyn BillingRepository,
    pub coverage: &'a dyn InsuranceCoverageRepository,
    pub notifications: &'a dyn NotificationQueue,
}

/// One scheduled engine invocation over the eligible wheel configs.
///
/// The market snapshot is fetched exactly once, before fan-out; every user is
/// evaluated against the same `TechnicalAnalysis`. A snapshot failure aborts
/// the whole run. Per-user failures are recorded in that user's result entry
/// and never abort the others. No retries: the external scheduler re-triggers
/// a failed run, and re-running the same day is safe because no indicator
/// state is carried between runs.
pub async fn run_cycle(
    ports: &EnginePorts<'_>,
    configs: &[WheelConfig],
    params: &DecisionParams,
    insurance_params: InsuranceParams,
    estimator: &dyn PremiumEstimator,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<UserRunResult>> {
    let snapshot = ports.market.fetch_snapshot().await?;
    let analysis = strategy::analyze(&snapshot);

    info!(
        target: "engine",
        price = analysis.price,
        rsi = analysis.rsi,
        macd = ?analysis.macd_trend,
        bollinger = ?analysis.bollinger_position,
        volatility = analysis.volatility_24h,
        users = configs.len(),
        "run started"
    );

    let month = month_key(now);
    let insurance = InsuranceCoverageManager::new(ports.coverage, insurance_params);

    // Users are independent units of work sharing only the snapshot; process
    // them concurrently with no ordering guarantee between them.
    let outcomes = join_all(configs.iter().map(|config| {
        let insurance = &insurance;
        let analysis = &analysis;
        let month = month.as_str();
        async move { evaluate_user(ports, insurance, config, analysis, params, estimator, month, now).await }
    }))
    .await;

    let results: Vec<UserRunResult> = outcomes.into_iter().flatten().collect();

    METRICS.record_run_completed();
    info!(target: "engine", results = results.len(), "run finished");

    Ok(results)
}

/// Billing gate plus the per-user pipeline, with failures isolated into the
/// user's own result entry. `None` means the user was skipped (unpaid month)
/// and does not appear in the run results.
#[allow(clippy::too_many_arguments)]
async fn evaluate_user(
    ports: &EnginePorts<'_>,
    insurance: &InsuranceCoverageManager<'_>,
    config: &WheelConfig,
    analysis: &TechnicalAnalysis,
    params: &DecisionParams,
    estimator: &dyn PremiumEstimator,
    month: &str,
    now: DateTime<Utc>,
) -> Option<UserRunResult> {
    match ports.billing.is_paid_for_month(config.user_id, month).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(
                target: "engine",
                user = %config.user_id,
                month = %month,
                "insurance not paid for month; skipping user"
            );
            return None;
        }
        Err(err) => {
            warn!(target: "engine", user = %config.user_id, error = %err, "billing check failed");
            METRICS.record_user_error();
            return Some(UserRunResult {
                user_id: config.user_id,
                outcome: UserOutcome::Error {
                    error: err.to_string(),
                },
            });
        }
    }

    match process_user(ports, insurance, config, analysis, params, estimator, now).await {
        Ok(decision) => {
            METRICS.record_decision(decision.action);
            Some(UserRunResult {
                user_id: config.user_id,
                outcome: UserOutcome::Success {
                    action: decision.action,
                    premium_pct: decision.expected_premium_pct,
                },
            })
        }
        Err(err) => {
            warn!(
                target: "engine",
                user = %config.user_id,
                error = %err,
                "failed to process user; continuing"
            );
            METRICS.record_user_error();
            Some(UserRunResult {
                user_id: config.user_id,
                outcome: UserOutcome::Error {
                    error: err.to_string(),
                },
            })
        }
    }
}

/// Full pipeline for one user: position, decision, persistence, insurance,
/// notification. Any error here is isolated by the caller.
async fn process_user(
    ports: &EnginePorts<'_>,
    insurance: &InsuranceCoverageManager<'_>,
    config: &WheelConfig,
    analysis: &TechnicalAnalysis,
    params: &DecisionParams,
    estimator: &dyn PremiumEstimator,
    now: DateTime<Utc>,
) -> anyhow::Result<TradingDecision> {
    let trade = ports.positions.latest_trade(config.user_id).await?;
    let position = position_from_trade(trade.as_ref());

    let decision = decide(analysis, &position, params, estimator);

    ports
        .decisions
        .record_decision(config.user_id, &decision)
        .await?;

    // At most one queued message per user per run: the payout request takes
    // the decision summary's slot on the day a coverage period unlocks.
    let mut notification = decision_notification(config.user_id, &decision, now);

    if decision.activates_insurance() {
        let period = insurance
            .accrue(config.user_id, config.id, config.capital, now)
            .await?;
        METRICS.record_insurance_accrual();
        debug!(
            target: "engine",
            user = %config.user_id,
            days = period.days_covered,
            accumulated = period.total_premium_accumulated,
            "insurance coverage accrued"
        );
    } else if let Some(closed) = insurance
        .check_and_unlock(config.user_id, config.id, now)
        .await?
    {
        notification = payout_notification(config.user_id, &closed, now);
    }

    ports.notifications.enqueue(&notification).await?;

    Ok(decision)
}

fn decision_notification(
    user_id: Uuid,
    decision: &TradingDecision,
    now: DateTime<Utc>,
) -> Notification {
    let priority = match decision.action {
        DecisionAction::Hold => NotificationPriority::Low,
        DecisionAction::SellPut | DecisionAction::SellCall => NotificationPriority::Normal,
    };
    Notification {
        user_id,
        priority,
        body: decision.reasoning.clone(),
        scheduled_at: now,
    }
}

fn payout_notification(
    user_id: Uuid,
    period: &crate::insurance::InsuranceCoveragePeriod,
    now: DateTime<Utc>,
) -> Notification {
    Notification {
        user_id,
        priority: NotificationPriority::High,
        body: format!(
            "Insurance coverage period closed after {} day(s); {:.2} accumulated premium is payable.",
            period.days_covered, period.total_premium_accumulated,
        ),
        scheduled_at: now,
    }
}
