use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use options_wheel_bot::engine::ports::{
    BillingRepository, DecisionRepository, InsuranceCoverageRepository, MarketDataSource,
    Notification, NotificationPriority, NotificationQueue, PositionRepository, TradeRecord,
    UserOutcome, WheelConfig,
};
use options_wheel_bot::engine::{run_cycle, EnginePorts};
use options_wheel_bot::insurance::{InsuranceCoveragePeriod, InsuranceParams};
use options_wheel_bot::strategy::{
    DecisionAction, DecisionParams, HeuristicPremiumEstimator, MarketSnapshot,
};

struct MemMarket {
    snapshot: Option<MarketSnapshot>,
}

#[async_trait]
impl MarketDataSource for MemMarket {
    async fn fetch_snapshot(&self) -> anyhow::Result<MarketSnapshot> {
        self.snapshot
            .clone()
            .ok_or_else(|| anyhow::anyhow!("market data unavailable"))
    }
}

#[derive(Default)]
struct MemPositions {
    trades: HashMap<Uuid, TradeRecord>,
    failing: HashSet<Uuid>,
}

#[async_trait]
impl PositionRepository for MemPositions {
    async fn latest_trade(&self, user_id: Uuid) -> anyhow::Result<Option<TradeRecord>> {
        if self.failing.contains(&user_id) {
            anyhow::bail!("malformed position data for {user_id}");
        }
        Ok(self.trades.get(&user_id).cloned())
    }
}

#[derive(Default)]
struct MemDecisions {
    recorded: Mutex<Vec<(Uuid, DecisionAction, Option<f64>)>>,
}

#[async_trait]
impl DecisionRepository for MemDecisions {
    async fn record_decision(
        &self,
        user_id: Uuid,
        decision: &options_wheel_bot::strategy::TradingDecision,
    ) -> anyhow::Result<()> {
        self.recorded
            .lock()
            .unwrap()
            .push((user_id, decision.action, decision.strike_price));
        Ok(())
    }
}

struct MemBilling {
    paid: HashSet<Uuid>,
}

#[async_trait]
impl BillingRepository for MemBilling {
    async fn is_paid_for_month(&self, user_id: Uuid, _month: &str) -> anyhow::Result<bool> {
        Ok(self.paid.contains(&user_id))
    }
}

#[derive(Default)]
struct MemCoverage {
    periods: Mutex<Vec<InsuranceCoveragePeriod>>,
}

#[async_trait]
impl InsuranceCoverageRepository for MemCoverage {
    async fn active_period(
        &self,
        user_id: Uuid,
        config_id: Uuid,
    ) -> anyhow::Result<Option<InsuranceCoveragePeriod>> {
        Ok(self
            .periods
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.user_id == user_id && p.config_id == config_id && p.is_active)
            .cloned())
    }

    async fn insert_period(&self, period: &InsuranceCoveragePeriod) -> anyhow::Result<()> {
        self.periods.lock().unwrap().push(period.clone());
        Ok(())
    }

    async fn update_period(&self, period: &InsuranceCoveragePeriod) -> anyhow::Result<()> {
        let mut periods = self.periods.lock().unwrap();
        if let Some(existing) = periods.iter_mut().find(|p| p.id == period.id) {
            *existing = period.clone();
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemQueue {
    sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationQueue for MemQueue {
    async fn enqueue(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn flat_snapshot(price: f64) -> MarketSnapshot {
    MarketSnapshot {
        price,
        high_24h: price * 1.02,
        low_24h: price * 0.98,
        volume_24h: 5_000.0,
        price_history: vec![price; 48],
    }
}

fn volatile_snapshot(price: f64) -> MarketSnapshot {
    let history: Vec<f64> = (0..48)
        .map(|i| price * if i % 2 == 0 { 1.01 } else { 0.99 })
        .collect();
    MarketSnapshot {
        price,
        high_24h: price * 1.02,
        low_24h: price * 0.98,
        volume_24h: 5_000.0,
        price_history: history,
    }
}

fn config_for(user: Uuid) -> WheelConfig {
    WheelConfig {
        id: Uuid::new_v4(),
        user_id: user,
        capital: 10_000.0,
    }
}

struct Harness {
    market: MemMarket,
    positions: MemPositions,
    decisions: MemDecisions,
    billing: MemBilling,
    coverage: MemCoverage,
    queue: MemQueue,
}

impl Harness {
    fn new(snapshot: Option<MarketSnapshot>, paid: &[Uuid]) -> Self {
        Self {
            market: MemMarket { snapshot },
            positions: MemPositions::default(),
            decisions: MemDecisions::default(),
            billing: MemBilling {
                paid: paid.iter().copied().collect(),
            },
            coverage: MemCoverage::default(),
            queue: MemQueue::default(),
        }
    }

    fn ports(&self) -> EnginePorts<'_> {
        EnginePorts {
            market: &self.market,
            positions: &self.positions,
            decisions: &self.decisions,
            billing: &self.billing,
            coverage: &self.coverage,
            notifications: &self.queue,
        }
    }

    async fn run(&self, configs: &[WheelConfig]) -> anyhow::Result<Vec<options_wheel_bot::engine::ports::UserRunResult>> {
        run_cycle(
            &self.ports(),
            configs,
            &DecisionParams::default(),
            InsuranceParams::default(),
            &HeuristicPremiumEstimator,
            Utc::now(),
        )
        .await
    }
}

#[tokio::test]
async fn zero_volatility_holds_and_accrues_once_per_user() {
    let user = Uuid::new_v4();
    let harness = Harness::new(Some(flat_snapshot(30_000.0)), &[user]);
    let config = config_for(user);

    let results = harness.run(std::slice::from_ref(&config)).await.unwrap();

    assert_eq!(results.len(), 1);
    match &results[0].outcome {
        UserOutcome::Success { action, premium_pct } => {
            assert_eq!(*action, DecisionAction::Hold);
            assert_eq!(*premium_pct, 0.05);
        }
        other => panic!("expected success, got {other:?}"),
    }

    // Exactly one coverage period, credited for exactly one day.
    let periods = harness.coverage.periods.lock().unwrap();
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].days_covered, 1);
    assert!(periods[0].is_active);
    drop(periods);

    // HOLD with null strike persisted.
    let recorded = harness.decisions.recorded.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].1, DecisionAction::Hold);
    assert_eq!(recorded[0].2, None);
    drop(recorded);

    // Decision summary queued at low priority.
    let sent = harness.queue.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].priority, NotificationPriority::Low);
}

#[tokio::test]
async fn one_failing_user_does_not_abort_the_others() {
    let good = Uuid::new_v4();
    let bad = Uuid::new_v4();
    let mut harness = Harness::new(Some(volatile_snapshot(30_000.0)), &[good, bad]);
    harness.positions.failing.insert(bad);

    let configs = vec![config_for(bad), config_for(good)];
    let results = harness.run(&configs).await.unwrap();

    assert_eq!(results.len(), 2);

    let bad_result = results.iter().find(|r| r.user_id == bad).unwrap();
    assert!(matches!(&bad_result.outcome, UserOutcome::Error { error } if error.contains("malformed")));

    let good_result = results.iter().find(|r| r.user_id == good).unwrap();
    assert!(matches!(
        good_result.outcome,
        UserOutcome::Success {
            action: DecisionAction::SellPut,
            ..
        }
    ));
}

#[tokio::test]
async fn unpaid_user_is_skipped_before_any_position_work() {
    let unpaid = Uuid::new_v4();
    let harness = Harness::new(Some(volatile_snapshot(30_000.0)), &[]);

    let results = harness.run(&[config_for(unpaid)]).await.unwrap();

    assert!(results.is_empty());
    assert!(harness.decisions.recorded.lock().unwrap().is_empty());
    assert!(harness.queue.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn assigned_put_rotates_and_unlocks_coverage() {
    let user = Uuid::new_v4();
    let mut harness = Harness::new(Some(flat_snapshot(29_000.0)), &[user]);
    let config = config_for(user);

    // Short put above spot: will be assigned this run.
    harness.positions.trades.insert(
        user,
        TradeRecord {
            user_id: user,
            trade_type: "SELL_PUT".to_string(),
            strike_price: Some(30_000.0),
            expiration_date: None,
        },
    );

    // An active coverage stretch from earlier low-premium days.
    harness
        .coverage
        .periods
        .lock()
        .unwrap()
        .push(InsuranceCoveragePeriod {
            id: Uuid::new_v4(),
            user_id: user,
            config_id: config.id,
            start_date: Utc::now(),
            end_date: None,
            base_capital: config.capital,
            days_covered: 3,
            total_premium_accumulated: 45.0,
            is_active: true,
            payable: false,
        });

    let results = harness.run(std::slice::from_ref(&config)).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0].outcome,
        UserOutcome::Success {
            action: DecisionAction::SellCall,
            ..
        }
    ));

    // Covered call at spot * 1.035, unrounded.
    let recorded = harness.decisions.recorded.lock().unwrap();
    let strike = recorded[0].2.unwrap();
    assert!((strike - 30_015.0).abs() < 1e-9);
    drop(recorded);

    // The fill closed the coverage period and queued a payout request.
    let periods = harness.coverage.periods.lock().unwrap();
    assert!(!periods[0].is_active);
    assert!(periods[0].payable);
    drop(periods);

    // The payout request takes the user's single notification slot this run.
    let sent = harness.queue.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].priority, NotificationPriority::High);
    assert!(sent[0].body.contains("payable"));
}

#[tokio::test]
async fn snapshot_failure_aborts_the_whole_run() {
    let user = Uuid::new_v4();
    let harness = Harness::new(None, &[user]);

    let err = harness.run(&[config_for(user)]).await.unwrap_err();
    assert!(err.to_string().contains("market data unavailable"));
    assert!(harness.decisions.recorded.lock().unwrap().is_empty());
}
