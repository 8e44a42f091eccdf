use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::info;

use crate::strategy::DecisionAction;

/// Global metrics registry used across the engine.
pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::default);

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

#[derive(Default)]
struct MetricsInner {
    runs_completed: AtomicU64,
    decisions_sell_put: AtomicU64,
    decisions_sell_call: AtomicU64,
    decisions_hold: AtomicU64,
    user_errors: AtomicU64,
    insurance_accruals: AtomicU64,
    last_run_ts: AtomicU64,
}

/// Lightweight metrics handle backed by atomics so it can be cloned cheaply.
#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

impl Metrics {
    pub fn record_decision(&self, action: DecisionAction) {
        let counter = match action {
            DecisionAction::SellPut => &self.inner.decisions_sell_put,
            DecisionAction::SellCall => &self.inner.decisions_sell_call,
            DecisionAction::Hold => &self.inner.decisions_hold,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        info!(
            target: "metrics",
            event = "decision",
            action = action.as_str(),
            "decision recorded"
        );
    }

    pub fn record_user_error(&self) {
        self.inner.user_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insurance_accrual(&self) {
        self.inner.insurance_accruals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_completed(&self) {
        self.inner.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.inner
            .last_run_ts
            .store(now_unix_secs(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_completed: self.inner.runs_completed.load(Ordering::Relaxed),
            decisions_sell_put: self.inner.decisions_sell_put.load(Ordering::Relaxed),
            decisions_sell_call: self.inner.decisions_sell_call.load(Ordering::Relaxed),
            decisions_hold: self.inner.decisions_hold.load(Ordering::Relaxed),
            user_errors: self.inner.user_errors.load(Ordering::Relaxed),
            insurance_accruals: self.inner.insurance_accruals.load(Ordering::Relaxed),
            last_run_ts: self.inner.last_run_ts.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of current metrics logged as the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub runs_completed: u64,
    pub decisions_sell_put: u64,
    pub decisions_sell_call: u64,
    pub decisions_hold: u64,
    pub user_errors: u64,
    pub insurance_accruals: u64,
    pub last_run_ts: u64,
}

pub fn log_metrics_snapshot(snapshot: &MetricsSnapshot) {
    info!(
        target: "metrics",
        event = "run_summary",
        runs_completed = snapshot.runs_completed,
        decisions_sell_put = snapshot.decisions_sell_put,
        decisions_sell_call = snapshot.decisions_sell_call,
        decisions_hold = snapshot.decisions_hold,
        user_errors = snapshot.user_errors,
        insurance_accruals = snapshot.insurance_accruals,
        last_run_ts = snapshot.last_run_ts,
        "run summary"
    );
}
