use serde::Serialize;
use tracing::info;

use crate::types::AppConfig;

#[derive(Serialize)]
struct StartupLog<'a> {
    event: &'a str,
    symbol: &'a str,
    min_premium_pct: f64,
    daily_coverage_rate: f64,
}

pub fn log_startup(cfg: &AppConfig) {
    let payload = StartupLog {
        event: "startup",
        symbol: &cfg.market.symbol,
        min_premium_pct: cfg.engine.min_premium_pct,
        daily_coverage_rate: cfg.insurance.daily_coverage_rate,
    };
    info!(target: "bot", startup = serde_json::to_string(&payload).unwrap_or_default().as_str());
}
