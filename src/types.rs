use std::fs;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
}

/// Public market data API (Binance-style REST).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketApiConfig {
    pub base_url: String,
    /// Instrument symbol, e.g. "BTCUSDT".
    pub symbol: String,
}

fn default_min_premium_pct() -> f64 {
    0.10
}

fn default_rotation_offset_pct() -> f64 {
    3.5
}

fn default_rotation_confidence() -> f64 {
    0.85
}

/// Decision-engine tunables. Defaults match the strategy as documented;
/// override in TOML only for experiments.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Premium (percent of capital) under which the engine holds and
    /// insurance coverage accrues.
    #[serde(default = "default_min_premium_pct")]
    pub min_premium_pct: f64,
    /// Covered-call strike offset above spot after a put assignment.
    #[serde(default = "default_rotation_offset_pct")]
    pub covered_call_offset_pct: f64,
    /// Re-entry put strike offset below spot after a call assignment.
    #[serde(default = "default_rotation_offset_pct")]
    pub reentry_put_offset_pct: f64,
    #[serde(default = "default_rotation_confidence")]
    pub rotation_confidence: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_premium_pct: default_min_premium_pct(),
            covered_call_offset_pct: default_rotation_offset_pct(),
            reentry_put_offset_pct: default_rotation_offset_pct(),
            rotation_confidence: default_rotation_confidence(),
        }
    }
}

fn default_daily_coverage_rate() -> f64 {
    crate::insurance::DEFAULT_DAILY_COVERAGE_RATE
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsuranceConfig {
    /// Daily guaranteed-minimum credit as a fraction of base capital.
    #[serde(default = "default_daily_coverage_rate")]
    pub daily_coverage_rate: f64,
}

impl Default for InsuranceConfig {
    fn default() -> Self {
        Self {
            daily_coverage_rate: default_daily_coverage_rate(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub postgres: PostgresConfig,
    pub market: MarketApiConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub insurance: InsuranceConfig,
}

impl AppConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {path}"))?;
        let cfg: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to deserialize TOML config at {path}"))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults_apply_when_sections_omitted() {
        let toml_str = r#"
            [redis]
            url = "redis://localhost"

            [postgres]
            url = "postgres://localhost/wheel"

            [market]
            base_url = "https://api.binance.com"
            symbol = "BTCUSDT"
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.engine.min_premium_pct, 0.10);
        assert_eq!(cfg.engine.covered_call_offset_pct, 3.5);
        assert_eq!(cfg.insurance.daily_coverage_rate, 0.0015);
    }
}
