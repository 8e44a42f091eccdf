use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::ports::InsuranceCoverageRepository;
use crate::types::InsuranceConfig;

/// Daily guaranteed-minimum credit as a fraction of base capital.
pub const DEFAULT_DAILY_COVERAGE_RATE: f64 = 0.0015;

/// One low-premium coverage stretch for a (user, config) pair.
///
/// Opened the first day live premiums drop below threshold, incremented once
/// per day while they stay there, closed (and flagged payable) the first day
/// a position fills or premiums recover.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsuranceCoveragePeriod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub config_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub base_capital: f64,
    /// Monotonic day counter; one increment per accruing run.
    pub days_covered: i32,
    pub total_premium_accumulated: f64,
    pub is_active: bool,
    /// Set when the period closes; downstream payout owns it from there.
    pub payable: bool,
}

/// Parameters for coverage accrual.
#[derive(Clone, Copy, Debug)]
pub struct InsuranceParams {
    pub daily_rate: f64,
}

impl Default for InsuranceParams {
    fn default() -> Self {
        Self {
            daily_rate: DEFAULT_DAILY_COVERAGE_RATE,
        }
    }
}

impl From<&InsuranceConfig> for InsuranceParams {
    fn from(cfg: &InsuranceConfig) -> Self {
        Self {
            daily_rate: cfg.daily_coverage_rate,
        }
    }
}

/// Accrues guaranteed-minimum premium while live premiums are below threshold
/// and unlocks the accumulated total once they recover.
pub struct InsuranceCoverageManager<'a> {
    repo: &'a dyn InsuranceCoverageRepository,
    params: InsuranceParams,
}

impl<'a> InsuranceCoverageManager<'a> {
    pub fn new(repo: &'a dyn InsuranceCoverageRepository, params: InsuranceParams) -> Self {
        Self { repo, params }
    }

    /// Credit one day of coverage for the pair, opening a period on the
    /// first low-premium day. Returns the period after the credit.
    pub async fn accrue(
        &self,
        user_id: Uuid,
        config_id: Uuid,
        capital: f64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<InsuranceCoveragePeriod> {
        let credit = capital * self.params.daily_rate;

        if let Some(mut period) = self.repo.active_period(user_id, config_id).await? {
            period.days_covered += 1;
            period.total_premium_accumulated += credit;
            self.repo.update_period(&period).await?;
            return Ok(period);
        }

        // Day one of a new low-premium stretch, credited immediately.
        let period = InsuranceCoveragePeriod {
            id: Uuid::new_v4(),
            user_id,
            config_id,
            start_date: now,
            end_date: None,
            base_capital: capital,
            days_covered: 1,
            total_premium_accumulated: credit,
            is_active: true,
            payable: false,
        };
        self.repo.insert_period(&period).await?;
        Ok(period)
    }

    /// Close the active period, if any, on a day that did not accrue
    /// (premium recovered or a fill occurred). Returns the closed period so
    /// the caller can schedule the payout notification.
    pub async fn check_and_unlock(
        &self,
        user_id: Uuid,
        config_id: Uuid,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<InsuranceCoveragePeriod>> {
        let Some(mut period) = self.repo.active_period(user_id, config_id).await? else {
            return Ok(None);
        };

        period.is_active = false;
        period.end_date = Some(now);
        period.payable = true;
        self.repo.update_period(&period).await?;
        Ok(Some(period))
    }
}
