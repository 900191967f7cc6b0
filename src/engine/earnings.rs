use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Months, TimeZone, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::earnings::{EarningsAggregate, EarningsRecord, Period};
use crate::models::job::{Job, JobStatus};
use crate::store::{bounded, EarningsStore, JobFilter, JobStore};

const BONUS_FEE_THRESHOLD: i64 = 100;
const HIGH_FEE_BONUS: i64 = 10;
/// Share of period earnings reported as bonus in the summary, in percent.
const BONUS_SHARE_PERCENT: i128 = 15;

pub fn bonus_for(delivery_fee: i64) -> i64 {
    if delivery_fee > BONUS_FEE_THRESHOLD {
        HIGH_FEE_BONUS
    } else {
        0
    }
}

/// Builds the compensation record for a delivered job.
pub fn derive(job: &Job, now: DateTime<Utc>) -> Result<EarningsRecord, AppError> {
    let courier_id = job
        .courier_id
        .clone()
        .ok_or_else(|| AppError::Internal(format!("delivered job {} has no courier", job.id)))?;
    let bonus = bonus_for(job.delivery_fee);
    let total = job.delivery_fee.checked_add(bonus).ok_or_else(|| {
        AppError::Internal(format!("earnings total overflows for job {}", job.id))
    })?;

    Ok(EarningsRecord {
        id: Uuid::new_v4(),
        courier_id,
        job_id: job.id,
        order_id: job.order_id.clone(),
        order_amount: job.order_amount,
        delivery_fee: job.delivery_fee,
        bonus,
        total,
        earned_at: job.delivered_at.unwrap_or(now),
    })
}

/// Lower bound of `period` relative to `now`. `Today` starts at local
/// midnight.
pub fn period_start(period: Period, now: DateTime<Utc>) -> DateTime<Utc> {
    match period {
        Period::Today => {
            let midnight = now.with_timezone(&Local).date_naive().and_time(chrono::NaiveTime::MIN);
            Local
                .from_local_datetime(&midnight)
                .earliest()
                .map(|start| start.with_timezone(&Utc))
                .unwrap_or_else(|| midnight.and_utc())
        }
        Period::Week => now - chrono::Duration::days(7),
        Period::Month => now
            .checked_sub_months(Months::new(1))
            .unwrap_or_else(|| now - chrono::Duration::days(30)),
    }
}

pub fn aggregate(records: &[EarningsRecord]) -> EarningsAggregate {
    let total_earnings = records
        .iter()
        .fold(0i64, |acc, record| acc.saturating_add(record.total));
    let deliveries_count = records.len() as u64;
    let bonus_earnings =
        i64::try_from(i128::from(total_earnings) * BONUS_SHARE_PERCENT / 100).unwrap_or(i64::MAX);

    let avg_per_delivery = match i64::try_from(deliveries_count) {
        Ok(count) if count > 0 => total_earnings / count,
        _ => 0,
    };

    EarningsAggregate {
        total_earnings,
        deliveries_count,
        avg_per_delivery,
        bonus_earnings,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    #[serde(flatten)]
    pub aggregate: EarningsAggregate,
    pub weekly_count: u64,
    pub period: Period,
}

/// Writes and reads compensation records.
pub struct EarningsLedger {
    earnings: Arc<dyn EarningsStore>,
    jobs: Arc<dyn JobStore>,
    store_timeout: Duration,
}

impl EarningsLedger {
    pub fn new(
        earnings: Arc<dyn EarningsStore>,
        jobs: Arc<dyn JobStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            earnings,
            jobs,
            store_timeout,
        }
    }

    /// Persists the record for a job that has just reached `Delivered`.
    pub async fn record(&self, job: &Job) -> Result<EarningsRecord, AppError> {
        if job.status != JobStatus::Delivered {
            return Err(AppError::InvalidState(format!(
                "earnings are only derived for delivered jobs, job {} is {}",
                job.id, job.status
            )));
        }

        let record = derive(job, Utc::now())?;

        bounded(
            self.store_timeout,
            "earnings.insert",
            self.earnings.insert(record.clone()),
        )
        .await?;

        info!(
            job_id = %job.id,
            courier_id = %record.courier_id,
            total = record.total,
            bonus = record.bonus,
            "earnings recorded"
        );

        Ok(record)
    }

    pub async fn aggregate(
        &self,
        courier_id: &str,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<EarningsAggregate, AppError> {
        let since = period_start(period, now);
        let records = bounded(
            self.store_timeout,
            "earnings.earned_since",
            self.earnings.earned_since(courier_id, since),
        )
        .await?;

        Ok(aggregate(&records))
    }

    pub async fn summary(
        &self,
        courier_id: &str,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<EarningsSummary, AppError> {
        let aggregate = self.aggregate(courier_id, period, now).await?;

        let filter = JobFilter {
            delivered_since: Some(period_start(Period::Week, now)),
            ..JobFilter::for_courier(courier_id, &[JobStatus::Delivered])
        };
        let weekly_count = bounded(self.store_timeout, "jobs.count", self.jobs.count(&filter)).await?;

        Ok(EarningsSummary {
            aggregate,
            weekly_count,
            period,
        })
    }
}
