use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::earnings::EarningsHistoryItem;
use crate::models::job::{Job, JobStatus, JobSummary};
use crate::models::page::{Page, PageRequest};
use crate::store::{bounded, EarningsStore, JobFilter, JobSort, JobStore};

pub const DEFAULT_HISTORY_LIMIT: u64 = 20;
pub const DEFAULT_EARNINGS_HISTORY_LIMIT: u64 = 50;

/// Read-side views over jobs and earnings. Never writes.
pub struct JobQueries {
    jobs: Arc<dyn JobStore>,
    earnings: Arc<dyn EarningsStore>,
    store_timeout: Duration,
}

impl JobQueries {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        earnings: Arc<dyn EarningsStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            jobs,
            earnings,
            store_timeout,
        }
    }

    /// Unfinished jobs bound to the courier, newest first.
    pub async fn active_orders(&self, courier_id: &str) -> Result<Vec<JobSummary>, AppError> {
        let filter = JobFilter::for_courier(courier_id, &JobStatus::ACTIVE);
        let jobs = bounded(
            self.store_timeout,
            "jobs.find",
            self.jobs.find(&filter, JobSort::CreatedDesc, None),
        )
        .await?;

        Ok(jobs.iter().map(Job::summary).collect())
    }

    /// Delivered and cancelled jobs, most recently finished first.
    pub async fn history(
        &self,
        courier_id: &str,
        page: PageRequest,
    ) -> Result<Page<JobSummary>, AppError> {
        let filter = JobFilter::for_courier(courier_id, &JobStatus::FINISHED);

        let total = bounded(self.store_timeout, "jobs.count", self.jobs.count(&filter)).await?;
        let jobs = bounded(
            self.store_timeout,
            "jobs.find",
            self.jobs.find(&filter, JobSort::FinishedDesc, Some(page)),
        )
        .await?;

        Ok(Page::new(jobs, total, page).map(|job| job.summary()))
    }

    pub async fn earnings_history(
        &self,
        courier_id: &str,
        page: PageRequest,
    ) -> Result<Page<EarningsHistoryItem>, AppError> {
        let (records, total) = bounded(
            self.store_timeout,
            "earnings.history",
            self.earnings.history(courier_id, page),
        )
        .await?;

        Ok(Page::new(records, total, page).map(|record| EarningsHistoryItem::from(&record)))
    }

    /// Claimable jobs, oldest first.
    pub async fn pending_jobs(&self) -> Result<Vec<JobSummary>, AppError> {
        let filter = JobFilter {
            statuses: vec![JobStatus::Pending],
            unbound_only: true,
            ..JobFilter::default()
        };
        let jobs = bounded(
            self.store_timeout,
            "jobs.find",
            self.jobs.find(&filter, JobSort::CreatedAsc, None),
        )
        .await?;

        Ok(jobs.iter().map(Job::summary).collect())
    }

    /// Full job document. `key` is either the job id or the upstream order id.
    pub async fn order_details(&self, key: &str) -> Result<Job, AppError> {
        let found = match Uuid::parse_str(key) {
            Ok(job_id) => bounded(self.store_timeout, "jobs.get", self.jobs.get(job_id)).await?,
            Err(_) => {
                bounded(
                    self.store_timeout,
                    "jobs.get_by_order",
                    self.jobs.get_by_order(key),
                )
                .await?
            }
        };

        found.ok_or_else(|| AppError::NotFound(format!("job {key} not found")))
    }
}
