//! Storage collaborators consumed by the lifecycle core.
//!
//! The engine only talks to these traits. Handles are built once by the
//! process entry point and injected as `Arc<dyn ...>`.

pub mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::courier::{Courier, ProfilePatch};
use crate::models::earnings::EarningsRecord;
use crate::models::job::{Job, JobStatus};
use crate::models::page::PageRequest;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Timeout { .. } | StoreError::Unavailable(_))
    }
}

/// Runs one store call under a deadline.
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation,
            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub courier_id: Option<String>,
    /// Empty means any status.
    pub statuses: Vec<JobStatus>,
    pub unbound_only: bool,
    pub delivered_since: Option<DateTime<Utc>>,
}

impl JobFilter {
    pub fn for_courier(courier_id: &str, statuses: &[JobStatus]) -> Self {
        Self {
            courier_id: Some(courier_id.to_string()),
            statuses: statuses.to_vec(),
            ..Self::default()
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        if let Some(courier_id) = &self.courier_id {
            if !job.is_bound_to(courier_id) {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&job.status) {
            return false;
        }
        if self.unbound_only && job.courier_id.is_some() {
            return false;
        }
        if let Some(since) = self.delivered_since {
            match job.delivered_at {
                Some(at) if at >= since => {}
                _ => return false,
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSort {
    CreatedDesc,
    CreatedAsc,
    FinishedDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourierGuard {
    Unbound,
    BoundTo(String),
}

/// Precondition of a conditional update: the stored job must be in `status`
/// and have the expected courier binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobGuard {
    pub status: JobStatus,
    pub courier: CourierGuard,
}

impl JobGuard {
    pub fn matches(&self, job: &Job) -> bool {
        if job.status != self.status {
            return false;
        }
        match &self.courier {
            CourierGuard::Unbound => job.courier_id.is_none(),
            CourierGuard::BoundTo(courier_id) => job.is_bound_to(courier_id),
        }
    }
}

/// Field-level write applied when a guard holds.
#[derive(Debug, Clone)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub bind_courier: Option<String>,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

impl JobUpdate {
    pub fn apply(&self, job: &mut Job) {
        if let Some(courier_id) = &self.bind_courier {
            job.courier_id = Some(courier_id.clone());
            job.assigned_at = Some(self.at);
        }
        if job.status != self.status {
            job.status = self.status;
            job.stamp(self.status, self.at);
        }
        if let Some(notes) = &self.notes {
            job.notes = Some(notes.clone());
        }
        job.updated_at = self.at;
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn get_by_order(&self, order_id: &str) -> Result<Option<Job>, StoreError>;

    async fn insert(&self, job: Job) -> Result<(), StoreError>;

    async fn find(
        &self,
        filter: &JobFilter,
        sort: JobSort,
        window: Option<PageRequest>,
    ) -> Result<Vec<Job>, StoreError>;

    async fn count(&self, filter: &JobFilter) -> Result<u64, StoreError>;

    /// Compare-and-swap on a single job. Applies `update` and returns the new
    /// document only if the stored job satisfies `guard` at write time.
    async fn conditional_update(
        &self,
        id: Uuid,
        guard: &JobGuard,
        update: &JobUpdate,
    ) -> Result<Option<Job>, StoreError>;
}

#[async_trait]
pub trait CourierDirectory: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Courier>, StoreError>;

    async fn insert(&self, courier: Courier) -> Result<(), StoreError>;

    async fn stamp_location(
        &self,
        id: &str,
        location: GeoPoint,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn set_availability(
        &self,
        id: &str,
        is_available: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn apply_patch(
        &self,
        id: &str,
        patch: &ProfilePatch,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn record_delivery(&self, id: &str, at: DateTime<Utc>) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait EarningsStore: Send + Sync {
    /// Rejects a second record for the same job with `StoreError::Duplicate`.
    async fn insert(&self, record: EarningsRecord) -> Result<(), StoreError>;

    async fn find_by_job(&self, job_id: Uuid) -> Result<Option<EarningsRecord>, StoreError>;

    /// Records for a courier, newest first, windowed. Also returns the total.
    async fn history(
        &self,
        courier_id: &str,
        window: PageRequest,
    ) -> Result<(Vec<EarningsRecord>, u64), StoreError>;

    async fn earned_since(
        &self,
        courier_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<EarningsRecord>, StoreError>;
}
