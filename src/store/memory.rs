//! In-process adapters backed by `DashMap`.
//!
//! Conditional writes hold the entry's shard write lock for the whole
//! check-and-set, so two racing callers can never both observe the guard as
//! satisfied.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::courier::{Courier, ProfilePatch};
use crate::models::earnings::EarningsRecord;
use crate::models::job::Job;
use crate::models::page::PageRequest;
use crate::store::{
    CourierDirectory, EarningsStore, JobFilter, JobGuard, JobSort, JobStore, JobUpdate, StoreError,
};

fn window<T>(items: Vec<T>, window: Option<PageRequest>) -> Vec<T> {
    match window {
        Some(page) => items
            .into_iter()
            .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
            .collect(),
        None => items,
    }
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: DashMap<Uuid, Job>,
    by_order: DashMap<String, Uuid>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn get_by_order(&self, order_id: &str) -> Result<Option<Job>, StoreError> {
        let Some(id) = self.by_order.get(order_id).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        self.get(id).await
    }

    async fn insert(&self, job: Job) -> Result<(), StoreError> {
        if self.jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(format!("job {}", job.id)));
        }

        match self.by_order.entry(job.order_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!("order {}", job.order_id))),
            Entry::Vacant(slot) => {
                slot.insert(job.id);
                self.jobs.insert(job.id, job);
                Ok(())
            }
        }
    }

    async fn find(
        &self,
        filter: &JobFilter,
        sort: JobSort,
        page: Option<PageRequest>,
    ) -> Result<Vec<Job>, StoreError> {
        let mut matching: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        match sort {
            JobSort::CreatedDesc => matching.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            JobSort::CreatedAsc => matching.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            JobSort::FinishedDesc => matching.sort_by(|a, b| b.finished_at().cmp(&a.finished_at())),
        }

        Ok(window(matching, page))
    }

    async fn count(&self, filter: &JobFilter) -> Result<u64, StoreError> {
        let count = self
            .jobs
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count();
        Ok(count as u64)
    }

    async fn conditional_update(
        &self,
        id: Uuid,
        guard: &JobGuard,
        update: &JobUpdate,
    ) -> Result<Option<Job>, StoreError> {
        let Some(mut entry) = self.jobs.get_mut(&id) else {
            return Ok(None);
        };

        if !guard.matches(entry.value()) {
            return Ok(None);
        }

        update.apply(entry.value_mut());
        Ok(Some(entry.value().clone()))
    }
}

#[derive(Default)]
pub struct MemoryCourierDirectory {
    couriers: DashMap<String, Courier>,
}

impl MemoryCourierDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.couriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.couriers.is_empty()
    }

    fn update(&self, id: &str, at: DateTime<Utc>, f: impl FnOnce(&mut Courier)) -> bool {
        match self.couriers.get_mut(id) {
            Some(mut courier) => {
                f(courier.value_mut());
                courier.updated_at = at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CourierDirectory for MemoryCourierDirectory {
    async fn get(&self, id: &str) -> Result<Option<Courier>, StoreError> {
        Ok(self.couriers.get(id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, courier: Courier) -> Result<(), StoreError> {
        match self.couriers.entry(courier.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!("courier {}", courier.id))),
            Entry::Vacant(slot) => {
                slot.insert(courier);
                Ok(())
            }
        }
    }

    async fn stamp_location(
        &self,
        id: &str,
        location: GeoPoint,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self.update(id, at, |courier| {
            courier.location = Some(location);
            courier.last_location_at = Some(at);
        }))
    }

    async fn set_availability(
        &self,
        id: &str,
        is_available: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self.update(id, at, |courier| courier.is_available = is_available))
    }

    async fn apply_patch(
        &self,
        id: &str,
        patch: &ProfilePatch,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self.update(id, at, |courier| patch.apply_to(courier)))
    }

    async fn record_delivery(&self, id: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(self.update(id, at, |courier| {
            courier.total_deliveries = courier.total_deliveries.saturating_add(1);
        }))
    }
}

/// Earnings keyed by job id, which doubles as the one-record-per-job index.
#[derive(Default)]
pub struct MemoryEarningsStore {
    records: DashMap<Uuid, EarningsRecord>,
}

impl MemoryEarningsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn for_courier(&self, courier_id: &str) -> Vec<EarningsRecord> {
        let mut records: Vec<EarningsRecord> = self
            .records
            .iter()
            .filter(|entry| entry.courier_id == courier_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));
        records
    }
}

#[async_trait]
impl EarningsStore for MemoryEarningsStore {
    async fn insert(&self, record: EarningsRecord) -> Result<(), StoreError> {
        match self.records.entry(record.job_id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!(
                "earnings for job {}",
                record.job_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn find_by_job(&self, job_id: Uuid) -> Result<Option<EarningsRecord>, StoreError> {
        Ok(self.records.get(&job_id).map(|entry| entry.value().clone()))
    }

    async fn history(
        &self,
        courier_id: &str,
        page: PageRequest,
    ) -> Result<(Vec<EarningsRecord>, u64), StoreError> {
        let records = self.for_courier(courier_id);
        let total = records.len() as u64;
        Ok((window(records, Some(page)), total))
    }

    async fn earned_since(
        &self,
        courier_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<EarningsRecord>, StoreError> {
        Ok(self
            .for_courier(courier_id)
            .into_iter()
            .filter(|record| record.earned_at >= since)
            .collect())
    }
}
