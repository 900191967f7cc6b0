use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::engine::earnings::EarningsLedger;
use crate::engine::lifecycle::LifecycleEngine;
use crate::engine::query::JobQueries;
use crate::models::event::JobEvent;
use crate::observability::metrics::Metrics;
use crate::store::memory::{MemoryCourierDirectory, MemoryEarningsStore, MemoryJobStore};
use crate::store::{CourierDirectory, EarningsStore, JobStore};

/// Store handles the service is wired against.
#[derive(Clone)]
pub struct Stores {
    pub jobs: Arc<dyn JobStore>,
    pub couriers: Arc<dyn CourierDirectory>,
    pub earnings: Arc<dyn EarningsStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            jobs: Arc::new(MemoryJobStore::new()),
            couriers: Arc::new(MemoryCourierDirectory::new()),
            earnings: Arc::new(MemoryEarningsStore::new()),
        }
    }
}

pub struct AppState {
    pub lifecycle: LifecycleEngine,
    pub queries: JobQueries,
    pub ledger: Arc<EarningsLedger>,
    pub couriers: Arc<dyn CourierDirectory>,
    pub job_events_tx: broadcast::Sender<JobEvent>,
    pub metrics: Metrics,
    pub store_timeout: Duration,
}

impl AppState {
    pub fn new(stores: Stores, store_timeout: Duration, event_buffer_size: usize) -> Self {
        let (job_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let metrics = Metrics::new();

        let ledger = Arc::new(EarningsLedger::new(
            stores.earnings.clone(),
            stores.jobs.clone(),
            store_timeout,
        ));
        let lifecycle = LifecycleEngine::new(
            stores.jobs.clone(),
            stores.couriers.clone(),
            ledger.clone(),
            job_events_tx.clone(),
            metrics.clone(),
            store_timeout,
        );
        let queries = JobQueries::new(stores.jobs, stores.earnings, store_timeout);

        Self {
            lifecycle,
            queries,
            ledger,
            couriers: stores.couriers,
            job_events_tx,
            metrics,
            store_timeout,
        }
    }
}
