use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::earnings::EarningsLedger;
use crate::engine::transitions;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::event::JobEvent;
use crate::models::job::{Job, JobStatus, NewJob};
use crate::observability::metrics::Metrics;
use crate::store::{
    bounded, CourierDirectory, CourierGuard, JobGuard, JobStore, JobUpdate, StoreError,
};

/// Upper bound for order amount and delivery fee.
pub const MAX_AMOUNT: i64 = 1_000_000_000;

/// Owns every write to `Job::status`. All state changes go through
/// `JobStore::conditional_update`, so the store decides the winner of a race.
pub struct LifecycleEngine {
    jobs: Arc<dyn JobStore>,
    couriers: Arc<dyn CourierDirectory>,
    ledger: Arc<EarningsLedger>,
    events_tx: broadcast::Sender<JobEvent>,
    metrics: Metrics,
    store_timeout: Duration,
}

impl LifecycleEngine {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        couriers: Arc<dyn CourierDirectory>,
        ledger: Arc<EarningsLedger>,
        events_tx: broadcast::Sender<JobEvent>,
        metrics: Metrics,
        store_timeout: Duration,
    ) -> Self {
        Self {
            jobs,
            couriers,
            ledger,
            events_tx,
            metrics,
            store_timeout,
        }
    }

    /// Opens a job in `Pending` with no courier bound.
    pub async fn create_job(&self, new: NewJob) -> Result<Job, AppError> {
        self.instrumented("create", async move {
            validate_new_job(&new)?;

            let job = Job::open(new, Utc::now());
            match bounded(self.store_timeout, "jobs.insert", self.jobs.insert(job.clone())).await {
                Ok(()) => {}
                Err(StoreError::Duplicate(key)) => {
                    return Err(AppError::BadRequest(format!("job already exists for {key}")));
                }
                Err(err) => return Err(err.into()),
            }

            self.metrics.jobs_created_total.inc();
            info!(job_id = %job.id, order_id = %job.order_id, "job created");
            Ok(job)
        })
        .await
    }

    /// Claims a pending, unbound job for `courier_id` and moves it straight to
    /// `PickedUp`. Exactly one of any number of concurrent callers wins.
    pub async fn assign(&self, job_id: Uuid, courier_id: &str) -> Result<Job, AppError> {
        self.instrumented("assign", async move {
            let guard = JobGuard {
                status: JobStatus::Pending,
                courier: CourierGuard::Unbound,
            };
            let update = JobUpdate {
                status: JobStatus::PickedUp,
                bind_courier: Some(courier_id.to_string()),
                notes: None,
                at: Utc::now(),
            };

            match self.swap(job_id, &guard, &update).await? {
                Some(job) => {
                    info!(job_id = %job_id, courier_id, "job assigned");
                    self.publish(&job);
                    Ok(job)
                }
                None => Err(self.unclaimable(job_id).await?),
            }
        })
        .await
    }

    /// Operator pre-assignment: binds a courier to a pending job without
    /// advancing it. The courier then moves it to `PickedUp` themselves.
    pub async fn dispatch(&self, job_id: Uuid, courier_id: &str) -> Result<Job, AppError> {
        self.instrumented("dispatch", async move {
            let known = bounded(self.store_timeout, "couriers.get", self.couriers.get(courier_id)).await?;
            if known.is_none() {
                return Err(AppError::NotFound(format!("courier {courier_id} not found")));
            }

            let guard = JobGuard {
                status: JobStatus::Pending,
                courier: CourierGuard::Unbound,
            };
            let update = JobUpdate {
                status: JobStatus::Pending,
                bind_courier: Some(courier_id.to_string()),
                notes: None,
                at: Utc::now(),
            };

            match self.swap(job_id, &guard, &update).await? {
                Some(job) => {
                    info!(job_id = %job_id, courier_id, "job dispatched");
                    self.publish(&job);
                    Ok(job)
                }
                None => Err(self.unclaimable(job_id).await?),
            }
        })
        .await
    }

    /// Moves a job the caller owns to the next status. A move to `Delivered`
    /// takes the completion path so earnings are derived either way.
    pub async fn advance_status(
        &self,
        job_id: Uuid,
        caller: &str,
        target: JobStatus,
        location: Option<GeoPoint>,
    ) -> Result<Job, AppError> {
        self.instrumented("advance", async move {
            let current = self.load(job_id).await?;
            if !current.is_bound_to(caller) {
                return Err(AppError::Unauthorized(format!(
                    "job {job_id} is not assigned to courier {caller}"
                )));
            }
            transitions::validate(current.status, target)?;

            if target == JobStatus::Delivered {
                return self.finish(job_id, caller, None, location).await;
            }

            let guard = JobGuard {
                status: current.status,
                courier: CourierGuard::BoundTo(caller.to_string()),
            };
            let update = JobUpdate {
                status: target,
                bind_courier: None,
                notes: None,
                at: Utc::now(),
            };

            let job = match self.swap(job_id, &guard, &update).await? {
                Some(job) => job,
                None => {
                    // Lost a race with another writer; report against the fresh state.
                    let fresh = self.load(job_id).await?;
                    if !fresh.is_bound_to(caller) {
                        return Err(AppError::Unauthorized(format!(
                            "job {job_id} is not assigned to courier {caller}"
                        )));
                    }
                    return Err(AppError::InvalidTransition {
                        from: fresh.status,
                        to: target,
                    });
                }
            };

            info!(job_id = %job_id, courier_id = caller, status = %job.status, "job status advanced");
            self.publish(&job);
            self.stamp_location(caller, location).await;
            Ok(job)
        })
        .await
    }

    /// `InTransit -> Delivered`. The earnings record and the courier side
    /// effects are best-effort: their failure is logged and counted but the
    /// completion itself still succeeds.
    pub async fn complete(
        &self,
        job_id: Uuid,
        caller: &str,
        notes: Option<String>,
        location: Option<GeoPoint>,
    ) -> Result<Job, AppError> {
        self.instrumented("complete", self.finish(job_id, caller, notes, location))
            .await
    }

    /// Completion path shared by `complete` and `advance_status`.
    async fn finish(
        &self,
        job_id: Uuid,
        caller: &str,
        notes: Option<String>,
        location: Option<GeoPoint>,
    ) -> Result<Job, AppError> {
        let guard = JobGuard {
            status: JobStatus::InTransit,
            courier: CourierGuard::BoundTo(caller.to_string()),
        };
        let update = JobUpdate {
            status: JobStatus::Delivered,
            bind_courier: None,
            notes,
            at: Utc::now(),
        };

        let job = match self.swap(job_id, &guard, &update).await? {
            Some(job) => job,
            None => {
                let current = self.load(job_id).await?;
                if !current.is_bound_to(caller) {
                    return Err(AppError::Unauthorized(format!(
                        "job {job_id} is not assigned to courier {caller}"
                    )));
                }
                return Err(AppError::InvalidState(format!(
                    "job must be in transit to complete, current status: {}",
                    current.status
                )));
            }
        };

        info!(job_id = %job_id, courier_id = caller, "job delivered");
        self.publish(&job);

        if let Err(err) = self.ledger.record(&job).await {
            self.metrics.earnings_write_failures_total.inc();
            error!(
                job_id = %job_id,
                courier_id = caller,
                delivery_fee = job.delivery_fee,
                error = %err,
                "failed to record earnings for delivered job"
            );
        }

        let now = Utc::now();
        match bounded(
            self.store_timeout,
            "couriers.record_delivery",
            self.couriers.record_delivery(caller, now),
        )
        .await
        {
            Ok(true) => {}
            Ok(false) => warn!(courier_id = caller, "delivery count not updated: courier not in directory"),
            Err(err) => warn!(courier_id = caller, error = %err, "failed to update delivery count"),
        }

        self.stamp_location(caller, location).await;
        Ok(job)
    }

    async fn load(&self, job_id: Uuid) -> Result<Job, AppError> {
        bounded(self.store_timeout, "jobs.get", self.jobs.get(job_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {job_id} not found")))
    }

    async fn swap(
        &self,
        job_id: Uuid,
        guard: &JobGuard,
        update: &JobUpdate,
    ) -> Result<Option<Job>, AppError> {
        Ok(bounded(
            self.store_timeout,
            "jobs.conditional_update",
            self.jobs.conditional_update(job_id, guard, update),
        )
        .await?)
    }

    /// Classifies a failed claim: the job is either gone or already taken.
    async fn unclaimable(&self, job_id: Uuid) -> Result<AppError, AppError> {
        match bounded(self.store_timeout, "jobs.get", self.jobs.get(job_id)).await? {
            None => Ok(AppError::NotFound(format!("job {job_id} not found"))),
            Some(_) => Ok(AppError::NotAvailable),
        }
    }

    async fn stamp_location(&self, courier_id: &str, location: Option<GeoPoint>) {
        let Some(location) = location else {
            return;
        };

        let result = bounded(
            self.store_timeout,
            "couriers.stamp_location",
            self.couriers.stamp_location(courier_id, location, Utc::now()),
        )
        .await;

        match result {
            Ok(true) => debug!(courier_id, lat = location.lat, lng = location.lng, "courier location stamped"),
            Ok(false) => {
                self.metrics.location_stamp_failures_total.inc();
                warn!(courier_id, "location not stamped: courier not in directory");
            }
            Err(err) => {
                self.metrics.location_stamp_failures_total.inc();
                warn!(courier_id, error = %err, "failed to stamp courier location");
            }
        }
    }

    fn publish(&self, job: &Job) {
        // No subscribers is not an error.
        let _ = self.events_tx.send(JobEvent::from_job(job));
    }

    async fn instrumented<T, F>(&self, operation: &'static str, op: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let start = Instant::now();
        let result = op.await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(_) => self.metrics.observe(operation, "success", elapsed),
            Err(err) => {
                self.metrics.observe(operation, err.outcome_label(), elapsed);
                if err.is_business_outcome() {
                    debug!(operation, outcome = err.outcome_label(), "lifecycle request rejected");
                }
            }
        }

        result
    }
}

fn validate_new_job(new: &NewJob) -> Result<(), AppError> {
    if new.order_id.trim().is_empty() {
        return Err(AppError::BadRequest("orderId cannot be empty".to_string()));
    }
    if new.delivery_address.trim().is_empty() {
        return Err(AppError::BadRequest("deliveryAddress cannot be empty".to_string()));
    }
    if new.order_amount < 0 || new.delivery_fee < 0 {
        return Err(AppError::BadRequest(
            "orderAmount and deliveryFee must be >= 0".to_string(),
        ));
    }
    if new.order_amount > MAX_AMOUNT || new.delivery_fee > MAX_AMOUNT {
        return Err(AppError::BadRequest(format!(
            "orderAmount and deliveryFee must be <= {MAX_AMOUNT}"
        )));
    }
    let quantities = new
        .items
        .iter()
        .try_fold(0u32, |acc, item| acc.checked_add(item.quantity));
    if quantities.is_none() {
        return Err(AppError::BadRequest("item quantities overflow".to_string()));
    }
    if !new.distance_km.is_finite() || new.distance_km < 0.0 {
        return Err(AppError::BadRequest("distanceKm must be >= 0".to_string()));
    }
    GeoPoint::new(new.pickup.lat, new.pickup.lng)?;
    GeoPoint::new(new.dropoff.lat, new.dropoff.lng)?;
    Ok(())
}
