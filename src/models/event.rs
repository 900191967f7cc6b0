use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{Job, JobStatus};

/// Published on the event channel after every successful transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: Uuid,
    pub order_id: String,
    pub courier_id: Option<String>,
    pub status: JobStatus,
    pub at: DateTime<Utc>,
}

impl JobEvent {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            order_id: job.order_id.clone(),
            courier_id: job.courier_id.clone(),
            status: job.status,
            at: job.updated_at,
        }
    }
}
