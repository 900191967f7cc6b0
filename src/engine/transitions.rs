use crate::error::AppError;
use crate::models::job::JobStatus;

/// The single forward successor of `status`. Terminal states and
/// `Cancelled` have none; cancellation is not part of the forward table.
pub fn successor(status: JobStatus) -> Option<JobStatus> {
    match status {
        JobStatus::Pending => Some(JobStatus::PickedUp),
        JobStatus::PickedUp => Some(JobStatus::InTransit),
        JobStatus::InTransit => Some(JobStatus::Delivered),
        JobStatus::Delivered | JobStatus::Cancelled => None,
    }
}

pub fn validate(from: JobStatus, to: JobStatus) -> Result<(), AppError> {
    if successor(from) == Some(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}
