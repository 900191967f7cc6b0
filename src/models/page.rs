use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const MAX_PAGE_LIMIT: u64 = 100;

/// Offset window over a sorted result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
}

impl PageRequest {
    pub fn new(limit: u64, offset: u64) -> Result<Self, AppError> {
        if limit == 0 {
            return Err(AppError::BadRequest("limit must be >= 1".to_string()));
        }

        Ok(Self {
            limit: limit.min(MAX_PAGE_LIMIT),
            offset,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            limit: request.limit,
            offset: request.offset,
            has_next: request.offset.saturating_add(request.limit) < total,
            has_previous: request.offset > 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}
