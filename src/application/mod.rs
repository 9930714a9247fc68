//! Application layer: services that orchestrate the domain ports.
//!
//! Each service owns the `Arc`ed ports it needs and is cheap to clone, so the
//! HTTP layer and the CLI can share one set of services over the same stores.

pub mod auth;
pub mod idempotency;
pub mod menu;
pub mod orders;
pub mod payments;
pub mod replay;
pub mod reports;

use crate::error::{PosError, Result};
use serde::Serialize;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Validated page/limit pair for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Result<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);
        if page < 1 {
            return Err(PosError::validation("Page must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(PosError::validation(format!(
                "Limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page, limit })
    }

    /// Slices `rows` down to the requested page.
    pub fn slice<T>(&self, rows: Vec<T>) -> (Vec<T>, Pagination) {
        let total_items = rows.len() as u64;
        let limit = u64::from(self.limit);
        let skip = (u64::from(self.page) - 1) * limit;
        let page: Vec<T> = rows
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(self.limit as usize)
            .collect();
        let pagination = Pagination {
            current_page: self.page,
            total_pages: total_items.div_ceil(limit),
            total_items,
        };
        (page, pagination)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
}
