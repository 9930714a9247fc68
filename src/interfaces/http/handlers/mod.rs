//! Route handlers, one module per API area.

pub mod auth;
pub mod health;
pub mod menu;
pub mod orders;
pub mod owner;
pub mod payments;
pub mod staff;

use serde::{Deserialize, Serialize};

/// `?page=&limit=` on list endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

impl Deleted {
    pub const YES: Self = Self { deleted: true };
}
