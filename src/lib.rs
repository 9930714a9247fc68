//! Restaurant point-of-sale backend: menu, dine-in orders, payments with
//! Midtrans reconciliation, staff accounts and sales reporting.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
