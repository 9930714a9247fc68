//! Domain layer: entities, value objects and the ports the application
//! layer talks to. No I/O lives here.

pub mod audit;
pub mod menu;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod sales;
pub mod user;
