//! Purchase request (satınalma) approval core.
//!
//! Ordered multi-approver decisions, free-text status markers and supplier
//! offer ranking, driven against a [`api::PurchaseApi`] backend.

pub mod api;
pub mod approval;
pub mod config;
pub mod error;
pub mod markers;
pub mod normalize;
pub mod offer;
pub mod projection;
pub mod request;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;
