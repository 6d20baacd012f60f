//! services/api/src/lib.rs
//!
//! The HTTP surface of Legal Lens: configuration, adapters for the core
//! ports, the axum router and a typed client.

pub mod adapters;
pub mod client;
pub mod config;
pub mod error;
pub mod report;
pub mod web;
