//! # Handlers
//!
//! Per-kind implementations of the reconciliation `Handler` contract.
//!
//! - `service_integration`: `ServiceIntegration` objects

pub mod service_integration;

pub use service_integration::ServiceIntegrationHandler;
