//! # Controller
//!
//! Core controller modules for the Managed Service Operator.
//!
//! - `handlers`: Per-kind provider adapters
//! - `reconciler`: Generic instance-reconciliation engine
//! - `server`: HTTP server for metrics and health checks
//! - `user_config`: Flattening of sparse user configuration into API payloads

pub mod handlers;
pub mod reconciler;
pub mod server;
pub mod user_config;
