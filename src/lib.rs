//! Managed Service Operator Library
//!
//! This library provides the core functionality for the Managed Service Operator:
//! a reconciliation engine that drives externally hosted resources from
//! declarative custom resources through repeated, idempotent passes.
//!
//! ## Quick Start
//!
//! ```rust
//! use managed_service_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
