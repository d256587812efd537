//! # Configuration
//!
//! Process-level configuration. Per-object settings live on the custom
//! resources themselves.

mod controller;

pub use controller::ControllerConfig;
