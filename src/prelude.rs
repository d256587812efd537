//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use managed_service_operator::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (ServiceIntegration, InstanceStatus, etc.)
//! - The reconciliation engine, its Handler contract and store/recorder seams
//! - The provider client and its error type
//! - Config types (ControllerConfig)

// CRD types - most commonly used
pub use crate::crd::*;

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    AuthContextResolver, EventRecorder, EventSeverity, FinalizerManager, Handler, HandlerError,
    InstanceReconciler, KubeEventRecorder, KubeStore, ObjectKey, ObjectStore, Reason,
    ReconcileOutcome, ReconcilerError, StoreError,
};

// Shipped handlers
pub use crate::controller::handlers::ServiceIntegrationHandler;

// Configuration flattening for user config structures
pub use crate::controller::user_config::{flatten, Field, UserConfig};

// Provider client
pub use crate::provider::{ProviderClient, ProviderError};

// Config types - for configuration management
pub use crate::config::ControllerConfig;
