//! # Runtime
//!
//! Process wiring for the operator binary.
//!
//! - `initialization`: rustls, tracing, metrics, HTTP server and Kubernetes client setup
//! - `watch_loop`: Controller watch loop driving the reconciliation engine
//! - `error_policy`: Requeue policy for failed passes

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use crate::config::ControllerConfig;
use crate::controller::handlers::ServiceIntegrationHandler;
use crate::controller::reconciler::{InstanceReconciler, KubeEventRecorder, KubeStore};

/// Engine specialised to the live cluster store and event recorder
pub type OperatorReconciler = InstanceReconciler<KubeStore, KubeEventRecorder>;

/// Shared state handed to every reconcile and error-policy call
#[derive(Debug)]
pub struct Context {
    pub reconciler: OperatorReconciler,
    pub handler: ServiceIntegrationHandler,
    pub config: ControllerConfig,
}
