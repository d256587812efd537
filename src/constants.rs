//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! Finalizer names and annotation keys are part of the persisted contract with
//! the cluster: changing them orphans objects written by earlier releases.

use std::time::Duration;

/// Fixed requeue interval for every "not there yet" outcome of a pass
/// (preconditions not met, remote resource not found yet, not running yet)
pub const REQUEUE_INTERVAL_SECS: u64 = 10;

/// [`REQUEUE_INTERVAL_SECS`] as a [`Duration`]
pub const REQUEUE_INTERVAL: Duration = Duration::from_secs(REQUEUE_INTERVAL_SECS);

/// Finalizer placed on the credential secret while any instance uses it
pub const SECRET_PROTECTION_FINALIZER: &str =
    "finalizers.managedservices.io/needed-to-delete-services";

/// Finalizer placed on a managed object until its remote counterpart is gone
pub const INSTANCE_DELETION_FINALIZER: &str =
    "finalizers.managedservices.io/delete-remote-resource";

/// Annotation holding the last generation for which create/update succeeded
pub const PROCESSED_GENERATION_ANNOTATION: &str =
    "controllers.managedservices.io/generation-was-processed";

/// Presence-only annotation set once a read-back confirmed the ready state
pub const INSTANCE_IS_RUNNING_ANNOTATION: &str =
    "controllers.managedservices.io/instance-is-running";

/// Name used as field manager and event reporter
pub const CONTROLLER_NAME: &str = "managed-service-operator";

/// User agent sent with every provider API request
pub const OPERATOR_USER_AGENT: &str = concat!("k8s-operator/", env!("CARGO_PKG_VERSION"));

/// Default provider REST API base URL
pub const DEFAULT_PROVIDER_API_URL: &str = "https://api.managedservices.io/v1";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default requeue interval after a failed pass (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 30;

/// Default number of objects reconciled in parallel
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Provider service state reported once a service accepts traffic
pub const SERVICE_STATE_RUNNING: &str = "RUNNING";
