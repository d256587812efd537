//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Base URL of the provider REST API
    pub provider_api_url: String,
    /// Reconciliation error requeue interval (seconds)
    /// How long the scheduler waits before retrying a failed pass
    pub reconciliation_error_requeue_secs: u64,
    /// HTTP server port for metrics and probes
    pub metrics_port: u16,
    /// HTTP server startup timeout (seconds)
    pub server_startup_timeout_secs: u64,
    /// HTTP server readiness poll interval (milliseconds)
    pub server_poll_interval_ms: u64,
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Maximum concurrent reconciliations
    /// Limits how many objects can be reconciled simultaneously
    pub max_concurrent_reconciliations: u16,
    /// Instance name reported on Kubernetes events (usually the pod name)
    pub reporter_instance: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            provider_api_url: DEFAULT_PROVIDER_API_URL.to_string(),
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
            server_startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            server_poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
            watch_namespace: None,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            reporter_instance: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map-backed lookup instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            provider_api_url: lookup("PROVIDER_API_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.provider_api_url),
            reconciliation_error_requeue_secs: parse_or(
                lookup("RECONCILIATION_ERROR_REQUEUE_SECS"),
                defaults.reconciliation_error_requeue_secs,
            ),
            metrics_port: parse_or(lookup("METRICS_PORT"), defaults.metrics_port),
            server_startup_timeout_secs: parse_or(
                lookup("SERVER_STARTUP_TIMEOUT_SECS"),
                defaults.server_startup_timeout_secs,
            ),
            server_poll_interval_ms: parse_or(
                lookup("SERVER_POLL_INTERVAL_MS"),
                defaults.server_poll_interval_ms,
            ),
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|v| !v.is_empty()),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT").unwrap_or(defaults.log_format),
            max_concurrent_reconciliations: parse_or(
                lookup("MAX_CONCURRENT_RECONCILIATIONS"),
                defaults.max_concurrent_reconciliations,
            ),
            reporter_instance: lookup("POD_NAME").filter(|v| !v.is_empty()),
        }
    }

    /// Get reconciliation error requeue duration
    pub fn reconciliation_error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.reconciliation_error_requeue_secs)
    }

    /// Get server startup timeout duration
    pub fn server_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.server_startup_timeout_secs)
    }

    /// Get server readiness poll interval
    pub fn server_poll_interval(&self) -> Duration {
        Duration::from_millis(self.server_poll_interval_ms)
    }

    /// Whether logs should be emitted as JSON lines
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
