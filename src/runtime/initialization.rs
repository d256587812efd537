//! # Initialization
//!
//! Operator initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::ControllerConfig;
use crate::constants::{CONTROLLER_NAME, OPERATOR_USER_AGENT};
use crate::controller::handlers::ServiceIntegrationHandler;
use crate::controller::reconciler::{
    AuthContextResolver, InstanceReconciler, KubeEventRecorder, KubeStore,
};
use crate::controller::server::{start_server, ServerState};
use crate::crd::ServiceIntegration;
use crate::observability;
use crate::runtime::Context;
use anyhow::Result;
use kube::{api::Api, Client};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initialization result containing all necessary components for the operator
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// API for ServiceIntegration objects, scoped to the watched namespace
    pub integrations: Api<ServiceIntegration>,
    /// Shared reconcile context
    pub context: Arc<Context>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .field("watch_namespace", &self.context.config.watch_namespace)
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
pub async fn initialize(config: ControllerConfig) -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_provider| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    init_tracing(&config);

    info!("Starting Managed Service Operator");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());

    // Readiness probes should pass before the first reconcile starts
    let server_state_clone = server_state.clone();
    let server_port = config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &config).await?;

    let client = Client::try_default().await?;

    let integrations: Api<ServiceIntegration> = match config.watch_namespace.as_deref() {
        Some(namespace) => {
            info!("Watching ServiceIntegration objects in namespace '{}'", namespace);
            Api::namespaced(client.clone(), namespace)
        }
        None => {
            info!("Watching ServiceIntegration objects in all namespaces");
            Api::all(client.clone())
        }
    };

    let reconciler = InstanceReconciler::new(
        KubeStore::new(client.clone()),
        KubeEventRecorder::new(
            client.clone(),
            CONTROLLER_NAME,
            config.reporter_instance.clone(),
        ),
        AuthContextResolver::new(config.provider_api_url.clone(), OPERATOR_USER_AGENT),
    );

    info!(
        provider.api_url = %config.provider_api_url,
        "Operator initialized, starting watch loop..."
    );

    Ok(InitializationResult {
        client,
        integrations,
        context: Arc::new(Context {
            reconciler,
            handler: ServiceIntegrationHandler::new(),
            config,
        }),
        server_state,
    })
}

fn init_tracing(config: &ControllerConfig) {
    let default_directive = format!(
        "managed_service_operator={}",
        config.log_level.to_lowercase()
    );
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_directive))
        .unwrap_or_else(|_| EnvFilter::new("managed_service_operator=info"));

    if config.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ControllerConfig,
) -> Result<()> {
    let startup_timeout = config.server_startup_timeout();
    let poll_interval = config.server_poll_interval();
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        // Set by start_server once bound
        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config() -> ControllerConfig {
        ControllerConfig {
            server_startup_timeout_secs: 1,
            server_poll_interval_ms: 5,
            ..ControllerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_wait_returns_once_server_marks_ready() {
        let state = Arc::new(ServerState::default());
        let flag = state.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.set_ready(true);
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        wait_for_server_ready(&state, &handle, &fast_config())
            .await
            .expect("server should become ready");
        handle.abort();
    }

    #[tokio::test]
    async fn test_wait_fails_when_server_task_exits() {
        let state = Arc::new(ServerState::default());
        let handle = tokio::spawn(async {});
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = wait_for_server_ready(&state, &handle, &fast_config())
            .await
            .expect_err("finished server task must fail startup");
        assert!(err.to_string().contains("failed to start"));
    }
}
