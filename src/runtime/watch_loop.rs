//! # Watch Loop
//!
//! Controller watch loop that monitors ServiceIntegration objects and hands
//! each change to the reconciliation engine.

use crate::controller::reconciler::{ObjectKey, ReconcilerError};
use crate::controller::server::ServerState;
use crate::crd::ServiceIntegration;
use crate::runtime::error_policy::handle_reconciliation_error;
use crate::runtime::Context;
use futures::StreamExt;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::{controller, controller::Action, watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

const WATCH_RESTART_DELAY: Duration = Duration::from_secs(5);

/// What to do once the controller stream has ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    Shutdown,
    Restart,
}

/// Run the controller watch loop
///
/// Marks the server not-ready on SIGINT/SIGTERM and restarts the watch if the
/// controller stream ends while the operator is still meant to be running.
pub async fn run_watch_loop(
    integrations: Api<ServiceIntegration>,
    context: Arc<Context>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let shutdown_server_state = server_state.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Initiating graceful shutdown...");
        shutdown_server_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
        let _ = shutdown_tx.send(true);
    });

    let concurrency = context.config.max_concurrent_reconciliations;

    loop {
        if *shutdown_rx.borrow() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop"
        );

        info!("Starting controller watch loop...");
        Controller::new(
            integrations.clone(),
            watcher::Config::default().any_semantic(),
        )
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile_integration, handle_reconciliation_error, context.clone())
        .for_each(|result| {
            match result {
                Ok((obj_ref, action)) => {
                    debug!(resource = %obj_ref, action = ?action, "watch.event.reconciled");
                }
                Err(e) => {
                    warn!(error = %e, "watch.event.failed");
                }
            }
            futures::future::ready(())
        })
        .instrument(watch_span)
        .await;

        info!("Controller watch stream ended");
        match after_stream_end(&mut shutdown_rx, WATCH_RESTART_DELAY).await {
            StreamEnd::Shutdown => {
                info!("Shutdown requested, exiting watch loop");
                break;
            }
            StreamEnd::Restart => {
                warn!(
                    delay_secs = WATCH_RESTART_DELAY.as_secs(),
                    "Controller watch stream ended without shutdown, restarting"
                );
            }
        }
    }

    info!(ready = server_state.is_ready(), "Operator stopped gracefully");
    Ok(())
}

/// Resolve on the first SIGINT or SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}

/// Decide between exiting and restarting after the controller stream ended
///
/// The controller's own signal handler can end the stream a moment before the
/// shutdown flag is raised, so the restart delay doubles as a window in which
/// a pending shutdown still wins.
async fn after_stream_end(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> StreamEnd {
    match tokio::time::timeout(delay, shutdown.wait_for(|requested| *requested)).await {
        Ok(Ok(_)) => StreamEnd::Shutdown,
        Ok(Err(_closed)) => {
            tokio::time::sleep(delay).await;
            StreamEnd::Restart
        }
        Err(_elapsed) => StreamEnd::Restart,
    }
}

/// Reconcile one ServiceIntegration handed over by the controller
///
/// Only the key is taken from the watch cache; the engine loads the stored
/// revision itself.
async fn reconcile_integration(
    obj: Arc<ServiceIntegration>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcilerError> {
    let key = ObjectKey::new(obj.namespace().unwrap_or_default(), obj.name_any());

    let reconcile_span = tracing::span!(
        tracing::Level::INFO,
        "controller.watch.reconcile",
        resource.name = key.name.as_str(),
        resource.namespace = key.namespace.as_str(),
        resource.generation = obj.metadata.generation.unwrap_or(0),
        event.r#type = "watch_triggered"
    );

    ctx.reconciler
        .reconcile::<ServiceIntegration, _>(&key, &ctx.handler)
        .instrument(reconcile_span)
        .await
        .map(Action::from)
}
