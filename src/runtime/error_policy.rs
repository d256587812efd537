//! # Error Policy
//!
//! Requeue policy applied when a reconciliation pass returns an error.
//!
//! The engine itself only asks for the fixed interval on expected waits; a
//! failed pass is retried after the configured error delay instead.

use crate::controller::reconciler::ReconcilerError;
use crate::crd::ServiceIntegration;
use crate::observability;
use crate::runtime::Context;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Handle reconciliation errors with a fixed retry delay
pub fn handle_reconciliation_error(
    obj: Arc<ServiceIntegration>,
    error: &ReconcilerError,
    ctx: Arc<Context>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {}", namespace, name, error);
    observability::metrics::increment_reconciliation_errors();

    let delay = ctx.config.reconciliation_error_requeue_duration();
    info!(
        "🔄 Retrying in {}s (trigger source: error-backoff)",
        delay.as_secs()
    );

    observability::metrics::increment_requeues("error-backoff");
    Action::requeue(delay)
}
