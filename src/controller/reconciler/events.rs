//! # Lifecycle Events
//!
//! Registry of event reasons emitted while reconciling an instance, and the
//! recorder seam they are published through.
//!
//! Reason strings are an operational contract: alerting and dashboards match
//! on them, so they must not change.
//!
//! Dashboards written against the Aiven Kubernetes operator's events need two
//! renames: `ReconcilationStarted` (sic) is `ReconciliationStarted` here, and
//! every `...AtAiven` reason is `...AtProvider` here.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Client;
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::warn;

/// Event reasons emitted by the reconciliation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    UnableToGetAuthSecret,
    UnableToCreateClient,
    ReconciliationStarted,
    TryingToDeleteAtProvider,
    UnableToDeleteAtProvider,
    UnableToDeleteFinalizer,
    SuccessfullyDeletedAtProvider,
    InstanceFinalizerAdded,
    UnableToAddFinalizer,
    WaitingForPreconditions,
    UnableToWaitForPreconditions,
    PreconditionsAreMet,
    UnableToCreateOrUpdateAtProvider,
    CreateOrUpdatedAtProvider,
    CreatedOrUpdatedAtProvider,
    WaitingForInstanceToBeRunning,
    UnableToWaitForInstanceToBeRunning,
    InstanceIsRunning,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::UnableToGetAuthSecret => "UnableToGetAuthSecret",
            Reason::UnableToCreateClient => "UnableToCreateClient",
            Reason::ReconciliationStarted => "ReconciliationStarted",
            Reason::TryingToDeleteAtProvider => "TryingToDeleteAtProvider",
            Reason::UnableToDeleteAtProvider => "UnableToDeleteAtProvider",
            Reason::UnableToDeleteFinalizer => "UnableToDeleteFinalizer",
            Reason::SuccessfullyDeletedAtProvider => "SuccessfullyDeletedAtProvider",
            Reason::InstanceFinalizerAdded => "InstanceFinalizerAdded",
            Reason::UnableToAddFinalizer => "UnableToAddFinalizer",
            Reason::WaitingForPreconditions => "WaitingForPreconditions",
            Reason::UnableToWaitForPreconditions => "UnableToWaitForPreconditions",
            Reason::PreconditionsAreMet => "PreconditionsAreMet",
            Reason::UnableToCreateOrUpdateAtProvider => "UnableToCreateOrUpdateAtProvider",
            Reason::CreateOrUpdatedAtProvider => "CreateOrUpdatedAtProvider",
            Reason::CreatedOrUpdatedAtProvider => "CreatedOrUpdatedAtProvider",
            Reason::WaitingForInstanceToBeRunning => "WaitingForInstanceToBeRunning",
            Reason::UnableToWaitForInstanceToBeRunning => "UnableToWaitForInstanceToBeRunning",
            Reason::InstanceIsRunning => "InstanceIsRunning",
        }
    }

    /// Short machine-readable action attached to the published event
    fn action(&self) -> &'static str {
        match self {
            Reason::UnableToGetAuthSecret | Reason::UnableToCreateClient => "Authenticate",
            Reason::ReconciliationStarted => "Reconcile",
            Reason::TryingToDeleteAtProvider
            | Reason::UnableToDeleteAtProvider
            | Reason::SuccessfullyDeletedAtProvider => "Delete",
            Reason::UnableToDeleteFinalizer
            | Reason::InstanceFinalizerAdded
            | Reason::UnableToAddFinalizer => "Finalize",
            Reason::WaitingForPreconditions
            | Reason::UnableToWaitForPreconditions
            | Reason::PreconditionsAreMet => "CheckPreconditions",
            Reason::UnableToCreateOrUpdateAtProvider
            | Reason::CreateOrUpdatedAtProvider
            | Reason::CreatedOrUpdatedAtProvider => "CreateOrUpdate",
            Reason::WaitingForInstanceToBeRunning
            | Reason::UnableToWaitForInstanceToBeRunning
            | Reason::InstanceIsRunning => "WaitForRunning",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    Normal,
    Warning,
}

/// Sink for lifecycle notifications
///
/// Recording never fails from the caller's point of view; implementations
/// log their own failures.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn record(
        &self,
        object: &ObjectReference,
        severity: EventSeverity,
        reason: Reason,
        note: String,
    );
}

/// Publishes lifecycle notifications as Kubernetes Events
#[derive(Clone)]
pub struct KubeEventRecorder {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventRecorder").finish_non_exhaustive()
    }
}

impl KubeEventRecorder {
    pub fn new(client: Client, controller: &str, instance: Option<String>) -> Self {
        let reporter = Reporter {
            controller: controller.to_string(),
            instance,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventRecorder for KubeEventRecorder {
    async fn record(
        &self,
        object: &ObjectReference,
        severity: EventSeverity,
        reason: Reason,
        note: String,
    ) {
        let event = Event {
            type_: match severity {
                EventSeverity::Normal => EventType::Normal,
                EventSeverity::Warning => EventType::Warning,
            },
            reason: reason.as_str().to_string(),
            note: Some(note),
            action: reason.action().to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, object).await {
            warn!(
                reason = reason.as_str(),
                resource.name = object.name.as_deref().unwrap_or("unknown"),
                resource.namespace = object.namespace.as_deref().unwrap_or("unknown"),
                error = %e,
                "failed to publish event"
            );
        }
    }
}
