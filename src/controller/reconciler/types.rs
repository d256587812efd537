//! # Types
//!
//! Core types for the reconciler.

use super::handler::HandlerError;
use super::store::StoreError;
use crate::constants::REQUEUE_INTERVAL;
use crate::provider::ProviderError;
use kube_runtime::controller::Action;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Namespace and name identifying one object in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of a successful pass, handed back to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    pub requeue: bool,
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    /// Nothing left to do until the object changes
    pub fn done() -> Self {
        Self::default()
    }

    /// Run again after the fixed requeue interval
    pub fn requeue_after_interval() -> Self {
        Self {
            requeue: true,
            requeue_after: Some(REQUEUE_INTERVAL),
        }
    }
}

impl From<ReconcileOutcome> for Action {
    fn from(outcome: ReconcileOutcome) -> Self {
        match (outcome.requeue, outcome.requeue_after) {
            (true, Some(after)) => Action::requeue(after),
            (true, None) => Action::requeue(REQUEUE_INTERVAL),
            (false, _) => Action::await_change(),
        }
    }
}

/// Failure of a single reconciliation step
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("cannot load object {key}: {source}")]
    Load {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("cannot get secret {name:?}: {reason}")]
    AuthSecret { name: String, reason: String },

    #[error("cannot initialize provider client: {0}")]
    ClientInit(#[source] ProviderError),

    #[error("unable to add finalizer to secret: {0}")]
    SecretFinalizer(#[source] StoreError),

    #[error("unable to add finalizer to instance: {0}")]
    InstanceFinalizer(#[source] StoreError),

    #[error("unable to remove finalizer: {0}")]
    RemoveFinalizer(#[source] StoreError),

    #[error("unable to wait for preconditions: {0}")]
    Preconditions(#[source] HandlerError),

    #[error("unable to create or update instance at provider: {0}")]
    CreateOrUpdate(#[source] HandlerError),

    #[error("unable to wait until instance is running: {0}")]
    WaitForRunning(#[source] HandlerError),

    #[error("unable to create or update connection secret: {0}")]
    ConnectionSecret(#[source] StoreError),

    #[error("unable to persist instance: {0}")]
    Persist(#[source] StoreError),

    #[error("unable to delete instance at provider: {0}")]
    Delete(#[source] HandlerError),

    #[error("{}", join_errors(.0))]
    Multiple(Vec<ReconcilerError>),
}

impl ReconcilerError {
    /// Combine several failures; `None` when there are none, the error
    /// itself when there is exactly one
    pub fn aggregate(mut errors: Vec<ReconcilerError>) -> Option<ReconcilerError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ReconcilerError::Multiple(errors)),
        }
    }
}

fn join_errors(errors: &[ReconcilerError]) -> String {
    let items: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("{} errors occurred: {}", errors.len(), items.join("; "))
}
