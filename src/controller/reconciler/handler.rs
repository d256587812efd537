//! # Handler Contract
//!
//! Per-kind adapter between a managed object and the provider API. The
//! engine drives every kind through the same state machine and calls into
//! its handler for the four resource-specific operations.

use crate::crd::ManagedObject;
use crate::provider::{ProviderClient, ProviderError, INVALID_TOKEN_MESSAGE};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The remote resource does not exist (yet)
    #[error("remote resource not found: {0}")]
    NotFound(String),

    /// The object's spec cannot be turned into a provider request
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn is_not_found(&self) -> bool {
        match self {
            HandlerError::Provider(e) => e.is_not_found(),
            HandlerError::NotFound(_) => true,
            HandlerError::InvalidSpec(_) | HandlerError::Other(_) => false,
        }
    }

    /// The failure was caused by an invalid or unusable credential
    ///
    /// Provider errors are classified by status. Errors that carry no
    /// structure are matched on the provider's message as a fallback.
    pub fn is_invalid_credentials(&self) -> bool {
        match self {
            HandlerError::Provider(e) => e.is_invalid_credentials(),
            HandlerError::Other(e) => format!("{e:#}").contains(INVALID_TOKEN_MESSAGE),
            HandlerError::NotFound(_) | HandlerError::InvalidSpec(_) => false,
        }
    }
}

/// Resource-specific operations invoked by the reconciliation engine
#[async_trait]
pub trait Handler<K: ManagedObject>: Send + Sync {
    /// Whether everything the resource depends on is in place
    ///
    /// Must not mutate remote state; it is called on every pass.
    async fn check_preconditions(
        &self,
        client: &ProviderClient,
        obj: &K,
    ) -> Result<bool, HandlerError>;

    /// Create the remote resource, or update it when an id is already recorded
    ///
    /// A provider answer meaning "nothing changed" is a success.
    async fn create_or_update(&self, client: &ProviderClient, obj: &mut K)
        -> Result<(), HandlerError>;

    /// Delete the remote resource; `true` once it is gone
    ///
    /// A remote resource that no longer exists counts as deleted.
    async fn delete(&self, client: &ProviderClient, obj: &K) -> Result<bool, HandlerError>;

    /// Refresh status and conditions from the provider
    ///
    /// Marks the object running once ready, and may return a secret (e.g.
    /// connection credentials) to materialize next to the object.
    async fn get(&self, client: &ProviderClient, obj: &mut K)
        -> Result<Option<Secret>, HandlerError>;
}
