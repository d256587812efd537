//! # Object Store
//!
//! Seam between the reconciliation engine and the cluster object store.
//!
//! The engine only ever reads objects by key, replaces them, replaces their
//! status, and materializes secrets owned by them. `KubeStore` maps those
//! operations onto the Kubernetes API; tests use an in-memory implementation.

use super::types::ObjectKey;
use crate::constants::CONTROLLER_NAME;
use crate::crd::StoredResource;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("object {0} not found")]
    NotFound(ObjectKey),

    /// The store refused the write (stale resource version, invalid object)
    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("cannot serialize object: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound(_) => true,
            StoreError::Kube(kube::Error::Api(response)) => response.code == 404,
            _ => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Kube(kube::Error::Api(response)) if response.code == 409)
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object; `None` when it does not exist
    async fn get<R: StoredResource>(&self, key: &ObjectKey) -> Result<Option<R>, StoreError>;

    /// Persist metadata and spec; `obj` is refreshed from the stored copy
    async fn update<R: StoredResource>(&self, obj: &mut R) -> Result<(), StoreError>;

    /// Persist the status only; refreshes the resource version of `obj`
    async fn update_status<R: StoredResource>(&self, obj: &mut R) -> Result<(), StoreError>;

    /// Create or adopt `secret` in the owner's namespace with a controller
    /// owner reference to `owner`
    async fn apply_owned_secret<K: StoredResource>(
        &self,
        owner: &K,
        secret: Secret,
    ) -> Result<(), StoreError>;
}

/// `ObjectStore` backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<R: StoredResource>(&self, namespace: &str) -> Api<R> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn key_of<R: StoredResource>(obj: &R) -> Result<ObjectKey, StoreError> {
    let name = obj
        .meta()
        .name
        .clone()
        .ok_or_else(|| StoreError::Rejected("object has no name".to_string()))?;
    let namespace = obj
        .meta()
        .namespace
        .clone()
        .ok_or_else(|| StoreError::Rejected(format!("object {name} has no namespace")))?;
    Ok(ObjectKey { namespace, name })
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<R: StoredResource>(&self, key: &ObjectKey) -> Result<Option<R>, StoreError> {
        Ok(self.api::<R>(&key.namespace).get_opt(&key.name).await?)
    }

    async fn update<R: StoredResource>(&self, obj: &mut R) -> Result<(), StoreError> {
        let key = key_of(obj)?;
        let stored = self
            .api::<R>(&key.namespace)
            .replace(&key.name, &PostParams::default(), obj)
            .await?;
        debug!(
            resource.name = %key.name,
            resource.namespace = %key.namespace,
            resource_version = ?stored.resource_version(),
            "object updated"
        );
        *obj = stored;
        Ok(())
    }

    async fn update_status<R: StoredResource>(&self, obj: &mut R) -> Result<(), StoreError> {
        let key = key_of(obj)?;
        let status = serde_json::to_value(&*obj)?
            .get("status")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        // resourceVersion in a merge patch turns it into a guarded write
        let patch = json!({
            "metadata": { "resourceVersion": obj.resource_version() },
            "status": status,
        });
        let stored = self
            .api::<R>(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        obj.meta_mut().resource_version = stored.meta().resource_version.clone();
        Ok(())
    }

    async fn apply_owned_secret<K: StoredResource>(
        &self,
        owner: &K,
        mut secret: Secret,
    ) -> Result<(), StoreError> {
        let owner_key = key_of(owner)?;
        let owner_ref = owner.controller_owner_ref(&()).ok_or_else(|| {
            StoreError::Rejected(format!("owner {owner_key} has no uid yet"))
        })?;
        let name = secret
            .metadata
            .name
            .clone()
            .ok_or_else(|| StoreError::Rejected("secret has no name".to_string()))?;

        secret.metadata.namespace = Some(owner_key.namespace.clone());
        secret.metadata.owner_references = Some(vec![owner_ref]);
        secret.metadata.managed_fields = None;
        secret.metadata.resource_version = None;

        self.api::<Secret>(&owner_key.namespace)
            .patch(
                &name,
                &PatchParams::apply(CONTROLLER_NAME).force(),
                &Patch::Apply(&secret),
            )
            .await?;
        debug!(
            secret.name = %name,
            resource.name = %owner_key.name,
            resource.namespace = %owner_key.namespace,
            "owned secret applied"
        );
        Ok(())
    }
}
