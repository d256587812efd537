//! # Managed Objects
//!
//! Traits every resource kind driven by the reconciliation engine implements.

use super::InstanceStatus;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Reference to the secret holding the provider API token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthSecretReference {
    /// Name of the secret in the object's namespace
    pub name: String,
    /// Field of the secret holding the token
    pub key: String,
}

/// A namespaced object the operator can load and persist
///
/// Implemented for every kube resource with a static type, including
/// `Secret`.
pub trait StoredResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> StoredResource for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// A desired-state object whose remote counterpart is lifecycle-managed
pub trait ManagedObject: StoredResource {
    /// Secret holding the credentials used for this object
    fn auth_secret_ref(&self) -> &AuthSecretReference;

    /// Shared progress/conditions block, if a status was ever written
    fn instance_status(&self) -> Option<&InstanceStatus>;

    /// Shared progress/conditions block, created on first access
    fn instance_status_mut(&mut self) -> &mut InstanceStatus;
}
