//! # Finalizers
//!
//! Adds and removes named finalizers and persists the change through the
//! object store.
//!
//! Both operations are idempotent. When the write fails the in-memory
//! finalizer list is restored, so a failed call leaves the object exactly as
//! it was and the same step can be retried on the next pass.

use super::store::{ObjectStore, StoreError};
use crate::crd::StoredResource;
use kube::ResourceExt;
use tracing::debug;

pub fn has_finalizer<R: StoredResource>(obj: &R, name: &str) -> bool {
    obj.finalizers().iter().any(|f| f == name)
}

#[derive(Debug)]
pub struct FinalizerManager<'a, S> {
    store: &'a S,
}

impl<'a, S: ObjectStore> FinalizerManager<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Add `name` and persist; returns `false` when it was already present
    pub async fn add<R: StoredResource>(
        &self,
        obj: &mut R,
        name: &str,
    ) -> Result<bool, StoreError> {
        if has_finalizer(obj, name) {
            return Ok(false);
        }
        let previous = obj.meta().finalizers.clone();
        obj.finalizers_mut().push(name.to_string());
        self.persist(obj, previous).await?;
        debug!(finalizer = name, resource.name = %obj.name_any(), "finalizer added");
        Ok(true)
    }

    /// Remove `name` and persist; returns `false` when it was not present
    pub async fn remove<R: StoredResource>(
        &self,
        obj: &mut R,
        name: &str,
    ) -> Result<bool, StoreError> {
        if !has_finalizer(obj, name) {
            return Ok(false);
        }
        let previous = obj.meta().finalizers.clone();
        obj.finalizers_mut().retain(|f| f != name);
        self.persist(obj, previous).await?;
        debug!(finalizer = name, resource.name = %obj.name_any(), "finalizer removed");
        Ok(true)
    }

    async fn persist<R: StoredResource>(
        &self,
        obj: &mut R,
        previous: Option<Vec<String>>,
    ) -> Result<(), StoreError> {
        if let Err(e) = self.store.update(obj).await {
            obj.meta_mut().finalizers = previous;
            return Err(e);
        }
        Ok(())
    }
}
