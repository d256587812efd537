//! # Instance Reconciliation
//!
//! The lifecycle state machine every managed kind goes through.
//!
//! A pass is entered fresh from what is persisted on the object (finalizers,
//! progress status and annotations); nothing survives in memory between
//! passes. Each pass:
//!
//! 1. Resolves credentials and builds a provider client
//! 2. Finalizes the object if it is being deleted
//! 3. Protects the credential secret and the object with finalizers
//! 4. Gates on the handler's preconditions
//! 5. Creates or updates the remote resource when the generation changed
//! 6. Reads the remote state back, materializes any returned secret and
//!    persists status and object
//!
//! Every "not there yet" outcome requeues after the same fixed interval.

use super::auth::{AuthContext, AuthContextResolver};
use super::events::{EventRecorder, EventSeverity, Reason};
use super::finalizers::{has_finalizer, FinalizerManager};
use super::handler::{Handler, HandlerError};
use super::status::{
    clear_progress, is_already_processed, is_already_running, is_marked_for_deletion,
    mark_processed, processed_generation,
};
use super::store::ObjectStore;
use super::types::{ObjectKey, ReconcileOutcome, ReconcilerError};
use crate::constants::{INSTANCE_DELETION_FINALIZER, SECRET_PROTECTION_FINALIZER};
use crate::crd::ManagedObject;
use crate::observability::metrics;
use crate::provider::ProviderClient;
use k8s_openapi::api::core::v1::Secret;
use kube::{Resource, ResourceExt};
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Drives managed objects through their lifecycle
pub struct InstanceReconciler<S, R> {
    store: S,
    recorder: R,
    auth: AuthContextResolver,
}

impl<S, R> std::fmt::Debug for InstanceReconciler<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceReconciler")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl<S, R> InstanceReconciler<S, R>
where
    S: ObjectStore,
    R: EventRecorder,
{
    pub fn new(store: S, recorder: R, auth: AuthContextResolver) -> Self {
        Self {
            store,
            recorder,
            auth,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one reconciliation pass for the object stored under `key`
    ///
    /// An object that no longer exists is not an error.
    pub async fn reconcile<K, H>(
        &self,
        key: &ObjectKey,
        handler: &H,
    ) -> Result<ReconcileOutcome, ReconcilerError>
    where
        K: ManagedObject,
        H: Handler<K> + ?Sized,
    {
        let started = Instant::now();
        metrics::increment_reconciliations();

        let obj = self
            .store
            .get::<K>(key)
            .await
            .map_err(|source| ReconcilerError::Load {
                key: key.clone(),
                source,
            })?;
        let Some(obj) = obj else {
            debug!(
                resource.name = %key.name,
                resource.namespace = %key.namespace,
                "object is gone, nothing to do"
            );
            return Ok(ReconcileOutcome::done());
        };

        let span = info_span!(
            "reconcile.instance",
            resource.kind = %K::kind(&()),
            resource.name = %key.name,
            resource.namespace = %key.namespace,
            processed_generation = ?processed_generation(&obj),
            running = is_already_running(&obj),
        );
        let result = self.reconcile_instance(obj, handler).instrument(span).await;

        metrics::observe_reconciliation_duration(started.elapsed().as_secs_f64());
        result
    }

    async fn reconcile_instance<K, H>(
        &self,
        mut obj: K,
        handler: &H,
    ) -> Result<ReconcileOutcome, ReconcilerError>
    where
        K: ManagedObject,
        H: Handler<K> + ?Sized,
    {
        info!("setting up provider client with instance secret");
        let AuthContext { client, mut secret } =
            self.auth.resolve(&self.store, &self.recorder, &obj).await?;

        info!("reconciling instance");
        self.notify(
            &obj,
            EventSeverity::Normal,
            Reason::ReconciliationStarted,
            "starting reconciliation",
        )
        .await;

        if is_marked_for_deletion(&obj) {
            if has_finalizer(&obj, INSTANCE_DELETION_FINALIZER) {
                return self.finalize(&client, handler, obj).await;
            }
            debug!("deletion pending on other finalizers");
            return Ok(ReconcileOutcome::done());
        }

        self.ensure_finalizers(&mut obj, &mut secret).await?;

        info!("handling instance update/creation");
        if !self.check_preconditions(&client, handler, &obj).await? {
            info!("preconditions are not met, requeue");
            metrics::increment_requeues("preconditions-not-met");
            return Ok(ReconcileOutcome::requeue_after_interval());
        }

        if !is_already_processed(&obj) {
            self.create_or_update(&client, handler, &mut obj).await?;
        }

        self.notify(
            &obj,
            EventSeverity::Normal,
            Reason::WaitingForInstanceToBeRunning,
            "waiting for the instance to be running",
        )
        .await;
        self.wait_until_running(&client, handler, obj).await
    }

    /// Protect the credential secret first, then the object itself
    async fn ensure_finalizers<K: ManagedObject>(
        &self,
        obj: &mut K,
        secret: &mut Secret,
    ) -> Result<(), ReconcilerError> {
        let finalizers = FinalizerManager::new(&self.store);

        if !has_finalizer(secret, SECRET_PROTECTION_FINALIZER) {
            info!(secret.name = %secret.name_any(), "adding finalizer to secret");
            if let Err(e) = finalizers.add(secret, SECRET_PROTECTION_FINALIZER).await {
                self.notify(
                    obj,
                    EventSeverity::Warning,
                    Reason::UnableToAddFinalizer,
                    e.to_string(),
                )
                .await;
                return Err(ReconcilerError::SecretFinalizer(e));
            }
        }

        if !has_finalizer(obj, INSTANCE_DELETION_FINALIZER) {
            info!("adding finalizer to instance");
            if let Err(e) = finalizers.add(obj, INSTANCE_DELETION_FINALIZER).await {
                self.notify(
                    obj,
                    EventSeverity::Warning,
                    Reason::UnableToAddFinalizer,
                    e.to_string(),
                )
                .await;
                return Err(ReconcilerError::InstanceFinalizer(e));
            }
            self.notify(
                obj,
                EventSeverity::Normal,
                Reason::InstanceFinalizerAdded,
                "instance finalizer added",
            )
            .await;
        }

        Ok(())
    }

    async fn check_preconditions<K, H>(
        &self,
        client: &ProviderClient,
        handler: &H,
        obj: &K,
    ) -> Result<bool, ReconcilerError>
    where
        K: ManagedObject,
        H: Handler<K> + ?Sized,
    {
        self.notify(
            obj,
            EventSeverity::Normal,
            Reason::WaitingForPreconditions,
            "waiting for preconditions of the instance",
        )
        .await;

        match handler.check_preconditions(client, obj).await {
            Ok(true) => {
                self.notify(
                    obj,
                    EventSeverity::Normal,
                    Reason::PreconditionsAreMet,
                    "preconditions are met, proceeding to create or update",
                )
                .await;
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                self.notify(
                    obj,
                    EventSeverity::Warning,
                    Reason::UnableToWaitForPreconditions,
                    e.to_string(),
                )
                .await;
                Err(ReconcilerError::Preconditions(e))
            }
        }
    }

    async fn create_or_update<K, H>(
        &self,
        client: &ProviderClient,
        handler: &H,
        obj: &mut K,
    ) -> Result<(), ReconcilerError>
    where
        K: ManagedObject,
        H: Handler<K> + ?Sized,
    {
        self.notify(
            obj,
            EventSeverity::Normal,
            Reason::CreateOrUpdatedAtProvider,
            "about to create or update instance at provider",
        )
        .await;

        info!(
            generation = ?obj.meta().generation,
            "generation wasn't processed, creating or updating instance at provider"
        );
        // Not validated until the handler succeeds and a read-back confirms state
        clear_progress(obj);

        if let Err(e) = handler.create_or_update(client, obj).await {
            self.notify(
                obj,
                EventSeverity::Warning,
                Reason::UnableToCreateOrUpdateAtProvider,
                e.to_string(),
            )
            .await;
            return Err(ReconcilerError::CreateOrUpdate(e));
        }
        mark_processed(obj);
        info!(generation = ?obj.meta().generation, "processed instance");

        self.notify(
            obj,
            EventSeverity::Normal,
            Reason::CreatedOrUpdatedAtProvider,
            "instance was created at provider but may not be running yet",
        )
        .await;
        Ok(())
    }

    /// Read back remote state, then persist status and object
    ///
    /// Both writes are attempted even when the read-back failed, and every
    /// failure is reported.
    async fn wait_until_running<K, H>(
        &self,
        client: &ProviderClient,
        handler: &H,
        mut obj: K,
    ) -> Result<ReconcileOutcome, ReconcilerError>
    where
        K: ManagedObject,
        H: Handler<K> + ?Sized,
    {
        info!("checking if instance is ready");
        let mut errors = Vec::new();
        let mut remote_missing = false;

        match handler.get(client, &mut obj).await {
            Ok(Some(connection)) => {
                if let Err(e) = self
                    .store
                    .apply_owned_secret(&obj, without_empty_fields(connection))
                    .await
                {
                    errors.push(ReconcilerError::ConnectionSecret(e));
                }
            }
            Ok(None) => {}
            Err(e) if e.is_not_found() => {
                debug!(error = %e, "remote resource not found yet");
                remote_missing = true;
            }
            Err(e) => errors.push(ReconcilerError::WaitForRunning(e)),
        }

        let running = is_already_running(&obj);

        if let Err(e) = self.store.update_status(&mut obj).await {
            errors.push(ReconcilerError::Persist(e));
        }
        if let Err(e) = self.store.update(&mut obj).await {
            errors.push(ReconcilerError::Persist(e));
        }

        if let Some(err) = ReconcilerError::aggregate(errors) {
            self.notify(
                &obj,
                EventSeverity::Warning,
                Reason::UnableToWaitForInstanceToBeRunning,
                err.to_string(),
            )
            .await;
            return Err(err);
        }

        if remote_missing {
            metrics::increment_requeues("remote-not-found");
            return Ok(ReconcileOutcome::requeue_after_interval());
        }

        if !running {
            info!("instance is not yet running, triggering requeue");
            metrics::increment_requeues("not-running");
            return Ok(ReconcileOutcome::requeue_after_interval());
        }

        self.notify(
            &obj,
            EventSeverity::Normal,
            Reason::InstanceIsRunning,
            "instance is in a RUNNING state",
        )
        .await;
        info!("instance was successfully reconciled");
        Ok(ReconcileOutcome::done())
    }

    /// Delete the remote resource and release the object
    ///
    /// The deletion finalizer is kept until delete reports the resource gone,
    /// unless the object qualifies for forced removal.
    async fn finalize<K, H>(
        &self,
        client: &ProviderClient,
        handler: &H,
        mut obj: K,
    ) -> Result<ReconcileOutcome, ReconcilerError>
    where
        K: ManagedObject,
        H: Handler<K> + ?Sized,
    {
        self.notify(
            &obj,
            EventSeverity::Normal,
            Reason::TryingToDeleteAtProvider,
            "trying to delete instance at provider",
        )
        .await;

        let finalized = match handler.delete(client, &obj).await {
            Ok(finalized) => finalized,
            Err(e) if can_be_force_removed(&obj, &e) => {
                warn!(
                    error = %e,
                    "never provisioned and credentials are invalid, removing finalizer"
                );
                self.notify(
                    &obj,
                    EventSeverity::Warning,
                    Reason::UnableToDeleteAtProvider,
                    format!("{e}; instance was never provisioned, removing finalizer anyway"),
                )
                .await;
                true
            }
            Err(e) => {
                self.notify(
                    &obj,
                    EventSeverity::Warning,
                    Reason::UnableToDeleteAtProvider,
                    e.to_string(),
                )
                .await;
                return Err(ReconcilerError::Delete(e));
            }
        };

        if !finalized {
            info!("instance deletion at provider is still in progress, requeue");
            metrics::increment_requeues("delete-pending");
            return Ok(ReconcileOutcome::requeue_after_interval());
        }

        info!("instance was successfully deleted at provider, removing finalizer");
        self.notify(
            &obj,
            EventSeverity::Normal,
            Reason::SuccessfullyDeletedAtProvider,
            "instance is gone at provider now",
        )
        .await;

        if let Err(e) = FinalizerManager::new(&self.store)
            .remove(&mut obj, INSTANCE_DELETION_FINALIZER)
            .await
        {
            self.notify(
                &obj,
                EventSeverity::Warning,
                Reason::UnableToDeleteFinalizer,
                e.to_string(),
            )
            .await;
            return Err(ReconcilerError::RemoveFinalizer(e));
        }
        Ok(ReconcileOutcome::done())
    }

    async fn notify<K: ManagedObject>(
        &self,
        obj: &K,
        severity: EventSeverity,
        reason: Reason,
        note: impl Into<String>,
    ) {
        self.recorder
            .record(&obj.object_ref(&()), severity, reason, note.into())
            .await;
    }
}

/// An object may lose its deletion finalizer despite a failed delete only if
/// it never reached the provider and its credentials are unusable
///
/// Any recorded processed generation counts, not just the current one: an
/// object created for an older generation still exists remotely.
pub fn can_be_force_removed<K: ManagedObject>(obj: &K, error: &HandlerError) -> bool {
    processed_generation(obj).is_none()
        && !is_already_running(obj)
        && error.is_invalid_credentials()
}

/// Drop secret fields with empty values before materializing a secret
fn without_empty_fields(mut secret: Secret) -> Secret {
    let name = secret.name_any();
    if let Some(data) = secret.string_data.as_mut() {
        data.retain(|field, value| {
            if value.is_empty() {
                debug!(field = %field, secret.name = %name, "secret field is empty, dropping it");
            }
            !value.is_empty()
        });
    }
    if let Some(data) = secret.data.as_mut() {
        data.retain(|_, value| !value.0.is_empty());
    }
    secret
}
