//! Common test utilities
//!
//! Provides rustls setup for Pact tests and the in-memory doubles the engine
//! tests run against: an object store with Kubernetes write semantics, an
//! event sink that records every notification, and a handler whose answers
//! are scripted per test.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ObjectReference, Secret};
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use managed_service_operator::controller::reconciler::{
    has_finalizer, is_already_processed, mark_running, EventRecorder, EventSeverity, Handler,
    HandlerError, InstanceReconciler, ObjectKey, ObjectStore, Reason, StoreError,
};
use managed_service_operator::constants::SECRET_PROTECTION_FINALIZER;
use managed_service_operator::crd::{
    AuthSecretReference, Condition, ConditionStatus, IntegrationType, ManagedObject,
    ServiceIntegration, ServiceIntegrationSpec, StoredResource,
};
use managed_service_operator::controller::reconciler::AuthContextResolver;
use managed_service_operator::provider::{ProviderClient, ProviderError};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Ignore the error when another test binary path already installed one
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

pub const NAMESPACE: &str = "default";
pub const OBJECT_NAME: &str = "kafka-to-datadog";
pub const SECRET_NAME: &str = "provider-token";
pub const SECRET_KEY: &str = "token";
pub const PROVIDER_URL: &str = "http://provider.test";

pub fn object_key() -> ObjectKey {
    ObjectKey::new(NAMESPACE, OBJECT_NAME)
}

pub fn secret_key() -> ObjectKey {
    ObjectKey::new(NAMESPACE, SECRET_NAME)
}

/// A ServiceIntegration at generation 1 with no progress recorded
pub fn integration() -> ServiceIntegration {
    let mut obj = ServiceIntegration::new(
        OBJECT_NAME,
        ServiceIntegrationSpec {
            auth_secret_ref: AuthSecretReference {
                name: SECRET_NAME.to_string(),
                key: SECRET_KEY.to_string(),
            },
            project: "my-project".to_string(),
            integration_type: IntegrationType::Datadog,
            source_service_name: Some("my-kafka".to_string()),
            destination_service_name: None,
            source_endpoint_id: None,
            destination_endpoint_id: Some("e1b2c3".to_string()),
            datadog: None,
            kafka_connect: None,
            kafka_logs: None,
            metrics: None,
        },
    );
    obj.metadata.namespace = Some(NAMESPACE.to_string());
    obj.metadata.generation = Some(1);
    obj.metadata.uid = Some("0b3b2f6e-integration".to_string());
    obj
}

/// An integration whose generation 1 was already created at the provider
pub fn processed_integration() -> ServiceIntegration {
    let mut obj = integration();
    obj.annotations_mut().insert(
        managed_service_operator::constants::PROCESSED_GENERATION_ANNOTATION.to_string(),
        "1".to_string(),
    );
    obj
}

pub fn auth_secret() -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(SECRET_NAME.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..ObjectMeta::default()
        },
        data: Some(BTreeMap::from([(
            SECRET_KEY.to_string(),
            ByteString(b"test-token".to_vec()),
        )])),
        ..Secret::default()
    }
}

/// Store write operations failures can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOp {
    Update,
    UpdateStatus,
    ApplyOwnedSecret,
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<(String, String, String), Value>,
    next_version: u64,
    failing: HashSet<(String, WriteOp)>,
    journal: Vec<String>,
}

/// `ObjectStore` holding objects as JSON, with API-server write semantics
///
/// - writes carrying a stale resource version are rejected
/// - `update` ignores status changes and `update_status` ignores everything else
/// - an object marked for deletion disappears once its last finalizer is removed
///
/// Clones share state, so a test can keep one handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

fn slot<R: StoredResource>(namespace: &str, name: &str) -> (String, String, String) {
    (
        R::kind(&()).to_string(),
        namespace.to_string(),
        name.to_string(),
    )
}

fn slot_of<R: StoredResource>(obj: &R) -> Result<(String, String, String), StoreError> {
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
    Ok(slot::<R>(&namespace, &name))
}

fn resource_version(value: &Value) -> Option<&str> {
    value["metadata"]["resourceVersion"].as_str()
}

impl StoreState {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    fn check_failure(&self, kind: &str, op: WriteOp) -> Result<(), StoreError> {
        if self.failing.contains(&(kind.to_string(), op)) {
            return Err(StoreError::Rejected(format!("injected {op:?} failure for {kind}")));
        }
        Ok(())
    }

    fn check_version(&self, key: &(String, String, String), incoming: &Value) -> Result<(), StoreError> {
        let stored = self
            .objects
            .get(key)
            .ok_or_else(|| StoreError::NotFound(ObjectKey::new(&key.1, &key.2)))?;
        match resource_version(incoming) {
            Some(version) if Some(version) != resource_version(stored) => Err(
                StoreError::Rejected(format!("conflict on {}/{}: stale resource version", key.1, key.2)),
            ),
            _ => Ok(()),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, assigning it a resource version
    pub fn insert<R: StoredResource>(&self, obj: &R) {
        let key = slot_of(obj).expect("seeded objects need a name and namespace");
        let mut value = serde_json::to_value(obj).expect("seeded object serializes");
        let mut state = self.state.lock().unwrap();
        let version = state.bump();
        value["metadata"]["resourceVersion"] = Value::String(version);
        state.objects.insert(key, value);
    }

    pub fn fetch<R: StoredResource>(&self, key: &ObjectKey) -> Option<R> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&slot::<R>(&key.namespace, &key.name))
            .map(|v| serde_json::from_value(v.clone()).expect("stored object deserializes"))
    }

    /// Set the deletion timestamp the way the API server does on delete
    pub fn mark_for_deletion<R: StoredResource>(&self, key: &ObjectKey) {
        let mut state = self.state.lock().unwrap();
        let version = state.bump();
        let value = state
            .objects
            .get_mut(&slot::<R>(&key.namespace, &key.name))
            .expect("object to delete exists");
        value["metadata"]["deletionTimestamp"] = Value::String("2026-10-19T08:00:00Z".to_string());
        value["metadata"]["resourceVersion"] = Value::String(version);
    }

    /// Make every subsequent `op` on objects of kind `R` fail
    pub fn fail<R: StoredResource>(&self, op: WriteOp) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert((R::kind(&()).to_string(), op));
    }

    /// Writes performed so far, as `"<op> <Kind> <namespace>/<name>"`
    pub fn journal(&self) -> Vec<String> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Append an entry to the shared journal
    pub fn note(&self, entry: impl Into<String>) {
        self.state.lock().unwrap().journal.push(entry.into());
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<R: StoredResource>(&self, key: &ObjectKey) -> Result<Option<R>, StoreError> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&slot::<R>(&key.namespace, &key.name))
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn update<R: StoredResource>(&self, obj: &mut R) -> Result<(), StoreError> {
        let key = slot_of(obj)?;
        let mut incoming = serde_json::to_value(&*obj)?;
        let mut state = self.state.lock().unwrap();
        state.check_failure(&key.0, WriteOp::Update)?;
        state.check_version(&key, &incoming)?;

        let stored_status = state.objects.get(&key).and_then(|v| v.get("status").cloned());
        if let Some(fields) = incoming.as_object_mut() {
            match stored_status {
                Some(status) => {
                    fields.insert("status".to_string(), status);
                }
                None => {
                    fields.remove("status");
                }
            }
        }
        let version = state.bump();
        incoming["metadata"]["resourceVersion"] = Value::String(version);
        state.journal.push(format!("update {} {}/{}", key.0, key.1, key.2));

        let deleting = !incoming["metadata"]["deletionTimestamp"].is_null();
        let finalizers_left = incoming["metadata"]["finalizers"]
            .as_array()
            .is_some_and(|f| !f.is_empty());
        if deleting && !finalizers_left {
            state.objects.remove(&key);
            state.journal.push(format!("deleted {} {}/{}", key.0, key.1, key.2));
            return Ok(());
        }

        *obj = serde_json::from_value(incoming.clone())?;
        state.objects.insert(key, incoming);
        Ok(())
    }

    async fn update_status<R: StoredResource>(&self, obj: &mut R) -> Result<(), StoreError> {
        let key = slot_of(obj)?;
        let incoming = serde_json::to_value(&*obj)?;
        let mut state = self.state.lock().unwrap();
        state.check_failure(&key.0, WriteOp::UpdateStatus)?;
        state.check_version(&key, &incoming)?;

        let version = state.bump();
        let stored = state
            .objects
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(ObjectKey::new(&key.1, &key.2)))?;
        stored["status"] = incoming.get("status").cloned().unwrap_or(Value::Null);
        stored["metadata"]["resourceVersion"] = Value::String(version.clone());
        obj.meta_mut().resource_version = Some(version);
        state
            .journal
            .push(format!("update_status {} {}/{}", key.0, key.1, key.2));
        Ok(())
    }

    async fn apply_owned_secret<K: StoredResource>(
        &self,
        owner: &K,
        mut secret: Secret,
    ) -> Result<(), StoreError> {
        let owner_key = slot_of(owner)?;
        let owner_ref = owner
            .controller_owner_ref(&())
            .ok_or_else(|| StoreError::Rejected("owner has no uid".to_string()))?;
        secret.metadata.namespace = Some(owner_key.1.clone());
        secret.metadata.owner_references = Some(vec![owner_ref]);
        let key = slot_of(&secret)?;

        let mut state = self.state.lock().unwrap();
        state.check_failure(&key.0, WriteOp::ApplyOwnedSecret)?;
        let mut value = serde_json::to_value(&secret)?;
        let version = state.bump();
        value["metadata"]["resourceVersion"] = Value::String(version);
        state
            .journal
            .push(format!("apply {} {}/{}", key.0, key.1, key.2));
        state.objects.insert(key, value);
        Ok(())
    }
}

/// One notification captured by [`RecordingRecorder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub severity: EventSeverity,
    pub reason: Reason,
    pub note: String,
}

/// Event sink keeping every notification in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingRecorder {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingRecorder {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn reasons(&self) -> Vec<Reason> {
        self.events().into_iter().map(|e| e.reason).collect()
    }

    pub fn find(&self, reason: Reason) -> Option<RecordedEvent> {
        self.events().into_iter().find(|e| e.reason == reason)
    }
}

#[async_trait]
impl EventRecorder for RecordingRecorder {
    async fn record(
        &self,
        _object: &ObjectReference,
        severity: EventSeverity,
        reason: Reason,
        note: String,
    ) {
        self.events.lock().unwrap().push(RecordedEvent {
            severity,
            reason,
            note,
        });
    }
}

/// Failures a scripted handler can answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Provider answered 401
    Unauthorized,
    /// Unstructured error carrying the provider's invalid-token message
    InvalidTokenMessage,
    /// Provider answered 500
    ServerError,
    /// Remote resource does not exist
    NotFound,
}

impl Failure {
    fn to_error(self) -> HandlerError {
        match self {
            Failure::Unauthorized => HandlerError::Provider(ProviderError::Api {
                status: 401,
                message: "Invalid token".to_string(),
            }),
            Failure::InvalidTokenMessage => {
                HandlerError::Other(anyhow::anyhow!("request rejected: Invalid token"))
            }
            Failure::ServerError => HandlerError::Provider(ProviderError::Api {
                status: 500,
                message: "Internal Server Error".to_string(),
            }),
            Failure::NotFound => HandlerError::NotFound("integration".to_string()),
        }
    }
}

/// What `get` reports about the remote resource
#[derive(Debug, Clone)]
pub enum ReadBack {
    Running,
    NotRunning,
    RunningWithSecret(Secret),
    Fail(Failure),
}

/// One handler invocation as observed by [`ScriptedHandler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerCall {
    pub method: &'static str,
    /// Secret-protection finalizer was persisted on the credential secret
    pub secret_protected: bool,
    /// Current generation was recorded as processed at call time
    pub processed: bool,
}

/// `Handler` answering from a fixed script and recording every call
#[derive(Debug)]
pub struct ScriptedHandler {
    store: MemoryStore,
    pub preconditions: Result<bool, Failure>,
    pub create_or_update: Result<(), Failure>,
    pub delete: Result<bool, Failure>,
    pub get: ReadBack,
    calls: Mutex<Vec<HandlerCall>>,
}

impl ScriptedHandler {
    /// Preconditions met, create/update and delete succeed, remote not running yet
    pub fn new(store: &MemoryStore) -> Self {
        Self {
            store: store.clone(),
            preconditions: Ok(true),
            create_or_update: Ok(()),
            delete: Ok(true),
            get: ReadBack::NotRunning,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<HandlerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    pub fn called(&self, method: &str) -> bool {
        self.calls().iter().any(|c| c.method == method)
    }

    fn record(&self, method: &'static str, obj: &ServiceIntegration) {
        let secret_protected = self
            .store
            .fetch::<Secret>(&secret_key())
            .is_some_and(|s| has_finalizer(&s, SECRET_PROTECTION_FINALIZER));
        self.store.note(format!("handler {method}"));
        self.calls.lock().unwrap().push(HandlerCall {
            method,
            secret_protected,
            processed: is_already_processed(obj),
        });
    }
}

#[async_trait]
impl Handler<ServiceIntegration> for ScriptedHandler {
    async fn check_preconditions(
        &self,
        _client: &ProviderClient,
        obj: &ServiceIntegration,
    ) -> Result<bool, HandlerError> {
        self.record("check_preconditions", obj);
        self.preconditions.map_err(Failure::to_error)
    }

    async fn create_or_update(
        &self,
        _client: &ProviderClient,
        obj: &mut ServiceIntegration,
    ) -> Result<(), HandlerError> {
        self.record("create_or_update", obj);
        self.create_or_update.map_err(Failure::to_error)?;
        obj.status.get_or_insert_with(Default::default).id = Some("integration-1".to_string());
        obj.instance_status_mut().set_condition(Condition::initialized(
            "CreatedOrUpdate",
            "integration created",
        ));
        Ok(())
    }

    async fn delete(
        &self,
        _client: &ProviderClient,
        obj: &ServiceIntegration,
    ) -> Result<bool, HandlerError> {
        self.record("delete", obj);
        self.delete.map_err(Failure::to_error)
    }

    async fn get(
        &self,
        _client: &ProviderClient,
        obj: &mut ServiceIntegration,
    ) -> Result<Option<Secret>, HandlerError> {
        self.record("get", obj);
        match &self.get {
            ReadBack::Running => {
                mark_running(obj);
                Ok(None)
            }
            ReadBack::RunningWithSecret(secret) => {
                mark_running(obj);
                Ok(Some(secret.clone()))
            }
            ReadBack::NotRunning => {
                obj.instance_status_mut().set_condition(Condition::running(
                    ConditionStatus::Unknown,
                    "NotActive",
                    "integration is not active yet",
                ));
                Ok(None)
            }
            ReadBack::Fail(failure) => Err(failure.to_error()),
        }
    }
}

/// Engine wired to in-memory doubles
pub struct Harness {
    pub store: MemoryStore,
    pub recorder: RecordingRecorder,
    pub reconciler: InstanceReconciler<MemoryStore, RecordingRecorder>,
}

impl Harness {
    /// Store seeded with the credential secret and `obj`
    pub fn with(obj: &ServiceIntegration) -> Self {
        init_rustls();
        let store = MemoryStore::new();
        store.insert(&auth_secret());
        store.insert(obj);
        Self::over(store, PROVIDER_URL)
    }

    /// Engine over an existing store, building clients for `api_url`
    pub fn over(store: MemoryStore, api_url: &str) -> Self {
        init_rustls();
        let recorder = RecordingRecorder::default();
        let reconciler = InstanceReconciler::new(
            store.clone(),
            recorder.clone(),
            AuthContextResolver::new(api_url, "managed-service-operator-tests"),
        );
        Self {
            store,
            recorder,
            reconciler,
        }
    }

    pub fn object(&self) -> Option<ServiceIntegration> {
        self.store.fetch(&object_key())
    }

    pub fn secret(&self) -> Option<Secret> {
        self.store.fetch(&secret_key())
    }
}
