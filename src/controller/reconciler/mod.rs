//! # Reconciler
//!
//! Generic instance-reconciliation engine shared by every managed kind.
//!
//! The engine:
//! - Resolves the object's credential secret and builds a provider client
//! - Protects the secret and the object with finalizers
//! - Gates on the handler's preconditions
//! - Creates or updates the remote resource once per generation
//! - Polls the remote resource until it is running
//! - Deletes the remote resource before releasing the object
//!
//! ## Reconciliation Flow
//!
//! 1. Load object and credentials (`auth`)
//! 2. Deleting? Run `Handler::delete` and drop the deletion finalizer
//! 3. Add the secret-protection and deletion finalizers (`finalizers`)
//! 4. `Handler::check_preconditions`, requeue when not met
//! 5. `Handler::create_or_update` when the generation is not processed (`status`)
//! 6. `Handler::get`, persist status and object, requeue until running

pub mod auth;
pub mod events;
pub mod finalizers;
pub mod handler;
pub mod reconcile;
pub mod status;
pub mod store;
pub mod types;

// Re-export public API
pub use auth::{AuthContext, AuthContextResolver};
pub use events::{EventRecorder, EventSeverity, KubeEventRecorder, Reason};
pub use finalizers::{has_finalizer, FinalizerManager};
pub use handler::{Handler, HandlerError};
pub use reconcile::{can_be_force_removed, InstanceReconciler};
pub use status::{
    clear_progress, is_already_processed, is_already_running, is_marked_for_deletion,
    mark_processed, mark_running, processed_generation,
};
pub use store::{KubeStore, ObjectStore, StoreError};
pub use types::{ObjectKey, ReconcileOutcome, ReconcilerError};
