//! # Progress Tracking
//!
//! Predicates and mutators for the durable record of reconciliation progress.
//!
//! Progress lives in the typed [`InstanceStatus`](crate::crd::InstanceStatus)
//! and is mirrored into two annotations:
//!
//! - `generation-was-processed`: the generation for which create/update last succeeded
//! - `instance-is-running`: present once a read-back confirmed the ready state
//!
//! Reads prefer the typed status and fall back to the annotations, so objects
//! last written by a release that only knew the annotations keep their progress.

use crate::constants::{INSTANCE_IS_RUNNING_ANNOTATION, PROCESSED_GENERATION_ANNOTATION};
use crate::crd::{InstancePhase, ManagedObject};
use kube::ResourceExt;

pub fn is_marked_for_deletion<K: ManagedObject>(obj: &K) -> bool {
    obj.meta().deletion_timestamp.is_some()
}

/// Generation for which create/update last succeeded
pub fn processed_generation<K: ManagedObject>(obj: &K) -> Option<i64> {
    obj.instance_status()
        .and_then(|s| s.processed_generation)
        .or_else(|| {
            obj.annotations()
                .get(PROCESSED_GENERATION_ANNOTATION)
                .and_then(|v| v.trim().parse().ok())
        })
}

/// The current generation was already created/updated at the provider
pub fn is_already_processed<K: ManagedObject>(obj: &K) -> bool {
    processed_generation(obj) == Some(current_generation(obj))
}

/// A read-back confirmed the ready state since the last create/update
pub fn is_already_running<K: ManagedObject>(obj: &K) -> bool {
    obj.instance_status()
        .is_some_and(|s| s.phase == InstancePhase::Running)
        || obj.annotations().contains_key(INSTANCE_IS_RUNNING_ANNOTATION)
}

/// Forget all progress before re-issuing create/update
pub fn clear_progress<K: ManagedObject>(obj: &mut K) {
    let status = obj.instance_status_mut();
    status.phase = InstancePhase::Processing;
    status.processed_generation = None;
    let annotations = obj.annotations_mut();
    annotations.remove(PROCESSED_GENERATION_ANNOTATION);
    annotations.remove(INSTANCE_IS_RUNNING_ANNOTATION);
}

/// Record that create/update succeeded for the current generation
pub fn mark_processed<K: ManagedObject>(obj: &mut K) {
    let generation = current_generation(obj);
    obj.instance_status_mut().processed_generation = Some(generation);
    obj.annotations_mut().insert(
        PROCESSED_GENERATION_ANNOTATION.to_string(),
        generation.to_string(),
    );
}

/// Record that the remote resource reached its ready state
///
/// Called by handlers from `get` once the provider confirms it.
pub fn mark_running<K: ManagedObject>(obj: &mut K) {
    obj.instance_status_mut().phase = InstancePhase::Running;
    obj.annotations_mut()
        .insert(INSTANCE_IS_RUNNING_ANNOTATION.to_string(), "1".to_string());
}

fn current_generation<K: ManagedObject>(obj: &K) -> i64 {
    obj.meta().generation.unwrap_or_default()
}
