//! # Instance Status
//!
//! Status types shared by every managed kind: reconciliation progress and
//! conditions.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition types reported on managed objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ConditionType {
    /// The remote resource was created or updated at least once
    Initialized,
    /// The remote resource reached its ready state
    Running,
}

/// Status of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Condition represents one observation about a managed object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    #[serde(rename = "type")]
    pub type_: ConditionType,
    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Machine-readable reason code
    pub reason: String,
    /// Human-readable message
    pub message: String,
    /// Last time the status value changed (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    /// An `Initialized=True` condition
    pub fn initialized(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_: ConditionType::Initialized,
            status: ConditionStatus::True,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: None,
        }
    }

    /// A `Running` condition with the given status
    pub fn running(
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: ConditionType::Running,
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: None,
        }
    }
}

/// Reconciliation progress of a managed object
///
/// Mirrors the processed-generation and instance-running annotations as a
/// typed state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum InstancePhase {
    /// No create/update has succeeded for the current generation
    #[default]
    Unprocessed,
    /// Create/update in flight or done, ready state not confirmed yet
    Processing,
    /// A read-back confirmed the ready state
    Running,
}

/// Status block embedded in every managed kind's status
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    /// Current reconciliation phase
    #[serde(default)]
    pub phase: InstancePhase,
    /// Last generation for which create/update succeeded
    /// Serialized even when unset so a status merge patch clears it
    #[serde(default)]
    pub processed_generation: Option<i64>,
    /// Conditions represent the latest available observations, one per type
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl InstanceStatus {
    /// Set a condition, replacing any existing condition of the same type
    ///
    /// The transition time only moves when the status value changes.
    pub fn set_condition(&mut self, mut condition: Condition) {
        let now = Utc::now().to_rfc3339();
        match self
            .conditions
            .iter_mut()
            .find(|c| c.type_ == condition.type_)
        {
            Some(existing) => {
                if existing.status != condition.status || existing.last_transition_time.is_none()
                {
                    existing.status = condition.status;
                    existing.last_transition_time = Some(now);
                }
                existing.reason = condition.reason;
                existing.message = condition.message;
            }
            None => {
                condition.last_transition_time = Some(now);
                self.conditions.push(condition);
            }
        }
    }

    /// Look up a condition by type
    pub fn condition(&self, type_: ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }
}
