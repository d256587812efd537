//! # Custom Resource Definitions
//!
//! CRD types for the Managed Service Operator.
//!
//! ## Module Structure
//!
//! - `managed.rs` - Traits shared by every managed kind and the auth secret reference
//! - `status.rs` - Progress phase and conditions embedded in every status
//! - `service_integration.rs` - The `ServiceIntegration` resource
//! - `user_config.rs` - Sparse per-integration-type settings

mod managed;
mod service_integration;
mod status;
mod user_config;

// Re-export all public types
pub use managed::{AuthSecretReference, ManagedObject, StoredResource};
pub use service_integration::{
    IntegrationType, ServiceIntegration, ServiceIntegrationSpec, ServiceIntegrationStatus,
};
pub use status::{Condition, ConditionStatus, ConditionType, InstancePhase, InstanceStatus};
pub use user_config::{
    DatadogUserConfig, KafkaConnectSettings, KafkaConnectUserConfig, KafkaLogsUserConfig,
    MetricsUserConfig, SourceMysql, TelegrafSettings,
};
