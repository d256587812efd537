//! # ServiceIntegration
//!
//! Custom resource connecting two managed services (or a service and an
//! external endpoint) at the provider.

use super::user_config::{
    DatadogUserConfig, KafkaConnectUserConfig, KafkaLogsUserConfig, MetricsUserConfig,
};
use super::{AuthSecretReference, InstanceStatus, ManagedObject};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ServiceIntegration Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: managedservices.io/v1alpha1
/// kind: ServiceIntegration
/// metadata:
///   name: kafka-to-datadog
///   namespace: default
/// spec:
///   authSecretRef:
///     name: provider-token
///     key: token
///   project: my-project
///   integrationType: datadog
///   sourceServiceName: my-kafka
///   destinationEndpointId: e1b2c3
///   datadog:
///     maxJmxMetrics: 2000
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ServiceIntegration",
    group = "managedservices.io",
    version = "v1alpha1",
    namespaced,
    status = "ServiceIntegrationStatus",
    shortname = "si",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.integrationType"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Running", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Running\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIntegrationSpec {
    /// Secret holding the provider API token
    pub auth_secret_ref: AuthSecretReference,
    /// Provider project the services belong to
    pub project: String,
    /// Kind of integration to create
    pub integration_type: IntegrationType,
    /// Source service name
    #[serde(default)]
    pub source_service_name: Option<String>,
    /// Destination service name
    #[serde(default)]
    pub destination_service_name: Option<String>,
    /// Source endpoint id
    #[serde(default)]
    pub source_endpoint_id: Option<String>,
    /// Destination endpoint id
    #[serde(default)]
    pub destination_endpoint_id: Option<String>,
    /// Settings for `datadog` integrations
    #[serde(default)]
    pub datadog: Option<DatadogUserConfig>,
    /// Settings for `kafka_connect` integrations
    #[serde(default)]
    pub kafka_connect: Option<KafkaConnectUserConfig>,
    /// Settings for `kafka_logs` integrations
    #[serde(default)]
    pub kafka_logs: Option<KafkaLogsUserConfig>,
    /// Settings for `metrics` integrations
    #[serde(default)]
    pub metrics: Option<MetricsUserConfig>,
}

/// Integration types understood by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationType {
    Datadog,
    KafkaConnect,
    KafkaLogs,
    KafkaMirrormaker,
    Logs,
    Metrics,
    ReadReplica,
}

impl IntegrationType {
    /// Wire name used by the provider API
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::Datadog => "datadog",
            IntegrationType::KafkaConnect => "kafka_connect",
            IntegrationType::KafkaLogs => "kafka_logs",
            IntegrationType::KafkaMirrormaker => "kafka_mirrormaker",
            IntegrationType::Logs => "logs",
            IntegrationType::Metrics => "metrics",
            IntegrationType::ReadReplica => "read_replica",
        }
    }
}

/// Status of the ServiceIntegration resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIntegrationStatus {
    /// Provider-side integration id, set once created
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub instance: InstanceStatus,
}

impl ManagedObject for ServiceIntegration {
    fn auth_secret_ref(&self) -> &AuthSecretReference {
        &self.spec.auth_secret_ref
    }

    fn instance_status(&self) -> Option<&InstanceStatus> {
        self.status.as_ref().map(|s| &s.instance)
    }

    fn instance_status_mut(&mut self) -> &mut InstanceStatus {
        &mut self.status.get_or_insert_with(Default::default).instance
    }
}

impl ServiceIntegration {
    /// Provider-side id recorded in the status
    pub fn integration_id(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}
