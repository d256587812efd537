//! # ServiceIntegration Handler
//!
//! Maps `ServiceIntegration` objects onto the provider's integrations API.

use crate::controller::reconciler::{mark_running, Handler, HandlerError};
use crate::controller::user_config::flatten_optional;
use crate::crd::{
    Condition, ConditionStatus, IntegrationType, ManagedObject, ServiceIntegration,
    ServiceIntegrationSpec,
};
use crate::provider::integrations::{
    CreateServiceIntegrationRequest, UpdateServiceIntegrationRequest,
};
use crate::provider::ProviderClient;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use serde_json::{Map, Value};
use tracing::{debug, info};

const CREATED_OR_UPDATED_REASON: &str = "CreatedOrUpdate";
const GET_REASON: &str = "Get";

#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceIntegrationHandler;

impl ServiceIntegrationHandler {
    pub fn new() -> Self {
        Self
    }
}

/// Flattened user config for the integration's type, if it has any
pub fn user_config(spec: &ServiceIntegrationSpec) -> Option<Map<String, Value>> {
    match spec.integration_type {
        IntegrationType::Datadog => flatten_optional(spec.datadog.as_ref()),
        IntegrationType::KafkaConnect => flatten_optional(spec.kafka_connect.as_ref()),
        IntegrationType::KafkaLogs => flatten_optional(spec.kafka_logs.as_ref()),
        IntegrationType::Metrics => flatten_optional(spec.metrics.as_ref()),
        IntegrationType::KafkaMirrormaker
        | IntegrationType::Logs
        | IntegrationType::ReadReplica => None,
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

async fn service_is_running(
    client: &ProviderClient,
    project: &str,
    service: &Option<String>,
) -> Result<bool, HandlerError> {
    match non_empty(service) {
        Some(name) => Ok(client.check_service_is_running(project, &name).await?),
        None => Ok(true),
    }
}

#[async_trait]
impl Handler<ServiceIntegration> for ServiceIntegrationHandler {
    async fn check_preconditions(
        &self,
        client: &ProviderClient,
        si: &ServiceIntegration,
    ) -> Result<bool, HandlerError> {
        let spec = &si.spec;
        Ok(
            service_is_running(client, &spec.project, &spec.source_service_name).await?
                && service_is_running(client, &spec.project, &spec.destination_service_name)
                    .await?,
        )
    }

    async fn create_or_update(
        &self,
        client: &ProviderClient,
        si: &mut ServiceIntegration,
    ) -> Result<(), HandlerError> {
        let spec = &si.spec;
        if spec.project.is_empty() {
            return Err(HandlerError::InvalidSpec("project must not be empty".to_string()));
        }

        let id = match si.integration_id() {
            None => {
                let request = CreateServiceIntegrationRequest {
                    integration_type: spec.integration_type.as_str().to_string(),
                    source_service: non_empty(&spec.source_service_name),
                    dest_service: non_empty(&spec.destination_service_name),
                    source_endpoint_id: non_empty(&spec.source_endpoint_id),
                    dest_endpoint_id: non_empty(&spec.destination_endpoint_id),
                    user_config: user_config(spec),
                };
                let created = client.create_integration(&spec.project, &request).await?;
                info!(id = %created.service_integration_id, "service integration created");
                created.service_integration_id
            }
            Some(id) => {
                let id = id.to_string();
                let request = UpdateServiceIntegrationRequest {
                    user_config: user_config(spec).unwrap_or_default(),
                };
                match client.update_integration(&spec.project, &id, &request).await {
                    Ok(_) => info!(%id, "service integration updated"),
                    Err(e) if e.is_unchanged() => debug!(%id, "service integration unchanged"),
                    Err(e) => return Err(e.into()),
                }
                id
            }
        };

        si.status.get_or_insert_with(Default::default).id = Some(id);
        let status = si.instance_status_mut();
        status.set_condition(Condition::initialized(
            CREATED_OR_UPDATED_REASON,
            "Instance was created or updated on the provider side",
        ));
        status.set_condition(Condition::running(
            ConditionStatus::Unknown,
            CREATED_OR_UPDATED_REASON,
            "Instance was created or updated on the provider side, status remains unknown",
        ));
        Ok(())
    }

    async fn delete(
        &self,
        client: &ProviderClient,
        si: &ServiceIntegration,
    ) -> Result<bool, HandlerError> {
        let Some(id) = si.integration_id() else {
            debug!("integration was never created, nothing to delete");
            return Ok(true);
        };
        match client.delete_integration(&si.spec.project, id).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(
        &self,
        client: &ProviderClient,
        si: &mut ServiceIntegration,
    ) -> Result<Option<Secret>, HandlerError> {
        let id = si
            .integration_id()
            .ok_or_else(|| HandlerError::NotFound("integration has no id yet".to_string()))?
            .to_string();
        let integration = client.get_integration(&si.spec.project, &id).await?;

        if integration.active {
            si.instance_status_mut().set_condition(Condition::running(
                ConditionStatus::True,
                GET_REASON,
                "Instance is running on the provider side",
            ));
            mark_running(si);
        } else {
            si.instance_status_mut().set_condition(Condition::running(
                ConditionStatus::Unknown,
                GET_REASON,
                "Instance is not active on the provider side yet",
            ));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> ServiceIntegrationSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_user_config_follows_integration_type() {
        let spec = spec(json!({
            "authSecretRef": {"name": "token", "key": "token"},
            "project": "p1",
            "integrationType": "kafka_logs",
            "kafkaLogs": {"kafkaTopic": "logs"},
            "metrics": {"retentionDays": 7}
        }));
        assert_eq!(
            user_config(&spec).map(Value::Object),
            Some(json!({"kafka_topic": "logs"}))
        );
    }

    #[test]
    fn test_types_without_settings_send_no_user_config() {
        let spec = spec(json!({
            "authSecretRef": {"name": "token", "key": "token"},
            "project": "p1",
            "integrationType": "read_replica",
            "metrics": {"retentionDays": 7}
        }));
        assert!(user_config(&spec).is_none());
    }

    #[test]
    fn test_empty_settings_send_no_user_config() {
        let spec = spec(json!({
            "authSecretRef": {"name": "token", "key": "token"},
            "project": "p1",
            "integrationType": "datadog",
            "datadog": {"includeTopics": []}
        }));
        assert!(user_config(&spec).is_none());
    }

    #[test]
    fn test_empty_names_are_not_sent() {
        assert_eq!(non_empty(&Some(String::new())), None);
        assert_eq!(non_empty(&Some("kafka".into())), Some("kafka".into()));
        assert_eq!(non_empty(&None), None);
    }
}
