//! # Service Integrations API
//!
//! Create, update, read and delete service integrations.

use super::{ProviderClient, ProviderError};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a create request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateServiceIntegrationRequest {
    pub integration_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_config: Option<Map<String, Value>>,
}

/// Body of an update request; only the user config can change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateServiceIntegrationRequest {
    pub user_config: Map<String, Value>,
}

/// An integration as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceIntegration {
    pub service_integration_id: String,
    pub integration_type: String,
    #[serde(default)]
    pub source_service: Option<String>,
    #[serde(default)]
    pub dest_service: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
struct ServiceIntegrationResponse {
    service_integration: ServiceIntegration,
}

impl ProviderClient {
    pub async fn create_integration(
        &self,
        project: &str,
        request: &CreateServiceIntegrationRequest,
    ) -> Result<ServiceIntegration, ProviderError> {
        let path = format!("/project/{project}/integration");
        let response: ServiceIntegrationResponse = self
            .send_json("create_integration", Method::POST, &path, Some(request))
            .await?;
        Ok(response.service_integration)
    }

    pub async fn update_integration(
        &self,
        project: &str,
        id: &str,
        request: &UpdateServiceIntegrationRequest,
    ) -> Result<ServiceIntegration, ProviderError> {
        let path = format!("/project/{project}/integration/{id}");
        let response: ServiceIntegrationResponse = self
            .send_json("update_integration", Method::PUT, &path, Some(request))
            .await?;
        Ok(response.service_integration)
    }

    pub async fn get_integration(
        &self,
        project: &str,
        id: &str,
    ) -> Result<ServiceIntegration, ProviderError> {
        let path = format!("/project/{project}/integration/{id}");
        let response: ServiceIntegrationResponse = self
            .send_json("get_integration", Method::GET, &path, None::<&()>)
            .await?;
        Ok(response.service_integration)
    }

    pub async fn delete_integration(&self, project: &str, id: &str) -> Result<(), ProviderError> {
        let path = format!("/project/{project}/integration/{id}");
        self.send_empty("delete_integration", Method::DELETE, &path, None::<&()>)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_omits_absent_endpoints() {
        let request = CreateServiceIntegrationRequest {
            integration_type: "kafka_logs".into(),
            source_service: Some("kafka".into()),
            dest_service: Some("kafka".into()),
            ..CreateServiceIntegrationRequest::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "integration_type": "kafka_logs",
                "source_service": "kafka",
                "dest_service": "kafka"
            })
        );
    }

    #[test]
    fn test_integration_response_defaults_flags() {
        let response: ServiceIntegrationResponse = serde_json::from_value(json!({
            "service_integration": {
                "service_integration_id": "abc",
                "integration_type": "metrics"
            }
        }))
        .unwrap();
        assert_eq!(response.service_integration.service_integration_id, "abc");
        assert!(!response.service_integration.active);
    }
}
