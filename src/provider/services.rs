//! # Services API
//!
//! Read access to provider-hosted services, used to gate integrations on
//! their source and destination services being up.

use super::{ProviderClient, ProviderError};
use crate::constants::SERVICE_STATE_RUNNING;
use reqwest::Method;
use serde::Deserialize;

/// A provider-hosted service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Service {
    pub service_name: String,
    pub state: String,
}

impl Service {
    pub fn is_running(&self) -> bool {
        self.state == SERVICE_STATE_RUNNING
    }
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    service: Service,
}

impl ProviderClient {
    /// Fetch a single service by name
    pub async fn get_service(&self, project: &str, name: &str) -> Result<Service, ProviderError> {
        let path = format!("/project/{project}/service/{name}");
        let response: ServiceResponse = self
            .send_json("get_service", Method::GET, &path, None::<&()>)
            .await?;
        Ok(response.service)
    }

    /// Whether the named service exists and is in the running state
    ///
    /// A service that does not exist yet is reported as not running.
    pub async fn check_service_is_running(
        &self,
        project: &str,
        name: &str,
    ) -> Result<bool, ProviderError> {
        match self.get_service(project, name).await {
            Ok(service) => Ok(service.is_running()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
