//! # Provider Client
//!
//! Native REST client for the managed service provider API.
//! Uses reqwest with rustls for HTTP requests and bearer-token authentication.
//!
//! A client is built once per reconciliation pass from the object's
//! credential secret and dropped at the end of the pass; it holds no state
//! besides the HTTP connection pool and the token.

mod error;
pub mod integrations;
pub mod services;

pub use error::{ProviderError, INVALID_TOKEN_MESSAGE, UNCHANGED_MESSAGE};

use crate::observability::metrics;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::Zeroizing;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider REST client authorized with a single API token
pub struct ProviderClient {
    http_client: Client,
    base_url: String,
    token: Zeroizing<String>,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    /// Build a client for `base_url` authorized with `token`
    ///
    /// An empty token is accepted here; the provider rejects it on first use
    /// with an authentication error, which keeps such objects deletable.
    ///
    /// # Errors
    /// Fails when the base URL is not a valid URL or the HTTP client cannot be built.
    pub fn new(token: &str, base_url: &str, user_agent: &str) -> Result<Self, ProviderError> {
        if let Err(e) = reqwest::Url::parse(base_url) {
            return Err(ProviderError::Configuration(format!(
                "provider API URL {base_url:?} is invalid: {e}"
            )));
        }

        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Zeroizing::new(token.trim().to_string()),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http_client
            .request(method, url)
            .header("authorization", format!("Bearer {}", self.token.as_str()))
            .header("accept", "application/json")
    }

    /// Send a request and decode a JSON response
    pub(crate) async fn send_json<B, T>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(operation, method, path, body).await?;
        Ok(response.json::<T>().await?)
    }

    /// Send a request whose response body is ignored
    pub(crate) async fn send_empty<B>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ProviderError>
    where
        B: Serialize + ?Sized,
    {
        self.send(operation, method, path, body).await.map(|_| ())
    }

    async fn send<B>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ProviderError>
    where
        B: Serialize + ?Sized,
    {
        debug!(operation, %method, path, "provider request");
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::increment_provider_requests(operation, "transport_error");
                return Err(e.into());
            }
        };

        let status = response.status();
        if status.is_success() {
            metrics::increment_provider_requests(operation, "success");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ProviderError::from_response(status, &body);
        let outcome = if err.is_not_found() {
            "not_found"
        } else {
            warn!(operation, status = status.as_u16(), error = %err, "provider request failed");
            "error"
        };
        metrics::increment_provider_requests(operation, outcome);
        Err(err)
    }
}
