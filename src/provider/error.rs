//! # Provider Errors
//!
//! Error type returned by the provider REST client, with the classification
//! the reconciliation engine depends on.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Message fragment the provider returns for unusable tokens
///
/// Only consulted when a failure carries no HTTP status to classify.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token";

/// Message fragment the provider returns when an update changes nothing
pub const UNCHANGED_MESSAGE: &str = "user config not changed";

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status
    #[error("provider API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a provider answer
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The client could not be built from the supplied settings
    #[error("invalid provider client configuration: {0}")]
    Configuration(String),
}

/// Error body returned by the provider API
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl ProviderError {
    /// Build an `Api` error from a status and raw response body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| {
                b.message
                    .or_else(|| b.errors.into_iter().find_map(|e| e.message))
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    body.trim().to_string()
                }
            });
        ProviderError::Api {
            status: status.as_u16(),
            message,
        }
    }

    /// HTTP status of the failure, when the provider answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            ProviderError::Transport(e) => e.status().map(|s| s.as_u16()),
            ProviderError::Configuration(_) => None,
        }
    }

    /// The addressed resource does not exist at the provider
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }

    /// Server-side failure (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s >= 500)
    }

    /// The credential used for the request is invalid or unusable
    ///
    /// Uses the HTTP status when there is one. Message matching is the
    /// fallback for failures without a status.
    pub fn is_invalid_credentials(&self) -> bool {
        match self.status() {
            Some(status) => {
                status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16()
            }
            None => self.to_string().contains(INVALID_TOKEN_MESSAGE),
        }
    }

    /// An update was rejected only because it would change nothing
    pub fn is_unchanged(&self) -> bool {
        matches!(self, ProviderError::Api { message, .. } if message.contains(UNCHANGED_MESSAGE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_extracted_from_json_body() {
        let err = ProviderError::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"message": "user config not changed", "errors": []}"#,
        );
        assert!(err.is_unchanged());
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_message_falls_back_to_nested_errors() {
        let err = ProviderError::from_response(
            StatusCode::CONFLICT,
            r#"{"errors": [{"message": "already exists", "status": 409}]}"#,
        );
        assert_eq!(
            err.to_string(),
            "provider API error (status 409): already exists"
        );
    }

    #[test]
    fn test_message_falls_back_to_raw_body_and_reason() {
        let raw = ProviderError::from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(raw.to_string().ends_with("upstream down"));
        assert!(raw.is_server_error());

        let empty = ProviderError::from_response(StatusCode::NOT_FOUND, "");
        assert!(empty.is_not_found());
        assert!(empty.to_string().ends_with("Not Found"));
    }

    #[test]
    fn test_invalid_credentials_uses_status_first() {
        let unauthorized = ProviderError::Api {
            status: 401,
            message: "whatever".into(),
        };
        assert!(unauthorized.is_invalid_credentials());

        let forbidden = ProviderError::Api {
            status: 403,
            message: "Forbidden".into(),
        };
        assert!(forbidden.is_invalid_credentials());

        // A status that says otherwise wins over the message
        let misleading = ProviderError::Api {
            status: 500,
            message: "Invalid token while proxying".into(),
        };
        assert!(!misleading.is_invalid_credentials());
    }

    #[test]
    fn test_invalid_credentials_message_fallback_without_status() {
        let err = ProviderError::Configuration("Invalid token: empty".into());
        assert!(err.is_invalid_credentials());
        let other = ProviderError::Configuration("bad url".into());
        assert!(!other.is_invalid_credentials());
    }
}
