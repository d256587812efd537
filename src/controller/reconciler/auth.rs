//! # Authentication Context
//!
//! Resolves the credential secret referenced by a managed object and builds
//! a provider client authorized with it. Runs once at the start of every pass.

use super::events::{EventRecorder, EventSeverity, Reason};
use super::store::ObjectStore;
use super::types::{ObjectKey, ReconcilerError};
use crate::crd::ManagedObject;
use crate::provider::ProviderClient;
use k8s_openapi::api::core::v1::Secret;
use kube::{Resource, ResourceExt};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Credentials resolved for one pass
#[derive(Debug)]
pub struct AuthContext {
    /// Client authorized with the object's token
    pub client: ProviderClient,
    /// The credential secret, protected by a finalizer later in the pass
    pub secret: Secret,
}

#[derive(Debug, Clone)]
pub struct AuthContextResolver {
    api_url: String,
    user_agent: String,
}

impl AuthContextResolver {
    pub fn new(api_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Load the object's credential secret and build a client from it
    ///
    /// Failures are reported as warning events and leave the object untouched.
    pub async fn resolve<K, S, R>(
        &self,
        store: &S,
        recorder: &R,
        obj: &K,
    ) -> Result<AuthContext, ReconcilerError>
    where
        K: ManagedObject,
        S: ObjectStore,
        R: EventRecorder + ?Sized,
    {
        match self.build(store, obj).await {
            Ok(context) => {
                debug!(
                    secret.name = %obj.auth_secret_ref().name,
                    resource.name = %obj.name_any(),
                    "provider client ready"
                );
                Ok(context)
            }
            Err((reason, err)) => {
                recorder
                    .record(
                        &obj.object_ref(&()),
                        EventSeverity::Warning,
                        reason,
                        err.to_string(),
                    )
                    .await;
                Err(err)
            }
        }
    }

    async fn build<K, S>(
        &self,
        store: &S,
        obj: &K,
    ) -> Result<AuthContext, (Reason, ReconcilerError)>
    where
        K: ManagedObject,
        S: ObjectStore,
    {
        let reference = obj.auth_secret_ref();
        let key = ObjectKey::new(obj.namespace().unwrap_or_default(), reference.name.clone());
        let secret_error = |reason: String| {
            (
                Reason::UnableToGetAuthSecret,
                ReconcilerError::AuthSecret {
                    name: reference.name.clone(),
                    reason,
                },
            )
        };

        let secret = match store.get::<Secret>(&key).await {
            Ok(Some(secret)) => secret,
            Ok(None) => return Err(secret_error(format!("secret {key} not found"))),
            Err(e) => return Err(secret_error(e.to_string())),
        };
        let token = read_token(&secret, &reference.key).map_err(secret_error)?;

        let client = ProviderClient::new(&token, &self.api_url, &self.user_agent)
            .map_err(|e| (Reason::UnableToCreateClient, ReconcilerError::ClientInit(e)))?;

        Ok(AuthContext { client, secret })
    }
}

/// Token stored under `key`, from `data` or `stringData`
///
/// A missing field yields an empty token, which the provider rejects on first
/// use; the object then stays deletable through the invalid-credential path.
fn read_token(secret: &Secret, key: &str) -> Result<Zeroizing<String>, String> {
    if let Some(bytes) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return String::from_utf8(bytes.0.clone())
            .map(Zeroizing::new)
            .map_err(|_| format!("field {key:?} is not valid UTF-8"));
    }
    if let Some(value) = secret.string_data.as_ref().and_then(|d| d.get(key)) {
        return Ok(Zeroizing::new(value.clone()));
    }
    warn!(
        secret.name = %secret.name_any(),
        field = key,
        "auth secret has no such field, using an empty token"
    );
    Ok(Zeroizing::new(String::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn secret_with(data: Option<(&str, Vec<u8>)>, string_data: Option<(&str, &str)>) -> Secret {
        Secret {
            data: data.map(|(k, v)| BTreeMap::from([(k.to_string(), ByteString(v))])),
            string_data: string_data
                .map(|(k, v)| BTreeMap::from([(k.to_string(), v.to_string())])),
            ..Secret::default()
        }
    }

    #[test]
    fn test_token_read_from_data_then_string_data() {
        let secret = secret_with(Some(("token", b"abc".to_vec())), Some(("token", "ignored")));
        assert_eq!(read_token(&secret, "token").unwrap().as_str(), "abc");

        let secret = secret_with(None, Some(("token", "xyz")));
        assert_eq!(read_token(&secret, "token").unwrap().as_str(), "xyz");
    }

    #[test]
    fn test_missing_field_gives_empty_token() {
        let secret = secret_with(Some(("other", b"abc".to_vec())), None);
        assert!(read_token(&secret, "token").unwrap().is_empty());
    }

    #[test]
    fn test_non_utf8_token_is_rejected() {
        let secret = secret_with(Some(("token", vec![0xff, 0xfe])), None);
        assert!(read_token(&secret, "token").is_err());
    }
}
