//! External identity provider client.
//!
//! The platform never issues credentials itself. An OIDC-style provider
//! verifies ID tokens and stores the custom claims we propagate back after
//! provisioning. The provider sits behind a narrow trait so the HTTP
//! implementation can be swapped for a mock in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::config::IdentityProviderConfig;
use crate::models::Role;

/// Custom claims propagated to the identity provider after provisioning.
/// They show up in tokens the provider issues afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomClaims {
    pub role: Role,
    pub company_id: Uuid,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify an ID token and return the provider's subject identifier.
    async fn verify_id_token(&self, id_token: &str) -> Result<String, AppError>;

    /// Store custom claims for a subject.
    async fn set_custom_claims(
        &self,
        subject: &str,
        claims: &CustomClaims,
    ) -> Result<(), AppError>;
}

/// REST client for an Identity-Toolkit-style provider API.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[tracing::instrument(skip_all)]
    async fn verify_id_token(&self, id_token: &str) -> Result<String, AppError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct LookupRequest<'a> {
            id_token: &'a str,
        }

        #[derive(Deserialize)]
        struct LookupResponse {
            #[serde(default)]
            users: Vec<LookupUser>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct LookupUser {
            local_id: String,
        }

        let response = self
            .http
            .post(format!("{}/v1/accounts:lookup", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&LookupRequest { id_token })
            .send()
            .await
            .map_err(|e| {
                AppError::Upstream(anyhow::anyhow!("Identity provider unreachable: {}", e))
            })?;

        // The provider answers 400 for malformed, expired, or revoked
        // tokens; that is the caller's fault, not an upstream outage.
        if response.status().is_client_error() {
            return Err(AppError::AuthError(anyhow::anyhow!(
                "Invalid identity token"
            )));
        }

        let body: LookupResponse = response
            .error_for_status()
            .map_err(|e| AppError::Upstream(anyhow::anyhow!("Token verification failed: {}", e)))?
            .json()
            .await
            .map_err(|e| {
                AppError::Upstream(anyhow::anyhow!("Malformed verification response: {}", e))
            })?;

        body.users
            .into_iter()
            .next()
            .map(|u| u.local_id)
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Invalid identity token")))
    }

    #[tracing::instrument(skip(self, claims), fields(subject = %subject))]
    async fn set_custom_claims(
        &self,
        subject: &str,
        claims: &CustomClaims,
    ) -> Result<(), AppError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct UpdateRequest<'a> {
            local_id: &'a str,
            custom_attributes: String,
        }

        let custom_attributes =
            serde_json::to_string(claims).map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

        self.http
            .post(format!("{}/v1/accounts:update", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&UpdateRequest {
                local_id: subject,
                custom_attributes,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::Upstream(anyhow::anyhow!("Identity provider unreachable: {}", e))
            })?
            .error_for_status()
            .map_err(|e| AppError::Upstream(anyhow::anyhow!("Claims propagation failed: {}", e)))?;

        tracing::debug!("Custom claims propagated");
        Ok(())
    }
}

/// In-memory provider for tests: registered tokens resolve to subjects,
/// propagated claims are recorded, and claim writes can be forced to fail.
#[derive(Default)]
pub struct MockIdentityProvider {
    subjects: std::sync::Mutex<std::collections::HashMap<String, String>>,
    recorded: std::sync::Mutex<Vec<(String, CustomClaims)>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id_token` verify successfully as `subject`.
    pub fn register_token(&self, id_token: &str, subject: &str) {
        self.subjects
            .lock()
            .unwrap()
            .insert(id_token.to_string(), subject.to_string());
    }

    /// All (subject, claims) pairs propagated so far.
    pub fn recorded_claims(&self) -> Vec<(String, CustomClaims)> {
        self.recorded.lock().unwrap().clone()
    }

    /// Toggle failure of `set_custom_claims`.
    pub fn fail_claim_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn verify_id_token(&self, id_token: &str) -> Result<String, AppError> {
        self.subjects
            .lock()
            .unwrap()
            .get(id_token)
            .cloned()
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Invalid identity token")))
    }

    async fn set_custom_claims(
        &self,
        subject: &str,
        claims: &CustomClaims,
    ) -> Result<(), AppError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::Upstream(anyhow::anyhow!(
                "Claims propagation failed"
            )));
        }
        self.recorded
            .lock()
            .unwrap()
            .push((subject.to_string(), claims.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_claims_serialize_in_provider_shape() {
        let claims = CustomClaims {
            role: Role::Evaluator,
            company_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "evaluator",
                "companyId": "00000000-0000-0000-0000-000000000000"
            })
        );
    }
}
