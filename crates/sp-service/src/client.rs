// client.rs — HTTP client for deployment settings.
//
// One request per call, no retries. A failed read surfaces to the
// replication failure policy, which decides whether to abort.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use sp_policy::{AccessToken, ApplicatorConfig, DeploymentSettingsDocument, SettingsSource, StackIdentity};

use crate::error::{Result, ServiceError};

/// Connection settings for the stack-management service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL, e.g. `https://api.pulumi.com`.
    pub base_url: String,
    pub token: AccessToken,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>, token: AccessToken) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            timeout_secs: 30,
        }
    }

    /// Endpoint and timeout from the applicator config.
    pub fn from_applicator(config: &ApplicatorConfig, token: AccessToken) -> Self {
        Self {
            base_url: config.api_url.clone(),
            token,
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Client for the per-stack deployment settings endpoint.
#[derive(Debug, Clone)]
pub struct StackServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl StackServiceClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("token {}", config.token.expose()))
            .map_err(|_| ServiceError::Client("invalid access token characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ServiceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn settings_url(&self, stack: &StackIdentity) -> String {
        format!(
            "{}/api/stacks/{}/{}/{}/deployments/settings",
            self.base_url, stack.organization, stack.project, stack.stack
        )
    }

    /// Read the deployment settings of `stack`.
    pub async fn get_deployment_settings(
        &self,
        stack: &StackIdentity,
    ) -> Result<DeploymentSettingsDocument> {
        let endpoint = self.settings_url(stack);
        tracing::debug!(url = %endpoint, "fetching deployment settings");

        let resp = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|source| ServiceError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| ServiceError::Deserialization {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        DeploymentSettingsDocument::try_from(value)
            .map_err(|reason| ServiceError::Deserialization { endpoint, reason })
    }

    /// Write `document` as the deployment settings of `stack`.
    ///
    /// Used for settings the declarative API cannot express (cache options).
    /// The response body is not inspected beyond the status.
    pub async fn post_deployment_settings(
        &self,
        stack: &StackIdentity,
        document: &DeploymentSettingsDocument,
    ) -> Result<()> {
        let endpoint = self.settings_url(stack);
        let resp = self
            .client
            .post(&endpoint)
            .json(document.as_value())
            .send()
            .await
            .map_err(|source| ServiceError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!(stack = %stack, status = status.as_u16(), "posted deployment settings");
        Ok(())
    }
}

#[async_trait]
impl SettingsSource for StackServiceClient {
    async fn fetch(&self, stack: &StackIdentity) -> sp_policy::Result<DeploymentSettingsDocument> {
        self.get_deployment_settings(stack)
            .await
            .map_err(|e| e.into_policy_error(stack.path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_policy::ExecutionContext;

    fn token(raw: &str) -> AccessToken {
        ExecutionContext::new("p", "s")
            .with_access_token(raw)
            .resolve_access_token()
    }

    #[test]
    fn settings_url_joins_identity_without_double_slash() {
        let client =
            StackServiceClient::new(ServiceConfig::new("https://api.example.com/", token("t"))).unwrap();
        let stack = StackIdentity {
            organization: "initech".to_string(),
            project: "simple".to_string(),
            stack: "dev".to_string(),
        };
        assert_eq!(
            client.settings_url(&stack),
            "https://api.example.com/api/stacks/initech/simple/dev/deployments/settings"
        );
    }

    #[test]
    fn rejects_token_with_control_characters() {
        let err = StackServiceClient::new(ServiceConfig::new("http://x", token("bad\ntoken")))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Client(_)));
    }

    #[test]
    fn config_follows_applicator_settings() {
        let applicator = ApplicatorConfig {
            api_url: "http://localhost:8080".to_string(),
            timeout_secs: 5,
            ..Default::default()
        };
        let config = ServiceConfig::from_applicator(&applicator, token("t"));
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 5);
    }
}
