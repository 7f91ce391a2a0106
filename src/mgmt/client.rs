//! Service-credential broker and collection fetches.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::types::{ActionGroups, ClientRecord};
use crate::config::{AuthConfig, ManagementConfig};
use crate::{Error, Result};

/// Upstream management API operations the aggregation pipeline depends on.
///
/// The seam exists so tests can substitute a counting fake and verify that
/// rejected requests never reach the upstream.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Exchange the configured client credentials for a `Bearer `-prefixed
    /// service credential.
    async fn service_credential(&self) -> Result<String>;

    /// Fetch the actions collection.
    async fn fetch_actions(&self, credential: &str) -> Result<ActionGroups>;

    /// Fetch the clients collection.
    async fn fetch_clients(&self, credential: &str) -> Result<Vec<ClientRecord>>;
}

/// Token-endpoint response for the client-credentials grant.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Production [`ManagementApi`] backed by `reqwest`.
///
/// The credential is re-acquired per request; failures are surfaced, never
/// retried.
pub struct HttpManagementApi {
    http: reqwest::Client,
    token_endpoint: String,
    actions_url: String,
    clients_url: String,
    audience: String,
    client_id: String,
    client_secret: String,
}

impl HttpManagementApi {
    /// Build from the auth and management configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(auth: &AuthConfig, management: &ManagementConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(management.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            token_endpoint: auth.token_endpoint(),
            actions_url: management.actions_url(),
            clients_url: management.clients_url(),
            audience: management.audience.clone(),
            client_id: management.client_id.clone(),
            client_secret: management.client_secret.clone(),
        })
    }
}

#[async_trait]
impl ManagementApi for HttpManagementApi {
    async fn service_credential(&self) -> Result<String> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .json(&json!({
                "grant_type": "client_credentials",
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "audience": self.audience,
            }))
            .send()
            .await
            .map_err(|e| Error::UpstreamAuth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::UpstreamAuth(format!(
                "token endpoint returned {status}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamAuth(format!("malformed token response: {e}")))?;

        debug!("Obtained management API credential");
        Ok(format!("Bearer {}", token.access_token))
    }

    async fn fetch_actions(&self, credential: &str) -> Result<ActionGroups> {
        fetch_json(&self.http, &self.actions_url, credential).await
    }

    async fn fetch_clients(&self, credential: &str) -> Result<Vec<ClientRecord>> {
        fetch_json(&self.http, &self.clients_url, credential).await
    }
}

/// GET `url` with the service credential and decode the JSON body.
async fn fetch_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    credential: &str,
) -> Result<T> {
    let response = http
        .get(url)
        .header(reqwest::header::AUTHORIZATION, credential)
        .send()
        .await
        .map_err(|e| Error::UpstreamFetch(format!("{url}: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(Error::UpstreamFetch(format!("{url} returned {status}")));
    }

    response
        .json()
        .await
        .map_err(|e| Error::UpstreamFetch(format!("{url}: malformed body: {e}")))
}
