use std::time::Duration;

use async_trait::async_trait;
use neurolock_types::{
    config::VerifierConfig,
    session::{SessionChallenge, VerificationOutcome, VerificationPayload, VerificationResponse},
    NeuroLockError, Result,
};
use reqwest::Client;
use tracing::{debug, warn};

use crate::{network_error, VerifierClient};

/// Configuration for the HTTP verifier client.
#[derive(Debug, Clone)]
pub struct HttpVerifierConfig {
    /// Base URL of the verifier, without trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpVerifierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl From<&VerifierConfig> for HttpVerifierConfig {
    fn from(config: &VerifierConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Talks to the verifier's `/challenge` and `/verify` endpoints. Never retries.
pub struct HttpVerifier {
    http: Client,
    config: HttpVerifierConfig,
}

impl HttpVerifier {
    pub fn new(config: HttpVerifierConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| network_error(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { http, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url, endpoint)
    }
}

#[async_trait]
impl VerifierClient for HttpVerifier {
    async fn issue_challenge(&self) -> Result<SessionChallenge> {
        let url = self.url("challenge");
        debug!("Requesting challenge from {}", url);

        let response = self.http.get(&url).send().await.map_err(|err| {
            NeuroLockError::ChallengeUnavailable(format!("challenge request failed: {err}"))
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NeuroLockError::ChallengeUnavailable(format!(
                "verifier returned {status}: {body}"
            )));
        }

        let challenge: SessionChallenge = response.json().await.map_err(|err| {
            NeuroLockError::ChallengeUnavailable(format!("malformed challenge response: {err}"))
        })?;
        challenge.validate()?;
        Ok(challenge)
    }

    async fn submit(&self, payload: &VerificationPayload) -> Result<VerificationOutcome> {
        let url = self.url("verify");
        debug!("Submitting features to {}", url);

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                NeuroLockError::VerificationTransport(format!("verify request failed: {err}"))
            })?;

        // Rejections come back as 4xx with a JSON body, so the status code is not the verdict.
        let status = response.status();
        let body = response.text().await.map_err(|err| {
            NeuroLockError::VerificationTransport(format!("failed to read verify response: {err}"))
        })?;

        match serde_json::from_str::<VerificationResponse>(&body) {
            Ok(verdict) => verdict.into_outcome(),
            Err(err) => {
                warn!("Unparseable verifier response ({}): {}", status, err);
                Err(NeuroLockError::VerificationRejected {
                    status: status.as_u16().to_string(),
                    reason: "malformed verifier response".into(),
                })
            }
        }
    }
}
