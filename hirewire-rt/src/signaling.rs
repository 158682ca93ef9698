//! Credential, SDP exchange and session lifecycle clients
//!
//! Any non-success HTTP status is a hard failure for the current attempt;
//! nothing here retries. Callers decide whether to start over.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::ScoreBreakdown;

const USER_AGENT: &str = "HireWire-RT/0.1.0";

/// Short-lived credential for one SDP exchange
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub token: String,
    /// Endpoint accepting the SDP offer
    #[serde(alias = "sdp_url")]
    pub sdp_url: String,
    #[serde(default)]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialRequest<'a> {
    application_id: &'a str,
}

/// Credential fetch and SDP offer/answer exchange
#[async_trait]
pub trait Signaling: Send + Sync {
    async fn fetch_credential(&self, application_id: &str) -> Result<Credential>;

    /// Send the local offer and return the remote answer SDP
    async fn exchange_sdp(&self, credential: &Credential, offer_sdp: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalingSettings {
    pub token_endpoint: String,
    pub session_start_endpoint: String,
    pub session_end_endpoint: String,
    pub request_timeout: Duration,
}

impl From<&hirewire_common::config::SignalingSection> for SignalingSettings {
    fn from(section: &hirewire_common::config::SignalingSection) -> Self {
        Self {
            token_endpoint: section.token_endpoint.clone(),
            session_start_endpoint: section.session_start_endpoint.clone(),
            session_end_endpoint: section.session_end_endpoint.clone(),
            request_timeout: Duration::from_secs(section.request_timeout_secs),
        }
    }
}

impl Default for SignalingSettings {
    fn default() -> Self {
        Self::from(&hirewire_common::config::SignalingSection::default())
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// HTTP implementation of `Signaling`
pub struct SignalingClient {
    http_client: reqwest::Client,
    token_endpoint: String,
}

impl SignalingClient {
    pub fn new(settings: &SignalingSettings) -> Result<Self> {
        Ok(Self {
            http_client: build_http_client(settings.request_timeout)?,
            token_endpoint: settings.token_endpoint.clone(),
        })
    }
}

#[async_trait]
impl Signaling for SignalingClient {
    async fn fetch_credential(&self, application_id: &str) -> Result<Credential> {
        debug!(application_id = application_id, "Requesting realtime credential");

        let response = self
            .http_client
            .post(&self.token_endpoint)
            .json(&CredentialRequest { application_id })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Signaling {
                status: status.as_u16(),
                body,
            });
        }

        let credential: Credential = response.json().await?;
        info!(application_id = application_id, "Realtime credential issued");
        Ok(credential)
    }

    async fn exchange_sdp(&self, credential: &Credential, offer_sdp: &str) -> Result<String> {
        debug!(offer_bytes = offer_sdp.len(), "Posting SDP offer");

        let response = self
            .http_client
            .post(&credential.sdp_url)
            .bearer_auth(&credential.token)
            .header(reqwest::header::CONTENT_TYPE, "application/sdp")
            .body(offer_sdp.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Signaling {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Err(Error::Negotiation("empty SDP answer".to_string()));
        }
        Ok(body)
    }
}

/// Final result reported at session end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub session_id: Uuid,
    pub final_score: Option<f64>,
    /// Percentages (0-100)
    pub breakdown: Option<ScoreBreakdown>,
    pub fallback_score: bool,
    pub questions_asked: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionResponse {
    session_id: Uuid,
}

/// Session metadata persistence owned by the application backend
#[async_trait]
pub trait SessionLifecycle: Send + Sync {
    async fn start_session(&self, application_id: &str) -> Result<Uuid>;

    async fn end_session(&self, result: &SessionResult) -> Result<()>;
}

/// HTTP implementation of `SessionLifecycle`
pub struct SessionLifecycleClient {
    http_client: reqwest::Client,
    start_endpoint: String,
    end_endpoint: String,
}

impl SessionLifecycleClient {
    pub fn new(settings: &SignalingSettings) -> Result<Self> {
        Ok(Self {
            http_client: build_http_client(settings.request_timeout)?,
            start_endpoint: settings.session_start_endpoint.clone(),
            end_endpoint: settings.session_end_endpoint.clone(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::SessionApi {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SessionLifecycle for SessionLifecycleClient {
    async fn start_session(&self, application_id: &str) -> Result<Uuid> {
        let response = self
            .http_client
            .post(&self.start_endpoint)
            .json(&CredentialRequest { application_id })
            .send()
            .await?;
        let started: StartSessionResponse = Self::check(response).await?.json().await?;
        info!(session_id = %started.session_id, application_id = application_id, "Interview session registered");
        Ok(started.session_id)
    }

    async fn end_session(&self, result: &SessionResult) -> Result<()> {
        let response = self
            .http_client
            .post(&self.end_endpoint)
            .json(result)
            .send()
            .await?;
        Self::check(response).await?;
        info!(
            session_id = %result.session_id,
            final_score = ?result.final_score,
            fallback = result.fallback_score,
            "Interview session closed"
        );
        Ok(())
    }
}
