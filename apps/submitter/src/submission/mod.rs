//! Submission Client — the single point where a resume leaves the machine.
//!
//! Exactly one POST per submit action. No retries, no backoff: any failure is
//! reported back to the form, which keeps the user's input for a manual resubmit.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::SubmitError;
use crate::session::SessionId;

/// Wire body posted to the webhook. Built fresh for every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub session_id: SessionId,
    pub resume: ResumeAttachment,
    pub keywords: String,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAttachment {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    /// Base64 of the complete file.
    pub data: String,
}

/// Anything that can deliver a payload. The form only sees this trait, so tests
/// can count sends without a network.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), SubmitError>;
}

/// Posts payloads as JSON to a fixed webhook URL.
#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: Url,
}

impl WebhookClient {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SubmissionTransport for WebhookClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), SubmitError> {
        info!(
            "Submitting '{}' ({} bytes) for session {}",
            payload.resume.name, payload.resume.size, payload.session_id
        );

        let response = self
            .client
            .post(self.url.clone())
            .header("content-type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| SubmitError::Network(describe_transport_error(&e)))?;

        let status = response.status();
        debug!("Webhook responded with {status}");

        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Webhook returned {}: {}", status, body);
        Err(SubmitError::Server {
            status: status.as_u16(),
            body,
        })
    }
}

/// reqwest's top-level message is terse ("error sending request"); append the source chain.
fn describe_transport_error(err: &reqwest::Error) -> String {
    let mut description = if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    };

    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !description.contains(&text) {
            description.push_str(": ");
            description.push_str(&text);
        }
        source = cause.source();
    }
    description
}
