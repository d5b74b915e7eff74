//! Webhook delivery of the rendered card.
//!
//! The payload is serialized once and posted to each endpoint in turn. A
//! failing endpoint is logged and recorded in the [`PushReport`]; the rest are
//! still attempted.

use crate::error::PushError;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct Settings {
    pub webhooks: Vec<String>,
    /// Attempts per endpoint, including the first.
    pub attempts: u32,
    pub timeout: Duration,
    pub retry_delay: Duration,
}

impl Settings {
    pub fn new(webhooks: Vec<String>) -> Self {
        Self {
            webhooks,
            attempts: 2,
            timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Which endpoints accepted the payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub delivered: Vec<String>,
    /// `(endpoint, error)` pairs.
    pub failed: Vec<(String, String)>,
}

impl PushReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Body returned by the chat platform; either spelling of the code may appear.
#[derive(Debug, Default, Deserialize)]
struct WebhookReply {
    code: Option<i64>,
    #[serde(rename = "StatusCode")]
    status_code: Option<i64>,
    msg: Option<String>,
    #[serde(rename = "StatusMessage")]
    status_message: Option<String>,
}

impl WebhookReply {
    fn check(self) -> Result<(), PushError> {
        match self.code.or(self.status_code) {
            None | Some(0) => Ok(()),
            Some(code) => Err(PushError::Rejected {
                code,
                message: self.msg.or(self.status_message).unwrap_or_default(),
            }),
        }
    }
}

async fn post_once(client: &Client, url: &str, body: &[u8]) -> Result<(), PushError> {
    let resp = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body.to_vec())
        .send()
        .await?;
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(PushError::Status {
            status: status.as_u16(),
            body: truncate_for_log(&text, 300),
        });
    }
    // Non-JSON bodies on 2xx are accepted.
    serde_json::from_str::<WebhookReply>(&text)
        .unwrap_or_default()
        .check()
}

#[instrument(level = "info", skip_all, fields(endpoint = %truncate_for_log(url, 60)))]
async fn deliver(client: &Client, settings: &Settings, url: &str, body: &[u8]) -> Result<(), PushError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let t0 = Instant::now();
        match post_once(client, url, body).await {
            Ok(()) => {
                info!(attempt, elapsed_ms = t0.elapsed().as_millis() as u64, "Webhook accepted payload");
                return Ok(());
            }
            Err(e) if attempt < settings.attempts && e.is_retryable() => {
                warn!(attempt, max = settings.attempts, error = %e, "Webhook delivery failed; retrying");
                sleep(settings.retry_delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// POST the payload to every configured endpoint.
///
/// Endpoints are tried one after another. A failing endpoint is retried up to
/// `settings.attempts` times when the failure is transient, then recorded and
/// skipped; it never stops delivery to the rest.
///
/// # Arguments
///
/// * `settings` - Webhook URLs plus retry and timeout bounds
/// * `payload` - The rendered card, sent identically to every endpoint
///
/// # Returns
///
/// A [`PushReport`] listing which endpoints accepted the card and why the
/// others did not.
///
/// # Errors
///
/// Only a failure to build the HTTP client or encode the payload is an error;
/// per-endpoint failures land in the report.
#[instrument(level = "info", skip_all, fields(endpoints = settings.webhooks.len()))]
pub async fn push(settings: &Settings, payload: &Value) -> Result<PushReport, PushError> {
    let client = Client::builder().timeout(settings.timeout).build()?;
    let body = serde_json::to_vec(payload)?;

    let mut report = PushReport::default();
    for url in &settings.webhooks {
        match deliver(&client, settings, url, &body).await {
            Ok(()) => report.delivered.push(url.clone()),
            Err(e) => {
                error!(endpoint = %truncate_for_log(url, 60), error = %e, "Webhook delivery failed");
                report.failed.push((url.clone(), e.to_string()));
            }
        }
    }

    info!(
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "Push complete"
    );
    Ok(report)
}
