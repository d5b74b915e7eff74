//! Source fetchers for papers, blog feeds, social posts and classic picks.
//!
//! Every fetcher follows the same contract: given its slice of the run
//! configuration it returns `Vec<CandidateItem>`, and any network or parse
//! failure is logged and turned into an empty (or partial) contribution.
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | Hugging Face daily papers | [`huggingface`] | JSON API, one request per day |
//! | Lab and personal blogs | [`blogs`] | RSS 2.0 / Atom feeds via [`feed`] |
//! | Researcher timelines | [`social`] | Public syndication page, embedded JSON |
//! | Classic papers | [`classic`] | Static curated catalog |

pub mod blogs;
pub mod classic;
pub mod feed;
pub mod huggingface;
pub mod social;

use crate::error::FetchError;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Browser-like user agent; several blog hosts reject unknown clients.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fixed-step backoff for source requests.
///
/// Attempt `n` (1-based) that fails with a retryable error waits `delay * n`
/// before the next attempt.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Build the shared HTTP client used by all fetchers.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// GET `url` and return the body as text, retrying rate limits and server errors.
#[instrument(level = "debug", skip(client, query, backoff))]
pub async fn get_text(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    backoff: Backoff,
) -> Result<String, FetchError> {
    let t0 = Instant::now();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let result = client.get(url).query(query).send().await;

        let error = match result {
            Ok(resp) if resp.status().is_success() => {
                let body = resp.text().await?;
                debug!(
                    bytes = body.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Fetched"
                );
                return Ok(body);
            }
            Ok(resp) => {
                let status = resp.status();
                let error = FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                };
                if !is_retryable_status(status) {
                    return Err(error);
                }
                error
            }
            Err(e) => FetchError::Http(e),
        };

        if attempt >= backoff.attempts {
            return Err(error);
        }
        let delay = backoff.delay * attempt;
        warn!(attempt, max = backoff.attempts, ?delay, error = %error, "Request failed; backing off");
        sleep(delay).await;
    }
}
