//! Researcher posts from public X/Twitter timelines.
//!
//! Uses the unauthenticated embed ("syndication") page for each account. The
//! page carries its timeline as JSON inside `<script id="__NEXT_DATA__">`;
//! tweets live at `props.pageProps.timeline.entries[].content.tweet`.

use super::{get_text, Backoff};
use crate::error::{ConfigError, FetchError};
use crate::models::{CandidateItem, ItemDetails, SourceType};
use crate::utils::{collapse_whitespace, truncate_chars};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_SYNDICATION_BASE: &str = "https://syndication.twitter.com";
const TIMELINE_PATH: &str = "/srv/timeline-profile/screen-name/";
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";
const TITLE_CHARS: usize = 80;

/// Accounts followed when none are configured.
pub const DEFAULT_ACCOUNTS: &[&str] = &[
    "ylecun",
    "geoffreyhinton",
    "ilyasut",
    "sama",
    "DarioAmodei",
    "demishassabis",
    "JeffDean",
    "AndrewYNg",
    "NoamShazeer",
    "karpathy",
    "DrJimFan",
    "fchollet",
    "pabbeel",
    "hardmaru",
    "GaryMarcus",
    "random_forests",
    "jeffclune",
    "OriolVinyalsML",
    "chelseabfinn",
    "svlevine",
    "percyliang",
    "_akhaliq",
    "cwolferesearch",
];

/// A post is kept only if its lowercased text contains one of these.
const AI_KEYWORDS: &[&str] = &[
    "ai", "ml", "llm", "gpt", "claude", "gemini", "transformer", "neural",
    "deep learning", "machine learning", "training", "model", "inference",
    "reasoning", "alignment", "rlhf", "fine-tuning", "finetune",
    "multimodal", "vision", "language model", "diffusion", "agent",
    "benchmark", "dataset", "paper", "research", "arxiv",
    "openai", "anthropic", "deepmind", "meta ai", "google ai",
    "scaling", "context window", "token", "embedding", "retrieval",
    "chain of thought", "cot", "rag", "prompt", "synthetic data",
    "data quality", "vlm", "mllm", "sft", "dpo", "ppo",
];

static NEXT_DATA: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script#__NEXT_DATA__"#).unwrap());

#[derive(Debug, Clone)]
pub struct Settings {
    pub accounts: Vec<String>,
    pub per_account_limit: usize,
    pub window_days: i64,
    /// Pause between accounts.
    pub account_pause: Duration,
    pub base_url: String,
    pub backoff: Backoff,
}

impl Settings {
    /// Two retries, waiting 5 s then 10 s, for rate-limited timelines.
    pub fn default_backoff() -> Backoff {
        Backoff {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Parse a comma/whitespace list of handles, stripping `@`.
pub fn parse_accounts(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(|s| s.trim().trim_start_matches('@'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One handle per line; blank lines and `#` comments are ignored.
pub fn read_accounts_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_start_matches('@').to_string())
        .collect())
}

/// Merge handle lists, dropping case-insensitive duplicates and keeping first-seen order.
pub fn merge_accounts<I>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|handle| seen.insert(handle.to_lowercase()))
        .collect()
}

pub fn is_ai_related(text: &str) -> bool {
    let lower = text.to_lowercase();
    AI_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[derive(Debug, Deserialize)]
struct RawTweet {
    full_text: Option<String>,
    created_at: Option<String>,
    user: Option<RawUser>,
    conversation_id_str: Option<String>,
    id_str: Option<String>,
    #[serde(default)]
    favorite_count: u64,
    #[serde(default)]
    retweet_count: u64,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    screen_name: Option<String>,
}

/// A timeline post as read from the page, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Tweet {
    pub id: String,
    pub username: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub likes: u64,
    pub retweets: u64,
}

impl Tweet {
    pub fn url(&self) -> String {
        format!("https://x.com/{}/status/{}", self.username, self.id)
    }

    fn into_candidate(self) -> CandidateItem {
        let flat = collapse_whitespace(&self.text);
        CandidateItem {
            source_type: SourceType::Social,
            source_name: format!("@{}", self.username),
            title: truncate_chars(&flat, TITLE_CHARS, "…"),
            url: self.url(),
            published_at: self.created_at,
            body_text: Some(self.text),
            matched_categories: Vec::new(),
            details: ItemDetails::Social {
                username: self.username,
                likes: self.likes,
                retweets: self.retweets,
            },
        }
    }
}

/// Extract tweets from a syndication timeline page.
///
/// A page without embedded data yields no tweets; embedded data that is not
/// valid JSON is an error.
pub fn parse_timeline(html: &str, account: &str) -> Result<Vec<Tweet>, FetchError> {
    let document = Html::parse_document(html);
    let Some(script) = document.select(&NEXT_DATA).next() else {
        return Ok(Vec::new());
    };
    let data: serde_json::Value = serde_json::from_str(&script.text().collect::<String>())?;

    let entries = data
        .pointer("/props/pageProps/timeline/entries")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    Ok(entries
        .into_iter()
        .filter(|entry| entry.get("type").and_then(|t| t.as_str()) == Some("tweet"))
        .filter_map(|entry| entry.pointer("/content/tweet").cloned())
        .filter_map(|value| serde_json::from_value::<RawTweet>(value).ok())
        .filter_map(|raw| {
            let text = raw.full_text.filter(|t| !t.trim().is_empty())?;
            let id = raw.id_str.or(raw.conversation_id_str)?;
            let username = raw
                .user
                .and_then(|u| u.screen_name)
                .unwrap_or_else(|| account.to_string());
            let created_at = raw
                .created_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_str(s, CREATED_AT_FORMAT).ok())
                .map(|dt| dt.with_timezone(&Utc));
            Some(Tweet {
                id,
                username,
                text,
                created_at,
                likes: raw.favorite_count,
                retweets: raw.retweet_count,
            })
        })
        .collect())
}

#[instrument(level = "info", skip(client, settings, cutoff))]
async fn fetch_account(
    client: &Client,
    settings: &Settings,
    account: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<CandidateItem>, FetchError> {
    let url = format!(
        "{}{}{}",
        settings.base_url.trim_end_matches('/'),
        TIMELINE_PATH,
        account
    );
    let html = get_text(client, &url, &[], settings.backoff).await?;
    let posts: Vec<CandidateItem> = parse_timeline(&html, account)?
        .into_iter()
        .filter(|t| t.created_at.is_none_or(|ts| ts >= cutoff))
        .filter(|t| is_ai_related(&t.text))
        .take(settings.per_account_limit)
        .map(Tweet::into_candidate)
        .collect();
    debug!(count = posts.len(), "AI-related posts");
    Ok(posts)
}

/// Fetch every configured account in turn. A failing account is logged and skipped.
#[instrument(level = "info", skip_all, fields(accounts = settings.accounts.len()))]
pub async fn fetch_posts(client: &Client, settings: &Settings, now: DateTime<Utc>) -> Vec<CandidateItem> {
    let cutoff = now - ChronoDuration::days(settings.window_days);
    let mut posts = Vec::new();
    for (idx, account) in settings.accounts.iter().enumerate() {
        if idx > 0 {
            sleep(settings.account_pause).await;
        }
        match fetch_account(client, settings, account, cutoff).await {
            Ok(found) => posts.extend(found),
            Err(e) => warn!(%account, error = %e, "Timeline fetch failed; skipping account"),
        }
    }
    info!(count = posts.len(), "Fetched social posts");
    posts
}
