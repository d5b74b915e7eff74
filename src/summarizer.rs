//! LLM summaries with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait for one completion request
//! - [`ChatClient`]: speaks one of three wire protocols over `reqwest`
//! - [`RetryAsk`]: decorator that retries any `AskAsync` on transient failures
//! - [`Summarizer`]: builds prompts for papers, blog posts and the trend
//!   paragraph, and turns every failure into a [`Summary::Unavailable`]
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```
//!
//! Only errors for which [`SummaryError::is_retryable`] holds are retried.

use crate::error::{ConfigError, SummaryError};
use crate::models::{CandidateItem, DigestEntry, ItemDetails, SourceType, Summary};
use crate::utils::{format_datetime, truncate_chars, truncate_for_log};
use futures::stream::{self, StreamExt};
use rand::{rng, Rng};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const TEMPERATURE: f32 = 0.7;

/// Blog posts with less text than this are not sent to the model.
const MIN_BLOG_CHARS: usize = 100;
/// Blog text is cut to this many characters before prompting.
const BLOG_PROMPT_CHARS: usize = 3000;

/// LLM vendor selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Claude,
    Gemini,
    OpenAi,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Claude => "claude-sonnet-4-20250514",
            Provider::Gemini => "gemini-2.0-flash-exp",
            Provider::OpenAi => "gpt-4o",
        }
    }

    /// Environment variable holding this provider's own API key.
    pub fn key_env(self) -> &'static str {
        match self {
            Provider::Claude => "CLAUDE_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Provider::Claude => "Claude",
            Provider::Gemini => "Gemini",
            Provider::OpenAi => "GPT",
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(Provider::Claude),
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" | "gpt" => Ok(Provider::OpenAi),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
        })
    }
}

/// Wire protocol used for a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    ChatCompletions,
    AnthropicMessages,
    GeminiGenerate,
}

/// Append `/v1` unless the base already ends with it.
pub fn normalize_openai_base(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/v1") {
        base.to_string()
    } else {
        format!("{base}/v1")
    }
}

/// Display label derived from the model name, falling back to the provider.
pub fn label_for(model: &str, provider: Provider) -> String {
    let lower = model.to_lowercase();
    if lower.contains("claude") {
        "Claude".to_string()
    } else if lower.contains("gemini") {
        "Gemini".to_string()
    } else if lower.contains("gpt") {
        "GPT".to_string()
    } else {
        provider.label().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
    /// OpenAI-compatible base URL. When set, every provider is reached through it.
    pub base_url: Option<String>,
    pub language: String,
    pub timeout: StdDuration,
    pub max_retries: usize,
    pub base_delay: StdDuration,
    pub concurrency: usize,
}

impl Settings {
    /// Wire protocol and full endpoint URL for this configuration.
    pub fn endpoint(&self) -> (Wire, String) {
        if let Some(base) = &self.base_url {
            return (
                Wire::ChatCompletions,
                format!("{}/chat/completions", normalize_openai_base(base)),
            );
        }
        match self.provider {
            Provider::OpenAi => (
                Wire::ChatCompletions,
                format!("{OPENAI_BASE}/chat/completions"),
            ),
            Provider::Claude => (
                Wire::AnthropicMessages,
                format!("{ANTHROPIC_BASE}/v1/messages"),
            ),
            Provider::Gemini => (
                Wire::GeminiGenerate,
                format!("{GEMINI_BASE}/models/{}:generateContent", self.model),
            ),
        }
    }
}

/// One completion request.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

/// Trait for async LLM interaction.
///
/// Implementors send one prompt and return the model's reply. Decorators such
/// as [`RetryAsk`] implement it too.
pub trait AskAsync {
    type Response;

    async fn ask(&self, prompt: &Prompt) -> Result<Self::Response, SummaryError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
pub struct RetryAsk<T> {
    inner: T,
    /// Retries after the first attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, prompt: &Prompt) -> Result<Self::Response, SummaryError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries || !e.is_retryable() {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() giving up"
                        );
                        return Err(e);
                    }

                    let delay = self
                        .base_delay
                        .saturating_mul(1 << (attempt - 1).min(16))
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
}

fn join_parts(parts: Vec<TextPart>) -> Option<String> {
    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    (!text.is_empty()).then_some(text)
}

/// Completion client for one provider endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    wire: Wire,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(http: Client, wire: Wire, endpoint: String, api_key: String, model: String) -> Self {
        Self {
            http,
            wire,
            endpoint,
            api_key,
            model,
        }
    }

    fn request(&self, prompt: &Prompt) -> reqwest::RequestBuilder {
        match self.wire {
            Wire::ChatCompletions => self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&json!({
                    "model": self.model,
                    "messages": [
                        {"role": "system", "content": prompt.system},
                        {"role": "user", "content": prompt.user},
                    ],
                    "max_tokens": prompt.max_tokens,
                    "temperature": TEMPERATURE,
                })),
            Wire::AnthropicMessages => self
                .http
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": self.model,
                    "system": prompt.system,
                    "messages": [{"role": "user", "content": prompt.user}],
                    "max_tokens": prompt.max_tokens,
                    "temperature": TEMPERATURE,
                })),
            Wire::GeminiGenerate => self
                .http
                .post(&self.endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&json!({
                    "systemInstruction": {"parts": [{"text": prompt.system}]},
                    "contents": [{"role": "user", "parts": [{"text": prompt.user}]}],
                    "generationConfig": {
                        "maxOutputTokens": prompt.max_tokens,
                        "temperature": TEMPERATURE,
                    },
                })),
        }
    }
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "debug", skip_all, fields(wire = ?self.wire, model = %self.model))]
    async fn ask(&self, prompt: &Prompt) -> Result<String, SummaryError> {
        let t0 = Instant::now();
        let resp = self.request(prompt).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SummaryError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }

        let text = match self.wire {
            Wire::ChatCompletions => resp
                .json::<ChatResponse>()
                .await?
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content),
            Wire::AnthropicMessages => join_parts(resp.json::<AnthropicResponse>().await?.content),
            Wire::GeminiGenerate => resp
                .json::<GeminiResponse>()
                .await?
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .and_then(|c| join_parts(c.parts)),
        };

        let text = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(SummaryError::Empty)?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = text.chars().count(),
            "Completion received"
        );
        Ok(text)
    }
}

fn paper_prompt(item: &CandidateItem, language: &str) -> Prompt {
    let authors = match &item.details {
        ItemDetails::Paper { authors, .. } if !authors.is_empty() => authors.join(", "),
        _ => "N/A".to_string(),
    };
    let published = item
        .published_at
        .as_ref()
        .map(format_datetime)
        .unwrap_or_else(|| "N/A".to_string());
    let user = format!(
        "Analyse the following paper and write a detailed digest in {language}.\n\n\
         Title: {title}\n\
         Authors: {authors}\n\
         Published: {published}\n\
         Abstract: {abstract_}\n\n\
         Structure the answer with these sections:\n\
         ## Problem\nWhat problem does the paper address?\n\
         ## Key contributions\nThe 3-5 main contributions.\n\
         ## Method\nThe approach and techniques used.\n\
         ## Results\nMain experimental results.\n\
         ## Significance\nWhy it matters and what it suggests for future work.\n\n\
         Reply with the sections only.",
        title = item.title,
        abstract_ = item.body_text.as_deref().unwrap_or("N/A"),
    );
    Prompt {
        system: format!(
            "You are an AI research assistant who writes thorough, well-structured analyses of \
             academic papers. Always answer in {language}."
        ),
        user,
        max_tokens: 3000,
    }
}

fn blog_prompt(item: &CandidateItem, content: &str, language: &str) -> Prompt {
    let user = format!(
        "Summarize the core ideas of this blog post in {language}.\n\n\
         Title: {title}\n\
         Source: {source}\n\
         Link: {url}\n\n\
         Content:\n{content}\n\n\
         Structure the answer with these sections:\n\
         ## Core point\n\
         ## Key information\nAuthor, the problem discussed, methods or findings, important data.\n\
         ## Takeaway\nHow an AI researcher should read this post.\n\n\
         Reply with the sections only.",
        title = item.title,
        source = item.source_name,
        url = item.url,
        content = truncate_chars(content, BLOG_PROMPT_CHARS, ""),
    );
    Prompt {
        system: "You are an AI research assistant who summarizes and analyses technical blog posts."
            .to_string(),
        user,
        max_tokens: 2000,
    }
}

fn trend_prompt(papers: &[CandidateItem], blogs: &[CandidateItem], language: &str) -> Prompt {
    let mut content = String::new();
    if !papers.is_empty() {
        content.push_str("## Papers\n");
        for (i, p) in papers.iter().take(5).enumerate() {
            content.push_str(&format!("{}. {}\n", i + 1, p.title));
        }
    }
    if !blogs.is_empty() {
        content.push_str("\n## Blog posts\n");
        for (i, b) in blogs.iter().take(3).enumerate() {
            content.push_str(&format!("{}. {}\n", i + 1, b.title));
        }
    }
    Prompt {
        system: "You are an AI research trend analyst who distils the key directions from many \
                 research items."
            .to_string(),
        user: format!(
            "Based on today's AI papers and blog posts below, summarize the current research \
             trends in {language}, 200-300 words:\n\n{content}\n\
             Cover the main research directions, new techniques or methods, and the overall \
             trajectory. Give the summary directly."
        ),
        max_tokens: 800,
    }
}

/// Produces [`Summary`] values; never fails.
#[derive(Debug)]
pub struct Summarizer<A> {
    asker: A,
    label: String,
    language: String,
    concurrency: usize,
}

impl Summarizer<RetryAsk<ChatClient>> {
    /// Build the production summarizer for `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(settings.timeout).build()?;
        let (wire, endpoint) = settings.endpoint();
        info!(provider = %settings.provider, ?wire, %endpoint, model = %settings.model, "Summarizer configured");
        let client = ChatClient::new(
            http,
            wire,
            endpoint,
            settings.api_key.clone(),
            settings.model.clone(),
        );
        Ok(Self::new(
            RetryAsk::new(client, settings.max_retries, settings.base_delay),
            label_for(&settings.model, settings.provider),
            settings.language.clone(),
            settings.concurrency,
        ))
    }
}

impl<A> Summarizer<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(asker: A, label: String, language: String, concurrency: usize) -> Self {
        Self {
            asker,
            label,
            language,
            concurrency: concurrency.max(1),
        }
    }

    async fn complete(&self, prompt: &Prompt, title: &str) -> Result<String, SummaryError> {
        let t0 = Instant::now();
        let res = self.asker.ask(prompt).await;
        let elapsed_ms = t0.elapsed().as_millis() as u64;
        match &res {
            Ok(text) => info!(elapsed_ms, chars = text.chars().count(), %title, "Summary generated"),
            Err(e) => warn!(elapsed_ms, error = %e, %title, "Summary failed"),
        }
        res
    }

    /// Model digest of a paper, falling back to the index's own summary.
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(&item.title, 60)))]
    pub async fn summarize_paper(&self, item: &CandidateItem) -> Summary {
        let prompt = paper_prompt(item, &self.language);
        match self.complete(&prompt, &item.title).await {
            Ok(text) => Summary::Generated {
                text,
                label: self.label.clone(),
            },
            Err(e) => match &item.details {
                ItemDetails::Paper {
                    source_summary: Some(text),
                    ..
                } => Summary::SourceProvided { text: text.clone() },
                _ => Summary::unavailable(e.to_string()),
            },
        }
    }

    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(&item.title, 60)))]
    pub async fn summarize_blog(&self, item: &CandidateItem) -> Summary {
        let content = item.summary_source_text().unwrap_or_default();
        if content.chars().count() < MIN_BLOG_CHARS {
            debug!("Too little text to summarize");
            return Summary::unavailable("not enough text to summarize");
        }
        let prompt = blog_prompt(item, content, &self.language);
        match self.complete(&prompt, &item.title).await {
            Ok(text) => Summary::Generated {
                text,
                label: self.label.clone(),
            },
            Err(e) => Summary::unavailable(e.to_string()),
        }
    }

    /// Summarize papers and blog posts; other items pass through unsummarized.
    ///
    /// Runs with bounded concurrency and returns entries in input order.
    #[instrument(level = "info", skip_all, fields(count = items.len(), concurrency = self.concurrency))]
    pub async fn summarize_all(&self, items: Vec<CandidateItem>) -> Vec<DigestEntry> {
        let entries: Vec<DigestEntry> = stream::iter(items)
            .map(|item| async move {
                let summary = match item.source_type {
                    SourceType::Paper => self.summarize_paper(&item).await,
                    SourceType::Blog => self.summarize_blog(&item).await,
                    SourceType::Social | SourceType::Classic => {
                        return DigestEntry::unsummarized(item);
                    }
                };
                DigestEntry { item, summary }
            })
            .buffered(self.concurrency)
            .collect()
            .await;
        let generated = entries.iter().filter(|e| e.summary.is_available()).count();
        info!(generated, total = entries.len(), "Summaries complete");
        entries
    }

    /// One paragraph on the day's themes, from the top paper and blog titles.
    #[instrument(level = "info", skip_all)]
    pub async fn trend_summary(&self, papers: &[CandidateItem], blogs: &[CandidateItem]) -> Option<String> {
        if papers.is_empty() && blogs.is_empty() {
            return None;
        }
        let prompt = trend_prompt(papers, blogs, &self.language);
        self.complete(&prompt, "trend summary").await.ok()
    }
}
