//! Command-line interface definitions for the AI paper digest.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it. A `.env` file in the working directory is loaded before
//! parsing, so both routes see the same values.

use crate::sources::huggingface::DEFAULT_BASE_URL;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

pub const DEFAULT_CATEGORIES: &str = "rl_verification,alignment,ai4math,auto_formalization";
pub const DEFAULT_BLOG_SOURCES: &str = "google_ai,deepmind,openai,lesswrong,microsoft_research,salesforce_ai,mit_tech_review,jeremykun,colah,distill";
pub const DEFAULT_CLASSIC_CATEGORIES: &str =
    "reinforcement_learning,alignment,ai4math,formal_verification,llm,information_theory";

/// Command-line arguments for one digest run.
///
/// Boolean options accept `true/false`, `yes/no`, `1/0` both as flag values
/// and from the environment; a bare flag means `true`.
///
/// # Examples
///
/// ```sh
/// # Push today's digest to one webhook
/// ai_paper_digest --webhook https://open.feishu.cn/open-apis/bot/v2/hook/xxx
///
/// # Print the card instead of pushing, without summaries
/// ai_paper_digest --dry-run --enable-summary false
///
/// # Only alignment papers, plus researcher posts
/// ai_paper_digest --categories alignment --include-tweets
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Webhook URL(s); repeat the flag or separate with commas/spaces
    #[arg(long = "webhook", env = "FEISHU_WEBHOOK_URL", hide_env_values = true)]
    pub webhooks: Vec<String>,

    /// Days of daily papers to look back over
    #[arg(long, env = "HF_DAYS_BACK", default_value_t = 7, allow_negative_numbers = true)]
    pub days_back: i64,

    /// Maximum papers in the digest
    #[arg(long, env = "HF_MAX_PAPERS", default_value_t = 6, allow_negative_numbers = true)]
    pub max_papers: i64,

    /// Maximum blog posts in the digest (also the per-feed limit)
    #[arg(long, env = "HF_MAX_BLOGS", default_value_t = 3, allow_negative_numbers = true)]
    pub max_blogs: i64,

    /// Use the trending listing instead of walking back day by day
    #[arg(long, env = "HF_USE_TRENDING", default_value_t = false, num_args = 0..=1,
          default_missing_value = "true", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub use_trending: bool,

    /// Active categories, comma separated; empty or `none` disables filtering
    #[arg(long, env = "HF_CATEGORIES", default_value = DEFAULT_CATEGORIES)]
    pub categories: String,

    /// Disable category filtering regardless of --categories
    #[arg(long)]
    pub no_category_filter: bool,

    /// YAML file replacing the built-in category taxonomy
    #[arg(long, env = "HF_CATEGORIES_FILE")]
    pub categories_file: Option<PathBuf>,

    /// Blog registry keys or feed URLs, comma separated
    #[arg(long, env = "HF_BLOG_SOURCES", default_value = DEFAULT_BLOG_SOURCES)]
    pub blog_sources: String,

    /// Generate LLM summaries
    #[arg(long, env = "HF_ENABLE_AI_SUMMARY", default_value_t = true, num_args = 0..=1,
          default_missing_value = "true", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub enable_summary: bool,

    /// LLM provider: claude, gemini or openai
    #[arg(long, env = "AI_PROVIDER", default_value = "claude")]
    pub ai_provider: String,

    /// Model name; falls back to `{PROVIDER}_MODEL`, then `OPENAI_MODEL`, then a per-provider default
    #[arg(long, env = "AI_MODEL")]
    pub ai_model: Option<String>,

    /// OpenAI-compatible base URL; when set, all providers are called through it
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub ai_base_url: Option<String>,

    /// Per-provider model names, consulted when `--ai-model` is unset
    #[arg(long, env = "CLAUDE_MODEL", hide = true)]
    pub claude_model: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", hide = true)]
    pub gemini_model: Option<String>,

    /// Also the fallback model for any provider
    #[arg(long, env = "OPENAI_MODEL", hide = true)]
    pub openai_model: Option<String>,

    #[arg(long, env = "CLAUDE_API_KEY", hide_env_values = true)]
    pub claude_api_key: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Also used as the fallback key for any provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Language the summaries are written in
    #[arg(long, env = "SUMMARY_LANGUAGE", default_value = "English")]
    pub summary_language: String,

    /// Add one classic paper to the digest
    #[arg(long, env = "HF_INCLUDE_CLASSIC", default_value_t = true, num_args = 0..=1,
          default_missing_value = "true", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub include_classic: bool,

    /// Classic catalog categories to draw from
    #[arg(long, env = "HF_CLASSIC_CATEGORIES", default_value = DEFAULT_CLASSIC_CATEGORIES)]
    pub classic_categories: String,

    /// Pick the classic paper by date instead of at random
    #[arg(long, env = "HF_CLASSIC_DAILY", default_value_t = false, num_args = 0..=1,
          default_missing_value = "true", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub classic_daily: bool,

    /// Include researcher posts
    #[arg(long, env = "HF_INCLUDE_TWEETS", default_value_t = false, num_args = 0..=1,
          default_missing_value = "true", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub include_tweets: bool,

    /// Accounts to follow, comma separated; defaults to a built-in researcher list
    #[arg(long, env = "TWITTER_ACCOUNTS")]
    pub twitter_accounts: Option<String>,

    /// File with one account per line, merged with --twitter-accounts
    #[arg(long, env = "TWITTER_ACCOUNTS_FILE")]
    pub twitter_accounts_file: Option<PathBuf>,

    /// Maximum posts in the digest
    #[arg(long, env = "HF_MAX_TWEETS", default_value_t = 10, allow_negative_numbers = true)]
    pub max_tweets: i64,

    /// Print the card JSON to stdout instead of pushing it
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, env = "HF_BASE_URL", default_value = DEFAULT_BASE_URL, hide = true)]
    pub hf_base_url: String,
}
