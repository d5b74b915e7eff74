//! Run configuration.
//!
//! [`Config::from_cli`] validates the parsed arguments once and produces an
//! immutable value that the pipeline borrows for the rest of the run. Every
//! check happens here, before any network activity.

use crate::categories::{CategoryFilter, Taxonomy};
use crate::cli::Cli;
use crate::error::{ConfigError, SummaryError};
use crate::pusher;
use crate::sources::{blogs, classic, huggingface, social, Backoff};
use crate::summarizer::{self, Provider};
use crate::utils::split_list;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(60);
const SUMMARY_CONCURRENCY: usize = 3;
const BLOG_CONCURRENCY: usize = 4;
const POSTS_PER_ACCOUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub dry_run: bool,
    pub fetch_timeout: Duration,
    pub papers: huggingface::Settings,
    pub max_papers: usize,
    pub blogs: blogs::Settings,
    pub max_blogs: usize,
    /// `None` when researcher posts are not requested.
    pub social: Option<social::Settings>,
    pub max_tweets: usize,
    pub filter: CategoryFilter,
    pub classic: Option<classic::Settings>,
    /// `None` when summaries are disabled or no key is available.
    pub summarizer: Option<summarizer::Settings>,
    pub push: pusher::Settings,
}

fn positive(value: i64, name: &'static str) -> Result<usize, ConfigError> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or(ConfigError::NotPositive { name })
}

fn validate_webhooks(raw: &[String]) -> Result<Vec<String>, ConfigError> {
    raw.iter()
        .flat_map(|value| split_list(value))
        .map(|url| match Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(url),
            Ok(parsed) => Err(ConfigError::InvalidWebhook {
                reason: format!("unsupported scheme {}", parsed.scheme()),
                url,
            }),
            Err(e) => Err(ConfigError::InvalidWebhook {
                reason: e.to_string(),
                url,
            }),
        })
        .collect()
}

fn category_filter(cli: &Cli) -> Result<CategoryFilter, ConfigError> {
    let active = split_list(&cli.categories);
    if cli.no_category_filter
        || active.is_empty()
        || (active.len() == 1 && active[0].eq_ignore_ascii_case("none"))
    {
        info!("Category filter disabled");
        return Ok(CategoryFilter::disabled());
    }

    let taxonomy = match &cli.categories_file {
        Some(path) => Taxonomy::load(path)?,
        None => Taxonomy::builtin(),
    };
    let filter = CategoryFilter::new(&taxonomy, &active)?;
    info!(categories = ?filter.active(), "Category filter enabled");
    Ok(filter)
}

/// The provider's own key, else the OpenAI key.
fn resolve_api_key(cli: &Cli, provider: Provider) -> Result<String, SummaryError> {
    let own = match provider {
        Provider::Claude => cli.claude_api_key.as_deref(),
        Provider::Gemini => cli.gemini_api_key.as_deref(),
        Provider::OpenAi => None,
    };
    own.or(cli.openai_api_key.as_deref())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or(SummaryError::MissingKey(provider.key_env()))
}

/// `--ai-model`, then the provider's own model variable, then `OPENAI_MODEL`,
/// then the provider default.
fn resolve_model(cli: &Cli, provider: Provider) -> String {
    let own = match provider {
        Provider::Claude => cli.claude_model.as_deref(),
        Provider::Gemini => cli.gemini_model.as_deref(),
        Provider::OpenAi => None,
    };
    [cli.ai_model.as_deref(), own, cli.openai_model.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|m| !m.is_empty())
        .unwrap_or(provider.default_model())
        .to_string()
}

fn summarizer_settings(cli: &Cli) -> Result<Option<summarizer::Settings>, ConfigError> {
    let provider: Provider = cli.ai_provider.parse()?;
    if !cli.enable_summary {
        info!("AI summaries disabled");
        return Ok(None);
    }
    let api_key = match resolve_api_key(cli, provider) {
        Ok(key) => key,
        Err(e) => {
            warn!(%provider, error = %e, "No API key available; summaries disabled");
            return Ok(None);
        }
    };
    let model = resolve_model(cli, provider);
    Ok(Some(summarizer::Settings {
        provider,
        model,
        api_key,
        base_url: cli.ai_base_url.clone().filter(|u| !u.trim().is_empty()),
        language: cli.summary_language.clone(),
        timeout: SUMMARY_TIMEOUT,
        max_retries: 2,
        base_delay: Duration::from_secs(1),
        concurrency: SUMMARY_CONCURRENCY,
    }))
}

fn social_settings(cli: &Cli, days_back: u32) -> Result<Option<social::Settings>, ConfigError> {
    if !cli.include_tweets {
        return Ok(None);
    }
    let listed = match &cli.twitter_accounts {
        Some(raw) if !raw.trim().is_empty() => social::parse_accounts(raw),
        _ => social::DEFAULT_ACCOUNTS.iter().map(|a| a.to_string()).collect(),
    };
    let from_file = match &cli.twitter_accounts_file {
        Some(path) => social::read_accounts_file(path)?,
        None => Vec::new(),
    };
    let accounts = social::merge_accounts([listed, from_file]);
    info!(accounts = accounts.len(), "Researcher posts enabled");
    Ok(Some(social::Settings {
        accounts,
        per_account_limit: POSTS_PER_ACCOUNT,
        window_days: i64::from(days_back),
        account_pause: Duration::from_millis(1500),
        base_url: social::DEFAULT_SYNDICATION_BASE.to_string(),
        backoff: social::Settings::default_backoff(),
    }))
}

impl Config {
    /// Validate `cli` into a run configuration.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let webhooks = validate_webhooks(&cli.webhooks)?;
        if webhooks.is_empty() && !cli.dry_run {
            return Err(ConfigError::NoWebhook);
        }

        let days_back = positive(cli.days_back, "days_back")?;
        let days_back = u32::try_from(days_back).map_err(|_| ConfigError::NotPositive { name: "days_back" })?;
        let max_papers = positive(cli.max_papers, "max_papers")?;
        let max_blogs = positive(cli.max_blogs, "max_blogs")?;
        let max_tweets = positive(cli.max_tweets, "max_tweets")?;

        let filter = category_filter(cli)?;
        let summarizer = summarizer_settings(cli)?;

        let papers = huggingface::Settings {
            base_url: cli.hf_base_url.clone(),
            days_back,
            use_trending: cli.use_trending,
            ..huggingface::Settings::default()
        };

        let blogs = blogs::Settings {
            sources: blogs::resolve(&split_list(&cli.blog_sources)),
            per_feed_limit: max_blogs,
            window_days: i64::from(days_back) * 2,
            fetch_full_text: summarizer.is_some(),
            concurrency: BLOG_CONCURRENCY,
            backoff: Backoff::default(),
        };

        let classic = cli.include_classic.then(|| classic::Settings {
            categories: split_list(&cli.classic_categories),
            daily: cli.classic_daily,
        });

        let social = social_settings(cli, days_back)?;

        Ok(Self {
            dry_run: cli.dry_run,
            fetch_timeout: FETCH_TIMEOUT,
            papers,
            max_papers,
            blogs,
            max_blogs,
            social,
            max_tweets,
            filter,
            classic,
            summarizer,
            push: pusher::Settings::new(webhooks),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["ai_paper_digest"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    const HOOK: &str = "https://open.feishu.cn/open-apis/bot/v2/hook/abc";

    #[test]
    fn test_missing_webhook_is_fatal_unless_dry_run() {
        let mut args = cli(&[]);
        args.webhooks.clear();
        assert!(matches!(Config::from_cli(&args), Err(ConfigError::NoWebhook)));

        args.dry_run = true;
        assert!(Config::from_cli(&args).is_ok());
    }

    #[test]
    fn test_webhooks_split_and_validated() {
        let mut args = cli(&[]);
        args.webhooks = vec![format!("{HOOK}, https://hook.example/b")];
        let config = Config::from_cli(&args).unwrap();
        assert_eq!(config.push.webhooks, vec![HOOK, "https://hook.example/b"]);

        args.webhooks = vec!["ftp://hook.example".to_string()];
        assert!(matches!(
            Config::from_cli(&args),
            Err(ConfigError::InvalidWebhook { .. })
        ));
    }

    #[test]
    fn test_non_positive_counts_rejected() {
        let mut args = cli(&["--webhook", HOOK]);
        args.max_papers = 0;
        assert!(matches!(
            Config::from_cli(&args),
            Err(ConfigError::NotPositive { name: "max_papers" })
        ));
        args.max_papers = 6;
        args.days_back = -2;
        assert!(matches!(
            Config::from_cli(&args),
            Err(ConfigError::NotPositive { name: "days_back" })
        ));
    }

    #[test]
    fn test_category_selection() {
        let mut args = cli(&["--webhook", HOOK]);
        args.categories = "alignment, agents".to_string();
        let config = Config::from_cli(&args).unwrap();
        assert_eq!(config.filter.active(), ["alignment", "agents"]);

        args.categories = "none".to_string();
        assert!(!Config::from_cli(&args).unwrap().filter.is_enabled());

        args.categories = "alignment".to_string();
        args.no_category_filter = true;
        assert!(!Config::from_cli(&args).unwrap().filter.is_enabled());

        args.no_category_filter = false;
        args.categories = "robotics".to_string();
        assert!(matches!(
            Config::from_cli(&args),
            Err(ConfigError::UnknownCategory(name)) if name == "robotics"
        ));
    }

    #[test]
    fn test_summaries_need_a_key() {
        let mut args = cli(&["--webhook", HOOK, "--ai-provider", "gemini"]);
        args.claude_api_key = None;
        args.gemini_api_key = None;
        args.openai_api_key = None;
        assert!(Config::from_cli(&args).unwrap().summarizer.is_none());

        args.openai_api_key = Some("sk-fallback".to_string());
        let settings = Config::from_cli(&args).unwrap().summarizer.unwrap();
        assert_eq!(settings.provider, Provider::Gemini);
        assert_eq!(settings.api_key, "sk-fallback");

        args.gemini_api_key = Some("g-key".to_string());
        args.ai_model = None;
        args.gemini_model = None;
        args.openai_model = None;
        let settings = Config::from_cli(&args).unwrap().summarizer.unwrap();
        assert_eq!(settings.api_key, "g-key");
        assert_eq!(settings.model, "gemini-2.0-flash-exp");

        args.ai_provider = "llama".to_string();
        assert!(matches!(
            Config::from_cli(&args),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_model_resolution_order() {
        let mut args = cli(&["--webhook", HOOK, "--ai-provider", "claude"]);
        args.enable_summary = true;
        args.claude_api_key = Some("c-key".to_string());
        args.ai_model = None;
        args.claude_model = None;
        args.openai_model = Some("gpt-4o-mini".to_string());
        let model = |args: &Cli| Config::from_cli(args).unwrap().summarizer.unwrap().model;
        assert_eq!(model(&args), "gpt-4o-mini");

        args.claude_model = Some("claude-3-5-haiku-latest".to_string());
        assert_eq!(model(&args), "claude-3-5-haiku-latest");

        args.ai_model = Some("claude-opus-4-1".to_string());
        assert_eq!(model(&args), "claude-opus-4-1");

        args.ai_model = None;
        args.claude_model = Some("  ".to_string());
        args.openai_model = None;
        assert_eq!(model(&args), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_derived_settings() {
        let mut args = cli(&["--webhook", HOOK, "--days-back", "5", "--max-blogs", "2"]);
        args.enable_summary = false;
        args.include_tweets = true;
        args.twitter_accounts = Some("@karpathy, ylecun".to_string());
        args.twitter_accounts_file = None;
        args.blog_sources = "openai,unknown_blog".to_string();

        let config = Config::from_cli(&args).unwrap();
        assert_eq!(config.papers.days_back, 5);
        assert_eq!(config.blogs.window_days, 10);
        assert_eq!(config.blogs.per_feed_limit, 2);
        assert_eq!(config.blogs.sources.len(), 1);
        assert!(!config.blogs.fetch_full_text);
        let social = config.social.unwrap();
        assert_eq!(social.accounts, vec!["karpathy", "ylecun"]);
        assert_eq!(social.window_days, 5);
    }

    #[test]
    fn test_unreadable_accounts_file_is_fatal() {
        let mut args = cli(&["--webhook", HOOK, "--include-tweets"]);
        args.twitter_accounts_file = Some("/nonexistent/accounts.txt".into());
        assert!(matches!(
            Config::from_cli(&args),
            Err(ConfigError::Read { .. })
        ));
    }
}
