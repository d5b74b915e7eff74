//! Lab and personal research blogs.
//!
//! Feeds are looked up by key in a built-in registry; a raw `http(s)` URL is
//! accepted as an ad-hoc feed. Every configured feed is fetched with ordered
//! bounded concurrency, so the combined output keeps configuration order.

use super::feed::{parse_feed, FeedEntry};
use super::{get_text, Backoff};
use crate::models::{CandidateItem, ItemDetails, SourceType};
use crate::utils::{html_to_text, parse_timestamp, readable_page_text, truncate_chars};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// `(key, display name, feed URL)`.
const REGISTRY: &[(&str, &str, &str)] = &[
    ("karpathy", "Andrej Karpathy", "https://karpathy.github.io/feed.xml"),
    ("alignment_forum", "AI Alignment Forum", "https://www.alignmentforum.org/feed"),
    ("lesswrong", "LessWrong", "https://www.lesswrong.com/feed.xml"),
    ("distill", "Distill", "https://distill.pub/rss.xml"),
    ("jeremykun", "Math ∩ Programming (Jeremy Kun)", "https://jeremykun.com/feed/"),
    ("colah", "Christopher Olah", "https://colah.github.io/rss.xml"),
    ("weng", "Lil'Log (Lilian Weng)", "https://lilianweng.github.io/feed.xml"),
    ("mit_tech_review", "MIT Technology Review", "https://www.technologyreview.com/feed/"),
    ("openai", "OpenAI", "https://openai.com/blog/rss.xml"),
    ("anthropic", "Anthropic", "https://www.anthropic.com/rss"),
    ("deepmind", "Google DeepMind", "https://deepmind.google/discover/blog/feed/"),
    ("google_ai", "Google AI", "https://blog.google/technology/ai/rss/"),
    ("meta_ai", "Meta AI", "https://ai.meta.com/blog/rss/"),
    (
        "microsoft_research",
        "Microsoft Research",
        "https://www.microsoft.com/en-us/research/blog/rss/",
    ),
    ("salesforce_ai", "Salesforce AI Research", "https://engineering.salesforce.com/rss/"),
];

/// Character cap for feed-provided summaries.
const SUMMARY_CHARS: usize = 500;
/// Readable-text limits for full page extraction.
const PAGE_MAX_LINES: usize = 500;
const PAGE_MIN_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogSource {
    pub key: String,
    pub name: String,
    pub feed_url: String,
}

impl BlogSource {
    fn from_registry(key: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|(k, _, _)| *k == key)
            .map(|(key, name, feed_url)| Self {
                key: key.to_string(),
                name: name.to_string(),
                feed_url: feed_url.to_string(),
            })
    }

    fn from_url(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str()?.trim_start_matches("www.").to_string();
        Some(Self {
            key: raw.to_string(),
            name: host,
            feed_url: raw.to_string(),
        })
    }
}

/// Every registry key, in registry order.
pub fn known_keys() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(key, _, _)| *key)
}

/// Map configured keys (or feed URLs) to sources. Unknown keys are warned and skipped.
pub fn resolve(keys: &[String]) -> Vec<BlogSource> {
    keys.iter()
        .filter_map(|key| {
            let source = BlogSource::from_registry(key).or_else(|| BlogSource::from_url(key));
            if source.is_none() {
                warn!(key = %key, known = ?known_keys().collect::<Vec<_>>(), "Unknown blog source; skipping");
            }
            source
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: Vec<BlogSource>,
    /// Leading entries considered per feed.
    pub per_feed_limit: usize,
    /// Entries published before `now - window_days` are dropped.
    pub window_days: i64,
    /// Fetch each post's page; posts without readable text are dropped.
    pub fetch_full_text: bool,
    pub concurrency: usize,
    pub backoff: Backoff,
}

fn entry_to_candidate(
    entry: FeedEntry,
    source: &BlogSource,
    cutoff: DateTime<Utc>,
) -> Option<CandidateItem> {
    let published_at = entry.published.as_deref().and_then(parse_timestamp);
    if published_at.is_some_and(|ts| ts < cutoff) {
        debug!(title = %entry.title, "Post outside window; skipping");
        return None;
    }

    let summary = entry
        .summary
        .as_deref()
        .map(html_to_text)
        .map(|text| truncate_chars(&text, SUMMARY_CHARS, ""))
        .filter(|text| !text.is_empty());

    Some(CandidateItem {
        source_type: SourceType::Blog,
        source_name: source.name.clone(),
        title: entry.title,
        url: entry.link,
        published_at,
        body_text: summary,
        matched_categories: Vec::new(),
        details: ItemDetails::Blog { full_text: None },
    })
}

#[instrument(level = "info", skip_all, fields(source = %source.key))]
async fn fetch_feed(
    client: &Client,
    source: &BlogSource,
    settings: &Settings,
    cutoff: DateTime<Utc>,
) -> Vec<CandidateItem> {
    let body = match get_text(client, &source.feed_url, &[], settings.backoff).await {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, url = %source.feed_url, "Feed fetch failed");
            return Vec::new();
        }
    };
    let entries = match parse_feed(&body) {
        Ok(entries) => entries,
        Err(e) => {
            error!(error = %e, url = %source.feed_url, "Feed parse failed");
            return Vec::new();
        }
    };

    let posts: Vec<CandidateItem> = entries
        .into_iter()
        .take(settings.per_feed_limit)
        .filter_map(|entry| entry_to_candidate(entry, source, cutoff))
        .collect();
    info!(count = posts.len(), "Fetched blog posts");
    posts
}

#[instrument(level = "debug", skip_all, fields(url = %post.url))]
async fn attach_full_text(client: &Client, mut post: CandidateItem, backoff: Backoff) -> Option<CandidateItem> {
    let page = match get_text(client, &post.url, &[], backoff).await {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, "Full text fetch failed");
            return None;
        }
    };
    let text = readable_page_text(&page, PAGE_MAX_LINES, PAGE_MIN_CHARS)?;
    post.details = ItemDetails::Blog {
        full_text: Some(text),
    };
    Some(post)
}

/// Fetch every configured feed as of `now`.
///
/// Feeds are fetched with bounded concurrency. A feed that fails to download
/// or parse is logged and contributes nothing.
///
/// # Arguments
///
/// * `client` - Shared HTTP client
/// * `settings` - Feed list, per-feed limit, window and full-text mode
/// * `now` - End of the publish window
///
/// # Returns
///
/// Blog candidates in feed order. Posts older than the window are dropped;
/// undated posts are kept.
#[instrument(level = "info", skip_all, fields(feeds = settings.sources.len(), full_text = settings.fetch_full_text))]
pub async fn fetch_blogs(client: &Client, settings: &Settings, now: DateTime<Utc>) -> Vec<CandidateItem> {
    let cutoff = now - ChronoDuration::days(settings.window_days);
    let concurrency = settings.concurrency.max(1);

    let posts: Vec<CandidateItem> = stream::iter(settings.sources.iter())
        .map(|source| fetch_feed(client, source, settings, cutoff))
        .buffered(concurrency)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .flatten()
        .collect();

    if !settings.fetch_full_text {
        info!(count = posts.len(), "Fetched blog posts from all feeds");
        return posts;
    }

    let total = posts.len();
    let with_text: Vec<CandidateItem> = stream::iter(posts)
        .map(|post| attach_full_text(client, post, settings.backoff))
        .buffered(concurrency)
        .filter_map(std::future::ready)
        .collect()
        .await;
    if with_text.len() < total {
        info!(
            dropped = total - with_text.len(),
            "Dropped posts without readable full text"
        );
    }
    info!(count = with_text.len(), "Fetched blog posts from all feeds");
    with_text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn settings(sources: Vec<BlogSource>, fetch_full_text: bool) -> Settings {
        Settings {
            sources,
            per_feed_limit: 3,
            window_days: 14,
            fetch_full_text,
            concurrency: 4,
            backoff: Backoff {
                attempts: 1,
                delay: Duration::ZERO,
            },
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 0, 0, 0).unwrap()
    }

    fn feed(base: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Lab</title>
  <item><title>Fresh post on alignment</title><link>{base}/posts/fresh</link>
    <pubDate>Thu, 08 May 2025 09:00:00 +0000</pubDate>
    <description>&lt;p&gt;Reward models &lt;em&gt;matter&lt;/em&gt;.&lt;/p&gt;</description></item>
  <item><title>Stale post</title><link>{base}/posts/stale</link>
    <pubDate>Tue, 01 Apr 2025 09:00:00 +0000</pubDate></item>
  <item><title>Undated post</title><link>{base}/posts/undated</link></item>
  <item><title>Beyond the per-feed limit</title><link>{base}/posts/extra</link>
    <pubDate>Fri, 09 May 2025 09:00:00 +0000</pubDate></item>
</channel></rss>"#
        )
    }

    fn local_source(server: &MockServer) -> BlogSource {
        BlogSource {
            key: "lab".to_string(),
            name: "Lab".to_string(),
            feed_url: format!("{}/feed.xml", server.uri()),
        }
    }

    async fn serve_feed(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed(&server.uri())))
            .mount(server)
            .await;
    }

    #[test]
    fn test_rdf_dates_apply_the_window_and_titles_stay_literal() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                              xmlns:dc="http://purl.org/dc/elements/1.1/">
          <item><title>Why x&lt;y matters for RL</title><link>https://j.example/new</link>
                <dc:date>2025-05-06T10:00:00Z</dc:date></item>
          <item><title>Old note</title><link>https://j.example/old</link>
                <dc:date>2025-03-01T10:00:00Z</dc:date></item>
        </rdf:RDF>"#;
        let source = BlogSource {
            key: "journal".to_string(),
            name: "Journal".to_string(),
            feed_url: "https://j.example/rss".to_string(),
        };
        let cutoff = now() - ChronoDuration::days(14);
        let posts: Vec<_> = parse_feed(xml)
            .unwrap()
            .into_iter()
            .filter_map(|e| entry_to_candidate(e, &source, cutoff))
            .collect();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Why x<y matters for RL");
        assert!(posts[0].published_at.is_some());
    }

    #[test]
    fn test_resolve_known_unknown_and_url() {
        let sources = resolve(&keys(&["deepmind", "no_such_blog", "https://www.example.org/feed"]));
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "Google DeepMind");
        assert_eq!(sources[1].name, "example.org");
        assert_eq!(sources[1].feed_url, "https://www.example.org/feed");
    }

    #[test]
    fn test_default_keys_are_registered() {
        let defaults = [
            "google_ai",
            "deepmind",
            "openai",
            "lesswrong",
            "microsoft_research",
            "salesforce_ai",
            "mit_tech_review",
            "jeremykun",
            "colah",
            "distill",
        ];
        for key in defaults {
            assert!(known_keys().any(|k| k == key), "{key} missing from registry");
        }
    }

    #[tokio::test]
    async fn test_fetch_applies_limit_and_window() {
        let server = MockServer::start().await;
        serve_feed(&server).await;

        let client = super::super::build_client(Duration::from_secs(5)).unwrap();
        let posts = fetch_blogs(&client, &settings(vec![local_source(&server)], false), now()).await;
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Fresh post on alignment", "Undated post"]);
        assert_eq!(posts[0].body_text.as_deref(), Some("Reward models matter ."));
        assert_eq!(posts[0].source_name, "Lab");
        assert!(posts[1].published_at.is_none());
    }

    #[tokio::test]
    async fn test_full_text_mode_drops_posts_without_text() {
        let server = MockServer::start().await;
        serve_feed(&server).await;
        let article = format!(
            "<html><body><nav>menu</nav><article><p>{}</p></article></body></html>",
            "A long paragraph about reward models and their failure modes. ".repeat(8)
        );
        Mock::given(method("GET"))
            .and(path("/posts/fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_string(article))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts/undated"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>tiny</p>"))
            .mount(&server)
            .await;

        let client = super::super::build_client(Duration::from_secs(5)).unwrap();
        let posts = fetch_blogs(&client, &settings(vec![local_source(&server)], true), now()).await;
        assert_eq!(posts.len(), 1);
        let text = posts[0].summary_source_text().unwrap();
        assert!(text.contains("failure modes"));
    }

    #[tokio::test]
    async fn test_broken_feed_contributes_nothing() {
        let server = MockServer::start().await;
        serve_feed(&server).await;
        Mock::given(method("GET"))
            .and(path("/broken.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        let broken = BlogSource {
            key: "broken".to_string(),
            name: "Broken".to_string(),
            feed_url: format!("{}/broken.xml", server.uri()),
        };

        let client = super::super::build_client(Duration::from_secs(5)).unwrap();
        let posts = fetch_blogs(
            &client,
            &settings(vec![broken, local_source(&server)], false),
            now(),
        )
        .await;
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.source_name == "Lab"));
    }
}
