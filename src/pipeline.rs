//! One digest run: fetch, filter, rank, summarize, assemble, deliver.

use crate::config::Config;
use crate::digest;
use crate::models::{CandidateItem, Digest, DigestEntry};
use crate::outputs::card::render_card;
use crate::pusher::{self, PushReport};
use crate::ranking;
use crate::sources::{self, blogs, classic, huggingface, social};
use crate::summarizer::Summarizer;
use chrono::{DateTime, Local, Utc};
use reqwest::Client;
use std::error::Error;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Fetch every source concurrently and return `(papers, blogs, posts)`.
#[instrument(level = "info", skip_all)]
async fn fetch_all(
    config: &Config,
    client: &Client,
    now: DateTime<Utc>,
) -> (Vec<CandidateItem>, Vec<CandidateItem>, Vec<CandidateItem>) {
    let today = now.with_timezone(&Local).date_naive();
    let t0 = Instant::now();
    let (papers, blog_posts, posts) = tokio::join!(
        huggingface::fetch_papers(client, &config.papers, today),
        blogs::fetch_blogs(client, &config.blogs, now),
        async {
            match &config.social {
                Some(settings) => social::fetch_posts(client, settings, now).await,
                None => Vec::new(),
            }
        }
    );
    info!(
        papers = papers.len(),
        blogs = blog_posts.len(),
        posts = posts.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Sources fetched"
    );
    (papers, blog_posts, posts)
}

/// Filter one source's items and keep the `max` most recent.
fn narrow(config: &Config, items: Vec<CandidateItem>, max: usize, source: &str) -> Vec<CandidateItem> {
    let fetched = items.len();
    let passing = config.filter.apply(items);
    let passed = passing.len();
    let selected = ranking::select(passing, max);
    info!(source, fetched, passed, selected = selected.len(), "Candidates selected");
    selected
}

/// Build the digest for `now` without delivering it.
///
/// # Arguments
///
/// * `config` - The validated run configuration
/// * `client` - Shared HTTP client for every source
/// * `now` - Reference time for lookback windows and the card timestamp
///
/// # Returns
///
/// The assembled [`Digest`]. Source and summary failures degrade to fewer
/// entries or placeholder summaries; only a summarizer that cannot be built is
/// an error.
#[instrument(level = "info", skip_all)]
pub async fn build_digest(
    config: &Config,
    client: &Client,
    now: DateTime<Utc>,
) -> Result<Digest, Box<dyn Error>> {
    let (papers, blog_posts, posts) = fetch_all(config, client, now).await;

    let papers = narrow(config, papers, config.max_papers, "papers");
    let blog_posts = narrow(config, blog_posts, config.max_blogs, "blogs");
    let posts = narrow(config, posts, config.max_tweets, "social");

    let classic_pick = config.classic.as_ref().and_then(|settings| {
        let today = now.with_timezone(&Local).date_naive();
        classic::select_classic(settings, &config.filter, today, &mut rand::rng())
    });

    let mut entries: Vec<DigestEntry> = classic_pick.into_iter().map(DigestEntry::unsummarized).collect();
    let trend = match &config.summarizer {
        Some(settings) => {
            let summarizer = Summarizer::from_settings(settings)?;
            let trend = summarizer.trend_summary(&papers, &blog_posts).await;
            let to_summarize = papers.into_iter().chain(blog_posts).collect();
            entries.extend(summarizer.summarize_all(to_summarize).await);
            trend
        }
        None => {
            entries.extend(papers.into_iter().chain(blog_posts).map(DigestEntry::unsummarized));
            None
        }
    };
    entries.extend(posts.into_iter().map(DigestEntry::unsummarized));

    Ok(digest::assemble(entries, trend, now))
}

/// Run once: build the digest, render the card, then print or push it.
///
/// # Returns
///
/// The push report, or `None` for dry runs and for digests with no paper,
/// blog or social entry.
#[instrument(level = "info", skip_all, fields(dry_run = config.dry_run))]
pub async fn run(config: &Config) -> Result<Option<PushReport>, Box<dyn Error>> {
    let client = sources::build_client(config.fetch_timeout)?;
    let digest = build_digest(config, &client, Utc::now()).await?;

    if digest.is_empty() {
        warn!("No papers, posts or blog entries passed selection; nothing to push");
        return Ok(None);
    }

    let summarized = digest.entries().filter(|e| e.summary.is_available()).count();
    info!(entries = digest.entries().count(), summarized, "Rendering card");
    let payload = render_card(&digest);
    if config.dry_run {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        info!("Dry run; payload printed instead of pushed");
        return Ok(None);
    }

    let report = pusher::push(&config.push, &payload).await?;
    if !report.all_delivered() {
        warn!(
            failed = report.failed.len(),
            delivered = report.delivered.len(),
            "Digest not accepted by every endpoint"
        );
    }
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0"?>
        <rss version="2.0"><channel><title>Lab</title>
          <item><title>Alignment via debate</title><link>https://lab.example/debate</link>
                <description>New results on AI alignment.</description></item>
          <item><title>Faster kernels</title><link>https://lab.example/kernels</link>
                <description>GPU engineering notes.</description></item>
        </channel></rss>"#;

    fn papers_json() -> serde_json::Value {
        let papers: Vec<_> = (1..=10)
            .map(|d| {
                let summary = if d % 2 == 0 { "An alignment study." } else { "A vision model." };
                serde_json::json!({"paper": {
                    "id": format!("2505.{d:05}"),
                    "title": format!("Paper {d:02}"),
                    "summary": summary,
                    "publishedAt": format!("2025-05-{d:02}T08:00:00.000Z"),
                }})
            })
            .collect();
        serde_json::Value::Array(papers)
    }

    async fn sources_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/daily_papers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(papers_json()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0})))
            .mount(&server)
            .await;
        server
    }

    fn config(server: &MockServer, categories: &str) -> Config {
        let mut cli = Cli::parse_from(["ai_paper_digest"]);
        cli.webhooks = vec![format!("{}/hook", server.uri())];
        cli.hf_base_url = server.uri();
        cli.blog_sources = format!("{}/feed.xml", server.uri());
        cli.categories = categories.to_string();
        cli.no_category_filter = false;
        cli.categories_file = None;
        cli.days_back = 7;
        cli.max_papers = 6;
        cli.max_blogs = 3;
        cli.use_trending = false;
        cli.enable_summary = false;
        cli.include_classic = false;
        cli.include_tweets = false;
        cli.dry_run = false;
        let mut config = Config::from_cli(&cli).unwrap();
        config.papers.day_pause = Duration::ZERO;
        config
    }

    fn titles(entries: &[DigestEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.item.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_six_most_recent_papers_without_filter() {
        let server = sources_server().await;
        let config = config(&server, "none");
        let client = sources::build_client(Duration::from_secs(5)).unwrap();
        let digest = build_digest(&config, &client, Utc::now()).await.unwrap();

        assert_eq!(
            titles(&digest.papers),
            vec!["Paper 10", "Paper 09", "Paper 08", "Paper 07", "Paper 06", "Paper 05"]
        );
        assert_eq!(digest.blogs.len(), 2);
        assert!(digest.papers.iter().all(|e| e.item.matched_categories.is_empty()));
    }

    #[tokio::test]
    async fn test_category_filter_applies_to_every_source() {
        let server = sources_server().await;
        let config = config(&server, "alignment");
        let client = sources::build_client(Duration::from_secs(5)).unwrap();
        let digest = build_digest(&config, &client, Utc::now()).await.unwrap();

        assert_eq!(
            titles(&digest.papers),
            vec!["Paper 10", "Paper 08", "Paper 06", "Paper 04", "Paper 02"]
        );
        assert_eq!(titles(&digest.blogs), vec!["Alignment via debate"]);
        assert!(digest
            .entries()
            .all(|e| e.item.matched_categories.iter().any(|c| c == "alignment")));
    }

    #[tokio::test]
    async fn test_run_skips_push_when_only_classic_remains() {
        let server = sources_server().await;
        let mut config = config(&server, "ai4math");
        config.classic = Some(classic::Settings {
            categories: Vec::new(),
            daily: true,
        });
        assert!(run(&config).await.unwrap().is_none());

        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| r.url.path() != "/hook"));
    }

    #[tokio::test]
    async fn test_run_pushes_rendered_card() {
        let server = sources_server().await;
        let config = config(&server, "alignment");
        let report = run(&config).await.unwrap().unwrap();
        assert!(report.all_delivered());

        let requests = server.received_requests().await.unwrap();
        let pushed: Vec<_> = requests.iter().filter(|r| r.url.path() == "/hook").collect();
        assert_eq!(pushed.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&pushed[0].body).unwrap();
        assert_eq!(body["msg_type"], "interactive");
        assert!(body.to_string().contains("Paper 10"));
    }
}
