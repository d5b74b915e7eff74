//! Hugging Face daily papers.
//!
//! Papers come from the JSON endpoint `GET {base}/api/daily_papers`, queried
//! once per calendar day of the lookback window (today first) or once without a
//! date in trending mode. Each element of the response is either `{ "paper": {…} }`
//! or the paper object itself.

use super::{get_text, Backoff};
use crate::error::FetchError;
use crate::models::{CandidateItem, ItemDetails, SourceType};
use crate::utils::{collapse_whitespace, parse_timestamp};
use chrono::{Days, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://huggingface.co";
const DAILY_PAPERS_PATH: &str = "/api/daily_papers";
const SOURCE_NAME: &str = "Hugging Face";
const MAX_AUTHORS: usize = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub days_back: u32,
    /// `limit` sent with every request.
    pub per_day_limit: usize,
    pub use_trending: bool,
    /// Pause between consecutive per-day requests.
    pub day_pause: Duration,
    pub backoff: Backoff,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            days_back: 7,
            per_day_limit: 50,
            use_trending: false,
            day_pause: Duration::from_millis(500),
            backoff: Backoff::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DailyItem {
    Wrapped { paper: HfPaper },
    Bare(HfPaper),
}

impl DailyItem {
    fn into_paper(self) -> HfPaper {
        match self {
            DailyItem::Wrapped { paper } | DailyItem::Bare(paper) => paper,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HfPaper {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    summary: Option<String>,
    published_at: Option<String>,
    authors: Option<Vec<HfAuthor>>,
    #[serde(rename = "ai_summary")]
    ai_summary: Option<String>,
    project_page: Option<String>,
    github_repo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HfAuthor {
    name: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl HfPaper {
    fn into_candidate(self, base_url: &str) -> Option<CandidateItem> {
        let id = self.id.trim().to_string();
        let title = collapse_whitespace(&self.title);
        if id.is_empty() || title.is_empty() {
            return None;
        }

        let authors = self
            .authors
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| non_empty(a.name))
            .take(MAX_AUTHORS)
            .collect();

        Some(CandidateItem {
            source_type: SourceType::Paper,
            source_name: SOURCE_NAME.to_string(),
            url: format!("{}/papers/{}", base_url.trim_end_matches('/'), id),
            published_at: self.published_at.as_deref().and_then(parse_timestamp),
            body_text: non_empty(self.summary).map(|s| collapse_whitespace(&s)),
            matched_categories: Vec::new(),
            details: ItemDetails::Paper {
                authors,
                pdf_url: Some(format!("https://arxiv.org/pdf/{id}.pdf")),
                project_page: non_empty(self.project_page),
                github_repo: non_empty(self.github_repo),
                source_summary: non_empty(self.ai_summary),
            },
            title,
        })
    }
}

/// Parse one `daily_papers` response. Elements that do not look like papers are skipped.
pub fn parse_daily_papers(body: &str, base_url: &str) -> Result<Vec<CandidateItem>, FetchError> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(body)?;
    let total = raw.len();
    let papers: Vec<CandidateItem> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<DailyItem>(value) {
            Ok(item) => item.into_paper().into_candidate(base_url),
            Err(e) => {
                debug!(error = %e, "Skipping malformed daily paper");
                None
            }
        })
        .collect();
    if papers.len() < total {
        debug!(skipped = total - papers.len(), "Dropped incomplete paper entries");
    }
    Ok(papers)
}

async fn fetch_page(
    client: &Client,
    settings: &Settings,
    query: &[(&str, String)],
) -> Result<Vec<CandidateItem>, FetchError> {
    let url = format!(
        "{}{}",
        settings.base_url.trim_end_matches('/'),
        DAILY_PAPERS_PATH
    );
    let body = get_text(client, &url, query, settings.backoff).await?;
    parse_daily_papers(&body, &settings.base_url)
}

/// Fetch papers for the lookback window ending at `today`, deduplicated by paper id.
///
/// A failed day is logged and skipped; the remaining days still contribute.
#[instrument(level = "info", skip_all, fields(days = settings.days_back, trending = settings.use_trending))]
pub async fn fetch_papers(client: &Client, settings: &Settings, today: NaiveDate) -> Vec<CandidateItem> {
    let limit = settings.per_day_limit.to_string();

    if settings.use_trending {
        return match fetch_page(client, settings, &[("limit", limit)]).await {
            Ok(papers) => {
                info!(count = papers.len(), "Fetched trending papers");
                papers
            }
            Err(e) => {
                error!(error = %e, "Trending papers fetch failed");
                Vec::new()
            }
        };
    }

    let mut seen = HashSet::new();
    let mut papers = Vec::new();
    for offset in 0..settings.days_back {
        if offset > 0 {
            sleep(settings.day_pause).await;
        }
        let Some(date) = today.checked_sub_days(Days::new(u64::from(offset))) else {
            break;
        };
        let date = date.format("%Y-%m-%d").to_string();
        let query = [("date", date.clone()), ("limit", limit.clone())];

        match fetch_page(client, settings, &query).await {
            Ok(page) => {
                let before = papers.len();
                papers.extend(page.into_iter().filter(|p| seen.insert(p.url.clone())));
                debug!(%date, added = papers.len() - before, "Fetched daily papers");
            }
            Err(e) => warn!(%date, error = %e, "Daily papers fetch failed; skipping day"),
        }
    }

    info!(count = papers.len(), "Fetched Hugging Face papers");
    papers
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE: &str = r#"[
        {
            "paper": {
                "id": "2505.01234",
                "title": "Reward Hacking in\n  Reasoning Models",
                "summary": "We study reward hacking.",
                "publishedAt": "2025-05-06T14:30:00.000Z",
                "authors": [
                    {"name": "A"}, {"name": "B"}, {"name": "C"},
                    {"name": "D"}, {"name": "E"}, {"name": "F"}, {"_id": "no-name"}
                ],
                "ai_summary": "Models exploit verifiers.",
                "githubRepo": "https://github.com/example/repo"
            },
            "numComments": 3
        },
        {
            "id": "2505.04321",
            "title": "Bare Paper Object",
            "summary": "",
            "publishedAt": "2025-05-05"
        },
        {"paper": {"id": "", "title": "Missing id"}},
        {"paper": {"id": "2505.00001", "title": 42}},
        "not an object"
    ]"#;

    fn settings(base_url: String, days_back: u32) -> Settings {
        Settings {
            base_url,
            days_back,
            per_day_limit: 50,
            use_trending: false,
            day_pause: Duration::ZERO,
            backoff: Backoff {
                attempts: 1,
                delay: Duration::ZERO,
            },
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn paper_json(id: &str, title: &str) -> serde_json::Value {
        serde_json::json!({"paper": {"id": id, "title": title, "summary": "abstract"}})
    }

    #[test]
    fn test_parse_wrapped_and_bare_items() {
        let papers = parse_daily_papers(SAMPLE, "https://huggingface.co").unwrap();
        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.title, "Reward Hacking in Reasoning Models");
        assert_eq!(first.url, "https://huggingface.co/papers/2505.01234");
        assert!(first.published_at.is_some());
        match &first.details {
            ItemDetails::Paper {
                authors,
                pdf_url,
                github_repo,
                source_summary,
                project_page,
            } => {
                assert_eq!(authors, &["A", "B", "C", "D", "E"]);
                assert_eq!(pdf_url.as_deref(), Some("https://arxiv.org/pdf/2505.01234.pdf"));
                assert_eq!(github_repo.as_deref(), Some("https://github.com/example/repo"));
                assert_eq!(source_summary.as_deref(), Some("Models exploit verifiers."));
                assert_eq!(project_page, &None);
            }
            other => panic!("unexpected details {other:?}"),
        }

        assert_eq!(papers[1].title, "Bare Paper Object");
        assert_eq!(papers[1].body_text, None);
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_daily_papers("{\"error\": \"nope\"}", DEFAULT_BASE_URL).is_err());
    }

    #[tokio::test]
    async fn test_fetch_papers_walks_days_and_dedupes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/daily_papers"))
            .and(query_param("date", "2025-05-06"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                paper_json("1", "First"),
                paper_json("2", "Second"),
            ])))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/daily_papers"))
            .and(query_param("date", "2025-05-05"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                paper_json("2", "Second"),
                paper_json("3", "Third"),
            ])))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/daily_papers"))
            .and(query_param("date", "2025-05-04"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        let client = super::super::build_client(Duration::from_secs(5)).unwrap();
        let papers = fetch_papers(&client, &settings(server.uri(), 3), day(2025, 5, 6)).await;
        let titles: Vec<_> = papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn test_trending_sends_no_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/daily_papers"))
            .and(query_param("limit", "50"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([paper_json("9", "Hot")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut s = settings(server.uri(), 7);
        s.use_trending = true;
        let client = super::super::build_client(Duration::from_secs(5)).unwrap();
        let papers = fetch_papers(&client, &s, day(2025, 5, 6)).await;
        assert_eq!(papers.len(), 1);
        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| !r.url.query().unwrap_or("").contains("date=")));
    }

    #[tokio::test]
    async fn test_unreachable_source_yields_empty() {
        let client = super::super::build_client(Duration::from_secs(1)).unwrap();
        let papers = fetch_papers(
            &client,
            &settings("http://127.0.0.1:9".to_string(), 1),
            day(2025, 5, 6),
        )
        .await;
        assert!(papers.is_empty());
    }
}
