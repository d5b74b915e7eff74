//! Data models shared by every pipeline stage.
//!
//! - [`CandidateItem`]: a raw paper, blog post, social post, or classic pick
//! - [`CategoryRule`]: a named keyword bucket used for topical filtering
//! - [`Summary`]: the outcome of summarizing one item
//! - [`DigestEntry`] and [`Digest`]: the assembled message for one push
//!
//! Nothing here outlives a single run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of source produced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Paper,
    Blog,
    Social,
    Classic,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceType::Paper => "paper",
            SourceType::Blog => "blog",
            SourceType::Social => "social",
            SourceType::Classic => "classic",
        };
        f.write_str(s)
    }
}

/// Source-specific metadata carried alongside the common fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemDetails {
    Paper {
        authors: Vec<String>,
        pdf_url: Option<String>,
        project_page: Option<String>,
        github_repo: Option<String>,
        /// Short summary published by the index itself, used when the LLM is unavailable.
        source_summary: Option<String>,
    },
    Blog {
        /// Readable page text, present only when full-content fetching ran.
        full_text: Option<String>,
    },
    Social {
        username: String,
        likes: u64,
        retweets: u64,
    },
    Classic {
        authors: String,
        year: String,
        category: String,
        description: String,
        keywords: Vec<String>,
    },
}

/// A paper, post, or reference item before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    pub source_type: SourceType,
    /// Human-readable origin, e.g. "Hugging Face" or "DeepMind".
    pub source_name: String,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub body_text: Option<String>,
    /// Category names this item matched, in taxonomy order.
    pub matched_categories: Vec<String>,
    pub details: ItemDetails,
}

impl CandidateItem {
    /// Title and body joined for keyword matching.
    pub fn searchable_text(&self) -> String {
        match &self.body_text {
            Some(body) => format!("{} {}", self.title, body),
            None => self.title.clone(),
        }
    }

    /// Best text to hand to the summarizer: full page text if fetched, otherwise the body.
    pub fn summary_source_text(&self) -> Option<&str> {
        if let ItemDetails::Blog { full_text: Some(text) } = &self.details {
            return Some(text.as_str());
        }
        self.body_text.as_deref()
    }
}

/// A named keyword bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Result of summarizing one item.
///
/// `Unavailable` is the placeholder used whenever the LLM call fails or the
/// item has too little text; it is a normal value, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Summary {
    Generated { text: String, label: String },
    SourceProvided { text: String },
    Unavailable { reason: String },
}

impl Summary {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Summary::Unavailable { reason: reason.into() }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Summary::Generated { text, .. } | Summary::SourceProvided { text } => Some(text),
            Summary::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Summary::Unavailable { .. })
    }
}

/// One item of the digest together with its summary.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestEntry {
    pub item: CandidateItem,
    pub summary: Summary,
}

impl DigestEntry {
    /// Entry for a run with summarization turned off.
    pub fn unsummarized(item: CandidateItem) -> Self {
        Self {
            item,
            summary: Summary::unavailable("summaries disabled"),
        }
    }
}

/// Everything pushed in one run.
#[derive(Debug, Clone)]
pub struct Digest {
    pub generated_at: DateTime<Utc>,
    pub papers: Vec<DigestEntry>,
    pub blogs: Vec<DigestEntry>,
    pub social: Vec<DigestEntry>,
    pub classic: Vec<DigestEntry>,
    pub trend_summary: Option<String>,
}

impl Digest {
    /// True when no paper, blog post or social post made it through selection.
    ///
    /// The classic pick and the trend paragraph alone are not worth a push.
    pub fn is_empty(&self) -> bool {
        self.papers.is_empty() && self.blogs.is_empty() && self.social.is_empty()
    }

    /// All entries in rendering order.
    pub fn entries(&self) -> impl Iterator<Item = &DigestEntry> {
        self.classic
            .iter()
            .chain(self.papers.iter())
            .chain(self.blogs.iter())
            .chain(self.social.iter())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn paper(title: &str, day: u32) -> CandidateItem {
        CandidateItem {
            source_type: SourceType::Paper,
            source_name: "Hugging Face".to_string(),
            title: title.to_string(),
            url: format!("https://huggingface.co/papers/{}", title.replace(' ', "-")),
            published_at: Some(Utc.with_ymd_and_hms(2025, 5, day, 12, 0, 0).unwrap()),
            body_text: Some(format!("Abstract of {title}")),
            matched_categories: vec![],
            details: ItemDetails::Paper {
                authors: vec!["Ada Lovelace".to_string()],
                pdf_url: None,
                project_page: None,
                github_repo: None,
                source_summary: None,
            },
        }
    }

    pub fn blog(title: &str, body: &str) -> CandidateItem {
        CandidateItem {
            source_type: SourceType::Blog,
            source_name: "DeepMind".to_string(),
            title: title.to_string(),
            url: format!("https://deepmind.google/blog/{}", title.replace(' ', "-")),
            published_at: None,
            body_text: Some(body.to_string()),
            matched_categories: vec![],
            details: ItemDetails::Blog { full_text: None },
        }
    }
}
