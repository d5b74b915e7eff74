//! Digest assembly.
//!
//! Entries arrive already filtered, ranked and summarized; this module only
//! sorts them into sections. An empty digest is valid here; deciding whether
//! it is worth pushing is left to the caller.

use crate::models::{Digest, DigestEntry, SourceType};
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

/// Sort ranked entries into the digest's sections, keeping their relative order.
///
/// # Arguments
///
/// * `entries` - Every entry of the run, in rank order, any source type
/// * `trend_summary` - The LLM trend paragraph, if one was produced
/// * `generated_at` - Timestamp printed on the card
///
/// # Returns
///
/// A [`Digest`] with one section per source type. A blank trend paragraph is
/// dropped.
#[instrument(level = "info", skip_all, fields(count = entries.len()))]
pub fn assemble(
    entries: Vec<DigestEntry>,
    trend_summary: Option<String>,
    generated_at: DateTime<Utc>,
) -> Digest {
    let mut digest = Digest {
        generated_at,
        papers: Vec::new(),
        blogs: Vec::new(),
        social: Vec::new(),
        classic: Vec::new(),
        trend_summary: trend_summary.filter(|t| !t.trim().is_empty()),
    };

    for entry in entries {
        match entry.item.source_type {
            SourceType::Paper => digest.papers.push(entry),
            SourceType::Blog => digest.blogs.push(entry),
            SourceType::Social => digest.social.push(entry),
            SourceType::Classic => digest.classic.push(entry),
        }
    }

    info!(
        papers = digest.papers.len(),
        blogs = digest.blogs.len(),
        social = digest.social.len(),
        classic = digest.classic.len(),
        has_trend = digest.trend_summary.is_some(),
        "Digest assembled"
    );
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{blog, paper};

    #[test]
    fn test_assemble_splits_by_source_and_keeps_order() {
        let entries = vec![
            DigestEntry::unsummarized(paper("Newest", 9)),
            DigestEntry::unsummarized(blog("Post", "body")),
            DigestEntry::unsummarized(paper("Older", 2)),
        ];
        let digest = assemble(entries, Some("Trends".to_string()), Utc::now());

        let papers: Vec<_> = digest.papers.iter().map(|e| e.item.title.as_str()).collect();
        assert_eq!(papers, vec!["Newest", "Older"]);
        assert_eq!(digest.blogs.len(), 1);
        assert!(digest.social.is_empty());
        assert_eq!(digest.trend_summary.as_deref(), Some("Trends"));
    }

    #[test]
    fn test_assemble_empty_is_valid() {
        let digest = assemble(Vec::new(), Some("  ".to_string()), Utc::now());
        assert!(digest.is_empty());
        assert_eq!(digest.trend_summary, None);
    }
}
