//! Deduplication and the recency ranker/capper.

use crate::models::CandidateItem;
use itertools::Itertools;
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || matches!(key, "fbclid" | "gclid" | "mc_cid" | "mc_eid" | "ref_src")
}

/// Dedupe key for a URL: lowercased host and path without a trailing slash,
/// plus the query minus tracking parameters. The fragment is dropped.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_url("https://www.Blog.example/?p=101&utm_source=x#top"), "blog.example?p=101");
/// ```
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default().trim_start_matches("www.");
            let query = parsed
                .query_pairs()
                .filter(|(k, _)| !is_tracking_param(k))
                .map(|(k, v)| if v.is_empty() { k.into_owned() } else { format!("{k}={v}") })
                .join("&");
            let mut key = format!("{}{}", host.to_lowercase(), parsed.path().trim_end_matches('/'));
            if !query.is_empty() {
                key.push('?');
                key.push_str(&query);
            }
            key
        }
        Err(_) => raw.trim().trim_end_matches('/').to_lowercase(),
    }
}

/// Lowercased alphanumerics only, so punctuation and spacing differences collapse.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Drop later duplicates by URL, then by title. First occurrence wins.
pub fn dedupe(items: Vec<CandidateItem>) -> Vec<CandidateItem> {
    let before = items.len();
    let mut seen_titles = HashSet::new();
    let unique: Vec<CandidateItem> = items
        .into_iter()
        .unique_by(|item| normalize_url(&item.url))
        .filter(|item| {
            let key = normalize_title(&item.title);
            key.is_empty() || seen_titles.insert(key)
        })
        .collect();
    if unique.len() != before {
        debug!(removed = before - unique.len(), "Removed duplicate items");
    }
    unique
}

/// Newest first, at most `max` items.
///
/// The sort is stable, so items with equal timestamps keep fetch order, and
/// undated items follow every dated one.
pub fn rank_and_cap(mut items: Vec<CandidateItem>, max: usize) -> Vec<CandidateItem> {
    items.sort_by_key(|item| Reverse(item.published_at));
    items.truncate(max);
    items
}

/// Dedupe, rank, and cap in one step.
///
/// # Arguments
///
/// * `items` - Candidates of one source type, in fetch order
/// * `max` - Upper bound on the returned length
///
/// # Returns
///
/// At most `max` unique items, newest first, undated items last.
///
/// # Examples
///
/// ```ignore
/// let picked = select(papers, 6);
/// assert!(picked.len() <= 6);
/// ```
pub fn select(items: Vec<CandidateItem>, max: usize) -> Vec<CandidateItem> {
    rank_and_cap(dedupe(items), max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{blog, paper};

    #[test]
    fn test_keeps_six_most_recent_of_ten() {
        let items: Vec<_> = (1..=10).map(|d| paper(&format!("Paper {d}"), d)).collect();
        let out = rank_and_cap(items, 6);
        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Paper 10", "Paper 9", "Paper 8", "Paper 7", "Paper 6", "Paper 5"]
        );
    }

    #[test]
    fn test_output_never_exceeds_cap_and_is_descending() {
        let days = [4, 17, 2, 9, 9, 23, 1];
        let items: Vec<_> = days
            .iter()
            .enumerate()
            .map(|(i, d)| paper(&format!("P{i}"), *d))
            .collect();
        for cap in 0..10 {
            let out = rank_and_cap(items.clone(), cap);
            assert!(out.len() <= cap);
            for pair in out.windows(2) {
                assert!(pair[0].published_at >= pair[1].published_at);
            }
        }
    }

    #[test]
    fn test_ties_keep_fetch_order() {
        let items = vec![paper("First", 5), paper("Second", 5), paper("Third", 5)];
        let out = rank_and_cap(items, 3);
        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_undated_items_rank_last() {
        let items = vec![blog("Undated", ""), paper("Dated", 2)];
        let out = rank_and_cap(items, 5);
        assert_eq!(out[0].title, "Dated");
        assert_eq!(out[1].title, "Undated");
    }

    #[test]
    fn test_short_input_returned_whole() {
        let out = rank_and_cap(vec![paper("Only", 1)], 6);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_dedupe_by_url_and_title() {
        let mut a = paper("Attention Is All You Need", 1);
        a.url = "https://www.arxiv.org/abs/1706.03762/".to_string();
        let mut b = paper("A different title", 2);
        b.url = "https://arxiv.org/abs/1706.03762?utm_source=feed#abstract".to_string();
        let c = paper("attention is all you need!", 3);
        let d = paper("Something else", 4);
        let out = dedupe(vec![a, b, c, d]);
        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Attention Is All You Need", "Something else"]);
    }

    #[test]
    fn test_query_identified_posts_stay_distinct() {
        let mut first = blog("Weekly notes", "one");
        first.url = "https://blog.example/?p=101".to_string();
        let mut second = blog("Weekly notes, part two", "two");
        second.url = "https://blog.example/?p=202&utm_medium=rss".to_string();
        assert_eq!(dedupe(vec![first, second]).len(), 2);
    }

    #[test]
    fn test_normalize_helpers() {
        assert_eq!(
            normalize_url("https://WWW.Example.com/a/b/?q=1&utm_campaign=x#frag"),
            "example.com/a/b?q=1"
        );
        assert_eq!(normalize_url("https://example.com/a/#frag"), "example.com/a");
        assert_eq!(normalize_title("Hello, World!"), "helloworld");
    }
}
