//! Text and date helpers used across sources, summaries and rendering.

use chrono::{DateTime, Local, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with the number of dropped
/// bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Keep at most `max` characters, appending `suffix` when anything was cut.
pub fn truncate_chars(s: &str, max: usize, suffix: &str) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}{}", &s[..cut], suffix),
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Visible text of an HTML fragment, whitespace collapsed.
pub fn html_to_text(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let text = html.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

static NOISE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script, style, nav, footer, header, aside, noscript").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// Readable text of a full page: chrome elements removed, short lines dropped.
///
/// Returns `None` when fewer than `min_chars` characters survive.
pub fn readable_page_text(page: &str, max_lines: usize, min_chars: usize) -> Option<String> {
    let document = Html::parse_document(page);
    let skip: Vec<_> = document.select(&NOISE).map(|el| el.id()).collect();

    let root = document.select(&BODY).next().unwrap_or(document.root_element());
    let mut lines = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if node.ancestors().any(|a| skip.contains(&a.id())) {
            continue;
        }
        for line in text.lines() {
            let line = collapse_whitespace(line);
            if line.chars().count() > 20 {
                lines.push(line);
            }
        }
        if lines.len() >= max_lines {
            break;
        }
    }
    lines.truncate(max_lines);

    let joined = lines.join("\n");
    (joined.chars().count() > min_chars).then_some(joined)
}

/// `YYYY-MM-DD HH:MM` in local time.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Parse the date formats seen across feeds and APIs into UTC.
///
/// Accepts RFC 3339, RFC 2822, naive `YYYY-MM-DDTHH:MM:SS`, and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

/// Split a list given as comma- and/or whitespace-separated values.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_chars_respects_utf8() {
        assert_eq!(truncate_chars("论文摘要很长", 2, "..."), "论文...");
        assert_eq!(truncate_chars("short", 10, "..."), "short");
    }

    #[test]
    fn test_html_to_text() {
        let text = html_to_text("<p>Hello <b>bold</b>\n\n world</p>");
        assert_eq!(text, "Hello bold world");
    }

    #[test]
    fn test_readable_page_text_drops_chrome_and_short_lines() {
        let page = format!(
            "<html><head><style>body {{ color: red }}</style></head><body>\
             <nav>Home About Careers Contact Us Blog Posts</nav>\
             <p>tiny</p><article><p>{}</p></article>\
             <script>var tracking = 'should never appear in output';</script>\
             <footer>Copyright notice that is long enough to pass</footer></body></html>",
            "This paragraph is the actual body of the article. ".repeat(6)
        );
        let text = readable_page_text(&page, 500, 200).unwrap();
        assert!(text.contains("actual body of the article"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("Careers"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("tiny"));
    }

    #[test]
    fn test_readable_page_text_requires_minimum_length() {
        let page = "<html><body><p>Only a single modest sentence here.</p></body></html>";
        assert!(readable_page_text(page, 500, 200).is_none());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc3339 = parse_timestamp("2025-05-06T14:30:00.000Z").unwrap();
        assert_eq!((rfc3339.day(), rfc3339.hour()), (6, 14));

        let rfc2822 = parse_timestamp("Tue, 06 May 2025 14:30:00 +0200").unwrap();
        assert_eq!(rfc2822.hour(), 12);

        let naive = parse_timestamp("2025-05-06T08:00:00").unwrap();
        assert_eq!(naive.hour(), 8);

        let date = parse_timestamp("2025-05-06").unwrap();
        assert_eq!((date.month(), date.day()), (5, 6));

        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("  ").is_none());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("https://a.example/hook, https://b.example/hook  https://c.example"),
            vec![
                "https://a.example/hook",
                "https://b.example/hook",
                "https://c.example"
            ]
        );
        assert!(split_list(" , ").is_empty());
    }
}
