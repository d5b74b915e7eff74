//! Minimal RSS 2.0 / RSS 1.0 / Atom reader built on the `quick-xml` event reader.
//!
//! Only direct children of an `<item>` or `<entry>` are read, matched by their
//! qualified name, so extension elements such as `<media:title>` or
//! `<atom:link>` never shadow the core fields. A repeated field keeps its first
//! non-empty value. Entries without a title or link are skipped, and a document
//! that breaks off midway still yields the entries completed before the break.

use crate::error::FetchError;
use crate::utils::{collapse_whitespace, html_to_text};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

/// One feed entry, format-independent.
///
/// `title` is plain text; `summary` is the raw (possibly HTML) body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
    Summary,
    Content,
}

fn field_for(qname: &[u8]) -> Option<Field> {
    match qname {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"pubDate" | b"published" | b"dc:date" => Some(Field::Published),
        b"updated" => Some(Field::Updated),
        b"description" | b"summary" => Some(Field::Summary),
        b"content" | b"content:encoded" => Some(Field::Content),
        _ => None,
    }
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Option<String> {
    start
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A field element currently being read.
struct OpenField {
    field: Field,
    depth: usize,
    html: bool,
    text: String,
}

/// An entry under construction.
#[derive(Debug, Default)]
struct Draft {
    title: Option<String>,
    link: Option<String>,
    alternate: Option<String>,
    other_link: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    content: Option<String>,
}

fn keep_first(slot: &mut Option<String>, value: String) {
    if slot.is_none() && !value.is_empty() {
        *slot = Some(value);
    }
}

impl Draft {
    /// Atom-style `<link href=".." rel=".."/>`.
    fn link_attributes(&mut self, start: &BytesStart<'_>) {
        let Some(href) = attribute(start, "href") else {
            return;
        };
        match attribute(start, "rel").as_deref() {
            None | Some("alternate") => keep_first(&mut self.alternate, href),
            Some(_) => keep_first(&mut self.other_link, href),
        }
    }

    fn close(&mut self, open: OpenField) {
        let raw = open.text.trim();
        match open.field {
            Field::Title if open.html => keep_first(&mut self.title, html_to_text(raw)),
            Field::Title => keep_first(&mut self.title, collapse_whitespace(raw)),
            Field::Link => keep_first(&mut self.link, raw.to_string()),
            Field::Published => keep_first(&mut self.published, raw.to_string()),
            Field::Updated => keep_first(&mut self.updated, raw.to_string()),
            Field::Summary => keep_first(&mut self.summary, raw.to_string()),
            Field::Content => keep_first(&mut self.content, raw.to_string()),
        }
    }

    fn finish(self) -> Option<FeedEntry> {
        Some(FeedEntry {
            title: self.title?,
            link: self.link.or(self.alternate).or(self.other_link)?,
            published: self.published.or(self.updated),
            summary: self.summary.or(self.content),
        })
    }
}

/// Keep what was parsed before a syntax error, or fail when nothing was.
fn cut_short(entries: Vec<FeedEntry>, reason: String) -> Result<Vec<FeedEntry>, FetchError> {
    if entries.is_empty() {
        return Err(FetchError::Feed(reason));
    }
    warn!(kept = entries.len(), reason = %reason, "Feed cut short; keeping complete entries");
    Ok(entries)
}

/// Parse an RSS or Atom document into entries, in document order.
///
/// # Arguments
///
/// * `xml` - The feed document as fetched.
///
/// # Returns
///
/// The entries that have both a title and a link. Fails with
/// [`FetchError::Feed`] when the root element is not `rss`, `rdf:RDF` or
/// `feed`, or when the document is malformed before any entry completes.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().allow_dangling_amp = true;

    let mut entries = Vec::new();
    let mut seen_root = false;
    let mut depth = 0usize;
    let mut entry_depth: Option<usize> = None;
    let mut draft = Draft::default();
    let mut open: Option<OpenField> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                let reason = format!("{e} at byte {}", reader.error_position());
                return cut_short(entries, reason);
            }
        };
        match event {
            Event::Start(start) => {
                depth += 1;
                if !seen_root {
                    if !matches!(start.local_name().as_ref(), b"rss" | b"RDF" | b"feed") {
                        return Err(FetchError::Feed("document is neither RSS nor Atom".to_string()));
                    }
                    seen_root = true;
                    continue;
                }
                if let Some(field) = open.as_mut() {
                    field.text.push(' ');
                    continue;
                }
                match entry_depth {
                    None if matches!(start.local_name().as_ref(), b"item" | b"entry") => {
                        entry_depth = Some(depth);
                        draft = Draft::default();
                    }
                    Some(at) if depth == at + 1 => {
                        if let Some(field) = field_for(start.name().as_ref()) {
                            if field == Field::Link {
                                draft.link_attributes(&start);
                            }
                            open = Some(OpenField {
                                field,
                                depth,
                                html: attribute(&start, "type").as_deref() == Some("html"),
                                text: String::new(),
                            });
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(start) => {
                if !seen_root {
                    return Err(FetchError::Feed("document is neither RSS nor Atom".to_string()));
                }
                if open.is_none()
                    && entry_depth == Some(depth)
                    && start.name().as_ref() == b"link"
                {
                    draft.link_attributes(&start);
                }
            }
            Event::Text(text) => {
                if let Some(field) = open.as_mut() {
                    match text.decode() {
                        Ok(value) => field.text.push_str(&value),
                        Err(e) => return cut_short(entries, e.to_string()),
                    }
                }
            }
            Event::CData(cdata) => {
                if let Some(field) = open.as_mut() {
                    match cdata.decode() {
                        Ok(value) => field.text.push_str(&value),
                        Err(e) => return cut_short(entries, e.to_string()),
                    }
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(field) = open.as_mut() {
                    if let Ok(Some(ch)) = reference.resolve_char_ref() {
                        field.text.push(ch);
                    } else if let Ok(name) = reference.decode() {
                        match resolve_predefined_entity(&name) {
                            Some(value) => field.text.push_str(value),
                            None => {
                                field.text.push('&');
                                field.text.push_str(&name);
                                field.text.push(';');
                            }
                        }
                    }
                }
            }
            Event::End(_) => {
                match open.take() {
                    Some(field) if field.depth == depth => draft.close(field),
                    Some(mut field) => {
                        field.text.push(' ');
                        open = Some(field);
                    }
                    None => {}
                }
                if entry_depth == Some(depth) {
                    entry_depth = None;
                    if let Some(entry) = std::mem::take(&mut draft).finish() {
                        entries.push(entry);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(FetchError::Feed("document is neither RSS nor Atom".to_string()));
    }
    if depth > 0 {
        return cut_short(entries, "unexpected end of document".to_string());
    }
    Ok(entries)
}
