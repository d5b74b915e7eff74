use crate::models::{Digest, DigestEntry, ItemDetails, Summary};
use crate::sources::classic::related_categories;
use crate::utils::{format_datetime, truncate_chars};
use serde_json::{json, Value};
use tracing::{debug, instrument};

pub const CARD_TITLE: &str = "🤖 AI Research Daily";

/// Generated summaries longer than this are cut before rendering.
const SUMMARY_LIMIT: usize = 1500;
const TRUNCATION_MARKER: &str = "\n\n... (truncated)";
const ABSTRACT_PREVIEW: usize = 300;
const SOCIAL_PREVIEW: usize = 200;
const MAX_BLOGS_SHOWN: usize = 5;
const MAX_SOCIAL_SHOWN: usize = 10;
const MAX_KEYWORDS_SHOWN: usize = 5;
const MAX_TAGS_SHOWN: usize = 3;

fn markdown(content: impl Into<String>) -> Value {
    json!({
        "tag": "div",
        "text": {"tag": "lark_md", "content": content.into()}
    })
}

fn hr() -> Value {
    json!({"tag": "hr"})
}

fn button(label: &str, url: &str, kind: &str) -> Value {
    json!({
        "tag": "button",
        "text": {"tag": "plain_text", "content": label},
        "type": kind,
        "url": url
    })
}

fn actions(buttons: Vec<Value>) -> Value {
    json!({"tag": "action", "actions": buttons})
}

/// `1234567` -> `1,234,567`
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn escape_markdown(text: &str) -> String {
    text.replace('*', "\\*").replace('_', "\\_")
}

/// Counts reflect what the card shows, not what selection kept.
fn stats_line(digest: &Digest) -> String {
    let mut counts = format!(
        "📊 Papers: {} | Blogs: {}",
        digest.papers.len(),
        digest.blogs.len().min(MAX_BLOGS_SHOWN)
    );
    if !digest.social.is_empty() {
        counts.push_str(&format!(" | Posts: {}", digest.social.len().min(MAX_SOCIAL_SHOWN)));
    }
    format!(
        "**{counts}**\n**⏰ {}**",
        format_datetime(&digest.generated_at)
    )
}

fn summary_block(summary: &Summary) -> Option<String> {
    let text = truncate_chars(summary.text()?, SUMMARY_LIMIT, TRUNCATION_MARKER);
    match summary {
        Summary::Generated { label, .. } => Some(format!("🤖 **{label} digest**\n\n{text}")),
        _ => Some(format!("💡 {text}")),
    }
}

fn classic_section(elements: &mut Vec<Value>, entry: &DigestEntry) {
    let item = &entry.item;
    let ItemDetails::Classic {
        authors,
        year,
        category,
        description,
        keywords,
    } = &item.details
    else {
        return;
    };

    elements.push(markdown("**📖 Classic paper of the day**"));

    let mut content = format!("**{}** ({year})\n\n", item.title);
    content.push_str(&format!("👥 **Authors**: {authors}\n\n"));
    content.push_str(&format!("📝 **About**: {description}\n\n"));
    if !keywords.is_empty() {
        let shown: Vec<&str> = keywords
            .iter()
            .take(MAX_KEYWORDS_SHOWN)
            .map(String::as_str)
            .collect();
        content.push_str(&format!("🔑 **Key concepts**: {}", shown.join(", ")));
        if keywords.len() > MAX_KEYWORDS_SHOWN {
            content.push_str(&format!(" and {} keywords in total", keywords.len()));
        }
        content.push_str("\n\n");
    }
    let related = related_categories(category);
    if !related.is_empty() {
        content.push_str(&format!("🔗 **Related fields**: {}", related.join(", ")));
    }
    elements.push(markdown(content.trim_end()));
    elements.push(actions(vec![button("Read paper", &item.url, "default")]));
}

fn paper_section(elements: &mut Vec<Value>, papers: &[DigestEntry]) {
    elements.push(markdown("**📚 Hugging Face papers**"));

    for (i, entry) in papers.iter().enumerate() {
        let item = &entry.item;
        let mut title = format!("**{}. {}**", i + 1, item.title);
        if !item.matched_categories.is_empty() {
            let tags: Vec<String> = item
                .matched_categories
                .iter()
                .take(MAX_TAGS_SHOWN)
                .map(|c| format!("`{c}`"))
                .collect();
            title.push_str(&format!("\n🏷️ {}", tags.join(" ")));
        }
        elements.push(markdown(title));

        let (authors, pdf_url, project_page) = match &item.details {
            ItemDetails::Paper {
                authors,
                pdf_url,
                project_page,
                ..
            } => (authors.join(", "), pdf_url.as_deref(), project_page.as_deref()),
            _ => (String::new(), None, None),
        };

        let mut meta = Vec::new();
        if !authors.is_empty() {
            meta.push(format!("👥 {authors}"));
        }
        if let Some(published) = &item.published_at {
            meta.push(format!("📅 {}", format_datetime(published)));
        }
        if !meta.is_empty() {
            elements.push(markdown(meta.join(" | ")));
        }

        if let Some(block) = summary_block(&entry.summary) {
            elements.push(markdown(block));
        } else if let Some(abstract_) = item.body_text.as_deref().filter(|b| !b.is_empty()) {
            elements.push(markdown(format!(
                "📝 {}",
                truncate_chars(abstract_, ABSTRACT_PREVIEW, "...")
            )));
        }

        let mut buttons = vec![button("Read paper", &item.url, "default")];
        if let Some(pdf) = pdf_url {
            buttons.push(button("Download PDF", pdf, "primary"));
        }
        if let Some(project) = project_page {
            buttons.push(button("Project page", project, "default"));
        }
        elements.push(actions(buttons));

        if i + 1 < papers.len() {
            elements.push(hr());
        }
    }
}

fn blog_section(elements: &mut Vec<Value>, blogs: &[DigestEntry]) {
    elements.push(markdown("**📰 Lab blogs**"));

    let shown = &blogs[..blogs.len().min(MAX_BLOGS_SHOWN)];
    for (i, entry) in shown.iter().enumerate() {
        let item = &entry.item;
        let date = item
            .published_at
            .as_ref()
            .map(format_datetime)
            .unwrap_or_else(|| "date unknown".to_string());
        elements.push(markdown(format!(
            "**• {}**\n🏢 {} | 📅 {date}",
            item.title, item.source_name
        )));
        if let Some(block) = summary_block(&entry.summary) {
            elements.push(markdown(block));
        }
        elements.push(actions(vec![button("Read post", &item.url, "default")]));

        if i + 1 < shown.len() {
            elements.push(hr());
        }
    }
}

fn social_section(elements: &mut Vec<Value>, posts: &[DigestEntry]) {
    elements.push(markdown("**🐦 Researcher posts**"));

    let shown = &posts[..posts.len().min(MAX_SOCIAL_SHOWN)];
    for (i, entry) in shown.iter().enumerate() {
        let item = &entry.item;
        let (username, likes, retweets) = match &item.details {
            ItemDetails::Social {
                username,
                likes,
                retweets,
            } => (username.as_str(), *likes, *retweets),
            _ => (item.source_name.trim_start_matches('@'), 0, 0),
        };
        let text = item.body_text.as_deref().unwrap_or(&item.title);
        let text = escape_markdown(&truncate_chars(text, SOCIAL_PREVIEW, "..."));

        let mut stats = format!("❤️ {}  🔄 {}", thousands(likes), thousands(retweets));
        if let Some(published) = &item.published_at {
            stats.push_str(&format!("  📅 {}", published.format("%Y-%m-%d")));
        }
        elements.push(markdown(format!(
            "**{}. @{}**\n{text}\n{stats}",
            i + 1,
            escape_markdown(username)
        )));
        elements.push(actions(vec![button("View post", &item.url, "default")]));

        if i + 1 < shown.len() {
            elements.push(hr());
        }
    }
}

/// Render the digest as an interactive card message.
///
/// The payload is complete before any delivery starts, so every endpoint
/// receives identical bytes.
#[instrument(level = "info", skip_all)]
pub fn render_card(digest: &Digest) -> Value {
    let mut elements = vec![markdown(stats_line(digest)), hr()];

    if let Some(trend) = &digest.trend_summary {
        elements.push(markdown(format!("**📈 Research trends today**\n\n{trend}")));
        elements.push(hr());
    }

    if let Some(classic) = digest.classic.first() {
        classic_section(&mut elements, classic);
        elements.push(hr());
    }

    if !digest.papers.is_empty() {
        paper_section(&mut elements, &digest.papers);
    }

    if !digest.blogs.is_empty() {
        elements.push(hr());
        blog_section(&mut elements, &digest.blogs);
    }

    if !digest.social.is_empty() {
        elements.push(hr());
        social_section(&mut elements, &digest.social);
    }

    debug!(elements = elements.len(), "Card rendered");
    json!({
        "msg_type": "interactive",
        "card": {
            "config": {"wide_screen_mode": true},
            "header": {
                "title": {"tag": "plain_text", "content": CARD_TITLE},
                "template": "blue"
            },
            "elements": elements
        }
    })
}
