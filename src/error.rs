//! Error types for each stage of the digest pipeline.
//!
//! Only [`ConfigError`] is allowed to end a run. The other kinds are caught at
//! their component boundary and turned into an empty contribution, a
//! placeholder summary, or a failed entry in the push report.

use thiserror::Error;

/// Invalid or missing configuration. Fatal, raised before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no webhook configured: set FEISHU_WEBHOOK_URL or pass --webhook")]
    NoWebhook,

    #[error("invalid webhook URL {url:?}: {reason}")]
    InvalidWebhook { url: String, reason: String },

    #[error("{name} must be greater than zero")]
    NotPositive { name: &'static str },

    #[error("unknown category {0:?} (not present in the category taxonomy)")]
    UnknownCategory(String),

    #[error("unknown AI provider {0:?}; expected one of claude, gemini, openai")]
    UnknownProvider(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse category file {path}: {source}")]
    CategoryFile {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A source could not be fetched or parsed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed feed document: {0}")]
    Feed(String),
}

/// A completion call failed.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion response contained no text")]
    Empty,

    #[error("no API key configured for provider {0}")]
    MissingKey(&'static str),
}

/// A webhook delivery failed.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("webhook rejected payload (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SummaryError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SummaryError::Http(e) => !e.is_builder(),
            SummaryError::Status { status, .. } => *status == 429 || *status >= 500,
            SummaryError::Empty => true,
            SummaryError::MissingKey(_) => false,
        }
    }
}

impl PushError {
    /// Transport failures and server-side errors are retried, rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            PushError::Http(e) => !e.is_builder(),
            PushError::Status { status, .. } => *status == 429 || *status >= 500,
            PushError::Rejected { .. } | PushError::Encode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        assert!(ConfigError::NoWebhook.to_string().contains("FEISHU_WEBHOOK_URL"));
        assert_eq!(
            ConfigError::NotPositive { name: "max_papers" }.to_string(),
            "max_papers must be greater than zero"
        );
        assert!(
            ConfigError::UnknownCategory("robotics".into())
                .to_string()
                .contains("\"robotics\"")
        );
    }

    #[test]
    fn test_push_error_retryable() {
        let server = PushError::Status { status: 503, body: String::new() };
        let client = PushError::Status { status: 400, body: String::new() };
        let rejected = PushError::Rejected { code: 19001, message: "bad".into() };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_summary_error_retryable() {
        assert!(SummaryError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(SummaryError::Empty.is_retryable());
        assert!(!SummaryError::MissingKey("claude").is_retryable());
    }
}
