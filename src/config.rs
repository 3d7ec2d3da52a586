use crate::error::{ImportError, Result};
use crate::types::Credential;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the content API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Normalizes `raw` so it never ends in `/` and always ends in `/api`.
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ImportError::Config {
                reason: "API base URL is empty".to_string(),
            });
        }
        let base_url = if trimmed.ends_with("/api") {
            trimmed.to_string()
        } else {
            format!("{}/api", trimmed)
        };
        Url::parse(&base_url)?;

        Ok(Self {
            base_url,
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins an API path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Heuristic knobs for title detection.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Lines containing any of these substrings are treated as publisher boilerplate.
    pub deny_list: Vec<String>,
    pub max_title_chars: usize,
}

impl SegmenterConfig {
    pub fn with_extra_denied<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny_list
            .extend(extra.into_iter().map(Into::into).filter(|s| !s.is_empty()));
        self
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        let deny_list = [
            "www.",
            "http://",
            "https://",
            ".com",
            ".net",
            "txt下载",
            "小说下载",
            "本书来自",
            "更多精彩",
            "手打",
            "扫描",
            "typed by",
            "scanned from",
            "scanned by",
        ];

        Self {
            deny_list: deny_list.iter().map(|s| s.to_string()).collect(),
            max_title_chars: 50,
        }
    }
}

/// Everything one `import` action needs besides the document itself.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub book_id: i64,
    /// Book title the caller already has; a detected title is only proposed when this is empty.
    pub current_title: Option<String>,
    pub credential: Option<Credential>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_api_suffix() {
        let config = ApiConfig::new("http://example.org/").unwrap();
        assert_eq!(config.base_url(), "http://example.org/api");
        assert_eq!(
            config.endpoint("/contents/7/chapters"),
            "http://example.org/api/contents/7/chapters"
        );
    }

    #[test]
    fn test_base_url_keeps_existing_api_suffix() {
        let config = ApiConfig::new("https://example.org/api/").unwrap();
        assert_eq!(config.base_url(), "https://example.org/api");
        assert_eq!(
            config.endpoint("contents"),
            "https://example.org/api/contents"
        );
    }

    #[test]
    fn test_base_url_rejects_garbage() {
        assert!(ApiConfig::new("").is_err());
        assert!(ApiConfig::new("not a url").is_err());
    }

    #[test]
    fn test_blank_token_is_dropped() {
        let config = ApiConfig::new(DEFAULT_API_URL)
            .unwrap()
            .with_token(Some("  ".to_string()));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_deny_list_is_extendable() {
        let config = SegmenterConfig::default().with_extra_denied(["起点中文网", ""]);
        assert!(config.deny_list.iter().any(|s| s == "起点中文网"));
        assert!(!config.deny_list.iter().any(|s| s.is_empty()));
    }
}
