use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
pub const MAX_CONCURRENT_REQUESTS: usize = 500;

/// Settings shared by the resolver, the decoration engine and the
/// post-processor.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Quiet period of the decoration debouncer.
    pub debounce: Duration,
    /// Sent on page and image requests after host tokens are stripped.
    pub user_agent: String,
    pub accept_language: String,
    pub timeout: Duration,
    pub max_concurrent_requests: usize,
    /// Directory holding the persistent cache files. `None` keeps both
    /// namespaces in memory.
    pub cache_dir: Option<PathBuf>,
    /// Front matter field consulted for the opt-out class.
    pub front_matter_field: String,
    pub opt_out_class: String,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US".to_string(),
            timeout: Duration::from_secs(10),
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            cache_dir: None,
            front_matter_field: "cssclasses".to_string(),
            opt_out_class: "noLinkThumbnail".to_string(),
        }
    }
}

impl ThumbnailConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.accept_language = accept_language.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent_requests(mut self, max_concurrent_requests: usize) -> Self {
        self.max_concurrent_requests = max_concurrent_requests.max(1);
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn with_front_matter_field(mut self, field: impl Into<String>) -> Self {
        self.front_matter_field = field.into();
        self
    }

    pub fn with_opt_out_class(mut self, class: impl Into<String>) -> Self {
        self.opt_out_class = class.into();
        self
    }
}
