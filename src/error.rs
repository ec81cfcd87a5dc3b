use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, ThumbnailError>;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("Server returned status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Page declares no charset: {0}")]
    MissingCharset(String),

    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("Failed to extract metadata: {0}")]
    ExtractError(String),

    #[error("Cache I/O error: {0}")]
    CacheIo(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    CacheSerde(#[from] serde_json::Error),

    #[error("Syntax tree traversal failed: {0}")]
    ScanError(String),
}

impl ThumbnailError {
    /// Whether this failure should mark the URL as permanently disabled.
    pub fn disables_url(&self) -> bool {
        matches!(
            self,
            ThumbnailError::UrlParseError(_)
                | ThumbnailError::FetchError(_)
                | ThumbnailError::HttpStatus { .. }
                | ThumbnailError::InvalidContentType(_)
                | ThumbnailError::MissingCharset(_)
                | ThumbnailError::UnsupportedCharset(_)
                | ThumbnailError::ExtractError(_)
        )
    }

    pub fn log(&self) {
        match self {
            ThumbnailError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            ThumbnailError::FetchError(e) => {
                warn!(error = %e, "Content fetch failed");
            }
            ThumbnailError::HttpStatus { status, url } => {
                warn!(status = %status, url = %url, "Unexpected HTTP status");
            }
            ThumbnailError::InvalidContentType(e) => {
                warn!(error = %e, "Invalid content type received");
            }
            ThumbnailError::MissingCharset(e) => {
                warn!(error = %e, "No charset declared by page");
            }
            ThumbnailError::UnsupportedCharset(e) => {
                warn!(error = %e, "Charset not supported by decoder");
            }
            ThumbnailError::ExtractError(e) => {
                warn!(error = %e, "Metadata extraction failed");
            }
            ThumbnailError::CacheIo(e) => {
                error!(error = %e, "Cache storage failed");
            }
            ThumbnailError::CacheSerde(e) => {
                error!(error = %e, "Cache value could not be (de)serialized");
            }
            ThumbnailError::ScanError(e) => {
                error!(error = %e, "Syntax tree traversal failed");
            }
        }
    }
}
