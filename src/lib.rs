mod cache;
mod config;
mod debounce;
mod decoration;
mod engine;
mod error;
mod extractor;
mod fetcher;
#[cfg(feature = "logging")]
mod logging;
mod markdown;
mod og_fetcher;
mod post_processor;
mod render;
mod resolver;
mod scanner;
mod service;
mod state;
mod utils;

pub use cache::{Cache, JsonFileStore, KvStore, MemoryStore, DISABLED_NAMESPACE, RESULTS_NAMESPACE};
pub use config::{ThumbnailConfig, DEFAULT_DEBOUNCE, DEFAULT_USER_AGENT, MAX_CONCURRENT_REQUESTS};
pub use debounce::Debouncer;
pub use decoration::{
    Change, ChangeSet, DecorationEntry, DecorationSet, Widget, WidgetCache, BLOCK_SIDE,
    INLINE_SIDE,
};
pub use engine::{
    front_matter_opts_out, CycleOutcome, DecorationEngine, EditorHost, Selection, ViewUpdate,
};
pub use error::{Result, ThumbnailError};
pub use extractor::{MetadataExtractor, PageMetadata};
pub use fetcher::{Fetcher, FetcherConfig, HttpClient, HttpResponse};
#[cfg(feature = "logging")]
pub use logging::{log_error_card, log_preview_card, setup_logging, LogConfig};
pub use markdown::{front_matter_of, MarkdownSource};
pub use og_fetcher::OgFetcher;
pub use post_processor::{LinkAnchor, PostProcessor, RenderedAnchor};
pub use render::{render_card, render_widget};
pub use resolver::WidgetResolver;
pub use scanner::{LinkToken, SyntaxNode, SyntaxSource, TokenClasses, TokenScanner};
pub use service::LinkThumbnailService;
pub use state::DecorationStore;
pub use utils::is_link_shaped;

/// Open Graph metadata of one page, as stored in the `results` cache.
///
/// Field names on the wire match the stores written by earlier versions of
/// the plugin.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OgData {
    #[serde(rename = "ogTitle")]
    pub title: String,
    #[serde(rename = "ogDescription", default)]
    pub description: String,
    /// `data:` URI of the preview image, or empty.
    #[serde(rename = "ogImage", default)]
    pub image: String,
    #[serde(rename = "ogImageAlt", default)]
    pub image_alt: String,
    #[serde(rename = "ogUrl")]
    pub canonical_url: String,
    #[serde(rename = "baseUrl", default)]
    pub base_url: String,
}
