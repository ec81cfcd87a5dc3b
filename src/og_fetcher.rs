use crate::cache::Cache;
use crate::config::ThumbnailConfig;
use crate::error::{Result, ThumbnailError};
use crate::extractor::{guess_image_subtype, MetadataExtractor};
use crate::fetcher::HttpClient;
use crate::utils::normalize_user_agent;
use crate::OgData;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Fetches a page's Open Graph metadata and records the outcome in the cache.
///
/// Every failure before extraction is permanent: the URL is written to the
/// `disabled` namespace and never fetched again until that marker is cleared.
#[derive(Clone)]
pub struct OgFetcher {
    client: Arc<dyn HttpClient>,
    cache: Cache,
    extractor: MetadataExtractor,
    user_agent: String,
    accept_language: String,
}

impl OgFetcher {
    pub fn new(client: Arc<dyn HttpClient>, cache: Cache, config: &ThumbnailConfig) -> Self {
        Self {
            client,
            cache,
            extractor: MetadataExtractor::new(),
            user_agent: normalize_user_agent(&config.user_agent),
            accept_language: config.accept_language.clone(),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, url: &str) -> Option<OgData> {
        match self.fetch_page(url).await {
            Ok(Some(data)) => {
                if let Err(e) = self.cache.store_result(url, &data).await {
                    e.log();
                }
                Some(data)
            }
            Ok(None) => {
                debug!(url = %url, "Page has no title, nothing to preview");
                None
            }
            Err(e) => {
                e.log();
                if e.disables_url() {
                    warn!(url = %url, "Disabling previews for URL");
                    if let Err(e) = self.cache.disable(url).await {
                        e.log();
                    }
                }
                None
            }
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<Option<OgData>> {
        Url::parse(url)?;

        let headers = [
            ("user-agent", self.user_agent.as_str()),
            ("accept-language", self.accept_language.as_str()),
            ("accept-encoding", "UTF-8"),
        ];
        let response = self.client.get(url, &headers).await?;
        if !response.is_success() {
            return Err(ThumbnailError::HttpStatus {
                status: response.status,
                url: url.to_string(),
            });
        }

        let html = self.extractor.decode_page(&response)?;
        let Some(page) = self.extractor.extract(&html, url) else {
            return Ok(None);
        };

        let image = match &page.image_url {
            Some(image_url) => self.inline_image(image_url).await,
            None => String::new(),
        };

        Ok(Some(OgData {
            title: page.title,
            description: page.description,
            image,
            image_alt: page.image_alt,
            canonical_url: page.canonical_url,
            base_url: page.base_url,
        }))
    }

    /// Downloads the image as a `data:` URI. Any failure yields an empty string.
    async fn inline_image(&self, image_url: &str) -> String {
        let subtype = guess_image_subtype(image_url);
        let accept = format!("image/{}", subtype.unwrap_or("*"));
        let headers = [
            ("user-agent", self.user_agent.as_str()),
            ("accept", accept.as_str()),
        ];

        let response = match self.client.get(image_url, &headers).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                warn!(url = %image_url, status = response.status, "Image request failed");
                return String::new();
            }
            Err(e) => {
                e.log();
                return String::new();
            }
        };

        let subtype = subtype.map(String::from).unwrap_or_else(|| {
            response
                .header("content-type")
                .and_then(|ct| ct.strip_prefix("image/"))
                .and_then(|ct| ct.split(';').next())
                .map(|ct| ct.trim().to_string())
                .unwrap_or_default()
        });

        debug!(url = %image_url, bytes = response.body.len(), "Inlined preview image");
        format!(
            "data:image/{subtype};charset=utf-8;base64,{}",
            STANDARD.encode(&response.body)
        )
    }
}
