use crate::error::{Result, ThumbnailError};
use crate::fetcher::HttpResponse;
use crate::utils;
use encoding_rs::Encoding;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

static BODY_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset=["']?(.+?)["']"#).expect("charset pattern is valid")
});
static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));
static ENTITIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&\S+?;").expect("entity pattern is valid"));
static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\s+").expect("whitespace pattern is valid"));

/// Recognized image extensions, in match priority order (later wins).
const IMAGE_FORMATS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "tif", "gif", "svg"];

/// Open Graph fields found in a page, before the image is inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    /// Absolute image address, when the page names one and has an http(s) origin.
    pub image_url: Option<String>,
    pub image_alt: String,
    pub canonical_url: String,
    pub base_url: String,
}

/// Metadata extractor, responsible for extracting preview information from webpage content
#[derive(Clone)]
pub struct MetadataExtractor;

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Validates the response and decodes its body to text.
    ///
    /// Fails when the content type is present but not textual, when no
    /// charset is declared anywhere, or when the declared charset is unknown.
    pub fn decode_page(&self, response: &HttpResponse) -> Result<String> {
        let content_type = response.header("content-type");

        if let Some(content_type) = content_type {
            if !content_type.contains("text/") {
                return Err(ThumbnailError::InvalidContentType(content_type.to_string()));
            }
        }

        let declared_in_header = content_type.is_some_and(|ct| ct.contains("charset"));
        if !response.text.contains("charset") && !declared_in_header {
            return Err(ThumbnailError::MissingCharset(
                "neither body nor content-type declares a charset".into(),
            ));
        }

        let charset = detect_charset(&response.text, content_type).ok_or_else(|| {
            ThumbnailError::MissingCharset(content_type.unwrap_or_default().to_string())
        })?;
        debug!(charset = %charset, "Decoding page body");

        if charset.eq_ignore_ascii_case("utf-8") {
            return Ok(String::from_utf8_lossy(&response.body).into_owned());
        }

        let encoding = Encoding::for_label(charset.as_bytes())
            .ok_or_else(|| ThumbnailError::UnsupportedCharset(charset.clone()))?;
        let (decoded, _, _) = encoding.decode(&response.body);
        Ok(decoded.into_owned())
    }

    /// Extracts Open Graph fields. Returns `None` when the page has no title.
    pub fn extract(&self, html: &str, url: &str) -> Option<PageMetadata> {
        let document = Html::parse_document(html);

        let title = self
            .meta_content(&document, "og:title")
            .or_else(|| self.document_title(&document))?;

        let base = utils::base_url(url);
        let image_url = match (base, self.meta_content(&document, "og:image")) {
            (Some(base), Some(image)) => Some(resolve_image_url(&image, base)),
            _ => None,
        };

        Some(PageMetadata {
            title,
            description: self
                .meta_content(&document, "og:description")
                .map(|d| lint_description(&d))
                .unwrap_or_default(),
            image_url,
            image_alt: self
                .meta_content(&document, "og:image:alt")
                .unwrap_or_default(),
            canonical_url: self
                .meta_content(&document, "og:url")
                .unwrap_or_else(|| url.to_string()),
            base_url: base.unwrap_or_default().to_string(),
        })
    }

    fn meta_content(&self, document: &Html, property: &str) -> Option<String> {
        let selector = Selector::parse(&format!("meta[property='{property}']")).ok()?;
        document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .filter(|content| !content.is_empty())
            .map(String::from)
    }

    fn document_title(&self, document: &Html) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty())
    }
}

/// Charset named by the first quoted `charset=` in the body, else the
/// content-type parameter.
fn detect_charset(text: &str, content_type: Option<&str>) -> Option<String> {
    if let Some(captures) = BODY_CHARSET.captures(text) {
        return Some(captures[1].trim().to_string());
    }

    let content_type = content_type?;
    let start = content_type.find("charset=")? + "charset=".len();
    let label = content_type[start..]
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    (!label.is_empty()).then(|| label.to_string())
}

/// Strips tags and entity references and collapses whitespace runs.
pub fn lint_description(description: &str) -> String {
    let stripped = TAGS.replace_all(description, "");
    let stripped = ENTITIES.replace_all(&stripped, "");
    SPACES.replace_all(&stripped, " ").into_owned()
}

pub fn resolve_image_url(image: &str, base: &str) -> String {
    if let Some(rest) = image.strip_prefix("//") {
        format!("https://{rest}")
    } else if image.starts_with("http") {
        image.to_string()
    } else if image.starts_with('/') {
        format!("{base}{image}")
    } else {
        format!("{base}/{image}")
    }
}

/// Image subtype guessed from the address, e.g. `png` or `svg+xml`.
pub fn guess_image_subtype(image_url: &str) -> Option<&'static str> {
    let format = IMAGE_FORMATS
        .iter()
        .rev()
        .find(|format| image_url.contains(*format))?;
    Some(match *format {
        "svg" => "svg+xml",
        other => other,
    })
}
