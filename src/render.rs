use crate::OgData;
use html_escape::{encode_double_quoted_attribute, encode_text};

/// Inner markup of a preview card. The thumbnail block is left out when the
/// record has no image.
pub fn render_card(data: &OgData) -> String {
    let thumbnail = if data.image.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="og-thumbnail"><img src="{}" alt="{}" loading="lazy"></div>"#,
            encode_double_quoted_attribute(&data.image),
            encode_double_quoted_attribute(&data.image_alt),
        )
    };

    format!(
        concat!(
            "{thumbnail}",
            r#"<div class="og-info-container">"#,
            r#"<div class="og-info"><strong>{title}</strong></div>"#,
            r#"<div class="og-description">{description}</div>"#,
            r#"<div class="og-url">{url}</div>"#,
            "</div>"
        ),
        thumbnail = thumbnail,
        title = encode_text(&data.title),
        description = encode_text(&data.description),
        url = encode_text(&data.canonical_url),
    )
}

/// Full widget markup for the live editor: the card inside a link inside the
/// embed wrapper.
pub fn render_widget(url: &str, card: &str, is_block: bool) -> String {
    let inline = if is_block { "" } else { " inline-embed" };
    let url = encode_double_quoted_attribute(url);
    format!(
        concat!(
            r#"<div class="markdown-rendered cm-embed-link link-thumbnail is-loaded{inline}">"#,
            r#"<a href="{url}" class="external-link og-link" data-tooltip-position="top" aria-label="{url}">"#,
            "{card}</a></div>"
        ),
        inline = inline,
        url = url,
        card = card,
    )
}
