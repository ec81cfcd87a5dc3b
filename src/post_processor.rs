use crate::resolver::WidgetResolver;
use crate::utils::is_link_shaped;
use html_escape::encode_double_quoted_attribute;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// An anchor element in a rendered (non-editing) document.
pub trait LinkAnchor {
    /// Current inner content, which for bare links is the URL itself.
    fn inner_html(&self) -> String;

    fn has_class(&self, class: &str) -> bool;

    /// Whether the anchor or one of its ancestors carries `class`.
    fn within_class(&self, class: &str) -> bool;

    fn set_inner_html(&mut self, html: String);

    fn set_class_name(&mut self, class_name: &str);

    fn set_attribute(&mut self, name: &str, value: &str);

    /// Keeps clicks on the card from navigating.
    fn stop_click_propagation(&mut self);

    /// Moves the anchor into a new `div` with the given class, placed where
    /// the anchor was.
    fn wrap(&mut self, wrapper_class: &str);
}

/// Expands external links in a finished document into preview cards, using
/// the same resolver as the live editor.
pub struct PostProcessor {
    resolver: Arc<WidgetResolver>,
    opt_out_class: String,
}

impl PostProcessor {
    pub fn new(resolver: Arc<WidgetResolver>, opt_out_class: impl Into<String>) -> Self {
        Self {
            resolver,
            opt_out_class: opt_out_class.into(),
        }
    }

    fn is_candidate<A: LinkAnchor>(anchor: &A) -> bool {
        anchor.has_class("external-link")
            && !anchor.has_class("cm-formatting")
            && !anchor.has_class("markdown-rendered")
    }

    /// Returns how many anchors were turned into cards.
    pub async fn process<A: LinkAnchor>(&self, anchors: &mut [A]) -> usize {
        let mut expanded = 0;
        for anchor in anchors.iter_mut() {
            if !Self::is_candidate(anchor) {
                continue;
            }

            let url = anchor.inner_html();
            if !is_link_shaped(&url) || anchor.within_class(&self.opt_out_class) {
                continue;
            }

            let Some(card) = self.resolver.resolve(&url).await else {
                continue;
            };

            anchor.set_inner_html(card);
            anchor.set_class_name("markdown-rendered external-link og-link");
            anchor.set_attribute("data-tooltip-position", "top");
            anchor.set_attribute("aria-label", &url);
            anchor.stop_click_propagation();
            anchor.wrap("link-thumbnail");
            expanded += 1;
        }

        debug!(expanded, "Post-processed rendered links");
        expanded
    }
}

/// Plain in-memory anchor, for hosts that render HTML strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedAnchor {
    pub href: String,
    pub inner_html: String,
    pub class_name: String,
    pub attributes: BTreeMap<String, String>,
    /// Classes of enclosing elements, innermost first.
    pub ancestor_classes: Vec<String>,
    pub wrapper_class: Option<String>,
    pub swallows_clicks: bool,
}

impl RenderedAnchor {
    pub fn external(url: &str) -> Self {
        Self {
            href: url.to_string(),
            inner_html: url.to_string(),
            class_name: "external-link".to_string(),
            ..Self::default()
        }
    }

    pub fn to_html(&self) -> String {
        let mut attributes = format!(
            r#" href="{}" class="{}""#,
            encode_double_quoted_attribute(&self.href),
            encode_double_quoted_attribute(&self.class_name)
        );
        for (name, value) in &self.attributes {
            attributes.push_str(&format!(r#" {name}="{}""#, encode_double_quoted_attribute(value)));
        }

        let anchor = format!("<a{attributes}>{}</a>", self.inner_html);
        match &self.wrapper_class {
            Some(class) => format!(r#"<div class="{}">{anchor}</div>"#, encode_double_quoted_attribute(class)),
            None => anchor,
        }
    }
}

impl LinkAnchor for RenderedAnchor {
    fn inner_html(&self) -> String {
        self.inner_html.clone()
    }

    fn has_class(&self, class: &str) -> bool {
        self.class_name.split_whitespace().any(|c| c == class)
    }

    fn within_class(&self, class: &str) -> bool {
        self.has_class(class)
            || self
                .ancestor_classes
                .iter()
                .any(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn set_inner_html(&mut self, html: String) {
        self.inner_html = html;
    }

    fn set_class_name(&mut self, class_name: &str) {
        self.class_name = class_name.to_string();
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    fn stop_click_propagation(&mut self) {
        self.swallows_clicks = true;
    }

    fn wrap(&mut self, wrapper_class: &str) {
        self.wrapper_class = Some(wrapper_class.to_string());
    }
}
