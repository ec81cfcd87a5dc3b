//! A [`SyntaxSource`] over Markdown text, for hosts that do not bring their
//! own syntax tree.

use crate::error::Result;
use crate::scanner::{SyntaxNode, SyntaxSource, BLOCK_URL_NODE};
use pulldown_cmark::{Event, LinkType, Parser, Tag, TagEnd};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s<>\[\]`]+").expect("bare url pattern is valid")
});

const TRAILING_PUNCTUATION: [char; 8] = ['.', ',', ';', ':', '!', '?', '\'', '"'];

pub struct MarkdownSource {
    text: String,
    nodes: Vec<SyntaxNode>,
}

impl MarkdownSource {
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let (_, body_start) = split_front_matter(&text);
        let nodes = collect_nodes(&text, body_start);
        Self { text, nodes }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn nodes(&self) -> &[SyntaxNode] {
        &self.nodes
    }
}

impl SyntaxSource for MarkdownSource {
    fn visit(&self, visitor: &mut dyn FnMut(&SyntaxNode)) -> Result<()> {
        for node in &self.nodes {
            visitor(node);
        }
        Ok(())
    }

    fn slice(&self, from: usize, to: usize) -> Option<&str> {
        self.text.get(from..to)
    }
}

/// YAML between the leading `---` fences, if the document has front matter.
pub fn front_matter_of(text: &str) -> Option<&str> {
    split_front_matter(text).0
}

fn split_front_matter(text: &str) -> (Option<&str>, usize) {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, 0);
    };

    let start = text.len() - rest.len();
    let mut offset = start;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&text[start..offset]), offset + line.len());
        }
        offset += line.len();
    }
    (None, 0)
}

fn collect_nodes(text: &str, body_start: usize) -> Vec<SyntaxNode> {
    let body = &text[body_start..];
    let mut nodes = Vec::new();
    let mut paragraph: Option<Range<usize>> = None;
    let mut run: Option<Range<usize>> = None;
    let mut link_depth = 0usize;
    let mut in_code_block = false;

    for (event, range) in Parser::new(body).into_offset_iter() {
        let range = range.start + body_start..range.end + body_start;

        if matches!(event, Event::Text(_)) && link_depth == 0 && !in_code_block {
            run = match run.take() {
                Some(current) if current.end == range.start => Some(current.start..range.end),
                Some(current) => {
                    push_bare_urls(text, current, paragraph.as_ref(), &mut nodes);
                    Some(range)
                }
                None => Some(range),
            };
            continue;
        }

        if let Some(current) = run.take() {
            push_bare_urls(text, current, paragraph.as_ref(), &mut nodes);
        }

        match event {
            Event::Start(Tag::Paragraph) => paragraph = Some(range),
            Event::End(TagEnd::Paragraph) => paragraph = None,
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                ..
            }) => {
                link_depth += 1;
                push_link_nodes(text, range, link_type, &dest_url, &mut nodes);
            }
            Event::Start(Tag::Image { .. }) => link_depth += 1,
            Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                link_depth = link_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    if let Some(current) = run.take() {
        push_bare_urls(text, current, paragraph.as_ref(), &mut nodes);
    }

    nodes.sort_by_key(|node| (node.from, node.to));
    nodes
}

fn push_bare_urls(
    text: &str,
    run: Range<usize>,
    paragraph: Option<&Range<usize>>,
    nodes: &mut Vec<SyntaxNode>,
) {
    let segment = &text[run.clone()];
    for found in BARE_URL.find_iter(segment) {
        let url = trim_url_end(found.as_str());
        let from = run.start + found.start();
        let to = from + url.len();

        let standalone = paragraph.is_some_and(|p| text[p.clone()].trim() == url);
        let name = if standalone { BLOCK_URL_NODE } else { "inline-url" };
        nodes.push(SyntaxNode::new(name, from, to, "url"));
    }
}

/// Drops trailing sentence punctuation and closing parentheses that have no
/// opening partner inside the URL.
fn trim_url_end(mut url: &str) -> &str {
    loop {
        let trimmed = url.trim_end_matches(TRAILING_PUNCTUATION);
        let unbalanced = trimmed.ends_with(')')
            && trimmed.matches(')').count() > trimmed.matches('(').count();
        if !unbalanced {
            return trimmed;
        }
        url = &trimmed[..trimmed.len() - 1];
    }
}

fn push_link_nodes(
    text: &str,
    range: Range<usize>,
    link_type: LinkType,
    dest_url: &str,
    nodes: &mut Vec<SyntaxNode>,
) {
    match link_type {
        LinkType::Autolink => {
            let source = &text[range.clone()];
            let (from, to) = match source.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                Some(inner) if !inner.is_empty() => (range.start + 1, range.start + 1 + inner.len()),
                _ => (range.start, range.end),
            };
            nodes.push(SyntaxNode::new("autolink", from, to, "url"));
        }
        LinkType::Inline if !dest_url.is_empty() => {
            let Some(offset) = text[range.clone()].rfind(dest_url) else {
                return;
            };
            let from = range.start + offset;
            nodes.push(SyntaxNode::new(
                "string_url",
                from,
                from + dest_url.len(),
                "string url",
            ));
            if text[..from].ends_with('(') {
                nodes.push(SyntaxNode::new(
                    "formatting-link-string",
                    from - 1,
                    from,
                    "formatting formatting-link-string url",
                ));
            }
        }
        _ => {}
    }
}
