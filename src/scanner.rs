use crate::error::{Result, ThumbnailError};
use std::collections::BTreeSet;
use tracing::error;

/// A link-like span found in the document. Lives for one decoration cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkToken {
    pub from: usize,
    pub to: usize,
    pub value: String,
    pub is_block: bool,
}

/// Highlighting tags the host attaches to a syntax node, e.g. `url` or
/// `formatting`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenClasses(BTreeSet<String>);

impl TokenClasses {
    /// Parses a whitespace-separated tag list.
    pub fn parse(classes: &str) -> Self {
        classes.split_whitespace().collect()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for TokenClasses {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(String::from).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub name: String,
    pub from: usize,
    pub to: usize,
    pub classes: TokenClasses,
}

impl SyntaxNode {
    pub fn new(name: impl Into<String>, from: usize, to: usize, classes: &str) -> Self {
        Self {
            name: name.into(),
            from,
            to,
            classes: TokenClasses::parse(classes),
        }
    }
}

/// The host's parsed view of the current document.
pub trait SyntaxSource {
    /// Calls `visitor` for every node in document order.
    fn visit(&self, visitor: &mut dyn FnMut(&SyntaxNode)) -> Result<()>;

    /// Document text between two offsets.
    fn slice(&self, from: usize, to: usize) -> Option<&str>;
}

/// Name of the node the host uses for a URL standing on its own line.
pub const BLOCK_URL_NODE: &str = "url";

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenScanner;

impl TokenScanner {
    pub fn new() -> Self {
        Self
    }

    pub fn is_link_node(node: &SyntaxNode) -> bool {
        node.classes.contains("url")
            && !node.classes.contains("formatting")
            && !node.name.contains("string_url")
    }

    /// Collects link tokens in document order. Traversal failures are
    /// returned, never swallowed.
    pub fn scan(&self, source: &dyn SyntaxSource) -> Result<Vec<LinkToken>> {
        let mut tokens = Vec::new();
        let mut bad_range = None;

        let visited = source.visit(&mut |node| {
            if bad_range.is_some() || !Self::is_link_node(node) {
                return;
            }
            match source.slice(node.from, node.to) {
                Some(value) => tokens.push(LinkToken {
                    from: node.from,
                    to: node.to,
                    value: value.to_string(),
                    is_block: node.name == BLOCK_URL_NODE,
                }),
                None => bad_range = Some((node.from, node.to)),
            }
        });

        let outcome = match (visited, bad_range) {
            (Err(e), _) => Err(e),
            (Ok(()), Some((from, to))) => Err(ThumbnailError::ScanError(format!(
                "node range {from}..{to} is outside the document"
            ))),
            (Ok(()), None) => Ok(()),
        };
        if let Err(e) = outcome {
            error!(error = %e, "Link scan failed");
            return Err(e);
        }

        tokens.sort_by_key(|token| token.from);
        Ok(tokens)
    }
}
