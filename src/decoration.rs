use crate::render::render_widget;
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Ordering value of inline widgets. Large enough to sort after any content
/// at the same position.
pub const INLINE_SIDE: i32 = 200_000_000;
/// Ordering value of block widgets; after inline widgets at the same position.
pub const BLOCK_SIDE: i32 = 300_000_000;

/// A rendered preview. Two widgets are equal when they show the same markup
/// for the same URL.
#[derive(Debug, Clone)]
pub struct Widget {
    url: String,
    html: String,
    content_hash: u64,
}

impl Widget {
    pub fn new(url: &str, card: &str, is_block: bool) -> Self {
        let html = render_widget(url, card, is_block);
        let mut hasher = DefaultHasher::new();
        html.hash(&mut hasher);
        Self {
            url: url.to_string(),
            content_hash: hasher.finish(),
            html,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }
}

impl PartialEq for Widget {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.content_hash == other.content_hash
    }
}

impl Eq for Widget {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationEntry {
    pub position: usize,
    pub widget: Arc<Widget>,
    pub side: i32,
    pub is_block: bool,
}

impl DecorationEntry {
    pub fn new(position: usize, widget: Arc<Widget>, is_block: bool) -> Self {
        Self {
            position,
            widget,
            side: if is_block { BLOCK_SIDE } else { INLINE_SIDE },
            is_block,
        }
    }
}

/// Immutable, sorted collection of decorations over one document state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
    version: u64,
    entries: Vec<DecorationEntry>,
}

impl DecorationSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sorts entries by `(position, side)` and drops later duplicates of the
    /// same pair.
    pub fn new(mut entries: Vec<DecorationEntry>) -> Self {
        entries.sort_by_key(|entry| (entry.position, entry.side));
        entries.dedup_by(|later, earlier| {
            later.position == earlier.position && later.side == earlier.side
        });
        Self {
            version: 0,
            entries,
        }
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entries(&self) -> &[DecorationEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecorationEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves every entry through a document edit.
    ///
    /// A set never holds two entries at the same `(position, side)`. When a
    /// deletion collapses several entries onto one spot, the one that came
    /// first in the document stays and the rest are dropped until the next
    /// cycle rebuilds the set.
    pub fn map(&self, changes: &ChangeSet) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|entry| DecorationEntry {
                position: changes.map_pos(entry.position),
                ..entry.clone()
            })
            .collect();
        Self::new(entries).with_version(self.version)
    }
}

/// Process-lifetime cache of widgets keyed by `(url, position)`.
///
/// A stored widget is reused only when it equals the freshly rendered one,
/// so a changed page never shows a stale card.
#[derive(Debug, Default)]
pub struct WidgetCache {
    widgets: DashMap<(String, usize), Arc<Widget>>,
}

impl WidgetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert(&self, url: &str, position: usize, is_block: bool, card: &str) -> Arc<Widget> {
        let candidate = Widget::new(url, card, is_block);
        let key = (url.to_string(), position);

        if let Some(existing) = self.widgets.get(&key) {
            if **existing == candidate {
                return Arc::clone(&existing);
            }
        }

        let widget = Arc::new(candidate);
        self.widgets.insert(key, Arc::clone(&widget));
        widget
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

/// One replaced range of the old document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub from: usize,
    pub to: usize,
    pub inserted: usize,
}

/// A document edit as a list of non-overlapping changes in old-document
/// coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// A change whose `to` precedes its `from` is read as an insertion at
    /// `from`.
    pub fn new(mut changes: Vec<Change>) -> Self {
        for change in &mut changes {
            change.to = change.to.max(change.from);
        }
        changes.sort_by_key(|change| (change.from, change.to));
        Self { changes }
    }

    pub fn insert(at: usize, len: usize) -> Self {
        Self::replace(at, at, len)
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Self::replace(from, to, 0)
    }

    pub fn replace(from: usize, to: usize, inserted: usize) -> Self {
        Self::new(vec![Change { from, to, inserted }])
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// New position of `pos`. Positions inside a replaced range, and
    /// insertions exactly at `pos`, map to after the inserted text.
    pub fn map_pos(&self, pos: usize) -> usize {
        let mut delta: isize = 0;
        for change in &self.changes {
            if pos < change.from {
                break;
            }
            if pos >= change.to {
                delta += change.inserted as isize - (change.to - change.from) as isize;
            } else {
                return (change.from + change.inserted).saturating_add_signed(delta);
            }
        }
        pos.saturating_add_signed(delta)
    }
}
