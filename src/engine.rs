use crate::config::ThumbnailConfig;
use crate::debounce::Debouncer;
use crate::decoration::{DecorationEntry, DecorationSet, WidgetCache};
use crate::error::Result;
use crate::resolver::WidgetResolver;
use crate::scanner::{LinkToken, SyntaxSource, TokenScanner};
use crate::state::DecorationStore;
use crate::utils::is_link_shaped;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Main selection range of the editor. `from <= to`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub from: usize,
    pub to: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self {
            from: anchor.min(head),
            to: anchor.max(head),
        }
    }

    pub fn cursor(pos: usize) -> Self {
        Self { from: pos, to: pos }
    }

    /// True when the span overlaps, touches, contains or is contained by the
    /// selection.
    pub fn intersects(&self, from: usize, to: usize) -> bool {
        (self.from <= to && self.to >= from) || (self.from >= from && self.to <= to)
    }
}

/// What the host reports changed since the last update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewUpdate {
    pub doc_changed: bool,
    pub viewport_changed: bool,
    pub selection_set: bool,
}

impl ViewUpdate {
    pub fn needs_rescan(&self) -> bool {
        self.doc_changed || self.viewport_changed || self.selection_set
    }
}

/// Editor state read when a debounced cycle fires.
pub trait EditorHost: Send + Sync {
    /// Whether the editor currently renders widgets inline.
    fn is_live_preview(&self) -> bool;

    fn selection(&self) -> Selection;

    /// Raw YAML front matter of the active document.
    fn front_matter(&self) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new set with `entries` widgets replaced the active one.
    Applied { generation: u64, entries: usize },
    /// Previews are suppressed and the active set was emptied.
    Cleared { generation: u64 },
    /// Nothing to dispatch: the new set and the active set are both empty.
    Unchanged { generation: u64 },
    /// A newer cycle started while this one was resolving.
    Superseded { generation: u64 },
}

/// Turns editor updates into decoration sets.
///
/// Each update is scanned synchronously; the expensive part (resolution and
/// application) goes through a debouncer and runs as an independent cycle.
pub struct DecorationEngine {
    core: Arc<EngineCore>,
    debouncer: Debouncer<Vec<LinkToken>>,
}

struct EngineCore {
    resolver: Arc<WidgetResolver>,
    host: Arc<dyn EditorHost>,
    store: Arc<DecorationStore>,
    widgets: WidgetCache,
    front_matter_field: String,
    opt_out_class: String,
}

impl DecorationEngine {
    pub fn new(
        resolver: Arc<WidgetResolver>,
        host: Arc<dyn EditorHost>,
        store: Arc<DecorationStore>,
        config: &ThumbnailConfig,
    ) -> Self {
        let core = Arc::new(EngineCore {
            resolver,
            host,
            store,
            widgets: WidgetCache::new(),
            front_matter_field: config.front_matter_field.clone(),
            opt_out_class: config.opt_out_class.clone(),
        });

        let cycle_core = Arc::clone(&core);
        let debouncer = Debouncer::new(config.debounce, move |tokens| {
            let core = Arc::clone(&cycle_core);
            async move {
                let outcome = core.run_cycle(tokens).await;
                debug!(?outcome, "Decoration cycle settled");
            }
        });

        Self { core, debouncer }
    }

    pub fn store(&self) -> &Arc<DecorationStore> {
        &self.core.store
    }

    /// Rescans on document, viewport or selection changes. Must be called
    /// from within a tokio runtime.
    pub fn on_update(&self, update: ViewUpdate, source: &dyn SyntaxSource) -> Result<()> {
        if !update.needs_rescan() {
            return Ok(());
        }
        self.refresh(source)
    }

    /// Scans unconditionally, e.g. when the editor is first opened.
    pub fn refresh(&self, source: &dyn SyntaxSource) -> Result<()> {
        let tokens = TokenScanner::new().scan(source)?;
        debug!(tokens = tokens.len(), "Scanned link tokens");
        self.debouncer.call(tokens);
        Ok(())
    }

    /// Runs one resolution cycle immediately, bypassing the debouncer.
    pub async fn run_cycle(&self, tokens: Vec<LinkToken>) -> CycleOutcome {
        self.core.run_cycle(tokens).await
    }
}

impl EngineCore {
    #[instrument(level = "debug", skip_all, fields(tokens = tokens.len()))]
    async fn run_cycle(&self, tokens: Vec<LinkToken>) -> CycleOutcome {
        let generation = self.store.issue_generation();

        if !self.host.is_live_preview() || self.opted_out() {
            if self.store.is_empty() {
                return CycleOutcome::Unchanged { generation };
            }
            return if self.store.commit(generation, DecorationSet::empty()) {
                CycleOutcome::Cleared { generation }
            } else {
                CycleOutcome::Superseded { generation }
            };
        }

        let selection = self.host.selection();
        let candidates: Vec<LinkToken> = tokens
            .into_iter()
            .filter(|token| !selection.intersects(token.from, token.to))
            .filter(|token| is_link_shaped(&token.value))
            .collect();

        let cards = join_all(
            candidates
                .iter()
                .map(|token| self.resolver.resolve(&token.value)),
        )
        .await;

        let entries: Vec<DecorationEntry> = candidates
            .iter()
            .zip(cards)
            .filter_map(|(token, card)| {
                let card = card?;
                let widget =
                    self.widgets
                        .get_or_insert(&token.value, token.to, token.is_block, &card);
                Some(DecorationEntry::new(token.to, widget, token.is_block))
            })
            .collect();

        let set = DecorationSet::new(entries);
        if set.is_empty() && self.store.is_empty() {
            return CycleOutcome::Unchanged { generation };
        }

        let count = set.len();
        if self.store.commit(generation, set) {
            CycleOutcome::Applied {
                generation,
                entries: count,
            }
        } else {
            debug!(generation, "Discarding results of superseded cycle");
            CycleOutcome::Superseded { generation }
        }
    }

    fn opted_out(&self) -> bool {
        self.host
            .front_matter()
            .is_some_and(|yaml| front_matter_opts_out(&yaml, &self.front_matter_field, &self.opt_out_class))
    }
}

/// Whether `field` in the YAML front matter names `class`. The field may be
/// a single string of space or comma separated names, or a list.
pub fn front_matter_opts_out(yaml: &str, field: &str, class: &str) -> bool {
    let value: serde_yaml::Value = match serde_yaml::from_str(yaml) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Unreadable front matter");
            return false;
        }
    };

    match value.get(field) {
        Some(serde_yaml::Value::String(classes)) => classes
            .split(|c: char| c.is_whitespace() || c == ',')
            .any(|c| c == class),
        Some(serde_yaml::Value::Sequence(classes)) => {
            classes.iter().any(|c| c.as_str() == Some(class))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_intersection() {
        let sel = Selection::new(10, 20);
        assert!(sel.intersects(15, 25));
        assert!(sel.intersects(5, 12));
        assert!(sel.intersects(12, 18));
        assert!(sel.intersects(0, 30));
        assert!(sel.intersects(20, 30));
        assert!(!sel.intersects(21, 30));
        assert!(!sel.intersects(0, 9));

        let cursor = Selection::cursor(5);
        assert!(cursor.intersects(0, 5));
        assert!(!cursor.intersects(6, 9));
    }

    #[test]
    fn selection_normalizes_direction() {
        assert_eq!(Selection::new(9, 3), Selection { from: 3, to: 9 });
    }

    #[test]
    fn opt_out_from_list_or_string() {
        assert!(front_matter_opts_out("cssclasses: [wide, noLinkThumbnail]", "cssclasses", "noLinkThumbnail"));
        assert!(front_matter_opts_out("cssclasses: noLinkThumbnail", "cssclasses", "noLinkThumbnail"));
        assert!(!front_matter_opts_out("cssclasses: [wide]", "cssclasses", "noLinkThumbnail"));
        assert!(!front_matter_opts_out("tags: [noLinkThumbnail]", "cssclasses", "noLinkThumbnail"));
        assert!(!front_matter_opts_out(": : :", "cssclasses", "noLinkThumbnail"));
    }

    #[test]
    fn class_name_in_other_fields_does_not_opt_out() {
        let yaml = "title: about noLinkThumbnail\ncssclasses: [wide]";
        assert!(!front_matter_opts_out(yaml, "cssclasses", "noLinkThumbnail"));
        assert!(!front_matter_opts_out("cssclasses: noLinkThumbnails", "cssclasses", "noLinkThumbnail"));
        assert!(front_matter_opts_out("cssclasses: wide noLinkThumbnail", "cssclasses", "noLinkThumbnail"));
    }

    #[test]
    fn rescan_triggers() {
        assert!(!ViewUpdate::default().needs_rescan());
        assert!(ViewUpdate { selection_set: true, ..Default::default() }.needs_rescan());
    }
}
