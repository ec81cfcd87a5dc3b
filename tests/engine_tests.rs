mod common;

use common::{og_page, service, MockClient, TestHost};
use link_thumbnail::{
    CycleOutcome, LinkToken, MarkdownSource, Selection, SyntaxNode, SyntaxSource,
    ThumbnailError, ViewUpdate, BLOCK_SIDE, INLINE_SIDE,
};
use std::sync::Arc;
use std::time::Duration;

const FIRST: &str = "https://first.example.com/a";
const SECOND: &str = "https://second.example.com/b";

fn token(from: usize, value: &str, is_block: bool) -> LinkToken {
    LinkToken {
        from,
        to: from + value.len(),
        value: value.to_string(),
        is_block,
    }
}

#[tokio::test(start_paused = true)]
async fn entries_follow_document_order() {
    // The first link resolves last.
    let client = Arc::new(
        MockClient::new()
            .slow_html(FIRST, &og_page("First"), Duration::from_millis(300))
            .html(SECOND, &og_page("Second")),
    );
    let service = service(client);
    let host = Arc::new(TestHost::new());
    let engine = service.engine(host);

    let tokens = vec![token(10, FIRST, true), token(80, SECOND, false)];
    let outcome = engine.run_cycle(tokens).await;
    assert!(matches!(outcome, CycleOutcome::Applied { entries: 2, .. }));

    let set = engine.store().current();
    let urls: Vec<&str> = set.iter().map(|entry| entry.widget.url()).collect();
    assert_eq!(urls, vec![FIRST, SECOND]);

    let first = &set.entries()[0];
    assert_eq!(first.position, 10 + FIRST.len());
    assert_eq!(first.side, BLOCK_SIDE);
    assert!(first.widget.html().contains("First"));
    assert!(!first.widget.html().contains("inline-embed"));

    let second = &set.entries()[1];
    assert_eq!(second.side, INLINE_SIDE);
    assert!(second.widget.html().contains("inline-embed"));
}

#[tokio::test]
async fn links_under_the_selection_are_left_alone() {
    let client = Arc::new(
        MockClient::new()
            .html(FIRST, &og_page("First"))
            .html(SECOND, &og_page("Second")),
    );
    let service = service(client.clone());
    let host = Arc::new(TestHost::new());
    host.select(Selection::cursor(15));
    let engine = service.engine(host);

    let outcome = engine
        .run_cycle(vec![token(10, FIRST, false), token(80, SECOND, false)])
        .await;

    assert!(matches!(outcome, CycleOutcome::Applied { entries: 1, .. }));
    assert_eq!(engine.store().current().entries()[0].widget.url(), SECOND);
    assert_eq!(client.calls_to(FIRST), 0);
}

#[tokio::test]
async fn tokens_that_do_not_look_like_links_are_skipped() {
    let client = Arc::new(MockClient::new());
    let service = service(client.clone());
    let engine = service.engine(Arc::new(TestHost::new()));

    let outcome = engine
        .run_cycle(vec![token(10, "ftp://files.example.com/x", false), token(60, "not a url", true)])
        .await;

    assert!(matches!(outcome, CycleOutcome::Unchanged { .. }));
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn failed_links_are_dropped_from_the_set() {
    let client = Arc::new(MockClient::new().html(SECOND, &og_page("Second")));
    let service = service(client);
    let engine = service.engine(Arc::new(TestHost::new()));

    let outcome = engine
        .run_cycle(vec![token(10, FIRST, false), token(80, SECOND, false)])
        .await;

    assert!(matches!(outcome, CycleOutcome::Applied { entries: 1, .. }));
    assert!(service.cache().is_disabled(FIRST).await.unwrap());
}

#[tokio::test]
async fn leaving_live_preview_clears_decorations() {
    let client = Arc::new(MockClient::new().html(FIRST, &og_page("First")));
    let service = service(client);
    let host = Arc::new(TestHost::new());
    let engine = service.engine(host.clone());

    engine.run_cycle(vec![token(10, FIRST, true)]).await;
    assert_eq!(engine.store().current().len(), 1);

    host.set_live(false);
    let outcome = engine.run_cycle(vec![token(10, FIRST, true)]).await;
    assert!(matches!(outcome, CycleOutcome::Cleared { .. }));
    assert!(engine.store().is_empty());

    let outcome = engine.run_cycle(vec![token(10, FIRST, true)]).await;
    assert!(matches!(outcome, CycleOutcome::Unchanged { .. }));
}

#[tokio::test]
async fn opted_out_document_gets_no_previews() {
    let client = Arc::new(MockClient::new().html(FIRST, &og_page("First")));
    let service = service(client.clone());
    let host = Arc::new(TestHost::new());
    let engine = service.engine(host.clone());

    engine.run_cycle(vec![token(10, FIRST, true)]).await;
    assert!(!engine.store().is_empty());

    host.set_front_matter("cssclasses:\n  - wide\n  - noLinkThumbnail\n");
    let outcome = engine.run_cycle(vec![token(10, FIRST, true)]).await;
    assert!(matches!(outcome, CycleOutcome::Cleared { .. }));
    assert!(engine.store().is_empty());
    assert_eq!(client.calls_to(FIRST), 1);
}

#[tokio::test]
async fn empty_cycle_on_empty_store_dispatches_nothing() {
    let service = service(Arc::new(MockClient::new()));
    let engine = service.engine(Arc::new(TestHost::new()));
    let rx = engine.store().subscribe();

    let outcome = engine.run_cycle(Vec::new()).await;

    assert!(matches!(outcome, CycleOutcome::Unchanged { .. }));
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn slow_cycle_cannot_overwrite_newer_result() {
    let client = Arc::new(
        MockClient::new()
            .slow_html(FIRST, &og_page("Slow"), Duration::from_secs(2))
            .html(SECOND, &og_page("Fast")),
    );
    let service = service(client);
    let engine = service.engine(Arc::new(TestHost::new()));

    let slow = engine.run_cycle(vec![token(10, FIRST, false)]);
    let fast = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.run_cycle(vec![token(10, SECOND, false)]).await
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert!(matches!(slow, CycleOutcome::Superseded { generation: 1 }));
    assert!(matches!(fast, CycleOutcome::Applied { generation: 2, entries: 1 }));

    let set = engine.store().current();
    assert_eq!(set.len(), 1);
    assert_eq!(set.entries()[0].widget.url(), SECOND);
}

#[tokio::test]
async fn unchanged_card_reuses_its_widget() {
    let client = Arc::new(MockClient::new().html(FIRST, &og_page("First")));
    let service = service(client);
    let engine = service.engine(Arc::new(TestHost::new()));

    engine.run_cycle(vec![token(10, FIRST, true)]).await;
    let before = engine.store().current();
    engine.run_cycle(vec![token(10, FIRST, true)]).await;
    let after = engine.store().current();

    assert!(Arc::ptr_eq(&before.entries()[0].widget, &after.entries()[0].widget));
    assert!(after.version() > before.version());
}

#[tokio::test(start_paused = true)]
async fn editor_updates_are_debounced() {
    let client = Arc::new(
        MockClient::new()
            .html(FIRST, &og_page("First"))
            .html(SECOND, &og_page("Second")),
    );
    let service = service(client.clone());
    let host = Arc::new(TestHost::new());
    host.select(Selection::cursor(0));
    let engine = service.engine(host);
    let mut rx = engine.store().subscribe();

    let typed = ViewUpdate {
        doc_changed: true,
        ..ViewUpdate::default()
    };

    // Leading call runs at once.
    let doc = MarkdownSource::parse(format!("Intro\n\n{FIRST}\n"));
    engine.on_update(typed, &doc).unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().entries()[0].widget.url(), FIRST);

    // A burst inside the window collapses into one trailing cycle with the
    // latest document.
    for text in ["Intro\n\n", "Intro\n\nhttps://sec", "Intro\n\nhttps://second.example.com/b\n"] {
        engine.on_update(typed, &MarkdownSource::parse(text)).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    let set = engine.store().current();
    assert_eq!(set.len(), 1);
    assert_eq!(set.entries()[0].widget.url(), SECOND);
    assert!(set.entries()[0].is_block);
    assert_eq!(client.calls_to(SECOND), 1);
    assert_eq!(client.total_calls(), 2);
}

#[tokio::test]
async fn updates_without_changes_do_not_rescan() {
    let service = service(Arc::new(MockClient::new()));
    let engine = service.engine(Arc::new(TestHost::new()));
    let doc = MarkdownSource::parse(format!("Intro\n\n{FIRST}\n"));

    engine.on_update(ViewUpdate::default(), &doc).unwrap();
    tokio::task::yield_now().await;
    assert_eq!(engine.store().latest_generation(), 0);
}

/// Tree that fails part-way through a walk, as a host parser can.
struct FailingTree;

impl SyntaxSource for FailingTree {
    fn visit(&self, visitor: &mut dyn FnMut(&SyntaxNode)) -> link_thumbnail::Result<()> {
        visitor(&SyntaxNode::new("url", 0, 20, ""));
        Err(ThumbnailError::ScanError("tree is stale".into()))
    }

    fn slice(&self, _from: usize, _to: usize) -> Option<&str> {
        Some("https://a.example.com")
    }
}

#[tokio::test]
async fn scan_failure_is_reported_and_starts_no_cycle() {
    let client = Arc::new(MockClient::new());
    let service = service(client.clone());
    let engine = service.engine(Arc::new(TestHost::new()));
    let update = ViewUpdate {
        doc_changed: true,
        ..ViewUpdate::default()
    };

    let result = engine.on_update(update, &FailingTree);
    assert!(matches!(result, Err(ThumbnailError::ScanError(_))));

    tokio::task::yield_now().await;
    assert_eq!(engine.store().latest_generation(), 0);
    assert!(engine.store().current().is_empty());
    assert_eq!(client.total_calls(), 0);
}
