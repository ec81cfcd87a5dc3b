#![allow(dead_code)]

use async_trait::async_trait;
use link_thumbnail::{
    EditorHost, HttpClient, HttpResponse, LinkThumbnailService, Selection, ThumbnailConfig,
    ThumbnailError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
struct Route {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
    delay: Duration,
}

/// In-process [`HttpClient`] with canned responses. Unknown URLs fail like
/// an unreachable host.
#[derive(Default)]
pub struct MockClient {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, content_type: Option<&str>, body: &[u8]) -> Self {
        self.route(url, 200, content_type, body, Duration::ZERO)
    }

    pub fn html(self, url: &str, html: &str) -> Self {
        self.page(url, Some("text/html; charset=utf-8"), html.as_bytes())
    }

    pub fn slow_html(self, url: &str, html: &str, delay: Duration) -> Self {
        self.route(url, 200, Some("text/html; charset=utf-8"), html.as_bytes(), delay)
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.route(url, status, Some("text/html; charset=utf-8"), b"", Duration::ZERO)
    }

    fn route(
        self,
        url: &str,
        status: u16,
        content_type: Option<&str>,
        body: &[u8],
        delay: Duration,
    ) -> Self {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route {
                status,
                content_type: content_type.map(String::from),
                body: body.to_vec(),
                delay,
            },
        );
        self
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse, ThumbnailError> {
        self.calls.lock().unwrap().push(url.to_string());
        let route = self.routes.lock().unwrap().get(url).cloned();
        let Some(route) = route else {
            return Err(ThumbnailError::FetchError(format!("connection refused: {url}")));
        };

        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }

        let mut headers = HashMap::new();
        if let Some(content_type) = route.content_type {
            headers.insert("content-type".to_string(), content_type);
        }
        Ok(HttpResponse {
            status: route.status,
            headers,
            text: String::from_utf8_lossy(&route.body).into_owned(),
            body: route.body,
        })
    }
}

pub fn og_page(title: &str) -> String {
    format!(
        r#"<html><head><meta charset="utf-8"><meta property="og:title" content="{title}"></head><body></body></html>"#
    )
}

pub fn service(client: Arc<MockClient>) -> LinkThumbnailService {
    LinkThumbnailService::from_parts(
        ThumbnailConfig::default(),
        link_thumbnail::Cache::in_memory(),
        client,
    )
}

pub struct TestHost {
    live: AtomicBool,
    selection: Mutex<Selection>,
    front_matter: Mutex<Option<String>>,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            live: AtomicBool::new(true),
            selection: Mutex::new(Selection::cursor(0)),
            front_matter: Mutex::new(None),
        }
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    pub fn select(&self, selection: Selection) {
        *self.selection.lock().unwrap() = selection;
    }

    pub fn set_front_matter(&self, yaml: &str) {
        *self.front_matter.lock().unwrap() = Some(yaml.to_string());
    }
}

impl EditorHost for TestHost {
    fn is_live_preview(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn selection(&self) -> Selection {
        *self.selection.lock().unwrap()
    }

    fn front_matter(&self) -> Option<String> {
        self.front_matter.lock().unwrap().clone()
    }
}
