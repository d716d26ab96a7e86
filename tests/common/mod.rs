//! Mock HTTP server setup for integration tests

#![allow(dead_code)]

use mockito::{Matcher, Mock, Server, ServerGuard};
use subconscious::{PollOptions, Subconscious};

pub const API_KEY: &str = "sk-test-key";

/// Test fixture that owns a mock server and builds clients pointed at it.
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Client with a 1 ms poll interval so polling tests stay fast.
    pub fn client(&self) -> Subconscious {
        Subconscious::builder()
            .api_key(API_KEY)
            .base_url(&self.base_url)
            .default_poll(PollOptions::new(1, 10))
            .build()
            .expect("client builds against mock server")
    }

    /// JSON response for `method path`, expected exactly `hits` times.
    pub async fn mock_json(
        &mut self,
        method: &str,
        path: &str,
        status: usize,
        body: &str,
        hits: usize,
    ) -> Mock {
        self.server
            .mock(method, path)
            .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// Event-stream response for `POST /runs/stream`. Each chunk becomes one SSE frame.
    pub async fn mock_sse(&mut self, run_id: Option<&str>, frames: &[&str]) -> Mock {
        let mut mock = self
            .server
            .mock("POST", "/runs/stream")
            .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
            .match_header("accept", "text/event-stream")
            .with_status(200)
            .with_header("content-type", "text/event-stream");
        if let Some(id) = run_id {
            mock = mock.with_header("x-run-id", id);
        }
        mock.with_body(sse_body(frames)).create_async().await
    }

    /// A mock that must never be hit.
    pub async fn mock_unreachable(&mut self, method: &str, path: &str) -> Mock {
        self.server
            .mock(method, path)
            .match_body(Matcher::Any)
            .expect(0)
            .create_async()
            .await
    }
}

/// Frames not starting with a field name are sent as `data:` lines.
pub fn sse_body(frames: &[&str]) -> String {
    frames
        .iter()
        .map(|frame| {
            if frame.starts_with("data:") || frame.starts_with("event:") || frame.starts_with(':')
            {
                format!("{}\n\n", frame)
            } else {
                format!("data: {}\n\n", frame)
            }
        })
        .collect()
}

pub fn delta(content: &str) -> String {
    serde_json::json!({"choices": [{"index": 0, "delta": {"content": content}}]}).to_string()
}
