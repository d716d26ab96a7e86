//! HTTP transport.
//!
//! [`Transport`] is the seam between the run lifecycle client and the network. It performs
//! one request per call and never retries; [`HttpTransport`] is the reqwest implementation.

pub mod http;

pub use http::{HttpTransport, HttpTransportConfig};
pub use reqwest::Method;

use crate::{BoxStream, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// An opened streaming response.
pub struct StreamResponse {
    /// Run id announced in the response headers, if any.
    pub run_id: Option<String>,
    /// Raw body chunks. Dropping the stream releases the connection.
    pub body: BoxStream<'static, Bytes>,
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a JSON request and return the decoded JSON body (`Null` for empty bodies).
    ///
    /// Non-success statuses map to the crate's error taxonomy; network failures map to
    /// [`crate::Error::Connection`].
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Value>;

    /// POST a JSON body and return the raw event-stream body.
    async fn open_stream(&self, path: &str, body: &Value) -> Result<StreamResponse>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("no data received for {0:?}")]
    IdleTimeout(Duration),

    #[error("could not connect: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e)
        } else if e.is_connect() {
            TransportError::Connect(e)
        } else {
            TransportError::Http(e)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout(_) | TransportError::IdleTimeout(_)
        )
    }
}
