use super::{StreamResponse, Transport, TransportError};
use crate::error_code::ErrorCode;
use crate::{BoxStream, Error, ErrorContext, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, Proxy, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Correlation id attached to every request. The server may ignore it.
const REQUEST_ID_HEADER: &str = "x-request-id";
/// Header carrying the run id on streaming responses.
const RUN_ID_HEADER: &str = "x-run-id";

/// Settings for [`HttpTransport`]. Filled by [`crate::SubconsciousBuilder`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub api_key: String,
    pub base_url: String,
    /// Whole-request timeout for JSON calls.
    pub timeout: Duration,
    /// Longest wait for stream response headers and between body chunks. Streams have
    /// no overall deadline.
    pub stream_idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
}

/// reqwest-backed transport: bearer auth, base URL prefix, JSON in and out.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    stream_idle_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout))
            // Conservative HTTP/2 keepalive defaults for long-lived streams.
            .http2_adaptive_window(true)
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    "invalid proxy URL",
                    ErrorContext::new()
                        .with_field_path("proxy_url")
                        .with_details(e.to_string())
                        .with_source("http_transport"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Connection(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            timeout: config.timeout,
            stream_idle_timeout: config.stream_idle_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> (reqwest::RequestBuilder, String) {
        let url = format!("{}{}", self.base_url, path);
        let request_id = Uuid::new_v4().to_string();
        let req = self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header(REQUEST_ID_HEADER, &request_id);
        (req, request_id)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Value> {
        let (mut req, request_id) = self.request(method.clone(), path);
        req = req.timeout(self.timeout);
        if let Some(body) = body {
            req = req.json(body);
        }
        if let Some(headers) = headers {
            for (k, v) in headers {
                req = req.header(k, v);
            }
        }

        debug!(%method, path, request_id = %request_id, "sending request");
        let response = req.send().await.map_err(TransportError::from_reqwest)?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let text = response.text().await.map_err(TransportError::from_reqwest)?;

        if !status.is_success() {
            let err = error_from_response(status, &response_headers, &text);
            debug!(
                %method,
                path,
                request_id = %request_id,
                status = status.as_u16(),
                error = %err,
                "request failed"
            );
            return Err(err);
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn open_stream(&self, path: &str, body: &Value) -> Result<StreamResponse> {
        let (req, request_id) = self.request(Method::POST, path);
        let req = req.header(ACCEPT, "text/event-stream").json(body);
        let idle = self.stream_idle_timeout;

        debug!(path, request_id = %request_id, "opening stream");
        let response = match tokio::time::timeout(idle, req.send()).await {
            Ok(sent) => sent.map_err(TransportError::from_reqwest)?,
            Err(_) => return Err(TransportError::IdleTimeout(idle).into()),
        };
        let status = response.status();

        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.map_err(TransportError::from_reqwest)?;
            return Err(error_from_response(status, &headers, &text));
        }

        if let Some(ct) = response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            if !ct.starts_with("text/event-stream") {
                warn!(content_type = ct, "stream response is not text/event-stream");
            }
        }

        let run_id = header_str(response.headers(), RUN_ID_HEADER);
        let body = response
            .bytes_stream()
            .map_err(|e| Error::Connection(TransportError::from_reqwest(e)));

        Ok(StreamResponse {
            run_id,
            body: with_idle_timeout(Box::pin(body), idle),
        })
    }
}

/// Ends `body` with [`TransportError::IdleTimeout`] once no chunk arrives within `idle`.
fn with_idle_timeout(
    body: BoxStream<'static, Bytes>,
    idle: Duration,
) -> BoxStream<'static, Bytes> {
    Box::pin(stream::unfold(Some(body), move |state| async move {
        let mut body = state?;
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(chunk)) => Some((chunk, Some(body))),
            Ok(None) => None,
            Err(_) => {
                warn!(idle_ms = idle.as_millis() as u64, "stream went silent");
                Some((Err(TransportError::IdleTimeout(idle).into()), None))
            }
        }
    }))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    let s = headers.get(name)?.to_str().ok()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// `Retry-After` in its delay-seconds form.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs: u64 = raw.trim().parse().ok()?;
    Some(Duration::from_secs(secs))
}

/// Map a non-success response to the error taxonomy.
///
/// The body's `{"error": {"code", "message", "details"}}` is used when present; otherwise
/// the code comes from the status and the message from the raw body.
pub(crate) fn error_from_response(status: StatusCode, headers: &HeaderMap, body: &str) -> Error {
    let status_code = status.as_u16();
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error_obj = parsed.as_ref().and_then(|v| v.get("error"));

    let code = error_obj
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| ErrorCode::from_http_status(status_code).as_str().to_string());

    let message = error_obj
        .and_then(|e| match e {
            Value::String(s) => Some(s.clone()),
            other => other.get("message").and_then(Value::as_str).map(str::to_string),
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("HTTP {}", status_code));

    let details = error_obj.and_then(|e| e.get("details")).cloned();
    let known = ErrorCode::parse(&code);

    match (status_code, known) {
        (401 | 403, _)
        | (_, Some(ErrorCode::AuthenticationFailed | ErrorCode::PermissionDenied)) => {
            Error::Authentication {
                status: status_code,
                message,
            }
        }
        (429, _) | (_, Some(ErrorCode::RateLimited)) => Error::RateLimit {
            message,
            retry_after: retry_after(headers),
        },
        (404, _) | (_, Some(ErrorCode::NotFound)) => Error::NotFound { message },
        _ => Error::Api {
            status: status_code,
            code,
            message,
            details,
        },
    }
}
