use crate::client::core::Subconscious;
use crate::transport::{HttpTransport, HttpTransportConfig};
use crate::types::PollOptions;
use crate::{Error, ErrorContext, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.subconscious.dev/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 32;
const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

const SOURCE: &str = "client_builder";

/// Builder for [`Subconscious`].
///
/// Explicit settings win over environment variables:
/// - `SUBCONSCIOUS_API_KEY`
/// - `SUBCONSCIOUS_BASE_URL`
/// - `SUBCONSCIOUS_HTTP_TIMEOUT_SECS` (default 30)
/// - `SUBCONSCIOUS_HTTP_POOL_MAX_IDLE_PER_HOST` (default 32)
/// - `SUBCONSCIOUS_PROXY_URL`
#[derive(Debug, Clone, Default)]
pub struct SubconsciousBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    stream_idle_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
    proxy_url: Option<String>,
    poll: Option<PollOptions>,
}

impl SubconsciousBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the API base URL (mock servers, staging).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Timeout of a single JSON request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Longest silence tolerated on a stream, both before the response headers and
    /// between body chunks. A run may stream for longer as long as data keeps arriving.
    pub fn stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = Some(n);
        self
    }

    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Polling used by `wait` and awaiting `run` calls that bring no options of their own.
    pub fn default_poll(mut self, poll: PollOptions) -> Self {
        self.poll = Some(poll);
        self
    }

    pub fn build(self) -> Result<Subconscious> {
        let api_key = self
            .api_key
            .or_else(|| env_string("SUBCONSCIOUS_API_KEY"))
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "missing API key",
                    ErrorContext::new()
                        .with_field_path("api_key")
                        .with_details("set it on the builder or via SUBCONSCIOUS_API_KEY")
                        .with_source(SOURCE),
                )
            })?;

        let base_url = self
            .base_url
            .or_else(|| env_string("SUBCONSCIOUS_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = validate_base_url(&base_url)?;

        let poll = self.poll.unwrap_or_default();
        if poll.max_attempts == 0 {
            return Err(Error::configuration_with_context(
                "default max_attempts must be at least 1",
                ErrorContext::new()
                    .with_field_path("poll.max_attempts")
                    .with_source(SOURCE),
            ));
        }

        let config = HttpTransportConfig {
            api_key,
            base_url,
            timeout: self
                .timeout
                .or_else(|| {
                    env_parse::<u64>("SUBCONSCIOUS_HTTP_TIMEOUT_SECS").map(Duration::from_secs)
                })
                .unwrap_or(DEFAULT_TIMEOUT),
            stream_idle_timeout: self
                .stream_idle_timeout
                .unwrap_or(DEFAULT_STREAM_IDLE_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            pool_max_idle_per_host: self
                .pool_max_idle_per_host
                .or_else(|| env_parse("SUBCONSCIOUS_HTTP_POOL_MAX_IDLE_PER_HOST"))
                .unwrap_or(DEFAULT_POOL_MAX_IDLE_PER_HOST),
            pool_idle_timeout: DEFAULT_POOL_IDLE_TIMEOUT,
            proxy_url: self.proxy_url.or_else(|| env_string("SUBCONSCIOUS_PROXY_URL")),
        };

        let transport = HttpTransport::new(config)?;
        Ok(Subconscious::with_transport(Arc::new(transport)).with_default_poll(poll))
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env_string(name)?.trim().parse().ok()
}

/// Absolute http(s) URL, returned without its trailing `/`.
fn validate_base_url(raw: &str) -> Result<String> {
    let invalid = |details: String| {
        Error::configuration_with_context(
            format!("invalid base URL: {}", raw),
            ErrorContext::new()
                .with_field_path("base_url")
                .with_details(details)
                .with_source(SOURCE),
        )
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
