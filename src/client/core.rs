use crate::client::builder::SubconsciousBuilder;
use crate::client::poll::check_poll;
use crate::client::stream::RunStream;
use crate::streaming::RunEventDecoder;
use crate::tools::normalize_tools;
use crate::transport::{Method, Transport};
use crate::types::{PollOptions, Run, RunInput, RunOptions};
use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

static ENGINE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:-]*$").expect("valid engine id regex")
});

const SOURCE: &str = "run_client";

/// Client for the Subconscious run API.
///
/// Cheap to clone; clones share the underlying connection pool. Each call is independent,
/// so one client can drive many runs concurrently.
#[derive(Clone)]
pub struct Subconscious {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) default_poll: PollOptions,
}

impl fmt::Debug for Subconscious {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subconscious")
            .field("default_poll", &self.default_poll)
            .finish_non_exhaustive()
    }
}

impl Subconscious {
    /// Client with the given key; other settings come from the environment or defaults.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        SubconsciousBuilder::new().api_key(api_key).build()
    }

    /// Client configured entirely from `SUBCONSCIOUS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        SubconsciousBuilder::new().build()
    }

    pub fn builder() -> SubconsciousBuilder {
        SubconsciousBuilder::new()
    }

    /// Client over a custom transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            default_poll: PollOptions::default(),
        }
    }

    pub fn with_default_poll(mut self, poll: PollOptions) -> Self {
        self.default_poll = poll;
        self
    }

    pub fn default_poll(&self) -> PollOptions {
        self.default_poll
    }

    /// Submit a run.
    ///
    /// Without `await_completion` this returns as soon as the server accepted the run
    /// (status `queued` or `running`, no result). With it, the run is polled with
    /// `options.poll` (or the client default) until it reaches a terminal status.
    pub async fn run(&self, engine: &str, input: &RunInput, options: RunOptions) -> Result<Run> {
        let poll = options.poll.unwrap_or(self.default_poll);
        if options.await_completion {
            check_poll(&poll)?;
        }
        let payload = run_payload(engine, input)?;
        let response = self
            .transport
            .send(Method::POST, "/runs", Some(&payload), None)
            .await?;
        let run: Run = serde_json::from_value(response)?;
        info!(run_id = %run.run_id, engine, status = %run.status, "run created");

        if options.await_completion {
            return self.poll_until_terminal(&run.run_id, poll, None).await;
        }
        Ok(run)
    }

    /// Current state of a run. Unknown ids yield [`Error::NotFound`].
    pub async fn get(&self, run_id: &str) -> Result<Run> {
        validate_run_id(run_id)?;
        let path = format!("/runs/{}", run_id);
        let response = self.transport.send(Method::GET, &path, None, None).await?;
        let run: Run = serde_json::from_value(response)?;
        debug!(run_id, status = %run.status, "fetched run");
        Ok(run)
    }

    /// Request cancellation.
    ///
    /// A run that already finished cannot be cancelled; when the server refuses for that
    /// reason the call still succeeds. Success does not mean the status has changed yet.
    pub async fn cancel(&self, run_id: &str) -> Result<()> {
        validate_run_id(run_id)?;
        let path = format!("/runs/{}/cancel", run_id);
        match self.transport.send(Method::POST, &path, None, None).await {
            Ok(_) => {
                debug!(run_id, "cancel requested");
                Ok(())
            }
            Err(err @ Error::Api { .. }) => match self.get(run_id).await {
                Ok(run) if run.is_terminal() => {
                    debug!(run_id, status = %run.status, "cancel on finished run ignored");
                    Ok(())
                }
                _ => {
                    warn!(run_id, error = %err, "cancel rejected");
                    Err(err)
                }
            },
            Err(err) => Err(err),
        }
    }

    /// Open a run stream. The returned [`RunStream`] is lazy and single-use.
    pub async fn stream(&self, engine: &str, input: &RunInput) -> Result<RunStream> {
        let payload = run_payload(engine, input)?;
        let response = self.transport.open_stream("/runs/stream", &payload).await?;
        debug!(engine, run_id = ?response.run_id, "stream opened");

        let run_id = response.run_id.clone();
        let events = RunEventDecoder::new(response.run_id).decode(response.body);
        Ok(RunStream::new(run_id, events))
    }
}

/// Validate and assemble the body of `POST /runs` and `POST /runs/stream`.
pub(crate) fn run_payload(engine: &str, input: &RunInput) -> Result<Value> {
    validate_engine(engine)?;
    let tools = normalize_tools(&input.tools)?;

    let mut body = Map::new();
    body.insert("instructions".into(), json!(input.instructions));
    body.insert("tools".into(), serde_json::to_value(&tools)?);
    if let Some(format) = &input.answer_format {
        format.validate("input.answer_format")?;
        body.insert("answerFormat".into(), format.as_value().clone());
    }
    if let Some(format) = &input.reasoning_format {
        format.validate("input.reasoning_format")?;
        body.insert("reasoningFormat".into(), format.as_value().clone());
    }

    Ok(json!({ "engine": engine, "input": body }))
}

fn validate_engine(engine: &str) -> Result<()> {
    if ENGINE_ID.is_match(engine) {
        return Ok(());
    }
    Err(Error::validation_with_context(
        "engine must be a non-empty identifier",
        ErrorContext::new()
            .with_field_path("engine")
            .with_details(format!("got {:?}", engine))
            .with_source(SOURCE),
    ))
}

/// Run ids end up in URL paths.
pub(crate) fn validate_run_id(run_id: &str) -> Result<()> {
    let bad = run_id.is_empty()
        || run_id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#'));
    if !bad {
        return Ok(());
    }
    Err(Error::validation_with_context(
        "invalid run id",
        ErrorContext::new()
            .with_field_path("run_id")
            .with_details(format!("got {:?}", run_id))
            .with_source(SOURCE),
    ))
}
