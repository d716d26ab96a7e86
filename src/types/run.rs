//! Run lifecycle types: status, results, usage and request inputs.

use crate::structured::OutputSchema;
use crate::types::tool::Tool;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Engines documented by the service. Any identifier accepted by the server can be used.
pub mod engines {
    pub const TIM_EDGE: &str = "tim-edge";
    pub const TIM_GPT: &str = "tim-gpt";
    pub const TIM_GPT_HEAVY: &str = "tim-gpt-heavy";
}

/// Server-reported run status.
///
/// `Queued -> Running -> {Succeeded, Failed, Canceled, TimedOut}`; terminal states are
/// absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Queued,
    Running,
    Succeeded,
    Failed,
    #[serde(alias = "cancelled")]
    Canceled,
    TimedOut,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Canceled | Self::TimedOut
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the engine's reasoning tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningNode {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thought: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tooluse: Vec<serde_json::Value>,
    #[serde(default, alias = "subtasks", deserialize_with = "null_as_default")]
    pub subtask: Vec<ReasoningNode>,
    #[serde(default)]
    pub conclusion: String,
}

impl ReasoningNode {
    /// Depth-first iterator over this node and all nested subtasks.
    pub fn walk(&self) -> impl Iterator<Item = &ReasoningNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.subtask.iter().rev());
            Some(node)
        })
    }
}

/// Output of a succeeded run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub answer: String,
    /// Reasoning steps in order. The server may send a single root node or a list.
    #[serde(default, deserialize_with = "one_or_many")]
    pub reasoning: Vec<ReasoningNode>,
}

impl RunResult {
    /// Deserialize an answer produced under an `answerFormat` schema.
    pub fn parse_answer<T: DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_str(&self.answer)?)
    }
}

/// Failure details of a failed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsage {
    pub engine: String,
    #[serde(default, alias = "input_tokens")]
    pub input_tokens: u64,
    #[serde(default, alias = "output_tokens")]
    pub output_tokens: u64,
    #[serde(default, alias = "total_tokens")]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformToolUsage {
    #[serde(alias = "tool_id")]
    pub tool_id: String,
    #[serde(default)]
    pub calls: u64,
}

/// Usage accounting attached to a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub models: Vec<ModelUsage>,
    #[serde(default, alias = "platform_tools", deserialize_with = "null_as_default")]
    pub platform_tools: Vec<PlatformToolUsage>,
}

impl Usage {
    pub fn total_tokens(&self) -> u64 {
        self.models.iter().map(|m| m.total_tokens).sum()
    }
}

/// A run as observed by the client. Only the server mutates runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    #[serde(alias = "run_id")]
    pub run_id: String,
    /// Create responses may omit the status; a freshly created run is queued.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Run {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The answer text, when the run succeeded.
    pub fn answer(&self) -> Option<&str> {
        match self.status {
            RunStatus::Succeeded => self.result.as_ref().map(|r| r.answer.as_str()),
            _ => None,
        }
    }
}

/// Input of a run: instructions, tools and optional output formats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInput {
    pub instructions: String,
    pub tools: Vec<Tool>,
    pub answer_format: Option<OutputSchema>,
    pub reasoning_format: Option<OutputSchema>,
}

impl RunInput {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            ..Default::default()
        }
    }

    pub fn tool(mut self, tool: impl Into<Tool>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn answer_format(mut self, schema: OutputSchema) -> Self {
        self.answer_format = Some(schema);
        self
    }

    pub fn reasoning_format(mut self, schema: OutputSchema) -> Self {
        self.reasoning_format = Some(schema);
        self
    }
}

/// Polling parameters for `wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between two `get` calls.
    pub interval: Duration,
    /// Maximum number of `get` calls, including the immediate first one.
    pub max_attempts: u32,
}

impl PollOptions {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

    pub fn new(interval_ms: u64, max_attempts: u32) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            max_attempts,
        }
    }

    pub fn interval_ms(mut self, ms: u64) -> Self {
        self.interval = Duration::from_millis(ms);
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Options for `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Poll until a terminal status before returning.
    pub await_completion: bool,
    /// Polling parameters used when `await_completion` is set. Falls back to the client's
    /// defaults when `None`.
    pub poll: Option<PollOptions>,
}

impl RunOptions {
    /// Options that wait for completion with the client's default polling.
    pub fn awaiting() -> Self {
        Self {
            await_completion: true,
            poll: None,
        }
    }

    pub fn with_poll(mut self, poll: PollOptions) -> Self {
        self.poll = Some(poll);
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<ReasoningNode>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<ReasoningNode>),
        One(Box<ReasoningNode>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::Many(nodes)) => nodes,
        Some(OneOrMany::One(node)) => vec![*node],
        None => Vec::new(),
    })
}
