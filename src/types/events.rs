//! Events produced while streaming a run.

use serde::{Deserialize, Serialize};

/// One decoded event of a run stream. A stream ends after `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Incremental fragment of generated text.
    Delta { content: String },

    /// The run finished streaming.
    Done { run_id: String },

    /// The server reported an error, or the stream could not be decoded.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl StreamEvent {
    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }

    pub fn as_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta { content } => Some(content),
            _ => None,
        }
    }
}
