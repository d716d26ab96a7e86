//! # Types Module
//!
//! Strongly-typed representations of everything that crosses the wire.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Run`] | A run as observed by the client |
//! | [`RunStatus`] | Lifecycle status, with terminal-state checks |
//! | [`RunInput`] | Instructions, tools and output formats for a new run |
//! | [`Tool`] | Platform, function or MCP tool descriptor |
//! | [`StreamEvent`] | Delta, done or error event of a run stream |
//!
//! ## Example
//!
//! ```rust
//! use subconscious::types::{FunctionTool, RunInput, Tool};
//! use serde_json::json;
//!
//! let input = RunInput::new("Find the latest release notes")
//!     .tool(Tool::platform("parallel_search"))
//!     .tool(FunctionTool::new(
//!         "lookup_ticket",
//!         json!({
//!             "type": "object",
//!             "properties": {"ticket_id": {"type": "string"}},
//!             "required": ["ticket_id"]
//!         }),
//!     ));
//! assert_eq!(input.tools.len(), 2);
//! ```

pub mod events;
pub mod run;
pub mod tool;

pub use events::StreamEvent;
pub use run::{
    engines, ModelUsage, PlatformToolUsage, PollOptions, ReasoningNode, Run, RunError,
    RunInput, RunOptions, RunResult, RunStatus, Usage,
};
pub use tool::{FunctionTool, HttpMethod, McpCapability, McpTool, PlatformTool, Tool};
