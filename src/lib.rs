//! # subconscious
//!
//! Async Rust client for the Subconscious run API.
//!
//! ## Overview
//!
//! A run is one invocation of a remote reasoning engine. The client submits runs, reads
//! their status, polls them to completion, cancels them, and streams their answer text as
//! it is produced. Responses are mapped to typed values and failures to a typed [`Error`].
//!
//! ## Key Features
//!
//! - **Run lifecycle**: [`Subconscious`] exposes `run`, `get`, `wait`, `cancel` and `stream`
//! - **Tool normalization**: function tools with caller-fixed `defaults` are validated and
//!   rewritten before submission via the [`tools`] module
//! - **Streaming**: incremental SSE decoding into [`StreamEvent`] values via [`streaming`]
//! - **Structured output**: strict answer schemas derived from Rust types via [`structured`]
//! - **Typed errors**: authentication, rate limit, validation, not found, timeout,
//!   connection and API errors stay distinguishable
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use subconscious::{engines, RunInput, RunOptions, Subconscious, Tool};
//!
//! #[tokio::main]
//! async fn main() -> subconscious::Result<()> {
//!     let client = Subconscious::from_env()?;
//!
//!     let input = RunInput::new("Summarize this week's Rust release notes")
//!         .tool(Tool::platform("parallel_search"));
//!     let run = client
//!         .run(engines::TIM_GPT, &input, RunOptions::awaiting())
//!         .await?;
//!
//!     println!("{}", run.answer().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Run lifecycle client and builder |
//! | [`transport`] | HTTP transport and the [`transport::Transport`] seam |
//! | [`streaming`] | SSE decoder for run streams |
//! | [`tools`] | Tool validation and default-argument normalization |
//! | [`structured`] | Strict JSON schemas for answer and reasoning formats |
//! | [`types`] | Runs, tools, usage and stream events |

pub mod client;
pub mod error_code;
pub mod streaming;
pub mod structured;
pub mod tools;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{RunStream, Subconscious, SubconsciousBuilder};
pub use error_code::ErrorCode;
pub use structured::OutputSchema;
pub use types::{
    engines, FunctionTool, HttpMethod, McpCapability, McpTool, PlatformTool, PollOptions,
    ReasoningNode, Run, RunInput, RunOptions, RunResult, RunStatus, StreamEvent, Tool, Usage,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

pub use tokio_util::sync::CancellationToken;
