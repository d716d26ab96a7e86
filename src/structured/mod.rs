//! Structured output support.
//!
//! Runs can constrain the shape of their answer and reasoning with JSON Schemas
//! (`answerFormat` / `reasoningFormat`). [`OutputSchema`] builds such schemas from Rust
//! types via `schemars` and checks hand-written ones with `jsonschema`.
//!
//! # Examples
//!
//! ```
//! use subconscious::structured::OutputSchema;
//! use schemars::JsonSchema;
//!
//! #[derive(JsonSchema)]
//! #[allow(dead_code)]
//! struct Verdict {
//!     answer: String,
//!     sources: Vec<String>,
//! }
//!
//! let schema = OutputSchema::from_type::<Verdict>();
//! assert_eq!(schema.as_value()["additionalProperties"], false);
//! ```

pub mod schema;

pub use schema::{json_schema_from_type, make_strict, OutputSchema};
