//! Streaming support: SSE decoding of `POST /runs/stream` bodies.
//!
//! The decoder turns raw body chunks into [`crate::StreamEvent`] values and stops after
//! the first terminal event. [`crate::RunStream`] wraps its output for callers.

pub mod decode;

pub use decode::{decode_all, RunEventDecoder, MALFORMED_CHUNK, UNEXPECTED_EOF};
