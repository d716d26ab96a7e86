//! Server-sent event decoder for run streams (Bytes -> StreamEvent).
//!
//! Frames are separated by a blank line. Within a frame, `:` lines are comments,
//! `event:` sets the event type and `data:` lines carry the payload:
//!
//! - `[DONE]` ends the stream with a `Done` event;
//! - `{"run_id": ...}` is a meta frame that only updates the run id;
//! - an `error` event type or an `error` key yields an `Error` event;
//! - `choices[0].delta.content` yields a `Delta`;
//! - anything that is not UTF-8 or JSON yields one `Error` event.
//!
//! The decoded stream ends right after the first `Done` or `Error`, dropping the input.

use crate::types::events::StreamEvent;
use crate::{BoxStream, Result};
use bytes::{Buf, Bytes, BytesMut};
use futures::{stream, StreamExt};
use serde_json::Value;

/// Code attached to events produced for undecodable frames.
pub const MALFORMED_CHUNK: &str = "malformed_chunk";
/// Code attached to the event produced when the body ends without `[DONE]`.
pub const UNEXPECTED_EOF: &str = "unexpected_eof";

const DONE_SIGNAL: &str = "[DONE]";

pub struct RunEventDecoder {
    run_id: String,
}

impl RunEventDecoder {
    /// `run_id` seeds the id reported by `Done` until a meta frame replaces it.
    pub fn new(run_id: Option<String>) -> Self {
        Self {
            run_id: run_id.unwrap_or_default(),
        }
    }

    pub fn decode(self, input: BoxStream<'static, Bytes>) -> BoxStream<'static, StreamEvent> {
        let state = DecodeState {
            input: Some(input),
            buf: BytesMut::new(),
            run_id: self.run_id,
            eof: false,
        };

        let stream = stream::unfold(state, |mut state| async move {
            loop {
                if let Some(frame) = next_frame(&mut state.buf) {
                    match interpret_frame(&frame, &mut state.run_id) {
                        Frame::Skip => continue,
                        Frame::Event(event) => {
                            if event.is_terminal() {
                                state.finish();
                            }
                            return Some((Ok(event), state));
                        }
                    }
                }

                if state.eof {
                    state.finish();
                    return Some((
                        Ok(StreamEvent::Error {
                            message: "stream closed before completion".to_string(),
                            code: Some(UNEXPECTED_EOF.to_string()),
                        }),
                        state,
                    ));
                }

                let input = state.input.as_mut()?;
                match input.next().await {
                    Some(Ok(bytes)) => state.push(&bytes),
                    Some(Err(e)) => {
                        state.finish();
                        return Some((Err(e), state));
                    }
                    None => {
                        state.input = None;
                        state.eof = true;
                        state.push(b"\n\n");
                    }
                }
            }
        });

        Box::pin(stream.fuse())
    }
}

struct DecodeState {
    /// `None` once the stream is finished; dropping it releases the connection.
    input: Option<BoxStream<'static, Bytes>>,
    buf: BytesMut,
    run_id: String,
    eof: bool,
}

impl DecodeState {
    fn push(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().copied().filter(|b| *b != b'\r'));
    }

    fn finish(&mut self) {
        self.input = None;
        self.eof = false;
        self.buf.clear();
    }
}

enum Frame {
    Skip,
    Event(StreamEvent),
}

fn next_frame(buf: &mut BytesMut) -> Option<BytesMut> {
    let idx = buf.windows(2).position(|w| w == b"\n\n")?;
    let frame = buf.split_to(idx);
    buf.advance(2);
    Some(frame)
}

fn malformed(reason: impl std::fmt::Display) -> Frame {
    Frame::Event(StreamEvent::Error {
        message: format!("malformed stream chunk: {}", reason),
        code: Some(MALFORMED_CHUNK.to_string()),
    })
}

fn interpret_frame(frame: &[u8], run_id: &mut String) -> Frame {
    let text = match std::str::from_utf8(frame) {
        Ok(t) => t,
        Err(e) => return malformed(e),
    };

    let mut is_error = false;
    let mut data_lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            is_error = rest.trim() == "error";
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        return Frame::Skip;
    }

    let data = data_lines.join("\n");
    let data = data.trim();
    if data == DONE_SIGNAL {
        return Frame::Event(StreamEvent::Done {
            run_id: run_id.clone(),
        });
    }

    let payload: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return malformed(e),
    };

    if is_error {
        return Frame::Event(error_event(&payload));
    }
    if !payload.is_object() {
        return malformed(format_args!("expected a JSON object, got `{}`", data));
    }
    if let Some(id) = payload.get("run_id").and_then(Value::as_str) {
        *run_id = id.to_string();
        return Frame::Skip;
    }
    if payload.get("error").is_some() {
        return Frame::Event(error_event(&payload));
    }

    match payload
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
    {
        Some(content) if !content.is_empty() => Frame::Event(StreamEvent::Delta {
            content: content.to_string(),
        }),
        _ => Frame::Skip,
    }
}

fn error_event(payload: &Value) -> StreamEvent {
    let error = payload.get("error");
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let message = non_empty(payload.get("details"))
        .or_else(|| non_empty(error))
        .or_else(|| non_empty(error.and_then(|e| e.get("message"))))
        .or_else(|| non_empty(payload.get("message")))
        .unwrap_or_else(|| "Unknown error".to_string());
    let code = non_empty(payload.get("code"))
        .or_else(|| non_empty(error.and_then(|e| e.get("code"))));

    StreamEvent::Error { message, code }
}

/// Decode a complete in-memory body. Mostly useful for tests and benchmarks.
pub async fn decode_all(
    body: impl Into<Bytes>,
    run_id: Option<String>,
) -> Vec<Result<StreamEvent>> {
    let input: BoxStream<'static, Bytes> = Box::pin(stream::iter(vec![Ok(body.into())]));
    RunEventDecoder::new(run_id).decode(input).collect().await
}
