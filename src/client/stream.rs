use crate::types::StreamEvent;
use crate::{BoxStream, Result};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Events of one streamed run.
///
/// Single-use: it ends after the first `Done` or `Error` event (or a transport error).
/// Dropping it before the end closes the HTTP connection.
pub struct RunStream {
    run_id: Option<String>,
    events: BoxStream<'static, StreamEvent>,
    finished: bool,
}

impl RunStream {
    pub(crate) fn new(run_id: Option<String>, events: BoxStream<'static, StreamEvent>) -> Self {
        Self {
            run_id,
            events,
            finished: false,
        }
    }

    /// Run id announced when the stream was opened. The final id is carried by
    /// [`StreamEvent::Done`].
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Stop reading and release the connection.
    pub fn close(self) {}
}

impl std::fmt::Debug for RunStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStream")
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl Stream for RunStream {
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = self.events.poll_next_unpin(cx);
        match &item {
            Poll::Ready(Some(Ok(event))) if event.is_terminal() => {
                debug!(run_id = ?self.run_id, event = ?event, "stream finished");
                self.finished = true;
            }
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => self.finished = true,
            _ => {}
        }
        item
    }
}

impl Drop for RunStream {
    fn drop(&mut self) {
        if !self.finished {
            debug!(run_id = ?self.run_id, "stream dropped before completion");
        }
    }
}
