//! Polling a run to completion.

use crate::client::core::{validate_run_id, Subconscious};
use crate::types::{PollOptions, Run};
use crate::{Error, ErrorContext, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

impl Subconscious {
    /// Poll a run until it reaches a terminal status.
    ///
    /// The first `get` happens immediately; later ones are spaced by `poll.interval`. At most
    /// `poll.max_attempts` requests are made before [`Error::Timeout`] is returned. A run the
    /// server itself timed out comes back as `Ok` with [`crate::RunStatus::TimedOut`].
    pub async fn wait(&self, run_id: &str, poll: Option<PollOptions>) -> Result<Run> {
        self.poll_until_terminal(run_id, poll.unwrap_or(self.default_poll), None)
            .await
    }

    /// [`Subconscious::wait`] that gives up with [`Error::Cancelled`] once `token` fires.
    ///
    /// Only the local wait stops; the run keeps going on the server unless
    /// [`Subconscious::cancel`] is called.
    pub async fn wait_with_cancel(
        &self,
        run_id: &str,
        poll: Option<PollOptions>,
        token: &CancellationToken,
    ) -> Result<Run> {
        self.poll_until_terminal(run_id, poll.unwrap_or(self.default_poll), Some(token))
            .await
    }

    pub(crate) async fn poll_until_terminal(
        &self,
        run_id: &str,
        poll: PollOptions,
        token: Option<&CancellationToken>,
    ) -> Result<Run> {
        validate_run_id(run_id)?;
        check_poll(&poll)?;

        let cancelled = || Error::Cancelled {
            run_id: run_id.to_string(),
        };

        let mut attempts = 0u32;
        loop {
            if token.map_or(false, CancellationToken::is_cancelled) {
                return Err(cancelled());
            }

            let run = self.get(run_id).await?;
            attempts += 1;
            if run.is_terminal() {
                debug!(run_id, attempts, status = %run.status, "run finished");
                return Ok(run);
            }
            if attempts >= poll.max_attempts {
                warn!(run_id, attempts, status = %run.status, "gave up waiting for run");
                return Err(Error::Timeout {
                    run_id: run_id.to_string(),
                    attempts,
                });
            }

            match token {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(cancelled()),
                        _ = tokio::time::sleep(poll.interval) => {}
                    }
                }
                None => tokio::time::sleep(poll.interval).await,
            }
        }
    }
}

pub(crate) fn check_poll(poll: &PollOptions) -> Result<()> {
    if poll.max_attempts == 0 {
        return Err(Error::validation_with_context(
            "max_attempts must be at least 1",
            ErrorContext::new()
                .with_field_path("options.max_attempts")
                .with_source("run_client"),
        ));
    }
    Ok(())
}
