//! Serial progress polling.
//!
//! One request is in flight at a time: the next poll is issued only
//! after the previous one resolved and the interval elapsed, so a slow
//! response can never overtake a newer one. The sleep is injected so the
//! same loop runs on tokio natively and on browser timers in wasm.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use artlens_core::ClientConfig;
use serde_json::Value;

use crate::transport::Transport;

/// Something that can be asked for a task's progress payload.
pub trait ProgressSource {
    /// Fetch the current payload, or `None` if there is nothing to show
    /// yet.
    fn progress(&self, task_id: &str) -> impl Future<Output = Option<Value>>;
}

impl ProgressSource for Transport {
    async fn progress(&self, task_id: &str) -> Option<Value> {
        self.get_progress(task_id).await
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The payload handler asked to stop.
    Stopped {
        /// Requests issued.
        polls: u32,
    },
    /// The configured request limit was reached first.
    Exhausted {
        /// Requests issued.
        polls: u32,
    },
}

impl PollOutcome {
    /// Requests issued before the loop ended.
    #[must_use]
    pub const fn polls(self) -> u32 {
        match self {
            Self::Stopped { polls } | Self::Exhausted { polls } => polls,
        }
    }
}

/// Drives a [`ProgressSource`] at a fixed interval.
#[derive(Debug, Clone)]
pub struct Poller<S> {
    source: S,
    interval: Duration,
    max_polls: Option<u32>,
}

impl<S: ProgressSource> Poller<S> {
    /// A poller using the interval and request limit from `config`.
    #[must_use]
    pub fn new(source: S, config: &ClientConfig) -> Self {
        Self {
            source,
            interval: config.poll_interval(),
            max_polls: config.max_polls,
        }
    }

    /// The underlying progress source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Poll `task_id` until `on_payload` breaks or the request limit is
    /// reached.
    ///
    /// `on_payload` sees every response, including `None`. `sleep` is
    /// awaited between requests, never before the first or after the
    /// last.
    pub async fn run<Sl, SlFut, F>(
        &self,
        task_id: &str,
        mut sleep: Sl,
        mut on_payload: F,
    ) -> PollOutcome
    where
        Sl: FnMut(Duration) -> SlFut,
        SlFut: Future<Output = ()>,
        F: FnMut(Option<Value>) -> ControlFlow<()>,
    {
        let mut polls: u32 = 0;
        loop {
            let payload = self.source.progress(task_id).await;
            polls = polls.saturating_add(1);
            tracing::debug!(task_id, polls, found = payload.is_some(), "progress poll");

            if on_payload(payload).is_break() {
                return PollOutcome::Stopped { polls };
            }
            if self.max_polls.is_some_and(|max| polls >= max) {
                tracing::warn!(task_id, polls, "poll limit reached");
                return PollOutcome::Exhausted { polls };
            }
            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn outcome_reports_polls() {
        assert_eq!(PollOutcome::Stopped { polls: 3 }.polls(), 3);
        assert_eq!(PollOutcome::Exhausted { polls: 7 }.polls(), 7);
    }
}
