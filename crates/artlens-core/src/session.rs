//! Poll-consuming state machine.
//!
//! The [`Orchestrator`] owns the only state that persists across polls,
//! one [`PresentationState`] per active task, and turns each poll
//! payload into a [`PollUpdate`] describing exactly what the UI must
//! change. It performs no I/O: the caller issues the requests, awaits
//! them one at a time, and feeds every response back through
//! [`Orchestrator::apply`] together with the [`TaskTicket`] it was
//! issued for.
//!
//! Stale responses are filtered by ticket. Every [`begin`](Orchestrator::begin)
//! and [`cancel`](Orchestrator::cancel) bumps a generation counter, so a
//! response that was in flight when the user started another upload is
//! answered with [`PollUpdate::Stale`] and touches nothing.

use serde_json::Value;

use crate::chart::{Chart, build_histogram_chart};
use crate::present::{
    AiScore, DEFAULT_FRACTAL_DECIMALS, ProgressBar, StepView, TaskPhase, classify_ai_score,
    format_fractal_dimension, progress_bar, render_step_list, should_render_histogram,
    should_update_hog_image,
};
use crate::types::{HISTOGRAM_FIELDS, PartialResults, TaskStatus};
use crate::validate::{is_falsy, validate_partial_results, validate_task_data};

/// Render-once and dedup flags for one task.
///
/// Created when a task begins, discarded when it reaches a terminal
/// phase or another task begins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationState {
    /// Whether the histogram chart has been built for this task.
    pub histogram_rendered: bool,
    /// Source of the HOG image currently displayed, if any.
    pub last_hog_image_src: Option<String>,
}

/// Identifies the task (and generation) a poll response belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTicket {
    task_id: String,
    generation: u64,
}

impl TaskTicket {
    /// The backend's task identifier.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Generation this ticket was issued in.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// What changed in the results panel on one poll.
///
/// Fields are `None` when there is nothing to show or, for the chart and
/// the HOG image, nothing to change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsDelta {
    /// AI-generation score card.
    pub ai_score: Option<AiScore>,
    /// Formatted fractal dimension.
    pub fractal_dimension: Option<String>,
    /// New HOG image source. Only set when it differs from the one shown.
    pub hog_image_src: Option<String>,
    /// Text verdict from the insight summary step.
    pub summary: Option<String>,
    /// Histogram chart. Only set on the first poll with a valid,
    /// complete histogram.
    pub histogram_chart: Option<Chart>,
    /// Validation errors for partial-result fields that were dropped.
    pub rejected: Vec<String>,
}

impl ResultsDelta {
    /// Whether the delta changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ai_score.is_none()
            && self.fractal_dimension.is_none()
            && self.hog_image_src.is_none()
            && self.summary.is_none()
            && self.histogram_chart.is_none()
    }
}

/// Everything the UI needs to draw for one accepted poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Progress bar width and label.
    pub progress: ProgressBar,
    /// Status line.
    pub status: String,
    /// Step list with per-step status.
    pub steps: Vec<StepView>,
    /// Steps the backend gave up on.
    pub timed_out_steps: Vec<String>,
    /// Task lifecycle phase.
    pub phase: TaskPhase,
    /// Results panel changes.
    pub results: ResultsDelta,
}

/// Outcome of feeding one poll response to the [`Orchestrator`].
#[derive(Debug, Clone, PartialEq)]
pub enum PollUpdate {
    /// The response belongs to a cancelled or superseded task; ignore it.
    Stale,
    /// No payload (task not registered yet, or a transient failure).
    Pending,
    /// The task data failed validation; keep the previous progress.
    Invalid {
        /// Validation messages.
        errors: Vec<String>,
    },
    /// An accepted payload.
    Frame(Box<Frame>),
}

impl PollUpdate {
    /// Whether the caller should schedule another poll.
    #[must_use]
    pub fn should_continue(&self) -> bool {
        match self {
            Self::Stale => false,
            Self::Pending | Self::Invalid { .. } => true,
            Self::Frame(frame) => !frame.phase.is_terminal(),
        }
    }
}

#[derive(Debug)]
struct ActiveTask {
    task_id: String,
    state: PresentationState,
}

/// Owner of the per-task presentation state.
#[derive(Debug)]
pub struct Orchestrator {
    generation: u64,
    active: Option<ActiveTask>,
    resource_base: Option<String>,
    fractal_decimals: usize,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// An orchestrator with no active task.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            generation: 0,
            active: None,
            resource_base: None,
            fractal_decimals: DEFAULT_FRACTAL_DECIMALS,
        }
    }

    /// Resolve server-relative resource paths (the HOG image) against
    /// `base`, the way a browser resolves an `<img src>`.
    #[must_use]
    pub fn with_resource_base(mut self, base: impl Into<String>) -> Self {
        self.resource_base = Some(base.into());
        self
    }

    /// Decimal places for the fractal dimension.
    #[must_use]
    pub fn with_fractal_decimals(mut self, decimals: usize) -> Self {
        self.fractal_decimals = decimals;
        self
    }

    /// Start tracking `task_id`, discarding any previous task's state.
    pub fn begin(&mut self, task_id: impl Into<String>) -> TaskTicket {
        self.generation = self.generation.wrapping_add(1);
        let task_id = task_id.into();
        tracing::debug!(task_id = %task_id, generation = self.generation, "task started");
        self.active = Some(ActiveTask {
            task_id: task_id.clone(),
            state: PresentationState::default(),
        });
        TaskTicket {
            task_id,
            generation: self.generation,
        }
    }

    /// Stop tracking the current task. Every outstanding ticket becomes
    /// stale.
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(task) = self.active.take() {
            tracing::debug!(task_id = %task.task_id, "task cancelled");
        }
    }

    /// Whether `ticket` refers to the task currently being tracked.
    #[must_use]
    pub fn is_current(&self, ticket: &TaskTicket) -> bool {
        ticket.generation == self.generation
            && self
                .active
                .as_ref()
                .is_some_and(|task| task.task_id == ticket.task_id)
    }

    /// Presentation state of the active task.
    #[must_use]
    pub fn state(&self) -> Option<&PresentationState> {
        self.active.as_ref().map(|task| &task.state)
    }

    /// Consume one poll response for `ticket`.
    pub fn apply(&mut self, ticket: &TaskTicket, payload: Option<&Value>) -> PollUpdate {
        if !self.is_current(ticket) {
            tracing::debug!(task_id = %ticket.task_id, "ignoring stale poll response");
            return PollUpdate::Stale;
        }
        let Some(payload) = payload.filter(|p| !is_falsy(p)) else {
            return PollUpdate::Pending;
        };

        let validation = validate_task_data(Some(payload));
        if !validation.valid {
            tracing::warn!(errors = ?validation.errors, "invalid task data");
            return PollUpdate::Invalid {
                errors: validation.errors,
            };
        }

        let status = TaskStatus::from_value(payload);
        let phase = TaskPhase::from_status(&status);
        let steps = render_step_list(
            payload.get("steps").unwrap_or(&Value::Null),
            status.current_step.as_deref(),
            &status.completed_steps,
        );

        let decimals = self.fractal_decimals;
        let results = match self.active.as_mut() {
            Some(task) => results_delta(
                &mut task.state,
                payload.get("partial_results"),
                self.resource_base.as_deref(),
                decimals,
            ),
            None => ResultsDelta::default(),
        };

        if phase.is_terminal() {
            tracing::debug!(task_id = %ticket.task_id, ?phase, "task finished");
            self.active = None;
        }

        PollUpdate::Frame(Box::new(Frame {
            progress: progress_bar(Some(status.progress)),
            status: status.status,
            steps,
            timed_out_steps: status.timed_out_steps,
            phase,
            results,
        }))
    }
}

/// Decide the results-panel changes for one `partial_results` value.
///
/// Fields that fail validation are treated as not yet available; the
/// rest of the payload is still used.
fn results_delta(
    state: &mut PresentationState,
    partial: Option<&Value>,
    resource_base: Option<&str>,
    decimals: usize,
) -> ResultsDelta {
    let Some(partial) = partial.filter(|p| !is_falsy(p)) else {
        return ResultsDelta::default();
    };

    let validation = validate_partial_results(Some(partial));
    if !validation.valid {
        tracing::debug!(errors = ?validation.errors, "dropping invalid partial results");
    }
    let rejected = |field: &str| validation.errors.iter().any(|e| e.starts_with(field));
    let fields = PartialResults::from_value(partial);

    let mut delta = ResultsDelta::default();

    if !rejected("ai_probability") {
        delta.ai_score = classify_ai_score(fields.ai_probability);
    }
    if !rejected("fd_default") {
        delta.fractal_dimension = format_fractal_dimension(fields.fd_default, decimals);
    }

    if !rejected("summary") {
        delta.summary = fields.summary.filter(|s| !s.trim().is_empty());
    }

    if !rejected("hog_image_url")
        && let Some(url) = fields.hog_image_url.as_deref().filter(|u| !u.is_empty())
    {
        let src = resolve_url(resource_base, url);
        if should_update_hog_image(state.last_hog_image_src.as_deref(), Some(&src)) {
            state.last_hog_image_src = Some(src.clone());
            delta.hog_image_src = Some(src);
        }
    }

    let histogram_ok = HISTOGRAM_FIELDS.iter().all(|name| !rejected(name));
    if histogram_ok && should_render_histogram(Some(partial), state.histogram_rendered) {
        match build_histogram_chart(partial) {
            Ok(chart) => {
                state.histogram_rendered = true;
                delta.histogram_chart = Some(chart);
            }
            Err(e) => {
                tracing::warn!(error = %e, "histogram chart not built");
                delta.rejected.push(e.to_string());
            }
        }
    }

    delta.rejected.extend(validation.errors);
    delta
}

/// Resolve a server-relative path against `base`.
///
/// Absolute `http(s)` URLs, and any path when there is no base, are
/// returned unchanged.
#[must_use]
pub fn resolve_url(base: Option<&str>, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    match base {
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        None => path.to_owned(),
    }
}
