//! artlens-core: Incremental result consumption for image-analysis tasks (sans-IO).
//!
//! A task on the analysis backend computes several independent metrics
//! (color histogram, AI-generation probability, fractal dimension, HOG
//! visualization) and exposes them through repeated progress polls.
//! This crate turns those poll payloads into presentation state:
//!
//! validate task data -> validate partial results -> presentation
//! decisions -> chart construction (once) -> UI deltas.
//!
//! This crate has **no I/O dependencies** -- it operates on decoded JSON
//! values and returns structured data. HTTP transport and browser
//! interaction live in `artlens-io`.

pub mod chart;
pub mod config;
pub mod present;
pub mod session;
pub mod types;
pub mod validate;

pub use chart::{
    Chart, ChartError, ChartResource, ChartSlot, build_histogram_chart, build_stats_chart,
};
pub use config::{ClientConfig, ConfigError};
pub use present::{
    AiScore, ProgressBar, ScoreClass, StepStatus, StepView, TaskPhase, classify_ai_score,
    format_fractal_dimension, progress_bar, render_step_list, should_render_histogram,
    should_update_hog_image,
};
pub use session::{
    Frame, Orchestrator, PollUpdate, PresentationState, ResultsDelta, TaskTicket, resolve_url,
};
pub use types::{
    AggregateStats, HISTOGRAM_BINS, HistogramChannels, ModelsStatus, PartialResults, TaskStatus,
    UploadResponse,
};
pub use validate::{Validation, validate_partial_results, validate_task_data};
