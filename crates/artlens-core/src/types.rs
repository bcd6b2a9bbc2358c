//! Shared types for artlens poll payloads.
//!
//! Poll responses are decoded as [`serde_json::Value`] so they can be
//! validated field by field (see [`crate::validate`]). The structs here
//! are typed views built from those values once they are known to be
//! well-formed, plus the one-shot payloads (`/upload`, `/stats`,
//! `/ready_models`) that are decoded directly with serde.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chart::ChartError;

/// Number of intensity bins in each histogram channel.
pub const HISTOGRAM_BINS: usize = 256;

/// Wire names of the three histogram channels, in red/green/blue order.
pub const HISTOGRAM_FIELDS: [&str; 3] = ["histogram_r", "histogram_g", "histogram_b"];

/// Typed view of a `/progress/{task_id}` payload.
///
/// Built leniently from a decoded value: fields with the wrong type are
/// treated as absent. Call [`crate::validate_task_data`] first when the
/// distinction matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Overall progress in percent, 0 to 100.
    pub progress: f64,
    /// Human-readable status line (e.g. `"Preprocessing..."`, `"Complete"`).
    pub status: String,
    /// All step names, in display order.
    pub steps: Vec<String>,
    /// The step currently executing, if any.
    pub current_step: Option<String>,
    /// Steps that have finished.
    pub completed_steps: Vec<String>,
    /// Steps the backend gave up on after its per-step timeout.
    pub timed_out_steps: Vec<String>,
    /// Failure message when `status` is `"Error"` or `"Abandoned"`.
    pub error: Option<String>,
}

impl TaskStatus {
    /// Build a typed view from a decoded progress payload.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            progress: value.get("progress").and_then(Value::as_f64).unwrap_or(0.0),
            status: value
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            steps: string_list(value.get("steps")),
            current_step: value
                .get("current_step")
                .and_then(Value::as_str)
                .map(str::to_owned),
            completed_steps: string_list(value.get("completed_steps")),
            timed_out_steps: string_list(value.get("timed_out_steps")),
            error: value.get("error").and_then(Value::as_str).map(str::to_owned),
        }
    }
}

/// Collect the string elements of an optional JSON array.
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Typed view of the `partial_results` sub-object.
///
/// Every field is independently optional; results arrive in no
/// particular order while the backend works through its steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialResults {
    /// Red channel histogram (256 bins).
    pub histogram_r: Option<Vec<f64>>,
    /// Green channel histogram (256 bins).
    pub histogram_g: Option<Vec<f64>>,
    /// Blue channel histogram (256 bins).
    pub histogram_b: Option<Vec<f64>>,
    /// Probability in `[0, 1]` that the image is AI-generated.
    pub ai_probability: Option<f64>,
    /// Fractal dimension of the image.
    pub fd_default: Option<f64>,
    /// Server-relative path of the HOG visualization image.
    pub hog_image_url: Option<String>,
    /// Text verdict written by the "Insight Summary" step.
    pub summary: Option<String>,
}

impl PartialResults {
    /// Build a typed view from a decoded `partial_results` value.
    ///
    /// Fields with the wrong type (or histograms containing non-numbers)
    /// are treated as absent.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            histogram_r: number_list(value.get("histogram_r")),
            histogram_g: number_list(value.get("histogram_g")),
            histogram_b: number_list(value.get("histogram_b")),
            ai_probability: value.get("ai_probability").and_then(Value::as_f64),
            fd_default: value.get("fd_default").and_then(Value::as_f64),
            hog_image_url: value
                .get("hog_image_url")
                .and_then(Value::as_str)
                .map(str::to_owned),
            summary: value
                .get("summary")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }
}

/// Collect an optional JSON array of numbers, or `None` if any element
/// is not a number.
fn number_list(value: Option<&Value>) -> Option<Vec<f64>> {
    value?.as_array()?.iter().map(Value::as_f64).collect()
}

/// A complete red/green/blue histogram, each channel exactly
/// [`HISTOGRAM_BINS`] long.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramChannels {
    red: Vec<f64>,
    green: Vec<f64>,
    blue: Vec<f64>,
}

impl HistogramChannels {
    /// Create a histogram from three channels.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidInput`] if any channel does not have
    /// exactly [`HISTOGRAM_BINS`] bins.
    pub fn new(red: Vec<f64>, green: Vec<f64>, blue: Vec<f64>) -> Result<Self, ChartError> {
        for (name, channel) in HISTOGRAM_FIELDS.iter().zip([&red, &green, &blue]) {
            if channel.len() != HISTOGRAM_BINS {
                return Err(ChartError::InvalidInput(format!(
                    "{name} must have exactly {HISTOGRAM_BINS} bins, got {}",
                    channel.len()
                )));
            }
        }
        Ok(Self { red, green, blue })
    }

    /// Extract the three channels from a `partial_results` value.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidInput`] if a channel is missing, is
    /// not an array, contains a non-number, or has the wrong length.
    pub fn from_partial(partial: &Value) -> Result<Self, ChartError> {
        let mut channels = Vec::with_capacity(HISTOGRAM_FIELDS.len());
        for name in HISTOGRAM_FIELDS {
            let field = partial
                .get(name)
                .filter(|v| !v.is_null())
                .ok_or_else(|| ChartError::InvalidInput(format!("missing histogram channel {name}")))?;
            let items = field
                .as_array()
                .ok_or_else(|| ChartError::InvalidInput(format!("{name} must be an array")))?;
            let bins = items
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| ChartError::InvalidInput(format!("{name} must contain only numbers")))?;
            channels.push(bins);
        }
        let mut channels = channels.into_iter();
        match (channels.next(), channels.next(), channels.next()) {
            (Some(red), Some(green), Some(blue)) => Self::new(red, green, blue),
            _ => Err(ChartError::InvalidInput("missing histogram channels".into())),
        }
    }

    /// Red channel bins.
    #[must_use]
    pub fn red(&self) -> &[f64] {
        &self.red
    }

    /// Green channel bins.
    #[must_use]
    pub fn green(&self) -> &[f64] {
        &self.green
    }

    /// Blue channel bins.
    #[must_use]
    pub fn blue(&self) -> &[f64] {
        &self.blue
    }

    /// Largest bin count across all channels.
    #[must_use]
    pub fn max_count(&self) -> f64 {
        self.red
            .iter()
            .chain(&self.green)
            .chain(&self.blue)
            .copied()
            .fold(0.0, f64::max)
    }
}

/// Aggregate statistics over every image the backend has analyzed
/// (`GET /stats`).
///
/// All fields default to zero: the backend answers with only
/// `total_images` when its statistics table is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateStats {
    /// Mean image width in pixels.
    pub avg_width: f64,
    /// Mean image height in pixels.
    pub avg_height: f64,
    /// Mean red, green and blue channel values.
    pub avg_color: [f64; 3],
    /// Number of images analyzed so far.
    pub total_images: u64,
}

/// Response to `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Opaque identifier of the newly created task.
    pub task_id: String,
}

/// Response to `GET /ready_models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsStatus {
    /// `"ready"` once the backend has warmed up its models, `"loading"` before.
    pub status: String,
}

impl ModelsStatus {
    /// Whether the backend reports its models as ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}
