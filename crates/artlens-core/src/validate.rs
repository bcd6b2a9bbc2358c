//! Validation of task-status and partial-result payloads.
//!
//! Validation errors are data, never `Err`: a malformed poll response is
//! an expected condition while a task is running, and the caller decides
//! how to degrade (skip the progress update, treat results as not yet
//! available). All violations are collected rather than stopping at the
//! first one, and the messages are stable because the UI surfaces them
//! verbatim in its diagnostics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{HISTOGRAM_BINS, HISTOGRAM_FIELDS};

/// Outcome of validating one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    /// `true` iff `errors` is empty.
    pub valid: bool,
    /// Human-readable description of every violation found.
    pub errors: Vec<String>,
}

impl Validation {
    /// Build a validation outcome from a list of errors.
    #[must_use]
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// A passing validation with no errors.
    #[must_use]
    pub fn ok() -> Self {
        Self::from_errors(Vec::new())
    }
}

/// Whether a payload counts as "not provided".
///
/// `null`, `false`, `0` and `""` are all treated as absent, matching the
/// truthiness test of the backend's own web client.
pub(crate) fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Validate a `/progress/{task_id}` payload.
///
/// Absent input fails closed with `"No task data provided"`. Otherwise
/// `progress` must be a number in `[0, 100]`, `steps` an array and
/// `status` a string; each is checked independently.
#[must_use]
pub fn validate_task_data(data: Option<&Value>) -> Validation {
    let Some(data) = data.filter(|d| !is_falsy(d)) else {
        return Validation::from_errors(vec!["No task data provided".into()]);
    };

    let mut errors = Vec::new();

    match data.get("progress").and_then(Value::as_f64) {
        None => errors.push("Invalid progress: must be a number".into()),
        Some(progress) if !(0.0..=100.0).contains(&progress) => {
            errors.push("Invalid progress: must be between 0 and 100".into());
        }
        Some(_) => {}
    }

    if !data.get("steps").is_some_and(Value::is_array) {
        errors.push("Invalid steps: must be an array".into());
    }

    if !data.get("status").is_some_and(Value::is_string) {
        errors.push("Invalid status: must be a string".into());
    }

    Validation::from_errors(errors)
}

/// Validate the `partial_results` sub-object of a progress payload.
///
/// Absent input is valid: no results yet is a normal state. Each field
/// is checked only when present. A field present as `null` is how a
/// non-finite float survives JSON encoding, so numeric fields holding
/// `null` are reported as non-finite.
#[must_use]
pub fn validate_partial_results(data: Option<&Value>) -> Validation {
    let Some(data) = data.filter(|d| !is_falsy(d)) else {
        return Validation::ok();
    };

    let mut errors = Vec::new();

    for name in HISTOGRAM_FIELDS {
        if let Some(channel) = data.get(name) {
            check_histogram(name, channel, &mut errors);
        }
    }

    if let Some(prob) = data.get("ai_probability") {
        match finite_number("ai_probability", prob) {
            Ok(p) if !(0.0..=1.0).contains(&p) => {
                errors.push("ai_probability must be between 0 and 1".into());
            }
            Ok(_) => {}
            Err(e) => errors.push(e),
        }
    }

    if let Some(fd) = data.get("fd_default")
        && let Err(e) = finite_number("fd_default", fd)
    {
        errors.push(e);
    }

    if let Some(url) = data.get("hog_image_url")
        && !url.is_string()
    {
        errors.push("hog_image_url must be a string".into());
    }

    // The summary step may not have run yet; `null` counts as absent.
    if let Some(summary) = data.get("summary")
        && !summary.is_null()
        && !summary.is_string()
    {
        errors.push("summary must be a string".into());
    }

    Validation::from_errors(errors)
}

fn check_histogram(name: &str, channel: &Value, errors: &mut Vec<String>) {
    let Some(bins) = channel.as_array() else {
        errors.push(format!("{name} must be an array"));
        return;
    };
    if bins.len() != HISTOGRAM_BINS {
        errors.push(format!("{name} must have exactly {HISTOGRAM_BINS} bins"));
        return;
    }
    if !bins
        .iter()
        .all(|b| b.as_f64().is_some_and(|v| v.is_finite() && v >= 0.0))
    {
        errors.push(format!("{name} must contain only non-negative numbers"));
    }
}

fn finite_number(name: &str, value: &Value) -> Result<f64, String> {
    match value {
        Value::Null => Err(format!("{name} must be a finite number")),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| format!("{name} must be a finite number")),
        _ => Err(format!("{name} must be a number")),
    }
}
