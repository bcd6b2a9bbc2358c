//! Presentation decisions derived from validated poll data.
//!
//! Every function here is pure. State that must persist across polls
//! (whether the histogram was already drawn, which HOG image is showing)
//! is passed in by the caller rather than read from anywhere global; see
//! [`crate::session`] for the owner of that state.

use std::fmt;

use serde_json::Value;

use crate::types::TaskStatus;

/// Probability below which an image is classified as human-made.
pub const SAFE_BELOW: f64 = 0.3;

/// Probability at or above which an image is classified as AI-generated.
pub const DANGER_FROM: f64 = 0.7;

/// Default number of decimals for fractal dimension display.
pub const DEFAULT_FRACTAL_DECIMALS: usize = 4;

/// Band an AI-generation probability falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreClass {
    /// `[0, 0.3)`: likely human-created.
    Safe,
    /// `[0.3, 0.7)`: mixed indicators.
    Warning,
    /// `[0.7, 1]`: likely AI-generated.
    Danger,
}

impl ScoreClass {
    /// Classify a probability. Intervals are right-open, so the
    /// boundaries 0.3 and 0.7 belong to the higher band.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability < SAFE_BELOW {
            Self::Safe
        } else if probability < DANGER_FROM {
            Self::Warning
        } else {
            Self::Danger
        }
    }

    /// Short class name: `"safe"`, `"warning"` or `"danger"`.
    #[must_use]
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }

    /// CSS class used by the score card.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Safe => "ai-score-safe",
            Self::Warning => "ai-score-warning",
            Self::Danger => "ai-score-danger",
        }
    }

    /// User-facing verdict for the band.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Safe => "Likely Human-Created / Authentic Art",
            Self::Warning => "Uncertain / Mixed Indicators",
            Self::Danger => "High Likelihood of AI Generation",
        }
    }
}

impl fmt::Display for ScoreClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// Display data for the AI-generation score card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiScore {
    /// Probability in percent with exactly one decimal (e.g. `"12.3"`).
    pub percent: String,
    /// Band the probability falls into.
    pub class: ScoreClass,
    /// User-facing verdict.
    pub description: &'static str,
}

/// Classify an AI-generation probability for display.
///
/// Returns `None` for an absent or non-finite probability; non-finite
/// values are logged since they indicate a backend problem.
#[must_use]
pub fn classify_ai_score(probability: Option<f64>) -> Option<AiScore> {
    let probability = probability?;
    if !probability.is_finite() {
        tracing::warn!(probability, "invalid AI probability");
        return None;
    }
    let class = ScoreClass::from_probability(probability);
    Some(AiScore {
        percent: to_fixed(probability * 100.0, 1),
        class,
        description: class.description(),
    })
}

/// Decide whether the histogram chart should be built on this poll.
///
/// This is the render-once gate: once `already_rendered` is set the
/// answer is always `false`, however many polls deliver the same
/// histogram. Otherwise all three channels must be present as arrays.
/// Channel lengths are the validator's concern and are not re-checked.
#[must_use]
pub fn should_render_histogram(partial: Option<&Value>, already_rendered: bool) -> bool {
    if already_rendered {
        return false;
    }
    let Some(partial) = partial else {
        return false;
    };
    ["histogram_r", "histogram_g", "histogram_b"]
        .iter()
        .all(|name| partial.get(name).is_some_and(Value::is_array))
}

/// Format a fractal dimension with a fixed number of decimals.
///
/// Returns `None` for an absent or non-finite value.
#[must_use]
pub fn format_fractal_dimension(value: Option<f64>, decimals: usize) -> Option<String> {
    let value = value?;
    if !value.is_finite() {
        tracing::warn!(value, "invalid fractal dimension");
        return None;
    }
    Some(to_fixed(value, decimals))
}

/// Most fraction digits [`to_fixed`] produces.
const MAX_FIXED_DECIMALS: usize = 100;

/// Format `value` with `decimals` fraction digits the way a browser's
/// `Number.prototype.toFixed` does: the exact binary value is rounded, and
/// a value exactly halfway between two outputs rounds away from zero.
/// `format!("{:.N}")` would round such ties to even instead.
///
/// `decimals` is capped at 100. Magnitudes of 1e21 and above are written
/// out in full rather than in exponent form.
fn to_fixed(value: f64, decimals: usize) -> String {
    let decimals = decimals.min(MAX_FIXED_DECIMALS);
    // 1074 fraction digits represent every finite f64 exactly.
    let exact = format!("{:.1074}", value.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(decimals))
        .collect();
    if frac_part.as_bytes().get(decimals).is_some_and(|&d| d >= b'5') {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let int_len = digits.len() - decimals;
    let mut out = String::with_capacity(digits.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.extend(digits[..int_len].iter().map(|&d| char::from(d)));
    if decimals > 0 {
        out.push('.');
        out.extend(digits[int_len..].iter().map(|&d| char::from(d)));
    }
    out
}

/// Decide whether the displayed HOG image must be swapped.
///
/// A browser resolves a relative `src` to an absolute URL, so the
/// currently displayed source is compared by suffix: `http://host/x.png`
/// already shows `/x.png`. Reassigning it anyway would reload the image
/// on every poll.
#[must_use]
pub fn should_update_hog_image(current_src: Option<&str>, new_url: Option<&str>) -> bool {
    let Some(new_url) = new_url.filter(|u| !u.is_empty()) else {
        return false;
    };
    match current_src.filter(|c| !c.is_empty()) {
        None => true,
        Some(current) => !current.ends_with(new_url),
    }
}

/// Status of one step in the progress list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    /// The step has finished.
    Done,
    /// The step is executing now.
    Active,
    /// The step has not started.
    Pending,
}

impl StepStatus {
    /// Resolve a step's status. Completion is checked before
    /// current-ness, so a step reported both completed and current
    /// (stale data) is shown as done.
    #[must_use]
    pub fn resolve(step: &str, current_step: Option<&str>, completed_steps: &[String]) -> Self {
        if completed_steps.iter().any(|c| c == step) {
            Self::Done
        } else if current_step == Some(step) {
            Self::Active
        } else {
            Self::Pending
        }
    }

    /// Lowercase name: `"done"`, `"active"` or `"pending"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Active => "active",
            Self::Pending => "pending",
        }
    }

    /// Glyph shown next to the step name.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Done => "✓",
            Self::Active => "➤",
            Self::Pending => "•",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the rendered step list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    /// Step name.
    pub name: String,
    /// Resolved status.
    pub status: StepStatus,
    /// Glyph for `status`.
    pub icon: &'static str,
    /// Whether the step is the current one (shown in bold).
    pub is_bold: bool,
}

/// Build the step list for display.
///
/// `steps` is the raw `steps` field of a poll payload; anything other
/// than an array yields an empty list.
#[must_use]
pub fn render_step_list(
    steps: &Value,
    current_step: Option<&str>,
    completed_steps: &[String],
) -> Vec<StepView> {
    let Some(steps) = steps.as_array() else {
        return Vec::new();
    };
    steps
        .iter()
        .map(|step| {
            let name = step
                .as_str()
                .map_or_else(|| step.to_string(), str::to_owned);
            let status = StepStatus::resolve(&name, current_step, completed_steps);
            StepView {
                is_bold: current_step == Some(name.as_str()),
                icon: status.icon(),
                status,
                name,
            }
        })
        .collect()
}

/// Width and label of the progress bar.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressBar {
    /// Fill width in percent, clamped to `[0, 100]`.
    pub percent: f64,
    /// Text shown on the bar, e.g. `"42%"`.
    pub label: String,
}

/// Clamp a progress value for the progress bar.
///
/// Absent or NaN progress shows as 0%.
#[must_use]
pub fn progress_bar(percent: Option<f64>) -> ProgressBar {
    let percent = match percent {
        Some(p) if !p.is_nan() => p.clamp(0.0, 100.0).abs(),
        _ => 0.0,
    };
    ProgressBar {
        percent,
        label: format!("{percent}%"),
    }
}

/// Lifecycle phase of a task as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPhase {
    /// Still working; keep polling.
    Running,
    /// All steps finished.
    Complete,
    /// The backend reported an error.
    Failed(String),
    /// The backend abandoned the task because a newer upload replaced it.
    Abandoned,
}

impl TaskPhase {
    /// Derive the phase from a task status.
    #[must_use]
    pub fn from_status(status: &TaskStatus) -> Self {
        match status.status.as_str() {
            "Error" => Self::Failed(
                status
                    .error
                    .clone()
                    .unwrap_or_else(|| "analysis failed".into()),
            ),
            "Abandoned" => Self::Abandoned,
            "Complete" => Self::Complete,
            _ if status.progress >= 100.0 => Self::Complete,
            _ => Self::Running,
        }
    }

    /// Whether polling should stop.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}
