//! Chart construction for the histogram and aggregate-statistics views.
//!
//! A [`Chart`] is plain data (axes, tick values, series and their
//! colors) that renders to an SVG document through the [`svg`] crate.
//! Building one is comparatively expensive and the result is meant to
//! be mounted once, so the caller gates construction (see
//! [`crate::should_render_histogram`]) and owns the artifact's lifetime
//! through a [`ChartSlot`].

use std::fmt;

use serde_json::Value;
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Group, Line, Path, Rectangle, Text};

use crate::types::{AggregateStats, HISTOGRAM_BINS, HistogramChannels};

/// Upper bound on the number of ticks along any axis.
pub const MAX_TICKS: usize = 10;

/// Rendered SVG width in user units.
const WIDTH: f64 = 640.0;
/// Rendered SVG height in user units.
const HEIGHT: f64 = 360.0;
/// Plot area margins: top (legend), right, bottom (tick labels + title), left.
const MARGIN_TOP: f64 = 40.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_BOTTOM: f64 = 52.0;
const MARGIN_LEFT: f64 = 64.0;

/// Errors raised while building a chart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChartError {
    /// The input data does not satisfy the chart's preconditions.
    #[error("invalid chart input: {0}")]
    InvalidInput(String),
}

/// An RGBA color, rendered in CSS `rgba()` notation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
    /// Opacity in `[0, 1]`.
    pub a: f32,
}

impl Rgba {
    /// Create a color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// The same color with a different opacity.
    #[must_use]
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

const RED: Rgba = Rgba::new(255, 99, 132, 1.0);
const TEAL: Rgba = Rgba::new(75, 192, 192, 1.0);
const BLUE: Rgba = Rgba::new(54, 162, 235, 1.0);
const PURPLE: Rgba = Rgba::new(153, 102, 255, 1.0);

/// Stroke and fill of one series (or one bar).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesColor {
    /// Line / outline color.
    pub stroke: Rgba,
    /// Area / bar fill color.
    pub fill: Rgba,
}

/// One data series.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Legend label.
    pub label: String,
    /// Data points, one per x position (line) or category (bar).
    pub values: Vec<f64>,
    /// Colors; bars cycle through the list, lines use the first entry.
    pub colors: Vec<SeriesColor>,
}

impl Series {
    fn color_at(&self, index: usize) -> Option<SeriesColor> {
        if self.colors.is_empty() {
            None
        } else {
            Some(self.colors[index % self.colors.len()])
        }
    }
}

/// One chart axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// Axis title, if shown.
    pub title: Option<String>,
    /// Value at the start of the axis.
    pub min: f64,
    /// Value at the end of the axis.
    pub max: f64,
    /// Values at which tick labels are drawn.
    pub ticks: Vec<f64>,
}

/// Chart type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    /// Filled line series over a numeric x axis.
    Line,
    /// One bar per category.
    Bar,
}

/// A chart ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    kind: ChartKind,
    categories: Vec<String>,
    x_axis: Axis,
    y_axis: Axis,
    series: Vec<Series>,
}

impl Chart {
    /// Chart type.
    #[must_use]
    pub const fn kind(&self) -> ChartKind {
        self.kind
    }

    /// Category labels along the x axis (bar charts only).
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Horizontal axis.
    #[must_use]
    pub const fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// Vertical axis.
    #[must_use]
    pub const fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// Data series in legend order.
    #[must_use]
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Render the chart as a standalone SVG document.
    #[must_use]
    pub fn to_svg(&self) -> String {
        let mut doc = Document::new()
            .set("viewBox", (0.0, 0.0, WIDTH, HEIGHT))
            .set("width", WIDTH)
            .set("height", HEIGHT)
            .set("font-family", "sans-serif")
            .set("font-size", 11);

        doc = doc.add(self.legend()).add(self.grid());

        let plot = match self.kind {
            ChartKind::Line => self.line_series(),
            ChartKind::Bar => self.bars(),
        };
        doc = doc.add(plot).add(self.axes());

        format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
    }

    fn plot_width() -> f64 {
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn plot_height() -> f64 {
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
    }

    fn x_pos(&self, value: f64) -> f64 {
        let span = (self.x_axis.max - self.x_axis.min).max(f64::EPSILON);
        MARGIN_LEFT + (value - self.x_axis.min) / span * Self::plot_width()
    }

    fn y_pos(&self, value: f64) -> f64 {
        let span = (self.y_axis.max - self.y_axis.min).max(f64::EPSILON);
        HEIGHT - MARGIN_BOTTOM - (value - self.y_axis.min) / span * Self::plot_height()
    }

    #[allow(clippy::cast_precision_loss)]
    fn legend(&self) -> Group {
        let mut group = Group::new().set("class", "legend");
        let slot = Self::plot_width() / self.series.len().max(1) as f64;
        for (i, series) in self.series.iter().enumerate() {
            let x = (i as f64).mul_add(slot, MARGIN_LEFT);
            let swatch = series.color_at(0).map_or(RED, |c| c.stroke);
            group = group
                .add(
                    Rectangle::new()
                        .set("x", x)
                        .set("y", 12)
                        .set("width", 12)
                        .set("height", 12)
                        .set("fill", swatch.to_string()),
                )
                .add(
                    Text::new(series.label.clone())
                        .set("x", x + 18.0)
                        .set("y", 22),
                );
        }
        group
    }

    fn grid(&self) -> Group {
        let mut group = Group::new()
            .set("class", "grid")
            .set("stroke", "#e0e0e0")
            .set("stroke-width", 1);
        for &tick in &self.y_axis.ticks {
            let y = self.y_pos(tick);
            group = group.add(
                Line::new()
                    .set("x1", MARGIN_LEFT)
                    .set("y1", y)
                    .set("x2", WIDTH - MARGIN_RIGHT)
                    .set("y2", y),
            );
        }
        group
    }

    #[allow(clippy::cast_precision_loss)]
    fn line_series(&self) -> Group {
        let mut group = Group::new().set("class", "series");
        let base = self.y_pos(self.y_axis.min);
        for series in &self.series {
            let Some(color) = series.color_at(0) else {
                continue;
            };
            if series.values.is_empty() {
                continue;
            }
            let points: Vec<(f64, f64)> = series
                .values
                .iter()
                .enumerate()
                .map(|(i, &v)| (self.x_pos(i as f64), self.y_pos(v)))
                .collect();

            let mut area = Data::new().move_to((points[0].0, base));
            let mut line = Data::new().move_to(points[0]);
            for &p in &points {
                area = area.line_to(p);
            }
            for &p in &points[1..] {
                line = line.line_to(p);
            }
            let last_x = points[points.len() - 1].0;
            area = area.line_to((last_x, base)).close();

            group = group
                .add(
                    Path::new()
                        .set("d", area)
                        .set("fill", color.fill.to_string())
                        .set("stroke", "none"),
                )
                .add(
                    Path::new()
                        .set("d", line)
                        .set("fill", "none")
                        .set("stroke", color.stroke.to_string())
                        .set("stroke-width", 1),
                );
        }
        group
    }

    #[allow(clippy::cast_precision_loss)]
    fn bars(&self) -> Group {
        let mut group = Group::new().set("class", "bars");
        let Some(series) = self.series.first() else {
            return group;
        };
        let count = series.values.len().max(1) as f64;
        let slot = Self::plot_width() / count;
        let bar_width = slot * 0.6;
        let base = self.y_pos(self.y_axis.min);
        for (i, &value) in series.values.iter().enumerate() {
            let Some(color) = series.color_at(i) else {
                continue;
            };
            let top = self.y_pos(value);
            let x = (i as f64).mul_add(slot, MARGIN_LEFT) + (slot - bar_width) / 2.0;
            group = group.add(
                Rectangle::new()
                    .set("x", x)
                    .set("y", top.min(base))
                    .set("width", bar_width)
                    .set("height", (base - top).abs())
                    .set("fill", color.fill.to_string())
                    .set("stroke", color.stroke.to_string())
                    .set("stroke-width", 1),
            );
        }
        group
    }

    #[allow(clippy::cast_precision_loss)]
    fn axes(&self) -> Group {
        let bottom = HEIGHT - MARGIN_BOTTOM;
        let mut group = Group::new()
            .set("class", "axes")
            .add(
                Line::new()
                    .set("x1", MARGIN_LEFT)
                    .set("y1", bottom)
                    .set("x2", WIDTH - MARGIN_RIGHT)
                    .set("y2", bottom)
                    .set("stroke", "#666666"),
            )
            .add(
                Line::new()
                    .set("x1", MARGIN_LEFT)
                    .set("y1", MARGIN_TOP)
                    .set("x2", MARGIN_LEFT)
                    .set("y2", bottom)
                    .set("stroke", "#666666"),
            );

        for &tick in &self.y_axis.ticks {
            group = group.add(
                Text::new(format_tick(tick))
                    .set("x", MARGIN_LEFT - 6.0)
                    .set("y", self.y_pos(tick) + 4.0)
                    .set("text-anchor", "end"),
            );
        }

        match self.kind {
            ChartKind::Line => {
                for &tick in &self.x_axis.ticks {
                    group = group.add(
                        Text::new(format_tick(tick))
                            .set("x", self.x_pos(tick))
                            .set("y", bottom + 16.0)
                            .set("text-anchor", "middle"),
                    );
                }
            }
            ChartKind::Bar => {
                let slot = Self::plot_width() / self.categories.len().max(1) as f64;
                for (i, label) in self.categories.iter().enumerate() {
                    group = group.add(
                        Text::new(label.clone())
                            .set("x", (i as f64 + 0.5).mul_add(slot, MARGIN_LEFT))
                            .set("y", bottom + 16.0)
                            .set("text-anchor", "middle"),
                    );
                }
            }
        }

        if let Some(ref title) = self.x_axis.title {
            group = group.add(
                Text::new(title.clone())
                    .set("x", MARGIN_LEFT + Self::plot_width() / 2.0)
                    .set("y", HEIGHT - 10.0)
                    .set("text-anchor", "middle"),
            );
        }
        if let Some(ref title) = self.y_axis.title {
            let cy = MARGIN_TOP + Self::plot_height() / 2.0;
            group = group.add(
                Text::new(title.clone())
                    .set("x", 14)
                    .set("y", cy)
                    .set("text-anchor", "middle")
                    .set("transform", format!("rotate(-90 14 {cy})")),
            );
        }
        group
    }
}

/// Format a tick value: integers without decimals, others with at most two.
fn format_tick(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_owned()
    }
}

/// Pick a 1/2/5 x 10^k step so that `range` spans at most
/// `max_ticks - 1` intervals.
#[allow(clippy::cast_precision_loss)]
fn nice_step(range: f64, max_ticks: usize) -> f64 {
    let intervals = max_ticks.saturating_sub(1).max(1) as f64;
    let raw = range / intervals;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Ticks `min, min + step, ...` not exceeding `max`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn ticks_within(min: f64, max: f64, step: f64) -> Vec<f64> {
    let count = ((max - min) / step + 1e-9).floor().max(0.0) as usize;
    (0..=count).map(|i| (i as f64).mul_add(step, min)).collect()
}

/// A value axis starting at zero whose end is rounded up to a tick.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn zero_based_axis(data_max: f64, title: Option<&str>) -> Axis {
    let data_max = if data_max.is_finite() && data_max > 0.0 {
        data_max
    } else {
        1.0
    };
    let step = nice_step(data_max, MAX_TICKS);
    let intervals = (data_max / step - 1e-9).ceil().max(1.0) as usize;
    let max = intervals as f64 * step;
    Axis {
        title: title.map(str::to_owned),
        min: 0.0,
        max,
        ticks: ticks_within(0.0, max, step),
    }
}

/// Build the tri-channel intensity histogram chart from a
/// `partial_results` value.
///
/// # Errors
///
/// Returns [`ChartError::InvalidInput`] if any channel is missing, is
/// not an array of numbers, or does not have exactly 256 bins. By the
/// time this is called the payload has passed validation, so an error
/// here means the caller skipped a check.
pub fn build_histogram_chart(partial: &Value) -> Result<Chart, ChartError> {
    let channels = HistogramChannels::from_partial(partial)?;
    Ok(histogram_chart(&channels))
}

/// Build the intensity histogram chart from typed channels.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn histogram_chart(channels: &HistogramChannels) -> Chart {
    let last_bin = (HISTOGRAM_BINS - 1) as f64;
    let series = [
        ("Red", channels.red(), RED),
        ("Green", channels.green(), TEAL),
        ("Blue", channels.blue(), BLUE),
    ]
    .into_iter()
    .map(|(label, values, color)| Series {
        label: label.to_owned(),
        values: values.to_vec(),
        colors: vec![SeriesColor {
            stroke: color.with_alpha(0.8),
            fill: color.with_alpha(0.1),
        }],
    })
    .collect();

    Chart {
        kind: ChartKind::Line,
        categories: Vec::new(),
        x_axis: Axis {
            title: Some("Pixel Intensity (0-255)".into()),
            min: 0.0,
            max: last_bin,
            ticks: ticks_within(0.0, last_bin, nice_step(last_bin, MAX_TICKS)),
        },
        y_axis: zero_based_axis(channels.max_count(), Some("Frequency")),
        series,
    }
}

/// Build the five-bar aggregate statistics chart.
///
/// The statistics endpoint is trusted, so no validation happens here.
#[must_use]
pub fn build_stats_chart(stats: &AggregateStats) -> Chart {
    let values = vec![
        stats.avg_width,
        stats.avg_height,
        stats.avg_color[0],
        stats.avg_color[1],
        stats.avg_color[2],
    ];
    let data_max = values.iter().copied().fold(0.0, f64::max);
    let colors = [BLUE, BLUE, RED, TEAL, PURPLE]
        .into_iter()
        .map(|c| SeriesColor {
            stroke: c,
            fill: c.with_alpha(0.2),
        })
        .collect();

    Chart {
        kind: ChartKind::Bar,
        categories: ["Avg Width", "Avg Height", "Avg Red", "Avg Green", "Avg Blue"]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        x_axis: Axis {
            title: None,
            min: 0.0,
            max: 5.0,
            ticks: Vec::new(),
        },
        y_axis: zero_based_axis(data_max, None),
        series: vec![Series {
            label: format!("Aggregate Statistics (Total Images: {})", stats.total_images),
            values,
            colors,
        }],
    }
}

/// A rendering artifact that holds resources beyond its memory and
/// must be released explicitly.
pub trait ChartResource {
    /// Release the artifact's resources.
    fn destroy(self);
}

/// Owner of at most one chart artifact.
///
/// Storing a new artifact destroys the previous one first, and so does
/// clearing or dropping the slot, so a replaced chart never leaks.
#[derive(Debug)]
pub struct ChartSlot<T: ChartResource> {
    current: Option<T>,
}

impl<T: ChartResource> ChartSlot<T> {
    /// An empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Destroy the current artifact, if any, and store `chart`.
    pub fn replace(&mut self, chart: T) {
        self.clear();
        self.current = Some(chart);
    }

    /// Destroy the current artifact, if any.
    pub fn clear(&mut self) {
        if let Some(old) = self.current.take() {
            old.destroy();
        }
    }

    /// The current artifact.
    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Whether the slot is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

impl<T: ChartResource> Default for ChartSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ChartResource> Drop for ChartSlot<T> {
    fn drop(&mut self) {
        self.clear();
    }
}
