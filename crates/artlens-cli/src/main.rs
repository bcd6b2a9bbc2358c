//! artlens-cli: command-line client for the image-analysis backend.
//!
//! Uploads an image, follows the task's progress until it finishes and
//! prints results as they arrive. Also queries aggregate statistics and
//! model readiness.
//!
//! # Usage
//!
//! ```text
//! artlens-cli [OPTIONS] analyze <IMAGE> [--out-dir DIR]
//! artlens-cli [OPTIONS] stats [--svg PATH]
//! artlens-cli [OPTIONS] ready
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use artlens_core::{
    AiScore, Chart, ClientConfig, Frame, Orchestrator, PollUpdate, StepStatus, TaskPhase,
    build_stats_chart,
};
use artlens_io::{PollOutcome, Poller, Transport, image_mime_type};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Client for the artlens image-analysis backend.
#[derive(Parser)]
#[command(name = "artlens-cli", version)]
struct Cli {
    /// Backend origin.
    #[arg(long, global = true, default_value = ClientConfig::DEFAULT_BASE_URL)]
    base_url: String,

    /// Delay between progress polls, in milliseconds.
    #[arg(long, global = true, default_value_t = ClientConfig::DEFAULT_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Per-request timeout, in seconds.
    #[arg(long, global = true, default_value_t = ClientConfig::DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    /// Give up after this many progress polls.
    #[arg(long, global = true)]
    max_polls: Option<u32>,

    /// Decimal places shown for the fractal dimension.
    #[arg(long, global = true, default_value_t = artlens_core::present::DEFAULT_FRACTAL_DECIMALS)]
    fractal_decimals: usize,

    /// Full client config as JSON (overrides the individual options).
    #[arg(long, global = true)]
    config_json: Option<String>,

    /// Print final payloads as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v debug, -vv trace). Without it `RUST_LOG`
    /// applies, defaulting to `info`.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload an image and follow its analysis to completion.
    Analyze {
        /// Image to analyze.
        image: PathBuf,

        /// Directory to write `histogram.svg` into.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Print aggregate statistics over all analyzed images.
    Stats {
        /// Write the statistics bar chart to this SVG file.
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Report whether the backend's models are loaded. Exits non-zero
    /// while they are still loading.
    Ready,
}

fn config_from_cli(cli: &Cli) -> Result<ClientConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        ClientConfig {
            base_url: cli.base_url.clone(),
            poll_interval_ms: cli.poll_interval_ms,
            request_timeout_secs: cli.request_timeout_secs,
            max_polls: cli.max_polls,
            fractal_decimals: cli.fractal_decimals,
        }
    };
    config
        .validate()
        .map_err(|e| format!("Invalid config: {e}"))?;
    Ok(config)
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            Command::Analyze {
                ref image,
                ref out_dir,
            } => analyze(&config, image, out_dir.as_deref(), cli.json).await,
            Command::Stats { ref svg } => stats(&config, svg.as_deref(), cli.json).await,
            Command::Ready => ready(&config, cli.json).await,
        }
    });

    match result {
        Ok(code) => code,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// Latest results seen while following a task.
#[derive(Default)]
struct Report {
    ai_score: Option<AiScore>,
    fractal_dimension: Option<String>,
    hog_image: Option<String>,
    insight: Option<String>,
    histogram: Option<Chart>,
    histogram_svg: Option<PathBuf>,
    last_steps: String,
    phase: Option<TaskPhase>,
    payload: Option<Value>,
}

impl Report {
    /// Print what changed in `frame` and remember the latest results.
    fn absorb(&mut self, frame: Frame) {
        let steps = frame
            .steps
            .iter()
            .map(|s| format!("{} {}", s.icon, s.name))
            .collect::<Vec<_>>()
            .join("  ");
        let current = frame
            .steps
            .iter()
            .find(|s| s.status == StepStatus::Active)
            .map_or("", |s| s.name.as_str());
        if steps != self.last_steps {
            eprintln!("[{:>4}] {} {current}", frame.progress.label, frame.status);
            self.last_steps = steps;
        }
        for step in &frame.timed_out_steps {
            tracing::warn!(step = %step, "step timed out");
        }

        let results = frame.results;
        if let Some(score) = results.ai_score {
            if self.ai_score.as_ref() != Some(&score) {
                eprintln!("  AI probability: {}% ({})", score.percent, score.description);
            }
            self.ai_score = Some(score);
        }
        if let Some(fd) = results.fractal_dimension {
            if self.fractal_dimension.as_ref() != Some(&fd) {
                eprintln!("  Fractal dimension: {fd}");
            }
            self.fractal_dimension = Some(fd);
        }
        if let Some(src) = results.hog_image_src {
            eprintln!("  HOG image: {src}");
            self.hog_image = Some(src);
        }
        if let Some(text) = results.summary {
            if self.insight.as_ref() != Some(&text) {
                eprintln!("  Insight: {text}");
            }
            self.insight = Some(text);
        }
        if let Some(chart) = results.histogram_chart {
            eprintln!("  Histogram received");
            self.histogram = Some(chart);
        }
        for rejected in &results.rejected {
            tracing::debug!(rejected = %rejected, "partial result dropped");
        }

        self.phase = Some(frame.phase);
    }

    /// Write the histogram chart, if one arrived, as `histogram.svg`
    /// in `dir`.
    async fn write_histogram(&mut self, dir: &Path) -> Result<(), String> {
        let Some(ref chart) = self.histogram else {
            return Ok(());
        };
        let path = dir.join("histogram.svg");
        tokio::fs::write(&path, chart.to_svg())
            .await
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        eprintln!("Histogram written to {}", path.display());
        self.histogram_svg = Some(path);
        Ok(())
    }

    fn print(&self) {
        if let Some(ref text) = self.insight {
            println!("Insight summary:   {text}");
        }
        if let Some(ref score) = self.ai_score {
            println!(
                "AI probability:    {}% [{}] {}",
                score.percent, score.class, score.description
            );
        }
        if let Some(ref fd) = self.fractal_dimension {
            println!("Fractal dimension: {fd}");
        }
        if let Some(ref hog) = self.hog_image {
            println!("HOG image:         {hog}");
        }
        if let Some(ref path) = self.histogram_svg {
            println!("Histogram:         {}", path.display());
        }
    }
}

async fn analyze(
    config: &ClientConfig,
    image: &Path,
    out_dir: Option<&Path>,
    json: bool,
) -> Result<ExitCode, String> {
    let name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("Not a file: {}", image.display()))?;
    let mime = image_mime_type(&name).ok_or_else(|| format!("Unsupported file type: {name}"))?;
    let bytes = tokio::fs::read(image)
        .await
        .map_err(|e| format!("Error reading {}: {e}", image.display()))?;
    if let Some(dir) = out_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| format!("Error creating {}: {e}", dir.display()))?;
    }

    let transport = Transport::new(config).map_err(|e| e.to_string())?;
    eprintln!("Image: {} ({} bytes)", image.display(), bytes.len());
    let upload = transport
        .upload(bytes, &name, mime)
        .await
        .map_err(|e| e.to_string())?;
    eprintln!("Task: {}", upload.task_id);

    let mut orchestrator = Orchestrator::new()
        .with_resource_base(transport.base_url())
        .with_fractal_decimals(config.fractal_decimals);
    let ticket = orchestrator.begin(upload.task_id.clone());
    let mut report = Report::default();

    let poller = Poller::new(transport, config);
    let outcome = poller
        .run(&upload.task_id, tokio::time::sleep, |payload| {
            let update = orchestrator.apply(&ticket, payload.as_ref());
            if payload.is_some() {
                report.payload = payload;
            }
            match update {
                PollUpdate::Stale => ControlFlow::Break(()),
                PollUpdate::Pending => ControlFlow::Continue(()),
                PollUpdate::Invalid { errors } => {
                    tracing::warn!(?errors, "invalid progress payload");
                    ControlFlow::Continue(())
                }
                PollUpdate::Frame(frame) => {
                    let terminal = frame.phase.is_terminal();
                    report.absorb(*frame);
                    if terminal {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                }
            }
        })
        .await;

    if let Some(dir) = out_dir {
        report.write_histogram(dir).await?;
    }
    if json {
        if let Some(ref payload) = report.payload {
            print_json(payload)?;
        }
    } else {
        report.print();
    }

    if let PollOutcome::Exhausted { polls } = outcome {
        eprintln!("Gave up after {polls} polls");
        return Ok(ExitCode::FAILURE);
    }
    match report.phase {
        Some(TaskPhase::Complete) => Ok(ExitCode::SUCCESS),
        Some(TaskPhase::Failed(message)) => {
            eprintln!("Analysis failed: {message}");
            Ok(ExitCode::FAILURE)
        }
        Some(TaskPhase::Abandoned) => {
            eprintln!("Task was abandoned by the backend");
            Ok(ExitCode::FAILURE)
        }
        Some(TaskPhase::Running) | None => Ok(ExitCode::FAILURE),
    }
}

async fn stats(config: &ClientConfig, svg: Option<&Path>, json: bool) -> Result<ExitCode, String> {
    let transport = Transport::new(config).map_err(|e| e.to_string())?;
    let stats = transport.get_stats().await.map_err(|e| e.to_string())?;

    if json {
        let value = serde_json::to_value(&stats).map_err(|e| e.to_string())?;
        print_json(&value)?;
    } else {
        println!("Total images: {}", stats.total_images);
        println!("Avg width:    {:.1}", stats.avg_width);
        println!("Avg height:   {:.1}", stats.avg_height);
        let [r, g, b] = stats.avg_color;
        println!("Avg color:    ({r:.1}, {g:.1}, {b:.1})");
    }

    if let Some(path) = svg {
        let document = build_stats_chart(&stats).to_svg();
        std::fs::write(path, &document)
            .map_err(|e| format!("Error writing SVG to {}: {e}", path.display()))?;
        eprintln!("SVG written to {} ({} bytes)", path.display(), document.len());
    }

    Ok(ExitCode::SUCCESS)
}

async fn ready(config: &ClientConfig, json: bool) -> Result<ExitCode, String> {
    let transport = Transport::new(config).map_err(|e| e.to_string())?;
    let is_ready = transport.models_ready().await.map_err(|e| e.to_string())?;
    let status = if is_ready { "ready" } else { "loading" };
    if json {
        print_json(&serde_json::json!({ "status": status }))?;
    } else {
        println!("{status}");
    }
    Ok(if is_ready {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_json(value: &Value) -> Result<(), String> {
    let text =
        serde_json::to_string_pretty(value).map_err(|e| format!("Error serializing JSON: {e}"))?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_build_config() {
        let cli = Cli::parse_from([
            "artlens-cli",
            "--base-url",
            "http://lab:9000",
            "--max-polls",
            "20",
            "ready",
        ]);
        let config = config_from_cli(&cli).unwrap_or_default();
        assert_eq!(config.base_url, "http://lab:9000");
        assert_eq!(config.max_polls, Some(20));
        assert_eq!(config.poll_interval_ms, ClientConfig::DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn config_json_replaces_flags() {
        let cli = Cli::parse_from([
            "artlens-cli",
            "--base-url",
            "http://ignored:1",
            "--config-json",
            r#"{"base_url": "http://json:2", "poll_interval_ms": 50}"#,
            "stats",
        ]);
        let config = config_from_cli(&cli).unwrap_or_default();
        assert_eq!(config.base_url, "http://json:2");
        assert_eq!(config.poll_interval_ms, 50);
    }

    #[test]
    fn rejects_invalid_config() {
        let cli = Cli::parse_from(["artlens-cli", "--poll-interval-ms", "0", "ready"]);
        let err = config_from_cli(&cli).err().unwrap_or_default();
        assert!(err.contains("poll_interval_ms"));
    }

    fn frame_for(partial: &Value) -> Frame {
        let mut orchestrator = Orchestrator::new();
        let ticket = orchestrator.begin("task");
        let payload = serde_json::json!({
            "progress": 90,
            "status": "Generating AI Insight...",
            "steps": ["Insight Summary"],
            "current_step": "Insight Summary",
            "partial_results": partial,
        });
        match orchestrator.apply(&ticket, Some(&payload)) {
            PollUpdate::Frame(frame) => *frame,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn report_keeps_insight_and_writes_histogram_afterwards() {
        let partial = serde_json::json!({
            "summary": "Likely a photograph.",
            "histogram_r": vec![1; 256],
            "histogram_g": vec![2; 256],
            "histogram_b": vec![3; 256],
        });
        let mut report = Report::default();
        report.absorb(frame_for(&partial));
        assert_eq!(report.insight.as_deref(), Some("Likely a photograph."));
        assert!(report.histogram.is_some());
        assert!(report.histogram_svg.is_none());

        let dir = std::env::temp_dir().join(format!("artlens-cli-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap_or_default();
        let written = report.write_histogram(&dir).await;
        assert_eq!(written, Ok(()));
        let path = dir.join("histogram.svg");
        assert_eq!(report.histogram_svg.as_deref(), Some(path.as_path()));
        let svg = tokio::fs::read_to_string(&path).await.unwrap_or_default();
        assert!(svg.contains("<svg"));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn analyze_takes_out_dir() {
        let cli = Cli::parse_from(["artlens-cli", "analyze", "art.png", "--out-dir", "out", "-v"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Analyze { image, out_dir } => {
                assert_eq!(image, PathBuf::from("art.png"));
                assert_eq!(out_dir, Some(PathBuf::from("out")));
            }
            _ => unreachable!(),
        }
    }
}
