//! End-to-end poll sequences through the orchestrator.

#![allow(clippy::unwrap_used, clippy::panic)]

use artlens_core::{
    Frame, Orchestrator, PollUpdate, ScoreClass, StepStatus, TaskPhase, build_histogram_chart,
};
use serde_json::{Value, json};

const STEPS: [&str; 9] = [
    "Preprocessing",
    "Metadata Analysis",
    "Color Intensity Distribution",
    "AI Classifier",
    "Fractal Dimension",
    "Art Medium Analysis",
    "Object Detection",
    "Saving to Database",
    "Insight Summary",
];

fn histogram() -> Value {
    let ramp: Vec<u32> = (0..256).collect();
    json!({
        "histogram_r": ramp,
        "histogram_g": vec![5; 256],
        "histogram_b": vec![7; 256],
    })
}

fn poll(progress: u32, status: &str, current: Option<&str>, done: &[&str], partial: Value) -> Value {
    json!({
        "progress": progress,
        "status": status,
        "steps": STEPS,
        "current_step": current,
        "completed_steps": done,
        "timed_out_steps": [],
        "partial_results": partial,
    })
}

fn frame(update: PollUpdate) -> Frame {
    match update {
        PollUpdate::Frame(frame) => *frame,
        other => panic!("expected a frame, got {other:?}"),
    }
}

#[test]
fn histogram_chart_built_exactly_once() {
    let mut partial = histogram();
    partial["ai_probability"] = json!(0.82);
    partial["fd_default"] = json!(1.734_562);
    partial["hog_image_url"] = json!("/static/hog/abc.png");
    let mut summarized = partial.clone();
    summarized["summary"] =
        json!("Analysis completed successfully. No significant anomalies detected.");

    let sequence = [
        poll(10, "Preprocessing...", Some("Preprocessing"), &[], Value::Null),
        poll(
            60,
            "Performing Parallel Analysis & Upload...",
            Some("Fractal Dimension"),
            &STEPS[..4],
            partial.clone(),
        ),
        poll(
            60,
            "Performing Parallel Analysis & Upload...",
            Some("Art Medium Analysis"),
            &STEPS[..5],
            partial,
        ),
        poll(
            90,
            "Generating AI Insight...",
            Some("Insight Summary"),
            &STEPS[..8],
            summarized.clone(),
        ),
        poll(100, "Complete", None, &STEPS, summarized),
    ];

    let mut orch = Orchestrator::new().with_resource_base("http://127.0.0.1:8080");
    let ticket = orch.begin("task-1");

    let mut charts = 0;
    let mut hog_swaps = Vec::new();
    let mut summaries = Vec::new();
    let mut last_phase = TaskPhase::Running;
    for payload in &sequence {
        let update = orch.apply(&ticket, Some(payload));
        let keep_going = update.should_continue();
        let frame = frame(update);
        if frame.results.histogram_chart.is_some() {
            charts += 1;
        }
        if let Some(src) = frame.results.hog_image_src {
            hog_swaps.push(src);
        }
        summaries.push(frame.results.summary);
        last_phase = frame.phase;
        if !keep_going {
            break;
        }
    }

    assert_eq!(charts, 1);
    assert_eq!(hog_swaps, ["http://127.0.0.1:8080/static/hog/abc.png"]);
    assert_eq!(summaries[..3], [None, None, None]);
    assert!(
        summaries[3..]
            .iter()
            .all(|s| s.as_deref().is_some_and(|s| s.starts_with("Analysis completed")))
    );
    assert_eq!(last_phase, TaskPhase::Complete);
    assert!(orch.state().is_none());
}

#[test]
fn results_arrive_incrementally() {
    let mut orch = Orchestrator::new();
    let ticket = orch.begin("task-2");

    let first = frame(orch.apply(
        &ticket,
        Some(&poll(20, "Working", None, &[], json!({"fd_default": 2.123_456}))),
    ));
    assert_eq!(first.results.fractal_dimension.as_deref(), Some("2.1235"));
    assert!(first.results.ai_score.is_none());

    let second = frame(orch.apply(
        &ticket,
        Some(&poll(40, "Working", None, &[], json!({"ai_probability": 0.5}))),
    ));
    let score = second.results.ai_score.unwrap();
    assert_eq!(score.class, ScoreClass::Warning);
    assert_eq!(score.percent, "50.0");
}

#[test]
fn step_list_tracks_progress() {
    let mut orch = Orchestrator::new();
    let ticket = orch.begin("task-3");
    let payload = poll(30, "Working", Some("AI Classifier"), &STEPS[..3], Value::Null);
    let frame = frame(orch.apply(&ticket, Some(&payload)));

    let statuses: Vec<_> = frame.steps.iter().map(|s| s.status).collect();
    assert_eq!(&statuses[..3], [StepStatus::Done; 3]);
    assert_eq!(statuses[3], StepStatus::Active);
    assert!(statuses[4..].iter().all(|s| *s == StepStatus::Pending));
    assert!((frame.progress.percent - 30.0).abs() < f64::EPSILON);
}

#[test]
fn not_found_then_results() {
    let mut orch = Orchestrator::new();
    let ticket = orch.begin("task-4");
    assert_eq!(orch.apply(&ticket, None), PollUpdate::Pending);
    assert_eq!(orch.apply(&ticket, None), PollUpdate::Pending);
    let frame = frame(orch.apply(&ticket, Some(&poll(60, "Working", None, &[], histogram()))));
    assert!(frame.results.histogram_chart.is_some());
}

#[test]
fn in_flight_response_after_new_upload_is_ignored() {
    let mut orch = Orchestrator::new();
    let first = orch.begin("task-a");
    let _ = orch.apply(&first, Some(&poll(10, "Working", None, &[], Value::Null)));

    // The user uploads another image while a poll for task-a is in flight.
    let second = orch.begin("task-b");
    let late = orch.apply(&first, Some(&poll(60, "Working", None, &[], histogram())));
    assert_eq!(late, PollUpdate::Stale);
    assert!(!orch.state().unwrap().histogram_rendered);

    let frame = frame(orch.apply(&second, Some(&poll(60, "Working", None, &[], histogram()))));
    assert!(frame.results.histogram_chart.is_some());
}

#[test]
fn abandoned_task_stops_polling() {
    let mut orch = Orchestrator::new();
    let ticket = orch.begin("task-5");
    let payload = json!({
        "progress": 40,
        "status": "Abandoned",
        "steps": STEPS,
        "error": "Task abandoned due to new upload",
    });
    let update = orch.apply(&ticket, Some(&payload));
    assert!(!update.should_continue());
    assert_eq!(frame(update).phase, TaskPhase::Abandoned);
}

#[test]
fn chart_builder_rejects_what_orchestrator_never_passes() {
    let err = build_histogram_chart(&json!({"histogram_r": [1, 2, 3]})).unwrap_err();
    assert!(err.to_string().contains("histogram_g"));
}
