//! Poll driver against a scripted progress source.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use artlens_core::{ClientConfig, Orchestrator, PollUpdate, TaskPhase};
use artlens_io::{PollOutcome, Poller, ProgressSource};
use serde_json::{Value, json};

/// Answers polls from a fixed script, then `None` forever.
struct Scripted {
    script: RefCell<VecDeque<Option<Value>>>,
    requests: Cell<u32>,
}

impl Scripted {
    fn new(script: impl IntoIterator<Item = Option<Value>>) -> Self {
        Self {
            script: RefCell::new(script.into_iter().collect()),
            requests: Cell::new(0),
        }
    }
}

impl ProgressSource for Scripted {
    fn progress(&self, _task_id: &str) -> impl Future<Output = Option<Value>> {
        self.requests.set(self.requests.get() + 1);
        let next = self.script.borrow_mut().pop_front().flatten();
        std::future::ready(next)
    }
}

fn config(max_polls: Option<u32>) -> ClientConfig {
    ClientConfig {
        poll_interval_ms: 250,
        max_polls,
        ..ClientConfig::default()
    }
}

fn running(progress: u32) -> Value {
    json!({"progress": progress, "status": "Working", "steps": ["A", "B"], "current_step": "A"})
}

#[tokio::test]
async fn stops_when_task_completes() {
    let source = Scripted::new([
        None,
        Some(running(30)),
        Some(json!({"progress": "bad"})),
        Some(json!({"progress": 100, "status": "Complete", "steps": ["A", "B"]})),
        Some(running(100)),
    ]);
    let poller = Poller::new(source, &config(None));

    let mut orch = Orchestrator::new();
    let ticket = orch.begin("task");
    let sleeps = RefCell::new(Vec::new());
    let mut phases = Vec::new();

    let outcome = poller
        .run(
            "task",
            |d| {
                sleeps.borrow_mut().push(d);
                std::future::ready(())
            },
            |payload| {
                let update = orch.apply(&ticket, payload.as_ref());
                if let PollUpdate::Frame(ref frame) = update {
                    phases.push(frame.phase.clone());
                }
                if update.should_continue() {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            },
        )
        .await;

    assert_eq!(outcome, PollOutcome::Stopped { polls: 4 });
    assert_eq!(poller.source().requests.get(), 4);
    assert_eq!(phases, [TaskPhase::Running, TaskPhase::Complete]);
    assert_eq!(*sleeps.borrow(), vec![Duration::from_millis(250); 3]);
}

#[tokio::test]
async fn gives_up_after_max_polls() {
    let source = Scripted::new([]);
    let poller = Poller::new(source, &config(Some(5)));
    let mut seen = 0;

    let outcome = poller
        .run(
            "task",
            |_| std::future::ready(()),
            |payload| {
                assert!(payload.is_none());
                seen += 1;
                ControlFlow::Continue(())
            },
        )
        .await;

    assert_eq!(outcome, PollOutcome::Exhausted { polls: 5 });
    assert_eq!(outcome.polls(), 5);
    assert_eq!(seen, 5);
}

#[tokio::test]
async fn break_on_first_poll_never_sleeps() {
    let poller = Poller::new(Scripted::new([Some(running(10))]), &config(Some(3)));
    let slept = Cell::new(false);

    let outcome = poller
        .run(
            "task",
            |_| {
                slept.set(true);
                std::future::ready(())
            },
            |_| ControlFlow::Break(()),
        )
        .await;

    assert_eq!(outcome, PollOutcome::Stopped { polls: 1 });
    assert!(!slept.get());
}

#[tokio::test]
async fn real_sleep_paces_requests() {
    let poller = Poller::new(
        Scripted::new([None, None]),
        &ClientConfig {
            poll_interval_ms: 20,
            max_polls: Some(3),
            ..ClientConfig::default()
        },
    );
    let started = tokio::time::Instant::now();
    let outcome = poller
        .run("task", tokio::time::sleep, |_| ControlFlow::Continue(()))
        .await;
    assert_eq!(outcome.polls(), 3);
    assert!(started.elapsed() >= Duration::from_millis(40));
}
