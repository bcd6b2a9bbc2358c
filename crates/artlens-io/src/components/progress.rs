//! Progress bar, status line and step list.

use artlens_core::{ProgressBar, StepView};
use dioxus::prelude::*;

/// Props for the [`ProgressPanel`] component.
#[derive(Props, Clone, PartialEq)]
pub struct ProgressPanelProps {
    /// Bar width and label.
    bar: ProgressBar,
    /// Status line from the backend.
    status: String,
    /// Step list.
    steps: Vec<StepView>,
    /// Steps the backend gave up on.
    #[props(default)]
    timed_out: Vec<String>,
}

/// Renders task progress.
#[component]
pub fn ProgressPanel(props: ProgressPanelProps) -> Element {
    let width = format!("{}%", props.bar.percent);

    rsx! {
        section { class: "progress-panel",
            div { class: "progress-track",
                div {
                    class: "progress-fill",
                    style: "width: {width}",
                    "{props.bar.label}"
                }
            }
            p { class: "status", "{props.status}" }

            ul { class: "step-list",
                for step in props.steps.iter() {
                    li {
                        key: "{step.name}",
                        class: "step step-{step.status}",
                        font_weight: if step.is_bold { "bold" } else { "normal" },
                        span { class: "step-icon", "{step.icon}" }
                        " {step.name}"
                        if props.timed_out.contains(&step.name) {
                            span { class: "step-timeout", " (timed out)" }
                        }
                    }
                }
            }
        }
    }
}
