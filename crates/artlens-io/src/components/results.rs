//! Analysis results: insight summary, AI score card, fractal dimension,
//! HOG image and histogram chart.

use artlens_core::AiScore;
use dioxus::prelude::*;

/// Props for the [`ResultsPanel`] component.
#[derive(Props, Clone, PartialEq)]
pub struct ResultsPanelProps {
    /// AI-generation score, once classified.
    ai_score: Option<AiScore>,
    /// Formatted fractal dimension.
    fractal_dimension: Option<String>,
    /// HOG visualization image source.
    hog_image_src: Option<String>,
    /// Object URL of the mounted histogram chart.
    histogram_url: Option<String>,
    /// Text verdict from the insight summary step.
    #[props(default)]
    summary: Option<String>,
}

/// Renders whatever results have arrived so far. Cards for results that
/// have not arrived show a placeholder.
#[component]
pub fn ResultsPanel(props: ResultsPanelProps) -> Element {
    rsx! {
        section { class: "results-panel",
            if let Some(ref summary) = props.summary {
                div { class: "card wide summary",
                    h3 { "Insight Summary" }
                    p { class: "summary-text", "{summary}" }
                }
            }

            div { class: "card",
                h3 { "AI Generation Probability" }
                if let Some(ref score) = props.ai_score {
                    div { class: "ai-score {score.class.css_class()}",
                        span { class: "ai-score-value", "{score.percent}%" }
                        span { class: "ai-score-description", "{score.description}" }
                    }
                } else {
                    p { class: "muted", "Waiting for classifier..." }
                }
            }

            div { class: "card",
                h3 { "Fractal Dimension" }
                if let Some(ref fd) = props.fractal_dimension {
                    p { class: "fractal-value", "{fd}" }
                } else {
                    p { class: "muted", "Calculating..." }
                }
            }

            div { class: "card",
                h3 { "Histogram of Oriented Gradients" }
                if let Some(ref src) = props.hog_image_src {
                    img { class: "hog-image", src: "{src}", alt: "HOG visualization" }
                } else {
                    p { class: "muted", "Waiting for HOG image..." }
                }
            }

            div { class: "card wide",
                h3 { "Color Intensity Distribution" }
                if let Some(ref url) = props.histogram_url {
                    img { class: "chart", src: "{url}", alt: "RGB intensity histogram" }
                } else {
                    p { class: "muted", "Waiting for histogram..." }
                }
            }
        }
    }
}
