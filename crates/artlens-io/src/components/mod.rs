//! Dioxus UI components for the artlens web application.

mod progress;
mod results;
mod stats;
mod upload;

pub use progress::ProgressPanel;
pub use results::ResultsPanel;
pub use stats::StatsPanel;
pub use upload::{FileUpload, SelectedImage};
