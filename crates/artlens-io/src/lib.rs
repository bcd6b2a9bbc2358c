//! artlens-io: HTTP transport, polling and Dioxus components.
//!
//! Talks to the analysis backend and drives the serial poll loop. With
//! the `web` feature it also mounts rendered charts as Blob URLs and
//! provides the UI components of the artlens web application. The logic
//! that decides what to render lives in `artlens-core`.

#[cfg(feature = "web")]
pub mod blob;
#[cfg(feature = "web")]
pub mod components;
pub mod media;
pub mod poll;
pub mod transport;

#[cfg(feature = "web")]
pub use blob::{BlobError, MountedChart};
#[cfg(feature = "web")]
pub use components::{FileUpload, ProgressPanel, ResultsPanel, SelectedImage, StatsPanel};
pub use media::image_mime_type;
pub use poll::{PollOutcome, Poller, ProgressSource};
pub use transport::{ProgressFetch, Transport, TransportError};
