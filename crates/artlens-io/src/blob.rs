//! Chart mounting through Blob URLs.
//!
//! A rendered SVG chart is turned into a `Blob` and exposed to an
//! `<img src>` through an object URL. The browser keeps the Blob alive
//! until the URL is revoked, so a [`MountedChart`] is a
//! [`ChartResource`] whose `destroy` revokes it; store mounted charts in
//! a [`ChartSlot`](artlens_core::ChartSlot) so replacing one releases
//! the previous.
//!
//! All functions in this module require a browser environment
//! (`wasm32-unknown-unknown` target).

use artlens_core::{Chart, ChartResource};
use wasm_bindgen::JsValue;
use web_sys::BlobPropertyBag;

/// Errors that can occur while creating a Blob URL.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for BlobError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// Create an object URL for an SVG document.
///
/// The returned URL must be revoked via [`revoke_blob_url`] when no
/// longer needed.
///
/// # Errors
///
/// Returns [`BlobError::JsError`] if Blob or URL creation fails.
pub fn svg_to_blob_url(svg: &str) -> Result<String, BlobError> {
    let parts = js_sys::Array::new();
    parts.push(&JsValue::from_str(svg));

    let opts = BlobPropertyBag::new();
    opts.set_type("image/svg+xml");
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &opts)?;

    Ok(web_sys::Url::create_object_url_with_blob(&blob)?)
}

/// Create an object URL for raw file bytes, e.g. an uploaded image
/// shown as a preview.
///
/// The returned URL must be revoked via [`revoke_blob_url`] when no
/// longer needed.
///
/// # Errors
///
/// Returns [`BlobError::JsError`] if Blob or URL creation fails.
pub fn bytes_to_blob_url(bytes: &[u8], mime: &str) -> Result<String, BlobError> {
    let uint8_array = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::new();
    parts.push(&uint8_array);

    let opts = BlobPropertyBag::new();
    opts.set_type(mime);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &opts)?;

    Ok(web_sys::Url::create_object_url_with_blob(&blob)?)
}

/// Revoke a Blob URL previously created by [`svg_to_blob_url`] or
/// [`bytes_to_blob_url`].
///
/// Errors are ignored: the URL may already have been revoked.
pub fn revoke_blob_url(url: &str) {
    let _ = web_sys::Url::revoke_object_url(url);
}

/// A chart rendered to SVG and exposed through an object URL.
#[derive(Debug, PartialEq, Eq)]
pub struct MountedChart {
    url: String,
}

impl MountedChart {
    /// Render `chart` and create its object URL.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::JsError`] if Blob or URL creation fails.
    pub fn mount(chart: &Chart) -> Result<Self, BlobError> {
        let url = svg_to_blob_url(&chart.to_svg())?;
        tracing::debug!(url = %url, "chart mounted");
        Ok(Self { url })
    }

    /// Object URL for use as an `<img src>`.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChartResource for MountedChart {
    fn destroy(self) {
        tracing::debug!(url = %self.url, "chart released");
        revoke_blob_url(&self.url);
    }
}
