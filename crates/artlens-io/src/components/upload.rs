//! Image picker with drag-and-drop.

use dioxus::html::{FileData, HasFileData};
use dioxus::prelude::*;

use crate::media::image_mime_type;

/// An image read from the picker or a drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    /// File name as reported by the browser.
    pub name: String,
    /// MIME type derived from the extension.
    pub mime: &'static str,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Props for the [`FileUpload`] component.
#[derive(Props, Clone, PartialEq)]
pub struct FileUploadProps {
    /// Called with the selected image once its bytes are read.
    on_select: EventHandler<SelectedImage>,
    /// Disables the picker, e.g. while an upload request is in flight.
    #[props(default)]
    disabled: bool,
}

/// A drop zone with a file picker button.
#[component]
pub fn FileUpload(props: FileUploadProps) -> Element {
    let mut dragging = use_signal(|| false);
    let mut error = use_signal(|| Option::<String>::None);

    let process_files = move |files: Vec<FileData>| async move {
        let Some(file) = files.first() else {
            return;
        };
        let name = file.name();
        let Some(mime) = image_mime_type(&name) else {
            error.set(Some(format!("Unsupported file type: {name}")));
            return;
        };
        match file.read_bytes().await {
            Ok(bytes) => {
                error.set(None);
                props.on_select.call(SelectedImage {
                    name,
                    mime,
                    bytes: bytes.to_vec(),
                });
            }
            Err(e) => error.set(Some(format!("Failed to read file: {e}"))),
        }
    };

    let handle_files = move |evt: FormEvent| async move {
        process_files(evt.files()).await;
    };

    let handle_drop = move |evt: DragEvent| async move {
        evt.prevent_default();
        dragging.set(false);
        if !props.disabled {
            process_files(evt.files()).await;
        }
    };

    let zone_class = if dragging() {
        "drop-zone dragging"
    } else {
        "drop-zone"
    };

    rsx! {
        div {
            class: "{zone_class}",
            ondragover: move |evt| {
                evt.prevent_default();
                dragging.set(true);
            },
            ondragleave: move |_| dragging.set(false),
            ondrop: handle_drop,

            if let Some(ref err) = error() {
                p { class: "upload-error", "{err}" }
            }

            p { class: "muted", "Drop an image here or " }

            label { class: "button",
                input {
                    r#type: "file",
                    accept: "image/*",
                    class: "hidden",
                    disabled: props.disabled,
                    onchange: handle_files,
                }
                "Choose Image"
            }
        }
    }
}
