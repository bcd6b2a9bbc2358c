//! Image file types accepted for upload.

/// Accepted image extensions and the MIME type sent for each.
///
/// The backend rejects uploads whose content type is not `image/*`, so
/// the type is derived here rather than left to the transport.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("bmp", "image/bmp"),
    ("gif", "image/gif"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
];

/// MIME type for a filename, or `None` if its extension is not an
/// accepted image type.
#[must_use]
pub fn image_mime_type(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    IMAGE_TYPES
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_from_extension() {
        assert_eq!(image_mime_type("photo.JPG"), Some("image/jpeg"));
        assert_eq!(image_mime_type("scan.tiff"), Some("image/tiff"));
        assert_eq!(image_mime_type("art.final.webp"), Some("image/webp"));
    }

    #[test]
    fn rejects_non_images() {
        assert_eq!(image_mime_type("notes.txt"), None);
        assert_eq!(image_mime_type("no_extension"), None);
        assert_eq!(image_mime_type("png"), None);
    }
}
