use std::path::Path;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const MIME_TYPE_LOOKUP: &[(&str, &str)] = &[
    ("kml", "application/vnd.google-earth.kml+xml"),
    ("kmz", "application/vnd.google-earth.kmz+xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
];

/// MIME type by file extension (case-insensitive), falling back to
/// `application/octet-stream`.
pub fn guess_mime_type(name: &str) -> &'static str {
    let ext = match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return DEFAULT_MIME_TYPE,
    };

    MIME_TYPE_LOOKUP
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(guess_mime_type("foo.jpg"), "image/jpeg");
        assert_eq!(guess_mime_type("dir/track.KML"), "application/vnd.google-earth.kml+xml");
        assert_eq!(guess_mime_type("overlay.kmz"), "application/vnd.google-earth.kmz+xml");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back() {
        assert_eq!(guess_mime_type("notes.txt"), DEFAULT_MIME_TYPE);
        assert_eq!(guess_mime_type("README"), DEFAULT_MIME_TYPE);
        assert_eq!(guess_mime_type(".png"), DEFAULT_MIME_TYPE);
    }
}
