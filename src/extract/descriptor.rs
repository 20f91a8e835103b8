//! The image descriptor produced by extraction and consumed by downloads.

use serde::Serialize;

use crate::index::trim_extension;

/// A parsed reference to one downloadable image.
///
/// `filename` is the last path segment of `url`; `identifier` is the
/// filename without its extension and is the dedup key. Two descriptors
/// with equal identifiers are duplicates regardless of their URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageDescriptor {
    url: String,
    identifier: String,
    filename: String,
}

impl ImageDescriptor {
    /// Builds a descriptor from an image URL.
    ///
    /// Returns `None` when the URL has no usable last segment: an empty
    /// filename or identifier, `.`/`..`, or a backslash that could escape
    /// the destination directory on some platforms.
    ///
    /// # Examples
    ///
    /// ```
    /// use harvester_core::ImageDescriptor;
    ///
    /// let d = ImageDescriptor::from_url("https://img.example.com/photos/1/pexels-photo-1.jpeg")
    ///     .unwrap();
    /// assert_eq!(d.filename(), "pexels-photo-1.jpeg");
    /// assert_eq!(d.identifier(), "pexels-photo-1");
    ///
    /// assert!(ImageDescriptor::from_url("https://img.example.com/photos/").is_none());
    /// ```
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        let filename = url.rsplit('/').next().unwrap_or_default();

        if filename.is_empty() || filename == "." || filename == ".." || filename.contains('\\')
        {
            return None;
        }

        let identifier = trim_extension(filename);
        if identifier.is_empty() {
            return None;
        }

        Some(Self {
            identifier: identifier.to_string(),
            filename: filename.to_string(),
            url,
        })
    }

    /// The full image URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The dedup key: filename without extension.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The file name the image is saved under.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_derives_filename_and_identifier() {
        let d = ImageDescriptor::from_url("https://x.test/a/b/photo.png").unwrap();
        assert_eq!(d.url(), "https://x.test/a/b/photo.png");
        assert_eq!(d.filename(), "photo.png");
        assert_eq!(d.identifier(), "photo");
    }

    #[test]
    fn test_from_url_without_extension_uses_filename_as_identifier() {
        let d = ImageDescriptor::from_url("https://x.test/raw/12345").unwrap();
        assert_eq!(d.filename(), "12345");
        assert_eq!(d.identifier(), "12345");
    }

    #[test]
    fn test_from_url_rejects_trailing_slash() {
        assert!(ImageDescriptor::from_url("https://x.test/dir/").is_none());
    }

    #[test]
    fn test_from_url_rejects_dot_segments() {
        assert!(ImageDescriptor::from_url("https://x.test/a/..").is_none());
        assert!(ImageDescriptor::from_url("https://x.test/a/.").is_none());
    }

    #[test]
    fn test_from_url_rejects_dotfile_with_empty_identifier() {
        assert!(ImageDescriptor::from_url("https://x.test/a/.jpg").is_none());
    }

    #[test]
    fn test_from_url_rejects_backslash() {
        assert!(ImageDescriptor::from_url("https://x.test/a/..\\evil.jpg").is_none());
    }

    #[test]
    fn test_equal_identifiers_from_different_urls() {
        let a = ImageDescriptor::from_url("https://a.test/x/p.jpeg").unwrap();
        let b = ImageDescriptor::from_url("https://b.test/y/p.png").unwrap();
        assert_eq!(a.identifier(), b.identifier());
        assert_ne!(a, b);
    }
}
