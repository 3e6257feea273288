use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use image::ImageFormat;
use mime::Mime;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// A user-selected input file, held in memory for the lifetime of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub name: String,
    /// Declared media type, as reported by the picker or inferred from the extension.
    pub media_type: String,
    pub data: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, inferring its media type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(name, media_type_for_path(path), data))
    }

    /// True when the declared media type parses as `image/*`. A type the
    /// multipart encoder would refuse is never an image.
    pub fn is_image(&self) -> bool {
        self.media_type
            .parse::<Mime>()
            .map(|media_type| media_type.type_() == mime::IMAGE)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub fn media_type_for_path(path: &Path) -> &'static str {
    if let Ok(format) = ImageFormat::from_path(path) {
        return format.to_mime_type();
    }

    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        _ => FALLBACK_MEDIA_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_detection_uses_declared_type() {
        assert!(SourceFile::new("photo.png", "image/png", vec![1u8]).is_image());
        assert!(SourceFile::new("photo.JPG", "IMAGE/JPEG", vec![1u8]).is_image());
        assert!(!SourceFile::new("document.pdf", "application/pdf", vec![1u8]).is_image());
        assert!(!SourceFile::new("x", "", Vec::<u8>::new()).is_image());
    }

    #[test]
    fn malformed_image_types_are_not_images() {
        assert!(!SourceFile::new("photo.png", "image/ png", vec![1u8]).is_image());
        assert!(!SourceFile::new("photo.png", "image/", vec![1u8]).is_image());
        assert!(!SourceFile::new("photo.png", "image", vec![1u8]).is_image());
        assert!(SourceFile::new("photo.png", "image/png; q=1", vec![1u8]).is_image());
    }

    #[test]
    fn infers_media_types_from_extensions() {
        assert_eq!(media_type_for_path(Path::new("a/photo.png")), "image/png");
        assert_eq!(media_type_for_path(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(media_type_for_path(Path::new("photo.webp")), "image/webp");
        assert_eq!(media_type_for_path(Path::new("document.PDF")), "application/pdf");
        assert_eq!(media_type_for_path(Path::new("notes")), FALLBACK_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn loads_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n").expect("write");

        let file = SourceFile::from_path(&path).await.expect("load");
        assert_eq!(file.name, "photo.png");
        assert_eq!(file.media_type, "image/png");
        assert_eq!(file.len(), 8);
    }
}
