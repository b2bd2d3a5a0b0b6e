//! Upload validation and decoding for avatar source images

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::avatar::{MAX_FILE_SIZE, SUPPORTED_MIME_TYPES};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("no file selected")]
    Empty,

    #[error("unsupported file format '{0}', only .jpg, .jpeg and .png are allowed")]
    UnsupportedFormat(String),

    #[error("file size {size} bytes exceeds the {max} byte limit")]
    FileTooLarge { size: usize, max: usize },

    #[error("failed to decode image: {0}")]
    Decode(String),
}

/// A user-selected file, as handed over by the picker
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageBlob {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, deriving its MIME type from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image file {}", path.display()))?;
        let mime = mime_for_extension(path).unwrap_or("application/octet-stream");
        debug!(path = %path.display(), mime, size = bytes.len(), "Read image blob");
        Ok(Self::new(mime, bytes))
    }
}

fn mime_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" => Some("image/jpg"),
        "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// A decoded image ready for cropping
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// Validate a blob and decode it.
///
/// Checks run in order: non-empty, allowed MIME type, size ceiling. The
/// payload must also actually be a JPEG or PNG; a renamed file of another
/// type is reported as unsupported.
pub fn acquire(blob: &ImageBlob) -> Result<SourceImage, AcquireError> {
    if blob.bytes.is_empty() {
        return Err(AcquireError::Empty);
    }

    let mime = blob.mime.to_ascii_lowercase();
    if !SUPPORTED_MIME_TYPES.contains(&mime.as_str()) {
        warn!(mime = %blob.mime, "Rejected avatar with unsupported MIME type");
        return Err(AcquireError::UnsupportedFormat(blob.mime.clone()));
    }

    if blob.bytes.len() > MAX_FILE_SIZE {
        warn!(size = blob.bytes.len(), max = MAX_FILE_SIZE, "Rejected oversized avatar");
        return Err(AcquireError::FileTooLarge {
            size: blob.bytes.len(),
            max: MAX_FILE_SIZE,
        });
    }

    let format = image::guess_format(&blob.bytes)
        .map_err(|_| AcquireError::UnsupportedFormat(blob.mime.clone()))?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
        return Err(AcquireError::UnsupportedFormat(format!("{format:?}")));
    }

    let image = image::load_from_memory_with_format(&blob.bytes, format)
        .map_err(|e| AcquireError::Decode(e.to_string()))?;

    debug!(width = image.width(), height = image.height(), ?format, "Decoded avatar source");
    Ok(SourceImage { image, format })
}
