//! Image file loading and saving.
//!
//! The format is chosen from the file extension on both sides.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage, ImageFormat, ImageReader};

use crate::error::IoError;

/// A decoded image and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Decoded pixels.
    pub image: DynamicImage,
    /// Path the image was read from.
    pub path: PathBuf,
}

impl LoadedImage {
    /// The path as a display string, the form an edit session keeps.
    #[must_use]
    pub fn source_label(&self) -> String {
        self.path.display().to_string()
    }
}

/// Decode the image at `path`.
///
/// # Errors
///
/// Returns [`IoError::Io`] if the file cannot be opened and
/// [`IoError::Decode`] if its contents are not a supported image.
pub fn load_image(path: impl AsRef<Path>) -> Result<LoadedImage, IoError> {
    let path = path.as_ref();
    let reader = ImageReader::open(path).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = reader.decode().map_err(|source| IoError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "image loaded"
    );
    Ok(LoadedImage {
        image,
        path: path.to_path_buf(),
    })
}

/// Encode `image` to `path`.
///
/// JPEG has no alpha or 16-bit support, so other colour types are
/// flattened to RGB8 before encoding.
///
/// # Errors
///
/// Returns [`IoError::UnsupportedFormat`] if the extension names no
/// known format and [`IoError::Encode`] if encoding or writing fails.
pub fn save_image(image: &DynamicImage, path: impl AsRef<Path>) -> Result<(), IoError> {
    let path = path.as_ref();
    let format =
        ImageFormat::from_path(path).map_err(|_| IoError::UnsupportedFormat(path.to_path_buf()))?;

    let encodable = if format == ImageFormat::Jpeg
        && !matches!(image.color(), ColorType::L8 | ColorType::Rgb8)
    {
        Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8()))
    } else {
        Cow::Borrowed(image)
    };

    encodable
        .save_with_format(path, format)
        .map_err(|source| IoError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), ?format, "image saved");
    Ok(())
}
