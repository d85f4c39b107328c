//! Input validation and decoding.
//!
//! Files are validated (size ceiling, accepted raster formats) before any
//! decode work; rejected inputs surface named errors and never reach the
//! rendering core. A decoded [`ImageFile`] is immutable for its lifetime.

use std::path::Path;

use image::RgbaImage;

use crate::error::{Error, Result};

/// Input file size ceiling: 50 MB.
pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Extensions accepted for decoding.
const ACCEPTED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "webp", "bmp", "tif", "tiff", "gif"];

/// A decoded raster source: display name (file stem), dimensions, and pixels.
#[derive(Debug, Clone)]
pub struct ImageFile {
    /// File name without its extension.
    pub name: String,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// The decoded RGBA raster.
    pub pixels: RgbaImage,
}

impl ImageFile {
    /// Wrap an already-decoded raster.
    #[must_use]
    pub fn from_pixels(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            width: pixels.width(),
            height: pixels.height(),
            pixels,
        }
    }
}

/// Check whether a path carries an accepted raster extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ACCEPTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

fn check_size(path: &Path, size: u64) -> Result<()> {
    if size > MAX_FILE_SIZE_BYTES {
        return Err(Error::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_FILE_SIZE_BYTES,
        });
    }
    Ok(())
}

/// Validate a file without decoding it.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for unknown extensions and
/// [`Error::FileTooLarge`] past the 50 MB ceiling. Oversized inputs are
/// rejected here, never silently truncated.
pub fn validate_file(path: &Path) -> Result<()> {
    if !is_supported_image(path) {
        return Err(Error::UnsupportedFormat(path.display().to_string()));
    }
    let size = std::fs::metadata(path)?.len();
    check_size(path, size)
}

/// Validate and decode one file into an [`ImageFile`].
///
/// # Errors
///
/// Validation errors as in [`validate_file`]; decode failures surface as
/// [`Error::Decode`] naming the file so batch callers can report per file.
pub fn load_image(path: &Path) -> Result<ImageFile> {
    validate_file(path)?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let decoded = image::open(path).map_err(|source| Error::Decode {
        name: name.clone(),
        source,
    })?;

    Ok(ImageFile::from_pixels(name, decoded.to_rgba8()))
}
