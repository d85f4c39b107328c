//! Error types for the tilemark crate.

use std::path::PathBuf;

/// Errors that can occur while validating, rendering, or exporting images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input file exceeds the 50 MB size ceiling.
    #[error("{path}: file is {size} bytes, exceeds the {limit} byte limit")]
    FileTooLarge {
        /// Path of the rejected file.
        path: PathBuf,
        /// Actual file size in bytes.
        size: u64,
        /// Maximum accepted size in bytes.
        limit: u64,
    },

    /// The input file is not one of the accepted raster formats.
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// A file could not be decoded into pixels.
    #[error("failed to decode {name}: {source}")]
    Decode {
        /// Name of the file that failed to decode.
        name: String,
        /// Underlying decoder error.
        source: image::ImageError,
    },

    /// A color string was not valid `#RGB` or `#RRGGBB` hex.
    #[error("invalid hex color {0:?}")]
    InvalidColor(String),

    /// A font family name was not recognized.
    #[error("unknown font family: {0:?}")]
    InvalidFont(String),

    /// An encoder produced no output.
    #[error("export failed: {0}")]
    Export(String),

    /// A settings JSON document could not be parsed.
    #[error("invalid settings document: {0}")]
    Settings(#[from] serde_json::Error),

    /// An error occurred during image encoding or decoding.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// An error occurred while writing a ZIP archive.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
