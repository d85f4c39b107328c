//! Raster export adapters: PNG, JPEG, and ZIP bundling.
//!
//! The input contract is a fully rendered RGBA surface at the source image's
//! native resolution; everything here only encodes.

use std::io::{Cursor, Write};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, Rgba, RgbaImage};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{Error, Result};

/// JPEG encode quality, matching a canvas export at 0.92.
pub const JPEG_QUALITY: u8 = 92;

/// Encoded output formats for a single image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Lossless, preserves transparency.
    Png,
    /// Quality 92, flattened onto a white background.
    Jpeg,
}

impl ImageFormat {
    /// The file extension used for download names.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// Encode a rendered surface as lossless PNG, transparency preserved.
///
/// # Errors
///
/// Returns [`Error::Export`] if the encoder produces no data.
pub fn encode_png(surface: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        surface.as_raw(),
        surface.width(),
        surface.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    if out.is_empty() {
        return Err(Error::Export("PNG encoder produced no data".to_string()));
    }
    Ok(out)
}

/// Encode a rendered surface as JPEG at quality 92, flattened onto white.
///
/// # Errors
///
/// Returns [`Error::Export`] if the encoder produces no data.
pub fn encode_jpeg(surface: &RgbaImage) -> Result<Vec<u8>> {
    let flat = flatten_on_white(surface);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&flat)?;
    if out.is_empty() {
        return Err(Error::Export("JPEG encoder produced no data".to_string()));
    }
    Ok(out)
}

/// Encode in the requested format.
///
/// # Errors
///
/// Propagates the underlying encoder errors.
pub fn encode(surface: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>> {
    match format {
        ImageFormat::Png => encode_png(surface),
        ImageFormat::Jpeg => encode_jpeg(surface),
    }
}

/// Composite an RGBA surface over an opaque white background.
#[must_use]
pub fn flatten_on_white(surface: &RgbaImage) -> image::RgbImage {
    image::RgbImage::from_fn(surface.width(), surface.height(), |x, y| {
        let Rgba([r, g, b, a]) = *surface.get_pixel(x, y);
        let a = f32::from(a) / 255.0;
        let over = |c: u8| -> u8 {
            let v = f32::from(c) * a + 255.0 * (1.0 - a);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                v.round().clamp(0.0, 255.0) as u8
            }
        };
        image::Rgb([over(r), over(g), over(b)])
    })
}

/// The download name for one exported image: `{name}-watermarked.{ext}`.
#[must_use]
pub fn export_name(image_name: &str, extension: &str) -> String {
    format!("{image_name}-watermarked.{extension}")
}

/// Bundle multiple encoded images into a single ZIP archive, one entry per
/// image, named via [`export_name`].
///
/// # Errors
///
/// Returns archive or I/O errors from the ZIP writer.
pub fn write_archive(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, bytes) in entries {
        zip.start_file(name.clone(), options)?;
        zip.write_all(bytes)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
