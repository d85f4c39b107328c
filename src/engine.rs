//! Batch watermarking engine.
//!
//! Ties the pieces together for file-based callers: validate and decode an
//! input, render the watermark, encode, and write. Each file produces its own
//! [`ProcessResult`]; one bad file never aborts the rest of a batch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::debug;

use crate::error::{Error, Result};
use crate::export::{self, ImageFormat};
use crate::loader::{self, ImageFile};
use crate::settings::WatermarkSettings;
use crate::{compositor, pdf};

/// Export format selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossless PNG.
    Png,
    /// JPEG at quality 92 on a white background.
    Jpeg,
    /// PDF, one page per image.
    Pdf,
}

impl OutputFormat {
    /// File extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "pdf" => Ok(OutputFormat::Pdf),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Options controlling batch processing.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Output format for encoded files.
    pub format: OutputFormat,
    /// Fixed RNG seed for reproducible noise; entropy-seeded when absent.
    pub seed: Option<u64>,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            seed: None,
            verbose: false,
            quiet: false,
        }
    }
}

/// Result of processing a single input file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the input file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
}

/// The watermarking engine: a settings value plus the render/export plumbing.
///
/// Create once and reuse across images; the engine keeps no per-render state,
/// so concurrent renders of different images are safe.
pub struct WatermarkEngine {
    settings: WatermarkSettings,
}

impl WatermarkEngine {
    /// Create an engine for the given settings value.
    #[must_use]
    pub fn new(settings: WatermarkSettings) -> Self {
        Self { settings }
    }

    /// The settings this engine renders with.
    #[must_use]
    pub fn settings(&self) -> &WatermarkSettings {
        &self.settings
    }

    /// Render the watermark onto a decoded image.
    #[must_use]
    pub fn render(&self, image: &ImageFile, seed: Option<u64>) -> RgbaImage {
        match seed {
            Some(seed) => compositor::render_seeded(&image.pixels, &self.settings, seed),
            None => compositor::render(&image.pixels, &self.settings),
        }
    }

    /// Render and encode one decoded image to bytes in the given format.
    ///
    /// # Errors
    ///
    /// Propagates encoder failures.
    pub fn export(&self, image: &ImageFile, opts: &ProcessOptions) -> Result<Vec<u8>> {
        let surface = self.render(image, opts.seed);
        match opts.format {
            OutputFormat::Png => export::encode_png(&surface),
            OutputFormat::Jpeg => export::encode_jpeg(&surface),
            OutputFormat::Pdf => pdf::export_pdf(&[&surface]),
        }
    }

    /// Process a single image file: validate, decode, render, encode, write.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path, opts: &ProcessOptions) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            message: String::new(),
        };

        let image = match loader::load_image(input) {
            Ok(img) => img,
            Err(e) => {
                result.message = e.to_string();
                return result;
            }
        };
        debug!(name = %image.name, width = image.width, height = image.height, "processing");

        let bytes = match self.export(&image, opts) {
            Ok(bytes) => bytes,
            Err(e) => {
                result.message = e.to_string();
                return result;
            }
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match std::fs::write(output, bytes) {
            Ok(()) => {
                result.success = true;
                result.message = format!("wrote {}", output.display());
            }
            Err(e) => {
                result.message = format!("failed to write output: {e}");
            }
        }

        result
    }

    /// Process all supported images in a directory.
    ///
    /// Runs files in parallel when the `cli` feature is enabled. Per-file
    /// failures are reported in that file's [`ProcessResult`] and never stop
    /// the batch.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let mut inputs: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| loader::is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    message: format!("failed to read directory: {e}"),
                }];
            }
        };
        inputs.sort();

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult {
                    path: output_dir.to_path_buf(),
                    success: false,
                    message: format!("failed to create output directory: {e}"),
                }];
            }
        }

        let run = |input: &PathBuf| -> ProcessResult {
            let output = output_dir.join(output_file_name(input, opts.format));
            self.process_file(input, &output, opts)
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            inputs.par_iter().map(run).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            inputs.iter().map(run).collect()
        }
    }

    /// Export several inputs into a single bundled document: a multi-page PDF
    /// for [`OutputFormat::Pdf`], otherwise a ZIP archive with one encoded
    /// file per image. Inputs sharing a file stem get a numeric suffix so
    /// archive entry names stay unique.
    ///
    /// # Errors
    ///
    /// Fails on the first unloadable input (bundles are all-or-nothing,
    /// unlike per-file directory processing) and on encoder errors.
    pub fn export_bundle(&self, inputs: &[PathBuf], opts: &ProcessOptions) -> Result<Vec<u8>> {
        let mut images = Vec::with_capacity(inputs.len());
        for input in inputs {
            images.push(loader::load_image(input)?);
        }

        match opts.format {
            OutputFormat::Pdf => {
                let surfaces: Vec<RgbaImage> =
                    images.iter().map(|img| self.render(img, opts.seed)).collect();
                let refs: Vec<&RgbaImage> = surfaces.iter().collect();
                pdf::export_pdf(&refs)
            }
            OutputFormat::Png | OutputFormat::Jpeg => {
                let format = match opts.format {
                    OutputFormat::Jpeg => ImageFormat::Jpeg,
                    _ => ImageFormat::Png,
                };
                let mut seen = HashMap::new();
                let mut entries = Vec::with_capacity(images.len());
                for image in &images {
                    let surface = self.render(image, opts.seed);
                    let bytes = export::encode(&surface, format)?;
                    let name = unique_entry_name(&mut seen, &image.name, format.extension());
                    entries.push((name, bytes));
                }
                export::write_archive(&entries)
            }
        }
    }
}

/// Archive entry name for a stem, suffixed `-2`, `-3`, ... on repeats.
fn unique_entry_name(seen: &mut HashMap<String, u32>, stem: &str, extension: &str) -> String {
    let count = seen.entry(stem.to_string()).or_insert(0);
    *count += 1;
    if *count == 1 {
        export::export_name(stem, extension)
    } else {
        export::export_name(&format!("{stem}-{count}"), extension)
    }
}

/// Output file name for one input: `{stem}-watermarked.{ext}`.
#[must_use]
pub fn output_file_name(input: &Path, format: OutputFormat) -> String {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    export::export_name(&stem, format.extension())
}

/// Default output path next to the input: `photo.jpg` becomes
/// `photo-watermarked.png` (or the chosen format's extension).
#[must_use]
pub fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(output_file_name(input, format))
}

/// Default name for a bundled multi-image export.
#[must_use]
pub fn bundle_file_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Pdf => "watermarked-images.pdf",
        OutputFormat::Png | OutputFormat::Jpeg => "watermarked-images.zip",
    }
}
