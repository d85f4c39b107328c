//! Render tiled text watermarks onto raster images.
//!
//! Up to two text layers are tiled as repeating rotated grids across the
//! image, followed by an optional noise pass that concentrates extra grain
//! near the watermark glyphs to deter clean removal. The result exports as
//! PNG, JPEG, PDF, or a ZIP archive of encoded images.
//!
//! # Quick Start
//!
//! ```no_run
//! use tilemark::{compositor, WatermarkSettings};
//!
//! let mut settings = WatermarkSettings::default();
//! settings.primary.text = "CONFIDENTIAL".to_string();
//!
//! let base = image::open("photo.jpg").unwrap().to_rgba8();
//! let rendered = compositor::render(&base, &settings);
//! rendered.save("photo-watermarked.png").unwrap();
//! ```
//!
//! # Determinism
//!
//! Rendering is pure compute over in-memory buffers. With noise disabled the
//! output is byte-identical across runs; with noise enabled, supply a seed
//! ([`compositor::render_seeded`]) to reproduce output exactly.
//!
//! ```no_run
//! use tilemark::{compositor, WatermarkSettings};
//!
//! let settings = WatermarkSettings::default();
//! let base = image::open("photo.jpg").unwrap().to_rgba8();
//! let a = compositor::render_seeded(&base, &settings, 42);
//! let b = compositor::render_seeded(&base, &settings, 42);
//! assert_eq!(a, b);
//! ```

#![deny(missing_docs)]

pub mod compositor;
mod engine;
pub mod error;
pub mod export;
pub mod fonts;
pub mod loader;
pub mod noise;
pub mod pdf;
pub mod settings;
pub mod tiler;

pub use engine::{
    bundle_file_name, default_output_path, output_file_name, OutputFormat, ProcessOptions,
    ProcessResult, WatermarkEngine,
};
pub use error::{Error, Result};
pub use loader::ImageFile;
pub use settings::{LayerSettings, Preset, WatermarkSettings};
