use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tilemark::settings::{parse_hex_color, FontFamily};
use tilemark::{
    bundle_file_name, default_output_path, OutputFormat, Preset, ProcessOptions, ProcessResult,
    WatermarkEngine, WatermarkSettings,
};

#[derive(Parser)]
#[command(
    name = "tilemark",
    about = "Render tiled text watermarks onto images",
    version,
    after_help = "Simple usage: tilemark photo.jpg --text CONFIDENTIAL\n\n\
                  Multiple inputs bundle into one ZIP (png/jpeg) or one\n\
                  multi-page PDF. A directory input processes every supported\n\
                  image into the output directory."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image files, or a single directory
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Output file or directory (default: {name}-watermarked.{ext})
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export format: png, jpeg, or pdf
    #[arg(short, long, default_value = "png")]
    format: String,

    /// Settings JSON document to start from
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Apply a preset: default, subtle, stamp, or double
    #[arg(short, long)]
    preset: Option<String>,

    /// Watermark text (use \n for line breaks)
    #[arg(short, long)]
    text: Option<String>,

    /// Text color as #RGB or #RRGGBB hex
    #[arg(long)]
    color: Option<String>,

    /// Text opacity (0.0-1.0)
    #[arg(long)]
    opacity: Option<f32>,

    /// Font size in pixels
    #[arg(long)]
    font_size: Option<f32>,

    /// Tile rotation in degrees
    #[arg(long)]
    rotation: Option<f32>,

    /// Tile spacing in pixels
    #[arg(long)]
    spacing: Option<f32>,

    /// Horizontal grid offset in pixels
    #[arg(long)]
    offset_x: Option<f32>,

    /// Vertical grid offset in pixels
    #[arg(long)]
    offset_y: Option<f32>,

    /// Font family: arial, times, courier, georgia, or verdana
    #[arg(long)]
    font: Option<String>,

    /// Stroke a border box around each text tile
    #[arg(long)]
    border: bool,

    /// Enable the second watermark layer
    #[arg(long)]
    layer2: bool,

    /// Text for the second layer (implies --layer2)
    #[arg(long)]
    layer2_text: Option<String>,

    /// Base noise amplitude applied to every pixel
    #[arg(long)]
    noise: Option<u32>,

    /// Extra noise amplitude concentrated near the watermark glyphs
    #[arg(long)]
    noise_boost: Option<u32>,

    /// Fixed RNG seed for reproducible noise
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "tilemark=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let format: OutputFormat = match cli.format.parse() {
        Ok(f) => f,
        Err(_) => {
            eprintln!("Error: format must be png, jpeg, or pdf (got {:?})", cli.format);
            process::exit(1);
        }
    };

    if let Some(opacity) = cli.opacity {
        if !(0.0..=1.0).contains(&opacity) {
            eprintln!("Error: opacity must be between 0.0 and 1.0");
            process::exit(1);
        }
    }

    let settings = match build_settings(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Error: {msg}");
            process::exit(1);
        }
    };

    let opts = ProcessOptions {
        format,
        seed: cli.seed,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    let engine = WatermarkEngine::new(settings);

    let results = run(&cli, &engine, &opts);

    let mut success_count = 0u32;
    let mut fail_count = 0u32;
    for r in &results {
        print_result(r, &opts);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn run(cli: &Cli, engine: &WatermarkEngine, opts: &ProcessOptions) -> Vec<ProcessResult> {
    let first = &cli.input[0];

    if first.is_dir() {
        if cli.input.len() > 1 {
            eprintln!("Error: a directory input cannot be combined with other inputs");
            process::exit(1);
        }
        let Some(output_dir) = &cli.output else {
            eprintln!("Error: output directory is required for directory processing");
            eprintln!("Usage: tilemark <input_dir> -o <output_dir>");
            process::exit(1);
        };
        return engine.process_directory(first, output_dir, opts);
    }

    if cli.input.len() == 1 {
        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(first, opts.format));
        return vec![engine.process_file(first, &output, opts)];
    }

    // Multiple files bundle into one document.
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(bundle_file_name(opts.format)));
    let result = match engine
        .export_bundle(&cli.input, opts)
        .and_then(|bytes| std::fs::write(&output, bytes).map_err(Into::into))
    {
        Ok(()) => ProcessResult {
            path: output.clone(),
            success: true,
            message: format!("bundled {} images into {}", cli.input.len(), output.display()),
        },
        Err(e) => ProcessResult {
            path: output,
            success: false,
            message: e.to_string(),
        },
    };
    vec![result]
}

fn build_settings(cli: &Cli) -> Result<WatermarkSettings, String> {
    let mut settings = match &cli.settings {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            WatermarkSettings::from_json(&json).map_err(|e| e.to_string())?
        }
        None => WatermarkSettings::default(),
    };

    if let Some(preset) = &cli.preset {
        let preset: Preset = preset.parse().map_err(|e: tilemark::Error| e.to_string())?;
        settings = settings.with_preset(preset, 0);
    }

    if cli.layer2 || cli.layer2_text.is_some() {
        if settings.secondary.is_none() {
            settings = settings.with_second_layer_enabled();
        }
        if let Some(text) = &cli.layer2_text {
            if let Some(second) = settings.secondary.as_mut() {
                second.text = unescape_newlines(text);
            }
        }
    }

    let layer = &mut settings.primary;
    if let Some(text) = &cli.text {
        layer.text = unescape_newlines(text);
    }
    if let Some(color) = &cli.color {
        layer.color = parse_hex_color(color).map_err(|e| e.to_string())?;
    }
    if let Some(opacity) = cli.opacity {
        layer.opacity = opacity;
    }
    if let Some(font_size) = cli.font_size {
        if font_size <= 0.0 {
            return Err("font size must be positive".to_string());
        }
        layer.font_size = font_size;
    }
    if let Some(rotation) = cli.rotation {
        layer.rotation = rotation;
    }
    if let Some(spacing) = cli.spacing {
        layer.spacing = spacing;
    }
    if let Some(offset_x) = cli.offset_x {
        layer.offset_x = offset_x;
    }
    if let Some(offset_y) = cli.offset_y {
        layer.offset_y = offset_y;
    }
    if let Some(font) = &cli.font {
        layer.font_family = font
            .parse::<FontFamily>()
            .map_err(|e| e.to_string())?;
    }
    if cli.border {
        layer.border_enabled = true;
    }

    if let Some(noise) = cli.noise {
        settings.noise_level = noise;
    }
    if let Some(boost) = cli.noise_boost {
        settings.noise_boost = boost;
    }

    Ok(settings)
}

fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        if !opts.quiet {
            eprintln!("[OK] {filename}");
            if opts.verbose && !result.message.is_empty() {
                eprintln!("  -> {}", result.message);
            }
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_settings_file(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("settings.json");
        let mut settings = WatermarkSettings::default();
        settings.primary.offset_x = 25.0;
        settings.primary.offset_y = -13.0;
        std::fs::write(&path, serde_json::to_string(&settings).unwrap()).unwrap();
        path
    }

    #[test]
    fn settings_document_offsets_survive_absent_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = offset_settings_file(dir.path());

        let cli = Cli::parse_from(["tilemark", "photo.png", "--settings", path.to_str().unwrap()]);
        let built = build_settings(&cli).unwrap();
        assert_eq!(built.primary.offset_x, 25.0);
        assert_eq!(built.primary.offset_y, -13.0);
    }

    #[test]
    fn explicit_offset_flag_overrides_only_its_axis() {
        let dir = tempfile::tempdir().unwrap();
        let path = offset_settings_file(dir.path());

        let cli = Cli::parse_from([
            "tilemark",
            "photo.png",
            "--settings",
            path.to_str().unwrap(),
            "--offset-x",
            "3",
        ]);
        let built = build_settings(&cli).unwrap();
        assert_eq!(built.primary.offset_x, 3.0);
        assert_eq!(built.primary.offset_y, -13.0);
    }
}
