//! Watermark compositing.
//!
//! Orchestrates one full render: draw the base image, tile each active layer
//! in visible mode, then (when noise is configured) build the glyph boost
//! mask and run the noise pass. Rendering is synchronous, pure compute over
//! in-memory buffers, and retains no state between calls, so repeated
//! invocations with the same inputs behave identically and separate images
//! can render on separate threads.

use image::{imageops, GrayImage, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::noise::{self, NoiseBoost};
use crate::settings::{LayerSettings, WatermarkSettings};
use crate::tiler::{self, FillMode};

/// Minimum boost-mask blur radius; small fonts still get a wide falloff.
const MIN_BLUR_RADIUS: f32 = 36.0;

/// Render the watermark onto a copy of the base image.
///
/// The output has the base image's native dimensions. Layers are tiled in
/// slot order; the noise pass runs only when `noise_level` or `noise_boost`
/// is positive. The injected RNG drives the noise offsets, so a seeded RNG
/// reproduces output byte-for-byte.
#[must_use]
pub fn render_with_rng<R: Rng>(
    base: &RgbaImage,
    settings: &WatermarkSettings,
    rng: &mut R,
) -> RgbaImage {
    let mut surface = base.clone();
    let layers = settings.active_layers();
    debug!(
        width = surface.width(),
        height = surface.height(),
        layers = layers.len(),
        noise_level = settings.noise_level,
        noise_boost = settings.noise_boost,
        "rendering watermark"
    );

    for layer in &layers {
        tiler::tile(&mut surface, layer, FillMode::Visible);
    }

    if settings.noise_level == 0 && settings.noise_boost == 0 {
        return surface;
    }

    let mask = if settings.noise_boost > 0 && settings.has_visible_text() {
        Some(build_boost_mask(
            surface.width(),
            surface.height(),
            settings,
        ))
    } else {
        None
    };

    let boost = mask.as_ref().map(|mask| NoiseBoost {
        mask,
        amplitude: settings.noise_boost,
    });
    noise::apply_noise(&mut surface, settings.noise_level, boost, rng);

    surface
}

/// Render with an entropy-seeded RNG.
#[must_use]
pub fn render(base: &RgbaImage, settings: &WatermarkSettings) -> RgbaImage {
    let mut rng = StdRng::from_entropy();
    render_with_rng(base, settings, &mut rng)
}

/// Render with a fixed seed, for reproducible output.
#[must_use]
pub fn render_seeded(base: &RgbaImage, settings: &WatermarkSettings, seed: u64) -> RgbaImage {
    let mut rng = StdRng::seed_from_u64(seed);
    render_with_rng(base, settings, &mut rng)
}

/// Build the boost mask: every active layer tiled in mask mode onto a blank
/// transparent surface, blurred with radius equal to the maximum active font
/// size (never below 36), read back through the alpha channel. The blur gives
/// a smooth noise falloff around the glyph shapes, matching the rendered
/// tiles pixel-for-pixel at the center.
fn build_boost_mask(width: u32, height: u32, settings: &WatermarkSettings) -> GrayImage {
    let mut offscreen = RgbaImage::new(width, height);
    let layers = settings.active_layers();
    for layer in &layers {
        tiler::tile(&mut offscreen, layer, FillMode::Mask);
    }

    let radius = boost_blur_radius(&layers);
    debug!(radius, "blurring boost mask");

    let blurred = imageops::blur(&offscreen, radius);

    let mut mask = GrayImage::new(width, height);
    for (src, dst) in blurred.pixels().zip(mask.pixels_mut()) {
        dst[0] = src[3];
    }
    mask
}

/// The largest active font size, floored at [`MIN_BLUR_RADIUS`].
fn boost_blur_radius(layers: &[&LayerSettings]) -> f32 {
    layers
        .iter()
        .map(|l| l.font_size)
        .fold(MIN_BLUR_RADIUS, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{parse_hex_color, FontFamily, LayerSettings, Preset};
    use image::Rgba;

    fn confidential_layer() -> LayerSettings {
        LayerSettings {
            text: "CONFIDENTIAL".to_string(),
            color: parse_hex_color("#1714CC").unwrap(),
            opacity: 0.5,
            font_size: 36.0,
            rotation: 26.0,
            spacing: 100.0,
            offset_x: 0.0,
            offset_y: 0.0,
            font_family: FontFamily::Arial,
            border_enabled: false,
        }
    }

    fn base_image(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x * 7 + y * 13) % 256) as u8;
            Rgba([v, v / 2 + 40, 255 - v, 255])
        })
    }

    fn settings(noise_level: u32, noise_boost: u32) -> WatermarkSettings {
        WatermarkSettings {
            primary: confidential_layer(),
            secondary: None,
            noise_level,
            noise_boost,
        }
    }

    #[test]
    fn output_matches_source_dimensions() {
        let base = base_image(800, 600);
        let out = render_seeded(&base, &settings(15, 0), 1);
        assert_eq!(out.width(), 800);
        assert_eq!(out.height(), 600);
    }

    #[test]
    fn render_without_noise_is_deterministic() {
        let base = base_image(320, 240);
        let cfg = settings(0, 0);
        let a = render(&base, &cfg);
        let b = render(&base, &cfg);
        assert_eq!(a, b, "noise-free renders must be byte-identical");
    }

    #[test]
    fn seeded_render_is_deterministic() {
        let base = base_image(320, 240);
        let cfg = settings(15, 10);
        let a = render_seeded(&base, &cfg, 99);
        let b = render_seeded(&base, &cfg, 99);
        assert_eq!(a, b);
    }

    #[test]
    fn absent_layer_matches_empty_text_layer() {
        let base = base_image(240, 180);

        let absent = settings(0, 0);
        let mut empty = absent.clone();
        empty.secondary = Some(LayerSettings {
            text: "   ".to_string(),
            ..confidential_layer()
        });

        let a = render(&base, &absent);
        let b = render(&base, &empty);
        assert_eq!(a, b, "empty-text layer contributes zero visible pixels");
    }

    #[test]
    fn default_single_layer_scenario() {
        let base = base_image(800, 600);
        let cfg = settings(15, 0);
        let out = render_seeded(&base, &cfg, 7);

        assert_eq!((out.width(), out.height()), (800, 600));

        // Uniform noise band: every pixel within +/-15 of the noise-free
        // render, alpha untouched.
        let clean = render(&base, &settings(0, 0));
        assert_ne!(out, clean, "noise must perturb the render");
        for (n, c) in out.pixels().zip(clean.pixels()) {
            for ch in 0..3 {
                let d = (i32::from(n[ch]) - i32::from(c[ch])).abs();
                assert!(d <= 15, "noise exceeded amplitude: {d}");
            }
            assert_eq!(n[3], c[3]);
        }

        // The watermark actually landed on the base.
        let tiled = clean.pixels().zip(base.pixels()).any(|(a, b)| a != b);
        assert!(tiled);
    }

    #[test]
    fn double_preset_layers_render_independently() {
        let base = RgbaImage::from_pixel(400, 300, Rgba([255, 255, 255, 255]));
        let mut cfg = settings(0, 0).with_preset(Preset::Double, 0);
        cfg.primary.text = "TOP SECRET".to_string();
        cfg.secondary.as_mut().unwrap().text = "TOP SECRET".to_string();

        let both = render(&base, &cfg);
        let first_only = render(&base, &cfg.clone().with_second_layer_disabled());
        assert_ne!(both, first_only, "second layer must add visible pixels");

        // Red from layer 2 must be present somewhere.
        let has_reddish = both
            .pixels()
            .any(|p| p[0] > p[2].saturating_add(20));
        assert!(has_reddish, "counter-rotated red layer should show");
    }

    #[test]
    fn noise_bounds_with_boost() {
        let base = base_image(200, 150);
        let cfg = settings(10, 20);
        let noisy = render_seeded(&base, &cfg, 5);
        let clean = render(&base, &settings(0, 0));

        for (n, c) in noisy.pixels().zip(clean.pixels()) {
            for ch in 0..3 {
                let d = (i32::from(n[ch]) - i32::from(c[ch])).abs();
                assert!(d <= 30, "base+boost amplitude exceeded: {d}");
            }
            assert_eq!(n[3], c[3], "alpha must never change");
        }
    }

    #[test]
    fn blur_radius_is_floored_at_36() {
        let mut small = confidential_layer();
        small.font_size = 20.0;
        assert_eq!(boost_blur_radius(&[&small]), 36.0);

        let mut large = confidential_layer();
        large.font_size = 50.0;
        assert_eq!(boost_blur_radius(&[&small, &large]), 50.0);
        assert_eq!(boost_blur_radius(&[&large]), 50.0);
    }

    #[test]
    fn boost_without_text_skips_mask_but_keeps_base_noise() {
        let base = base_image(120, 90);
        let mut cfg = settings(5, 25);
        cfg.primary.text = String::new();

        let out = render_seeded(&base, &cfg, 3);
        // Base noise still applies even though no mask could be built.
        for (n, c) in out.pixels().zip(base.pixels()) {
            let d = (i32::from(n[0]) - i32::from(c[0])).abs();
            assert!(d <= 5);
        }
    }

    #[test]
    fn repeated_identical_calls_do_not_diverge() {
        let base = base_image(160, 120);
        let cfg = settings(0, 0);
        let first = render(&base, &cfg);
        // Redundant invocations with an unchanged settings value are cheap to
        // tolerate and must not accumulate state.
        let second = render(&base, &cfg);
        let third = render(&base, &cfg);
        assert_eq!(first, second);
        assert_eq!(second, third);
    }
}
