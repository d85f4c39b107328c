//! Per-pixel noise injection.
//!
//! Adds a bounded random perturbation to a pixel buffer, optionally modulated
//! by a spatial mask so extra noise lands near the watermark glyphs. One
//! offset is drawn per pixel and shared across R, G and B, which perturbs
//! luminance while preserving hue; the result reads as film grain rather than
//! chromatic static. Alpha is never touched.

use image::{GrayImage, RgbaImage};
use rand::Rng;

/// A boost mask plus the extra amplitude it modulates.
#[derive(Debug, Clone, Copy)]
pub struct NoiseBoost<'a> {
    /// Per-pixel boost weight: 0 = no boost, 255 = full boost.
    pub mask: &'a GrayImage,
    /// Additional amplitude at fully-masked pixels.
    pub amplitude: u32,
}

/// Apply bounded random noise to every pixel of the surface.
///
/// The effective amplitude at a pixel is `amplitude` plus, when a boost is
/// supplied, `mask/255 * boost.amplitude`. Each affected pixel gets a single
/// uniform offset in `[-amp, +amp]`, rounded to the nearest integer and added
/// to R, G and B with clamping to `[0, 255]`.
///
/// The RNG is injected so callers can seed it for reproducible output.
pub fn apply_noise<R: Rng>(
    surface: &mut RgbaImage,
    amplitude: u32,
    boost: Option<NoiseBoost<'_>>,
    rng: &mut R,
) {
    if amplitude == 0 && boost.is_none_or(|b| b.amplitude == 0) {
        return;
    }

    let width = surface.width();
    #[allow(clippy::cast_precision_loss)]
    let base = amplitude as f32;

    for (i, pixel) in surface.pixels_mut().enumerate() {
        let amp = match boost {
            Some(b) if b.amplitude > 0 => {
                #[allow(clippy::cast_possible_truncation)]
                let x = (i as u64 % u64::from(width)) as u32;
                #[allow(clippy::cast_possible_truncation)]
                let y = (i as u64 / u64::from(width)) as u32;
                let weight = f32::from(b.mask.get_pixel(x, y)[0]) / 255.0;
                #[allow(clippy::cast_precision_loss)]
                let extra = b.amplitude as f32;
                base + weight * extra
            }
            _ => base,
        };
        if amp <= 0.0 {
            continue;
        }

        let offset = rng.gen_range(-amp..=amp).round();
        for ch in 0..3 {
            let v = f32::from(pixel[ch]) + offset;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                pixel[ch] = v.clamp(0.0, 255.0) as u8;
            }
        }
    }
}
