//! Embedded font catalog.
//!
//! The five selectable families resolve onto three embedded DejaVu faces
//! (metric substitution, since the original faces are not redistributable):
//! sans for Arial/Verdana, serif for Times New Roman/Georgia, mono for
//! Courier New. Faces are parsed lazily and cached for the process lifetime.

use std::sync::OnceLock;

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};

use crate::settings::FontFamily;

const SANS_DATA: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");
const SERIF_DATA: &[u8] = include_bytes!("fonts/DejaVuSerif.ttf");
const MONO_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

static SANS: OnceLock<FontRef<'static>> = OnceLock::new();
static SERIF: OnceLock<FontRef<'static>> = OnceLock::new();
static MONO: OnceLock<FontRef<'static>> = OnceLock::new();

/// Resolve a family to its embedded face.
///
/// # Panics
///
/// Panics only if the compiled-in font data is corrupt.
#[must_use]
pub fn font_for(family: FontFamily) -> &'static FontRef<'static> {
    let (cell, data) = match family {
        FontFamily::Arial | FontFamily::Verdana => (&SANS, SANS_DATA),
        FontFamily::TimesNewRoman | FontFamily::Georgia => (&SERIF, SERIF_DATA),
        FontFamily::CourierNew => (&MONO, MONO_DATA),
    };
    cell.get_or_init(|| {
        FontRef::try_from_slice(data).expect("embedded font data failed to parse")
    })
}

/// Measure a single line's rendered width in pixels: the sum of glyph
/// advances plus kerning.
#[must_use]
pub fn line_width(font: &FontRef<'_>, text: &str, font_size: f32) -> f32 {
    let scaled = font.as_scaled(PxScale::from(font_size));
    let mut width = 0.0f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Vertical distance from a middle baseline to the real glyph baseline.
///
/// Text is positioned the way a canvas `textBaseline = "middle"` would place
/// it: the target y coordinate is the vertical center of the ascent/descent
/// span, so the baseline sits `(ascent + descent) / 2` below it (descent is
/// negative).
#[must_use]
pub fn middle_baseline_offset(font: &FontRef<'_>, font_size: f32) -> f32 {
    let scaled = font.as_scaled(PxScale::from(font_size));
    (scaled.ascent() + scaled.descent()) / 2.0
}
