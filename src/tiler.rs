//! Layer text tiling.
//!
//! Paints one layer's text as a repeating, rotated grid of text blocks across
//! an RGBA surface. The grid is centered on the canvas center and extends to
//! the canvas diagonal in every direction, so coverage is complete under any
//! rotation angle. The same geometry path serves both the visible render and
//! the mask pass used for the noise boost, keeping the two pixel-aligned.

use ab_glyph::{Font, PxScale, ScaleFont};
use image::{GrayImage, Rgba, RgbaImage};

use crate::fonts;
use crate::settings::{Color, LayerSettings};

/// Border padding around the text block, in pixels.
const BORDER_PAD: f32 = 8.0;

/// Minimum effective tile cell size. Strongly negative spacing is clamped
/// here instead of degenerating the grid loop.
const MIN_CELL: f32 = 1.0;

/// How a tiling pass paints its tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Layer color at the layer's opacity, border included when enabled.
    Visible,
    /// Solid black at full alpha, no border. Used to build the boost mask.
    Mask,
}

/// Measured geometry of one layer's text block and tile cell.
#[derive(Debug, Clone)]
pub struct BlockMetrics {
    /// Width of each line in pixels, in input order.
    pub line_widths: Vec<f32>,
    /// Widest line.
    pub max_line_width: f32,
    /// Line height (`font_size * 1.2`).
    pub line_height: f32,
    /// Total block height (`line_height * line count`).
    pub block_height: f32,
    /// Horizontal tile step (`max_line_width + spacing`, clamped positive).
    pub cell_width: f32,
    /// Vertical tile step (`block_height + spacing`, clamped positive).
    pub cell_height: f32,
}

/// Measure a layer's text block in its configured font.
#[must_use]
pub fn measure_block(layer: &LayerSettings) -> BlockMetrics {
    let font = fonts::font_for(layer.font_family);
    let lines: Vec<&str> = layer.text.split('\n').collect();

    let line_widths: Vec<f32> = lines
        .iter()
        .map(|line| fonts::line_width(font, line, layer.font_size))
        .collect();
    let max_line_width = line_widths.iter().copied().fold(0.0f32, f32::max);

    let line_height = layer.font_size * 1.2;
    #[allow(clippy::cast_precision_loss)]
    let block_height = line_height * lines.len() as f32;

    BlockMetrics {
        line_widths,
        max_line_width,
        line_height,
        block_height,
        cell_width: (max_line_width + layer.spacing).max(MIN_CELL),
        cell_height: (block_height + layer.spacing).max(MIN_CELL),
    }
}

/// Paint `layer.text` as a repeating rotated grid across the surface.
///
/// Whitespace-only text is a no-op. Rotation of 0 goes through the same
/// transform path as any other angle.
pub fn tile(surface: &mut RgbaImage, layer: &LayerSettings, fill: FillMode) {
    if !layer.has_text() {
        return;
    }

    let (color, opacity) = match fill {
        FillMode::Visible => (layer.color, layer.opacity.clamp(0.0, 1.0)),
        FillMode::Mask => (Color::black(), 1.0),
    };
    if opacity <= 0.0 {
        return;
    }

    let metrics = measure_block(layer);
    let sprite = render_block_sprite(layer, &metrics, fill);

    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    let diagonal = (w * w + h * h).sqrt();
    let start_x = w / 2.0 - diagonal + layer.offset_x;
    let start_y = h / 2.0 - diagonal + layer.offset_y;
    let end_x = w / 2.0 + diagonal + layer.offset_x;
    let end_y = h / 2.0 + diagonal + layer.offset_y;

    let radians = layer.rotation.to_radians();

    let mut y = start_y;
    while y < end_y {
        let mut x = start_x;
        while x < end_x {
            composite_rotated(surface, &sprite, x, y, radians, color, opacity);
            x += metrics.cell_width;
        }
        y += metrics.cell_height;
    }
}

/// A rasterized text block: a coverage map whose center corresponds to the
/// tile origin.
struct BlockSprite {
    coverage: GrayImage,
    half_w: f32,
    half_h: f32,
}

/// Rasterize the layer's text block once, axis-aligned, at full intensity.
///
/// Lines are vertically centered within the block (first line's center at
/// `-block_height/2 + line_height/2`, stepping by `line_height`) and each is
/// horizontally centered at x = 0.
fn render_block_sprite(layer: &LayerSettings, metrics: &BlockMetrics, fill: FillMode) -> BlockSprite {
    let font = fonts::font_for(layer.font_family);
    let border = layer.border_enabled && fill == FillMode::Visible;
    let line_w = layer.font_size * 0.08;

    // Pad for the border stroke and for glyphs that overhang their advance.
    let mut pad = (layer.font_size * 0.25).max(2.0);
    if border {
        pad = pad.max(BORDER_PAD + line_w);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let sprite_w = (metrics.max_line_width + 2.0 * pad).ceil().max(1.0) as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let sprite_h = (metrics.block_height + 2.0 * pad).ceil().max(1.0) as u32;

    let mut coverage = GrayImage::new(sprite_w, sprite_h);
    #[allow(clippy::cast_precision_loss)]
    let (half_w, half_h) = (sprite_w as f32 / 2.0, sprite_h as f32 / 2.0);

    let scale = PxScale::from(layer.font_size);
    let scaled = font.as_scaled(scale);
    let baseline_shift = fonts::middle_baseline_offset(font, layer.font_size);

    let block_top = -metrics.block_height / 2.0 + metrics.line_height / 2.0;

    for (i, line) in layer.text.split('\n').enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let middle_y = block_top + i as f32 * metrics.line_height;
        let baseline_y = half_h + middle_y + baseline_shift;
        let mut cursor_x = half_w - metrics.line_widths[i] / 2.0;

        let mut prev: Option<ab_glyph::GlyphId> = None;
        for c in line.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                cursor_x += scaled.kern(prev, id);
            }

            let glyph = id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, c| {
                    #[allow(clippy::cast_possible_truncation)]
                    let x = px as i32 + bounds.min.x as i32;
                    #[allow(clippy::cast_possible_truncation)]
                    let y = py as i32 + bounds.min.y as i32;
                    if x >= 0 && y >= 0 && (x as u32) < sprite_w && (y as u32) < sprite_h {
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        let v = (c.clamp(0.0, 1.0) * 255.0) as u8;
                        let px = coverage.get_pixel_mut(x as u32, y as u32);
                        // Overlapping anti-aliased edges keep the stronger hit.
                        px[0] = px[0].max(v);
                    }
                });
            }

            cursor_x += scaled.h_advance(id);
            prev = Some(id);
        }
    }

    if border {
        stroke_border(&mut coverage, metrics, line_w, half_w, half_h);
    }

    BlockSprite {
        coverage,
        half_w,
        half_h,
    }
}

/// Stroke a rectangle centered on the text block, padded 8px on all sides.
/// The stroke straddles the rectangle path, half inside and half outside.
fn stroke_border(
    coverage: &mut GrayImage,
    metrics: &BlockMetrics,
    line_w: f32,
    half_w: f32,
    half_h: f32,
) {
    let rx = metrics.max_line_width / 2.0 + BORDER_PAD;
    let ry = metrics.block_height / 2.0 + BORDER_PAD;
    let outer_x = rx + line_w / 2.0;
    let outer_y = ry + line_w / 2.0;
    let inner_x = rx - line_w / 2.0;
    let inner_y = ry - line_w / 2.0;

    for y in 0..coverage.height() {
        for x in 0..coverage.width() {
            #[allow(clippy::cast_precision_loss)]
            let tx = (x as f32 + 0.5 - half_w).abs();
            #[allow(clippy::cast_precision_loss)]
            let ty = (y as f32 + 0.5 - half_h).abs();
            let in_outer = tx <= outer_x && ty <= outer_y;
            let in_inner = tx < inner_x && ty < inner_y;
            if in_outer && !in_inner {
                coverage.get_pixel_mut(x, y)[0] = 255;
            }
        }
    }
}

/// Composite the sprite onto the surface, rotated by `radians` about
/// `(center_x, center_y)`, with bilinear resampling and source-over blending.
fn composite_rotated(
    surface: &mut RgbaImage,
    sprite: &BlockSprite,
    center_x: f32,
    center_y: f32,
    radians: f32,
    color: Color,
    opacity: f32,
) {
    let (cos, sin) = (radians.cos(), radians.sin());
    let (hw, hh) = (sprite.half_w, sprite.half_h);

    // Bounding box of the rotated sprite, clipped to the surface.
    let extent_x = hw * cos.abs() + hh * sin.abs();
    let extent_y = hw * sin.abs() + hh * cos.abs();
    #[allow(clippy::cast_possible_truncation)]
    let x0 = (center_x - extent_x).floor().max(0.0) as i64;
    #[allow(clippy::cast_possible_truncation)]
    let y0 = (center_y - extent_y).floor().max(0.0) as i64;
    #[allow(clippy::cast_precision_loss)]
    let (surf_w, surf_h) = (surface.width() as f32, surface.height() as f32);
    #[allow(clippy::cast_possible_truncation)]
    let x1 = (center_x + extent_x).ceil().min(surf_w) as i64;
    #[allow(clippy::cast_possible_truncation)]
    let y1 = (center_y + extent_y).ceil().min(surf_h) as i64;
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let src_w = sprite.coverage.width();
    let src_h = sprite.coverage.height();

    for py in y0..y1 {
        for px in x0..x1 {
            #[allow(clippy::cast_precision_loss)]
            let dx = px as f32 + 0.5 - center_x;
            #[allow(clippy::cast_precision_loss)]
            let dy = py as f32 + 0.5 - center_y;

            // Inverse rotation back into sprite space.
            let sx = dx * cos + dy * sin + hw - 0.5;
            let sy = -dx * sin + dy * cos + hh - 0.5;

            let a = sample_bilinear(&sprite.coverage, sx, sy, src_w, src_h);
            if a <= 0.0 {
                continue;
            }
            let alpha = (a / 255.0) * opacity;

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pixel = surface.get_pixel_mut(px as u32, py as u32);
            *pixel = blend_over(*pixel, color, alpha);
        }
    }
}

/// Bilinear sample of the coverage map; outside pixels read as zero.
fn sample_bilinear(coverage: &GrayImage, sx: f32, sy: f32, w: u32, h: u32) -> f32 {
    if sx <= -1.0 || sy <= -1.0 {
        return 0.0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let x0 = sx.floor() as i64;
    #[allow(clippy::cast_possible_truncation)]
    let y0 = sy.floor() as i64;
    #[allow(clippy::cast_precision_loss)]
    let fx = sx - x0 as f32;
    #[allow(clippy::cast_precision_loss)]
    let fy = sy - y0 as f32;

    let at = |x: i64, y: i64| -> f32 {
        if x < 0 || y < 0 || x >= i64::from(w) || y >= i64::from(h) {
            return 0.0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let v = coverage.get_pixel(x as u32, y as u32)[0];
        f32::from(v)
    };

    at(x0, y0) * (1.0 - fx) * (1.0 - fy)
        + at(x0 + 1, y0) * fx * (1.0 - fy)
        + at(x0, y0 + 1) * (1.0 - fx) * fy
        + at(x0 + 1, y0 + 1) * fx * fy
}

/// Source-over blend of a constant color at the given alpha onto a pixel.
fn blend_over(dst: Rgba<u8>, color: Color, alpha: f32) -> Rgba<u8> {
    let src = [
        f32::from(color.r),
        f32::from(color.g),
        f32::from(color.b),
    ];
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = alpha + dst_a * (1.0 - alpha);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for ch in 0..3 {
        let d = f32::from(dst[ch]);
        let c = (src[ch] * alpha + d * dst_a * (1.0 - alpha)) / out_a;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            out[ch] = c.round().clamp(0.0, 255.0) as u8;
        }
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{FontFamily, PRESET_DEFAULT, PresetStyle};

    fn layer(text: &str) -> LayerSettings {
        let mut l = apply(PRESET_DEFAULT, text);
        l.rotation = 26.0;
        l
    }

    fn apply(style: PresetStyle, text: &str) -> LayerSettings {
        LayerSettings {
            text: text.to_string(),
            color: style.color,
            opacity: style.opacity,
            font_size: style.font_size,
            rotation: style.rotation,
            spacing: style.spacing,
            offset_x: 0.0,
            offset_y: 0.0,
            font_family: style.font_family,
            border_enabled: style.border_enabled,
        }
    }

    fn opaque_canvas(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn empty_text_is_a_no_op() {
        let mut canvas = opaque_canvas(64, 64);
        let before = canvas.clone();
        tile(&mut canvas, &layer("   \n  "), FillMode::Visible);
        assert_eq!(canvas, before);
    }

    #[test]
    fn tiling_paints_pixels() {
        let mut canvas = opaque_canvas(200, 150);
        tile(&mut canvas, &layer("WATERMARK"), FillMode::Visible);
        let touched = canvas.pixels().filter(|p| p.0[..3] != [255, 255, 255]).count();
        assert!(touched > 0, "visible tiling should change pixels");
    }

    #[test]
    fn mask_mode_matches_visible_geometry() {
        // Same layer, both modes on transparent canvases: every pixel the
        // visible pass touches must carry mask weight too.
        let mut l = layer("ALIGN");
        l.opacity = 1.0;
        l.border_enabled = false;

        let mut visible = RgbaImage::new(160, 120);
        tile(&mut visible, &l, FillMode::Visible);
        let mut mask = RgbaImage::new(160, 120);
        tile(&mut mask, &l, FillMode::Mask);

        for (v, m) in visible.pixels().zip(mask.pixels()) {
            assert_eq!(v[3], m[3], "mask alpha must align with visible alpha");
        }
    }

    #[test]
    fn mask_mode_skips_border() {
        let mut l = layer("EDGE");
        l.opacity = 1.0;
        l.border_enabled = true;

        let mut visible = RgbaImage::new(160, 120);
        tile(&mut visible, &l, FillMode::Visible);
        let mut mask = RgbaImage::new(160, 120);
        tile(&mut mask, &l, FillMode::Mask);

        let visible_px = visible.pixels().filter(|p| p[3] > 0).count();
        let mask_px = mask.pixels().filter(|p| p[3] > 0).count();
        assert!(visible_px > mask_px, "border adds pixels only in visible mode");
    }

    #[test]
    fn single_line_equals_one_entry_block() {
        let one = measure_block(&layer("HELLO"));
        assert_eq!(one.line_widths.len(), 1);
        assert!((one.block_height - 36.0 * 1.2).abs() < 1e-3);

        let two = measure_block(&layer("HELLO\nWORLD"));
        assert_eq!(two.line_widths.len(), 2);
        assert!((two.block_height - 36.0 * 1.2 * 2.0).abs() < 1e-3);
    }

    #[test]
    fn negative_spacing_clamps_cell_to_minimum() {
        let mut l = layer("X");
        l.spacing = -10_000.0;
        let metrics = measure_block(&l);
        assert_eq!(metrics.cell_width, 1.0);
        assert_eq!(metrics.cell_height, 1.0);
    }

    #[test]
    fn coverage_reaches_every_corner() {
        // Full-block glyphs with negative spacing make the tiles overlap in
        // both axes, so the grid paints the entire plane. After tiling at any
        // rotation all four corner pixels must have been touched; a grid that
        // stops short of the canvas diagonal leaves at least one corner white.
        for rotation in [-90.0f32, 0.0, 45.0, 90.0] {
            let mut l = layer("\u{2588}\u{2588}\u{2588}\u{2588}");
            l.rotation = rotation;
            l.font_size = 40.0;
            l.spacing = -24.0;
            l.opacity = 1.0;

            let mut canvas = opaque_canvas(160, 120);
            tile(&mut canvas, &l, FillMode::Visible);

            for (x, y) in [(0, 0), (159, 0), (0, 119), (159, 119)] {
                let px = canvas.get_pixel(x, y);
                assert!(
                    px.0[..3] != [255, 255, 255],
                    "corner ({x}, {y}) untouched at rotation {rotation}"
                );
            }
        }
    }

    #[test]
    fn zero_rotation_uses_same_path_as_rotated() {
        let mut l = layer("ZERO");
        l.rotation = 0.0;
        let mut canvas = opaque_canvas(128, 96);
        tile(&mut canvas, &l, FillMode::Visible);
        let touched = canvas.pixels().any(|p| p.0[..3] != [255, 255, 255]);
        assert!(touched);
    }

    #[test]
    fn offsets_shift_the_grid() {
        let mut base = opaque_canvas(200, 150);
        tile(&mut base, &layer("SHIFT"), FillMode::Visible);

        let mut shifted_layer = layer("SHIFT");
        shifted_layer.offset_x = 37.0;
        shifted_layer.offset_y = 19.0;
        let mut shifted = opaque_canvas(200, 150);
        tile(&mut shifted, &shifted_layer, FillMode::Visible);

        assert_ne!(base, shifted, "offsets must move the tiling grid");
    }

    #[test]
    fn tiling_is_deterministic() {
        let l = layer("REPEAT");
        let mut a = opaque_canvas(180, 140);
        let mut b = opaque_canvas(180, 140);
        tile(&mut a, &l, FillMode::Visible);
        tile(&mut b, &l, FillMode::Visible);
        assert_eq!(a, b);
    }

    #[test]
    fn courier_font_changes_output() {
        let mut arial = layer("FONTS");
        arial.spacing = 60.0;
        let mut courier = arial.clone();
        courier.font_family = FontFamily::CourierNew;

        let mut a = opaque_canvas(200, 150);
        tile(&mut a, &arial, FillMode::Visible);
        let mut c = opaque_canvas(200, 150);
        tile(&mut c, &courier, FillMode::Visible);
        assert_ne!(a, c);
    }
}
