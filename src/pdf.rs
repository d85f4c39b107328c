//! PDF export.
//!
//! Each rendered image becomes one A4 page, landscape when the image is at
//! least as wide as it is tall, portrait otherwise. The image is embedded as
//! a DCTDecode (JPEG) object scaled to fit within a 10mm margin and centered
//! on the page. Multi-image export appends one independently-oriented page
//! per image.

use image::RgbaImage;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref};

use crate::error::{Error, Result};
use crate::export;

/// Points per millimeter (1 inch = 72 pt = 25.4 mm).
const PT_PER_MM: f32 = 72.0 / 25.4;

/// A4 page dimensions in millimeters.
const A4_SHORT_MM: f32 = 210.0;
const A4_LONG_MM: f32 = 297.0;

/// Page margin in millimeters.
const MARGIN_MM: f32 = 10.0;

struct RefAllocator(i32);

impl RefAllocator {
    fn next(&mut self) -> Ref {
        let r = Ref::new(self.0);
        self.0 += 1;
        r
    }
}

/// Placement of one image on its page, all in points.
struct Placement {
    page_w: f32,
    page_h: f32,
    draw_w: f32,
    draw_h: f32,
    x: f32,
    y: f32,
}

/// Compute page orientation and the centered fit within the margin.
///
/// Image pixels are treated as millimeters before scaling, so the scale
/// factor is `min(avail_w / width, avail_h / height)`.
fn place(width: u32, height: u32) -> Placement {
    let landscape = width >= height;
    let (page_w_mm, page_h_mm) = if landscape {
        (A4_LONG_MM, A4_SHORT_MM)
    } else {
        (A4_SHORT_MM, A4_LONG_MM)
    };

    #[allow(clippy::cast_precision_loss)]
    let (img_w, img_h) = (width as f32, height as f32);
    let avail_w = page_w_mm - MARGIN_MM * 2.0;
    let avail_h = page_h_mm - MARGIN_MM * 2.0;
    let scale = (avail_w / img_w).min(avail_h / img_h);
    let draw_w_mm = img_w * scale;
    let draw_h_mm = img_h * scale;
    let x_mm = MARGIN_MM + (avail_w - draw_w_mm) / 2.0;
    // PDF origin is bottom-left; the top-down margin offset flips.
    let y_mm = page_h_mm - MARGIN_MM - (avail_h - draw_h_mm) / 2.0 - draw_h_mm;

    Placement {
        page_w: page_w_mm * PT_PER_MM,
        page_h: page_h_mm * PT_PER_MM,
        draw_w: draw_w_mm * PT_PER_MM,
        draw_h: draw_h_mm * PT_PER_MM,
        x: x_mm * PT_PER_MM,
        y: y_mm * PT_PER_MM,
    }
}

/// Build a PDF document with one page per rendered surface.
///
/// # Errors
///
/// Returns [`Error::Export`] for an empty image list and propagates JPEG
/// encoding failures.
pub fn export_pdf(surfaces: &[&RgbaImage]) -> Result<Vec<u8>> {
    if surfaces.is_empty() {
        return Err(Error::Export("no images to export".to_string()));
    }

    let mut alloc = RefAllocator(1);
    let catalog_id = alloc.next();
    let pages_id = alloc.next();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(pages_id);

    let mut page_ids = Vec::with_capacity(surfaces.len());
    let mut bodies = Vec::with_capacity(surfaces.len());
    for _ in surfaces {
        let page_id = alloc.next();
        let content_id = alloc.next();
        let image_id = alloc.next();
        page_ids.push(page_id);
        bodies.push((page_id, content_id, image_id));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let count = surfaces.len() as i32;
    pdf.pages(pages_id).kids(page_ids).count(count);

    for (surface, (page_id, content_id, image_id)) in surfaces.iter().zip(bodies) {
        let placement = place(surface.width(), surface.height());
        let jpeg = export::encode_jpeg(surface)?;

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, placement.page_w, placement.page_h));
        page.parent(pages_id);
        page.contents(content_id);
        page.resources().x_objects().pair(Name(b"Im0"), image_id);
        page.finish();

        let mut content = Content::new();
        content.save_state();
        content.transform([
            placement.draw_w,
            0.0,
            0.0,
            placement.draw_h,
            placement.x,
            placement.y,
        ]);
        content.x_object(Name(b"Im0"));
        content.restore_state();
        pdf.stream(content_id, &content.finish());

        let mut image = pdf.image_xobject(image_id, &jpeg);
        image.filter(Filter::DctDecode);
        #[allow(clippy::cast_possible_wrap)]
        {
            image.width(surface.width() as i32);
            image.height(surface.height() as i32);
        }
        image.color_space().device_rgb();
        image.bits_per_component(8);
        image.finish();
    }

    Ok(pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn surface(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([120, 140, 160, 255]))
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn empty_input_is_an_export_error() {
        assert!(matches!(export_pdf(&[]), Err(Error::Export(_))));
    }

    #[test]
    fn single_page_document_has_pdf_structure() {
        let img = surface(80, 60);
        let bytes = export_pdf(&[&img]).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(contains(&bytes, b"DCTDecode"), "image embedded as JPEG");
        // JPEG stream marker present in the embedded data.
        assert!(contains(&bytes, &[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn orientation_follows_image_aspect() {
        let wide = place(800, 600);
        assert!(wide.page_w > wide.page_h, "wide image gets landscape");

        let tall = place(600, 800);
        assert!(tall.page_h > tall.page_w, "tall image gets portrait");

        let square = place(500, 500);
        assert!(square.page_w > square.page_h, "square counts as landscape");
    }

    #[test]
    fn placement_respects_the_margin() {
        for (w, h) in [(800, 600), (600, 800), (10_000, 100), (100, 10_000)] {
            let p = place(w, h);
            let margin_pt = MARGIN_MM * PT_PER_MM;
            assert!(p.x >= margin_pt - 0.01);
            assert!(p.y >= margin_pt - 0.01);
            assert!(p.x + p.draw_w <= p.page_w - margin_pt + 0.01);
            assert!(p.y + p.draw_h <= p.page_h - margin_pt + 0.01);
        }
    }

    #[test]
    fn placement_is_centered() {
        let p = place(400, 300);
        let left = p.x;
        let right = p.page_w - p.x - p.draw_w;
        assert!((left - right).abs() < 0.01);
        let bottom = p.y;
        let top = p.page_h - p.y - p.draw_h;
        assert!((bottom - top).abs() < 0.01);
    }

    #[test]
    fn multi_image_export_adds_one_page_each() {
        let a = surface(80, 60);
        let b = surface(60, 80);
        let bytes = export_pdf(&[&a, &b]).unwrap();
        let single = export_pdf(&[&a]).unwrap();

        assert!(contains(&bytes, b"/Count 2"));
        assert!(bytes.len() > single.len(), "second page adds content");
    }
}
