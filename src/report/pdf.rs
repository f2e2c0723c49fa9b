use std::io::Cursor;

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::image_crate::ImageDecoder;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point,
    Pt, Rect,
};
use tracing::{debug, warn};

use super::fonts::{fold_accent, FontFace};
use super::layout::{DrawOp, Page, PageSize, Rgb};
use crate::error::{Error, Result};

fn mm(v: f32) -> Mm {
    Mm::from(Pt(v))
}

fn color(c: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(c.0, c.1, c.2, None))
}

fn report_err(e: impl std::fmt::Display) -> Error {
    Error::Report(e.to_string())
}

// Built-in fonts are only safe for plain ASCII
fn pdf_text(text: &str) -> String {
    text.chars()
        .map(fold_accent)
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
        }
    }
}

fn draw_image(layer: &PdfLayerReference, png: &[u8], x: f32, y: f32, width: f32, height: f32) {
    let decoded = PngDecoder::new(Cursor::new(png)).and_then(|decoder| {
        let (px_w, px_h) = decoder.dimensions();
        Image::try_from(decoder).map(|image| (image, px_w, px_h))
    });
    match decoded {
        Ok((_, 0, _)) | Ok((_, _, 0)) => warn!("Skipping empty report image"),
        Ok((image, px_w, px_h)) => image.add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(mm(x)),
                translate_y: Some(mm(y)),
                // At 72 dpi one pixel is one point
                dpi: Some(72.0),
                scale_x: Some(width / px_w as f32),
                scale_y: Some(height / px_h as f32),
                ..Default::default()
            },
        ),
        Err(e) => warn!(error = %e, "Could not decode report image"),
    }
}

fn draw(layer: &PdfLayerReference, fonts: &Fonts, op: &DrawOp) {
    match op {
        DrawOp::Text {
            x,
            y,
            text,
            font,
            size,
            color: c,
        } => {
            layer.set_fill_color(color(*c));
            layer.use_text(pdf_text(text), *size, mm(*x), mm(*y), fonts.get(*font));
        }
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            thickness,
            color: c,
        } => {
            layer.set_outline_color(color(*c));
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![(Point::new(mm(*x1), mm(*y1)), false), (Point::new(mm(*x2), mm(*y2)), false)],
                is_closed: false,
            });
        }
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            color: c,
        } => {
            layer.set_fill_color(color(*c));
            let rect = Rect::new(mm(*x), mm(*y), mm(x + width), mm(y + height)).with_mode(PaintMode::Fill);
            layer.add_rect(rect);
        }
        DrawOp::Image {
            x,
            y,
            width,
            height,
            png,
        } => draw_image(layer, png, *x, *y, *width, *height),
    }
}

/// Render laid-out pages to PDF bytes
pub(super) fn render(title: &str, size: PageSize, pages: &[Page]) -> Result<Vec<u8>> {
    let (width, height) = (mm(size.width), mm(size.height));
    let (doc, first_page, first_layer) = PdfDocument::new(pdf_text(title), width, height, "Conteudo");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(report_err)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(report_err)?,
    };

    for (i, ops) in pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(width, height, "Conteudo");
            doc.get_page(page).get_layer(layer)
        };
        for op in ops {
            draw(&layer, &fonts, op);
        }
    }

    let bytes = doc.save_to_bytes().map_err(report_err)?;
    debug!(pages = pages.len(), size = bytes.len(), "PDF rendered");
    Ok(bytes)
}
