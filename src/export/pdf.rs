use std::path::Path;

use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfLayerReference, Rgb,
};
use printpdf::path::PaintMode;

use super::helpers::load_screenshot;
use super::layout::{Block, PageGeometry, PageLayout, Rect, BANNER_HEIGHT, TITLE_HEIGHT};
use crate::error::{Error, Result};
use crate::recorder::types::Annotation;

pub const TITLE_FONT_SIZE: f32 = 16.0;
pub const BANNER_FONT_SIZE: f32 = 12.0;

const TITLE_RGB: [u8; 3] = [0, 0, 0];
/// Left padding of banner text inside its fill, in mm.
const BANNER_PADDING: f32 = 2.0;
const LAYER_NAME: &str = "Steps";

const PT_PER_MM: f32 = 72.0 / 25.4;

pub fn mm_to_pt(mm: f32) -> f32 {
    mm * PT_PER_MM
}

/// Maps content-area millimetres (origin top-left) to page millimetres
/// (origin bottom-left).
struct PageFrame {
    geometry: PageGeometry,
}

impl PageFrame {
    fn x(&self, x: f32) -> f32 {
        self.geometry.margin + x
    }

    /// Page y of the bottom edge of a box starting at `top` with `height`.
    fn bottom(&self, top: f32, height: f32) -> f32 {
        self.geometry.page_height - self.geometry.margin - top - height
    }
}

fn color(rgb: [u8; 3]) -> Color {
    let [r, g, b] = rgb.map(|c| f32::from(c) / 255.0);
    Color::Rgb(Rgb::new(r, g, b, None))
}

/// Render `layout` into PDF bytes. Performs no fitting of its own: every
/// block is drawn exactly where the layout put it.
pub fn render(
    layout: &PageLayout<'_>,
    geometry: &PageGeometry,
    title: &str,
) -> std::result::Result<Vec<u8>, String> {
    let frame = PageFrame {
        geometry: *geometry,
    };
    let (width, height) = (Mm(geometry.page_width), Mm(geometry.page_height));
    // The document always starts with one page, so an empty layout still
    // produces a file viewers will open.
    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, LAYER_NAME);
    let font = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| format!("font setup failed: {e:?}"))?;

    for (n, page) in layout.pages.iter().enumerate() {
        let (page_index, layer_index) = if n == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, LAYER_NAME)
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);
        for placed in &page.steps {
            for block in &placed.blocks {
                match block {
                    Block::Title { text, y } => draw_title(&layer, &font, &frame, text, *y),
                    Block::Banner { annotation, y } => {
                        draw_banner(&layer, &font, &frame, annotation, *y)
                    }
                    Block::Image { path, rect } => draw_image(&layer, &frame, path, rect),
                }
            }
        }
    }

    doc.save_to_bytes()
        .map_err(|e| format!("PDF serialization failed: {e:?}"))
}

fn draw_title(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    frame: &PageFrame,
    text: &str,
    y: f32,
) {
    // Baseline sits 3 mm above the block's bottom edge.
    let baseline = frame.bottom(y, TITLE_HEIGHT) + 3.0;
    layer.set_fill_color(color(TITLE_RGB));
    layer.use_text(text, TITLE_FONT_SIZE, Mm(frame.x(0.0)), Mm(baseline), font);
}

fn draw_banner(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    frame: &PageFrame,
    annotation: &Annotation,
    y: f32,
) {
    let bottom = frame.bottom(y, BANNER_HEIGHT);
    let left = frame.x(0.0);
    let right = left + frame.geometry.content_width();

    layer.set_fill_color(color(annotation.kind.fill_rgb()));
    layer.add_rect(
        printpdf::Rect::new(Mm(left), Mm(bottom), Mm(right), Mm(bottom + BANNER_HEIGHT))
            .with_mode(PaintMode::Fill),
    );
    layer.set_fill_color(color(annotation.kind.text_rgb()));
    layer.use_text(
        annotation.banner_text(),
        BANNER_FONT_SIZE,
        Mm(frame.x(BANNER_PADDING)),
        Mm(bottom + 2.5),
        font,
    );
}

fn draw_image(layer: &PdfLayerReference, frame: &PageFrame, path: &Path, rect: &Rect) {
    // The file may have vanished since layout; the block is simply dropped.
    let rgb = match load_screenshot(path) {
        Ok(rgb) => rgb,
        Err(err) => {
            log::warn!("Skipping image in export: {err}");
            return;
        }
    };
    let (px_width, px_height) = rgb.dimensions();
    let Some(buffer) = RgbImage::from_raw(px_width, px_height, rgb.into_raw()) else {
        log::warn!("Skipping image {} in export: bad pixel buffer", path.display());
        return;
    };

    // At 72 dpi one pixel is one point, so the scale is target points per pixel.
    let image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(buffer));
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(frame.x(rect.x))),
            translate_y: Some(Mm(frame.bottom(rect.y, rect.height))),
            scale_x: Some(mm_to_pt(rect.width) / px_width as f32),
            scale_y: Some(mm_to_pt(rect.height) / px_height as f32),
            dpi: Some(72.0),
            ..Default::default()
        },
    );
}

/// Render and write the document to `output_path`.
pub fn write(
    layout: &PageLayout<'_>,
    geometry: &PageGeometry,
    title: &str,
    output_path: &Path,
) -> Result<()> {
    let bytes = render(layout, geometry, title)
        .map_err(|reason| Error::write_failed(output_path, reason))?;
    std::fs::write(output_path, bytes)
        .map_err(|e| Error::write_failed(output_path, super::friendly_write_error(&e, output_path)))
}
