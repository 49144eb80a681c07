//! Page layout for exported walkthroughs.
//!
//! Steps are packed at most two per page. The first step on a page may use
//! half the content height; the second gets whatever is left below the
//! first. Images are scaled uniformly to fit both the content width and
//! their height budget. All lengths are millimetres measured from the
//! top-left corner of the content area.

use std::path::Path;

use crate::error::Error;
use crate::recorder::types::{Annotation, Placement, Step};

pub const TITLE_HEIGHT: f32 = 10.0;
pub const TITLE_GAP: f32 = 5.0;
pub const BANNER_HEIGHT: f32 = 8.0;
pub const BANNER_GAP: f32 = 2.0;
pub const STEP_GAP: f32 = 5.0;

pub const MAX_STEPS_PER_PAGE: usize = 2;

/// Physical page and margins, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
}

impl PageGeometry {
    pub fn a4(margin: f32) -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin,
        }
    }

    /// Geometry whose content area is exactly `width` × `height`.
    pub fn with_content(width: f32, height: f32, margin: f32) -> Self {
        Self {
            page_width: width + 2.0 * margin,
            page_height: height + 2.0 * margin,
            margin,
        }
    }

    pub fn content_width(&self) -> f32 {
        (self.page_width - 2.0 * self.margin).max(0.0)
    }

    pub fn content_height(&self) -> f32 {
        (self.page_height - 2.0 * self.margin).max(0.0)
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4(15.0)
    }
}

/// Looks up native image sizes. `None` means the asset is missing or unreadable.
pub trait AssetProbe {
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)>;
}

/// Reads image headers from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl AssetProbe for FsProbe {
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        match image::image_dimensions(path) {
            Ok(dims) => Some(dims),
            Err(err) => {
                log::debug!("Reading {} failed: {err}", path.display());
                log::warn!("{}; laying out text only", Error::AssetMissing(path.to_path_buf()));
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block<'a> {
    Title { text: String, y: f32 },
    Banner { annotation: &'a Annotation, y: f32 },
    Image { path: &'a Path, rect: Rect },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedStep<'a> {
    /// 1-based position in the exported sequence.
    pub number: usize,
    pub step: &'a Step,
    /// Height the image was allowed to use.
    pub image_budget: f32,
    pub image: Option<Rect>,
    pub blocks: Vec<Block<'a>>,
    pub top: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page<'a> {
    pub steps: Vec<PlacedStep<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout<'a> {
    pub pages: Vec<Page<'a>>,
}

impl PageLayout<'_> {
    pub fn placed_count(&self) -> usize {
        self.pages.iter().map(|p| p.steps.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Vertical space a step needs besides its image.
pub fn text_height(step: &Step) -> f32 {
    TITLE_HEIGHT + TITLE_GAP + step.annotation_count() as f32 * (BANNER_HEIGHT + BANNER_GAP) + STEP_GAP
}

/// Budget for the first step on a fresh page.
fn first_slot_budget(step: &Step, content_height: f32) -> f32 {
    (content_height / 2.0 - text_height(step)).max(0.0)
}

/// Lay out `steps` in order onto pages of the given geometry.
pub fn paginate<'a>(
    steps: &'a [Step],
    geometry: &PageGeometry,
    probe: &dyn AssetProbe,
) -> PageLayout<'a> {
    let width = geometry.content_width();
    let height = geometry.content_height();
    let mut pages = Vec::new();

    let mut i = 0;
    while i < steps.len() {
        let mut page = Page::default();

        let budget = first_slot_budget(&steps[i], height);
        let mut cursor = place(&mut page, &steps[i], i + 1, 0.0, budget, width, probe);
        i += 1;

        if let Some(second) = steps.get(i) {
            let remaining = height - cursor;
            let budget = remaining - text_height(second);
            if budget < 0.0 {
                // Does not fit under the first one: close this page and let
                // the step open the next page on its own.
                pages.push(page);
                page = Page::default();
                cursor = 0.0;
                let budget = first_slot_budget(second, height);
                place(&mut page, second, i + 1, cursor, budget, width, probe);
            } else {
                place(&mut page, second, i + 1, cursor, budget, width, probe);
            }
            i += 1;
        }

        pages.push(page);
    }

    PageLayout { pages }
}

/// Append one step at `top` and return the cursor below it.
fn place<'a>(
    page: &mut Page<'a>,
    step: &'a Step,
    number: usize,
    top: f32,
    image_budget: f32,
    width: f32,
    probe: &dyn AssetProbe,
) -> f32 {
    let mut blocks = Vec::with_capacity(2 + step.annotation_count());
    let mut y = top;

    blocks.push(Block::Title {
        text: display_title(step, number),
        y,
    });
    y += TITLE_HEIGHT + TITLE_GAP;

    push_banners(&mut blocks, step.annotations(Placement::Before), &mut y);

    let image = image_rect(step, y, image_budget, width, probe);
    if let Some(rect) = image {
        blocks.push(Block::Image {
            path: &step.image_path,
            rect,
        });
        y += rect.height;
    }

    push_banners(&mut blocks, step.annotations(Placement::After), &mut y);
    y += STEP_GAP;

    page.steps.push(PlacedStep {
        number,
        step,
        image_budget,
        image,
        blocks,
        top,
        bottom: y,
    });
    y
}

fn push_banners<'a>(blocks: &mut Vec<Block<'a>>, annotations: &'a [Annotation], y: &mut f32) {
    for annotation in annotations {
        blocks.push(Block::Banner { annotation, y: *y });
        *y += BANNER_HEIGHT + BANNER_GAP;
    }
}

fn image_rect(
    step: &Step,
    y: f32,
    budget: f32,
    width: f32,
    probe: &dyn AssetProbe,
) -> Option<Rect> {
    if budget <= 0.0 || width <= 0.0 {
        return None;
    }
    let (native_w, native_h) = probe.dimensions(&step.image_path)?;
    if native_w == 0 || native_h == 0 {
        return None;
    }
    let scale = (width / native_w as f32).min(budget / native_h as f32);
    Some(Rect {
        x: 0.0,
        y,
        width: native_w as f32 * scale,
        height: native_h as f32 * scale,
    })
}

/// Title as printed; blank titles fall back to "Step N".
pub fn display_title(step: &Step, number: usize) -> String {
    let title = step.title.trim();
    if title.is_empty() {
        format!("Step {number}")
    } else {
        title.to_string()
    }
}
