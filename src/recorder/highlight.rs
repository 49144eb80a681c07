//! Click marker composited onto each screenshot.

use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use serde::{Deserialize, Serialize};

/// Width of the translucent band in ring style.
const RING_WIDTH: i32 = 5;
/// Width of the opaque edge drawn around the marker.
const OUTLINE_WIDTH: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightStyle {
    /// Translucent band with a see-through centre and an opaque rim.
    #[default]
    Ring,
    /// Translucent filled disk with an opaque rim.
    OutlinedDisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub radius: u32,
    pub color: [u8; 4],
    pub style: HighlightStyle,
}

impl Highlight {
    /// `size` is the marker diameter in pixels.
    pub fn new(size: u32, color: [u8; 4], style: HighlightStyle) -> Self {
        Self {
            radius: size / 2,
            color,
            style,
        }
    }

    /// Alpha-blend the marker centred at `(cx, cy)` (image-local pixels).
    ///
    /// Points outside the image are fine; the marker is clipped.
    pub fn composite(&self, frame: &mut RgbaImage, cx: i32, cy: i32) {
        let radius = self.radius as i32;
        if radius == 0 {
            return;
        }

        let side = (radius * 2 + 1) as u32;
        let mut overlay = RgbaImage::new(side, side);
        let center = (radius, radius);
        let fill = Rgba(self.color);
        let [r, g, b, _] = self.color;
        let rim = Rgba([r, g, b, 255]);

        draw_filled_circle_mut(&mut overlay, center, radius, fill);
        if self.style == HighlightStyle::Ring && radius > RING_WIDTH {
            draw_filled_circle_mut(&mut overlay, center, radius - RING_WIDTH, Rgba([0, 0, 0, 0]));
        }
        for inset in 0..OUTLINE_WIDTH.min(radius) {
            draw_hollow_circle_mut(&mut overlay, center, radius - inset, rim);
        }

        imageops::overlay(
            frame,
            &overlay,
            i64::from(cx) - i64::from(radius),
            i64::from(cy) - i64::from(radius),
        );
    }
}
