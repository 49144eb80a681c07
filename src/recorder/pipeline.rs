//! Capture pipeline: click → surface → frame → highlight → PNG → step.
//!
//! One call handles one click completely; the worker never interrupts it.

use image::DynamicImage;
use std::fmt;
use std::sync::Arc;

use super::capture::{select_surface, CaptureError, FrameSource, Surface, SurfaceFallback};
use super::click_event::ClickEvent;
use super::highlight::Highlight;
use super::session::Session;
use super::store::StepStore;
use super::types::Step;

/// Errors that can occur while turning one click into a step.
#[derive(Debug)]
pub enum PipelineError {
    /// No display could be matched or enumerated.
    NoSurface,
    /// Failed to grab the frame.
    ScreenshotFailed(String),
    /// Failed to write the PNG.
    SaveFailed(String),
    /// The store refused the new step.
    StoreRejected(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::NoSurface => write!(f, "no capture surface"),
            PipelineError::ScreenshotFailed(msg) => write!(f, "screenshot failed: {msg}"),
            PipelineError::SaveFailed(msg) => write!(f, "saving screenshot failed: {msg}"),
            PipelineError::StoreRejected(msg) => write!(f, "step rejected: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<CaptureError> for PipelineError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::NoSurfaces => PipelineError::NoSurface,
            other => PipelineError::ScreenshotFailed(other.to_string()),
        }
    }
}

/// Everything the worker needs to process a click.
#[derive(Clone)]
pub struct CaptureContext {
    pub session: Arc<Session>,
    pub frames: Arc<dyn FrameSource>,
    pub store: StepStore,
    pub highlight: Highlight,
    pub fallback: SurfaceFallback,
}

/// Process a click event and append the resulting step.
pub fn process_click(click: &ClickEvent, ctx: &CaptureContext) -> Result<Step, PipelineError> {
    let surfaces = ctx.frames.surfaces()?;
    let surface = select_surface(&surfaces, click.x, click.y, ctx.fallback)
        .ok_or(PipelineError::NoSurface)?;

    log::debug!(
        "Click at ({}, {}) -> surface {} '{}' at ({}, {}) {}x{}",
        click.x,
        click.y,
        surface.id,
        surface.name,
        surface.x,
        surface.y,
        surface.width,
        surface.height
    );

    let mut frame = ctx.frames.capture(surface)?;
    let (px, py) = frame_position(surface, frame.dimensions(), click.x, click.y);
    ctx.highlight.composite(&mut frame, px, py);

    let index = ctx.session.next_index();
    let path = ctx.session.screenshot_path(index);
    DynamicImage::ImageRgba8(frame)
        .to_rgb8()
        .save(&path)
        .map_err(|e| PipelineError::SaveFailed(format!("{}: {e}", path.display())))?;

    let step = Step::new(index, path, Step::default_title(index));
    ctx.store
        .append(step.clone())
        .map_err(|e| PipelineError::StoreRejected(e.to_string()))?;

    Ok(step)
}

/// Map a global click to pixel coordinates of the captured frame.
///
/// Frames may be larger than the surface's logical size (HiDPI), so the
/// offset is scaled by the frame/surface ratio on each axis.
fn frame_position(surface: &Surface, frame_size: (u32, u32), x: i32, y: i32) -> (i32, i32) {
    let (local_x, local_y) = surface.to_local(x, y);
    let scale = |local: i32, frame: u32, logical: u32| -> i32 {
        if logical == 0 || frame == logical {
            return local;
        }
        (f64::from(local) * f64::from(frame) / f64::from(logical)).round() as i32
    };
    (
        scale(local_x, frame_size.0, surface.width),
        scale(local_y, frame_size.1, surface.height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::highlight::HighlightStyle;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    struct SolidFrames {
        surfaces: Vec<Surface>,
    }

    impl FrameSource for SolidFrames {
        fn surfaces(&self) -> Result<Vec<Surface>, CaptureError> {
            Ok(self.surfaces.clone())
        }

        fn capture(&self, surface: &Surface) -> Result<RgbaImage, CaptureError> {
            Ok(RgbaImage::from_pixel(
                surface.width,
                surface.height,
                Rgba([255, 255, 255, 255]),
            ))
        }
    }

    struct BrokenFrames;

    impl FrameSource for BrokenFrames {
        fn surfaces(&self) -> Result<Vec<Surface>, CaptureError> {
            Ok(vec![surface()])
        }

        fn capture(&self, _surface: &Surface) -> Result<RgbaImage, CaptureError> {
            Err(CaptureError::Backend("display asleep".into()))
        }
    }

    fn surface() -> Surface {
        Surface {
            id: 0,
            name: "test".into(),
            x: 0,
            y: 0,
            width: 64,
            height: 48,
            is_primary: true,
        }
    }

    fn context(root: &std::path::Path, frames: Arc<dyn FrameSource>) -> CaptureContext {
        CaptureContext {
            session: Arc::new(Session::new(root).unwrap()),
            frames,
            store: StepStore::new(),
            highlight: Highlight::new(20, [255, 0, 0, 128], HighlightStyle::Ring),
            fallback: SurfaceFallback::Primary,
        }
    }

    #[test]
    fn process_click_saves_numbered_png_and_appends() {
        let root = tempdir().unwrap();
        let ctx = context(
            root.path(),
            Arc::new(SolidFrames {
                surfaces: vec![surface()],
            }),
        );

        let first = process_click(&ClickEvent::new(10, 10), &ctx).unwrap();
        let second = process_click(&ClickEvent::new(30, 20), &ctx).unwrap();

        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert!(first.image_path.ends_with("step_000.png"));
        assert!(second.image_path.ends_with("step_001.png"));
        assert_eq!(first.title, "Step 1");
        assert_eq!(image::image_dimensions(&second.image_path).unwrap(), (64, 48));
        assert_eq!(ctx.store.len(), 2);
    }

    #[test]
    fn capture_failure_adds_nothing() {
        let root = tempdir().unwrap();
        let ctx = context(root.path(), Arc::new(BrokenFrames));
        let err = process_click(&ClickEvent::new(1, 1), &ctx).unwrap_err();
        assert!(err.to_string().contains("display asleep"));
        assert!(ctx.store.is_empty());
    }

    #[test]
    fn no_surfaces_is_reported() {
        let root = tempdir().unwrap();
        let ctx = context(root.path(), Arc::new(SolidFrames { surfaces: vec![] }));
        assert!(matches!(
            process_click(&ClickEvent::new(1, 1), &ctx),
            Err(PipelineError::NoSurface)
        ));
    }

    #[test]
    fn frame_position_scales_hidpi_frames() {
        let mut s = surface();
        s.x = 100;
        s.y = 50;
        assert_eq!(frame_position(&s, (64, 48), 110, 60), (10, 10));
        assert_eq!(frame_position(&s, (128, 96), 110, 60), (20, 20));
    }

    #[test]
    fn pipeline_error_displays_correctly() {
        let err = PipelineError::ScreenshotFailed("capture failed".to_string());
        assert!(err.to_string().contains("screenshot failed"));
        assert!(err.to_string().contains("capture failed"));
    }
}
