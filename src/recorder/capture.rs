use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::{fmt, io};

#[derive(Debug)]
pub enum CaptureError {
    NoSurfaces,
    SurfaceGone { id: usize },
    Backend(String),
    Encode(String),
    Io(io::Error),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoSurfaces => write!(formatter, "no capture surfaces available"),
            CaptureError::SurfaceGone { id } => {
                write!(formatter, "surface {id} disappeared before capture")
            }
            CaptureError::Backend(message) => write!(formatter, "capture backend: {message}"),
            CaptureError::Encode(message) => write!(formatter, "encode failed: {message}"),
            CaptureError::Io(error) => write!(formatter, "io error: {error}"),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<io::Error> for CaptureError {
    fn from(error: io::Error) -> Self {
        CaptureError::Io(error)
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(error: image::ImageError) -> Self {
        CaptureError::Encode(error.to_string())
    }
}

/// A capturable display area in global coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    /// Position in the backend's enumeration order.
    pub id: usize,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

impl Surface {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        let (left, top) = (i64::from(self.x), i64::from(self.y));
        x >= left
            && x < left + i64::from(self.width)
            && y >= top
            && y < top + i64::from(self.height)
    }

    /// Convert a global point to surface-local pixels.
    pub fn to_local(&self, x: i32, y: i32) -> (i32, i32) {
        (x.saturating_sub(self.x), y.saturating_sub(self.y))
    }
}

/// Which surface to use when a click lies outside all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceFallback {
    #[default]
    Primary,
    First,
    Index(usize),
}

/// Pick the surface containing `(x, y)`, or the configured fallback.
pub fn select_surface(
    surfaces: &[Surface],
    x: i32,
    y: i32,
    fallback: SurfaceFallback,
) -> Option<&Surface> {
    if let Some(hit) = surfaces.iter().find(|s| s.contains(x, y)) {
        return Some(hit);
    }
    let chosen = match fallback {
        SurfaceFallback::Primary => surfaces.iter().find(|s| s.is_primary),
        SurfaceFallback::First => None,
        SurfaceFallback::Index(i) => surfaces.get(i),
    };
    chosen.or_else(|| surfaces.first())
}

/// Something that can enumerate displays and grab a full frame of one.
pub trait FrameSource: Send + Sync {
    fn surfaces(&self) -> Result<Vec<Surface>, CaptureError>;
    fn capture(&self, surface: &Surface) -> Result<RgbaImage, CaptureError>;
}

/// Monitor capture through `xcap`.
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapSource;

impl FrameSource for XcapSource {
    fn surfaces(&self) -> Result<Vec<Surface>, CaptureError> {
        let monitors =
            xcap::Monitor::all().map_err(|e| CaptureError::Backend(format!("{e}")))?;
        if monitors.is_empty() {
            return Err(CaptureError::NoSurfaces);
        }
        Ok(monitors
            .iter()
            .enumerate()
            .map(|(id, monitor)| Surface {
                id,
                name: monitor.name().unwrap_or_default(),
                x: monitor.x().unwrap_or(0),
                y: monitor.y().unwrap_or(0),
                width: monitor.width().unwrap_or(0),
                height: monitor.height().unwrap_or(0),
                is_primary: monitor.is_primary().unwrap_or(false),
            })
            .collect())
    }

    fn capture(&self, surface: &Surface) -> Result<RgbaImage, CaptureError> {
        let monitors =
            xcap::Monitor::all().map_err(|e| CaptureError::Backend(format!("{e}")))?;
        let monitor = monitors
            .get(surface.id)
            .ok_or(CaptureError::SurfaceGone { id: surface.id })?;
        monitor
            .capture_image()
            .map_err(|e| CaptureError::Backend(format!("Failed to capture screen: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(id: usize, x: i32, width: u32, is_primary: bool) -> Surface {
        Surface {
            id,
            name: format!("display-{id}"),
            x,
            y: 0,
            width,
            height: 1080,
            is_primary,
        }
    }

    fn layout() -> Vec<Surface> {
        vec![
            surface(0, -1920, 1920, false),
            surface(1, 0, 2560, true),
            surface(2, 2560, 1920, false),
        ]
    }

    #[test]
    fn contains_is_half_open() {
        let s = surface(0, 0, 100, true);
        assert!(s.contains(0, 0));
        assert!(s.contains(99, 1079));
        assert!(!s.contains(100, 10));
        assert!(!s.contains(10, 1080));
    }

    #[test]
    fn selects_surface_under_click() {
        let surfaces = layout();
        let hit = select_surface(&surfaces, -10, 10, SurfaceFallback::Primary).unwrap();
        assert_eq!(hit.id, 0);
        let hit = select_surface(&surfaces, 3000, 10, SurfaceFallback::Primary).unwrap();
        assert_eq!(hit.id, 2);
    }

    #[test]
    fn falls_back_to_primary() {
        let surfaces = layout();
        let hit = select_surface(&surfaces, 99_999, 10, SurfaceFallback::Primary).unwrap();
        assert_eq!(hit.id, 1);
    }

    #[test]
    fn falls_back_to_first_or_index() {
        let surfaces = layout();
        assert_eq!(
            select_surface(&surfaces, 0, -500, SurfaceFallback::First).unwrap().id,
            0
        );
        assert_eq!(
            select_surface(&surfaces, 0, -500, SurfaceFallback::Index(2)).unwrap().id,
            2
        );
        // Out-of-range index degrades to the first surface.
        assert_eq!(
            select_surface(&surfaces, 0, -500, SurfaceFallback::Index(9)).unwrap().id,
            0
        );
    }

    #[test]
    fn empty_surface_list_selects_nothing() {
        assert!(select_surface(&[], 0, 0, SurfaceFallback::Primary).is_none());
    }

    #[test]
    fn to_local_offsets_by_origin() {
        let s = surface(2, 2560, 1920, false);
        assert_eq!(s.to_local(2600, 40), (40, 40));
    }

    #[test]
    fn fallback_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SurfaceFallback::Primary).unwrap(),
            "\"primary\""
        );
        assert_eq!(
            serde_json::to_string(&SurfaceFallback::Index(1)).unwrap(),
            "{\"index\":1}"
        );
    }
}
