use std::path::Path;

use crate::error::{Error, Result};

/// Load a screenshot from disk as 8-bit RGB.
///
/// PDF images carry no alpha here, so any alpha channel is dropped.
/// A file that vanished or cannot be decoded is `AssetMissing`.
pub fn load_screenshot(path: &Path) -> Result<image::RgbImage> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|err| {
            log::debug!("Decoding {} failed: {err}", path.display());
            Error::AssetMissing(path.to_path_buf())
        })
}

/// Convert a title to a filesystem-safe slug
pub fn slugify_title(title: &str) -> String {
    slug::slugify(title)
}
