use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::recorder::capture::SurfaceFallback;
use crate::recorder::highlight::{Highlight, HighlightStyle};

pub const MIN_HIGHLIGHT_SIZE: u32 = 10;
pub const MAX_HIGHLIGHT_SIZE: u32 = 100;

/// User preferences, stored as a flat JSON object.
///
/// Every key is optional on disk; absent keys take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Marker diameter in pixels.
    pub highlight_size: u32,
    pub highlight_color: [u8; 4],
    pub export_path: PathBuf,
    pub highlight_style: HighlightStyle,
    pub fallback_surface: SurfaceFallback,
    /// Page margin in millimetres.
    pub page_margin: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            highlight_size: 40,
            highlight_color: [255, 0, 0, 128],
            export_path: default_export_path(),
            highlight_style: HighlightStyle::Ring,
            fallback_surface: SurfaceFallback::Primary,
            page_margin: 15.0,
        }
    }
}

impl Settings {
    pub fn highlight(&self) -> Highlight {
        Highlight::new(self.highlight_size, self.highlight_color, self.highlight_style)
    }

    /// Clamp values into the ranges the recorder supports.
    pub fn sanitized(mut self) -> Self {
        self.highlight_size = self
            .highlight_size
            .clamp(MIN_HIGHLIGHT_SIZE, MAX_HIGHLIGHT_SIZE);
        if !self.page_margin.is_finite() || self.page_margin < 0.0 {
            self.page_margin = Settings::default().page_margin;
        }
        self
    }
}

fn default_export_path() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default settings file location.
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stepscribe").join("settings.json"))
}

/// Load settings from `path`. A missing or unparsable file yields defaults;
/// a key with a bad value falls back to that key's default.
pub fn load_from(path: &Path) -> Settings {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Settings::default(),
        Err(err) => {
            log::warn!("Failed to read settings {}: {err}", path.display());
            return Settings::default();
        }
    };
    match serde_json::from_str::<serde_json::Value>(&contents) {
        Ok(serde_json::Value::Object(map)) => from_map(&map).sanitized(),
        Ok(_) => {
            log::warn!("Settings {} is not a JSON object", path.display());
            Settings::default()
        }
        Err(err) => {
            log::warn!("Failed to parse settings {}: {err}", path.display());
            Settings::default()
        }
    }
}

/// Build settings key by key, so one bad value only resets that key.
fn from_map(map: &serde_json::Map<String, serde_json::Value>) -> Settings {
    let mut settings = Settings::default();
    read_key(map, "highlight_size", &mut settings.highlight_size);
    read_key(map, "highlight_color", &mut settings.highlight_color);
    read_key(map, "export_path", &mut settings.export_path);
    read_key(map, "highlight_style", &mut settings.highlight_style);
    read_key(map, "fallback_surface", &mut settings.fallback_surface);
    read_key(map, "page_margin", &mut settings.page_margin);
    settings
}

fn read_key<T: DeserializeOwned>(
    map: &serde_json::Map<String, serde_json::Value>,
    key: &str,
    slot: &mut T,
) {
    let Some(value) = map.get(key) else {
        return;
    };
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => *slot = parsed,
        Err(err) => log::warn!("Ignoring settings key \"{key}\": {err}"),
    }
}

pub fn load() -> Settings {
    match settings_path() {
        Some(path) => load_from(&path),
        None => Settings::default(),
    }
}

/// Write settings to `path`, keeping keys this version does not know about.
pub fn save_to(path: &Path, settings: &Settings) -> crate::Result<()> {
    let mut merged = match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<serde_json::Value>(&contents) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        },
        Err(_) => serde_json::Map::new(),
    };
    if let serde_json::Value::Object(ours) = serde_json::to_value(settings)? {
        merged.extend(ours);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&serde_json::Value::Object(merged))?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn save(settings: &Settings) -> crate::Result<()> {
    let path = settings_path().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "config dir not found")
    })?;
    save_to(&path, settings)
}
