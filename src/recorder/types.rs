use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Callout style attached above or below a step's screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    Alert,
    Warning,
    Note,
    Tip,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 4] = [
        AnnotationKind::Alert,
        AnnotationKind::Warning,
        AnnotationKind::Note,
        AnnotationKind::Tip,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AnnotationKind::Alert => "Alert",
            AnnotationKind::Warning => "Warning",
            AnnotationKind::Note => "Note",
            AnnotationKind::Tip => "Tip",
        }
    }

    /// Banner background colour.
    pub fn fill_rgb(self) -> [u8; 3] {
        match self {
            AnnotationKind::Alert => [244, 67, 54],
            AnnotationKind::Warning => [255, 235, 59],
            AnnotationKind::Note => [33, 150, 243],
            AnnotationKind::Tip => [117, 117, 117],
        }
    }

    /// Banner text colour. Yellow warnings are unreadable in white.
    pub fn text_rgb(self) -> [u8; 3] {
        match self {
            AnnotationKind::Warning => [0, 0, 0],
            _ => [255, 255, 255],
        }
    }
}

impl std::str::FromStr for AnnotationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnnotationKind::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown annotation type: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub text: String,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Text as printed on the banner.
    pub fn banner_text(&self) -> String {
        format!("{}: {}", self.kind.label(), self.text)
    }
}

/// Which side of the screenshot an annotation sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Capture order. Unique and strictly increasing within a store.
    pub index: u32,
    pub image_path: PathBuf,
    pub title: String,
    #[serde(default)]
    pub annotations_before: Vec<Annotation>,
    #[serde(default)]
    pub annotations_after: Vec<Annotation>,
}

impl Step {
    pub fn new(index: u32, image_path: PathBuf, title: impl Into<String>) -> Self {
        Self {
            index,
            image_path,
            title: title.into(),
            annotations_before: Vec::new(),
            annotations_after: Vec::new(),
        }
    }

    /// Title a freshly captured step starts with.
    pub fn default_title(index: u32) -> String {
        format!("Step {}", index + 1)
    }

    pub fn annotations(&self, placement: Placement) -> &[Annotation] {
        match placement {
            Placement::Before => &self.annotations_before,
            Placement::After => &self.annotations_after,
        }
    }

    pub fn annotations_mut(&mut self, placement: Placement) -> &mut Vec<Annotation> {
        match placement {
            Placement::Before => &mut self.annotations_before,
            Placement::After => &mut self.annotations_after,
        }
    }

    pub fn annotation_count(&self) -> usize {
        self.annotations_before.len() + self.annotations_after.len()
    }

    #[cfg(test)]
    pub fn sample() -> Self {
        Self::new(0, PathBuf::from("screenshots/step_000.png"), "Open the menu")
    }
}
