use serde::{Deserialize, Serialize};

/// A left-button press in global screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub x: i32,
    pub y: i32,
}

impl ClickEvent {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
