//! Window geometry shared by requests, replies and configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Declared layout of a context: window name to desired placement
pub type LayoutMap = BTreeMap<String, WindowLayout>;

/// Rectangle in worker screen coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Create new bounds
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One labelled cell of a custom content grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub label: String,
    #[serde(flatten)]
    pub bounds: Bounds,
}

/// How a window divides its area between panes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GridSpec {
    /// Evenly sized rows and columns
    Uniform {
        rows: u32,
        columns: u32,
        #[serde(default)]
        padding: f64,
    },
    /// Explicitly placed cells
    Custom { cells: Vec<GridCell> },
}

/// Desired placement of one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowLayout {
    /// Worker that should host the window
    pub display_name: String,
    #[serde(flatten)]
    pub bounds: Bounds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_grid: Option<GridSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

impl WindowLayout {
    /// Layout with plain bounds and no grid or font override
    pub fn new(display_name: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            display_name: display_name.into(),
            bounds,
            content_grid: None,
            font_size: None,
        }
    }
}
