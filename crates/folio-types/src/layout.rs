//! Flipbook page layout: pages hold positioned text and image elements.
//!
//! Every element carries a geometry envelope (`position` + `size`) and an
//! [`ElementBody`] holding the kind-specific fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementBody {
    Text {
        content: String,
        font_size: u32,
        color: String,
    },
    Image {
        /// Displayable reference: a URL or a session-local `blob:` reference.
        source: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: Uuid,
    pub position: Position,
    pub size: Size,
    #[serde(flatten)]
    pub body: ElementBody,
}

impl Element {
    pub const DEFAULT_POSITION: Position = Position { x: 20.0, y: 20.0 };
    pub const DEFAULT_TEXT_SIZE: Size = Size { width: 150, height: 50 };
    pub const DEFAULT_IMAGE_SIZE: Size = Size { width: 200, height: 150 };
    pub const DEFAULT_FONT_SIZE: u32 = 16;
    pub const DEFAULT_COLOR: &'static str = "#000";
    pub const DEFAULT_TEXT: &'static str = "New Text";

    pub fn text() -> Self {
        Self {
            id: Uuid::new_v4(),
            position: Self::DEFAULT_POSITION,
            size: Self::DEFAULT_TEXT_SIZE,
            body: ElementBody::Text {
                content: Self::DEFAULT_TEXT.to_string(),
                font_size: Self::DEFAULT_FONT_SIZE,
                color: Self::DEFAULT_COLOR.to_string(),
            },
        }
    }

    pub fn image(source: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            position: Self::DEFAULT_POSITION,
            size: Self::DEFAULT_IMAGE_SIZE,
            body: ElementBody::Image { source },
        }
    }

    /// Text string for text elements, image reference for images.
    pub fn content(&self) -> &str {
        match &self.body {
            ElementBody::Text { content, .. } => content,
            ElementBody::Image { source } => source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub elements: Vec<Element>,
}

impl Page {
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            elements: Vec::new(),
        }
    }

    pub fn element(&self, id: Uuid) -> Option<&Element> {
        self.elements.iter().find(|el| el.id == id)
    }

    pub fn element_mut(&mut self, id: Uuid) -> Option<&mut Element> {
        self.elements.iter_mut().find(|el| el.id == id)
    }
}

/// Partial style update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StylePatch {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub font_size: Option<u32>,
    pub color: Option<String>,
}

/// What the properties panel shows for the selected element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Properties {
    Text { font_size: u32, color: String },
    Image { width: u32, height: u32 },
}

impl Properties {
    pub fn of(element: &Element) -> Self {
        match &element.body {
            ElementBody::Text {
                font_size, color, ..
            } => Self::Text {
                font_size: *font_size,
                color: color.clone(),
            },
            ElementBody::Image { .. } => Self::Image {
                width: element.size.width,
                height: element.size.height,
            },
        }
    }
}
