//! Line layout strategies.

use serde::{Deserialize, Serialize};

/// How logical lines are split into physical lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineLayoutStrategy {
    /// One physical line per logical line.
    #[default]
    NoWrap,
    /// Soft-wrap when the next glyph would cross this width in pixels.
    WrapAtWidth(u32),
}

impl LineLayoutStrategy {
    /// Builds a strategy from a configured width; 0 disables wrapping.
    pub fn from_width(width: u32) -> Self {
        if width == 0 {
            Self::NoWrap
        } else {
            Self::WrapAtWidth(width)
        }
    }

    /// Returns the wrap limit, or `None` when not wrapping.
    pub fn wrap_width(&self) -> Option<u32> {
        match *self {
            Self::NoWrap => None,
            Self::WrapAtWidth(width) => Some(width),
        }
    }
}
