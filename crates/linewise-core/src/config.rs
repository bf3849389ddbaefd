//! Document and view configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! Serde is Rust's standard for serialization/deserialization.
//! The `#[derive(Serialize, Deserialize)]` macro generates
//! code to convert structs to/from JSON, TOML, etc.
//!
//! `#[serde(default)]` uses Default::default() for missing fields,
//! making configs backward-compatible.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use linewise_buffer::LineEnding;
use linewise_layout::{CellMetrics, GlyphMeasure, LineLayoutStrategy, Measure};

use crate::interceptor::IndentInterceptor;

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Editing behavior
    pub document: DocumentConfig,

    /// Layout and display
    pub view: ViewConfig,
}

impl Config {
    /// Loads config from the default location.
    pub fn load() -> Self {
        Self::load_from_default_path().unwrap_or_default()
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads from the default config path.
    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("linewise").join("config.toml"))
    }

    /// Saves the config to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Saves the config to `path`, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the layout strategy these settings describe.
    pub fn layout_strategy(&self) -> LineLayoutStrategy {
        if self.view.wrap {
            LineLayoutStrategy::from_width(self.document.wrap_width)
        } else {
            LineLayoutStrategy::NoWrap
        }
    }

    /// Builds the cell-based measure for the configured cell sizes.
    pub fn measure(&self) -> Box<dyn Measure> {
        Box::new(GlyphMeasure::new(
            CellMetrics::new(self.view.cell_px.max(1)).with_eol_width(self.view.eol_px),
        ))
    }
}

/// Editing behavior configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Tab width in columns
    pub tab_width: u32,

    /// Wrap width in pixels (0 = no wrapping)
    pub wrap_width: u32,

    /// Indent with spaces instead of tabs
    pub use_spaces: bool,

    /// Line ending for new documents and typed newlines
    pub line_ending: LineEnding,

    /// Auto-indent behavior on newline and `}`
    pub auto_indent: AutoIndent,

    /// Check both indices against a full rebuild after every edit
    pub verify_edits: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            tab_width: 8,
            wrap_width: 0,
            use_spaces: false,
            line_ending: LineEnding::default(),
            auto_indent: AutoIndent::default(),
            verify_edits: cfg!(debug_assertions),
        }
    }
}

/// Auto-indent mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoIndent {
    Off,
    /// Copy the indentation of the current line
    #[default]
    Generic,
    /// Also indent after `{` and outdent on `}`
    BraceAware,
}

impl AutoIndent {
    /// Returns the interceptor for this mode.
    pub fn interceptor(&self) -> Option<IndentInterceptor> {
        match self {
            AutoIndent::Off => None,
            AutoIndent::Generic => Some(IndentInterceptor::Generic),
            AutoIndent::BraceAware => Some(IndentInterceptor::BraceAware),
        }
    }
}

/// Layout and display configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Soft-wrap long lines at `document.wrap_width`
    pub wrap: bool,

    /// Width of one character cell in pixels
    pub cell_px: u32,

    /// Width of the end-of-line mark in pixels
    pub eol_px: u32,

    /// Show line numbers
    pub shows_line_number: bool,

    /// Draw a mark for line terminators
    pub draws_eol_code: bool,

    /// Draw a mark for tabs
    pub draws_tab: bool,

    /// Draw a mark for U+3000 ideographic spaces
    pub draws_full_width_space: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            wrap: true,
            cell_px: 8,
            eol_px: 8,
            shows_line_number: true,
            draws_eol_code: true,
            draws_tab: true,
            draws_full_width_space: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
