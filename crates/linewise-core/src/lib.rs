//! # Linewise Core
//!
//! The edit coordinator: a `Document` that keeps the character store, the
//! logical line index and the wrap index consistent across every edit, and
//! tells subscribers what changed.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Document                           │
//! │  ┌────────────┐  ┌─────────────┐  ┌────────────────────┐ │
//! │  │ CharStore  │  │  LineIndex  │  │     WrapIndex      │ │
//! │  │  (UTF-16)  │  │  + dirty    │  │ strategy + Measure │ │
//! │  └────────────┘  └─────────────┘  └────────────────────┘ │
//! │         │                                                 │
//! │         └── replace() ──> EventBus ──> ContentChanged     │
//! └──────────────────────────────────────────────────────────┘
//!         ^                                    ^
//!   EditInterceptor                         Config
//!   (auto-indent)                       (TOML on disk)
//! ```
//!
//! ## Learning: Module Organization
//!
//! Rust modules map to files:
//! - `mod foo;` looks for `foo.rs` or `foo/mod.rs`
//! - `pub use` re-exports items for cleaner public APIs

pub mod config;
pub mod document;
pub mod event;
pub mod interceptor;
pub mod search;

pub use config::{AutoIndent, Config, ConfigError, DocumentConfig, ViewConfig};
pub use document::{Document, DocumentId};
pub use event::{DocumentEvent, EventBus, EventHandler, EventReceiver};
pub use interceptor::{EditInterceptor, IndentInterceptor};
pub use search::{SearchError, SearchOptions, SearchPattern};

pub use linewise_buffer::{DirtyState, LineEnding, Position};
pub use linewise_layout::{
    CellMetrics, GlyphMeasure, GlyphMetrics, LineLayoutStrategy, Measure, Measurement,
};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Range {begin}..{end} is invalid for document of length {len}")]
    InvalidRange { begin: usize, end: usize, len: usize },

    #[error("Index is inconsistent with the text: {0}")]
    InconsistentIndex(String),

    #[error("Buffer error: {0}")]
    Buffer(#[from] linewise_buffer::BufferError),

    #[error("Layout error: {0}")]
    Layout(#[from] linewise_layout::LayoutError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
