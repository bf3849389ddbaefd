//! # Linewise Layout
//!
//! Soft-wrapping of logical lines into physical lines.
//!
//! The crate keeps a sorted array of physical line heads (`WrapIndex`) in
//! step with the character store and the logical line index from
//! `linewise-buffer`. Glyph widths come from a pluggable `Measure`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  heads   ┌──────────────┐  widths  ┌─────────────┐
//! │  LineIndex   │─────────>│  WrapIndex   │<─────────│   Measure   │
//! └──────────────┘          └──────────────┘          └─────────────┘
//!        ^                         ^
//!        └────── CharStore ────────┘
//! ```

mod measure;
mod strategy;
mod wrap_index;

pub use measure::{CellMetrics, GlyphMeasure, GlyphMetrics, Measure, Measurement};
pub use strategy::LineLayoutStrategy;
pub use wrap_index::WrapIndex;

use linewise_buffer::BufferError;

/// Result type for layout operations
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Errors that can occur while laying out text
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Measurement would split a character or CRLF at offset {offset}")]
    SplitUnit { offset: usize },

    #[error("Measurement consumed {consumed} units but only {available} were given at offset {offset}")]
    Overrun {
        offset: usize,
        consumed: usize,
        available: usize,
    },

    #[error("Physical line head {offset} is missing from the wrap index")]
    MissingHead { offset: usize },

    #[error("Wrap index diverged at line {first_mismatch}: have {actual:?}, expected {expected:?}")]
    Diverged {
        first_mismatch: usize,
        actual: Option<usize>,
        expected: Option<usize>,
    },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}
