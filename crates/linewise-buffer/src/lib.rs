//! # Linewise Buffer
//!
//! UTF-16 character store with an incrementally maintained logical line index.
//!
//! ## Key Concepts for Learning Rust
//!
//! ### Ownership & Borrowing
//! - `CharStore` owns the code units; `LineIndex` owns only offsets into them
//! - Index maintenance borrows the store immutably (`&S`) while the index
//!   itself is borrowed mutably, so the two can never alias
//! - Mutations require `&mut self` (exclusive access)
//!
//! ### Generic Code Over Traits
//! - The `CodeUnits` trait lets the same line-scanning helpers read from the
//!   gap-buffered store and from a plain `&[u16]` about to be inserted
//!
//! ### Memory Safety
//! - Every public offset is range-checked and reported as a `BufferError`
//!   instead of panicking

mod eol;
mod gap;
mod line_index;
mod position;
mod store;

pub use eol::{
    CR, CodeUnits, LF, LineEnding, TAB, atom_len, is_char_boundary, is_eol, is_high_surrogate,
    is_inside_crlf, is_low_surrogate, line_heads, next_line_head,
};
pub use gap::GapVec;
pub use line_index::{DirtyState, LineIndex};
pub use position::Position;
pub use store::CharStore;

/// Line-head array helpers shared by the logical and the physical index.
pub mod heads {
    pub use crate::line_index::{line_column, line_of, offset_at};
}

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Range {begin}..{end} is invalid for text of length {len}")]
    InvalidRange { begin: usize, end: usize, len: usize },

    #[error("Position {line}:{column} is out of bounds")]
    PositionOutOfBounds { line: usize, column: usize },

    #[error("Line {line} is out of bounds (line count {count})")]
    LineOutOfBounds { line: usize, count: usize },

    #[error("Line index is inconsistent: {0}")]
    InconsistentIndex(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
