//! Logical line index.
//!
//! The index is a sorted array of line heads: `heads[i]` is the offset of
//! the first unit of line `i`, and `heads[0]` is always 0. Each line holds
//! at most one terminator, at its end.
//!
//! ## Keeping It Incremental
//!
//! An edit only disturbs line heads near its two boundaries. Everything
//! strictly inside the inserted text comes from scanning that text, and
//! everything after the edit keeps its meaning and just slides by the length
//! delta. What remains are the *junctions*, the offsets where old and new
//! text meet. Whether a junction is a line head depends on the units on both
//! sides of it:
//!
//! ```text
//! unit before   unit after    head at junction?
//! LF            anything      yes
//! CR            LF            no  (the pair is one CRLF terminator)
//! CR            other / EOF   yes (lone CR)
//! other         anything      no
//! ```
//!
//! Splitting a CRLF, completing a lone CR with an inserted LF, or pairing a
//! CR with an LF by deleting what sat between them all reduce to evaluating
//! that table at the junctions.
//!
//! Both maintenance passes must run *before* the store is mutated, because
//! they read the units around the edit from the old content.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::eol::{self, CodeUnits, CR, LF};
use crate::gap::GapVec;
use crate::{BufferError, BufferResult, Position};

/// Whether the derived data of a line (syntax classes, dirt bar) is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirtyState {
    /// Untouched since the document was loaded.
    #[default]
    Clean,
    /// Modified and not yet acknowledged.
    Dirty,
    /// Modified, then acknowledged (for example by saving).
    Cleaned,
}

/// Line heads of a document plus one dirty flag per line.
#[derive(Debug, Clone)]
pub struct LineIndex {
    heads: GapVec<usize>,
    dirty: GapVec<DirtyState>,
}

impl LineIndex {
    /// Creates the index of an empty document: one empty line.
    pub fn new() -> Self {
        Self {
            heads: GapVec::from_vec(vec![0]),
            dirty: GapVec::from_vec(vec![DirtyState::Clean]),
        }
    }

    /// Builds the index of `text` by a full scan. Every line starts clean.
    pub fn from_text<S: CodeUnits + ?Sized>(text: &S) -> Self {
        let mut index = Self::new();
        index.rebuild(text);
        index
    }

    /// Recomputes every head from scratch.
    pub fn rebuild<S: CodeUnits + ?Sized>(&mut self, text: &S) {
        let heads = eol::line_heads(text);
        self.dirty = GapVec::from_vec(vec![DirtyState::Clean; heads.len()]);
        self.heads = GapVec::from_vec(heads);
    }

    // ==================== Queries ====================

    /// Returns the number of logical lines (at least 1).
    #[inline]
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    /// Always false; a document has at least one line.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Returns the head offset of `line`.
    pub fn head(&self, line: usize) -> Option<usize> {
        self.heads.get(line)
    }

    /// Returns the raw head array.
    pub fn heads(&self) -> &GapVec<usize> {
        &self.heads
    }

    /// Returns the line containing `offset`.
    ///
    /// Offsets past the end resolve to the last line.
    pub fn line_of(&self, offset: usize) -> usize {
        line_of(&self.heads, offset)
    }

    /// Converts an offset to a logical line/column.
    pub fn line_column(&self, offset: usize) -> Position {
        line_column(&self.heads, offset)
    }

    /// Converts a logical line/column back to an offset.
    pub fn offset_at(&self, pos: Position, text_len: usize) -> BufferResult<usize> {
        offset_at(&self.heads, text_len, pos)
    }

    /// Returns the range of `line`, with or without its terminator.
    pub fn line_range<S: CodeUnits + ?Sized>(
        &self,
        text: &S,
        line: usize,
        include_eol: bool,
    ) -> BufferResult<Range<usize>> {
        let begin = self.head(line).ok_or(BufferError::LineOutOfBounds {
            line,
            count: self.len(),
        })?;
        let mut end = self.head(line + 1).unwrap_or(text.unit_len());

        if !include_eol {
            if end > begin && text.unit(end - 1) == Some(LF) {
                end -= 1;
                if end > begin && text.unit(end - 1) == Some(CR) {
                    end -= 1;
                }
            } else if end > begin && text.unit(end - 1) == Some(CR) {
                end -= 1;
            }
        }

        Ok(begin..end)
    }

    // ==================== Dirty State ====================

    /// Returns the dirty state of `line`.
    pub fn dirty_state(&self, line: usize) -> Option<DirtyState> {
        self.dirty.get(line)
    }

    /// Acknowledges a modified line: `Dirty` becomes `Cleaned`.
    pub fn clear_dirty(&mut self, line: usize) -> BufferResult<()> {
        match self.dirty.get(line) {
            Some(DirtyState::Dirty) => {
                self.dirty.set(line, DirtyState::Cleaned);
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(BufferError::LineOutOfBounds {
                line,
                count: self.len(),
            }),
        }
    }

    /// Acknowledges every modified line.
    pub fn clear_all_dirty(&mut self) {
        for line in 0..self.dirty.len() {
            if self.dirty.get(line) == Some(DirtyState::Dirty) {
                self.dirty.set(line, DirtyState::Cleaned);
            }
        }
    }

    /// Copies the dirty states of `lines` (clamped to the line count).
    pub fn dirty_states(&self, lines: Range<usize>) -> Vec<DirtyState> {
        lines.map_while(|line| self.dirty.get(line)).collect()
    }

    /// Overwrites the dirty states from `first` on with `states`.
    pub fn restore_dirty_states(&mut self, first: usize, states: &[DirtyState]) {
        for (line, &state) in (first..self.dirty.len()).zip(states) {
            self.dirty.set(line, state);
        }
    }

    fn mark_dirty(&mut self, line: usize) {
        if line < self.dirty.len() {
            self.dirty.set(line, DirtyState::Dirty);
        }
    }

    // ==================== Maintenance ====================

    /// Updates the index for inserting `insert` at `at`.
    ///
    /// THIS MUST BE CALLED BEFORE THE UNITS ARE INSERTED INTO `text`.
    pub fn on_insert<S: CodeUnits + ?Sized>(&mut self, text: &S, insert: &[u16], at: usize) {
        let (Some(&first), Some(&last)) = (insert.first(), insert.last()) else {
            return;
        };
        let before = at.checked_sub(1).and_then(|i| text.unit(i));
        let after = text.unit(at);
        let target = self.line_of(at);

        // drop the old head at the insertion point; the left junction decides it again
        let slot = self.heads.partition_point(|h| h < at);
        if self.heads.get(slot) == Some(at) {
            self.heads.remove(slot);
            self.dirty.remove(slot);
        }
        self.heads.shift_from(slot, insert.len() as isize);

        let mut fresh = Vec::new();

        // left junction: splits a CRLF, or is absorbed when a leading LF completes a CR
        if at == 0 || is_junction_head(before, Some(first)) {
            fresh.push(at);
        }

        // terminators inside the inserted text
        let mut from = 0;
        while let Some(head) = eol::next_line_head(insert, from) {
            if head >= insert.len() {
                break;
            }
            fresh.push(at + head);
            from = head;
        }

        // right junction: a trailing CR pairs with an LF already in the text
        if is_junction_head(Some(last), after) {
            fresh.push(at + insert.len());
        }

        self.insert_heads(slot, &fresh);

        // a leading LF that completes a lone CR edits the CR's line
        if first == LF && before == Some(CR) && after != Some(LF) {
            self.mark_dirty(target.saturating_sub(1));
        } else {
            self.mark_dirty(target);
        }
    }

    /// Updates the index for deleting `begin..end`.
    ///
    /// THIS MUST BE CALLED BEFORE THE UNITS ARE REMOVED FROM `text`.
    pub fn on_delete<S: CodeUnits + ?Sized>(&mut self, text: &S, begin: usize, end: usize) {
        if begin >= end {
            return;
        }
        let before = begin.checked_sub(1).and_then(|i| text.unit(i));
        let after = text.unit(end);
        let target = self.line_of(begin);

        // heads in begin..=end collapse onto the junction
        let first = self.heads.partition_point(|h| h < begin);
        let past = self.heads.partition_point(|h| h <= end);
        self.heads.remove_range(first, past);
        self.dirty.remove_range(first, past);
        self.heads.shift_from(first, -((end - begin) as isize));

        // the junction merges a CR with a following LF, or leaves a CR lone
        if begin == 0 || is_junction_head(before, after) {
            self.insert_heads(first, &[begin]);
        }

        // pairing a CR with an LF folds the edited line into the CR's line
        if before == Some(CR) && after == Some(LF) && target > 0 {
            self.mark_dirty(target - 1);
        } else {
            self.mark_dirty(target);
        }
    }

    fn insert_heads(&mut self, slot: usize, heads: &[usize]) {
        self.heads.insert_slice(slot, heads);
        self.dirty
            .insert_slice(slot, &vec![DirtyState::Dirty; heads.len()]);
    }

    /// Checks the invariants and compares against a full scan of `text`.
    pub fn verify<S: CodeUnits + ?Sized>(&self, text: &S) -> BufferResult<()> {
        if self.heads.len() != self.dirty.len() {
            return Err(BufferError::InconsistentIndex(format!(
                "{} line heads but {} dirty states",
                self.heads.len(),
                self.dirty.len()
            )));
        }

        let expected = eol::line_heads(text);
        let actual = self.heads.to_vec();
        if actual != expected {
            let at = actual
                .iter()
                .zip(&expected)
                .position(|(a, e)| a != e)
                .unwrap_or(actual.len().min(expected.len()));
            return Err(BufferError::InconsistentIndex(format!(
                "line heads diverge at line {at}: have {:?}, expected {:?}",
                actual.get(at),
                expected.get(at)
            )));
        }
        Ok(())
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides whether a junction between `before` and `after` starts a line.
#[inline]
fn is_junction_head(before: Option<u16>, after: Option<u16>) -> bool {
    match before {
        Some(LF) => true,
        Some(CR) => after != Some(LF),
        _ => false,
    }
}

// ==================== Head Array Helpers ====================
//
// Shared by the logical and the physical (wrapped) index.

/// Returns the index of the line containing `offset` in a sorted head array.
pub fn line_of(heads: &GapVec<usize>, offset: usize) -> usize {
    heads.partition_point(|h| h <= offset).saturating_sub(1)
}

/// Converts `offset` to a line/column against `heads`.
pub fn line_column(heads: &GapVec<usize>, offset: usize) -> Position {
    let line = line_of(heads, offset);
    let head = heads.get(line).unwrap_or(0);
    Position::new(line, offset.saturating_sub(head))
}

/// Converts a line/column to an offset against `heads`.
///
/// The column may point at any unit of the line including its terminator,
/// or one past the end on the last line.
pub fn offset_at(heads: &GapVec<usize>, text_len: usize, pos: Position) -> BufferResult<usize> {
    let head = heads.get(pos.line).ok_or(BufferError::LineOutOfBounds {
        line: pos.line,
        count: heads.len(),
    })?;
    let in_line = match heads.get(pos.line + 1) {
        Some(next) => head + pos.column < next,
        None => head + pos.column <= text_len,
    };
    if !in_line {
        return Err(BufferError::PositionOutOfBounds {
            line: pos.line,
            column: pos.column,
        });
    }
    Ok(head + pos.column)
}
