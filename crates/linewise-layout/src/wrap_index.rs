//! Physical line index.
//!
//! `WrapIndex` holds the heads of physical (screen) lines. Every logical line
//! head is also a physical head; wrapping adds heads inside long lines.
//!
//! ## Incremental Relayout
//!
//! After an edit at `index` only a bounded span needs measuring again:
//!
//! ```text
//!   W[p]            index      index+new_len        H
//!    |---------------|==============|----------------|
//!    anchor          edited text        rest of the   next logical head
//!                                       logical line  (layout unchanged
//!                                                      from here on)
//! ```
//!
//! * The span starts at the physical head at or before `index`; one line
//!   earlier when `index` is itself a head, because the previous line may now
//!   pull text back.
//! * The span ends at the logical head `H` after the line containing the end
//!   of the new text. Logical lines lay out independently, so everything from
//!   `H` on keeps its shape and only slides by the length delta.
//!
//! Inside the span each logical line is laid out on its own, exactly as
//! `full_layout` does. Its runs are measured in short segments that carry
//! the pen position, so a one-character edit in a huge line measures little
//! more than the line's tail. `full_layout` is the reference the
//! incremental path is checked against.

use std::fmt;
use std::ops::Range;

use linewise_buffer::{
    CharStore, GapVec, LineIndex, Position, atom_len, heads, is_char_boundary, is_inside_crlf,
};

use crate::measure::{CellMetrics, GlyphMeasure, Measure};
use crate::{LayoutError, LayoutResult, LineLayoutStrategy};

/// Units measured per call during incremental relayout.
const SEGMENT_LEN: usize = 10;

const DEFAULT_TAB_WIDTH: u32 = 8;

/// Sorted physical line heads plus the settings that produced them.
pub struct WrapIndex {
    heads: GapVec<usize>,
    strategy: LineLayoutStrategy,
    tab_width: u32,
    measure: Box<dyn Measure>,
}

impl WrapIndex {
    /// Creates the index of an empty document.
    pub fn new(strategy: LineLayoutStrategy, tab_width: u32, measure: Box<dyn Measure>) -> Self {
        Self {
            heads: GapVec::from_vec(vec![0]),
            strategy,
            tab_width,
            measure,
        }
    }

    // ==================== Settings ====================

    pub fn strategy(&self) -> LineLayoutStrategy {
        self.strategy
    }

    pub fn tab_width(&self) -> u32 {
        self.tab_width
    }

    /// Swaps in new settings and lays out the whole document again.
    ///
    /// `measure: None` keeps the current measurer. If the layout fails the
    /// previous settings and heads stay in place.
    pub fn reconfigure(
        &mut self,
        store: &CharStore,
        lines: &LineIndex,
        strategy: LineLayoutStrategy,
        tab_width: u32,
        measure: Option<Box<dyn Measure>>,
    ) -> LayoutResult<()> {
        let old_strategy = std::mem::replace(&mut self.strategy, strategy);
        let old_tab_width = std::mem::replace(&mut self.tab_width, tab_width);
        let old_measure = measure.map(|measure| std::mem::replace(&mut self.measure, measure));

        match self.rebuild(store, lines) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!("Layout settings rejected: {}", err);
                self.strategy = old_strategy;
                self.tab_width = old_tab_width;
                if let Some(measure) = old_measure {
                    self.measure = measure;
                }
                Err(err)
            }
        }
    }

    // ==================== Queries ====================

    /// Returns the number of physical lines (at least 1).
    #[inline]
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    /// Always false; a document has at least one physical line.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    pub fn head(&self, line: usize) -> Option<usize> {
        self.heads.get(line)
    }

    pub fn heads(&self) -> &GapVec<usize> {
        &self.heads
    }

    /// Returns the physical line containing `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        heads::line_of(&self.heads, offset)
    }

    pub fn line_column(&self, offset: usize) -> Position {
        heads::line_column(&self.heads, offset)
    }

    pub fn offset_at(&self, pos: Position, text_len: usize) -> LayoutResult<usize> {
        Ok(heads::offset_at(&self.heads, text_len, pos)?)
    }

    /// Returns the range of physical `line`, including any terminator it holds.
    pub fn line_range(&self, line: usize, text_len: usize) -> LayoutResult<Range<usize>> {
        let begin = self.head(line).ok_or(linewise_buffer::BufferError::LineOutOfBounds {
            line,
            count: self.len(),
        })?;
        let end = self.head(line + 1).unwrap_or(text_len);
        Ok(begin..end)
    }

    // ==================== Layout ====================

    /// Replaces every head with a full layout of the document.
    pub fn rebuild(&mut self, store: &CharStore, lines: &LineIndex) -> LayoutResult<()> {
        let heads = self.full_layout(store, lines)?;
        tracing::debug!("Full relayout: {} physical lines", heads.len());
        self.heads = GapVec::from_vec(heads);
        Ok(())
    }

    /// Lays out the whole document from scratch, one logical line at a time.
    pub fn full_layout(&self, store: &CharStore, lines: &LineIndex) -> LayoutResult<Vec<usize>> {
        let logical = lines.heads().to_vec();
        let Some(limit) = self.strategy.wrap_width() else {
            return Ok(logical);
        };

        let mut heads = Vec::with_capacity(logical.len());
        for (line, &head) in logical.iter().enumerate() {
            let end = logical.get(line + 1).copied().unwrap_or(store.len());
            let text = store.range(head, end)?;
            heads.push(head);

            let mut pos = 0;
            loop {
                let rest = &text[pos..];
                let measured = self.measure.measure(rest, 0, limit, self.tab_width);
                let mut consumed = check_consumed(store, head + pos, rest.len(), measured.consumed)?;
                if consumed == 0 {
                    consumed = atom_len(text.as_slice(), pos).max(1);
                }
                pos += consumed;
                if pos >= text.len() {
                    break;
                }
                heads.push(head + pos);
            }
        }
        Ok(heads)
    }

    /// Updates the heads after `old_len` units at `index` were replaced by
    /// `new_len` units.
    ///
    /// `store` and `lines` must already reflect the edit; the heads held
    /// here must still describe the text before it.
    pub fn on_replace(
        &mut self,
        store: &CharStore,
        lines: &LineIndex,
        index: usize,
        old_len: usize,
        new_len: usize,
    ) -> LayoutResult<()> {
        let diff = new_len as isize - old_len as isize;

        let mut first = self.line_of(index);
        if first > 0 && self.head(first) == Some(index) {
            first -= 1;
        }
        let anchor = self.head(first).unwrap_or(0);

        let stop = lines.head(lines.line_of(index + new_len) + 1);
        let past = match stop {
            Some(stop) => {
                let old_stop = stop.saturating_add_signed(-diff);
                let at = self.heads.partition_point(|h| h < old_stop);
                if self.head(at) != Some(old_stop) {
                    return Err(LayoutError::MissingHead { offset: old_stop });
                }
                at
            }
            None => self.len(),
        };

        let fresh = self.layout_span(store, lines, anchor, stop)?;
        tracing::debug!(
            "Relayout {}..{}: {} old heads replaced by {}",
            anchor,
            stop.unwrap_or(store.len()),
            past - first - 1,
            fresh.len()
        );

        self.heads.remove_range(first + 1, past);
        self.heads.shift_from(first + 1, diff);
        self.heads.insert_slice(first + 1, &fresh);
        Ok(())
    }

    /// Computes the heads after `anchor` and before `stop`.
    ///
    /// `anchor` must be a physical head and `stop` a logical head. Without a
    /// `stop` the span runs to the end of the document, including the empty
    /// last line that follows a final terminator.
    fn layout_span(
        &self,
        store: &CharStore,
        lines: &LineIndex,
        anchor: usize,
        stop: Option<usize>,
    ) -> LayoutResult<Vec<usize>> {
        let mut heads = Vec::new();
        let mut line = lines.line_of(anchor);
        let mut pos = anchor;

        loop {
            let next_head = lines.head(line + 1);
            if let Some(limit) = self.strategy.wrap_width() {
                let line_end = next_head.unwrap_or(store.len());
                self.wrap_line(store, pos, line_end, limit, &mut heads)?;
            }
            match next_head {
                Some(head) if next_head != stop => {
                    heads.push(head);
                    line += 1;
                    pos = head;
                }
                _ => break,
            }
        }
        Ok(heads)
    }

    /// Pushes the wrap points of `pos..line_end`, where `pos` starts a
    /// physical line and `line_end` ends its logical line.
    ///
    /// Runs are measured in short segments that carry the pen position, and
    /// never cross `line_end`.
    fn wrap_line(
        &self,
        store: &CharStore,
        mut pos: usize,
        line_end: usize,
        limit: u32,
        heads: &mut Vec<usize>,
    ) -> LayoutResult<()> {
        let mut line_head = pos;
        let mut x = 0;

        while pos < line_end {
            let mut seg_end = (pos + SEGMENT_LEN).min(line_end);
            if seg_end < line_end
                && (!is_char_boundary(store, seg_end) || is_inside_crlf(store, seg_end))
            {
                seg_end += 1;
            }
            let run = store.range(pos, seg_end)?;
            let measured = self.measure.measure(&run, x, limit, self.tab_width);
            let mut consumed = check_consumed(store, pos, run.len(), measured.consumed)?;

            // a glyph wider than the whole line still takes one line of its own
            let forced = consumed == 0 && pos == line_head;
            if forced {
                consumed = atom_len(store, pos).max(1);
            }
            let next = pos + consumed;

            if forced || consumed < run.len() {
                if next < line_end {
                    tracing::trace!("Physical line break at {}", next);
                    heads.push(next);
                }
                line_head = next;
                x = 0;
            } else {
                x = measured.end_x;
            }
            pos = next;
        }
        Ok(())
    }

    /// Compares the heads with a full layout.
    pub fn verify(&self, store: &CharStore, lines: &LineIndex) -> LayoutResult<()> {
        let expected = self.full_layout(store, lines)?;
        let actual = self.heads.to_vec();
        if actual != expected {
            let first_mismatch = actual
                .iter()
                .zip(&expected)
                .position(|(a, e)| a != e)
                .unwrap_or(actual.len().min(expected.len()));
            return Err(LayoutError::Diverged {
                first_mismatch,
                actual: actual.get(first_mismatch).copied(),
                expected: expected.get(first_mismatch).copied(),
            });
        }
        Ok(())
    }
}

impl Default for WrapIndex {
    fn default() -> Self {
        Self::new(
            LineLayoutStrategy::NoWrap,
            DEFAULT_TAB_WIDTH,
            Box::new(GlyphMeasure::new(CellMetrics::default())),
        )
    }
}

impl fmt::Debug for WrapIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapIndex")
            .field("heads", &self.heads)
            .field("strategy", &self.strategy)
            .field("tab_width", &self.tab_width)
            .finish_non_exhaustive()
    }
}

/// Rejects measurements that overrun the run or stop inside a unit pair.
fn check_consumed(
    store: &CharStore,
    offset: usize,
    available: usize,
    consumed: usize,
) -> LayoutResult<usize> {
    if consumed > available {
        return Err(LayoutError::Overrun {
            offset,
            consumed,
            available,
        });
    }
    let end = offset + consumed;
    if consumed > 0 && (!is_char_boundary(store, end) || is_inside_crlf(store, end)) {
        return Err(LayoutError::SplitUnit { offset: end });
    }
    Ok(consumed)
}
