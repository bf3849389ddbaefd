//! Text measurement.
//!
//! ## Learning: Trait Objects at the Seam
//!
//! The layout engine never knows how wide a glyph is. It asks a `Measure`
//! implementation, held as `Box<dyn Measure>`, so a terminal front end can
//! count cells while a graphical one asks its font rasterizer. Everything
//! else (tab stops, EOL marks, surrogate pairs) is handled once here by
//! `GlyphMeasure`, which only needs per-character advances.
//!
//! A measurement must be additive: measuring a run in two pieces, carrying
//! the pen position from the first into the second, must stop at the same
//! place as measuring it in one go. The incremental wrap path depends on it.

use unicode_width::UnicodeWidthChar;

use linewise_buffer::{CR, LF, TAB, is_eol, is_high_surrogate, is_low_surrogate};

/// How far a run could be laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Measurement {
    /// Pen position after the last consumed unit.
    pub end_x: u32,
    /// Number of code units that fit.
    pub consumed: usize,
}

/// Measures runs of UTF-16 text against a width limit.
pub trait Measure: Send + Sync {
    /// Lays out `run` starting at pen position `x` and stops at the first
    /// glyph whose right edge would exceed `limit`.
    ///
    /// A run never extends past the end of its logical line, so a
    /// terminator can only be its last atom. `consumed` must never split a
    /// surrogate pair or a CRLF; the layout engine rejects measurements
    /// that do.
    fn measure(&self, run: &[u16], x: u32, limit: u32, tab_width: u32) -> Measurement;
}

/// Per-character advance widths in pixels.
pub trait GlyphMetrics {
    fn advance(&self, ch: char) -> u32;

    /// Width of the end-of-line mark.
    fn eol_width(&self) -> u32 {
        self.advance(' ')
    }
}

impl<F: Fn(char) -> u32> GlyphMetrics for F {
    fn advance(&self, ch: char) -> u32 {
        self(ch)
    }
}

/// Fixed-size cells: one cell per narrow character, two per wide one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    pub cell_px: u32,
    pub eol_px: u32,
}

impl CellMetrics {
    pub fn new(cell_px: u32) -> Self {
        Self {
            cell_px,
            eol_px: cell_px,
        }
    }

    pub fn with_eol_width(mut self, eol_px: u32) -> Self {
        self.eol_px = eol_px;
        self
    }
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self::new(8)
    }
}

impl GlyphMetrics for CellMetrics {
    fn advance(&self, ch: char) -> u32 {
        // control characters have no defined width; draw them as one cell
        let cells = ch.width().unwrap_or(1) as u32;
        cells.saturating_mul(self.cell_px)
    }

    fn eol_width(&self) -> u32 {
        self.eol_px
    }
}

/// `Measure` built from glyph advances.
#[derive(Debug, Clone, Default)]
pub struct GlyphMeasure<M> {
    metrics: M,
}

impl<M: GlyphMetrics> GlyphMeasure<M> {
    pub fn new(metrics: M) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Width of one tab stop; never zero.
    fn tab_px(&self, tab_width: u32) -> u32 {
        tab_width
            .max(1)
            .saturating_mul(self.metrics.advance(' '))
            .max(1)
    }
}

impl<M: GlyphMetrics + Send + Sync> Measure for GlyphMeasure<M> {
    fn measure(&self, run: &[u16], x: u32, limit: u32, tab_width: u32) -> Measurement {
        let tab_px = self.tab_px(tab_width);
        let mut x = x;
        let mut i = 0;

        while let Some(&unit) = run.get(i) {
            if is_eol(unit) {
                let right = x.saturating_add(self.metrics.eol_width());
                if right > limit {
                    break;
                }
                let len = if unit == CR && run.get(i + 1) == Some(&LF) {
                    2
                } else {
                    1
                };
                return Measurement {
                    end_x: right,
                    consumed: i + len,
                };
            }

            let (right, len) = if unit == TAB {
                ((x / tab_px).saturating_add(1).saturating_mul(tab_px), 1)
            } else {
                let (ch, len) = decode(run, i);
                (x.saturating_add(self.metrics.advance(ch)), len)
            };
            if right > limit {
                break;
            }
            x = right;
            i += len;
        }

        Measurement {
            end_x: x,
            consumed: i,
        }
    }
}

/// Decodes the character at `i`; a lone surrogate reads as U+FFFD.
fn decode(run: &[u16], i: usize) -> (char, usize) {
    let unit = run[i];
    if is_high_surrogate(unit) {
        if let Some(&low) = run.get(i + 1) {
            if is_low_surrogate(low) {
                let code = 0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
                return (char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER), 2);
            }
        }
    }
    (
        char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER),
        1,
    )
}
