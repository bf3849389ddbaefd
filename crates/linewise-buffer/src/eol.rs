//! End-of-line and code-unit helpers.
//!
//! Offsets everywhere in this crate count UTF-16 code units. A line ends at
//! CR, LF or CRLF; a CRLF is one terminator occupying two units. A
//! surrogate pair is one character occupying two units. Neither pair may be
//! split by a line head.

use serde::{Deserialize, Serialize};

/// Carriage return.
pub const CR: u16 = 0x000D;
/// Line feed.
pub const LF: u16 = 0x000A;
/// Horizontal tab.
pub const TAB: u16 = 0x0009;

/// Read access to a sequence of UTF-16 code units.
///
/// Implemented for the character store and for plain slices so the line
/// scanning helpers work on both the document and on text about to be
/// inserted.
pub trait CodeUnits {
    /// Number of code units.
    fn unit_len(&self) -> usize;

    /// The unit at `index`, or `None` past the end.
    fn unit(&self, index: usize) -> Option<u16>;
}

impl CodeUnits for [u16] {
    #[inline]
    fn unit_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn unit(&self, index: usize) -> Option<u16> {
        self.get(index).copied()
    }
}

impl CodeUnits for Vec<u16> {
    #[inline]
    fn unit_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn unit(&self, index: usize) -> Option<u16> {
        self.get(index).copied()
    }
}

/// Returns true for CR and LF.
#[inline]
pub fn is_eol(unit: u16) -> bool {
    unit == CR || unit == LF
}

#[inline]
pub fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

#[inline]
pub fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

/// Returns true if a line head or edit boundary may sit at `index`.
///
/// False only strictly inside a surrogate pair. Offsets outside the
/// sequence are reported as dividable; range checks are the caller's job.
pub fn is_char_boundary<S: CodeUnits + ?Sized>(text: &S, index: usize) -> bool {
    if index == 0 || index >= text.unit_len() {
        return true;
    }
    match (text.unit(index - 1), text.unit(index)) {
        (Some(prev), Some(next)) => !(is_high_surrogate(prev) && is_low_surrogate(next)),
        _ => true,
    }
}

/// Returns true if `index` sits between the CR and LF of a CRLF.
pub fn is_inside_crlf<S: CodeUnits + ?Sized>(text: &S, index: usize) -> bool {
    index > 0 && text.unit(index - 1) == Some(CR) && text.unit(index) == Some(LF)
}

/// Length of the indivisible unit starting at `index`: 2 for a CRLF or a
/// surrogate pair, 1 otherwise, 0 past the end.
pub fn atom_len<S: CodeUnits + ?Sized>(text: &S, index: usize) -> usize {
    match (text.unit(index), text.unit(index + 1)) {
        (None, _) => 0,
        (Some(CR), Some(LF)) => 2,
        (Some(high), Some(low)) if is_high_surrogate(high) && is_low_surrogate(low) => 2,
        _ => 1,
    }
}

/// Finds the head of the line following the one containing `from`.
///
/// Returns `None` when no terminator follows `from`.
pub fn next_line_head<S: CodeUnits + ?Sized>(text: &S, from: usize) -> Option<usize> {
    (from..text.unit_len()).find_map(|i| match text.unit(i) {
        Some(CR) if text.unit(i + 1) == Some(LF) => Some(i + 2),
        Some(CR) | Some(LF) => Some(i + 1),
        _ => None,
    })
}

/// Computes every line head of `text` by a full scan.
pub fn line_heads<S: CodeUnits + ?Sized>(text: &S) -> Vec<usize> {
    let mut heads = vec![0];
    let mut from = 0;
    while let Some(head) = next_line_head(text, from) {
        heads.push(head);
        from = head;
    }
    heads
}

/// Line ending style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Unix-style: \n
    #[default]
    Lf,
    /// Windows-style: \r\n
    CrLf,
    /// Classic Mac: \r
    Cr,
}

impl LineEnding {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }

    /// Detects the line ending from the first terminator in `text`.
    pub fn detect<S: CodeUnits + ?Sized>(text: &S) -> Option<Self> {
        (0..text.unit_len()).find_map(|i| match text.unit(i) {
            Some(CR) if text.unit(i + 1) == Some(LF) => Some(LineEnding::CrLf),
            Some(CR) => Some(LineEnding::Cr),
            Some(LF) => Some(LineEnding::Lf),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn test_next_line_head_treats_crlf_as_one() {
        let text = units("ab\r\ncd\re\nf");
        assert_eq!(next_line_head(text.as_slice(), 0), Some(4));
        assert_eq!(next_line_head(text.as_slice(), 4), Some(7));
        assert_eq!(next_line_head(text.as_slice(), 7), Some(9));
        assert_eq!(next_line_head(text.as_slice(), 9), None);
    }

    #[test]
    fn test_line_heads() {
        assert_eq!(line_heads(units("").as_slice()), vec![0]);
        assert_eq!(line_heads(units("a\r\nb\n").as_slice()), vec![0, 3, 5]);
        assert_eq!(line_heads(units("\r\r\n\n").as_slice()), vec![0, 1, 3, 4]);
        assert_eq!(line_heads(units("x\ry").as_slice()).len(), 2);
    }

    #[test]
    fn test_surrogate_boundaries() {
        let text = units("a😀b");
        assert_eq!(text.len(), 4);
        assert!(is_char_boundary(text.as_slice(), 1));
        assert!(!is_char_boundary(text.as_slice(), 2));
        assert!(is_char_boundary(text.as_slice(), 3));
        assert_eq!(atom_len(text.as_slice(), 1), 2);
        assert_eq!(atom_len(text.as_slice(), 3), 1);
        assert_eq!(atom_len(text.as_slice(), 4), 0);
    }

    #[test]
    fn test_line_ending_detect() {
        assert_eq!(LineEnding::detect(units("a\r\nb").as_slice()), Some(LineEnding::CrLf));
        assert_eq!(LineEnding::detect(units("a\rb").as_slice()), Some(LineEnding::Cr));
        assert_eq!(LineEnding::detect(units("a\nb\r\n").as_slice()), Some(LineEnding::Lf));
        assert_eq!(LineEnding::detect(units("ab").as_slice()), None);
    }
}
