//! Text search over UTF-16 code units.
//!
//! ## Learning: Two Matchers Behind One Enum
//!
//! Case-sensitive literal search compares code units directly. Everything
//! else (case folding, regular expressions) goes through the `regex` crate,
//! which works on UTF-8, so the text is decoded once per query and match
//! offsets are mapped back to code units.
//!
//! Lone surrogates decode to U+FFFD and keep their one-unit width, so
//! mapped offsets always land on the same units the store holds.

use std::ops::Range;

use linewise_buffer::CodeUnits;
use regex::{Regex, RegexBuilder};

/// Errors from building a search pattern.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// How a query is interpreted.
///
/// The default is a case-insensitive literal search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub match_case: bool,
    pub use_regex: bool,
}

impl SearchOptions {
    /// Case-sensitive literal search.
    pub fn exact() -> Self {
        Self {
            match_case: true,
            use_regex: false,
        }
    }

    /// Regular expression search; `^` and `$` match at line ends.
    pub fn regex(match_case: bool) -> Self {
        Self {
            match_case,
            use_regex: true,
        }
    }
}

/// A compiled query.
#[derive(Debug, Clone)]
pub enum SearchPattern {
    Exact(Vec<u16>),
    Regex(Regex),
}

impl SearchPattern {
    pub fn new(pattern: &str, options: SearchOptions) -> Result<Self, SearchError> {
        if options.match_case && !options.use_regex {
            return Ok(Self::Exact(pattern.encode_utf16().collect()));
        }

        let source = if options.use_regex {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(!options.match_case)
            .multi_line(true)
            .build()?;
        Ok(Self::Regex(regex))
    }

    /// Finds the first match starting at or after `from`.
    pub fn find_next<S: CodeUnits + ?Sized>(&self, text: &S, from: usize) -> Option<Range<usize>> {
        match self {
            Self::Exact(units) => find_next(text, units, from),
            Self::Regex(regex) => {
                let decoded = Decoded::new(text);
                let mut pos = decoded.byte_at(from)?;
                while pos <= decoded.text.len() {
                    let found = regex.find_at(&decoded.text, pos)?;
                    if !found.is_empty() {
                        return Some(decoded.units(found.range()));
                    }
                    pos = decoded.next_boundary(found.start());
                }
                None
            }
        }
    }

    /// Finds the match with the latest start that ends at or before `from`.
    pub fn find_prev<S: CodeUnits + ?Sized>(&self, text: &S, from: usize) -> Option<Range<usize>> {
        match self {
            Self::Exact(units) => find_prev(text, units, from),
            Self::Regex(regex) => {
                let decoded = Decoded::new(text);
                let limit = decoded.byte_at(from.min(text.unit_len()))?;
                let mut best = None;
                let mut pos = 0;
                while let Some(found) = regex.find_at(&decoded.text, pos) {
                    if found.start() >= limit {
                        break;
                    }
                    if !found.is_empty() && found.end() <= limit {
                        best = Some(found.range());
                    }
                    pos = decoded.next_boundary(found.start());
                }
                best.map(|range| decoded.units(range))
            }
        }
    }

    /// Finds every non-overlapping, non-empty match, scanning forward.
    pub fn find_all<S: CodeUnits + ?Sized>(&self, text: &S) -> Vec<Range<usize>> {
        match self {
            Self::Exact(units) => find_all(text, units),
            Self::Regex(regex) => {
                let decoded = Decoded::new(text);
                regex
                    .find_iter(&decoded.text)
                    .filter(|found| !found.is_empty())
                    .map(|found| decoded.units(found.range()))
                    .collect()
            }
        }
    }
}

// ==================== UTF-16 <-> UTF-8 ====================

/// Text decoded for the regex engine, with (byte, unit) offsets of every
/// char boundary including the end.
struct Decoded {
    text: String,
    boundaries: Vec<(usize, usize)>,
}

impl Decoded {
    fn new<S: CodeUnits + ?Sized>(source: &S) -> Self {
        let units = (0..source.unit_len()).filter_map(|i| source.unit(i));
        let mut text = String::with_capacity(source.unit_len());
        let mut boundaries = Vec::with_capacity(source.unit_len() + 1);
        let mut unit = 0;
        for decoded in char::decode_utf16(units) {
            boundaries.push((text.len(), unit));
            match decoded {
                Ok(ch) => {
                    text.push(ch);
                    unit += ch.len_utf16();
                }
                Err(_) => {
                    text.push(char::REPLACEMENT_CHARACTER);
                    unit += 1;
                }
            }
        }
        boundaries.push((text.len(), unit));
        Self { text, boundaries }
    }

    /// Byte offset of the first boundary at or after unit offset `unit`.
    fn byte_at(&self, unit: usize) -> Option<usize> {
        let i = self.boundaries.partition_point(|&(_, u)| u < unit);
        self.boundaries.get(i).map(|&(byte, _)| byte)
    }

    fn unit_at(&self, byte: usize) -> usize {
        let i = self.boundaries.partition_point(|&(b, _)| b < byte);
        self.boundaries.get(i).map_or(0, |&(_, unit)| unit)
    }

    fn units(&self, bytes: Range<usize>) -> Range<usize> {
        self.unit_at(bytes.start)..self.unit_at(bytes.end)
    }

    /// Byte offset of the char boundary after `byte`.
    fn next_boundary(&self, byte: usize) -> usize {
        self.text[byte..]
            .chars()
            .next()
            .map_or(byte + 1, |ch| byte + ch.len_utf8())
    }
}

// ==================== Literal Search ====================

fn matches_at<S: CodeUnits + ?Sized>(text: &S, pattern: &[u16], at: usize) -> bool {
    pattern
        .iter()
        .enumerate()
        .all(|(i, &unit)| text.unit(at + i) == Some(unit))
}

/// Finds the first match starting at or after `from`.
pub fn find_next<S: CodeUnits + ?Sized>(
    text: &S,
    pattern: &[u16],
    from: usize,
) -> Option<Range<usize>> {
    if pattern.is_empty() || pattern.len() > text.unit_len() {
        return None;
    }
    let last = text.unit_len() - pattern.len();
    (from..=last)
        .find(|&at| matches_at(text, pattern, at))
        .map(|at| at..at + pattern.len())
}

/// Finds the last match that ends at or before `from`.
pub fn find_prev<S: CodeUnits + ?Sized>(
    text: &S,
    pattern: &[u16],
    from: usize,
) -> Option<Range<usize>> {
    let end = from.min(text.unit_len());
    if pattern.is_empty() || pattern.len() > end {
        return None;
    }
    (0..=end - pattern.len())
        .rev()
        .find(|&at| matches_at(text, pattern, at))
        .map(|at| at..at + pattern.len())
}

/// Finds every non-overlapping match, scanning forward.
pub fn find_all<S: CodeUnits + ?Sized>(text: &S, pattern: &[u16]) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(range) = find_next(text, pattern, from) {
        from = range.end;
        found.push(range);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    fn pattern(query: &str, options: SearchOptions) -> SearchPattern {
        SearchPattern::new(query, options).unwrap()
    }

    #[test]
    fn test_find_next_and_prev() {
        let text = units("one two one two");
        let pattern = units("two");
        assert_eq!(find_next(text.as_slice(), &pattern, 0), Some(4..7));
        assert_eq!(find_next(text.as_slice(), &pattern, 5), Some(12..15));
        assert_eq!(find_next(text.as_slice(), &pattern, 13), None);
        assert_eq!(find_prev(text.as_slice(), &pattern, 15), Some(12..15));
        assert_eq!(find_prev(text.as_slice(), &pattern, 14), Some(4..7));
        assert_eq!(find_prev(text.as_slice(), &pattern, 6), None);
    }

    #[test]
    fn test_find_all_is_non_overlapping() {
        let text = units("aaaa");
        assert_eq!(find_all(text.as_slice(), &units("aa")), vec![0..2, 2..4]);
    }

    #[test]
    fn test_empty_or_oversized_pattern() {
        let text = units("abc");
        assert_eq!(find_next(text.as_slice(), &[], 0), None);
        assert_eq!(find_prev(text.as_slice(), &units("abcd"), 3), None);
        assert!(find_all(text.as_slice(), &[]).is_empty());
    }

    #[test]
    fn test_crlf_and_astral_patterns() {
        let text = units("a\r\n😀\r\n");
        assert_eq!(find_all(text.as_slice(), &units("\r\n")), vec![1..3, 5..7]);
        assert_eq!(find_next(text.as_slice(), &units("😀"), 0), Some(3..5));
    }

    #[test]
    fn test_default_options_ignore_case() {
        let text = units("Foo foo FOO");
        let query = pattern("foo", SearchOptions::default());
        assert_eq!(query.find_all(text.as_slice()), vec![0..3, 4..7, 8..11]);
        assert_eq!(query.find_next(text.as_slice(), 1), Some(4..7));
        assert_eq!(query.find_prev(text.as_slice(), 10), Some(4..7));

        let exact = pattern("foo", SearchOptions::exact());
        assert!(matches!(exact, SearchPattern::Exact(_)));
        assert_eq!(exact.find_all(text.as_slice()), vec![4..7]);
    }

    #[test]
    fn test_literal_query_escapes_metacharacters() {
        let text = units("a.b axb");
        let query = pattern("A.B", SearchOptions::default());
        assert_eq!(query.find_all(text.as_slice()), vec![0..3]);
    }

    #[test]
    fn test_regex_offsets_are_code_units() {
        let text = units("😀ab é😀AB");
        let query = pattern("ab", SearchOptions::regex(false));
        assert_eq!(query.find_all(text.as_slice()), vec![2..4, 8..10]);
        assert_eq!(query.find_next(text.as_slice(), 3), Some(8..10));
        assert_eq!(query.find_prev(text.as_slice(), 9), Some(2..4));

        let cased = pattern("[A-Z]+", SearchOptions::regex(true));
        assert_eq!(cased.find_all(text.as_slice()), vec![8..10]);
    }

    #[test]
    fn test_regex_is_multi_line() {
        let text = units("one\ntwo\r\nthree");
        let query = pattern(r"^t\w+", SearchOptions::regex(true));
        assert_eq!(query.find_all(text.as_slice()), vec![4..7, 9..14]);
    }

    #[test]
    fn test_regex_skips_empty_matches() {
        let text = units("a1b22");
        let query = pattern(r"\d*", SearchOptions::regex(true));
        assert_eq!(query.find_all(text.as_slice()), vec![1..2, 3..5]);
        assert_eq!(query.find_next(text.as_slice(), 2), Some(3..5));
        assert_eq!(query.find_prev(text.as_slice(), 5), Some(4..5));
    }

    #[test]
    fn test_lone_surrogate_keeps_unit_offsets() {
        let mut text = units("x");
        text.push(0xD800);
        text.extend(units("yx"));
        let query = pattern("x", SearchOptions::default());
        assert_eq!(query.find_all(text.as_slice()), vec![0..1, 3..4]);
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            SearchPattern::new("(", SearchOptions::regex(false)),
            Err(SearchError::InvalidRegex(_))
        ));
        // the same text is fine as a literal
        assert!(SearchPattern::new("(", SearchOptions::default()).is_ok());
    }
}
