//! Edit interceptors (auto-indentation).
//!
//! ## Learning: Traits Instead of Callbacks
//!
//! An interceptor sees each typed character before the document inserts
//! it. Returning `Ok(true)` means "handled, do not insert". Implementing a
//! trait rather than storing a boxed closure keeps the built-in variants
//! inspectable (`IndentInterceptor` is a plain enum) while still letting
//! callers plug in their own behavior.

use crate::document::Document;
use crate::CoreResult;

const SPACE: u16 = 0x0020;
const TAB: u16 = 0x0009;
const IDEOGRAPHIC_SPACE: u16 = 0x3000;
const OPEN_BRACE: u16 = 0x007B;
const CLOSE_BRACE: u16 = 0x007D;

/// Hook consulted for every typed character.
pub trait EditInterceptor {
    /// Handles `ch` by editing `doc` directly, or returns `false` to let
    /// the document insert it normally.
    fn try_handle(&self, doc: &mut Document, ch: char) -> CoreResult<bool>;
}

/// Built-in auto-indent behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentInterceptor {
    /// Copies the leading whitespace of the current line on newline.
    Generic,
    /// Like `Generic`, plus one level after an unclosed `{` and outdenting
    /// a `}` typed on a blank line.
    BraceAware,
}

impl EditInterceptor for IndentInterceptor {
    fn try_handle(&self, doc: &mut Document, ch: char) -> CoreResult<bool> {
        match self {
            IndentInterceptor::Generic => generic(doc, ch),
            IndentInterceptor::BraceAware => brace_aware(doc, ch),
        }
    }
}

fn is_eol_char(ch: char) -> bool {
    ch == '\r' || ch == '\n'
}

/// Collects the leading whitespace of `begin..end`.
fn leading_indent(doc: &Document, begin: usize, end: usize, full_width: bool) -> String {
    (begin..end)
        .map_while(|i| match doc.unit(i) {
            Some(SPACE) => Some(' '),
            Some(TAB) => Some('\t'),
            Some(IDEOGRAPHIC_SPACE) if full_width => Some('\u{3000}'),
            _ => None,
        })
        .collect()
}

fn generic(doc: &mut Document, ch: char) -> CoreResult<bool> {
    if !is_eol_char(ch) {
        return Ok(false);
    }

    let caret = doc.caret();
    let line_head = doc.line_head(doc.line_column(caret)?.line)?;
    let mut text = doc.line_ending().as_str().to_string();
    text.push_str(&leading_indent(doc, line_head, caret, true));

    let new_caret = doc.anchor().min(caret) + text.encode_utf16().count();
    doc.replace_selection(&text)?;
    doc.set_selection(new_caret, new_caret)?;
    Ok(true)
}

fn brace_aware(doc: &mut Document, ch: char) -> CoreResult<bool> {
    let selection = doc.selection_range();
    let (sel_begin, mut sel_end) = (selection.start, selection.end);
    let line = doc.line_column(sel_begin)?.line;
    let line_range = doc.line_range(line, false)?;

    if is_eol_char(ch) {
        if line_range.is_empty() {
            return Ok(false);
        }

        let mut text = doc.line_ending().as_str().to_string();
        text.push_str(&leading_indent(doc, line_range.start, sel_begin, false));

        // whitespace right of the selection would end up leading the new line
        while sel_end < line_range.end
            && matches!(doc.unit(sel_end), Some(SPACE | TAB | IDEOGRAPHIC_SPACE))
        {
            sel_end += 1;
        }

        // decided before replacing; the line end moves afterwards
        let opens_block = find_open_brace(doc, sel_begin, line_range.start).is_some()
            && !(sel_begin..line_range.end).any(|i| doc.unit(i) == Some(CLOSE_BRACE));

        let mut new_caret = sel_begin + text.encode_utf16().count();
        doc.replace(&text, sel_begin, sel_end)?;

        if opens_block {
            let padding = indent_step(doc, new_caret)?;
            doc.replace(&padding, new_caret, new_caret)?;
            new_caret += padding.encode_utf16().count();
        }

        doc.set_selection(new_caret, new_caret)?;
        Ok(true)
    } else if ch == '}' {
        let blank = (line_range.start..line_range.end)
            .all(|i| matches!(doc.unit(i), Some(SPACE | TAB)));
        if !blank {
            return Ok(false);
        }

        let Some(pair) = find_open_brace(doc, sel_begin, 0) else {
            return Ok(false);
        };
        let paired = doc.line_range(doc.line_column(pair)?.line, false)?;
        let mut text = leading_indent(doc, paired.start, paired.end, false);
        text.push('}');

        doc.replace(&text, line_range.start, sel_begin)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Finds the `{` matching an imaginary `}` at `from`, scanning back to `stop`.
fn find_open_brace(doc: &Document, from: usize, stop: usize) -> Option<usize> {
    let mut depth = 1;
    for i in (stop..from).rev() {
        match doc.unit(i) {
            Some(CLOSE_BRACE) => depth += 1,
            Some(OPEN_BRACE) => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Returns the characters that advance from `offset` to the next tab stop.
fn indent_step(doc: &Document, offset: usize) -> CoreResult<String> {
    if !doc.uses_spaces() {
        return Ok("\t".to_string());
    }

    let tab = doc.tab_width().max(1) as usize;
    let head = doc.line_head(doc.line_column(offset)?.line)?;
    let column = (head..offset).fold(0, |col, i| {
        if doc.unit(i) == Some(TAB) {
            (col / tab + 1) * tab
        } else {
            col + 1
        }
    });
    Ok(" ".repeat(tab - column % tab))
}
