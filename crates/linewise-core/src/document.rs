//! The edit coordinator.
//!
//! ## Learning: Type Aliases and Newtypes
//!
//! `DocumentId` is a newtype wrapper around `Uuid`. This provides:
//! - Type safety: Can't accidentally use a string as a document ID
//! - Encapsulation: Can change the underlying type without breaking APIs
//! - Documentation: The type name explains its purpose
//!
//! ## Learning: One Writer, Many Readers
//!
//! Every mutation goes through `replace`, which takes `&mut self`. While it
//! runs nobody else can hold a reference to the document, so no query can
//! observe the store and the indices out of step. Notifications are queued
//! on unbounded per-subscriber channels and read after `replace` returns.

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linewise_buffer::{CharStore, DirtyState, LineEnding, LineIndex, Position, is_eol};
use linewise_layout::{LineLayoutStrategy, Measure, WrapIndex};

use crate::config::Config;
use crate::event::{DocumentEvent, EventBus, EventReceiver};
use crate::interceptor::EditInterceptor;
use crate::search::{self, SearchOptions, SearchPattern};
use crate::{CoreError, CoreResult};

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new unique document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A text document with its logical and physical line indices.
///
/// ## Learning: Composition over Inheritance
///
/// The document composes a `CharStore`, a `LineIndex` and a `WrapIndex`
/// instead of layering views on top of each other. The wrap index only
/// needs a strategy and a `Measure`; swapping either is a field assignment
/// plus a relayout.
#[derive(Debug)]
pub struct Document {
    /// Unique identifier
    id: DocumentId,

    /// Text as UTF-16 code units
    store: CharStore,

    /// Logical line heads and dirty states
    lines: LineIndex,

    /// Physical line heads
    wrap: WrapIndex,

    /// Selection: caret is where typing happens, anchor the other end
    caret: usize,
    anchor: usize,

    /// File path (None for untitled documents)
    path: Option<PathBuf>,

    /// Display name
    name: String,

    /// Terminator inserted for typed newlines
    line_ending: LineEnding,

    /// Indent with spaces instead of tabs
    use_spaces: bool,

    /// Compare indices with a full rebuild after each edit
    verify_edits: bool,

    /// Unsaved changes
    modified: bool,

    events: EventBus,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Self {
            id: DocumentId::new(),
            store: CharStore::new(),
            lines: LineIndex::new(),
            wrap: WrapIndex::default(),
            caret: 0,
            anchor: 0,
            path: None,
            name: "Untitled".to_string(),
            line_ending: LineEnding::default(),
            use_spaces: false,
            verify_edits: cfg!(debug_assertions),
            modified: false,
            events: EventBus::new(),
        }
    }

    /// Creates a document holding `text`.
    pub fn from_text(text: &str) -> CoreResult<Self> {
        let mut doc = Self::new();
        doc.load_text(text)?;
        Ok(doc)
    }

    /// Opens a document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let store = CharStore::from_file(path)?;

        let mut doc = Self::new();
        doc.load_store(store)?;
        doc.path = Some(path.to_path_buf());
        doc.name = Self::name_from_path(path);
        tracing::debug!("Opened {} ({} lines)", path.display(), doc.line_count());
        Ok(doc)
    }

    /// Replaces the whole content as a fresh load.
    ///
    /// Every line starts `Clean`, the selection collapses to 0 and the
    /// line ending is detected from the text.
    pub fn load_text(&mut self, text: &str) -> CoreResult<()> {
        self.load_store(CharStore::from(text))
    }

    fn load_store(&mut self, store: CharStore) -> CoreResult<()> {
        let lines = LineIndex::from_text(&store);
        self.wrap.rebuild(&store, &lines)?;
        self.store = store;
        self.lines = lines;
        if let Some(line_ending) = LineEnding::detect(&self.store) {
            self.line_ending = line_ending;
        }
        self.caret = 0;
        self.anchor = 0;
        self.modified = false;
        Ok(())
    }

    fn name_from_path(path: &Path) -> String {
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
            .to_string()
    }

    // ==================== Settings ====================

    /// Applies tab width, layout strategy, measure and editing options,
    /// then lays out every line once.
    pub fn apply_config(&mut self, config: &Config) -> CoreResult<()> {
        self.relayout(
            config.layout_strategy(),
            config.document.tab_width,
            Some(config.measure()),
        )?;
        self.use_spaces = config.document.use_spaces;
        self.verify_edits = config.document.verify_edits;
        if LineEnding::detect(&self.store).is_none() {
            self.line_ending = config.document.line_ending;
        }
        Ok(())
    }

    /// Sets the wrap width in pixels; 0 disables wrapping.
    pub fn set_wrap_width(&mut self, width: u32) -> CoreResult<()> {
        self.set_layout_strategy(LineLayoutStrategy::from_width(width))
    }

    pub fn set_layout_strategy(&mut self, strategy: LineLayoutStrategy) -> CoreResult<()> {
        self.relayout(strategy, self.wrap.tab_width(), None)
    }

    /// Sets the tab width in columns.
    pub fn set_tab_width(&mut self, tab_width: u32) -> CoreResult<()> {
        self.relayout(self.wrap.strategy(), tab_width, None)
    }

    /// Replaces the text measurer (for example after a font change).
    ///
    /// A measurer that fails on the current text is not installed.
    pub fn set_measure(&mut self, measure: Box<dyn Measure>) -> CoreResult<()> {
        self.relayout(self.wrap.strategy(), self.wrap.tab_width(), Some(measure))
    }

    fn relayout(
        &mut self,
        strategy: LineLayoutStrategy,
        tab_width: u32,
        measure: Option<Box<dyn Measure>>,
    ) -> CoreResult<()> {
        self.wrap
            .reconfigure(&self.store, &self.lines, strategy, tab_width, measure)?;
        self.events.emit(DocumentEvent::LayoutChanged(self.id));
        Ok(())
    }

    pub fn layout_strategy(&self) -> LineLayoutStrategy {
        self.wrap.strategy()
    }

    pub fn tab_width(&self) -> u32 {
        self.wrap.tab_width()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        self.line_ending = line_ending;
    }

    pub fn uses_spaces(&self) -> bool {
        self.use_spaces
    }

    pub fn set_use_spaces(&mut self, use_spaces: bool) {
        self.use_spaces = use_spaces;
    }

    pub fn set_verify_edits(&mut self, verify_edits: bool) {
        self.verify_edits = verify_edits;
    }

    // ==================== Getters ====================

    /// Returns the document ID.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Returns the file path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the document has unsaved changes.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Returns the length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns the code unit at `index`.
    pub fn unit(&self, index: usize) -> Option<u16> {
        self.store.get(index)
    }

    /// Returns all text.
    pub fn text(&self) -> String {
        self.store.text()
    }

    /// Returns the text in `begin..end`.
    pub fn text_range(&self, begin: usize, end: usize) -> CoreResult<String> {
        self.check_range(begin, end)?;
        Ok(self.store.text_range(begin, end)?)
    }

    /// Subscribes to this document's events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Routes this document's events into a shared bus.
    pub fn set_event_bus(&mut self, events: EventBus) {
        self.events = events;
    }

    // ==================== Line Queries ====================

    /// Returns the number of logical lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the number of physical (wrapped) lines.
    pub fn wrap_line_count(&self) -> usize {
        self.wrap.len()
    }

    /// Returns the offset where logical `line` begins.
    pub fn line_head(&self, line: usize) -> CoreResult<usize> {
        self.lines
            .head(line)
            .ok_or_else(|| line_out_of_bounds(line, self.line_count()))
    }

    /// Returns the offset where physical `line` begins.
    pub fn wrap_line_head(&self, line: usize) -> CoreResult<usize> {
        self.wrap
            .head(line)
            .ok_or_else(|| line_out_of_bounds(line, self.wrap_line_count()))
    }

    /// Returns every logical line head.
    pub fn line_heads(&self) -> Vec<usize> {
        self.lines.heads().to_vec()
    }

    /// Returns every physical line head.
    pub fn wrap_line_heads(&self) -> Vec<usize> {
        self.wrap.heads().to_vec()
    }

    /// Converts an offset to a logical line/column.
    pub fn line_column(&self, offset: usize) -> CoreResult<Position> {
        self.check_offset(offset)?;
        Ok(self.lines.line_column(offset))
    }

    /// Converts a logical line/column to an offset.
    pub fn offset_at(&self, pos: Position) -> CoreResult<usize> {
        Ok(self.lines.offset_at(pos, self.len())?)
    }

    /// Converts an offset to a physical line/column.
    pub fn wrap_line_column(&self, offset: usize) -> CoreResult<Position> {
        self.check_offset(offset)?;
        Ok(self.wrap.line_column(offset))
    }

    /// Converts a physical line/column to an offset.
    pub fn wrap_offset_at(&self, pos: Position) -> CoreResult<usize> {
        Ok(self.wrap.offset_at(pos, self.len())?)
    }

    /// Returns the range of logical `line`, with or without its terminator.
    pub fn line_range(&self, line: usize, include_eol: bool) -> CoreResult<Range<usize>> {
        Ok(self.lines.line_range(&self.store, line, include_eol)?)
    }

    /// Returns the range of physical `line`.
    pub fn wrap_line_range(&self, line: usize) -> CoreResult<Range<usize>> {
        Ok(self.wrap.line_range(line, self.len())?)
    }

    // ==================== Dirty State ====================

    pub fn dirty_state(&self, line: usize) -> CoreResult<DirtyState> {
        self.lines
            .dirty_state(line)
            .ok_or_else(|| line_out_of_bounds(line, self.line_count()))
    }

    /// Marks a modified line as acknowledged.
    pub fn clear_dirty(&mut self, line: usize) -> CoreResult<()> {
        Ok(self.lines.clear_dirty(line)?)
    }

    pub fn clear_all_dirty(&mut self) {
        self.lines.clear_all_dirty();
    }

    // ==================== Selection ====================

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// Returns the selection as an ordered range.
    pub fn selection_range(&self) -> Range<usize> {
        self.anchor.min(self.caret)..self.anchor.max(self.caret)
    }

    /// Sets anchor and caret.
    pub fn set_selection(&mut self, anchor: usize, caret: usize) -> CoreResult<()> {
        self.check_range(anchor.min(caret), anchor.max(caret))?;
        self.anchor = anchor;
        self.caret = caret;
        self.events.emit(DocumentEvent::SelectionChanged {
            document: self.id,
            anchor,
            caret,
        });
        Ok(())
    }

    /// Moves selection ends that lie at or after an edit.
    fn track(pos: usize, begin: usize, end: usize, new_len: usize) -> usize {
        if pos >= end {
            pos - (end - begin) + new_len
        } else if pos >= begin {
            begin + new_len
        } else {
            pos
        }
    }

    // ==================== Text Editing ====================

    /// Replaces `begin..end` with `new_text`.
    ///
    /// The range is checked before anything changes. On success both
    /// indices describe the new text and exactly one `ContentChanged` has
    /// been queued.
    pub fn replace(&mut self, new_text: &str, begin: usize, end: usize) -> CoreResult<()> {
        self.check_range(begin, end)?;

        let units: Vec<u16> = new_text.encode_utf16().collect();
        let old_units = self.store.range(begin, end)?;
        let old_text = String::from_utf16_lossy(&old_units);

        if begin < end || !units.is_empty() {
            // lines whose dirty state the splice may touch
            let first_line = self.lines.line_of(begin).saturating_sub(1);
            let saved_dirty = self
                .lines
                .dirty_states(first_line..self.lines.line_of(end) + 1);

            self.splice(begin, end, &units)?;
            if let Err(err) =
                self.wrap
                    .on_replace(&self.store, &self.lines, begin, end - begin, units.len())
            {
                // the wrap heads were left untouched; put the text back under them
                tracing::error!("Wrap index update failed at {}: {}", begin, err);
                self.splice(begin, begin + units.len(), &old_units)?;
                self.lines.restore_dirty_states(first_line, &saved_dirty);
                return Err(err.into());
            }

            self.caret = Self::track(self.caret, begin, end, units.len());
            self.anchor = Self::track(self.anchor, begin, end, units.len());
            self.modified = true;
        }

        if self.verify_edits {
            self.verify()?;
        }

        tracing::debug!(
            "Replaced {}..{} with {} units ({} lines, {} physical)",
            begin,
            end,
            units.len(),
            self.line_count(),
            self.wrap_line_count()
        );
        self.events.emit(DocumentEvent::ContentChanged {
            document: self.id,
            index: begin,
            old_text,
            new_text: new_text.to_string(),
        });
        Ok(())
    }

    /// Replaces `begin..end` in the store and the logical index.
    fn splice(&mut self, begin: usize, end: usize, units: &[u16]) -> CoreResult<()> {
        if begin < end {
            self.lines.on_delete(&self.store, begin, end);
            self.store.delete(begin, end)?;
        }
        if !units.is_empty() {
            self.lines.on_insert(&self.store, units, begin);
            self.store.insert(begin, units)?;
        }
        Ok(())
    }

    /// Inserts `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> CoreResult<()> {
        self.replace(text, offset, offset)
    }

    /// Deletes `range`.
    pub fn delete(&mut self, range: Range<usize>) -> CoreResult<()> {
        self.replace("", range.start, range.end)
    }

    /// Replaces the selection and collapses it after the new text.
    pub fn replace_selection(&mut self, text: &str) -> CoreResult<()> {
        let range = self.selection_range();
        self.replace(text, range.start, range.end)?;
        let caret = range.start + text.encode_utf16().count();
        self.anchor = caret;
        self.caret = caret;
        Ok(())
    }

    /// Handles one typed character.
    ///
    /// The interceptor gets the first chance; otherwise the character
    /// replaces the selection, with CR and LF typed as the document's
    /// line ending.
    pub fn type_char(
        &mut self,
        ch: char,
        interceptor: Option<&dyn EditInterceptor>,
    ) -> CoreResult<()> {
        if let Some(interceptor) = interceptor {
            if interceptor.try_handle(self, ch)? {
                return Ok(());
            }
        }
        if u16::try_from(u32::from(ch)).is_ok_and(is_eol) {
            self.replace_selection(self.line_ending.as_str())
        } else {
            self.replace_selection(ch.encode_utf8(&mut [0; 4]))
        }
    }

    // ==================== Search ====================

    /// Finds the first match of `pattern` starting at or after `from`.
    pub fn find_next(&self, pattern: &str, from: usize) -> Option<Range<usize>> {
        let pattern: Vec<u16> = pattern.encode_utf16().collect();
        search::find_next(&self.store, &pattern, from)
    }

    /// Finds the last match of `pattern` ending at or before `from`.
    pub fn find_prev(&self, pattern: &str, from: usize) -> Option<Range<usize>> {
        let pattern: Vec<u16> = pattern.encode_utf16().collect();
        search::find_prev(&self.store, &pattern, from)
    }

    /// Finds every non-overlapping match of `pattern`.
    pub fn find_all(&self, pattern: &str) -> Vec<Range<usize>> {
        let pattern: Vec<u16> = pattern.encode_utf16().collect();
        search::find_all(&self.store, &pattern)
    }

    /// Finds the first match of `query` at or after `from`.
    pub fn search_next(
        &self,
        query: &str,
        from: usize,
        options: SearchOptions,
    ) -> CoreResult<Option<Range<usize>>> {
        Ok(SearchPattern::new(query, options)?.find_next(&self.store, from))
    }

    /// Finds the latest match of `query` ending at or before `from`.
    pub fn search_prev(
        &self,
        query: &str,
        from: usize,
        options: SearchOptions,
    ) -> CoreResult<Option<Range<usize>>> {
        Ok(SearchPattern::new(query, options)?.find_prev(&self.store, from))
    }

    /// Finds every non-overlapping match of `query`.
    pub fn search_all(&self, query: &str, options: SearchOptions) -> CoreResult<Vec<Range<usize>>> {
        Ok(SearchPattern::new(query, options)?.find_all(&self.store))
    }

    // ==================== File Operations ====================

    /// Saves the document to its path.
    pub fn save(&mut self) -> CoreResult<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| CoreError::InvalidOperation("Document has no file path".to_string()))?;
        self.write_to(path)
    }

    /// Saves the document to a new path.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref().to_path_buf();
        self.name = Self::name_from_path(&path);
        self.path = Some(path.clone());
        self.write_to(path)
    }

    fn write_to(&mut self, path: PathBuf) -> CoreResult<()> {
        self.store.save_as(&path)?;
        self.modified = false;
        self.lines.clear_all_dirty();
        tracing::debug!("Saved {}", path.display());
        self.events.emit(DocumentEvent::Saved {
            document: self.id,
            path,
        });
        Ok(())
    }

    // ==================== Validation ====================

    fn check_range(&self, begin: usize, end: usize) -> CoreResult<()> {
        let len = self.len();
        if begin > end
            || end > len
            || !self.store.is_char_boundary(begin)
            || !self.store.is_char_boundary(end)
        {
            return Err(CoreError::InvalidRange { begin, end, len });
        }
        Ok(())
    }

    fn check_offset(&self, offset: usize) -> CoreResult<()> {
        if offset > self.len() {
            return Err(CoreError::InvalidRange {
                begin: offset,
                end: offset,
                len: self.len(),
            });
        }
        Ok(())
    }

    /// Compares both indices with a full rebuild.
    pub fn verify(&self) -> CoreResult<()> {
        let result = self
            .lines
            .verify(&self.store)
            .map_err(|e| e.to_string())
            .and_then(|()| {
                self.wrap
                    .verify(&self.store, &self.lines)
                    .map_err(|e| e.to_string())
            });
        if let Err(detail) = result {
            tracing::error!("Index verification failed: {}", detail);
            return Err(CoreError::InconsistentIndex(detail));
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn line_out_of_bounds(line: usize, count: usize) -> CoreError {
    CoreError::Buffer(linewise_buffer::BufferError::LineOutOfBounds { line, count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use linewise_layout::{CellMetrics, GlyphMeasure, LayoutError, Measure, Measurement};

    fn cells(width: u32) -> Document {
        let mut doc = Document::new();
        doc.set_measure(Box::new(GlyphMeasure::new(CellMetrics::new(1))))
            .unwrap();
        doc.set_tab_width(4).unwrap();
        doc.set_wrap_width(width).unwrap();
        doc.set_verify_edits(true);
        doc
    }

    fn drain(rx: &mut EventReceiver) -> Vec<DocumentEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_document_creation() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.wrap_line_count(), 1);
        assert_eq!(doc.name(), "Untitled");
        assert!(!doc.is_modified());
    }

    #[test]
    fn test_insert_completes_lone_cr() {
        let mut doc = Document::from_text("a\rb").unwrap();
        doc.insert(2, "\n").unwrap();
        assert_eq!(doc.text(), "a\r\nb");
        assert_eq!(doc.line_heads(), vec![0, 3]);
        assert_eq!(doc.wrap_line_heads(), vec![0, 3]);
    }

    #[test]
    fn test_delete_cr_of_crlf() {
        let mut doc = Document::from_text("a\r\nb").unwrap();
        doc.delete(1..2).unwrap();
        assert_eq!(doc.text(), "a\nb");
        assert_eq!(doc.line_heads(), vec![0, 2]);
    }

    #[test]
    fn test_wrap_scenario() {
        let mut doc = cells(3);
        doc.load_text("abcdef").unwrap();
        assert_eq!(doc.wrap_line_heads(), vec![0, 3]);

        doc.insert(1, "X").unwrap();
        assert_eq!(doc.wrap_line_heads(), vec![0, 3, 6]);
        assert!(doc.verify().is_ok());
    }

    #[test]
    fn test_invalid_range_leaves_document_untouched() {
        let mut doc = Document::from_text("a😀b").unwrap();
        let mut rx = doc.subscribe();

        for (begin, end) in [(3, 1), (0, 9), (2, 2), (0, 2)] {
            assert!(matches!(
                doc.replace("x", begin, end),
                Err(CoreError::InvalidRange { .. })
            ));
        }
        assert_eq!(doc.text(), "a😀b");
        assert!(!doc.is_modified());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_content_changed_is_emitted_once() {
        let mut doc = Document::from_text("hello world").unwrap();
        let mut rx = doc.subscribe();

        doc.replace("there", 6, 11).unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![DocumentEvent::ContentChanged {
                document: doc.id(),
                index: 6,
                old_text: "world".to_string(),
                new_text: "there".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_replace_still_notifies() {
        let mut doc = Document::from_text("abc").unwrap();
        let mut rx = doc.subscribe();
        doc.replace("", 1, 1).unwrap();
        assert_eq!(drain(&mut rx).len(), 1);
        assert!(!doc.is_modified());
    }

    #[test]
    fn test_selection_tracks_edits() {
        let mut doc = Document::from_text("0123456789").unwrap();
        doc.set_selection(2, 8).unwrap();

        doc.insert(0, "ab").unwrap();
        assert_eq!(doc.selection_range(), 4..10);

        // caret inside the deleted range lands on its start
        doc.delete(6..11).unwrap();
        assert_eq!(doc.text(), "ab01239");
        assert_eq!((doc.anchor(), doc.caret()), (4, 6));

        // edits after the selection leave it alone
        doc.insert(7, "zz").unwrap();
        assert_eq!(doc.text(), "ab01239zz");
        assert_eq!(doc.selection_range(), 4..6);

        // an insert right at the caret pushes it along
        doc.insert(6, "y").unwrap();
        assert_eq!(doc.selection_range(), 4..7);
        assert!(doc.insert(11, "!").is_err());
    }

    #[test]
    fn test_newline_at_end_adds_physical_line() {
        for width in [0, 80] {
            let mut doc = Document::from_text("a").unwrap();
            doc.set_verify_edits(true);
            doc.set_wrap_width(width).unwrap();

            doc.insert(1, "\n").unwrap();
            assert_eq!(doc.line_heads(), vec![0, 2]);
            assert_eq!(doc.wrap_line_heads(), vec![0, 2]);
            assert_eq!(doc.wrap_line_column(2).unwrap(), Position::new(1, 0));
        }
    }

    /// Always takes a single unit, even half of a surrogate pair.
    struct OneUnit;

    impl Measure for OneUnit {
        fn measure(&self, run: &[u16], x: u32, _limit: u32, _tab: u32) -> Measurement {
            Measurement {
                end_x: x + 1,
                consumed: run.len().min(1),
            }
        }
    }

    #[test]
    fn test_failed_layout_rolls_back_replace() {
        let mut doc = Document::from_text("ab").unwrap();
        doc.set_verify_edits(true);
        doc.set_measure(Box::new(OneUnit)).unwrap();
        doc.set_wrap_width(1).unwrap();
        doc.set_selection(1, 2).unwrap();
        let mut rx = doc.subscribe();

        let result = doc.insert(1, "😀");
        assert!(matches!(
            result,
            Err(CoreError::Layout(LayoutError::SplitUnit { .. }))
        ));

        assert_eq!(doc.text(), "ab");
        assert_eq!(doc.line_heads(), vec![0]);
        assert_eq!(doc.wrap_line_heads(), vec![0, 1]);
        assert_eq!(doc.dirty_state(0).unwrap(), DirtyState::Clean);
        assert_eq!((doc.anchor(), doc.caret()), (1, 2));
        assert!(!doc.is_modified());
        assert!(drain(&mut rx).is_empty());
        assert!(doc.verify().is_ok());

        // the document stays usable
        doc.insert(2, "c").unwrap();
        assert_eq!(doc.wrap_line_heads(), vec![0, 1, 2]);
    }

    #[test]
    fn test_rejected_measure_keeps_previous_one() {
        let mut doc = cells(1);
        doc.load_text("a😀b").unwrap();
        assert_eq!(doc.wrap_line_heads(), vec![0, 1, 3]);
        let mut rx = doc.subscribe();

        assert!(doc.set_measure(Box::new(OneUnit)).is_err());
        assert_eq!(doc.wrap_line_heads(), vec![0, 1, 3]);
        assert!(drain(&mut rx).is_empty());

        doc.insert(4, "c").unwrap();
        assert_eq!(doc.wrap_line_heads(), vec![0, 1, 3, 4]);
        assert!(doc.verify().is_ok());
    }

    #[test]
    fn test_every_edit_reaches_a_late_subscriber() {
        let mut doc = Document::from_text("").unwrap();
        doc.set_verify_edits(false);
        let mut rx = doc.subscribe();

        for i in 0..300 {
            doc.insert(i, "x").unwrap();
        }

        let indices: Vec<usize> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                DocumentEvent::ContentChanged { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, (0..300).collect::<Vec<_>>());
    }

    #[test]
    fn test_replace_selection_collapses_after_text() {
        let mut doc = Document::from_text("one two three").unwrap();
        doc.set_selection(4, 7).unwrap();
        doc.replace_selection("2").unwrap();
        assert_eq!(doc.text(), "one 2 three");
        assert_eq!(doc.selection_range(), 5..5);
    }

    #[test]
    fn test_type_char_uses_line_ending() {
        let mut doc = Document::from_text("ab\r\ncd").unwrap();
        assert_eq!(doc.line_ending(), LineEnding::CrLf);
        doc.set_selection(1, 1).unwrap();
        doc.type_char('\n', None).unwrap();
        assert_eq!(doc.text(), "a\r\nb\r\ncd");
        assert_eq!(doc.caret(), 3);
        doc.type_char('é', None).unwrap();
        assert_eq!(doc.text(), "a\r\néb\r\ncd");
    }

    #[test]
    fn test_line_queries() {
        let doc = Document::from_text("ab\r\ncd\nef").unwrap();
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line_head(1).unwrap(), 4);
        assert_eq!(doc.line_column(5).unwrap(), Position::new(1, 1));
        assert_eq!(doc.offset_at(Position::new(2, 1)).unwrap(), 8);
        assert_eq!(doc.line_range(0, false).unwrap(), 0..2);
        assert_eq!(doc.line_range(0, true).unwrap(), 0..4);
        assert!(doc.line_head(3).is_err());
        assert!(doc.line_column(10).is_err());
    }

    #[test]
    fn test_wrap_queries() {
        let mut doc = cells(4);
        doc.load_text("abcdefghij\nxy").unwrap();
        assert_eq!(doc.wrap_line_heads(), vec![0, 4, 8, 11]);
        assert_eq!(doc.wrap_line_column(9).unwrap(), Position::new(2, 1));
        assert_eq!(doc.wrap_offset_at(Position::new(1, 3)).unwrap(), 7);
        assert_eq!(doc.wrap_line_range(2).unwrap(), 8..11);
        assert_eq!(doc.wrap_line_head(3).unwrap(), 11);
    }

    #[test]
    fn test_dirty_states_follow_edits() {
        let mut doc = Document::from_text("one\ntwo\nthree").unwrap();
        assert_eq!(doc.dirty_state(1).unwrap(), DirtyState::Clean);

        doc.insert(5, "w").unwrap();
        assert_eq!(doc.dirty_state(1).unwrap(), DirtyState::Dirty);
        assert_eq!(doc.dirty_state(2).unwrap(), DirtyState::Clean);

        doc.clear_dirty(1).unwrap();
        assert_eq!(doc.dirty_state(1).unwrap(), DirtyState::Cleaned);
    }

    #[test]
    fn test_relayout_on_settings_change() {
        let mut doc = cells(0);
        doc.load_text("a\tb\tc").unwrap();
        let mut rx = doc.subscribe();
        assert_eq!(doc.wrap_line_count(), 1);

        doc.set_wrap_width(4).unwrap();
        assert_eq!(doc.wrap_line_heads(), vec![0, 2, 4]);
        doc.set_tab_width(2).unwrap();
        assert_eq!(doc.wrap_line_heads(), vec![0, 4]);

        assert_eq!(
            drain(&mut rx),
            vec![
                DocumentEvent::LayoutChanged(doc.id()),
                DocumentEvent::LayoutChanged(doc.id())
            ]
        );
    }

    #[test]
    fn test_apply_config() {
        let mut config = Config::default();
        config.document.wrap_width = 3;
        config.view.cell_px = 1;
        config.view.eol_px = 1;
        let mut doc = Document::from_text("abcdef").unwrap();
        doc.apply_config(&config).unwrap();
        assert_eq!(doc.layout_strategy(), LineLayoutStrategy::WrapAtWidth(3));
        assert_eq!(doc.wrap_line_heads(), vec![0, 3]);
    }

    #[test]
    fn test_search() {
        let doc = Document::from_text("abcabc😀abc").unwrap();
        assert_eq!(doc.find_next("abc", 1), Some(3..6));
        assert_eq!(doc.find_prev("abc", 6), Some(3..6));
        assert_eq!(doc.find_all("abc"), vec![0..3, 3..6, 8..11]);
    }

    #[test]
    fn test_search_with_options() {
        let doc = Document::from_text("Alpha\r\nalpha😀ALPHA").unwrap();
        let ignore_case = SearchOptions::default();

        assert_eq!(
            doc.search_all("alpha", ignore_case).unwrap(),
            vec![0..5, 7..12, 14..19]
        );
        assert_eq!(
            doc.search_all("alpha", SearchOptions::exact()).unwrap(),
            vec![7..12]
        );
        assert_eq!(doc.search_next("ALPHA", 1, ignore_case).unwrap(), Some(7..12));
        assert_eq!(doc.search_prev("alpha", 14, ignore_case).unwrap(), Some(7..12));
        assert_eq!(
            doc.search_all(r"^a\w+", SearchOptions::regex(false)).unwrap(),
            vec![0..5, 7..12]
        );
        assert_eq!(
            doc.search_all(r"\w+$", SearchOptions::regex(true)).unwrap(),
            vec![14..19]
        );
        assert!(matches!(
            doc.search_all("[", SearchOptions::regex(true)),
            Err(CoreError::Search(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");

        let mut doc = Document::from_text("x\r\ny").unwrap();
        assert!(doc.save().is_err());
        doc.insert(0, "w").unwrap();
        let mut rx = doc.subscribe();
        doc.save_as(&path).unwrap();

        assert!(!doc.is_modified());
        assert_eq!(doc.name(), "doc.txt");
        assert_eq!(doc.dirty_state(0).unwrap(), DirtyState::Cleaned);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [DocumentEvent::Saved { .. }]
        ));

        let reopened = Document::from_file(&path).unwrap();
        assert_eq!(reopened.text(), "wx\r\ny");
        assert_eq!(reopened.dirty_state(0).unwrap(), DirtyState::Clean);
        assert_eq!(reopened.path(), Some(path.as_path()));
    }

    mod proptests {
        use super::*;
        use linewise_buffer::{heads, is_char_boundary, is_inside_crlf};
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Edit {
            Insert(prop::sample::Index, String),
            Delete(prop::sample::Index, usize),
            Replace(prop::sample::Index, usize, String),
        }

        fn text() -> impl Strategy<Value = String> {
            prop::collection::vec(
                prop_oneof![
                    4 => Just("a"),
                    2 => Just("xyz"),
                    1 => Just(" "),
                    1 => Just("\t"),
                    1 => Just("漢"),
                    1 => Just("😀"),
                    1 => Just("\r"),
                    1 => Just("\n"),
                    1 => Just("\r\n"),
                ],
                0..10,
            )
            .prop_map(|v| v.concat())
        }

        fn edit() -> impl Strategy<Value = Edit> {
            prop_oneof![
                (any::<prop::sample::Index>(), text()).prop_map(|(i, t)| Edit::Insert(i, t)),
                (any::<prop::sample::Index>(), 0usize..6).prop_map(|(i, n)| Edit::Delete(i, n)),
                (any::<prop::sample::Index>(), 0usize..6, text())
                    .prop_map(|(i, n, t)| Edit::Replace(i, n, t)),
            ]
        }

        fn boundary(doc: &Document, offset: usize) -> usize {
            let offset = offset.min(doc.len());
            if doc.store.is_char_boundary(offset) {
                offset
            } else {
                offset - 1
            }
        }

        /// Applies `edit` and returns the replaced range and the new text.
        fn apply<'a>(doc: &mut Document, edit: &'a Edit) -> (usize, usize, &'a str) {
            let (begin, len, text) = match edit {
                Edit::Insert(i, t) => (i.index(doc.len() + 1), 0, t.as_str()),
                Edit::Delete(i, n) => (i.index(doc.len() + 1), *n, ""),
                Edit::Replace(i, n, t) => (i.index(doc.len() + 1), *n, t.as_str()),
            };
            let begin = boundary(doc, begin);
            let end = boundary(doc, begin + len).max(begin);
            doc.replace(text, begin, end).unwrap();
            (begin, end, text)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn indices_match_full_rebuild(
                width in 0u32..10,
                initial in text(),
                edits in prop::collection::vec(edit(), 1..16),
            ) {
                let mut doc = cells(width);
                doc.set_verify_edits(false);
                doc.load_text(&initial).unwrap();
                let mut shadow: Vec<u16> = initial.encode_utf16().collect();

                for edit in &edits {
                    let (begin, end, text) = apply(&mut doc, edit);
                    shadow.splice(begin..end, text.encode_utf16());

                    prop_assert!(doc.verify().is_ok(), "{:?}", doc.verify());
                    prop_assert_eq!(doc.store.iter().collect::<Vec<_>>(), shadow.clone());
                }
            }

            #[test]
            fn offsets_round_trip(
                width in 1u32..10,
                initial in text(),
                edits in prop::collection::vec(edit(), 0..6),
            ) {
                let mut doc = cells(width);
                doc.load_text(&initial).unwrap();
                for edit in &edits {
                    apply(&mut doc, edit);
                }

                for offset in 0..=doc.len() {
                    let pos = doc.line_column(offset).unwrap();
                    prop_assert_eq!(doc.offset_at(pos).unwrap(), offset);
                    let pos = doc.wrap_line_column(offset).unwrap();
                    prop_assert_eq!(doc.wrap_offset_at(pos).unwrap(), offset);
                }
            }

            #[test]
            fn heads_are_sorted_and_never_split_units(
                width in 1u32..10,
                initial in text(),
                edits in prop::collection::vec(edit(), 0..10),
            ) {
                let mut doc = cells(width);
                doc.load_text(&initial).unwrap();
                for edit in &edits {
                    apply(&mut doc, edit);
                }

                for line_heads in [doc.line_heads(), doc.wrap_line_heads()] {
                    prop_assert_eq!(line_heads[0], 0);
                    prop_assert!(line_heads.windows(2).all(|w| w[0] < w[1]));
                    for &head in &line_heads {
                        prop_assert!(is_char_boundary(&doc.store, head));
                        prop_assert!(!is_inside_crlf(&doc.store, head));
                    }
                }
                // every logical head is also a physical head
                let wrap = doc.wrap.heads();
                for head in doc.line_heads() {
                    let line = heads::line_of(wrap, head);
                    prop_assert_eq!(wrap.get(line), Some(head));
                }
            }
        }
    }
}
