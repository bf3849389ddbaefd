//! UTF-16 character store.
//!
//! ## Learning: Why UTF-16 Units?
//!
//! Rust strings are UTF-8, but the offsets collaborators exchange with this
//! store (carets, line heads, wrap heads) are UTF-16 code unit counts. Keeping
//! the store in the same unit means every offset is a direct index, and a
//! character outside the Basic Multilingual Plane is simply two units that
//! must stay together.
//!
//! ```rust,ignore
//! let store = CharStore::from("a😀");
//! assert_eq!(store.len(), 3); // 'a' + surrogate pair
//! ```

use std::ops::Index;
use std::path::Path;

use crate::eol::{self, CodeUnits};
use crate::gap::GapVec;
use crate::{BufferError, BufferResult};

/// A random-access sequence of UTF-16 code units kept in a gap buffer.
///
/// The store is faithful: it never normalizes line endings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharStore {
    units: GapVec<u16>,
}

impl CharStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            units: GapVec::new(),
        }
    }

    /// Creates a store from raw code units.
    ///
    /// Unpaired surrogates are kept as they are.
    pub fn from_units(units: Vec<u16>) -> Self {
        Self {
            units: GapVec::from_vec(units),
        }
    }

    /// Reads a UTF-8 file into a new store.
    pub fn from_file(path: impl AsRef<Path>) -> BufferResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from(content.as_str()))
    }

    // ==================== Measurements ====================

    /// Returns the number of code units.
    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the store holds no text.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    // ==================== Text Access ====================

    /// Returns the unit at `index`, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<u16> {
        self.units.get(index)
    }

    /// Copies the units in `begin..end`.
    pub fn range(&self, begin: usize, end: usize) -> BufferResult<Vec<u16>> {
        self.check_range(begin, end)?;
        Ok(self.units.copy_range(begin, end))
    }

    /// Returns `begin..end` as a string.
    ///
    /// A range that cuts through a surrogate pair yields U+FFFD for the
    /// orphaned half.
    pub fn text_range(&self, begin: usize, end: usize) -> BufferResult<String> {
        Ok(String::from_utf16_lossy(&self.range(begin, end)?))
    }

    /// Returns the whole content as a string.
    pub fn text(&self) -> String {
        String::from_utf16_lossy(&self.units.to_vec())
    }

    /// Iterates over every unit.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.units.iter()
    }

    // ==================== Mutations ====================

    /// Inserts `text` before `offset`.
    pub fn insert(&mut self, offset: usize, text: &[u16]) -> BufferResult<()> {
        self.check_range(offset, offset)?;
        self.units.insert_slice(offset, text);
        Ok(())
    }

    /// Removes the units in `begin..end`.
    pub fn delete(&mut self, begin: usize, end: usize) -> BufferResult<()> {
        self.check_range(begin, end)?;
        self.units.remove_range(begin, end);
        Ok(())
    }

    /// Writes the content to `path` as UTF-8 (temporary file, then rename).
    pub fn save_as(&self, path: impl AsRef<Path>) -> BufferResult<()> {
        let path = path.as_ref();
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, self.text().as_bytes())?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }

    // ==================== Validation ====================

    /// Fails with `InvalidRange` unless `begin <= end <= len`.
    pub fn check_range(&self, begin: usize, end: usize) -> BufferResult<()> {
        if begin > end || end > self.len() {
            return Err(BufferError::InvalidRange {
                begin,
                end,
                len: self.len(),
            });
        }
        Ok(())
    }

    /// Returns true unless `offset` is strictly inside a surrogate pair.
    pub fn is_char_boundary(&self, offset: usize) -> bool {
        eol::is_char_boundary(self, offset)
    }
}

impl CodeUnits for CharStore {
    #[inline]
    fn unit_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn unit(&self, index: usize) -> Option<u16> {
        self.get(index)
    }
}

impl Index<usize> for CharStore {
    type Output = u16;

    /// # Panics
    /// Panics if `index` is out of bounds.
    fn index(&self, index: usize) -> &u16 {
        match self.units.get_ref(index) {
            Some(unit) => unit,
            None => panic!("index {index} out of bounds (len {})", self.len()),
        }
    }
}

impl From<&str> for CharStore {
    fn from(s: &str) -> Self {
        Self::from_units(s.encode_utf16().collect())
    }
}

impl From<String> for CharStore {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}
