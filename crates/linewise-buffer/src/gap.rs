//! Split array with a movable gap.
//!
//! ## Learning: Gap Buffers
//!
//! A gap buffer keeps its elements in one `Vec` with an unused region (the
//! "gap") parked where the last edit happened:
//!
//! ```text
//! [ a b c d _ _ _ _ e f g ]
//!           ^gap_start ^gap_end
//! ```
//!
//! Inserting at the gap is O(1) amortized. Editing somewhere else first
//! moves the gap there, which costs O(distance). Editors touch text in
//! clusters, so the gap rarely travels far.
//!
//! The same container backs the character store and every line-head array,
//! so a burst of typing on one line is cheap on all of them.

use std::fmt;

const INITIAL_GAP: usize = 64;

/// A vector with a movable gap, optimized for clustered edits.
#[derive(Clone)]
pub struct GapVec<T> {
    /// Storage: [pre-gap | gap | post-gap]
    data: Vec<T>,
    gap_start: usize,
    gap_end: usize,
}

impl<T: Copy + Default> GapVec<T> {
    /// Creates an empty gap vector.
    pub fn new() -> Self {
        Self::with_gap(Vec::new())
    }

    /// Creates a gap vector holding `items`, with the gap at the end.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::with_gap(items)
    }

    fn with_gap(mut data: Vec<T>) -> Self {
        let len = data.len();
        data.resize(len + INITIAL_GAP, T::default());
        Self {
            data,
            gap_start: len,
            gap_end: len + INITIAL_GAP,
        }
    }

    /// Returns the number of stored elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() - self.gap_len()
    }

    /// Returns true if nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn gap_len(&self) -> usize {
        self.gap_end - self.gap_start
    }

    #[inline]
    fn physical(&self, index: usize) -> usize {
        if index < self.gap_start {
            index
        } else {
            index + self.gap_len()
        }
    }

    /// Returns the element at `index`, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<T> {
        (index < self.len()).then(|| self.data[self.physical(index)])
    }

    /// Returns a reference to the element at `index`.
    #[inline]
    pub fn get_ref(&self, index: usize) -> Option<&T> {
        (index < self.len()).then(|| &self.data[self.physical(index)])
    }

    /// Overwrites the element at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds, like slice indexing.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        assert!(index < self.len(), "index {index} out of bounds");
        let at = self.physical(index);
        self.data[at] = value;
    }

    /// Moves the gap so that it starts at logical `index`.
    fn move_gap_to(&mut self, index: usize) {
        if index < self.gap_start {
            let shift = self.gap_start - index;
            self.data
                .copy_within(index..self.gap_start, self.gap_end - shift);
            self.gap_start = index;
            self.gap_end -= shift;
        } else if index > self.gap_start {
            let shift = index - self.gap_start;
            self.data
                .copy_within(self.gap_end..self.gap_end + shift, self.gap_start);
            self.gap_start += shift;
            self.gap_end += shift;
        }
    }

    /// Grows the gap in place so it can hold at least `needed` elements.
    fn reserve_gap(&mut self, needed: usize) {
        if self.gap_len() >= needed {
            return;
        }

        let growth = (needed - self.gap_len()).max(self.data.len()).max(INITIAL_GAP);
        let old_len = self.data.len();
        let tail = old_len - self.gap_end;

        let new_len = old_len + growth;
        self.data.resize(new_len, T::default());
        if tail > 0 {
            self.data.copy_within(self.gap_end..old_len, new_len - tail);
        }
        self.gap_end = new_len - tail;
    }

    /// Inserts one element before `index`.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: T) {
        self.insert_slice(index, &[value]);
    }

    /// Inserts `values` before `index`.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn insert_slice(&mut self, index: usize, values: &[T]) {
        assert!(index <= self.len(), "insert index {index} out of bounds");
        if values.is_empty() {
            return;
        }
        self.move_gap_to(index);
        self.reserve_gap(values.len());
        self.data[self.gap_start..self.gap_start + values.len()].copy_from_slice(values);
        self.gap_start += values.len();
    }

    /// Removes the element at `index`.
    ///
    /// # Panics
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) {
        self.remove_range(index, index + 1);
    }

    /// Removes the elements in `begin..end`.
    ///
    /// # Panics
    /// Panics if the range is inverted or past the end.
    pub fn remove_range(&mut self, begin: usize, end: usize) {
        assert!(
            begin <= end && end <= self.len(),
            "remove range {begin}..{end} out of bounds"
        );
        if begin == end {
            return;
        }
        self.move_gap_to(begin);
        self.gap_end += end - begin;
    }

    /// Returns the index of the first element for which `pred` is false,
    /// assuming the sequence is partitioned (binary search).
    pub fn partition_point(&self, mut pred: impl FnMut(T) -> bool) -> usize {
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if pred(self.data[self.physical(mid)]) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Copies `begin..end` into a new vector.
    ///
    /// # Panics
    /// Panics if the range is inverted or past the end.
    pub fn copy_range(&self, begin: usize, end: usize) -> Vec<T> {
        assert!(
            begin <= end && end <= self.len(),
            "copy range {begin}..{end} out of bounds"
        );
        let mut out = Vec::with_capacity(end - begin);
        let pre_end = end.min(self.gap_start);
        if begin < pre_end {
            out.extend_from_slice(&self.data[begin..pre_end]);
        }
        let post_begin = begin.max(self.gap_start);
        if post_begin < end {
            out.extend_from_slice(
                &self.data[post_begin + self.gap_len()..end + self.gap_len()],
            );
        }
        out
    }

    /// Copies every element into a new vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.copy_range(0, self.len())
    }

    /// Iterates over the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.data[..self.gap_start]
            .iter()
            .chain(self.data[self.gap_end..].iter())
            .copied()
    }
}

impl GapVec<usize> {
    /// Adds `delta` to every element from index `from` to the end.
    ///
    /// Used to slide line heads after an edit. Values saturate at zero.
    pub fn shift_from(&mut self, from: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        for index in from..self.len() {
            let at = self.physical(index);
            self.data[at] = self.data[at].saturating_add_signed(delta);
        }
    }
}

impl<T: Copy + Default> Default for GapVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default + fmt::Debug> fmt::Debug for GapVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Copy + Default + PartialEq> PartialEq for GapVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Copy + Default> From<Vec<T>> for GapVec<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}
