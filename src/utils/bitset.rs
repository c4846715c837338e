//! Dense bit sets and boolean matrices.
//!
//! Dominance, dominance frontiers and liveness are all stored as one bit row per
//! instruction. For method-sized streams (tens to low hundreds of instructions) a dense
//! [`BitMatrix`] is both the simplest and the fastest representation.
//!
//! # Example
//!
//! ```rust
//! use tacscope::utils::{BitMatrix, BitSet};
//!
//! let mut set = BitSet::new(100);
//! set.insert(3);
//! set.insert(70);
//! assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 70]);
//!
//! let mut matrix = BitMatrix::new(4, 4);
//! matrix.insert(1, 2);
//! assert!(matrix.contains(1, 2));
//! assert!(!matrix.contains(2, 1));
//! ```

use std::fmt;

const WORD_BITS: usize = u64::BITS as usize;

/// A fixed-capacity set of small integers, stored one bit per element.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    /// Creates an empty set able to hold the elements `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            len: capacity,
        }
    }

    /// Creates a set containing every element `0..capacity`.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self::new(capacity);
        set.fill();
        set
    }

    /// Returns the capacity of this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no element is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Adds `index` to the set. Returns `true` if it was not present before.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.len, "bit index {index} out of bounds");
        let mask = 1u64 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        let added = *word & mask == 0;
        *word |= mask;
        added
    }

    /// Removes `index` from the set.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn remove(&mut self, index: usize) {
        assert!(index < self.len, "bit index {index} out of bounds");
        self.words[index / WORD_BITS] &= !(1u64 << (index % WORD_BITS));
    }

    /// Returns `true` if `index` is in the set. Out-of-range indices are never present.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < self.len && self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    /// Returns the number of elements in the set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Inserts every element `0..len`.
    pub fn fill(&mut self) {
        self.words.fill(u64::MAX);
        let tail = self.len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
    }

    /// In-place union. Returns `true` if `self` changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a | b)
    }

    /// In-place intersection. Returns `true` if `self` changed.
    pub fn intersect_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & b)
    }

    /// In-place difference (`self - other`). Returns `true` if `self` changed.
    pub fn difference_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & !b)
    }

    /// Returns `true` if every element of `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        assert_eq!(self.len, other.len, "bit sets must have same length");
        self.words
            .iter()
            .zip(&other.words)
            .all(|(&a, &b)| a & !b == 0)
    }

    fn combine(&mut self, other: &Self, op: impl Fn(u64, u64) -> u64) -> bool {
        assert_eq!(self.len, other.len, "bit sets must have same length");
        let mut changed = false;
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            let next = op(*a, b);
            changed |= next != *a;
            *a = next;
        }
        changed
    }

    /// Returns an iterator over the elements in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            words: &self.words,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the elements of a [`BitSet`].
pub struct BitSetIter<'a> {
    words: &'a [u64],
    word_idx: usize,
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.word_idx * WORD_BITS + bit);
            }
            self.word_idx += 1;
            self.current = *self.words.get(self.word_idx)?;
        }
    }
}

/// A dense boolean matrix, stored as one [`BitSet`] per row.
#[derive(Clone, PartialEq, Eq)]
pub struct BitMatrix {
    rows: Vec<BitSet>,
    columns: usize,
}

impl BitMatrix {
    /// Creates an all-false matrix.
    #[must_use]
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows: vec![BitSet::new(columns); rows],
            columns,
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.columns
    }

    /// Returns the value at (`row`, `column`). Out-of-range positions read as false.
    #[must_use]
    pub fn contains(&self, row: usize, column: usize) -> bool {
        self.rows.get(row).is_some_and(|r| r.contains(column))
    }

    /// Sets (`row`, `column`) to true. Returns `true` if it was false before.
    pub fn insert(&mut self, row: usize, column: usize) -> bool {
        self.rows[row].insert(column)
    }

    /// Returns a row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of range.
    #[must_use]
    pub fn row(&self, row: usize) -> &BitSet {
        &self.rows[row]
    }

    /// Returns a mutable row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of range.
    pub fn row_mut(&mut self, row: usize) -> &mut BitSet {
        &mut self.rows[row]
    }

    /// Replaces a row. Returns `true` if the row changed.
    pub fn set_row(&mut self, row: usize, value: BitSet) -> bool {
        let changed = self.rows[row] != value;
        self.rows[row] = value;
        changed
    }
}

impl fmt::Debug for BitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.rows.iter().enumerate()).finish()
    }
}
