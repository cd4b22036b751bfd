//! Persistent (immutable) indexed sequence.
//!
//! This module provides [`PersistentSequence`], an immutable random-access
//! sequence that shares structure between versions.
//!
//! # Overview
//!
//! `PersistentSequence` is a 32-way branching trie in the style of Clojure's
//! `PersistentVector`. It provides:
//!
//! - O(log32 N) random access and update
//! - O(1) amortized `push`, O(32 * depth) when the tail is flushed
//! - `append` with two strategies picked by the size of the appendix
//! - `slice_right` that keeps every untouched subtree, and `slice_left`
//!   that rebuilds from shared leaves
//! - O(1) `len`, `is_empty` and `clone`
//!
//! # Internal Structure
//!
//! The sequence consists of:
//! - A root tree of depth `depth >= 1`, leaves sitting at depth 0
//! - A tail buffer holding the last `len % 32` elements
//!
//! Elements below `tail_index = (len / 32) * 32` live in the trie, the
//! remainder in the tail.
//!
//! # Examples
//!
//! ```rust
//! use persistent_sequence::persistent::PersistentSequence;
//!
//! let sequence = PersistentSequence::new().push(1).push(2).push(3);
//! assert_eq!(sequence.get(1), Some(&2));
//!
//! let extended = sequence.push(4);
//! assert_eq!(sequence.len(), 3);     // Original unchanged
//! assert_eq!(extended.len(), 4);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use super::builder::Builder;
use super::cell::ArrayCell;
use super::error::StructureError;
use super::initializer::ElementInitializer;
use super::list::LeafList;
use super::node::{Leaf, Node, NodeIterator, Tree};
use super::{BITS_PER_LEVEL, BRANCHING_FACTOR, depth_for};

/// Largest appendix merged leaf by leaf into the receiver's tail.
///
/// Anything longer is concatenated by rebuilding the trie from leaves.
const APPEND_MERGE_LIMIT: usize = 4 * BRANCHING_FACTOR;

/// Maps a possibly negative index onto `[0, length]`.
///
/// Negative indices count back from `length`; anything past either end is
/// clamped. This is how the slicing operations read their bounds.
///
/// # Examples
///
/// ```rust
/// use persistent_sequence::persistent::translate_index;
///
/// assert_eq!(translate_index(3, 10), 3);
/// assert_eq!(translate_index(-3, 10), 7);
/// assert_eq!(translate_index(-30, 10), 0);
/// assert_eq!(translate_index(30, 10), 10);
/// ```
#[must_use]
pub const fn translate_index(index: isize, length: usize) -> usize {
    if index < 0 {
        length.saturating_sub(index.unsigned_abs())
    } else {
        let index = index.unsigned_abs();
        if index > length { length } else { index }
    }
}

// =============================================================================
// PersistentSequence Definition
// =============================================================================

/// A persistent (immutable) indexed sequence.
///
/// Every operation returns a new sequence and leaves the receiver valid and
/// unchanged; unmodified subtrees are shared by reference.
///
/// # Time Complexity
///
/// | Operation     | Complexity                            |
/// |---------------|---------------------------------------|
/// | `new`         | O(1)                                  |
/// | `get`         | O(log32 N)                            |
/// | `set`         | O(log32 N)                            |
/// | `push`        | O(1) amortized                        |
/// | `append`      | O(M) for an appendix of M elements, O(N + M) past 128 |
/// | `slice_right` | O(log32 N)                            |
/// | `slice_left`  | O(N / 32) to rebuild                  |
/// | `len`         | O(1)                                  |
///
/// # Examples
///
/// ```rust
/// use persistent_sequence::persistent::PersistentSequence;
///
/// let sequence: PersistentSequence<i32> = (0..100).collect();
/// assert_eq!(sequence.len(), 100);
/// assert_eq!(sequence.get(50), Some(&50));
/// assert_eq!(sequence.get(100), None);
/// ```
pub struct PersistentSequence<T> {
    /// Total number of elements
    length: usize,
    /// Number of trie levels above the leaves
    depth: usize,
    /// Root of the trie holding every element below `tail_index`
    root: Tree<T>,
    /// Trailing elements not yet forming a full leaf
    tail: ArrayCell<T>,
}

impl<T> PersistentSequence<T> {
    /// Creates a new empty sequence.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence: PersistentSequence<i32> = PersistentSequence::new();
    /// assert!(sequence.is_empty());
    /// assert_eq!(sequence.depth(), 1);
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(0, 1, Tree::empty(), ArrayCell::new())
    }

    /// Alias of [`new`](Self::new).
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::new()
    }

    pub(crate) const fn from_parts(
        length: usize,
        depth: usize,
        root: Tree<T>,
        tail: ArrayCell<T>,
    ) -> Self {
        Self {
            length,
            depth,
            root,
            tail,
        }
    }

    /// Creates a sequence of `length` elements produced by `initializer`.
    ///
    /// The initializer is asked for every index in `0..length`, once each,
    /// in ascending order. A `length` of zero or less gives an empty
    /// sequence.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence = PersistentSequence::initialize(6, |index: usize| index * 10);
    /// assert_eq!(sequence.to_vec(), vec![0, 10, 20, 30, 40, 50]);
    ///
    /// let empty = PersistentSequence::initialize(-4, |index: usize| index);
    /// assert!(empty.is_empty());
    /// ```
    #[must_use]
    pub fn initialize<I>(length: isize, mut initializer: I) -> Self
    where
        I: ElementInitializer<T>,
    {
        if length <= 0 {
            return Self::new();
        }
        (0..length.unsigned_abs())
            .fold(Builder::new(), |builder, index| {
                builder.push(initializer.initialize(index))
            })
            .to_sequence()
    }

    /// Creates a sequence from a fallible initializer.
    ///
    /// Stops at the first failing index.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `initializer`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let parsed = PersistentSequence::try_initialize(3, |index: usize| {
    ///     ["1", "2", "3"][index].parse::<i32>()
    /// });
    /// assert_eq!(parsed.map(|sequence| sequence.to_vec()), Ok(vec![1, 2, 3]));
    ///
    /// let failed = PersistentSequence::try_initialize(3, |index: usize| {
    ///     ["1", "x", "3"][index].parse::<i32>()
    /// });
    /// assert!(failed.is_err());
    /// ```
    pub fn try_initialize<E, F>(length: isize, mut initializer: F) -> Result<Self, E>
    where
        F: FnMut(usize) -> Result<T, E>,
    {
        if length <= 0 {
            return Ok(Self::new());
        }
        let mut builder = Builder::new();
        for index in 0..length.unsigned_abs() {
            builder = builder.push(initializer(index)?);
        }
        Ok(builder.to_sequence())
    }

    /// Creates a sequence that takes ownership of `elements`.
    #[must_use]
    pub fn from_vec(elements: Vec<T>) -> Self {
        elements
            .into_iter()
            .fold(Builder::new(), Builder::push)
            .to_sequence()
    }

    /// Returns the number of elements in the sequence.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the sequence contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the number of trie levels above the leaves.
    ///
    /// Always at least 1. It is the smallest depth able to address every
    /// element stored in the trie.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let small = PersistentSequence::initialize(1024 + 31, |index: usize| index);
    /// let large = PersistentSequence::initialize(1024 + 32, |index: usize| index);
    /// assert_eq!(small.depth(), 1);
    /// assert_eq!(large.depth(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Global index of the first element held in the tail.
    #[inline]
    const fn tail_index(&self) -> usize {
        (self.length >> BITS_PER_LEVEL) << BITS_PER_LEVEL
    }

    pub(crate) const fn root(&self) -> &Tree<T> {
        &self.root
    }

    pub(crate) const fn tail(&self) -> &ArrayCell<T> {
        &self.tail
    }

    /// Returns a reference to the element at `index`, or `None` when out of
    /// range.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.length {
            return None;
        }
        let tail_index = self.tail_index();
        if index >= tail_index {
            self.tail.as_slice().get(index - tail_index)
        } else {
            Some(self.root.get(index, self.depth))
        }
    }

    /// Returns the first element, or `None` if the sequence is empty.
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the last element, or `None` if the sequence is empty.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.length.checked_sub(1).and_then(|index| self.get(index))
    }

    /// Returns an iterator over references to the elements in index order.
    ///
    /// Each call starts a fresh traversal.
    #[inline]
    pub fn iter(&self) -> PersistentSequenceIterator<'_, T> {
        PersistentSequenceIterator {
            trie: self.root.iter(),
            tail: self.tail.iter(),
            remaining: self.length,
        }
    }

    /// Folds the elements from the first to the last.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence: PersistentSequence<i32> = (1..=4).collect();
    /// let digits = sequence.reduce_left(String::new(), |mut accumulator, element| {
    ///     accumulator.push_str(&element.to_string());
    ///     accumulator
    /// });
    /// assert_eq!(digits, "1234");
    /// ```
    pub fn reduce_left<B, F>(&self, init: B, mut function: F) -> B
    where
        F: FnMut(B, &T) -> B,
    {
        let accumulator = self.root.reduce_left(init, &mut function);
        self.tail.iter().fold(accumulator, function)
    }

    /// Folds the elements from the last to the first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence: PersistentSequence<i32> = (1..=4).collect();
    /// let digits = sequence.reduce_right(String::new(), |element, mut accumulator| {
    ///     accumulator.push_str(&element.to_string());
    ///     accumulator
    /// });
    /// assert_eq!(digits, "4321");
    /// ```
    pub fn reduce_right<B, F>(&self, init: B, mut function: F) -> B
    where
        F: FnMut(&T, B) -> B,
    {
        let accumulator = self
            .tail
            .iter()
            .rev()
            .fold(init, |accumulator, element| function(element, accumulator));
        self.root.reduce_right(accumulator, &mut function)
    }

    /// Checks the structural invariants of the sequence.
    ///
    /// Every leaf in the trie must be full, every branch off the rightmost
    /// path must have all 32 children, the tail must hold fewer than 32
    /// elements, and the recorded length and depth must match the contents.
    ///
    /// # Errors
    ///
    /// Returns the first [`StructureError`] found.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence = PersistentSequence::initialize(5000, |index: usize| index);
    /// assert_eq!(sequence.slice(100, -100).validate(), Ok(()));
    /// ```
    pub fn validate(&self) -> Result<(), StructureError> {
        if self.tail.len() >= BRANCHING_FACTOR {
            return Err(StructureError::TailOverflow {
                tail_length: self.tail.len(),
            });
        }

        let in_trie = if self.root.is_empty() {
            0
        } else {
            self.root.check_children(self.depth, true)?
        };

        let counted = in_trie + self.tail.len();
        if counted != self.length {
            return Err(StructureError::LengthMismatch {
                recorded: self.length,
                counted,
            });
        }

        let expected = depth_for(in_trie);
        if self.depth != expected {
            return Err(StructureError::DepthMismatch {
                recorded: self.depth,
                expected,
            });
        }

        Ok(())
    }

    /// Returns `true` if both sequences share the same trie and tail storage.
    ///
    /// Equal-by-identity implies equal-by-value, not the other way round.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence = PersistentSequence::initialize(10, |index: usize| index);
    /// assert!(sequence.set(99, 0).ptr_eq(&sequence));
    /// assert!(!sequence.set(0, 0).ptr_eq(&sequence));
    /// ```
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.length == other.length
            && self.root.ptr_eq(&other.root)
            && self.tail.ptr_eq(&other.tail)
    }
}

impl<T: Clone> PersistentSequence<T> {
    /// Creates a sequence holding clones of `elements`, in order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence = PersistentSequence::from_slice(&[1, 2, 3]);
    /// assert_eq!(sequence.to_vec(), vec![1, 2, 3]);
    /// ```
    #[must_use]
    pub fn from_slice(elements: &[T]) -> Self {
        Builder::new().append_fill_leaf(elements).to_sequence()
    }

    /// Returns a sequence with the element at `index` replaced by `value`.
    ///
    /// An out-of-range `index` returns a sequence identical to the receiver
    /// (see [`ptr_eq`](Self::ptr_eq)).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence = PersistentSequence::initialize(20, |index: usize| index);
    /// let updated = sequence.set(10, 999);
    ///
    /// assert_eq!(updated.get(10), Some(&999));
    /// assert_eq!(sequence.get(10), Some(&10));   // Original unchanged
    /// assert_eq!(sequence.set(20, 999), sequence);
    /// ```
    #[must_use]
    pub fn set(&self, index: usize, value: T) -> Self {
        if index >= self.length {
            return self.clone();
        }
        let tail_index = self.tail_index();
        if index >= tail_index {
            let tail = self
                .tail
                .set(index - tail_index, value)
                .unwrap_or_else(|error| panic!("trie corrupt: tail {error}"));
            Self::from_parts(self.length, self.depth, self.root.clone(), tail)
        } else {
            let root = self.root.set(index, value, self.depth);
            Self::from_parts(self.length, self.depth, root, self.tail.clone())
        }
    }

    /// Returns a sequence with `value` appended at the end.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence = (0..33).fold(PersistentSequence::new(), |sequence, index| sequence.push(index));
    /// assert_eq!(sequence.len(), 33);
    /// assert_eq!(sequence.get(32), Some(&32));
    /// ```
    #[must_use]
    pub fn push(&self, value: T) -> Self {
        self.replace_tail(self.tail.push(value))
    }

    /// Swaps in a new tail, flushing it into the trie when it is full.
    ///
    /// # Panics
    ///
    /// Panics if `new_tail` holds more than one leaf worth of elements.
    fn replace_tail(&self, new_tail: ArrayCell<T>) -> Self {
        assert!(
            new_tail.len() <= BRANCHING_FACTOR,
            "trie corrupt: tail of {} elements exceeds a leaf",
            new_tail.len()
        );
        let length = self.length - self.tail.len() + new_tail.len();

        if new_tail.len() < BRANCHING_FACTOR {
            return Self::from_parts(length, self.depth, self.root.clone(), new_tail);
        }

        let tail_index = self.tail_index();
        if root_overflows(length, self.depth) {
            let depth = self.depth + 1;
            trace_event!(
                old_depth = self.depth,
                new_depth = depth,
                length,
                "trie depth grew"
            );
            let root = Tree::from_vec(vec![Node::Tree(self.root.clone())])
                .insert_tail(new_tail, tail_index, depth);
            return Self::from_parts(length, depth, root, ArrayCell::new());
        }

        let root = self.root.insert_tail(new_tail, tail_index, self.depth);
        Self::from_parts(length, self.depth, root, ArrayCell::new())
    }

    /// Returns the concatenation of the receiver and `other`.
    ///
    /// Appendices of up to 128 elements are merged into the receiver's tail
    /// leaf by leaf. Longer appendices rebuild the trie from the leaves of
    /// both sides, sharing every leaf that stays aligned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let left = PersistentSequence::initialize(50, |index: usize| index);
    /// let right = PersistentSequence::initialize(10, |index: usize| index);
    /// let appended = left.append(&right);
    ///
    /// assert_eq!(appended.len(), 60);
    /// assert_eq!(appended.get(50), Some(&0));
    /// ```
    #[must_use]
    pub fn append(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }

        if other.length <= APPEND_MERGE_LIMIT {
            trace_event!(strategy = "merge", appendix_length = other.length, "appending");
            self.append_merge(other)
        } else {
            trace_event!(strategy = "rebuild", appendix_length = other.length, "appending");
            self.append_rebuild(other)
        }
    }

    fn append_merge(&self, other: &Self) -> Self {
        let merged = other
            .root
            .reduce_leaves(self.clone(), &mut |sequence: Self, leaf: &Leaf<T>| {
                sequence.merge_into_tail(leaf.elements())
            });
        merged.merge_into_tail(&other.tail)
    }

    /// Moves `elements` into the tail, flushing each time it fills up.
    fn merge_into_tail(&self, elements: &ArrayCell<T>) -> Self {
        if self.tail.is_empty() && elements.len() == BRANCHING_FACTOR {
            return self.replace_tail(elements.clone());
        }

        let mut merged = self.clone();
        let mut remaining = elements.as_slice();

        while !remaining.is_empty() {
            let room = BRANCHING_FACTOR - merged.tail.len();
            let (taken, rest) = remaining.split_at(room.min(remaining.len()));
            let mut new_tail = Vec::with_capacity(merged.tail.len() + taken.len());
            new_tail.extend_from_slice(merged.tail.as_slice());
            new_tail.extend_from_slice(taken);
            merged = merged.replace_tail(ArrayCell::from_vec(new_tail));
            remaining = rest;
        }

        merged
    }

    fn append_rebuild(&self, other: &Self) -> Self {
        other
            .root
            .reduce_leaves(
                Builder::from_sequence(self),
                &mut |builder: Builder<T>, leaf: &Leaf<T>| builder.append_leaf(leaf),
            )
            .append_fill_leaf(other.tail.as_slice())
            .to_sequence()
    }

    /// Keeps the elements before `end`.
    ///
    /// `end` goes through [`translate_index`], so negative values count
    /// from the end. Every subtree left of the cut is shared.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence = PersistentSequence::initialize(100, |index: usize| index);
    /// assert_eq!(sequence.slice_right(40).to_vec(), (0..40).collect::<Vec<_>>());
    /// assert_eq!(sequence.slice_right(-1).len(), 99);
    /// ```
    #[must_use]
    pub fn slice_right(&self, end: isize) -> Self {
        self.truncate(translate_index(end, self.length))
    }

    /// Drops the elements before `start`, so that `start` becomes index 0.
    ///
    /// `start` goes through [`translate_index`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence = PersistentSequence::initialize(100, |index: usize| index);
    /// assert_eq!(sequence.slice_left(90).to_vec(), (90..100).collect::<Vec<_>>());
    /// assert_eq!(sequence.slice_left(-3).to_vec(), vec![97, 98, 99]);
    /// ```
    #[must_use]
    pub fn slice_left(&self, start: isize) -> Self {
        self.drop_prefix(translate_index(start, self.length))
    }

    /// Keeps the elements in `[start, end)`, both bounds read by
    /// [`translate_index`] against the receiver's length.
    ///
    /// An empty or inverted range gives an empty sequence.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sequence::persistent::PersistentSequence;
    ///
    /// let sequence = PersistentSequence::initialize(10, |index: usize| index);
    /// assert_eq!(sequence.slice(2, -2).to_vec(), vec![2, 3, 4, 5, 6, 7]);
    /// assert!(sequence.slice(5, 2).is_empty());
    /// ```
    #[must_use]
    pub fn slice(&self, start: isize, end: isize) -> Self {
        let start = translate_index(start, self.length);
        let end = translate_index(end, self.length);
        if start >= end {
            return Self::new();
        }
        self.truncate(end).drop_prefix(start)
    }

    fn truncate(&self, end: usize) -> Self {
        if end == self.length {
            return self.clone();
        }
        if end == 0 {
            return Self::new();
        }

        let tail_index = self.tail_index();
        if end >= tail_index {
            return Self::from_parts(
                end,
                self.depth,
                self.root.clone(),
                self.tail.prefix(end - tail_index),
            );
        }

        let new_tail_index = (end >> BITS_PER_LEVEL) << BITS_PER_LEVEL;
        let depth = depth_for(new_tail_index);
        let root = if new_tail_index == 0 {
            Tree::empty()
        } else {
            self.root
                .slice_at(self.depth, new_tail_index)
                .hoist(self.depth, depth)
        };
        let tail = self.root.fetch_new_tail(end, self.depth);
        Self::from_parts(end, depth, root, tail)
    }

    fn drop_prefix(&self, start: usize) -> Self {
        if start == 0 {
            return self.clone();
        }
        if start >= self.length {
            return Self::new();
        }

        let tail_index = self.tail_index();
        if start >= tail_index {
            let tail = self.tail.suffix(start - tail_index);
            return Self::from_parts(tail.len(), 1, Tree::empty(), tail);
        }

        let dropped_leaves = start >> BITS_PER_LEVEL;
        let offset = start - (dropped_leaves << BITS_PER_LEVEL);
        trace_event!(dropped_leaves, offset, "rebuilding after prefix slice");

        let leaves = self
            .root
            .reduce_leaves(
                LeafList::new(),
                &mut |leaves: LeafList<Leaf<T>>, leaf: &Leaf<T>| leaves.cons(leaf.clone()),
            )
            .reverse()
            .drop_first(dropped_leaves);

        let builder = leaves
            .iter()
            .enumerate()
            .fold(Builder::new(), |builder, (position, leaf)| {
                if position == 0 && offset > 0 {
                    builder.append_fill_leaf(&leaf.elements().as_slice()[offset..])
                } else {
                    builder.append_leaf(leaf)
                }
            });

        builder
            .append_fill_leaf(self.tail.as_slice())
            .to_sequence()
    }

    /// Materializes the elements into a `Vec`, in index order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        let mut elements = Vec::with_capacity(self.length);
        elements.extend(self.iter().cloned());
        elements
    }
}

/// Whether a trie of `depth` levels is too small to take the leaf that
/// brings the sequence to `length` elements.
fn root_overflows(length: usize, depth: usize) -> bool {
    u32::try_from(depth * BITS_PER_LEVEL)
        .ok()
        .and_then(|shift| 1_usize.checked_shl(shift))
        .is_some_and(|capacity| (length >> BITS_PER_LEVEL) > capacity)
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over references to the elements of a [`PersistentSequence`].
///
/// Walks the trie leaves in order, then the tail.
pub struct PersistentSequenceIterator<'a, T> {
    trie: NodeIterator<'a, T>,
    tail: std::slice::Iter<'a, T>,
    remaining: usize,
}

impl<'a, T> Iterator for PersistentSequenceIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.trie.next().or_else(|| self.tail.next())?;
        self.remaining -= 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for PersistentSequenceIterator<'_, T> {}

/// An owning iterator over the elements of a [`PersistentSequence`].
///
/// The storage is shared with other versions, so elements are cloned out
/// one at a time.
pub struct PersistentSequenceIntoIterator<T> {
    /// Leaf arrays still to visit, the tail last.
    chunks: LeafList<ArrayCell<T>>,
    current: ArrayCell<T>,
    position: usize,
    remaining: usize,
}

impl<T> PersistentSequenceIntoIterator<T> {
    fn new(sequence: &PersistentSequence<T>) -> Self {
        let newest_first = sequence.root.reduce_leaves(
            LeafList::new(),
            &mut |chunks: LeafList<ArrayCell<T>>, leaf: &Leaf<T>| chunks.cons(leaf.elements().clone()),
        );
        let chunks = newest_first.cons(sequence.tail.clone()).reverse();

        Self {
            chunks,
            current: ArrayCell::new(),
            position: 0,
            remaining: sequence.length,
        }
    }
}

impl<T: Clone> Iterator for PersistentSequenceIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Ok(element) = self.current.get(self.position) {
                let element = element.clone();
                self.position += 1;
                self.remaining -= 1;
                return Some(element);
            }
            let next_chunk = self.chunks.head()?.clone();
            self.chunks = self.chunks.drop_first(1);
            self.current = next_chunk;
            self.position = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Clone> ExactSizeIterator for PersistentSequenceIntoIterator<T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Clone for PersistentSequence<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            length: self.length,
            depth: self.depth,
            root: self.root.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<T> Default for PersistentSequence<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for PersistentSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Builder::new(), Builder::push)
            .to_sequence()
    }
}

impl<T> From<Vec<T>> for PersistentSequence<T> {
    #[inline]
    fn from(elements: Vec<T>) -> Self {
        Self::from_vec(elements)
    }
}

impl<T: Clone> IntoIterator for PersistentSequence<T> {
    type Item = T;
    type IntoIter = PersistentSequenceIntoIterator<T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        PersistentSequenceIntoIterator::new(&self)
    }
}

impl<'a, T> IntoIterator for &'a PersistentSequence<T> {
    type Item = &'a T;
    type IntoIter = PersistentSequenceIterator<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for PersistentSequence<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }
        self.ptr_eq(other) || self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for PersistentSequence<T> {}

/// Hashes the length, then every element in order, so that equal sequences
/// hash equally whatever their internal layout.
impl<T: Hash> Hash for PersistentSequence<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for element in self {
            element.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentSequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for PersistentSequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        for (position, element) in self.iter().enumerate() {
            if position > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentSequence<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentSequenceVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<T> PersistentSequenceVisitor<T> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for PersistentSequenceVisitor<T>
where
    T: serde::Deserialize<'de>,
{
    type Value = PersistentSequence<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut builder = Builder::<T>::new();
        while let Some(element) = seq.next_element()? {
            builder = builder.push(element);
        }
        Ok(builder.to_sequence())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentSequence<T>
where
    T: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentSequenceVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================


// =============================================================================
// Thread Safety Tests (arc feature only)
// =============================================================================
