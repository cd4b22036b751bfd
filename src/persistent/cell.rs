//! Copy-on-write bounded array.
//!
//! [`ArrayCell`] is the storage primitive behind every trie node: leaves keep
//! their elements in one, branches keep their children in one. A cell is
//! never mutated after construction. `set` and `push` copy the backing
//! storage and return a fresh cell, which is the unit of cost for every node
//! touched by a path-copying update.

use std::fmt;

use super::ReferenceCounter;
use super::error::IndexOutOfRange;

/// An immutable, reference-counted array with copy-on-write updates.
///
/// Cloning a cell is O(1): the clone shares the backing storage.
///
/// # Examples
///
/// ```rust
/// use persistent_sequence::persistent::ArrayCell;
///
/// let cell = ArrayCell::from_vec(vec![1, 2, 3]);
/// let updated = cell.set(1, 20).unwrap();
///
/// assert_eq!(cell.as_slice(), &[1, 2, 3]);     // Original unchanged
/// assert_eq!(updated.as_slice(), &[1, 20, 3]);
/// assert!(cell.get(3).is_err());
/// ```
pub struct ArrayCell<T> {
    elements: ReferenceCounter<[T]>,
}

impl<T> ArrayCell<T> {
    /// Creates an empty cell.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: ReferenceCounter::from(Vec::<T>::new()),
        }
    }

    /// Creates a cell that takes ownership of `elements`.
    #[inline]
    #[must_use]
    pub fn from_vec(elements: Vec<T>) -> Self {
        Self {
            elements: ReferenceCounter::from(elements),
        }
    }

    /// Returns the number of elements in the cell.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the cell holds no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfRange`] when `index >= self.len()`.
    #[inline]
    pub fn get(&self, index: usize) -> Result<&T, IndexOutOfRange> {
        self.elements.get(index).ok_or(IndexOutOfRange {
            index,
            length: self.elements.len(),
        })
    }

    /// Returns a view of the elements.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    /// Returns an iterator over references to the elements.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    /// Returns `true` if both cells share the same backing storage.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        ReferenceCounter::ptr_eq(&self.elements, &other.elements)
    }
}

impl<T: Clone> ArrayCell<T> {
    /// Returns a new cell with the element at `index` replaced by `value`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfRange`] when `index >= self.len()`.
    pub fn set(&self, index: usize, value: T) -> Result<Self, IndexOutOfRange> {
        if index >= self.elements.len() {
            return Err(IndexOutOfRange {
                index,
                length: self.elements.len(),
            });
        }
        let mut copy = self.elements.to_vec();
        copy[index] = value;
        Ok(Self::from_vec(copy))
    }

    /// Returns a new cell with `value` appended.
    #[must_use]
    pub fn push(&self, value: T) -> Self {
        let mut copy = Vec::with_capacity(self.elements.len() + 1);
        copy.extend_from_slice(&self.elements);
        copy.push(value);
        Self::from_vec(copy)
    }

    /// Returns a new cell holding the first `length` elements.
    ///
    /// A `length` at or beyond the current length shares the storage.
    #[must_use]
    pub fn prefix(&self, length: usize) -> Self {
        if length >= self.elements.len() {
            return self.clone();
        }
        Self::from_vec(self.elements[..length].to_vec())
    }

    /// Returns a new cell holding the elements from `start` onward.
    ///
    /// A `start` of zero shares the storage.
    #[must_use]
    pub fn suffix(&self, start: usize) -> Self {
        if start == 0 {
            return self.clone();
        }
        let start = start.min(self.elements.len());
        Self::from_vec(self.elements[start..].to_vec())
    }

    /// Materializes the elements into a `Vec`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.elements.to_vec()
    }
}

impl<T> Clone for ArrayCell<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            elements: self.elements.clone(),
        }
    }
}

impl<T> Default for ArrayCell<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ArrayCell<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.elements.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for ArrayCell<T> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<T: Eq> Eq for ArrayCell<T> {}

impl<'a, T> IntoIterator for &'a ArrayCell<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
