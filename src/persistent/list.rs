//! Persistent singly-linked list used to accumulate trie leaves.
//!
//! [`LeafList`] is the ordered-sequence collaborator of the builder: leaves
//! are gathered with O(1) `cons`, turned around with `reverse`, trimmed
//! with `drop_first`, and read back by iteration or `fold_left`. It is a plain
//! cons-list and never escapes a single construction call.
//!
//! ```text
//! list1: 1 -> 2 -> 3 -> nil
//! list2 = list1.cons(0): 0 -> [1 -> 2 -> 3 -> nil]  // shares [1, 2, 3] with list1
//! ```

use std::fmt;

use super::ReferenceCounter;

/// Internal node structure for the list.
struct Node<T> {
    element: T,
    next: Option<ReferenceCounter<Self>>,
}

/// A persistent (immutable) singly-linked list.
pub(crate) struct LeafList<T> {
    head: Option<ReferenceCounter<Node<T>>>,
    /// Cached length for O(1) access.
    length: usize,
}

impl<T> LeafList<T> {
    /// Creates a new empty list.
    #[inline]
    pub(crate) const fn new() -> Self {
        Self {
            head: None,
            length: 0,
        }
    }

    /// Prepends an element, sharing the receiver as the new tail.
    #[inline]
    #[must_use]
    pub(crate) fn cons(&self, element: T) -> Self {
        Self {
            head: Some(ReferenceCounter::new(Node {
                element,
                next: self.head.clone(),
            })),
            length: self.length + 1,
        }
    }

    /// Returns a reference to the first element.
    #[inline]
    pub(crate) fn head(&self) -> Option<&T> {
        self.head.as_ref().map(|node| &node.element)
    }

    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub(crate) const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the list with the first `count` elements removed.
    ///
    /// O(count) traversal, O(1) space: the result shares the remainder.
    #[must_use]
    pub(crate) fn drop_first(&self, count: usize) -> Self {
        let mut current = self.head.as_ref();
        for _ in 0..count.min(self.length) {
            current = current.and_then(|node| node.next.as_ref());
        }
        Self {
            head: current.cloned(),
            length: self.length.saturating_sub(count),
        }
    }

    #[inline]
    pub(crate) const fn iter(&self) -> LeafListIterator<'_, T> {
        LeafListIterator {
            current: self.head.as_ref(),
            remaining: self.length,
        }
    }

    /// Folds the elements from front to back.
    pub(crate) fn fold_left<B, F>(&self, init: B, function: F) -> B
    where
        F: FnMut(B, &T) -> B,
    {
        self.iter().fold(init, function)
    }
}

impl<T: Clone> LeafList<T> {
    /// Returns the list in reverse order.
    #[must_use]
    pub(crate) fn reverse(&self) -> Self {
        self.fold_left(Self::new(), |reversed, element| {
            reversed.cons(element.clone())
        })
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over references to elements of a [`LeafList`].
pub(crate) struct LeafListIterator<'a, T> {
    current: Option<&'a ReferenceCounter<Node<T>>>,
    remaining: usize,
}

impl<'a, T> Iterator for LeafListIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.current.map(|node| {
            self.current = node.next.as_ref();
            self.remaining -= 1;
            &node.element
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for LeafListIterator<'_, T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Clone for LeafList<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            length: self.length,
        }
    }
}

impl<T> Default for LeafList<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Unlinks nodes one at a time so that dropping a long list does not recurse
/// once per node.
impl<T> Drop for LeafList<T> {
    fn drop(&mut self) {
        let mut current = self.head.take();
        while let Some(node) = current {
            match ReferenceCounter::try_unwrap(node) {
                Ok(mut owned) => current = owned.next.take(),
                Err(_) => break,
            }
        }
    }
}

impl<T> FromIterator<T> for LeafList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut elements: Vec<T> = iter.into_iter().collect();
        let mut list = Self::new();
        while let Some(element) = elements.pop() {
            list = list.cons(element);
        }
        list
    }
}

impl<'a, T> IntoIterator for &'a LeafList<T> {
    type Item = &'a T;
    type IntoIter = LeafListIterator<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for LeafList<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
