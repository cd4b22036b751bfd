//! Index-driven element source for bulk construction.

/// Produces the element stored at a given index during
/// [`PersistentSequence::initialize`](super::PersistentSequence::initialize).
///
/// Indices are requested exactly once each, in ascending order. Any
/// `FnMut(usize) -> T` closure is an initializer.
///
/// # Examples
///
/// ```rust
/// use persistent_sequence::persistent::{ElementInitializer, PersistentSequence};
///
/// struct Squares;
///
/// impl ElementInitializer<usize> for Squares {
///     fn initialize(&mut self, index: usize) -> usize {
///         index * index
///     }
/// }
///
/// let sequence = PersistentSequence::initialize(4, Squares);
/// assert_eq!(sequence.to_vec(), vec![0, 1, 4, 9]);
/// ```
pub trait ElementInitializer<T> {
    /// Returns the element for `index`.
    fn initialize(&mut self, index: usize) -> T;
}

impl<T, F> ElementInitializer<T> for F
where
    F: FnMut(usize) -> T,
{
    #[inline]
    fn initialize(&mut self, index: usize) -> T {
        self(index)
    }
}
