//! Persistent (immutable) indexed sequence and its building blocks.
//!
//! - [`PersistentSequence`]: the public value, a 32-way trie plus a tail buffer
//! - [`ArrayCell`]: copy-on-write bounded array backing every trie node
//! - [`ElementInitializer`]: index-driven element source for bulk construction
//!
//! The trie nodes, the leaf builder and the leaf list used while rebuilding
//! are private to this module.
//!
//! # Structural Sharing
//!
//! Every operation that produces a new sequence reuses, by reference, each
//! subtree it does not touch. Cloning a sequence is O(1).
//!
//! ```rust
//! use persistent_sequence::persistent::PersistentSequence;
//!
//! let sequence: PersistentSequence<i32> = (0..100).collect();
//! let updated = sequence.set(50, 999);
//!
//! assert_eq!(sequence.get(50), Some(&50));   // Original unchanged
//! assert_eq!(updated.get(50), Some(&999));   // New version
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled (default), this is `std::sync::Arc`,
/// which lets sequences cross thread boundaries.
///
/// When the `arc` feature is disabled, this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

// =============================================================================
// Trie Geometry
// =============================================================================

/// Branching factor of every trie node (2^5 = 32).
pub(crate) const BRANCHING_FACTOR: usize = 32;

/// Index bits consumed per trie level.
pub(crate) const BITS_PER_LEVEL: usize = 5;

/// Mask extracting the slot of an index within one node.
pub(crate) const MASK: usize = BRANCHING_FACTOR - 1;

static_assertions::const_assert_eq!(BRANCHING_FACTOR, 1 << BITS_PER_LEVEL);

/// Returns the trie depth needed to address every element below `tail_index`.
///
/// Equivalent to `max(1, floor(log32(tail_index - 1)))`, computed from the
/// bit length so that powers of 32 land on the right level.
pub(crate) const fn depth_for(tail_index: usize) -> usize {
    if tail_index <= 1 {
        return 1;
    }
    let highest_index = tail_index - 1;
    let bit_length = (usize::BITS - highest_index.leading_zeros()) as usize;
    let depth = (bit_length - 1) / BITS_PER_LEVEL;
    if depth == 0 { 1 } else { depth }
}

mod builder;
mod cell;
mod error;
mod initializer;
mod list;
mod node;
mod sequence;

pub use cell::ArrayCell;
pub use error::IndexOutOfRange;
pub use error::StructureError;
pub use initializer::ElementInitializer;
pub use sequence::PersistentSequence;
pub use sequence::PersistentSequenceIntoIterator;
pub use sequence::PersistentSequenceIterator;
pub use sequence::translate_index;

// =============================================================================
// Tests
// =============================================================================
