//! Error types for the persistent sequence.
//!
//! Range misses on the public sequence API are not errors: `get` answers
//! `None` and `set` returns the original value. The types here cover the two
//! places where a caller can still observe a failure: bounds-checked access
//! to an [`ArrayCell`](super::ArrayCell), and the structural checker
//! [`PersistentSequence::validate`](super::PersistentSequence::validate).

/// An index fell outside `[0, length)` of a bounded array cell.
///
/// # Examples
///
/// ```rust
/// use persistent_sequence::persistent::{ArrayCell, IndexOutOfRange};
///
/// let cell = ArrayCell::from_vec(vec![1, 2, 3]);
/// assert_eq!(cell.get(5), Err(IndexOutOfRange { index: 5, length: 3 }));
/// assert_eq!(
///     format!("{}", IndexOutOfRange { index: 5, length: 3 }),
///     "index 5 out of range for length 3"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOutOfRange {
    /// The requested index.
    pub index: usize,
    /// The length of the cell at the time of the request.
    pub length: usize,
}

impl std::fmt::Display for IndexOutOfRange {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "index {} out of range for length {}",
            self.index, self.length
        )
    }
}

impl std::error::Error for IndexOutOfRange {}

/// The first structural invariant a sequence was found to violate.
///
/// Returned by [`PersistentSequence::validate`](super::PersistentSequence::validate).
/// A sequence built only through the public API never produces one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    /// The tail buffer holds a whole leaf or more.
    TailOverflow {
        /// Number of elements found in the tail.
        tail_length: usize,
    },
    /// The recorded length disagrees with the elements actually stored.
    LengthMismatch {
        /// Length recorded on the sequence.
        recorded: usize,
        /// Elements found in the trie plus the tail.
        counted: usize,
    },
    /// The recorded depth is not the minimal depth for the trie contents.
    DepthMismatch {
        /// Depth recorded on the sequence.
        recorded: usize,
        /// Minimal depth for the number of trie elements.
        expected: usize,
    },
    /// A leaf was found above the bottom level.
    UnexpectedLeaf {
        /// Level at which the leaf was found.
        depth: usize,
    },
    /// A branch was found where only leaves may live.
    UnexpectedTree,
    /// A leaf inside the trie is not full.
    PartialLeaf {
        /// Number of elements in the leaf.
        length: usize,
    },
    /// A branch off the rightmost path does not have every child slot filled.
    PartialBranch {
        /// Level of the branch.
        depth: usize,
        /// Number of children in the branch.
        children: usize,
    },
    /// A non-root branch has no children at all.
    EmptyBranch {
        /// Level of the branch.
        depth: usize,
    },
}

impl std::fmt::Display for StructureError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TailOverflow { tail_length } => {
                write!(formatter, "tail holds {tail_length} elements, expected fewer than 32")
            }
            Self::LengthMismatch { recorded, counted } => write!(
                formatter,
                "recorded length {recorded} but {counted} elements are stored"
            ),
            Self::DepthMismatch { recorded, expected } => {
                write!(formatter, "recorded depth {recorded}, expected {expected}")
            }
            Self::UnexpectedLeaf { depth } => write!(formatter, "leaf found at depth {depth}"),
            Self::UnexpectedTree => write!(formatter, "branch found at the leaf level"),
            Self::PartialLeaf { length } => {
                write!(formatter, "trie leaf holds {length} elements, expected 32")
            }
            Self::PartialBranch { depth, children } => write!(
                formatter,
                "branch at depth {depth} off the rightmost path has {children} children"
            ),
            Self::EmptyBranch { depth } => write!(formatter, "empty branch at depth {depth}"),
        }
    }
}

impl std::error::Error for StructureError {}
