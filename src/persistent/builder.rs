//! Bottom-up trie construction.
//!
//! [`Builder`] gathers full leaves in a [`LeafList`] plus a partial tail
//! buffer, then compresses the leaves into a balanced trie of minimal depth
//! in one pass per level. It backs bulk construction, the rebuilding append
//! strategy and prefix slicing. A builder lives for a single call and is
//! consumed by [`Builder::to_sequence`].

use arrayvec::ArrayVec;

use super::cell::ArrayCell;
use super::list::LeafList;
use super::node::{Leaf, Node, Tree};
use super::sequence::PersistentSequence;
use super::{BRANCHING_FACTOR, depth_for};

/// Transient leaf accumulator.
pub(crate) struct Builder<T> {
    /// Elements not yet forming a whole leaf.
    tail: ArrayVec<T, BRANCHING_FACTOR>,
    /// Full leaves, most recent first.
    leaves: LeafList<Leaf<T>>,
    leaf_count: usize,
}

impl<T> Builder<T> {
    pub(crate) const fn new() -> Self {
        Self {
            tail: ArrayVec::new_const(),
            leaves: LeafList::new(),
            leaf_count: 0,
        }
    }

    /// Appends one element, flushing the tail into a leaf once it fills up.
    #[must_use]
    pub(crate) fn push(mut self, element: T) -> Self {
        self.tail.push(element);
        if self.tail.is_full() {
            self.flush_tail();
        }
        self
    }

    /// Adopts a full leaf by reference.
    ///
    /// Only valid while the tail is empty, so that the leaf stays aligned.
    #[must_use]
    pub(crate) fn push_leaf(mut self, leaf: Leaf<T>) -> Self {
        debug_assert!(self.tail.is_empty());
        debug_assert_eq!(leaf.len(), BRANCHING_FACTOR);
        self.leaves = self.leaves.cons(leaf);
        self.leaf_count += 1;
        self
    }

    fn flush_tail(&mut self) {
        let elements: Vec<T> = std::mem::take(&mut self.tail).into_iter().collect();
        self.leaves = self.leaves.cons(Leaf::new(ArrayCell::from_vec(elements)));
        self.leaf_count += 1;
    }

    /// Compresses the gathered leaves into the root of a trie.
    ///
    /// Each pass groups up to 32 nodes under a new tree; passes repeat until
    /// one node is left. At least one pass runs, so a single leaf still ends
    /// up below a tree.
    ///
    /// # Panics
    ///
    /// Panics if called without any gathered leaf.
    pub(crate) fn to_tree(&self) -> Tree<T> {
        assert!(self.leaf_count > 0, "cannot build a trie without leaves");

        // `leaves` is most recent first, so consing each one restores ascending order.
        let mut nodes = self
            .leaves
            .fold_left(LeafList::new(), |nodes, leaf| nodes.cons(Node::Leaf(leaf.clone())));

        loop {
            nodes = compress_nodes(&nodes);
            if nodes.len() <= 1 {
                break;
            }
        }

        match nodes.head() {
            Some(Node::Tree(root)) => root.clone(),
            Some(Node::Leaf(_)) | None => unreachable!("compression always yields a tree"),
        }
    }

    /// Turns the builder into a sequence.
    ///
    /// Without leaves the result is a depth-1 sequence holding only the tail.
    pub(crate) fn to_sequence(self) -> PersistentSequence<T> {
        if self.leaf_count == 0 {
            let tail = ArrayCell::from_vec(self.tail.into_iter().collect());
            return PersistentSequence::from_parts(tail.len(), 1, Tree::empty(), tail);
        }

        let tail_index = self.leaf_count * BRANCHING_FACTOR;
        let depth = depth_for(tail_index);
        trace_event!(leaf_count = self.leaf_count, depth, "rebuilding trie from leaves");

        let root = self.to_tree();
        let tail = ArrayCell::from_vec(self.tail.into_iter().collect());
        PersistentSequence::from_parts(tail_index + tail.len(), depth, root, tail)
    }
}

impl<T: Clone> Builder<T> {
    /// Decomposes `sequence` into its leaves and tail.
    ///
    /// Leaves are shared with the sequence, the tail is copied.
    pub(crate) fn from_sequence(sequence: &PersistentSequence<T>) -> Self {
        let builder = sequence
            .root()
            .reduce_leaves(Self::new(), &mut |builder: Self, leaf: &Leaf<T>| {
                builder.push_leaf(leaf.clone())
            });
        builder.append_fill_leaf(sequence.tail().as_slice())
    }

    /// Merges `elements` into the tail, flushing a leaf each time it fills.
    ///
    /// The remainder of a flush carries over into a fresh tail until
    /// `elements` is exhausted.
    #[must_use]
    pub(crate) fn append_fill_leaf(mut self, elements: &[T]) -> Self {
        let mut remaining = elements;

        while !remaining.is_empty() {
            let room = BRANCHING_FACTOR - self.tail.len();
            let (taken, rest) = remaining.split_at(room.min(remaining.len()));
            self.tail.extend(taken.iter().cloned());
            remaining = rest;

            if self.tail.is_full() {
                self.flush_tail();
            }
        }

        self
    }

    /// Appends a leaf, sharing it when the tail is empty and the leaf is full.
    #[must_use]
    pub(crate) fn append_leaf(self, leaf: &Leaf<T>) -> Self {
        if self.tail.is_empty() && leaf.len() == BRANCHING_FACTOR {
            self.push_leaf(leaf.clone())
        } else {
            self.append_fill_leaf(leaf.elements().as_slice())
        }
    }
}

/// Groups consecutive runs of up to 32 nodes under new trees.
///
/// One level of bottom-up compression: the result is about 32 times shorter
/// and keeps the input order.
pub(crate) fn compress_nodes<T>(nodes: &LeafList<Node<T>>) -> LeafList<Node<T>> {
    let mut compressed = LeafList::new();
    let mut remaining = nodes.clone();

    while !remaining.is_empty() {
        let group: Vec<Node<T>> = remaining.iter().take(BRANCHING_FACTOR).cloned().collect();
        remaining = remaining.drop_first(group.len());
        compressed = compressed.cons(Node::Tree(Tree::from_vec(group)));
    }

    compressed.reverse()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn build(length: usize) -> Builder<usize> {
        (0..length).fold(Builder::new(), Builder::push)
    }

    #[rstest]
    #[case(0, 0)]
    #[case(31, 0)]
    #[case(32, 1)]
    #[case(65, 2)]
    fn test_push_flushes_full_leaves(#[case] length: usize, #[case] leaves: usize) {
        let builder = build(length);
        assert_eq!(builder.leaf_count, leaves);
        assert_eq!(builder.tail.len(), length % BRANCHING_FACTOR);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(32, 1)]
    #[case(33, 2)]
    #[case(1024, 32)]
    #[case(1025, 33)]
    fn test_compress_nodes_groups_by_32(#[case] count: usize, #[case] expected: usize) {
        let nodes: LeafList<Node<usize>> = (0..count)
            .map(|index| Node::Leaf(Leaf::new(ArrayCell::from_vec(vec![index]))))
            .collect();
        assert_eq!(compress_nodes(&nodes).len(), expected);
    }

    #[rstest]
    fn test_compress_nodes_keeps_order() {
        let nodes: LeafList<Node<usize>> = (0..40)
            .map(|index| Node::Leaf(Leaf::new(ArrayCell::from_vec(vec![index]))))
            .collect();
        let compressed = compress_nodes(&nodes);

        let flattened: Vec<usize> = compressed
            .iter()
            .flat_map(|node| match node {
                Node::Tree(tree) => tree.iter().copied().collect::<Vec<_>>(),
                Node::Leaf(_) => panic!("expected trees"),
            })
            .collect();
        assert_eq!(flattened, (0..40).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_to_sequence_without_leaves_is_tail_only() {
        let sequence = build(5).to_sequence();
        assert_eq!(sequence.len(), 5);
        assert_eq!(sequence.depth(), 1);
        assert_eq!(sequence.to_vec(), vec![0, 1, 2, 3, 4]);
    }

    #[rstest]
    #[case(32, 1)]
    #[case(1024, 1)]
    #[case(1056, 2)]
    #[case(1060, 2)]
    fn test_to_sequence_depth(#[case] length: usize, #[case] depth: usize) {
        let sequence = build(length).to_sequence();
        assert_eq!(sequence.depth(), depth);
        assert_eq!(sequence.len(), length);
        assert_eq!(sequence.validate(), Ok(()));
        assert_eq!(sequence.to_vec(), (0..length).collect::<Vec<_>>());
    }

    #[rstest]
    #[case(vec![], 0)]
    #[case(vec![10], 0)]
    #[case(vec![40], 1)]
    #[case(vec![20, 20, 30], 2)]
    #[case(vec![100], 3)]
    fn test_append_fill_leaf_carries_remainder(#[case] chunks: Vec<usize>, #[case] leaves: usize) {
        let mut next = 0;
        let mut builder = Builder::new();
        for chunk in &chunks {
            let elements: Vec<usize> = (next..next + chunk).collect();
            next += chunk;
            builder = builder.append_fill_leaf(&elements);
        }

        assert_eq!(builder.leaf_count, leaves);
        let sequence = builder.to_sequence();
        assert_eq!(sequence.to_vec(), (0..next).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_append_leaf_shares_aligned_leaf() {
        let leaf = Leaf::new(ArrayCell::from_vec((0..32).collect::<Vec<usize>>()));
        let builder = Builder::new().append_leaf(&leaf);

        let shared = builder.leaves.head().map(|head| head.elements().ptr_eq(leaf.elements()));
        assert_eq!(shared, Some(true));
    }

    #[rstest]
    fn test_from_sequence_round_trip() {
        let sequence = build(100).to_sequence();
        let rebuilt = Builder::from_sequence(&sequence).to_sequence();

        assert_eq!(rebuilt, sequence);
        assert_eq!(rebuilt.validate(), Ok(()));
    }
}
