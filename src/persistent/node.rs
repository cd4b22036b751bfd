//! Trie nodes.
//!
//! A trie is made of two kinds of [`Node`]: a [`Tree`] holds up to 32 child
//! nodes, a [`Leaf`] holds up to 32 elements. A tree at depth `d` (leaves sit
//! at depth 0) picks the child for a global index `i` from bits
//! `[5d, 5d + 5)` of `i`.
//!
//! Every operation here is path-copying: the nodes on the path to the
//! affected slot are rebuilt and every other subtree is shared by reference.
//! Reaching a slot that does not exist, or a leaf where a tree must be, means
//! the trie is corrupt; those cases panic.

use smallvec::SmallVec;

use super::cell::ArrayCell;
use super::error::StructureError;
use super::{BITS_PER_LEVEL, BRANCHING_FACTOR, MASK};

// =============================================================================
// Node Definitions
// =============================================================================

/// A node of the trie.
pub(crate) enum Node<T> {
    /// Internal node holding child nodes
    Tree(Tree<T>),
    /// Bottom node holding elements
    Leaf(Leaf<T>),
}

/// Internal node: up to 32 children, all at the same depth.
pub(crate) struct Tree<T> {
    children: ArrayCell<Node<T>>,
}

/// Bottom node: up to 32 elements.
pub(crate) struct Leaf<T> {
    elements: ArrayCell<T>,
}

impl<T> Clone for Node<T> {
    #[inline]
    fn clone(&self) -> Self {
        match self {
            Self::Tree(tree) => Self::Tree(tree.clone()),
            Self::Leaf(leaf) => Self::Leaf(leaf.clone()),
        }
    }
}

impl<T> Clone for Tree<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            children: self.children.clone(),
        }
    }
}

impl<T> Clone for Leaf<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            elements: self.elements.clone(),
        }
    }
}

// =============================================================================
// Node
// =============================================================================

impl<T> Node<T> {
    /// Returns the element at global `index` below this node at `depth`.
    pub(crate) fn get(&self, index: usize, depth: usize) -> &T {
        match self {
            Self::Tree(tree) => tree.get(index, depth),
            Self::Leaf(leaf) => leaf.get(index),
        }
    }

    /// Returns the tree that results from flushing `tail` into this node.
    ///
    /// # Panics
    ///
    /// Panics if this node is a leaf: a full tail is only ever inserted
    /// below a tree.
    pub(crate) fn insert_tail(&self, tail: ArrayCell<T>, index: usize, depth: usize) -> Tree<T> {
        match self {
            Self::Tree(tree) => tree.insert_tail(tail, index, depth),
            Self::Leaf(_) => panic!("trie corrupt: leaf reached while inserting a tail at depth {depth}"),
        }
    }

    /// Folds the elements below this node in ascending index order.
    pub(crate) fn reduce_left<B, F>(&self, init: B, function: &mut F) -> B
    where
        F: FnMut(B, &T) -> B,
    {
        match self {
            Self::Tree(tree) => tree.reduce_left(init, function),
            Self::Leaf(leaf) => leaf.elements.iter().fold(init, |accumulator, element| {
                function(accumulator, element)
            }),
        }
    }

    /// Folds the elements below this node in descending index order.
    pub(crate) fn reduce_right<B, F>(&self, init: B, function: &mut F) -> B
    where
        F: FnMut(&T, B) -> B,
    {
        match self {
            Self::Tree(tree) => tree.reduce_right(init, function),
            Self::Leaf(leaf) => leaf
                .elements
                .iter()
                .rev()
                .fold(init, |accumulator, element| function(element, accumulator)),
        }
    }

    /// Folds the leaves below this node, not their elements, in ascending order.
    pub(crate) fn reduce_leaves<B, F>(&self, init: B, function: &mut F) -> B
    where
        F: FnMut(B, &Leaf<T>) -> B,
    {
        match self {
            Self::Tree(tree) => tree.reduce_leaves(init, function),
            Self::Leaf(leaf) => function(init, leaf),
        }
    }

    /// Returns the node as a tree, or `None` for a leaf.
    #[inline]
    pub(crate) const fn as_tree(&self) -> Option<&Tree<T>> {
        match self {
            Self::Tree(tree) => Some(tree),
            Self::Leaf(_) => None,
        }
    }

    /// Checks the subtree shape and returns the number of elements in it.
    ///
    /// `rightmost` tells whether the node lies on the rightmost path of the
    /// trie, the only place where nodes may be partially filled.
    pub(crate) fn check(&self, depth: usize, rightmost: bool) -> Result<usize, StructureError> {
        match self {
            Self::Tree(tree) => {
                if depth == 0 {
                    return Err(StructureError::UnexpectedTree);
                }
                if tree.is_empty() {
                    return Err(StructureError::EmptyBranch { depth });
                }
                if !rightmost && tree.len() != BRANCHING_FACTOR {
                    return Err(StructureError::PartialBranch {
                        depth,
                        children: tree.len(),
                    });
                }
                tree.check_children(depth, rightmost)
            }
            Self::Leaf(leaf) => {
                if depth != 0 {
                    return Err(StructureError::UnexpectedLeaf { depth });
                }
                if leaf.len() != BRANCHING_FACTOR {
                    return Err(StructureError::PartialLeaf { length: leaf.len() });
                }
                Ok(leaf.len())
            }
        }
    }
}

impl<T: Clone> Node<T> {
    /// Returns a copy of this node with the element at `index` replaced.
    #[must_use]
    pub(crate) fn set(&self, index: usize, value: T, depth: usize) -> Self {
        match self {
            Self::Tree(tree) => Self::Tree(tree.set(index, value, depth)),
            Self::Leaf(leaf) => Self::Leaf(leaf.set(index, value)),
        }
    }

    /// Returns the elements of the leaf holding `end_index` that precede it.
    pub(crate) fn fetch_new_tail(&self, end_index: usize, depth: usize) -> ArrayCell<T> {
        match self {
            Self::Tree(tree) => tree.fetch_new_tail(end_index, depth),
            Self::Leaf(leaf) => leaf.elements.prefix(end_index & MASK),
        }
    }
}

// =============================================================================
// Tree
// =============================================================================

impl<T> Tree<T> {
    /// Creates a tree with no children.
    pub(crate) fn empty() -> Self {
        Self {
            children: ArrayCell::new(),
        }
    }

    /// Creates a tree over at most 32 children.
    pub(crate) fn from_vec(children: Vec<Node<T>>) -> Self {
        debug_assert!(children.len() <= BRANCHING_FACTOR);
        Self {
            children: ArrayCell::from_vec(children),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        self.children.ptr_eq(&other.children)
    }

    /// Slot of the child covering global `index` for a tree at `depth`.
    #[inline]
    pub(crate) const fn child_index(index: usize, depth: usize) -> usize {
        (index >> (depth * BITS_PER_LEVEL)) & MASK
    }

    fn child(&self, slot: usize) -> &Node<T> {
        match self.children.get(slot) {
            Ok(child) => child,
            Err(error) => panic!("trie corrupt: child {error}"),
        }
    }

    pub(crate) fn get(&self, index: usize, depth: usize) -> &T {
        self.child(Self::child_index(index, depth))
            .get(index, depth - 1)
    }

    /// Flushes a full `tail`, whose first element has global `index`, into
    /// the trie below this tree.
    ///
    /// A slot past the current children grows the tree: a new leaf at
    /// depth 1, a fresh single-path subtree above that.
    pub(crate) fn insert_tail(&self, tail: ArrayCell<T>, index: usize, depth: usize) -> Self {
        let slot = Self::child_index(index, depth);

        if slot >= self.len() {
            let child = if depth == 1 {
                Node::Leaf(Leaf::new(tail))
            } else {
                Node::Tree(Self::empty().insert_tail(tail, index, depth - 1))
            };
            return Self {
                children: self.children.push(child),
            };
        }

        let updated = self.child(slot).insert_tail(tail, index, depth - 1);
        Self {
            children: self.replace_child(slot, Node::Tree(updated)),
        }
    }

    pub(crate) fn reduce_left<B, F>(&self, init: B, function: &mut F) -> B
    where
        F: FnMut(B, &T) -> B,
    {
        self.children
            .iter()
            .fold(init, |accumulator, child| child.reduce_left(accumulator, function))
    }

    pub(crate) fn reduce_right<B, F>(&self, init: B, function: &mut F) -> B
    where
        F: FnMut(&T, B) -> B,
    {
        self.children
            .iter()
            .rev()
            .fold(init, |accumulator, child| child.reduce_right(accumulator, function))
    }

    pub(crate) fn reduce_leaves<B, F>(&self, init: B, function: &mut F) -> B
    where
        F: FnMut(B, &Leaf<T>) -> B,
    {
        self.children
            .iter()
            .fold(init, |accumulator, child| child.reduce_leaves(accumulator, function))
    }

    /// Returns a fresh ascending traversal of the elements below this tree.
    pub(crate) fn iter(&self) -> NodeIterator<'_, T> {
        let mut stack = SmallVec::new();
        stack.push(TraversalFrame {
            children: self.children.as_slice(),
            child_index: 0,
        });
        NodeIterator {
            stack,
            current_leaf: [].iter(),
        }
    }

    /// Collapses levels made redundant by a slice.
    ///
    /// Descends into the first child while it is a tree and `old_depth`
    /// still exceeds `new_depth`.
    #[must_use]
    pub(crate) fn hoist(&self, old_depth: usize, new_depth: usize) -> Self {
        let mut current = self.clone();
        let mut depth = old_depth;

        while depth > new_depth {
            let next = match current.children.as_slice().first().and_then(Node::as_tree) {
                Some(child) => child.clone(),
                None => break,
            };
            debug_assert_eq!(current.len(), 1, "hoisting would discard siblings");
            current = next;
            depth -= 1;
        }

        current
    }

    /// Keeps only the elements below `end_index`, which must be leaf aligned.
    ///
    /// Children before the one covering `end_index` are shared; that child is
    /// sliced recursively when it is a subtree and dropped when it is a leaf
    /// or when its slice comes back empty.
    #[must_use]
    pub(crate) fn slice_at(&self, depth: usize, end_index: usize) -> Self {
        let slot = Self::child_index(end_index, depth);
        let prefix = self.children.prefix(slot);

        match self.children.as_slice().get(slot).and_then(Node::as_tree) {
            Some(subtree) => {
                let sliced = subtree.slice_at(depth - 1, end_index);
                if sliced.is_empty() {
                    Self { children: prefix }
                } else {
                    Self {
                        children: prefix.push(Node::Tree(sliced)),
                    }
                }
            }
            None => Self { children: prefix },
        }
    }

    /// Checks every child of this tree and returns the element count.
    pub(crate) fn check_children(
        &self,
        depth: usize,
        rightmost: bool,
    ) -> Result<usize, StructureError> {
        let last = self.len().saturating_sub(1);
        self.children
            .iter()
            .enumerate()
            .try_fold(0, |counted, (slot, child)| -> Result<usize, StructureError> {
                Ok(counted + child.check(depth - 1, rightmost && slot == last)?)
            })
    }

    fn replace_child(&self, slot: usize, child: Node<T>) -> ArrayCell<Node<T>> {
        match self.children.set(slot, child) {
            Ok(children) => children,
            Err(error) => panic!("trie corrupt: child {error}"),
        }
    }
}

impl<T: Clone> Tree<T> {
    #[must_use]
    pub(crate) fn set(&self, index: usize, value: T, depth: usize) -> Self {
        let slot = Self::child_index(index, depth);
        let updated = self.child(slot).set(index, value, depth - 1);
        Self {
            children: self.replace_child(slot, updated),
        }
    }

    pub(crate) fn fetch_new_tail(&self, end_index: usize, depth: usize) -> ArrayCell<T> {
        self.child(Self::child_index(end_index, depth))
            .fetch_new_tail(end_index, depth - 1)
    }
}

// =============================================================================
// Leaf
// =============================================================================

impl<T> Leaf<T> {
    #[inline]
    pub(crate) const fn new(elements: ArrayCell<T>) -> Self {
        Self { elements }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub(crate) const fn elements(&self) -> &ArrayCell<T> {
        &self.elements
    }

    fn get(&self, index: usize) -> &T {
        match self.elements.get(index & MASK) {
            Ok(element) => element,
            Err(error) => panic!("trie corrupt: leaf {error}"),
        }
    }
}

impl<T: Clone> Leaf<T> {
    fn set(&self, index: usize, value: T) -> Self {
        match self.elements.set(index & MASK, value) {
            Ok(elements) => Self { elements },
            Err(error) => panic!("trie corrupt: leaf {error}"),
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// A stack entry for depth-first traversal: a branch's children and the
/// next child to visit.
struct TraversalFrame<'a, T> {
    children: &'a [Node<T>],
    child_index: usize,
}

/// Ascending traversal of the elements below a node.
///
/// Visits each node once, keeping one frame per level on an inline stack.
pub(crate) struct NodeIterator<'a, T> {
    stack: SmallVec<[TraversalFrame<'a, T>; 8]>,
    current_leaf: std::slice::Iter<'a, T>,
}

impl<T> NodeIterator<'_, T> {
    /// Moves to the next leaf in ascending order; `false` once none are left.
    fn advance_to_next_leaf(&mut self) -> bool {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return false;
            };
            let children = frame.children;
            let index = frame.child_index;

            if index >= children.len() {
                self.stack.pop();
                continue;
            }
            frame.child_index += 1;

            match &children[index] {
                Node::Tree(tree) => self.stack.push(TraversalFrame {
                    children: tree.children.as_slice(),
                    child_index: 0,
                }),
                Node::Leaf(leaf) => {
                    self.current_leaf = leaf.elements.as_slice().iter();
                    return true;
                }
            }
        }
    }
}

impl<'a, T> Iterator for NodeIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(element) = self.current_leaf.next() {
                return Some(element);
            }
            if !self.advance_to_next_leaf() {
                return None;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn leaf(range: std::ops::Range<usize>) -> Node<usize> {
        Node::Leaf(Leaf::new(ArrayCell::from_vec(range.collect())))
    }

    /// A depth-1 tree over `leaf_count` full leaves holding `0..leaf_count * 32`.
    fn tree_of_leaves(leaf_count: usize) -> Tree<usize> {
        Tree::from_vec(
            (0..leaf_count)
                .map(|slot| leaf(slot * BRANCHING_FACTOR..(slot + 1) * BRANCHING_FACTOR))
                .collect(),
        )
    }

    #[rstest]
    #[case(0, 1, 0)]
    #[case(31, 1, 0)]
    #[case(32, 1, 1)]
    #[case(1023, 1, 31)]
    #[case(1024, 2, 1)]
    #[case(1024, 1, 0)]
    fn test_child_index(#[case] index: usize, #[case] depth: usize, #[case] expected: usize) {
        assert_eq!(Tree::<()>::child_index(index, depth), expected);
    }

    #[rstest]
    fn test_get_descends_to_leaf() {
        let tree = tree_of_leaves(3);
        assert_eq!(*tree.get(0, 1), 0);
        assert_eq!(*tree.get(33, 1), 33);
        assert_eq!(*tree.get(95, 1), 95);
    }

    #[rstest]
    #[should_panic(expected = "trie corrupt")]
    fn test_get_past_children_panics() {
        let tree = tree_of_leaves(1);
        let _ = tree.get(64, 1);
    }

    #[rstest]
    fn test_set_shares_untouched_children() {
        let tree = tree_of_leaves(2);
        let updated = tree.set(40, 999, 1);

        assert_eq!(*updated.get(40, 1), 999);
        assert_eq!(*tree.get(40, 1), 40);

        let Node::Leaf(original_first) = &tree.children.as_slice()[0] else {
            panic!("expected a leaf");
        };
        let Node::Leaf(updated_first) = &updated.children.as_slice()[0] else {
            panic!("expected a leaf");
        };
        assert!(original_first.elements.ptr_eq(&updated_first.elements));
    }

    #[rstest]
    fn test_insert_tail_appends_leaf_at_depth_one() {
        let tree = tree_of_leaves(1);
        let tail = ArrayCell::from_vec((32..64).collect());
        let grown = tree.insert_tail(tail, 32, 1);

        assert_eq!(grown.len(), 2);
        assert_eq!(*grown.get(63, 1), 63);
        assert_eq!(tree.len(), 1);
    }

    #[rstest]
    fn test_insert_tail_builds_path_at_depth_two() {
        let root = Tree::from_vec(vec![Node::Tree(tree_of_leaves(32))]);
        let tail = ArrayCell::from_vec((1024..1056).collect());
        let grown = root.insert_tail(tail, 1024, 2);

        assert_eq!(grown.len(), 2);
        assert_eq!(*grown.get(1024, 2), 1024);
        assert_eq!(*grown.get(1055, 2), 1055);
        assert_eq!(*grown.get(5, 2), 5);
    }

    #[rstest]
    fn test_reductions_visit_in_order() {
        let tree = tree_of_leaves(2);

        let ascending = tree.reduce_left(Vec::new(), &mut |mut accumulator: Vec<usize>, element: &usize| {
            accumulator.push(*element);
            accumulator
        });
        let descending =
            tree.reduce_right(Vec::new(), &mut |element: &usize, mut accumulator: Vec<usize>| {
                accumulator.push(*element);
                accumulator
            });

        assert_eq!(ascending, (0..64).collect::<Vec<_>>());
        assert_eq!(descending, (0..64).rev().collect::<Vec<_>>());
    }

    #[rstest]
    fn test_reduce_leaves_counts_leaves() {
        let root = Tree::from_vec(vec![
            Node::Tree(tree_of_leaves(32)),
            Node::Tree(tree_of_leaves(3)),
        ]);
        let leaves = root.reduce_leaves(0, &mut |count, _leaf: &Leaf<usize>| count + 1);
        assert_eq!(leaves, 35);
    }

    #[rstest]
    fn test_iter_is_restartable() {
        let tree = tree_of_leaves(3);
        let first: Vec<usize> = tree.iter().copied().collect();
        let second: Vec<usize> = tree.iter().copied().collect();

        assert_eq!(first, (0..96).collect::<Vec<_>>());
        assert_eq!(first, second);
    }

    #[rstest]
    fn test_iter_over_empty_tree() {
        assert_eq!(Tree::<usize>::empty().iter().count(), 0);
    }

    #[rstest]
    fn test_as_tree() {
        let tree_node: Node<usize> = Node::Tree(Tree::empty());
        assert!(tree_node.as_tree().is_some());
        assert!(leaf(0..32).as_tree().is_none());
    }

    #[rstest]
    fn test_slice_at_drops_leaves_past_end() {
        let tree = tree_of_leaves(5);
        let sliced = tree.slice_at(1, 64);

        assert_eq!(sliced.len(), 2);
        assert_eq!(tree.len(), 5);
    }

    #[rstest]
    fn test_slice_at_then_hoist_collapses_a_level() {
        let root = Tree::from_vec(vec![
            Node::Tree(tree_of_leaves(32)),
            Node::Tree(tree_of_leaves(2)),
        ]);
        let sliced = root.slice_at(2, 1024);
        assert_eq!(sliced.len(), 1);

        let hoisted = sliced.hoist(2, 1);
        assert_eq!(hoisted.len(), 32);
        assert_eq!(*hoisted.get(1023, 1), 1023);
    }

    #[rstest]
    fn test_hoist_stops_at_leaves() {
        let tree = tree_of_leaves(1);
        let hoisted = tree.hoist(3, 1);
        assert!(hoisted.ptr_eq(&tree));
    }

    #[rstest]
    #[case(40, vec![32, 33, 34, 35, 36, 37, 38, 39])]
    #[case(64, vec![])]
    #[case(2, vec![0, 1])]
    fn test_fetch_new_tail(#[case] end_index: usize, #[case] expected: Vec<usize>) {
        let tree = tree_of_leaves(3);
        assert_eq!(tree.fetch_new_tail(end_index, 1).to_vec(), expected);
    }

    #[rstest]
    fn test_check_rejects_partial_leaf() {
        let tree = Tree::from_vec(vec![leaf(0..32), leaf(32..40)]);
        assert_eq!(
            tree.check_children(1, true),
            Err(StructureError::PartialLeaf { length: 8 })
        );
    }

    #[rstest]
    fn test_check_counts_elements() {
        assert_eq!(tree_of_leaves(4).check_children(1, true), Ok(128));
    }
}
