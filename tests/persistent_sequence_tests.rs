//! Integration tests for PersistentSequence.
//!
//! Organized by operation: construction, access and update, push, append
//! and slicing. Every produced sequence is also run through `validate`.

#![allow(clippy::cast_possible_wrap)]

use persistent_sequence::persistent::{PersistentSequence, StructureError, translate_index};
use rstest::rstest;

fn identity(length: usize) -> PersistentSequence<usize> {
    PersistentSequence::initialize(length as isize, |index: usize| index)
}

fn range(start: usize, end: usize) -> Vec<usize> {
    (start..end).collect()
}

// =============================================================================
// Construction
// =============================================================================

#[rstest]
fn test_initialize_six() {
    let sequence = PersistentSequence::initialize(6, |index: usize| index);
    assert_eq!(sequence.to_vec(), vec![0, 1, 2, 3, 4, 5]);
}

#[rstest]
fn test_from_empty_slice_is_empty() {
    let sequence: PersistentSequence<i32> = PersistentSequence::from_slice(&[]);
    assert!(sequence.is_empty());
    assert_eq!(sequence.len(), 0);
    assert_eq!(sequence.get(0), None);
}

#[rstest]
fn test_default_new_and_empty_agree() {
    let defaulted: PersistentSequence<i32> = PersistentSequence::default();
    assert_eq!(defaulted, PersistentSequence::new());
    assert_eq!(defaulted, PersistentSequence::empty());
}

#[rstest]
#[case(31, 1)]
#[case(32, 1)]
#[case(33, 1)]
#[case(1023, 1)]
#[case(1024, 1)]
#[case(1025, 1)]
#[case(1056, 2)]
#[case(32768, 2)]
#[case(32800, 3)]
#[case(32801, 3)]
fn test_depth_boundaries(#[case] length: usize, #[case] depth: usize) {
    let initialized = identity(length);
    let pushed = (0..length).fold(PersistentSequence::new(), |sequence, index| {
        sequence.push(index)
    });

    assert_eq!(initialized.depth(), depth);
    assert_eq!(pushed.depth(), depth);
    assert_eq!(initialized, pushed);
    assert_eq!(initialized.validate(), Ok(()));
    assert_eq!(pushed.validate(), Ok(()));
    assert_eq!(initialized.last(), Some(&(length - 1)));
}

#[rstest]
fn test_collect_and_from_vec() {
    let collected: PersistentSequence<String> = (0..50).map(|index| index.to_string()).collect();
    let converted = PersistentSequence::from(collected.to_vec());

    assert_eq!(collected, converted);
    assert_eq!(collected.get(49).map(String::as_str), Some("49"));
}

#[rstest]
fn test_try_initialize_propagates_error() {
    let result: Result<PersistentSequence<u8>, String> =
        PersistentSequence::try_initialize(300, |index: usize| {
            u8::try_from(index).map_err(|error| format!("index {index}: {error}"))
        });
    assert!(result.is_err_and(|message| message.starts_with("index 256")));
}

// =============================================================================
// Access and Update
// =============================================================================

#[rstest]
fn test_set_twenty() {
    let sequence = identity(20);
    let updated = sequence.set(10, 999);
    let elements = updated.to_vec();

    assert_eq!(elements[10], 999);
    for (index, element) in elements.iter().enumerate() {
        if index != 10 {
            assert_eq!(*element, index);
        }
    }
}

#[rstest]
#[case(0)]
#[case(20)]
#[case(usize::MAX)]
fn test_set_out_of_range_keeps_value(#[case] offset: usize) {
    let sequence = identity(20);
    let index = 20usize.saturating_add(offset);
    let updated = sequence.set(index, 999);

    assert_eq!(updated, sequence);
    assert!(updated.ptr_eq(&sequence));
}

#[rstest]
fn test_set_deep_trie() {
    let sequence = identity(40_000);
    let updated = [0, 1023, 1024, 32767, 32768, 39_999]
        .into_iter()
        .fold(sequence.clone(), |sequence, index| sequence.set(index, 0));

    for index in [1023, 1024, 32767, 32768, 39_999] {
        assert_eq!(updated.get(index), Some(&0));
        assert_eq!(sequence.get(index), Some(&index));
    }
    assert_eq!(updated.validate(), Ok(()));
}

// =============================================================================
// Push
// =============================================================================

#[rstest]
fn test_push_thirty_three() {
    let sequence = (0..33).fold(PersistentSequence::new(), |sequence, index| {
        sequence.push(index)
    });

    assert_eq!(sequence.len(), 33);
    assert_eq!(sequence.get(32), Some(&32));
    assert_eq!(sequence.depth(), 1);
}

#[rstest]
fn test_push_branches_share_history() {
    let base = identity(100);
    let left = base.push(1000);
    let right = base.push(2000);

    assert_eq!(base.len(), 100);
    assert_eq!(left.last(), Some(&1000));
    assert_eq!(right.last(), Some(&2000));
    assert_eq!(left.slice_right(100), base);
}

// =============================================================================
// Append
// =============================================================================

#[rstest]
fn test_append_fifty_and_ten() {
    let appended = identity(50).append(&identity(10));
    let mut expected = range(0, 50);
    expected.extend(range(0, 10));

    assert_eq!(appended.len(), 60);
    assert_eq!(appended.to_vec(), expected);
}

#[rstest]
#[case(0, 0)]
#[case(1, 1)]
#[case(31, 97)]
#[case(32, 128)]
#[case(33, 129)]
#[case(100, 500)]
#[case(1000, 128)]
#[case(1000, 1000)]
#[case(1055, 1)]
#[case(32_760, 100)]
fn test_append_strategies_agree(#[case] left_length: usize, #[case] right_length: usize) {
    let left = identity(left_length);
    let right: PersistentSequence<usize> = (left_length..left_length + right_length).collect();
    let appended = left.append(&right);

    assert_eq!(appended.len(), left_length + right_length);
    assert_eq!(appended.to_vec(), range(0, left_length + right_length));
    assert_eq!(appended.validate(), Ok(()));
    assert_eq!(left.len(), left_length);
    assert_eq!(right.len(), right_length);
}

#[rstest]
fn test_append_empty_sides_share() {
    let sequence = identity(70);
    let empty = PersistentSequence::new();

    assert!(sequence.append(&empty).ptr_eq(&sequence));
    assert!(empty.append(&sequence).ptr_eq(&sequence));
}

// =============================================================================
// Slicing
// =============================================================================

#[rstest]
fn test_slice_right_forty() {
    assert_eq!(identity(100).slice_right(40).to_vec(), range(0, 40));
}

#[rstest]
#[case(100, 0)]
#[case(100, 1)]
#[case(100, 32)]
#[case(100, 64)]
#[case(100, 99)]
#[case(1100, 1055)]
#[case(1100, 1056)]
#[case(33_000, 1025)]
#[case(33_000, 32_769)]
fn test_slice_right_prefix(#[case] length: usize, #[case] end: usize) {
    let sliced = identity(length).slice_right(end as isize);
    assert_eq!(sliced.to_vec(), range(0, end));
    assert_eq!(sliced.validate(), Ok(()));
}

#[rstest]
#[case(100, 0)]
#[case(100, 1)]
#[case(100, 31)]
#[case(100, 96)]
#[case(1100, 1055)]
#[case(33_000, 31)]
#[case(33_000, 32_769)]
fn test_slice_left_suffix(#[case] length: usize, #[case] start: usize) {
    let sliced = identity(length).slice_left(start as isize);
    assert_eq!(sliced.to_vec(), range(start, length));
    assert_eq!(sliced.validate(), Ok(()));
    assert_eq!(sliced.first(), Some(&start));
}

#[rstest]
#[case(-1, 99)]
#[case(-40, 60)]
#[case(-100, 0)]
#[case(-1000, 0)]
#[case(1000, 100)]
fn test_slice_right_translates(#[case] end: isize, #[case] expected_length: usize) {
    let sliced = identity(100).slice_right(end);
    assert_eq!(sliced.len(), expected_length);
    assert_eq!(sliced.len(), translate_index(end, 100));
}

#[rstest]
fn test_slice_middle() {
    let sliced = identity(5000).slice(1000, -1000);
    assert_eq!(sliced.to_vec(), range(1000, 4000));
    assert_eq!(sliced.validate(), Ok(()));
}

#[rstest]
fn test_sliced_sequence_keeps_growing() {
    let sliced = identity(2000).slice(33, 1100);
    let grown = (1100..3000).fold(sliced, |sequence, index| sequence.push(index));

    assert_eq!(grown.to_vec(), range(33, 3000));
    assert_eq!(grown.validate(), Ok(()));
}

// =============================================================================
// Traversal
// =============================================================================

#[rstest]
fn test_iteration_and_reductions_agree() {
    let sequence = identity(1100);
    let sum_iter: usize = sequence.iter().sum();
    let sum_left = sequence.reduce_left(0, |accumulator, element| accumulator + element);
    let sum_right = sequence.reduce_right(0, |element, accumulator| accumulator + element);
    let sum_owned: usize = sequence.clone().into_iter().sum();

    assert_eq!(sum_iter, range(0, 1100).iter().sum::<usize>());
    assert_eq!(sum_left, sum_iter);
    assert_eq!(sum_right, sum_iter);
    assert_eq!(sum_owned, sum_iter);
}

#[rstest]
fn test_for_loop_over_reference() {
    let sequence: PersistentSequence<i32> = (1..=3).collect();
    let mut visited = Vec::new();
    for element in &sequence {
        visited.push(*element);
    }
    assert_eq!(visited, vec![1, 2, 3]);
}

#[rstest]
fn test_structure_error_display() {
    let error = StructureError::LengthMismatch {
        recorded: 3,
        counted: 2,
    };
    assert!(!error.to_string().is_empty());
}
