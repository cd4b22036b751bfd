//! # persistent-sequence
//!
//! A persistent (immutable) indexed sequence with structural sharing.
//!
//! ## Overview
//!
//! [`PersistentSequence`](persistent::PersistentSequence) is a 32-way
//! bit-partitioned trie with a tail buffer, comparable to Clojure's
//! `PersistentVector`. Every operation returns a new value and leaves the
//! original untouched:
//!
//! - O(log32 N) random access and update
//! - amortized O(1) `push`
//! - concatenation through one of two strategies picked by appendix size
//! - prefix and suffix slicing that reuse untouched leaves
//!
//! ## Feature Flags
//!
//! - `arc` (default): share nodes through `Arc` so sequences are `Send + Sync`
//! - `serde`: `Serialize` / `Deserialize` as a plain sequence
//! - `tracing`: structured `trace` events for depth growth and rebuilds
//! - `full`: enable all features
//!
//! ## Example
//!
//! ```rust
//! use persistent_sequence::prelude::*;
//!
//! let sequence = PersistentSequence::initialize(6, |index: usize| index);
//! assert_eq!(sequence.to_vec(), vec![0, 1, 2, 3, 4, 5]);
//!
//! let updated = sequence.set(2, 42);
//! assert_eq!(sequence.get(2), Some(&2));
//! assert_eq!(updated.get(2), Some(&42));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Emits a structured `trace` event when the `tracing` feature is enabled.
///
/// Expands to nothing otherwise, so call sites stay free of `cfg` noise.
macro_rules! trace_event {
    ($($argument:tt)*) => {
        #[cfg(feature = "tracing")]
        {
            tracing::trace!($($argument)*);
        }
    };
}

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use persistent_sequence::prelude::*;
/// ```
pub mod prelude {
    pub use crate::persistent::*;
}

pub mod persistent;
