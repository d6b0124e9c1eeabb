//! Error types for the ordered collections.

use thiserror::Error;

/// Errors returned by fallible [`TreeMap`](super::TreeMap) operations.
///
/// A missing key is never an error: lookups and removals report absence
/// through `Option` or `bool`.
///
/// # Examples
///
/// ```rust
/// use rbmap::ordered::{TreeMap, TreeMapError};
///
/// let mut map: TreeMap<String, i32> = TreeMap::new();
/// let result = map.try_insert(None, 1);
/// assert_eq!(result, Err(TreeMapError::InvalidKey { operation: "try_insert" }));
/// assert!(map.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeMapError {
    /// An absent key was passed to an operation that would create a mapping.
    #[error("{operation}: cannot map an absent key")]
    InvalidKey {
        /// The name of the rejected operation.
        operation: &'static str,
    },
}

/// A broken red-black or bookkeeping invariant, as reported by
/// [`TreeMap::validate`](super::TreeMap::validate).
///
/// Any of these indicates a logic bug in the map, never bad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The root entry is red.
    #[error("root entry is red")]
    RedRoot,
    /// A red entry has a red parent.
    #[error("red entry has a red parent")]
    RedEntryWithRedParent,
    /// Two paths from the same slot pass through different numbers of
    /// black entries.
    #[error("black height mismatch: expected {expected}, found {found}")]
    BlackHeightMismatch {
        /// Black height of the left subtree.
        expected: usize,
        /// Black height of the right subtree.
        found: usize,
    },
    /// In-order traversal does not yield strictly ascending keys.
    #[error("keys are not in strictly ascending order")]
    OrderViolation,
    /// An entry's parent back-reference does not name the slot holding it.
    #[error("entry parent link does not match its slot")]
    BrokenParentLink,
    /// The recorded length disagrees with the number of reachable entries.
    #[error("length mismatch: recorded {recorded}, counted {counted}")]
    LengthMismatch {
        /// The incrementally maintained length.
        recorded: usize,
        /// The number of entries found by traversal.
        counted: usize,
    },
}
