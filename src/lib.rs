//! # rbmap
//!
//! A mutable ordered map for Rust, backed by an arena-allocated red-black
//! tree.
//!
//! ## Overview
//!
//! - **`TreeMap`**: keys kept in ascending order, O(log N) insert, lookup
//!   and removal, O(1) length
//! - **Derived operations**: `compute`, `merge`, `put_if_absent`,
//!   `replace_all` and friends built on the core search, insert and remove
//! - **Views**: ascending iterators and materialized ordered sequences
//! - **Validation**: `TreeMap::validate` checks every red-black invariant
//!
//! ## Feature Flags
//!
//! - `ordered`: the ordered collections (enabled by default)
//! - `invariant-checks`: validate the whole tree after every mutation in
//!   debug builds
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use rbmap::prelude::*;
//!
//! let mut map = TreeMap::new();
//! map.insert(2, "two");
//! map.insert(1, "one");
//! assert_eq!(map.iter().next(), Some((&1, &"one")));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types.
///
/// # Usage
///
/// ```rust
/// use rbmap::prelude::*;
/// ```
pub mod prelude {

    #[cfg(feature = "ordered")]
    pub use crate::ordered::*;
}

#[cfg(feature = "ordered")]
pub mod ordered;
