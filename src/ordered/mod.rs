//! Mutable ordered collections.
//!
//! This module provides [`TreeMap`], an ordered map backed by a red-black
//! tree whose entries live in an index-addressed arena:
//!
//! - [`TreeMap`]: ordered map with O(log N) point operations
//! - [`Iter`] / [`IntoIter`]: ascending iterators over its entries
//! - [`TreeMapError`]: errors of the fallible operations
//! - [`InvariantViolation`]: structural problems reported by
//!   [`TreeMap::validate`]
//!
//! # Examples
//!
//! ```rust
//! use rbmap::ordered::TreeMap;
//!
//! let mut map = TreeMap::new();
//! map.insert("a", 1);
//! map.insert("b", 2);
//! map.insert("c", 3);
//!
//! let keys: Vec<&&str> = map.keys().collect();
//! assert_eq!(keys, vec![&"a", &"b", &"c"]);
//!
//! map.remove("b");
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.key_sequence(), [&"a", &"c"]);
//! ```

mod arena;
mod error;
mod invariants;
mod treemap;

pub use error::InvariantViolation;
pub use error::TreeMapError;
pub use treemap::IntoIter;
pub use treemap::Iter;
pub use treemap::TreeMap;
