//! Mutable ordered map based on a Red-Black Tree.
//!
//! This module provides [`TreeMap`], an ordered map that keeps its keys
//! sorted and rebalances in place after every structural change.
//!
//! # Overview
//!
//! - O(log N) get
//! - O(log N) insert
//! - O(log N) remove
//! - O(1) len and `is_empty`
//! - O(N) ascending iteration
//!
//! # Examples
//!
//! ```rust
//! use rbmap::ordered::TreeMap;
//!
//! let mut map = TreeMap::new();
//! map.insert(3, "three");
//! map.insert(1, "one");
//! map.insert(2, "two");
//!
//! // Entries are always in sorted order
//! let keys: Vec<&i32> = map.keys().collect();
//! assert_eq!(keys, vec![&1, &2, &3]);
//!
//! assert!(map.remove(&2));
//! assert_eq!(map.len(), 2);
//! ```
//!
//! # Internal Structure
//!
//! Entries are stored in an arena and linked through slots. Each slot is
//! either empty or holds one entry, and each entry remembers the slot holding
//! it. The tree maintains the following invariants:
//! 1. Every entry is either red or black
//! 2. The root is black
//! 3. Red entries have only black children
//! 4. Every path from the root slot to an empty slot has the same number of
//!    black entries
//!
//! Fixups after insertion and removal walk upward in explicit loops.
//! Removing an entry with two children moves its in-order successor's key
//! and value into it, so the arena position of a given key is not stable
//! across removals.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::ops::Index;

use smallvec::SmallVec;

use super::arena::{Color, Entry, EntryArena, EntryIndex, Side, Slot, SlotRef};
use super::error::TreeMapError;

static_assertions::assert_impl_all!(TreeMap<String, i32>: Send, Sync, Default, Clone);
static_assertions::assert_impl_all!(Iter<'static, String, i32>: Send, Sync);

// =============================================================================
// TreeMap Definition
// =============================================================================

/// A mutable ordered map based on a Red-Black Tree.
///
/// Keys must implement `Ord`. The map keeps entries in ascending key order;
/// iteration, equality and hashing are all defined over that ascending
/// sequence of `(key, value)` pairs.
///
/// # Time Complexity
///
/// | Operation        | Complexity |
/// |------------------|------------|
/// | `new`            | O(1)       |
/// | `get`            | O(log N)   |
/// | `insert`         | O(log N)   |
/// | `remove`         | O(log N)   |
/// | `contains_key`   | O(log N)   |
/// | `contains_value` | O(N)       |
/// | `len`            | O(1)       |
/// | `is_empty`       | O(1)       |
///
/// # Examples
///
/// ```rust
/// use rbmap::ordered::TreeMap;
///
/// let mut map = TreeMap::new();
/// assert_eq!(map.insert("b", 2), None);
/// assert_eq!(map.insert("a", 1), None);
/// assert_eq!(map.insert("b", 20), Some(2));
///
/// let entries: Vec<(&&str, &i32)> = map.iter().collect();
/// assert_eq!(entries, vec![(&"a", &1), (&"b", &20)]);
/// ```
pub struct TreeMap<K, V> {
    /// Storage for every entry of the tree
    pub(super) arena: EntryArena<K, V>,
    /// The root slot
    pub(super) root: Slot,
    /// Number of entries
    pub(super) length: usize,
}

/// Outcome of descending the tree for a key.
enum Search {
    Found(EntryIndex),
    Vacant(SlotRef),
}

impl<K, V> TreeMap<K, V> {
    /// Creates a new empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let map: TreeMap<i32, String> = TreeMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            arena: EntryArena::new(),
            root: Slot::Empty,
            length: 0,
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Removes every entry from the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map: TreeMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.get(&3), None);
    /// ```
    pub fn clear(&mut self) {
        tracing::trace!(len = self.length, "clearing tree map");
        self.arena.clear();
        self.root = Slot::Empty;
        self.length = 0;
    }

    /// Returns an iterator over entries in ascending key order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let map: TreeMap<i32, &str> = [(3, "three"), (1, "one"), (2, "two")]
    ///     .into_iter()
    ///     .collect();
    ///
    /// for (key, value) in map.iter() {
    ///     println!("{key}: {value}");
    /// }
    /// ```
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            arena: &self.arena,
            walk: InOrder::new(&self.arena, self.root),
            remaining: self.length,
        }
    }

    /// Returns an iterator over keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values in ascending key order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let map: TreeMap<i32, i32> = [(1, 10), (2, 20), (3, 30)].into_iter().collect();
    /// let sum: i32 = map.values().sum();
    /// assert_eq!(sum, 60);
    /// ```
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Materializes the entries, in ascending key order, into an ordered
    /// sequence.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let map: TreeMap<char, i32> = [('b', 2), ('a', 1)].into_iter().collect();
    /// let mut entries = map.entry_sequence();
    /// assert_eq!(entries.pop_front(), Some((&'a', &1)));
    /// assert_eq!(entries.pop_front(), Some((&'b', &2)));
    /// assert!(entries.is_empty());
    /// ```
    #[must_use]
    pub fn entry_sequence(&self) -> VecDeque<(&K, &V)> {
        self.iter().collect()
    }

    /// Materializes the keys, in ascending order, into an ordered sequence.
    #[must_use]
    pub fn key_sequence(&self) -> VecDeque<&K> {
        self.keys().collect()
    }

    /// Materializes the values, in ascending key order, into an ordered
    /// sequence.
    #[must_use]
    pub fn value_sequence(&self) -> VecDeque<&V> {
        self.values().collect()
    }

    /// Returns `true` if some entry holds a value equal to `value`.
    ///
    /// # Complexity
    ///
    /// O(N)
    #[must_use]
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|candidate| candidate == value)
    }

    /// Returns `true` when `slot` holds a red entry. Empty slots are black.
    pub(super) fn is_red(&self, slot: Slot) -> bool {
        slot.entry()
            .is_some_and(|index| self.arena[index].is_red())
    }
}

impl<K: Ord, V> TreeMap<K, V> {
    // =========================================================================
    // Lookup
    // =========================================================================

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but the
    /// ordering on the borrowed form must match the ordering on the key type.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|index| &self.arena[index].value)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    ///
    /// Only the value can be changed this way; the key order is unaffected.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let index = self.find(key)?;
        Some(&mut self.arena[index].value)
    }

    /// Returns the value for `key`, or `default` when the key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert(1, 10);
    /// assert_eq!(map.get_or_default(&1, &0), &10);
    /// assert_eq!(map.get_or_default(&2, &0), &0);
    /// ```
    #[must_use]
    pub fn get_or_default<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Descends from the root slot, stopping at the entry for `key` or at
    /// the empty slot where it would be attached.
    fn search<Q>(&self, key: &Q) -> Search
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut at = SlotRef::Root;
        let mut slot = self.root;
        while let Slot::Occupied(index) = slot {
            let entry = &self.arena[index];
            let side = match key.cmp(entry.key.borrow()) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => return Search::Found(index),
            };
            at = SlotRef::Child {
                parent: index,
                side,
            };
            slot = entry.child(side);
        }
        Search::Vacant(at)
    }

    fn find<Q>(&self, key: &Q) -> Option<EntryIndex>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search(key) {
            Search::Found(index) => Some(index),
            Search::Vacant(_) => None,
        }
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contains the key, the value is replaced in place
    /// and the previous value is returned. Otherwise a new entry is created
    /// and `None` is returned.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// assert_eq!(map.insert(1, "one"), None);
    /// assert_eq!(map.insert(1, "ONE"), Some("one"));
    /// assert_eq!(map.get(&1), Some(&"ONE"));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.search(&key) {
            Search::Found(index) => Some(std::mem::replace(&mut self.arena[index].value, value)),
            Search::Vacant(at) => {
                self.attach(at, key, value);
                None
            }
        }
    }

    /// Inserts a key-value pair whose key may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`TreeMapError::InvalidKey`] when `key` is `None`. The map is
    /// not modified in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// assert_eq!(map.try_insert(Some(1), "one"), Ok(None));
    /// assert!(map.try_insert(None, "none").is_err());
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn try_insert(&mut self, key: Option<K>, value: V) -> Result<Option<V>, TreeMapError> {
        let key = require_key(key, "try_insert")?;
        Ok(self.insert(key, value))
    }

    /// Inserts `value` only when `key` is absent.
    ///
    /// Returns `None` when the pair was inserted, or the value already
    /// mapped by `key` (in which case `value` is dropped).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// assert_eq!(map.put_if_absent("a", 1), None);
    /// assert_eq!(map.put_if_absent("a", 2), Some(&1));
    /// assert_eq!(map.get("a"), Some(&1));
    /// ```
    pub fn put_if_absent(&mut self, key: K, value: V) -> Option<&V> {
        match self.search(&key) {
            Search::Found(index) => Some(&self.arena[index].value),
            Search::Vacant(at) => {
                self.attach(at, key, value);
                None
            }
        }
    }

    /// Inserts every pair yielded by `entries`, overwriting existing keys.
    pub fn put_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.insert(key, value);
        }
    }

    /// Places a new red entry into the empty slot `at` and rebalances.
    fn attach(&mut self, at: SlotRef, key: K, value: V) -> EntryIndex {
        let index = self.arena.allocate(Entry::new_red(key, value, at));
        self.set_slot(at, Slot::Occupied(index));
        self.length += 1;
        self.fix_after_insert(index);
        self.check_invariants();
        index
    }

    /// Restores the red-black invariants after `inserted` was attached red.
    fn fix_after_insert(&mut self, inserted: EntryIndex) {
        let mut current = inserted;
        loop {
            let SlotRef::Child { parent, .. } = self.arena[current].parent else {
                self.arena[current].color = Color::Black;
                return;
            };
            if !self.arena[parent].is_red() {
                return;
            }
            // A red parent is never the root, so the grandparent exists.
            let SlotRef::Child {
                parent: grandparent,
                side: parent_side,
            } = self.arena[parent].parent
            else {
                self.arena[parent].color = Color::Black;
                return;
            };

            let uncle = self.arena[grandparent].child(parent_side.opposite());
            if let Slot::Occupied(uncle) = uncle
                && self.arena[uncle].is_red()
            {
                self.arena[parent].color = Color::Black;
                self.arena[uncle].color = Color::Black;
                self.arena[grandparent].color = Color::Red;
                current = grandparent;
                continue;
            }

            let mut parent = parent;
            if self.side_of(current) == Some(parent_side.opposite()) {
                self.rotate(parent, parent_side);
                parent = current;
            }
            self.arena[parent].color = Color::Black;
            self.arena[grandparent].color = Color::Red;
            self.rotate(grandparent, parent_side.opposite());
            return;
        }
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes a key from the map.
    ///
    /// Returns `true` if the key was present.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert(1, "one");
    /// assert!(map.remove(&1));
    /// assert!(!map.remove(&1));
    /// assert!(map.is_empty());
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).is_some()
    }

    /// Removes a key from the map, returning the stored key and value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert("key".to_string(), 7);
    /// assert_eq!(map.remove_entry("key"), Some(("key".to_string(), 7)));
    /// assert_eq!(map.remove_entry("key"), None);
    /// ```
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let index = self.find(key)?;
        self.remove_at(index)
    }

    fn remove_at(&mut self, found: EntryIndex) -> Option<(K, V)> {
        let doomed = match self.arena[found].right {
            Slot::Occupied(right) => {
                let successor = self.leftmost(right);
                self.arena.swap_payloads(found, successor);
                successor
            }
            Slot::Empty => found,
        };
        let entry = self.detach(doomed)?;
        self.check_invariants();
        Some((entry.key, entry.value))
    }

    /// Unlinks `doomed`, which has at most one child, promoting that child
    /// into its slot.
    fn detach(&mut self, doomed: EntryIndex) -> Option<Entry<K, V>> {
        let entry = &self.arena[doomed];
        debug_assert!(entry.left.entry().is_none() || entry.right.entry().is_none());
        let child = match entry.left {
            Slot::Empty => entry.right,
            occupied @ Slot::Occupied(_) => occupied,
        };

        if !entry.is_red() {
            match child {
                // A black entry with a single child always has a red leaf.
                Slot::Occupied(child) => self.arena[child].color = Color::Black,
                Slot::Empty => self.fix_before_detach(doomed),
            }
        }

        let at = self.arena[doomed].parent;
        self.set_slot(at, child);
        self.length -= 1;
        self.arena.release(doomed)
    }

    /// Rebalances around the black leaf `doomed` so that unlinking it does
    /// not shorten any black path.
    fn fix_before_detach(&mut self, doomed: EntryIndex) {
        let mut current = doomed;
        while let SlotRef::Child { parent, side } = self.arena[current].parent {
            let Some(mut sibling) = self.arena[parent].child(side.opposite()).entry() else {
                debug_assert!(false, "black entry without a sibling");
                return;
            };

            if self.arena[sibling].is_red() {
                self.arena[sibling].color = Color::Black;
                self.arena[parent].color = Color::Red;
                self.rotate(parent, side);
                let Some(next) = self.arena[parent].child(side.opposite()).entry() else {
                    debug_assert!(false, "red sibling without black children");
                    return;
                };
                sibling = next;
            }

            let near = self.arena[sibling].child(side);
            let far = self.arena[sibling].child(side.opposite());
            if !self.is_red(near) && !self.is_red(far) {
                self.arena[sibling].color = Color::Red;
                if self.arena[parent].is_red() {
                    self.arena[parent].color = Color::Black;
                    return;
                }
                current = parent;
                continue;
            }

            if !self.is_red(far) {
                if let Slot::Occupied(near) = near {
                    self.arena[near].color = Color::Black;
                }
                self.arena[sibling].color = Color::Red;
                self.rotate(sibling, side.opposite());
                let Some(next) = self.arena[parent].child(side.opposite()).entry() else {
                    debug_assert!(false, "rotation lost the sibling");
                    return;
                };
                sibling = next;
            }

            let parent_color = self.arena[parent].color;
            self.arena[sibling].color = parent_color;
            self.arena[parent].color = Color::Black;
            if let Slot::Occupied(far) = self.arena[sibling].child(side.opposite()) {
                self.arena[far].color = Color::Black;
            }
            self.rotate(parent, side);
            return;
        }
    }

    fn leftmost(&self, mut index: EntryIndex) -> EntryIndex {
        while let Slot::Occupied(left) = self.arena[index].left {
            index = left;
        }
        index
    }

    // =========================================================================
    // Conditional Updates
    // =========================================================================

    /// Replaces the value for `key` only if the key is present, returning the
    /// previous value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// assert_eq!(map.replace(&1, "one"), None);
    /// assert!(map.is_empty());
    ///
    /// map.insert(1, "one");
    /// assert_eq!(map.replace(&1, "ONE"), Some("one"));
    /// ```
    pub fn replace<Q>(&mut self, key: &Q, value: V) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let index = self.find(key)?;
        Some(std::mem::replace(&mut self.arena[index].value, value))
    }

    /// Replaces the value for `key` only if it currently equals `expected`.
    ///
    /// Returns `true` when the value was replaced.
    pub fn replace_if_equal<Q>(&mut self, key: &Q, expected: &V, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        V: PartialEq,
    {
        match self.get_mut(key) {
            Some(current) if *current == *expected => {
                *current = value;
                true
            }
            _ => false,
        }
    }

    /// Replaces every value with `function(key, value)`, visiting entries in
    /// ascending key order.
    ///
    /// Keys and tree shape are left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map: TreeMap<i32, i32> = [(1, 10), (2, 20)].into_iter().collect();
    /// map.replace_all(|key, value| key + value);
    /// assert_eq!(map.get(&1), Some(&11));
    /// assert_eq!(map.get(&2), Some(&22));
    /// ```
    pub fn replace_all<F>(&mut self, mut function: F)
    where
        F: FnMut(&K, &V) -> V,
    {
        let mut walk = InOrder::new(&self.arena, self.root);
        while let Some(index) = walk.next(&self.arena) {
            let entry = &self.arena[index];
            let value = function(&entry.key, &entry.value);
            self.arena[index].value = value;
        }
    }

    /// Computes a new mapping for `key` from its current value, if any.
    ///
    /// `remapping` receives the key and the current value (`None` when
    /// unmapped). Returning `Some` inserts or overwrites; returning `None`
    /// removes an existing mapping. The resulting value is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut counts: TreeMap<&str, u32> = TreeMap::new();
    /// for word in ["a", "b", "a"] {
    ///     counts.compute(word, |_, count| Some(count.map_or(1, |count| count + 1)));
    /// }
    /// assert_eq!(counts.get("a"), Some(&2));
    ///
    /// assert_eq!(counts.compute("a", |_, _| None), None);
    /// assert!(!counts.contains_key("a"));
    /// ```
    pub fn compute<F>(&mut self, key: K, remapping: F) -> Option<&V>
    where
        F: FnOnce(&K, Option<&V>) -> Option<V>,
    {
        match self.search(&key) {
            Search::Found(index) => {
                let entry = &self.arena[index];
                let remapped = remapping(&entry.key, Some(&entry.value));
                self.store_or_remove(index, remapped)
            }
            Search::Vacant(at) => {
                let value = remapping(&key, None)?;
                let index = self.attach(at, key, value);
                Some(&self.arena[index].value)
            }
        }
    }

    /// Computes a value for `key` only when it is absent.
    ///
    /// `mapping` is not called when the key is present. Returns the present
    /// or newly inserted value, or `None` if `mapping` produced nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map: TreeMap<i32, String> = TreeMap::new();
    /// let value = map.compute_if_absent(3, |key| Some(key.to_string()));
    /// assert_eq!(value, Some(&"3".to_string()));
    ///
    /// let value = map.compute_if_absent(3, |_| unreachable!());
    /// assert_eq!(value, Some(&"3".to_string()));
    /// ```
    pub fn compute_if_absent<F>(&mut self, key: K, mapping: F) -> Option<&V>
    where
        F: FnOnce(&K) -> Option<V>,
    {
        match self.search(&key) {
            Search::Found(index) => Some(&self.arena[index].value),
            Search::Vacant(at) => {
                let value = mapping(&key)?;
                let index = self.attach(at, key, value);
                Some(&self.arena[index].value)
            }
        }
    }

    /// Like [`compute_if_absent`](Self::compute_if_absent), for a key that
    /// may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`TreeMapError::InvalidKey`] when `key` is `None`, without
    /// calling `mapping` or modifying the map.
    pub fn try_compute_if_absent<F>(
        &mut self,
        key: Option<K>,
        mapping: F,
    ) -> Result<Option<&V>, TreeMapError>
    where
        F: FnOnce(&K) -> Option<V>,
    {
        let key = require_key(key, "try_compute_if_absent")?;
        Ok(self.compute_if_absent(key, mapping))
    }

    /// Computes a new value for `key` only when it is present.
    ///
    /// Returning `None` from `remapping` removes the mapping.
    pub fn compute_if_present<Q, F>(&mut self, key: &Q, remapping: F) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnOnce(&K, &V) -> Option<V>,
    {
        let index = self.find(key)?;
        let entry = &self.arena[index];
        let remapped = remapping(&entry.key, &entry.value);
        self.store_or_remove(index, remapped)
    }

    /// Merges `value` into the mapping for `key`.
    ///
    /// An absent key is simply inserted. A present key stores
    /// `remapping(current, value)`, or is removed when that returns `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// assert_eq!(map.merge("a", 1, |old, new| Some(old + new)), Some(&1));
    /// assert_eq!(map.merge("a", 5, |old, new| Some(old + new)), Some(&6));
    /// assert_eq!(map.merge("a", 0, |_, _| None), None);
    /// assert!(map.is_empty());
    /// ```
    pub fn merge<F>(&mut self, key: K, value: V, remapping: F) -> Option<&V>
    where
        F: FnOnce(&V, V) -> Option<V>,
    {
        match self.search(&key) {
            Search::Found(index) => {
                let merged = remapping(&self.arena[index].value, value);
                self.store_or_remove(index, merged)
            }
            Search::Vacant(at) => {
                let index = self.attach(at, key, value);
                Some(&self.arena[index].value)
            }
        }
    }

    fn store_or_remove(&mut self, index: EntryIndex, value: Option<V>) -> Option<&V> {
        if let Some(value) = value {
            self.arena[index].value = value;
            Some(&self.arena[index].value)
        } else {
            self.remove_at(index);
            None
        }
    }

    // =========================================================================
    // Structural Primitives
    // =========================================================================

    /// Rotates the subtree rooted at `pivot` toward `direction`.
    ///
    /// The child on the opposite side rises into `pivot`'s slot and `pivot`
    /// becomes its `direction` child. Keys are never touched.
    fn rotate(&mut self, pivot: EntryIndex, direction: Side) {
        let Slot::Occupied(riser) = self.arena[pivot].child(direction.opposite()) else {
            debug_assert!(false, "rotation without a child to raise");
            return;
        };
        let inner = self.arena[riser].child(direction);
        let pivot_slot = self.arena[pivot].parent;

        self.set_slot(
            SlotRef::Child {
                parent: pivot,
                side: direction.opposite(),
            },
            inner,
        );
        self.set_slot(pivot_slot, Slot::Occupied(riser));
        self.set_slot(
            SlotRef::Child {
                parent: riser,
                side: direction,
            },
            Slot::Occupied(pivot),
        );
    }

    /// Fills the slot `at` with `content`, keeping the back-reference of the
    /// moved entry in sync.
    fn set_slot(&mut self, at: SlotRef, content: Slot) {
        match at {
            SlotRef::Root => self.root = content,
            SlotRef::Child { parent, side } => *self.arena[parent].child_mut(side) = content,
        }
        if let Slot::Occupied(index) = content {
            self.arena[index].parent = at;
        }
    }

    fn side_of(&self, index: EntryIndex) -> Option<Side> {
        match self.arena[index].parent {
            SlotRef::Root => None,
            SlotRef::Child { side, .. } => Some(side),
        }
    }

    /// Debug builds always check the root; `invariant-checks` adds a full
    /// [`validate`](Self::validate) after every mutation.
    #[inline]
    fn check_invariants(&self) {
        debug_assert!(
            !self.is_red(self.root)
                && self
                    .root
                    .entry()
                    .is_none_or(|root| self.arena[root].parent == SlotRef::Root),
            "tree map invariant violated: root entry is red or detached"
        );
        #[cfg(all(debug_assertions, feature = "invariant-checks"))]
        if let Err(violation) = self.validate() {
            tracing::error!(%violation, len = self.length, "tree map invariant violated");
            panic!("tree map invariant violated: {violation}");
        }
    }
}

fn require_key<K>(key: Option<K>, operation: &'static str) -> Result<K, TreeMapError> {
    key.ok_or_else(|| {
        tracing::debug!(operation, "rejected absent key");
        TreeMapError::InvalidKey { operation }
    })
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// Explicit-stack in-order walk over entry indices.
#[derive(Clone, Debug)]
struct InOrder {
    stack: SmallVec<[EntryIndex; 32]>,
}

impl InOrder {
    fn new<K, V>(arena: &EntryArena<K, V>, root: Slot) -> Self {
        let mut walk = Self {
            stack: SmallVec::new(),
        };
        walk.descend_left(arena, root);
        walk
    }

    fn descend_left<K, V>(&mut self, arena: &EntryArena<K, V>, mut slot: Slot) {
        while let Slot::Occupied(index) = slot {
            self.stack.push(index);
            slot = arena[index].left;
        }
    }

    fn next<K, V>(&mut self, arena: &EntryArena<K, V>) -> Option<EntryIndex> {
        let index = self.stack.pop()?;
        self.descend_left(arena, arena[index].right);
        Some(index)
    }
}

/// An iterator over key-value pairs of a [`TreeMap`], in ascending key order.
pub struct Iter<'a, K, V> {
    arena: &'a EntryArena<K, V>,
    walk: InOrder,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let arena = self.arena;
        let index = self.walk.next(arena)?;
        self.remaining = self.remaining.saturating_sub(1);
        let entry = &arena[index];
        Some((&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena,
            walk: self.walk.clone(),
            remaining: self.remaining,
        }
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// An owning iterator over key-value pairs of a [`TreeMap`], in ascending
/// key order.
pub struct IntoIter<K, V> {
    arena: EntryArena<K, V>,
    walk: InOrder,
    remaining: usize,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.walk.next(&self.arena)?;
        self.remaining = self.remaining.saturating_sub(1);
        let entry = self.arena.release(index)?;
        Some((entry.key, entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Default for TreeMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Clones by re-inserting every pair into a fresh map.
///
/// The clone is balanced independently: it holds the same ascending
/// `(key, value)` sequence as the source, not necessarily the same shape.
impl<K: Ord + Clone, V: Clone> Clone for TreeMap<K, V> {
    fn clone(&self) -> Self {
        tracing::trace!(len = self.length, "rebuilding tree map clone");
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for TreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.put_all(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for TreeMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.put_all(iter);
    }
}

impl<K, V> IntoIterator for TreeMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let walk = InOrder::new(&self.arena, self.root);
        IntoIter {
            arena: self.arena,
            walk,
            remaining: self.length,
        }
    }
}

impl<'a, K, V> IntoIterator for &'a TreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, Q, V> Index<&Q> for TreeMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

/// Two maps are equal when they hold the same ascending sequence of
/// `(key, value)` pairs, regardless of tree shape.
impl<K: PartialEq, V: PartialEq> PartialEq for TreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for TreeMap<K, V> {}

/// Hashes the length, then each `(key, value)` pair in ascending key order,
/// so equal maps hash equally whatever their insertion history.
impl<K: Hash, V: Hash> Hash for TreeMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for (key, value) in self {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TreeMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for TreeMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for (key, value) in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.clone()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
