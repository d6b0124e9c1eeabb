//! Entry storage for [`TreeMap`](super::TreeMap).
//!
//! Entries live in a flat arena and refer to each other through
//! [`EntryIndex`] values instead of pointers, so parent back-references
//! never form ownership cycles. A vacated index is recycled by the next
//! allocation.

use std::ops::{Index, IndexMut};

// =============================================================================
// Color / Side
// =============================================================================

/// The color of a red-black tree entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Which child slot of an entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

// =============================================================================
// Slot Definitions
// =============================================================================

/// Position of an entry inside the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct EntryIndex(usize);

/// Attachment point of a subtree: empty, or holding exactly one entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(crate) enum Slot {
    #[default]
    Empty,
    Occupied(EntryIndex),
}

impl Slot {
    /// Returns the entry held by this slot, if any.
    pub(crate) const fn entry(self) -> Option<EntryIndex> {
        match self {
            Self::Empty => None,
            Self::Occupied(index) => Some(index),
        }
    }
}

/// Identity of a slot: the map's root slot, or one child slot of an entry.
///
/// Every entry records the `SlotRef` holding it, which is how fixups walk
/// upward and learn whether an entry is a left or a right child.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum SlotRef {
    Root,
    Child { parent: EntryIndex, side: Side },
}

// =============================================================================
// Entry Definition
// =============================================================================

/// A key/value pair with its color, child slots and parent back-reference.
#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) color: Color,
    pub(crate) left: Slot,
    pub(crate) right: Slot,
    pub(crate) parent: SlotRef,
}

impl<K, V> Entry<K, V> {
    /// Creates a new red entry with empty child slots.
    pub(crate) const fn new_red(key: K, value: V, parent: SlotRef) -> Self {
        Self {
            key,
            value,
            color: Color::Red,
            left: Slot::Empty,
            right: Slot::Empty,
            parent,
        }
    }

    pub(crate) fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    pub(crate) const fn child(&self, side: Side) -> Slot {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub(crate) const fn child_mut(&mut self, side: Side) -> &mut Slot {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

// =============================================================================
// Arena
// =============================================================================

/// Arena owning every entry of a tree.
#[derive(Debug)]
pub(crate) struct EntryArena<K, V> {
    entries: Vec<Option<Entry<K, V>>>,
    vacant: Vec<EntryIndex>,
}

impl<K, V> EntryArena<K, V> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Stores `entry`, reusing a vacated index when one is available.
    pub(crate) fn allocate(&mut self, entry: Entry<K, V>) -> EntryIndex {
        if let Some(index) = self.vacant.pop() {
            self.entries[index.0] = Some(entry);
            index
        } else {
            self.entries.push(Some(entry));
            EntryIndex(self.entries.len() - 1)
        }
    }

    /// Removes the entry at `index` and hands ownership back to the caller.
    pub(crate) fn release(&mut self, index: EntryIndex) -> Option<Entry<K, V>> {
        let entry = self.entries.get_mut(index.0)?.take()?;
        self.vacant.push(index);
        Some(entry)
    }

    /// Exchanges the key and value of two distinct live entries, leaving
    /// colors and links in place.
    pub(crate) fn swap_payloads(&mut self, first: EntryIndex, second: EntryIndex) {
        if let Ok([Some(first), Some(second)]) =
            self.entries.get_disjoint_mut([first.0, second.0])
        {
            std::mem::swap(&mut first.key, &mut second.key);
            std::mem::swap(&mut first.value, &mut second.value);
        } else {
            debug_assert!(false, "payload swap between {first:?} and {second:?}");
        }
    }

    /// Number of live entries.
    pub(crate) fn live(&self) -> usize {
        self.entries.len() - self.vacant.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.vacant.clear();
    }
}

impl<K, V> Index<EntryIndex> for EntryArena<K, V> {
    type Output = Entry<K, V>;

    fn index(&self, index: EntryIndex) -> &Self::Output {
        match self.entries.get(index.0) {
            Some(Some(entry)) => entry,
            _ => panic!("vacant entry index {index:?}"),
        }
    }
}

impl<K, V> IndexMut<EntryIndex> for EntryArena<K, V> {
    fn index_mut(&mut self, index: EntryIndex) -> &mut Self::Output {
        match self.entries.get_mut(index.0) {
            Some(Some(entry)) => entry,
            _ => panic!("vacant entry index {index:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_allocate_reuses_released_index() {
        let mut arena = EntryArena::new();
        let first = arena.allocate(Entry::new_red(1, "one", SlotRef::Root));
        let second = arena.allocate(Entry::new_red(2, "two", SlotRef::Root));
        assert_ne!(first, second);

        let released = arena.release(first).map(|entry| (entry.key, entry.value));
        assert_eq!(released, Some((1, "one")));
        assert_eq!(arena.live(), 1);

        let third = arena.allocate(Entry::new_red(3, "three", SlotRef::Root));
        assert_eq!(third, first);
        assert_eq!(arena[third].key, 3);
        assert_eq!(arena.live(), 2);
    }

    #[rstest]
    fn test_release_twice_returns_none() {
        let mut arena = EntryArena::new();
        let index = arena.allocate(Entry::new_red(1, 1, SlotRef::Root));
        assert!(arena.release(index).is_some());
        assert!(arena.release(index).is_none());
        assert_eq!(arena.live(), 0);
    }

    #[rstest]
    fn test_swap_payloads_keeps_links() {
        let mut arena = EntryArena::new();
        let first = arena.allocate(Entry::new_red("a", 1, SlotRef::Root));
        let second = arena.allocate(Entry::new_red(
            "b",
            2,
            SlotRef::Child {
                parent: first,
                side: Side::Right,
            },
        ));
        arena[first].right = Slot::Occupied(second);
        arena[first].color = Color::Black;

        arena.swap_payloads(first, second);

        assert_eq!((arena[first].key, arena[first].value), ("b", 2));
        assert_eq!((arena[second].key, arena[second].value), ("a", 1));
        assert_eq!(arena[first].color, Color::Black);
        assert_eq!(arena[first].right, Slot::Occupied(second));
        assert_eq!(
            arena[second].parent,
            SlotRef::Child {
                parent: first,
                side: Side::Right
            }
        );
    }

    #[rstest]
    #[case::left(Side::Left, Side::Right)]
    #[case::right(Side::Right, Side::Left)]
    fn test_side_opposite(#[case] side: Side, #[case] expected: Side) {
        assert_eq!(side.opposite(), expected);
        assert_eq!(side.opposite().opposite(), side);
    }

    #[rstest]
    fn test_slot_entry() {
        assert_eq!(Slot::Empty.entry(), None);
        assert_eq!(Slot::default(), Slot::Empty);
        let index = EntryIndex(7);
        assert_eq!(Slot::Occupied(index).entry(), Some(index));
    }
}
