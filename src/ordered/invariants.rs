//! Structural validation for [`TreeMap`].

use super::TreeMap;
use super::arena::{Side, Slot, SlotRef};
use super::error::InvariantViolation;

impl<K: Ord, V> TreeMap<K, V> {
    /// Checks every red-black and bookkeeping invariant of the tree.
    ///
    /// Verifies that the root is black, that no red entry has a red child,
    /// that black height is uniform, that keys ascend strictly in order,
    /// that each entry's parent link names the slot holding it, and that the
    /// recorded length matches the reachable entries.
    ///
    /// This walks the whole tree; it is meant for tests and debugging. With
    /// the `invariant-checks` feature, debug builds run it after every
    /// mutation.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::ordered::TreeMap;
    ///
    /// let mut map: TreeMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
    /// for key in (0..100).step_by(3) {
    ///     map.remove(&key);
    /// }
    /// assert_eq!(map.validate(), Ok(()));
    /// ```
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.is_red(self.root) {
            return Err(InvariantViolation::RedRoot);
        }

        let mut counted = 0;
        self.black_height(self.root, SlotRef::Root, &mut counted)?;
        if counted != self.length || self.arena.live() != self.length {
            return Err(InvariantViolation::LengthMismatch {
                recorded: self.length,
                counted,
            });
        }

        let mut previous: Option<&K> = None;
        for key in self.keys() {
            if previous.is_some_and(|previous| previous >= key) {
                return Err(InvariantViolation::OrderViolation);
            }
            previous = Some(key);
        }

        Ok(())
    }

    /// Returns the black height below `slot`, counting reachable entries.
    fn black_height(
        &self,
        slot: Slot,
        expected_parent: SlotRef,
        counted: &mut usize,
    ) -> Result<usize, InvariantViolation> {
        let Slot::Occupied(index) = slot else {
            return Ok(0);
        };
        let entry = &self.arena[index];
        *counted += 1;

        if entry.parent != expected_parent {
            return Err(InvariantViolation::BrokenParentLink);
        }
        if let SlotRef::Child { parent, .. } = expected_parent
            && entry.is_red()
            && self.arena[parent].is_red()
        {
            return Err(InvariantViolation::RedEntryWithRedParent);
        }

        let child_slot = |side| SlotRef::Child {
            parent: index,
            side,
        };
        let left = self.black_height(entry.left, child_slot(Side::Left), counted)?;
        let right = self.black_height(entry.right, child_slot(Side::Right), counted)?;
        if left != right {
            return Err(InvariantViolation::BlackHeightMismatch {
                expected: left,
                found: right,
            });
        }

        Ok(left + usize::from(!entry.is_red()))
    }
}
