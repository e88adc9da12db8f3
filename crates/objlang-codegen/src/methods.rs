//! Method-Index Table (spec.md §4.3).
//!
//! Maps `(class, method)` to the method's slot in that class's vtable. Slot
//! 0 is the class-name constant, slot 1 is always the constructor, and the
//! first real method starts at slot 2 - so the cursor used while walking a
//! class's method list starts at 1 and is pre-incremented per insert.

use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct MethodIndexTable {
    slots: IndexMap<(String, String), i32>,
    cursor: i32,
}

impl MethodIndexTable {
    pub fn new() -> Self {
        Self { slots: IndexMap::new(), cursor: 1 }
    }

    /// Reset the slot cursor before walking a class's method list; the
    /// constructor fills slot 1, so the first `insert` after a reset lands
    /// the first real method at slot 2.
    pub fn reset_cursor(&mut self, _class: &str) {
        self.cursor = 1;
    }

    /// Assign the next slot to `(class, method)`. Re-inserting the same pair
    /// (e.g. a subclass override reusing its parent's slot) is the caller's
    /// responsibility to avoid; this always advances the cursor.
    pub fn insert(&mut self, class: &str, method: &str) -> i32 {
        self.cursor += 1;
        let slot = self.cursor;
        self.slots.insert((class.to_string(), method.to_string()), slot);
        slot
    }

    /// Record `(class, method)` at an explicit slot without touching the
    /// cursor - used when a class inherits a method unchanged and must
    /// reuse the parent's slot rather than claim a new one.
    pub fn insert_at(&mut self, class: &str, method: &str, slot: i32) {
        self.slots.insert((class.to_string(), method.to_string()), slot);
        if slot > self.cursor {
            self.cursor = slot;
        }
    }

    pub fn lookup(&self, class: &str, method: &str) -> Option<i32> {
        self.slots.get(&(class.to_string(), method.to_string())).copied()
    }
}

#[cfg(test)]
mod methods_tests {
    use super::*;

    #[test]
    fn first_insert_after_reset_lands_at_slot_two() {
        let mut table = MethodIndexTable::new();
        table.reset_cursor("A");
        assert_eq!(table.insert("A", "foo"), 2);
        assert_eq!(table.insert("A", "bar"), 3);
    }

    #[test]
    fn inherited_methods_keep_their_parents_slot() {
        let mut table = MethodIndexTable::new();
        table.reset_cursor("A");
        let slot = table.insert("A", "foo");
        table.reset_cursor("B");
        table.insert_at("B", "foo", slot);
        assert_eq!(table.lookup("B", "foo"), Some(slot));
    }

    #[test]
    fn lookup_of_unknown_pair_is_none() {
        let table = MethodIndexTable::new();
        assert_eq!(table.lookup("A", "missing"), None);
    }
}
