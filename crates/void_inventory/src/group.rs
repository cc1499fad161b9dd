//! Slot groups - fixed-size, type-restricted runs of slots
//!
//! A group owns every intra-group algorithm: insertion with stacking, direct
//! placement, removal, swapping, splitting and forward compaction. Capacity
//! queries are recomputed on every call; groups are expected to hold tens of
//! slots, not thousands.

use crate::error::{InventoryError, Rejected, Result};
use crate::item::Item;
use crate::slot::{InventorySlot, SlotRemoval};
use std::collections::BTreeMap;
use std::fmt;

/// Where an added item ended up
#[derive(Debug)]
pub enum Placement {
    /// The whole quantity merged into existing stacks. `slot` is the last
    /// slot that absorbed units; `spent` is the drained input item.
    Stacked { slot: usize, spent: Item },
    /// The item (or its unmerged remainder) now occupies `slot`
    Placed { slot: usize },
}

impl Placement {
    /// Slot that received the item or its last units
    pub fn slot(&self) -> usize {
        match self {
            Placement::Stacked { slot, .. } | Placement::Placed { slot } => *slot,
        }
    }

    /// The drained input item, if the add consumed it
    pub fn into_spent(self) -> Option<Item> {
        match self {
            Placement::Stacked { spent, .. } => Some(spent),
            Placement::Placed { .. } => None,
        }
    }
}

/// A bounded array of slots with an allowed type ID set
#[derive(Debug, Default)]
pub struct SlotGroup {
    max_slot_size: usize,
    allowed_type_ids: BTreeMap<i32, String>,
    slots: Vec<InventorySlot>,
}

impl SlotGroup {
    /// Create a group of `size` empty slots
    pub fn new(size: usize, allowed_type_ids: BTreeMap<i32, String>) -> Self {
        let mut group = Self::default();
        group.initialize_inventory(size, allowed_type_ids);
        group
    }

    /// Create a group from `(type_id, label)` pairs
    pub fn with_types<L: Into<String>>(
        size: usize,
        types: impl IntoIterator<Item = (i32, L)>,
    ) -> Self {
        let map = types.into_iter().map(|(id, label)| (id, label.into())).collect();
        Self::new(size, map)
    }

    /// Reallocate to exactly `size` empty slots. Returns whatever the old
    /// slots held.
    pub fn initialize_inventory(
        &mut self,
        size: usize,
        allowed_type_ids: BTreeMap<i32, String>,
    ) -> Vec<Item> {
        let previous = self.clear_all_slots();
        self.max_slot_size = size;
        self.allowed_type_ids = allowed_type_ids;
        self.slots = (0..size).map(|_| InventorySlot::new()).collect();
        previous
    }

    /// Get slot count
    pub fn max_slot_size(&self) -> usize {
        self.max_slot_size
    }

    /// Get allowed type IDs and their labels
    pub fn type_id_map(&self) -> &BTreeMap<i32, String> {
        &self.allowed_type_ids
    }

    /// Lowest allowed type ID
    pub fn primary_type_id(&self) -> Option<i32> {
        self.allowed_type_ids.keys().next().copied()
    }

    /// Get all slots
    pub fn slots(&self) -> &[InventorySlot] {
        &self.slots
    }

    /// Get slot at index
    pub fn slot(&self, index: usize) -> Option<&InventorySlot> {
        self.slots.get(index)
    }

    /// Get mutable slot at index
    pub fn slot_mut(&mut self, index: usize) -> Option<&mut InventorySlot> {
        self.slots.get_mut(index)
    }

    /// True if any of the item's slot types is allowed here
    pub fn is_type_supported(&self, item: &Item) -> bool {
        item.definition()
            .slot_type_ids()
            .iter()
            .any(|id| self.allowed_type_ids.contains_key(id))
    }

    /// Insert with stacking: merge into every matching stack left to right,
    /// then place the remainder in the first empty slot.
    ///
    /// On failure the returned item carries only the unplaced remainder.
    /// Merges that already happened are kept.
    pub fn add_item(&mut self, item: Item) -> std::result::Result<Placement, Rejected> {
        let mut item = self.check_insertable(item)?;

        if item.is_stackable() {
            let mut remaining = item.current_stack_size();
            let mut last_slot = 0;

            for (index, slot) in self.slots.iter_mut().enumerate() {
                if remaining == 0 {
                    break;
                }
                if slot.can_stack_item(&item) {
                    let overflow = slot.add_to_stack(remaining);
                    if overflow < remaining {
                        last_slot = index;
                    }
                    remaining = overflow;
                }
            }

            item.set_current_stack_size(remaining);
            if remaining == 0 {
                return Ok(Placement::Stacked {
                    slot: last_slot,
                    spent: item,
                });
            }
        }

        match self.slots.iter().position(|s| s.is_empty()) {
            Some(index) => {
                let quantity = item.current_stack_size();
                self.slots[index].set_item(item, quantity);
                Ok(Placement::Placed { slot: index })
            }
            None => Err(Rejected::new(
                InventoryError::capacity_exceeded("Inventory is full"),
                item,
            )),
        }
    }

    /// Place at a specific index. A compatible stack there absorbs what it can
    /// and the overflow goes through [`add_item`](Self::add_item). An
    /// occupied slot that cannot stack the item is a failure.
    pub fn add_item_to_slot(
        &mut self,
        item: Item,
        index: usize,
    ) -> std::result::Result<Placement, Rejected> {
        if index >= self.slots.len() {
            return Err(Rejected::new(
                InventoryError::invalid_argument(format!("Invalid slot index {}", index)),
                item,
            ));
        }
        let mut item = self.check_insertable(item)?;
        let slot = &mut self.slots[index];

        if slot.is_empty() {
            let quantity = item.current_stack_size();
            slot.set_item(item, quantity);
            return Ok(Placement::Placed { slot: index });
        }

        if !item.is_stackable() || !slot.can_stack_item(&item) {
            let error = if slot.holds(item.item_id()) {
                InventoryError::capacity_exceeded(format!("Slot {} is full", index))
            } else {
                InventoryError::type_mismatch(format!("Slot {} holds a different item", index))
            };
            return Err(Rejected::new(error, item));
        }

        let overflow = slot.add_to_stack(item.current_stack_size());
        item.set_current_stack_size(overflow);
        if overflow == 0 {
            return Ok(Placement::Stacked {
                slot: index,
                spent: item,
            });
        }

        log::debug!("Slot {} overflowed by {}, spilling into group", index, overflow);
        self.add_item(item)
    }

    /// Take the whole stack out of a slot
    pub fn remove_item(&mut self, index: usize) -> Result<Item> {
        let slot = self.occupied_slot_mut(index)?;
        slot.clear()
            .ok_or_else(|| InventoryError::not_found(format!("Slot {} is empty", index)))
    }

    /// Empty a slot regardless of stack size. The caller disposes of the
    /// returned item, usually by handing it back to its pool.
    pub fn destroy_item_at_slot(&mut self, index: usize) -> Result<Item> {
        let item = self.remove_item(index)?;
        log::debug!("Destroyed {} at slot {}", item.item_id(), index);
        Ok(item)
    }

    /// Remove `amount` units from one slot
    pub fn remove_stack_amount_from_slot(
        &mut self,
        index: usize,
        amount: u32,
    ) -> Result<SlotRemoval> {
        let slot = self.occupied_slot_mut(index)?;
        if amount == 0 {
            return Err(InventoryError::invalid_argument("Amount must be greater than zero"));
        }

        let removed = slot.remove_from_stack(amount);
        if removed.amount == 0 {
            return Err(InventoryError::invalid_argument("Failed to remove stack amount"));
        }
        Ok(removed)
    }

    /// Merge `amount` units of `template`'s item into matching stacks, then
    /// into empty slots as fresh instances. Returns what did not fit.
    pub fn add_stack_amount(&mut self, template: &Item, amount: u32) -> u32 {
        if amount == 0 || !template.is_valid() || !self.is_type_supported(template) {
            return amount;
        }

        let mut remaining = amount;
        if template.is_stackable() {
            for slot in self.slots.iter_mut() {
                if remaining == 0 {
                    return 0;
                }
                if slot.holds(template.item_id()) {
                    remaining = slot.add_to_stack(remaining);
                }
            }
        }

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_empty() {
                let quantity = remaining.min(template.max_stack_size().max(1));
                slot.set_item(template.duplicate_with_stack(quantity), quantity);
                remaining -= quantity;
            }
        }

        remaining
    }

    /// Swap two slots. Both stay inside this group, so no type check.
    pub fn swap_slots(&mut self, a: usize, b: usize) -> Result<()> {
        if a >= self.slots.len() || b >= self.slots.len() {
            return Err(InventoryError::invalid_argument(format!(
                "Invalid slot indices {} and {}",
                a, b
            )));
        }
        self.slots.swap(a, b);
        Ok(())
    }

    /// Move `amount` units from `source` into the empty `target` as a new
    /// instance. At least one unit must stay behind.
    pub fn split_stack(&mut self, source: usize, target: usize, amount: u32) -> Result<()> {
        if source >= self.slots.len() || target >= self.slots.len() || source == target {
            return Err(InventoryError::invalid_argument("Invalid source or target slot index"));
        }
        if self.slots[source].is_empty() {
            return Err(InventoryError::not_found("Source slot is empty"));
        }
        if !self.slots[target].is_empty() {
            return Err(InventoryError::invalid_argument("Target slot is not empty"));
        }
        if amount == 0 {
            return Err(InventoryError::invalid_argument(
                "Split amount must be greater than zero",
            ));
        }
        if self.slots[source].current_stack_size() <= amount {
            return Err(InventoryError::invalid_argument(
                "Split amount must be less than current stack size",
            ));
        }

        let mut source_item = self.slots[source]
            .clear()
            .ok_or_else(|| InventoryError::not_found("Source slot is empty"))?;
        let split = source_item.split_stack(amount);
        let left = source_item.current_stack_size();
        self.slots[source].set_item(source_item, left);

        let new_item = split?;
        self.slots[target].set_item(new_item, amount);
        Ok(())
    }

    /// Merge partial stacks forward, then move every occupied slot to the
    /// front keeping relative order. Returns items whose stacks were fully
    /// absorbed.
    pub fn consolidate_and_compact(&mut self) -> Vec<Item> {
        let spent = self.consolidate_stacks();

        let mut write = 0;
        for read in 0..self.slots.len() {
            if !self.slots[read].is_empty() {
                if write != read {
                    self.slots.swap(write, read);
                }
                write += 1;
            }
        }

        spent
    }

    fn consolidate_stacks(&mut self) -> Vec<Item> {
        let mut spent = Vec::new();

        for i in 0..self.slots.len() {
            let stackable = self.slots[i].item().map_or(false, |item| item.is_stackable());
            if !stackable || self.slots[i].is_full() {
                continue;
            }

            for j in (i + 1)..self.slots.len() {
                let (front, back) = self.slots.split_at_mut(j);
                let (target, source) = (&mut front[i], &mut back[0]);

                let room = target.available_space();
                let moved = source.transfer_to(target, room);
                spent.extend(moved.emptied);

                if target.is_full() {
                    break;
                }
            }
        }

        spent
    }

    /// Empty every slot, returning the items
    pub fn clear_all_slots(&mut self) -> Vec<Item> {
        self.slots.iter_mut().filter_map(|s| s.clear()).collect()
    }

    /// First slot holding `item_id`
    pub fn find_slot_by_item_id(&self, item_id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.holds(item_id))
    }

    /// Units of `item_id` across all slots
    pub fn total_item_count(&self, item_id: &str) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.holds(item_id))
            .map(|s| s.current_stack_size())
            .sum()
    }

    pub fn occupied_slot_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn free_slot_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_empty()).count()
    }

    pub fn is_full(&self) -> bool {
        self.free_slot_count() == 0
    }

    /// Collect every invariant violation in the group and its slots
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.slots.len() != self.max_slot_size {
            errors.push(format!(
                "Slot count {} does not match max slot size {}",
                self.slots.len(),
                self.max_slot_size
            ));
        }
        if self.allowed_type_ids.is_empty() {
            errors.push("No allowed type IDs".to_string());
        }
        for (index, slot) in self.slots.iter().enumerate() {
            errors.extend(slot.validate().into_iter().map(|e| format!("Slot {}: {}", index, e)));
        }

        errors
    }

    fn check_insertable(&self, item: Item) -> std::result::Result<Item, Rejected> {
        if !item.is_valid() {
            let reason = item.validate().join("; ");
            return Err(Rejected::new(
                InventoryError::invalid_argument(format!("Invalid item: {}", reason)),
                item,
            ));
        }
        if item.current_stack_size() == 0 {
            return Err(Rejected::new(
                InventoryError::invalid_argument("Item has no quantity"),
                item,
            ));
        }
        if !self.is_type_supported(&item) {
            let error = InventoryError::type_mismatch(format!(
                "Item {} type not supported by this group",
                item.item_id()
            ));
            return Err(Rejected::new(error, item));
        }
        Ok(item)
    }

    fn occupied_slot_mut(&mut self, index: usize) -> Result<&mut InventorySlot> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| {
                InventoryError::invalid_argument(format!("Invalid slot index {}", index))
            })?;
        if slot.is_empty() {
            return Err(InventoryError::not_found(format!("Slot {} is empty", index)));
        }
        Ok(slot)
    }
}

impl fmt::Display for SlotGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SlotGroup[{}/{} used, types: {:?}]",
            self.occupied_slot_count(),
            self.max_slot_size,
            self.allowed_type_ids.keys().collect::<Vec<_>>()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemDefinition;

    fn potion(stack: u32) -> Item {
        Item::new("Potion", ItemDefinition::new("potion", "Potion"))
            .with_max_stack(5)
            .with_stack(stack)
    }

    fn sword() -> Item {
        Item::new("Sword", ItemDefinition::new("sword", "Sword"))
    }

    fn helmet() -> Item {
        Item::new(
            "Helmet",
            ItemDefinition::new("helmet", "Helmet").with_slot_types(&[2]),
        )
    }

    fn backpack(size: usize) -> SlotGroup {
        SlotGroup::with_types(size, [(0, "Backpack")])
    }

    fn stacks(group: &SlotGroup) -> Vec<u32> {
        group.slots().iter().map(|s| s.current_stack_size()).collect()
    }

    #[test]
    fn test_initialize_allocates_exact_size() {
        let mut group = backpack(4);
        assert_eq!(group.slots().len(), 4);
        assert_eq!(group.free_slot_count(), 4);

        group.add_item(sword()).unwrap();
        let previous = group.initialize_inventory(2, BTreeMap::from([(1, "Belt".to_string())]));
        assert_eq!(previous.len(), 1);
        assert_eq!(group.slots().len(), 2);
        assert_eq!(group.primary_type_id(), Some(1));
        assert!(group.validate().is_empty());
    }

    #[test]
    fn test_type_support() {
        let group = backpack(2);
        assert!(group.is_type_supported(&sword()));
        assert!(!group.is_type_supported(&helmet()));

        let mut group = group;
        let rejected = group.add_item(helmet()).unwrap_err();
        assert!(matches!(rejected.error, InventoryError::TypeMismatch(_)));
        assert_eq!(rejected.item.item_id(), "helmet");
    }

    #[test]
    fn test_add_merges_across_all_matching_slots() {
        let mut group = backpack(3);
        group.add_item_to_slot(potion(3), 0).unwrap();
        group.add_item_to_slot(potion(4), 2).unwrap();

        // 2 fit in slot 0, 1 in slot 2, none left for the empty slot
        let placement = group.add_item(potion(3)).unwrap();
        assert_eq!(placement.slot(), 2);
        assert_eq!(placement.into_spent().unwrap().current_stack_size(), 0);
        assert_eq!(stacks(&group), vec![5, 0, 5]);
    }

    #[test]
    fn test_add_failure_keeps_remainder() {
        let mut group = backpack(1);
        group.add_item(potion(3)).unwrap();

        let rejected = group.add_item(potion(4)).unwrap_err();
        assert!(matches!(rejected.error, InventoryError::CapacityExceeded(_)));
        assert_eq!(rejected.item.current_stack_size(), 2);
        assert_eq!(group.total_item_count("potion") + rejected.item.current_stack_size(), 7);
    }

    #[test]
    fn test_add_rejects_empty_stack() {
        let mut group = backpack(1);
        let rejected = group.add_item(potion(0)).unwrap_err();
        assert!(matches!(rejected.error, InventoryError::InvalidArgument(_)));
        assert!(group.slot(0).unwrap().is_empty());
    }

    #[test]
    fn test_add_to_slot_strict_on_mismatch() {
        let mut group = backpack(3);
        group.add_item_to_slot(sword(), 1).unwrap();

        let rejected = group.add_item_to_slot(potion(2), 1).unwrap_err();
        assert!(matches!(rejected.error, InventoryError::TypeMismatch(_)));
        assert_eq!(group.occupied_slot_count(), 1);

        let rejected = group.add_item_to_slot(sword(), 1).unwrap_err();
        assert!(matches!(rejected.error, InventoryError::CapacityExceeded(_)));

        assert!(group.add_item_to_slot(sword(), 9).is_err());
    }

    #[test]
    fn test_add_to_slot_spills_overflow() {
        let mut group = backpack(3);
        group.add_item_to_slot(potion(4), 1).unwrap();

        let placement = group.add_item_to_slot(potion(3), 1).unwrap();
        assert!(matches!(placement, Placement::Placed { slot: 0 }));
        assert_eq!(stacks(&group), vec![2, 5, 0]);
    }

    #[test]
    fn test_remove_operations() {
        let mut group = backpack(3);
        group.add_item(potion(5)).unwrap();
        group.add_item(sword()).unwrap();

        assert!(matches!(
            group.remove_item(2),
            Err(InventoryError::NotFound(_))
        ));
        assert!(matches!(
            group.remove_item(7),
            Err(InventoryError::InvalidArgument(_))
        ));

        assert!(group.remove_stack_amount_from_slot(0, 0).is_err());
        let removed = group.remove_stack_amount_from_slot(0, 2).unwrap();
        assert_eq!(removed.amount, 2);
        assert_eq!(group.total_item_count("potion"), 3);

        let removed = group.remove_stack_amount_from_slot(0, 10).unwrap();
        assert_eq!(removed.amount, 3);
        assert!(removed.emptied.is_some());

        let destroyed = group.destroy_item_at_slot(1).unwrap();
        assert_eq!(destroyed.item_id(), "sword");
        assert!(group.destroy_item_at_slot(1).is_err());
        assert_eq!(group.occupied_slot_count(), 0);
    }

    #[test]
    fn test_swap_is_involution() {
        let mut group = backpack(2);
        group.add_item(potion(2)).unwrap();

        group.swap_slots(0, 1).unwrap();
        assert!(group.slot(0).unwrap().is_empty());
        assert_eq!(group.slot(1).unwrap().current_stack_size(), 2);

        group.swap_slots(0, 1).unwrap();
        assert_eq!(stacks(&group), vec![2, 0]);
        assert!(group.swap_slots(0, 2).is_err());
    }

    #[test]
    fn test_split_stack() {
        let mut group = backpack(3);
        group.add_item(potion(5)).unwrap();
        group.add_item(sword()).unwrap();

        assert!(group.split_stack(0, 1, 2).is_err()); // target occupied
        assert!(group.split_stack(0, 2, 5).is_err()); // must leave one
        assert!(group.split_stack(0, 2, 0).is_err());
        assert!(group.split_stack(2, 0, 1).is_err()); // source empty

        group.split_stack(0, 2, 2).unwrap();
        assert_eq!(stacks(&group), vec![3, 1, 2]);
        assert_ne!(
            group.slot(0).unwrap().item().unwrap().instance_id(),
            group.slot(2).unwrap().item().unwrap().instance_id()
        );
        assert!(group.validate().is_empty());
    }

    #[test]
    fn test_split_non_stackable_restores_slot() {
        let mut group = SlotGroup::with_types(2, [(0, "Backpack")]);
        group.add_item(sword()).unwrap();
        assert!(group.split_stack(0, 1, 1).is_err());
        assert_eq!(group.slot(0).unwrap().current_stack_size(), 1);
    }

    #[test]
    fn test_consolidate_and_compact() {
        let mut group = backpack(5);
        group.add_item_to_slot(potion(2), 1).unwrap();
        group.add_item_to_slot(sword(), 2).unwrap();
        group.add_item_to_slot(potion(2), 3).unwrap();
        group.add_item_to_slot(potion(4), 4).unwrap();

        let spent = group.consolidate_and_compact();
        // slot 1 takes 2 from slot 3 and 1 from slot 4
        assert_eq!(spent.len(), 1);
        assert_eq!(stacks(&group), vec![5, 1, 3, 0, 0]);
        assert_eq!(group.slot(1).unwrap().item().unwrap().item_id(), "sword");
        assert_eq!(group.total_item_count("potion"), 8);
        assert!(group.validate().is_empty());

        let before = stacks(&group);
        assert!(group.consolidate_and_compact().is_empty());
        assert_eq!(stacks(&group), before);
    }

    #[test]
    fn test_add_stack_amount() {
        let mut group = backpack(3);
        group.add_item(potion(3)).unwrap();
        let template = potion(1);

        let left = group.add_stack_amount(&template, 14);
        assert_eq!(stacks(&group), vec![5, 5, 5]);
        assert_eq!(left, 14 - 12);
        assert_eq!(group.add_stack_amount(&template, 0), 0);
        assert_eq!(group.add_stack_amount(&helmet(), 3), 3);
    }

    #[test]
    fn test_queries() {
        let mut group = backpack(2);
        assert_eq!(group.find_slot_by_item_id("sword"), None);
        group.add_item(potion(1)).unwrap();
        group.add_item(sword()).unwrap();

        assert_eq!(group.find_slot_by_item_id("sword"), Some(1));
        assert!(group.is_full());
        assert_eq!(group.to_string(), "SlotGroup[2/2 used, types: [0]]");
        assert_eq!(group.clear_all_slots().len(), 2);
        assert_eq!(group.free_slot_count(), 2);
    }
}
