//! Slot group collection
//!
//! Routes items between groups by type ID. Lookups go through a lazily
//! rebuilt `type ID -> group index` cache; every accessor that hands out a
//! mutable group marks the cache dirty so it can never go stale.

use crate::error::{InventoryError, Rejected, Result, TransferError};
use crate::group::{Placement, SlotGroup};
use crate::item::{InstanceId, Item};
use crate::slot::{InventorySlot, SlotRemoval};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Group type ID and slot index of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemLocation {
    pub type_id: i32,
    pub slot: usize,
}

/// Result of a successful collection add
#[derive(Debug)]
pub struct Added {
    /// Type ID of the group that took the item
    pub type_id: i32,
    pub placement: Placement,
}

/// Ordered set of slot groups
#[derive(Debug)]
pub struct SlotGroupCollection {
    groups: Vec<SlotGroup>,
    type_index: RefCell<HashMap<i32, usize>>,
    needs_rebuild: Cell<bool>,
}

impl SlotGroupCollection {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            type_index: RefCell::new(HashMap::new()),
            needs_rebuild: Cell::new(true),
        }
    }

    /// Append a group. Every type ID must be unused by earlier groups.
    pub fn add_group(&mut self, group: SlotGroup) -> Result<usize> {
        if group.type_id_map().is_empty() {
            return Err(InventoryError::invalid_argument(
                "Group must allow at least one type ID",
            ));
        }
        for type_id in group.type_id_map().keys() {
            if let Some(owner) = self.group_index(*type_id) {
                return Err(InventoryError::invalid_argument(format!(
                    "Type ID {} already registered by group {}",
                    type_id, owner
                )));
            }
        }

        self.groups.push(group);
        self.needs_rebuild.set(true);
        Ok(self.groups.len() - 1)
    }

    /// Recompute the type ID index. The first group registering an ID keeps it.
    pub fn rebuild_cache(&self) {
        let mut index = self.type_index.borrow_mut();
        index.clear();

        for (position, group) in self.groups.iter().enumerate() {
            for type_id in group.type_id_map().keys() {
                match index.get(type_id) {
                    Some(existing) if *existing != position => log::warn!(
                        "Type ID {} claimed by groups {} and {}, keeping {}",
                        type_id,
                        existing,
                        position,
                        existing
                    ),
                    Some(_) => {}
                    None => {
                        index.insert(*type_id, position);
                    }
                }
            }
        }

        self.needs_rebuild.set(false);
        log::trace!("Rebuilt type index: {} entries", index.len());
    }

    /// Mark the index stale; the next lookup rebuilds it
    pub fn invalidate_cache(&self) {
        self.needs_rebuild.set(true);
    }

    fn group_index(&self, type_id: i32) -> Option<usize> {
        if self.needs_rebuild.get() {
            self.rebuild_cache();
        }
        self.type_index
            .borrow()
            .get(&type_id)
            .copied()
            .filter(|i| *i < self.groups.len())
    }

    pub fn group_by_id(&self, type_id: i32) -> Option<&SlotGroup> {
        let index = self.group_index(type_id)?;
        self.groups.get(index)
    }

    /// Mutable group lookup. Invalidates the index.
    pub fn group_by_id_mut(&mut self, type_id: i32) -> Option<&mut SlotGroup> {
        let index = self.group_index(type_id)?;
        self.needs_rebuild.set(true);
        self.groups.get_mut(index)
    }

    /// Get group at index
    pub fn group_by_index(&self, index: usize) -> Option<&SlotGroup> {
        self.groups.get(index)
    }

    /// Get mutable group at index. Invalidates the index.
    pub fn group_by_index_mut(&mut self, index: usize) -> Option<&mut SlotGroup> {
        self.needs_rebuild.set(true);
        self.groups.get_mut(index)
    }

    /// Get all groups
    pub fn groups(&self) -> &[SlotGroup] {
        &self.groups
    }

    /// Get all groups mutably. Invalidates the index.
    pub fn groups_mut(&mut self) -> &mut [SlotGroup] {
        self.needs_rebuild.set(true);
        &mut self.groups
    }

    /// Get group count
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if there are no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Lowest type ID of the group at `index`
    pub fn type_id_for_group_index(&self, index: usize) -> Option<i32> {
        self.groups.get(index)?.primary_type_id()
    }

    /// Add to the `target` group only, or to the first group in order that
    /// supports the item and has room.
    ///
    /// Without a target a full group passes its unplaced remainder on to the
    /// next compatible group.
    pub fn add_item(
        &mut self,
        item: Item,
        target: Option<i32>,
    ) -> std::result::Result<Added, Rejected> {
        if !item.is_valid() {
            return Err(Rejected::new(
                InventoryError::invalid_argument("Cannot add an invalid item"),
                item,
            ));
        }

        if let Some(type_id) = target {
            let index = match self.group_index(type_id) {
                Some(index) => index,
                None => {
                    return Err(Rejected::new(
                        InventoryError::not_found(format!("Target group {} not found", type_id)),
                        item,
                    ))
                }
            };
            let group = &mut self.groups[index];
            if !group.is_type_supported(&item) {
                return Err(Rejected::new(
                    InventoryError::type_mismatch(format!(
                        "Item {} is not compatible with group {}",
                        item.item_id(),
                        type_id
                    )),
                    item,
                ));
            }
            return group
                .add_item(item)
                .map(|placement| Added { type_id, placement });
        }

        let mut item = item;
        let mut any_supported = false;
        for group in self.groups.iter_mut() {
            if !group.is_type_supported(&item) {
                continue;
            }
            any_supported = true;
            match group.add_item(item) {
                Ok(placement) => {
                    return Ok(Added {
                        type_id: group.primary_type_id().unwrap_or_default(),
                        placement,
                    })
                }
                Err(rejected) => item = rejected.item,
            }
        }

        let error = if any_supported {
            InventoryError::capacity_exceeded("All compatible groups are full")
        } else {
            InventoryError::type_mismatch(format!("No group supports item {}", item.item_id()))
        };
        Err(Rejected::new(error, item))
    }

    /// Remove `quantity` units from a slot. Taking the whole stack hands the
    /// item back in [`SlotRemoval::emptied`].
    pub fn remove_item_at(
        &mut self,
        type_id: i32,
        slot: usize,
        quantity: u32,
    ) -> Result<SlotRemoval> {
        let index = self
            .group_index(type_id)
            .ok_or_else(|| InventoryError::not_found(format!("Group {} not found", type_id)))?;
        self.groups[index].remove_stack_amount_from_slot(slot, quantity)
    }

    /// Move the whole stack at `from` into `to`.
    ///
    /// The source slot is emptied first, then the destination tries to take
    /// the item. If it refuses, the item goes back into its exact source slot.
    /// Units a destination stack absorbed before the refusal are not undone.
    /// Returns the source item if it was fully merged into an existing stack.
    pub fn transfer_item(
        &mut self,
        from_type: i32,
        from_index: usize,
        to_type: i32,
        to_index: usize,
    ) -> std::result::Result<Option<Item>, TransferError> {
        let (source, dest) = match (self.group_index(from_type), self.group_index(to_type)) {
            (Some(source), Some(dest)) => (source, dest),
            _ => {
                return Err(TransferError::Failed(InventoryError::not_found(
                    "A group involved in the transfer was not found",
                )))
            }
        };

        let moving = self.groups[source]
            .slot(from_index)
            .and_then(|s| s.item())
            .ok_or_else(|| {
                TransferError::Failed(InventoryError::not_found("Source slot is empty or invalid"))
            })?;
        if !self.groups[dest].is_type_supported(moving) {
            return Err(TransferError::Failed(InventoryError::type_mismatch(
                "Destination group does not support the item type",
            )));
        }
        if to_index >= self.groups[dest].slots().len() {
            return Err(TransferError::Failed(InventoryError::invalid_argument(
                format!("Invalid destination slot index {}", to_index),
            )));
        }

        let item = self.groups[source]
            .remove_item(from_index)
            .map_err(TransferError::Failed)?;

        let rejected = match self.groups[dest].add_item_to_slot(item, to_index) {
            Ok(placement) => {
                log::debug!(
                    "Transferred {}:{} -> {}:{}",
                    from_type,
                    from_index,
                    to_type,
                    placement.slot()
                );
                return Ok(placement.into_spent());
            }
            Err(rejected) => rejected,
        };

        let (error, item) = rejected.into_parts();
        match self.groups[source].add_item_to_slot(item, from_index) {
            Ok(_) => Err(TransferError::Failed(error)),
            Err(stranded) => {
                log::error!(
                    "Rollback to {}:{} failed: {}",
                    from_type,
                    from_index,
                    stranded.error
                );
                Err(TransferError::Stranded(Rejected::new(error, stranded.item)))
            }
        }
    }

    /// First slot holding this exact instance
    pub fn find_item_location(&self, instance: InstanceId) -> Option<ItemLocation> {
        self.groups.iter().find_map(|group| {
            let slot = group
                .slots()
                .iter()
                .position(|s| s.item().map_or(false, |i| i.instance_id() == instance))?;
            Some(ItemLocation {
                type_id: group.primary_type_id()?,
                slot,
            })
        })
    }

    /// Units of `item_id` across every group
    pub fn global_total_item_count(&self, item_id: &str) -> u32 {
        self.groups.iter().map(|g| g.total_item_count(item_id)).sum()
    }

    /// Occupied slots whose item name contains `query`
    pub fn find_items_by_name(&self, query: &str) -> Vec<(ItemLocation, &InventorySlot)> {
        let mut found = Vec::new();
        for group in &self.groups {
            let Some(type_id) = group.primary_type_id() else {
                continue;
            };
            for (slot, cell) in group.slots().iter().enumerate() {
                let matches = cell
                    .item()
                    .map_or(false, |i| i.definition().name().contains(query));
                if matches {
                    found.push((ItemLocation { type_id, slot }, cell));
                }
            }
        }
        found
    }

    /// Consolidate and compact every group. Returns fully absorbed items.
    pub fn organize_all(&mut self) -> Vec<Item> {
        self.groups
            .iter_mut()
            .flat_map(|g| g.consolidate_and_compact())
            .collect()
    }

    /// Collect every problem across the collection
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen: HashMap<i32, usize> = HashMap::new();

        for (index, group) in self.groups.iter().enumerate() {
            for type_id in group.type_id_map().keys() {
                if let Some(first) = seen.insert(*type_id, index) {
                    errors.push(format!(
                        "Type ID {} registered by groups {} and {}",
                        type_id, first, index
                    ));
                }
            }
            errors.extend(
                group
                    .validate()
                    .into_iter()
                    .map(|e| format!("Group {}: {}", index, e)),
            );
        }

        errors
    }

    #[cfg(test)]
    fn cache_is_dirty(&self) -> bool {
        self.needs_rebuild.get()
    }
}

impl Default for SlotGroupCollection {
    fn default() -> Self {
        Self::new()
    }
}
