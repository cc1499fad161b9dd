//! A single inventory slot
//!
//! The slot keeps its item, its stack count and its max stack in sync:
//! `item.is_none() == (current_stack == 0)` and `current_stack <= max_stack`
//! hold after every operation, and a held item's own stack size always
//! mirrors the slot's.

use crate::item::Item;
use std::fmt;

/// Units taken out of a slot
#[derive(Debug, Default)]
pub struct SlotRemoval {
    /// How many units actually left the slot
    pub amount: u32,
    /// The item, if the slot was emptied by this removal
    pub emptied: Option<Item>,
}

/// One storage cell holding zero or one item stack
#[derive(Debug)]
pub struct InventorySlot {
    item: Option<Item>,
    current_stack: u32,
    max_stack: u32,
}

impl InventorySlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            item: None,
            current_stack: 0,
            max_stack: 1,
        }
    }

    /// Get the held item
    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    /// Get units in the slot
    pub fn current_stack_size(&self) -> u32 {
        self.current_stack
    }

    /// Get the stack limit of the held item
    pub fn max_stack_size(&self) -> u32 {
        self.max_stack
    }

    /// Check if the slot holds nothing
    pub fn is_empty(&self) -> bool {
        self.item.is_none() || self.current_stack == 0
    }

    /// Check if the stack is at its limit
    pub fn is_full(&self) -> bool {
        self.current_stack >= self.max_stack
    }

    /// Units the stack can still take
    pub fn available_space(&self) -> u32 {
        self.max_stack.saturating_sub(self.current_stack)
    }

    /// Whether this slot holds an item with the given ID
    pub fn holds(&self, item_id: &str) -> bool {
        self.item.as_ref().map_or(false, |i| i.item_id() == item_id)
    }

    /// Same item ID and room left. Distinct instances of one ID are fungible.
    pub fn can_stack_item(&self, item: &Item) -> bool {
        !self.is_empty() && !self.is_full() && self.holds(item.item_id())
    }

    /// Empty, or stackable with `item`
    pub fn can_accept_item(&self, item: &Item) -> bool {
        if !item.is_valid() {
            return false;
        }
        self.is_empty() || self.can_stack_item(item)
    }

    /// Place `item` with `quantity` units, clamped to `1..=max_stack`.
    /// An invalid item clears the slot instead. Returns the previous occupant.
    pub fn set_item(&mut self, mut item: Item, quantity: u32) -> Option<Item> {
        if !item.is_valid() {
            log::warn!("Refusing to place invalid item {} in slot", item.instance_id());
            return self.clear();
        }

        let previous = self.item.take();
        self.max_stack = item.max_stack_size().max(1);
        self.current_stack = quantity.clamp(1, self.max_stack);
        if item.is_stackable() {
            item.set_current_stack_size(self.current_stack);
        }
        self.item = Some(item);
        previous
    }

    /// Empty the slot, returning whatever it held
    pub fn clear(&mut self) -> Option<Item> {
        self.current_stack = 0;
        self.max_stack = 1;
        self.item.take()
    }

    /// Add to the stack. Returns the overflow that did not fit; an empty slot
    /// or a zero amount returns `amount` unchanged.
    pub fn add_to_stack(&mut self, amount: u32) -> u32 {
        if amount == 0 || self.is_empty() {
            return amount;
        }

        let actual = amount.min(self.available_space());
        self.current_stack += actual;
        self.sync_item();
        amount - actual
    }

    /// Remove up to `amount` units; the slot clears itself at zero.
    pub fn remove_from_stack(&mut self, amount: u32) -> SlotRemoval {
        if amount == 0 || self.is_empty() {
            return SlotRemoval::default();
        }

        let actual = amount.min(self.current_stack);
        self.current_stack -= actual;

        let emptied = if self.current_stack == 0 {
            let mut item = self.clear();
            if let Some(item) = item.as_mut().filter(|i| i.is_stackable()) {
                item.set_current_stack_size(0);
            }
            item
        } else {
            self.sync_item();
            None
        };

        SlotRemoval {
            amount: actual,
            emptied,
        }
    }

    /// Move up to `amount` units into `target`. Does nothing if this slot is
    /// empty, `amount` is zero, or `target` holds a different item.
    pub fn transfer_to(&mut self, target: &mut InventorySlot, amount: u32) -> SlotRemoval {
        let item = match self.item.as_ref() {
            Some(item) if amount > 0 && self.current_stack > 0 => item,
            _ => return SlotRemoval::default(),
        };

        if !target.is_empty() && !target.can_stack_item(item) {
            return SlotRemoval::default();
        }

        let wanted = amount.min(self.current_stack);
        let target_space = if target.is_empty() {
            self.max_stack
        } else {
            target.available_space()
        };
        let actual = wanted.min(target_space);
        if actual == 0 {
            return SlotRemoval::default();
        }

        if target.is_empty() {
            if actual == self.current_stack {
                // Whole stack: the instance itself moves
                if let Some(item) = self.clear() {
                    target.set_item(item, actual);
                }
                return SlotRemoval {
                    amount: actual,
                    emptied: None,
                };
            }
            target.set_item(item.duplicate_with_stack(actual), actual);
        } else {
            target.add_to_stack(actual);
        }

        self.remove_from_stack(actual)
    }

    /// Collect every invariant violation
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.current_stack > self.max_stack {
            errors.push(format!(
                "Stack size {} exceeds max {}",
                self.current_stack, self.max_stack
            ));
        }
        match &self.item {
            Some(item) => {
                if self.current_stack == 0 {
                    errors.push("Item exists but stack size is 0".to_string());
                }
                if item.is_stackable() && item.current_stack_size() != self.current_stack {
                    errors.push(format!(
                        "Item stack {} out of sync with slot stack {}",
                        item.current_stack_size(),
                        self.current_stack
                    ));
                }
            }
            None if self.current_stack > 0 => {
                errors.push("No item but stack size > 0".to_string());
            }
            None => {}
        }

        errors
    }

    fn sync_item(&mut self) {
        if let Some(item) = self.item.as_mut().filter(|i| i.is_stackable()) {
            item.set_current_stack_size(self.current_stack);
        }
    }
}

impl Default for InventorySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for InventorySlot {
    fn eq(&self, other: &Self) -> bool {
        match (&self.item, &other.item) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.instance_id() == b.instance_id() && self.current_stack == other.current_stack
            }
            _ => false,
        }
    }
}

impl fmt::Display for InventorySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.item {
            Some(item) if self.current_stack > 0 => write!(
                f,
                "[{}] {}/{}",
                item.definition().name(),
                self.current_stack,
                self.max_stack
            ),
            _ => write!(f, "Empty Slot"),
        }
    }
}
