//! Item definitions and instances

use crate::error::{InventoryError, Result};
use crate::module::{ItemModule, ModuleList};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one item instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Allocate the next instance ID
    pub fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Scope that owns an item: an inventory holder, a world, or a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner:{}", self.0)
    }
}

/// Name of an item class. Pools are keyed by class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemClass(Arc<str>);

impl ItemClass {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemClass {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ItemClass {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// Static description shared by every instance of an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDefinition {
    item_id: String,
    name: String,
    description: String,
    icon: String,
    slot_type_ids: Vec<i32>,
}

impl ItemDefinition {
    /// Create a definition that fits slot type 0
    pub fn new(item_id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut definition = Self::default();
        definition.set_item_id(item_id);
        definition.set_name(name);
        definition
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set icon path
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Replace the slot type IDs
    pub fn with_slot_types(mut self, type_ids: &[i32]) -> Self {
        self.set_slot_type_ids(type_ids);
        self
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn slot_type_ids(&self) -> &[i32] {
        &self.slot_type_ids
    }

    /// Rejects empty IDs
    pub fn set_item_id(&mut self, item_id: impl Into<String>) {
        let item_id = item_id.into();
        if item_id.is_empty() {
            log::warn!("ItemDefinition: attempted to set empty item ID");
            return;
        }
        self.item_id = item_id;
    }

    /// Rejects empty names
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name.is_empty() {
            log::warn!("ItemDefinition: attempted to set empty name");
            return;
        }
        self.name = name;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_icon(&mut self, icon: impl Into<String>) {
        self.icon = icon.into();
    }

    /// Replace all slot type IDs. The whole list is rejected if any ID is negative.
    pub fn set_slot_type_ids(&mut self, type_ids: &[i32]) {
        if let Some(bad) = type_ids.iter().find(|id| **id < 0) {
            log::error!(
                "ItemDefinition: invalid type ID {} (must be >= 0), keeping previous list",
                bad
            );
            return;
        }
        self.slot_type_ids = type_ids.to_vec();
    }

    pub fn add_slot_type_id(&mut self, type_id: i32) {
        if type_id < 0 {
            log::error!("ItemDefinition: invalid type ID {} (must be >= 0)", type_id);
            return;
        }
        if self.slot_type_ids.contains(&type_id) {
            log::trace!("ItemDefinition: type ID {} already present", type_id);
            return;
        }
        self.slot_type_ids.push(type_id);
    }

    pub fn remove_slot_type_id(&mut self, type_id: i32) -> bool {
        let before = self.slot_type_ids.len();
        self.slot_type_ids.retain(|id| *id != type_id);
        if self.slot_type_ids.len() == before {
            log::warn!("ItemDefinition: type ID {} not found for removal", type_id);
            return false;
        }
        true
    }

    pub fn has_slot_type_id(&self, type_id: i32) -> bool {
        self.slot_type_ids.contains(&type_id)
    }

    pub fn clear_slot_type_ids(&mut self) {
        self.slot_type_ids.clear();
    }

    /// Collect every problem with this definition
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.item_id.is_empty() {
            errors.push("ItemID is empty".to_string());
        }
        if self.name.is_empty() {
            errors.push("ItemName is empty".to_string());
        }
        if self.slot_type_ids.is_empty() {
            errors.push("No inventory slot types defined".to_string());
        }
        for id in self.slot_type_ids.iter().filter(|id| **id < 0) {
            errors.push(format!("Invalid TypeID: {}", id));
        }
        errors
    }
}

impl Default for ItemDefinition {
    fn default() -> Self {
        Self {
            item_id: "None".to_string(),
            name: "New Item".to_string(),
            description: String::new(),
            icon: String::new(),
            slot_type_ids: vec![0],
        }
    }
}

impl PartialEq for ItemDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.item_id == other.item_id
    }
}

impl Eq for ItemDefinition {}

impl fmt::Display for ItemDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ItemDefinition[ID={}, Name={}, Types={}]",
            self.item_id,
            self.name,
            self.slot_type_ids.len()
        )
    }
}

/// One item instance: the unit stored in slots and recycled by pools
#[derive(Debug)]
pub struct Item {
    instance_id: InstanceId,
    class: ItemClass,
    definition: ItemDefinition,
    stackable: bool,
    max_stack: u32,
    current_stack: u32,
    /// Outer scope (inventory holder or pool)
    owner: Option<OwnerId>,
    /// Holder of the inventory this item currently sits in
    inventory_owner: Option<OwnerId>,
    in_inventory: bool,
    modules: ModuleList,
}

impl Item {
    /// Create a non-stackable item
    pub fn new(class: impl Into<ItemClass>, definition: ItemDefinition) -> Self {
        Self {
            instance_id: InstanceId::next(),
            class: class.into(),
            definition,
            stackable: false,
            max_stack: 1,
            current_stack: 1,
            owner: None,
            inventory_owner: None,
            in_inventory: false,
            modules: ModuleList::new(),
        }
    }

    /// Make the item stackable up to `max_stack`
    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.stackable = true;
        self.max_stack = max_stack.max(1);
        self.current_stack = self.current_stack.min(self.max_stack);
        self
    }

    /// Set the starting stack size
    pub fn with_stack(mut self, stack: u32) -> Self {
        self.set_current_stack_size(stack);
        self
    }

    /// Attach a module; a second module of the same type is ignored
    pub fn with_module(mut self, module: Box<dyn ItemModule>) -> Self {
        if let Err(e) = self.add_module(module) {
            log::warn!("Item {}: {}", self.instance_id, e);
        }
        self
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    pub fn class(&self) -> &ItemClass {
        &self.class
    }

    pub fn definition(&self) -> &ItemDefinition {
        &self.definition
    }

    pub fn definition_mut(&mut self) -> &mut ItemDefinition {
        &mut self.definition
    }

    /// Shorthand for the definition's item ID
    pub fn item_id(&self) -> &str {
        self.definition.item_id()
    }

    pub fn is_stackable(&self) -> bool {
        self.stackable
    }

    pub fn current_stack_size(&self) -> u32 {
        self.current_stack
    }

    pub fn max_stack_size(&self) -> u32 {
        self.max_stack
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    pub fn inventory_owner(&self) -> Option<OwnerId> {
        self.inventory_owner
    }

    pub fn is_in_inventory(&self) -> bool {
        self.in_inventory
    }

    /// Whether this item may be stored at all
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Reparent the item to a new outer scope
    pub fn set_owner(&mut self, owner: OwnerId) {
        self.owner = Some(owner);
    }

    /// Normalize stack sizes, fill in a missing name, and initialize modules
    pub fn initialize(&mut self) {
        if self.stackable {
            self.max_stack = self.max_stack.max(1);
            self.current_stack = self.current_stack.clamp(1, self.max_stack);
        } else {
            self.max_stack = 1;
            self.current_stack = 1;
        }

        if self.definition.item_id.is_empty() {
            self.definition.item_id = format!("{:032X}", self.instance_id.raw());
        }
        if self.definition.name.is_empty() {
            self.definition.name = self.class.name().to_string();
        }

        let owner = self.instance_id;
        for module in self.modules.iter_mut() {
            module.initialize(owner);
        }
    }

    /// Stackable items clamp to `0..=max`; non-stackable items stay at 1
    pub fn set_current_stack_size(&mut self, size: u32) {
        if self.stackable {
            self.current_stack = size.min(self.max_stack);
        } else {
            if size != 1 {
                log::warn!(
                    "Attempted to set stack size {} on non-stackable item {}",
                    size,
                    self.definition.item_id
                );
            }
            self.current_stack = 1;
        }
    }

    pub fn can_merge_with(&self, other: &Item) -> bool {
        self.stackable
            && self.definition.item_id == other.definition.item_id
            && self.current_stack < self.max_stack
    }

    /// Pull as much of `other` into this stack as fits. Returns the amount moved.
    pub fn merge_with(&mut self, other: &mut Item) -> Result<u32> {
        if !self.can_merge_with(other) {
            return Err(InventoryError::type_mismatch("Cannot merge: items incompatible"));
        }

        let space = self.max_stack - self.current_stack;
        let moved = space.min(other.current_stack);
        self.set_current_stack_size(self.current_stack + moved);
        other.set_current_stack_size(other.current_stack - moved);

        let other_id = other.instance_id;
        self.modules.for_each_active(|m| m.on_merged(other_id, false));
        Ok(moved)
    }

    /// Take `amount` off this stack as a new instance. At least one unit must remain.
    pub fn split_stack(&mut self, amount: u32) -> Result<Item> {
        if !self.stackable {
            return Err(InventoryError::invalid_argument("Cannot split non-stackable item"));
        }
        if amount == 0 {
            return Err(InventoryError::invalid_argument("Cannot split with amount 0"));
        }
        if amount >= self.current_stack {
            return Err(InventoryError::invalid_argument(format!(
                "Cannot split {} from stack of {} (must leave at least 1)",
                amount, self.current_stack
            )));
        }

        self.current_stack -= amount;
        let new_item = self.duplicate_with_stack(amount);

        let new_id = new_item.instance_id;
        self.modules.for_each_active(|m| m.on_split(new_id, amount));
        Ok(new_item)
    }

    /// A fresh instance with the same class, definition and modules
    pub fn duplicate_with_stack(&self, stack: u32) -> Item {
        let instance_id = InstanceId::next();
        let mut item = Item {
            instance_id,
            class: self.class.clone(),
            definition: self.definition.clone(),
            stackable: self.stackable,
            max_stack: self.max_stack,
            current_stack: 1,
            owner: self.owner,
            inventory_owner: None,
            in_inventory: false,
            modules: self.modules.duplicate_for(instance_id),
        };
        item.set_current_stack_size(stack);
        item
    }

    pub fn on_added_to_inventory(&mut self, owner: OwnerId) {
        self.inventory_owner = Some(owner);
        self.in_inventory = true;
        self.modules.for_each_active(|m| m.on_added_to_inventory(owner));
    }

    pub fn on_removed_from_inventory(&mut self) {
        self.modules.for_each_active(|m| m.on_removed_from_inventory());
        self.in_inventory = false;
        self.inventory_owner = None;
    }

    /// Back to a reusable state: one unit, out of any inventory, modules reset
    pub fn reset_to_default(&mut self) {
        self.set_current_stack_size(1);
        self.on_removed_from_inventory();
        self.modules.reset_all();
    }

    pub fn add_module(&mut self, mut module: Box<dyn ItemModule>) -> Result<()> {
        module.initialize(self.instance_id);
        let in_inventory = self.in_inventory;
        let owner = self.inventory_owner;
        self.modules.push(module)?;

        if let (true, Some(owner)) = (in_inventory, owner) {
            if let Some(last) = self.modules.iter_mut().last() {
                last.on_added_to_inventory(owner);
            }
        }
        Ok(())
    }

    pub fn remove_module<T: ItemModule>(&mut self) -> Result<Box<dyn ItemModule>> {
        let mut module = self
            .modules
            .remove::<T>()
            .ok_or_else(|| InventoryError::not_found("Module not found on item"))?;
        if self.in_inventory {
            module.on_removed_from_inventory();
        }
        Ok(module)
    }

    pub fn module<T: ItemModule>(&self) -> Option<&T> {
        self.modules.get::<T>()
    }

    /// Cached lookup; prefer for repeated access
    pub fn module_cached<T: ItemModule>(&self) -> Option<&T> {
        self.modules.get_cached::<T>()
    }

    pub fn module_mut<T: ItemModule>(&mut self) -> Option<&mut T> {
        self.modules.get_mut::<T>()
    }

    pub fn modules(&self) -> &ModuleList {
        &self.modules
    }

    pub(crate) fn modules_mut(&mut self) -> &mut ModuleList {
        &mut self.modules
    }

    /// Collect every problem with this item
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.definition.validate();

        if self.stackable {
            if self.max_stack < 1 {
                errors.push(format!("Invalid MaxStackSize: {} (must be >= 1)", self.max_stack));
            }
            if self.current_stack > self.max_stack {
                errors.push(format!(
                    "Invalid CurrentStackSize: {} (must be 0-{})",
                    self.current_stack, self.max_stack
                ));
            }
        } else if self.current_stack != 1 {
            errors.push(format!("Non-stackable item has stack size {}", self.current_stack));
        }

        errors
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Item[{}] Stack:{}/{} InInventory:{} Owner:",
            self.definition.name,
            self.current_stack,
            self.max_stack,
            if self.in_inventory { "Yes" } else { "No" },
        )?;
        match self.inventory_owner {
            Some(owner) => write!(f, "{}", owner),
            None => write!(f, "None"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleState;
    use parking_lot::Mutex;
    use std::any::Any;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Counter {
        state: ModuleState,
        merges: u32,
        splits: u32,
        removed: u32,
    }

    impl ItemModule for Counter {
        fn state(&self) -> &ModuleState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut ModuleState {
            &mut self.state
        }
        fn duplicate(&self) -> Box<dyn ItemModule> {
            Box::new(Counter::default())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
        fn on_merged(&mut self, _other: InstanceId, _is_source: bool) {
            self.merges += 1;
        }
        fn on_split(&mut self, _new_item: InstanceId, _amount: u32) {
            self.splits += 1;
        }
        fn on_removed_from_inventory(&mut self) {
            self.removed += 1;
        }
    }

    /// Appends `N:event` to a log shared with other modules
    #[derive(Debug, Default)]
    struct Recorder<const N: u8> {
        state: ModuleState,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl<const N: u8> ItemModule for Recorder<N> {
        fn state(&self) -> &ModuleState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut ModuleState {
            &mut self.state
        }
        fn duplicate(&self) -> Box<dyn ItemModule> {
            Box::new(Recorder::<N> {
                state: ModuleState::default(),
                log: self.log.clone(),
            })
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
        fn on_added_to_inventory(&mut self, _owner: OwnerId) {
            self.log.lock().push(format!("{}:added", N));
        }
        fn on_split(&mut self, _new_item: InstanceId, _amount: u32) {
            self.log.lock().push(format!("{}:split", N));
        }
    }

    fn arrows(stack: u32) -> Item {
        Item::new("Arrow", ItemDefinition::new("arrow", "Arrow"))
            .with_max_stack(20)
            .with_stack(stack)
    }

    #[test]
    fn test_definition_setters_reject_bad_input() {
        let mut def = ItemDefinition::new("potion", "Potion");
        def.set_item_id("");
        assert_eq!(def.item_id(), "potion");

        def.set_slot_type_ids(&[1, -2]);
        assert_eq!(def.slot_type_ids(), &[0]);

        def.add_slot_type_id(3);
        def.add_slot_type_id(3);
        assert_eq!(def.slot_type_ids(), &[0, 3]);

        assert!(def.remove_slot_type_id(0));
        assert!(!def.remove_slot_type_id(0));
        assert!(def.validate().is_empty());

        def.clear_slot_type_ids();
        assert_eq!(def.validate(), vec!["No inventory slot types defined".to_string()]);
    }

    #[test]
    fn test_instance_ids_unique() {
        let a = arrows(1);
        let b = arrows(1);
        assert_ne!(a.instance_id(), b.instance_id());
        assert_eq!(a.definition(), b.definition());
    }

    #[test]
    fn test_non_stackable_stays_at_one() {
        let mut sword = Item::new("Sword", ItemDefinition::new("sword", "Sword"));
        sword.set_current_stack_size(5);
        assert_eq!(sword.current_stack_size(), 1);
        assert!(!sword.is_stackable());
    }

    #[test]
    fn test_initialize_clamps() {
        let mut item = arrows(0);
        assert_eq!(item.current_stack_size(), 0);
        item.initialize();
        assert_eq!(item.current_stack_size(), 1);
    }

    #[test]
    fn test_merge_with() {
        let mut a = arrows(15).with_module(Box::new(Counter::default()));
        let mut b = arrows(10);

        let moved = a.merge_with(&mut b).unwrap();
        assert_eq!(moved, 5);
        assert_eq!(a.current_stack_size(), 20);
        assert_eq!(b.current_stack_size(), 5);
        assert_eq!(a.module::<Counter>().unwrap().merges, 1);

        // Full stacks refuse further merges
        assert!(a.merge_with(&mut b).is_err());
    }

    #[test]
    fn test_split_stack() {
        let mut a = arrows(10).with_module(Box::new(Counter::default()));

        assert!(a.split_stack(10).is_err());
        assert!(a.split_stack(0).is_err());

        let b = a.split_stack(4).unwrap();
        assert_eq!(a.current_stack_size(), 6);
        assert_eq!(b.current_stack_size(), 4);
        assert_ne!(a.instance_id(), b.instance_id());
        assert_eq!(b.item_id(), "arrow");
        assert_eq!(a.module::<Counter>().unwrap().splits, 1);

        // The split-off copy has its own module bound to itself
        let copied = b.module::<Counter>().unwrap();
        assert_eq!(copied.splits, 0);
        assert_eq!(copied.state.owner_item, Some(b.instance_id()));
    }

    #[test]
    fn test_reset_to_default() {
        let mut item = arrows(12).with_module(Box::new(Counter::default()));
        item.on_added_to_inventory(OwnerId(9));
        item.module_mut::<Counter>().unwrap().set_active(false);
        assert!(item.is_in_inventory());

        item.reset_to_default();
        assert_eq!(item.current_stack_size(), 1);
        assert!(!item.is_in_inventory());
        assert_eq!(item.inventory_owner(), None);

        let counter = item.module::<Counter>().unwrap();
        assert!(counter.is_active());
        // Inactive modules do not see the removal hook
        assert_eq!(counter.removed, 0);
    }

    #[test]
    fn test_module_add_remove() {
        let mut item = arrows(1);
        item.add_module(Box::new(Counter::default())).unwrap();
        assert!(item.add_module(Box::new(Counter::default())).is_err());
        assert!(item.module_cached::<Counter>().is_some());

        item.remove_module::<Counter>().unwrap();
        assert!(item.module_cached::<Counter>().is_none());
        assert!(item.remove_module::<Counter>().is_err());
    }

    #[test]
    fn test_hooks_run_in_attachment_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut item = arrows(6)
            .with_module(Box::new(Recorder::<2> {
                state: ModuleState::default(),
                log: log.clone(),
            }))
            .with_module(Box::new(Recorder::<1> {
                state: ModuleState::default(),
                log: log.clone(),
            }));

        item.on_added_to_inventory(OwnerId(3));
        item.split_stack(2).unwrap();
        assert_eq!(*log.lock(), ["2:added", "1:added", "2:split", "1:split"]);

        log.lock().clear();
        item.module_mut::<Recorder<2>>().unwrap().set_active(false);
        item.on_added_to_inventory(OwnerId(3));
        assert_eq!(*log.lock(), ["1:added"]);
    }

    #[test]
    fn test_display() {
        let item = arrows(3);
        assert_eq!(item.to_string(), "Item[Arrow] Stack:3/20 InInventory:No Owner:None");
    }
}
