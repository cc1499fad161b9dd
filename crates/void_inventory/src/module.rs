//! Item modules - runtime-attached behavior hooks
//!
//! Modules are attached to an [`Item`](crate::item::Item) and receive its
//! lifecycle events in attachment order. Lookup by concrete type goes through
//! a small cache keyed by the module's `TypeId`, which is dropped whenever the
//! module list changes.

use crate::error::{InventoryError, Result};
use crate::item::{InstanceId, OwnerId};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Key used by the default serializer for the active flag
pub const ACTIVE_KEY: &str = "active";
/// Key used by the default serializer for the priority
pub const PRIORITY_KEY: &str = "priority";

/// State shared by every module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleState {
    /// Item this module is attached to
    pub owner_item: Option<InstanceId>,
    /// Inactive modules receive no events
    pub active: bool,
    /// Ordering hint for collaborators
    pub priority: i32,
}

impl Default for ModuleState {
    fn default() -> Self {
        Self {
            owner_item: None,
            active: true,
            priority: 100,
        }
    }
}

/// Behavior attached to an item at runtime
pub trait ItemModule: Any + Send + fmt::Debug {
    fn state(&self) -> &ModuleState;

    fn state_mut(&mut self) -> &mut ModuleState;

    /// Create an independent copy for a split-off item
    fn duplicate(&self) -> Box<dyn ItemModule>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Stable name used as the key in save data
    fn module_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Bind to the owning item and activate
    fn initialize(&mut self, owner: InstanceId) {
        let state = self.state_mut();
        state.owner_item = Some(owner);
        state.active = true;
    }

    /// Return to the default active state
    fn reset(&mut self) {
        self.state_mut().active = true;
    }

    fn on_added_to_inventory(&mut self, _owner: OwnerId) {}

    fn on_removed_from_inventory(&mut self) {}

    fn on_merged(&mut self, _other: InstanceId, _is_source: bool) {}

    fn on_split(&mut self, _new_item: InstanceId, _amount: u32) {}

    fn serialize(&self) -> BTreeMap<String, String> {
        let state = self.state();
        let mut data = BTreeMap::new();
        data.insert(ACTIVE_KEY.to_string(), state.active.to_string());
        data.insert(PRIORITY_KEY.to_string(), state.priority.to_string());
        data
    }

    fn deserialize(&mut self, data: &BTreeMap<String, String>) {
        let state = self.state_mut();
        if let Some(active) = data.get(ACTIVE_KEY) {
            state.active = active == "true";
        }
        if let Some(priority) = data.get(PRIORITY_KEY).and_then(|p| p.parse().ok()) {
            state.priority = priority;
        }
    }

    fn is_active(&self) -> bool {
        self.state().active
    }

    fn set_active(&mut self, active: bool) {
        self.state_mut().active = active;
    }

    fn priority(&self) -> i32 {
        self.state().priority
    }
}

/// Ordered list of modules with a type-keyed lookup cache
#[derive(Default)]
pub struct ModuleList {
    modules: Vec<Box<dyn ItemModule>>,
    cache: RefCell<HashMap<TypeId, usize>>,
}

impl ModuleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a module. Only one module per concrete type is allowed.
    pub fn push(&mut self, module: Box<dyn ItemModule>) -> Result<()> {
        let type_id = module.as_any().type_id();
        if self.position_of(type_id).is_some() {
            return Err(InventoryError::invalid_argument(format!(
                "Module of type {} already exists on item",
                module.module_name()
            )));
        }
        self.modules.push(module);
        self.invalidate();
        Ok(())
    }

    /// Detach the module of type `T`
    pub fn remove<T: ItemModule>(&mut self) -> Option<Box<dyn ItemModule>> {
        let index = self.position_of(TypeId::of::<T>())?;
        let module = self.modules.remove(index);
        self.invalidate();
        Some(module)
    }

    /// Linear lookup by concrete type
    pub fn get<T: ItemModule>(&self) -> Option<&T> {
        self.modules
            .iter()
            .find_map(|m| m.as_any().downcast_ref::<T>())
    }

    /// Cached lookup by concrete type. Prefer this for repeated access.
    pub fn get_cached<T: ItemModule>(&self) -> Option<&T> {
        let type_id = TypeId::of::<T>();
        let cached = self.cache.borrow().get(&type_id).copied();
        let index = match cached {
            Some(index) => index,
            None => {
                let index = self.position_of(type_id)?;
                self.cache.borrow_mut().insert(type_id, index);
                index
            }
        };
        self.modules.get(index)?.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: ItemModule>(&mut self) -> Option<&mut T> {
        self.modules
            .iter_mut()
            .find_map(|m| m.as_any_mut().downcast_mut::<T>())
    }

    pub fn contains<T: ItemModule>(&self) -> bool {
        self.position_of(TypeId::of::<T>()).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ItemModule> {
        self.modules.iter().map(|m| m.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn ItemModule>> {
        self.modules.iter_mut()
    }

    /// Run `f` on every active module, in attachment order
    pub fn for_each_active(&mut self, mut f: impl FnMut(&mut dyn ItemModule)) {
        for module in &mut self.modules {
            if module.is_active() {
                f(module.as_mut());
            }
        }
    }

    pub fn reset_all(&mut self) {
        for module in &mut self.modules {
            module.reset();
        }
    }

    /// Independent copies of every module, bound to `owner`
    pub fn duplicate_for(&self, owner: InstanceId) -> ModuleList {
        let mut copy = ModuleList::new();
        for module in &self.modules {
            let mut duplicate = module.duplicate();
            duplicate.initialize(owner);
            duplicate.deserialize(&module.serialize());
            copy.modules.push(duplicate);
        }
        copy
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn position_of(&self, type_id: TypeId) -> Option<usize> {
        self.modules
            .iter()
            .position(|m| m.as_any().type_id() == type_id)
    }

    fn invalidate(&self) {
        self.cache.borrow_mut().clear();
    }

    #[cfg(test)]
    fn cached_entries(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl fmt::Debug for ModuleList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.modules.iter()).finish()
    }
}
