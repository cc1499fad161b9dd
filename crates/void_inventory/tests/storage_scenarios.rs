//! Integration tests for the storage engine
//!
//! Tests whole workflows across slots, groups and the collection:
//! - Stacking fill-up until a group is full
//! - Quantity conservation on a failed add
//! - Transfers refused by the destination
//! - Organize and swap stability

use void_inventory::prelude::*;

const BACKPACK: i32 = 0;
const QUICK_BAR: i32 = 1;
const EQUIPMENT: i32 = 2;

fn item_a(stack: u32) -> Item {
    Item::new(
        "Ammo",
        ItemDefinition::new("item_a", "Item A").with_slot_types(&[BACKPACK, QUICK_BAR]),
    )
    .with_max_stack(5)
    .with_stack(stack)
}

fn armor() -> Item {
    Item::new(
        "Armor",
        ItemDefinition::new("armor", "Leather Armor").with_slot_types(&[EQUIPMENT]),
    )
}

fn stacks(group: &SlotGroup) -> Vec<u32> {
    group.slots().iter().map(|s| s.current_stack_size()).collect()
}

fn assert_invariants(collection: &SlotGroupCollection) {
    for group in collection.groups() {
        assert_eq!(group.slots().len(), group.max_slot_size());
        for slot in group.slots() {
            assert_eq!(slot.item().is_none(), slot.current_stack_size() == 0);
            assert!(slot.current_stack_size() <= slot.max_stack_size());
        }
    }
    assert!(collection.validate().is_empty(), "{:?}", collection.validate());
}

fn inventory() -> SlotGroupCollection {
    let config = InventoryConfig::default()
        .with_group(SlotGroupConfig::new(4).with_type(BACKPACK, "Backpack"))
        .with_group(SlotGroupConfig::new(2).with_type(QUICK_BAR, "Quick Bar"))
        .with_group(SlotGroupConfig::new(2).with_type(EQUIPMENT, "Equipment"));
    SlotGroupCollection::from_config(&config).expect("Should build from config")
}

#[test]
fn test_two_slot_fill_up() {
    let mut group = SlotGroup::with_types(2, [(BACKPACK, "Backpack")]);

    let placement = group.add_item(item_a(1)).expect("First add should succeed");
    assert!(matches!(placement, Placement::Placed { slot: 0 }));
    assert_eq!(stacks(&group), vec![1, 0]);

    let placement = group.add_item(item_a(3)).expect("Should merge into slot 0");
    assert!(matches!(placement, Placement::Stacked { slot: 0, .. }));
    assert_eq!(stacks(&group), vec![4, 0]);

    group.add_item(item_a(5)).expect("Remainder should go to slot 1");
    assert_eq!(stacks(&group), vec![5, 4]);

    group.add_item(item_a(1)).expect("Slot 1 has room for one");
    assert_eq!(stacks(&group), vec![5, 5]);

    let rejected = group.add_item(item_a(1)).unwrap_err();
    assert!(matches!(rejected.error, InventoryError::CapacityExceeded(_)));
    assert_eq!(rejected.item.current_stack_size(), 1);
    assert_eq!(stacks(&group), vec![5, 5]);
}

#[test]
fn test_failed_add_conserves_quantity() {
    let mut group = SlotGroup::with_types(2, [(BACKPACK, "Backpack")]);
    group.add_item(item_a(3)).unwrap();
    group.add_item(armor_as_backpack_item()).unwrap();

    let incoming = item_a(5);
    let before = group.total_item_count("item_a") + incoming.current_stack_size();

    let rejected = group.add_item(incoming).unwrap_err();
    let after = group.total_item_count("item_a") + rejected.item.current_stack_size();

    assert_eq!(before, after);
    assert_eq!(rejected.item.current_stack_size(), 3);
}

fn armor_as_backpack_item() -> Item {
    Item::new("Armor", ItemDefinition::new("armor", "Leather Armor"))
}

#[test]
fn test_transfer_to_incompatible_group_changes_nothing() {
    let mut inventory = inventory();
    inventory.add_item(item_a(4), Some(BACKPACK)).unwrap();
    inventory.add_item(armor(), None).unwrap();

    let backpack_before = stacks(inventory.group_by_id(BACKPACK).unwrap());
    let equipment_before = stacks(inventory.group_by_id(EQUIPMENT).unwrap());
    let id = inventory
        .group_by_id(BACKPACK)
        .and_then(|g| g.slot(0))
        .and_then(|s| s.item())
        .map(|i| i.instance_id())
        .unwrap();

    let err = inventory.transfer_item(BACKPACK, 0, EQUIPMENT, 1).unwrap_err();
    assert!(matches!(err, TransferError::Failed(InventoryError::TypeMismatch(_))));

    assert_eq!(stacks(inventory.group_by_id(BACKPACK).unwrap()), backpack_before);
    assert_eq!(stacks(inventory.group_by_id(EQUIPMENT).unwrap()), equipment_before);
    assert_eq!(
        inventory.find_item_location(id),
        Some(ItemLocation { type_id: BACKPACK, slot: 0 })
    );
    assert_invariants(&inventory);
}

#[test]
fn test_transfer_refused_restores_source_slot() {
    let mut inventory = inventory();
    let quick_item = || {
        Item::new(
            "Torch",
            ItemDefinition::new("torch", "Torch").with_slot_types(&[BACKPACK, QUICK_BAR]),
        )
    };
    inventory.add_item(quick_item(), Some(BACKPACK)).unwrap();
    inventory.add_item(quick_item(), Some(BACKPACK)).unwrap();
    inventory.add_item(quick_item(), Some(QUICK_BAR)).unwrap();

    let result = inventory.transfer_item(BACKPACK, 1, QUICK_BAR, 0);
    assert!(result.is_err());
    let outcome = OperationResult::from(&result);
    assert!(!outcome.success);
    assert!(outcome.message.starts_with("Transfer failed"));

    let backpack = inventory.group_by_id(BACKPACK).unwrap();
    assert!(!backpack.slot(1).unwrap().is_empty());
    assert_eq!(inventory.global_total_item_count("torch"), 3);
    assert_invariants(&inventory);
}

#[test]
fn test_organize_all_is_idempotent() {
    let mut inventory = inventory();
    {
        let backpack = inventory.group_by_id_mut(BACKPACK).unwrap();
        backpack.add_item_to_slot(item_a(2), 3).unwrap();
        backpack.add_item_to_slot(armor_as_backpack_item(), 1).unwrap();
        backpack.add_item_to_slot(item_a(4), 2).unwrap();
    }

    inventory.organize_all();
    let once: Vec<Vec<u32>> = inventory.groups().iter().map(stacks).collect();
    inventory.organize_all();
    let twice: Vec<Vec<u32>> = inventory.groups().iter().map(stacks).collect();

    assert_eq!(once, twice);
    assert_eq!(once[0], vec![1, 5, 1, 0]);
    assert_eq!(inventory.global_total_item_count("item_a"), 6);
    assert_invariants(&inventory);
}

#[test]
fn test_swap_twice_is_identity() {
    let mut inventory = inventory();
    inventory.add_item(item_a(2), Some(QUICK_BAR)).unwrap();

    let quick_bar = inventory.group_by_id_mut(QUICK_BAR).unwrap();
    quick_bar.swap_slots(0, 1).unwrap();
    assert!(quick_bar.slot(0).unwrap().is_empty());
    assert_eq!(quick_bar.slot(1).unwrap().current_stack_size(), 2);

    quick_bar.swap_slots(0, 1).unwrap();
    assert_eq!(stacks(quick_bar), vec![2, 0]);
}

#[test]
fn test_invariants_hold_through_a_session() {
    let mut inventory = inventory();
    for stack in [3, 5, 2, 4, 1] {
        let _ = inventory.add_item(item_a(stack), None);
        assert_invariants(&inventory);
    }

    let backpack = inventory.group_by_id_mut(BACKPACK).unwrap();
    backpack.split_stack(0, 3, 1).unwrap();
    let _ = backpack.remove_stack_amount_from_slot(1, 5);
    assert_invariants(&inventory);

    let _ = inventory.transfer_item(BACKPACK, 0, QUICK_BAR, 0);
    let _ = inventory.remove_item_at(BACKPACK, 2, 2);
    inventory.organize_all();
    assert_invariants(&inventory);
}

#[test]
fn test_saved_item_reloads_into_inventory() {
    let mut inventory = inventory();
    let stored = item_a(4);
    let saved = stored.save_to_struct().unwrap();

    let mut restored = item_a(1);
    restored.load_from_struct(&saved).unwrap();
    inventory.add_item(restored, None).unwrap();

    assert_eq!(inventory.global_total_item_count("item_a"), 4);
}
