use log;

use crate::items::{calculate_merge_result, ItemStack, PotionAttributes};

// --- Constants ---

/// Slot count of a standard player inventory (hotbar + main grid).
pub const PLAYER_INVENTORY_SLOTS: usize = 36;

// --- Generic Item Container Trait ---

/// A fixed-size, ordered collection of item-bearing slots.
///
/// The metadata adapter is fixed per container type: whichever data-model
/// version the host runs, it picks the matching `Meta` when it wires up its
/// container, and every stack in that container uses it.
pub trait ItemContainer {
    type Meta: PotionAttributes + Clone;

    /// Returns the total number of slots in this container.
    fn num_slots(&self) -> usize;

    /// Borrows the stack in a slot. Returns None if the slot index is
    /// invalid or the slot is empty.
    fn get_slot(&self, slot_index: usize) -> Option<&ItemStack<Self::Meta>>;

    /// Replaces the contents of a slot (`None` clears it).
    /// Implementations should handle invalid indices gracefully (do nothing).
    fn set_slot(&mut self, slot_index: usize, stack: Option<ItemStack<Self::Meta>>);

    /// Removes and returns the stack in a slot, leaving it empty.
    fn take_slot(&mut self, slot_index: usize) -> Option<ItemStack<Self::Meta>> {
        let taken = self.get_slot(slot_index).cloned();
        if taken.is_some() {
            self.set_slot(slot_index, None);
        }
        taken
    }
}

// --- Helper: Check if Container is Empty ---

/// Checks if all slots in an ItemContainer are empty.
pub fn is_container_empty<C: ItemContainer>(container: &C) -> bool {
    (0..container.num_slots()).all(|i| container.get_slot(i).is_none())
}

// --- Best-Fit Insertion ---

/// Inserts a stack into the container, best-fit: first top up existing
/// not-yet-full stacks of the same identity, each to its per-kind limit,
/// then drop any leftover into the first empty slot.
///
/// Returns the quantity actually placed. A return value short of
/// `stack.quantity` means the container ran out of room; whatever was placed
/// before that stays placed (no rollback).
pub fn insert_stack<C: ItemContainer>(container: &mut C, stack: ItemStack<C::Meta>) -> u32 {
    let requested = stack.quantity;
    if requested == 0 {
        return 0;
    }
    let mut remaining = requested;

    // Pass 1: merge onto existing same-identity stacks.
    for slot_index in 0..container.num_slots() {
        if remaining == 0 {
            break;
        }
        let merge = match container.get_slot(slot_index) {
            Some(existing) => {
                let mut probe = stack.clone();
                probe.quantity = remaining;
                match calculate_merge_result(&probe, existing) {
                    Ok((transfer_qty, _, target_new_qty, _)) if transfer_qty > 0 => {
                        let mut updated = existing.clone();
                        updated.quantity = target_new_qty;
                        Some((updated, transfer_qty))
                    }
                    _ => None,
                }
            }
            None => None,
        };
        if let Some((updated, transfer_qty)) = merge {
            log::debug!(
                "[Container] Topping up slot {} with {} x {}",
                slot_index,
                transfer_qty,
                stack.kind.as_str()
            );
            container.set_slot(slot_index, Some(updated));
            remaining -= transfer_qty;
        }
    }

    // Pass 2: leftover goes into the first empty slot.
    if remaining > 0 {
        let empty_slot = (0..container.num_slots()).find(|&i| container.get_slot(i).is_none());
        match empty_slot {
            Some(slot_index) => {
                let mut leftover = stack.clone();
                leftover.quantity = remaining;
                log::debug!(
                    "[Container] Placing {} x {} into empty slot {}",
                    remaining,
                    stack.kind.as_str(),
                    slot_index
                );
                container.set_slot(slot_index, Some(leftover));
                remaining = 0;
            }
            None => {
                log::warn!(
                    "[Container] No room for {} x {} ({} placed)",
                    remaining,
                    stack.kind.as_str(),
                    requested - remaining
                );
            }
        }
    }

    requested - remaining
}

// --- Concrete Container ---

/// A plain in-memory slot array. Hosts without a native container use this
/// directly; it also backs every test in the crate.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotInventory<M> {
    slots: Vec<Option<ItemStack<M>>>,
}

impl<M: PotionAttributes + Clone> SlotInventory<M> {
    pub fn new(num_slots: usize) -> Self {
        SlotInventory {
            slots: vec![None; num_slots],
        }
    }

    /// A container sized like a standard player inventory.
    pub fn player_sized() -> Self {
        Self::new(PLAYER_INVENTORY_SLOTS)
    }
}

impl<M: PotionAttributes + Clone> ItemContainer for SlotInventory<M> {
    type Meta = M;

    fn num_slots(&self) -> usize {
        self.slots.len()
    }

    fn get_slot(&self, slot_index: usize) -> Option<&ItemStack<M>> {
        self.slots.get(slot_index).and_then(|slot| slot.as_ref())
    }

    fn set_slot(&mut self, slot_index: usize, stack: Option<ItemStack<M>>) {
        if let Some(slot) = self.slots.get_mut(slot_index) {
            *slot = stack;
        }
    }
}
