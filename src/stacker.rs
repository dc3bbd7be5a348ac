use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log;

use crate::busy::{BusyGuard, BusyPass};
use crate::container::{insert_stack, ItemContainer};
use crate::error::StackError;
use crate::identity::{is_potion_stack, stack_key, StackKey};
use crate::items::{ItemStack, POTION_STACK_SIZE};

// --- Types ---

/// Identity groups produced by a scan: for each key, the member slots in
/// slot-index order together with the stacks they held at scan time.
pub type PotionGroups<M> = HashMap<StackKey, Vec<(usize, ItemStack<M>)>>;

/// Outcome of a completed consolidation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackReport {
    /// Total quantity rewritten as part of merges of two or more stacks.
    /// Singletons left in place contribute nothing.
    pub moved: u32,
}

impl StackReport {
    /// True when there was nothing to merge (or nothing fit).
    pub fn is_noop(&self) -> bool {
        self.moved == 0
    }
}

// --- Aggregator ---

/// Scans the container once, in slot order, grouping potion stacks by
/// identity key. Read-only: repeated scans of an unmutated container produce
/// identical groupings.
pub fn scan_potions<C: ItemContainer>(container: &C) -> PotionGroups<C::Meta> {
    let mut groups: PotionGroups<C::Meta> = HashMap::new();
    for slot_index in 0..container.num_slots() {
        if let Some(stack) = container.get_slot(slot_index) {
            if is_potion_stack(stack) {
                groups
                    .entry(stack_key(stack))
                    .or_default()
                    .push((slot_index, stack.clone()));
            }
        }
    }
    groups
}

// --- Redistributor ---

/// Writes merged groups back into the container.
///
/// `cap` bounds the total quantity placed across the whole run; 0 means
/// unlimited. Groups with a single member are left exactly where they are.
/// For larger groups the source slots are cleared, the pooled quantity is
/// split into full 16-stacks plus a remainder, and each piece is placed
/// best-fit. A placement that cannot be fully satisfied means the container
/// is out of room: the run stops there and reports what it moved. A
/// remainder that no longer fits is dropped, not restored.
///
/// Returns the total quantity moved.
pub fn redistribute<C: ItemContainer>(
    container: &mut C,
    groups: PotionGroups<C::Meta>,
    cap: u32,
) -> u32 {
    let mut moved = 0u32;
    // None = unlimited.
    let mut budget: Option<u32> = if cap == 0 { None } else { Some(cap) };

    'groups: for (key, members) in groups {
        // A lone stack stays untouched; rewriting it would be a pointless
        // churn of the slot.
        if members.len() <= 1 {
            continue;
        }

        let total: u32 = members.iter().map(|(_, stack)| stack.quantity).sum();
        let full_stacks = total / POTION_STACK_SIZE;
        let remainder = total % POTION_STACK_SIZE;

        // Clear all source slots first, then re-place from the pooled total.
        for (slot_index, _) in &members {
            container.set_slot(*slot_index, None);
        }
        let template = members[0].1.clone();

        let stacks_to_add = match budget {
            Some(remaining) => std::cmp::min(full_stacks, remaining / POTION_STACK_SIZE),
            None => full_stacks,
        };
        log::debug!(
            "[Stacker] Merging {} slots of {} (total {}): {} full stack(s) + {} remainder",
            members.len(),
            key.kind().as_str(),
            total,
            stacks_to_add,
            remainder
        );

        for _ in 0..stacks_to_add {
            let mut stack = template.clone();
            stack.quantity = POTION_STACK_SIZE;
            let placed = insert_stack(container, stack);
            moved += placed;
            if let Some(remaining) = budget.as_mut() {
                *remaining = remaining.saturating_sub(placed);
            }
            if placed < POTION_STACK_SIZE {
                log::warn!(
                    "[Stacker] Container out of room while re-placing {}; stopping run",
                    key.kind().as_str()
                );
                break 'groups;
            }
        }

        if remainder > 0 {
            let to_add = match budget {
                Some(remaining) => std::cmp::min(remainder, remaining),
                None => remainder,
            };
            if to_add > 0 {
                let mut stack = template.clone();
                stack.quantity = to_add;
                let placed = insert_stack(container, stack);
                moved += placed;
                if let Some(remaining) = budget.as_mut() {
                    *remaining = remaining.saturating_sub(placed);
                }
                if placed < to_add {
                    // The unplaced remainder is gone; same policy as above.
                    log::warn!(
                        "[Stacker] Dropped {} remainder of {}; container full",
                        to_add - placed,
                        key.kind().as_str()
                    );
                    break 'groups;
                }
            }
        }

        if budget == Some(0) {
            log::debug!("[Stacker] Per-run cap of {} reached; stopping run", cap);
            break;
        }
    }

    moved
}

// --- Top-Level Operation ---

/// Consolidates duplicate potion stacks in the owner's container.
///
/// At most one run per owner is admitted at a time; a second call while one
/// is active returns [`StackError::AlreadyBusy`] without touching anything.
/// The busy entry is released on every exit path, including an unwind out of
/// the compute phase, which is reported as [`StackError::Unexpected`].
///
/// The call itself is synchronous. Hosts that want the scan off their
/// control path run consolidation on a worker; the `&mut` container receiver
/// keeps mutation confined to whichever context owns the container.
pub fn consolidate<C, K>(
    container: &mut C,
    guard: &BusyGuard<K>,
    owner: K,
    cap: u32,
) -> Result<StackReport, StackError>
where
    C: ItemContainer,
    K: Eq + Hash + Clone + Debug,
{
    if !guard.try_enter(owner.clone()) {
        log::debug!("[Stacker] Rejecting run for owner {:?}: already in flight", owner);
        return Err(StackError::AlreadyBusy);
    }
    let owner_ref = &owner;
    let _pass = BusyPass::new(guard, owner_ref);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let groups = scan_potions(container);
        redistribute(container, groups, cap)
    }));

    match outcome {
        Ok(moved) => {
            if moved > 0 {
                log::info!("[Stacker] Stacked {} potions for owner {:?}", moved, owner_ref);
            } else {
                log::info!("[Stacker] No potions to stack for owner {:?}", owner_ref);
            }
            Ok(StackReport { moved })
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::warn!(
                "[Stacker] Error while stacking potions for owner {:?}: {}",
                owner_ref,
                reason
            );
            Err(StackError::Unexpected(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SlotInventory;
    use crate::items::{ModernPotionMeta, PotionEffect};

    type Inv = SlotInventory<ModernPotionMeta>;

    fn splash(quantity: u32) -> ItemStack<ModernPotionMeta> {
        ItemStack::new("SPLASH_POTION", quantity)
    }

    fn brewed(quantity: u32, effect: &str) -> ItemStack<ModernPotionMeta> {
        ItemStack::with_meta(
            "POTION",
            quantity,
            ModernPotionMeta {
                effects: vec![PotionEffect::new(effect, 1, 200)],
                ..Default::default()
            },
        )
    }

    fn total_quantity(inv: &Inv) -> u32 {
        (0..inv.num_slots())
            .filter_map(|i| inv.get_slot(i))
            .map(|s| s.quantity)
            .sum()
    }

    #[test]
    fn scan_groups_by_identity_in_slot_order() {
        let mut inv = Inv::new(8);
        inv.set_slot(1, Some(splash(10)));
        inv.set_slot(3, Some(ItemStack::new("STONE", 5)));
        inv.set_slot(4, Some(splash(6)));
        inv.set_slot(6, Some(brewed(2, "HARMING")));

        let groups = scan_potions(&inv);
        assert_eq!(groups.len(), 2);
        let splash_group = groups
            .get(&stack_key(&splash(1)))
            .expect("splash group present");
        let slots: Vec<usize> = splash_group.iter().map(|(i, _)| *i).collect();
        assert_eq!(slots, vec![1, 4]);
    }

    #[test]
    fn scan_does_not_mutate() {
        let mut inv = Inv::new(4);
        inv.set_slot(0, Some(splash(10)));
        inv.set_slot(2, Some(splash(3)));
        let before = inv.clone();
        let first = scan_potions(&inv);
        let second = scan_potions(&inv);
        assert_eq!(inv, before);
        assert_eq!(first.len(), second.len());
        for (key, members) in &first {
            assert_eq!(second.get(key), Some(members));
        }
    }

    #[test]
    fn example_scenario_three_tens_under_default_cap() {
        let mut inv = Inv::player_sized();
        inv.set_slot(0, Some(splash(10)));
        inv.set_slot(1, Some(splash(10)));
        inv.set_slot(2, Some(splash(10)));

        let groups = scan_potions(&inv);
        let moved = redistribute(&mut inv, groups, 64);

        assert_eq!(moved, 30);
        // 30 = one full 16-stack plus a 14 remainder, re-placed from slot 0.
        assert_eq!(inv.get_slot(0).map(|s| s.quantity), Some(16));
        assert_eq!(inv.get_slot(1).map(|s| s.quantity), Some(14));
        assert!(inv.get_slot(2).is_none());
        assert_eq!(total_quantity(&inv), 30);
        for i in 3..inv.num_slots() {
            assert!(inv.get_slot(i).is_none());
        }
    }

    #[test]
    fn singleton_groups_are_left_untouched() {
        let mut inv = Inv::new(6);
        inv.set_slot(0, Some(splash(10)));
        inv.set_slot(2, Some(brewed(3, "HARMING")));
        inv.set_slot(4, Some(ItemStack::new("STONE", 40)));
        let before = inv.clone();

        let groups = scan_potions(&inv);
        let moved = redistribute(&mut inv, groups, 64);

        assert_eq!(moved, 0);
        assert_eq!(inv, before);
    }

    #[test]
    fn unlimited_cap_conserves_quantity() {
        let mut inv = Inv::new(12);
        // Total 45: two full stacks plus a remainder of 13.
        inv.set_slot(0, Some(splash(16)));
        inv.set_slot(3, Some(splash(15)));
        inv.set_slot(7, Some(splash(14)));

        let groups = scan_potions(&inv);
        let moved = redistribute(&mut inv, groups, 0);

        assert_eq!(moved, 45);
        assert_eq!(total_quantity(&inv), 45);
        let occupied: Vec<u32> = (0..inv.num_slots())
            .filter_map(|i| inv.get_slot(i))
            .map(|s| s.quantity)
            .collect();
        assert_eq!(occupied, vec![16, 16, 13]);
    }

    #[test]
    fn cap_bounds_total_placed() {
        let mut inv = Inv::new(8);
        inv.set_slot(0, Some(splash(10)));
        inv.set_slot(1, Some(splash(10)));
        inv.set_slot(2, Some(splash(10)));

        let groups = scan_potions(&inv);
        let moved = redistribute(&mut inv, groups, 20);

        // One full stack (16) then the remainder clipped to the 4 left in
        // budget; the other 10 are net emptied, not duplicated.
        assert_eq!(moved, 20);
        assert_eq!(total_quantity(&inv), 20);
    }

    #[test]
    fn cap_smaller_than_one_stack_places_nothing_full() {
        let mut inv = Inv::new(4);
        inv.set_slot(0, Some(splash(10)));
        inv.set_slot(1, Some(splash(10)));

        let groups = scan_potions(&inv);
        let moved = redistribute(&mut inv, groups, 5);

        // No full stack fits in a budget of 5; remainder 4 is clipped to 5
        // but is itself 4, so 4 move.
        assert_eq!(moved, 4);
        assert_eq!(total_quantity(&inv), 4);
    }

    #[test]
    fn short_full_stack_placement_stops_run() {
        // Host-supplied overfull stacks: 50 potions in a 2-slot container can
        // only repack into two full 16-stacks. The third full stack cannot be
        // placed, which ends the run; the overflow is gone, not restored.
        let mut inv = Inv::new(2);
        inv.set_slot(0, Some(splash(30)));
        inv.set_slot(1, Some(splash(20)));

        let groups = scan_potions(&inv);
        let moved = redistribute(&mut inv, groups, 0);

        assert_eq!(moved, 32);
        assert_eq!(total_quantity(&inv), 32);
        assert_eq!(inv.get_slot(0).map(|s| s.quantity), Some(16));
        assert_eq!(inv.get_slot(1).map(|s| s.quantity), Some(16));
    }

    #[test]
    fn groups_with_distinct_effects_never_cross_merge() {
        let mut inv = Inv::new(8);
        inv.set_slot(0, Some(brewed(10, "HARMING")));
        inv.set_slot(1, Some(brewed(10, "SWIFTNESS")));
        inv.set_slot(2, Some(brewed(10, "HARMING")));
        inv.set_slot(3, Some(brewed(10, "SWIFTNESS")));

        let groups = scan_potions(&inv);
        assert_eq!(groups.len(), 2);
        let moved = redistribute(&mut inv, groups, 0);

        assert_eq!(moved, 40);
        let mut quantities: Vec<(String, u32)> = (0..inv.num_slots())
            .filter_map(|i| inv.get_slot(i))
            .map(|s| {
                let effect = s.meta.as_ref().and_then(|m| m.effects.first().cloned());
                (
                    effect.map(|e| e.effect_type).unwrap_or_default(),
                    s.quantity,
                )
            })
            .collect();
        quantities.sort();
        assert_eq!(
            quantities,
            vec![
                ("HARMING".to_string(), 4),
                ("HARMING".to_string(), 16),
                ("SWIFTNESS".to_string(), 4),
                ("SWIFTNESS".to_string(), 16),
            ]
        );
    }

    #[test]
    fn non_potion_slots_are_never_touched() {
        let mut inv = Inv::new(6);
        inv.set_slot(0, Some(splash(10)));
        inv.set_slot(1, Some(ItemStack::new("STONE", 40)));
        inv.set_slot(2, Some(splash(10)));
        inv.set_slot(3, Some(ItemStack::new("WOOD", 12)));

        let groups = scan_potions(&inv);
        let moved = redistribute(&mut inv, groups, 0);

        assert_eq!(moved, 20);
        assert_eq!(inv.get_slot(1).map(|s| s.quantity), Some(40));
        assert_eq!(inv.get_slot(3).map(|s| s.quantity), Some(12));
    }

    #[test]
    fn consolidate_reports_and_releases_guard() {
        let mut inv = Inv::player_sized();
        inv.set_slot(0, Some(splash(10)));
        inv.set_slot(5, Some(splash(10)));
        let guard: BusyGuard<u64> = BusyGuard::new();

        let report = consolidate(&mut inv, &guard, 1, 64).expect("run admitted");
        assert_eq!(report.moved, 20);
        assert!(!report.is_noop());
        assert!(!guard.is_busy(&1));
    }

    #[test]
    fn consolidate_rejects_busy_owner_without_mutating() {
        let mut inv = Inv::new(4);
        inv.set_slot(0, Some(splash(10)));
        inv.set_slot(1, Some(splash(10)));
        let before = inv.clone();
        let guard: BusyGuard<u64> = BusyGuard::new();
        assert!(guard.try_enter(1));

        let result = consolidate(&mut inv, &guard, 1, 64);
        assert!(matches!(result, Err(StackError::AlreadyBusy)));
        assert_eq!(inv, before);
        // The rejection must not release the active run's entry.
        assert!(guard.is_busy(&1));
    }
}
