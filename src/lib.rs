//! In-process consolidation of duplicate potion stacks.
//!
//! A host (typically a game server) hands this crate a bounded slot container
//! and gets back the same potions merged into as few maximally-filled stacks
//! as a per-run cap allows. The crate owns the identity/grouping and
//! redistribution logic plus a per-owner mutual-exclusion guard; commands,
//! permissions, chat output, and config-file handling stay with the host.
//!
//! ```
//! use potion_stack::{consolidate, BusyGuard, ItemStack, SlotInventory, StackerConfig};
//! use potion_stack::{ItemContainer, ModernPotionMeta};
//!
//! let mut inventory: SlotInventory<ModernPotionMeta> = SlotInventory::player_sized();
//! inventory.set_slot(0, Some(ItemStack::new("SPLASH_POTION", 10)));
//! inventory.set_slot(1, Some(ItemStack::new("SPLASH_POTION", 10)));
//!
//! let guard: BusyGuard<u64> = BusyGuard::new();
//! let config = StackerConfig::default();
//! let report = consolidate(&mut inventory, &guard, 42u64, config.cap()).unwrap();
//! assert_eq!(report.moved, 20);
//! ```

mod busy;
mod config;
mod container;
mod error;
mod identity;
mod items;
mod stacker;

pub use busy::BusyGuard;
pub use config::{StackerConfig, DEFAULT_MAX_POTIONS};
pub use container::{
    insert_stack, is_container_empty, ItemContainer, SlotInventory, PLAYER_INVENTORY_SLOTS,
};
pub use error::StackError;
pub use identity::{is_potion_stack, stack_key, StackKey};
pub use items::{
    ItemKind, ItemStack, LegacyPotionMeta, ModernPotionMeta, PotionAttributes, PotionEffect,
    DEFAULT_STACK_SIZE, POTION_STACK_SIZE,
};
pub use stacker::{consolidate, redistribute, scan_potions, PotionGroups, StackReport};
