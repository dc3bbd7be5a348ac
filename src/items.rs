use serde::{Deserialize, Serialize};

use crate::identity::stack_key;

// --- Stack Size Constants ---

/// Maximum quantity of a potion-like item per slot. Potions stack to 16, not
/// the generic material limit.
pub const POTION_STACK_SIZE: u32 = 16;
/// Fallback per-slot limit for anything that is not potion-like.
pub const DEFAULT_STACK_SIZE: u32 = 64;

/// Kinds that are potions by exact name.
const POTION_KINDS: &[&str] = &["POTION", "SPLASH_POTION", "LINGERING_POTION"];

/// Name fragments that mark a kind as potion-like even when it is not an
/// exact match (brewed variants, bottles, prefixed forms).
const POTION_NAME_MARKERS: &[&str] = &[
    "potion",
    "splash_potion",
    "lingering_potion",
    "water_bottle",
    "harming",
    "healing",
    "poison",
    "regeneration",
    "strength",
    "weakness",
    "slowness",
    "swiftness",
    "fire_resistance",
    "invisibility",
    "leaping",
    "night_vision",
    "slow_falling",
    "turtle_master",
    "water_breathing",
    "luck",
    "unluck",
    "strong",
    "long",
    "thick",
    "mundane",
    "awkward",
];

// --- Item Kind ---

/// An item type, identified by its material-style name (e.g. "SPLASH_POTION").
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKind(String);

impl ItemKind {
    pub fn new(name: impl Into<String>) -> Self {
        ItemKind(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this kind participates in potion stacking.
    pub fn is_potion_like(&self) -> bool {
        if POTION_KINDS.contains(&self.0.as_str()) {
            return true;
        }
        let name = self.0.to_ascii_lowercase();
        POTION_NAME_MARKERS.iter().any(|marker| name.contains(marker))
    }

    /// Per-slot quantity limit for this kind.
    pub fn max_stack_size(&self) -> u32 {
        if self.is_potion_like() {
            POTION_STACK_SIZE
        } else {
            DEFAULT_STACK_SIZE
        }
    }
}

impl From<&str> for ItemKind {
    fn from(name: &str) -> Self {
        ItemKind::new(name)
    }
}

// --- Potion Metadata ---

/// One status effect carried by a potion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PotionEffect {
    pub effect_type: String,
    pub amplifier: i32,
    pub duration: i32,
}

impl PotionEffect {
    pub fn new(effect_type: impl Into<String>, amplifier: i32, duration: i32) -> Self {
        PotionEffect {
            effect_type: effect_type.into(),
            amplifier,
            duration,
        }
    }
}

/// Read-only view over a stack's extended potion metadata.
///
/// The underlying representation differs between data-model versions, so each
/// version gets its own adapter implementing this trait. Every getter is
/// independently best-effort: a field the version cannot supply is simply
/// `None`, and identity-key construction skips it.
pub trait PotionAttributes {
    /// Explicit color tag, if one was set.
    fn color(&self) -> Option<u32>;
    /// Base-variant tag from the single-descriptor field, if populated.
    fn base_variant(&self) -> Option<&str>;
    /// The effect list, in its stored order. `None` when no effects exist.
    fn effects(&self) -> Option<&[PotionEffect]>;
}

/// Legacy data-model adapter: one base-variant descriptor plus at most one
/// custom effect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPotionMeta {
    pub color: Option<u32>,
    pub base_variant: Option<String>,
    pub effect: Option<PotionEffect>,
}

impl PotionAttributes for LegacyPotionMeta {
    fn color(&self) -> Option<u32> {
        self.color
    }

    fn base_variant(&self) -> Option<&str> {
        self.base_variant.as_deref()
    }

    fn effects(&self) -> Option<&[PotionEffect]> {
        self.effect.as_ref().map(std::slice::from_ref)
    }
}

/// Modern data-model adapter: a full custom-effect list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModernPotionMeta {
    pub color: Option<u32>,
    pub base_variant: Option<String>,
    pub effects: Vec<PotionEffect>,
}

impl PotionAttributes for ModernPotionMeta {
    fn color(&self) -> Option<u32> {
        self.color
    }

    fn base_variant(&self) -> Option<&str> {
        self.base_variant.as_deref()
    }

    fn effects(&self) -> Option<&[PotionEffect]> {
        if self.effects.is_empty() {
            None
        } else {
            Some(&self.effects)
        }
    }
}

// --- Item Stack ---

/// A quantity of one item kind occupying a single slot, with optional
/// extended metadata. Metadata is only ever read, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemStack<M> {
    pub kind: ItemKind,
    pub quantity: u32,
    pub meta: Option<M>,
}

impl<M> ItemStack<M> {
    pub fn new(kind: impl Into<ItemKind>, quantity: u32) -> Self {
        ItemStack {
            kind: kind.into(),
            quantity,
            meta: None,
        }
    }

    pub fn with_meta(kind: impl Into<ItemKind>, quantity: u32, meta: M) -> Self {
        ItemStack {
            kind: kind.into(),
            quantity,
            meta: Some(meta),
        }
    }

    /// Per-slot limit for this stack, derived from its kind.
    pub fn max_stack_size(&self) -> u32 {
        self.kind.max_stack_size()
    }
}

/// Computes the outcome of merging `source` onto `target`.
/// Returns (quantity transferred, source new quantity, target new quantity,
/// source fully emptied) or an error when the stacks cannot merge at all.
pub(crate) fn calculate_merge_result<M: PotionAttributes>(
    source: &ItemStack<M>,
    target: &ItemStack<M>,
) -> Result<(u32, u32, u32, bool), String> {
    if stack_key(source) != stack_key(target) {
        return Err("Cannot merge stacks with different identities".to_string());
    }
    let space_available = target.max_stack_size().saturating_sub(target.quantity);
    if space_available == 0 {
        return Err("Target stack is already full".to_string());
    }
    let transfer_qty = std::cmp::min(source.quantity, space_available);
    Ok((
        transfer_qty,
        source.quantity - transfer_qty,
        target.quantity + transfer_qty,
        transfer_qty == source.quantity,
    ))
}
