use crate::items::{ItemKind, ItemStack, PotionAttributes, PotionEffect};

// --- Identity Classification ---

/// Whether a stack is relevant to potion consolidation. Empty slots never
/// reach this check; a potion-like stack with no extended metadata is still
/// relevant.
pub fn is_potion_stack<M: PotionAttributes>(stack: &ItemStack<M>) -> bool {
    stack.kind.is_potion_like()
}

/// Canonical fungibility key for a stack. Two stacks with equal keys are
/// interchangeable and may be merged into one quantity pool.
///
/// Effects are kept in list order: permuted effect lists produce distinct
/// keys. Consumers rely on that strictness to keep intentionally-distinct
/// custom potions from merging, so it is not normalized here.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StackKey {
    kind: ItemKind,
    color: Option<u32>,
    base_variant: Option<String>,
    effects: Vec<PotionEffect>,
}

impl StackKey {
    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }
}

/// Derives the identity key for a stack.
///
/// The key starts from the kind name; a stack without metadata keys on kind
/// alone, so all attribute-less stacks of one kind collide. When metadata is
/// present the fields contribute in fixed order: color tag, base-variant tag,
/// then each effect as (type, amplifier, duration). Each field is fetched
/// independently and skipped when the adapter cannot supply it, so key
/// construction is total and never fails.
pub fn stack_key<M: PotionAttributes>(stack: &ItemStack<M>) -> StackKey {
    let mut key = StackKey {
        kind: stack.kind.clone(),
        color: None,
        base_variant: None,
        effects: Vec::new(),
    };
    if let Some(meta) = &stack.meta {
        if let Some(color) = meta.color() {
            key.color = Some(color);
        }
        if let Some(variant) = meta.base_variant() {
            key.base_variant = Some(variant.to_string());
        }
        if let Some(effects) = meta.effects() {
            key.effects = effects.to_vec();
        }
    }
    key
}
