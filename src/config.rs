use serde::{Deserialize, Serialize};

/// Default per-run cap on the total quantity placed back into the container.
pub const DEFAULT_MAX_POTIONS: u32 = 64;

/// The single setting this crate consumes, mirroring the host's
/// `max-potions-to-stack` configuration key. The host owns loading and
/// reloading its config file; this type just gives the value its semantics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StackerConfig {
    /// Per-run quantity cap. 0 (or an absent key) means unlimited.
    pub max_potions_to_stack: u32,
}

impl Default for StackerConfig {
    fn default() -> Self {
        StackerConfig {
            max_potions_to_stack: DEFAULT_MAX_POTIONS,
        }
    }
}

impl StackerConfig {
    /// The cap value to hand to `consolidate`. 0 is the unlimited sentinel.
    pub fn cap(&self) -> u32 {
        self.max_potions_to_stack
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_potions_to_stack == 0
    }
}
