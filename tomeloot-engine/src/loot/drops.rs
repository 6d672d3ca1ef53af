use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::resolver::pick_weighted;
use super::tables::unified_drop_table;
use super::{BoxTier, CollectibleRarity, PotencyTier};
use crate::catalog::CollectiblePool;

/// One bucket of the unified bonus-drop table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "grade", rename_all = "snake_case")]
pub enum DropKind {
    Consumable(PotencyTier),
    LootBox(BoxTier),
    Collectible(CollectibleRarity),
}

impl DropKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Consumable(_) => "consumable",
            Self::LootBox(_) => "loot_box",
            Self::Collectible(_) => "collectible",
        }
    }
}

/// Single draw against the unified table for the current pool.
pub fn roll_unified_drop<R: RngCore + ?Sized>(pool: &CollectiblePool, rng: &mut R) -> DropKind {
    let table = unified_drop_table(pool);
    let kind = pick_weighted(&table, rng).unwrap_or(DropKind::Consumable(PotencyTier::Weak));
    log::trace!("unified drop -> {kind:?}");
    kind
}
