//! Loot resolution: box tiers, reward categories, potency and rarity.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::state::LootBoxRecord;

mod drops;
mod resolver;
pub mod tables;

pub use drops::{DropKind, roll_unified_drop};
pub use resolver::{
    OpenBoxRequest, OpenedBox, TierRoll, advance_pity, collectible_payload, consumable_payload, open_box,
    pick_weighted, resolve_reward, roll_box_tier, roll_box_tier_with_pity, roll_category,
    roll_potency, roll_rarity,
};
pub use tables::WeightTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxTier {
    Wood,
    Silver,
    Gold,
}

impl BoxTier {
    pub const ALL: &'static [Self] = &[Self::Wood, Self::Silver, Self::Gold];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wood => "wood",
            Self::Silver => "silver",
            Self::Gold => "gold",
        }
    }

    /// One step up; gold stays gold.
    #[must_use]
    pub const fn upgraded(self) -> Self {
        match self {
            Self::Wood => Self::Silver,
            Self::Silver | Self::Gold => Self::Gold,
        }
    }

    #[must_use]
    pub const fn is_top(self) -> bool {
        matches!(self, Self::Gold)
    }
}

impl fmt::Display for BoxTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoxTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wood" => Ok(Self::Wood),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardCategory {
    Consumable,
    Collectible,
}

impl RewardCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Consumable => "consumable",
            Self::Collectible => "collectible",
        }
    }
}

impl fmt::Display for RewardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PotencyTier {
    #[default]
    Weak,
    Medium,
    Strong,
}

impl PotencyTier {
    pub const ALL: &'static [Self] = &[Self::Weak, Self::Medium, Self::Strong];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

impl fmt::Display for PotencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectibleRarity {
    Common,
    Rare,
    Legendary,
}

impl CollectibleRarity {
    pub const ALL: &'static [Self] = &[Self::Common, Self::Rare, Self::Legendary];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Legendary => "legendary",
        }
    }
}

impl fmt::Display for CollectibleRarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete reward handed to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardPayload {
    Consumable {
        potency: PotencyTier,
        /// `None` when the catalog had nothing to offer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        definition_id: Option<String>,
    },
    Collectible {
        rarity: CollectibleRarity,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        collectible_id: Option<String>,
    },
    LootBox {
        record: LootBoxRecord,
    },
}

impl RewardPayload {
    #[must_use]
    pub const fn category(&self) -> Option<RewardCategory> {
        match self {
            Self::Consumable { .. } => Some(RewardCategory::Consumable),
            Self::Collectible { .. } => Some(RewardCategory::Collectible),
            Self::LootBox { .. } => None,
        }
    }
}

/// Result of opening one box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardResult {
    pub box_tier: BoxTier,
    pub category: RewardCategory,
    pub payload: RewardPayload,
}
