//! Pure probability-table construction. Nothing in here draws randomness.
use smallvec::SmallVec;

use super::{BoxTier, CollectibleRarity, DropKind, PotencyTier, RewardCategory};
use crate::catalog::CollectiblePool;
use crate::config::{PityConfig, RewardConfigError};
use crate::constants::{
    CATEGORY_GOLD, CATEGORY_SILVER, CATEGORY_WOOD, DROP_COLLECTIBLE_WEIGHTS,
    DROP_CONSUMABLE_WEIGHTS, DROP_LOOT_BOX_WEIGHTS, POTENCY_GOLD, POTENCY_SILVER, POTENCY_WOOD,
    PROBABILITY_FLOOR, PROBABILITY_MAX, PROBABILITY_SUM_TOLERANCE, RARITY_GOLD, RARITY_SILVER,
    RARITY_WOOD, TIER_BASE_GOLD, TIER_BASE_SILVER, TIER_BASE_WOOD,
};
use crate::effects::EffectTotals;
use crate::numbers::{clamp_unit, non_negative, u64_to_f64};

/// Ordered weighted buckets. Iteration order is the draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable<T> {
    entries: SmallVec<[(T, f64); 9]>,
}

impl<T: Copy + PartialEq> WeightTable<T> {
    /// Build a table, mapping negative or NaN weights to zero.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (T, f64)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(bucket, weight)| (bucket, non_negative(weight)))
                .collect(),
        }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, weight)| weight).sum()
    }

    #[must_use]
    pub fn weight_of(&self, bucket: T) -> f64 {
        self.entries
            .iter()
            .filter(|(candidate, _)| *candidate == bucket)
            .map(|(_, weight)| weight)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(T, f64)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last bucket carrying weight, or the last bucket at all.
    #[must_use]
    pub fn fallback(&self) -> Option<T> {
        self.entries
            .iter()
            .rev()
            .find(|(_, weight)| *weight > 0.0)
            .or_else(|| self.entries.last())
            .map(|(bucket, _)| *bucket)
    }

    #[must_use]
    pub fn sums_to_one(&self) -> bool {
        (self.total() - PROBABILITY_MAX).abs() <= PROBABILITY_SUM_TOLERANCE
    }
}

#[must_use]
pub fn base_tier_table() -> WeightTable<BoxTier> {
    WeightTable::new([
        (BoxTier::Wood, TIER_BASE_WOOD),
        (BoxTier::Silver, TIER_BASE_SILVER),
        (BoxTier::Gold, TIER_BASE_GOLD),
    ])
}

/// Luck drains wood proportionally and keeps the silver:gold ratio of the rest.
#[must_use]
pub fn luck_tier_table(luck: f64) -> WeightTable<BoxTier> {
    let wood = TIER_BASE_WOOD * (PROBABILITY_MAX - clamp_unit(luck));
    let remainder = PROBABILITY_MAX - wood;
    let upper = TIER_BASE_SILVER + TIER_BASE_GOLD;
    WeightTable::new([
        (BoxTier::Wood, wood),
        (BoxTier::Silver, remainder * TIER_BASE_SILVER / upper),
        (BoxTier::Gold, remainder * TIER_BASE_GOLD / upper),
    ])
}

/// Tier odds for blank boxes opened with the pity counter in play.
#[must_use]
pub fn pity_tier_table(
    totals: &EffectTotals,
    pity_counter: u32,
    config: &PityConfig,
) -> WeightTable<BoxTier> {
    let wood = TIER_BASE_WOOD * (PROBABILITY_MAX - clamp_unit(totals.luck + totals.rare_luck));
    let remainder = PROBABILITY_MAX - wood;
    let base_gold_share = TIER_BASE_GOLD / (TIER_BASE_SILVER + TIER_BASE_GOLD);
    let legendary = non_negative(totals.legendary_luck) * non_negative(config.legendary_weight);
    let pity_bonus = u64_to_f64(u64::from(pity_counter)) * non_negative(config.step);
    let gold_share =
        (base_gold_share * (PROBABILITY_MAX + legendary) + pity_bonus).min(PROBABILITY_MAX);
    let gold = remainder * gold_share;
    WeightTable::new([
        (BoxTier::Wood, wood),
        (BoxTier::Silver, (remainder - gold).max(PROBABILITY_FLOOR)),
        (BoxTier::Gold, gold),
    ])
}

/// Consumable/collectible split for a tier. An empty pool forces consumables.
#[must_use]
pub fn category_table(tier: BoxTier, collectibles_available: bool) -> WeightTable<RewardCategory> {
    let (consumable, collectible) = match tier {
        BoxTier::Wood => CATEGORY_WOOD,
        BoxTier::Silver => CATEGORY_SILVER,
        BoxTier::Gold => CATEGORY_GOLD,
    };
    if !collectibles_available {
        return WeightTable::new([
            (RewardCategory::Consumable, PROBABILITY_MAX),
            (RewardCategory::Collectible, PROBABILITY_FLOOR),
        ]);
    }
    WeightTable::new([
        (RewardCategory::Consumable, consumable),
        (RewardCategory::Collectible, collectible),
    ])
}

#[must_use]
pub fn potency_table(tier: BoxTier) -> WeightTable<PotencyTier> {
    let weights = match tier {
        BoxTier::Wood => POTENCY_WOOD,
        BoxTier::Silver => POTENCY_SILVER,
        BoxTier::Gold => POTENCY_GOLD,
    };
    WeightTable::new(PotencyTier::ALL.iter().copied().zip(weights))
}

#[must_use]
pub fn rarity_table(tier: BoxTier) -> WeightTable<CollectibleRarity> {
    let weights = match tier {
        BoxTier::Wood => RARITY_WOOD,
        BoxTier::Silver => RARITY_SILVER,
        BoxTier::Gold => RARITY_GOLD,
    };
    WeightTable::new(CollectibleRarity::ALL.iter().copied().zip(weights))
}

/// Rarity table restricted to rarities still present in the pool.
#[must_use]
pub fn available_rarity_table(tier: BoxTier, pool: &CollectiblePool) -> WeightTable<CollectibleRarity> {
    WeightTable::new(rarity_table(tier).iter().map(|(rarity, weight)| {
        let weight = if pool.has_rarity(*rarity) { *weight } else { 0.0 };
        (*rarity, weight)
    }))
}

/// All nine bonus-drop buckets at their static weights.
#[must_use]
pub fn base_drop_table() -> WeightTable<DropKind> {
    let consumables = PotencyTier::ALL
        .iter()
        .zip(DROP_CONSUMABLE_WEIGHTS)
        .map(|(potency, weight)| (DropKind::Consumable(*potency), weight));
    let boxes = BoxTier::ALL
        .iter()
        .zip(DROP_LOOT_BOX_WEIGHTS)
        .map(|(tier, weight)| (DropKind::LootBox(*tier), weight));
    let collectibles = CollectibleRarity::ALL
        .iter()
        .zip(DROP_COLLECTIBLE_WEIGHTS)
        .map(|(rarity, weight)| (DropKind::Collectible(*rarity), weight));
    WeightTable::new(consumables.chain(boxes).chain(collectibles))
}

/// Unified bonus-drop table for the current pool. Weight of rarities the pool
/// cannot supply moves proportionally onto the six non-collectible buckets.
#[must_use]
pub fn unified_drop_table(pool: &CollectiblePool) -> WeightTable<DropKind> {
    let base = base_drop_table();
    let removed: f64 = base
        .iter()
        .filter_map(|(kind, weight)| match kind {
            DropKind::Collectible(rarity) if !pool.has_rarity(*rarity) => Some(*weight),
            _ => None,
        })
        .sum();
    let kept: f64 = base
        .iter()
        .filter(|(kind, _)| !matches!(kind, DropKind::Collectible(_)))
        .map(|(_, weight)| weight)
        .sum();
    let scale = if kept > 0.0 { removed / kept } else { 0.0 };

    WeightTable::new(base.iter().map(|(kind, weight)| {
        let adjusted = match kind {
            DropKind::Collectible(rarity) => {
                if pool.has_rarity(*rarity) {
                    *weight
                } else {
                    0.0
                }
            }
            DropKind::Consumable(_) | DropKind::LootBox(_) => weight * (1.0 + scale),
        };
        (*kind, adjusted)
    }))
}

/// Check that every static distribution sums to one.
///
/// # Errors
///
/// Returns the first table whose weights drift from 1.
pub fn verify_static_tables() -> Result<(), RewardConfigError> {
    check("tier.base", &base_tier_table())?;
    check("drop.unified", &base_drop_table())?;
    for tier in BoxTier::ALL {
        check("category", &category_table(*tier, true))?;
        check("potency", &potency_table(*tier))?;
        check("rarity", &rarity_table(*tier))?;
    }
    Ok(())
}

fn check<T: Copy + PartialEq>(table: &'static str, weights: &WeightTable<T>) -> Result<(), RewardConfigError> {
    if weights.sums_to_one() {
        Ok(())
    } else {
        Err(RewardConfigError::ProbabilityTable {
            table,
            sum: weights.total(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CollectibleEntry;
    use crate::constants::FLOAT_EPSILON;

    fn pool_of(rarities: &[CollectibleRarity]) -> CollectiblePool {
        CollectiblePool::from_entries(
            rarities
                .iter()
                .enumerate()
                .map(|(idx, rarity)| CollectibleEntry {
                    id: format!("c{idx}"),
                    name: String::new(),
                    rarity: *rarity,
                })
                .collect(),
        )
    }

    #[test]
    fn every_layer_sums_to_one() {
        assert_eq!(verify_static_tables(), Ok(()));
        for tier in BoxTier::ALL {
            assert!(category_table(*tier, false).sums_to_one());
        }
        for luck in [0.0, 0.3, 1.0, 4.0] {
            assert!(luck_tier_table(luck).sums_to_one(), "luck {luck}");
        }
        let config = PityConfig::default();
        for pity in [0, 5, 24, 40] {
            let totals = EffectTotals {
                luck: 0.2,
                rare_luck: 0.3,
                legendary_luck: 0.5,
                ..EffectTotals::default()
            };
            assert!(pity_tier_table(&totals, pity, &config).sums_to_one(), "pity {pity}");
        }
    }

    #[test]
    fn sub_tiers_exclude_extremes() {
        assert!(potency_table(BoxTier::Wood).weight_of(PotencyTier::Strong).abs() < FLOAT_EPSILON);
        assert!(potency_table(BoxTier::Gold).weight_of(PotencyTier::Weak).abs() < FLOAT_EPSILON);
        assert!(
            rarity_table(BoxTier::Wood)
                .weight_of(CollectibleRarity::Legendary)
                .abs()
                < FLOAT_EPSILON
        );
        assert!(
            rarity_table(BoxTier::Gold)
                .weight_of(CollectibleRarity::Common)
                .abs()
                < FLOAT_EPSILON
        );
    }

    #[test]
    fn full_luck_empties_wood_and_keeps_ratio() {
        let table = luck_tier_table(1.0);
        assert!(table.weight_of(BoxTier::Wood).abs() < FLOAT_EPSILON);
        let silver = table.weight_of(BoxTier::Silver);
        let gold = table.weight_of(BoxTier::Gold);
        assert!((silver / gold - 5.0).abs() < 1e-6);
        assert!(gold > TIER_BASE_GOLD);
        assert_eq!(luck_tier_table(3.0), table, "luck clamps at 1");
        let unlucky = luck_tier_table(-1.0);
        for (tier, weight) in base_tier_table().iter() {
            assert!((unlucky.weight_of(*tier) - weight).abs() < FLOAT_EPSILON);
        }
    }

    #[test]
    fn pity_bonus_raises_gold_share_until_capped() {
        let config = PityConfig::default();
        let totals = EffectTotals::default();
        let fresh = pity_tier_table(&totals, 0, &config);
        assert!((fresh.weight_of(BoxTier::Gold) - TIER_BASE_GOLD).abs() < FLOAT_EPSILON);

        let ten = pity_tier_table(&totals, 10, &config);
        // gold share of the remaining 0.30 = 1/6 + 0.30
        let expected = 0.30 * (1.0 / 6.0 + 0.30);
        assert!((ten.weight_of(BoxTier::Gold) - expected).abs() < FLOAT_EPSILON);

        let capped = pity_tier_table(&totals, 40, &config);
        assert!(capped.weight_of(BoxTier::Silver).abs() < FLOAT_EPSILON);
        assert!((capped.weight_of(BoxTier::Gold) - 0.30).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn rare_luck_adds_to_luck_on_pity_path() {
        let config = PityConfig::default();
        let totals = EffectTotals {
            luck: 0.25,
            rare_luck: 0.25,
            ..EffectTotals::default()
        };
        let table = pity_tier_table(&totals, 0, &config);
        assert!((table.weight_of(BoxTier::Wood) - 0.35).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn missing_rarities_redistribute_to_other_buckets() {
        let full = unified_drop_table(&pool_of(CollectibleRarity::ALL));
        assert_eq!(full, base_drop_table());

        let empty = unified_drop_table(&CollectiblePool::default());
        assert!(empty.sums_to_one());
        for rarity in CollectibleRarity::ALL {
            assert!(empty.weight_of(DropKind::Collectible(*rarity)).abs() < FLOAT_EPSILON);
        }
        // 0.20 collectible weight spread over the 0.80 held by the rest
        let weak = empty.weight_of(DropKind::Consumable(PotencyTier::Weak));
        assert!((weak - 0.30 * 1.25).abs() < FLOAT_EPSILON);

        let partial = unified_drop_table(&pool_of(&[CollectibleRarity::Common]));
        assert!(partial.sums_to_one());
        assert!(
            (partial.weight_of(DropKind::Collectible(CollectibleRarity::Common)) - 0.12).abs()
                < FLOAT_EPSILON
        );
    }

    #[test]
    fn empty_pool_forces_consumable_category() {
        let table = category_table(BoxTier::Gold, false);
        assert!(table.weight_of(RewardCategory::Collectible).abs() < FLOAT_EPSILON);
        assert_eq!(table.fallback(), Some(RewardCategory::Consumable));
    }
}
