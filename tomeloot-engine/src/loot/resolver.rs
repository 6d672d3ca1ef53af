use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::tables::{
    WeightTable, available_rarity_table, category_table, luck_tier_table, pity_tier_table,
    potency_table,
};
use super::{BoxTier, CollectibleRarity, PotencyTier, RewardCategory, RewardPayload, RewardResult};
use crate::catalog::{CollectiblePool, ConsumableCatalog};
use crate::config::{PityConfig, RewardConfig};
use crate::effects::{EffectTotals, Modifier, resolve_effect_totals};
use crate::rng::{pick_index, unit_draw};
use crate::state::{LootBoxRecord, PityState, UserProgress};

/// Tier produced by the pity path together with the advanced counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRoll {
    pub tier: BoxTier,
    pub pity: PityState,
    /// The hard cap forced gold without drawing.
    pub forced: bool,
}

/// Inputs for opening one earned box.
#[derive(Debug, Clone, Copy)]
pub struct OpenBoxRequest<'a> {
    pub record: &'a LootBoxRecord,
    pub progress: &'a UserProgress,
    pub modifiers: &'a [Modifier],
    pub scopes: &'a [String],
    pub catalog: &'a ConsumableCatalog,
    pub pool: &'a CollectiblePool,
    pub config: &'a RewardConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenedBox {
    /// The record with its tier filled in.
    pub record: LootBoxRecord,
    pub tier: BoxTier,
    pub reward: RewardResult,
    pub progress: UserProgress,
    #[serde(default)]
    pub pity_forced: bool,
    #[serde(default)]
    pub upgraded: bool,
}

/// Draw one bucket: scale a unit draw by the total, then subtract weights in
/// order until the remainder reaches zero. Consumes exactly one draw.
pub fn pick_weighted<T, R>(table: &WeightTable<T>, rng: &mut R) -> Option<T>
where
    T: Copy + PartialEq,
    R: RngCore + ?Sized,
{
    if table.is_empty() {
        return None;
    }
    let total = table.total();
    let mut remainder = unit_draw(rng) * total;
    if total <= 0.0 {
        return table.fallback();
    }
    for (bucket, weight) in table.iter() {
        if *weight <= 0.0 {
            continue;
        }
        remainder -= weight;
        if remainder <= 0.0 {
            return Some(*bucket);
        }
    }
    table.fallback()
}

/// Earn-time tier roll with plain luck and no pity bookkeeping.
pub fn roll_box_tier<R: RngCore + ?Sized>(luck: f64, rng: &mut R) -> BoxTier {
    let tier = pick_weighted(&luck_tier_table(luck), rng).unwrap_or(BoxTier::Wood);
    log::trace!("box tier (luck {luck:.3}) -> {tier}");
    tier
}

/// Tier roll for blank boxes. At the hard cap gold is returned before any draw.
pub fn roll_box_tier_with_pity<R: RngCore + ?Sized>(
    totals: &EffectTotals,
    pity: PityState,
    config: &PityConfig,
    rng: &mut R,
) -> TierRoll {
    if pity.gold_pity_counter >= config.hard_cap {
        log::debug!(
            "pity cap reached at {} misses, forcing gold",
            pity.gold_pity_counter
        );
        return TierRoll {
            tier: BoxTier::Gold,
            pity: PityState::default(),
            forced: true,
        };
    }
    let table = pity_tier_table(totals, pity.gold_pity_counter, config);
    let tier = pick_weighted(&table, rng).unwrap_or(BoxTier::Wood);
    log::trace!(
        "box tier (pity {}) -> {tier}",
        pity.gold_pity_counter
    );
    TierRoll {
        tier,
        pity: advance_pity(pity, tier),
        forced: false,
    }
}

/// Gold resets the counter, anything else adds one miss.
#[must_use]
pub const fn advance_pity(pity: PityState, tier: BoxTier) -> PityState {
    if tier.is_top() {
        PityState {
            gold_pity_counter: 0,
        }
    } else {
        PityState {
            gold_pity_counter: pity.gold_pity_counter.saturating_add(1),
        }
    }
}

pub fn roll_category<R: RngCore + ?Sized>(
    tier: BoxTier,
    pool: &CollectiblePool,
    rng: &mut R,
) -> RewardCategory {
    pick_weighted(&category_table(tier, !pool.is_empty()), rng)
        .unwrap_or(RewardCategory::Consumable)
}

pub fn roll_potency<R: RngCore + ?Sized>(tier: BoxTier, rng: &mut R) -> PotencyTier {
    pick_weighted(&potency_table(tier), rng).unwrap_or(PotencyTier::Weak)
}

/// Rarity limited to what the pool holds and the tier allows. `None` when the
/// tier allows none of the available rarities.
pub fn roll_rarity<R: RngCore + ?Sized>(
    tier: BoxTier,
    pool: &CollectiblePool,
    rng: &mut R,
) -> Option<CollectibleRarity> {
    let table = available_rarity_table(tier, pool);
    if table.total() > 0.0 {
        pick_weighted(&table, rng)
    } else {
        None
    }
}

/// Uniform pick over the pool, ignoring tier limits. Only a guaranteed collectible uses it.
fn pick_any_rarity<R: RngCore + ?Sized>(
    pool: &CollectiblePool,
    rng: &mut R,
) -> Option<CollectibleRarity> {
    let idx = pick_index(pool.entries.len(), rng)?;
    pool.entries.get(idx).map(|entry| entry.rarity)
}

/// Consumable payload of `potency`, picked from the catalog.
pub fn consumable_payload<R: RngCore + ?Sized>(
    potency: PotencyTier,
    catalog: &ConsumableCatalog,
    rng: &mut R,
) -> RewardPayload {
    RewardPayload::Consumable {
        potency,
        definition_id: catalog
            .pick_by_potency(potency, rng)
            .map(|definition| definition.id.clone()),
    }
}

/// Collectible payload of `rarity`, picked from the unowned pool.
pub fn collectible_payload<R: RngCore + ?Sized>(
    rarity: CollectibleRarity,
    pool: &CollectiblePool,
    rng: &mut R,
) -> RewardPayload {
    RewardPayload::Collectible {
        rarity,
        collectible_id: pool
            .pick_by_rarity(rarity, rng)
            .map(|entry| entry.id.clone()),
    }
}

/// Resolve the reward inside a box of `tier`.
pub fn resolve_reward<R: RngCore + ?Sized>(
    tier: BoxTier,
    force_collectible: bool,
    catalog: &ConsumableCatalog,
    pool: &CollectiblePool,
    rng: &mut R,
) -> RewardResult {
    let category = if force_collectible && !pool.is_empty() {
        RewardCategory::Collectible
    } else {
        roll_category(tier, pool, rng)
    };
    let collectible = match category {
        RewardCategory::Collectible if force_collectible => {
            roll_rarity(tier, pool, rng).or_else(|| pick_any_rarity(pool, rng))
        }
        RewardCategory::Collectible => roll_rarity(tier, pool, rng),
        RewardCategory::Consumable => None,
    };
    match collectible {
        Some(rarity) => RewardResult {
            box_tier: tier,
            category: RewardCategory::Collectible,
            payload: collectible_payload(rarity, pool, rng),
        },
        None => RewardResult {
            box_tier: tier,
            category: RewardCategory::Consumable,
            payload: consumable_payload(roll_potency(tier, rng), catalog, rng),
        },
    }
}

/// Open an earned box: settle its tier, consume pending one-shot flags and
/// resolve the reward.
pub fn open_box<R: RngCore + ?Sized>(request: OpenBoxRequest<'_>, rng: &mut R) -> OpenedBox {
    let OpenBoxRequest {
        record,
        progress,
        modifiers,
        scopes,
        catalog,
        pool,
        config,
    } = request;
    let mut next = progress.clone();

    let (rolled, pity_forced) = match record.tier {
        Some(tier) => {
            let advanced = advance_pity(progress.pity, tier);
            next.pity = PityState {
                gold_pity_counter: advanced.gold_pity_counter.min(config.pity.hard_cap),
            };
            (tier, false)
        }
        None => {
            let totals = resolve_effect_totals(modifiers, scopes, &progress.active_buffs, catalog);
            let roll = roll_box_tier_with_pity(&totals, progress.pity, &config.pity, rng);
            next.pity = roll.pity;
            (roll.tier, roll.forced)
        }
    };

    let mut tier = rolled;
    let mut upgraded = false;
    if next.pending.box_upgrade {
        next.pending.box_upgrade = false;
        tier = rolled.upgraded();
        upgraded = tier != rolled;
        if upgraded && tier.is_top() {
            next.pity = PityState::default();
        }
    }

    let force_collectible = next.pending.guaranteed_collectible && !pool.is_empty();
    if force_collectible {
        next.pending.guaranteed_collectible = false;
    }

    let reward = resolve_reward(tier, force_collectible, catalog, pool, rng);
    log::debug!(
        "opened box {} | tier:{tier} category:{} pity:{}",
        record.id,
        reward.category,
        next.pity.gold_pity_counter
    );

    OpenedBox {
        record: LootBoxRecord {
            tier: Some(tier),
            ..record.clone()
        },
        tier,
        reward,
        progress: next,
        pity_forced,
        upgraded,
    }
}
