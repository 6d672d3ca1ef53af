//! Session reward orchestration: one finished session in, rewards and new snapshots out.
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::buffs::tick_buffs;
use crate::catalog::{CollectiblePool, ConsumableCatalog};
use crate::checkpoint::roll_bonus_drops;
use crate::config::{RewardConfig, XpConfig};
use crate::effects::{EffectTotals, Modifier, resolve_effect_totals};
use crate::loot::{
    BoxTier, DropKind, RewardPayload, collectible_payload, consumable_payload, roll_box_tier,
    roll_unified_drop,
};
use crate::numbers::{clamp_seconds, non_negative, round_f64_to_u32, round_f64_to_u64, u64_to_f64};
use crate::progression::{
    CategoryDelta, calculate_completion_bonus, distribute_levels, process_time,
};
use crate::state::{BoxSource, LootBoxRecord, TrackedEntity, UserProgress};

/// Everything one session-end call reads. Nothing here is mutated.
#[derive(Debug, Clone, Copy)]
pub struct SessionInput<'a> {
    pub entity: &'a TrackedEntity,
    pub progress: &'a UserProgress,
    pub modifiers: &'a [Modifier],
    pub session_seconds: i64,
    /// The user marked the entity finished in this session.
    pub completed: bool,
    pub now: DateTime<Utc>,
    pub catalog: &'a ConsumableCatalog,
    pub pool: &'a CollectiblePool,
    pub config: &'a RewardConfig,
}

/// A checkpoint reward. Loot-box outcomes carry a `bonus_drop` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusDrop {
    pub kind: DropKind,
    pub payload: RewardPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRewardResult {
    pub session_minutes: u32,
    pub xp_gained: u64,
    /// Levels earned from reading time alone.
    pub levels_gained: u32,
    #[serde(default)]
    pub completion_levels: u32,
    #[serde(default)]
    pub instant_levels: u32,
    pub new_level: u32,
    #[serde(default)]
    pub category_deltas: Vec<CategoryDelta>,
    #[serde(default)]
    pub loot_boxes: Vec<LootBoxRecord>,
    #[serde(default)]
    pub bonus_drops: Vec<BonusDrop>,
    #[serde(default)]
    pub effects: EffectTotals,
    pub entity: TrackedEntity,
    pub progress: UserProgress,
}

impl SessionRewardResult {
    fn unchanged(input: &SessionInput<'_>) -> Self {
        Self {
            session_minutes: 0,
            xp_gained: 0,
            levels_gained: 0,
            completion_levels: 0,
            instant_levels: 0,
            new_level: input.entity.progression.level,
            category_deltas: Vec::new(),
            loot_boxes: Vec::new(),
            bonus_drops: Vec::new(),
            effects: EffectTotals::default(),
            entity: input.entity.clone(),
            progress: input.progress.clone(),
        }
    }

    /// All entity levels gained this session.
    #[must_use]
    pub const fn total_levels(&self) -> u32 {
        self.levels_gained
            .saturating_add(self.completion_levels)
            .saturating_add(self.instant_levels)
    }
}

/// Streak multiplier, highest tier first.
#[must_use]
pub fn streak_multiplier(streak_days: u32, config: &XpConfig) -> f64 {
    if streak_days >= config.streak_long_days {
        config.streak_long_multiplier
    } else if streak_days >= config.streak_short_days {
        config.streak_short_multiplier
    } else {
        1.0
    }
}

/// XP for a session: the streak applies to the base first, boosts after.
#[must_use]
pub fn calculate_xp(minutes: f64, streak_days: u32, xp_boost: f64, config: &XpConfig) -> u64 {
    let base = round_f64_to_u64(
        non_negative(minutes) * f64::from(config.per_minute) * streak_multiplier(streak_days, config),
    );
    let boosted = u64_to_f64(base) * (1.0 + non_negative(xp_boost));
    round_f64_to_u64(boosted)
}

#[must_use]
pub fn user_level_for_xp(xp: u64, config: &XpConfig) -> u32 {
    u32::try_from(xp / config.per_user_level.max(1)).unwrap_or(u32::MAX)
}

/// Deterministic box id from the owning entity, the session timestamp and a sequence number.
#[must_use]
pub fn derive_box_id(entity_id: &str, now: DateTime<Utc>, sequence: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entity_id.as_bytes());
    hasher.update(now.timestamp_millis().to_le_bytes());
    hasher.update(sequence.to_le_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    format!("box-{:016x}", u64::from_be_bytes(prefix))
}

struct BoxMinter<'a> {
    entity_id: &'a str,
    now: DateTime<Utc>,
    sequence: u32,
}

impl BoxMinter<'_> {
    fn mint(&mut self, tier: Option<BoxTier>, source: BoxSource) -> LootBoxRecord {
        let id = derive_box_id(self.entity_id, self.now, self.sequence);
        self.sequence = self.sequence.saturating_add(1);
        LootBoxRecord {
            id,
            tier,
            earned_at: self.now,
            source,
            owner_entity_id: Some(self.entity_id.to_string()),
        }
    }
}

/// Turn one finished session into rewards and updated snapshots.
pub fn process_session<R: RngCore + ?Sized>(
    input: SessionInput<'_>,
    rng: &mut R,
) -> SessionRewardResult {
    if input.session_seconds <= 0 {
        return SessionRewardResult::unchanged(&input);
    }
    let SessionInput {
        entity,
        progress,
        modifiers,
        session_seconds,
        completed,
        now,
        catalog,
        pool,
        config,
    } = input;
    let session_seconds_u = clamp_seconds(session_seconds);
    let session_minutes = u32::try_from(session_seconds_u / 60).unwrap_or(u32::MAX);

    let effects = resolve_effect_totals(
        modifiers,
        &entity.categories,
        &progress.active_buffs,
        catalog,
    );

    let time = process_time(
        entity.progression.total_time_seconds,
        session_seconds,
        &config.progression,
    );
    let total_after = entity
        .progression
        .total_time_seconds
        .saturating_add(session_seconds_u);
    let completion_levels = if completed && !entity.completed {
        let base = calculate_completion_bonus(total_after, entity.size, &config.progression);
        round_f64_to_u32(
            f64::from(base) * (1.0 + non_negative(effects.completion_bonus)),
        )
    } else {
        0
    };
    let instant_levels = progress.pending.instant_levels;

    let xp_gained = calculate_xp(
        u64_to_f64(session_seconds_u) / 60.0,
        progress.streak_days,
        effects.xp_boost,
        &config.xp,
    );

    let total_levels = time
        .levels_gained
        .saturating_add(completion_levels)
        .saturating_add(instant_levels);
    let category_deltas = distribute_levels(total_levels, &entity.categories);

    let mut minter = BoxMinter {
        entity_id: &entity.id,
        now,
        sequence: 0,
    };
    let earn_tier = |rng: &mut R| {
        (!config.defer_tier_resolution).then(|| roll_box_tier(effects.luck, rng))
    };
    let mut loot_boxes = Vec::new();
    for _ in 0..time.levels_gained.saturating_add(instant_levels) {
        let tier = earn_tier(&mut *rng);
        loot_boxes.push(minter.mint(tier, BoxSource::LevelUp));
    }
    for _ in 0..completion_levels {
        let tier = earn_tier(&mut *rng);
        loot_boxes.push(minter.mint(tier, BoxSource::Completion));
    }

    let hits = roll_bonus_drops(session_minutes, effects.drop_rate, &config.checkpoint, rng);
    let mut working_pool = pool.clone();
    let mut bonus_drops = Vec::new();
    for _ in 0..hits {
        let kind = roll_unified_drop(&working_pool, rng);
        let payload = match kind {
            DropKind::Consumable(potency) => consumable_payload(potency, catalog, rng),
            DropKind::Collectible(rarity) => {
                let payload = collectible_payload(rarity, &working_pool, rng);
                if let RewardPayload::Collectible {
                    collectible_id: Some(id),
                    ..
                } = &payload
                {
                    working_pool = working_pool.without(id);
                }
                payload
            }
            DropKind::LootBox(tier) => RewardPayload::LootBox {
                record: minter.mint(Some(tier), BoxSource::BonusDrop),
            },
        };
        bonus_drops.push(BonusDrop { kind, payload });
    }

    let mut next_entity = entity.clone();
    next_entity.progression.total_time_seconds = total_after;
    next_entity.progression.level = next_entity.progression.level.saturating_add(total_levels);
    next_entity
        .progression
        .level_up_timestamps
        .extend(std::iter::repeat_n(now, usize::try_from(total_levels).unwrap_or(0)));
    next_entity.completed = entity.completed || completed;

    let mut next_progress = progress.clone();
    next_progress.xp = progress.xp.saturating_add(xp_gained);
    next_progress.level = user_level_for_xp(next_progress.xp, &config.xp);
    next_progress.pending.instant_levels = 0;
    next_progress.active_buffs = tick_buffs(&progress.active_buffs, session_minutes);
    for delta in &category_deltas {
        let entry = next_progress
            .genre_levels
            .entry(delta.category.clone())
            .or_insert(0);
        *entry = entry.saturating_add(delta.levels);
    }

    log::debug!(
        "session {} | minutes:{session_minutes} xp:+{xp_gained} levels:+{} boxes:{} drops:{}",
        entity.id,
        total_levels,
        loot_boxes.len(),
        bonus_drops.len()
    );

    SessionRewardResult {
        session_minutes,
        xp_gained,
        levels_gained: time.levels_gained,
        completion_levels,
        instant_levels,
        new_level: next_entity.progression.level,
        category_deltas,
        loot_boxes,
        bonus_drops,
        effects,
        entity: next_entity,
        progress: next_progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CollectibleEntry;
    use crate::effects::EffectType;
    use crate::loot::CollectibleRarity;
    use crate::rng::CountingRng;
    use crate::rng::testing::StubRng;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 12, 21, 0, 0).unwrap()
    }

    #[test]
    fn xp_follows_streak_then_boosts() {
        let cfg = XpConfig::default();
        assert_eq!(calculate_xp(60.0, 0, 0.0, &cfg), 600);
        assert_eq!(calculate_xp(60.0, 0, 0.2, &cfg), 720);
        assert_eq!(calculate_xp(60.0, 0, 0.2 + 0.1, &cfg), 780);
        assert_eq!(calculate_xp(60.0, 3, 0.0, &cfg), 720);
        assert_eq!(calculate_xp(60.0, 7, 0.0, &cfg), 900);
        assert_eq!(calculate_xp(60.0, 3, 0.2, &cfg), 864);
        assert_eq!(calculate_xp(-5.0, 9, 0.5, &cfg), 0);
    }

    #[test]
    fn streak_tiers_are_exclusive() {
        let cfg = XpConfig::default();
        assert!((streak_multiplier(2, &cfg) - 1.0).abs() < f64::EPSILON);
        assert!((streak_multiplier(6, &cfg) - 1.2).abs() < f64::EPSILON);
        assert!((streak_multiplier(30, &cfg) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn box_ids_are_stable_and_distinct() {
        let first = derive_box_id("dune", now(), 0);
        assert_eq!(first, derive_box_id("dune", now(), 0));
        assert_ne!(first, derive_box_id("dune", now(), 1));
        assert_ne!(first, derive_box_id("emma", now(), 0));
        assert_eq!(first.len(), "box-".len() + 16);
    }

    #[test]
    fn non_positive_sessions_leave_snapshots_alone() {
        let entity = TrackedEntity::new("dune").with_categories(["scifi"]);
        let progress = UserProgress::default().with_streak(4);
        let config = RewardConfig::default();
        let pool = CollectiblePool::load_from_static();
        let modifiers = vec![Modifier::global("lamp", EffectType::DropRate, 0.5)];
        let mut rng = StubRng::new(0);
        for seconds in [0, -600] {
            let result = process_session(
                SessionInput {
                    entity: &entity,
                    progress: &progress,
                    modifiers: &modifiers,
                    session_seconds: seconds,
                    completed: true,
                    now: now(),
                    catalog: ConsumableCatalog::default_catalog(),
                    pool: &pool,
                    config: &config,
                },
                &mut rng,
            );
            assert_eq!(result.xp_gained, 0);
            assert!(result.loot_boxes.is_empty());
            assert!(result.bonus_drops.is_empty());
            assert_eq!(result.entity, entity);
            assert_eq!(result.progress, progress);
        }
        assert_eq!(rng.calls, 0);
    }

    #[test]
    fn exhausted_rarities_stop_dropping_within_a_session() {
        let entity = TrackedEntity::new("dune");
        let progress = UserProgress::default();
        let config = RewardConfig::default();
        let pool = CollectiblePool::from_entries(vec![CollectibleEntry {
            id: "quill".to_string(),
            name: String::new(),
            rarity: CollectibleRarity::Common,
        }]);
        let modifiers = vec![Modifier::global("lamp", EffectType::DropRate, 1.0)];
        let mut awarded_sessions = 0;
        for seed in 0..50 {
            let result = process_session(
                SessionInput {
                    entity: &entity,
                    progress: &progress,
                    modifiers: &modifiers,
                    session_seconds: 600 * 60,
                    completed: false,
                    now: now(),
                    catalog: ConsumableCatalog::default_catalog(),
                    pool: &pool,
                    config: &config,
                },
                &mut CountingRng::from_seed_u64(seed),
            );
            assert!(!result.bonus_drops.is_empty());
            let collectibles: Vec<_> = result
                .bonus_drops
                .iter()
                .filter_map(|drop| match &drop.payload {
                    RewardPayload::Collectible { collectible_id, .. } => Some(collectible_id),
                    _ => None,
                })
                .collect();
            assert!(collectibles.iter().all(|id| id.as_deref() == Some("quill")));
            assert!(collectibles.len() <= 1, "seed {seed} awarded {collectibles:?}");
            awarded_sessions += collectibles.len();
        }
        assert!(awarded_sessions > 0);
    }
}
