use chrono::{DateTime, TimeZone, Utc};
use tomeloot_engine::{
    BoxSource, CollectiblePool, EffectType, EmbeddedCatalog, Modifier, RewardCategory,
    RewardConfig, RewardEngine, SessionRequest, SessionRewardResult, TrackedEntity,
    UserProgress, session_stream,
};

const HOUR: i64 = 3_600;

fn engine(config: RewardConfig) -> RewardEngine {
    RewardEngine::from_source(&EmbeddedCatalog, config).expect("embedded catalogs load")
}

fn evening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 2, 20, 30, 0).unwrap()
}

fn read(
    engine: &RewardEngine,
    entity: &TrackedEntity,
    progress: &UserProgress,
    modifiers: &[Modifier],
    seconds: i64,
    completed: bool,
    seed: u64,
) -> SessionRewardResult {
    let pool = engine.collectibles().clone();
    let mut rng = session_stream(seed);
    engine.end_session(
        SessionRequest {
            entity,
            progress,
            modifiers,
            session_seconds: seconds,
            completed,
            now: evening(),
            pool: &pool,
        },
        &mut rng,
    )
}

#[test]
fn hour_long_session_earns_one_level_box() {
    let engine = engine(RewardConfig::default());
    let entity = TrackedEntity::new("dune");
    let result = read(&engine, &entity, &UserProgress::default(), &[], HOUR, false, 1);

    assert_eq!(result.session_minutes, 60);
    assert_eq!(result.xp_gained, 600);
    assert_eq!(result.levels_gained, 1);
    assert_eq!(result.new_level, 1);
    assert_eq!(result.loot_boxes.len(), 1);
    let record = &result.loot_boxes[0];
    assert_eq!(record.source, BoxSource::LevelUp);
    assert!(record.tier.is_some());
    assert_eq!(record.owner_entity_id.as_deref(), Some("dune"));
    assert_eq!(result.entity.progression.total_time_seconds, 3_600);
    assert_eq!(result.entity.progression.level_up_timestamps, vec![evening()]);
    assert_eq!(result.progress.xp, 600);
    assert_eq!(result.progress.level, 0);
}

#[test]
fn finishing_a_book_fills_the_size_floor_once() {
    let engine = engine(RewardConfig::default());
    let mut entity = TrackedEntity::new("middlemarch").with_size(300);
    entity.progression.total_time_seconds = 3 * 3_600;
    entity.progression.level = 3;

    let result = read(&engine, &entity, &UserProgress::default(), &[], HOUR, true, 2);
    assert_eq!(result.levels_gained, 1);
    assert_eq!(result.completion_levels, 6);
    assert_eq!(result.new_level, 10);
    assert!(result.entity.completed);
    let completion_boxes = result
        .loot_boxes
        .iter()
        .filter(|record| record.source == BoxSource::Completion)
        .count();
    assert_eq!(completion_boxes, 6);
    assert_eq!(result.loot_boxes.len(), 7);

    // a second completion on the same book pays nothing extra
    let again = read(&engine, &result.entity, &result.progress, &[], 60, true, 3);
    assert_eq!(again.completion_levels, 0);
    assert!(again.loot_boxes.is_empty());
}

#[test]
fn levels_spread_over_genres_in_order() {
    let engine = engine(RewardConfig::default());
    let entity = TrackedEntity::new("name-of-the-rose").with_categories(["mystery", "history", "classics"]);
    let result = read(&engine, &entity, &UserProgress::default(), &[], 2 * HOUR, false, 4);

    let levels: Vec<u32> = result.category_deltas.iter().map(|delta| delta.levels).collect();
    assert_eq!(levels, vec![1, 1, 0]);
    assert_eq!(result.progress.genre_levels.get("mystery"), Some(&1));
    assert_eq!(result.progress.genre_levels.get("history"), Some(&1));
    assert_eq!(
        result.progress.genre_levels.get("classics").copied().unwrap_or(0),
        0
    );
}

#[test]
fn scoped_modifiers_only_touch_matching_genres() {
    let engine = engine(RewardConfig::default());
    let modifiers = vec![Modifier::scoped("fantasy-quill", EffectType::XpBoost, 0.5, "Fantasy")];
    let fantasy = TrackedEntity::new("earthsea").with_categories(["fantasy"]);
    let poetry = TrackedEntity::new("odes").with_categories(["poetry"]);

    let boosted = read(&engine, &fantasy, &UserProgress::default(), &modifiers, HOUR, false, 5);
    let plain = read(&engine, &poetry, &UserProgress::default(), &modifiers, HOUR, false, 5);
    assert_eq!(boosted.xp_gained, 900);
    assert_eq!(plain.xp_gained, 600);
}

#[test]
fn deferred_boxes_resolve_when_opened() {
    let mut config = RewardConfig::default();
    config.defer_tier_resolution = true;
    let engine = engine(config);
    let entity = TrackedEntity::new("anathem");
    let result = read(&engine, &entity, &UserProgress::default(), &[], 3 * HOUR, false, 6);

    assert_eq!(result.loot_boxes.len(), 3);
    assert!(result.loot_boxes.iter().all(|record| record.is_blank()));

    let pool = engine.collectibles().clone();
    let mut rng = session_stream(60);
    let mut progress = result.progress.clone();
    for record in &result.loot_boxes {
        let opened = engine.open_box(record, &progress, &[], &entity.categories, &pool, &mut rng);
        assert_eq!(opened.record.id, record.id);
        assert_eq!(opened.record.tier, Some(opened.tier));
        assert_eq!(opened.reward.box_tier, opened.tier);
        let counter = opened.progress.pity.gold_pity_counter;
        if opened.tier.is_top() {
            assert_eq!(counter, 0);
        } else {
            assert_eq!(counter, progress.pity.gold_pity_counter + 1);
        }
        progress = opened.progress;
    }
}

#[test]
fn timed_buffs_tick_down_across_sessions() {
    let engine = engine(RewardConfig::default());
    let entity = TrackedEntity::new("the-dispossessed");
    let progress = engine.use_consumable(&UserProgress::default(), "double_brew", evening());
    assert_eq!(progress.active_buffs.len(), 1);
    assert_eq!(progress.active_buffs[0].remaining_minutes, 120);

    let first = read(&engine, &entity, &progress, &[], HOUR, false, 7);
    assert_eq!(first.xp_gained, 720);
    assert_eq!(first.progress.active_buffs[0].remaining_minutes, 60);

    let second = read(&engine, &first.entity, &first.progress, &[], HOUR, false, 8);
    assert_eq!(second.xp_gained, 720);
    assert!(second.progress.active_buffs.is_empty());

    let third = read(&engine, &second.entity, &second.progress, &[], HOUR, false, 9);
    assert_eq!(third.xp_gained, 600);
    assert_eq!(third.progress.xp, 2_040);
    assert_eq!(third.progress.level, 2);
}

#[test]
fn pending_instant_levels_become_level_boxes() {
    let engine = engine(RewardConfig::default());
    let entity = TrackedEntity::new("piranesi").with_categories(["fantasy"]);
    let progress = engine.use_consumable(&UserProgress::default(), "chapter_skip", evening());
    assert_eq!(progress.pending.instant_levels, 1);
    assert!(progress.active_buffs.is_empty());

    let result = read(&engine, &entity, &progress, &[], 30 * 60, false, 10);
    assert_eq!(result.levels_gained, 0);
    assert_eq!(result.instant_levels, 1);
    assert_eq!(result.new_level, 1);
    assert_eq!(result.loot_boxes.len(), 1);
    assert_eq!(result.loot_boxes[0].source, BoxSource::LevelUp);
    assert_eq!(result.progress.pending.instant_levels, 0);
    assert_eq!(result.progress.genre_levels.get("fantasy"), Some(&1));
}

#[test]
fn curators_seal_forces_a_collectible() {
    let engine = engine(RewardConfig::default());
    let progress = engine.use_consumable(&UserProgress::default(), "curators_seal", evening());
    assert!(progress.pending.guaranteed_collectible);

    let entity = TrackedEntity::new("the-hobbit");
    let result = read(&engine, &entity, &progress, &[], HOUR, false, 11);
    let pool = engine.collectibles().clone();
    let mut rng = session_stream(110);
    let opened = engine.open_box(&result.loot_boxes[0], &result.progress, &[], &[], &pool, &mut rng);
    assert_eq!(opened.reward.category, RewardCategory::Collectible);
    assert!(!opened.progress.pending.guaranteed_collectible);

    // an empty pool keeps the flag for later
    let empty = CollectiblePool::default();
    let held = engine.open_box(&result.loot_boxes[0], &result.progress, &[], &[], &empty, &mut rng);
    assert_eq!(held.reward.category, RewardCategory::Consumable);
    assert!(held.progress.pending.guaranteed_collectible);
}

#[test]
fn same_seed_replays_identically() {
    let engine = engine(RewardConfig::default());
    let modifiers = vec![
        Modifier::global("lamp", EffectType::DropRate, 0.3),
        Modifier::global("clover", EffectType::Luck, 0.2),
    ];
    let entity = TrackedEntity::new("war-and-peace")
        .with_size(1_200)
        .with_categories(["classics", "history"]);
    let progress = UserProgress::default().with_streak(5);

    let first = read(&engine, &entity, &progress, &modifiers, 5 * HOUR + 25 * 60, true, 42);
    let second = read(&engine, &entity, &progress, &modifiers, 5 * HOUR + 25 * 60, true, 42);
    assert_eq!(first, second);
    assert!(!first.bonus_drops.is_empty());

    let other = read(&engine, &entity, &progress, &modifiers, 5 * HOUR + 25 * 60, true, 43);
    assert_eq!(other.xp_gained, first.xp_gained);
    assert_eq!(other.loot_boxes.len(), first.loot_boxes.len());
}
