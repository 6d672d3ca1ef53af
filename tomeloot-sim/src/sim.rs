use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use tomeloot_engine::{
    EffectType, LootBoxRecord, Modifier, RewardEngine, RewardPayload, SessionRequest,
    TrackedEntity, UserProgress, open_stream, session_stream,
};

/// Knobs shared by every seed in one harness run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimSettings {
    pub sessions: u32,
    pub minutes: u32,
    pub streak: u32,
    pub size: Option<u32>,
    pub genres: Vec<String>,
    pub xp_boost: f64,
    pub luck: f64,
    pub drop_boost: f64,
    /// Mark the final session as finishing the book.
    pub complete: bool,
    #[serde(skip)]
    pub verbose: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            sessions: 10,
            minutes: 45,
            streak: 0,
            size: None,
            genres: Vec::new(),
            xp_boost: 0.0,
            luck: 0.0,
            drop_boost: 0.0,
            complete: false,
            verbose: false,
        }
    }
}

impl SimSettings {
    /// Global modifiers for every non-zero CLI boost.
    #[must_use]
    pub fn modifiers(&self) -> Vec<Modifier> {
        [
            ("sim-xp-boost", EffectType::XpBoost, self.xp_boost),
            ("sim-luck", EffectType::Luck, self.luck),
            ("sim-drop-boost", EffectType::DropRate, self.drop_boost),
        ]
        .into_iter()
        .filter(|(_, _, magnitude)| *magnitude != 0.0)
        .map(|(id, effect_type, magnitude)| Modifier::global(id, effect_type, magnitude))
        .collect()
    }

    #[must_use]
    pub fn entity(&self) -> TrackedEntity {
        let entity = TrackedEntity::new("sim-book").with_categories(self.genres.clone());
        match self.size {
            Some(size) => entity.with_size(size),
            None => entity,
        }
    }

    /// # Errors
    ///
    /// Returns an error when the run would not read anything.
    pub fn validate(&self) -> Result<()> {
        if self.sessions == 0 {
            bail!("--sessions must be at least 1");
        }
        if self.minutes == 0 {
            bail!("--minutes must be at least 1");
        }
        for (flag, value) in [
            ("--xp-boost", self.xp_boost),
            ("--luck", self.luck),
            ("--drop-boost", self.drop_boost),
        ] {
            if !value.is_finite() {
                bail!("{flag} must be a finite number (got {value})");
            }
        }
        Ok(())
    }
}

/// Aggregated outcome of one seed's chained sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedRun {
    pub seed: u64,
    pub sessions: u32,
    pub minutes_read: u64,
    pub xp: u64,
    pub user_level: u32,
    pub entity_level: u32,
    pub levels_gained: u32,
    pub boxes_by_source: BTreeMap<String, u32>,
    pub boxes_by_tier: BTreeMap<String, u32>,
    pub drops_by_kind: BTreeMap<String, u32>,
    pub rewards_by_category: BTreeMap<String, u32>,
    pub upgraded_boxes: u32,
    pub pity_forced: u32,
    pub max_pity: u32,
    pub collectibles: Vec<String>,
}

impl SeedRun {
    #[must_use]
    pub fn boxes_opened(&self) -> u32 {
        self.boxes_by_tier.values().sum()
    }

    #[must_use]
    pub fn bonus_drops(&self) -> u32 {
        self.drops_by_kind.values().sum()
    }
}

fn bump(map: &mut BTreeMap<String, u32>, key: &str) {
    *map.entry(key.to_string()).or_insert(0) += 1;
}

/// Fixed clock origin so every seed replays the same calendar.
///
/// # Errors
///
/// Returns an error if the origin cannot be represented.
pub fn start_time() -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2026, 1, 5, 20, 0, 0)
        .single()
        .context("simulation start time is not a single instant")
}

/// Chain `settings.sessions` daily sessions for one seed, opening every box
/// as soon as it is earned.
///
/// # Errors
///
/// Returns an error if the simulated clock cannot advance.
pub fn run_seed(engine: &RewardEngine, settings: &SimSettings, seed: u64) -> Result<SeedRun> {
    let modifiers = settings.modifiers();
    let mut entity = settings.entity();
    let mut progress = UserProgress::default().with_streak(settings.streak);
    let mut pool = engine.collectibles().clone();
    let mut session_rng = session_stream(seed);
    let mut open_rng = open_stream(seed);
    let session_seconds = i64::from(settings.minutes) * 60;
    let day = TimeDelta::try_days(1).context("one day does not fit a time delta")?;
    let mut now = start_time()?;
    let mut run = SeedRun {
        seed,
        ..SeedRun::default()
    };

    for index in 0..settings.sessions {
        let completed = settings.complete && index + 1 == settings.sessions;
        let result = engine.end_session(
            SessionRequest {
                entity: &entity,
                progress: &progress,
                modifiers: &modifiers,
                session_seconds,
                completed,
                now,
                pool: &pool,
            },
            &mut session_rng,
        );
        run.sessions += 1;
        run.minutes_read += u64::from(result.session_minutes);
        let levels = result.total_levels();
        run.levels_gained = run.levels_gained.saturating_add(levels);
        progress = result.progress;
        entity = result.entity;

        let mut earned: Vec<LootBoxRecord> = result.loot_boxes;
        for drop in result.bonus_drops {
            bump(&mut run.drops_by_kind, drop.kind.label());
            match drop.payload {
                RewardPayload::LootBox { record } => earned.push(record),
                RewardPayload::Collectible {
                    collectible_id: Some(id),
                    ..
                } => {
                    pool = pool.without(&id);
                    run.collectibles.push(id);
                }
                RewardPayload::Collectible {
                    collectible_id: None,
                    ..
                }
                | RewardPayload::Consumable { .. } => {}
            }
        }

        for record in &earned {
            bump(&mut run.boxes_by_source, record.source.as_str());
            let opened = engine.open_box(
                record,
                &progress,
                &modifiers,
                &entity.categories,
                &pool,
                &mut open_rng,
            );
            bump(&mut run.boxes_by_tier, opened.tier.as_str());
            bump(&mut run.rewards_by_category, opened.reward.category.as_str());
            run.pity_forced += u32::from(opened.pity_forced);
            run.upgraded_boxes += u32::from(opened.upgraded);
            if let RewardPayload::Collectible {
                collectible_id: Some(id),
                ..
            } = &opened.reward.payload
            {
                pool = pool.without(id);
                run.collectibles.push(id.clone());
            }
            progress = opened.progress;
            run.max_pity = run.max_pity.max(progress.pity.gold_pity_counter);
        }

        if settings.verbose {
            eprintln!(
                "   {} seed {seed} session {}: +{} xp, +{} levels, {} boxes",
                "•".cyan(),
                index + 1,
                result.xp_gained,
                levels,
                earned.len()
            );
        }
        now = now
            .checked_add_signed(day)
            .context("simulation clock overflowed")?;
    }

    run.xp = progress.xp;
    run.user_level = progress.level;
    run.entity_level = entity.progression.level;
    log::info!(
        "seed {seed} | xp:{} level:{} boxes:{} drops:{} max_pity:{}",
        run.xp,
        run.entity_level,
        run.boxes_opened(),
        run.bonus_drops(),
        run.max_pity
    );
    Ok(run)
}

/// Run every seed in order.
///
/// # Errors
///
/// Propagates the first seed that fails to simulate.
pub fn run_all(engine: &RewardEngine, settings: &SimSettings, seeds: &[u64]) -> Result<Vec<SeedRun>> {
    seeds
        .iter()
        .map(|seed| {
            run_seed(engine, settings, *seed).with_context(|| format!("seed {seed} failed"))
        })
        .collect()
}

/// Blank boxes go through the pity path, whose counter must stay within the cap.
///
/// # Errors
///
/// Returns an error naming the first seed whose counter overshot.
pub fn validate_pity(runs: &[SeedRun], hard_cap: u32) -> Result<()> {
    if let Some(run) = runs.iter().find(|run| run.max_pity > hard_cap) {
        bail!(
            "seed {} reached pity {} above the hard cap of {hard_cap}",
            run.seed,
            run.max_pity
        );
    }
    Ok(())
}
