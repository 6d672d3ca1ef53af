//! Tomeloot Reward Engine
//!
//! Platform-agnostic reward and loot economy for time-tracked reading sessions.
//! Session time and active modifiers become experience, entity levels, loot
//! boxes and checkpoint bonus drops. Every operation is a pure function of its
//! snapshot inputs and an injected random source, so results replay exactly.

pub mod buffs;
pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod constants;
pub mod effects;
pub mod loot;
pub mod numbers;
pub mod progression;
pub mod rng;
pub mod session;
pub mod state;

use chrono::{DateTime, Utc};
use rand::RngCore;
use thiserror::Error;

// Re-export commonly used types
pub use buffs::{
    ActiveBuff, ConsolidatedBuffs, apply_buff, apply_instant, consolidate_buffs,
    resolve_buff_effects, tick_buffs, use_consumable,
};
pub use catalog::{
    CatalogError, CollectibleEntry, CollectiblePool, ConsumableCatalog, ConsumableDefinition,
};
pub use checkpoint::{CheckpointPlan, effective_drop_chance, plan_checkpoints, roll_bonus_drops};
pub use config::{
    CheckpointConfig, PityConfig, ProgressionConfig, RewardConfig, RewardConfigError, XpConfig,
};
pub use effects::{
    EffectTotals, EffectType, Modifier, modifier_applies, resolve_effect_totals,
    resolve_modifier_effects,
};
pub use loot::{
    BoxTier, CollectibleRarity, DropKind, OpenBoxRequest, OpenedBox, PotencyTier, RewardCategory,
    RewardPayload, RewardResult, TierRoll, open_box, roll_box_tier, roll_box_tier_with_pity,
};
pub use progression::{
    CategoryDelta, TimeProgress, calculate_completion_bonus, calculate_level,
    calculate_size_floor, distribute_levels, process_time,
};
pub use rng::{CountingRng, derive_stream_seed, open_stream, session_stream};
pub use session::{
    BonusDrop, SessionInput, SessionRewardResult, calculate_xp, process_session,
    streak_multiplier,
};
pub use state::{
    BoxSource, LootBoxRecord, PendingEffects, PityState, Progression, TrackedEntity, UserProgress,
};

/// Trait for abstracting catalog loading operations
/// Hosts provide this to supply consumable and collectible definitions
pub trait CatalogSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the consumable definitions
    ///
    /// # Errors
    ///
    /// Returns an error if the consumable catalog cannot be loaded.
    fn load_consumables(&self) -> Result<ConsumableCatalog, Self::Error>;

    /// Load every collectible that can be awarded
    ///
    /// # Errors
    ///
    /// Returns an error if the collectible set cannot be loaded.
    fn load_collectibles(&self) -> Result<CollectiblePool, Self::Error>;
}

/// Catalog source backed by the JSON tables embedded in this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedCatalog;

impl CatalogSource for EmbeddedCatalog {
    type Error = CatalogError;

    fn load_consumables(&self) -> Result<ConsumableCatalog, Self::Error> {
        Ok(ConsumableCatalog::load_from_static())
    }

    fn load_collectibles(&self) -> Result<CollectiblePool, Self::Error> {
        Ok(CollectiblePool::load_from_static())
    }
}

/// Errors raised while assembling a [`RewardEngine`].
#[derive(Debug, Error)]
pub enum EngineError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error("catalog source failed: {0}")]
    Source(#[source] E),
    #[error(transparent)]
    Config(#[from] RewardConfigError),
}

/// Per-call inputs for [`RewardEngine::end_session`].
#[derive(Debug, Clone, Copy)]
pub struct SessionRequest<'a> {
    pub entity: &'a TrackedEntity,
    pub progress: &'a UserProgress,
    pub modifiers: &'a [Modifier],
    pub session_seconds: i64,
    pub completed: bool,
    pub now: DateTime<Utc>,
    /// Collectibles the user does not own yet.
    pub pool: &'a CollectiblePool,
}

/// Reward engine holding the loaded catalogs and validated configuration
pub struct RewardEngine {
    catalog: ConsumableCatalog,
    collectibles: CollectiblePool,
    config: RewardConfig,
}

impl RewardEngine {
    /// Create an engine from already loaded catalogs
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn new(
        catalog: ConsumableCatalog,
        collectibles: CollectiblePool,
        config: RewardConfig,
    ) -> Result<Self, RewardConfigError> {
        config.validate()?;
        Ok(Self {
            catalog,
            collectibles,
            config,
        })
    }

    /// Load catalogs from `source` and validate `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails or the configuration is invalid.
    pub fn from_source<S: CatalogSource>(
        source: &S,
        config: RewardConfig,
    ) -> Result<Self, EngineError<S::Error>> {
        let catalog = source.load_consumables().map_err(EngineError::Source)?;
        let collectibles = source.load_collectibles().map_err(EngineError::Source)?;
        Ok(Self::new(catalog, collectibles, config)?)
    }

    #[must_use]
    pub const fn catalog(&self) -> &ConsumableCatalog {
        &self.catalog
    }

    /// Every collectible the catalog source offered.
    #[must_use]
    pub const fn collectibles(&self) -> &CollectiblePool {
        &self.collectibles
    }

    #[must_use]
    pub const fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Settle one finished session
    pub fn end_session<R: RngCore + ?Sized>(
        &self,
        request: SessionRequest<'_>,
        rng: &mut R,
    ) -> SessionRewardResult {
        process_session(
            SessionInput {
                entity: request.entity,
                progress: request.progress,
                modifiers: request.modifiers,
                session_seconds: request.session_seconds,
                completed: request.completed,
                now: request.now,
                catalog: &self.catalog,
                pool: request.pool,
                config: &self.config,
            },
            rng,
        )
    }

    /// Open an earned box
    pub fn open_box<R: RngCore + ?Sized>(
        &self,
        record: &LootBoxRecord,
        progress: &UserProgress,
        modifiers: &[Modifier],
        scopes: &[String],
        pool: &CollectiblePool,
        rng: &mut R,
    ) -> OpenedBox {
        open_box(
            OpenBoxRequest {
                record,
                progress,
                modifiers,
                scopes,
                catalog: &self.catalog,
                pool,
                config: &self.config,
            },
            rng,
        )
    }

    /// Use a consumable from the loaded catalog
    #[must_use]
    pub fn use_consumable(
        &self,
        progress: &UserProgress,
        definition_id: &str,
        now: DateTime<Utc>,
    ) -> UserProgress {
        use_consumable(progress, definition_id, &self.catalog, now)
    }
}
