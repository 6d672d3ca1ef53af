//! Snapshot data model. Every type here is persisted by callers as JSON.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::buffs::ActiveBuff;
use crate::loot::BoxTier;

/// Reading progress owned by a tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Progression {
    /// Time-derived level plus completion and instant levels.
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub total_time_seconds: u64,
    #[serde(default)]
    pub level_up_timestamps: Vec<DateTime<Utc>>,
}

/// A book (or similar) that accrues session time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrackedEntity {
    pub id: String,
    #[serde(default)]
    pub progression: Progression,
    /// Size in units (pages); `None` disables the completion bonus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Genres used for scope matching and level distribution, in order.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub completed: bool,
}

impl TrackedEntity {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PityState {
    #[serde(default)]
    pub gold_pity_counter: u32,
}

/// One-shot flags set by instant consumables and consumed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PendingEffects {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_shield_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub box_upgrade: bool,
    #[serde(default)]
    pub guaranteed_collectible: bool,
    #[serde(default)]
    pub instant_levels: u32,
}

impl PendingEffects {
    /// Whether a streak shield still protects the streak at `now`.
    #[must_use]
    pub fn shield_active(&self, now: DateTime<Utc>) -> bool {
        self.streak_shield_until.is_some_and(|until| until > now)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserProgress {
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub pity: PityState,
    #[serde(default)]
    pub active_buffs: Vec<ActiveBuff>,
    #[serde(default)]
    pub pending: PendingEffects,
    /// Accumulated levels per genre.
    #[serde(default)]
    pub genre_levels: BTreeMap<String, u32>,
}

impl UserProgress {
    #[must_use]
    pub const fn with_streak(mut self, streak_days: u32) -> Self {
        self.streak_days = streak_days;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxSource {
    LevelUp,
    Completion,
    BonusDrop,
}

impl BoxSource {
    pub const ALL: &'static [Self] = &[Self::LevelUp, Self::Completion, Self::BonusDrop];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LevelUp => "level_up",
            Self::Completion => "completion",
            Self::BonusDrop => "bonus_drop",
        }
    }
}

impl fmt::Display for BoxSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoxSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "level_up" => Ok(Self::LevelUp),
            "completion" => Ok(Self::Completion),
            "bonus_drop" => Ok(Self::BonusDrop),
            _ => Err(()),
        }
    }
}

/// An earned loot box. `tier == None` marks a blank box resolved when opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootBoxRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<BoxTier>,
    pub earned_at: DateTime<Utc>,
    pub source: BoxSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_entity_id: Option<String>,
}

impl LootBoxRecord {
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        self.tier.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn box_source_round_trips_through_str() {
        for source in BoxSource::ALL {
            assert_eq!(source.as_str().parse::<BoxSource>(), Ok(*source));
            assert_eq!(source.to_string(), source.as_str());
        }
        assert!("mystery".parse::<BoxSource>().is_err());
    }

    #[test]
    fn sparse_json_fills_defaults() {
        let progress: UserProgress = serde_json::from_str(r#"{"xp": 1200}"#).unwrap();
        assert_eq!(progress.xp, 1200);
        assert_eq!(progress.pity.gold_pity_counter, 0);
        assert!(progress.active_buffs.is_empty());
        assert!(!progress.pending.box_upgrade);

        let entity: TrackedEntity = serde_json::from_str(r#"{"id": "dune"}"#).unwrap();
        assert_eq!(entity, TrackedEntity::new("dune"));
    }

    #[test]
    fn shield_expires_at_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let pending = PendingEffects {
            streak_shield_until: Some(now),
            ..PendingEffects::default()
        };
        assert!(!pending.shield_active(now));
        assert!(pending.shield_active(now - chrono::Duration::seconds(1)));
    }
}
