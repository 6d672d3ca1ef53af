//! Tunable reward configuration with validation.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    CHECKPOINT_BASE_CHANCE, CHECKPOINT_INTERVAL_MINUTES, CHECKPOINT_MAX_CHANCE,
    CHECKPOINT_MIN_SESSION_MINUTES, LEGENDARY_LUCK_WEIGHT, PITY_HARD_CAP, PITY_STEP,
    SECONDS_PER_LEVEL, STREAK_MULTIPLIER_LONG, STREAK_MULTIPLIER_SHORT, STREAK_TIER_LONG_DAYS,
    STREAK_TIER_SHORT_DAYS, UNITS_PER_LEVEL, XP_PER_MINUTE, XP_PER_USER_LEVEL,
};
use crate::loot::tables;

/// Top-level configuration threaded into every engine entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RewardConfig {
    #[serde(default)]
    pub progression: ProgressionConfig,
    #[serde(default)]
    pub xp: XpConfig,
    #[serde(default)]
    pub pity: PityConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Emit blank boxes at earn time and resolve their tier when opened.
    #[serde(default)]
    pub defer_tier_resolution: bool,
}

impl RewardConfig {
    /// Parse and validate a JSON configuration; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `RewardConfigError` when the JSON is malformed or a field is out of bounds.
    pub fn from_json(json: &str) -> Result<Self, RewardConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| RewardConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `RewardConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), RewardConfigError> {
        self.progression.validate()?;
        self.xp.validate()?;
        self.pity.validate()?;
        self.checkpoint.validate()?;
        tables::verify_static_tables()
    }
}

/// Errors raised when reward configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum RewardConfigError {
    #[error("configuration JSON could not be parsed: {0}")]
    Parse(String),
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("streak thresholds out of order (short {short} >= long {long})")]
    StreakThresholds { short: u32, long: u32 },
    #[error("probability table {table} sums to {sum:.6} instead of 1")]
    ProbabilityTable { table: &'static str, sum: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default = "ProgressionConfig::default_seconds_per_level")]
    pub seconds_per_level: u64,
    #[serde(default = "ProgressionConfig::default_units_per_level")]
    pub units_per_level: u32,
}

impl ProgressionConfig {
    #[must_use]
    pub const fn default_seconds_per_level() -> u64 {
        SECONDS_PER_LEVEL
    }

    #[must_use]
    pub const fn default_units_per_level() -> u32 {
        UNITS_PER_LEVEL
    }

    fn validate(&self) -> Result<(), RewardConfigError> {
        if self.seconds_per_level == 0 {
            return Err(RewardConfigError::MinViolation {
                field: "progression.seconds_per_level",
                min: 1.0,
                value: 0.0,
            });
        }
        if self.units_per_level == 0 {
            return Err(RewardConfigError::MinViolation {
                field: "progression.units_per_level",
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            seconds_per_level: Self::default_seconds_per_level(),
            units_per_level: Self::default_units_per_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpConfig {
    #[serde(default = "XpConfig::default_per_minute")]
    pub per_minute: u32,
    #[serde(default = "XpConfig::default_streak_short_days")]
    pub streak_short_days: u32,
    #[serde(default = "XpConfig::default_streak_long_days")]
    pub streak_long_days: u32,
    #[serde(default = "XpConfig::default_streak_short_multiplier")]
    pub streak_short_multiplier: f64,
    #[serde(default = "XpConfig::default_streak_long_multiplier")]
    pub streak_long_multiplier: f64,
    #[serde(default = "XpConfig::default_per_user_level")]
    pub per_user_level: u64,
}

impl XpConfig {
    #[must_use]
    pub const fn default_per_minute() -> u32 {
        XP_PER_MINUTE
    }

    #[must_use]
    pub const fn default_streak_short_days() -> u32 {
        STREAK_TIER_SHORT_DAYS
    }

    #[must_use]
    pub const fn default_streak_long_days() -> u32 {
        STREAK_TIER_LONG_DAYS
    }

    #[must_use]
    pub const fn default_streak_short_multiplier() -> f64 {
        STREAK_MULTIPLIER_SHORT
    }

    #[must_use]
    pub const fn default_streak_long_multiplier() -> f64 {
        STREAK_MULTIPLIER_LONG
    }

    #[must_use]
    pub const fn default_per_user_level() -> u64 {
        XP_PER_USER_LEVEL
    }

    fn validate(&self) -> Result<(), RewardConfigError> {
        if self.streak_short_days >= self.streak_long_days {
            return Err(RewardConfigError::StreakThresholds {
                short: self.streak_short_days,
                long: self.streak_long_days,
            });
        }
        for (field, value) in [
            ("xp.streak_short_multiplier", self.streak_short_multiplier),
            ("xp.streak_long_multiplier", self.streak_long_multiplier),
        ] {
            if value.is_nan() || value < 1.0 {
                return Err(RewardConfigError::MinViolation {
                    field,
                    min: 1.0,
                    value,
                });
            }
        }
        if self.per_user_level == 0 {
            return Err(RewardConfigError::MinViolation {
                field: "xp.per_user_level",
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            per_minute: Self::default_per_minute(),
            streak_short_days: Self::default_streak_short_days(),
            streak_long_days: Self::default_streak_long_days(),
            streak_short_multiplier: Self::default_streak_short_multiplier(),
            streak_long_multiplier: Self::default_streak_long_multiplier(),
            per_user_level: Self::default_per_user_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PityConfig {
    #[serde(default = "PityConfig::default_hard_cap")]
    pub hard_cap: u32,
    #[serde(default = "PityConfig::default_step")]
    pub step: f64,
    #[serde(default = "PityConfig::default_legendary_weight")]
    pub legendary_weight: f64,
}

impl PityConfig {
    #[must_use]
    pub const fn default_hard_cap() -> u32 {
        PITY_HARD_CAP
    }

    #[must_use]
    pub const fn default_step() -> f64 {
        PITY_STEP
    }

    #[must_use]
    pub const fn default_legendary_weight() -> f64 {
        LEGENDARY_LUCK_WEIGHT
    }

    fn validate(&self) -> Result<(), RewardConfigError> {
        if self.hard_cap == 0 {
            return Err(RewardConfigError::MinViolation {
                field: "pity.hard_cap",
                min: 1.0,
                value: 0.0,
            });
        }
        if !(0.0..=1.0).contains(&self.step) {
            return Err(RewardConfigError::RangeViolation {
                field: "pity.step",
                min: 0.0,
                max: 1.0,
                value: self.step,
            });
        }
        if self.legendary_weight.is_nan() || self.legendary_weight < 0.0 {
            return Err(RewardConfigError::MinViolation {
                field: "pity.legendary_weight",
                min: 0.0,
                value: self.legendary_weight,
            });
        }
        Ok(())
    }
}

impl Default for PityConfig {
    fn default() -> Self {
        Self {
            hard_cap: Self::default_hard_cap(),
            step: Self::default_step(),
            legendary_weight: Self::default_legendary_weight(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "CheckpointConfig::default_min_session_minutes")]
    pub min_session_minutes: u32,
    #[serde(default = "CheckpointConfig::default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default = "CheckpointConfig::default_base_chance")]
    pub base_chance: f64,
    #[serde(default = "CheckpointConfig::default_max_chance")]
    pub max_chance: f64,
}

impl CheckpointConfig {
    #[must_use]
    pub const fn default_min_session_minutes() -> u32 {
        CHECKPOINT_MIN_SESSION_MINUTES
    }

    #[must_use]
    pub const fn default_interval_minutes() -> u32 {
        CHECKPOINT_INTERVAL_MINUTES
    }

    #[must_use]
    pub const fn default_base_chance() -> f64 {
        CHECKPOINT_BASE_CHANCE
    }

    #[must_use]
    pub const fn default_max_chance() -> f64 {
        CHECKPOINT_MAX_CHANCE
    }

    fn validate(&self) -> Result<(), RewardConfigError> {
        if self.interval_minutes == 0 {
            return Err(RewardConfigError::MinViolation {
                field: "checkpoint.interval_minutes",
                min: 1.0,
                value: 0.0,
            });
        }
        for (field, value) in [
            ("checkpoint.base_chance", self.base_chance),
            ("checkpoint.max_chance", self.max_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RewardConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            min_session_minutes: Self::default_min_session_minutes(),
            interval_minutes: Self::default_interval_minutes(),
            base_chance: Self::default_base_chance(),
            max_chance: Self::default_max_chance(),
        }
    }
}
