//! Centralized balance and tuning constants for the Tomeloot reward engine.
//!
//! These values define the deterministic math for every roll the engine makes.
//! Probability tables live here rather than in external JSON so that the
//! economy can only be adjusted via reviewed code changes. Scalar tuning that
//! operators may override is mirrored in [`crate::config::RewardConfig`], whose
//! defaults read from this module.

// Progression ---------------------------------------------------------------
pub(crate) const SECONDS_PER_LEVEL: u64 = 3_600;
pub(crate) const UNITS_PER_LEVEL: u32 = 30;

// Experience ----------------------------------------------------------------
pub(crate) const XP_PER_MINUTE: u32 = 10;
pub(crate) const XP_PER_USER_LEVEL: u64 = 1_000;
pub(crate) const STREAK_TIER_SHORT_DAYS: u32 = 3;
pub(crate) const STREAK_TIER_LONG_DAYS: u32 = 7;
pub(crate) const STREAK_MULTIPLIER_SHORT: f64 = 1.2;
pub(crate) const STREAK_MULTIPLIER_LONG: f64 = 1.5;

// Box tier odds -------------------------------------------------------------
pub(crate) const TIER_BASE_WOOD: f64 = 0.70;
pub(crate) const TIER_BASE_SILVER: f64 = 0.25;
pub(crate) const TIER_BASE_GOLD: f64 = 0.05;
pub(crate) const PITY_HARD_CAP: u32 = 25;
pub(crate) const PITY_STEP: f64 = 0.03;
pub(crate) const LEGENDARY_LUCK_WEIGHT: f64 = 3.0;

// Category odds (consumable, collectible) per box tier -----------------------
pub(crate) const CATEGORY_WOOD: (f64, f64) = (0.90, 0.10);
pub(crate) const CATEGORY_SILVER: (f64, f64) = (0.60, 0.40);
pub(crate) const CATEGORY_GOLD: (f64, f64) = (0.25, 0.75);

// Sub-tier odds per box tier: (weak, medium, strong) / (common, rare, legendary)
pub(crate) const POTENCY_WOOD: [f64; 3] = [0.70, 0.30, 0.0];
pub(crate) const POTENCY_SILVER: [f64; 3] = [0.30, 0.50, 0.20];
pub(crate) const POTENCY_GOLD: [f64; 3] = [0.0, 0.40, 0.60];
pub(crate) const RARITY_WOOD: [f64; 3] = [0.80, 0.20, 0.0];
pub(crate) const RARITY_SILVER: [f64; 3] = [0.50, 0.40, 0.10];
pub(crate) const RARITY_GOLD: [f64; 3] = [0.0, 0.60, 0.40];

// Unified bonus-drop table --------------------------------------------------
pub(crate) const DROP_CONSUMABLE_WEIGHTS: [f64; 3] = [0.30, 0.15, 0.05];
pub(crate) const DROP_LOOT_BOX_WEIGHTS: [f64; 3] = [0.20, 0.08, 0.02];
pub(crate) const DROP_COLLECTIBLE_WEIGHTS: [f64; 3] = [0.12, 0.06, 0.02];

// Checkpoint scheduling -----------------------------------------------------
pub(crate) const CHECKPOINT_MIN_SESSION_MINUTES: u32 = 5;
pub(crate) const CHECKPOINT_INTERVAL_MINUTES: u32 = 10;
pub(crate) const CHECKPOINT_BASE_CHANCE: f64 = 0.01;
pub(crate) const CHECKPOINT_MAX_CHANCE: f64 = 0.5;

// RNG stream domains --------------------------------------------------------
pub(crate) const STREAM_SESSION: &[u8] = b"tomeloot.session";
pub(crate) const STREAM_OPEN: &[u8] = b"tomeloot.open";

pub(crate) const PROBABILITY_FLOOR: f64 = 0.0;
pub(crate) const PROBABILITY_MAX: f64 = 1.0;
pub(crate) const PROBABILITY_SUM_TOLERANCE: f64 = 1e-9;
#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;
