//! Checkpoint-based bonus-drop scheduling over one session.
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::CheckpointConfig;
use crate::numbers::{clamp_unit, non_negative};
use crate::rng::roll_chance;

/// How a session splits into checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CheckpointPlan {
    pub full_checkpoints: u32,
    /// Share of an interval covered by the trailing partial checkpoint, in `[0, 1)`.
    pub partial_fraction: f64,
    /// Per-checkpoint chance after the cap.
    pub chance: f64,
}

impl CheckpointPlan {
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.full_checkpoints + u32::from(self.partial_fraction > 0.0)
    }

    /// Expected drops for this plan.
    #[must_use]
    pub fn expected_drops(&self) -> f64 {
        (f64::from(self.full_checkpoints) + self.partial_fraction) * self.chance
    }
}

/// Base chance plus any positive boost. Not capped here.
#[must_use]
pub fn effective_drop_chance(boost: f64, config: &CheckpointConfig) -> f64 {
    config.base_chance + non_negative(boost)
}

/// Build the checkpoint plan. Sessions shorter than the minimum get an empty plan.
#[must_use]
pub fn plan_checkpoints(session_minutes: u32, boost: f64, config: &CheckpointConfig) -> CheckpointPlan {
    if session_minutes < config.min_session_minutes {
        return CheckpointPlan::default();
    }
    let interval = config.interval_minutes.max(1);
    let chance = effective_drop_chance(boost, config).min(clamp_unit(config.max_chance));
    CheckpointPlan {
        full_checkpoints: session_minutes / interval,
        partial_fraction: f64::from(session_minutes % interval) / f64::from(interval),
        chance,
    }
}

/// Roll every checkpoint in the plan and return the number of successes.
pub fn roll_checkpoints<R: RngCore + ?Sized>(plan: &CheckpointPlan, rng: &mut R) -> u32 {
    let mut successes = 0;
    for _ in 0..plan.full_checkpoints {
        if roll_chance(plan.chance, rng) {
            successes += 1;
        }
    }
    if plan.partial_fraction > 0.0 && roll_chance(plan.chance * plan.partial_fraction, rng) {
        successes += 1;
    }
    successes
}

/// Plan and roll a session's checkpoints, returning how many bonus drops it earned.
///
/// Each success is then drawn from the unified table by the caller, against the
/// collectible pool as it stands at that draw.
pub fn roll_bonus_drops<R: RngCore + ?Sized>(
    session_minutes: u32,
    boost: f64,
    config: &CheckpointConfig,
    rng: &mut R,
) -> u32 {
    let plan = plan_checkpoints(session_minutes, boost, config);
    let successes = roll_checkpoints(&plan, rng);
    log::trace!(
        "checkpoints | full:{} partial:{:.2} chance:{:.3} hits:{successes}",
        plan.full_checkpoints,
        plan.partial_fraction,
        plan.chance
    );
    successes
}
