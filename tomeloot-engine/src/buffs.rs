//! Consumable lifecycle: timed buffs and instant one-shot effects.
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{ConsumableCatalog, ConsumableDefinition};
use crate::effects::{EffectTotals, EffectType};
use crate::numbers::round_f64_to_u32;
use crate::state::UserProgress;

/// A timed consumable currently in effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveBuff {
    pub definition_id: String,
    pub remaining_minutes: u32,
    /// Merged magnitude once two buffs of the same effect were combined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacked_magnitude: Option<f64>,
}

impl ActiveBuff {
    #[must_use]
    pub fn new(definition_id: impl Into<String>, remaining_minutes: u32) -> Self {
        Self {
            definition_id: definition_id.into(),
            remaining_minutes,
            stacked_magnitude: None,
        }
    }

    /// Magnitude this buff contributes, or `None` when its definition is unknown.
    #[must_use]
    pub fn magnitude(&self, catalog: &ConsumableCatalog) -> Option<f64> {
        let definition = catalog.find_by_id(&self.definition_id)?;
        Some(self.stacked_magnitude.unwrap_or(definition.magnitude))
    }

    fn effect_type(&self, catalog: &ConsumableCatalog) -> Option<EffectType> {
        catalog
            .find_by_id(&self.definition_id)
            .map(|definition| definition.effect_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedBuffs {
    pub buffs: Vec<ActiveBuff>,
    pub merged_count: usize,
}

/// Apply a timed consumable. Instant definitions leave the buffs untouched.
///
/// An existing buff with the same effect is removed and replaced by one merged
/// entry carrying the combined duration and magnitude.
#[must_use]
pub fn apply_buff(
    buffs: &[ActiveBuff],
    definition: &ConsumableDefinition,
    catalog: &ConsumableCatalog,
) -> Vec<ActiveBuff> {
    let mut next = buffs.to_vec();
    if definition.is_instant() {
        return next;
    }

    let existing = next
        .iter()
        .position(|buff| buff.effect_type(catalog) == Some(definition.effect_type));
    let merged = match existing {
        Some(idx) => {
            let previous = next.remove(idx);
            let base = previous.magnitude(catalog).unwrap_or(0.0);
            ActiveBuff {
                definition_id: definition.id.clone(),
                remaining_minutes: previous
                    .remaining_minutes
                    .saturating_add(definition.duration_minutes),
                stacked_magnitude: Some(base + definition.magnitude),
            }
        }
        None => ActiveBuff::new(definition.id.clone(), definition.duration_minutes),
    };
    log::trace!(
        "buff applied | id:{} remaining:{} stacked:{:?}",
        merged.definition_id,
        merged.remaining_minutes,
        merged.stacked_magnitude
    );
    next.push(merged);
    next
}

/// Decay buffs by whole elapsed minutes, dropping those that run out.
#[must_use]
pub fn tick_buffs(buffs: &[ActiveBuff], elapsed_minutes: u32) -> Vec<ActiveBuff> {
    buffs
        .iter()
        .filter_map(|buff| {
            let remaining = buff.remaining_minutes.saturating_sub(elapsed_minutes);
            (remaining > 0).then(|| ActiveBuff {
                remaining_minutes: remaining,
                ..buff.clone()
            })
        })
        .collect()
}

/// Sum each buff's magnitude into its effect. Unknown ids contribute nothing.
#[must_use]
pub fn resolve_buff_effects(buffs: &[ActiveBuff], catalog: &ConsumableCatalog) -> EffectTotals {
    let mut totals = EffectTotals::default();
    for buff in buffs {
        if let Some(definition) = catalog.find_by_id(&buff.definition_id) {
            totals.add(
                definition.effect_type,
                buff.stacked_magnitude.unwrap_or(definition.magnitude),
            );
        }
    }
    totals
}

/// Apply an instant consumable to the pending one-shot state.
#[must_use]
pub fn apply_instant(
    progress: &UserProgress,
    definition: &ConsumableDefinition,
    now: DateTime<Utc>,
) -> UserProgress {
    let mut next = progress.clone();
    match definition.effect_type {
        EffectType::StreakShield => {
            let start = next
                .pending
                .streak_shield_until
                .filter(|until| *until > now)
                .unwrap_or(now);
            let minutes = i64::from(round_f64_to_u32(definition.magnitude * 60.0));
            let extended = TimeDelta::try_minutes(minutes)
                .and_then(|delta| start.checked_add_signed(delta))
                .unwrap_or(start);
            next.pending.streak_shield_until = Some(extended);
        }
        EffectType::BoxUpgrade => next.pending.box_upgrade = true,
        EffectType::GuaranteedCollectible => next.pending.guaranteed_collectible = true,
        EffectType::InstantLevel => {
            next.pending.instant_levels = next
                .pending
                .instant_levels
                .saturating_add(round_f64_to_u32(definition.magnitude));
        }
        EffectType::XpBoost
        | EffectType::Luck
        | EffectType::RareLuck
        | EffectType::LegendaryLuck
        | EffectType::DropRate
        | EffectType::CompletionBonus => {}
    }
    next
}

/// Merge any buffs sharing an effect. Running this twice changes nothing further.
#[must_use]
pub fn consolidate_buffs(buffs: &[ActiveBuff], catalog: &ConsumableCatalog) -> ConsolidatedBuffs {
    let mut merged: Vec<ActiveBuff> = Vec::with_capacity(buffs.len());
    let mut merged_count = 0;
    for buff in buffs {
        let effect = buff.effect_type(catalog);
        let target = effect.and_then(|effect| {
            merged
                .iter()
                .position(|held| held.effect_type(catalog) == Some(effect))
        });
        match target {
            Some(idx) => {
                let held = &merged[idx];
                let magnitude =
                    held.magnitude(catalog).unwrap_or(0.0) + buff.magnitude(catalog).unwrap_or(0.0);
                let combined = ActiveBuff {
                    definition_id: buff.definition_id.clone(),
                    remaining_minutes: held
                        .remaining_minutes
                        .saturating_add(buff.remaining_minutes),
                    stacked_magnitude: Some(magnitude),
                };
                merged[idx] = combined;
                merged_count += 1;
            }
            None => merged.push(buff.clone()),
        }
    }
    if merged_count > 0 {
        log::debug!("consolidated {merged_count} duplicate buffs");
    }
    ConsolidatedBuffs {
        buffs: merged,
        merged_count,
    }
}

/// Use a consumable by id, routing it to the instant or timed path.
#[must_use]
pub fn use_consumable(
    progress: &UserProgress,
    definition_id: &str,
    catalog: &ConsumableCatalog,
    now: DateTime<Utc>,
) -> UserProgress {
    let Some(definition) = catalog.find_by_id(definition_id) else {
        log::debug!("ignoring unknown consumable {definition_id}");
        return progress.clone();
    };
    if definition.is_instant() {
        return apply_instant(progress, definition, now);
    }
    UserProgress {
        active_buffs: apply_buff(&progress.active_buffs, definition, catalog),
        ..progress.clone()
    }
}
