//! Effect aggregation across equipped modifiers and active buffs.
use serde::{Deserialize, Serialize};

use crate::buffs::{ActiveBuff, resolve_buff_effects};
use crate::catalog::ConsumableCatalog;

/// Closed set of effects a modifier or consumable can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    XpBoost,
    Luck,
    RareLuck,
    LegendaryLuck,
    DropRate,
    CompletionBonus,
    StreakShield,
    BoxUpgrade,
    GuaranteedCollectible,
    InstantLevel,
}

impl EffectType {
    pub const ALL: &'static [Self] = &[
        Self::XpBoost,
        Self::Luck,
        Self::RareLuck,
        Self::LegendaryLuck,
        Self::DropRate,
        Self::CompletionBonus,
        Self::StreakShield,
        Self::BoxUpgrade,
        Self::GuaranteedCollectible,
        Self::InstantLevel,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::XpBoost => "xp_boost",
            Self::Luck => "luck",
            Self::RareLuck => "rare_luck",
            Self::LegendaryLuck => "legendary_luck",
            Self::DropRate => "drop_rate",
            Self::CompletionBonus => "completion_bonus",
            Self::StreakShield => "streak_shield",
            Self::BoxUpgrade => "box_upgrade",
            Self::GuaranteedCollectible => "guaranteed_collectible",
            Self::InstantLevel => "instant_level",
        }
    }

    /// Effects that only act as one-shot state changes and never enter the totals.
    #[must_use]
    pub const fn is_instant(self) -> bool {
        match self {
            Self::StreakShield | Self::BoxUpgrade | Self::GuaranteedCollectible | Self::InstantLevel => {
                true
            }
            Self::XpBoost
            | Self::Luck
            | Self::RareLuck
            | Self::LegendaryLuck
            | Self::DropRate
            | Self::CompletionBonus => false,
        }
    }
}

/// An equipped bonus. Read-only for the duration of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub id: String,
    pub effect_type: EffectType,
    pub magnitude: f64,
    /// Genre the bonus is restricted to; `None` applies everywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Modifier {
    #[must_use]
    pub fn global(id: impl Into<String>, effect_type: EffectType, magnitude: f64) -> Self {
        Self {
            id: id.into(),
            effect_type,
            magnitude,
            scope: None,
        }
    }

    #[must_use]
    pub fn scoped(
        id: impl Into<String>,
        effect_type: EffectType,
        magnitude: f64,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            effect_type,
            magnitude,
            scope: Some(scope.into()),
        }
    }

    #[must_use]
    pub fn applies_to(&self, scopes: &[String]) -> bool {
        modifier_applies(self.scope.as_deref(), scopes)
    }
}

/// Resolved boost magnitudes handed to every roll in a session.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectTotals {
    #[serde(default)]
    pub xp_boost: f64,
    #[serde(default)]
    pub luck: f64,
    #[serde(default)]
    pub rare_luck: f64,
    #[serde(default)]
    pub legendary_luck: f64,
    #[serde(default)]
    pub drop_rate: f64,
    #[serde(default)]
    pub completion_bonus: f64,
}

impl EffectTotals {
    /// Fold one magnitude into the matching total. Instant effects are ignored.
    pub fn add(&mut self, effect_type: EffectType, magnitude: f64) {
        if !magnitude.is_finite() {
            return;
        }
        match effect_type {
            EffectType::XpBoost => self.xp_boost += magnitude,
            EffectType::Luck => self.luck += magnitude,
            EffectType::RareLuck => self.rare_luck += magnitude,
            EffectType::LegendaryLuck => self.legendary_luck += magnitude,
            EffectType::DropRate => self.drop_rate += magnitude,
            EffectType::CompletionBonus => self.completion_bonus += magnitude,
            EffectType::StreakShield
            | EffectType::BoxUpgrade
            | EffectType::GuaranteedCollectible
            | EffectType::InstantLevel => {}
        }
    }

    #[must_use]
    pub fn get(&self, effect_type: EffectType) -> f64 {
        match effect_type {
            EffectType::XpBoost => self.xp_boost,
            EffectType::Luck => self.luck,
            EffectType::RareLuck => self.rare_luck,
            EffectType::LegendaryLuck => self.legendary_luck,
            EffectType::DropRate => self.drop_rate,
            EffectType::CompletionBonus => self.completion_bonus,
            EffectType::StreakShield
            | EffectType::BoxUpgrade
            | EffectType::GuaranteedCollectible
            | EffectType::InstantLevel => 0.0,
        }
    }

    /// Field-wise sum of two totals.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            xp_boost: self.xp_boost + other.xp_boost,
            luck: self.luck + other.luck,
            rare_luck: self.rare_luck + other.rare_luck,
            legendary_luck: self.legendary_luck + other.legendary_luck,
            drop_rate: self.drop_rate + other.drop_rate,
            completion_bonus: self.completion_bonus + other.completion_bonus,
        }
    }
}

/// A scope restriction passes when absent or present in the applicable set.
#[must_use]
pub fn modifier_applies(scope: Option<&str>, scopes: &[String]) -> bool {
    scope.is_none_or(|wanted| {
        scopes
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(wanted.trim()))
    })
}

#[must_use]
pub fn resolve_modifier_effects(modifiers: &[Modifier], scopes: &[String]) -> EffectTotals {
    let mut totals = EffectTotals::default();
    for modifier in modifiers.iter().filter(|m| m.applies_to(scopes)) {
        totals.add(modifier.effect_type, modifier.magnitude);
    }
    totals
}

/// Combine equipped modifiers and active buffs into the session's effect totals.
#[must_use]
pub fn resolve_effect_totals(
    modifiers: &[Modifier],
    scopes: &[String],
    buffs: &[ActiveBuff],
    catalog: &ConsumableCatalog,
) -> EffectTotals {
    let totals = resolve_modifier_effects(modifiers, scopes)
        .merge(resolve_buff_effects(buffs, catalog));
    log::trace!(
        "effect totals | xp:{:.3} luck:{:.3} rare:{:.3} legendary:{:.3} drop:{:.3}",
        totals.xp_boost,
        totals.luck,
        totals.rare_luck,
        totals.legendary_luck,
        totals.drop_rate
    );
    totals
}
