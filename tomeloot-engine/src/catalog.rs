//! Static lookup tables for consumables and collectibles.
use std::collections::BTreeSet;
use std::sync::OnceLock;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::effects::EffectType;
use crate::loot::{CollectibleRarity, PotencyTier};
use crate::rng::pick_index;

const DEFAULT_CONSUMABLE_DATA: &str = include_str!("../data/consumables.json");
const DEFAULT_COLLECTIBLE_DATA: &str = include_str!("../data/collectibles.json");

/// Errors raised while loading catalog data.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog contains duplicate id `{0}`")]
    DuplicateId(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumableDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub effect_type: EffectType,
    pub magnitude: f64,
    /// Zero marks an instant consumable.
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub potency: PotencyTier,
}

impl ConsumableDefinition {
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        self.duration_minutes == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConsumableCatalog {
    #[serde(default)]
    pub consumables: Vec<ConsumableDefinition>,
}

impl ConsumableCatalog {
    #[must_use]
    pub const fn from_definitions(consumables: Vec<ConsumableDefinition>) -> Self {
        Self { consumables }
    }

    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_CONSUMABLE_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn default_catalog() -> &'static Self {
        static CATALOG: OnceLock<ConsumableCatalog> = OnceLock::new();
        CATALOG.get_or_init(Self::load_from_static)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or repeats an id.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        ensure_unique(catalog.consumables.iter().map(|def| def.id.as_str()))?;
        Ok(catalog)
    }

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&ConsumableDefinition> {
        self.consumables.iter().find(|def| def.id == id)
    }

    pub fn by_potency(&self, potency: PotencyTier) -> impl Iterator<Item = &ConsumableDefinition> {
        self.consumables
            .iter()
            .filter(move |def| def.potency == potency)
    }

    /// Uniform pick among definitions of `potency`, falling back to the whole catalog.
    pub fn pick_by_potency<R>(&self, potency: PotencyTier, rng: &mut R) -> Option<&ConsumableDefinition>
    where
        R: RngCore + ?Sized,
    {
        let matches: Vec<&ConsumableDefinition> = self.by_potency(potency).collect();
        if matches.is_empty() {
            let idx = pick_index(self.consumables.len(), rng)?;
            return self.consumables.get(idx);
        }
        let idx = pick_index(matches.len(), rng)?;
        matches.get(idx).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectibleEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub rarity: CollectibleRarity,
}

/// Collectibles the user does not own yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CollectiblePool {
    #[serde(default)]
    pub entries: Vec<CollectibleEntry>,
}

impl CollectiblePool {
    #[must_use]
    pub const fn from_entries(entries: Vec<CollectibleEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_COLLECTIBLE_DATA).unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or repeats an id.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let pool: Self = serde_json::from_str(json)?;
        ensure_unique(pool.entries.iter().map(|entry| entry.id.as_str()))?;
        Ok(pool)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn has_rarity(&self, rarity: CollectibleRarity) -> bool {
        self.entries.iter().any(|entry| entry.rarity == rarity)
    }

    #[must_use]
    pub fn count_of(&self, rarity: CollectibleRarity) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.rarity == rarity)
            .count()
    }

    pub fn pick_by_rarity<R>(&self, rarity: CollectibleRarity, rng: &mut R) -> Option<&CollectibleEntry>
    where
        R: RngCore + ?Sized,
    {
        let matches: Vec<&CollectibleEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.rarity == rarity)
            .collect();
        let idx = pick_index(matches.len(), rng)?;
        matches.get(idx).copied()
    }

    /// Pool without the entry `id`, used once a collectible has been awarded.
    #[must_use]
    pub fn without(&self, id: &str) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|entry| entry.id != id)
                .cloned()
                .collect(),
        }
    }
}

fn ensure_unique<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), CatalogError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId(id.to_string()));
        }
    }
    Ok(())
}
