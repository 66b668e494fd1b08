//! Authored seed definitions.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

use crate::plant::SeedDefinition;

const DEFAULT_SEED_DATA: &str = include_str!("../data/seeds.json");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawSeedCatalog {
    #[serde(default)]
    seeds: Vec<SeedDefinition>,
}

/// Seed definitions shared by every plant grown from them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedCatalog {
    seeds: Vec<Rc<SeedDefinition>>,
}

impl SeedCatalog {
    #[must_use]
    pub fn new(seeds: Vec<SeedDefinition>) -> Self {
        Self {
            seeds: seeds.into_iter().map(Rc::new).collect(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a seed catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawSeedCatalog = serde_json::from_str(json)?;
        Ok(Self::new(raw.seeds))
    }

    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_SEED_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Rc<SeedDefinition>> {
        self.seeds.iter().find(|seed| seed.id == id).cloned()
    }

    /// Definition whose harvest produces `crop_id`.
    #[must_use]
    pub fn by_crop(&self, crop_id: &str) -> Option<&SeedDefinition> {
        self.seeds
            .iter()
            .map(AsRef::as_ref)
            .find(|seed| seed.crop_id == crop_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeedDefinition> {
        self.seeds.iter().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// # Errors
    ///
    /// Returns the first [`SeedCatalogError`] found, in catalog order.
    pub fn validate(&self) -> Result<(), SeedCatalogError> {
        let mut ids = HashSet::new();
        for seed in &self.seeds {
            let id = seed.id.clone();
            if !ids.insert(seed.id.as_str()) {
                return Err(SeedCatalogError::DuplicateId(id));
            }
            if seed.growth_turns == 0 {
                return Err(SeedCatalogError::NoGrowthTurns(id));
            }
            if seed.growth_stages == 0 {
                return Err(SeedCatalogError::NoStages(id));
            }
            if seed.yield_min > seed.yield_max {
                return Err(SeedCatalogError::YieldRange {
                    id,
                    min: seed.yield_min,
                    max: seed.yield_max,
                });
            }
            if seed.multi_harvest && seed.harvests_per_plant == 0 {
                return Err(SeedCatalogError::NoHarvests(id));
            }
            if seed.seed_price < 0 || seed.crop_price < 0 {
                return Err(SeedCatalogError::NegativePrice(id));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeedCatalogError {
    #[error("seed id `{0}` appears more than once")]
    DuplicateId(String),
    #[error("seed `{0}` needs at least one growth turn")]
    NoGrowthTurns(String),
    #[error("seed `{0}` needs at least one growth stage")]
    NoStages(String),
    #[error("seed `{id}` yield range {min}..={max} is inverted")]
    YieldRange { id: String, min: u32, max: u32 },
    #[error("multi-harvest seed `{0}` must allow at least one harvest")]
    NoHarvests(String),
    #[error("seed `{0}` has a negative price")]
    NegativePrice(String),
}
