//! Plant registry and the inventory seam used when planting and harvesting.
//!
//! The turn clock only needs to visit every live plant once per turn, which is
//! all [`PlantRegistry`] asks for. [`Field`] is the bundled registry: a fixed
//! number of plots keyed by monotonically allocated [`PlantId`]s.
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use thiserror::Error;

use crate::plant::{
    CropYield, GrowthStep, Harvest, HarvestDisposition, PlantError, PlantLifecycle, SeedDefinition,
};

/// Stable identifier of a planted seed within a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlantId(pub u64);

impl std::fmt::Display for PlantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "plant#{}", self.0)
    }
}

/// Anything that can enumerate the currently live plants.
pub trait PlantRegistry {
    /// Visit every live plant exactly once.
    fn for_each_live(&mut self, visit: &mut dyn FnMut(PlantId, &mut PlantLifecycle));
}

/// Inventory collaborator: supplies seeds and receives harvested crops.
pub trait Inventory {
    /// Remove one unit of `seed_id`. Returns false when none is held.
    fn consume_seed(&mut self, seed_id: &str) -> bool;

    fn store_crop(&mut self, crop: &CropYield);
}

/// Tally of one growth pass over a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceReport {
    pub advanced: usize,
    pub grew: usize,
    pub matured: SmallVec<[PlantId; 8]>,
    pub thirsty: SmallVec<[PlantId; 8]>,
}

impl AdvanceReport {
    pub fn record(&mut self, id: PlantId, step: GrowthStep) {
        self.advanced += 1;
        match step {
            GrowthStep::Grew { .. } => self.grew += 1,
            GrowthStep::Matured => {
                self.grew += 1;
                self.matured.push(id);
            }
            GrowthStep::Thirsty => self.thirsty.push(id),
            GrowthStep::Idle | GrowthStep::Inert => {}
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("every plot is occupied ({plots} plots)")]
    FieldFull { plots: usize },
    #[error("no `{0}` seed left in the inventory")]
    NoSeed(String),
    #[error("unknown {0}")]
    UnknownPlant(PlantId),
    #[error(transparent)]
    Plant(#[from] PlantError),
}

/// In-memory seed and crop counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stockpile {
    #[serde(default)]
    pub seeds: HashMap<String, u32>,
    #[serde(default)]
    pub crops: HashMap<String, u32>,
}

impl Stockpile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_seeds(&mut self, seed_id: &str, count: u32) {
        let entry = self.seeds.entry(seed_id.to_string()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    #[must_use]
    pub fn seed_count(&self, seed_id: &str) -> u32 {
        self.seeds.get(seed_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn crop_count(&self, crop_id: &str) -> u32 {
        self.crops.get(crop_id).copied().unwrap_or(0)
    }

    /// Remove and return every unit of `crop_id`.
    pub fn take_crops(&mut self, crop_id: &str) -> u32 {
        self.crops.remove(crop_id).unwrap_or(0)
    }
}

impl Inventory for Stockpile {
    fn consume_seed(&mut self, seed_id: &str) -> bool {
        match self.seeds.get_mut(seed_id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    fn store_crop(&mut self, crop: &CropYield) {
        let entry = self.crops.entry(crop.crop_id.clone()).or_insert(0);
        *entry = entry.saturating_add(crop.quantity);
    }
}

/// Fixed-size farm plot registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    plants: BTreeMap<PlantId, PlantLifecycle>,
    plots: usize,
    next_id: u64,
}

impl Field {
    #[must_use]
    pub const fn with_plots(plots: usize) -> Self {
        Self {
            plants: BTreeMap::new(),
            plots,
            next_id: 1,
        }
    }

    #[must_use]
    pub const fn plots(&self) -> usize {
        self.plots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }

    #[must_use]
    pub fn free_plots(&self) -> usize {
        self.plots.saturating_sub(self.plants.len())
    }

    #[must_use]
    pub fn get(&self, id: PlantId) -> Option<&PlantLifecycle> {
        self.plants.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlantId, &PlantLifecycle)> {
        self.plants.iter().map(|(id, plant)| (*id, plant))
    }

    /// Plant one unit of `seed`, consuming it from `inventory` first.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::FieldFull`] without touching the inventory when no
    /// plot is free, and [`FieldError::NoSeed`] when the inventory has none.
    pub fn plant(
        &mut self,
        seed: Rc<SeedDefinition>,
        inventory: &mut dyn Inventory,
    ) -> Result<PlantId, FieldError> {
        if self.plants.len() >= self.plots {
            warn!(
                "field: cannot plant {}, all {} plots used",
                seed.id, self.plots
            );
            return Err(FieldError::FieldFull { plots: self.plots });
        }
        if !inventory.consume_seed(&seed.id) {
            warn!("field: no {} seed in inventory", seed.id);
            return Err(FieldError::NoSeed(seed.id.clone()));
        }
        let id = PlantId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        debug!("field: planted {} as {id}", seed.id);
        self.plants.insert(id, PlantLifecycle::new(seed));
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`FieldError::UnknownPlant`] or the plant's own rejection.
    pub fn water(&mut self, id: PlantId) -> Result<(), FieldError> {
        let plant = self
            .plants
            .get_mut(&id)
            .ok_or(FieldError::UnknownPlant(id))?;
        plant.water()?;
        Ok(())
    }

    /// Water every plant that still needs it, returning how many were watered.
    pub fn water_all(&mut self) -> usize {
        let mut watered = 0;
        for plant in self.plants.values_mut() {
            if plant.needs_water() && !plant.is_spent() && plant.water().is_ok() {
                watered += 1;
            }
        }
        watered
    }

    /// Harvest one plant, store the crop, and drop the plant if it is spent.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::UnknownPlant`] or the plant's own rejection.
    pub fn harvest<R>(
        &mut self,
        id: PlantId,
        inventory: &mut dyn Inventory,
        rng: &mut R,
    ) -> Result<Harvest, FieldError>
    where
        R: Rng + ?Sized,
    {
        let plant = self
            .plants
            .get_mut(&id)
            .ok_or(FieldError::UnknownPlant(id))?;
        let harvest = plant.harvest(rng)?;
        inventory.store_crop(&harvest.crop);
        if harvest.disposition == HarvestDisposition::Spent {
            self.plants.remove(&id);
            debug!("field: {id} spent and cleared");
        }
        Ok(harvest)
    }

    /// Harvest every fully grown plant.
    pub fn harvest_ready<R>(&mut self, inventory: &mut dyn Inventory, rng: &mut R) -> Vec<Harvest>
    where
        R: Rng + ?Sized,
    {
        let ready: Vec<PlantId> = self
            .plants
            .iter()
            .filter(|(_, plant)| plant.is_fully_grown())
            .map(|(id, _)| *id)
            .collect();
        let mut harvests = Vec::with_capacity(ready.len());
        for id in ready {
            if let Ok(harvest) = self.harvest(id, &mut *inventory, &mut *rng) {
                harvests.push(harvest);
            }
        }
        harvests
    }

    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.plants.values().filter(|p| p.is_fully_grown()).count()
    }

    /// Remove a plant without harvesting it.
    pub fn remove(&mut self, id: PlantId) -> Option<PlantLifecycle> {
        self.plants.remove(&id)
    }

    /// Drop every plant (world teardown or new run).
    pub fn clear(&mut self) {
        self.plants.clear();
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::with_plots(crate::constants::DEFAULT_FIELD_PLOTS)
    }
}

impl PlantRegistry for Field {
    fn for_each_live(&mut self, visit: &mut dyn FnMut(PlantId, &mut PlantLifecycle)) {
        for (id, plant) in &mut self.plants {
            if !plant.is_spent() {
                visit(*id, plant);
            }
        }
    }
}
