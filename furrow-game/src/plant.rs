//! Per-plant growth, watering, and harvest lifecycle.
//!
//! A plant only grows on turns it was watered before. Each growth step consumes
//! the watering, so a plant has to be watered again before every advance.
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use thiserror::Error;

use crate::numbers::stage_for_growth;

/// Immutable, externally authored description of a plantable seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedDefinition {
    pub id: String,
    /// Identifier of the crop handed to the inventory on harvest.
    pub crop_id: String,
    pub name: String,
    /// Watered turns required to reach full growth.
    pub growth_turns: u32,
    #[serde(default = "SeedDefinition::default_growth_stages")]
    pub growth_stages: usize,
    #[serde(default)]
    pub multi_harvest: bool,
    #[serde(default = "SeedDefinition::default_harvests_per_plant")]
    pub harvests_per_plant: u32,
    /// Stage a multi-harvest plant drops back to after a harvest.
    #[serde(default)]
    pub regrow_stage: Option<usize>,
    pub yield_min: u32,
    pub yield_max: u32,
    #[serde(default)]
    pub seed_price: i64,
    #[serde(default)]
    pub crop_price: i64,
}

impl SeedDefinition {
    const fn default_growth_stages() -> usize {
        4
    }

    const fn default_harvests_per_plant() -> u32 {
        1
    }

    #[must_use]
    pub fn total_stages(&self) -> usize {
        self.growth_stages.max(1)
    }

    #[must_use]
    pub fn final_stage(&self) -> usize {
        self.total_stages() - 1
    }

    /// Stage a regrowing plant restarts from, one short of final unless authored.
    #[must_use]
    pub fn regrow_stage(&self) -> usize {
        self.regrow_stage
            .unwrap_or_else(|| self.total_stages().saturating_sub(2))
            .min(self.final_stage())
    }

    /// Number of harvests a single plant yields before it is spent.
    #[must_use]
    pub fn harvest_limit(&self) -> u32 {
        if self.multi_harvest {
            self.harvests_per_plant.max(1)
        } else {
            1
        }
    }
}

/// Crop produced by a harvest, to be stored by the caller's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropYield {
    pub crop_id: String,
    pub quantity: u32,
}

/// What happens to the plant after it was harvested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestDisposition {
    /// The plant survives and starts growing again.
    Regrowing,
    /// Final harvest; the owning registry must drop the instance.
    Spent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harvest {
    #[serde(rename = "yield")]
    pub crop: CropYield,
    pub disposition: HarvestDisposition,
    /// Harvests taken from this plant so far, including this one.
    pub harvest_count: u32,
}

/// Result of a single [`PlantLifecycle::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStep {
    /// Not watered since the last advance; nothing happened.
    Thirsty,
    /// Already fully grown; nothing happened.
    Idle,
    Grew { stage: usize, turns_grown: u32 },
    /// Reached full growth on this advance.
    Matured,
    /// Spent plants never grow again.
    Inert,
}

/// Coarse lifecycle state derived from the plant's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantState {
    Planted,
    Growing,
    FullyGrown,
    Spent,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlantError {
    #[error("plant is already watered")]
    AlreadyWatered,
    #[error("plant is not ready to harvest ({turns_grown}/{growth_turns} turns grown)")]
    NotFullyGrown { turns_grown: u32, growth_turns: u32 },
    #[error("plant has been fully harvested")]
    Spent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantLifecycle {
    seed: Rc<SeedDefinition>,
    stage_index: usize,
    turns_grown: u32,
    is_fully_grown: bool,
    needs_water: bool,
    harvest_count: u32,
    spent: bool,
}

impl PlantLifecycle {
    /// Start a freshly planted seed: stage 0, unwatered, never harvested.
    #[must_use]
    pub const fn new(seed: Rc<SeedDefinition>) -> Self {
        Self {
            seed,
            stage_index: 0,
            turns_grown: 0,
            is_fully_grown: false,
            needs_water: true,
            harvest_count: 0,
            spent: false,
        }
    }

    #[must_use]
    pub fn seed(&self) -> &SeedDefinition {
        &self.seed
    }

    #[must_use]
    pub const fn stage_index(&self) -> usize {
        self.stage_index
    }

    #[must_use]
    pub const fn turns_grown(&self) -> u32 {
        self.turns_grown
    }

    #[must_use]
    pub const fn is_fully_grown(&self) -> bool {
        self.is_fully_grown
    }

    #[must_use]
    pub const fn needs_water(&self) -> bool {
        self.needs_water
    }

    #[must_use]
    pub const fn harvest_count(&self) -> u32 {
        self.harvest_count
    }

    #[must_use]
    pub const fn is_spent(&self) -> bool {
        self.spent
    }

    #[must_use]
    pub const fn state(&self) -> PlantState {
        if self.spent {
            PlantState::Spent
        } else if self.is_fully_grown {
            PlantState::FullyGrown
        } else if self.turns_grown > 0 {
            PlantState::Growing
        } else {
            PlantState::Planted
        }
    }

    /// Water the plant so the next advance counts.
    ///
    /// # Errors
    ///
    /// Returns [`PlantError::AlreadyWatered`] if it was watered since the last
    /// advance and [`PlantError::Spent`] after the final harvest.
    pub fn water(&mut self) -> Result<(), PlantError> {
        if self.spent {
            warn!("plant {}: cannot water a spent plant", self.seed.id);
            return Err(PlantError::Spent);
        }
        if !self.needs_water {
            warn!("plant {}: already watered", self.seed.id);
            return Err(PlantError::AlreadyWatered);
        }
        self.needs_water = false;
        Ok(())
    }

    /// Apply one turn of growth. Called once per turn-end for every live plant.
    pub fn advance(&mut self) -> GrowthStep {
        if self.spent {
            return GrowthStep::Inert;
        }
        if self.is_fully_grown {
            return GrowthStep::Idle;
        }
        if self.needs_water {
            debug!("plant {}: skipped growth, not watered", self.seed.id);
            return GrowthStep::Thirsty;
        }

        self.turns_grown = self.turns_grown.saturating_add(1);
        let step = if self.turns_grown >= self.seed.growth_turns {
            self.is_fully_grown = true;
            self.stage_index = self.seed.final_stage();
            GrowthStep::Matured
        } else {
            let stage = stage_for_growth(
                self.turns_grown,
                self.seed.growth_turns,
                self.seed.total_stages(),
            );
            self.stage_index = self.stage_index.max(stage);
            GrowthStep::Grew {
                stage: self.stage_index,
                turns_grown: self.turns_grown,
            }
        };
        self.needs_water = true;
        debug!(
            "plant {}: {}/{} turns, stage {}",
            self.seed.id, self.turns_grown, self.seed.growth_turns, self.stage_index
        );
        step
    }

    /// Harvest a fully grown plant, rolling the yield uniformly within the seed's range.
    ///
    /// # Errors
    ///
    /// Returns [`PlantError::NotFullyGrown`] before maturity and [`PlantError::Spent`]
    /// after the final harvest.
    pub fn harvest<R>(&mut self, rng: &mut R) -> Result<Harvest, PlantError>
    where
        R: Rng + ?Sized,
    {
        if self.spent {
            warn!("plant {}: nothing left to harvest", self.seed.id);
            return Err(PlantError::Spent);
        }
        if !self.is_fully_grown {
            warn!(
                "plant {}: harvest attempted at {}/{} turns",
                self.seed.id, self.turns_grown, self.seed.growth_turns
            );
            return Err(PlantError::NotFullyGrown {
                turns_grown: self.turns_grown,
                growth_turns: self.seed.growth_turns,
            });
        }

        self.harvest_count = self.harvest_count.saturating_add(1);
        let low = self.seed.yield_min.min(self.seed.yield_max);
        let high = self.seed.yield_min.max(self.seed.yield_max);
        let quantity = rng.gen_range(low..=high);

        let disposition = if self.harvest_count < self.seed.harvest_limit() {
            self.turns_grown = 0;
            self.is_fully_grown = false;
            self.needs_water = true;
            self.stage_index = self.seed.regrow_stage();
            HarvestDisposition::Regrowing
        } else {
            self.spent = true;
            HarvestDisposition::Spent
        };

        Ok(Harvest {
            crop: CropYield {
                crop_id: self.seed.crop_id.clone(),
                quantity,
            },
            disposition,
            harvest_count: self.harvest_count,
        })
    }
}
