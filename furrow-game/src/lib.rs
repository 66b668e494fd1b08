//! Furrow Game Engine
//!
//! Platform-agnostic core of the Furrow debt-farming game: the turn clock, the
//! creditor quota ledger, the money ledger, and the per-plant growth lifecycle.
//! Rendering, input, and the mini-games live elsewhere and talk to this crate
//! through [`FarmSession`] and its event listeners.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod constants;
pub mod events;
pub mod field;
pub mod ledger;
pub mod numbers;
pub mod plant;
pub mod quota;
pub mod rng;
pub mod session;
pub mod snapshot;

use anyhow::Context;

// Re-export commonly used types
pub use catalog::{SeedCatalog, SeedCatalogError};
pub use clock::{ClockError, TurnClock, TurnContext, TurnPhase, TurnReport};
pub use config::{ConfigError, FarmConfig};
pub use events::{BalanceChanged, EventBus, QuotaEvent, SubscriptionId, TurnEndCause, TurnEvent};
pub use field::{
    AdvanceReport, Field, FieldError, Inventory, PlantId, PlantRegistry, Stockpile,
};
pub use ledger::{Ledger, LedgerError};
pub use plant::{
    CropYield, GrowthStep, Harvest, HarvestDisposition, PlantError, PlantLifecycle, PlantState,
    SeedDefinition,
};
pub use quota::{
    QuotaBook, QuotaConfigError, QuotaDefinition, QuotaError, QuotaLedger, QuotaResolution,
    QuotaRunState, QuotaStatus, Season,
};
pub use rng::{CountingRng, RngBundle};
pub use session::{Economy, FarmSession, RunStatus, SessionError};
pub use snapshot::{MemoryStorage, RunSnapshot, RunStorage};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the quota book cannot be loaded.
    fn load_quota_book(&self) -> Result<QuotaBook, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the seed catalog cannot be loaded.
    fn load_seed_catalog(&self) -> Result<SeedCatalog, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config(&self) -> Result<FarmConfig, Self::Error>;
}

/// Loader backed by the JSON bundled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticData;

impl DataLoader for StaticData {
    type Error = std::convert::Infallible;

    fn load_quota_book(&self) -> Result<QuotaBook, Self::Error> {
        Ok(QuotaBook::default_book().clone())
    }

    fn load_seed_catalog(&self) -> Result<SeedCatalog, Self::Error> {
        Ok(SeedCatalog::load_from_static())
    }

    fn load_config(&self) -> Result<FarmConfig, Self::Error> {
        Ok(FarmConfig::default())
    }
}

/// Creates sessions from loaded data and persists them through a [`RunStorage`].
pub struct FarmEngine<L, S>
where
    L: DataLoader,
    S: RunStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> FarmEngine<L, S>
where
    L: DataLoader,
    S: RunStorage,
{
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    #[must_use]
    pub const fn data_loader(&self) -> &L {
        &self.data_loader
    }

    /// Build a session from freshly loaded config and quotas. The run is not begun.
    ///
    /// # Errors
    ///
    /// Returns an error if data cannot be loaded or fails validation.
    pub fn create_session(&self, seed: u64) -> Result<FarmSession, anyhow::Error> {
        let config = self
            .data_loader
            .load_config()
            .context("loading farm config")?;
        let book = self
            .data_loader
            .load_quota_book()
            .context("loading quota book")?;
        FarmSession::new(config, book, seed).context("building farm session")
    }

    /// # Errors
    ///
    /// Returns an error if the run is not in progress or storage fails.
    pub fn save_session(
        &self,
        save_name: &str,
        session: &FarmSession,
    ) -> Result<(), anyhow::Error> {
        let snapshot = session
            .snapshot()
            .with_context(|| format!("cannot save `{save_name}`: run is {:?}", session.status()))?;
        self.storage
            .save_run(save_name, &snapshot)
            .with_context(|| format!("saving `{save_name}`"))
    }

    /// Rehydrate a saved run into a fresh session.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be read or no longer fits the loaded data.
    pub fn load_session(
        &self,
        save_name: &str,
        seed: u64,
    ) -> Result<Option<FarmSession>, anyhow::Error> {
        let Some(snapshot) = self
            .storage
            .load_run(save_name)
            .with_context(|| format!("loading `{save_name}`"))?
        else {
            return Ok(None);
        };
        let mut session = self.create_session(seed)?;
        session
            .restore(&snapshot)
            .with_context(|| format!("restoring `{save_name}`"))?;
        Ok(Some(session))
    }

    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_session(&self, save_name: &str) -> Result<(), S::Error> {
        self.storage.delete_run(save_name)
    }
}
