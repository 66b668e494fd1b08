//! Persisted run state and the storage seam used to keep it.
//!
//! A run is resumable from three numbers: the quota index, the turns left on it,
//! and the balance. Plants and inventory belong to their own collaborators.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub quota_index: usize,
    pub turns_remaining: u32,
    pub balance: i64,
}

impl RunSnapshot {
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a snapshot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Platform-specific save slots.
pub trait RunStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    fn save_run(&self, save_name: &str, snapshot: &RunSnapshot) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn load_run(&self, save_name: &str) -> Result<Option<RunSnapshot>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the slot cannot be deleted.
    fn delete_run(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Save slots kept in memory; clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    saves: Rc<RefCell<HashMap<String, RunSnapshot>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.saves.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.saves.borrow().is_empty()
    }
}

impl RunStorage for MemoryStorage {
    type Error = Infallible;

    fn save_run(&self, save_name: &str, snapshot: &RunSnapshot) -> Result<(), Self::Error> {
        self.saves
            .borrow_mut()
            .insert(save_name.to_string(), *snapshot);
        Ok(())
    }

    fn load_run(&self, save_name: &str) -> Result<Option<RunSnapshot>, Self::Error> {
        Ok(self.saves.borrow().get(save_name).copied())
    }

    fn delete_run(&self, save_name: &str) -> Result<(), Self::Error> {
        self.saves.borrow_mut().remove(save_name);
        Ok(())
    }
}
