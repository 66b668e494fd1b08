//! Session tuning loaded from JSON, with defaults for every field.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    DEFAULT_FIELD_PLOTS, DEFAULT_STARTING_MONEY, DEFAULT_TURN_TIME_LIMIT_SECS, MAX_FIELD_PLOTS,
    MAX_TURN_TIME_LIMIT_SECS, MIN_TURN_TIME_LIMIT_SECS,
};
use crate::numbers::duration_from_secs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmConfig {
    #[serde(default = "FarmConfig::default_turn_time_limit_secs")]
    pub turn_time_limit_secs: f32,
    #[serde(default = "FarmConfig::default_starting_money")]
    pub starting_money: i64,
    /// Index into the quota book the run begins at.
    #[serde(default)]
    pub first_quota: usize,
    #[serde(default = "FarmConfig::default_field_plots")]
    pub field_plots: usize,
}

impl FarmConfig {
    const fn default_turn_time_limit_secs() -> f32 {
        DEFAULT_TURN_TIME_LIMIT_SECS
    }

    const fn default_starting_money() -> i64 {
        DEFAULT_STARTING_MONEY
    }

    const fn default_field_plots() -> usize {
        DEFAULT_FIELD_PLOTS
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a config.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn turn_time_limit(&self) -> Duration {
        duration_from_secs(self.turn_time_limit_secs)
    }

    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.turn_time_limit_secs.is_finite()
            || !(MIN_TURN_TIME_LIMIT_SECS..=MAX_TURN_TIME_LIMIT_SECS)
                .contains(&self.turn_time_limit_secs)
        {
            return Err(ConfigError::RangeViolation {
                field: "turn_time_limit_secs",
                min: f64::from(MIN_TURN_TIME_LIMIT_SECS),
                max: f64::from(MAX_TURN_TIME_LIMIT_SECS),
                value: f64::from(self.turn_time_limit_secs),
            });
        }
        if self.starting_money < 0 {
            return Err(ConfigError::NegativeStartingMoney(self.starting_money));
        }
        if !(1..=MAX_FIELD_PLOTS).contains(&self.field_plots) {
            return Err(ConfigError::FieldPlots {
                max: MAX_FIELD_PLOTS,
                value: self.field_plots,
            });
        }
        Ok(())
    }
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            turn_time_limit_secs: Self::default_turn_time_limit_secs(),
            starting_money: Self::default_starting_money(),
            first_quota: 0,
            field_plots: Self::default_field_plots(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("starting_money must not be negative (got {0})")]
    NegativeStartingMoney(i64),
    #[error("field_plots must be between 1 and {max} (got {value})")]
    FieldPlots {
        max: usize,
        value: usize,
    },
}
