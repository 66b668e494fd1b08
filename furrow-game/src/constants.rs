//! Centralized tuning defaults for Furrow game logic.
//!
//! These are the fallbacks used when a [`FarmConfig`](crate::config::FarmConfig)
//! field is omitted. Authored content (quotas, seeds) lives in the JSON catalogs.

// Turn clock ---------------------------------------------------------------
pub const DEFAULT_TURN_TIME_LIMIT_SECS: f32 = 120.0;
pub(crate) const MIN_TURN_TIME_LIMIT_SECS: f32 = 1.0;
pub(crate) const MAX_TURN_TIME_LIMIT_SECS: f32 = 3_600.0;

// Economy ------------------------------------------------------------------
pub const DEFAULT_STARTING_MONEY: i64 = 50;

// Field --------------------------------------------------------------------
pub const DEFAULT_FIELD_PLOTS: usize = 12;
pub(crate) const MAX_FIELD_PLOTS: usize = 256;

// RNG stream tags ----------------------------------------------------------
pub(crate) const RNG_STREAM_HARVEST: &[u8] = b"harvest";
