//! Real-time turn countdown and the single end-of-turn path.
//!
//! A turn ends either when `tick` drains the countdown or when it is forced
//! early. Both routes run [`TurnClock::end_turn`], which advances every live
//! plant, then decrements the active quota, then notifies `TurnEnded`
//! observers, in that order.
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::events::{EventBus, SubscriptionId, TurnEndCause, TurnEvent};
use crate::field::{AdvanceReport, PlantRegistry};
use crate::ledger::Ledger;
use crate::quota::{QuotaLedger, QuotaResolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    Active,
    /// Running the end-of-turn sequence.
    Expiring,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    #[error("turn {turn} is already active")]
    TurnAlreadyActive { turn: u32 },
    #[error("no turn is active")]
    NoActiveTurn,
}

/// Collaborators touched by the end-of-turn sequence.
pub struct TurnContext<'a> {
    pub plants: &'a mut dyn PlantRegistry,
    pub quotas: &'a mut QuotaLedger,
    pub ledger: &'a mut Ledger,
}

/// What happened when a turn ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn: u32,
    pub cause: TurnEndCause,
    pub unused: Duration,
    pub growth: AdvanceReport,
    pub resolution: Option<QuotaResolution>,
}

#[derive(Debug)]
pub struct TurnClock {
    time_limit: Duration,
    time_remaining: Duration,
    phase: TurnPhase,
    turn: u32,
    listeners: EventBus<TurnEvent>,
}

impl TurnClock {
    #[must_use]
    pub const fn new(time_limit: Duration) -> Self {
        Self {
            time_limit,
            time_remaining: Duration::ZERO,
            phase: TurnPhase::Idle,
            turn: 0,
            listeners: EventBus::new(),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> TurnPhase {
        self.phase
    }

    #[must_use]
    pub const fn is_turn_active(&self) -> bool {
        matches!(self.phase, TurnPhase::Active)
    }

    #[must_use]
    pub const fn time_remaining(&self) -> Duration {
        self.time_remaining
    }

    #[must_use]
    pub const fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Number of the current (or most recently finished) turn; 0 before the first.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Takes effect from the next `start_turn`.
    pub const fn set_turn_time_limit(&mut self, time_limit: Duration) {
        self.time_limit = time_limit;
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&TurnEvent) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// # Errors
    ///
    /// Returns [`ClockError::TurnAlreadyActive`] and changes nothing when a
    /// turn is already running.
    pub fn start_turn(&mut self) -> Result<u32, ClockError> {
        if self.phase != TurnPhase::Idle {
            warn!("clock: start_turn ignored, turn {} is active", self.turn);
            return Err(ClockError::TurnAlreadyActive { turn: self.turn });
        }
        self.turn = self.turn.saturating_add(1);
        self.time_remaining = self.time_limit;
        self.phase = TurnPhase::Active;
        debug!("clock: turn {} started ({:?})", self.turn, self.time_limit);
        self.listeners.emit(&TurnEvent::TurnStarted {
            turn: self.turn,
            time_limit: self.time_limit,
        });
        Ok(self.turn)
    }

    /// Drain `elapsed` from the countdown, ending the turn once it hits zero.
    ///
    /// Ticks while idle are ignored.
    pub fn tick(&mut self, elapsed: Duration, ctx: TurnContext<'_>) -> Option<TurnReport> {
        if !self.is_turn_active() {
            return None;
        }
        self.time_remaining = self.time_remaining.saturating_sub(elapsed);
        self.listeners.emit(&TurnEvent::TimeChanged {
            remaining: self.time_remaining,
        });
        if self.time_remaining.is_zero() {
            Some(self.finish_turn(TurnEndCause::Expired, ctx))
        } else {
            None
        }
    }

    /// End the active turn now. Any countdown left over is reported as unused.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NoActiveTurn`] when no turn is running.
    pub fn end_turn(&mut self, ctx: TurnContext<'_>) -> Result<TurnReport, ClockError> {
        if !self.is_turn_active() {
            warn!("clock: end_turn ignored, no active turn");
            return Err(ClockError::NoActiveTurn);
        }
        let cause = if self.time_remaining.is_zero() {
            TurnEndCause::Expired
        } else {
            TurnEndCause::Forced
        };
        Ok(self.finish_turn(cause, ctx))
    }

    /// Skip the rest of the countdown, e.g. when the player sleeps early.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NoActiveTurn`] when no turn is running.
    pub fn force_end_turn(&mut self, ctx: TurnContext<'_>) -> Result<TurnReport, ClockError> {
        if self.is_turn_active() {
            info!(
                "clock: turn {} forced to end with {:.1}s unused",
                self.turn,
                self.time_remaining.as_secs_f32()
            );
        }
        self.end_turn(ctx)
    }

    /// Return to idle without running the end-of-turn sequence. Used for new runs.
    pub const fn reset(&mut self) {
        self.phase = TurnPhase::Idle;
        self.time_remaining = Duration::ZERO;
        self.turn = 0;
    }

    fn finish_turn(&mut self, cause: TurnEndCause, ctx: TurnContext<'_>) -> TurnReport {
        let TurnContext {
            plants,
            quotas,
            ledger,
        } = ctx;
        let unused = self.time_remaining;
        self.time_remaining = Duration::ZERO;
        self.phase = TurnPhase::Expiring;

        let mut growth = AdvanceReport::default();
        plants.for_each_live(&mut |id, plant| growth.record(id, plant.advance()));

        let resolution = quotas.on_turn_ended(ledger);

        self.phase = TurnPhase::Idle;
        debug!(
            "clock: turn {} ended ({cause:?}), {} plants advanced",
            self.turn, growth.advanced
        );
        self.listeners.emit(&TurnEvent::TurnEnded {
            turn: self.turn,
            cause,
            unused,
        });

        TurnReport {
            turn: self.turn,
            cause,
            unused,
            growth,
            resolution,
        }
    }
}

impl Default for TurnClock {
    fn default() -> Self {
        Self::new(crate::numbers::duration_from_secs(
            crate::constants::DEFAULT_TURN_TIME_LIMIT_SECS,
        ))
    }
}
