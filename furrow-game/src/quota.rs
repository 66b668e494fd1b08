//! Sequential creditor quotas and their turn-based deadlines.
//!
//! Each quota snapshots the ledger balance when it starts. At every turn-end the
//! remaining turn budget drops by one; when it reaches zero the quota resolves
//! exactly once by comparing `balance - snapshot` against the required amount.
//! Payment is debited from the live balance at that moment, so money earned and
//! spent again before the deadline does not count.
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::events::{EventBus, QuotaEvent, SubscriptionId};
use crate::ledger::Ledger;

const DEFAULT_QUOTA_DATA: &str = include_str!("../data/quotas.json");

/// Season a quota is set in. Presentation uses it for palettes and music.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        }
    }
}

/// One creditor's demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDefinition {
    pub creditor: String,
    pub required_amount: i64,
    pub turns_allowed: u32,
    #[serde(default)]
    pub completion_bonus: i64,
    pub season: Season,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub success_text: String,
    #[serde(default)]
    pub failure_text: String,
}

/// Errors raised when authored quota data violates its invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuotaConfigError {
    #[error("quota book is empty")]
    Empty,
    #[error("quota {index} ({creditor}) must require a positive amount (got {value})")]
    NonPositiveRequirement {
        index: usize,
        creditor: String,
        value: i64,
    },
    #[error("quota {index} ({creditor}) must allow at least one turn")]
    NoTurns {
        index: usize,
        creditor: String,
    },
    #[error("quota {index} ({creditor}) has a negative completion bonus ({value})")]
    NegativeBonus {
        index: usize,
        creditor: String,
        value: i64,
    },
}

/// Ordered list of quotas; the index is the only progression pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuotaBook {
    #[serde(default)]
    pub quotas: Vec<QuotaDefinition>,
}

impl QuotaBook {
    #[must_use]
    pub const fn new(quotas: Vec<QuotaDefinition>) -> Self {
        Self { quotas }
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a quota book.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Bundled campaign quotas.
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_QUOTA_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn default_book() -> &'static Self {
        static BOOK: OnceLock<QuotaBook> = OnceLock::new();
        BOOK.get_or_init(Self::load_from_static)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.quotas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotas.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&QuotaDefinition> {
        self.quotas.get(index)
    }

    /// # Errors
    ///
    /// Returns the first [`QuotaConfigError`] found, in book order.
    pub fn validate(&self) -> Result<(), QuotaConfigError> {
        if self.quotas.is_empty() {
            return Err(QuotaConfigError::Empty);
        }
        for (index, quota) in self.quotas.iter().enumerate() {
            if quota.required_amount <= 0 {
                return Err(QuotaConfigError::NonPositiveRequirement {
                    index,
                    creditor: quota.creditor.clone(),
                    value: quota.required_amount,
                });
            }
            if quota.turns_allowed == 0 {
                return Err(QuotaConfigError::NoTurns {
                    index,
                    creditor: quota.creditor.clone(),
                });
            }
            if quota.completion_bonus < 0 {
                return Err(QuotaConfigError::NegativeBonus {
                    index,
                    creditor: quota.creditor.clone(),
                    value: quota.completion_bonus,
                });
            }
        }
        Ok(())
    }
}

/// Mutable state of the quota currently being worked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRunState {
    pub quota_index: usize,
    pub turns_remaining: u32,
    pub starting_balance_snapshot: i64,
    pub is_active: bool,
}

/// Lifecycle of the quota at the current index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaStatus {
    NotStarted,
    Active,
    Completed,
    Failed,
}

/// Outcome of a resolution, returned to the turn clock for its report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QuotaResolution {
    Completed {
        index: usize,
        paid: i64,
        bonus: i64,
        /// Index of the quota that started next, `None` after the final quota.
        next: Option<usize>,
    },
    Failed {
        index: usize,
        progress: i64,
        required_amount: i64,
    },
}

impl QuotaResolution {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// True when the final quota in the book was paid.
    #[must_use]
    pub const fn is_final_victory(&self) -> bool {
        matches!(self, Self::Completed { next: None, .. })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuotaError {
    #[error("quota index {index} out of range (book has {count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("no quota is active")]
    NoActiveQuota,
}

#[derive(Debug)]
pub struct QuotaLedger {
    book: QuotaBook,
    run: Option<QuotaRunState>,
    status: QuotaStatus,
    quotas_cleared: usize,
    listeners: EventBus<QuotaEvent>,
}

impl QuotaLedger {
    #[must_use]
    pub const fn new(book: QuotaBook) -> Self {
        Self {
            book,
            run: None,
            status: QuotaStatus::NotStarted,
            quotas_cleared: 0,
            listeners: EventBus::new(),
        }
    }

    #[must_use]
    pub const fn book(&self) -> &QuotaBook {
        &self.book
    }

    #[must_use]
    pub const fn status(&self) -> QuotaStatus {
        self.status
    }

    #[must_use]
    pub const fn run_state(&self) -> Option<&QuotaRunState> {
        self.run.as_ref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.run.is_some_and(|run| run.is_active)
    }

    #[must_use]
    pub fn quota_index(&self) -> Option<usize> {
        self.run.map(|run| run.quota_index)
    }

    /// Turns left on the current quota, zero when none is active.
    #[must_use]
    pub fn turns_remaining(&self) -> u32 {
        self.run
            .filter(|run| run.is_active)
            .map_or(0, |run| run.turns_remaining)
    }

    #[must_use]
    pub fn current(&self) -> Option<&QuotaDefinition> {
        self.quota_index().and_then(|index| self.book.get(index))
    }

    #[must_use]
    pub const fn quotas_cleared(&self) -> usize {
        self.quotas_cleared
    }

    /// `balance - snapshot` for the active quota. May be negative.
    #[must_use]
    pub fn progress(&self, ledger: &Ledger) -> Option<i64> {
        self.run
            .filter(|run| run.is_active)
            .map(|run| ledger.balance() - run.starting_balance_snapshot)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&QuotaEvent) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Begin the quota at `index`, snapshotting the current balance.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::IndexOutOfRange`] and leaves state untouched when
    /// `index` is past the end of the book.
    pub fn start_quota(&mut self, index: usize, ledger: &Ledger) -> Result<(), QuotaError> {
        let Some(quota) = self.book.get(index) else {
            warn!(
                "quota: cannot start index {index}, book has {}",
                self.book.len()
            );
            return Err(QuotaError::IndexOutOfRange {
                index,
                count: self.book.len(),
            });
        };
        let creditor = quota.creditor.clone();
        let required_amount = quota.required_amount;
        let turns_allowed = quota.turns_allowed;
        let season = quota.season.key();

        self.run = Some(QuotaRunState {
            quota_index: index,
            turns_remaining: turns_allowed,
            starting_balance_snapshot: ledger.balance(),
            is_active: true,
        });
        self.status = QuotaStatus::Active;
        info!("quota {index}: {creditor} wants {required_amount} in {turns_allowed} turns");
        debug!(
            "quota {index}: {season} season, balance snapshot {}",
            ledger.balance()
        );
        self.listeners.emit(&QuotaEvent::QuotaStarted {
            index,
            creditor,
            required_amount,
            turns_allowed,
        });
        self.listeners.emit(&QuotaEvent::ProgressChanged {
            index,
            progress: 0,
            required_amount,
        });
        Ok(())
    }

    /// Turn-end entry point. Decrements the budget and resolves at zero.
    ///
    /// Does nothing when no quota is active.
    pub fn on_turn_ended(&mut self, ledger: &mut Ledger) -> Option<QuotaResolution> {
        let run = self.run.as_mut().filter(|run| run.is_active)?;
        run.turns_remaining = run.turns_remaining.saturating_sub(1);
        let index = run.quota_index;
        let turns_remaining = run.turns_remaining;
        debug!("quota {index}: {turns_remaining} turns remaining");
        self.listeners.emit(&QuotaEvent::TurnsRemainingChanged {
            index,
            turns_remaining,
        });
        if turns_remaining == 0 {
            self.resolve_quota(ledger)
        } else {
            None
        }
    }

    /// Display-only progress tracking. Never resolves the quota.
    pub fn on_balance_changed(&mut self, balance: i64) -> Option<i64> {
        let run = self.run.filter(|run| run.is_active)?;
        let required_amount = self.book.get(run.quota_index)?.required_amount;
        let progress = balance - run.starting_balance_snapshot;
        self.listeners.emit(&QuotaEvent::ProgressChanged {
            index: run.quota_index,
            progress,
            required_amount,
        });
        Some(progress)
    }

    /// Grant (or with a negative `delta`, take away) turns on the active quota.
    ///
    /// The result is clamped at zero and never triggers a resolution on its own.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::NoActiveQuota`] when nothing is active.
    pub fn add_turns(&mut self, delta: i64) -> Result<u32, QuotaError> {
        let Some(run) = self.run.as_mut().filter(|run| run.is_active) else {
            warn!("quota: add_turns({delta}) with no active quota");
            return Err(QuotaError::NoActiveQuota);
        };
        let adjusted = i64::from(run.turns_remaining).saturating_add(delta);
        run.turns_remaining = u32::try_from(adjusted.max(0)).unwrap_or(u32::MAX);
        let index = run.quota_index;
        let turns_remaining = run.turns_remaining;
        self.listeners.emit(&QuotaEvent::TurnsRemainingChanged {
            index,
            turns_remaining,
        });
        Ok(turns_remaining)
    }

    /// Forget all progress; used when a new run begins.
    pub fn reset(&mut self) {
        self.run = None;
        self.status = QuotaStatus::NotStarted;
        self.quotas_cleared = 0;
    }

    fn resolve_quota(&mut self, ledger: &mut Ledger) -> Option<QuotaResolution> {
        let run = self.run.as_mut().filter(|run| run.is_active)?;
        run.is_active = false;
        let index = run.quota_index;
        let snapshot = run.starting_balance_snapshot;
        let quota = self.book.get(index)?.clone();

        ledger.set_spend_locked(true);
        let progress = ledger.balance() - snapshot;

        if progress >= quota.required_amount {
            match ledger.remove_money(quota.required_amount, true) {
                Ok(_) => return Some(self.complete_quota(index, &quota, ledger)),
                Err(err) => {
                    error!(
                        "quota {index}: payment of {} failed: {err}",
                        quota.required_amount
                    );
                }
            }
        }

        self.status = QuotaStatus::Failed;
        info!(
            "quota {index}: {} not satisfied ({progress}/{})",
            quota.creditor, quota.required_amount
        );
        self.listeners.emit(&QuotaEvent::QuotaFailed {
            index,
            creditor: quota.creditor,
            progress,
            required_amount: quota.required_amount,
        });
        Some(QuotaResolution::Failed {
            index,
            progress,
            required_amount: quota.required_amount,
        })
    }

    fn complete_quota(
        &mut self,
        index: usize,
        quota: &QuotaDefinition,
        ledger: &mut Ledger,
    ) -> QuotaResolution {
        let bonus = quota.completion_bonus.max(0);
        if bonus > 0
            && let Err(err) = ledger.add_money(bonus)
        {
            error!("quota {index}: completion bonus of {bonus} was not credited: {err}");
        }
        ledger.set_spend_locked(false);
        self.status = QuotaStatus::Completed;
        self.quotas_cleared += 1;
        info!(
            "quota {index}: paid {} to {} (bonus {bonus})",
            quota.required_amount, quota.creditor
        );
        self.listeners.emit(&QuotaEvent::QuotaCompleted {
            index,
            creditor: quota.creditor.clone(),
            paid: quota.required_amount,
            bonus,
        });

        let next_index = index + 1;
        let next = if next_index < self.book.len() {
            self.start_quota(next_index, ledger)
                .ok()
                .map(|()| next_index)
        } else {
            info!("quota: all {} creditors paid", self.quotas_cleared);
            self.listeners.emit(&QuotaEvent::AllQuotasCleared {
                quotas_cleared: self.quotas_cleared,
            });
            None
        };

        QuotaResolution::Completed {
            index,
            paid: quota.required_amount,
            bonus,
            next,
        }
    }
}
