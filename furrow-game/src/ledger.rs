//! Money balance with a cooperative spend-lock.
//!
//! The ledger is the single source of truth for the player's money. Shops and
//! mini-games move money only through [`Ledger::add_money`] and
//! [`Ledger::remove_money`]; the quota ledger reads the balance when it resolves.
use log::{debug, warn};
use thiserror::Error;

use crate::events::{BalanceChanged, EventBus, SubscriptionId};

/// Reasons a ledger mutation was rejected. State is unchanged in every case.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be positive (got {0})")]
    NonPositiveAmount(i64),
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },
    #[error("spending is locked while a quota is being settled")]
    SpendLocked,
}

#[derive(Debug, Default)]
pub struct Ledger {
    balance: i64,
    spend_locked: bool,
    listeners: EventBus<BalanceChanged>,
}

impl Ledger {
    /// Create a ledger holding `starting_balance` (negative values clamp to zero).
    #[must_use]
    pub fn new(starting_balance: i64) -> Self {
        Self {
            balance: starting_balance.max(0),
            spend_locked: false,
            listeners: EventBus::new(),
        }
    }

    #[must_use]
    pub const fn balance(&self) -> i64 {
        self.balance
    }

    #[must_use]
    pub const fn is_spend_locked(&self) -> bool {
        self.spend_locked
    }

    /// Whether `amount` could be removed right now, ignoring the spend-lock.
    #[must_use]
    pub const fn has_enough_money(&self, amount: i64) -> bool {
        amount <= self.balance
    }

    /// Credit `amount` and return the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NonPositiveAmount`] when `amount <= 0`.
    pub fn add_money(&mut self, amount: i64) -> Result<i64, LedgerError> {
        if amount <= 0 {
            warn!("ledger: rejected credit of non-positive amount {amount}");
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        let previous = self.balance;
        self.balance = self.balance.saturating_add(amount);
        self.notify(previous);
        Ok(self.balance)
    }

    /// Debit `amount` and return the new balance.
    ///
    /// `ignore_lock` is reserved for the quota resolver, which must collect
    /// payment while the lock is engaged.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SpendLocked`] when locked and `ignore_lock` is false,
    /// [`LedgerError::InsufficientFunds`] when `amount` exceeds the balance, and
    /// [`LedgerError::NonPositiveAmount`] when `amount <= 0`.
    pub fn remove_money(&mut self, amount: i64, ignore_lock: bool) -> Result<i64, LedgerError> {
        if amount <= 0 {
            warn!("ledger: rejected debit of non-positive amount {amount}");
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        if self.spend_locked && !ignore_lock {
            warn!("ledger: debit of {amount} refused, spending is locked");
            return Err(LedgerError::SpendLocked);
        }
        if amount > self.balance {
            warn!(
                "ledger: debit of {amount} refused, only {} available",
                self.balance
            );
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        let previous = self.balance;
        self.balance -= amount;
        self.notify(previous);
        Ok(self.balance)
    }

    /// Overwrite the balance. Used for new runs, restores, and tests.
    pub fn set_money(&mut self, amount: i64) -> i64 {
        let previous = self.balance;
        self.balance = amount.max(0);
        self.notify(previous);
        self.balance
    }

    pub fn set_spend_locked(&mut self, locked: bool) {
        if self.spend_locked != locked {
            debug!(
                "ledger: spend-lock {}",
                if locked { "engaged" } else { "released" }
            );
        }
        self.spend_locked = locked;
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&BalanceChanged) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn notify(&mut self, previous: i64) {
        let event = BalanceChanged {
            balance: self.balance,
            delta: self.balance - previous,
        };
        self.listeners.emit(&event);
    }
}
