//! Typed listener lists and the event payloads raised by the core state machines.
//!
//! Every component owns one [`EventBus`] per event family. Listeners are invoked
//! synchronously, in subscription order, on the thread that caused the change.
//! Nothing is buffered: an event is fully delivered before `emit` returns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Handle returned by [`EventBus::subscribe`], used to detach a listener later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Ordered list of listeners for a single event type.
pub struct EventBus<E> {
    listeners: Vec<(SubscriptionId, Listener<E>)>,
    next_id: u64,
}

impl<E> EventBus<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Attach a listener. It stays attached until [`EventBus::unsubscribe`] or [`EventBus::clear`].
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Detach a listener. Returns false when the id is unknown (already removed).
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener in subscription order.
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Raised by the ledger after every successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChanged {
    pub balance: i64,
    /// Signed change relative to the previous balance.
    pub delta: i64,
}

/// How a turn came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEndCause {
    /// The countdown reached zero.
    Expired,
    /// An external request cut the countdown short.
    Forced,
}

/// Events raised by the turn clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    TurnStarted {
        turn: u32,
        time_limit: Duration,
    },
    TimeChanged {
        remaining: Duration,
    },
    TurnEnded {
        turn: u32,
        cause: TurnEndCause,
        /// Countdown left on the clock when the turn was ended.
        unused: Duration,
    },
}

/// Events raised by the quota ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QuotaEvent {
    QuotaStarted {
        index: usize,
        creditor: String,
        required_amount: i64,
        turns_allowed: u32,
    },
    TurnsRemainingChanged {
        index: usize,
        turns_remaining: u32,
    },
    ProgressChanged {
        index: usize,
        progress: i64,
        required_amount: i64,
    },
    QuotaCompleted {
        index: usize,
        creditor: String,
        paid: i64,
        bonus: i64,
    },
    QuotaFailed {
        index: usize,
        creditor: String,
        progress: i64,
        required_amount: i64,
    },
    /// The last quota in the book was paid off.
    AllQuotasCleared {
        quotas_cleared: usize,
    },
}
