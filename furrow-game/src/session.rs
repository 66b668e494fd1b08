//! One farming run: the long-lived owner of the ledger, quotas, clock, and field.
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

use crate::clock::{ClockError, TurnClock, TurnContext, TurnReport};
use crate::config::{ConfigError, FarmConfig};
use crate::events::{BalanceChanged, QuotaEvent, SubscriptionId, TurnEvent};
use crate::field::{Field, FieldError, Inventory, PlantId};
use crate::ledger::{Ledger, LedgerError};
use crate::plant::{Harvest, SeedDefinition};
use crate::quota::{QuotaBook, QuotaConfigError, QuotaError, QuotaLedger, QuotaResolution};
use crate::rng::RngBundle;
use crate::snapshot::RunSnapshot;

/// Where the run stands. `Failed` and `Victory` freeze the session until `new_run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    NotStarted,
    Running,
    Failed { quota_index: usize },
    Victory,
}

impl RunStatus {
    #[must_use]
    pub const fn is_over(self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Victory)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    QuotaBook(#[from] QuotaConfigError),
    #[error(transparent)]
    Quota(#[from] QuotaError),
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("run has not been started")]
    NotStarted,
    #[error("run already started")]
    AlreadyStarted,
    #[error("run is over ({0:?}); start a new run first")]
    RunOver(RunStatus),
    #[error("farm work is only possible during a turn")]
    OutsideTurn,
}

/// Money surface handed to shops and mini-games.
///
/// Every successful mutation forwards the new balance to the quota ledger so
/// its progress display stays current.
pub struct Economy<'a> {
    ledger: &'a mut Ledger,
    quotas: &'a mut QuotaLedger,
}

impl Economy<'_> {
    #[must_use]
    pub const fn balance(&self) -> i64 {
        self.ledger.balance()
    }

    #[must_use]
    pub const fn has_enough_money(&self, amount: i64) -> bool {
        self.ledger.has_enough_money(amount)
    }

    #[must_use]
    pub const fn is_spend_locked(&self) -> bool {
        self.ledger.is_spend_locked()
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::NonPositiveAmount`] for `amount <= 0`.
    pub fn add_money(&mut self, amount: i64) -> Result<i64, LedgerError> {
        let balance = self.ledger.add_money(amount)?;
        self.quotas.on_balance_changed(balance);
        Ok(balance)
    }

    /// Spend without the privileged lock bypass.
    ///
    /// # Errors
    ///
    /// Returns the ledger's rejection; the balance is unchanged on error.
    pub fn remove_money(&mut self, amount: i64) -> Result<i64, LedgerError> {
        let balance = self.ledger.remove_money(amount, false)?;
        self.quotas.on_balance_changed(balance);
        Ok(balance)
    }
}

#[derive(Debug)]
pub struct FarmSession {
    config: FarmConfig,
    ledger: Ledger,
    quotas: QuotaLedger,
    clock: TurnClock,
    field: Field,
    rng: RngBundle,
    status: RunStatus,
}

impl FarmSession {
    /// Build a session in the `NotStarted` state. Call [`FarmSession::begin`] to start quota one.
    ///
    /// # Errors
    ///
    /// Returns an error when the config or quota book is invalid, or when
    /// `config.first_quota` is not in the book.
    pub fn new(config: FarmConfig, book: QuotaBook, seed: u64) -> Result<Self, SessionError> {
        config.validate()?;
        book.validate()?;
        if config.first_quota >= book.len() {
            return Err(QuotaError::IndexOutOfRange {
                index: config.first_quota,
                count: book.len(),
            }
            .into());
        }
        Ok(Self {
            ledger: Ledger::new(config.starting_money),
            quotas: QuotaLedger::new(book),
            clock: TurnClock::new(config.turn_time_limit()),
            field: Field::with_plots(config.field_plots),
            rng: RngBundle::from_user_seed(seed),
            status: RunStatus::NotStarted,
            config,
        })
    }

    /// Start the first quota.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyStarted`] unless the run is `NotStarted`.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        if self.status != RunStatus::NotStarted {
            warn!("session: begin ignored, status {:?}", self.status);
            return Err(SessionError::AlreadyStarted);
        }
        self.quotas
            .start_quota(self.config.first_quota, &self.ledger)?;
        self.status = RunStatus::Running;
        info!(
            "session: run started at quota {} with {} money",
            self.config.first_quota,
            self.ledger.balance()
        );
        Ok(())
    }

    /// Discard the current run and begin again from the configured start.
    ///
    /// # Errors
    ///
    /// Propagates a failure to start the first quota.
    pub fn new_run(&mut self) -> Result<(), SessionError> {
        self.clock.reset();
        self.field.clear();
        self.quotas.reset();
        self.ledger.set_spend_locked(false);
        self.ledger.set_money(self.config.starting_money);
        self.rng = RngBundle::from_user_seed(self.rng.seed());
        self.status = RunStatus::NotStarted;
        self.begin()
    }

    /// # Errors
    ///
    /// Returns [`SessionError::RunOver`] or [`SessionError::NotStarted`] when
    /// the run is not running, or the clock's rejection.
    pub fn start_turn(&mut self) -> Result<u32, SessionError> {
        self.ensure_running()?;
        Ok(self.clock.start_turn()?)
    }

    /// Feed wall-clock time to the turn countdown. Returns a report when the turn ends.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RunOver`] or [`SessionError::NotStarted`] when
    /// the run is not running.
    pub fn tick(&mut self, elapsed: Duration) -> Result<Option<TurnReport>, SessionError> {
        self.ensure_running()?;
        let report = self.clock.tick(
            elapsed,
            TurnContext {
                plants: &mut self.field,
                quotas: &mut self.quotas,
                ledger: &mut self.ledger,
            },
        );
        if let Some(report) = &report {
            self.apply_report(report);
        }
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns an error when the run is not running or no turn is active.
    pub fn end_turn(&mut self) -> Result<TurnReport, SessionError> {
        self.ensure_running()?;
        let report = self.clock.end_turn(TurnContext {
            plants: &mut self.field,
            quotas: &mut self.quotas,
            ledger: &mut self.ledger,
        })?;
        self.apply_report(&report);
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns an error when the run is not running or no turn is active.
    pub fn force_end_turn(&mut self) -> Result<TurnReport, SessionError> {
        self.ensure_running()?;
        let report = self.clock.force_end_turn(TurnContext {
            plants: &mut self.field,
            quotas: &mut self.quotas,
            ledger: &mut self.ledger,
        })?;
        self.apply_report(&report);
        Ok(report)
    }

    pub const fn economy(&mut self) -> Economy<'_> {
        Economy {
            ledger: &mut self.ledger,
            quotas: &mut self.quotas,
        }
    }

    /// Plant one seed taken from `inventory`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::OutsideTurn`] between turns, or the field's rejection.
    pub fn plant(
        &mut self,
        seed: Rc<SeedDefinition>,
        inventory: &mut dyn Inventory,
    ) -> Result<PlantId, SessionError> {
        self.ensure_in_turn()?;
        Ok(self.field.plant(seed, inventory)?)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::OutsideTurn`] between turns, or the field's rejection.
    pub fn water(&mut self, id: PlantId) -> Result<(), SessionError> {
        self.ensure_in_turn()?;
        Ok(self.field.water(id)?)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::OutsideTurn`] between turns.
    pub fn water_all(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_turn()?;
        Ok(self.field.water_all())
    }

    /// # Errors
    ///
    /// Returns [`SessionError::OutsideTurn`] between turns, or the field's rejection.
    pub fn harvest(
        &mut self,
        id: PlantId,
        inventory: &mut dyn Inventory,
    ) -> Result<Harvest, SessionError> {
        self.ensure_in_turn()?;
        Ok(self.field.harvest(id, inventory, self.rng.harvest_mut())?)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::OutsideTurn`] between turns.
    pub fn harvest_ready(
        &mut self,
        inventory: &mut dyn Inventory,
    ) -> Result<Vec<Harvest>, SessionError> {
        self.ensure_in_turn()?;
        Ok(self.field.harvest_ready(inventory, self.rng.harvest_mut()))
    }

    /// Grant or revoke turns on the active quota.
    ///
    /// # Errors
    ///
    /// Returns an error when the run is not running.
    pub fn add_turns(&mut self, delta: i64) -> Result<u32, SessionError> {
        self.ensure_running()?;
        Ok(self.quotas.add_turns(delta)?)
    }

    /// The three values needed to resume. `None` unless the run is in progress.
    #[must_use]
    pub fn snapshot(&self) -> Option<RunSnapshot> {
        if self.status != RunStatus::Running {
            return None;
        }
        let quota_index = self.quotas.quota_index()?;
        Some(RunSnapshot {
            quota_index,
            turns_remaining: self.quotas.turns_remaining(),
            balance: self.ledger.balance(),
        })
    }

    /// Resume from a snapshot: set the balance, restart the saved quota, then
    /// adjust its turn budget. The quota's progress baseline becomes the restored
    /// balance. The field and clock start empty.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::IndexOutOfRange`] and leaves the session untouched
    /// when the snapshot names a quota that is not in the book.
    pub fn restore(&mut self, snapshot: &RunSnapshot) -> Result<(), SessionError> {
        let Some(quota) = self.quotas.book().get(snapshot.quota_index) else {
            warn!(
                "session: snapshot names quota {} of {}",
                snapshot.quota_index,
                self.quotas.book().len()
            );
            return Err(QuotaError::IndexOutOfRange {
                index: snapshot.quota_index,
                count: self.quotas.book().len(),
            }
            .into());
        };
        let delta = i64::from(snapshot.turns_remaining) - i64::from(quota.turns_allowed);

        self.clock.reset();
        self.field.clear();
        self.quotas.reset();
        self.ledger.set_spend_locked(false);
        self.ledger.set_money(snapshot.balance);
        self.quotas.start_quota(snapshot.quota_index, &self.ledger)?;
        if delta != 0 {
            self.quotas.add_turns(delta)?;
        }
        self.status = RunStatus::Running;
        info!(
            "session: restored quota {} with {} turns and {} money",
            snapshot.quota_index,
            self.quotas.turns_remaining(),
            self.ledger.balance()
        );
        Ok(())
    }

    pub fn on_balance_changed<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&BalanceChanged) + 'static,
    {
        self.ledger.subscribe(listener)
    }

    pub fn on_turn_event<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&TurnEvent) + 'static,
    {
        self.clock.subscribe(listener)
    }

    pub fn on_quota_event<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&QuotaEvent) + 'static,
    {
        self.quotas.subscribe(listener)
    }

    pub const fn set_turn_time_limit(&mut self, time_limit: Duration) {
        self.clock.set_turn_time_limit(time_limit);
    }

    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    #[must_use]
    pub const fn config(&self) -> &FarmConfig {
        &self.config
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub const fn quotas(&self) -> &QuotaLedger {
        &self.quotas
    }

    #[must_use]
    pub const fn clock(&self) -> &TurnClock {
        &self.clock
    }

    #[must_use]
    pub const fn field(&self) -> &Field {
        &self.field
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    #[must_use]
    pub const fn rng_draws(&self) -> u64 {
        self.rng.harvest_draws()
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        match self.status {
            RunStatus::Running => Ok(()),
            RunStatus::NotStarted => Err(SessionError::NotStarted),
            status => {
                warn!("session: rejected, run is over ({status:?})");
                Err(SessionError::RunOver(status))
            }
        }
    }

    fn ensure_in_turn(&self) -> Result<(), SessionError> {
        self.ensure_running()?;
        if self.clock.is_turn_active() {
            Ok(())
        } else {
            warn!("session: farm work attempted between turns");
            Err(SessionError::OutsideTurn)
        }
    }

    fn apply_report(&mut self, report: &TurnReport) {
        match &report.resolution {
            Some(QuotaResolution::Failed { index, .. }) => {
                self.status = RunStatus::Failed {
                    quota_index: *index,
                };
                info!("session: run lost at quota {index} on turn {}", report.turn);
            }
            Some(QuotaResolution::Completed { next: None, .. }) => {
                self.status = RunStatus::Victory;
                info!("session: every quota paid by turn {}", report.turn);
            }
            Some(QuotaResolution::Completed { .. }) | None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Stockpile;
    use crate::quota::{QuotaDefinition, Season};
    use std::cell::RefCell;

    fn book() -> QuotaBook {
        let quota = |creditor: &str, required_amount, turns_allowed| QuotaDefinition {
            creditor: creditor.to_string(),
            required_amount,
            turns_allowed,
            completion_bonus: 10,
            season: Season::Spring,
            intro: String::new(),
            success_text: String::new(),
            failure_text: String::new(),
        };
        QuotaBook::new(vec![quota("Pell", 100, 2), quota("Vask", 200, 3)])
    }

    fn session() -> FarmSession {
        let config = FarmConfig {
            starting_money: 40,
            ..FarmConfig::default()
        };
        let mut session = FarmSession::new(config, book(), 7).unwrap();
        session.begin().unwrap();
        session
    }

    fn seed() -> Rc<SeedDefinition> {
        Rc::new(SeedDefinition {
            id: "bean_seed".to_string(),
            crop_id: "bean".to_string(),
            name: "Bean".to_string(),
            growth_turns: 1,
            growth_stages: 2,
            multi_harvest: false,
            harvests_per_plant: 1,
            regrow_stage: None,
            yield_min: 2,
            yield_max: 2,
            seed_price: 5,
            crop_price: 10,
        })
    }

    #[test]
    fn new_rejects_first_quota_outside_book() {
        let config = FarmConfig {
            first_quota: 5,
            ..FarmConfig::default()
        };
        let expected = QuotaError::IndexOutOfRange { index: 5, count: 2 };
        assert_eq!(
            FarmSession::new(config, book(), 1).err(),
            Some(SessionError::Quota(expected))
        );
    }

    #[test]
    fn turns_require_a_started_run() {
        let mut session = FarmSession::new(FarmConfig::default(), book(), 1).unwrap();
        assert_eq!(session.start_turn(), Err(SessionError::NotStarted));
        session.begin().unwrap();
        assert_eq!(session.begin(), Err(SessionError::AlreadyStarted));
        assert_eq!(session.start_turn(), Ok(1));
    }

    #[test]
    fn economy_forwards_progress() {
        let mut session = session();
        let progress = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&progress);
        session.on_quota_event(move |event| {
            if let QuotaEvent::ProgressChanged { progress, .. } = event {
                sink.borrow_mut().push(*progress);
            }
        });
        let mut economy = session.economy();
        economy.add_money(30).unwrap();
        economy.remove_money(50).unwrap();
        assert_eq!(
            economy.remove_money(500),
            Err(LedgerError::InsufficientFunds {
                requested: 500,
                available: 20,
            })
        );
        assert_eq!(*progress.borrow(), vec![30, -20]);
    }

    #[test]
    fn farm_work_needs_an_active_turn() {
        let mut session = session();
        let mut inventory = Stockpile::new();
        inventory.add_seeds("bean_seed", 1);
        assert_eq!(
            session.plant(seed(), &mut inventory),
            Err(SessionError::OutsideTurn)
        );
        assert_eq!(inventory.seed_count("bean_seed"), 1);
        session.start_turn().unwrap();
        let id = session.plant(seed(), &mut inventory).unwrap();
        session.water(id).unwrap();
        session.end_turn().unwrap();
        session.start_turn().unwrap();
        let harvest = session.harvest(id, &mut inventory).unwrap();
        assert_eq!(harvest.crop.quantity, 2);
        assert_eq!(inventory.crop_count("bean"), 2);
        assert!(session.field().is_empty());
    }

    #[test]
    fn failed_quota_freezes_until_new_run() {
        let mut session = session();
        for _ in 0..2 {
            session.start_turn().unwrap();
            session.force_end_turn().unwrap();
        }
        assert_eq!(session.status(), RunStatus::Failed { quota_index: 0 });
        assert!(session.ledger().is_spend_locked());
        assert_eq!(
            session.start_turn(),
            Err(SessionError::RunOver(RunStatus::Failed { quota_index: 0 }))
        );
        assert!(session.snapshot().is_none());

        session.new_run().unwrap();
        assert_eq!(session.status(), RunStatus::Running);
        assert!(!session.ledger().is_spend_locked());
        assert_eq!(session.ledger().balance(), 40);
        assert_eq!(session.quotas().turns_remaining(), 2);
    }

    #[test]
    fn paying_every_quota_is_victory() {
        let mut session = session();
        session.economy().add_money(100).unwrap();
        for _ in 0..2 {
            session.start_turn().unwrap();
            session.force_end_turn().unwrap();
        }
        assert_eq!(session.quotas().quota_index(), Some(1));
        session.economy().add_money(200).unwrap();
        for _ in 0..3 {
            session.start_turn().unwrap();
            session.force_end_turn().unwrap();
        }
        assert_eq!(session.status(), RunStatus::Victory);
        assert_eq!(session.ledger().balance(), 40 + 10 + 10);
    }

    #[test]
    fn restore_rebuilds_quota_and_balance() {
        let mut session = session();
        session.start_turn().unwrap();
        session.force_end_turn().unwrap();
        let saved = session.snapshot().unwrap();
        assert_eq!(
            saved,
            RunSnapshot {
                quota_index: 0,
                turns_remaining: 1,
                balance: 40,
            }
        );

        let mut fresh = FarmSession::new(FarmConfig::default(), book(), 7).unwrap();
        fresh.restore(&saved).unwrap();
        assert_eq!(fresh.snapshot(), Some(saved));
        assert_eq!(fresh.status(), RunStatus::Running);
        let run = fresh.quotas().run_state().unwrap();
        assert_eq!(run.starting_balance_snapshot, 40);

        let bad = RunSnapshot {
            quota_index: 9,
            ..saved
        };
        assert!(fresh.restore(&bad).is_err());
        assert_eq!(fresh.snapshot(), Some(saved));
    }
}
