use std::time::Duration;

use anyhow::Result;
use furrow_game::{
    FarmConfig, FarmSession, QuotaBook, RunStatus, SeedCatalog, SeedDefinition, SessionError,
    Stockpile, TurnEndCause, TurnReport,
};
use log::debug;

use crate::logic::strategy::FarmPolicy;

/// Simulated frame length used to drain the turn clock.
pub const FRAME: Duration = Duration::from_millis(250);

/// Configuration for a simulation session.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub seed: u64,
    pub max_turns: u32,
}

impl SimulationConfig {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            max_turns: 60,
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }
}

/// What a policy did during one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkLog {
    pub crops_harvested: u32,
    pub sales: i64,
    pub seeds_bought: u32,
    pub seed_spend: i64,
    pub planted: usize,
    pub watered: usize,
    pub casino_net: i64,
    pub rejected_spends: u32,
}

/// Quota state as the player sees it on the HUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaOutlook {
    pub index: usize,
    pub required: i64,
    pub progress: i64,
    pub turns_remaining: u32,
}

impl QuotaOutlook {
    /// Money above what the creditor will collect; negative while short.
    #[must_use]
    pub const fn surplus(&self) -> i64 {
        self.progress - self.required
    }
}

/// Everything a policy may touch during a turn.
pub struct Farmhand<'a> {
    session: &'a mut FarmSession,
    inventory: &'a mut Stockpile,
    catalog: &'a SeedCatalog,
    log: &'a mut WorkLog,
}

impl Farmhand<'_> {
    #[must_use]
    pub fn balance(&self) -> i64 {
        self.session.ledger().balance()
    }

    #[must_use]
    pub fn quota_outlook(&self) -> Option<QuotaOutlook> {
        let quotas = self.session.quotas();
        let run = quotas.run_state().filter(|run| run.is_active)?;
        let required = quotas.current()?.required_amount;
        Some(QuotaOutlook {
            index: run.quota_index,
            required,
            progress: quotas.progress(self.session.ledger())?,
            turns_remaining: run.turns_remaining,
        })
    }

    #[must_use]
    pub fn seed(&self, seed_id: &str) -> Option<&SeedDefinition> {
        self.catalog.iter().find(|seed| seed.id == seed_id)
    }

    #[must_use]
    pub fn free_plots(&self) -> usize {
        self.session.field().free_plots()
    }

    #[must_use]
    pub fn seeds_held(&self, seed_id: &str) -> u32 {
        self.inventory.seed_count(seed_id)
    }

    pub fn harvest_ready(&mut self) -> u32 {
        if self.session.field().ready_count() == 0 {
            return 0;
        }
        let harvests = self
            .session
            .harvest_ready(&mut *self.inventory)
            .unwrap_or_default();
        let units = harvests.iter().map(|h| h.crop.quantity).sum::<u32>();
        self.log.crops_harvested += units;
        units
    }

    /// Sell every stored crop at its catalog price.
    pub fn sell_all(&mut self) -> i64 {
        let mut earned = 0;
        for seed in self.catalog.iter() {
            let units = self.inventory.take_crops(&seed.crop_id);
            let value = i64::from(units) * seed.crop_price;
            if value > 0 && self.session.economy().add_money(value).is_ok() {
                earned += value;
            }
        }
        self.log.sales += earned;
        earned
    }

    /// Buy up to `count` seeds without spending more than `budget`.
    pub fn buy_seeds(&mut self, seed_id: &str, count: u32, budget: i64) -> u32 {
        let Some(price) = self.seed(seed_id).map(|seed| seed.seed_price) else {
            return 0;
        };
        if price <= 0 {
            self.inventory.add_seeds(seed_id, count);
            self.log.seeds_bought += count;
            return count;
        }
        let affordable = u32::try_from(budget.min(self.balance()).max(0) / price).unwrap_or(0);
        let count = count.min(affordable);
        if count == 0 {
            return 0;
        }
        let cost = price * i64::from(count);
        match self.session.economy().remove_money(cost) {
            Ok(_) => {
                self.inventory.add_seeds(seed_id, count);
                self.log.seeds_bought += count;
                self.log.seed_spend += cost;
                count
            }
            Err(err) => {
                debug!("shop refused {count}x {seed_id}: {err}");
                self.log.rejected_spends += 1;
                0
            }
        }
    }

    /// Plant held seeds of `seed_id` into every free plot.
    pub fn plant_all(&mut self, seed_id: &str) -> usize {
        let Some(seed) = self.catalog.get(seed_id) else {
            return 0;
        };
        let mut planted = 0;
        while self.free_plots() > 0 && self.seeds_held(seed_id) > 0 {
            if self
                .session
                .plant(std::rc::Rc::clone(&seed), &mut *self.inventory)
                .is_err()
            {
                break;
            }
            planted += 1;
        }
        self.log.planted += planted;
        planted
    }

    pub fn water_all(&mut self) -> usize {
        let watered = self.session.water_all().unwrap_or(0);
        self.log.watered += watered;
        watered
    }

    /// Play one round at the casino: pay `stake`, collect double on a win.
    pub fn gamble(&mut self, stake: i64, won: bool) -> Option<i64> {
        if let Err(err) = self.session.economy().remove_money(stake) {
            debug!("casino refused stake {stake}: {err}");
            self.log.rejected_spends += 1;
            return None;
        }
        let net = if won {
            let _ = self.session.economy().add_money(stake * 2);
            stake
        } else {
            -stake
        };
        self.log.casino_net += net;
        Some(net)
    }
}

/// Result of advancing the simulation by one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub turn: u32,
    /// Name of the policy that worked the turn.
    pub policy: &'static str,
    pub work: WorkLog,
    pub report: TurnReport,
    pub balance: i64,
    pub status: RunStatus,
}

impl TurnOutcome {
    #[must_use]
    pub const fn was_forced(&self) -> bool {
        matches!(self.report.cause, TurnEndCause::Forced)
    }
}

/// Core deterministic simulation harness used by the tester.
pub struct SimulationSession {
    session: FarmSession,
    inventory: Stockpile,
    catalog: SeedCatalog,
    max_turns: u32,
}

impl SimulationSession {
    /// # Errors
    ///
    /// Returns an error when the config or quota book is rejected by the session.
    pub fn new(
        config: SimulationConfig,
        farm_config: FarmConfig,
        book: QuotaBook,
        catalog: SeedCatalog,
    ) -> Result<Self> {
        let mut session = FarmSession::new(farm_config, book, config.seed)?;
        session.begin()?;
        Ok(Self {
            session,
            inventory: Stockpile::new(),
            catalog,
            max_turns: config.max_turns,
        })
    }

    #[must_use]
    pub const fn session(&self) -> &FarmSession {
        &self.session
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.session.status().is_over() || self.session.clock().turn() >= self.max_turns
    }

    /// Play one full turn: start it, let the policy work, then run out the clock
    /// (or sleep early when the policy is done).
    ///
    /// # Errors
    ///
    /// Returns an error when the session rejects a turn transition.
    pub fn advance(&mut self, policy: &mut dyn FarmPolicy) -> Result<TurnOutcome, SessionError> {
        let turn = self.session.start_turn()?;
        debug!("turn {turn}: {} policy at work", policy.name());
        let mut work = WorkLog::default();
        {
            let mut hand = Farmhand {
                session: &mut self.session,
                inventory: &mut self.inventory,
                catalog: &self.catalog,
                log: &mut work,
            };
            policy.work(&mut hand);
        }

        let report = if policy.sleeps_early() {
            self.session.tick(FRAME)?;
            self.session.force_end_turn()?
        } else {
            self.run_out_clock()?
        };

        Ok(TurnOutcome {
            turn,
            policy: policy.name(),
            work,
            balance: self.session.ledger().balance(),
            status: self.session.status(),
            report,
        })
    }

    fn run_out_clock(&mut self) -> Result<TurnReport, SessionError> {
        loop {
            if let Some(report) = self.session.tick(FRAME)? {
                return Ok(report);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::strategy::FarmingStrategy;

    fn build(seed: u64) -> SimulationSession {
        let farm_config = FarmConfig {
            turn_time_limit_secs: 5.0,
            ..FarmConfig::default()
        };
        SimulationSession::new(
            SimulationConfig::new(seed),
            farm_config,
            QuotaBook::load_from_static(),
            SeedCatalog::load_from_static(),
        )
        .unwrap()
    }

    #[test]
    fn idle_turn_runs_out_the_clock() {
        let mut sim = build(1);
        let mut policy = FarmingStrategy::Idle.create_policy(1);
        let outcome = sim.advance(policy.as_mut()).unwrap();
        assert_eq!(outcome.turn, 1);
        assert_eq!(outcome.policy, "Idle");
        assert!(!outcome.was_forced());
        assert_eq!(outcome.work, WorkLog::default());
    }

    #[test]
    fn diligent_first_turn_buys_plants_and_waters() {
        let mut sim = build(2);
        let mut policy = FarmingStrategy::Diligent.create_policy(2);
        let outcome = sim.advance(policy.as_mut()).unwrap();
        assert!(outcome.was_forced());
        assert!(outcome.work.planted > 0);
        assert_eq!(outcome.work.watered, outcome.work.planted);
        assert_eq!(outcome.report.growth.grew, outcome.work.planted);
        assert_eq!(outcome.balance, 50 - outcome.work.seed_spend);
    }

    #[test]
    fn quota_surplus_reflects_shortfall() {
        let outlook = QuotaOutlook {
            index: 0,
            required: 150,
            progress: 40,
            turns_remaining: 3,
        };
        assert_eq!(outlook.surplus(), -110);
    }
}
