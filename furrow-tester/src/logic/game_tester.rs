use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use furrow_game::{
    DataLoader, FarmConfig, QuotaBook, QuotaResolution, RunStatus, SeedCatalog, StaticData,
};
use serde::Serialize;

use crate::logic::simulation::{SimulationConfig, SimulationSession, TurnOutcome};
use crate::logic::strategy::FarmingStrategy;

pub const DEFAULT_SIM_TURNS: u32 = 60;

/// Collection of immutable data required to run a simulation.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    config: FarmConfig,
    book: QuotaBook,
    catalog: SeedCatalog,
}

impl TesterAssets {
    #[must_use]
    pub fn load_default() -> Self {
        Self::from_loader(&StaticData)
    }

    fn from_loader(loader: &StaticData) -> Self {
        let Ok(config) = loader.load_config();
        let Ok(book) = loader.load_quota_book();
        let Ok(catalog) = loader.load_seed_catalog();
        Self {
            config,
            book,
            catalog,
        }
    }

    /// Bundled quotas and seeds with a farm config read from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn with_config_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading farm config {}", path.display()))?;
        let config = FarmConfig::from_json(&json)
            .with_context(|| format!("parsing farm config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating farm config {}", path.display()))?;
        Ok(Self {
            config,
            ..Self::load_default()
        })
    }
}

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: FarmingStrategy,
    pub max_turns: Option<u32>,
    pub setup: Option<fn(&mut FarmConfig)>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: FarmingStrategy) -> Self {
        Self {
            strategy,
            max_turns: None,
            setup: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut FarmConfig)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    /// # Errors
    ///
    /// Returns the expectation's failure.
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Aggregated analytics produced by a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FarmMetrics {
    pub turns_played: u32,
    pub quotas_cleared: usize,
    pub crops_harvested: u32,
    pub sales: i64,
    pub seed_spend: i64,
    pub casino_net: i64,
    pub bonuses_earned: i64,
    pub forced_ends: u32,
    pub expired_ends: u32,
    pub peak_balance: i64,
    pub failed_quota: Option<usize>,
}

impl FarmMetrics {
    fn record_turn(&mut self, outcome: &TurnOutcome) {
        self.turns_played += 1;
        self.crops_harvested += outcome.work.crops_harvested;
        self.sales += outcome.work.sales;
        self.seed_spend += outcome.work.seed_spend;
        self.casino_net += outcome.work.casino_net;
        if outcome.was_forced() {
            self.forced_ends += 1;
        } else {
            self.expired_ends += 1;
        }
        self.peak_balance = self.peak_balance.max(outcome.balance);
        match &outcome.report.resolution {
            Some(QuotaResolution::Completed { bonus, .. }) => {
                self.quotas_cleared += 1;
                self.bonuses_earned += bonus;
            }
            Some(QuotaResolution::Failed { index, .. }) => self.failed_quota = Some(*index),
            None => {}
        }
    }
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: FarmingStrategy,
    pub turns: Vec<TurnOutcome>,
    pub metrics: FarmMetrics,
    pub status: RunStatus,
    pub final_balance: i64,
    pub harvest_draws: u64,
}

impl SimulationSummary {
    #[must_use]
    pub const fn is_victory(&self) -> bool {
        matches!(self.status, RunStatus::Victory)
    }
}

/// Headless deterministic runner for the core game logic.
#[derive(Clone)]
pub struct GameTester {
    verbose: bool,
    assets: Rc<TesterAssets>,
}

impl GameTester {
    #[must_use]
    pub const fn new(assets: Rc<TesterAssets>, verbose: bool) -> Self {
        Self { verbose, assets }
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// # Errors
    ///
    /// Returns an error if the plan's config is rejected or a turn transition fails.
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let max_turns = plan.max_turns.unwrap_or(DEFAULT_SIM_TURNS);
        let mut config = self.assets.config.clone();
        if let Some(setup) = plan.setup {
            setup(&mut config);
        }
        let mut session = SimulationSession::new(
            SimulationConfig::new(seed).with_max_turns(max_turns),
            config,
            self.assets.book.clone(),
            self.assets.catalog.clone(),
        )
        .with_context(|| format!("starting {} run with seed {seed}", plan.strategy))?;

        if self.verbose {
            println!(
                "🎮 Starting simulation | seed:{seed} policy:{} money:{}",
                plan.strategy.label(),
                session.session().ledger().balance()
            );
        }

        let mut policy = plan.strategy.create_policy(seed);
        let mut metrics = FarmMetrics::default();
        let mut turns = Vec::new();
        while !session.is_finished() {
            let outcome = session
                .advance(policy.as_mut())
                .with_context(|| format!("turn {} with seed {seed}", turns.len() + 1))?;
            metrics.record_turn(&outcome);
            if self.verbose {
                log_turn(&outcome);
            }
            turns.push(outcome);
        }

        let farm = session.session();
        Ok(SimulationSummary {
            seed,
            strategy: plan.strategy,
            turns,
            metrics,
            status: farm.status(),
            final_balance: farm.ledger().balance(),
            harvest_draws: farm.rng_draws(),
        })
    }
}

fn log_turn(outcome: &TurnOutcome) {
    println!(
        "  🌱 turn {:>3} ({}) | harvested {:>2} sold {:>4} spent {:>4} | balance {:>5} {:?}",
        outcome.turn,
        outcome.policy,
        outcome.work.crops_harvested,
        outcome.work.sales,
        outcome.work.seed_spend,
        outcome.balance,
        outcome.status
    );
    println!(
        "     planted {:>2} watered {:>2}",
        outcome.work.planted, outcome.work.watered
    );
    match &outcome.report.resolution {
        Some(QuotaResolution::Completed {
            index, paid, bonus, ..
        }) => println!("  💰 quota {index} paid {paid} (+{bonus} bonus)"),
        Some(QuotaResolution::Failed {
            index,
            progress,
            required_amount,
        }) => println!("  💀 quota {index} failed at {progress}/{required_amount}"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> GameTester {
        GameTester::new(Rc::new(TesterAssets::load_default()), false)
    }

    #[test]
    fn zero_turn_plan_plays_nothing() {
        let plan = SimulationPlan::new(FarmingStrategy::Diligent).with_max_turns(0);
        let summary = tester().run_plan(&plan, 5).unwrap();
        assert!(summary.turns.is_empty());
        assert_eq!(summary.status, RunStatus::Running);
        assert_eq!(summary.final_balance, 50);
    }

    #[test]
    fn idle_farm_fails_first_quota() {
        let plan = SimulationPlan::new(FarmingStrategy::Idle);
        let summary = tester().run_plan(&plan, 11).unwrap();
        assert_eq!(summary.status, RunStatus::Failed { quota_index: 0 });
        assert_eq!(summary.metrics.failed_quota, Some(0));
        assert_eq!(summary.metrics.turns_played, 8);
        assert_eq!(summary.metrics.expired_ends, 8);
        assert_eq!(summary.harvest_draws, 0);
    }

    #[test]
    fn setup_hook_adjusts_config() {
        fn rich(config: &mut FarmConfig) {
            config.starting_money = 900;
        }
        let plan = SimulationPlan::new(FarmingStrategy::Idle)
            .with_max_turns(1)
            .with_setup(rich);
        let summary = tester().run_plan(&plan, 2).unwrap();
        assert_eq!(summary.final_balance, 900);
    }

    #[test]
    fn diligent_runs_are_reproducible() {
        let plan = SimulationPlan::new(FarmingStrategy::Diligent).with_max_turns(12);
        let first = tester().run_plan(&plan, 42).unwrap();
        let second = tester().run_plan(&plan, 42).unwrap();
        assert_eq!(first.metrics, second.metrics);
        assert_eq!(first.final_balance, second.final_balance);
        assert!(first.metrics.quotas_cleared >= 1);
    }

    #[test]
    fn invalid_config_file_is_rejected() {
        let path = std::env::temp_dir().join(format!(
            "furrow-tester-bad-config-{}.json",
            std::process::id()
        ));
        fs::write(&path, r#"{ "field_plots": 0 }"#).unwrap();
        let err = TesterAssets::with_config_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("validating"));
        fs::remove_file(&path).ok();
    }
}
