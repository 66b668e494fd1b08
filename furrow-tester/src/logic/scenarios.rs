use anyhow::{Result, anyhow, ensure};
use furrow_game::{FarmConfig, FarmEngine, MemoryStorage, RunStatus, StaticData};

use crate::logic::game_tester::{SimulationPlan, SimulationSummary};
use crate::logic::strategy::FarmingStrategy;

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: &'static str,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(
        name: impl Into<String>,
        description: &'static str,
        plan: SimulationPlan,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            plan,
        }
    }
}

const SCENARIOS: [(&str, &str); 7] = [
    ("smoke", "Three diligent turns; the run must still be going"),
    ("diligent", "Waters and replants every turn; clears a quota"),
    ("gambler", "Diligent farming plus casino stakes; terminates"),
    ("negligent", "Plants but never waters; fails quota one"),
    ("idle", "Does nothing; fails the first creditor"),
    ("idle-rich", "Starts with 1000 money, idles; still fails"),
    ("save-resume", "Saves mid-quota and resumes identically"),
];

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.to_vec()
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let (key, description) = SCENARIOS
        .iter()
        .copied()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))?;
    let plan = match key {
        "smoke" => SimulationPlan::new(FarmingStrategy::Diligent)
            .with_max_turns(3)
            .with_expectation(smoke_expectation),
        "diligent" => {
            SimulationPlan::new(FarmingStrategy::Diligent).with_expectation(diligent_expectation)
        }
        "gambler" => {
            SimulationPlan::new(FarmingStrategy::Gambler).with_expectation(terminates_expectation)
        }
        "negligent" => SimulationPlan::new(FarmingStrategy::Negligent)
            .with_expectation(first_quota_failed_expectation)
            .with_expectation(nothing_harvested_expectation),
        "idle" => SimulationPlan::new(FarmingStrategy::Idle)
            .with_expectation(first_quota_failed_expectation),
        "idle-rich" => SimulationPlan::new(FarmingStrategy::Idle)
            .with_setup(rich_setup)
            .with_expectation(first_quota_failed_expectation),
        "save-resume" => SimulationPlan::new(FarmingStrategy::Diligent)
            .with_max_turns(2)
            .with_expectation(save_resume_expectation),
        _ => return None,
    };
    Some(TestScenario::simulation(key, description, plan))
}

fn rich_setup(config: &mut FarmConfig) {
    config.starting_money = 1000;
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.turns.len() == 3,
        "expected 3 turns, played {}",
        summary.turns.len()
    );
    ensure!(
        summary.status == RunStatus::Running,
        "run should still be in progress, got {:?}",
        summary.status
    );
    ensure!(
        summary.metrics.crops_harvested == 0,
        "nothing can mature in three turns"
    );
    Ok(())
}

fn diligent_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.quotas_cleared >= 1,
        "diligent farming cleared no quota (balance {})",
        summary.final_balance
    );
    ensure!(summary.metrics.crops_harvested > 0, "no crops harvested");
    Ok(())
}

fn terminates_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(!summary.turns.is_empty(), "no turns were played");
    let last = summary
        .turns
        .last()
        .ok_or_else(|| anyhow!("missing final turn"))?;
    ensure!(
        summary.status.is_over() || last.turn == summary.metrics.turns_played,
        "turn counter drifted from the played turns"
    );
    Ok(())
}

fn first_quota_failed_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.status == RunStatus::Failed { quota_index: 0 },
        "expected the first creditor to foreclose, got {:?}",
        summary.status
    );
    ensure!(
        summary.metrics.quotas_cleared == 0,
        "a quota was cleared without income"
    );
    Ok(())
}

fn nothing_harvested_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.crops_harvested == 0,
        "unwatered plants produced {} crops",
        summary.metrics.crops_harvested
    );
    Ok(())
}

fn save_resume_expectation(summary: &SimulationSummary) -> Result<()> {
    let engine = FarmEngine::new(StaticData, MemoryStorage::new());
    let mut session = engine.create_session(summary.seed)?;
    session.begin()?;
    for _ in 0..summary.turns.len() {
        session.start_turn()?;
        session.force_end_turn()?;
    }
    session.economy().add_money(summary.final_balance.max(1))?;
    engine.save_session("scenario", &session)?;
    let resumed = engine
        .load_session("scenario", summary.seed)?
        .ok_or_else(|| anyhow!("save slot vanished"))?;
    ensure!(
        resumed.snapshot() == session.snapshot(),
        "resumed {:?} differs from saved {:?}",
        resumed.snapshot(),
        session.snapshot()
    );
    Ok(())
}
