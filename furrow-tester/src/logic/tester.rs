use colored::Colorize;
use furrow_game::numbers::{i64_to_f64, usize_to_f64};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::logic::game_tester::{GameTester, SimulationPlan, SimulationSummary};
use crate::logic::scenarios::TestScenario;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayabilityAggregate {
    pub runs: usize,
    pub mean_turns: f64,
    pub mean_quotas_cleared: f64,
    pub victory_rate: f64,
    pub mean_final_balance: f64,
}

impl PlayabilityAggregate {
    fn from_summaries(summaries: &[SimulationSummary]) -> Self {
        if summaries.is_empty() {
            return Self::default();
        }
        let runs = usize_to_f64(summaries.len());
        let mean = |value: fn(&SimulationSummary) -> f64| {
            summaries.iter().map(value).sum::<f64>() / runs
        };
        Self {
            runs: summaries.len(),
            mean_turns: mean(|s| f64::from(s.metrics.turns_played)),
            mean_quotas_cleared: mean(|s| usize_to_f64(s.metrics.quotas_cleared)),
            victory_rate: mean(|s| if s.is_victory() { 1.0 } else { 0.0 }),
            mean_final_balance: mean(|s| i64_to_f64(s.final_balance)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub description: String,
    pub strategy: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub playability: PlayabilityAggregate,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    tester: GameTester,
}

impl LogicTester {
    #[must_use]
    pub const fn new(tester: GameTester) -> Self {
        Self { tester }
    }

    fn verbose(&self) -> bool {
        self.tester.verbose()
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose() {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
                println!("   {}", scenario.description.dimmed());
            }
            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let run = self.run_simulation_iterations(&scenario.plan, seed, iterations);

        let average_duration = if run.performance_data.is_empty() {
            Duration::ZERO
        } else {
            run.performance_data.iter().sum::<Duration>()
                / u32::try_from(run.performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            description: scenario.description.to_string(),
            strategy: scenario.plan.strategy.label().to_string(),
            seed,
            passed: run.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: run.successes,
            failures: run.failures,
            playability: PlayabilityAggregate::from_summaries(&run.summaries),
            average_duration,
            performance_data: run.performance_data,
        }
    }

    fn run_simulation_iterations(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> IterationRun {
        let mut run = IterationRun::default();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = match self.tester.run_plan(plan, iteration_seed) {
                Ok(summary) => summary,
                Err(err) => {
                    let message = format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1);
                    if self.verbose() {
                        println!("  ❌ {}", message.clone().red());
                    }
                    run.failures.push(message);
                    continue;
                }
            };

            if let Some(err) = evaluate_expectations(plan, &summary) {
                run.failures.push(format!(
                    "Iteration {} (strategy {}, seed {}, turns {}, status {:?}): {} | {}",
                    i + 1,
                    summary.strategy.label(),
                    summary.seed,
                    summary.turns.len(),
                    summary.status,
                    err,
                    describe_finish(&summary)
                ));

                if self.verbose() {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                }
            } else {
                run.successes += 1;
                let duration = start_time.elapsed();
                run.performance_data.push(duration);

                if self.verbose() {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) turns:{} quotas:{} strategy:{}",
                        i + 1,
                        iterations,
                        summary.metrics.turns_played,
                        summary.metrics.quotas_cleared,
                        summary.strategy.label()
                    );
                }
            }
            run.summaries.push(summary);
        }

        run
    }
}

#[derive(Default)]
struct IterationRun {
    successes: usize,
    failures: Vec<String>,
    performance_data: Vec<Duration>,
    summaries: Vec<SimulationSummary>,
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    plan.expectations
        .iter()
        .find_map(|expectation| expectation.evaluate(summary).err())
        .map(|err| err.to_string())
}

fn describe_finish(summary: &SimulationSummary) -> String {
    let metrics = &summary.metrics;
    format!(
        "balance {} (peak {}) | harvested {} sold {} seed spend {} casino {} | {} harvest draws",
        summary.final_balance,
        metrics.peak_balance,
        metrics.crops_harvested,
        metrics.sales,
        metrics.seed_spend,
        metrics.casino_net,
        summary.harvest_draws
    )
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis
            .into_iter()
            .map(|ms| Duration::from_millis(u64::try_from(ms).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::game_tester::TesterAssets;
    use crate::logic::scenarios::get_scenario;
    use std::rc::Rc;

    fn logic_tester() -> LogicTester {
        LogicTester::new(GameTester::new(Rc::new(TesterAssets::load_default()), false))
    }

    #[test]
    fn smoke_scenario_passes_for_each_seed() {
        let scenario = get_scenario("smoke").unwrap();
        let results = logic_tester().run_scenario(&scenario, &[1, 2], 2);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.passed, "{:?}", result.failures);
            assert_eq!(result.successful_iterations, 2);
            assert_eq!(result.description, scenario.description);
            assert_eq!(result.playability.runs, 2);
            assert!((result.playability.mean_turns - 3.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn playability_averages_quotas_and_balance() {
        let tester = GameTester::new(Rc::new(TesterAssets::load_default()), false);
        let plan = get_scenario("diligent").unwrap().plan;
        let first = tester.run_plan(&plan, 3).unwrap();
        let second = tester.run_plan(&plan, 4).unwrap();
        let balance = i64_to_f64(first.final_balance + second.final_balance) / 2.0;
        let cleared = first.metrics.quotas_cleared + second.metrics.quotas_cleared;

        let aggregate = PlayabilityAggregate::from_summaries(&[first, second]);
        assert_eq!(aggregate.runs, 2);
        assert!((aggregate.mean_final_balance - balance).abs() < 1e-9);
        assert!((aggregate.mean_quotas_cleared - usize_to_f64(cleared) / 2.0).abs() < 1e-9);
        assert_eq!(
            PlayabilityAggregate::from_summaries(&[]),
            PlayabilityAggregate::default()
        );
    }

    #[test]
    fn failed_expectation_is_reported() {
        let mut scenario = get_scenario("smoke").unwrap();
        scenario.plan = scenario
            .plan
            .with_expectation(|_: &SimulationSummary| -> anyhow::Result<()> {
                anyhow::bail!("forced failure")
            });
        let results = logic_tester().run_scenario(&scenario, &[9], 1);
        assert!(!results[0].passed);
        assert!(results[0].failures[0].contains("forced failure"));
        assert_eq!(results[0].successful_iterations, 0);
    }

    #[test]
    fn result_serializes_durations_as_millis() {
        let result = ScenarioResult {
            scenario_name: "smoke".to_string(),
            description: "Three diligent turns".to_string(),
            strategy: "Diligent".to_string(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            playability: PlayabilityAggregate::default(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["average_duration"], 12);
        assert_eq!(value["performance_data"][0], 12);
    }
}
