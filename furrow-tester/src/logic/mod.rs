pub mod game_tester;
pub mod reports;
pub mod scenarios;
pub mod simulation;
pub mod strategy;
pub mod tester;

pub use game_tester::{GameTester, TesterAssets};
pub use scenarios::{get_scenario, list_scenarios};
pub use tester::*;
