use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::logic::simulation::Farmhand;

/// Seed every built-in policy farms with.
pub const STAPLE_SEED: &str = "turnip_seed";

/// Policy interface for automated play strategies.
pub trait FarmPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Spend the turn's time on the farm.
    fn work(&mut self, hand: &mut Farmhand<'_>);

    /// Whether the policy ends its turn as soon as the work is done instead of
    /// letting the clock run out.
    fn sleeps_early(&self) -> bool {
        true
    }
}

/// Built-in farming strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FarmingStrategy {
    Diligent,
    Negligent,
    Gambler,
    Idle,
}

impl FarmingStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Diligent => "Diligent",
            Self::Negligent => "Negligent",
            Self::Gambler => "Gambler",
            Self::Idle => "Idle",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn FarmPolicy> {
        match self {
            Self::Diligent => Box::new(DiligentPolicy),
            Self::Negligent => Box::new(NegligentPolicy),
            Self::Gambler => Box::new(GamblerPolicy::new(seed)),
            Self::Idle => Box::new(IdlePolicy),
        }
    }
}

impl fmt::Display for FarmingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct DiligentPolicy;
struct NegligentPolicy;
struct IdlePolicy;

struct GamblerPolicy {
    rng: ChaCha20Rng,
}

impl GamblerPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

/// Money the farm may spend this turn without endangering the active quota.
///
/// With enough turns left for a fresh crop to mature, everything goes back into
/// seed. Otherwise only the surplus above the quota is spent.
fn spending_budget(hand: &Farmhand<'_>, seed_id: &str) -> i64 {
    let growth_turns = hand.seed(seed_id).map_or(0, |seed| seed.growth_turns);
    match hand.quota_outlook() {
        Some(outlook) if outlook.turns_remaining > growth_turns => hand.balance(),
        Some(outlook) => outlook.surplus().max(0),
        None => 0,
    }
}

/// Buy staple seed for the free plots and plant it.
fn tend_fields(hand: &mut Farmhand<'_>, budget: i64) {
    let free = u32::try_from(hand.free_plots()).unwrap_or(u32::MAX);
    let held = hand.seeds_held(STAPLE_SEED);
    hand.buy_seeds(STAPLE_SEED, free.saturating_sub(held), budget);
    hand.plant_all(STAPLE_SEED);
}

impl FarmPolicy for DiligentPolicy {
    fn name(&self) -> &'static str {
        "Diligent"
    }

    fn work(&mut self, hand: &mut Farmhand<'_>) {
        hand.harvest_ready();
        hand.sell_all();
        let budget = spending_budget(hand, STAPLE_SEED);
        tend_fields(hand, budget);
        hand.water_all();
    }
}

impl FarmPolicy for GamblerPolicy {
    fn name(&self) -> &'static str {
        "Gambler"
    }

    fn work(&mut self, hand: &mut Farmhand<'_>) {
        hand.harvest_ready();
        hand.sell_all();
        let budget = spending_budget(hand, STAPLE_SEED);
        let stake = budget / 5;
        let mut budget = budget;
        if stake > 0 {
            let won = self.rng.gen_bool(0.45);
            if let Some(net) = hand.gamble(stake, won) {
                budget += net;
            }
        }
        tend_fields(hand, budget);
        hand.water_all();
    }
}

impl FarmPolicy for NegligentPolicy {
    fn name(&self) -> &'static str {
        "Negligent"
    }

    fn work(&mut self, hand: &mut Farmhand<'_>) {
        let budget = hand.balance();
        tend_fields(hand, budget);
    }

    fn sleeps_early(&self) -> bool {
        false
    }
}

impl FarmPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn work(&mut self, _hand: &mut Farmhand<'_>) {}

    fn sleeps_early(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_policy_names() {
        for strategy in [
            FarmingStrategy::Diligent,
            FarmingStrategy::Negligent,
            FarmingStrategy::Gambler,
            FarmingStrategy::Idle,
        ] {
            let policy = strategy.create_policy(7);
            assert_eq!(policy.name(), strategy.label());
            assert_eq!(strategy.to_string(), strategy.label());
        }
    }

    #[test]
    fn only_active_farmers_sleep_early() {
        assert!(FarmingStrategy::Diligent.create_policy(1).sleeps_early());
        assert!(FarmingStrategy::Gambler.create_policy(1).sleeps_early());
        assert!(!FarmingStrategy::Negligent.create_policy(1).sleeps_early());
        assert!(!FarmingStrategy::Idle.create_policy(1).sleeps_early());
    }

    #[test]
    fn gambler_rolls_are_seeded() {
        let mut first = GamblerPolicy::new(99);
        let mut second = GamblerPolicy::new(99);
        let a: Vec<bool> = (0..16).map(|_| first.rng.gen_bool(0.45)).collect();
        let b: Vec<bool> = (0..16).map(|_| second.rng.gen_bool(0.45)).collect();
        assert_eq!(a, b);
    }
}
