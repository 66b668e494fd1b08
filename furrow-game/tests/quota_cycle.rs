use furrow_game::{
    Ledger, LedgerError, QuotaBook, QuotaDefinition, QuotaEvent, QuotaLedger, QuotaResolution,
    QuotaStatus, Season,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;

fn quota(creditor: &str, required_amount: i64, turns_allowed: u32, bonus: i64) -> QuotaDefinition {
    QuotaDefinition {
        creditor: creditor.to_string(),
        required_amount,
        turns_allowed,
        completion_bonus: bonus,
        season: Season::Summer,
        intro: String::new(),
        success_text: String::new(),
        failure_text: String::new(),
    }
}

#[test]
fn overdraw_never_changes_balance() {
    let mut rng = SmallRng::seed_from_u64(0x5EED);
    for _ in 0..200 {
        let balance = rng.gen_range(0..1_000);
        let mut ledger = Ledger::new(balance);
        let amount = balance + rng.gen_range(1..500);
        assert_eq!(
            ledger.remove_money(amount, false),
            Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: balance,
            })
        );
        assert_eq!(ledger.balance(), balance);
    }
}

#[test]
fn balance_stays_non_negative_under_random_traffic() {
    let mut rng = SmallRng::seed_from_u64(0xBA1A);
    let mut ledger = Ledger::new(25);
    for _ in 0..2_000 {
        let amount = rng.gen_range(-20..200);
        if rng.gen_bool(0.5) {
            let _ = ledger.add_money(amount);
        } else {
            let _ = ledger.remove_money(amount, rng.gen_bool(0.1));
        }
        if rng.gen_bool(0.05) {
            ledger.set_spend_locked(!ledger.is_spend_locked());
        }
        assert!(ledger.balance() >= 0);
    }
}

#[test]
fn untouched_balance_fails_every_quota() {
    let book = QuotaBook::default_book();
    for (index, definition) in book.quotas.iter().enumerate() {
        let mut ledger = Ledger::new(500);
        let mut quotas = QuotaLedger::new(book.clone());
        quotas.start_quota(index, &ledger).unwrap();
        let mut resolution = None;
        for _ in 0..definition.turns_allowed {
            assert!(resolution.is_none(), "resolved before the budget ran out");
            resolution = quotas.on_turn_ended(&mut ledger);
        }
        assert_eq!(
            resolution,
            Some(QuotaResolution::Failed {
                index,
                progress: 0,
                required_amount: definition.required_amount,
            })
        );
        assert_eq!(quotas.status(), QuotaStatus::Failed);
    }
}

#[test]
fn earning_the_requirement_pays_and_keeps_bonus() {
    let book = QuotaBook::new(vec![quota("Pell", 120, 3, 15), quota("Vask", 500, 4, 0)]);
    let mut ledger = Ledger::new(60);
    let mut quotas = QuotaLedger::new(book);
    quotas.start_quota(0, &ledger).unwrap();
    let snapshot = quotas.run_state().unwrap().starting_balance_snapshot;
    ledger.add_money(120).unwrap();
    for _ in 0..3 {
        quotas.on_turn_ended(&mut ledger);
    }
    assert_eq!(ledger.balance(), snapshot + 120 - 120 + 15);
    assert_eq!(quotas.quota_index(), Some(1));
    assert_eq!(quotas.status(), QuotaStatus::Active);
}

#[test]
fn spent_earnings_are_judged_at_the_deadline() {
    let book = QuotaBook::new(vec![quota("Pell", 100, 2, 0)]);
    let mut ledger = Ledger::new(0);
    let mut quotas = QuotaLedger::new(book);
    quotas.start_quota(0, &ledger).unwrap();

    ledger.add_money(100).unwrap();
    quotas.on_balance_changed(ledger.balance());
    quotas.on_turn_ended(&mut ledger);
    // Money earned, then spent on something else before the deadline.
    ledger.remove_money(30, false).unwrap();
    quotas.on_balance_changed(ledger.balance());

    assert_eq!(quotas.progress(&ledger), Some(70));
    let resolution = quotas.on_turn_ended(&mut ledger).unwrap();
    assert!(resolution.is_failure());
    assert_eq!(ledger.balance(), 70);
}

#[test]
fn lock_blocks_plain_spending_but_not_privileged_spending() {
    let mut ledger = Ledger::new(80);
    ledger.set_spend_locked(true);
    assert_eq!(
        ledger.remove_money(50, false),
        Err(LedgerError::SpendLocked)
    );
    assert_eq!(ledger.balance(), 80);
    assert_eq!(ledger.remove_money(50, true), Ok(30));
}

#[test]
fn events_follow_resolution_order() {
    let book = QuotaBook::new(vec![quota("Pell", 10, 1, 5), quota("Vask", 20, 1, 0)]);
    let mut ledger = Ledger::new(0);
    let mut quotas = QuotaLedger::new(book);
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    quotas.subscribe(move |event| {
        let tag = match event {
            QuotaEvent::QuotaStarted { index, .. } => format!("started:{index}"),
            QuotaEvent::TurnsRemainingChanged { turns_remaining, .. } => {
                format!("turns:{turns_remaining}")
            }
            QuotaEvent::ProgressChanged { progress, .. } => format!("progress:{progress}"),
            QuotaEvent::QuotaCompleted { index, .. } => format!("completed:{index}"),
            QuotaEvent::QuotaFailed { index, .. } => format!("failed:{index}"),
            QuotaEvent::AllQuotasCleared { .. } => "cleared".to_string(),
        };
        sink.borrow_mut().push(tag);
    });

    quotas.start_quota(0, &ledger).unwrap();
    ledger.add_money(10).unwrap();
    quotas.on_turn_ended(&mut ledger);
    ledger.add_money(20).unwrap();
    quotas.on_turn_ended(&mut ledger);

    assert_eq!(
        *log.borrow(),
        vec![
            "started:0",
            "progress:0",
            "turns:0",
            "completed:0",
            "started:1",
            "progress:0",
            "turns:0",
            "completed:1",
            "cleared",
        ]
    );
    assert_eq!(quotas.quotas_cleared(), 2);
    assert_eq!(ledger.balance(), 5);
}
