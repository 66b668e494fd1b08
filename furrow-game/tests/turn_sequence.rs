use furrow_game::{
    FarmConfig, FarmSession, QuotaBook, QuotaDefinition, QuotaEvent, RunStatus, SeedDefinition,
    SessionError, Stockpile, TurnEndCause, TurnEvent, TurnPhase,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(250);

fn book(turns_allowed: u32) -> QuotaBook {
    QuotaBook::new(vec![QuotaDefinition {
        creditor: "Pell".to_string(),
        required_amount: 50,
        turns_allowed,
        completion_bonus: 0,
        season: furrow_game::Season::Winter,
        intro: String::new(),
        success_text: String::new(),
        failure_text: String::new(),
    }])
}

fn session(limit_secs: f32, turns_allowed: u32) -> FarmSession {
    let config = FarmConfig {
        turn_time_limit_secs: limit_secs,
        starting_money: 0,
        ..FarmConfig::default()
    };
    let mut session = FarmSession::new(config, book(turns_allowed), 21).unwrap();
    session.begin().unwrap();
    session
}

fn radish() -> Rc<SeedDefinition> {
    Rc::new(SeedDefinition {
        id: "radish_seed".to_string(),
        crop_id: "radish".to_string(),
        name: "Radish".to_string(),
        growth_turns: 3,
        growth_stages: 3,
        multi_harvest: false,
        harvests_per_plant: 1,
        regrow_stage: None,
        yield_min: 1,
        yield_max: 1,
        seed_price: 3,
        crop_price: 8,
    })
}

fn planted(session: &mut FarmSession) -> furrow_game::PlantId {
    let mut inventory = Stockpile::new();
    inventory.add_seeds("radish_seed", 1);
    session.start_turn().unwrap();
    let id = session.plant(radish(), &mut inventory).unwrap();
    session.water(id).unwrap();
    id
}

#[test]
fn ticking_through_the_limit_ends_the_turn_once() {
    let mut session = session(2.0, 5);
    session.start_turn().unwrap();
    let mut reports = Vec::new();
    for _ in 0..20 {
        if let Some(report) = session.tick(FRAME).unwrap() {
            reports.push(report);
        }
    }
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].cause, TurnEndCause::Expired);
    assert_eq!(session.clock().phase(), TurnPhase::Idle);
    assert_eq!(session.quotas().turns_remaining(), 4);
}

#[test]
fn forced_end_with_time_left_matches_natural_timeout() {
    let mut natural = session(120.0, 3);
    let mut forced = session(120.0, 3);
    let natural_plant = planted(&mut natural);
    let forced_plant = planted(&mut forced);

    let natural_report = natural
        .tick(Duration::from_secs(120))
        .unwrap()
        .expect("turn expires");
    forced.tick(Duration::from_secs(78)).unwrap();
    assert_eq!(forced.clock().time_remaining(), Duration::from_secs(42));
    let forced_report = forced.force_end_turn().unwrap();

    assert_eq!(forced_report.unused, Duration::from_secs(42));
    assert_eq!(forced_report.cause, TurnEndCause::Forced);
    assert_eq!(natural_report.cause, TurnEndCause::Expired);
    assert_eq!(forced_report.growth, natural_report.growth);
    assert_eq!(forced_report.resolution, natural_report.resolution);
    assert_eq!(
        forced.quotas().turns_remaining(),
        natural.quotas().turns_remaining()
    );
    assert_eq!(
        forced.field().get(forced_plant).unwrap().turns_grown(),
        natural.field().get(natural_plant).unwrap().turns_grown()
    );
}

#[test]
fn plants_advance_before_quota_before_turn_observers() {
    let mut session = session(60.0, 1);
    let id = planted(&mut session);
    let log = Rc::new(RefCell::new(Vec::<String>::new()));

    let quota_log = Rc::clone(&log);
    session.on_quota_event(move |event| {
        if let QuotaEvent::TurnsRemainingChanged { .. } | QuotaEvent::QuotaFailed { .. } = event {
            quota_log.borrow_mut().push("quota".to_string());
        }
    });
    let turn_log = Rc::clone(&log);
    session.on_turn_event(move |event| {
        if matches!(event, TurnEvent::TurnEnded { .. }) {
            turn_log.borrow_mut().push("turn_ended".to_string());
        }
    });

    let report = session.force_end_turn().unwrap();
    assert_eq!(report.growth.advanced, 1);
    assert_eq!(session.field().get(id).unwrap().turns_grown(), 1);
    assert!(report.resolution.unwrap().is_failure());
    assert_eq!(*log.borrow(), vec!["quota", "quota", "turn_ended"]);
    assert_eq!(session.status(), RunStatus::Failed { quota_index: 0 });
}

#[test]
fn frozen_run_rejects_turns_and_ticks() {
    let mut session = session(5.0, 1);
    session.start_turn().unwrap();
    session.force_end_turn().unwrap();
    let over = SessionError::RunOver(RunStatus::Failed { quota_index: 0 });
    assert_eq!(session.start_turn(), Err(over.clone()));
    assert_eq!(session.tick(FRAME).err(), Some(over.clone()));
    assert_eq!(session.force_end_turn().err(), Some(over));
}

#[test]
fn idle_ticks_are_ignored() {
    let mut session = session(5.0, 2);
    assert_eq!(session.tick(FRAME), Ok(None));
    assert_eq!(session.quotas().turns_remaining(), 2);
    assert!(matches!(
        session.end_turn(),
        Err(SessionError::Clock(furrow_game::ClockError::NoActiveTurn))
    ));
}

#[test]
fn time_changed_reports_each_tick() {
    let mut session = session(1.0, 2);
    let remaining = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&remaining);
    session.on_turn_event(move |event| {
        if let TurnEvent::TimeChanged { remaining } = event {
            sink.borrow_mut().push(*remaining);
        }
    });
    session.start_turn().unwrap();
    for _ in 0..4 {
        session.tick(FRAME).unwrap();
    }
    assert_eq!(
        *remaining.borrow(),
        vec![
            Duration::from_millis(750),
            Duration::from_millis(500),
            Duration::from_millis(250),
            Duration::ZERO,
        ]
    );
}
