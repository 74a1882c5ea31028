//! Integration test: combat session over a full attack cycle
//!
//! Drives a session with a manual clock in 100ms steps, the same cadence as
//! the game loop, feeding backend events the way the link would.

use fitquest::combat::types::ExerciseKind;
use fitquest::combat::{AttackOutcome, CombatEvent, CombatSession};
use fitquest::core::clock::{Clock, ManualClock};
use fitquest::core::config::DefenseConfig;
use fitquest::core::constants::TICK_INTERVAL_MS;
use fitquest::protocol::{InboundEvent, OutboundCommand};

fn new_session(exercise: ExerciseKind) -> (CombatSession<ManualClock>, ManualClock) {
    let clock = ManualClock::new(0);
    let session = CombatSession::new(DefenseConfig::default(), exercise, clock.clone());
    (session, clock)
}

fn good_form() -> InboundEvent {
    InboundEvent::Quality {
        score: Some(4.5),
        exercise: None,
    }
}

/// Tick until `pred` matches an event or `limit_ms` passes. Returns every
/// event seen.
fn run_until(
    session: &mut CombatSession<ManualClock>,
    clock: &ManualClock,
    limit_ms: u64,
    mut feed: impl FnMut(&mut CombatSession<ManualClock>) -> Vec<CombatEvent>,
    pred: impl Fn(&CombatEvent) -> bool,
) -> Vec<CombatEvent> {
    let mut seen = Vec::new();
    let deadline = clock.now_ms() + limit_ms;
    while clock.now_ms() < deadline {
        clock.advance(TICK_INTERVAL_MS);
        seen.extend(feed(session));
        let events = session.tick();
        let done = events.iter().any(&pred);
        seen.extend(events);
        if done {
            break;
        }
    }
    seen
}

fn no_feed(_: &mut CombatSession<ManualClock>) -> Vec<CombatEvent> {
    Vec::new()
}

fn is_warning(e: &CombatEvent) -> bool {
    matches!(e, CombatEvent::WarningStarted { .. })
}

fn is_resolved(e: &CombatEvent) -> bool {
    matches!(e, CombatEvent::AttackResolved { .. })
}

#[test]
fn test_first_warning_waits_for_initial_delay() {
    let (mut session, clock) = new_session(ExerciseKind::Squat);
    assert!(session.start_detection(ExerciseKind::Squat).is_some());

    let events = run_until(&mut session, &clock, 40_000, no_feed, is_warning);
    assert!(events.iter().any(is_warning));
    assert!(clock.now_ms() >= 30_000);
    assert!(matches!(
        events.last(),
        Some(CombatEvent::WarningStarted {
            attack_number: 1,
            warning_ms: 8_000
        })
    ));
}

#[test]
fn test_holding_form_blocks_the_attack() {
    let (mut session, clock) = new_session(ExerciseKind::Squat);
    session.start_detection(ExerciseKind::Squat);
    run_until(&mut session, &clock, 40_000, no_feed, is_warning);

    let events = run_until(
        &mut session,
        &clock,
        10_000,
        |s| s.handle_event(good_form()),
        is_resolved,
    );
    assert!(events.contains(&CombatEvent::ShieldRaised));
    assert!(events.iter().any(|e| matches!(
        e,
        CombatEvent::AttackResolved {
            attack_number: 1,
            outcome: AttackOutcome::Blocked,
            hp_damage: 0,
            ..
        }
    )));
    assert_eq!(session.player().hp, 150);
    assert!(session.player().is_defending);
}

#[test]
fn test_undefended_attacks_defeat_the_player() {
    let (mut session, clock) = new_session(ExerciseKind::Squat);
    session.start_detection(ExerciseKind::Squat);

    let events = run_until(&mut session, &clock, 400_000, no_feed, |e| {
        *e == CombatEvent::PlayerDefeated
    });
    let hits: Vec<(u32, AttackOutcome, u32)> = events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::AttackResolved {
                attack_number,
                outcome,
                hp_damage,
                ..
            } => Some((*attack_number, *outcome, *hp_damage)),
            _ => None,
        })
        .collect();

    // 150 hp, 20 per hit: the eighth attack lands the last 10.
    assert_eq!(hits.len(), 8);
    assert!(hits[..7]
        .iter()
        .all(|(_, outcome, damage)| *outcome == AttackOutcome::Damaged && *damage == 20));
    assert_eq!(hits[7], (8, AttackOutcome::Defeated, 10));
    assert!(session.is_defeated());
    assert!(session.scheduler().is_paused());

    // Nothing more happens while defeated.
    let after = run_until(&mut session, &clock, 100_000, no_feed, |_| true);
    assert!(after.is_empty());
    assert!(session.start_detection(ExerciseKind::Squat).is_none());
}

#[test]
fn test_reset_after_defeat_restores_player() {
    let (mut session, clock) = new_session(ExerciseKind::Squat);
    session.start_detection(ExerciseKind::Squat);
    run_until(&mut session, &clock, 400_000, no_feed, |e| {
        *e == CombatEvent::PlayerDefeated
    });

    let commands = session.reset();
    assert_eq!(commands.last(), Some(&OutboundCommand::ResetCount));
    assert!(!session.is_defeated());
    assert_eq!(session.player().hp, 150);
    assert_eq!(session.scheduler().attack_count(), 0);
    assert!(session.start_detection(ExerciseKind::Squat).is_some());
}

#[test]
fn test_stop_during_warning_cancels_and_resyncs() {
    let (mut session, clock) = new_session(ExerciseKind::Squat);
    session.start_detection(ExerciseKind::Squat);
    run_until(&mut session, &clock, 40_000, no_feed, is_warning);

    assert_eq!(session.stop_detection(), Some(OutboundCommand::StopDetection));
    clock.set(60_000);
    assert!(session.tick().is_empty());

    session.start_detection(ExerciseKind::Squat);
    let events = run_until(&mut session, &clock, 10_000, no_feed, is_warning);
    assert!(clock.now_ms() >= 63_000);
    // The cancelled attack never resolved, so the number is reused.
    assert!(matches!(
        events.last(),
        Some(CombatEvent::WarningStarted {
            attack_number: 1,
            ..
        })
    ));
}

#[test]
fn test_rep_counts_damage_current_monster() {
    let (mut session, _clock) = new_session(ExerciseKind::Squat);

    // Not detecting yet: ignored.
    assert!(session
        .handle_event(InboundEvent::RepCount { count: 2 })
        .is_empty());

    session.start_detection(ExerciseKind::Squat);
    let events = session.handle_event(InboundEvent::RepCount { count: 3 });
    assert_eq!(
        events,
        vec![CombatEvent::MonsterHit {
            monster: "Slime".to_string(),
            damage: 30,
            absorbed: 0,
        }]
    );
    assert!(session
        .handle_event(InboundEvent::RepCount { count: 3 })
        .is_empty());
    assert_eq!(session.snapshot().monsters[0].hp, 70);
}

#[test]
fn test_arm_swing_pulse_fades() {
    let (mut session, clock) = new_session(ExerciseKind::AlternatingArmSwing);
    session.start_detection(ExerciseKind::AlternatingArmSwing);

    let events = session.handle_event(InboundEvent::Quality {
        score: Some(4.0),
        exercise: None,
    });
    assert_eq!(events, vec![CombatEvent::ShieldRaised]);

    let events = run_until(&mut session, &clock, 3_000, no_feed, |e| {
        *e == CombatEvent::ShieldExpired
    });
    assert!(events.contains(&CombatEvent::ShieldExpired));
    assert!(!session.player().is_defending);
}

#[test]
fn test_connection_loss_stops_combat() {
    let (mut session, _clock) = new_session(ExerciseKind::Squat);
    session.start_detection(ExerciseKind::Squat);
    let events = session.force_stop("socket closed");
    assert_eq!(
        events,
        vec![CombatEvent::ConnectionLost {
            reason: "socket closed".to_string()
        }]
    );
    assert!(!session.is_detecting());
    assert!(session.force_stop("again").is_empty());
}
