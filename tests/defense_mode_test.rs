//! Integration test: continuous defense mode runs end to end
//!
//! Steps the mode in 100ms ticks with arm swing samples arriving on the
//! same cadence as the backend sends them.

use fitquest::combat::types::ExerciseKind;
use fitquest::core::constants::TICK_INTERVAL_MS;
use fitquest::defense_mode::{
    ContinuousDefenseSession, Difficulty, ModeConfig, ModeEvent, ModeStatus, MotionSample,
};

fn swing(quality: f64) -> MotionSample {
    MotionSample::new(ExerciseKind::AlternatingArmSwing, quality, true)
}

fn short_easy_run() -> ContinuousDefenseSession {
    let config = ModeConfig {
        target_duration_ms: 30_000,
        ..Difficulty::Easy.config()
    };
    ContinuousDefenseSession::with_config(Difficulty::Easy, config)
}

/// Advance from `from` to `to`, optionally sending a good swing each tick.
fn run(
    session: &mut ContinuousDefenseSession,
    from: u64,
    to: u64,
    swinging: bool,
) -> Vec<ModeEvent> {
    let mut events = Vec::new();
    let mut now = from;
    while now < to {
        now += TICK_INTERVAL_MS;
        if swinging {
            events.extend(session.on_motion_sample(&swing(4.0), now));
        }
        events.extend(session.tick(now));
    }
    events
}

#[test]
fn test_steady_swinging_wins_the_run() {
    let mut session = short_easy_run();
    assert!(session.start(0).is_some());

    let events = run(&mut session, 0, 31_000, true);
    let completed: Vec<&ModeEvent> = events
        .iter()
        .filter(|e| matches!(e, ModeEvent::Completed { .. }))
        .collect();
    assert_eq!(completed.len(), 1);

    assert_eq!(session.status(), ModeStatus::Completed);
    assert!(session.elapsed_valid_ms() >= 30_000);
    assert!(!session.attacks_scheduled());
    assert!(session.hp() > 0);
    assert!(session.score().is_some());
    assert!(session.statistics().total_shield_repaired > 0);
    assert!(session.statistics().exercise_sessions > 0);
}

#[test]
fn test_terminal_run_stays_put() {
    let mut session = short_easy_run();
    session.start(0);
    run(&mut session, 0, 31_000, true);
    let attacks = session.attack_count();

    let later = run(&mut session, 31_000, 60_000, true);
    assert!(later.is_empty());
    assert_eq!(session.attack_count(), attacks);
    assert!(session.finish(ModeStatus::GameOver).is_none());
    assert!(session.start(60_000).is_none());

    session.reset();
    assert_eq!(session.status(), ModeStatus::NotStarted);
    assert!(session.start(60_000).is_some());
}

#[test]
fn test_time_stops_when_samples_go_stale() {
    let mut session = short_easy_run();
    session.start(0);
    run(&mut session, 0, 5_000, true);
    let after_swinging = session.elapsed_valid_ms();
    assert!(after_swinging >= 4_800);

    run(&mut session, 5_000, 7_500, false);
    let frozen = session.elapsed_valid_ms();
    assert!(frozen < after_swinging + 2_000);

    run(&mut session, 7_500, 15_000, false);
    assert_eq!(session.elapsed_valid_ms(), frozen);
    assert_eq!(session.status(), ModeStatus::Active);
}

#[test]
fn test_bad_form_earns_nothing() {
    let mut session = short_easy_run();
    session.start(0);
    let mut now = 0;
    while now < 5_000 {
        now += TICK_INTERVAL_MS;
        session.on_motion_sample(&swing(2.0), now);
        session.on_motion_sample(
            &MotionSample::new(ExerciseKind::AlternatingArmSwing, 4.5, false),
            now,
        );
        session.tick(now);
    }
    assert_eq!(session.elapsed_valid_ms(), 0);
    assert_eq!(session.statistics().total_shield_repaired, 0);
}

#[test]
fn test_idle_player_is_overrun() {
    let mut session = ContinuousDefenseSession::new(Difficulty::Nightmare);
    session.start(0);

    // 25 damage per second against 100 shield + 100 hp.
    let events = run(&mut session, 0, 20_000, false);
    let attacks = events
        .iter()
        .filter(|e| matches!(e, ModeEvent::MonsterAttack { .. }))
        .count();
    assert_eq!(attacks, 8);
    assert!(events
        .iter()
        .any(|e| matches!(e, ModeEvent::GameOver { .. })));
    assert_eq!(session.status(), ModeStatus::GameOver);
    assert_eq!(session.hp(), 0);
    assert_eq!(session.statistics().total_damage_taken, 100);
}

#[test]
fn test_other_exercises_do_not_count() {
    let mut session = short_easy_run();
    session.start(0);
    let mut now = 0;
    while now < 3_000 {
        now += TICK_INTERVAL_MS;
        session.on_motion_sample(&MotionSample::new(ExerciseKind::Squat, 5.0, true), now);
        session.tick(now);
    }
    assert_eq!(session.elapsed_valid_ms(), 0);
    assert!(!session.is_exercising());
}
