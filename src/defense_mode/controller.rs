//! Drives a [`ContinuousDefenseSession`] locally and keeps an optional
//! session server informed.
//!
//! The local session always runs immediately. Server replies arrive later
//! and overwrite local pools (last write wins). A failed call marks the
//! controller degraded until the next successful reply.

use rand::Rng;

use crate::core::constants::AUTHORITY_RESYNC_INTERVAL_MS;
use crate::defense_mode::authority::{AuthorityReply, AuthorityRequest, AuthorityWorker};
use crate::defense_mode::logic::ContinuousDefenseSession;
use crate::defense_mode::types::*;

const LOCAL_ID_PREFIX: &str = "local-";

pub struct ModeController {
    session: ContinuousDefenseSession,
    worker: Option<AuthorityWorker>,
    session_id: Option<String>,
    degraded: bool,
    next_status_poll_at: Option<u64>,
}

impl ModeController {
    pub fn new(difficulty: Difficulty, worker: Option<AuthorityWorker>) -> Self {
        Self {
            session: ContinuousDefenseSession::new(difficulty),
            worker,
            session_id: None,
            degraded: false,
            next_status_poll_at: None,
        }
    }

    pub fn session(&self) -> &ContinuousDefenseSession {
        &self.session
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn is_active(&self) -> bool {
        self.session.status() == ModeStatus::Active
    }

    pub fn has_authority(&self) -> bool {
        self.worker.is_some()
    }

    /// Id the server knows, `None` while only a local id exists.
    fn remote_id(&self) -> Option<String> {
        self.session_id
            .as_ref()
            .filter(|id| !id.starts_with(LOCAL_ID_PREFIX))
            .cloned()
    }

    fn request(&mut self, request: AuthorityRequest) {
        let Some(worker) = &self.worker else {
            return;
        };
        if !worker.send(request) {
            log::warn!("authority worker stopped; continuing offline");
            self.worker = None;
        }
    }

    pub fn start(&mut self, now: u64) -> Vec<ModeEvent> {
        let mut events = Vec::new();
        let Some(started) = self.session.start(now) else {
            return events;
        };
        events.push(started);
        self.session_id = Some(format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4()));
        self.next_status_poll_at = Some(now + AUTHORITY_RESYNC_INTERVAL_MS);
        let difficulty = self.session.difficulty();
        self.request(AuthorityRequest::Create { difficulty });
        events
    }

    pub fn on_motion_sample(&mut self, sample: MotionSample, now: u64) -> Vec<ModeEvent> {
        let events = self.session.on_motion_sample(&sample, now);
        if self.is_active() {
            if let Some(session_id) = self.remote_id() {
                self.request(AuthorityRequest::Exercise { session_id, sample });
            }
        }
        events
    }

    /// Drain server replies, then advance the local session.
    pub fn tick<R: Rng>(&mut self, now: u64, rng: &mut R) -> Vec<ModeEvent> {
        let mut events = self.drain_replies();

        let was_active = self.is_active();
        let tick_events = self.session.tick(now);
        if let Some(session_id) = self.remote_id() {
            for event in &tick_events {
                if matches!(event, ModeEvent::MonsterAttack { .. }) {
                    self.request(AuthorityRequest::Attack {
                        session_id: session_id.clone(),
                    });
                }
            }
        }
        events.extend(tick_events);
        events.extend(self.session.wander(now, rng));

        if was_active && !self.is_active() {
            self.end_remote();
        } else if self.is_active() {
            self.poll_status(now);
        }
        events
    }

    fn poll_status(&mut self, now: u64) {
        let Some(due) = self.next_status_poll_at else {
            return;
        };
        if now < due {
            return;
        }
        self.next_status_poll_at = Some(now + AUTHORITY_RESYNC_INTERVAL_MS);
        if let Some(session_id) = self.remote_id() {
            self.request(AuthorityRequest::Status { session_id });
        }
    }

    pub fn drain_replies(&mut self) -> Vec<ModeEvent> {
        let mut events = Vec::new();
        loop {
            let Some(reply) = self.worker.as_ref().and_then(|w| w.try_recv()) else {
                break;
            };
            events.extend(self.handle_reply(reply));
        }
        events
    }

    pub fn handle_reply(&mut self, reply: AuthorityReply) -> Vec<ModeEvent> {
        let mut events = Vec::new();
        match reply.result {
            Ok(snapshot) => {
                if self.degraded {
                    self.degraded = false;
                    log::info!("authority reachable again");
                    events.push(ModeEvent::AuthorityRestored);
                }
                let Some(snapshot) = snapshot else {
                    return events;
                };
                if reply.request == "create-session" {
                    self.adopt_remote_session(snapshot.session_id);
                    return events;
                }
                if self.remote_id().as_deref() == Some(snapshot.session_id.as_str()) {
                    let was_active = self.is_active();
                    events.extend(self.session.reconcile(&snapshot));
                    if was_active && !self.is_active() {
                        self.end_remote();
                    }
                }
            }
            Err(e) => {
                // Teardown calls fail harmlessly when the server already ended the game.
                if matches!(reply.request, "stop-game" | "delete-session") {
                    log::debug!("authority {} ignored: {}", reply.request, e);
                } else if !self.degraded {
                    self.degraded = true;
                    events.push(ModeEvent::AuthorityDegraded {
                        message: e.to_string(),
                    });
                }
            }
        }
        events
    }

    fn adopt_remote_session(&mut self, remote_id: String) {
        if !self.is_active() || remote_id.is_empty() {
            // Run already over; the server copy is useless.
            if !remote_id.is_empty() {
                self.request(AuthorityRequest::Delete {
                    session_id: remote_id,
                });
            }
            return;
        }
        log::info!("authority session {}", remote_id);
        self.session_id = Some(remote_id.clone());
        self.request(AuthorityRequest::Start {
            session_id: remote_id,
        });
    }

    fn end_remote(&mut self) {
        self.next_status_poll_at = None;
        if let Some(session_id) = self.remote_id() {
            self.request(AuthorityRequest::Stop { session_id });
        }
    }

    pub fn stop(&mut self) -> Vec<ModeEvent> {
        let events: Vec<ModeEvent> = self.session.stop().into_iter().collect();
        if !events.is_empty() {
            self.end_remote();
        }
        events
    }

    /// Backend timer progress for the arm swing exercise.
    pub fn on_timer_update(
        &mut self,
        accumulated_secs: f64,
        completed: bool,
        now: u64,
    ) -> Vec<ModeEvent> {
        let events: Vec<ModeEvent> = self
            .session
            .on_timer_update(accumulated_secs, completed, now)
            .into_iter()
            .collect();
        if !events.is_empty() {
            self.end_remote();
        }
        events
    }

    /// Backend says the exercise is done.
    pub fn on_exercise_completed(&mut self) -> Vec<ModeEvent> {
        let events: Vec<ModeEvent> = self
            .session
            .finish(ModeStatus::Completed)
            .into_iter()
            .collect();
        if !events.is_empty() {
            self.end_remote();
        }
        events
    }

    pub fn reset(&mut self) {
        if let Some(session_id) = self.remote_id() {
            self.request(AuthorityRequest::Delete { session_id });
        }
        self.session.reset();
        self.session_id = None;
        self.next_status_poll_at = None;
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if self.is_active() {
            return false;
        }
        self.reset();
        self.session.set_difficulty(difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::types::ExerciseKind;
    use crate::defense_mode::authority::{AuthorityError, SessionAuthority};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records calls and answers with a canned snapshot.
    #[derive(Clone, Default)]
    struct FakeAuthority {
        calls: Arc<Mutex<Vec<String>>>,
        snapshot: Arc<Mutex<SessionSnapshot>>,
        fail: bool,
    }

    impl FakeAuthority {
        fn answer(&self, call: &str) -> Result<SessionSnapshot, AuthorityError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call.to_string());
            }
            if self.fail {
                return Err(AuthorityError::Rejected {
                    code: "INTERNAL_ERROR".into(),
                    message: "down".into(),
                });
            }
            Ok(self.snapshot.lock().map(|s| s.clone()).unwrap_or_default())
        }
    }

    impl SessionAuthority for FakeAuthority {
        fn create_session(&self, _: Difficulty) -> Result<SessionSnapshot, AuthorityError> {
            self.answer("create")
        }
        fn start_game(&self, _: &str) -> Result<SessionSnapshot, AuthorityError> {
            self.answer("start")
        }
        fn report_exercise(
            &self,
            _: &str,
            _: &MotionSample,
        ) -> Result<SessionSnapshot, AuthorityError> {
            self.answer("exercise")
        }
        fn report_attack(&self, _: &str) -> Result<SessionSnapshot, AuthorityError> {
            self.answer("attack")
        }
        fn stop_game(&self, _: &str) -> Result<SessionSnapshot, AuthorityError> {
            self.answer("stop")
        }
        fn session_status(&self, _: &str) -> Result<SessionSnapshot, AuthorityError> {
            self.answer("status")
        }
        fn delete_session(&self, _: &str) -> Result<(), AuthorityError> {
            self.answer("delete").map(|_| ())
        }
    }

    fn remote_snapshot(id: &str) -> SessionSnapshot {
        let mut snap = SessionSnapshot {
            session_id: id.to_string(),
            ..SessionSnapshot::default()
        };
        snap.player_state.hp = 100;
        snap.player_state.max_hp = 100;
        snap.player_state.shield = 100;
        snap.player_state.max_shield = 100;
        snap
    }

    /// Wait for one reply from the worker and feed it to the controller.
    fn pump(controller: &mut ModeController) -> Vec<ModeEvent> {
        let reply = controller
            .worker
            .as_ref()
            .and_then(|w| w.recv_timeout(Duration::from_secs(2)))
            .expect("reply from worker");
        controller.handle_reply(reply)
    }

    #[test]
    fn test_local_only_runs_without_authority() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut controller = ModeController::new(Difficulty::Easy, None);
        let events = controller.start(0);
        assert!(matches!(events.as_slice(), [ModeEvent::Started { .. }]));
        assert!(controller.session_id().is_some_and(|id| id.starts_with("local-")));

        controller.tick(3000, &mut rng);
        assert_eq!(controller.session().attack_count(), 1);
        assert!(!controller.is_degraded());
    }

    #[test]
    fn test_create_reply_adopts_remote_id() {
        let fake = FakeAuthority::default();
        if let Ok(mut snap) = fake.snapshot.lock() {
            *snap = remote_snapshot("srv-1");
        }
        let mut controller =
            ModeController::new(Difficulty::Normal, Some(AuthorityWorker::spawn(fake.clone())));
        controller.start(0);
        pump(&mut controller);
        assert_eq!(controller.session_id(), Some("srv-1"));

        // start-game reply is reconciled against the adopted id
        pump(&mut controller);
        let calls = fake.calls.lock().map(|c| c.clone()).unwrap_or_default();
        assert_eq!(calls, vec!["create".to_string(), "start".to_string()]);
    }

    #[test]
    fn test_failure_degrades_then_recovers() {
        let fake = FakeAuthority {
            fail: true,
            ..FakeAuthority::default()
        };
        let mut controller =
            ModeController::new(Difficulty::Normal, Some(AuthorityWorker::spawn(fake)));
        controller.start(0);
        let events = pump(&mut controller);
        assert!(matches!(events.as_slice(), [ModeEvent::AuthorityDegraded { .. }]));
        assert!(controller.is_degraded());
        assert!(controller.is_active());

        let events = controller.handle_reply(AuthorityReply {
            request: "session-status",
            result: Ok(None),
        });
        assert_eq!(events, vec![ModeEvent::AuthorityRestored]);
        assert!(!controller.is_degraded());
    }

    #[test]
    fn test_remote_completion_tears_down_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut controller = ModeController::new(Difficulty::Normal, None);
        controller.start(0);
        controller.session_id = Some("srv-2".to_string());

        let mut done = remote_snapshot("srv-2");
        done.game_state.is_completed = true;
        let reply = || AuthorityReply {
            request: "session-status",
            result: Ok(Some(done.clone())),
        };

        let first = controller.handle_reply(reply());
        assert!(matches!(first.as_slice(), [ModeEvent::Completed { .. }]));
        assert!(controller.handle_reply(reply()).is_empty());
        assert!(controller.on_exercise_completed().is_empty());
        assert!(controller.tick(10_000, &mut rng).is_empty());
        assert_eq!(controller.session().status(), ModeStatus::Completed);
    }

    #[test]
    fn test_snapshot_for_other_session_is_ignored() {
        let mut controller = ModeController::new(Difficulty::Normal, None);
        controller.start(0);
        controller.session_id = Some("srv-3".to_string());
        let mut other = remote_snapshot("srv-other");
        other.player_state.hp = 1;
        controller.handle_reply(AuthorityReply {
            request: "session-status",
            result: Ok(Some(other)),
        });
        assert_eq!(controller.session().hp(), 100);
    }

    #[test]
    fn test_difficulty_change_blocked_while_active() {
        let mut controller = ModeController::new(Difficulty::Normal, None);
        controller.start(0);
        assert!(!controller.set_difficulty(Difficulty::Hard));
        controller.stop();
        assert!(controller.set_difficulty(Difficulty::Hard));
        assert_eq!(controller.session().difficulty(), Difficulty::Hard);
        assert!(controller.session_id().is_none());
    }

    #[test]
    fn test_motion_samples_feed_local_session() {
        let mut controller = ModeController::new(Difficulty::Normal, None);
        controller.start(0);
        controller.on_motion_sample(
            MotionSample::new(ExerciseKind::AlternatingArmSwing, 4.0, true),
            100,
        );
        assert!(controller.session().is_exercising());
    }
}
