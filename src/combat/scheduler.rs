//! Monster attack scheduler.
//!
//! One attack cycle is `Idle -> Warning -> Attacking -> Idle`. Every
//! transition happens inside [`AttackScheduler::tick`]; pausing or resetting
//! just clears the pending deadlines, so nothing can fire into a fresh state.

use crate::core::config::DefenseConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackPhase {
    Idle,
    Warning { started_at: u64, resolves_at: u64 },
    Attacking { lockout_until: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    WarningStarted { attack_number: u32, resolves_at: u64 },
    /// The warning ran out; the caller resolves the attack now.
    AttackDue { attack_number: u32 },
    AttackCycleFinished,
}

#[derive(Debug, Clone)]
pub struct AttackScheduler {
    attack_interval_ms: u64,
    initial_delay_ms: u64,
    attack_warning_ms: u64,
    attack_lockout_ms: u64,
    resume_resync_ms: u64,
    phase: AttackPhase,
    session_started_at: Option<u64>,
    last_attack_at: Option<u64>,
    attack_count: u32,
    paused: bool,
    /// Set by a resume that found an attack overdue.
    pending_warning_at: Option<u64>,
}

impl AttackScheduler {
    /// New schedulers start paused with no session.
    pub fn new(config: &DefenseConfig) -> Self {
        Self {
            attack_interval_ms: config.attack_interval_ms,
            initial_delay_ms: config.initial_delay_ms,
            attack_warning_ms: config.attack_warning_ms,
            attack_lockout_ms: config.attack_lockout_ms,
            resume_resync_ms: config.resume_resync_ms,
            phase: AttackPhase::Idle,
            session_started_at: None,
            last_attack_at: None,
            attack_count: 0,
            paused: true,
            pending_warning_at: None,
        }
    }

    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    pub fn attack_count(&self) -> u32 {
        self.attack_count
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn session_started_at(&self) -> Option<u64> {
        self.session_started_at
    }

    pub fn last_attack_at(&self) -> Option<u64> {
        self.last_attack_at
    }

    /// Advance the state machine. At most one transition per call.
    pub fn tick(&mut self, now: u64) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        if self.paused {
            return events;
        }

        match self.phase {
            AttackPhase::Idle => {
                let due = match self.pending_warning_at {
                    Some(at) => now >= at,
                    None => self.interval_elapsed(now),
                };
                if due {
                    events.extend(self.begin_warning(now));
                }
            }
            AttackPhase::Warning { resolves_at, .. } => {
                if now >= resolves_at {
                    self.attack_count += 1;
                    self.phase = AttackPhase::Attacking {
                        lockout_until: now + self.attack_lockout_ms,
                    };
                    log::debug!("attack {} resolving at {}", self.attack_count, now);
                    events.push(SchedulerEvent::AttackDue {
                        attack_number: self.attack_count,
                    });
                }
            }
            AttackPhase::Attacking { lockout_until } => {
                if now >= lockout_until {
                    self.phase = AttackPhase::Idle;
                    self.last_attack_at = Some(now);
                    events.push(SchedulerEvent::AttackCycleFinished);
                }
            }
        }

        events
    }

    /// Both the initial grace period and the attack interval have passed.
    fn interval_elapsed(&self, now: u64) -> bool {
        match (self.session_started_at, self.last_attack_at) {
            (Some(started), Some(last)) => {
                now.saturating_sub(started) >= self.initial_delay_ms
                    && now.saturating_sub(last) >= self.attack_interval_ms
            }
            _ => false,
        }
    }

    fn begin_warning(&mut self, now: u64) -> Option<SchedulerEvent> {
        if self.phase != AttackPhase::Idle {
            log::debug!("warning refused, phase is {:?}", self.phase);
            return None;
        }
        // Never warn inside the grace period, even after a resync.
        let started = self.session_started_at?;
        if now.saturating_sub(started) < self.initial_delay_ms {
            return None;
        }
        let resolves_at = now + self.attack_warning_ms;
        self.pending_warning_at = None;
        self.phase = AttackPhase::Warning {
            started_at: now,
            resolves_at,
        };
        log::debug!("attack {} warning until {}", self.attack_count + 1, resolves_at);
        Some(SchedulerEvent::WarningStarted {
            attack_number: self.attack_count + 1,
            resolves_at,
        })
    }

    /// Stop scheduling. A pending warning is dropped unresolved; a lockout
    /// in progress is closed out. Returns true if either was cancelled.
    pub fn pause(&mut self) -> bool {
        let cancelled = self.phase != AttackPhase::Idle;
        // The attack already resolved; its cycle still counts as finished.
        if let AttackPhase::Attacking { lockout_until } = self.phase {
            self.last_attack_at = Some(lockout_until);
        }
        self.paused = true;
        self.phase = AttackPhase::Idle;
        self.pending_warning_at = None;
        cancelled
    }

    pub fn resume(&mut self, now: u64) {
        if !self.paused {
            return;
        }
        self.paused = false;

        if self.session_started_at.is_none() {
            self.session_started_at = Some(now);
            self.last_attack_at = Some(now);
            log::info!("attack schedule started at {}", now);
            return;
        }
        if self.interval_elapsed(now) {
            let at = now + self.resume_resync_ms;
            self.pending_warning_at = Some(at);
            log::debug!("overdue attack after resume, warning at {}", at);
        }
    }

    /// Back to the never-started state; stays paused.
    pub fn reset(&mut self) {
        self.phase = AttackPhase::Idle;
        self.session_started_at = None;
        self.last_attack_at = None;
        self.attack_count = 0;
        self.paused = true;
        self.pending_warning_at = None;
    }

    pub fn warning_remaining_ms(&self, now: u64) -> Option<u64> {
        match self.phase {
            AttackPhase::Warning { resolves_at, .. } => Some(resolves_at.saturating_sub(now)),
            _ => None,
        }
    }

    /// Time until the next warning begins, while idle and running.
    pub fn next_attack_in_ms(&self, now: u64) -> Option<u64> {
        if self.paused || self.phase != AttackPhase::Idle {
            return None;
        }
        if let Some(at) = self.pending_warning_at {
            return Some(at.saturating_sub(now));
        }
        let started = self.session_started_at?;
        let last = self.last_attack_at?;
        let due = (started + self.initial_delay_ms).max(last + self.attack_interval_ms);
        Some(due.saturating_sub(now))
    }
}
