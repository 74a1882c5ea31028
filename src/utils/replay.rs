//! Recorded backend sessions played back as an [`EventSource`].
//!
//! One JSON object per line:
//! `{"at_ms": 1200, "event": "pose_quality", "data": {"score": 4.5}}`.
//! `at_ms` counts from the first `start_detection` command, the same moment
//! a live backend would begin streaming. Blank lines and `#` comments are
//! skipped.

use serde::Deserialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::protocol::{EventSource, LinkEvent, OutboundCommand};

#[derive(Debug, Deserialize)]
struct ReplayLine {
    at_ms: u64,
    #[serde(flatten)]
    frame: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayEntry {
    pub at_ms: u64,
    /// `{"event": ..., "data": ...}` text as a live backend would send it.
    pub frame: String,
}

#[derive(Debug)]
pub struct ReplaySource {
    name: String,
    entries: VecDeque<ReplayEntry>,
    connected: bool,
    finished: bool,
    /// Replay time already played before the current run segment.
    played_ms: u64,
    running_since: Option<u64>,
    pending_start: bool,
    pending_stop: bool,
    sent: Vec<OutboundCommand>,
}

impl ReplaySource {
    pub fn load(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut source = Self::from_reader(BufReader::new(file))?;
        source.name = path.display().to_string();
        Ok(source)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut entries = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parsed: ReplayLine = serde_json::from_str(trimmed).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("replay line {}: {}", index + 1, e),
                )
            })?;
            entries.push(ReplayEntry {
                at_ms: parsed.at_ms,
                frame: serde_json::Value::Object(parsed.frame).to_string(),
            });
        }
        // Stable sort keeps same-time frames in file order.
        entries.sort_by_key(|e| e.at_ms);
        log::info!("loaded replay with {} frames", entries.len());

        Ok(Self {
            name: "replay".to_string(),
            entries: entries.into(),
            connected: false,
            finished: false,
            played_ms: 0,
            running_since: None,
            pending_start: false,
            pending_stop: false,
            sent: Vec::new(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    /// Commands the game sent, oldest first.
    pub fn sent(&self) -> &[OutboundCommand] {
        &self.sent
    }

    fn replay_time(&self, now: u64) -> u64 {
        self.played_ms + self.running_since.map_or(0, |since| now.saturating_sub(since))
    }
}

impl EventSource for ReplaySource {
    fn poll(&mut self, now: u64) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        if !self.connected {
            self.connected = true;
            events.push(LinkEvent::Connected);
        }
        if self.pending_stop {
            self.pending_stop = false;
            self.played_ms = self.replay_time(now);
            self.running_since = None;
        }
        if self.pending_start {
            self.pending_start = false;
            if self.running_since.is_none() {
                self.running_since = Some(now);
            }
        }
        if self.running_since.is_none() || self.finished {
            return events;
        }

        let position = self.replay_time(now);
        while self.entries.front().is_some_and(|e| e.at_ms <= position) {
            if let Some(entry) = self.entries.pop_front() {
                events.push(LinkEvent::Frame(entry.frame));
            }
        }
        if self.entries.is_empty() {
            self.finished = true;
            events.push(LinkEvent::Disconnected {
                reason: "replay finished".to_string(),
            });
        }
        events
    }

    fn send(&mut self, command: &OutboundCommand) -> bool {
        match command {
            OutboundCommand::StartDetection { .. } => self.pending_start = true,
            OutboundCommand::StopDetection => self.pending_stop = true,
            OutboundCommand::ResetCount => {}
        }
        self.sent.push(command.clone());
        !self.finished
    }

    fn describe(&self) -> String {
        format!("replay {}", self.name)
    }
}
