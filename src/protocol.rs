//! Messages exchanged with the pose-detection backend.
//!
//! Frames are JSON text shaped `{"event": <name>, "data": {...}}`. Each
//! frame is validated once here and turned into an [`InboundEvent`]; the
//! rest of the crate never touches raw JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::types::ExerciseKind;
use crate::core::constants::MIN_VIDEO_FRAME_LEN;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown event '{0}'")]
    UnknownEvent(String),
    #[error("bad payload for '{event}': {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("video frame too short ({len} chars)")]
    FrameTooShort { len: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Cumulative repetition count for the running detection.
    RepCount { count: u32 },
    /// Form quality in `0..=5`; `None` when the backend sent no score.
    Quality {
        score: Option<f64>,
        exercise: Option<ExerciseKind>,
    },
    /// Camera frame, kept opaque. Only its size is retained.
    VideoFrame { len: usize },
    /// Timed exercises (plank) report accumulated seconds.
    TimerUpdate {
        accumulated_secs: f64,
        completed: bool,
        target_secs: Option<f64>,
    },
    ExerciseCompleted { message: Option<String> },
    DetectionStarted { success: bool, message: Option<String> },
    DetectionStopped,
    BackendError { message: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct CountPayload {
    count: u32,
}

#[derive(Deserialize)]
struct QualityPayload {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default, alias = "exerciseType")]
    exercise_type: Option<ExerciseKind>,
}

#[derive(Deserialize)]
struct FramePayload {
    frame: String,
}

#[derive(Deserialize)]
struct TimerPayload {
    accumulated_time: f64,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    target_time: Option<f64>,
}

#[derive(Deserialize, Default)]
struct MessagePayload {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct DetectionPayload {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

fn payload<T: serde::de::DeserializeOwned>(
    event: &str,
    data: serde_json::Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

/// Parse one text frame from the backend.
pub fn parse_inbound(text: &str) -> Result<InboundEvent, ProtocolError> {
    let Envelope { event, data } = serde_json::from_str(text)?;

    let parsed = match event.as_str() {
        "exercise_count" => {
            let p: CountPayload = payload(&event, data)?;
            InboundEvent::RepCount { count: p.count }
        }
        "pose_quality" | "quality_score" => {
            let p: QualityPayload = payload(&event, data)?;
            InboundEvent::Quality {
                score: p.score,
                exercise: p.exercise_type,
            }
        }
        "video_frame" => {
            let p: FramePayload = payload(&event, data)?;
            let len = p.frame.len();
            if len < MIN_VIDEO_FRAME_LEN {
                return Err(ProtocolError::FrameTooShort { len });
            }
            InboundEvent::VideoFrame { len }
        }
        "timer_update" => {
            let p: TimerPayload = payload(&event, data)?;
            InboundEvent::TimerUpdate {
                accumulated_secs: p.accumulated_time,
                completed: p.completed,
                target_secs: p.target_time,
            }
        }
        "exercise_completed" => {
            let p: MessagePayload = if data.is_null() {
                MessagePayload::default()
            } else {
                payload(&event, data)?
            };
            InboundEvent::ExerciseCompleted { message: p.message }
        }
        "start_detection_response" => {
            let p: DetectionPayload = payload(&event, data)?;
            InboundEvent::DetectionStarted {
                success: p.success,
                message: p.message,
            }
        }
        "stop_detection_response" => InboundEvent::DetectionStopped,
        "error" => {
            let p: MessagePayload = payload(&event, data)?;
            InboundEvent::BackendError {
                message: p.message.unwrap_or_else(|| "unknown error".to_string()),
            }
        }
        _ => return Err(ProtocolError::UnknownEvent(event)),
    };
    Ok(parsed)
}

/// Commands sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundCommand {
    StartDetection {
        exercise_type: String,
        camera_index: u32,
        detection_line: f64,
    },
    StopDetection,
    ResetCount,
}

impl OutboundCommand {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// What an event source hands to the game loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected,
    /// Raw text frame, parsed by the game loop.
    Frame(String),
    Disconnected { reason: String },
}

/// Anything that produces backend frames and accepts commands: the live
/// WebSocket link or a recorded replay.
pub trait EventSource {
    /// Non-blocking; returns whatever arrived since the last call.
    fn poll(&mut self, now: u64) -> Vec<LinkEvent>;
    /// Returns false if the command could not be queued.
    fn send(&mut self, command: &OutboundCommand) -> bool;
    fn describe(&self) -> String;
}
