//! Client for the continuous-defense session server.
//!
//! Every call is blocking, so the game loop never calls the server itself.
//! Requests go through [`AuthorityWorker`], which runs them on its own
//! thread and hands replies back over a channel.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::defense_mode::types::{Difficulty, MotionSample, SessionSnapshot};

const API_PREFIX: &str = "/api/continuous-defense";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("request failed: {0}")]
    Http(Box<ureq::Error>),
    #[error("bad response body: {0}")]
    Io(#[from] std::io::Error),
    #[error("server rejected request ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("response had no data")]
    MissingData,
}

impl From<ureq::Error> for AuthorityError {
    fn from(err: ureq::Error) -> Self {
        AuthorityError::Http(Box::new(err))
    }
}

/// `{success, data, error, code}` wrapper used by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, AuthorityError> {
        if !self.success {
            return Err(AuthorityError::Rejected {
                code: self.code.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: self.error.unwrap_or_default(),
            });
        }
        self.data.ok_or(AuthorityError::MissingData)
    }
}

pub trait SessionAuthority: Send {
    fn create_session(&self, difficulty: Difficulty) -> Result<SessionSnapshot, AuthorityError>;
    fn start_game(&self, session_id: &str) -> Result<SessionSnapshot, AuthorityError>;
    fn report_exercise(
        &self,
        session_id: &str,
        sample: &MotionSample,
    ) -> Result<SessionSnapshot, AuthorityError>;
    fn report_attack(&self, session_id: &str) -> Result<SessionSnapshot, AuthorityError>;
    fn stop_game(&self, session_id: &str) -> Result<SessionSnapshot, AuthorityError>;
    fn session_status(&self, session_id: &str) -> Result<SessionSnapshot, AuthorityError>;
    fn delete_session(&self, session_id: &str) -> Result<(), AuthorityError>;
}

pub struct HttpAuthority {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpAuthority {
    pub fn new(api_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("fitquest/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: format!("{}{}", api_url.trim_end_matches('/'), API_PREFIX),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Non-2xx responses still carry an envelope; surface its code.
    fn read<T: DeserializeOwned>(
        result: Result<ureq::Response, ureq::Error>,
    ) -> Result<T, AuthorityError> {
        Self::read_envelope(result)?.into_data()
    }

    fn read_envelope<T: DeserializeOwned>(
        result: Result<ureq::Response, ureq::Error>,
    ) -> Result<Envelope<T>, AuthorityError> {
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                return match response.into_json::<Envelope<serde_json::Value>>() {
                    Ok(envelope) => Err(AuthorityError::Rejected {
                        code: envelope.code.unwrap_or_else(|| status.to_string()),
                        message: envelope.error.unwrap_or_default(),
                    }),
                    Err(_) => Err(AuthorityError::Rejected {
                        code: status.to_string(),
                        message: "non-JSON error response".to_string(),
                    }),
                };
            }
            Err(err) => return Err(err.into()),
        };
        Ok(response.into_json()?)
    }

    fn post(&self, path: &str, body: serde_json::Value) -> Result<SessionSnapshot, AuthorityError> {
        Self::read(self.agent.post(&self.url(path)).send_json(body))
    }
}

impl SessionAuthority for HttpAuthority {
    fn create_session(&self, difficulty: Difficulty) -> Result<SessionSnapshot, AuthorityError> {
        self.post("create-session", json!({ "difficulty": difficulty }))
    }

    fn start_game(&self, session_id: &str) -> Result<SessionSnapshot, AuthorityError> {
        self.post("start-game", json!({ "session_id": session_id }))
    }

    fn report_exercise(
        &self,
        session_id: &str,
        sample: &MotionSample,
    ) -> Result<SessionSnapshot, AuthorityError> {
        self.post(
            "exercise-detection",
            json!({ "session_id": session_id, "exercise_data": sample }),
        )
    }

    fn report_attack(&self, session_id: &str) -> Result<SessionSnapshot, AuthorityError> {
        self.post("monster-attack", json!({ "session_id": session_id }))
    }

    fn stop_game(&self, session_id: &str) -> Result<SessionSnapshot, AuthorityError> {
        self.post(
            "stop-game",
            json!({ "session_id": session_id, "reason": "manual" }),
        )
    }

    fn session_status(&self, session_id: &str) -> Result<SessionSnapshot, AuthorityError> {
        let url = self.url(&format!("session-status/{}", session_id));
        Self::read(self.agent.get(&url).call())
    }

    fn delete_session(&self, session_id: &str) -> Result<(), AuthorityError> {
        let url = self.url("delete-session");
        let result = self
            .agent
            .delete(&url)
            .send_json(json!({ "session_id": session_id }));
        let envelope = Self::read_envelope::<serde_json::Value>(result)?;
        if envelope.success {
            Ok(())
        } else {
            envelope.into_data().map(|_| ())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthorityRequest {
    Create { difficulty: Difficulty },
    Start { session_id: String },
    Exercise { session_id: String, sample: MotionSample },
    Attack { session_id: String },
    Stop { session_id: String },
    Status { session_id: String },
    Delete { session_id: String },
}

impl AuthorityRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create-session",
            Self::Start { .. } => "start-game",
            Self::Exercise { .. } => "exercise-detection",
            Self::Attack { .. } => "monster-attack",
            Self::Stop { .. } => "stop-game",
            Self::Status { .. } => "session-status",
            Self::Delete { .. } => "delete-session",
        }
    }

    fn run<A: SessionAuthority + ?Sized>(
        &self,
        authority: &A,
    ) -> Result<Option<SessionSnapshot>, AuthorityError> {
        match self {
            Self::Create { difficulty } => authority.create_session(*difficulty).map(Some),
            Self::Start { session_id } => authority.start_game(session_id).map(Some),
            Self::Exercise { session_id, sample } => {
                authority.report_exercise(session_id, sample).map(Some)
            }
            Self::Attack { session_id } => authority.report_attack(session_id).map(Some),
            Self::Stop { session_id } => authority.stop_game(session_id).map(Some),
            Self::Status { session_id } => authority.session_status(session_id).map(Some),
            Self::Delete { session_id } => authority.delete_session(session_id).map(|_| None),
        }
    }
}

#[derive(Debug)]
pub struct AuthorityReply {
    pub request: &'static str,
    pub result: Result<Option<SessionSnapshot>, AuthorityError>,
}

/// Runs authority calls on a background thread.
pub struct AuthorityWorker {
    requests: Sender<AuthorityRequest>,
    replies: Receiver<AuthorityReply>,
}

impl AuthorityWorker {
    pub fn spawn<A: SessionAuthority + 'static>(authority: A) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<AuthorityRequest>();
        let (reply_tx, reply_rx) = mpsc::channel();

        thread::spawn(move || {
            // Ends when the worker handle is dropped.
            for request in request_rx {
                let result = request.run(&authority);
                if let Err(e) = &result {
                    log::warn!("authority {} failed: {}", request.name(), e);
                }
                let reply = AuthorityReply {
                    request: request.name(),
                    result,
                };
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
            log::debug!("authority worker exiting");
        });

        Self {
            requests: request_tx,
            replies: reply_rx,
        }
    }

    /// Queue a request. Returns false if the worker thread is gone.
    pub fn send(&self, request: AuthorityRequest) -> bool {
        self.requests.send(request).is_ok()
    }

    pub fn try_recv(&self) -> Option<AuthorityReply> {
        self.replies.try_recv().ok()
    }

    /// Wait for a reply. Used by tests and on shutdown.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<AuthorityReply> {
        self.replies.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    impl SessionAuthority for Unreachable {
        fn create_session(&self, _: Difficulty) -> Result<SessionSnapshot, AuthorityError> {
            Err(AuthorityError::MissingData)
        }
        fn start_game(&self, _: &str) -> Result<SessionSnapshot, AuthorityError> {
            Err(AuthorityError::MissingData)
        }
        fn report_exercise(
            &self,
            _: &str,
            _: &MotionSample,
        ) -> Result<SessionSnapshot, AuthorityError> {
            Err(AuthorityError::MissingData)
        }
        fn report_attack(&self, _: &str) -> Result<SessionSnapshot, AuthorityError> {
            Err(AuthorityError::MissingData)
        }
        fn stop_game(&self, _: &str) -> Result<SessionSnapshot, AuthorityError> {
            Err(AuthorityError::MissingData)
        }
        fn session_status(&self, id: &str) -> Result<SessionSnapshot, AuthorityError> {
            Ok(SessionSnapshot {
                session_id: id.to_string(),
                ..SessionSnapshot::default()
            })
        }
        fn delete_session(&self, _: &str) -> Result<(), AuthorityError> {
            Ok(())
        }
    }

    #[test]
    fn test_envelope_success_and_rejection() {
        let ok: Envelope<u32> =
            serde_json::from_str(r#"{"success": true, "data": 5}"#).expect("parse");
        assert_eq!(ok.into_data().expect("data"), 5);

        let rejected: Envelope<u32> = serde_json::from_str(
            r#"{"success": false, "error": "no session", "code": "INVALID_REQUEST"}"#,
        )
        .expect("parse");
        match rejected.into_data() {
            Err(AuthorityError::Rejected { code, message }) => {
                assert_eq!(code, "INVALID_REQUEST");
                assert_eq!(message, "no session");
            }
            other => panic!("unexpected {:?}", other),
        }

        let empty: Envelope<u32> = serde_json::from_str(r#"{"success": true}"#).expect("parse");
        assert!(matches!(empty.into_data(), Err(AuthorityError::MissingData)));
    }

    #[test]
    fn test_base_url_joins_prefix() {
        let authority = HttpAuthority::new("http://localhost:5000/");
        assert_eq!(
            authority.url("start-game"),
            "http://localhost:5000/api/continuous-defense/start-game"
        );
    }

    #[test]
    fn test_worker_round_trips_requests() {
        let worker = AuthorityWorker::spawn(Unreachable);
        assert!(worker.send(AuthorityRequest::Status {
            session_id: "s1".to_string()
        }));
        let reply = worker
            .recv_timeout(Duration::from_secs(2))
            .expect("reply");
        assert_eq!(reply.request, "session-status");
        let snapshot = reply.result.expect("ok").expect("snapshot");
        assert_eq!(snapshot.session_id, "s1");

        worker.send(AuthorityRequest::Start {
            session_id: "s1".to_string(),
        });
        let reply = worker
            .recv_timeout(Duration::from_secs(2))
            .expect("reply");
        assert!(reply.result.is_err());
    }
}
