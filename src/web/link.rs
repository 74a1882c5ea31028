//! WebSocket client for the pose-detection backend.

use futures_util::{SinkExt, StreamExt};
use std::io;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::protocol::{EventSource, LinkEvent, OutboundCommand};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Handle held by the game loop. Dropping it shuts the link thread down.
pub struct PoseLink {
    url: String,
    cmd_tx: mpsc::UnboundedSender<String>,
    event_rx: mpsc::UnboundedReceiver<LinkEvent>,
    connected: bool,
}

impl PoseLink {
    /// Spawn the link thread. Connection happens in the background; watch
    /// [`poll`](EventSource::poll) for `Connected`.
    pub fn connect(url: &str) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let target = url.to_string();
        thread::Builder::new()
            .name("pose-link".to_string())
            .spawn(move || runtime.block_on(run(target, cmd_rx, event_tx)))?;

        Ok(Self {
            url: url.to_string(),
            cmd_tx,
            event_rx,
            connected: false,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl EventSource for PoseLink {
    fn poll(&mut self, _now: u64) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            match &event {
                LinkEvent::Connected => self.connected = true,
                LinkEvent::Disconnected { .. } => self.connected = false,
                LinkEvent::Frame(_) => {}
            }
            events.push(event);
        }
        events
    }

    fn send(&mut self, command: &OutboundCommand) -> bool {
        if !self.connected {
            log::debug!("not connected, dropping {:?}", command);
            return false;
        }
        match command.to_json() {
            Ok(text) => self.cmd_tx.send(text).is_ok(),
            Err(e) => {
                log::error!("could not encode command: {}", e);
                false
            }
        }
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Connect, pump frames both ways, reconnect after a delay. Returns once the
/// game side hangs up.
async fn run(
    url: String,
    mut cmd_rx: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<LinkEvent>,
) {
    // Only the first failed attempt after a drop is reported.
    let mut reported_down = false;

    loop {
        match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                log::info!("connected to {}", url);
                reported_down = false;
                if event_tx.send(LinkEvent::Connected).is_err() {
                    return;
                }
                let (mut write, mut read) = stream.split();

                let reason = loop {
                    tokio::select! {
                        incoming = read.next() => match incoming {
                            Some(Ok(Message::Text(text))) => {
                                if event_tx.send(LinkEvent::Frame(text)).is_err() {
                                    return;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                break "backend closed the connection".to_string();
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => break e.to_string(),
                        },
                        command = cmd_rx.recv() => match command {
                            Some(text) => {
                                if let Err(e) = write.send(Message::Text(text)).await {
                                    break e.to_string();
                                }
                            }
                            None => {
                                let _ = write.close().await;
                                return;
                            }
                        },
                    }
                };

                log::warn!("link to {} dropped: {}", url, reason);
                reported_down = true;
                if event_tx.send(LinkEvent::Disconnected { reason }).is_err() {
                    return;
                }
            }
            Err(e) => {
                log::debug!("connect to {} failed: {}", url, e);
                if !reported_down {
                    reported_down = true;
                    let reason = format!("cannot reach {}: {}", url, e);
                    if event_tx.send(LinkEvent::Disconnected { reason }).is_err() {
                        return;
                    }
                }
            }
        }

        let delay = tokio::time::sleep(RECONNECT_DELAY);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                _ = &mut delay => break,
                command = cmd_rx.recv() => match command {
                    Some(_) => log::debug!("dropping command while disconnected"),
                    None => return,
                },
            }
        }
    }
}
