use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::ConnectionConfig;
use crate::types::{ConnectionStatus, PlaybackState};

/// Linear reconnect delay, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Delay before reconnect attempt number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt).min(self.max)
    }
}

/// Connection lifecycle and retry bookkeeping.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    status: ConnectionStatus,
    retries: u32,
    backoff: Backoff,
}

impl ConnectionMachine {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            retries: 0,
            backoff,
        }
    }

    /// Returns false when an attempt is already in flight or open
    pub fn begin_connect(&mut self) -> bool {
        if self.status != ConnectionStatus::Disconnected {
            return false;
        }
        self.status = ConnectionStatus::Connecting;
        true
    }

    pub fn opened(&mut self) {
        self.status = ConnectionStatus::Connected;
        self.retries = 0;
    }

    /// Record a close (errors included) and return the delay before the
    /// next attempt.
    pub fn closed(&mut self) -> Duration {
        self.status = ConnectionStatus::Disconnected;
        self.retries = self.retries.saturating_add(1);
        self.backoff.delay(self.retries)
    }

    /// Back to a fresh disconnected state, retries cleared
    pub fn reset(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.retries = 0;
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}

/// Owns the single streaming connection to the state source and keeps it
/// alive, forwarding every parsed snapshot to `updates`.
pub struct ConnectionManager {
    url: String,
    machine: Arc<Mutex<ConnectionMachine>>,
    task: Mutex<Option<JoinHandle<()>>>,
    updates: mpsc::UnboundedSender<PlaybackState>,
}

impl ConnectionManager {
    pub fn new(config: &ConnectionConfig, updates: mpsc::UnboundedSender<PlaybackState>) -> Self {
        let backoff = Backoff {
            base: config.base_delay,
            max: config.max_delay,
        };
        Self {
            url: config.socket_url(),
            machine: Arc::new(Mutex::new(ConnectionMachine::new(backoff))),
            task: Mutex::new(None),
            updates,
        }
    }

    /// Start the connection task if it is not already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            log::debug!("Connection to {} already active", self.url);
            return;
        }

        log::info!("Starting connection to {}", self.url);
        let url = self.url.clone();
        let machine = self.machine.clone();
        let updates = self.updates.clone();
        *task = Some(tokio::spawn(async move {
            Self::run(url, machine, updates).await;
        }));
    }

    pub fn status(&self) -> ConnectionStatus {
        self.machine.lock().status()
    }

    pub fn retries(&self) -> u32 {
        self.machine.lock().retries()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the connection task, including any pending reconnect
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            log::info!("Stopping connection to {}", self.url);
            handle.abort();
        }
        self.machine.lock().reset();
    }

    async fn run(
        url: String,
        machine: Arc<Mutex<ConnectionMachine>>,
        updates: mpsc::UnboundedSender<PlaybackState>,
    ) {
        loop {
            // The task is the only writer, so the machine is Disconnected here
            machine.lock().begin_connect();

            log::debug!("Connecting to {}", url);
            match connect_async(url.as_str()).await {
                Ok((mut stream, _)) => {
                    machine.lock().opened();
                    log::info!("Connected to {}", url);

                    while let Some(message) = stream.next().await {
                        match message {
                            Ok(Message::Text(text)) => {
                                if !Self::handle_text(&text, &updates) {
                                    log::warn!("Session gone, dropping connection to {}", url);
                                    return;
                                }
                            }
                            Ok(Message::Close(frame)) => {
                                log::debug!("Server closed connection: {:?}", frame);
                                break;
                            }
                            Ok(Message::Binary(data)) => {
                                log::debug!("Ignoring {} byte binary message", data.len());
                            }
                            Ok(_) => {}
                            Err(e) => {
                                log::debug!("Socket error: {}", e);
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    log::debug!("Connection attempt to {} failed: {}", url, e);
                }
            }

            let (delay, attempt) = {
                let mut machine = machine.lock();
                let delay = machine.closed();
                (delay, machine.retries())
            };
            // Only the first failure in a run is worth a warning
            if attempt == 1 {
                log::warn!("Disconnected from {}, reconnecting in {}ms", url, delay.as_millis());
            } else {
                log::debug!(
                    "Reconnect attempt {} to {} in {}ms",
                    attempt,
                    url,
                    delay.as_millis()
                );
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Parse and forward one text frame. Malformed frames are dropped.
    /// Returns false once nobody is listening for updates.
    fn handle_text(text: &str, updates: &mpsc::UnboundedSender<PlaybackState>) -> bool {
        match PlaybackState::parse(text) {
            Ok(state) => updates.send(state).is_ok(),
            Err(e) => {
                log::debug!("Discarding malformed message: {} - {}", e, text);
                true
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
