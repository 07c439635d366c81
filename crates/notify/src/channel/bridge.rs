//! HTTP session driver for a headless WhatsApp Web sidecar.
//!
//! The sidecar owns the browser session and exposes:
//!
//! - `POST   /session/start`  start (or resume) the session
//! - `GET    /session/status` `{ "state": "...", "qr": "..." }`
//! - `POST   /session/send`   `{ "chat_id": "...", "text": "..." }`
//! - `DELETE /session`        destroy the session
//!
//! Session events are produced by polling `/session/status` and emitting
//! one event per observed change. After [`MAX_POLL_FAILURES`] failed polls
//! in a row the session is reported as disconnected.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::whatsapp::{SessionDriver, SessionEvent, DRIVER_STATE_CONNECTED};
use super::ChannelError;

/// Raw status body returned by the sidecar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BridgeStatus {
    pub state: String,
    #[serde(default)]
    pub qr: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Work out which event (if any) a status change represents.
pub fn translate(previous: &BridgeStatus, current: &BridgeStatus) -> Option<SessionEvent> {
    if previous == current {
        return None;
    }
    let reason = || current.reason.clone().unwrap_or_else(|| current.state.clone());
    match current.state.as_str() {
        DRIVER_STATE_CONNECTED => {
            (previous.state != current.state).then_some(SessionEvent::Ready)
        }
        "AUTHENTICATED" => (previous.state != current.state).then_some(SessionEvent::Authenticated),
        "AUTH_FAILURE" => Some(SessionEvent::AuthFailure(reason())),
        "DISCONNECTED" | "LOGOUT" | "CONFLICT" | "UNPAIRED" => {
            (previous.state != current.state).then(|| SessionEvent::Disconnected(reason()))
        }
        _ => match &current.qr {
            Some(qr) if previous.qr.as_ref() != Some(qr) => Some(SessionEvent::Pairing(qr.clone())),
            _ => None,
        },
    }
}

/// Consecutive failed status polls before the bridge counts as lost.
pub const MAX_POLL_FAILURES: u32 = 3;

const UNREACHABLE_STATE: &str = "UNREACHABLE";

/// Status-poll bookkeeping: the last observed status and the failure streak.
#[derive(Debug, Default)]
pub struct PollTracker {
    previous: BridgeStatus,
    failures: u32,
}

impl PollTracker {
    pub fn on_status(&mut self, current: BridgeStatus) -> Option<SessionEvent> {
        self.failures = 0;
        let event = translate(&self.previous, &current);
        self.previous = current;
        event
    }

    /// Record a failed poll. Emits `Disconnected` once, when the streak
    /// reaches [`MAX_POLL_FAILURES`].
    pub fn on_error(&mut self) -> Option<SessionEvent> {
        self.failures = self.failures.saturating_add(1);
        if self.failures != MAX_POLL_FAILURES {
            return None;
        }
        self.previous = BridgeStatus {
            state: UNREACHABLE_STATE.to_string(),
            ..BridgeStatus::default()
        };
        Some(SessionEvent::Disconnected("bridge unreachable".to_string()))
    }
}

/// [`SessionDriver`] backed by the sidecar's HTTP API.
pub struct BridgeDriver {
    base_url: String,
    poll_interval: Duration,
    client: reqwest::Client,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeDriver {
    /// `request_timeout` bounds every HTTP call made to the bridge.
    pub fn new(base_url: impl Into<String>, poll_interval: Duration, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval,
            client: reqwest::Client::builder()
                .timeout(request_timeout)
                .connect_timeout(request_timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            poller: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn fetch_status(client: &reqwest::Client, url: &str) -> Result<BridgeStatus, ChannelError> {
    let status = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<BridgeStatus>()
        .await?;
    Ok(status)
}

#[async_trait::async_trait]
impl SessionDriver for BridgeDriver {
    async fn start(&self) -> Result<mpsc::Receiver<SessionEvent>, ChannelError> {
        let response = self
            .client
            .post(self.url("/session/start"))
            .send()
            .await
            .map_err(|e| ChannelError::SessionStart(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ChannelError::SessionStart(format!(
                "bridge answered {}",
                response.status()
            )));
        }

        let (tx, rx) = mpsc::channel(16);
        let client = self.client.clone();
        let url = self.url("/session/status");
        let interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut tracker = PollTracker::default();
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let event = match fetch_status(&client, &url).await {
                    Ok(current) => tracker.on_status(current),
                    Err(e) => {
                        tracing::debug!(error = %e, "WhatsApp bridge status poll failed");
                        tracker.on_error()
                    }
                };
                if let Some(event) = event {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
        });

        if let Some(old) = self.poller.lock().await.replace(handle) {
            old.abort();
        }
        tracing::info!(bridge = %self.base_url, "WhatsApp bridge session started");
        Ok(rx)
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        let response = self
            .client
            .post(self.url("/session/send"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        Err(ChannelError::Transport(format!("bridge answered {status}: {detail}")))
    }

    async fn state(&self) -> Result<String, ChannelError> {
        Ok(fetch_status(&self.client, &self.url("/session/status"))
            .await?
            .state)
    }

    async fn destroy(&self) -> Result<(), ChannelError> {
        if let Some(handle) = self.poller.lock().await.take() {
            handle.abort();
        }
        self.client
            .delete(self.url("/session"))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
