//! WhatsApp channel with a simulated mode and a live session mode.
//!
//! The live transport is hidden behind [`SessionDriver`]: the channel starts
//! a session, receives [`SessionEvent`]s on an mpsc receiver and folds them
//! into its [`ChannelStatus`]. A session that fails to start drops the
//! channel back into simulated mode so scheduled deliveries still record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use parabens_core::config::ChannelMode;

use super::{ChannelError, ChannelState, ChannelStatus, MessageChannel};

/// Driver state string meaning the session is usable.
pub const DRIVER_STATE_CONNECTED: &str = "CONNECTED";

/// Upper bound on any single driver call.
pub const DEFAULT_DRIVER_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle notifications emitted by a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A pairing code (QR payload) the phone must scan.
    Pairing(String),
    Authenticated,
    Ready,
    AuthFailure(String),
    Disconnected(String),
}

/// Headless messaging session the live channel drives.
#[async_trait::async_trait]
pub trait SessionDriver: Send + Sync {
    /// Start a session. Events arrive on the returned receiver until the
    /// session ends or is destroyed.
    async fn start(&self) -> Result<mpsc::Receiver<SessionEvent>, ChannelError>;

    /// Send a text to a fully qualified chat id (`<digits>@c.us`).
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ChannelError>;

    /// Raw session state as reported by the transport (e.g. `CONNECTED`).
    async fn state(&self) -> Result<String, ChannelError>;

    /// Tear the session down.
    async fn destroy(&self) -> Result<(), ChannelError>;
}

/// Turn a free-form phone number into a WhatsApp chat id.
///
/// Non-digits are stripped; an 11-digit number without the `55` country
/// code gets it prepended.
pub fn normalize_phone(phone: &str) -> String {
    let mut digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 && !digits.starts_with("55") {
        digits.insert_str(0, "55");
    }
    format!("{digits}@c.us")
}

/// WhatsApp delivery channel.
pub struct WhatsAppChannel {
    driver: Arc<dyn SessionDriver>,
    status: Arc<RwLock<ChannelStatus>>,
    /// Bumped on every teardown; a pump only applies events for its own generation.
    generation: Arc<AtomicU64>,
    pump: Mutex<Option<JoinHandle<()>>>,
    driver_timeout: Duration,
}

impl WhatsAppChannel {
    pub fn new(driver: Arc<dyn SessionDriver>, mode: ChannelMode) -> Self {
        let status = ChannelStatus {
            simulated: mode == ChannelMode::Simulated,
            ..ChannelStatus::disconnected()
        };
        Self {
            driver,
            status: Arc::new(RwLock::new(status)),
            generation: Arc::new(AtomicU64::new(0)),
            pump: Mutex::new(None),
            driver_timeout: DEFAULT_DRIVER_TIMEOUT,
        }
    }

    pub fn with_driver_timeout(mut self, timeout: Duration) -> Self {
        self.driver_timeout = timeout;
        self
    }

    /// Run a driver call, failing with `on_timeout` once `driver_timeout` elapses.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ChannelError>>,
        on_timeout: impl FnOnce(String) -> ChannelError,
    ) -> Result<T, ChannelError> {
        match tokio::time::timeout(self.driver_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(format!(
                "no answer within {}ms",
                self.driver_timeout.as_millis()
            ))),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ChannelStatus> {
        read_status(&self.status)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChannelStatus> {
        write_status(&self.status)
    }

    /// Stop the event pump and destroy the driver session, if one is running.
    async fn teardown(&self, pump: &mut Option<JoinHandle<()>>) {
        let Some(handle) = pump.take() else {
            return;
        };
        {
            let _guard = self.write();
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        handle.abort();
        if let Err(e) = self
            .bounded(self.driver.destroy(), ChannelError::Transport)
            .await
        {
            tracing::warn!(error = %e, "Failed to destroy WhatsApp session");
        } else {
            tracing::info!("WhatsApp session closed");
        }
    }

    fn fall_back_to_simulation(&self, reason: &ChannelError) {
        tracing::error!(error = %reason, "WhatsApp session failed to start");
        tracing::warn!("Falling back to simulation mode");
        *self.write() = ChannelStatus::simulated();
    }
}

fn read_status(lock: &RwLock<ChannelStatus>) -> RwLockReadGuard<'_, ChannelStatus> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_status(lock: &RwLock<ChannelStatus>) -> RwLockWriteGuard<'_, ChannelStatus> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fold one session event into the status.
fn apply_event(status: &mut ChannelStatus, event: SessionEvent) {
    match event {
        SessionEvent::Pairing(code) => {
            tracing::info!("WhatsApp pairing code received, waiting for scan");
            status.state = ChannelState::WaitingForPairing;
            status.connected = false;
            status.pairing_artifact = Some(code);
        }
        SessionEvent::Authenticated => {
            tracing::info!("WhatsApp session authenticated");
        }
        SessionEvent::Ready => {
            tracing::info!("WhatsApp session connected");
            status.state = ChannelState::Connected;
            status.connected = true;
            status.pairing_artifact = None;
        }
        SessionEvent::AuthFailure(msg) => {
            tracing::error!(reason = %msg, "WhatsApp authentication failed");
            status.state = ChannelState::Disconnected;
            status.connected = false;
        }
        SessionEvent::Disconnected(reason) => {
            tracing::warn!(reason = %reason, "WhatsApp session disconnected");
            status.state = ChannelState::Disconnected;
            status.connected = false;
            status.pairing_artifact = None;
        }
    }
}

fn spawn_pump(
    mut events: mpsc::Receiver<SessionEvent>,
    status: Arc<RwLock<ChannelStatus>>,
    generation: Arc<AtomicU64>,
    own_generation: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let mut guard = write_status(&status);
            if generation.load(Ordering::SeqCst) != own_generation {
                break;
            }
            apply_event(&mut guard, event);
        }
        tracing::debug!("WhatsApp session event stream ended");
    })
}

#[async_trait::async_trait]
impl MessageChannel for WhatsAppChannel {
    async fn connect(&self) -> ChannelStatus {
        let mut pump = self.pump.lock().await;

        let simulated = self.read().simulated;
        if simulated {
            *self.write() = ChannelStatus::simulated();
            tracing::info!("WhatsApp channel initialized in simulation mode");
            return self.status();
        }

        self.teardown(&mut pump).await;
        {
            let mut status = self.write();
            status.state = ChannelState::Connecting;
            status.connected = false;
            status.pairing_artifact = None;
        }
        tracing::info!("Starting WhatsApp session");

        match self
            .bounded(self.driver.start(), ChannelError::SessionStart)
            .await
        {
            Ok(events) => {
                let own_generation = self.generation.load(Ordering::SeqCst);
                *pump = Some(spawn_pump(
                    events,
                    self.status.clone(),
                    self.generation.clone(),
                    own_generation,
                ));
            }
            Err(e) => self.fall_back_to_simulation(&e),
        }
        self.status()
    }

    async fn send_message(&self, address: &str, text: &str) -> Result<(), ChannelError> {
        let (connected, simulated) = {
            let status = self.read();
            (status.connected, status.simulated)
        };
        if !connected {
            return Err(ChannelError::NotConnected);
        }

        if simulated {
            tracing::info!(to = address, content = text, "[SIMULATED] WhatsApp message sent");
            return Ok(());
        }

        let chat_id = normalize_phone(address);
        tracing::debug!(to = address, chat_id = %chat_id, "Sending WhatsApp message");
        match self
            .bounded(self.driver.send_text(&chat_id, text), ChannelError::Transport)
            .await
        {
            Ok(()) => {
                tracing::info!(chat_id = %chat_id, "WhatsApp message sent");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(chat_id = %chat_id, error = %e, "WhatsApp send failed");
                Err(e)
            }
        }
    }

    fn status(&self) -> ChannelStatus {
        self.read().clone()
    }

    async fn test_connection(&self) -> bool {
        let (simulated, connected) = {
            let status = self.read();
            (status.simulated, status.connected)
        };
        if simulated {
            return connected;
        }
        if self.pump.lock().await.is_none() {
            return false;
        }

        let connected = match self
            .bounded(self.driver.state(), ChannelError::Transport)
            .await
        {
            Ok(state) => {
                tracing::debug!(state = %state, "WhatsApp session state");
                state == DRIVER_STATE_CONNECTED
            }
            Err(e) => {
                tracing::warn!(error = %e, "WhatsApp connection test failed");
                false
            }
        };

        let mut status = self.write();
        status.connected = connected;
        if connected {
            status.state = ChannelState::Connected;
            status.pairing_artifact = None;
        } else if status.state == ChannelState::Connected {
            status.state = ChannelState::Disconnected;
        }
        connected
    }

    async fn refresh_pairing_artifact(&self) -> Option<String> {
        self.read().pairing_artifact.clone()
    }

    async fn enable_simulation(&self) {
        let mut pump = self.pump.lock().await;
        self.teardown(&mut pump).await;
        *self.write() = ChannelStatus::simulated();
        tracing::info!("WhatsApp simulation mode enabled");
    }

    async fn enable_real(&self) {
        let mut pump = self.pump.lock().await;
        self.teardown(&mut pump).await;
        *self.write() = ChannelStatus::disconnected();
        tracing::info!("WhatsApp live mode enabled; connect to start a session");
    }

    fn channel_name(&self) -> &str {
        "whatsapp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Driver whose session events are pushed by the test.
    struct ScriptedDriver {
        events: std::sync::Mutex<Option<mpsc::Sender<SessionEvent>>>,
        fail_start: bool,
        hang: bool,
        state: std::sync::Mutex<String>,
        sent: std::sync::Mutex<Vec<(String, String)>>,
        destroyed: AtomicUsize,
    }

    impl ScriptedDriver {
        fn new(fail_start: bool) -> Arc<Self> {
            Arc::new(Self {
                events: std::sync::Mutex::new(None),
                fail_start,
                hang: false,
                state: std::sync::Mutex::new("OPENING".to_string()),
                sent: std::sync::Mutex::new(Vec::new()),
                destroyed: AtomicUsize::new(0),
            })
        }

        /// A driver whose start and send calls never complete.
        fn hanging() -> Arc<Self> {
            let mut driver = Arc::into_inner(Self::new(false)).unwrap();
            driver.hang = true;
            Arc::new(driver)
        }

        async fn emit(&self, event: SessionEvent) {
            let tx = self.events.lock().unwrap().clone().expect("session not started");
            tx.send(event).await.unwrap();
        }
    }

    #[async_trait::async_trait]
    impl SessionDriver for ScriptedDriver {
        async fn start(&self) -> Result<mpsc::Receiver<SessionEvent>, ChannelError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail_start {
                return Err(ChannelError::SessionStart("browser missing".to_string()));
            }
            let (tx, rx) = mpsc::channel(8);
            *self.events.lock().unwrap() = Some(tx);
            Ok(rx)
        }

        async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.sent
                .lock()
                .unwrap()
                .push((chat_id.to_string(), text.to_string()));
            Ok(())
        }

        async fn state(&self) -> Result<String, ChannelError> {
            Ok(self.state.lock().unwrap().clone())
        }

        async fn destroy(&self) -> Result<(), ChannelError> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn wait_for(channel: &WhatsAppChannel, state: ChannelState) -> ChannelStatus {
        for _ in 0..100 {
            let status = channel.status();
            if status.state == state {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("channel never reached {state}, last status {:?}", channel.status());
    }

    #[test]
    fn normalize_phone_adds_country_code() {
        assert_eq!(normalize_phone("(11) 98765-4321"), "5511987654321@c.us");
        assert_eq!(normalize_phone("+55 11 98765-4321"), "5511987654321@c.us");
        // Already 11 digits starting with 55 is left alone.
        assert_eq!(normalize_phone("55987654321"), "55987654321@c.us");
        assert_eq!(normalize_phone("1234-5678"), "12345678@c.us");
    }

    #[tokio::test]
    async fn simulated_mode_connects_without_driver() {
        let driver = ScriptedDriver::new(false);
        let channel = WhatsAppChannel::new(driver.clone(), ChannelMode::Simulated);

        assert!(!channel.status().connected);
        let status = channel.connect().await;
        assert_eq!(status, ChannelStatus::simulated());

        channel.send_message("11987654321", "oi").await.unwrap();
        assert!(driver.sent.lock().unwrap().is_empty());
        assert!(channel.test_connection().await);
    }

    #[tokio::test]
    async fn live_session_walks_the_state_machine() {
        let driver = ScriptedDriver::new(false);
        let channel = WhatsAppChannel::new(driver.clone(), ChannelMode::Live);

        let status = channel.connect().await;
        assert_eq!(status.state, ChannelState::Connecting);
        assert!(!status.simulated);
        assert!(matches!(
            channel.send_message("11987654321", "cedo demais").await,
            Err(ChannelError::NotConnected)
        ));

        driver.emit(SessionEvent::Pairing("QR-123".to_string())).await;
        let status = wait_for(&channel, ChannelState::WaitingForPairing).await;
        assert_eq!(status.pairing_artifact.as_deref(), Some("QR-123"));
        assert_eq!(channel.refresh_pairing_artifact().await.as_deref(), Some("QR-123"));

        driver.emit(SessionEvent::Authenticated).await;
        driver.emit(SessionEvent::Ready).await;
        let status = wait_for(&channel, ChannelState::Connected).await;
        assert!(status.connected);
        assert!(status.pairing_artifact.is_none());

        channel.send_message("(11) 98765-4321", "Parabéns!").await.unwrap();
        assert_eq!(
            driver.sent.lock().unwrap().as_slice(),
            &[("5511987654321@c.us".to_string(), "Parabéns!".to_string())]
        );

        driver.emit(SessionEvent::Disconnected("LOGOUT".to_string())).await;
        let status = wait_for(&channel, ChannelState::Disconnected).await;
        assert!(!status.connected);
    }

    #[tokio::test]
    async fn start_failure_falls_back_to_simulation() {
        let driver = ScriptedDriver::new(true);
        let channel = WhatsAppChannel::new(driver, ChannelMode::Live);

        let status = channel.connect().await;
        assert!(status.connected);
        assert!(status.simulated);
        assert_eq!(status.state, ChannelState::Connected);
        assert!(channel.send_message("11987654321", "oi").await.is_ok());
    }

    #[tokio::test]
    async fn test_connection_asks_the_driver() {
        let driver = ScriptedDriver::new(false);
        let channel = WhatsAppChannel::new(driver.clone(), ChannelMode::Live);
        assert!(!channel.test_connection().await);

        channel.connect().await;
        assert!(!channel.test_connection().await);

        *driver.state.lock().unwrap() = DRIVER_STATE_CONNECTED.to_string();
        assert!(channel.test_connection().await);
        assert!(channel.status().connected);
    }

    #[tokio::test]
    async fn mode_switches_tear_down_the_session() {
        let driver = ScriptedDriver::new(false);
        let channel = WhatsAppChannel::new(driver.clone(), ChannelMode::Live);
        channel.connect().await;

        channel.enable_simulation().await;
        assert_eq!(driver.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(channel.status(), ChannelStatus::simulated());

        channel.enable_real().await;
        assert_eq!(channel.status(), ChannelStatus::disconnected());
        // No session was running after enable_simulation.
        assert_eq!(driver.destroyed.load(Ordering::SeqCst), 1);

        let status = channel.connect().await;
        assert_eq!(status.state, ChannelState::Connecting);
        assert!(!status.simulated);
    }

    #[tokio::test]
    async fn events_after_teardown_are_ignored() {
        let driver = ScriptedDriver::new(false);
        let channel = WhatsAppChannel::new(driver.clone(), ChannelMode::Live);
        channel.connect().await;
        let stale = driver.events.lock().unwrap().clone().unwrap();

        channel.enable_simulation().await;
        let _ = stale.send(SessionEvent::Disconnected("late".to_string())).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(channel.status(), ChannelStatus::simulated());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_start_falls_back_to_simulation() {
        let channel = WhatsAppChannel::new(ScriptedDriver::hanging(), ChannelMode::Live)
            .with_driver_timeout(Duration::from_secs(10));

        let status = channel.connect().await;
        assert!(status.simulated);
        assert!(status.connected);

        // The pump lock is free again, so mode switches complete.
        channel.enable_real().await;
        assert_eq!(channel.status(), ChannelStatus::disconnected());
    }

    #[tokio::test]
    async fn hanging_send_is_reported_as_failure() {
        let driver = ScriptedDriver::hanging();
        let channel = WhatsAppChannel::new(driver, ChannelMode::Live)
            .with_driver_timeout(Duration::from_millis(50));
        write_status(&channel.status).connected = true;

        let sent = channel.send_message("11987654321", "oi").await;
        assert!(matches!(sent, Err(ChannelError::Transport(_))));
    }

    #[tokio::test]
    async fn silent_bridge_does_not_block_startup() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let driver = super::super::BridgeDriver::new(
            format!("http://{addr}"),
            Duration::from_secs(1),
            Duration::from_millis(200),
        );
        let channel = WhatsAppChannel::new(Arc::new(driver), ChannelMode::Live);

        let status = tokio::time::timeout(Duration::from_secs(5), channel.connect())
            .await
            .expect("connect must return");
        assert!(status.simulated);
        tokio::time::timeout(Duration::from_secs(5), channel.enable_simulation())
            .await
            .expect("enable_simulation must return");
    }
}
