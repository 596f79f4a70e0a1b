//! Liveness Probe Manager
//!
//! Detects silently dead connections: a probe is requested at a fixed
//! interval, and if the response to the first unanswered probe does not
//! arrive within the (shorter) timeout window the connection is declared
//! dead and the supervisor tears it down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::config::WebSocketSettings;

/// Configuration for probe behavior.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between probes.
    pub ping_interval: Duration,
    /// Time allowed for a probe response before the connection is
    /// considered dead. Shorter than the interval.
    pub pong_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

impl HeartbeatConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(ping_interval: Duration, pong_timeout: Duration) -> Self {
        Self {
            ping_interval,
            pong_timeout,
        }
    }

    /// Create configuration from [`WebSocketSettings`].
    #[must_use]
    pub const fn from_websocket_settings(settings: &WebSocketSettings) -> Self {
        Self {
            ping_interval: settings.heartbeat_interval,
            pong_timeout: settings.heartbeat_timeout,
        }
    }
}

/// Events emitted by the heartbeat manager.
#[derive(Debug, Clone)]
pub enum HeartbeatEvent {
    /// Request to send a probe over the connection.
    SendPing,
    /// Probe response did not arrive in time; the connection is dead.
    Timeout,
}

/// State shared between the heartbeat manager and the session loop.
#[derive(Debug)]
pub struct HeartbeatState {
    // Instant of the first probe still awaiting a response.
    unanswered_since: RwLock<Instant>,
    waiting_for_pong: AtomicBool,
}

impl Default for HeartbeatState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatState {
    /// Create new heartbeat state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            unanswered_since: RwLock::new(Instant::now()),
            waiting_for_pong: AtomicBool::new(false),
        }
    }

    /// Record that a probe response was received.
    pub fn record_pong(&self) {
        self.waiting_for_pong.store(false, Ordering::SeqCst);
    }

    /// Record that a probe was sent.
    ///
    /// Only the first unanswered probe arms the timeout; follow-up probes
    /// while one is outstanding do not push the deadline forward.
    pub fn mark_ping_sent(&self) {
        if !self.waiting_for_pong.swap(true, Ordering::SeqCst) {
            *self.unanswered_since.write() = Instant::now();
        }
    }

    /// Check whether a probe is awaiting its response.
    #[must_use]
    pub fn is_waiting_for_pong(&self) -> bool {
        self.waiting_for_pong.load(Ordering::SeqCst)
    }

    /// Reset state for a new connection.
    pub fn reset(&self) {
        *self.unanswered_since.write() = Instant::now();
        self.waiting_for_pong.store(false, Ordering::SeqCst);
    }

    /// Deadline by which the outstanding probe must be answered, if any.
    fn pong_deadline(&self, timeout: Duration) -> Option<Instant> {
        if self.is_waiting_for_pong() {
            Some(*self.unanswered_since.read() + timeout)
        } else {
            None
        }
    }
}

/// Heartbeat manager that monitors connection health.
///
/// Emits [`HeartbeatEvent::SendPing`] every interval and arms the
/// response deadline at the same moment; the session loop sends the
/// probe over the wire and calls [`HeartbeatState::record_pong`] when
/// the response arrives. If the response window elapses first,
/// [`HeartbeatEvent::Timeout`] is emitted and the manager exits.
pub struct HeartbeatManager {
    config: HeartbeatConfig,
    state: Arc<HeartbeatState>,
    event_tx: mpsc::Sender<HeartbeatEvent>,
    cancel: CancellationToken,
}

impl HeartbeatManager {
    /// Create a new heartbeat manager.
    #[must_use]
    pub const fn new(
        config: HeartbeatConfig,
        state: Arc<HeartbeatState>,
        event_tx: mpsc::Sender<HeartbeatEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            state,
            event_tx,
            cancel,
        }
    }

    /// Run the probe loop until cancelled or a timeout is detected.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.ping_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let deadline = self.state.pong_deadline(self.config.pong_timeout);

            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("heartbeat manager cancelled");
                    break;
                }
                _ = interval.tick() => {
                    // Arm the response deadline here, not in the session
                    // loop, so the next select iteration waits on it.
                    self.state.mark_ping_sent();
                    if self.event_tx.send(HeartbeatEvent::SendPing).await.is_err() {
                        tracing::debug!("heartbeat event channel closed");
                        break;
                    }
                }
                () = wait_until(deadline) => {
                    // Re-check: the pong may have landed while the timer fired.
                    if self.state.is_waiting_for_pong() {
                        tracing::warn!(
                            timeout_secs = self.config.pong_timeout.as_secs(),
                            "probe response timeout"
                        );
                        let _ = self.event_tx.send(HeartbeatEvent::Timeout).await;
                        break;
                    }
                }
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.ping_interval, Duration::from_secs(20));
        assert_eq!(config.pong_timeout, Duration::from_secs(10));
    }

    #[test]
    fn state_pong_clears_waiting() {
        let state = HeartbeatState::new();
        assert!(!state.is_waiting_for_pong());

        state.mark_ping_sent();
        assert!(state.is_waiting_for_pong());

        state.record_pong();
        assert!(!state.is_waiting_for_pong());
    }

    #[test]
    fn state_reset_clears_waiting() {
        let state = HeartbeatState::new();
        state.mark_ping_sent();
        state.reset();
        assert!(!state.is_waiting_for_pong());
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_pings_do_not_extend_deadline() {
        let state = HeartbeatState::new();
        state.mark_ping_sent();
        let first = state.pong_deadline(Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(5)).await;
        state.mark_ping_sent();
        let second = state.pong_deadline(Duration::from_secs(10));

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn manager_sends_ping_events() {
        let config = HeartbeatConfig::new(Duration::from_millis(50), Duration::from_secs(1));
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let manager = HeartbeatManager::new(config, Arc::clone(&state), event_tx, cancel.clone());
        let handle = tokio::spawn(manager.run());

        let event = tokio::time::timeout(Duration::from_millis(200), event_rx.recv())
            .await
            .expect("should receive event")
            .expect("channel should not close");
        assert!(matches!(event, HeartbeatEvent::SendPing));

        cancel.cancel();
        handle.await.expect("task should complete");
    }

    #[tokio::test]
    async fn manager_detects_missing_pong() {
        let config = HeartbeatConfig::new(Duration::from_millis(50), Duration::from_millis(100));
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let manager = HeartbeatManager::new(config, Arc::clone(&state), event_tx, cancel.clone());
        let handle = tokio::spawn(manager.run());

        let mut received_timeout = false;
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(500), event_rx.recv()).await
        {
            match event {
                // Answer nothing.
                HeartbeatEvent::SendPing => {}
                HeartbeatEvent::Timeout => {
                    received_timeout = true;
                    break;
                }
            }
        }

        assert!(received_timeout, "should receive timeout event");
        cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_millis(100), handle).await;
    }

    #[tokio::test(start_paused = true)]
    async fn dead_connection_detected_within_pong_timeout() {
        // Timeout shorter than the interval must be what fires, not the
        // next tick.
        let config = HeartbeatConfig::new(Duration::from_secs(20), Duration::from_secs(10));
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let manager = HeartbeatManager::new(config, state, event_tx, cancel.clone());
        let handle = tokio::spawn(manager.run());
        let started = Instant::now();

        let first = event_rx.recv().await.expect("manager should emit");
        assert!(matches!(first, HeartbeatEvent::SendPing));

        let second = event_rx.recv().await.expect("manager should emit");
        assert!(matches!(second, HeartbeatEvent::Timeout));
        assert!(
            started.elapsed() < Duration::from_secs(11),
            "timeout took {:?}, expected the 10s response window",
            started.elapsed()
        );

        cancel.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn prompt_pongs_keep_connection_alive() {
        let config = HeartbeatConfig::new(Duration::from_millis(30), Duration::from_millis(60));
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let manager = HeartbeatManager::new(config, Arc::clone(&state), event_tx, cancel.clone());
        let handle = tokio::spawn(manager.run());

        // Answer several probe cycles promptly; no timeout should appear.
        for _ in 0..5 {
            match tokio::time::timeout(Duration::from_millis(200), event_rx.recv()).await {
                Ok(Some(HeartbeatEvent::SendPing)) => {
                    state.record_pong();
                }
                Ok(Some(HeartbeatEvent::Timeout)) => panic!("unexpected timeout"),
                other => panic!("unexpected event: {other:?}"),
            }
        }

        cancel.cancel();
        handle.await.expect("task should complete");
    }

    #[tokio::test]
    async fn manager_cancellation() {
        let config = HeartbeatConfig::new(Duration::from_secs(10), Duration::from_secs(10));
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, _event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let manager = HeartbeatManager::new(config, state, event_tx, cancel.clone());
        let handle = tokio::spawn(manager.run());

        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_millis(100), handle).await;
        assert!(result.is_ok(), "manager should shut down on cancellation");
    }
}
