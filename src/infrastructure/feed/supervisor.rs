//! Feed Supervisor
//!
//! Owns the single live connection and drives it through the session
//! lifecycle: connect with freshly loaded credentials, replay the full
//! subscription set, stream frames into the dispatcher, watch the
//! liveness probes, and on any failure tear down and reconnect after the
//! configured delay. The supervisor never holds more than one connection
//! handle at a time.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    ConnectionEvent, CredentialSource, FeedConnection, Transport, TransportError,
};
use crate::domain::subscription::TopicSet;
use crate::infrastructure::config::FeedConfig;
use crate::infrastructure::feed::dispatcher::Dispatcher;
use crate::infrastructure::feed::heartbeat::{
    HeartbeatConfig, HeartbeatEvent, HeartbeatManager, HeartbeatState,
};
use crate::infrastructure::feed::lifecycle::{
    SessionAction, SessionEvent, SessionLifecycle, SessionPhase,
};
use crate::infrastructure::feed::reconnect::{ReconnectConfig, ReconnectPolicy};

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Feed WebSocket URL.
    pub url: String,
    /// Liveness probe settings.
    pub heartbeat: HeartbeatConfig,
    /// Reconnection settings.
    pub reconnect: ReconnectConfig,
}

impl SupervisorConfig {
    /// Derive supervisor configuration from the full feed configuration.
    #[must_use]
    pub fn from_feed_config(config: &FeedConfig) -> Self {
        Self {
            url: config.url.clone(),
            heartbeat: HeartbeatConfig::from_websocket_settings(&config.websocket),
            reconnect: ReconnectConfig::from_websocket_settings(&config.websocket),
        }
    }
}

/// Terminal supervisor failures.
///
/// With the default unlimited retry budget the supervisor never produces
/// one of these; it only exists for deployments that cap attempts.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// The configured attempt limit was reached without a successful
    /// connection.
    #[error("gave up after {attempts} failed connection attempts")]
    RetriesExhausted {
        /// Consecutive failed attempts at the time of giving up.
        attempts: u32,
    },
}

/// Supervises the feed session across its whole life.
pub struct FeedSupervisor {
    config: SupervisorConfig,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialSource>,
    topics: Arc<TopicSet>,
    dispatcher: Dispatcher,
    lifecycle: Mutex<SessionLifecycle>,
    cancel: CancellationToken,
}

impl FeedSupervisor {
    /// Create a supervisor. Nothing connects until [`Self::run`] is
    /// called.
    #[must_use]
    pub fn new(
        config: SupervisorConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialSource>,
        topics: Arc<TopicSet>,
        dispatcher: Dispatcher,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            transport,
            credentials,
            topics,
            dispatcher,
            lifecycle: Mutex::new(SessionLifecycle::new()),
            cancel,
        }
    }

    /// Current session phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.lifecycle.lock().phase()
    }

    /// Run the supervision loop until shutdown or retry exhaustion.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::RetriesExhausted`] when a finite
    /// attempt limit is configured and reached.
    pub async fn run(&self) -> Result<(), SupervisorError> {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());
        let mut connection: Option<Box<dyn FeedConnection>> = None;
        let mut action = self.apply(SessionEvent::Start);

        loop {
            action = match action {
                SessionAction::Connect => {
                    tokio::select! {
                        () = self.cancel.cancelled() => self.apply(SessionEvent::Shutdown),
                        result = self.open_connection() => match result {
                            Ok(handle) => {
                                policy.reset();
                                connection = Some(handle);
                                self.apply(SessionEvent::OpenSucceeded)
                            }
                            Err(error) => {
                                if error.is_config() {
                                    tracing::error!(%error, "credentials unavailable, retrying");
                                } else {
                                    tracing::warn!(%error, "connection attempt failed");
                                }
                                self.apply(SessionEvent::OpenFailed)
                            }
                        },
                    }
                }
                SessionAction::StartSession => match connection.as_mut() {
                    Some(handle) => {
                        let conn = handle.as_mut();
                        match self.replay_subscriptions(conn).await {
                            Ok(()) => {
                                let event = self.run_session(conn).await;
                                self.apply(event)
                            }
                            Err(error) => {
                                tracing::warn!(%error, "subscription replay failed");
                                self.apply(SessionEvent::StreamError)
                            }
                        }
                    }
                    None => self.apply(SessionEvent::StreamError),
                },
                SessionAction::ScheduleRetry => {
                    // A failed open consumes one attempt from the budget.
                    let delay = policy.next_delay();
                    if !policy.should_retry() {
                        let attempts = policy.attempt_count();
                        tracing::error!(attempts, "retry budget exhausted");
                        self.apply(SessionEvent::RetriesExhausted);
                        return Err(SupervisorError::RetriesExhausted { attempts });
                    }
                    self.wait_before_retry(delay, policy.attempt_count()).await
                }
                SessionAction::Reconnect => {
                    // The previous open succeeded, so the budget was
                    // reset; the teardown wait itself is not an attempt.
                    if let Some(mut handle) = connection.take() {
                        handle.close().await;
                    }
                    let delay = policy.current_delay();
                    self.wait_before_retry(delay, policy.attempt_count()).await
                }
                SessionAction::Close => {
                    if let Some(mut handle) = connection.take() {
                        handle.close().await;
                    }
                    self.apply(SessionEvent::CloseComplete)
                }
                SessionAction::Stop | SessionAction::None => {
                    if let Some(mut handle) = connection.take() {
                        handle.close().await;
                    }
                    tracing::info!("feed supervisor stopped");
                    return Ok(());
                }
            };
        }
    }

    async fn wait_before_retry(&self, delay: Duration, attempt: u32) -> SessionAction {
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );
        tokio::select! {
            () = self.cancel.cancelled() => self.apply(SessionEvent::Shutdown),
            () = tokio::time::sleep(delay) => SessionAction::Connect,
        }
    }

    fn apply(&self, event: SessionEvent) -> SessionAction {
        let mut lifecycle = self.lifecycle.lock();
        let action = lifecycle.apply(event);
        tracing::debug!(
            ?event,
            phase = lifecycle.phase().as_str(),
            ?action,
            "session transition"
        );
        action
    }

    /// Open one connection with freshly loaded credentials.
    ///
    /// Credentials are read here, not cached, so a rotation between
    /// attempts takes effect on the next connect.
    async fn open_connection(&self) -> Result<Box<dyn FeedConnection>, TransportError> {
        let credentials = self.credentials.credentials()?;
        let headers = credentials.headers();
        let session_id = uuid::Uuid::new_v4();
        tracing::info!(
            %session_id,
            url = %self.config.url,
            account_id = credentials.account_id(),
            "opening feed connection"
        );
        self.transport.open(&self.config.url, &headers).await
    }

    /// Replay the full accumulated topic set on a fresh connection.
    async fn replay_subscriptions(
        &self,
        connection: &mut dyn FeedConnection,
    ) -> Result<(), TransportError> {
        let Some(request) = self.topics.subscribe_request() else {
            tracing::debug!("no topics to replay");
            return Ok(());
        };
        let payload = request.to_json()?;
        tracing::info!(topics = self.topics.len(), "replaying subscriptions");
        connection.send(payload).await
    }

    /// Stream events from the open connection until it fails, the server
    /// closes it, a probe times out, or shutdown is requested.
    async fn run_session(&self, connection: &mut dyn FeedConnection) -> SessionEvent {
        let heartbeat_state = Arc::new(HeartbeatState::new());
        let (heartbeat_tx, mut heartbeat_rx) = mpsc::channel(8);
        let heartbeat_cancel = self.cancel.child_token();
        let manager = HeartbeatManager::new(
            self.config.heartbeat.clone(),
            Arc::clone(&heartbeat_state),
            heartbeat_tx,
            heartbeat_cancel.clone(),
        );
        let heartbeat_task = tokio::spawn(manager.run());

        let outcome = loop {
            tokio::select! {
                () = self.cancel.cancelled() => break SessionEvent::Shutdown,
                heartbeat = heartbeat_rx.recv() => match heartbeat {
                    Some(HeartbeatEvent::SendPing) => {
                        if let Err(error) = connection.ping().await {
                            tracing::warn!(%error, "probe send failed");
                            break SessionEvent::StreamError;
                        }
                    }
                    Some(HeartbeatEvent::Timeout) => break SessionEvent::ProbeTimeout,
                    None => break SessionEvent::StreamError,
                },
                event = connection.next_event() => match event {
                    Ok(ConnectionEvent::Frame(text)) => self.dispatcher.on_frame(&text),
                    Ok(ConnectionEvent::Pong) => heartbeat_state.record_pong(),
                    Ok(ConnectionEvent::Ping(_)) => {
                        // The transport answers server pings at the
                        // protocol level.
                        tracing::trace!("server ping");
                    }
                    Ok(ConnectionEvent::Closed { code, reason }) => {
                        tracing::info!(?code, ?reason, "server closed connection");
                        break SessionEvent::ServerClose;
                    }
                    Err(error) => {
                        tracing::warn!(%error, "receive failed");
                        break SessionEvent::StreamError;
                    }
                },
            }
        };

        heartbeat_cancel.cancel();
        heartbeat_task.abort();
        outcome
    }
}
