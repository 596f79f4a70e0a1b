//! Session Lifecycle
//!
//! Explicit state machine for the feed session. Every connect, failure,
//! probe timeout and shutdown flows through [`SessionLifecycle::apply`],
//! which maps an event to the next phase and the action the supervisor
//! must take. Keeping the transitions in one pure function makes the
//! retry behavior testable without a socket.

/// Phase of the feed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not yet started.
    Idle,
    /// Establishing (or waiting to re-establish) a connection.
    Connecting,
    /// Connection established, streaming messages.
    Open,
    /// Shutdown requested, closing the connection.
    Closing,
    /// Terminal. Only reached by shutdown or retry exhaustion.
    Closed,
}

impl SessionPhase {
    /// Name used in structured log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

/// Events fed into the lifecycle by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Supervisor started.
    Start,
    /// Transport handshake completed.
    OpenSucceeded,
    /// Transport handshake (or credential load) failed.
    OpenFailed,
    /// Read or write on the open connection failed.
    StreamError,
    /// Server closed the connection.
    ServerClose,
    /// Liveness probe went unanswered.
    ProbeTimeout,
    /// Retry budget exhausted.
    RetriesExhausted,
    /// Shutdown requested.
    Shutdown,
    /// Connection handle released after shutdown.
    CloseComplete,
}

/// Action the supervisor must take after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Nothing to do.
    None,
    /// Open a new connection.
    Connect,
    /// Connection is live; replay subscriptions and start streaming.
    StartSession,
    /// Wait the retry delay, then connect again.
    ScheduleRetry,
    /// Tear down the current connection, then wait and connect again.
    Reconnect,
    /// Close the connection and stop.
    Close,
    /// Session is over.
    Stop,
}

/// Session state machine.
#[derive(Debug)]
pub struct SessionLifecycle {
    phase: SessionPhase,
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLifecycle {
    /// Create a lifecycle in the idle phase.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Apply an event, move to the next phase and return the action the
    /// supervisor must perform. Events that make no sense in the current
    /// phase are ignored and return [`SessionAction::None`].
    pub fn apply(&mut self, event: SessionEvent) -> SessionAction {
        use SessionEvent as E;
        use SessionPhase as P;

        // Shutdown wins from every phase.
        if event == E::Shutdown {
            return match self.phase {
                P::Closed => SessionAction::None,
                P::Open => {
                    self.phase = P::Closing;
                    SessionAction::Close
                }
                _ => {
                    self.phase = P::Closed;
                    SessionAction::Stop
                }
            };
        }

        match (self.phase, event) {
            (P::Idle, E::Start) => {
                self.phase = P::Connecting;
                SessionAction::Connect
            }
            (P::Connecting, E::OpenSucceeded) => {
                self.phase = P::Open;
                SessionAction::StartSession
            }
            (P::Connecting, E::OpenFailed) => SessionAction::ScheduleRetry,
            (P::Connecting | P::Open, E::RetriesExhausted) => {
                self.phase = P::Closed;
                SessionAction::Stop
            }
            (P::Open, E::StreamError | E::ServerClose | E::ProbeTimeout) => {
                self.phase = P::Connecting;
                SessionAction::Reconnect
            }
            (P::Closing, E::CloseComplete) => {
                self.phase = P::Closed;
                SessionAction::Stop
            }
            _ => SessionAction::None,
        }
    }
}
