//! Feed Client
//!
//! The resilient streaming client itself:
//!
//! - `messages`: outbound wire types (subscribe request)
//! - `codec`: inbound JSON frame decoding
//! - `heartbeat`: liveness probe manager
//! - `reconnect`: retry policy
//! - `lifecycle`: explicit session state machine
//! - `dispatcher`: decode + fan-out with consumer isolation
//! - `supervisor`: connection lifecycle driver

pub mod codec;
pub mod dispatcher;
pub mod heartbeat;
pub mod lifecycle;
pub mod messages;
pub mod reconnect;
pub mod supervisor;

pub use codec::{DecodeError, JsonCodec};
pub use dispatcher::{ConsumerError, DispatchWorker, Dispatcher};
pub use heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatManager, HeartbeatState};
pub use lifecycle::{SessionAction, SessionEvent, SessionLifecycle, SessionPhase};
pub use messages::SubscribeRequest;
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use supervisor::{FeedSupervisor, SupervisorConfig, SupervisorError};
