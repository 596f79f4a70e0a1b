//! Dispatch isolation integration tests.
//!
//! Inject frames through a scripted connection and verify that decode
//! failures and misbehaving consumers never disturb the session loop or
//! the other consumers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use symbol_stream::{
    ConfigError, ConnectionEvent, ConnectionHeaders, Consumer, Credentials, CredentialSource,
    DecodedMessage, DispatchSettings, Dispatcher, FeedConnection, FeedSupervisor, HeartbeatConfig,
    MessageKind, ReconnectConfig, SessionPhase, SupervisorConfig, TopicSet, Transport,
    TransportError,
};

type EventResult = Result<ConnectionEvent, TransportError>;

struct InjectedConnection {
    events: mpsc::UnboundedReceiver<EventResult>,
}

#[async_trait]
impl FeedConnection for InjectedConnection {
    async fn send(&mut self, _text: String) -> Result<(), TransportError> {
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_event(&mut self) -> Result<ConnectionEvent, TransportError> {
        self.events
            .recv()
            .await
            .unwrap_or(Err(TransportError::ConnectionClosed))
    }

    async fn close(&mut self) {}
}

struct InjectingTransport {
    conn_tx: mpsc::UnboundedSender<mpsc::UnboundedSender<EventResult>>,
}

#[async_trait]
impl Transport for InjectingTransport {
    async fn open(
        &self,
        _url: &str,
        _headers: &ConnectionHeaders,
    ) -> Result<Box<dyn FeedConnection>, TransportError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let _ = self.conn_tx.send(events_tx);
        Ok(Box::new(InjectedConnection { events: events_rx }))
    }
}

struct StaticCredentials;

impl CredentialSource for StaticCredentials {
    fn credentials(&self) -> Result<Credentials, ConfigError> {
        Credentials::new("itest-token", "acct-9")
    }
}

struct Collector {
    seen: Mutex<Vec<DecodedMessage>>,
}

impl Collector {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    fn symbols(&self) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .filter_map(|m| m.symbol().map(str::to_owned))
            .collect()
    }
}

impl Consumer for Collector {
    fn on_message(&self, message: DecodedMessage) {
        self.seen.lock().push(message);
    }
}

struct Panicker;

impl Consumer for Panicker {
    fn on_message(&self, _message: DecodedMessage) {
        panic!("consumer bug");
    }
}

fn frame(symbol: &str) -> String {
    format!(r#"{{"type":"symbolUpdate","symbol":"{symbol}","ltp":842.1,"ltq":10}}"#)
}

/// Spawn a full supervisor + dispatcher stack over an injecting transport.
fn start_stack(
    dispatcher: Dispatcher,
    cancel: CancellationToken,
) -> mpsc::UnboundedReceiver<mpsc::UnboundedSender<EventResult>> {
    let (conn_tx, conn_rx) = mpsc::unbounded_channel();
    let supervisor = Arc::new(FeedSupervisor::new(
        SupervisorConfig {
            url: "wss://feed.test/ws".to_string(),
            heartbeat: HeartbeatConfig::default(),
            reconnect: ReconnectConfig {
                initial_delay: Duration::from_millis(20),
                max_delay: Duration::from_millis(20),
                multiplier: 1.0,
                jitter_factor: 0.0,
                max_attempts: 0,
            },
        },
        Arc::new(InjectingTransport { conn_tx }),
        Arc::new(StaticCredentials),
        Arc::new(TopicSet::with_topics(["NSE:SBIN-EQ".to_string()])),
        dispatcher,
        cancel,
    ));
    tokio::spawn(async move { supervisor.run().await });
    conn_rx
}

async fn next_session(
    conn_rx: &mut mpsc::UnboundedReceiver<mpsc::UnboundedSender<EventResult>>,
) -> mpsc::UnboundedSender<EventResult> {
    tokio::time::timeout(Duration::from_secs(2), conn_rx.recv())
        .await
        .expect("connection should open")
        .expect("transport should stay alive")
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn frames_flow_to_consumers_in_order() {
    let cancel = CancellationToken::new();
    let (dispatcher, worker) = Dispatcher::new(&DispatchSettings::default(), cancel.clone());
    tokio::spawn(worker.run());

    let collector = Collector::new();
    dispatcher.register_consumer(collector.clone());

    let mut conn_rx = start_stack(dispatcher, cancel.clone());
    let session = next_session(&mut conn_rx).await;

    for symbol in ["NSE:SBIN-EQ", "NSE:RELIANCE-EQ", "NSE:INFY-EQ"] {
        session
            .send(Ok(ConnectionEvent::Frame(frame(symbol))))
            .expect("session should be reading");
    }
    settle().await;

    assert_eq!(
        collector.symbols(),
        vec!["NSE:SBIN-EQ", "NSE:RELIANCE-EQ", "NSE:INFY-EQ"]
    );
    let kinds: Vec<MessageKind> = collector
        .seen
        .lock()
        .iter()
        .map(|m| m.kind.clone())
        .collect();
    assert!(kinds.iter().all(|k| *k == MessageKind::SymbolUpdate));

    cancel.cancel();
}

#[tokio::test]
async fn undecodable_frame_does_not_break_the_session() {
    let cancel = CancellationToken::new();
    let (dispatcher, worker) = Dispatcher::new(&DispatchSettings::default(), cancel.clone());
    tokio::spawn(worker.run());

    let collector = Collector::new();
    dispatcher.register_consumer(collector.clone());

    let mut conn_rx = start_stack(dispatcher, cancel.clone());
    let session = next_session(&mut conn_rx).await;

    session
        .send(Ok(ConnectionEvent::Frame("%% not json %%".to_string())))
        .expect("session should be reading");
    session
        .send(Ok(ConnectionEvent::Frame(frame("NSE:SBIN-EQ"))))
        .expect("session should be reading");
    settle().await;

    // The garbage frame is dropped; the session and later frames survive.
    assert_eq!(collector.symbols(), vec!["NSE:SBIN-EQ"]);

    cancel.cancel();
}

#[tokio::test]
async fn panicking_consumer_is_isolated_from_the_rest() {
    let cancel = CancellationToken::new();
    let (dispatcher, worker) = Dispatcher::new(&DispatchSettings::default(), cancel.clone());
    tokio::spawn(worker.run());

    dispatcher.register_consumer(Arc::new(Panicker));
    let collector = Collector::new();
    dispatcher.register_consumer(collector.clone());

    let mut conn_rx = start_stack(dispatcher, cancel.clone());
    let session = next_session(&mut conn_rx).await;

    session
        .send(Ok(ConnectionEvent::Frame(frame("NSE:SBIN-EQ"))))
        .expect("session should be reading");
    session
        .send(Ok(ConnectionEvent::Frame(frame("NSE:RELIANCE-EQ"))))
        .expect("session should be reading");
    settle().await;

    // Both frames reach the healthy consumer despite the panicking one.
    assert_eq!(collector.symbols(), vec!["NSE:SBIN-EQ", "NSE:RELIANCE-EQ"]);

    cancel.cancel();
}

#[tokio::test]
async fn session_stays_open_while_consumers_misbehave() {
    let cancel = CancellationToken::new();
    let (dispatcher, worker) = Dispatcher::new(&DispatchSettings::default(), cancel.clone());
    tokio::spawn(worker.run());

    dispatcher.register_consumer(Arc::new(Panicker));

    let (conn_tx, mut conn_rx) = mpsc::unbounded_channel();
    let supervisor = Arc::new(FeedSupervisor::new(
        SupervisorConfig {
            url: "wss://feed.test/ws".to_string(),
            heartbeat: HeartbeatConfig::default(),
            reconnect: ReconnectConfig::default(),
        },
        Arc::new(InjectingTransport { conn_tx }),
        Arc::new(StaticCredentials),
        Arc::new(TopicSet::with_topics(["NSE:SBIN-EQ".to_string()])),
        dispatcher,
        cancel.clone(),
    ));
    let runner = Arc::clone(&supervisor);
    tokio::spawn(async move { runner.run().await });

    let session = next_session(&mut conn_rx).await;
    for i in 0..20 {
        session
            .send(Ok(ConnectionEvent::Frame(frame(&format!("NSE:S{i}-EQ")))))
            .expect("session should be reading");
    }
    settle().await;

    assert_eq!(supervisor.phase(), SessionPhase::Open);

    cancel.cancel();
}
