//! WebSocket Transport
//!
//! [`Transport`] implementation over `tokio-tungstenite`. Opens one
//! TLS WebSocket session with the identity headers attached to the
//! handshake request and surfaces protocol frames as
//! [`ConnectionEvent`]s.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{
    ACCOUNT_ID_HEADER, ConnectionEvent, ConnectionHeaders, FeedConnection, Transport,
    TransportError,
};
use crate::infrastructure::config::ConfigError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport over `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

impl WsTransport {
    /// Create a WebSocket transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(
        &self,
        url: &str,
        headers: &ConnectionHeaders,
    ) -> Result<Box<dyn FeedConnection>, TransportError> {
        let mut request = url.into_client_request()?;

        // Header validation happens before any network activity.
        let authorization = HeaderValue::from_str(&headers.authorization)
            .map_err(|_| ConfigError::InvalidHeader(AUTHORIZATION.to_string()))?;
        let account_id = HeaderValue::from_str(&headers.account_id)
            .map_err(|_| ConfigError::InvalidHeader(ACCOUNT_ID_HEADER.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, authorization);
        request.headers_mut().insert(ACCOUNT_ID_HEADER, account_id);

        let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
        let (write, read) = stream.split();

        Ok(Box::new(WsConnection {
            write,
            read,
            closed: false,
        }))
    }
}

/// One live WebSocket session.
pub struct WsConnection {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    closed: bool,
}

#[async_trait]
impl FeedConnection for WsConnection {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }
        self.write.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }
        self.write.send(Message::Ping(Vec::new().into())).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<ConnectionEvent, TransportError> {
        loop {
            let Some(message) = self.read.next().await else {
                return Err(TransportError::ConnectionClosed);
            };

            match message? {
                Message::Text(text) => {
                    return Ok(ConnectionEvent::Frame(text.as_str().to_owned()));
                }
                Message::Pong(_) => return Ok(ConnectionEvent::Pong),
                Message::Ping(payload) => {
                    // Answer at the protocol level, then surface for logs.
                    self.write.send(Message::Pong(payload.clone())).await?;
                    return Ok(ConnectionEvent::Ping(payload.to_vec()));
                }
                Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|f| (Some(u16::from(f.code)), Some(f.reason.to_string())))
                        .unwrap_or((None, None));
                    self.closed = true;
                    return Ok(ConnectionEvent::Closed { code, reason });
                }
                Message::Binary(_) => {
                    tracing::debug!("ignoring binary frame");
                }
                Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(error) = self.write.send(Message::Close(None)).await {
            tracing::debug!(%error, "close frame send failed");
        }
    }
}
