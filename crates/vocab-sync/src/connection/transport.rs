//! Push-channel transport abstraction and its WebSocket implementation.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use vocab_core::error::{AppError, ErrorKind};
use vocab_core::result::AppResult;

/// Close code of a normal shutdown.
pub const NORMAL_CLOSE: u16 = 1000;

/// An application-level frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text message.
    Text(String),
    /// The server closed the channel.
    Close {
        /// Close code, if the server sent one.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
}

impl Frame {
    /// Whether this is a normal close.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Self::Close { code: Some(NORMAL_CLOSE), .. })
    }
}

/// Opens push-channel connections.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug + 'static {
    /// Connect to `url`.
    async fn connect(&self, url: &str) -> AppResult<Box<dyn Connection>>;
}

/// One open push channel.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Send a text frame.
    async fn send(&mut self, text: String) -> AppResult<()>;

    /// Next application frame. `None` once the stream has ended.
    async fn recv(&mut self) -> Option<AppResult<Frame>>;

    /// Close with `code`.
    async fn close(&mut self, code: u16) -> AppResult<()>;
}

/// WebSocket transport over tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsTransport {
    connect_timeout: Duration,
}

impl WsTransport {
    /// A transport that gives up on handshakes after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> AppResult<Box<dyn Connection>> {
        let (stream, response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| AppError::timeout(format!("Connecting to {url} timed out")))?
            .map_err(|e| {
                AppError::with_source(ErrorKind::Network, format!("Connecting to {url} failed"), e)
            })?;
        debug!(url = %url, status = response.status().as_u16(), "Push channel handshake done");
        Ok(Box::new(WsConnection { stream }))
    }
}

/// An open WebSocket.
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl std::fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnection").finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, text: String) -> AppResult<()> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Network, "Push channel send failed", e))
    }

    async fn recv(&mut self) -> Option<AppResult<Frame>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => {
                    return Some(Err(AppError::with_source(
                        ErrorKind::Network,
                        "Push channel read failed",
                        e,
                    )));
                }
            };
            match message {
                Message::Text(text) => return Some(Ok(Frame::Text(text.to_string()))),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(Frame::Text(text))),
                    Err(_) => debug!(len = bytes.len(), "Dropping non-UTF-8 binary frame"),
                },
                Message::Close(frame) => {
                    return Some(Ok(Frame::Close {
                        code: frame.as_ref().map(|f| u16::from(f.code)),
                        reason: frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                    }));
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self, code: u16) -> AppResult<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Network, "Push channel close failed", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl std::fmt::Debug for dyn Connection {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("dyn Connection")
        }
    }

    #[test]
    fn test_clean_close_detection() {
        let clean = Frame::Close {
            code: Some(NORMAL_CLOSE),
            reason: String::new(),
        };
        let abnormal = Frame::Close {
            code: Some(1011),
            reason: "server error".to_string(),
        };
        assert!(clean.is_clean_close());
        assert!(!abnormal.is_clean_close());
        assert!(!Frame::Text("{}".to_string()).is_clean_close());
    }

    #[tokio::test]
    async fn test_connect_refused_is_network_error() {
        let transport = WsTransport::new(Duration::from_secs(2));
        let err = transport.connect("ws://127.0.0.1:1/ws/permissions/anonymous").await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Network | ErrorKind::Timeout));
    }
}
