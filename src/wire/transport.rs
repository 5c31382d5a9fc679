//! WebSocket transport for endpoint connections.
//!
//! Wraps `tokio-tungstenite` and hands back split reader/writer halves so
//! the session loop can `tokio::select!` on incoming frames and shutdown.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;

use super::codec;

/// WebSocket subprotocol spoken by the VM hosting service
pub const SUBPROTOCOL: &str = "guacamole";

/// Close code for a deliberate, normal shutdown
pub const NORMAL_CLOSE: u16 = 1000;

/// Close code reported when the stream ends without a close frame
pub const ABNORMAL_CLOSE: u16 = 1006;

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Received transport message
#[derive(Debug)]
pub enum WsMessage {
    /// One protocol frame
    Text(String),
    /// WebSocket-level ping payload
    Ping(Vec<u8>),
    /// Peer closed the connection
    Close { code: u16, reason: String },
}

/// Write half of an endpoint connection
pub struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    /// Encode and send one protocol frame
    pub async fn send_frame<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Text(codec::encode(fields)))
            .await
            .context("WebSocket send failed")
    }

    /// Answer a WebSocket ping
    pub async fn send_pong(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .context("WebSocket pong failed")
    }

    /// Send a close frame with the given code, then close the sink
    pub async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.sink
            .send(tungstenite::Message::Close(Some(frame)))
            .await
            .context("WebSocket close frame failed")?;
        self.sink.close().await.context("WebSocket close failed")
    }
}

/// Read half of an endpoint connection
pub struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WsReader {
    /// Receive the next message, `None` once the stream has ended
    ///
    /// Binary, pong and raw frames are skipped.
    pub async fn recv(&mut self) -> Option<Result<WsMessage>> {
        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Some(Ok(WsMessage::Text(text.to_string())));
                }
                Some(Ok(tungstenite::Message::Ping(data))) => {
                    return Some(Ok(WsMessage::Ping(data.to_vec())));
                }
                Some(Ok(tungstenite::Message::Close(close_frame))) => {
                    let (code, reason) = close_frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    return Some(Ok(WsMessage::Close { code, reason }));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Some(Err(anyhow::anyhow!("WebSocket read error: {e}")));
                }
                None => return None,
            }
        }
    }
}

/// Open a connection to an endpoint
pub async fn connect(url: &str, origin: &str) -> Result<(WsWriter, WsReader)> {
    use tungstenite::client::IntoClientRequest;
    use tungstenite::http::HeaderValue;

    let mut request = url
        .into_client_request()
        .with_context(|| format!("invalid WebSocket URL: {url}"))?;

    let headers = request.headers_mut();
    headers.insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));
    headers.insert(
        "Origin",
        HeaderValue::from_str(origin).with_context(|| format!("invalid origin: {origin}"))?,
    );

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .with_context(|| format!("WebSocket connect to {url} failed"))?;

    let (sink, stream) = ws_stream.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}

/// Convert an HTTP(S) URL to the WS(S) scheme
pub fn http_to_ws_scheme(url: &str) -> String {
    if url.starts_with("wss://") || url.starts_with("ws://") {
        url.to_string()
    } else {
        url.replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1)
    }
}

/// Derive an `Origin` header value from an endpoint URL
pub fn origin_for(url: &str) -> String {
    let (scheme, rest) = if let Some(rest) = url.strip_prefix("wss://") {
        ("https", rest)
    } else if let Some(rest) = url.strip_prefix("ws://") {
        ("http", rest)
    } else if let Some(rest) = url.strip_prefix("https://") {
        ("https", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        ("http", rest)
    } else {
        ("http", url)
    };
    let host = rest.split('/').next().unwrap_or(rest);
    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_to_ws_scheme() {
        assert_eq!(http_to_ws_scheme("https://vm.example.com"), "wss://vm.example.com");
        assert_eq!(http_to_ws_scheme("http://localhost:6004"), "ws://localhost:6004");
        assert_eq!(http_to_ws_scheme("wss://vm.example.com/v1"), "wss://vm.example.com/v1");
    }

    #[test]
    fn test_origin_for() {
        assert_eq!(origin_for("wss://vm.example.com/collab"), "https://vm.example.com");
        assert_eq!(origin_for("ws://127.0.0.1:6004"), "http://127.0.0.1:6004");
    }

    #[tokio::test]
    async fn test_connect_invalid_url_returns_error() {
        assert!(connect("not-a-url", "http://localhost").await.is_err());
    }

    #[tokio::test]
    async fn test_connect_unreachable_host_returns_error() {
        assert!(connect("ws://127.0.0.1:1/", "http://localhost").await.is_err());
    }
}
