//! WebSocket fallback transport, used on platforms that cannot inherit extra file descriptors
//! into the child process. The browser frames this stream itself — one complete JSON envelope
//! per text frame — so the NUL [`crate::framer::Framer`] does not apply here.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{CdpError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct WsReader {
    stream: SplitStream<WsStream>,
}

pub struct WsWriter {
    sink: SplitSink<WsStream, WsMessage>,
}

/// Connects to the browser's DevTools WebSocket endpoint and splits it into independent
/// reader/writer halves, mirroring the pipe transport's shape so the session's reader and
/// writer tasks are transport-agnostic.
pub async fn connect(debug_ws_url: &str) -> Result<(WsReader, WsWriter)> {
    let config = WebSocketConfig { max_message_size: None, max_frame_size: None, ..Default::default() };
    let (ws, _) = tokio_tungstenite::connect_async_with_config(debug_ws_url, Some(config), false).await?;
    let (sink, stream) = ws.split();
    Ok((WsReader { stream }, WsWriter { sink }))
}

impl WsReader {
    /// Reads the next complete frame. A ping/pong is transparently skipped; a close frame or a
    /// dropped connection yields `Ok(None)`.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            return match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => Ok(Some(text.into_bytes())),
                Some(Ok(WsMessage::Binary(bytes))) => Ok(Some(bytes)),
                Some(Ok(WsMessage::Close(_))) | None => Ok(None),
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => continue,
                Some(Ok(other)) => Err(CdpError::UnexpectedWsMessage(other)),
                Some(Err(err)) => Err(CdpError::Ws(err)),
            };
        }
    }
}

impl WsWriter {
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        self.sink.send(WsMessage::text(String::from_utf8_lossy(payload).into_owned())).await?;
        Ok(())
    }
}
