//! Owns the duplex connection to the browser: either the native NUL-framed pipe pair or, where
//! the platform cannot hand a child process extra file descriptors, a WebSocket connection to
//! its debugging port. Both present the same reader/writer halves to the rest of the crate.

#[cfg(unix)]
pub mod pipe;
pub mod ws;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

use crate::error::{CdpError, Result};

/// Read half of whichever transport the supervisor chose for this session.
pub enum TransportReader {
    #[cfg(unix)]
    Pipe(pipe::PipeReader),
    WebSocket(ws::WsReader),
    #[cfg(any(test, feature = "test-support"))]
    Mock(mock::MockReader),
}

impl TransportReader {
    /// Reads the next complete, already-delimited frame. `Ok(None)` signals a clean end of
    /// stream (browser closed its side).
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        match self {
            #[cfg(unix)]
            TransportReader::Pipe(r) => r.read_frame().await.map_err(CdpError::TransportRead),
            TransportReader::WebSocket(r) => r.read_frame().await,
            #[cfg(any(test, feature = "test-support"))]
            TransportReader::Mock(r) => r.read_frame().await.map_err(CdpError::TransportRead),
        }
    }
}

/// Write half of whichever transport the supervisor chose for this session.
pub enum TransportWriter {
    #[cfg(unix)]
    Pipe(pipe::PipeWriter),
    WebSocket(ws::WsWriter),
    #[cfg(any(test, feature = "test-support"))]
    Mock(mock::MockWriter),
}

impl TransportWriter {
    /// Writes one complete outbound envelope. A failure here — including a short write that
    /// left the delimiter unsent — is always a fatal `TransportSend` error.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        match self {
            #[cfg(unix)]
            TransportWriter::Pipe(w) => w.write_frame(payload).await.map_err(CdpError::TransportSend),
            TransportWriter::WebSocket(w) => w.write_frame(payload).await,
            #[cfg(any(test, feature = "test-support"))]
            TransportWriter::Mock(w) => w.write_frame(payload).await.map_err(CdpError::TransportSend),
        }
    }
}
