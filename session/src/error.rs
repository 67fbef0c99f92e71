use std::io;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

pub type Result<T, E = CdpError> = std::result::Result<T, E>;

/// Every fallible operation in this crate returns this error type.
#[derive(Debug, Error)]
pub enum CdpError {
    /// The browser returned `{error:{code,message}}` for a `send`. Surfaced verbatim; the
    /// session remains `Running`.
    #[error("{0}")]
    Protocol(#[from] cdp_types::Error),

    /// Write to the transport failed outright, or succeeded for the payload but short-wrote the
    /// delimiter. Either way the pending request is failed and the session moves to `Stopping`.
    #[error("transport send failed: {0}")]
    TransportSend(#[source] io::Error),

    /// A single inbound frame could not be decoded as JSON. Logged and dropped; the session
    /// stays `Running` — this does not tear anything down.
    #[error("failed to decode inbound frame: {0}")]
    TransportDecode(#[source] serde_json::Error),

    /// The underlying pipe or socket read failed at the syscall level, or hit EOF. Transitions
    /// the session to `Stopping`.
    #[error("transport read failed: {0}")]
    TransportRead(#[source] io::Error),

    #[error("{0}")]
    Ws(#[from] tungstenite::Error),

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Serde(#[from] serde_json::Error),

    #[error("received no response from the browser")]
    NoResponse,

    #[error("received unexpected websocket message: {0:?}")]
    UnexpectedWsMessage(tungstenite::Message),

    /// `send` was called with an empty method name. Rejected synchronously, never reaches the
    /// wire.
    #[error("malformed request: method must not be empty")]
    MalformedRequest,

    /// Delivered to any outstanding `send` when the session enters `Stopping`.
    #[error("session was cancelled")]
    SessionCancelled,

    /// `send`/`subscribe` called on a context that carries no session (e.g. a child whose root
    /// has already terminated).
    #[error("no session associated with this context")]
    NoSession,

    #[error("could not locate a browser executable")]
    ExecutableNotFound,

    #[error("browser process exited with status {0:?} before its debugging endpoint could be resolved, stderr: {1}")]
    LaunchExit(std::process::ExitStatus, String),

    #[error("timed out waiting for the browser's debugging endpoint to become available, stderr: {0}")]
    LaunchTimeout(String),

    #[error("I/O error while resolving the browser's debugging endpoint: {0}")]
    LaunchIo(#[source] io::Error),
}

impl CdpError {
    pub fn msg(msg: impl Into<String>) -> Self {
        CdpError::Protocol(cdp_types::Error { code: -1, message: msg.into() })
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for CdpError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        CdpError::SessionCancelled
    }
}
