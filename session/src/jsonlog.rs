//! Per-direction framed-message log written to `cdp_json.log` in a session's output directory.
//!
//! This is a debugging aid, not part of the wire protocol: every frame the transport reads or
//! writes is appended as one line, timestamped to the microsecond, so a hung or misbehaving
//! session can be replayed after the fact without re-running the browser. A failure to write the
//! log never affects the session itself — it is logged via `tracing` and otherwise ignored.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Direction a logged frame travelled, from this process's point of view.
#[derive(Debug, Clone, Copy)]
pub enum Direction {
    /// Written to the browser.
    Out,
    /// Read from the browser.
    In,
}

impl Direction {
    fn marker(self) -> &'static str {
        match self {
            Direction::Out => "->",
            Direction::In => "<-",
        }
    }
}

/// Appends frames to `cdp_json.log` under a session's output directory.
#[derive(Debug)]
pub struct JsonLog {
    file: Mutex<File>,
}

impl JsonLog {
    /// Opens (creating if necessary) `cdp_json.log` in `output_dir`.
    pub async fn open(output_dir: &std::path::Path) -> std::io::Result<Self> {
        let file = File::create(output_dir.join("cdp_json.log")).await?;
        Ok(Self { file: Mutex::new(file) })
    }

    /// Appends one frame, prefixed with its direction and a microsecond epoch timestamp.
    pub async fn record(&self, direction: Direction, payload: &[u8]) {
        let micros = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_micros()).unwrap_or(0);
        let line = format!("{micros} {} {}\n", direction.marker(), String::from_utf8_lossy(payload));

        let mut file = self.file.lock().await;
        if let Err(err) = file.write_all(line.as_bytes()).await {
            tracing::debug!(%err, "failed to append to cdp_json.log");
        }
    }
}
