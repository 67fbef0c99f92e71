//! The NUL-framed pipe transport: fd 3 is read by the browser, fd 4 is written by the browser,
//! both inherited from this process. This is Chrome's native `--remote-debugging-pipe` wire
//! format and is preferred whenever the platform can hand a child process extra file
//! descriptors.

use std::collections::VecDeque;
use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::framer::{encode, Framer};

/// Holds the parent's write end of the child's inbound pipe open for the session's lifetime.
///
/// If this were dropped while the child still expects more input, the child would observe EOF
/// on fd 3 and may tear down prematurely; the session keeps one clone of the write end alive
/// for exactly as long as the writer task is running.
#[derive(Debug)]
pub struct PipeKeepAlive(#[allow(dead_code)] std::fs::File);

/// Parent-side read half of the browser's outbound pipe (browser writes fd 4, we read it).
pub struct PipeReader {
    file: tokio::fs::File,
    framer: Framer,
    queue: VecDeque<Vec<u8>>,
    eof: bool,
}

impl PipeReader {
    pub fn new(file: std::fs::File) -> Self {
        Self { file: tokio::fs::File::from_std(file), framer: Framer::new(), queue: VecDeque::new(), eof: false }
    }

    /// Reads the next complete frame, performing as many underlying reads as necessary. Returns
    /// `Ok(None)` once the stream is exhausted (including any final non-terminated tail already
    /// flushed out via `finish`).
    pub async fn read_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(frame) = self.queue.pop_front() {
                return Ok(Some(frame));
            }
            if self.eof {
                return Ok(self.framer.finish());
            }
            let mut buf = [0u8; 8192];
            let n = self.file.read(&mut buf).await?;
            if n == 0 {
                self.eof = true;
                continue;
            }
            self.queue.extend(self.framer.feed(&buf[..n]));
        }
    }
}

/// Parent-side write half of the browser's inbound pipe (we write fd 3, browser reads it).
pub struct PipeWriter {
    file: tokio::fs::File,
}

impl PipeWriter {
    pub fn new(file: std::fs::File) -> Self {
        Self { file: tokio::fs::File::from_std(file) }
    }

    /// Writes `payload ‖ 0x00` as a single buffer. `write_all` retries internally until the
    /// whole buffer lands or the write fails, so a short write never leaves the delimiter
    /// unsent without surfacing as an error here.
    pub async fn write_frame(&mut self, payload: &[u8]) -> io::Result<()> {
        self.file.write_all(&encode(payload)).await?;
        self.file.flush().await
    }
}

/// Creates the two OS pipe pairs and returns the parent-side reader/writer plus the
/// `Stdio` handles to hand the child for fd 3 (child reads) and fd 4 (child writes).
pub fn create_pipe_pair() -> io::Result<(PipeReader, PipeWriter, PipeKeepAlive, std::os::unix::io::RawFd, std::os::unix::io::RawFd)> {
    use std::os::unix::io::IntoRawFd;

    // parent writes -> child reads on fd 3
    let (child_read, parent_write) = os_pipe::pipe()?;
    // child writes -> parent reads on fd 4
    let (parent_read, child_write) = os_pipe::pipe()?;

    let keep_alive = PipeKeepAlive(parent_write.try_clone()?);
    let writer = PipeWriter::new(parent_write);
    let reader = PipeReader::new(parent_read);

    Ok((reader, writer, keep_alive, child_read.into_raw_fd(), child_write.into_raw_fd()))
}

/// Rewires the child's fd 3/4 onto the given raw pipe ends right after `fork`, before `exec`.
///
/// Must be called from within `std::process::Command::pre_exec`; only async-signal-safe calls
/// are permitted in that context, which `dup2` is.
///
/// # Safety
/// Must only run in the child between `fork` and `exec`, per `pre_exec`'s contract.
pub unsafe fn dup_into_child_fds(child_read: std::os::unix::io::RawFd, child_write: std::os::unix::io::RawFd) -> io::Result<()> {
    unsafe {
        if libc::dup2(child_read, 3) < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::dup2(child_write, 4) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips_through_a_real_pipe() {
        let (r, w) = os_pipe::pipe().unwrap();
        let mut reader = PipeReader::new(r);
        let mut writer = PipeWriter::new(w);

        writer.write_frame(br#"{"id":1,"result":{}}"#).await.unwrap();
        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame, br#"{"id":1,"result":{}}"#);
    }

    #[tokio::test]
    async fn keepalive_prevents_premature_eof() {
        let (r, w) = os_pipe::pipe().unwrap();
        let keep_alive = PipeKeepAlive(w.try_clone().unwrap());
        let mut reader = PipeReader::new(r);
        drop(w);
        drop(keep_alive);
        // both ends of the clone are now closed; reading observes a clean EOF, not a hang.
        assert_eq!(reader.read_frame().await.unwrap(), None);
    }
}
