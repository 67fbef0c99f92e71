//! Launches the browser subprocess, wires up its transport, and watches for exit.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::async_process::{self, Child};
use crate::config::{SessionConfig, PLATFORM_SUPPORTS_PIPE};
use crate::error::{CdpError, Result};
use crate::flags::render;
use crate::transport::{TransportReader, TransportWriter};

#[cfg(unix)]
use crate::transport::pipe;
#[cfg(unix)]
use std::os::unix::process::CommandExt;

/// How long the supervisor waits for the browser to announce its debugging endpoint before
/// giving up, in WebSocket-fallback mode. The pipe transport has no equivalent wait: the pipes
/// are live the instant the child is spawned.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);

pub struct Supervisor {
    child: Child,
    #[cfg(unix)]
    _pipe_keep_alive: Option<pipe::PipeKeepAlive>,
}

impl Supervisor {
    /// Composes the command line, starts the browser, and returns the supervisor plus the
    /// connected transport halves. `debugging_port` is only consulted in WebSocket-fallback
    /// mode, where `0` asks the OS to choose a port and the browser reports back which one it
    /// picked on stderr.
    pub async fn launch(
        config: &SessionConfig,
        user_data_dir: &Path,
        output_dir: &Path,
        debugging_port: u16,
    ) -> Result<(Self, TransportReader, TransportWriter)> {
        let executable = config.resolve_executable()?;
        let flags = config.render_flags(user_data_dir, debugging_port);
        let args = render(&flags);

        let mut cmd = async_process::Command::new(&executable);
        cmd.args(&args);

        let stderr_log_path = output_dir.join("browser_stderr.log");
        let stdout_log_path = output_dir.join("browser_stdout.log");
        cmd.inner_mut().stdout(Stdio::from(
            std::fs::File::create(&stdout_log_path).map_err(CdpError::Io)?,
        ));
        cmd.stderr(Stdio::piped());

        if PLATFORM_SUPPORTS_PIPE {
            #[cfg(unix)]
            {
                let (reader, writer, keep_alive, child_read_fd, child_write_fd) =
                    pipe::create_pipe_pair().map_err(CdpError::Io)?;

                unsafe {
                    cmd.inner_mut().pre_exec(move || pipe::dup_into_child_fds(child_read_fd, child_write_fd));
                }

                let mut child = cmd.spawn().map_err(CdpError::Io)?;
                // `pre_exec` only `dup2`s these onto fd 3/4 inside the forked child; `fork` itself
                // duplicates the whole fd table first, so the parent process is still holding its
                // own open copies of `child_read_fd`/`child_write_fd` right here and must close
                // them explicitly. Left open, the parent's lingering copy of `child_write_fd` is
                // another write end on `PipeReader`'s pipe, so it never observes EOF when the
                // browser exits, and both fds leak per launch.
                unsafe {
                    libc::close(child_read_fd);
                    libc::close(child_write_fd);
                }
                spawn_stderr_capture(&mut child, stderr_log_path, None);

                return Ok((
                    Supervisor { child, _pipe_keep_alive: Some(keep_alive) },
                    TransportReader::Pipe(reader),
                    TransportWriter::Pipe(writer),
                ));
            }
            #[cfg(not(unix))]
            unreachable!("PLATFORM_SUPPORTS_PIPE is only true on unix");
        }

        let mut child = cmd.spawn().map_err(CdpError::Io)?;
        let (url_tx, url_rx) = tokio::sync::oneshot::channel();
        spawn_stderr_capture(&mut child, stderr_log_path, Some(url_tx));

        let debug_ws_url = tokio::time::timeout(LAUNCH_TIMEOUT, url_rx)
            .await
            .map_err(|_| CdpError::LaunchTimeout(String::new()))?
            .map_err(|_| CdpError::LaunchTimeout(String::new()))?;

        let (reader, writer) = crate::transport::ws::connect(&debug_ws_url).await?;

        #[allow(unreachable_code)]
        Ok((
            Supervisor {
                child,
                #[cfg(unix)]
                _pipe_keep_alive: None,
            },
            TransportReader::WebSocket(reader),
            TransportWriter::WebSocket(writer),
        ))
    }

    /// Blocks until the child exits.
    pub async fn wait(&mut self) -> Result<std::process::ExitStatus> {
        self.child.wait().await.map_err(CdpError::Io)
    }

    pub fn try_wait(&mut self) -> Result<Option<std::process::ExitStatus>> {
        self.child.try_wait().map_err(CdpError::Io)
    }

    /// Terminates the child process, used when the parent cancels the session before the
    /// browser exits on its own.
    pub async fn terminate(&mut self) -> Result<()> {
        self.child.kill().await.map_err(CdpError::Io)
    }
}

/// Reads the child's stderr line by line, appending every line to `log_path`. If `url_tx` is
/// set, the first line matching Chrome's `DevTools listening on ws://...` banner is parsed out
/// and sent once; this is how WebSocket-fallback mode discovers its own debugging endpoint.
fn spawn_stderr_capture(
    child: &mut Child,
    log_path: std::path::PathBuf,
    url_tx: Option<tokio::sync::oneshot::Sender<String>>,
) {
    let Some(stderr) = child.inner.stderr.take() else { return };
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut url_tx = url_tx;
        let mut log_file = match tokio::fs::File::create(&log_path).await {
            Ok(f) => f,
            Err(err) => {
                tracing::warn!(%err, path = %log_path.display(), "failed to create browser stderr log");
                return;
            }
        };
        while let Ok(Some(line)) = lines.next_line().await {
            let _ = log_file.write_all(line.as_bytes()).await;
            let _ = log_file.write_all(b"\n").await;
            if let Some(tx) = url_tx.take() {
                if let Some((_, rest)) = line.rsplit_once("listening on ") {
                    if rest.starts_with("ws") {
                        let _ = tx.send(rest.trim().to_string());
                        continue;
                    }
                }
                url_tx = Some(tx);
            }
        }
    });
}
