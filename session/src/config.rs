//! Construction-time configuration: the browser executable, the flag map, and the per-session
//! output directory layout under `CDP_OUTPUT_ROOT`.

use std::path::PathBuf;

use crate::detection::{self, DetectionOptions};
use crate::error::{CdpError, Result};
use crate::flags::FlagMap;

/// Overrides the parent directory session output directories are created under. Falls back to
/// the OS temp directory when unset.
pub const OUTPUT_ROOT_ENV_VAR: &str = "CDP_OUTPUT_ROOT";

/// Whether this platform can inherit extra file descriptors into the child process. Where it
/// can, the pipe transport is used and is always preferred; everywhere else the WebSocket
/// fallback is used.
pub const PLATFORM_SUPPORTS_PIPE: bool = cfg!(unix);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub flags: FlagMap,
    pub detection: DetectionOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { executable: None, user_data_dir: None, flags: FlagMap::new(), detection: DetectionOptions::default() }
    }
}

#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.executable = Some(path.into());
        self
    }

    pub fn user_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.user_data_dir = Some(path.into());
        self
    }

    pub fn flag(mut self, key: impl Into<String>, value: impl Into<crate::flags::FlagValue>) -> Self {
        self.config.flags.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Resolves the executable path, auto-detecting one if the caller did not supply one.
    ///
    /// The resolved path is canonicalized and, on Windows, stripped of the `\\?\` verbatim
    /// prefix `std::fs::canonicalize` adds back out: Chromium's sandboxing rejects the
    /// UNC-style paths that prefix produces for a relative input.
    pub fn resolve_executable(&self) -> Result<PathBuf> {
        let path = match &self.executable {
            Some(path) => path.clone(),
            None => detection::default_executable(&self.detection).map_err(|_| CdpError::ExecutableNotFound)?,
        };
        let canonical = std::fs::canonicalize(&path).map_err(CdpError::Io)?;
        Ok(dunce::simplified(&canonical).to_path_buf())
    }

    /// Creates a fresh, uniquely named output directory for a root session under
    /// `CDP_OUTPUT_ROOT` (or the OS temp dir), plus its `user_data` subdirectory, returning
    /// both paths. `user_data_dir` is canonicalized for the same reason as the executable path
    /// above, since it is handed to the browser as `--user-data-dir`.
    pub async fn prepare_output_dir(&self, session_id: u64) -> std::io::Result<(PathBuf, PathBuf)> {
        let root = std::env::var_os(OUTPUT_ROOT_ENV_VAR).map(PathBuf::from).unwrap_or_else(std::env::temp_dir);
        let output_dir = root.join(format!("cdp-session-{session_id}"));
        tokio::fs::create_dir_all(&output_dir).await?;

        let user_data_dir = match &self.user_data_dir {
            Some(dir) => dir.clone(),
            None => output_dir.join("user_data"),
        };
        tokio::fs::create_dir_all(&user_data_dir).await?;
        let user_data_dir = dunce::simplified(&tokio::fs::canonicalize(&user_data_dir).await?).to_path_buf();

        Ok((output_dir, user_data_dir))
    }

    /// Renders the final flag map: the caller's flags plus the user-data-dir entry and the
    /// platform-appropriate remote-debugging flag, per the rendering rules.
    pub fn render_flags(&self, user_data_dir: &std::path::Path, debugging_port: u16) -> FlagMap {
        let mut flags = self.flags.clone();
        flags.insert("user-data-dir".into(), user_data_dir.to_string_lossy().into_owned().into());
        flags.remove("remote-debugging-pipe");
        flags.remove("remote-debugging-port");
        if PLATFORM_SUPPORTS_PIPE {
            flags.insert("remote-debugging-pipe".into(), true.into());
        } else {
            flags.insert("remote-debugging-port".into(), (debugging_port as i64).into());
        }
        flags
    }
}
