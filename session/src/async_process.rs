//! Thin wrapper around `tokio::process` that always kills the child on drop.
//!
//! The supervisor's watcher task normally reaps the child itself, but if a caller drops a
//! `Session` without cancelling it first, relying on the runtime's `kill_on_drop` is the only
//! way to avoid leaking a browser process.

use std::ffi::OsStr;
use std::process::Stdio;

use tokio::process;

#[derive(Debug)]
pub struct Command {
    inner: process::Command,
}

impl Command {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let mut inner = process::Command::new(program);
        inner.kill_on_drop(true);
        Self { inner }
    }

    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.inner.arg(arg);
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.inner.args(args);
        self
    }

    pub fn envs<I, K, V>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.inner.envs(vars);
        self
    }

    pub fn stderr<T: Into<Stdio>>(&mut self, cfg: T) -> &mut Self {
        self.inner.stderr(cfg);
        self
    }

    /// Access to the underlying `tokio::process::Command` for the platform-specific wiring
    /// (`pre_exec` on unix) the supervisor needs for the pipe transport.
    pub fn inner_mut(&mut self) -> &mut process::Command {
        &mut self.inner
    }

    pub fn spawn(&mut self) -> std::io::Result<Child> {
        Ok(Child { inner: self.inner.spawn()? })
    }
}

#[derive(Debug)]
pub struct Child {
    pub inner: process::Child,
}

impl Child {
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.inner.kill().await
    }

    pub async fn wait(&mut self) -> std::io::Result<std::process::ExitStatus> {
        self.inner.wait().await
    }

    pub fn try_wait(&mut self) -> std::io::Result<Option<std::process::ExitStatus>> {
        self.inner.try_wait()
    }
}
