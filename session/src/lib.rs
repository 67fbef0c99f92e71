//! Session lifecycle and transport layer for the [Chrome DevTools
//! Protocol](https://chromedevtools.github.io/devtools-protocol/).
//!
//! This crate launches a Chromium-family browser, frames and multiplexes its DevTools Protocol
//! stream, and routes commands to their responses and events to their subscribers. It does not
//! know what any particular CDP domain means — that belongs to a typed protocol layer built on
//! top (see [`cdp_types::Command`]) — it only knows how to get bytes to and from the browser and
//! keep the right waiter fed.
//!
//! # Example
//! ```no_run
//! use cdp_session::{Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::launch(SessionConfig::builder().build()).await?;
//!
//!     let response = session.send("Target.setDiscoverTargets", serde_json::json!({"discover": true})).await?;
//!     println!("{:?}", response);
//!
//!     session.cancel();
//!     session.wait().await;
//!     Ok(())
//! }
//! ```
//!
//! The pipe transport ([`transport::pipe`]) is Chrome's native `--remote-debugging-pipe` wire
//! format and is used whenever the platform can inherit extra file descriptors into the child
//! process; everywhere else, the WebSocket transport ([`transport::ws`]) connects to the
//! browser's debugging port instead. Both present the same framed byte-stream contract to the
//! rest of this crate.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod async_process;
pub mod cmd;
pub mod config;
pub mod detection;
pub mod error;
pub mod flags;
pub mod framer;
pub mod jsonlog;
pub mod router;
pub mod session;
pub mod supervisor;
pub mod transport;

pub use crate::config::{SessionConfig, SessionConfigBuilder};
pub use crate::error::{CdpError, Result};
pub use crate::flags::{FlagMap, FlagValue};
pub use crate::router::Subscription;
pub use crate::session::{Session, SessionState};

pub use cdp_types as types;
