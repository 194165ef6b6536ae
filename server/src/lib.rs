//! # Position Relay Server Library
//!
//! This library provides the central relay for the shared-grid position
//! service. Participants connect over TCP, report their own position, and the
//! relay forwards every report to all other connected participants so each
//! client converges on the same view of the grid.
//!
//! ## Core Responsibilities
//!
//! ### Admission
//! The relay admits a small, fixed number of concurrent sessions. Each
//! admitted connection receives a sequential client id and a greeting line.
//! Connections beyond capacity receive a fixed rejection line and are closed
//! immediately. There is no queue and no retry.
//!
//! ### Relaying
//! Every Update line a session sends is applied to that session's last known
//! position and re-sent as a Broadcast line to every *other* session. The
//! sender never receives its own broadcast.
//!
//! ### Teardown
//! A session ends when its peer closes the stream, a read fails, a frame is
//! too long, or the relay shuts down. Its registry entry is removed and its
//! socket closed by the task that owns it. Other sessions are unaffected.
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! One task runs the accept loop; each admitted connection gets its own task
//! for its whole lifetime. Session tasks are supervised by a `JoinSet` and
//! stopped through a shared `CancellationToken`, so the relay can be shut
//! down cleanly instead of only by process exit.
//!
//! ### Single Registry Lock
//! All session bookkeeping lives in one [`registry::Registry`] behind one
//! mutex. The lock is released before any network write: broadcasters copy
//! the target handles out, drop the lock, then write to each peer in turn.
//! A write failure to one peer is logged and delivery to the rest continues.
//!
//! ### Line Framing
//! Messages are newline-terminated ASCII lines of space-separated integers,
//! bounded by [`shared::MAX_MESSAGE_LEN`]. See [`shared::protocol`].
//!
//! ## Module Organization
//!
//! - [`config`]: listen address and capacity
//! - [`error`]: setup and listener failures
//! - [`network`]: accept loop, session tasks, broadcast fan-out
//! - [`registry`]: session bookkeeping
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::RelayConfig;
//! use server::network::RelayServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = RelayServer::bind(&RelayConfig::default()).await?.spawn();
//!
//!     tokio::signal::ctrl_c().await?;
//!     relay.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod registry;
