//! # Position Relay Client Library
//!
//! This library provides the participant side of the shared-grid position
//! relay. It keeps one persistent connection to the relay, mirrors every
//! other participant's position locally, and sends the local player's moves.
//!
//! ## Architecture Overview
//!
//! Two execution contexts share state:
//!
//! - **Receive loop**: a background task started as soon as the connection is
//!   up. It reads Broadcast lines and upserts the matching participant in the
//!   local mirror, giving each newly seen participant a random display color.
//!   When the relay closes the stream or a read fails, the loop marks the
//!   client disconnected and closes the socket. There is no reconnect.
//! - **Caller**: sends Update lines through [`network::RelayClient::send_update`]
//!   and records its own moves with
//!   [`network::RelayClient::update_local_position`].
//!
//! The participant map and the socket write side have separate locks, so
//! sending never waits on the receive loop and vice versa.
//!
//! ## Module Organization
//!
//! - [`network`]: connection, receive loop, send path
//! - [`participants`]: the local mirror of remote participants
//! - [`input`]: local player movement on the bounded grid
//! - [`error`]: connection and send failures
//!
//! ## Collaborator Contract
//!
//! An input source calls `update_local_position(LOCAL_PLAYER_ID, x, y)` and
//! then `send_update(x, y)` for every accepted movement key. A renderer reads
//! the participant map once per frame through
//! [`network::RelayClient::with_participants`] and must not block while
//! holding it.
//!
//! ```rust,no_run
//! use client::input::{Direction, LocalPlayer};
//! use client::network::RelayClient;
//! use shared::LOCAL_PLAYER_ID;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RelayClient::connect("127.0.0.1:2323").await?;
//!     let mut player = LocalPlayer::new();
//!
//!     let position = player.step(Direction::Right);
//!     client.update_local_position(LOCAL_PLAYER_ID, position.x, position.y);
//!     client.send_update(position.x, position.y).await?;
//!
//!     client.with_participants(|map| {
//!         for participant in map.iter() {
//!             println!("{} at {:?}", participant.player_id, participant.position);
//!         }
//!     });
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod input;
pub mod network;
pub mod participants;
