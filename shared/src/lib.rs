//! # Shared Relay Protocol
//!
//! Constants and wire types used by both the relay server and its clients.
//!
//! Every message on the wire is a single line of ASCII text holding
//! space-separated decimal integers, terminated by `\n`:
//!
//! - **Update** (client → server): `"<x> <y>"`
//! - **Broadcast** (server → client): `"<client_id> <x> <y>"`
//!
//! The server also writes a greeting when a session is admitted and a fixed
//! rejection line when the relay is full. See [`protocol`] for encoding and
//! the tolerant decoders.

pub mod protocol;

use tokio_util::codec::LinesCodec;

/// Well-known relay port.
pub const DEFAULT_PORT: u16 = 2323;
/// Host the client dials when none is given.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Maximum number of concurrent sessions the relay admits.
pub const MAX_CLIENTS: usize = 2;
/// Maximum length of a single line on the wire, terminator excluded.
pub const MAX_MESSAGE_LEN: usize = 256;

pub const MIN_X: i32 = 0;
pub const MAX_X: i32 = 24;
pub const MIN_Y: i32 = 0;
pub const MAX_Y: i32 = 18;

/// Participant id under which a client mirrors its own position.
pub const LOCAL_PLAYER_ID: u32 = 0;

/// Sent to a connection that arrives while the relay is at capacity.
pub const REJECTION_MESSAGE: &str = "Server full. Please wait.";

/// A cell on the shared grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamps the position into `[MIN_X, MAX_X] × [MIN_Y, MAX_Y]`.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(MIN_X, MAX_X),
            y: self.y.clamp(MIN_Y, MAX_Y),
        }
    }
}

/// Coordinates recovered from a possibly malformed message.
///
/// A field is `None` when its token was missing or could not be parsed. Such
/// fields keep whatever value the receiver already had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionPatch {
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl PositionPatch {
    /// Overlays the parsed fields onto `prior`.
    pub fn apply(self, prior: Position) -> Position {
        Position {
            x: self.x.unwrap_or(prior.x),
            y: self.y.unwrap_or(prior.y),
        }
    }

    /// True when nothing could be parsed.
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none()
    }
}

impl From<Position> for PositionPatch {
    fn from(position: Position) -> Self {
        Self {
            x: Some(position.x),
            y: Some(position.y),
        }
    }
}

/// Line codec used on both ends of a relay connection.
///
/// Lines longer than [`MAX_MESSAGE_LEN`] are rejected by the codec.
pub fn line_codec() -> LinesCodec {
    LinesCodec::new_with_max_length(MAX_MESSAGE_LEN)
}
