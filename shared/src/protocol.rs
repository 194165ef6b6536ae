//! Encoding and decoding of relay messages.
//!
//! Encoders always produce canonical text: ASCII decimal integers joined by a
//! single space. Decoders never fail. Tokens are consumed left to right and
//! parsing stops at the first token that is not an integer; every field from
//! that point on is reported as missing so the receiver keeps its prior value.
//! A token is an integer only as a whole: `"1.5 6"` yields no fields at all,
//! rather than reading `1` from the front of `1.5`.

use crate::{Position, PositionPatch, REJECTION_MESSAGE};
use std::str::{FromStr, SplitWhitespace};

const WELCOME_PREFIX: &str = "Client ";
const WELCOME_SUFFIX: &str = " connected.";

/// Messages a client writes to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    Update(Position),
}

impl ClientMessage {
    pub fn encode(&self) -> String {
        match self {
            ClientMessage::Update(position) => format!("{} {}", position.x, position.y),
        }
    }
}

/// Messages the relay writes to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Another participant moved.
    Broadcast { client_id: u32, position: Position },
    /// Greeting sent once a connection has been admitted.
    Welcome { client_id: u32 },
    /// The relay is full; the connection is closed right after.
    Rejected,
}

impl ServerMessage {
    pub fn encode(&self) -> String {
        match self {
            ServerMessage::Broadcast {
                client_id,
                position,
            } => format!("{} {} {}", client_id, position.x, position.y),
            ServerMessage::Welcome { client_id } => {
                format!("{}{}{}", WELCOME_PREFIX, client_id, WELCOME_SUFFIX)
            }
            ServerMessage::Rejected => REJECTION_MESSAGE.to_string(),
        }
    }
}

/// A decoded line received from the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    Broadcast {
        client_id: u32,
        patch: PositionPatch,
    },
    Welcome {
        client_id: u32,
    },
    Rejected,
    /// Anything else the server said, trimmed.
    Notice(String),
}

/// Sequential integer reader that stops at the first bad token.
struct Fields<'a> {
    tokens: SplitWhitespace<'a>,
    stopped: bool,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            tokens: line.split_whitespace(),
            stopped: false,
        }
    }

    fn next_int<T: FromStr>(&mut self) -> Option<T> {
        if self.stopped {
            return None;
        }
        let value = self.tokens.next().and_then(|token| token.parse().ok());
        if value.is_none() {
            self.stopped = true;
        }
        value
    }

    fn next_patch(&mut self) -> PositionPatch {
        let x = self.next_int();
        let y = self.next_int();
        PositionPatch { x, y }
    }
}

/// Decodes an Update line into whatever coordinates could be recovered.
pub fn decode_update(line: &str) -> PositionPatch {
    Fields::new(line).next_patch()
}

/// Decodes a line written by the relay.
///
/// A line whose first token is a client id is a Broadcast, even when its
/// coordinates are damaged.
pub fn decode_server_line(line: &str) -> ServerLine {
    let trimmed = line.trim();

    if trimmed == REJECTION_MESSAGE {
        return ServerLine::Rejected;
    }

    if let Some(client_id) = parse_welcome(trimmed) {
        return ServerLine::Welcome { client_id };
    }

    let mut fields = Fields::new(trimmed);
    match fields.next_int::<u32>() {
        Some(client_id) => ServerLine::Broadcast {
            client_id,
            patch: fields.next_patch(),
        },
        None => ServerLine::Notice(trimmed.to_string()),
    }
}

fn parse_welcome(line: &str) -> Option<u32> {
    line.strip_prefix(WELCOME_PREFIX)?
        .strip_suffix(WELCOME_SUFFIX)?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_update() {
        let message = ClientMessage::Update(Position::new(3, 5));
        assert_eq!(message.encode(), "3 5");

        let negative = ClientMessage::Update(Position::new(-12, 0));
        assert_eq!(negative.encode(), "-12 0");
    }

    #[test]
    fn test_encode_server_messages() {
        let broadcast = ServerMessage::Broadcast {
            client_id: 1,
            position: Position::new(4, 4),
        };
        assert_eq!(broadcast.encode(), "1 4 4");

        let welcome = ServerMessage::Welcome { client_id: 7 };
        assert_eq!(welcome.encode(), "Client 7 connected.");

        assert_eq!(ServerMessage::Rejected.encode(), REJECTION_MESSAGE);
    }

    #[test]
    fn test_decode_update_well_formed() {
        let patch = decode_update("3 5");
        assert_eq!(patch.apply(Position::default()), Position::new(3, 5));

        let padded = decode_update("  -1\t22  ");
        assert_eq!(padded.apply(Position::default()), Position::new(-1, 22));
    }

    #[test]
    fn test_decode_update_partial() {
        let prior = Position::new(9, 9);

        assert_eq!(decode_update("4").apply(prior), Position::new(4, 9));
        assert_eq!(decode_update("4 abc").apply(prior), Position::new(4, 9));
        assert_eq!(decode_update("").apply(prior), prior);
        assert!(decode_update("   ").is_empty());
    }

    #[test]
    fn test_decode_update_stops_at_first_bad_token() {
        let prior = Position::new(2, 2);

        // A bad first token hides the valid second one.
        assert_eq!(decode_update("abc 5").apply(prior), prior);
        assert_eq!(decode_update("1.5 6").apply(prior), prior);
    }

    #[test]
    fn test_decode_update_rejects_integer_prefix() {
        let prior = Position::new(4, 4);

        assert!(decode_update("1.5 6").is_empty());
        assert_eq!(decode_update("1.5 6").apply(prior), prior);
        assert_eq!(decode_update("2 3px").apply(prior), Position::new(2, 4));
    }

    #[test]
    fn test_decode_update_ignores_trailing_tokens() {
        let patch = decode_update("1 2 3 4");
        assert_eq!(patch.apply(Position::default()), Position::new(1, 2));
    }

    #[test]
    fn test_decode_update_out_of_range() {
        let prior = Position::new(1, 1);
        let patch = decode_update("99999999999 3");
        assert_eq!(patch.apply(prior), prior);
    }

    #[test]
    fn test_update_roundtrip_extremes() {
        for position in [
            Position::new(0, 0),
            Position::new(i32::MIN, i32::MAX),
            Position::new(i32::MAX, i32::MIN),
            Position::new(crate::MAX_X, crate::MAX_Y),
        ] {
            let encoded = ClientMessage::Update(position).encode();
            assert!(encoded.len() <= crate::MAX_MESSAGE_LEN);
            let decoded = decode_update(&encoded).apply(Position::new(77, 77));
            assert_eq!(decoded, position);
        }
    }

    #[test]
    fn test_broadcast_roundtrip() {
        let message = ServerMessage::Broadcast {
            client_id: u32::MAX,
            position: Position::new(i32::MIN, -1),
        };

        match decode_server_line(&message.encode()) {
            ServerLine::Broadcast { client_id, patch } => {
                assert_eq!(client_id, u32::MAX);
                assert_eq!(patch.apply(Position::default()), Position::new(i32::MIN, -1));
            }
            other => panic!("Unexpected line: {:?}", other),
        }
    }

    #[test]
    fn test_decode_broadcast_partial() {
        match decode_server_line("2 10") {
            ServerLine::Broadcast { client_id, patch } => {
                assert_eq!(client_id, 2);
                assert_eq!(patch.x, Some(10));
                assert_eq!(patch.y, None);
            }
            other => panic!("Unexpected line: {:?}", other),
        }

        match decode_server_line("3") {
            ServerLine::Broadcast { client_id, patch } => {
                assert_eq!(client_id, 3);
                assert!(patch.is_empty());
            }
            other => panic!("Unexpected line: {:?}", other),
        }
    }

    #[test]
    fn test_decode_welcome_and_rejection() {
        assert_eq!(
            decode_server_line("Client 12 connected."),
            ServerLine::Welcome { client_id: 12 }
        );
        assert_eq!(
            decode_server_line(&format!("{}\r", REJECTION_MESSAGE)),
            ServerLine::Rejected
        );
    }

    #[test]
    fn test_decode_notice() {
        assert_eq!(
            decode_server_line(" maintenance soon "),
            ServerLine::Notice("maintenance soon".to_string())
        );
        assert_eq!(
            decode_server_line("-1 3 4"),
            ServerLine::Notice("-1 3 4".to_string())
        );
        assert_eq!(
            decode_server_line("Client x connected."),
            ServerLine::Notice("Client x connected.".to_string())
        );
    }
}
