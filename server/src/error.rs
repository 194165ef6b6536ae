//! Errors that end the relay.

use std::io;
use thiserror::Error;

/// Setup and listener failures. Per-session failures never surface here;
/// they are logged and only close the affected session.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind relay listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] io::Error),

    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_message() {
        let error = RelayError::Bind {
            addr: "127.0.0.1:2323".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };

        let message = error.to_string();
        assert!(message.contains("127.0.0.1:2323"));
        assert!(message.contains("address in use"));
    }

    #[test]
    fn test_error_source_is_preserved() {
        use std::error::Error as _;

        let error = RelayError::Accept(io::Error::new(io::ErrorKind::Other, "too many files"));
        let source = error.source().expect("accept error keeps its cause");
        assert_eq!(source.to_string(), "too many files");
    }
}
