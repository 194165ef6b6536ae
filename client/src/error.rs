//! Client-side errors.

use std::io;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not resolve relay address {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("no address for {addr} accepted a connection ({attempts} tried)")]
    Unreachable { addr: String, attempts: usize },

    #[error("connection to the relay is closed")]
    Disconnected,

    #[error("failed to send update: {0}")]
    Send(#[from] LinesCodecError),
}
