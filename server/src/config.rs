//! Relay configuration.

use shared::{DEFAULT_PORT, MAX_CLIENTS};

/// Settings for starting a relay server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// `host:port` to listen on. Port 0 lets the OS pick one.
    pub bind_addr: String,
    /// Concurrent sessions admitted before connections are rejected.
    pub max_clients: usize,
}

impl RelayConfig {
    pub fn new(host: &str, port: u16, max_clients: usize) -> Self {
        Self {
            bind_addr: format!("{}:{}", host, port),
            max_clients,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", DEFAULT_PORT, MAX_CLIENTS)
    }
}
