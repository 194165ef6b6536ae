//! Session registry for the relay server
//!
//! This module tracks the sessions the relay has admitted, including:
//! - Capacity enforcement at admission time
//! - Client id allocation (sequential, never reused within one run)
//! - The last known position of every session
//! - Fan-out target snapshots for broadcasting
//!
//! The registry itself holds no lock. The server wraps it in a single mutex
//! and performs every operation under that lock, releasing it before any
//! network write. Handles are generic so the bookkeeping can be exercised
//! without sockets.

use log::info;
use shared::Position;
use std::collections::HashMap;
use thiserror::Error;

/// Reasons a connection can be refused admission
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("relay is full ({max_clients} sessions active)")]
    CapacityExceeded { max_clients: usize },
}

/// Server-side record of one admitted connection
#[derive(Debug, Clone)]
pub struct Session<H> {
    /// Sequential id assigned at admission
    pub client_id: u32,
    /// Write side of the connection used for broadcasts
    pub handle: H,
    /// Last position reported by this client
    pub position: Position,
}

/// Authoritative set of active sessions
///
/// Ids start at 1 and increase for every admitted connection. An id is
/// never handed out again after its session is removed, so a late update
/// for a departed client can be recognised and dropped.
pub struct Registry<H> {
    sessions: HashMap<u32, Session<H>>,
    next_client_id: u32,
    max_clients: usize,
}

impl<H: Clone> Registry<H> {
    /// Creates an empty registry that admits at most `max_clients` sessions.
    pub fn new(max_clients: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to admit a new connection
    ///
    /// Fails when the registry is already at capacity. On success the new
    /// session starts at the origin and its id is returned.
    pub fn admit(&mut self, handle: H) -> Result<u32, AdmissionError> {
        if self.sessions.len() >= self.max_clients {
            return Err(AdmissionError::CapacityExceeded {
                max_clients: self.max_clients,
            });
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        self.sessions.insert(
            client_id,
            Session {
                client_id,
                handle,
                position: Position::default(),
            },
        );
        info!(
            "Client {} admitted ({}/{} sessions)",
            client_id,
            self.sessions.len(),
            self.max_clients
        );

        Ok(client_id)
    }

    /// Overwrites the stored position. Does nothing if the session is gone.
    pub fn update_position(&mut self, client_id: u32, x: i32, y: i32) {
        if let Some(session) = self.sessions.get_mut(&client_id) {
            session.position = Position::new(x, y);
        }
    }

    /// Removes a session. Returns false if it had already been removed.
    pub fn remove(&mut self, client_id: u32) -> bool {
        if self.sessions.remove(&client_id).is_some() {
            info!("Client {} removed from registry", client_id);
            true
        } else {
            false
        }
    }

    /// Copies out the handles of every session except `excluding`
    ///
    /// The caller releases the registry lock before writing to any of the
    /// returned handles, so a slow or broken peer never stalls the registry.
    pub fn snapshot_others(&self, excluding: u32) -> Vec<(H, u32)> {
        self.sessions
            .values()
            .filter(|session| session.client_id != excluding)
            .map(|session| (session.handle.clone(), session.client_id))
            .collect()
    }

    /// Last known position of a session, if it is still registered.
    pub fn position(&self, client_id: u32) -> Option<Position> {
        self.sessions.get(&client_id).map(|session| session.position)
    }

    /// Removes every session and hands them back for teardown.
    pub fn drain(&mut self) -> Vec<Session<H>> {
        self.sessions.drain().map(|(_, session)| session).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_clients
    }
}
