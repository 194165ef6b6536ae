//! Server network layer: TCP accept loop, per-session handlers and broadcast fan-out
//!
//! Every accepted connection moves through `Pending → Admitted → Active →
//! Closed`. A pending connection is checked against the registry capacity by
//! the accept loop; if it is refused it receives the rejection line and is
//! closed on the spot. An admitted connection gets its own session task which
//! owns the read side of the socket and the registry entry until the peer
//! goes away or the relay shuts down.

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::registry::Registry;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::line_codec;
use shared::protocol::{decode_update, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;

type LineReader = FramedRead<OwnedReadHalf, LinesCodec>;
type LineWriter = FramedWrite<OwnedWriteHalf, LinesCodec>;

/// Registry shared between the accept loop and every session task
pub type SharedRegistry = Arc<Mutex<Registry<PeerHandle>>>;

/// Write side of one connection
///
/// Cloned into the registry so other sessions can broadcast to it. Writes are
/// serialised by a per-connection lock that is never held together with the
/// registry lock.
#[derive(Clone)]
pub struct PeerHandle {
    addr: SocketAddr,
    writer: Arc<Mutex<LineWriter>>,
}

impl PeerHandle {
    fn new(addr: SocketAddr, write_half: OwnedWriteHalf) -> Self {
        Self {
            addr,
            writer: Arc::new(Mutex::new(FramedWrite::new(write_half, line_codec()))),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Writes one line and flushes it.
    pub async fn send_line(&self, line: &str) -> Result<(), LinesCodecError> {
        let mut writer = self.writer.lock().await;
        writer.send(line).await
    }

    /// Flushes and shuts down the write side of the socket.
    pub async fn close(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = SinkExt::<&str>::close(&mut *writer).await {
            debug!("Error closing connection to {}: {}", self.addr, e);
        }
    }
}

/// Relay server bound to a listening socket
pub struct RelayServer {
    listener: TcpListener,
    registry: SharedRegistry,
    local_addr: SocketAddr,
}

impl RelayServer {
    /// Binds the listener. Failure here is fatal; nothing is retried.
    pub async fn bind(config: &RelayConfig) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(RelayError::LocalAddr)?;

        info!(
            "Relay listening on {} (max {} clients)",
            local_addr, config.max_clients
        );

        Ok(Self {
            listener,
            registry: Arc::new(Mutex::new(Registry::new(config.max_clients))),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Runs the relay on a background task and returns a handle to stop it.
    pub fn spawn(self) -> RelayHandle {
        let shutdown = CancellationToken::new();
        let registry = self.registry();
        let local_addr = self.local_addr;
        let task = tokio::spawn(self.run(shutdown.clone()));

        RelayHandle {
            local_addr,
            registry,
            shutdown,
            task,
        }
    }

    /// Accept loop
    ///
    /// Runs until `shutdown` is cancelled or `accept` fails. Either way every
    /// session task is cancelled and joined, and whatever is left in the
    /// registry is drained and closed before returning.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), RelayError> {
        let mut sessions = JoinSet::new();

        let result = loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break Ok(()),

                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        error!("Session task failed: {}", e);
                    }
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr, &mut sessions, &shutdown).await,
                    Err(e) => {
                        error!("Accept failed: {}", e);
                        break Err(RelayError::Accept(e));
                    }
                },
            }
        };

        shutdown.cancel();
        while let Some(joined) = sessions.join_next().await {
            if let Err(e) = joined {
                error!("Session task failed during shutdown: {}", e);
            }
        }

        let leftovers = self.registry.lock().await.drain();
        for session in leftovers {
            warn!("Closing orphaned session for client {}", session.client_id);
            session.handle.close().await;
        }

        info!("Relay on {} stopped", self.local_addr);
        result
    }

    /// Checks a pending connection against capacity and starts its session.
    async fn admit(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        sessions: &mut JoinSet<()>,
        shutdown: &CancellationToken,
    ) {
        debug!("Connection from {} pending admission", addr);

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle for {}: {}", addr, e);
        }

        let (read_half, write_half) = stream.into_split();
        let peer = PeerHandle::new(addr, write_half);

        // Held until the greeting is written so no broadcast can overtake it.
        let mut writer = peer.writer.lock().await;
        let admitted = self.registry.lock().await.admit(peer.clone());

        match admitted {
            Ok(client_id) => {
                let welcome = ServerMessage::Welcome { client_id }.encode();
                let greeted = writer.send(welcome.as_str()).await;
                drop(writer);

                if let Err(e) = greeted {
                    warn!("Could not greet client {}: {}", client_id, e);
                    self.registry.lock().await.remove(client_id);
                    peer.close().await;
                    return;
                }

                let session = SessionTask {
                    client_id,
                    peer,
                    reader: FramedRead::new(read_half, line_codec()),
                    registry: Arc::clone(&self.registry),
                    shutdown: shutdown.clone(),
                };
                sessions.spawn(session.run());
            }
            Err(e) => {
                warn!("Rejecting connection from {}: {}", addr, e);
                let rejection = ServerMessage::Rejected.encode();
                if let Err(e) = writer.send(rejection.as_str()).await {
                    debug!("Could not deliver rejection to {}: {}", addr, e);
                }
                drop(writer);
                peer.close().await;
            }
        }
    }
}

/// Handle to a relay running in the background
pub struct RelayHandle {
    local_addr: SocketAddr,
    registry: SharedRegistry,
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), RelayError>>,
}

impl RelayHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Number of sessions currently admitted.
    pub async fn session_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Resolves once the relay has begun stopping, for whatever reason.
    pub async fn stopped(&self) {
        self.shutdown.cancelled().await;
    }

    /// Stops accepting, closes every session and waits for the relay to finish.
    pub async fn shutdown(self) -> Result<(), RelayError> {
        self.shutdown.cancel();
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                error!("Relay task failed: {}", e);
                Ok(())
            }
        }
    }
}

/// One admitted connection
struct SessionTask {
    client_id: u32,
    peer: PeerHandle,
    reader: LineReader,
    registry: SharedRegistry,
    shutdown: CancellationToken,
}

impl SessionTask {
    async fn run(mut self) {
        let client_id = self.client_id;
        info!("Client {} connected from {}", client_id, self.peer.addr());

        let mut active = true;
        while active {
            let frame = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("Closing client {} for relay shutdown", client_id);
                    break;
                }
                frame = self.reader.next() => frame,
            };

            active = match frame {
                Some(Ok(line)) => self.relay_update(&line).await,
                Some(Err(e)) => {
                    warn!("Read error from client {}: {}", client_id, e);
                    false
                }
                None => {
                    info!("Client {} disconnected", client_id);
                    false
                }
            };
        }

        self.registry.lock().await.remove(client_id);
        self.peer.close().await;
        debug!("Session for client {} closed", client_id);
    }

    /// Applies one update and fans it out to every other session
    ///
    /// Returns false if this session is no longer registered.
    async fn relay_update(&self, line: &str) -> bool {
        let client_id = self.client_id;
        let patch = decode_update(line);
        if patch.is_empty() {
            debug!("Client {} sent unparseable update {:?}", client_id, line);
        }

        let (position, targets) = {
            let mut registry = self.registry.lock().await;
            let Some(prior) = registry.position(client_id) else {
                return false;
            };
            let position = patch.apply(prior);
            registry.update_position(client_id, position.x, position.y);
            (position, registry.snapshot_others(client_id))
        };

        let broadcast = ServerMessage::Broadcast {
            client_id,
            position,
        }
        .encode();

        let started = Instant::now();
        let mut delivered = 0;
        for (peer, peer_id) in &targets {
            match peer.send_line(&broadcast).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Failed to relay update from client {} to client {}: {}",
                    client_id, peer_id, e
                ),
            }
        }

        debug!(
            "Relayed client {} -> ({}, {}) to {}/{} peers in {:?}",
            client_id,
            position.x,
            position.y,
            delivered,
            targets.len(),
            started.elapsed()
        );

        true
    }
}
