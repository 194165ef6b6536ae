//! Relay client: one persistent connection, a background receive loop and a
//! locked send path

use crate::error::ClientError;
use crate::participants::{ParticipantMap, RemoteParticipant, SharedParticipants};
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::protocol::{decode_server_line, ClientMessage, ServerLine};
use shared::{line_codec, Position, LOCAL_PLAYER_ID};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::io::AsyncRead;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

type LineWriter = FramedWrite<OwnedWriteHalf, LinesCodec>;

/// State written by the receive loop and read by the caller
#[derive(Debug, Default)]
struct ClientShared {
    participants: SharedParticipants,
    assigned_id: OnceLock<u32>,
    connected: AtomicBool,
}

/// Why the receive loop stopped
#[derive(Debug)]
enum ReceiveEnd {
    Closed,
    Failed(LinesCodecError),
}

pub struct RelayClient {
    server_addr: SocketAddr,
    shared: Arc<ClientShared>,
    writer: Arc<Mutex<LineWriter>>,
    receive_task: Option<JoinHandle<()>>,
}

impl RelayClient {
    /// Connects to the relay at `address` (`host:port`)
    ///
    /// Every resolved address is tried in order and the first one that
    /// accepts wins. If none does, the call fails; there is no retry.
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        let candidates: Vec<SocketAddr> = lookup_host(address)
            .await
            .map_err(|source| ClientError::Resolve {
                addr: address.to_string(),
                source,
            })?
            .collect();

        for candidate in &candidates {
            match TcpStream::connect(candidate).await {
                Ok(stream) => {
                    info!("Connected to relay at {}", candidate);
                    return Ok(Self::start(stream, *candidate));
                }
                Err(e) => warn!("Could not connect to {}: {}", candidate, e),
            }
        }

        error!("Unable to connect to relay at {}", address);
        Err(ClientError::Unreachable {
            addr: address.to_string(),
            attempts: candidates.len(),
        })
    }

    fn start(stream: TcpStream, server_addr: SocketAddr) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle: {}", e);
        }

        let (read_half, write_half) = stream.into_split();
        let shared = Arc::new(ClientShared {
            connected: AtomicBool::new(true),
            ..ClientShared::default()
        });
        let writer = Arc::new(Mutex::new(FramedWrite::new(write_half, line_codec())));

        let receive_task = {
            let shared = Arc::clone(&shared);
            let writer = Arc::clone(&writer);
            let reader = FramedRead::new(read_half, line_codec());

            tokio::spawn(async move {
                let end = receive_loop(reader, &shared).await;
                shared.connected.store(false, Ordering::SeqCst);

                let mut writer = writer.lock().await;
                if let Err(e) = SinkExt::<&str>::close(&mut *writer).await {
                    debug!("Error closing relay connection: {}", e);
                }

                match end {
                    ReceiveEnd::Closed => info!("Connection closed by relay"),
                    ReceiveEnd::Failed(e) => error!("Receive from relay failed: {}", e),
                }
            })
        };

        Self {
            server_addr,
            shared,
            writer,
            receive_task: Some(receive_task),
        }
    }

    /// Sends our new position to the relay
    ///
    /// Writes are serialised by their own lock, independent of the
    /// participant map, so a send never waits on the receive loop.
    pub async fn send_update(&self, x: i32, y: i32) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::Disconnected);
        }

        let line = ClientMessage::Update(Position::new(x, y)).encode();
        let mut writer = self.writer.lock().await;
        writer.send(line).await.map_err(|e| {
            error!("Failed to send update: {}", e);
            ClientError::Send(e)
        })
    }

    /// Records a position in the local mirror without waiting for the relay.
    pub fn update_local_position(&self, player_id: u32, x: i32, y: i32) {
        self.shared
            .participants
            .lock()
            .set_position(player_id, Position::new(x, y));
    }

    /// Copy of every known participant, ordered by id.
    pub fn participants(&self) -> Vec<RemoteParticipant> {
        self.shared.participants.lock().snapshot()
    }

    /// Runs `f` with the participant map locked
    ///
    /// Meant for a per-frame renderer. `f` must not block.
    pub fn with_participants<R>(&self, f: impl FnOnce(&ParticipantMap) -> R) -> R {
        let map = self.shared.participants.lock();
        f(&*map)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Id the relay assigned to this connection, once its greeting arrived.
    pub fn assigned_id(&self) -> Option<u32> {
        self.shared.assigned_id.get().copied()
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Closes the connection and stops the receive loop.
    pub async fn disconnect(mut self) {
        self.shared.connected.store(false, Ordering::SeqCst);

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = SinkExt::<&str>::close(&mut *writer).await {
                debug!("Error closing relay connection: {}", e);
            }
        }

        if let Some(task) = self.receive_task.take() {
            task.abort();
            let _ = task.await;
        }
        info!("Disconnected from relay at {}", self.server_addr);
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        if let Some(task) = self.receive_task.take() {
            task.abort();
        }
    }
}

/// Reads relay lines until the stream ends or fails.
async fn receive_loop<R>(mut reader: FramedRead<R, LinesCodec>, shared: &ClientShared) -> ReceiveEnd
where
    R: AsyncRead + Unpin,
{
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(line) => handle_line(&line, shared),
            Err(e) => return ReceiveEnd::Failed(e),
        }
    }
    ReceiveEnd::Closed
}

fn handle_line(line: &str, shared: &ClientShared) {
    debug!("Message from relay: {}", line);

    match decode_server_line(line) {
        ServerLine::Broadcast { client_id, .. } if client_id == LOCAL_PLAYER_ID => {
            warn!("Ignoring broadcast for reserved id {}", LOCAL_PLAYER_ID);
        }
        ServerLine::Broadcast { client_id, patch } => {
            shared.participants.lock().apply_broadcast(client_id, patch);
        }
        ServerLine::Welcome { client_id } => {
            if shared.assigned_id.set(client_id).is_ok() {
                info!("Relay assigned client id {}", client_id);
            } else {
                warn!("Ignoring repeated greeting for client id {}", client_id);
            }
        }
        ServerLine::Rejected => warn!("Relay is full, connection rejected"),
        ServerLine::Notice(text) => info!("Relay: {}", text),
    }
}
