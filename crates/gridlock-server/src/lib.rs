//! Gridlock production server.
//!
//! Production server implementation using plain TCP transport, Tokio for
//! async runtime, and system time with cryptographic RNG.
//!
//! # Architecture
//!
//! This crate provides production "glue" that wraps [`gridlock_core`]'s
//! action-based match logic with real I/O. The [`ServerDriver`] follows the
//! Sans-IO pattern (events in, actions out, no I/O), while [`Server`]
//! executes the actions over TCP using length-prefixed CBOR frames.
//!
//! The driver sits behind a single mutex, so every event - join, move, chat,
//! disconnect, across all connections and matches - is applied one at a
//! time. Broadcast recipients are resolved inside that critical section,
//! which is what makes the fan-out of a fully-applied state transition
//! atomic from the clients' point of view.
//!
//! # Components
//!
//! - [`ServerDriver`]: Action-based orchestrator (pure logic, no I/O)
//! - [`Server`]: Production runtime that executes `ServerDriver` actions
//! - [`TcpTransport`]: TCP listener wrapper
//! - [`SystemEnv`]: Production environment (real time, crypto RNG)
//! - [`ScoreReporter`]: Fire-and-forget win reporting seam

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod matchmaker;
mod registry;
mod scoreboard;
mod server_error;
mod system_env;
mod transport;

use std::{collections::HashMap, sync::Arc};

use bytes::BytesMut;
pub use driver::{LogLevel, ServerAction, ServerConfig as DriverConfig, ServerDriver, ServerEvent};
pub use error::ServerError;
use gridlock_core::Environment;
use gridlock_proto::{ClientMessage, ServerMessage, framing};
pub use matchmaker::Matchmaker;
pub use registry::{ConnectionRegistry, SessionInfo};
pub use scoreboard::{MemoryScoreboard, ScoreError, ScoreReporter};
pub use server_error::DriverError;
pub use system_env::SystemEnv;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::tcp::OwnedWriteHalf,
    sync::{RwLock, mpsc},
};
pub use transport::TcpTransport;

/// Shared state for all connections.
///
/// Each connection has a writer task owning the socket's write half; the
/// sender here queues outbound messages to it. Dropping a sender ends the
/// writer task, which shuts the socket down.
struct SharedState {
    /// Map of session ID to outbound message queue.
    senders: RwLock<HashMap<u64, mpsc::UnboundedSender<ServerMessage>>>,
    /// Score collaborator for win reporting.
    scoreboard: Arc<dyn ScoreReporter>,
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:5000")
    pub bind_address: String,
    /// Driver configuration (connection limits)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:5000".to_string(), driver: DriverConfig::default() }
    }
}

/// Production Gridlock server.
///
/// Wraps `ServerDriver` with TCP transport and system environment.
pub struct Server {
    /// The action-based server driver
    driver: ServerDriver<SystemEnv>,
    /// TCP listener
    transport: TcpTransport,
    /// Environment
    env: SystemEnv,
    /// Score collaborator
    scoreboard: Arc<dyn ScoreReporter>,
}

impl Server {
    /// Create and bind a new server with the in-memory scoreboard.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        Self::bind_with_scoreboard(config, Arc::new(MemoryScoreboard::new())).await
    }

    /// Create and bind a new server with a custom score collaborator.
    pub async fn bind_with_scoreboard(
        config: ServerRuntimeConfig,
        scoreboard: Arc<dyn ScoreReporter>,
    ) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let driver = ServerDriver::new(env.clone(), config.driver);
        let transport = TcpTransport::bind(&config.bind_address).await?;

        Ok(Self { driver, transport, env, scoreboard })
    }

    /// Run the server, accepting connections and processing frames.
    ///
    /// This method runs until the server is shut down or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.transport.local_addr()?);

        let env = self.env;
        let driver = Arc::new(tokio::sync::Mutex::new(self.driver));
        let shared = Arc::new(SharedState {
            senders: RwLock::new(HashMap::new()),
            scoreboard: Arc::clone(&self.scoreboard),
        });

        loop {
            match self.transport.accept().await {
                Ok((stream, peer)) => {
                    let driver = Arc::clone(&driver);
                    let shared = Arc::clone(&shared);
                    let env = env.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, driver, shared, env).await {
                            tracing::error!("Connection error: {}", e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Handle a single TCP connection: register it, pump frames through the
/// driver, tear it down when the socket closes.
async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer: std::net::SocketAddr,
    driver: Arc<tokio::sync::Mutex<ServerDriver<SystemEnv>>>,
    shared: Arc<SharedState>,
    env: SystemEnv,
) -> Result<(), ServerError> {
    let session_id = env.random_u64();

    tracing::debug!("New connection from {}: session {}", peer, session_id);

    let (mut read_half, write_half) = stream.into_split();

    let (sender, receiver) = mpsc::unbounded_channel();
    {
        let mut senders = shared.senders.write().await;
        senders.insert(session_id, sender);
    }
    tokio::spawn(writer_task(session_id, write_half, receiver));

    {
        let mut driver = driver.lock().await;
        let actions = driver.process_event(ServerEvent::ConnectionAccepted { session_id })?;
        execute_actions(actions, &shared).await;
    }

    loop {
        let mut prefix = [0u8; framing::PREFIX_SIZE];
        if read_half.read_exact(&mut prefix).await.is_err() {
            break;
        }

        let body_len = u32::from_be_bytes(prefix) as usize;
        if let Err(e) = framing::check_body_len(body_len) {
            tracing::warn!("Session {}: {}", session_id, e);
            break;
        }

        let mut body = BytesMut::zeroed(body_len);
        if let Err(e) = read_half.read_exact(&mut body).await {
            tracing::debug!("Session {} body read error: {}", session_id, e);
            break;
        }

        let message: ClientMessage = match framing::decode_body(&body) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Session {} frame decode error: {}", session_id, e);
                break;
            },
        };

        {
            let mut driver = driver.lock().await;
            match driver.process_event(ServerEvent::MessageReceived { session_id, message }) {
                Ok(actions) => execute_actions(actions, &shared).await,
                Err(e) => {
                    tracing::warn!("Session {} processing error: {}", session_id, e);
                    continue;
                },
            }
        }

        // A Leave closes the connection from our side; stop reading
        if !shared.senders.read().await.contains_key(&session_id) {
            break;
        }
    }

    {
        let mut senders = shared.senders.write().await;
        senders.remove(&session_id);
    }

    {
        let mut driver = driver.lock().await;
        let actions = driver.process_event(ServerEvent::ConnectionClosed {
            session_id,
            reason: "connection closed".to_string(),
        })?;
        execute_actions(actions, &shared).await;
    }

    Ok(())
}

/// Drain the outbound queue into the socket's write half.
///
/// Ends when the queue's sender is dropped, then shuts the socket down.
async fn writer_task(
    session_id: u64,
    mut write_half: OwnedWriteHalf,
    mut receiver: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = receiver.recv().await {
        let mut wire = BytesMut::new();
        if let Err(e) = framing::encode_frame(&message, &mut wire) {
            tracing::error!("Session {} encode error: {}", session_id, e);
            continue;
        }

        if let Err(e) = write_half.write_all(&wire).await {
            tracing::debug!("Session {} write failed: {}", session_id, e);
            break;
        }
    }

    let _ = write_half.shutdown().await;
}

/// Execute server actions.
///
/// Delivery is queue-and-forget: a full or closed peer never blocks the
/// driver critical section.
async fn execute_actions(actions: Vec<ServerAction>, shared: &Arc<SharedState>) {
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, message } => {
                let senders = shared.senders.read().await;
                match senders.get(&session_id) {
                    Some(sender) => {
                        if sender.send(message).is_err() {
                            tracing::debug!("SendToSession: session {} writer gone", session_id);
                        }
                    },
                    None => {
                        tracing::warn!("SendToSession: session {} not found", session_id);
                    },
                }
            },

            ServerAction::Broadcast { match_id, sessions, message } => {
                let senders = shared.senders.read().await;
                for session_id in sessions {
                    if let Some(sender) = senders.get(&session_id) {
                        if sender.send(message.clone()).is_err() {
                            tracing::debug!(
                                "Broadcast to match {}: session {} writer gone",
                                match_id,
                                session_id
                            );
                        }
                    }
                }
            },

            ServerAction::CloseConnection { session_id, reason } => {
                tracing::info!("Closing connection {}: {}", session_id, reason);
                let mut senders = shared.senders.write().await;
                senders.remove(&session_id);
            },

            ServerAction::ReportWin { name } => {
                let shared = Arc::clone(shared);
                tokio::spawn(async move {
                    match shared.scoreboard.record_win(&name).await {
                        Ok(score) => {
                            let update = ServerMessage::ScoreUpdated { name, score };
                            let senders = shared.senders.read().await;
                            for sender in senders.values() {
                                let _ = sender.send(update.clone());
                            }
                        },
                        Err(e) => {
                            tracing::warn!("Score report for {} failed: {}", name, e);
                        },
                    }
                });
            },

            ServerAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }
}
