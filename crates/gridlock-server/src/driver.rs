//! Server driver.
//!
//! Ties together the connection registry (session-to-match mapping) and the
//! matchmaker (match allocation + turn coordination). The driver is the
//! single serialization point: the runtime holds it behind one mutex, so all
//! mutating events - for every connection and every match - are applied one
//! at a time, and broadcast recipients are resolved against fully-applied
//! state (no torn reads of a half-applied move).
//!
//! Sans-IO: events in, actions out. The runtime executes the actions.

use gridlock_core::{Environment, MatchEvent, MatchPhase};
use gridlock_proto::{ClientMessage, ServerMessage};

use crate::{
    matchmaker::Matchmaker,
    registry::{ConnectionRegistry, SessionInfo},
    server_error::DriverError,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_connections: 10_000 }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the external runtime (production or tests).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted.
    ConnectionAccepted {
        /// Unique connection ID assigned by the runtime.
        session_id: u64,
    },

    /// A message was received from a connection.
    MessageReceived {
        /// Connection that sent the message.
        session_id: u64,
        /// The received message.
        message: ClientMessage,
    },

    /// A connection was closed (by peer or error).
    ConnectionClosed {
        /// Connection that was closed.
        session_id: u64,
        /// Reason for closure.
        reason: String,
    },
}

/// Actions that the server driver produces.
///
/// These are executed by runtime-specific code.
#[derive(Debug, Clone)]
pub enum ServerAction {
    /// Send a message to a specific session.
    SendToSession {
        /// Target session ID.
        session_id: u64,
        /// Message to send.
        message: ServerMessage,
    },

    /// Fan a message out to the sessions of one match.
    ///
    /// Recipients are resolved under the driver lock at processing time, so
    /// a match that resets in the same event still delivers its conclusion
    /// notices to the participants it had.
    Broadcast {
        /// Match the message belongs to (logging/diagnostics).
        match_id: u64,
        /// Resolved recipient sessions.
        sessions: Vec<u64>,
        /// Message to fan out.
        message: ServerMessage,
    },

    /// Close a connection.
    CloseConnection {
        /// Session to close.
        session_id: u64,
        /// Reason for closure.
        reason: String,
    },

    /// Report a win to the score collaborator, fire-and-forget.
    ///
    /// Failure is logged and never rolls back or gates the `GameOver`
    /// notification already queued before this action.
    ReportWin {
        /// Winning player's display name.
        name: String,
    },

    /// Log a message (for debugging/monitoring).
    Log {
        /// Log level.
        level: LogLevel,
        /// Message to log.
        message: String,
    },
}

/// Log levels for server actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational message.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

/// Action-based server driver.
///
/// Orchestrates connection bookkeeping, matchmaking, and notification
/// fan-out.
pub struct ServerDriver<E>
where
    E: Environment,
{
    /// Session/match registry.
    registry: ConnectionRegistry,
    /// Match allocation and coordination.
    matchmaker: Matchmaker<E::Instant>,
    /// Environment (time, RNG).
    env: E,
    /// Server configuration.
    config: ServerConfig,
}

impl<E> ServerDriver<E>
where
    E: Environment,
{
    /// Create a new server driver.
    pub fn new(env: E, config: ServerConfig) -> Self {
        Self { registry: ConnectionRegistry::new(), matchmaker: Matchmaker::new(), env, config }
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, DriverError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id } => {
                self.handle_connection_accepted(session_id)
            },
            ServerEvent::MessageReceived { session_id, message } => {
                self.handle_message_received(session_id, message)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                Ok(self.teardown_session(session_id, &reason))
            },
        }
    }

    /// Handle a new connection being accepted.
    fn handle_connection_accepted(
        &mut self,
        session_id: u64,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if self.registry.session_count() >= self.config.max_connections {
            return Ok(vec![ServerAction::CloseConnection {
                session_id,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        if !self.registry.register_session(session_id, SessionInfo::new()) {
            return Err(DriverError::SessionAlreadyExists(session_id));
        }

        Ok(vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("connection accepted, session_id={session_id}"),
        }])
    }

    /// Handle a message received from a connection.
    fn handle_message_received(
        &mut self,
        session_id: u64,
        message: ClientMessage,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if !self.registry.has_session(session_id) {
            return Err(DriverError::SessionNotFound(session_id));
        }

        match message {
            ClientMessage::Join { name, match_id } => {
                Ok(self.handle_join(session_id, &name, match_id))
            },

            ClientMessage::Move { cell, mark } => {
                // NotInSession: a move without a match is silently dropped
                let Some(match_id) = self.registry.match_for_session(session_id) else {
                    return Ok(vec![ServerAction::Log {
                        level: LogLevel::Debug,
                        message: format!("move from session {session_id} with no match ignored"),
                    }]);
                };

                let events = self.matchmaker.submit_move(match_id, mark, cell);
                let mut actions = self.convert_match_events(match_id, events);
                actions.extend(self.conclude_if_reset(match_id));
                Ok(actions)
            },

            ClientMessage::Chat { text } => {
                let Some(match_id) = self.registry.match_for_session(session_id) else {
                    return Ok(vec![ServerAction::Log {
                        level: LogLevel::Debug,
                        message: format!("chat from session {session_id} with no match ignored"),
                    }]);
                };

                let events = self.matchmaker.chat(match_id, session_id, &text);
                Ok(self.convert_match_events(match_id, events))
            },

            ClientMessage::Leave => {
                let mut actions = self.teardown_session(session_id, "client left");
                actions.push(ServerAction::CloseConnection {
                    session_id,
                    reason: "client left".to_string(),
                });
                Ok(actions)
            },
        }
    }

    /// Handle a join request.
    fn handle_join(
        &mut self,
        session_id: u64,
        name: &str,
        prefer: Option<u64>,
    ) -> Vec<ServerAction> {
        // Precondition: connection not already in an active match
        if let Some(current) = self.registry.match_for_session(session_id) {
            return vec![ServerAction::Log {
                level: LogLevel::Warn,
                message: format!(
                    "join from session {session_id} ignored: already in match {current}"
                ),
            }];
        }

        let (match_id, events) = self.matchmaker.join(session_id, name, prefer, &self.env);

        // Subscribe only if the join actually seated the session (a full
        // match rejects without seating)
        let mut actions = Vec::new();
        if self.matchmaker.is_participant(match_id, session_id) {
            self.registry.join_match(session_id, match_id);
            if let Some(info) = self.registry.session_mut(session_id) {
                info.name = Some(name.to_string());
            }

            actions.push(ServerAction::Log {
                level: LogLevel::Info,
                message: format!("session {session_id} ({name}) joined match {match_id}"),
            });
        }

        actions.extend(self.convert_match_events(match_id, events));
        actions
    }

    /// Unregister a session and tear down its match.
    ///
    /// Tolerant of unknown sessions: a `Leave` followed by the connection
    /// closing produces two teardown events, the second a no-op.
    fn teardown_session(&mut self, session_id: u64, reason: &str) -> Vec<ServerAction> {
        let Some((_info, match_id)) = self.registry.unregister_session(session_id) else {
            return Vec::new();
        };

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Info,
            message: format!("connection {session_id} closed: {reason}"),
        }];

        if let Some(match_id) = match_id {
            let events = self.matchmaker.handle_disconnect(match_id, session_id);
            actions.extend(self.convert_match_events(match_id, events));
            actions.extend(self.conclude_if_reset(match_id));
        }

        actions
    }

    /// After a match has reset to `Empty`, drop it and free its sessions.
    ///
    /// Runs after event conversion so the conclusion notices were resolved
    /// against the pre-reset membership.
    fn conclude_if_reset(&mut self, match_id: u64) -> Vec<ServerAction> {
        if self.matchmaker.phase(match_id) != Some(MatchPhase::Empty) {
            return Vec::new();
        }

        let freed = self.registry.clear_match(match_id);
        self.matchmaker.remove_if_empty(match_id);

        vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("match {match_id} concluded, {freed} sessions freed"),
        }]
    }

    /// Convert match events to server actions, resolving broadcast
    /// recipients against the current registry.
    fn convert_match_events(
        &self,
        match_id: u64,
        events: Vec<MatchEvent>,
    ) -> Vec<ServerAction> {
        events
            .into_iter()
            .map(|event| match event {
                MatchEvent::Unicast { session_id, message } => {
                    ServerAction::SendToSession { session_id, message }
                },
                MatchEvent::Broadcast { message } => {
                    let sessions: Vec<u64> = self.registry.sessions_in_match(match_id).collect();
                    ServerAction::Broadcast { match_id, sessions, message }
                },
                MatchEvent::ReportWin { name } => ServerAction::ReportWin { name },
            })
            .collect()
    }

    /// All sessions that are members of a match.
    pub fn sessions_in_match(&self, match_id: u64) -> impl Iterator<Item = u64> + '_ {
        self.registry.sessions_in_match(match_id)
    }

    /// The match a session belongs to, if any.
    #[must_use]
    pub fn match_for_session(&self, session_id: u64) -> Option<u64> {
        self.registry.match_for_session(session_id)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.registry.session_count()
    }

    /// Number of live matches.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.matchmaker.match_count()
    }

    /// Match exists.
    #[must_use]
    pub fn has_match(&self, match_id: u64) -> bool {
        self.matchmaker.has_match(match_id)
    }

    /// Read access to the matchmaker (tests and diagnostics).
    #[must_use]
    pub fn matchmaker(&self) -> &Matchmaker<E::Instant> {
        &self.matchmaker
    }
}

impl<E> std::fmt::Debug for ServerDriver<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("connection_count", &self.registry.session_count())
            .field("match_count", &self.matchmaker.match_count())
            .finish()
    }
}
