//! Connection registry for session and match subscription tracking.
//!
//! The registry maintains bidirectional mappings: match → sessions (for
//! broadcast fan-out) and session → match (for cleanup on disconnect). This
//! enables O(1) lookups in both directions and guarantees a notification for
//! one match is never fanned out to sessions of another.
//!
//! Unlike a general pub/sub registry, a session belongs to at most one match
//! at a time - a connection already in an active match cannot join another.

use std::collections::{HashMap, HashSet};

/// Information about a registered session.
#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    /// Display name, set once the session has joined a match.
    pub name: Option<String>,
}

impl SessionInfo {
    /// Create session info with no name yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create session info with a display name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()) }
    }
}

/// Registry for tracking sessions and match membership.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Session ID → session info
    sessions: HashMap<u64, SessionInfo>,
    /// Match ID → set of member session IDs
    match_subscriptions: HashMap<u64, HashSet<u64>>,
    /// Session ID → the match it belongs to (at most one)
    session_match: HashMap<u64, u64>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session.
    ///
    /// Returns `false` if the session already exists.
    pub fn register_session(&mut self, session_id: u64, info: SessionInfo) -> bool {
        if self.sessions.contains_key(&session_id) {
            return false;
        }
        self.sessions.insert(session_id, info);
        true
    }

    /// Unregister a session and remove its match membership.
    ///
    /// Returns the session info and the match it was in, if any.
    pub fn unregister_session(&mut self, session_id: u64) -> Option<(SessionInfo, Option<u64>)> {
        let info = self.sessions.remove(&session_id)?;
        let match_id = self.session_match.remove(&session_id);

        if let Some(match_id) = match_id {
            if let Some(members) = self.match_subscriptions.get_mut(&match_id) {
                members.remove(&session_id);
                if members.is_empty() {
                    self.match_subscriptions.remove(&match_id);
                }
            }
        }

        Some((info, match_id))
    }

    /// Session metadata. `None` if the session doesn't exist.
    #[must_use]
    pub fn session(&self, session_id: u64) -> Option<&SessionInfo> {
        self.sessions.get(&session_id)
    }

    /// Mutable session metadata. `None` if the session doesn't exist.
    pub fn session_mut(&mut self, session_id: u64) -> Option<&mut SessionInfo> {
        self.sessions.get_mut(&session_id)
    }

    /// Check if a session is registered.
    #[must_use]
    pub fn has_session(&self, session_id: u64) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Add a session to a match.
    ///
    /// Returns `false` if the session is not registered or is already in a
    /// match (including this one).
    pub fn join_match(&mut self, session_id: u64, match_id: u64) -> bool {
        if !self.sessions.contains_key(&session_id) {
            return false;
        }
        if self.session_match.contains_key(&session_id) {
            return false;
        }

        self.match_subscriptions.entry(match_id).or_default().insert(session_id);
        self.session_match.insert(session_id, match_id);
        true
    }

    /// Remove a session from its match, keeping the session registered.
    ///
    /// Returns the match it was in, if any.
    pub fn leave_match(&mut self, session_id: u64) -> Option<u64> {
        let match_id = self.session_match.remove(&session_id)?;

        if let Some(members) = self.match_subscriptions.get_mut(&match_id) {
            members.remove(&session_id);
            if members.is_empty() {
                self.match_subscriptions.remove(&match_id);
            }
        }

        Some(match_id)
    }

    /// Drop every membership of a match (used when a match concludes).
    ///
    /// The sessions stay registered and become free to join a new match.
    /// Returns the number of sessions that were members.
    pub fn clear_match(&mut self, match_id: u64) -> usize {
        let Some(members) = self.match_subscriptions.remove(&match_id) else {
            return 0;
        };

        for session_id in &members {
            self.session_match.remove(session_id);
        }

        members.len()
    }

    /// The match a session belongs to, if any.
    #[must_use]
    pub fn match_for_session(&self, session_id: u64) -> Option<u64> {
        self.session_match.get(&session_id).copied()
    }

    /// All sessions that are members of a match.
    pub fn sessions_in_match(&self, match_id: u64) -> impl Iterator<Item = u64> + '_ {
        self.match_subscriptions.get(&match_id).into_iter().flat_map(|s| s.iter().copied())
    }

    /// Total number of registered sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of sessions that are members of a match.
    #[must_use]
    pub fn match_session_count(&self, match_id: u64) -> usize {
        self.match_subscriptions.get(&match_id).map_or(0, HashSet::len)
    }
}
