//! Matchmaker: allocates joining participants to matches.
//!
//! Owns the registry of live matches keyed by match ID. Each entry owns its
//! [`MatchState`] exclusively - no two matches share a board. The matchmaker
//! tracks at most one "open" match (seated one participant, waiting for a
//! second); joins without an explicit target fill the open match before
//! creating a new one.
//!
//! Concluded matches reset to [`MatchPhase::Empty`] and are then dropped via
//! [`Matchmaker::remove_if_empty`], so every activation starts from a fresh
//! match and a new joiner is always assigned the first-mover mark.
//!
//! Generic over `I` (Instant type) to support virtual time in tests.

use std::collections::HashMap;

use gridlock_core::{Environment, MatchEvent, MatchPhase, MatchState};
use gridlock_proto::Mark;

/// A live match plus bookkeeping metadata.
#[derive(Debug, Clone)]
struct MatchEntry<I> {
    state: MatchState,
    /// When the match was created (logging/diagnostics).
    #[allow(dead_code)]
    created_at: I,
}

/// Allocates participants to matches and routes match operations.
pub struct Matchmaker<I = std::time::Instant> {
    /// Live matches by ID.
    matches: HashMap<u64, MatchEntry<I>>,
    /// The match currently waiting for a second participant, if any.
    open_match: Option<u64>,
}

impl<I: Copy> Matchmaker<I> {
    /// Create a matchmaker with no matches.
    #[must_use]
    pub fn new() -> Self {
        Self { matches: HashMap::new(), open_match: None }
    }

    /// Seat a participant in a match.
    ///
    /// With an explicit `prefer` target the participant joins that match,
    /// creating it empty if absent (private match); a full explicit target
    /// yields the `MatchFull` rejection from [`MatchState::join`], and a
    /// private match is never handed to targetless joiners. Without a
    /// target, the open match is filled if one is waiting, otherwise a fresh
    /// match with a random unused ID is created.
    ///
    /// Returns the match ID and the events to execute.
    pub fn join<E: Environment<Instant = I>>(
        &mut self,
        session_id: u64,
        name: &str,
        prefer: Option<u64>,
        env: &E,
    ) -> (u64, Vec<MatchEvent>) {
        let match_id = match prefer {
            Some(id) => id,
            None => match self.open_match_id() {
                Some(id) => id,
                None => self.allocate_id(env),
            },
        };

        let entry = self.matches.entry(match_id).or_insert_with(|| MatchEntry {
            state: MatchState::new(),
            created_at: env.now(),
        });

        let events = entry.state.join(session_id, name);

        // Maintain the open-match slot from the resulting phase. Explicitly
        // targeted matches stay private and are never advertised.
        match entry.state.phase() {
            MatchPhase::WaitingForSecond if prefer.is_none() => self.open_match = Some(match_id),
            MatchPhase::WaitingForSecond => {},
            _ => {
                if self.open_match == Some(match_id) {
                    self.open_match = None;
                }
            },
        }

        (match_id, events)
    }

    /// Route a move to its match. Unknown match IDs are ignored.
    pub fn submit_move(&mut self, match_id: u64, mark: Mark, cell: u8) -> Vec<MatchEvent> {
        let Some(entry) = self.matches.get_mut(&match_id) else {
            tracing::warn!(match_id, "move for unknown match ignored");
            return Vec::new();
        };
        entry.state.submit_move(mark, cell)
    }

    /// Route a chat line to its match. Unknown match IDs are ignored.
    pub fn chat(&mut self, match_id: u64, session_id: u64, text: &str) -> Vec<MatchEvent> {
        let Some(entry) = self.matches.get_mut(&match_id) else {
            tracing::warn!(match_id, "chat for unknown match ignored");
            return Vec::new();
        };
        entry.state.chat(session_id, text)
    }

    /// Tear down a participant's match on disconnect.
    pub fn handle_disconnect(&mut self, match_id: u64, session_id: u64) -> Vec<MatchEvent> {
        let Some(entry) = self.matches.get_mut(&match_id) else {
            return Vec::new();
        };
        entry.state.handle_disconnect(session_id)
    }

    /// Drop a match that has reset to [`MatchPhase::Empty`].
    ///
    /// Returns `true` if the match was removed. A match still holding
    /// participants is kept.
    pub fn remove_if_empty(&mut self, match_id: u64) -> bool {
        let empty = self
            .matches
            .get(&match_id)
            .is_some_and(|e| e.state.phase() == MatchPhase::Empty);

        if empty {
            self.matches.remove(&match_id);
            if self.open_match == Some(match_id) {
                self.open_match = None;
            }
        }

        empty
    }

    /// `true` iff `session_id` holds a seat in `match_id`.
    #[must_use]
    pub fn is_participant(&self, match_id: u64, session_id: u64) -> bool {
        self.matches.get(&match_id).is_some_and(|e| e.state.is_participant(session_id))
    }

    /// Phase of a match. `None` if the match doesn't exist.
    #[must_use]
    pub fn phase(&self, match_id: u64) -> Option<MatchPhase> {
        self.matches.get(&match_id).map(|e| e.state.phase())
    }

    /// Read access to a match's state (tests and diagnostics).
    #[must_use]
    pub fn match_state(&self, match_id: u64) -> Option<&MatchState> {
        self.matches.get(&match_id).map(|e| &e.state)
    }

    /// Check if a match exists.
    #[must_use]
    pub fn has_match(&self, match_id: u64) -> bool {
        self.matches.contains_key(&match_id)
    }

    /// Number of live matches.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// The open match, revalidated: `Some` only while it exists and is
    /// still waiting for a second participant.
    fn open_match_id(&mut self) -> Option<u64> {
        let id = self.open_match?;
        let waiting = self
            .matches
            .get(&id)
            .is_some_and(|e| e.state.phase() == MatchPhase::WaitingForSecond);

        if !waiting {
            self.open_match = None;
            return None;
        }
        Some(id)
    }

    /// Pick a random ID not already in use.
    fn allocate_id<E: Environment<Instant = I>>(&self, env: &E) -> u64 {
        loop {
            let id = env.random_u64();
            if !self.matches.contains_key(&id) {
                return id;
            }
        }
    }
}

impl<I: Copy> Default for Matchmaker<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Copy> std::fmt::Debug for Matchmaker<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matchmaker")
            .field("match_count", &self.matches.len())
            .field("open_match", &self.open_match)
            .finish()
    }
}
