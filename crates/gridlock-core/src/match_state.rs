//! Match lifecycle and turn coordination.
//!
//! [`MatchState`] is the authoritative state for one match: seats, board,
//! turn owner, phase. All mutation funnels through it; callers serialize
//! access (the server holds the driver behind a single mutex), so two moves
//! racing for the same match are applied one at a time and the loser simply
//! fails validation.
//!
//! Operations return [`MatchEvent`] lists instead of performing I/O. Invalid
//! participant input (wrong turn, taken cell, chat without a seat) is a
//! normal branch that returns no events and changes no state - never an
//! error, never a panic.

use gridlock_proto::{Mark, PlayerInfo, ServerMessage};

use crate::board::{Board, Outcome};

/// Lifecycle phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// No participants.
    Empty,
    /// One participant seated, waiting for an opponent.
    WaitingForSecond,
    /// Two participants, moves are being exchanged.
    InProgress,
}

/// One occupied seat in a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    /// Connection-scoped participant identity.
    pub session_id: u64,
    /// Display name.
    pub name: String,
    /// Assigned mark.
    pub mark: Mark,
}

/// Actions produced by match operations for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    /// Send a message to one session.
    Unicast {
        /// Target session.
        session_id: u64,
        /// Message to send.
        message: ServerMessage,
    },

    /// Send a message to every participant of this match.
    Broadcast {
        /// Message to fan out.
        message: ServerMessage,
    },

    /// Report a win to the score collaborator (fire-and-forget).
    ReportWin {
        /// Winning player's display name.
        name: String,
    },
}

/// Authoritative state for one match.
///
/// Concluded matches (win, draw, or disconnect) reset in place to
/// [`MatchPhase::Empty`]: board cleared, seats cleared, turn owner back to
/// [`Mark::X`]. There is no observable "concluded" window.
#[derive(Debug, Clone)]
pub struct MatchState {
    seats: Vec<Seat>,
    board: Board,
    turn: Mark,
    phase: MatchPhase,
}

impl MatchState {
    /// Create an empty match.
    #[must_use]
    pub fn new() -> Self {
        Self { seats: Vec::with_capacity(2), board: Board::new(), turn: Mark::X, phase: MatchPhase::Empty }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Current turn owner.
    #[must_use]
    pub fn turn(&self) -> Mark {
        self.turn
    }

    /// Current board contents.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Occupied seats, in join order.
    #[must_use]
    pub fn participants(&self) -> &[Seat] {
        &self.seats
    }

    /// `true` iff `session_id` holds a seat.
    #[must_use]
    pub fn is_participant(&self, session_id: u64) -> bool {
        self.seats.iter().any(|s| s.session_id == session_id)
    }

    /// Seat a participant.
    ///
    /// The first joiner is assigned [`Mark::X`] and told to wait; the second
    /// is assigned [`Mark::O`] and the match starts with `X` to move.
    /// Exactly one `MatchStarted` is emitted per activation, when the second
    /// distinct participant joins. A join on a full match gets `MatchFull`
    /// and is not seated. A session already holding a seat is never
    /// double-counted (keyed by session identity, not name).
    pub fn join(&mut self, session_id: u64, name: &str) -> Vec<MatchEvent> {
        if self.is_participant(session_id) {
            tracing::debug!(session_id, "duplicate join ignored");
            return Vec::new();
        }

        match self.phase {
            MatchPhase::Empty => {
                self.seats.push(Seat { session_id, name: name.to_string(), mark: Mark::X });
                self.phase = MatchPhase::WaitingForSecond;

                vec![
                    MatchEvent::Unicast {
                        session_id,
                        message: ServerMessage::MarkAssigned { mark: Mark::X },
                    },
                    MatchEvent::Unicast {
                        session_id,
                        message: ServerMessage::Waiting {
                            message: "Waiting for another player...".to_string(),
                        },
                    },
                ]
            },

            MatchPhase::WaitingForSecond => {
                self.seats.push(Seat { session_id, name: name.to_string(), mark: Mark::O });
                self.phase = MatchPhase::InProgress;
                self.turn = Mark::X;

                let players: Vec<PlayerInfo> = self
                    .seats
                    .iter()
                    .map(|s| PlayerInfo { name: s.name.clone(), mark: s.mark })
                    .collect();

                vec![
                    MatchEvent::Unicast {
                        session_id,
                        message: ServerMessage::MarkAssigned { mark: Mark::O },
                    },
                    MatchEvent::Broadcast {
                        message: ServerMessage::MatchStarted { players, first_turn: Mark::X },
                    },
                ]
            },

            MatchPhase::InProgress => vec![MatchEvent::Unicast {
                session_id,
                message: ServerMessage::MatchFull {
                    message: "The match is full. Join another match.".to_string(),
                },
            }],
        }
    }

    /// Validate and apply a move.
    ///
    /// Validation order, first failure wins and the move is silently
    /// dropped (no events, no state change):
    ///
    /// 1. phase is `InProgress`
    /// 2. `mark` equals the current turn owner
    /// 3. the board accepts the mark (in range, cell empty)
    ///
    /// On success: board update is broadcast first, then the outcome is
    /// evaluated - winner before draw, turn flip only when the match
    /// continues. This ordering is load-bearing for client consistency.
    pub fn submit_move(&mut self, mark: Mark, cell: u8) -> Vec<MatchEvent> {
        if self.phase != MatchPhase::InProgress {
            tracing::debug!(?mark, cell, "move ignored: match not in progress");
            return Vec::new();
        }

        if mark != self.turn {
            tracing::debug!(?mark, turn = ?self.turn, "move ignored: not this mark's turn");
            return Vec::new();
        }

        if let Err(e) = self.board.apply_mark(cell, mark) {
            tracing::debug!(?mark, cell, error = %e, "move ignored");
            return Vec::new();
        }

        let mut events =
            vec![MatchEvent::Broadcast { message: ServerMessage::BoardUpdated { cell, mark } }];

        match self.board.evaluate() {
            Outcome::Winner(winner) => {
                events.push(MatchEvent::Broadcast {
                    message: ServerMessage::GameOver {
                        winner: Some(winner),
                        message: format!("Player {winner} wins!"),
                    },
                });

                if let Some(seat) = self.seats.iter().find(|s| s.mark == winner) {
                    events.push(MatchEvent::ReportWin { name: seat.name.clone() });
                }

                self.reset();
            },

            Outcome::NoWinner if self.board.is_full() => {
                events.push(MatchEvent::Broadcast {
                    message: ServerMessage::GameOver {
                        winner: None,
                        message: "Draw!".to_string(),
                    },
                });

                self.reset();
            },

            Outcome::NoWinner => {
                self.turn = self.turn.other();
                events.push(MatchEvent::Broadcast {
                    message: ServerMessage::TurnChanged {
                        turn: self.turn,
                        message: format!("It's {}'s turn.", self.turn),
                    },
                });
            },
        }

        events
    }

    /// Relay a chat line from a participant.
    ///
    /// Chat from a session without a seat is ignored.
    pub fn chat(&mut self, session_id: u64, text: &str) -> Vec<MatchEvent> {
        let Some(seat) = self.seats.iter().find(|s| s.session_id == session_id) else {
            tracing::debug!(session_id, "chat ignored: sender not seated");
            return Vec::new();
        };

        vec![MatchEvent::Broadcast {
            message: ServerMessage::ChatReceived {
                name: seat.name.clone(),
                message: text.to_string(),
            },
        }]
    }

    /// Tear down the match because a participant's connection dropped.
    ///
    /// Unconditional: each remaining participant is notified and the match
    /// resets. No rematch or reconnection path exists. A disconnect from a
    /// session without a seat is ignored.
    pub fn handle_disconnect(&mut self, session_id: u64) -> Vec<MatchEvent> {
        if !self.is_participant(session_id) {
            return Vec::new();
        }

        let events: Vec<MatchEvent> = self
            .seats
            .iter()
            .filter(|s| s.session_id != session_id)
            .map(|s| MatchEvent::Unicast {
                session_id: s.session_id,
                message: ServerMessage::PlayerLeft {
                    message: "The other player disconnected. The match is over.".to_string(),
                },
            })
            .collect();

        self.reset();
        events
    }

    /// Reset to the initial empty state: cleared board, cleared seats, turn
    /// owner back to the first-mover mark.
    fn reset(&mut self) {
        self.board.clear();
        self.seats.clear();
        self.turn = Mark::X;
        self.phase = MatchPhase::Empty;
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_match() -> MatchState {
        let mut m = MatchState::new();
        m.join(1, "ada");
        m.join(2, "grace");
        m
    }

    fn broadcasts(events: &[MatchEvent]) -> Vec<&ServerMessage> {
        events
            .iter()
            .filter_map(|e| match e {
                MatchEvent::Broadcast { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_join_waits_as_x() {
        let mut m = MatchState::new();
        let events = m.join(1, "ada");

        assert_eq!(m.phase(), MatchPhase::WaitingForSecond);
        assert_eq!(events[0], MatchEvent::Unicast {
            session_id: 1,
            message: ServerMessage::MarkAssigned { mark: Mark::X },
        });
        assert!(matches!(events[1], MatchEvent::Unicast {
            session_id: 1,
            message: ServerMessage::Waiting { .. },
        }));
    }

    #[test]
    fn second_join_starts_match_with_x_to_move() {
        let mut m = MatchState::new();
        m.join(1, "ada");
        let events = m.join(2, "grace");

        assert_eq!(m.phase(), MatchPhase::InProgress);
        assert_eq!(m.turn(), Mark::X);

        assert_eq!(events[0], MatchEvent::Unicast {
            session_id: 2,
            message: ServerMessage::MarkAssigned { mark: Mark::O },
        });

        let started: Vec<_> = events
            .iter()
            .filter(|e| {
                matches!(e, MatchEvent::Broadcast { message: ServerMessage::MatchStarted { .. } })
            })
            .collect();
        assert_eq!(started.len(), 1, "exactly one MatchStarted per activation");

        if let MatchEvent::Broadcast {
            message: ServerMessage::MatchStarted { players, first_turn },
        } = started[0]
        {
            assert_eq!(*first_turn, Mark::X);
            assert_eq!(players.len(), 2);
            assert_eq!(players[0].name, "ada");
            assert_eq!(players[0].mark, Mark::X);
            assert_eq!(players[1].name, "grace");
            assert_eq!(players[1].mark, Mark::O);
        }
    }

    #[test]
    fn third_join_rejected_and_not_seated() {
        let mut m = started_match();
        let events = m.join(3, "alan");

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MatchEvent::Unicast {
            session_id: 3,
            message: ServerMessage::MatchFull { .. },
        }));
        assert_eq!(m.participants().len(), 2);
        assert!(!m.is_participant(3));
    }

    #[test]
    fn duplicate_session_join_is_noop_even_with_new_name() {
        let mut m = MatchState::new();
        m.join(1, "ada");

        let events = m.join(1, "ada-again");
        assert!(events.is_empty());
        assert_eq!(m.participants().len(), 1);
        assert_eq!(m.phase(), MatchPhase::WaitingForSecond);
    }

    #[test]
    fn valid_move_broadcasts_update_then_turn_change() {
        let mut m = started_match();
        let events = m.submit_move(Mark::X, 4);

        let msgs = broadcasts(&events);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0], &ServerMessage::BoardUpdated { cell: 4, mark: Mark::X });
        assert!(matches!(msgs[1], ServerMessage::TurnChanged { turn: Mark::O, .. }));
        assert_eq!(m.turn(), Mark::O);
    }

    #[test]
    fn wrong_turn_move_is_silently_dropped() {
        let mut m = started_match();
        m.submit_move(Mark::X, 4);

        // O's turn; a move claiming X changes nothing
        let events = m.submit_move(Mark::X, 0);
        assert!(events.is_empty());
        assert_eq!(m.turn(), Mark::O);
        assert_eq!(m.board().cell(0), Some(crate::board::Cell::Empty));

        // The rightful owner can still take the cell
        let events = m.submit_move(Mark::O, 0);
        let msgs = broadcasts(&events);
        assert_eq!(msgs[0], &ServerMessage::BoardUpdated { cell: 0, mark: Mark::O });
        assert!(matches!(msgs[1], ServerMessage::TurnChanged { turn: Mark::X, .. }));
    }

    #[test]
    fn taken_cell_move_is_silently_dropped() {
        let mut m = started_match();
        m.submit_move(Mark::X, 4);

        let events = m.submit_move(Mark::O, 4);
        assert!(events.is_empty());
        assert_eq!(m.turn(), Mark::O, "turn owner unchanged by rejected move");
    }

    #[test]
    fn move_before_match_starts_is_dropped() {
        let mut m = MatchState::new();
        m.join(1, "ada");

        let events = m.submit_move(Mark::X, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn winning_row_concludes_and_resets() {
        let mut m = started_match();
        m.submit_move(Mark::X, 0);
        m.submit_move(Mark::O, 3);
        m.submit_move(Mark::X, 1);
        m.submit_move(Mark::O, 4);
        let events = m.submit_move(Mark::X, 2);

        let msgs = broadcasts(&events);
        assert_eq!(msgs[0], &ServerMessage::BoardUpdated { cell: 2, mark: Mark::X });
        assert!(matches!(msgs[1], ServerMessage::GameOver { winner: Some(Mark::X), .. }));

        assert!(
            events.contains(&MatchEvent::ReportWin { name: "ada".to_string() }),
            "winner's name goes to the score collaborator"
        );

        // No turn change after conclusion
        assert!(!msgs.iter().any(|msg| matches!(msg, ServerMessage::TurnChanged { .. })));

        // Reset: fresh joiner is X again on an empty board
        assert_eq!(m.phase(), MatchPhase::Empty);
        let events = m.join(7, "kurt");
        assert_eq!(events[0], MatchEvent::Unicast {
            session_id: 7,
            message: ServerMessage::MarkAssigned { mark: Mark::X },
        });
        assert_eq!(m.board().cell(0), Some(crate::board::Cell::Empty));
    }

    #[test]
    fn full_board_without_line_is_a_draw() {
        let mut m = started_match();
        // X O X / X O O / O X X filled in legal alternation, draw
        for (mark, cell) in [
            (Mark::X, 0),
            (Mark::O, 1),
            (Mark::X, 2),
            (Mark::O, 4),
            (Mark::X, 3),
            (Mark::O, 5),
            (Mark::X, 7),
            (Mark::O, 6),
        ] {
            let events = m.submit_move(mark, cell);
            assert!(
                !broadcasts(&events)
                    .iter()
                    .any(|msg| matches!(msg, ServerMessage::GameOver { .. })),
                "no premature conclusion at cell {cell}"
            );
        }

        let events = m.submit_move(Mark::X, 8);
        let msgs = broadcasts(&events);
        assert_eq!(msgs[0], &ServerMessage::BoardUpdated { cell: 8, mark: Mark::X });
        assert!(matches!(msgs[1], ServerMessage::GameOver { winner: None, .. }));
        assert!(!events.iter().any(|e| matches!(e, MatchEvent::ReportWin { .. })));
        assert_eq!(m.phase(), MatchPhase::Empty);
    }

    #[test]
    fn disconnect_mid_match_notifies_remaining_and_resets() {
        let mut m = started_match();
        m.submit_move(Mark::X, 4);

        let events = m.handle_disconnect(2);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MatchEvent::Unicast {
            session_id: 1,
            message: ServerMessage::PlayerLeft { .. },
        }));

        // Next joiner gets X, not O
        assert_eq!(m.phase(), MatchPhase::Empty);
        let events = m.join(9, "edsger");
        assert_eq!(events[0], MatchEvent::Unicast {
            session_id: 9,
            message: ServerMessage::MarkAssigned { mark: Mark::X },
        });
    }

    #[test]
    fn disconnect_while_waiting_resets_silently() {
        let mut m = MatchState::new();
        m.join(1, "ada");

        let events = m.handle_disconnect(1);
        assert!(events.is_empty(), "no one left to notify");
        assert_eq!(m.phase(), MatchPhase::Empty);
    }

    #[test]
    fn disconnect_from_stranger_is_ignored() {
        let mut m = started_match();
        let events = m.handle_disconnect(42);
        assert!(events.is_empty());
        assert_eq!(m.phase(), MatchPhase::InProgress);
    }

    #[test]
    fn chat_relays_sender_name() {
        let mut m = started_match();
        let events = m.chat(2, "good luck");

        assert_eq!(events, vec![MatchEvent::Broadcast {
            message: ServerMessage::ChatReceived {
                name: "grace".to_string(),
                message: "good luck".to_string(),
            },
        }]);
    }

    #[test]
    fn chat_from_stranger_is_ignored() {
        let mut m = started_match();
        let events = m.chat(42, "hello?");
        assert!(events.is_empty());
    }
}
