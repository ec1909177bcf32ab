//! Client and server message types.
//!
//! `ClientMessage` covers everything a connection may send; `ServerMessage`
//! covers every notification the server fans out. Both serialize as tagged
//! CBOR enums so the reader can dispatch without a separate opcode header.

use serde::{Deserialize, Serialize};

use crate::types::Mark;

/// Messages sent by a client connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Request to join a match.
    Join {
        /// Display name for the roster and chat.
        name: String,
        /// Explicit match to join (private match). `None` lets the
        /// matchmaker pick or create one.
        #[serde(skip_serializing_if = "Option::is_none")]
        match_id: Option<u64>,
    },

    /// Claim a cell on the board.
    Move {
        /// Cell index, row-major 0..=8.
        cell: u8,
        /// The mark the sender claims to play. Validated against the
        /// match's current turn owner.
        mark: Mark,
    },

    /// Relay a chat line to the match.
    Chat {
        /// Chat text.
        text: String,
    },

    /// Graceful disconnect. Handled identically to the connection closing.
    Leave,
}

/// Roster entry sent with [`ServerMessage::MatchStarted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Display name.
    pub name: String,
    /// Assigned mark.
    pub mark: Mark,
}

/// Notifications fanned out by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The joining participant's assigned mark. Unicast to the joiner only.
    MarkAssigned {
        /// Assigned mark.
        mark: Mark,
    },

    /// Waiting for a second participant. Unicast to the first joiner.
    Waiting {
        /// Human-readable status text.
        message: String,
    },

    /// Both seats are filled; the match begins.
    MatchStarted {
        /// Both participants with their marks.
        players: Vec<PlayerInfo>,
        /// The mark that owns the opening turn.
        first_turn: Mark,
    },

    /// A validated move was applied to the board.
    BoardUpdated {
        /// Cell index that was marked.
        cell: u8,
        /// Mark placed in the cell.
        mark: Mark,
    },

    /// Turn ownership passed to the other mark.
    TurnChanged {
        /// New turn owner.
        turn: Mark,
        /// Human-readable prompt for the new owner.
        message: String,
    },

    /// The match concluded.
    GameOver {
        /// Winning mark, or `None` for a draw.
        winner: Option<Mark>,
        /// Human-readable conclusion text.
        message: String,
    },

    /// The requested match already has two participants.
    MatchFull {
        /// Human-readable rejection text.
        message: String,
    },

    /// The other participant disconnected; the match is over.
    PlayerLeft {
        /// Human-readable notice text.
        message: String,
    },

    /// A chat line from a match participant.
    ChatReceived {
        /// Sender's display name.
        name: String,
        /// Chat text.
        message: String,
    },

    /// A player's win tally changed.
    ScoreUpdated {
        /// Player whose score changed.
        name: String,
        /// New score.
        score: u64,
    },
}
