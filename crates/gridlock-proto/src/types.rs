//! Types shared by client and server messages.

use serde::{Deserialize, Serialize};

/// A player's mark on the board.
///
/// `X` is the first-mover mark: the first participant to join a match is
/// always assigned `X`, and `X` owns the opening turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    /// First-mover mark, assigned to the first participant.
    X,
    /// Second mark, assigned to the second participant.
    O,
}

impl Mark {
    /// The opposing mark.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::O => write!(f, "O"),
        }
    }
}
