//! Pure match logic for the Gridlock server.
//!
//! This crate is sans-IO: nothing here touches the network or the clock
//! directly. [`MatchState`] owns one match's authoritative state (seats,
//! board, turn owner, lifecycle phase) and every operation returns a list of
//! [`MatchEvent`]s for a driver to execute. The same logic therefore runs
//! unchanged under unit tests, deterministic simulation, and the production
//! server.
//!
//! # Components
//!
//! - [`Board`]: 3x3 grid with win/draw evaluation. Pure, no side effects.
//! - [`MatchState`]: session lifecycle and turn coordination. Owns all
//!   mutation of its board.
//! - [`Environment`]: time and randomness abstraction for deterministic
//!   testing.

pub mod board;
pub mod env;
pub mod match_state;

pub use board::{Board, BoardError, Cell, Outcome};
pub use env::Environment;
pub use match_state::{MatchEvent, MatchPhase, MatchState, Seat};
