//! Shared identifiers and value types that appear on the wire.
//!
//! Everything here serializes to the JSON shapes the browser client
//! expects: ids as plain numbers, room codes as 4-letter strings,
//! enums as lowercase strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// A process-unique identifier for a connected player.
///
/// Newtype over `u64`; `#[serde(transparent)]` keeps the wire shape a
/// plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// A four-letter room code, e.g. `QRZT`.
///
/// Codes are always uppercase ASCII letters. Parsing accepts lowercase
/// input (clients type codes by hand) and uppercases it; anything that
/// is not exactly four ASCII letters is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomCode([u8; 4]);

impl RoomCode {
    /// Number of letters in a code.
    pub const LEN: usize = 4;

    /// Builds a code from four uppercase ASCII letters.
    ///
    /// Callers (the code generator) guarantee the range; this is not a
    /// parsing entry point — use `FromStr` for untrusted input.
    pub fn from_letters(letters: [u8; 4]) -> Self {
        debug_assert!(letters.iter().all(u8::is_ascii_uppercase));
        Self(letters)
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        // Invariant: always four ASCII uppercase letters.
        std::str::from_utf8(&self.0).expect("room codes are ASCII")
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != Self::LEN || !s.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(ProtocolError::InvalidMessage(format!(
                "invalid room code: {s:?}"
            )));
        }
        let mut letters = [0u8; 4];
        for (slot, b) in letters.iter_mut().zip(s.bytes()) {
            *slot = b.to_ascii_uppercase();
        }
        Ok(Self(letters))
    }
}

impl Serialize for RoomCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Room lifecycle phase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a room, as shown in status snapshots.
///
/// ```text
/// Waiting → Countdown → Playing → Finished → Waiting (reset)
/// ```
///
/// Word rooms skip `Countdown`; arena rooms use all four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    Waiting,
    Countdown,
    Playing,
    Finished,
}

impl RoomPhase {
    /// Whether new members may join normally (vs. reconnect).
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Whether a round is underway (countdown counts — inputs are
    /// already bound to agents).
    pub fn in_round(self) -> bool {
        matches!(self, Self::Countdown | Self::Playing)
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Countdown => "countdown",
            Self::Playing => "playing",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Word-mode values
// ---------------------------------------------------------------------------

/// Scoring mode for a word room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordMode {
    /// Fewest attempts wins; score by attempt count.
    #[default]
    Attempts,
    /// Fixed time limit; score by finish order.
    Timed,
}

/// Per-letter verdict for one guess position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Right letter, right position.
    Correct,
    /// Letter occurs elsewhere in the target (multiplicity-aware).
    Misplaced,
    /// Letter does not occur (or all its occurrences are spoken for).
    Wrong,
}

/// Why a word round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundEndReason {
    /// Every member finished the word.
    Completed,
    /// The timed-mode clock ran out.
    Timeout,
}

// ---------------------------------------------------------------------------
// Arena grid values
// ---------------------------------------------------------------------------

/// A heading on the arena grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// The opposite heading. Used to reject direct reversals.
    pub fn reverse(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Unit offset, with y growing downward (screen coordinates).
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

/// A grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighboring cell in the given direction.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Whether this cell lies inside a `size`×`size` grid.
    pub fn in_bounds(self, size: i32) -> bool {
        self.x >= 0 && self.x < size && self.y >= 0 && self.y < size
    }
}

/// Kind of power-up on the arena field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerUpKind {
    /// Timed movement boost flag.
    Speed,
    /// Timed collision shield; movement grows instead of dropping tail.
    Shield,
    /// Instant score and growth.
    Mega,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_room_code_parse_uppercases_input() {
        let code: RoomCode = "abcd".parse().unwrap();
        assert_eq!(code.as_str(), "ABCD");
    }

    #[test]
    fn test_room_code_parse_rejects_wrong_length() {
        assert!("ABC".parse::<RoomCode>().is_err());
        assert!("ABCDE".parse::<RoomCode>().is_err());
        assert!("".parse::<RoomCode>().is_err());
    }

    #[test]
    fn test_room_code_parse_rejects_non_letters() {
        assert!("AB1D".parse::<RoomCode>().is_err());
        assert!("A-CD".parse::<RoomCode>().is_err());
    }

    #[test]
    fn test_room_code_serializes_as_string() {
        let code: RoomCode = "WXYZ".parse().unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"WXYZ\"");
    }

    #[test]
    fn test_room_code_deserializes_from_string() {
        let code: RoomCode = serde_json::from_str("\"qrzt\"").unwrap();
        assert_eq!(code.as_str(), "QRZT");
    }

    #[test]
    fn test_room_phase_is_joinable() {
        assert!(RoomPhase::Waiting.is_joinable());
        assert!(!RoomPhase::Countdown.is_joinable());
        assert!(!RoomPhase::Playing.is_joinable());
        assert!(!RoomPhase::Finished.is_joinable());
    }

    #[test]
    fn test_room_phase_serializes_lowercase() {
        let json = serde_json::to_string(&RoomPhase::Waiting).unwrap();
        assert_eq!(json, "\"waiting\"");
    }

    #[test]
    fn test_direction_reverse_is_involution() {
        for dir in [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ] {
            assert_eq!(dir.reverse().reverse(), dir);
        }
    }

    #[test]
    fn test_cell_step_moves_one_cell() {
        let c = Cell::new(5, 5);
        assert_eq!(c.step(Direction::Up), Cell::new(5, 4));
        assert_eq!(c.step(Direction::Down), Cell::new(5, 6));
        assert_eq!(c.step(Direction::Left), Cell::new(4, 5));
        assert_eq!(c.step(Direction::Right), Cell::new(6, 5));
    }

    #[test]
    fn test_cell_in_bounds_edges() {
        assert!(Cell::new(0, 0).in_bounds(25));
        assert!(Cell::new(24, 24).in_bounds(25));
        assert!(!Cell::new(25, 0).in_bounds(25));
        assert!(!Cell::new(0, -1).in_bounds(25));
    }

    #[test]
    fn test_verdict_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Verdict::Misplaced).unwrap(),
            "\"misplaced\""
        );
    }

    #[test]
    fn test_word_mode_default_is_attempts() {
        assert_eq!(WordMode::default(), WordMode::Attempts);
    }
}
