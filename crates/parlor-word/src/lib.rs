//! The word-guessing game: rooms draw a secret word and players race
//! to find it, with per-letter verdicts after each guess. Two rule
//! sets share the machinery — attempts mode scores by how few guesses
//! you needed, timed mode by finish order under a five-minute limit.

mod dict;
mod eval;
mod round;
mod score;

pub use dict::{Dictionary, MAX_WORD_LEN, MIN_WORD_LEN, RECENT_WORDS_CAP, RecentWords};
pub use eval::evaluate;
pub use round::{Guess, WordConfig, WordRound};
