//! Word lists and recent-word tracking.

use std::collections::VecDeque;
use std::sync::Arc;

/// Accepted word lengths, in chars.
pub const MIN_WORD_LEN: usize = 5;
pub const MAX_WORD_LEN: usize = 10;

/// How many recently-played words a room avoids repeating.
pub const RECENT_WORDS_CAP: usize = 20;

/// Built-in list used when no dictionary is supplied.
const FALLBACK_WORDS: &[&str] = &[
    "ABBEY", "ANCHOR", "BALLOON", "BANQUET", "BLANKET", "BRIDGE", "CABINET", "CANDLE",
    "CASTLE", "CHIMNEY", "CRANE", "CRICKET", "CURTAIN", "DOLPHIN", "DRAGON", "EMERALD",
    "FALCON", "GARDEN", "GLACIER", "HARBOR", "HARVEST", "ISLAND", "JOURNEY", "LANTERN",
    "MARBLE", "MEADOW", "MOUNTAIN", "ORCHARD", "PAINTER", "PUZZLE", "RIBBON", "SADDLE",
    "TEMPLE", "THUNDER", "TRUMPET", "VILLAGE", "WHISPER", "WINDOW", "WIZARD", "ZEPHYR",
];

/// An immutable, shareable word list.
///
/// Construction filters to uppercase words of 5–10 chars; an input
/// that filters down to nothing falls back to the built-in list, so a
/// dictionary can always produce a word.
#[derive(Debug, Clone)]
pub struct Dictionary {
    words: Arc<Vec<String>>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::built_in()
    }
}

impl Dictionary {
    /// The built-in fallback list.
    pub fn built_in() -> Self {
        Self {
            words: Arc::new(FALLBACK_WORDS.iter().map(|w| w.to_string()).collect()),
        }
    }

    /// A dictionary from caller-supplied words.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_uppercase())
            .filter(|w| {
                let len = w.chars().count();
                (MIN_WORD_LEN..=MAX_WORD_LEN).contains(&len)
                    && w.chars().all(|c| c.is_ascii_uppercase())
            })
            .collect();

        if words.is_empty() {
            tracing::warn!("supplied dictionary had no usable words, using built-in list");
            return Self::built_in();
        }
        tracing::info!(words = words.len(), "dictionary loaded");
        Self {
            words: Arc::new(words),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// A random word, avoiding `exclude` when possible. If every word
    /// is excluded (tiny dictionary, long recent list) the exclusion is
    /// waived rather than failing the round.
    pub fn draw(&self, exclude: &RecentWords) -> String {
        use rand::Rng;
        let mut rng = rand::rng();

        let fresh: Vec<&String> = self.words.iter().filter(|w| !exclude.contains(w)).collect();
        if fresh.is_empty() {
            let idx = rng.random_range(0..self.words.len());
            return self.words[idx].clone();
        }
        let idx = rng.random_range(0..fresh.len());
        fresh[idx].clone()
    }
}

/// FIFO of the last [`RECENT_WORDS_CAP`] words a room has played.
#[derive(Debug, Default)]
pub struct RecentWords(VecDeque<String>);

impl RecentWords {
    pub fn push(&mut self, word: String) {
        if self.0.len() == RECENT_WORDS_CAP {
            self.0.pop_front();
        }
        self.0.push_back(word);
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.iter().any(|w| w == word)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_words_filters_length_and_uppercases() {
        let dict = Dictionary::from_words(["crane", "ab", "superlatively", "maison "]);
        assert_eq!(dict.len(), 2); // CRANE and MAISON survive
        let word = dict.draw(&RecentWords::default());
        assert!(word == "CRANE" || word == "MAISON");
    }

    #[test]
    fn test_from_words_empty_input_falls_back_to_built_in() {
        let dict = Dictionary::from_words(Vec::<String>::new());
        assert!(!dict.is_empty());
    }

    #[test]
    fn test_draw_avoids_recent_words() {
        let dict = Dictionary::from_words(["CRANE", "MAISON"]);
        let mut recent = RecentWords::default();
        recent.push("CRANE".into());
        for _ in 0..20 {
            assert_eq!(dict.draw(&recent), "MAISON");
        }
    }

    #[test]
    fn test_draw_waives_exclusion_when_everything_is_recent() {
        let dict = Dictionary::from_words(["CRANE"]);
        let mut recent = RecentWords::default();
        recent.push("CRANE".into());
        assert_eq!(dict.draw(&recent), "CRANE");
    }

    #[test]
    fn test_recent_words_evicts_oldest_at_cap() {
        let mut recent = RecentWords::default();
        for i in 0..RECENT_WORDS_CAP + 1 {
            recent.push(format!("WORD{i:02}"));
        }
        assert_eq!(recent.len(), RECENT_WORDS_CAP);
        assert!(!recent.contains("WORD00"));
        assert!(recent.contains("WORD20"));
    }
}
