use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::warn;

use super::core::Language;
use crate::practice::TextSource;

/// Words appended per refill pass.
const WORDS_PER_BATCH: usize = 64;

/// Used when the embedded word list cannot be read.
const BUILTIN_WORDS: &[&str] = &[
    "the", "of", "and", "to", "in", "is", "you", "that", "it", "he", "was", "for", "on", "are",
    "as", "with", "his", "they", "at", "be", "this", "have", "from", "or", "one", "had", "by",
    "word", "but", "not", "what", "all", "were", "we", "when", "your", "can", "said", "there",
    "use", "an", "each", "which", "she", "do", "how", "their", "if", "will", "up", "other",
    "about", "out", "many", "then", "them", "these", "so", "some", "her", "would", "make",
    "like", "him", "into", "time", "has", "look", "two", "more", "write", "go", "see",
];

/// Endless random words, the fallback when no corpus book is available.
#[derive(Debug, Clone)]
pub struct FillerStream {
    words: Vec<String>,
    rng: StdRng,
}

impl FillerStream {
    /// Filler from the embedded `english` list, or the built-in list if that
    /// cannot be loaded.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let words = match Language::load("english") {
            Ok(lang) => lang.words,
            Err(e) => {
                warn!("filler word list unavailable, using built-in words: {e}");
                builtin_words()
            }
        };
        Self { words, rng }
    }

    /// Filler over an explicit word list. An empty list falls back to the
    /// built-in words.
    pub fn from_words(words: Vec<String>, seed: u64) -> Self {
        let words = if words.is_empty() {
            builtin_words()
        } else {
            words
        };
        Self {
            words,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    fn next_batch(&mut self) -> String {
        let rng = &mut self.rng;
        let words = &self.words;
        (0..WORDS_PER_BATCH)
            .filter_map(|_| words.choose(rng))
            .join(" ")
    }
}

impl Default for FillerStream {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSource for FillerStream {
    fn ensure_length(&mut self, mut current: String, min_chars: usize) -> String {
        let mut have = current.chars().count();
        while have < min_chars {
            let batch = self.next_batch();
            if batch.is_empty() {
                break;
            }
            if !current.is_empty() && !current.ends_with(char::is_whitespace) {
                current.push(' ');
                have += 1;
            }
            have += batch.chars().count();
            current.push_str(&batch);
        }
        current
    }
}

fn builtin_words() -> Vec<String> {
    BUILTIN_WORDS.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_to_requested_length() {
        let mut filler = FillerStream::with_seed(7);
        let text = filler.ensure_length(String::new(), 2_000);
        assert!(text.chars().count() >= 2_000);
        assert!(!text.starts_with(' '));
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_appends_with_a_single_separator() {
        let mut filler = FillerStream::from_words(vec!["abc".into()], 1);
        let text = filler.ensure_length("xyz".to_string(), 10);
        assert!(text.starts_with("xyz abc abc"));
    }

    #[test]
    fn test_long_enough_text_is_returned_unchanged() {
        let mut filler = FillerStream::with_seed(3);
        let text = filler.ensure_length("already here".to_string(), 5);
        assert_eq!(text, "already here");
    }

    #[test]
    fn test_same_seed_same_words() {
        let a = FillerStream::with_seed(42).ensure_length(String::new(), 300);
        let b = FillerStream::with_seed(42).ensure_length(String::new(), 300);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_word_list_uses_builtin_words() {
        let filler = FillerStream::from_words(Vec::new(), 0);
        assert_eq!(filler.words().len(), BUILTIN_WORDS.len());
    }
}
