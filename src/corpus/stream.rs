use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::index::CorpusIndexEntry;

/// Characters that must stay reachable after a random start offset.
pub const TAIL_GUARD_CHARS: usize = 12_000;

/// Minimum size of each chunk appended by [`CorpusSessionStream::ensure_length`].
pub const DEFAULT_CHUNK_CHARS: usize = 4_000;

/// Inserted at the wrap seam so the end of one pass never fuses with the
/// start of the next.
const SEAM_SEPARATOR: char = ' ';

/// Normalized book text, shared between the cache and every stream reading it.
///
/// Indexed by character so offsets, lengths and the tail guard all count the
/// same unit the typist sees.
#[derive(Clone, PartialEq, Eq)]
pub struct BookText {
    chars: Arc<[char]>,
}

impl BookText {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect::<Vec<_>>().into(),
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// True when both handles point at the same cached text.
    pub fn shares_storage_with(&self, other: &BookText) -> bool {
        Arc::ptr_eq(&self.chars, &other.chars)
    }
}

impl fmt::Debug for BookText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookText").field("len", &self.len()).finish()
    }
}

impl fmt::Display for BookText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chars.iter().try_for_each(|c| fmt::Write::write_char(f, *c))
    }
}

impl From<&str> for BookText {
    fn from(text: &str) -> Self {
        BookText::new(text)
    }
}

/// Snaps `offset` forward to the start of the next word.
///
/// Returns `offset` unchanged when it already starts a word (or is 0),
/// otherwise skips the rest of the word under `offset` and the whitespace
/// after it. Walking off the end of the text falls back to 0.
pub fn find_safe_boundary(text: &[char], offset: usize) -> usize {
    let len = text.len();
    if offset == 0 || offset >= len {
        return 0;
    }
    if text[offset - 1].is_whitespace() && !text[offset].is_whitespace() {
        return offset;
    }

    let mut idx = offset;
    while idx < len && !text[idx].is_whitespace() {
        idx += 1;
    }
    while idx < len && text[idx].is_whitespace() {
        idx += 1;
    }

    if idx >= len {
        0
    } else {
        idx
    }
}

/// Picks a uniformly random offset in `[0, len - tail_guard]` and snaps it to
/// a safe boundary.
pub fn pick_random_start_offset<R: Rng + ?Sized>(
    text: &[char],
    tail_guard: usize,
    rng: &mut R,
) -> usize {
    let max_offset = text.len().saturating_sub(tail_guard);
    let rough = rng.gen_range(0..=max_offset);
    find_safe_boundary(text, rough)
}

/// Endless, wrapping character stream over one book.
///
/// The stream exclusively owns its cursor; the book text itself is shared and
/// never mutated. Each time the cursor reaches the end of the book it jumps
/// to a fresh random word boundary.
#[derive(Debug)]
pub struct CorpusSessionStream {
    entry: CorpusIndexEntry,
    text: BookText,
    cursor: usize,
    rng: StdRng,
    tail_guard: usize,
    chunk_chars: usize,
    wraps: usize,
}

impl CorpusSessionStream {
    pub fn new(entry: CorpusIndexEntry, text: BookText) -> Self {
        Self::with_rng(entry, text, StdRng::from_entropy())
    }

    pub fn with_seed(entry: CorpusIndexEntry, text: BookText, seed: u64) -> Self {
        Self::with_rng(entry, text, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(entry: CorpusIndexEntry, text: BookText, rng: StdRng) -> Self {
        let mut stream = Self {
            entry,
            text,
            cursor: 0,
            rng,
            tail_guard: TAIL_GUARD_CHARS,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            wraps: 0,
        };
        stream.cursor = stream.pick_start();
        stream
    }

    /// Overrides the tail guard and re-picks the starting offset.
    pub fn with_tail_guard(mut self, tail_guard: usize) -> Self {
        self.tail_guard = tail_guard;
        self.cursor = self.pick_start();
        self
    }

    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    pub fn entry(&self) -> &CorpusIndexEntry {
        &self.entry
    }

    pub fn text(&self) -> &BookText {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// How many times the stream has wrapped past the end of the book.
    pub fn wrap_count(&self) -> usize {
        self.wraps
    }

    fn pick_start(&mut self) -> usize {
        pick_random_start_offset(self.text.chars(), self.tail_guard, &mut self.rng)
    }

    /// Produces at least `target_chars` characters, wrapping as often as
    /// needed. Only an empty book yields a shorter (empty) chunk.
    ///
    /// The wrap seam always falls on a word boundary; the end of the chunk
    /// may cut a word, and the next call continues it.
    pub fn next_chunk(&mut self, target_chars: usize) -> String {
        let book = self.text.chars();
        let len = book.len();
        let mut chunk = String::with_capacity(target_chars);
        let mut produced = 0;

        while produced < target_chars {
            if self.cursor >= len {
                if len == 0 {
                    break;
                }
                self.cursor = pick_random_start_offset(book, self.tail_guard, &mut self.rng);
                self.wraps += 1;
                debug!(
                    "'{}' wrapped to offset {} (wrap #{})",
                    self.entry.id, self.cursor, self.wraps
                );
                if !chunk.ends_with(char::is_whitespace) {
                    chunk.push(SEAM_SEPARATOR);
                    produced += 1;
                }
                continue;
            }

            let take = (target_chars - produced).min(len - self.cursor);
            chunk.extend(&book[self.cursor..self.cursor + take]);
            self.cursor += take;
            produced += take;
        }

        chunk
    }

    /// Appends chunks to `current` until it holds at least `min_chars`
    /// characters, and returns the extended text.
    ///
    /// Advances the cursor: callers must keep and pass back the returned
    /// text, never re-request a range they already received.
    pub fn ensure_length(&mut self, mut current: String, min_chars: usize) -> String {
        let mut have = current.chars().count();
        while have < min_chars {
            let chunk = self.next_chunk(self.chunk_chars.max(min_chars - have));
            if chunk.is_empty() {
                break;
            }
            have += chunk.chars().count();
            current.push_str(&chunk);
        }
        current
    }

    /// First buffer for a fresh session.
    pub fn create_initial_buffer(&mut self, min_chars: usize) -> String {
        self.ensure_length(String::new(), min_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry() -> CorpusIndexEntry {
        CorpusIndexEntry::new("sample", "/corpus/books/sample.txt")
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    /// `count` distinct numbered words separated by single spaces.
    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn is_safe(text: &[char], idx: usize) -> bool {
        idx == 0
            || idx == text.len()
            || (text[idx - 1].is_whitespace() && !text[idx].is_whitespace())
    }

    #[test]
    fn test_safe_boundary_skips_the_rest_of_the_word() {
        let text = chars("alpha beta  gamma");
        assert_eq!(find_safe_boundary(&text, 0), 0);
        assert_eq!(find_safe_boundary(&text, 2), 6);
        assert_eq!(find_safe_boundary(&text, 5), 6);
        assert_eq!(find_safe_boundary(&text, 6), 6);
        assert_eq!(find_safe_boundary(&text, 8), 12);
        assert_eq!(find_safe_boundary(&text, 10), 12);
    }

    #[test]
    fn test_safe_boundary_falls_back_to_zero_in_the_last_word() {
        let text = chars("alpha beta gamma");
        assert_eq!(find_safe_boundary(&text, 13), 0);
        assert_eq!(find_safe_boundary(&text, text.len()), 0);
        assert_eq!(find_safe_boundary(&text, 999), 0);
        assert_eq!(find_safe_boundary(&[], 0), 0);
    }

    #[test]
    fn test_random_start_stays_within_the_tail_guard() {
        let text = chars(&numbered_words(5_000));
        let mut rng = StdRng::seed_from_u64(7);
        let max_offset = text.len() - 1_000;

        for _ in 0..500 {
            let offset = pick_random_start_offset(&text, 1_000, &mut rng);
            assert!(is_safe(&text, offset));
            // a snap moves at most past one word and one space
            assert!(offset <= max_offset + 8, "offset {offset} beyond guard");
        }
    }

    #[test]
    fn test_short_text_always_starts_at_zero() {
        let text = chars(&numbered_words(50));
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(pick_random_start_offset(&text, TAIL_GUARD_CHARS, &mut rng), 0);
        }
    }

    #[test]
    fn test_next_chunk_returns_the_requested_length() {
        let book = BookText::new(&numbered_words(4_000));
        let mut stream = CorpusSessionStream::with_seed(entry(), book, 3);

        for target in [1, 17, 500, 4_000, 30_000] {
            let chunk = stream.next_chunk(target);
            assert_eq!(chunk.chars().count(), target);
        }
    }

    #[test]
    fn test_wrap_seam_never_fuses_words() {
        let book = BookText::new(&numbered_words(3_000));
        let words: std::collections::HashSet<String> =
            numbered_words(3_000).split(' ').map(String::from).collect();
        let mut stream = CorpusSessionStream::with_seed(entry(), book, 11).with_tail_guard(2_000);

        let text = stream.create_initial_buffer(100_000);
        assert!(stream.wrap_count() >= 3);
        assert!(!text.contains("  "));

        // every complete word in the stream is a real word from the book
        let tokens: Vec<&str> = text.split(' ').collect();
        for token in &tokens[1..tokens.len() - 1] {
            assert!(words.contains(*token), "fused or split word '{token}'");
        }
    }

    #[test]
    fn test_cursor_is_monotonic_until_it_wraps() {
        let book = BookText::new(&numbered_words(3_000));
        let len = book.len();
        let mut stream = CorpusSessionStream::with_seed(entry(), book.clone(), 5).with_tail_guard(4_000);

        let mut last = stream.cursor();
        let mut wraps = stream.wrap_count();
        for _ in 0..200 {
            stream.next_chunk(300);
            let cursor = stream.cursor();
            assert!(cursor <= len);
            if stream.wrap_count() == wraps {
                assert!(cursor >= last);
            } else {
                wraps = stream.wrap_count();
            }
            last = cursor;
        }
        assert!(wraps > 0);
    }

    #[test]
    fn test_ensure_length_extends_previous_text() {
        let book = BookText::new(&numbered_words(4_000));
        let mut stream = CorpusSessionStream::with_seed(entry(), book, 9);

        // chunks never shrink below the default step
        let first = stream.create_initial_buffer(1_000);
        assert_eq!(first.chars().count(), DEFAULT_CHUNK_CHARS);

        let extended = stream.ensure_length(first.clone(), DEFAULT_CHUNK_CHARS + 1);
        assert!(extended.starts_with(&first));
        assert_eq!(extended.chars().count(), 2 * DEFAULT_CHUNK_CHARS);

        let untouched = stream.ensure_length(extended.clone(), 10);
        assert_eq!(untouched, extended);
    }

    #[test]
    fn test_custom_chunk_size_sets_the_refill_floor() {
        let book = BookText::new(&numbered_words(4_000));
        let mut stream = CorpusSessionStream::with_seed(entry(), book, 3).with_chunk_chars(250);

        let first = stream.create_initial_buffer(10);
        assert_eq!(first.chars().count(), 250);

        // a larger shortfall is filled in one chunk
        let extended = stream.ensure_length(first, 1_000);
        assert_eq!(extended.chars().count(), 1_000);
    }

    #[test]
    fn test_ensure_length_on_empty_book_terminates() {
        let mut stream = CorpusSessionStream::with_seed(entry(), BookText::new(""), 1);
        assert_eq!(stream.next_chunk(100), "");
        assert_eq!(stream.create_initial_buffer(100), "");
    }

    #[test]
    fn test_book_text_is_shared_not_copied() {
        let book = BookText::new("shared text");
        let stream = CorpusSessionStream::with_seed(entry(), book.clone(), 1);
        assert!(stream.text().shares_storage_with(&book));
        assert_eq!(book.to_string(), "shared text");
    }

    proptest! {
        #[test]
        fn test_safe_boundary_invariant(words in prop::collection::vec("[a-z]{1,8}", 1..60), seps in prop::collection::vec(" {1,3}", 60), offset in 0usize..600) {
            let mut raw = String::new();
            for (i, w) in words.iter().enumerate() {
                if i > 0 {
                    raw.push_str(&seps[i]);
                }
                raw.push_str(w);
            }
            let text = chars(&raw);
            let offset = offset % text.len();
            let idx = find_safe_boundary(&text, offset);
            prop_assert!(is_safe(&text, idx));
            prop_assert!(idx == 0 || idx >= offset);
        }

        #[test]
        fn test_stream_never_stalls(seed in any::<u64>(), target in 1usize..5_000) {
            let book = BookText::new(&numbered_words(2_500));
            let mut stream = CorpusSessionStream::with_seed(entry(), book, seed);
            for _ in 0..5 {
                prop_assert_eq!(stream.next_chunk(target).chars().count(), target);
            }
        }
    }
}
