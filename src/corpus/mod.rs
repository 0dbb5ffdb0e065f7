//! Corpus streaming: manifest and book loading, the endless per-session
//! text stream, and background preparation of the next session.

pub mod index;
pub mod library;
pub mod normalize;
pub mod preload;
pub mod session;
pub mod source;
pub mod stream;

pub use index::{CorpusIndexEntry, INDEX_PATH};
pub use library::CorpusLibrary;
pub use normalize::{normalize_text, MIN_BOOK_CHARS};
pub use preload::{RequestGeneration, RequestTicket, SessionPreloader};
pub use session::{create_corpus_session, CorpusSession, SessionOptions, DEFAULT_INITIAL_CHARS};
pub use source::{CorpusSource, DirCorpusSource, HttpCorpusSource, MemoryCorpusSource};
pub use stream::{BookText, CorpusSessionStream, DEFAULT_CHUNK_CHARS, TAIL_GUARD_CHARS};
