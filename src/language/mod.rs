pub mod core;
pub mod filler;

pub use self::core::{Language, LanguageError};
pub use filler::FillerStream;
