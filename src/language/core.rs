use include_dir::{include_dir, Dir};
use serde::Deserialize;
use thiserror::Error;

static LANG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/lang");

#[derive(Error, Debug)]
pub enum LanguageError {
    #[error("language file not found: {0}")]
    NotFound(String),

    #[error("language file is not valid utf-8: {0}")]
    Encoding(String),

    #[error("unable to deserialize language json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("language {0} has no words")]
    Empty(String),
}

/// Embedded word list used for filler text.
#[derive(Deserialize, Clone, Debug)]
pub struct Language {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl Language {
    pub fn load(name: &str) -> Result<Self, LanguageError> {
        read_language_from_file(&format!("{name}.json"))
    }
}

fn read_language_from_file(file_name: &str) -> Result<Language, LanguageError> {
    let file = LANG_DIR
        .get_file(file_name)
        .ok_or_else(|| LanguageError::NotFound(file_name.to_string()))?;

    let file_as_str = file
        .contents_utf8()
        .ok_or_else(|| LanguageError::Encoding(file_name.to_string()))?;

    let lang: Language = serde_json::from_str(file_as_str)?;
    if lang.words.is_empty() {
        return Err(LanguageError::Empty(lang.name));
    }
    Ok(lang)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_language_load() {
        let lang = Language::load("english").unwrap();

        assert_eq!(lang.name, "english");
        assert!(!lang.words.is_empty());
        assert_eq!(lang.size as usize, lang.words.len());
    }

    #[test]
    fn test_words_are_single_tokens() {
        let lang = Language::load("english").unwrap();
        assert!(lang
            .words
            .iter()
            .all(|w| !w.is_empty() && !w.chars().any(char::is_whitespace)));
    }

    #[test]
    fn test_language_deserialization() {
        let json_data = r#"
        {
            "name": "test",
            "size": 3,
            "words": ["hello", "world", "test"]
        }
        "#;

        let lang: Language = serde_json::from_str(json_data).unwrap();

        assert_eq!(lang.name, "test");
        assert_eq!(lang.size, 3);
        assert!(lang.words.contains(&"world".to_string()));
    }

    #[test]
    fn test_read_nonexistent_language_file() {
        assert_matches!(
            Language::load("nonexistent"),
            Err(LanguageError::NotFound(name)) if name == "nonexistent.json"
        );
    }
}
