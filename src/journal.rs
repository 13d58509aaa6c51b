//! Journal entries and how they are keyed in the vector store.

use serde::{Deserialize, Serialize};

/// A stored journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Vector store record key.
    pub id: String,
    /// The raw entry text.
    pub text: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// How a record key is derived for a new entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    /// Opaque UUID v7 key; the text travels as record metadata.
    #[default]
    Generated,
    /// The entry text is its own key. Identical texts overwrite each other.
    Content,
}

impl KeyScheme {
    pub fn key_for(&self, text: &str) -> String {
        match self {
            Self::Generated => uuid::Uuid::now_v7().to_string(),
            Self::Content => text.to_string(),
        }
    }
}

impl JournalEntry {
    pub fn new(text: &str, scheme: KeyScheme) -> Self {
        Self {
            id: scheme.key_for(text),
            text: text.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique_for_identical_text() {
        let a = JournalEntry::new("went running", KeyScheme::Generated);
        let b = JournalEntry::new("went running", KeyScheme::Generated);
        assert_ne!(a.id, b.id);
        assert_eq!(a.text, b.text);
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn content_keys_collapse_identical_text() {
        let a = JournalEntry::new("went running", KeyScheme::Content);
        let b = JournalEntry::new("went running", KeyScheme::Content);
        assert_eq!(a.id, "went running");
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn key_scheme_parses_from_snake_case() {
        let scheme: KeyScheme = serde_json::from_str("\"content\"").unwrap();
        assert_eq!(scheme, KeyScheme::Content);
        assert_eq!(KeyScheme::default(), KeyScheme::Generated);
    }
}
