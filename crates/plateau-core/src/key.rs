//! # Asset Keys
//!
//! An [`AssetKey`] is the normalized, filesystem-safe form of a subject
//! name. Two subject names that differ only in case or in the width of
//! their whitespace runs map to the same key, and therefore to the same
//! archive slot.
//!
//! Normalization:
//!
//! 1. Split on Unicode whitespace, discarding leading and trailing runs.
//! 2. Join the remaining words with a single `_`.
//! 3. Lowercase the result.
//!
//! The result must be non-empty and must not contain path separators or
//! consist solely of dots, so it can always be used as one path segment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Upper bound on key length in bytes, leaving room for the purpose
/// suffix within common 255-byte file name limits.
pub const MAX_KEY_LEN: usize = 200;

/// Normalized subject name used to address stored archives.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetKey(String);

impl AssetKey {
    /// Derive the key for a subject name.
    ///
    /// Normalization is idempotent: deriving a key from an existing key's
    /// string yields the same key.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidInput`] if the subject is empty or whitespace
    /// only, contains a path separator or NUL, is a dot segment, or
    /// exceeds [`MAX_KEY_LEN`] bytes once normalized.
    pub fn derive(subject: &str) -> Result<Self, CoreError> {
        let normalized = subject
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();

        if normalized.is_empty() {
            return Err(CoreError::InvalidInput(
                "subject name must not be empty".to_string(),
            ));
        }
        if normalized.contains(['/', '\\', '\0']) {
            return Err(CoreError::InvalidInput(
                "subject name must not contain path separators".to_string(),
            ));
        }
        if normalized.chars().all(|c| c == '.') {
            return Err(CoreError::InvalidInput(
                "subject name must not be a dot segment".to_string(),
            ));
        }
        if normalized.len() > MAX_KEY_LEN {
            return Err(CoreError::InvalidInput(format!(
                "subject name must not exceed {MAX_KEY_LEN} bytes once normalized"
            )));
        }
        Ok(Self(normalized))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AssetKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::derive(&value)
    }
}

impl From<AssetKey> for String {
    fn from(key: AssetKey) -> Self {
        key.0
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn folds_case_and_whitespace() {
        let key = AssetKey::derive("Jane Doe").unwrap();
        assert_eq!(key.as_str(), "jane_doe");
        assert_eq!(key, AssetKey::derive("jane   doe").unwrap());
        assert_eq!(key, AssetKey::derive("  JANE\tDOE\n").unwrap());
    }

    #[test]
    fn single_word_is_lowercased() {
        assert_eq!(AssetKey::derive("Plateau").unwrap().as_str(), "plateau");
    }

    #[test]
    fn empty_and_blank_subjects_rejected() {
        assert!(matches!(
            AssetKey::derive(""),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            AssetKey::derive(" \t "),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn path_like_subjects_rejected() {
        for subject in ["../etc", "a/b", "a\\b", ".", "..", "nul\0byte"] {
            assert!(
                AssetKey::derive(subject).is_err(),
                "{subject:?} should be rejected"
            );
        }
    }

    #[test]
    fn overlong_subject_rejected() {
        let subject = "x".repeat(MAX_KEY_LEN + 1);
        assert!(AssetKey::derive(&subject).is_err());
        assert!(AssetKey::derive(&"x".repeat(MAX_KEY_LEN)).is_ok());
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let key: AssetKey = serde_json::from_str("\"jane_doe\"").unwrap();
        assert_eq!(key.as_str(), "jane_doe");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"jane_doe\"");
        assert!(serde_json::from_str::<AssetKey>("\"a/b\"").is_err());
    }

    proptest! {
        #[test]
        fn derivation_is_idempotent(subject in "[A-Za-z ]{1,40}") {
            if let Ok(key) = AssetKey::derive(&subject) {
                let again = AssetKey::derive(key.as_str()).unwrap();
                prop_assert_eq!(again, key);
            }
        }

        #[test]
        fn keys_never_contain_whitespace(subject in "\\PC{1,40}") {
            if let Ok(key) = AssetKey::derive(&subject) {
                prop_assert!(!key.as_str().chars().any(char::is_whitespace));
            }
        }
    }
}
