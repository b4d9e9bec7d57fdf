//! # Purpose Tags
//!
//! A purpose tag classifies why an asset was uploaded and selects the
//! naming strategy for its archive. The set is closed: adding a purpose
//! means adding a variant here, and every `match` in the workspace has to
//! handle it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::key::AssetKey;

/// Suffix of every stored archive file.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Recognized asset purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Subject profile picture.
    ProfilePicture,
}

impl Purpose {
    /// Every recognized purpose, in declaration order.
    pub const ALL: [Purpose; 1] = [Purpose::ProfilePicture];

    /// Wire tag for this purpose.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ProfilePicture => "profile_picture",
        }
    }

    /// File name of the archive holding `key`'s asset for this purpose:
    /// `{key}-{tag}.tar.gz`.
    pub fn archive_file_name(&self, key: &AssetKey) -> String {
        match self {
            Self::ProfilePicture => format!("{key}-{}{ARCHIVE_SUFFIX}", self.tag()),
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Purpose {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.tag() == s)
            .ok_or_else(|| CoreError::UnsupportedPurpose(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tag() {
        assert_eq!(
            "profile_picture".parse::<Purpose>().unwrap(),
            Purpose::ProfilePicture
        );
    }

    #[test]
    fn rejects_unknown_tags() {
        for tag in ["unknown_tag", "", "Profile_Picture", "profile picture"] {
            assert_eq!(
                tag.parse::<Purpose>(),
                Err(CoreError::UnsupportedPurpose(tag.to_string()))
            );
        }
    }

    #[test]
    fn tag_round_trips_through_display() {
        for purpose in Purpose::ALL {
            assert_eq!(purpose.to_string().parse::<Purpose>().unwrap(), purpose);
        }
    }

    #[test]
    fn archive_file_name_layout() {
        let key = AssetKey::derive("Jane Doe").unwrap();
        assert_eq!(
            Purpose::ProfilePicture.archive_file_name(&key),
            "jane_doe-profile_picture.tar.gz"
        );
    }

    #[test]
    fn serde_uses_wire_tag() {
        let json = serde_json::to_string(&Purpose::ProfilePicture).unwrap();
        assert_eq!(json, "\"profile_picture\"");
    }
}
