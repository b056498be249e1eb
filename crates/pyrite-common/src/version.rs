//! Target language version.

use serde::{Deserialize, Serialize};

/// Version of the target language an analyzed file executes under.
///
/// Feature gating in the binder compares against these (e.g. `TypeAlias`
/// annotations are only recognized outside stubs from 3.10 on).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LanguageVersion {
    pub major: u8,
    pub minor: u8,
}

impl LanguageVersion {
    pub const V3_8: Self = Self { major: 3, minor: 8 };
    pub const V3_9: Self = Self { major: 3, minor: 9 };
    pub const V3_10: Self = Self {
        major: 3,
        minor: 10,
    };
    pub const V3_11: Self = Self {
        major: 3,
        minor: 11,
    };
    pub const V3_12: Self = Self {
        major: 3,
        minor: 12,
    };
    pub const V3_13: Self = Self {
        major: 3,
        minor: 13,
    };

    /// Newest version the checker is tested against; used as the default.
    pub const LATEST: Self = Self::V3_13;
}

impl Default for LanguageVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl std::fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        assert!(LanguageVersion::V3_9 < LanguageVersion::V3_10);
        assert!(LanguageVersion::V3_13 >= LanguageVersion::V3_10);
        assert_eq!(LanguageVersion::V3_10.to_string(), "3.10");
    }
}
