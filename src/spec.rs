//! Per-version query specification and configuration validation.
//!
//! A [`QuerySpec`] captures everything that differs between the lookup API's
//! versions: the character alphabet queries are built from, the maximum query
//! length, the minimum delay between requests, and the per-query result
//! truncation threshold. The engine itself is version-agnostic; versions are
//! data, not code.
//!
//! Specs are validated at construction. A spec that passes [`QuerySpec::new`]
//! is immutable and safe to enumerate.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Longest query length the enumerator supports.
pub const MAX_QUERY_LENGTH: u8 = 2;

/// Configuration errors.
///
/// These are fatal: they abort the run before any request is issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The alphabet contains no characters.
    #[error("alphabet is empty: cannot enumerate any queries")]
    EmptyAlphabet,

    /// The alphabet contains the same character twice.
    #[error("alphabet contains duplicate character {character:?}")]
    DuplicateCharacter {
        /// The repeated character.
        character: char,
    },

    /// The maximum query length is outside the supported range.
    #[error("unsupported max query length {value}: must be 1 or {MAX_QUERY_LENGTH}")]
    UnsupportedLength {
        /// The invalid length that was provided.
        value: u8,
    },

    /// The per-query result threshold is zero.
    #[error("max results per query must be at least 1")]
    ZeroMaxResults,

    /// An unrecognized API version name was supplied.
    #[error("unknown API version {value:?}: expected v1, v2, or v3")]
    UnknownVersion {
        /// The unrecognized version string.
        value: String,
    },

    /// The API base URL could not be parsed.
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        /// The invalid URL string.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
}

/// Immutable per-version query specification.
///
/// One instance exists per API version and is fixed at process start.
/// Construction validates the alphabet (non-empty, no duplicates), the
/// maximum length (1 or 2), and the truncation threshold (non-zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Query characters in enumeration order.
    alphabet: Vec<char>,
    /// Maximum query length (1 or 2).
    max_length: u8,
    /// Minimum delay between request dispatches.
    min_delay: Duration,
    /// Result count at which a response is considered truncated.
    max_results: usize,
}

impl QuerySpec {
    /// Creates a validated spec.
    ///
    /// The alphabet's iteration order becomes the enumeration order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyAlphabet`], [`ConfigError::DuplicateCharacter`],
    /// [`ConfigError::UnsupportedLength`], or [`ConfigError::ZeroMaxResults`]
    /// when the corresponding input is invalid.
    pub fn new(
        alphabet: impl IntoIterator<Item = char>,
        max_length: u8,
        min_delay: Duration,
        max_results: usize,
    ) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut chars = Vec::new();
        for character in alphabet {
            if !seen.insert(character) {
                return Err(ConfigError::DuplicateCharacter { character });
            }
            chars.push(character);
        }

        if chars.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        if max_length == 0 || max_length > MAX_QUERY_LENGTH {
            return Err(ConfigError::UnsupportedLength { value: max_length });
        }
        if max_results == 0 {
            return Err(ConfigError::ZeroMaxResults);
        }

        Ok(Self {
            alphabet: chars,
            max_length,
            min_delay,
            max_results,
        })
    }

    /// Returns the alphabet in enumeration order.
    #[must_use]
    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    /// Returns the maximum query length.
    #[must_use]
    pub fn max_length(&self) -> u8 {
        self.max_length
    }

    /// Returns the minimum delay between request dispatches.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Returns the result count at which a response is considered truncated.
    #[must_use]
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Returns a copy of this spec with a different minimum delay.
    ///
    /// Used when the operator overrides a preset's pacing on the command line.
    #[must_use]
    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }
}

/// The three supported API version presets.
///
/// Each preset fixes the alphabet, pacing, and truncation threshold observed
/// for that version of the lookup endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// Lowercase letters only; rate limit unverified, so pacing is conservative.
    V1,
    /// Lowercase letters and digits.
    V2,
    /// Lowercase letters plus `+`, `-`, `.`, and space.
    V3,
}

impl ApiVersion {
    /// Returns the URL path segment for this version.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
        }
    }

    /// Returns the query spec preset for this version.
    ///
    /// # Panics
    ///
    /// Panics if a preset fails validation. This cannot happen: the presets
    /// are static and validated by the tests below.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn spec(&self) -> QuerySpec {
        let (alphabet, delay_ms, max_results) = match self {
            Self::V1 => ("abcdefghijklmnopqrstuvwxyz", 1000, 10),
            Self::V2 => ("abcdefghijklmnopqrstuvwxyz0123456789", 1200, 12),
            Self::V3 => ("abcdefghijklmnopqrstuvwxyz+-. ", 750, 15),
        };
        QuerySpec::new(
            alphabet.chars(),
            MAX_QUERY_LENGTH,
            Duration::from_millis(delay_ms),
            max_results,
        )
        .expect("version presets are valid by construction")
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ApiVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            "v3" => Ok(Self::V3),
            _ => Err(ConfigError::UnknownVersion {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn spec_with_alphabet(alphabet: &str) -> Result<QuerySpec, ConfigError> {
        QuerySpec::new(alphabet.chars(), 2, Duration::from_millis(100), 10)
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_spec_new_accepts_valid_input() {
        let spec = spec_with_alphabet("abc").unwrap();
        assert_eq!(spec.alphabet(), &['a', 'b', 'c']);
        assert_eq!(spec.max_length(), 2);
        assert_eq!(spec.min_delay(), Duration::from_millis(100));
        assert_eq!(spec.max_results(), 10);
    }

    #[test]
    fn test_spec_new_rejects_empty_alphabet() {
        assert_eq!(
            spec_with_alphabet("").unwrap_err(),
            ConfigError::EmptyAlphabet
        );
    }

    #[test]
    fn test_spec_new_rejects_duplicate_character() {
        assert_eq!(
            spec_with_alphabet("aba").unwrap_err(),
            ConfigError::DuplicateCharacter { character: 'a' }
        );
    }

    #[test]
    fn test_spec_new_rejects_zero_length() {
        let result = QuerySpec::new("ab".chars(), 0, Duration::ZERO, 10);
        assert_eq!(
            result.unwrap_err(),
            ConfigError::UnsupportedLength { value: 0 }
        );
    }

    #[test]
    fn test_spec_new_rejects_length_beyond_two() {
        let result = QuerySpec::new("ab".chars(), 3, Duration::ZERO, 10);
        assert_eq!(
            result.unwrap_err(),
            ConfigError::UnsupportedLength { value: 3 }
        );
    }

    #[test]
    fn test_spec_new_accepts_length_one() {
        let spec = QuerySpec::new("ab".chars(), 1, Duration::ZERO, 10).unwrap();
        assert_eq!(spec.max_length(), 1);
    }

    #[test]
    fn test_spec_new_rejects_zero_max_results() {
        let result = QuerySpec::new("ab".chars(), 2, Duration::ZERO, 0);
        assert_eq!(result.unwrap_err(), ConfigError::ZeroMaxResults);
    }

    #[test]
    fn test_spec_with_min_delay_overrides_preset() {
        let spec = ApiVersion::V1.spec().with_min_delay(Duration::from_millis(250));
        assert_eq!(spec.min_delay(), Duration::from_millis(250));
        // Everything else is untouched
        assert_eq!(spec.alphabet().len(), 26);
    }

    // ==================== Preset Tests ====================

    #[test]
    fn test_v1_preset() {
        let spec = ApiVersion::V1.spec();
        assert_eq!(spec.alphabet().len(), 26);
        assert_eq!(spec.min_delay(), Duration::from_secs(1));
        assert_eq!(spec.max_results(), 10);
    }

    #[test]
    fn test_v2_preset() {
        let spec = ApiVersion::V2.spec();
        assert_eq!(spec.alphabet().len(), 36);
        assert_eq!(spec.min_delay(), Duration::from_millis(1200));
        assert_eq!(spec.max_results(), 12);
        assert!(spec.alphabet().contains(&'0'));
        assert!(spec.alphabet().contains(&'9'));
    }

    #[test]
    fn test_v3_preset() {
        let spec = ApiVersion::V3.spec();
        assert_eq!(spec.alphabet().len(), 30);
        assert_eq!(spec.min_delay(), Duration::from_millis(750));
        assert_eq!(spec.max_results(), 15);
        for extra in ['+', '-', '.', ' '] {
            assert!(spec.alphabet().contains(&extra), "missing {extra:?}");
        }
    }

    // ==================== Version Parsing Tests ====================

    #[test]
    fn test_version_from_str_valid() {
        assert_eq!("v1".parse::<ApiVersion>().unwrap(), ApiVersion::V1);
        assert_eq!("v2".parse::<ApiVersion>().unwrap(), ApiVersion::V2);
        assert_eq!("V3".parse::<ApiVersion>().unwrap(), ApiVersion::V3);
    }

    #[test]
    fn test_version_from_str_invalid() {
        let err = "v4".parse::<ApiVersion>().unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownVersion {
                value: "v4".to_string()
            }
        );
    }

    #[test]
    fn test_version_display_roundtrip() {
        for version in [ApiVersion::V1, ApiVersion::V2, ApiVersion::V3] {
            assert_eq!(version.to_string().parse::<ApiVersion>().unwrap(), version);
        }
    }
}
