//! Immutable search configuration carried by a memory space.

use crate::MemoryFlags;

/// Default result cap of an initial scan.
pub const DEFAULT_SEARCH_LIMIT: usize = 10_000;

/// Divisors tried by guessing scans when none are configured.
pub const DEFAULT_GUESS_DIVISORS: [u32; 5] = [1, 2, 4, 10, 100];

/// Search defaults applied by [`crate::MemorySpace::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SearchConfig {
    /// Result cap of an initial scan.
    pub default_limit: usize,
    /// Eligibility filter of a new query.
    pub default_flags: MemoryFlags,
    /// Divisors tried by guessing scans, in order. `1` is always tried.
    pub guess_divisors: Vec<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_SEARCH_LIMIT,
            default_flags: MemoryFlags::ReadWrite,
            guess_divisors: DEFAULT_GUESS_DIVISORS.to_vec(),
        }
    }
}

impl SearchConfig {
    /// Configuration that only reports exact (divisor `1`) guesses.
    #[must_use]
    pub fn exact() -> Self {
        Self {
            guess_divisors: vec![1],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SearchConfig, DEFAULT_SEARCH_LIMIT};
    use crate::MemoryFlags;

    #[test]
    fn default_config_matches_search_contract() {
        let config = SearchConfig::default();
        assert_eq!(config.default_limit, DEFAULT_SEARCH_LIMIT);
        assert_eq!(config.default_flags, MemoryFlags::ReadWrite);
        assert_eq!(config.guess_divisors.first(), Some(&1));
    }

    #[test]
    fn exact_config_keeps_other_defaults() {
        let config = SearchConfig::exact();
        assert_eq!(config.guess_divisors, vec![1]);
        assert_eq!(config.default_limit, DEFAULT_SEARCH_LIMIT);
    }
}
