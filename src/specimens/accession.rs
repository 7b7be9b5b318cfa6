//! Accession numbers: the human-readable specimen identity.
//!
//! Format is `S{yy}-{nnnnn}`: two-digit registration year and a random
//! five-digit suffix. Random suffixes can collide, so uniqueness is enforced
//! by the store's unique constraint and the registrar retries on conflict.

use chrono::{DateTime, Datelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex};
use thiserror::Error;

/// Number of distinct suffixes per year (00000..=99999)
pub const SUFFIX_SPACE: u32 = 100_000;

static ACCESSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^S\d{2}-\d{5}$").expect("accession pattern is a valid regex")
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid accession number (expected S<yy>-<nnnnn>)")]
pub struct AccessionParseError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessionNumber(String);

impl AccessionNumber {
    pub fn new(year: i32, suffix: u32) -> Self {
        Self(format!("S{:02}-{:05}", year.rem_euclid(100), suffix % SUFFIX_SPACE))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccessionNumber {
    type Err = AccessionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let candidate = s.trim().to_ascii_uppercase();
        if ACCESSION_PATTERN.is_match(&candidate) {
            Ok(Self(candidate))
        } else {
            Err(AccessionParseError(s.to_string()))
        }
    }
}

impl TryFrom<String> for AccessionNumber {
    type Error = AccessionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccessionNumber> for String {
    fn from(value: AccessionNumber) -> Self {
        value.0
    }
}

/// Source of candidate accession numbers.
///
/// Candidates are not guaranteed unique; callers insert under a uniqueness
/// constraint and ask again on collision.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AccessionSource: Send + Sync {
    fn generate(&self, issued_at: DateTime<Utc>) -> AccessionNumber;
}

/// Draws the five-digit suffix uniformly at random
#[derive(Debug, Default)]
pub struct RandomAccessionSource {
    seeded: Option<Mutex<StdRng>>,
}

impl RandomAccessionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic sequence of candidates, for tests and simulations
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    fn draw_suffix(&self) -> u32 {
        match &self.seeded {
            Some(rng) => {
                let mut rng = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                rng.random_range(0..SUFFIX_SPACE)
            }
            None => rand::rng().random_range(0..SUFFIX_SPACE),
        }
    }
}

impl AccessionSource for RandomAccessionSource {
    fn generate(&self, issued_at: DateTime<Utc>) -> AccessionNumber {
        AccessionNumber::new(issued_at.year(), self.draw_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_pads_year_and_suffix() {
        assert_eq!(AccessionNumber::new(2026, 123).as_str(), "S26-00123");
        assert_eq!(AccessionNumber::new(2007, 99_999).as_str(), "S07-99999");
        assert_eq!(AccessionNumber::new(2100, 0).as_str(), "S00-00000");
    }

    #[test]
    fn test_parse_accepts_valid_and_normalizes_case() {
        let parsed: AccessionNumber = "s26-00123".parse().unwrap();
        assert_eq!(parsed.as_str(), "S26-00123");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["S26-123", "X26-00123", "S2600123", "S26-001234", ""] {
            assert!(bad.parse::<AccessionNumber>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_generated_numbers_match_pattern_and_year() {
        let source = RandomAccessionSource::new();
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        for _ in 0..1_000 {
            let number = source.generate(now);
            assert!(ACCESSION_PATTERN.is_match(number.as_str()), "{number}");
            assert!(number.as_str().starts_with("S26-"));
        }
    }

    #[test]
    fn test_seeded_source_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let a = RandomAccessionSource::with_seed(7);
        let b = RandomAccessionSource::with_seed(7);
        for _ in 0..20 {
            assert_eq!(a.generate(now), b.generate(now));
        }
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let ok: AccessionNumber = serde_json::from_str("\"S26-00001\"").unwrap();
        assert_eq!(ok.as_str(), "S26-00001");
        assert!(serde_json::from_str::<AccessionNumber>("\"nope\"").is_err());
    }
}
