//! Catalog identifiers
//!
//! A MyAnimeList id is an opaque positive integer. The cache keys entries by
//! its canonical decimal string, so `CatalogId` owns that conversion.

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Opaque positive identifier of an external catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogId(NonZeroU64);

impl CatalogId {
    /// Create an id, rejecting zero
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Canonical string form used as the cache key
    pub fn key(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid catalog id {0:?}: expected a positive integer")]
pub struct ParseIdError(String);

impl FromStr for CatalogId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .ok()
            .and_then(CatalogId::new)
            .ok_or_else(|| ParseIdError(s.to_string()))
    }
}

/// Accept an id written either as a number or as a numeric string.
/// The curated YAML list mixes both (`mal: 32281` and `mal: "32281"`).
impl<'de> Deserialize<'de> for CatalogId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de;

        struct CatalogIdVisitor;

        impl<'de> de::Visitor<'de> for CatalogIdVisitor {
            type Value = CatalogId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a positive integer or a string containing one")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<CatalogId, E> {
                CatalogId::new(value).ok_or_else(|| de::Error::custom("catalog id must be positive"))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<CatalogId, E> {
                u64::try_from(value)
                    .ok()
                    .and_then(CatalogId::new)
                    .ok_or_else(|| de::Error::custom("catalog id must be positive"))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<CatalogId, E> {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(CatalogIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_rejected() {
        assert!(CatalogId::new(0).is_none());
        assert!("0".parse::<CatalogId>().is_err());
        assert!("-4".parse::<CatalogId>().is_err());
        assert!("abc".parse::<CatalogId>().is_err());
    }

    #[test]
    fn test_key_is_decimal_string() {
        let id: CatalogId = " 32281 ".parse().unwrap();
        assert_eq!(id.get(), 32281);
        assert_eq!(id.key(), "32281");
        assert_eq!(id.to_string(), "32281");
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let ids: Vec<CatalogId> = serde_json::from_str(r#"[1, "22", 333]"#).unwrap();
        let raw: Vec<u64> = ids.into_iter().map(CatalogId::get).collect();
        assert_eq!(raw, vec![1, 22, 333]);

        assert!(serde_json::from_str::<CatalogId>("0").is_err());
        assert!(serde_json::from_str::<CatalogId>("\"x\"").is_err());
        assert!(serde_json::from_str::<CatalogId>("-1").is_err());
    }
}
