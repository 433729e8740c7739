//! Home-CBG visitor count maps.
//!
//! The vendor's `visitor_home_cbgs` column holds a flat JSON object of
//! origin code to visitor count, e.g. `{"482015551234":5,"482015551235":1}`.
//! [`OriginCounts::extract`] takes the first `{...}` span out of the field
//! and decodes it with `serde_json`. Counts must be unsigned integers and
//! repeated codes are summed.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors from reading an origin count map.
#[derive(Debug, Error)]
pub enum OriginMapError {
    /// The field has no `{...}` span.
    #[error("no {{...}} span found")]
    MissingSpan,
    /// The span is not a JSON object of code to unsigned count.
    #[error("malformed origin map at byte {position}: {source}")]
    Malformed {
        /// Byte offset into the original field.
        position: usize,
        /// Decoder error.
        source: serde_json::Error,
    },
}

/// Visitor counts keyed by origin (home CBG) code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OriginCounts(BTreeMap<String, u64>);

impl OriginCounts {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Parses the first `{...}` span found in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`OriginMapError::MissingSpan`] if there is no span, or
    /// [`OriginMapError::Malformed`] if the span is not a valid map.
    pub fn extract(text: &str) -> Result<Self, OriginMapError> {
        let start = text.find('{').ok_or(OriginMapError::MissingSpan)?;
        let end = text[start..]
            .find('}')
            .map(|offset| start + offset)
            .ok_or(OriginMapError::MissingSpan)?;
        let span = &text[start..=end];

        serde_json::from_str(span).map_err(|source| OriginMapError::Malformed {
            position: start + span_offset(span, source.line(), source.column()),
            source,
        })
    }

    /// Adds `count` visitors from `code`.
    pub fn add(&mut self, code: impl Into<String>, count: u64) {
        *self.0.entry(code.into()).or_insert(0) += count;
    }

    /// Sums `other` into `self`: shared codes add, new codes are inserted.
    pub fn merge(&mut self, other: &Self) {
        for (code, count) in &other.0 {
            self.add(code.as_str(), *count);
        }
    }

    /// Count for `code`.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<u64> {
        self.0.get(code).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Entries in code order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, u64> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a OriginCounts {
    type Item = (&'a String, &'a u64);
    type IntoIter = btree_map::Iter<'a, String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for OriginCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for OriginCounts {
    type Err = OriginMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::extract(s)
    }
}

impl<'de> Deserialize<'de> for OriginCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountsVisitor;

        impl<'de> Visitor<'de> for CountsVisitor {
            type Value = OriginCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of origin code to unsigned visitor count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut counts = OriginCounts::new();
                while let Some((code, count)) = access.next_entry::<String, u64>()? {
                    counts.add(code, count);
                }
                Ok(counts)
            }
        }

        deserializer.deserialize_map(CountsVisitor)
    }
}

/// Byte offset within `span` of a 1-based decoder line/column.
fn span_offset(span: &str, line: usize, column: usize) -> usize {
    let line_start: usize = span
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(span.len())
}
