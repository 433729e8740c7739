#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census geography identifiers.
//!
//! Census GEOIDs are positional: 2-digit state FIPS, 3-digit county,
//! 6-digit tract, 1-digit block group. A census block group (CBG) GEOID is
//! therefore 12 characters and a tract GEOID is its 11-character prefix.

pub mod fips;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Length of a county GEOID (state + county).
pub const COUNTY_GEOID_LEN: usize = 5;

/// Length of a tract GEOID (state + county + tract).
pub const TRACT_GEOID_LEN: usize = 11;

/// Errors from parsing geography identifiers.
#[derive(Debug, thiserror::Error)]
pub enum GeoidError {
    /// County code was not exactly five ASCII digits.
    #[error("Invalid county FIPS {0:?}: expected 5 digits (2 state + 3 county)")]
    InvalidCounty(String),
}

/// A 5-digit county FIPS code (`"48201"` is Harris County, TX).
///
/// A GEOID belongs to the county when it starts with the code. Codes that
/// merely appear later in a GEOID (`"148201..."`) do not match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountyFips(String);

impl CountyFips {
    /// Validates and wraps a county code.
    ///
    /// # Errors
    ///
    /// Returns [`GeoidError::InvalidCounty`] unless `code` is 5 ASCII digits.
    pub fn new(code: &str) -> Result<Self, GeoidError> {
        let code = code.trim();
        if code.len() == COUNTY_GEOID_LEN && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_string()))
        } else {
            Err(GeoidError::InvalidCounty(code.to_string()))
        }
    }

    /// The full 5-digit code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 2-digit state part.
    #[must_use]
    pub fn state_fips(&self) -> &str {
        &self.0[..2]
    }

    /// The 3-digit county part.
    #[must_use]
    pub fn county_part(&self) -> &str {
        &self.0[2..]
    }

    /// Whether `geoid` lies inside this county.
    #[must_use]
    pub fn contains(&self, geoid: &str) -> bool {
        geoid.starts_with(self.0.as_str())
    }
}

impl fmt::Display for CountyFips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CountyFips {
    type Err = GeoidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CountyFips {
    type Error = GeoidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CountyFips> for String {
    fn from(value: CountyFips) -> Self {
        value.0
    }
}

/// Tract GEOID (first 11 characters) of a block-group or tract GEOID.
///
/// Returns `None` for identifiers too short to contain a tract.
#[must_use]
pub fn tract_geoid(geoid: &str) -> Option<&str> {
    geoid.get(..TRACT_GEOID_LEN)
}

/// 6-digit tract code (`TRACTCE`) of a block-group or tract GEOID.
#[must_use]
pub fn tract_code(geoid: &str) -> Option<&str> {
    geoid.get(COUNTY_GEOID_LEN..TRACT_GEOID_LEN)
}

/// 2-digit state code (`STATEFP`) of any GEOID.
#[must_use]
pub fn state_code(geoid: &str) -> Option<&str> {
    geoid.get(..2)
}

/// 3-digit county code (`COUNTYFP`) of any county-or-finer GEOID.
#[must_use]
pub fn county_code(geoid: &str) -> Option<&str> {
    geoid.get(2..COUNTY_GEOID_LEN)
}
