//! Classification (NAICS) code filter.
//!
//! A requested code of length N matches a source code whose first N
//! characters equal it, so `"62"` selects the whole health-care sector
//! while `"622110"` selects only general hospitals.

use serde::{Deserialize, Serialize};

use crate::FilterError;

/// Which classification codes an extraction keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum NaicsFilter {
    /// Keep every POI, written to a single table named `label`.
    All {
        /// Table name; the first element of the list as supplied.
        label: String,
    },
    /// Keep POIs matching any of these codes, in the order supplied.
    Codes(Vec<String>),
}

impl NaicsFilter {
    /// Builds a filter from user-supplied codes.
    ///
    /// A list whose first element is `all` (any case) is the wildcard.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::EmptyCodes`] for an empty list,
    /// [`FilterError::BlankCode`] if any code is blank, or
    /// [`FilterError::DuplicateCode`] if a code repeats (each code names
    /// its own output table).
    pub fn from_codes<I, S>(codes: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes: Vec<String> = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .collect();

        let Some(first) = codes.first() else {
            return Err(FilterError::EmptyCodes);
        };

        if first.eq_ignore_ascii_case("all") {
            return Ok(Self::All {
                label: first.clone(),
            });
        }

        if codes.iter().any(String::is_empty) {
            return Err(FilterError::BlankCode);
        }

        for (i, code) in codes.iter().enumerate() {
            if codes[..i].contains(code) {
                return Err(FilterError::DuplicateCode(code.clone()));
            }
        }

        Ok(Self::Codes(codes))
    }

    /// Whether this is the wildcard filter.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All { .. })
    }

    /// Output table names, one per requested code.
    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        match self {
            Self::All { label } => vec![label.as_str()],
            Self::Codes(codes) => codes.iter().map(String::as_str).collect(),
        }
    }

    /// Table names whose code matches `source_code`, in request order.
    #[must_use]
    pub fn matching<'a>(&'a self, source_code: &str) -> Vec<&'a str> {
        match self {
            Self::All { label } => vec![label.as_str()],
            Self::Codes(codes) => codes
                .iter()
                .filter(|code| code_matches(code, source_code))
                .map(String::as_str)
                .collect(),
        }
    }
}

/// Prefix match of `requested` against `source_code`.
///
/// An empty source code never matches.
#[must_use]
pub fn code_matches(requested: &str, source_code: &str) -> bool {
    let source_code = source_code.trim();
    !source_code.is_empty() && source_code.get(..requested.len()) == Some(requested)
}

impl TryFrom<Vec<String>> for NaicsFilter {
    type Error = FilterError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_codes(value)
    }
}

impl From<NaicsFilter> for Vec<String> {
    fn from(value: NaicsFilter) -> Self {
        match value {
            NaicsFilter::All { label } => vec![label],
            NaicsFilter::Codes(codes) => codes,
        }
    }
}
