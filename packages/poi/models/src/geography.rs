//! Geography restriction applied to core POI rows.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use visitor_flows_geography_models::fips;

use crate::FilterError;

/// How a [`GeographyFilter`] interprets its place map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeographyScale {
    /// `region` must be a key.
    State,
    /// `city` must be a key whose value is the FIPS code of `region`.
    StateCity,
    /// `region` and `city` must each be keys, independently of one another.
    StateCityKeys,
}

impl GeographyScale {
    /// Name used on the command line and in job files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::StateCity => "state-city",
            Self::StateCityKeys => "state-city-keys",
        }
    }
}

impl fmt::Display for GeographyScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeographyScale {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "state" => Ok(Self::State),
            "state-city" => Ok(Self::StateCity),
            "state-city-keys" => Ok(Self::StateCityKeys),
            other => Err(FilterError::UnknownScale(other.to_string())),
        }
    }
}

/// Scale plus a map of place name (or region code) to 2-digit state FIPS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeographyFilter {
    pub scale: GeographyScale,
    pub places: BTreeMap<String, String>,
}

impl GeographyFilter {
    #[must_use]
    pub const fn new(scale: GeographyScale, places: BTreeMap<String, String>) -> Self {
        Self { scale, places }
    }

    /// State-scale filter from two-letter abbreviations.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownState`] for an unrecognized abbreviation.
    pub fn states<I, S>(abbrs: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let places = abbrs
            .into_iter()
            .map(|abbr| {
                let abbr = abbr.as_ref().trim().to_ascii_uppercase();
                fips::abbr_to_fips(&abbr)
                    .map(|code| (abbr.clone(), code.to_string()))
                    .ok_or(FilterError::UnknownState(abbr))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self::new(GeographyScale::State, places))
    }

    /// Human-readable place list for logs, e.g. `Houston, TX; LA (Louisiana)`.
    #[must_use]
    pub fn describe(&self) -> String {
        self.places
            .iter()
            .map(|(place, code)| {
                let abbr = fips::state_abbr(code);
                if place.eq_ignore_ascii_case(abbr) {
                    format!("{place} ({})", fips::state_name(code))
                } else {
                    format!("{place}, {abbr}")
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Whether a POI in `region` / `city` passes.
    #[must_use]
    pub fn matches(&self, region: &str, city: &str) -> bool {
        match self.scale {
            GeographyScale::State => self.places.contains_key(region),
            GeographyScale::StateCityKeys => {
                self.places.contains_key(region) && self.places.contains_key(city)
            }
            GeographyScale::StateCity => self
                .places
                .get(city)
                .is_some_and(|code| fips::region_fips(region) == Some(code.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn state_scale_checks_region_key() {
        let filter = GeographyFilter::states(["tx", "LA"]).unwrap();
        assert_eq!(filter.places.get("TX").map(String::as_str), Some("48"));
        assert!(filter.matches("TX", "Houston"));
        assert!(filter.matches("LA", "anything"));
        assert!(!filter.matches("OK", "Tulsa"));
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!(matches!(
            GeographyFilter::states(["TX", "ZZ"]),
            Err(FilterError::UnknownState(s)) if s == "ZZ"
        ));
    }

    #[test]
    fn state_city_requires_city_in_matching_state() {
        let filter = GeographyFilter::new(
            GeographyScale::StateCity,
            places(&[("Houston", "48"), ("Portland", "41")]),
        );
        assert!(filter.matches("TX", "Houston"));
        assert!(filter.matches("OR", "Portland"));
        // Portland, ME has a different state FIPS
        assert!(!filter.matches("ME", "Portland"));
        assert!(!filter.matches("TX", "Dallas"));
    }

    #[test]
    fn state_city_keys_checks_both_keys_independently() {
        let filter = GeographyFilter::new(
            GeographyScale::StateCityKeys,
            places(&[("TX", "48"), ("Houston", "48")]),
        );
        assert!(filter.matches("TX", "Houston"));
        assert!(!filter.matches("TX", "Dallas"));
        assert!(!filter.matches("LA", "Houston"));
    }

    #[test]
    fn describes_states_by_name_and_cities_by_state() {
        let states = GeographyFilter::states(["la", "TX"]).unwrap();
        assert_eq!(states.describe(), "LA (Louisiana); TX (Texas)");

        let cities = GeographyFilter::new(
            GeographyScale::StateCity,
            places(&[("Houston", "48"), ("Nowhere", "99")]),
        );
        assert_eq!(cities.describe(), "Houston, TX; Nowhere, ??");
    }

    #[test]
    fn scale_names_round_trip() {
        for scale in [
            GeographyScale::State,
            GeographyScale::StateCity,
            GeographyScale::StateCityKeys,
        ] {
            assert_eq!(scale.as_str().parse::<GeographyScale>().unwrap(), scale);
        }
        assert!("county".parse::<GeographyScale>().is_err());
    }
}
