//! US state FIPS code utilities.
//!
//! A single table of `(fips, abbreviation, name)` for the 50 states + DC,
//! plus the lookups the POI geography filters need. The vendor `region`
//! column carries two-letter abbreviations, so [`region_fips`] is the
//! usual entry point.

/// `(FIPS, abbreviation, name)` for the 50 US states + DC, ordered by FIPS.
pub const STATES: &[(&str, &str, &str)] = &[
    ("01", "AL", "Alabama"),
    ("02", "AK", "Alaska"),
    ("04", "AZ", "Arizona"),
    ("05", "AR", "Arkansas"),
    ("06", "CA", "California"),
    ("08", "CO", "Colorado"),
    ("09", "CT", "Connecticut"),
    ("10", "DE", "Delaware"),
    ("11", "DC", "District of Columbia"),
    ("12", "FL", "Florida"),
    ("13", "GA", "Georgia"),
    ("15", "HI", "Hawaii"),
    ("16", "ID", "Idaho"),
    ("17", "IL", "Illinois"),
    ("18", "IN", "Indiana"),
    ("19", "IA", "Iowa"),
    ("20", "KS", "Kansas"),
    ("21", "KY", "Kentucky"),
    ("22", "LA", "Louisiana"),
    ("23", "ME", "Maine"),
    ("24", "MD", "Maryland"),
    ("25", "MA", "Massachusetts"),
    ("26", "MI", "Michigan"),
    ("27", "MN", "Minnesota"),
    ("28", "MS", "Mississippi"),
    ("29", "MO", "Missouri"),
    ("30", "MT", "Montana"),
    ("31", "NE", "Nebraska"),
    ("32", "NV", "Nevada"),
    ("33", "NH", "New Hampshire"),
    ("34", "NJ", "New Jersey"),
    ("35", "NM", "New Mexico"),
    ("36", "NY", "New York"),
    ("37", "NC", "North Carolina"),
    ("38", "ND", "North Dakota"),
    ("39", "OH", "Ohio"),
    ("40", "OK", "Oklahoma"),
    ("41", "OR", "Oregon"),
    ("42", "PA", "Pennsylvania"),
    ("44", "RI", "Rhode Island"),
    ("45", "SC", "South Carolina"),
    ("46", "SD", "South Dakota"),
    ("47", "TN", "Tennessee"),
    ("48", "TX", "Texas"),
    ("49", "UT", "Utah"),
    ("50", "VT", "Vermont"),
    ("51", "VA", "Virginia"),
    ("53", "WA", "Washington"),
    ("54", "WV", "West Virginia"),
    ("55", "WI", "Wisconsin"),
    ("56", "WY", "Wyoming"),
];

fn by_fips(fips: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    STATES.iter().find(|(code, _, _)| *code == fips)
}

/// Maps a two-digit FIPS code to the two-letter state abbreviation.
///
/// Returns `"??"` for unrecognized codes.
#[must_use]
pub fn state_abbr(fips: &str) -> &'static str {
    by_fips(fips).map_or("??", |(_, abbr, _)| abbr)
}

/// Maps a two-digit FIPS code to the full state name.
///
/// Returns `"Unknown"` for unrecognized codes.
#[must_use]
pub fn state_name(fips: &str) -> &'static str {
    by_fips(fips).map_or("Unknown", |(_, _, name)| name)
}

/// Maps a two-letter state abbreviation (any case) to its FIPS code.
#[must_use]
pub fn abbr_to_fips(abbr: &str) -> Option<&'static str> {
    let abbr = abbr.trim();
    STATES
        .iter()
        .find(|(_, a, _)| a.eq_ignore_ascii_case(abbr))
        .map(|(fips, _, _)| *fips)
}

/// Resolves a vendor `region` value to a FIPS code.
///
/// Accepts a two-letter abbreviation, a full state name, or an
/// already-numeric FIPS code.
#[must_use]
pub fn region_fips(region: &str) -> Option<&'static str> {
    let region = region.trim();
    if let Some(fips) = abbr_to_fips(region) {
        return Some(fips);
    }
    STATES
        .iter()
        .find(|(code, _, name)| *code == region || name.eq_ignore_ascii_case(region))
        .map(|(fips, _, _)| *fips)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fips_count() {
        assert_eq!(STATES.len(), 51);
    }

    #[test]
    fn abbr_roundtrip() {
        for (fips, _, _) in STATES {
            let abbr = state_abbr(fips);
            assert_ne!(abbr, "??", "unknown FIPS: {fips}");
            assert_eq!(abbr_to_fips(abbr), Some(*fips));
        }
    }

    #[test]
    fn unknown_codes() {
        assert_eq!(state_abbr("99"), "??");
        assert_eq!(state_name("99"), "Unknown");
        assert_eq!(abbr_to_fips("XX"), None);
        assert_eq!(region_fips("Atlantis"), None);
    }

    #[test]
    fn region_accepts_abbr_name_and_code() {
        assert_eq!(region_fips("tx"), Some("48"));
        assert_eq!(region_fips("Texas"), Some("48"));
        assert_eq!(region_fips("48"), Some("48"));
        assert_eq!(region_fips(" LA "), Some("22"));
    }
}
