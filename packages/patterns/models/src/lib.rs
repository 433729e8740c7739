#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weekly pattern aggregation types.

pub mod origin;

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use visitor_flows_geography_models::CountyFips;
use visitor_flows_source::schema::Column;

pub use origin::{OriginCounts, OriginMapError};

/// Parses the week date out of a vendor timestamp.
///
/// Only the leading `YYYY-MM-DD` is used, so `2021-01-04T00:00:00-06:00`
/// and `2021-01-04` both give 4 January 2021.
#[must_use]
pub fn parse_week_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Columns read from weekly pattern files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternColumn {
    PlaceId,
    LocationName,
    DateRangeStart,
    DateRangeEnd,
    RawVisitCounts,
    RawVisitorCounts,
    PoiCbg,
    VisitorHomeCbgs,
}

impl Column for PatternColumn {
    const ALL: &'static [Self] = &[
        Self::PlaceId,
        Self::LocationName,
        Self::DateRangeStart,
        Self::DateRangeEnd,
        Self::RawVisitCounts,
        Self::RawVisitorCounts,
        Self::PoiCbg,
        Self::VisitorHomeCbgs,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::PlaceId => "safegraph_place_id",
            Self::LocationName => "location_name",
            Self::DateRangeStart => "date_range_start",
            Self::DateRangeEnd => "date_range_end",
            Self::RawVisitCounts => "raw_visit_counts",
            Self::RawVisitorCounts => "raw_visitor_counts",
            Self::PoiCbg => "poi_cbg",
            Self::VisitorHomeCbgs => "visitor_home_cbgs",
        }
    }

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// Columns read from home panel summary files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelColumn {
    DateRangeStart,
    DateRangeEnd,
    CensusBlockGroup,
    NumberDevicesResiding,
}

impl Column for PanelColumn {
    const ALL: &'static [Self] = &[
        Self::DateRangeStart,
        Self::DateRangeEnd,
        Self::CensusBlockGroup,
        Self::NumberDevicesResiding,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::DateRangeStart => "date_range_start",
            Self::DateRangeEnd => "date_range_end",
            Self::CensusBlockGroup => "census_block_group",
            Self::NumberDevicesResiding => "number_devices_residing",
        }
    }

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// Week plus census block group; keys the panel sample size table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelKey {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cbg: String,
}

impl fmt::Display for PanelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.start, self.end, self.cbg)
    }
}

/// Week, POI block group, location name, and classification table.
///
/// Ordering is field order, so sorted output groups by week first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeeklyKey {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cbg: String,
    pub location_name: String,
    pub naics: String,
}

impl WeeklyKey {
    /// Panel key for the same week and block group.
    #[must_use]
    pub fn panel_key(&self) -> PanelKey {
        PanelKey {
            start: self.start,
            end: self.end,
            cbg: self.cbg.clone(),
        }
    }
}

impl fmt::Display for WeeklyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.start, self.end, self.cbg, self.location_name, self.naics
        )
    }
}

/// Summed counts for one [`WeeklyKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitTotals {
    pub visits: u64,
    pub visitors: u64,
    pub origins: OriginCounts,
}

impl VisitTotals {
    /// Adds one pattern row's counts.
    pub fn add(&mut self, visits: u64, visitors: u64, origins: &OriginCounts) {
        self.visits += visits;
        self.visitors += visitors;
        self.origins.merge(origins);
    }
}

/// One row of the county weekly visits table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyVisitRow {
    #[serde(rename = "Census_Block_Groups")]
    pub census_block_group: String,
    pub date_range_start: NaiveDate,
    pub date_range_end: NaiveDate,
    pub raw_visit_counts: u64,
    pub raw_visitor_counts: u64,
    /// Serialized [`OriginCounts`].
    pub visitor_home_cbgs: String,
    pub location_name: String,
    #[serde(rename = "NAICS")]
    pub naics: String,
    pub samplesize: u64,
}

impl WeeklyVisitRow {
    /// Builds the output row for a retained key.
    #[must_use]
    pub fn new(key: &WeeklyKey, totals: &VisitTotals, samplesize: u64) -> Self {
        Self {
            census_block_group: key.cbg.clone(),
            date_range_start: key.start,
            date_range_end: key.end,
            raw_visit_counts: totals.visits,
            raw_visitor_counts: totals.visitors,
            visitor_home_cbgs: totals.origins.to_string(),
            location_name: key.location_name.clone(),
            naics: key.naics.clone(),
            samplesize,
        }
    }
}

/// Outcome of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSummary {
    /// Weekly pattern files read.
    pub pattern_files: u64,
    /// Panel summary files read.
    pub panel_files: u64,
    /// Pattern rows read.
    pub pattern_rows: u64,
    /// Pattern rows whose POI was in an allow list (counted once per table).
    pub matched_rows: u64,
    /// Matched rows whose POI had no usable coordinates.
    pub unplaced_rows: u64,
    /// Distinct weekly keys before the county filter.
    pub weekly_keys: u64,
    /// Rows written after the county filter.
    pub rows_written: u64,
}

/// `[weekly]` table of a job file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyJob {
    /// Directory holding `patterns/` and `home_panel_summary/`.
    pub base_dir: PathBuf,
    /// Directory holding the extracted `<code>.csv` POI tables.
    pub poi_dir: PathBuf,
    /// Table names to aggregate (the codes used at extraction).
    pub naics: Vec<String>,
    /// Partition subdirectories under `patterns/` and `home_panel_summary/`.
    pub partitions: Vec<String>,
    /// County whose block groups are kept.
    pub county: CountyFips,
    /// Output CSV path.
    pub output: PathBuf,
}
