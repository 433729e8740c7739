#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core POI record and extraction job types.

pub mod geography;
pub mod naics;

use std::collections::BTreeMap;
use std::path::PathBuf;

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use visitor_flows_source::SourceError;
use visitor_flows_source::schema::{Column, HeaderBinding};

pub use geography::{GeographyFilter, GeographyScale};
pub use naics::NaicsFilter;

/// Errors building filters from user input.
#[derive(Debug, Error)]
pub enum FilterError {
    /// No classification codes were supplied.
    #[error("NAICS filter needs at least one code")]
    EmptyCodes,
    /// A supplied classification code was blank.
    #[error("NAICS filter contains a blank code")]
    BlankCode,
    /// A classification code was supplied more than once.
    #[error("NAICS filter lists code {0:?} more than once")]
    DuplicateCode(String),
    /// Unrecognized geography scale name.
    #[error("Unknown geography scale {0:?} (expected state, state-city, or state-city-keys)")]
    UnknownScale(String),
    /// Unrecognized state abbreviation.
    #[error("Unknown state abbreviation {0:?}")]
    UnknownState(String),
}

/// Columns of the core POI file that are carried into the output tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoiColumn {
    PlaceId,
    ParentPlaceId,
    LocationName,
    BrandIds,
    Brands,
    TopCategory,
    SubCategory,
    NaicsCode,
    Latitude,
    Longitude,
    StreetAddress,
    City,
    Region,
    PostalCode,
    IsoCountryCode,
    PhoneNumber,
    OpenHours,
    CategoryTags,
}

impl Column for PoiColumn {
    const ALL: &'static [Self] = &[
        Self::PlaceId,
        Self::ParentPlaceId,
        Self::LocationName,
        Self::BrandIds,
        Self::Brands,
        Self::TopCategory,
        Self::SubCategory,
        Self::NaicsCode,
        Self::Latitude,
        Self::Longitude,
        Self::StreetAddress,
        Self::City,
        Self::Region,
        Self::PostalCode,
        Self::IsoCountryCode,
        Self::PhoneNumber,
        Self::OpenHours,
        Self::CategoryTags,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::PlaceId => "safegraph_place_id",
            Self::ParentPlaceId => "parent_safegraph_place_id",
            Self::LocationName => "location_name",
            Self::BrandIds => "safegraph_brand_ids",
            Self::Brands => "brands",
            Self::TopCategory => "top_category",
            Self::SubCategory => "sub_category",
            Self::NaicsCode => "naics_code",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::StreetAddress => "street_address",
            Self::City => "city",
            Self::Region => "region",
            Self::PostalCode => "postal_code",
            Self::IsoCountryCode => "iso_country_code",
            Self::PhoneNumber => "phone_number",
            Self::OpenHours => "open_hours",
            Self::CategoryTags => "category_tags",
        }
    }

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// Header row of every POI output table.
#[must_use]
pub fn output_header() -> Vec<&'static str> {
    PoiColumn::ALL.iter().map(|c| c.name()).collect()
}

/// One POI, holding the output columns in [`PoiColumn::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoiRecord {
    values: Vec<String>,
}

impl PoiRecord {
    /// Copies the output columns out of a bound source row.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::SchemaViolation`] if the row is too short.
    pub fn from_row(
        binding: &HeaderBinding<PoiColumn>,
        row: &StringRecord,
    ) -> Result<Self, SourceError> {
        let values = PoiColumn::ALL
            .iter()
            .map(|&column| binding.field(row, column).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }

    /// Builds a record from values in [`PoiColumn::ALL`] order.
    ///
    /// Missing trailing values are left empty and extras are dropped.
    #[must_use]
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: Vec<String> = values.into_iter().map(Into::into).collect();
        values.resize(PoiColumn::ALL.len(), String::new());
        Self { values }
    }

    /// Raw value of `column`.
    #[must_use]
    pub fn get(&self, column: PoiColumn) -> &str {
        &self.values[column.ordinal()]
    }

    /// Vendor place identifier.
    #[must_use]
    pub fn place_id(&self) -> &str {
        self.get(PoiColumn::PlaceId)
    }

    /// Classification code, trimmed.
    #[must_use]
    pub fn naics_code(&self) -> &str {
        self.get(PoiColumn::NaicsCode).trim()
    }

    /// Region (state abbreviation in US data), trimmed.
    #[must_use]
    pub fn region(&self) -> &str {
        self.get(PoiColumn::Region).trim()
    }

    /// City, trimmed.
    #[must_use]
    pub fn city(&self) -> &str {
        self.get(PoiColumn::City).trim()
    }

    /// Whether the POI is in the United States.
    #[must_use]
    pub fn is_us(&self) -> bool {
        self.get(PoiColumn::IsoCountryCode).trim() == "US"
    }

    /// Values in output column order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }
}

/// Outcome of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractSummary {
    /// Core POI parts read.
    pub parts_read: u64,
    /// Data rows read across all parts.
    pub rows_scanned: u64,
    /// Rows written, per output table.
    pub rows_written: BTreeMap<String, u64>,
    /// Matching rows dropped because their place id was already written.
    pub duplicates_skipped: u64,
}

impl ExtractSummary {
    /// Total rows written across all tables.
    #[must_use]
    pub fn total_written(&self) -> u64 {
        self.rows_written.values().sum()
    }
}

/// `[pois]` table of a job file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiJob {
    /// Classification codes, or `["all"]`.
    pub naics: NaicsFilter,
    /// Geography restriction.
    pub geography: GeographyFilter,
    /// Directory holding the core POI partitions.
    pub core_poi_dir: PathBuf,
    /// Partition names, processed in this order.
    pub partitions: Vec<String>,
    /// Directory that receives one `<code>.csv` per table.
    pub output_dir: PathBuf,
}
