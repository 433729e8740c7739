#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tract-level visitor flow network.
//!
//! Takes one week of the county weekly visits table, expands each row's
//! home block group map, keeps home block groups inside the county, and
//! sums visitors by destination tract and home tract. Each flow gets both
//! tract centroids and the geodesic distance between them.

pub mod centroids;
pub mod flows;
pub mod output;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use visitor_flows_geography_models::CountyFips;
use visitor_flows_patterns_models::{OriginCounts, OriginMapError, WeeklyVisitRow};
use visitor_flows_source::SourceError;
use visitor_flows_source::files::open_decoded;

use crate::centroids::{CentroidSource, CentroidTable};
use crate::flows::{FlowAccumulator, TractFlow};
use crate::output::{FlowFormat, write_flows};

/// Default shift, in degrees, applied to destination centroids so that
/// flows within one tract do not collapse to a point.
pub const DEFAULT_DESTINATION_OFFSET: f64 = 0.02;

/// Errors from building the flow network.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Reading the visits table or centroid table failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A `visitor_home_cbgs` field did not parse.
    #[error("{path} line {line}: {source}")]
    MalformedOriginMap {
        /// Visits table.
        path: String,
        /// 1-based line of the row.
        line: u64,
        /// Parser error.
        source: OriginMapError,
    },

    /// I/O error on an output table.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV error reading the visits table or writing an output table.
    #[error("CSV error at {path}: {source}")]
    Csv {
        /// Path that caused the error.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },
}

/// Which week and county to roll up.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub week_end: NaiveDate,
    pub county: CountyFips,
    pub destination_offset: f64,
}

const fn default_offset() -> f64 {
    DEFAULT_DESTINATION_OFFSET
}

/// `[flows]` table of a job file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowJob {
    /// County weekly visits table.
    pub visits: PathBuf,
    /// `GEOID,LON,LAT` tract centroid table.
    pub centroids: PathBuf,
    pub county: CountyFips,
    /// `date_range_end` of the week to keep, `YYYY-MM-DD`.
    pub week_end: NaiveDate,
    /// Destination label used in column names.
    pub name: String,
    /// Output path prefix; suffixes such as `-CT.csv` are appended.
    pub output_prefix: PathBuf,
    #[serde(default = "default_offset")]
    pub destination_offset: f64,
    #[serde(default)]
    pub format: FlowFormat,
}

impl FlowJob {
    #[must_use]
    pub fn options(&self) -> FlowOptions {
        FlowOptions {
            week_end: self.week_end,
            county: self.county.clone(),
            destination_offset: self.destination_offset,
        }
    }
}

/// Builds tract flows for one week of a county weekly visits table.
///
/// # Errors
///
/// Returns [`NetworkError::Csv`] if the table does not match the weekly
/// visits layout and [`NetworkError::MalformedOriginMap`] if a home block
/// group map does not parse.
pub fn build_tract_flows(
    visits: &Path,
    centroids: &dyn CentroidSource,
    options: &FlowOptions,
) -> Result<Vec<TractFlow>, NetworkError> {
    let display = visits.display().to_string();
    let mut reader = csv::Reader::from_reader(open_decoded(visits)?);
    let mut accumulator = FlowAccumulator::new();
    let mut rows_in_week = 0u64;

    for (index, result) in reader.deserialize::<WeeklyVisitRow>().enumerate() {
        let row = result.map_err(|e| NetworkError::Csv {
            path: display.clone(),
            source: e,
        })?;
        if row.date_range_end != options.week_end {
            continue;
        }
        rows_in_week += 1;

        let origins =
            OriginCounts::extract(&row.visitor_home_cbgs).map_err(|e| NetworkError::MalformedOriginMap {
                path: display.clone(),
                line: index as u64 + 2,
                source: e,
            })?;
        accumulator.add_row(&row, &origins, &options.county);
    }

    log::info!(
        "{display}: {rows_in_week} rows for week ending {}, {} tract pairs",
        options.week_end,
        accumulator.counts().len()
    );

    Ok(accumulator.into_flows(centroids, options.destination_offset))
}

/// Runs a `[flows]` job and returns the files written.
///
/// # Errors
///
/// Returns any [`NetworkError`] from loading centroids, building flows,
/// or writing tables.
pub fn run_flow_job(job: &FlowJob) -> Result<Vec<PathBuf>, NetworkError> {
    let centroids = CentroidTable::load(&job.centroids)?;
    let flows = build_tract_flows(&job.visits, &centroids, &job.options())?;
    write_flows(&job.output_prefix, &job.name, &flows, job.format)
}
