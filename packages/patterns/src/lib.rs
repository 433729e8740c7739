#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! County weekly visit aggregation.
//!
//! Builds the county table in four stages:
//!
//! 1. load the place ids of each extracted POI table ([`allow_list`]);
//! 2. sum visits, visitors, and home-CBG visitor maps per week, POI block
//!    group, location name, and table ([`visits`]);
//! 3. sum panel devices per week and block group ([`panel`]);
//! 4. keep block groups inside the county and attach the panel size.

pub mod allow_list;
pub mod panel;
pub mod visits;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use thiserror::Error;
use visitor_flows_patterns_models::{AggregateSummary, OriginMapError, WeeklyJob, WeeklyVisitRow};
use visitor_flows_source::SourceError;
use visitor_flows_source::files::{open_decoded, sorted_files};
use visitor_flows_source::progress::ProgressCallback;

use crate::allow_list::AllowList;
use crate::panel::PanelAccumulator;
use crate::visits::WeeklyAccumulator;

/// Errors from weekly aggregation.
#[derive(Debug, Error)]
pub enum PatternError {
    /// Reading a POI table, pattern file, or panel file failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A `visitor_home_cbgs` field did not parse.
    #[error("{path} line {line}: {source}")]
    MalformedOriginMap {
        /// Pattern file.
        path: String,
        /// 1-based line of the row.
        line: u64,
        /// Parser error.
        source: OriginMapError,
    },

    /// A retained week and block group has no panel sample size.
    #[error("No panel sample size for {key}")]
    MissingPanelEntry {
        /// `start|end|cbg` of the missing entry.
        key: String,
    },

    /// I/O error on the output table.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Output path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV error writing the output table.
    #[error("CSV write error at {path}: {source}")]
    Csv {
        /// Output path.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },
}

/// Pairs every weekly total with its panel sample size, in key order.
///
/// # Errors
///
/// Returns [`PatternError::MissingPanelEntry`] for the first weekly key
/// whose week and block group are absent from `panel`.
pub fn join_panel(
    weekly: &WeeklyAccumulator,
    panel: &PanelAccumulator,
) -> Result<Vec<WeeklyVisitRow>, PatternError> {
    weekly
        .totals()
        .iter()
        .map(|(key, totals)| {
            let panel_key = key.panel_key();
            let samplesize = panel
                .get(&panel_key)
                .ok_or_else(|| PatternError::MissingPanelEntry {
                    key: panel_key.to_string(),
                })?;
            Ok(WeeklyVisitRow::new(key, totals, samplesize))
        })
        .collect()
}

/// Writes rows with the county table header.
///
/// # Errors
///
/// Returns [`PatternError::Io`] or [`PatternError::Csv`] on write failure.
pub fn write_rows(path: &Path, rows: &[WeeklyVisitRow]) -> Result<(), PatternError> {
    let display = path.display().to_string();
    let io_err = |e| PatternError::Io {
        path: display.clone(),
        source: e,
    };
    let csv_err = |e| PatternError::Csv {
        path: display.clone(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = File::create(path).map_err(io_err)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    if rows.is_empty() {
        writer
            .write_record(WEEKLY_HEADER)
            .map_err(csv_err)?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(io_err)?;

    Ok(())
}

/// Header of the county weekly visits table.
pub const WEEKLY_HEADER: [&str; 9] = [
    "Census_Block_Groups",
    "date_range_start",
    "date_range_end",
    "raw_visit_counts",
    "raw_visitor_counts",
    "visitor_home_cbgs",
    "location_name",
    "NAICS",
    "samplesize",
];

fn partition_files(
    root: &Path,
    partitions: &[String],
    suffix: &str,
) -> Result<Vec<PathBuf>, PatternError> {
    let mut files = Vec::new();
    for partition in partitions {
        files.extend(sorted_files(&root.join(partition), suffix)?);
    }
    Ok(files)
}

/// Aggregates weekly visits for `job` and writes the county table.
///
/// # Errors
///
/// Returns the first [`PatternError`] hit; no output is written unless
/// every stage succeeds.
pub fn aggregate_weekly_visits(
    job: &WeeklyJob,
    progress: &dyn ProgressCallback,
) -> Result<AggregateSummary, PatternError> {
    let allow = AllowList::load(&job.poi_dir, &job.naics)?;
    if allow.is_empty() {
        log::warn!("POI tables in {} are empty", job.poi_dir.display());
    }

    let pattern_files = partition_files(&job.base_dir.join("patterns"), &job.partitions, ".csv.gz")?;
    let panel_files = partition_files(
        &job.base_dir.join("home_panel_summary"),
        &job.partitions,
        ".csv",
    )?;
    progress.set_total((pattern_files.len() + panel_files.len()) as u64);

    let mut weekly = WeeklyAccumulator::new();
    for path in &pattern_files {
        progress.set_message(format!("patterns {}", path.display()));
        weekly.read_file(open_decoded(path)?, &path.display().to_string(), &allow)?;
        progress.inc(1);
    }

    let mut panel = PanelAccumulator::new();
    for path in &panel_files {
        progress.set_message(format!("panel {}", path.display()));
        panel.read_file(open_decoded(path)?, &path.display().to_string())?;
        progress.inc(1);
    }

    let weekly_keys = weekly.len() as u64;
    weekly.retain_county(&job.county);
    panel.retain_county(&job.county);
    log::info!(
        "{} of {weekly_keys} weekly keys are in county {}",
        weekly.len(),
        job.county
    );

    if weekly.unplaced() > 0 {
        log::warn!(
            "{} matched pattern rows belong to POIs without coordinates",
            weekly.unplaced()
        );
    }

    let rows = join_panel(&weekly, &panel)?;
    write_rows(&job.output, &rows)?;
    progress.finish(format!("{} rows written to {}", rows.len(), job.output.display()));

    Ok(AggregateSummary {
        pattern_files: pattern_files.len() as u64,
        panel_files: panel_files.len() as u64,
        pattern_rows: weekly.rows(),
        matched_rows: weekly.matched(),
        unplaced_rows: weekly.unplaced(),
        weekly_keys,
        rows_written: rows.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use visitor_flows_geography_models::CountyFips;
    use visitor_flows_patterns_models::{OriginCounts, PanelKey, WeeklyKey, parse_week_date};
    use visitor_flows_source::progress::NullProgress;

    use super::allow_list::PoiLocation;
    use super::*;

    const PATTERN_HEADER: [&str; 10] = [
        "safegraph_place_id",
        "location_name",
        "street_address",
        "date_range_start",
        "date_range_end",
        "raw_visit_counts",
        "raw_visitor_counts",
        "visits_by_day",
        "poi_cbg",
        "visitor_home_cbgs",
    ];

    const PANEL_HEADER: [&str; 6] = [
        "date_range_start",
        "date_range_end",
        "region",
        "census_block_group",
        "number_devices_residing",
        "iso_country_code",
    ];

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("visitor_flows_patterns_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn csv_bytes(header: &[&str], rows: &[Vec<&str>]) -> Vec<u8> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(header).unwrap();
        for row in rows {
            writer.write_record(row).unwrap();
        }
        writer.into_inner().unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[allow(clippy::too_many_arguments)]
    fn pattern<'a>(
        id: &'a str,
        name: &'a str,
        start: &'a str,
        end: &'a str,
        visits: &'a str,
        visitors: &'a str,
        cbg: &'a str,
        origins: &'a str,
    ) -> Vec<&'a str> {
        vec![
            id, name, "1 Main St", start, end, visits, visitors, "[1,2]", cbg, origins,
        ]
    }

    fn allow(tables: &[(&str, &[&str])]) -> AllowList {
        let mut list = AllowList::default();
        for (name, ids) in tables {
            let places: HashMap<String, PoiLocation> = ids
                .iter()
                .map(|id| {
                    (
                        (*id).to_string(),
                        PoiLocation {
                            latitude: None,
                            longitude: None,
                        },
                    )
                })
                .collect();
            list.insert((*name).to_string(), places);
        }
        list
    }

    fn weekly_key(cbg: &str, name: &str, naics: &str) -> WeeklyKey {
        WeeklyKey {
            start: parse_week_date("2021-01-04").unwrap(),
            end: parse_week_date("2021-01-11").unwrap(),
            cbg: cbg.to_string(),
            location_name: name.to_string(),
            naics: naics.to_string(),
        }
    }

    #[test]
    fn totals_do_not_depend_on_file_order() {
        let allow = allow(&[("62", &["A", "B"])]);
        let first = csv_bytes(
            &PATTERN_HEADER,
            &[
                pattern("A", "Hospital", "2021-01-04T00:00:00-06:00", "2021-01-11T00:00:00-06:00", "10", "4", "482015551234", r#"{"482015550001":3}"#),
                pattern("B", "Clinic", "2021-01-04T00:00:00-06:00", "2021-01-11T00:00:00-06:00", "2", "1", "482015551234", r#"{"482015550002":1}"#),
            ],
        );
        let second = csv_bytes(
            &PATTERN_HEADER,
            &[pattern("A", "Hospital", "2021-01-04", "2021-01-11", "5", "2", "482015551234", r#"{"482015550001":1,"482015550003":1}"#)],
        );

        let mut forward = WeeklyAccumulator::new();
        forward.read_file(first.as_slice(), "first", &allow).unwrap();
        forward.read_file(second.as_slice(), "second", &allow).unwrap();

        let mut backward = WeeklyAccumulator::new();
        backward.read_file(second.as_slice(), "second", &allow).unwrap();
        backward.read_file(first.as_slice(), "first", &allow).unwrap();

        assert_eq!(forward.totals(), backward.totals());

        let hospital = &forward.totals()[&weekly_key("482015551234", "Hospital", "62")];
        assert_eq!(hospital.visits, 15);
        assert_eq!(hospital.visitors, 6);
        assert_eq!(
            hospital.origins.to_string(),
            r#"{"482015550001":4,"482015550003":1}"#
        );
    }

    #[test]
    fn poi_in_several_tables_contributes_to_each() {
        let allow = allow(&[("62", &["A"]), ("622110", &["A"]), ("611110", &["B"])]);
        let data = csv_bytes(
            &PATTERN_HEADER,
            &[
                pattern("A", "Hospital", "2021-01-04", "2021-01-11", "10", "4", "482015551234", "{}"),
                pattern("Z", "Elsewhere", "2021-01-04", "2021-01-11", "99", "99", "482015551234", "{}"),
            ],
        );

        let mut weekly = WeeklyAccumulator::new();
        weekly.read_file(data.as_slice(), "p.csv", &allow).unwrap();

        assert_eq!(weekly.rows(), 2);
        assert_eq!(weekly.matched(), 2);
        assert_eq!(weekly.unplaced(), 2);
        let tables: Vec<_> = weekly.totals().keys().map(|k| k.naics.as_str()).collect();
        assert_eq!(tables, ["62", "622110"]);
    }

    #[test]
    fn panel_sizes_sum_across_files_in_any_order() {
        let first = csv_bytes(
            &PANEL_HEADER,
            &[vec!["2021-01-04T00:00:00-06:00", "2021-01-11T00:00:00-06:00", "tx", "482015551234", "40", "US"]],
        );
        let second = csv_bytes(
            &PANEL_HEADER,
            &[vec!["2021-01-04", "2021-01-11", "tx", "482015551234", "2", "US"]],
        );

        let mut forward = PanelAccumulator::new();
        forward.read_file(first.as_slice(), "a.csv").unwrap();
        forward.read_file(second.as_slice(), "b.csv").unwrap();
        let mut backward = PanelAccumulator::new();
        backward.read_file(second.as_slice(), "b.csv").unwrap();
        backward.read_file(first.as_slice(), "a.csv").unwrap();

        assert_eq!(forward.sizes(), backward.sizes());
        let key = weekly_key("482015551234", "", "").panel_key();
        assert_eq!(forward.get(&key), Some(42));
    }

    #[test]
    fn county_filter_matches_geoid_prefix_only() {
        let county = CountyFips::new("48201").unwrap();
        let mut weekly = WeeklyAccumulator::new();
        let mut panel = PanelAccumulator::new();
        for cbg in ["482015551234", "148201555123", "480295551234"] {
            weekly.add(weekly_key(cbg, "Hospital", "62"), 1, 1, &OriginCounts::new());
            panel.add(weekly_key(cbg, "", "").panel_key(), 10);
        }

        weekly.retain_county(&county);
        panel.retain_county(&county);

        let rows = join_panel(&weekly, &panel).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].census_block_group, "482015551234");
        assert_eq!(rows[0].samplesize, 10);
    }

    #[test]
    fn missing_panel_entry_fails() {
        let mut weekly = WeeklyAccumulator::new();
        weekly.add(weekly_key("482015551234", "Hospital", "62"), 1, 1, &OriginCounts::new());
        let mut panel = PanelAccumulator::new();
        panel.add(
            PanelKey {
                cbg: "482015559999".to_string(),
                ..weekly_key("", "", "").panel_key()
            },
            10,
        );

        let err = join_panel(&weekly, &panel).unwrap_err();
        match err {
            PatternError::MissingPanelEntry { key } => {
                assert_eq!(key, "2021-01-04|2021-01-11|482015551234");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_origin_map_names_file_and_line() {
        let allow = allow(&[("62", &["A"])]);
        let data = csv_bytes(
            &PATTERN_HEADER,
            &[
                pattern("A", "Hospital", "2021-01-04", "2021-01-11", "1", "1", "482015551234", "{}"),
                pattern("A", "Hospital", "2021-01-04", "2021-01-11", "1", "1", "482015551234", r#"{"a":oops}"#),
            ],
        );

        let err = WeeklyAccumulator::new()
            .read_file(data.as_slice(), "bad.csv.gz", &allow)
            .unwrap_err();
        assert!(matches!(
            err,
            PatternError::MalformedOriginMap { ref path, line: 3, .. } if path == "bad.csv.gz"
        ));
    }

    #[test]
    fn aggregates_partition_into_county_table() {
        let base = scratch("end_to_end");
        let pois = base.join("pois");
        std::fs::create_dir_all(&pois).unwrap();
        std::fs::write(
            pois.join("622110.csv"),
            "safegraph_place_id,location_name,latitude,longitude\nA,Hospital,29.7,-95.3\n",
        )
        .unwrap();

        let patterns = base.join("data/patterns/2021/01");
        std::fs::create_dir_all(&patterns).unwrap();
        std::fs::write(
            patterns.join("part-2.csv.gz"),
            gzip(&csv_bytes(
                &PATTERN_HEADER,
                &[pattern("A", "Hospital", "2021-01-04", "2021-01-11", "4", "2", "482015551234", r#"{"482015550002":2,"482015550001":1}"#)],
            )),
        )
        .unwrap();
        std::fs::write(
            patterns.join("part-1.csv.gz"),
            gzip(&csv_bytes(
                &PATTERN_HEADER,
                &[
                    pattern("A", "Hospital", "2021-01-04", "2021-01-11", "6", "3", "482015551234", r#"{"482015550001":5}"#),
                    pattern("A", "Hospital", "2021-01-04", "2021-01-11", "7", "7", "120015551234", r#"{"120015550001":7}"#),
                ],
            )),
        )
        .unwrap();
        std::fs::write(patterns.join("notes.txt"), "ignored").unwrap();

        let panel = base.join("data/home_panel_summary/2021/01");
        std::fs::create_dir_all(&panel).unwrap();
        std::fs::write(
            panel.join("panel.csv"),
            csv_bytes(
                &PANEL_HEADER,
                &[
                    vec!["2021-01-04", "2021-01-11", "tx", "482015551234", "30", "US"],
                    vec!["2021-01-04", "2021-01-11", "fl", "120015551234", "12", "US"],
                ],
            ),
        )
        .unwrap();

        let job = WeeklyJob {
            base_dir: base.join("data"),
            poi_dir: pois,
            naics: vec!["622110".to_string()],
            partitions: vec!["2021/01/".to_string()],
            county: CountyFips::new("48201").unwrap(),
            output: base.join("out/harris.csv"),
        };
        let summary = aggregate_weekly_visits(&job, &NullProgress).unwrap();

        assert_eq!(summary.pattern_files, 2);
        assert_eq!(summary.panel_files, 1);
        assert_eq!(summary.pattern_rows, 3);
        assert_eq!(summary.unplaced_rows, 0);
        assert_eq!(summary.weekly_keys, 2);
        assert_eq!(summary.rows_written, 1);

        let text = std::fs::read_to_string(&job.output).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(WEEKLY_HEADER.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some(
                r#"482015551234,2021-01-04,2021-01-11,10,5,"{""482015550001"":6,""482015550002"":2}",Hospital,622110,30"#
            )
        );
        assert_eq!(lines.next(), None);

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn empty_result_still_writes_header() {
        let dir = scratch("empty");
        let path = dir.join("nested/out.csv");
        write_rows(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().trim_end(),
            WEEKLY_HEADER.join(",")
        );
        let _ = std::fs::remove_dir_all(&dir);
    }
}
