#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core POI extraction.
//!
//! Reads every part of every configured partition through the tiered
//! resolver, keeps US POIs inside the geography filter whose
//! classification code matches a requested code, and writes each kept
//! POI to the table of every code it matches. A place id is written at
//! most once per run: the first partition/part that yields it wins.

pub mod tables;

use std::collections::HashSet;
use std::io::Read;

use csv::StringRecord;
use thiserror::Error;
use visitor_flows_poi_models::{
    ExtractSummary, FilterError, GeographyFilter, NaicsFilter, PoiColumn, PoiJob, PoiRecord,
};
use visitor_flows_source::SourceError;
use visitor_flows_source::progress::ProgressCallback;
use visitor_flows_source::resolver::{PARTS_PER_PARTITION, PartLocation, PartResolver};
use visitor_flows_source::schema::{HeaderBinding, csv_reader};

use crate::tables::TableSet;

/// Errors from POI extraction.
#[derive(Debug, Error)]
pub enum PoiError {
    /// Locating or reading a core POI part failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The classification or geography filter was invalid.
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    /// I/O error on an output table.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Output path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV error writing an output table.
    #[error("CSV write error at {path}: {source}")]
    Csv {
        /// Output path.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },
}

/// Run-scoped extraction state.
struct Extraction<'a> {
    naics: &'a NaicsFilter,
    geography: &'a GeographyFilter,
    seen: HashSet<String>,
    tables: TableSet,
    summary: ExtractSummary,
}

impl Extraction<'_> {
    fn scan_part(&mut self, location: &PartLocation, reader: &mut dyn Read) -> Result<(), PoiError> {
        let mut csv = csv_reader(reader);
        let binding = HeaderBinding::<PoiColumn>::from_reader(&mut csv, &location.display)?;

        let mut row = StringRecord::new();
        let mut rows = 0u64;
        let mut kept = 0u64;

        while binding.next_record(&mut csv, &mut row)? {
            rows += 1;
            let poi = PoiRecord::from_row(&binding, &row)?;

            if !poi.is_us() || !self.geography.matches(poi.region(), poi.city()) {
                continue;
            }

            let codes = self.naics.matching(poi.naics_code());
            if codes.is_empty() {
                continue;
            }

            if !self.seen.insert(poi.place_id().to_string()) {
                self.summary.duplicates_skipped += 1;
                continue;
            }

            for code in codes {
                self.tables.write(code, &poi)?;
            }
            kept += 1;
        }

        log::info!("{}: {rows} rows, {kept} kept", location.display);
        self.summary.rows_scanned += rows;
        self.summary.parts_read += 1;
        Ok(())
    }
}

/// Extracts POIs for `job` into `<output_dir>/<code>.csv` tables.
///
/// Partitions are read in the order given and parts 1 through 5 in
/// ascending order; that order decides which duplicate place id wins.
///
/// # Errors
///
/// Returns [`PoiError::Source`] if a part is unavailable in every tier or
/// a core POI file does not carry the expected columns, and
/// [`PoiError::Io`] / [`PoiError::Csv`] if an output table cannot be
/// written. Tables written before the error are left in place.
pub fn extract_pois(
    job: &PoiJob,
    progress: &dyn ProgressCallback,
) -> Result<ExtractSummary, PoiError> {
    std::fs::create_dir_all(&job.output_dir).map_err(|e| PoiError::Io {
        path: job.output_dir.display().to_string(),
        source: e,
    })?;

    let names = job.naics.table_names();
    log::info!(
        "Extracting POIs for {} ({} scale: {}) from {} partitions",
        names.join(", "),
        job.geography.scale,
        job.geography.describe(),
        job.partitions.len()
    );

    let mut extraction = Extraction {
        naics: &job.naics,
        geography: &job.geography,
        seen: HashSet::new(),
        tables: TableSet::create(&job.output_dir, &names)?,
        summary: ExtractSummary::default(),
    };

    let resolver = PartResolver::new(&job.core_poi_dir);
    progress.set_total((job.partitions.len() * PARTS_PER_PARTITION) as u64);

    for partition in &job.partitions {
        for index in 1..=PARTS_PER_PARTITION {
            progress.set_message(format!("{partition} part {index}"));
            resolver.open_part(partition, index, |location, reader| {
                extraction.scan_part(location, reader)
            })?;
            progress.inc(1);
        }
    }

    let Extraction {
        tables,
        mut summary,
        ..
    } = extraction;
    summary.rows_written = tables.finish()?;

    if summary.duplicates_skipped > 0 {
        log::info!(
            "Skipped {} rows whose place id was already written",
            summary.duplicates_skipped
        );
    }
    progress.finish(format!(
        "{} POIs written from {} rows",
        summary.total_written(),
        summary.rows_scanned
    ));

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use visitor_flows_poi_models::{GeographyScale, output_header};
    use visitor_flows_source::progress::NullProgress;

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("visitor_flows_poi_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn poi_row(id: &str, name: &str, naics: &str, city: &str, region: &str, country: &str) -> String {
        let mut values = vec![String::new(); 18];
        values[0] = id.to_string();
        values[2] = name.to_string();
        values[7] = naics.to_string();
        values[8] = "29.76".to_string();
        values[9] = "-95.36".to_string();
        values[11] = city.to_string();
        values[12] = region.to_string();
        values[14] = country.to_string();
        values.join(",")
    }

    fn csv_text(rows: &[String]) -> String {
        let mut text = output_header().join(",");
        text.push('\n');
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    /// Writes all five plain-CSV parts of `partition`; parts without rows
    /// are header-only.
    fn write_partition(base: &Path, partition: &str, parts: &[(usize, Vec<String>)]) {
        let dir = base.join(partition);
        std::fs::create_dir_all(&dir).unwrap();
        for index in 1..=PARTS_PER_PARTITION {
            let rows = parts
                .iter()
                .find(|(i, _)| *i == index)
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default();
            std::fs::write(
                dir.join(format!("core_poi-part{index}.csv")),
                csv_text(&rows),
            )
            .unwrap();
        }
    }

    fn job(base: &Path, codes: &[&str], partitions: &[&str]) -> PoiJob {
        PoiJob {
            naics: NaicsFilter::from_codes(codes).unwrap(),
            geography: GeographyFilter::states(["TX"]).unwrap(),
            core_poi_dir: base.join("core"),
            partitions: partitions.iter().map(|p| (*p).to_string()).collect(),
            output_dir: base.join("out"),
        }
    }

    fn ids_in(path: &Path) -> Vec<String> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().get(0).unwrap().to_string())
            .collect()
    }

    #[test]
    fn poi_is_written_to_every_matching_table_once() {
        let base = scratch("fanout");
        write_partition(
            &base.join("core"),
            "p1",
            &[
                (1, vec![poi_row("A", "General", "622110", "Houston", "TX", "US")]),
                (3, vec![poi_row("A", "General again", "622110", "Houston", "TX", "US")]),
            ],
        );

        let job = job(&base, &["62", "622110"], &["p1"]);
        let summary = extract_pois(&job, &NullProgress).unwrap();

        assert_eq!(ids_in(&base.join("out/62.csv")), ["A"]);
        assert_eq!(ids_in(&base.join("out/622110.csv")), ["A"]);
        assert_eq!(summary.duplicates_skipped, 1);
        assert_eq!(summary.parts_read, 5);
        assert_eq!(
            summary.rows_written,
            BTreeMap::from([("62".to_string(), 1), ("622110".to_string(), 1)])
        );

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn cross_code_duplicate_goes_to_first_table_only() {
        let base = scratch("cross_code");
        write_partition(
            &base.join("core"),
            "p1",
            &[(
                1,
                vec![
                    poi_row("X", "Elementary", "611110", "Houston", "TX", "US"),
                    poi_row("X", "Museum", "712130", "Houston", "TX", "US"),
                ],
            )],
        );

        let job = job(&base, &["6111", "7121"], &["p1"]);
        let summary = extract_pois(&job, &NullProgress).unwrap();

        assert_eq!(ids_in(&base.join("out/6111.csv")), ["X"]);
        assert!(ids_in(&base.join("out/7121.csv")).is_empty());
        assert_eq!(summary.duplicates_skipped, 1);
        assert_eq!(
            summary.rows_written,
            BTreeMap::from([("6111".to_string(), 1), ("7121".to_string(), 0)])
        );

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn stray_latin1_byte_in_name_does_not_abort() {
        let base = scratch("latin1");
        write_partition(&base.join("core"), "p1", &[]);
        let mut part = csv_text(&[poi_row("A", "Caf~", "722515", "Houston", "TX", "US")]).into_bytes();
        let marker = part.iter().position(|b| *b == b'~').unwrap();
        part[marker] = 0xE9;
        std::fs::write(base.join("core/p1/core_poi-part2.csv"), part).unwrap();

        let job = job(&base, &["7225"], &["p1"]);
        let summary = extract_pois(&job, &NullProgress).unwrap();

        assert_eq!(ids_in(&base.join("out/7225.csv")), ["A"]);
        assert_eq!(summary.total_written(), 1);

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn filters_country_geography_and_code() {
        let base = scratch("filters");
        write_partition(
            &base.join("core"),
            "p1",
            &[(
                1,
                vec![
                    poi_row("keep", "School", "611110", "Houston", "TX", "US"),
                    poi_row("canada", "School", "611110", "Toronto", "ON", "CA"),
                    poi_row("okla", "School", "611110", "Tulsa", "OK", "US"),
                    poi_row("hospital", "Hospital", "622110", "Houston", "TX", "US"),
                    poi_row("blank", "Unknown", "", "Houston", "TX", "US"),
                ],
            )],
        );

        let job = job(&base, &["611110"], &["p1"]);
        let summary = extract_pois(&job, &NullProgress).unwrap();

        assert_eq!(ids_in(&base.join("out/611110.csv")), ["keep"]);
        assert_eq!(summary.rows_scanned, 5);
        assert_eq!(summary.duplicates_skipped, 0);

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn wildcard_writes_single_table_named_after_label() {
        let base = scratch("wildcard");
        write_partition(
            &base.join("core"),
            "p1",
            &[(
                2,
                vec![
                    poi_row("A", "School", "611110", "Houston", "TX", "US"),
                    poi_row("B", "Unknown", "", "Austin", "TX", "US"),
                ],
            )],
        );

        let job = job(&base, &["all"], &["p1"]);
        extract_pois(&job, &NullProgress).unwrap();

        assert_eq!(ids_in(&base.join("out/all.csv")), ["A", "B"]);

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn first_partition_wins_duplicates() {
        let base = scratch("order");
        write_partition(
            &base.join("core"),
            "early",
            &[(1, vec![poi_row("A", "Early", "611110", "Houston", "TX", "US")])],
        );
        write_partition(
            &base.join("core"),
            "late",
            &[(1, vec![poi_row("A", "Late", "611110", "Houston", "TX", "US")])],
        );

        let name_of = |partitions: &[&str]| {
            let job = job(&base, &["611110"], partitions);
            extract_pois(&job, &NullProgress).unwrap();
            let mut reader = csv::Reader::from_path(base.join("out/611110.csv")).unwrap();
            let records: Vec<_> = reader.records().map(Result::unwrap).collect();
            assert_eq!(records.len(), 1);
            records[0].get(2).unwrap().to_string()
        };

        assert_eq!(name_of(&["early", "late"]), "Early");
        assert_eq!(name_of(&["late", "early"]), "Late");

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn rerun_produces_identical_tables() {
        let base = scratch("idempotent");
        write_partition(
            &base.join("core"),
            "p1",
            &[
                (1, vec![poi_row("A", "One", "611110", "Houston", "TX", "US")]),
                (4, vec![poi_row("B", "Two", "611310", "Austin", "TX", "US")]),
            ],
        );

        let job = job(&base, &["6111", "6113"], &["p1"]);
        extract_pois(&job, &NullProgress).unwrap();
        let first = (
            std::fs::read(base.join("out/6111.csv")).unwrap(),
            std::fs::read(base.join("out/6113.csv")).unwrap(),
        );
        extract_pois(&job, &NullProgress).unwrap();
        let second = (
            std::fs::read(base.join("out/6111.csv")).unwrap(),
            std::fs::read(base.join("out/6113.csv")).unwrap(),
        );

        assert_eq!(first, second);

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn reads_parts_from_gzip_tier() {
        let base = scratch("gzip");
        let dir = base.join("core/p1");
        std::fs::create_dir_all(&dir).unwrap();
        for index in 1..=PARTS_PER_PARTITION {
            let rows = if index == 5 {
                vec![poi_row("Z", "Zipped", "611110", "Houston", "TX", "US")]
            } else {
                Vec::new()
            };
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(csv_text(&rows).as_bytes()).unwrap();
            std::fs::write(
                dir.join(format!("core_poi-part{index}.csv.gz")),
                encoder.finish().unwrap(),
            )
            .unwrap();
        }

        let job = job(&base, &["611110"], &["p1/"]);
        extract_pois(&job, &NullProgress).unwrap();

        assert_eq!(ids_in(&base.join("out/611110.csv")), ["Z"]);

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn missing_part_is_fatal() {
        let base = scratch("missing");
        let dir = base.join("core/p1");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("core_poi-part1.csv"), csv_text(&[])).unwrap();

        let job = job(&base, &["611110"], &["p1"]);
        let err = extract_pois(&job, &NullProgress).unwrap_err();

        assert!(matches!(
            err,
            PoiError::Source(SourceError::PartitionUnavailable { index: 2, .. })
        ));

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn renamed_column_is_reported() {
        let base = scratch("drift");
        let dir = base.join("core/p1");
        std::fs::create_dir_all(&dir).unwrap();
        let header = output_header().join(",").replace("naics_code", "naics");
        std::fs::write(dir.join("core_poi-part1.csv"), format!("{header}\n")).unwrap();

        let job = job(&base, &["611110"], &["p1"]);
        let err = extract_pois(&job, &NullProgress).unwrap_err();

        assert!(matches!(
            err,
            PoiError::Source(SourceError::MissingColumn {
                column: "naics_code",
                ..
            })
        ));

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn state_city_scale_uses_joint_match() {
        let base = scratch("state_city");
        write_partition(
            &base.join("core"),
            "p1",
            &[(
                1,
                vec![
                    poi_row("or", "School", "611110", "Portland", "OR", "US"),
                    poi_row("me", "School", "611110", "Portland", "ME", "US"),
                ],
            )],
        );

        let mut job = job(&base, &["611110"], &["p1"]);
        job.geography = GeographyFilter::new(
            GeographyScale::StateCity,
            BTreeMap::from([("Portland".to_string(), "41".to_string())]),
        );
        extract_pois(&job, &NullProgress).unwrap();

        assert_eq!(ids_in(&base.join("out/611110.csv")), ["or"]);

        let _ = std::fs::remove_dir_all(&base);
    }
}
