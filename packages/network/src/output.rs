//! Flow table writers.
//!
//! Column names carry the destination name given on the command line, so
//! a run for hospitals writes `Hospitals_TRACTCE`, `Hospitals_LON`, and
//! so on.

use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use visitor_flows_geography_models::{county_code, state_code, tract_code};

use crate::NetworkError;
use crate::flows::TractFlow;

/// Which flow tables to write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowFormat {
    /// `<prefix>-CT.csv` and `<prefix>-network_analysis-CT.csv`.
    #[default]
    Full,
    /// `<prefix>-kepler-CT.csv` for Kepler.gl arc layers.
    Kepler,
}

/// `<prefix><suffix>`, appended to the last path component.
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

struct Table {
    path: PathBuf,
    writer: csv::Writer<BufWriter<File>>,
}

impl Table {
    fn create(path: PathBuf, header: &[String]) -> Result<Self, NetworkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| NetworkError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let file = File::create(&path).map_err(|e| NetworkError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut table = Self {
            path,
            writer: csv::Writer::from_writer(BufWriter::new(file)),
        };
        table.row(header)?;
        Ok(table)
    }

    fn row<I, T>(&mut self, values: I) -> Result<(), NetworkError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(values)
            .map_err(|e| NetworkError::Csv {
                path: self.path.display().to_string(),
                source: e,
            })
    }

    fn finish(mut self) -> Result<PathBuf, NetworkError> {
        self.writer.flush().map_err(|e| NetworkError::Io {
            path: self.path.display().to_string(),
            source: e,
        })?;
        log::info!("Wrote {}", self.path.display());
        Ok(self.path)
    }
}

fn header(columns: &[&str], name: &str) -> Vec<String> {
    columns.iter().map(|c| c.replace("{name}", name)).collect()
}

const FULL_COLUMNS: [&str; 12] = [
    "date_range_start",
    "date_range_end",
    "{name}_TRACTCE",
    "Home_TRACTCE",
    "STATEFP",
    "COUNTYFP",
    "Visitor_Count",
    "Home_LON",
    "Home_LAT",
    "{name}_LON",
    "{name}_LAT",
    "Distance_Covered (km)",
];

const NETWORK_COLUMNS: [&str; 8] = [
    "{name}_TRACTCE",
    "Home_TRACTCE",
    "Visitor_Count",
    "{name}_LON",
    "{name}_LAT",
    "Home_LON",
    "Home_LAT",
    "Distance_Covered (km)",
];

const KEPLER_COLUMNS: [&str; 5] = [
    "{name}_LON",
    "{name}_LAT",
    "Home_LON",
    "Visitor_Count",
    "Home_LAT",
];

/// Writes `flows` in `format` next to `prefix` and returns the paths written.
///
/// # Errors
///
/// Returns [`NetworkError::Io`] or [`NetworkError::Csv`] on write failure.
pub fn write_flows(
    prefix: &Path,
    name: &str,
    flows: &[TractFlow],
    format: FlowFormat,
) -> Result<Vec<PathBuf>, NetworkError> {
    match format {
        FlowFormat::Full => {
            let mut full = Table::create(with_suffix(prefix, "-CT.csv"), &header(&FULL_COLUMNS, name))?;
            let mut network = Table::create(
                with_suffix(prefix, "-network_analysis-CT.csv"),
                &header(&NETWORK_COLUMNS, name),
            )?;

            for flow in flows {
                let destination_tract = tract_code(&flow.destination_tract).unwrap_or_default();
                let home_tract = tract_code(&flow.home_tract).unwrap_or_default();
                full.row([
                    flow.date_range_start.to_string(),
                    flow.date_range_end.to_string(),
                    destination_tract.to_string(),
                    home_tract.to_string(),
                    state_code(&flow.home_tract).unwrap_or_default().to_string(),
                    county_code(&flow.home_tract).unwrap_or_default().to_string(),
                    flow.visitor_count.to_string(),
                    flow.home.lon.to_string(),
                    flow.home.lat.to_string(),
                    flow.destination.lon.to_string(),
                    flow.destination.lat.to_string(),
                    flow.distance_km.to_string(),
                ])?;
                network.row([
                    destination_tract.to_string(),
                    home_tract.to_string(),
                    flow.visitor_count.to_string(),
                    flow.destination.lon.to_string(),
                    flow.destination.lat.to_string(),
                    flow.home.lon.to_string(),
                    flow.home.lat.to_string(),
                    flow.distance_km.to_string(),
                ])?;
            }

            Ok(vec![full.finish()?, network.finish()?])
        }
        FlowFormat::Kepler => {
            let mut kepler = Table::create(
                with_suffix(prefix, "-kepler-CT.csv"),
                &header(&KEPLER_COLUMNS, name),
            )?;

            for flow in flows {
                kepler.row([
                    flow.destination.lon.to_string(),
                    flow.destination.lat.to_string(),
                    flow.home.lon.to_string(),
                    flow.visitor_count.to_string(),
                    flow.home.lat.to_string(),
                ])?;
            }

            Ok(vec![kepler.finish()?])
        }
    }
}
