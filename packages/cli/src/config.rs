//! TOML job files for `visitor_flows run`.
//!
//! A job file holds up to three optional tables, run in this order:
//!
//! ```toml
//! [pois]
//! naics = ["622110"]
//! core_poi_dir = "data/core_poi"
//! partitions = ["core_poi/2021/01/"]
//! output_dir = "out/pois"
//! [pois.geography]
//! scale = "state"
//! places = { TX = "48" }
//!
//! [weekly]
//! base_dir = "data"
//! poi_dir = "out/pois"
//! naics = ["622110"]
//! partitions = ["2021/01/"]
//! county = "48201"
//! output = "out/harris.csv"
//!
//! [flows]
//! visits = "out/harris.csv"
//! centroids = "data/tx_tracts.csv"
//! county = "48201"
//! week_end = "2021-01-11"
//! name = "Hospitals"
//! output_prefix = "out/harris_2021-01-11"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use visitor_flows_network::FlowJob;
use visitor_flows_patterns_models::WeeklyJob;
use visitor_flows_poi_models::PoiJob;

/// Errors loading a job file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("{path} has no [pois], [weekly], or [flows] table")]
    Empty { path: String },
}

/// Parsed job file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    pub pois: Option<PoiJob>,
    pub weekly: Option<WeeklyJob>,
    pub flows: Option<FlowJob>,
}

impl JobFile {
    /// Reads and parses `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, does not parse,
    /// or has no stage tables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, path: &str) -> Result<Self, ConfigError> {
        let job: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            source: e,
        })?;

        if job.stage_count() == 0 {
            return Err(ConfigError::Empty {
                path: path.to_string(),
            });
        }
        Ok(job)
    }

    /// Number of stages the file configures.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        usize::from(self.pois.is_some())
            + usize::from(self.weekly.is_some())
            + usize::from(self.flows.is_some())
    }
}
