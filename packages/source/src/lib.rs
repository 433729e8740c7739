#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Readers for the vendor's partitioned CSV / CSV.GZ / ZIP archives.
//!
//! [`resolver::PartResolver`] finds a core POI part across the three archive
//! layouts the vendor has shipped, [`schema::HeaderBinding`] binds columns
//! by header name so schema drift fails loudly, and [`files`] lists and
//! opens the weekly pattern and panel files.

pub mod files;
pub mod progress;
pub mod resolver;
pub mod schema;

use thiserror::Error;

/// Errors raised while locating or reading source files.
#[derive(Debug, Error)]
pub enum SourceError {
    /// None of the resolver tiers found the requested part.
    #[error(
        "Partition {partition:?} part {index} unavailable; tried: {}",
        .attempted.join(", ")
    )]
    PartitionUnavailable {
        /// Partition name as configured.
        partition: String,
        /// 1-based part index.
        index: usize,
        /// Every location that was tried, in order.
        attempted: Vec<String>,
    },

    /// I/O error opening or reading a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The ZIP container could not be read.
    #[error("Zip error at {path}: {source}")]
    Zip {
        /// Archive path.
        path: String,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },

    /// CSV decoding error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// File (or archive entry) being read.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// The header row lacks a column this reader depends on.
    #[error("{path}: header is missing required column {column:?}")]
    MissingColumn {
        /// File (or archive entry) being read.
        path: String,
        /// Column name that was not found.
        column: &'static str,
    },

    /// A data row is too short to hold a bound column.
    #[error(
        "{path} line {line}: row has {width} fields but column {column:?} is at position {position}"
    )]
    SchemaViolation {
        /// File (or archive entry) being read.
        path: String,
        /// 1-based line number of the row.
        line: u64,
        /// Column that could not be read.
        column: &'static str,
        /// Position the header bound the column to.
        position: usize,
        /// Number of fields actually present.
        width: usize,
    },

    /// A field was present but could not be parsed.
    #[error("{path} line {line}: invalid {column} value {value:?}")]
    InvalidValue {
        /// File (or archive entry) being read.
        path: String,
        /// 1-based line number of the row.
        line: u64,
        /// Column being parsed.
        column: &'static str,
        /// Raw field text.
        value: String,
    },
}

impl SourceError {
    pub(crate) fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}
