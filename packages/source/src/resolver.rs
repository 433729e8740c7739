//! Tiered lookup of core POI parts.
//!
//! The vendor has shipped the same core POI partition in three layouts
//! over time. [`PartResolver::open_part`] walks [`Tier::ORDER`] and hands
//! the first part it finds to a caller-supplied closure. A tier that does
//! not find its file yields `Ok(None)` and the next tier runs; any other
//! failure stops the walk. File handles live only for the duration of the
//! closure call.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::SourceError;

/// Number of parts per core POI partition.
pub const PARTS_PER_PARTITION: usize = 5;

/// One archive layout for a core POI part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// `<base>/<partition>/core_poi-part<N>.csv`
    PlainCsv,
    /// `<base>/<partition>.zip`, N-th `.csv.gz` entry in sorted order.
    ZippedParts,
    /// `<base>/<partition>/core_poi-part<N>.csv.gz`
    GzipCsv,
}

impl Tier {
    /// Resolution order.
    pub const ORDER: [Self; 3] = [Self::PlainCsv, Self::ZippedParts, Self::GzipCsv];

    /// Short label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PlainCsv => "csv",
            Self::ZippedParts => "zip",
            Self::GzipCsv => "csv.gz",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a part was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartLocation {
    /// Tier that produced the stream.
    pub tier: Tier,
    /// Path (and `!entry` for archive members) used in logs and errors.
    pub display: String,
}

/// Resolves `(partition, part index)` pairs under a base directory.
#[derive(Debug, Clone)]
pub struct PartResolver {
    base: PathBuf,
}

impl PartResolver {
    /// Creates a resolver rooted at `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Base directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Finds part `index` (1-based) of `partition` and passes its
    /// decompressed byte stream to `consume`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::PartitionUnavailable`] if no tier has the
    /// part, any other [`SourceError`] a tier hits while opening it, or
    /// whatever `consume` returns.
    pub fn open_part<T, E, F>(&self, partition: &str, index: usize, mut consume: F) -> Result<T, E>
    where
        F: FnMut(&PartLocation, &mut dyn Read) -> Result<T, E>,
        E: From<SourceError>,
    {
        let mut attempted = Vec::with_capacity(Tier::ORDER.len());

        for tier in Tier::ORDER {
            let candidate = self.candidate_path(tier, partition, index);
            let found = match tier {
                Tier::PlainCsv => open_plain(&candidate, &mut consume)?,
                Tier::ZippedParts => open_zipped(&candidate, index, &mut consume)?,
                Tier::GzipCsv => open_gzip(&candidate, &mut consume)?,
            };

            if let Some(value) = found {
                return Ok(value);
            }

            log::debug!(
                "{partition} part {index}: no {tier} source at {}",
                candidate.display()
            );
            attempted.push(candidate.display().to_string());
        }

        Err(SourceError::PartitionUnavailable {
            partition: partition.to_string(),
            index,
            attempted,
        }
        .into())
    }

    fn candidate_path(&self, tier: Tier, partition: &str, index: usize) -> PathBuf {
        match tier {
            Tier::PlainCsv => self
                .base
                .join(partition)
                .join(format!("core_poi-part{index}.csv")),
            Tier::ZippedParts => self
                .base
                .join(format!("{}.zip", partition.trim_end_matches('/'))),
            Tier::GzipCsv => self
                .base
                .join(partition)
                .join(format!("core_poi-part{index}.csv.gz")),
        }
    }
}

/// Opens `path`, mapping "not found" to `Ok(None)`.
fn open_if_exists(path: &Path) -> Result<Option<File>, SourceError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SourceError::io(path.display(), e)),
    }
}

fn open_plain<T, E, F>(path: &Path, consume: &mut F) -> Result<Option<T>, E>
where
    F: FnMut(&PartLocation, &mut dyn Read) -> Result<T, E>,
    E: From<SourceError>,
{
    let Some(file) = open_if_exists(path)? else {
        return Ok(None);
    };

    let location = PartLocation {
        tier: Tier::PlainCsv,
        display: path.display().to_string(),
    };
    log::info!("Processing {} ({})", location.display, location.tier);

    let mut reader = BufReader::new(file);
    consume(&location, &mut reader).map(Some)
}

fn open_gzip<T, E, F>(path: &Path, consume: &mut F) -> Result<Option<T>, E>
where
    F: FnMut(&PartLocation, &mut dyn Read) -> Result<T, E>,
    E: From<SourceError>,
{
    let Some(file) = open_if_exists(path)? else {
        return Ok(None);
    };

    let location = PartLocation {
        tier: Tier::GzipCsv,
        display: path.display().to_string(),
    };
    log::info!("Processing {} ({})", location.display, location.tier);

    let mut reader = MultiGzDecoder::new(BufReader::new(file));
    consume(&location, &mut reader).map(Some)
}

fn open_zipped<T, E, F>(path: &Path, index: usize, consume: &mut F) -> Result<Option<T>, E>
where
    F: FnMut(&PartLocation, &mut dyn Read) -> Result<T, E>,
    E: From<SourceError>,
{
    let Some(file) = open_if_exists(path)? else {
        return Ok(None);
    };

    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| SourceError::Zip {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut parts: Vec<String> = archive
        .file_names()
        .filter(|name| name.ends_with(".csv.gz"))
        .map(str::to_string)
        .collect();
    parts.sort();

    let Some(entry_name) = index.checked_sub(1).and_then(|i| parts.get(i)) else {
        log::debug!(
            "{} holds {} .csv.gz parts, part {index} not present",
            path.display(),
            parts.len()
        );
        return Ok(None);
    };

    let location = PartLocation {
        tier: Tier::ZippedParts,
        display: format!("{}!{entry_name}", path.display()),
    };
    log::info!("Processing {} ({})", location.display, location.tier);

    let entry = archive
        .by_name(entry_name)
        .map_err(|e| SourceError::Zip {
            path: location.display.clone(),
            source: e,
        })?;

    let mut reader = MultiGzDecoder::new(BufReader::new(entry));
    consume(&location, &mut reader).map(Some)
}
