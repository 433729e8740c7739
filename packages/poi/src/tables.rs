//! One output CSV per classification table.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use visitor_flows_poi_models::{PoiRecord, output_header};

use crate::PoiError;

struct Table {
    path: PathBuf,
    writer: csv::Writer<BufWriter<File>>,
    rows: u64,
}

/// Open `<name>.csv` writers, each already holding the header row.
pub struct TableSet {
    tables: BTreeMap<String, Table>,
}

impl TableSet {
    /// Creates (truncating) one table per name under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PoiError::Io`] if a file cannot be created or
    /// [`PoiError::Csv`] if the header cannot be written.
    pub fn create(dir: &Path, names: &[&str]) -> Result<Self, PoiError> {
        let mut tables = BTreeMap::new();

        for name in names {
            let path = dir.join(format!("{name}.csv"));
            let file = File::create(&path).map_err(|e| PoiError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            let mut writer = csv::Writer::from_writer(BufWriter::new(file));
            writer
                .write_record(output_header())
                .map_err(|e| PoiError::Csv {
                    path: path.display().to_string(),
                    source: e,
                })?;

            log::debug!("Opened table {}", path.display());
            tables.insert(
                (*name).to_string(),
                Table {
                    path,
                    writer,
                    rows: 0,
                },
            );
        }

        Ok(Self { tables })
    }

    /// Appends `poi` to table `name`. Unknown names are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PoiError::Csv`] if the row cannot be written.
    pub fn write(&mut self, name: &str, poi: &PoiRecord) -> Result<(), PoiError> {
        let Some(table) = self.tables.get_mut(name) else {
            return Ok(());
        };

        table
            .writer
            .write_record(poi.values())
            .map_err(|e| PoiError::Csv {
                path: table.path.display().to_string(),
                source: e,
            })?;
        table.rows += 1;
        Ok(())
    }

    /// Flushes every table and returns rows written per table.
    ///
    /// # Errors
    ///
    /// Returns [`PoiError::Io`] if a flush fails.
    pub fn finish(self) -> Result<BTreeMap<String, u64>, PoiError> {
        let mut counts = BTreeMap::new();

        for (name, mut table) in self.tables {
            table.writer.flush().map_err(|e| PoiError::Io {
                path: table.path.display().to_string(),
                source: e,
            })?;
            log::info!("Wrote {} rows to {}", table.rows, table.path.display());
            counts.insert(name, table.rows);
        }

        Ok(counts)
    }
}
