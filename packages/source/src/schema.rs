//! Header-name column binding.
//!
//! Readers never index vendor files by position. Each reader declares the
//! columns it needs as a [`Column`] enum, binds them once against the
//! header row with [`HeaderBinding::bind`], and reads fields through the
//! binding. A renamed or missing column fails at bind time; a short row
//! fails on the first field it cannot supply.

use std::io::Read;
use std::marker::PhantomData;
use std::str::FromStr;

use csv::StringRecord;

use crate::SourceError;

/// A named column a reader depends on.
///
/// Implementors are fieldless enums whose `ALL` lists every variant in
/// declaration order, so `ordinal` can be `self as usize`.
pub trait Column: Copy + 'static {
    /// Every column, in declaration order.
    const ALL: &'static [Self];

    /// Header text for the column.
    fn name(self) -> &'static str;

    /// Position of the column within [`Column::ALL`].
    fn ordinal(self) -> usize;
}

/// Builds a CSV reader configured for vendor files.
///
/// Rows are read flexibly so that a short row surfaces as
/// [`SourceError::SchemaViolation`] naming the column, rather than a
/// generic length mismatch.
pub fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader)
}

/// 1-based line number of `record`, or 0 when unknown.
#[must_use]
pub fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, csv::Position::line)
}

/// Column positions resolved from a header row.
#[derive(Debug, Clone)]
pub struct HeaderBinding<C: Column> {
    positions: Vec<usize>,
    path: String,
    _columns: PhantomData<C>,
}

impl<C: Column> HeaderBinding<C> {
    /// Resolves every column in `C::ALL` against `headers`.
    ///
    /// Header cells are trimmed and a leading byte-order mark is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingColumn`] for the first column absent
    /// from the header.
    pub fn bind(headers: &StringRecord, path: &str) -> Result<Self, SourceError> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();

        let positions = C::ALL
            .iter()
            .map(|column| {
                names
                    .iter()
                    .position(|name| *name == column.name())
                    .ok_or_else(|| SourceError::MissingColumn {
                        path: path.to_string(),
                        column: column.name(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            positions,
            path: path.to_string(),
            _columns: PhantomData,
        })
    }

    /// Reads the header row of `reader` and binds it.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Csv`] if the header cannot be read, or
    /// [`SourceError::MissingColumn`] from [`Self::bind`].
    pub fn from_reader<R: Read>(reader: &mut csv::Reader<R>, path: &str) -> Result<Self, SourceError> {
        let headers = reader.headers().map_err(|e| SourceError::Csv {
            path: path.to_string(),
            source: e,
        })?;
        Self::bind(headers, path)
    }

    /// File (or archive entry) the binding was made against.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Header position of `column`.
    #[must_use]
    pub fn position(&self, column: C) -> usize {
        self.positions[column.ordinal()]
    }

    /// Raw text of `column` in `record`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::SchemaViolation`] if the row is too short.
    pub fn field<'r>(&self, record: &'r StringRecord, column: C) -> Result<&'r str, SourceError> {
        let position = self.position(column);
        record
            .get(position)
            .ok_or_else(|| SourceError::SchemaViolation {
                path: self.path.clone(),
                line: line_of(record),
                column: column.name(),
                position,
                width: record.len(),
            })
    }

    /// Parses `column` in `record` after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::SchemaViolation`] for a short row or
    /// [`SourceError::InvalidValue`] if parsing fails.
    pub fn parse<T: FromStr>(&self, record: &StringRecord, column: C) -> Result<T, SourceError> {
        let raw = self.field(record, column)?;
        raw.trim().parse().map_err(|_| self.invalid(record, column, raw))
    }

    /// Builds an [`SourceError::InvalidValue`] for `column` in `record`.
    #[must_use]
    pub fn invalid(&self, record: &StringRecord, column: C, value: &str) -> SourceError {
        SourceError::InvalidValue {
            path: self.path.clone(),
            line: line_of(record),
            column: column.name(),
            value: value.to_string(),
        }
    }

    /// Reads the next record into `record`.
    ///
    /// Fields that are not valid UTF-8 are decoded lossily, with invalid
    /// bytes replaced by U+FFFD, so one stray byte in a free-text column
    /// does not abort the file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Csv`] on malformed CSV.
    pub fn next_record<R: Read>(
        &self,
        reader: &mut csv::Reader<R>,
        record: &mut StringRecord,
    ) -> Result<bool, SourceError> {
        let mut bytes = std::mem::take(record).into_byte_record();
        let more = reader
            .read_byte_record(&mut bytes)
            .map_err(|e| SourceError::Csv {
                path: self.path.clone(),
                source: e,
            })?;

        *record = match StringRecord::from_byte_record(bytes) {
            Ok(text) => text,
            Err(e) => {
                let bytes = e.into_byte_record();
                let position = bytes.position().cloned();
                let mut lossy = StringRecord::from_byte_record_lossy(bytes);
                lossy.set_position(position);
                log::debug!(
                    "{} line {}: replaced invalid UTF-8",
                    self.path,
                    line_of(&lossy)
                );
                lossy
            }
        };

        Ok(more)
    }
}
