//! Weekly visit accumulation.

use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use csv::StringRecord;
use visitor_flows_geography_models::CountyFips;
use visitor_flows_patterns_models::{
    OriginCounts, PatternColumn, VisitTotals, WeeklyKey, parse_week_date,
};
use visitor_flows_source::schema::{Column, HeaderBinding, csv_reader, line_of};

use crate::PatternError;
use crate::allow_list::{AllowList, PoiLocation};

/// Visit totals keyed by [`WeeklyKey`].
///
/// Every update is a sum, so the final totals do not depend on the order
/// files or rows are fed in.
#[derive(Debug, Clone, Default)]
pub struct WeeklyAccumulator {
    totals: BTreeMap<WeeklyKey, VisitTotals>,
    rows: u64,
    matched: u64,
    unplaced: u64,
}

impl WeeklyAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation under `key`.
    pub fn add(&mut self, key: WeeklyKey, visits: u64, visitors: u64, origins: &OriginCounts) {
        self.totals
            .entry(key)
            .or_default()
            .add(visits, visitors, origins);
    }

    /// Reads one weekly pattern file, keeping rows of allowed POIs.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Source`] on CSV or schema problems and
    /// [`PatternError::MalformedOriginMap`] if `visitor_home_cbgs` does
    /// not parse.
    pub fn read_file<R: Read>(
        &mut self,
        reader: R,
        path: &str,
        allow: &AllowList,
    ) -> Result<(), PatternError> {
        let mut csv = csv_reader(reader);
        let binding = HeaderBinding::<PatternColumn>::from_reader(&mut csv, path)?;
        let mut row = StringRecord::new();
        let (rows_before, matched_before) = (self.rows, self.matched);

        while binding.next_record(&mut csv, &mut row)? {
            self.rows += 1;

            let place_id = binding.field(&row, PatternColumn::PlaceId)?.trim();
            let tables: Vec<&str> = allow.tables_for(place_id).collect();
            if tables.is_empty() {
                continue;
            }

            let start = week_date(&binding, &row, PatternColumn::DateRangeStart)?;
            let end = week_date(&binding, &row, PatternColumn::DateRangeEnd)?;
            let cbg = binding.field(&row, PatternColumn::PoiCbg)?.trim();
            let location_name = binding.field(&row, PatternColumn::LocationName)?;
            let visits: u64 = binding.parse(&row, PatternColumn::RawVisitCounts)?;
            let visitors: u64 = binding.parse(&row, PatternColumn::RawVisitorCounts)?;
            let origins = OriginCounts::extract(binding.field(&row, PatternColumn::VisitorHomeCbgs)?)
                .map_err(|e| PatternError::MalformedOriginMap {
                    path: path.to_string(),
                    line: line_of(&row),
                    source: e,
                })?;

            for table in tables {
                let key = WeeklyKey {
                    start,
                    end,
                    cbg: cbg.to_string(),
                    location_name: location_name.to_string(),
                    naics: table.to_string(),
                };
                self.add(key, visits, visitors, &origins);
                self.matched += 1;
                if !allow
                    .location(table, place_id)
                    .is_some_and(PoiLocation::is_placed)
                {
                    self.unplaced += 1;
                }
            }
        }

        log::info!(
            "{path}: {} rows, {} matched",
            self.rows - rows_before,
            self.matched - matched_before
        );
        Ok(())
    }

    /// Drops keys whose POI block group is outside `county`.
    pub fn retain_county(&mut self, county: &CountyFips) {
        self.totals.retain(|key, _| county.contains(&key.cbg));
    }

    /// Totals in key order.
    #[must_use]
    pub const fn totals(&self) -> &BTreeMap<WeeklyKey, VisitTotals> {
        &self.totals
    }

    /// Pattern rows read.
    #[must_use]
    pub const fn rows(&self) -> u64 {
        self.rows
    }

    /// Row-table matches accumulated.
    #[must_use]
    pub const fn matched(&self) -> u64 {
        self.matched
    }

    /// Matches whose POI has no usable coordinates in its table.
    #[must_use]
    pub const fn unplaced(&self) -> u64 {
        self.unplaced
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Parses a week boundary column.
pub(crate) fn week_date<C: Column>(
    binding: &HeaderBinding<C>,
    row: &StringRecord,
    column: C,
) -> Result<NaiveDate, PatternError> {
    let raw = binding.field(row, column)?;
    parse_week_date(raw).ok_or_else(|| binding.invalid(row, column, raw).into())
}
