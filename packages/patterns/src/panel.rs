//! Home panel sample sizes.

use std::collections::BTreeMap;
use std::io::Read;

use csv::StringRecord;
use visitor_flows_geography_models::CountyFips;
use visitor_flows_patterns_models::{PanelColumn, PanelKey};
use visitor_flows_source::schema::{HeaderBinding, csv_reader};

use crate::PatternError;
use crate::visits::week_date;

/// Devices residing per week and block group, summed across files.
#[derive(Debug, Clone, Default)]
pub struct PanelAccumulator {
    sizes: BTreeMap<PanelKey, u64>,
}

impl PanelAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: PanelKey, devices: u64) {
        *self.sizes.entry(key).or_insert(0) += devices;
    }

    /// Reads one home panel summary file.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Source`] on CSV, schema, or value problems.
    pub fn read_file<R: Read>(&mut self, reader: R, path: &str) -> Result<(), PatternError> {
        let mut csv = csv_reader(reader);
        let binding = HeaderBinding::<PanelColumn>::from_reader(&mut csv, path)?;
        let mut row = StringRecord::new();
        let mut rows = 0u64;

        while binding.next_record(&mut csv, &mut row)? {
            rows += 1;
            let key = PanelKey {
                start: week_date(&binding, &row, PanelColumn::DateRangeStart)?,
                end: week_date(&binding, &row, PanelColumn::DateRangeEnd)?,
                cbg: binding
                    .field(&row, PanelColumn::CensusBlockGroup)?
                    .trim()
                    .to_string(),
            };
            let devices = binding.parse(&row, PanelColumn::NumberDevicesResiding)?;
            self.add(key, devices);
        }

        log::info!("{path}: {rows} panel rows");
        Ok(())
    }

    /// Drops block groups outside `county`.
    pub fn retain_county(&mut self, county: &CountyFips) {
        self.sizes.retain(|key, _| county.contains(&key.cbg));
    }

    #[must_use]
    pub fn get(&self, key: &PanelKey) -> Option<u64> {
        self.sizes.get(key).copied()
    }

    /// Sizes in key order.
    #[must_use]
    pub const fn sizes(&self) -> &BTreeMap<PanelKey, u64> {
        &self.sizes
    }
}
