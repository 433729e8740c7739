//! Place ids of the extracted POI tables.

use std::collections::HashMap;
use std::path::Path;

use csv::StringRecord;
use visitor_flows_source::files::open_decoded;
use visitor_flows_source::schema::{Column, HeaderBinding, csv_reader};

use crate::PatternError;

/// Columns read back from an extracted POI table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoiTableColumn {
    PlaceId,
    Latitude,
    Longitude,
}

impl Column for PoiTableColumn {
    const ALL: &'static [Self] = &[Self::PlaceId, Self::Latitude, Self::Longitude];

    fn name(self) -> &'static str {
        match self {
            Self::PlaceId => "safegraph_place_id",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// Coordinates of an allowed POI; `None` when the table value is not a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoiLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PoiLocation {
    /// Whether both coordinates are present.
    #[must_use]
    pub const fn is_placed(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Per-table place id sets, in table order.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    tables: Vec<(String, HashMap<String, PoiLocation>)>,
}

impl AllowList {
    /// Reads `<dir>/<name>.csv` for each table name.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Source`] if a table is missing, unreadable,
    /// or lacks the place id / coordinate columns.
    pub fn load(dir: &Path, names: &[String]) -> Result<Self, PatternError> {
        let mut list = Self::default();

        for name in names {
            let path = dir.join(format!("{name}.csv"));
            let display = path.display().to_string();
            let mut reader = csv_reader(open_decoded(&path)?);
            let binding = HeaderBinding::<PoiTableColumn>::from_reader(&mut reader, &display)?;

            let mut places = HashMap::new();
            let mut row = StringRecord::new();
            let mut unplaced = 0u64;
            while binding.next_record(&mut reader, &mut row)? {
                let location = PoiLocation {
                    latitude: binding.parse(&row, PoiTableColumn::Latitude).ok(),
                    longitude: binding.parse(&row, PoiTableColumn::Longitude).ok(),
                };
                if !location.is_placed() {
                    unplaced += 1;
                }
                let id = binding.field(&row, PoiTableColumn::PlaceId)?.trim();
                places.insert(id.to_string(), location);
            }

            if unplaced > 0 {
                log::warn!("{display}: {unplaced} POIs have no usable coordinates");
            }
            log::info!("Loaded {} POIs for table {name}", places.len());
            list.insert(name.clone(), places);
        }

        Ok(list)
    }

    /// Adds (or replaces) a table.
    pub fn insert(&mut self, name: String, places: HashMap<String, PoiLocation>) {
        if let Some(existing) = self.tables.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = places;
        } else {
            self.tables.push((name, places));
        }
    }

    /// Names of the tables that contain `place_id`, in table order.
    pub fn tables_for<'a>(&'a self, place_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tables
            .iter()
            .filter(move |(_, places)| places.contains_key(place_id))
            .map(|(name, _)| name.as_str())
    }

    /// Coordinates of `place_id` in table `name`.
    #[must_use]
    pub fn location(&self, name: &str, place_id: &str) -> Option<&PoiLocation> {
        self.tables
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, places)| places.get(place_id))
    }

    /// Total place ids across tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.iter().map(|(_, places)| places.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
