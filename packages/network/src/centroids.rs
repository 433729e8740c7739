//! Tract centroid lookup.
//!
//! Centroids come from a CSV export of the census tract polygons with
//! `GEOID`, `LON`, and `LAT` columns (any extra columns are ignored).

use std::collections::HashMap;
use std::path::Path;

use csv::StringRecord;
use visitor_flows_source::files::open_decoded;
use visitor_flows_source::schema::{Column, HeaderBinding, csv_reader};

use crate::NetworkError;

/// A point in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    pub lon: f64,
    pub lat: f64,
}

impl Centroid {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Shifts both coordinates by `degrees`.
    #[must_use]
    pub fn offset(self, degrees: f64) -> Self {
        Self {
            lon: self.lon + degrees,
            lat: self.lat + degrees,
        }
    }
}

/// Resolves a tract GEOID to its centroid.
pub trait CentroidSource {
    fn centroid(&self, tract_geoid: &str) -> Option<Centroid>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CentroidColumn {
    Geoid,
    Lon,
    Lat,
}

impl Column for CentroidColumn {
    const ALL: &'static [Self] = &[Self::Geoid, Self::Lon, Self::Lat];

    fn name(self) -> &'static str {
        match self {
            Self::Geoid => "GEOID",
            Self::Lon => "LON",
            Self::Lat => "LAT",
        }
    }

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// In-memory centroid table keyed by GEOID.
#[derive(Debug, Clone, Default)]
pub struct CentroidTable {
    centroids: HashMap<String, Centroid>,
}

impl CentroidTable {
    /// Loads a `GEOID,LON,LAT` CSV (optionally gzipped).
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Source`] if the file cannot be read, lacks
    /// a column, or has a non-numeric coordinate.
    pub fn load(path: &Path) -> Result<Self, NetworkError> {
        let display = path.display().to_string();
        let mut reader = csv_reader(open_decoded(path)?);
        let binding = HeaderBinding::<CentroidColumn>::from_reader(&mut reader, &display)?;

        let mut table = Self::default();
        let mut row = StringRecord::new();
        while binding.next_record(&mut reader, &mut row)? {
            let geoid = binding.field(&row, CentroidColumn::Geoid)?.trim().to_string();
            let centroid = Centroid::new(
                binding.parse(&row, CentroidColumn::Lon)?,
                binding.parse(&row, CentroidColumn::Lat)?,
            );
            table.insert(geoid, centroid);
        }

        log::info!("Loaded {} centroids from {display}", table.len());
        Ok(table)
    }

    pub fn insert(&mut self, geoid: impl Into<String>, centroid: Centroid) {
        self.centroids.insert(geoid.into(), centroid);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}

impl CentroidSource for CentroidTable {
    fn centroid(&self, tract_geoid: &str) -> Option<Centroid> {
        self.centroids.get(tract_geoid).copied()
    }
}

impl FromIterator<(String, Centroid)> for CentroidTable {
    fn from_iter<I: IntoIterator<Item = (String, Centroid)>>(iter: I) -> Self {
        Self {
            centroids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_table_by_header_name() {
        let dir = std::env::temp_dir().join("visitor_flows_centroids");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tracts.csv");
        std::fs::write(
            &path,
            "STATEFP,LAT,GEOID,LON\n48,29.75,48201555100,-95.37\n48,29.8,48201555200,-95.4\n",
        )
        .unwrap();

        let table = CentroidTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.centroid("48201555100"),
            Some(Centroid::new(-95.37, 29.75))
        );
        assert_eq!(table.centroid("48201999999"), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bad_coordinate_is_an_error() {
        let dir = std::env::temp_dir().join("visitor_flows_centroids_bad");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tracts.csv");
        std::fs::write(&path, "GEOID,LON,LAT\n48201555100,west,29.75\n").unwrap();

        assert!(CentroidTable::load(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
