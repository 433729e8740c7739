//! Tract-to-tract flow rollup.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use geo::{Distance, Geodesic, Point};
use visitor_flows_geography_models::{CountyFips, tract_geoid};
use visitor_flows_patterns_models::WeeklyVisitRow;

use crate::centroids::{Centroid, CentroidSource};

/// Visitors from one home tract to one destination tract in one week.
#[derive(Debug, Clone, PartialEq)]
pub struct TractFlow {
    pub date_range_start: NaiveDate,
    pub date_range_end: NaiveDate,
    /// 11-character destination tract GEOID.
    pub destination_tract: String,
    /// 11-character home tract GEOID.
    pub home_tract: String,
    pub visitor_count: u64,
    pub home: Centroid,
    /// Destination centroid after the display offset.
    pub destination: Centroid,
    pub distance_km: f64,
}

/// Grouping key: destination tract, week, home tract.
pub type FlowKey = (String, NaiveDate, NaiveDate, String);

/// Sums home-CBG visitor counts by destination and home tract.
#[derive(Debug, Clone, Default)]
pub struct FlowAccumulator {
    counts: BTreeMap<FlowKey, u64>,
    skipped_geoids: u64,
}

impl FlowAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the in-county home block groups of one weekly row.
    pub fn add_row<'a>(
        &mut self,
        row: &WeeklyVisitRow,
        origins: impl IntoIterator<Item = (&'a String, &'a u64)>,
        county: &CountyFips,
    ) {
        let Some(destination) = tract_geoid(row.census_block_group.trim()) else {
            log::warn!(
                "Block group {:?} is too short for a tract GEOID",
                row.census_block_group
            );
            self.skipped_geoids += 1;
            return;
        };

        for (home_cbg, count) in origins {
            if !county.contains(home_cbg) {
                continue;
            }
            let Some(home) = tract_geoid(home_cbg) else {
                self.skipped_geoids += 1;
                continue;
            };

            *self
                .counts
                .entry((
                    destination.to_string(),
                    row.date_range_start,
                    row.date_range_end,
                    home.to_string(),
                ))
                .or_insert(0) += count;
        }
    }

    /// Counts in key order.
    #[must_use]
    pub const fn counts(&self) -> &BTreeMap<FlowKey, u64> {
        &self.counts
    }

    /// Block groups that were too short to hold a tract.
    #[must_use]
    pub const fn skipped_geoids(&self) -> u64 {
        self.skipped_geoids
    }

    /// Joins centroids and computes distances.
    ///
    /// Flows whose home or destination tract has no centroid are dropped.
    #[must_use]
    pub fn into_flows(self, centroids: &dyn CentroidSource, destination_offset: f64) -> Vec<TractFlow> {
        let mut dropped = 0u64;
        let mut flows = Vec::with_capacity(self.counts.len());

        for ((destination_tract, start, end, home_tract), visitor_count) in self.counts {
            let (Some(home), Some(destination)) = (
                centroids.centroid(&home_tract),
                centroids.centroid(&destination_tract),
            ) else {
                log::debug!("No centroid for flow {home_tract} -> {destination_tract}");
                dropped += 1;
                continue;
            };

            let destination = destination.offset(destination_offset);
            flows.push(TractFlow {
                date_range_start: start,
                date_range_end: end,
                destination_tract,
                home_tract,
                visitor_count,
                home,
                destination,
                distance_km: geodesic_km(home, destination),
            });
        }

        if dropped > 0 {
            log::info!("Dropped {dropped} flows without tract centroids");
        }
        flows
    }
}

/// Geodesic (WGS84 ellipsoid) distance in kilometres.
#[must_use]
pub fn geodesic_km(from: Centroid, to: Centroid) -> f64 {
    Geodesic.distance(Point::new(from.lon, from.lat), Point::new(to.lon, to.lat)) / 1000.0
}
