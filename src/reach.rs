//! River identifier lookups: id ranges to model regions and lat/lon to the nearest river.

use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Service-specific integer key of a modeled stream segment.
pub type ReachId = i64;

/// Beyond this many degrees the nearest river is probably not the one meant.
pub const DEFAULT_MAX_DISTANCE: f64 = 0.11;

// Ids are assigned in blocks per delineation region. The first three regions
// were numbered before the block scheme and sit below one million.
const REGION_THRESHOLDS: [(&str, ReachId); 13] = [
    ("australia-geoglows", 300_000),
    ("middle_east-geoglows", 700_000),
    ("central_america-geoglows", 1_000_000),
    ("islands-geoglows", 2_000_000),
    ("japan-geoglows", 4_000_000),
    ("east_asia-geoglows", 5_000_000),
    ("south_asia-geoglows", 6_000_000),
    ("africa-geoglows", 8_000_000),
    ("central_asia-geoglows", 9_000_000),
    ("south_america-geoglows", 10_000_000),
    ("west_asia-geoglows", 11_000_000),
    ("europe-geoglows", 13_000_000),
    ("north_america-geoglows", 14_000_000),
];

/// Region name for the range of numbers a reach id falls in.
///
/// Does not check that the id exists in that region.
pub fn reach_to_region(reach_id: ReachId) -> Result<&'static str> {
    if reach_id <= 0 {
        return Err(Error::RegionNotFound(format!("reach_id {reach_id}")));
    }
    REGION_THRESHOLDS
        .iter()
        .find(|(_, upper)| reach_id < *upper)
        .map(|(region, _)| *region)
        .ok_or_else(|| Error::RegionNotFound(format!("reach_id {reach_id}")))
}

/// Every region name known to [`reach_to_region`], in id order.
pub fn regions() -> impl Iterator<Item = &'static str> {
    REGION_THRESHOLDS.iter().map(|(r, _)| *r)
}

/// One row of the river metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRow {
    #[serde(alias = "LINKNO", alias = "COMID", alias = "comid", alias = "rivid")]
    pub reach_id: ReachId,
    #[serde(alias = "Lat", alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "Lon", alias = "longitude")]
    pub lon: f64,
    #[serde(default, alias = "VPUCode", alias = "vpu")]
    pub region: Option<String>,
}

/// Result of resolving a latitude/longitude to a river.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReachLocation {
    pub reach_id: ReachId,
    pub region: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Distance from the query point in degrees.
    pub distance: f64,
}

/// Lookup table mapping river ids to coordinates and model region.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    rows: Vec<MetadataRow>,
}

fn check_latlon(lat: f64, lon: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::InvalidRequest(format!(
            "provide a valid latitude and longitude, got ({lat}, {lon})"
        )));
    }
    Ok(())
}

impl MetadataTable {
    pub fn new(rows: Vec<MetadataRow>) -> Self {
        Self { rows }
    }

    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let rows = reader
            .deserialize::<MetadataRow>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_csv(&text)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[MetadataRow] {
        &self.rows
    }

    fn row(&self, reach_id: ReachId) -> Result<&MetadataRow> {
        self.rows
            .iter()
            .find(|r| r.reach_id == reach_id)
            .ok_or(Error::ReachNotFound(reach_id))
    }

    /// Closest river to a point by straight-line distance in degrees, with no cutoff.
    pub fn nearest_reach(&self, lat: f64, lon: f64) -> Result<ReachLocation> {
        check_latlon(lat, lon)?;
        let (row, distance) = self
            .rows
            .iter()
            .map(|r| (r, ((r.lat - lat).powi(2) + (r.lon - lon).powi(2)).sqrt()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or(Error::EmptyTable)?;

        Ok(ReachLocation {
            reach_id: row.reach_id,
            region: row.region.clone(),
            lat: row.lat,
            lon: row.lon,
            distance,
        })
    }

    /// Closest river within [`DEFAULT_MAX_DISTANCE`] degrees.
    pub fn latlon_to_reach(&self, lat: f64, lon: f64) -> Result<ReachLocation> {
        self.latlon_to_reach_within(lat, lon, DEFAULT_MAX_DISTANCE)
    }

    pub fn latlon_to_reach_within(&self, lat: f64, lon: f64, max_distance: f64) -> Result<ReachLocation> {
        let found = self.nearest_reach(lat, lon)?;
        if found.distance > max_distance {
            return Err(Error::NoNearbyReach {
                lat,
                lon,
                distance: found.distance,
            });
        }
        Ok(found)
    }

    /// Region of the river nearest to a point; falls back to the id ranges when the
    /// table has no region column.
    pub fn latlon_to_region(&self, lat: f64, lon: f64) -> Result<String> {
        let found = self.latlon_to_reach(lat, lon)?;
        match found.region {
            Some(region) => Ok(region),
            None => reach_to_region(found.reach_id).map(str::to_string),
        }
    }

    pub fn reach_to_latlon(&self, reach_id: ReachId) -> Result<(f64, f64)> {
        let row = self.row(reach_id)?;
        Ok((row.lat, row.lon))
    }

    pub fn reach_to_vpu(&self, reach_id: ReachId) -> Result<String> {
        self.row(reach_id)?
            .region
            .clone()
            .ok_or_else(|| Error::RegionNotFound(format!("reach_id {reach_id}")))
    }
}
