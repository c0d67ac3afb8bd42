//! Biological scan data joined onto cached star systems

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Coordinates;
use crate::types::StarSystemRecord;

/// One analysed organic scan, as recorded in the commander's journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioEntityScan {
    pub system_name: String,
    pub system_id: i64,
    pub body_id: i32,
    pub species_id: String,
}

/// Static information about one species: display names and sale value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioEntityInfo {
    pub species_id: String,
    pub genus: String,
    pub species: String,
    pub value: f64,
}

impl fmt::Display for BioEntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.genus, self.species)
    }
}

/// A cached system together with the organic scans performed in it
#[derive(Debug, Clone)]
pub struct ScanSystem {
    pub record: Arc<StarSystemRecord>,
    pub scans: Vec<BioEntityScan>,
}

impl ScanSystem {
    pub fn new(record: Arc<StarSystemRecord>, scans: Vec<BioEntityScan>) -> Self {
        Self { record, scans }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Position of the system; clustering requires it
    pub fn coordinates(&self) -> Result<Coordinates> {
        self.record
            .coordinates
            .ok_or_else(|| Error::MissingCoordinates(self.record.name.clone()))
    }

    pub fn distance_to(&self, other: &ScanSystem) -> Result<f64> {
        Ok(self.coordinates()?.distance(&other.coordinates()?))
    }

    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }
}
