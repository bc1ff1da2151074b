//! Locality data model

use serde::{Deserialize, Serialize};

use crate::region::Region;

/// One row of the remote results table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalityRecord {
    /// Locality name as shown in the first column
    pub locality_name: String,
    /// Postal code interval as shown in the second column
    pub cep_range: String,
}

impl LocalityRecord {
    pub fn new(locality_name: impl Into<String>, cep_range: impl Into<String>) -> Self {
        Self {
            locality_name: locality_name.into(),
            cep_range: cep_range.into(),
        }
    }
}

/// All localities scraped for a single region, in table and page order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionResult {
    pub region: Region,
    pub localities: Vec<LocalityRecord>,
}

impl RegionResult {
    pub fn new(region: Region, localities: Vec<LocalityRecord>) -> Self {
        Self { region, localities }
    }

    pub fn is_empty(&self) -> bool {
        self.localities.is_empty()
    }
}

/// Region results in request order
pub type ResultSet = Vec<RegionResult>;

/// A region whose run failed under the collect-errors policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionFailure {
    pub region: Region,
    pub error: String,
}

/// Outcome of resolving a batch of regions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Successful regions, in request order
    pub results: ResultSet,
    /// Failed regions, in request order (always empty under fail-fast)
    pub failures: Vec<RegionFailure>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
