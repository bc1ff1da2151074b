//! Stored result type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::locality::{LocalityRecord, RegionResult};
use crate::region::Region;

/// A region result as kept in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRegionResult {
    /// Unique identifier of the stored run
    pub id: String,
    pub region: Region,
    pub localities: Vec<LocalityRecord>,
    /// When the run was stored
    pub created_at: DateTime<Utc>,
}

impl StoredRegionResult {
    /// Wrap a fresh result with a new id and the current timestamp
    pub fn new(result: &RegionResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            region: result.region,
            localities: result.localities.clone(),
            created_at: Utc::now(),
        }
    }

    /// Drop the storage metadata
    pub fn into_result(self) -> RegionResult {
        RegionResult::new(self.region, self.localities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_result_new() {
        let result = RegionResult::new(
            Region::AC,
            vec![LocalityRecord::new("Acrelândia", "69945-000 a 69949-999")],
        );
        let stored = StoredRegionResult::new(&result);

        assert!(!stored.id.is_empty());
        assert_eq!(stored.region, Region::AC);
        assert_eq!(stored.into_result(), result);
    }
}
