//! cep-core: CEP Locality Gateway Core Library
//!
//! Region codes, the locality data model, the error taxonomy,
//! configuration, persistence and result file output shared by
//! the scraper and the HTTP API.

pub mod config;
pub mod error;
pub mod locality;
pub mod region;
pub mod sink;
pub mod store;

pub use config::{ApiConfig, Config, FailurePolicy, OutputConfig, ScraperConfig, StoreConfig};
pub use error::{Error, Result};
pub use locality::{LocalityRecord, RegionFailure, RegionResult, Resolution, ResultSet};
pub use region::{MAX_REGIONS, Region, is_valid_region};
pub use sink::FileSink;
pub use store::{LocalityStore, StoredRegionResult};
