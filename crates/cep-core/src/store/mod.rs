//! Persistence for scraped regions
//!
//! Stores each scraped region as a row in SQLite and supports
//! lookup by region code.

mod sqlite;
mod types;

pub use sqlite::LocalityStore;
pub use types::StoredRegionResult;
