//! cep-browser: Browser-driven locality scraping for cep-gateway
//!
//! Drives the remote postal-code range lookup page with headless Chrome.
//!
//! ## Features
//!
//! - One headless Chrome session per region, released on completion or cancellation
//! - Result table extraction with the first-page / continuation-page layout shift
//! - Pagination state machine following "next page" until it disappears
//! - Concurrent multi-region orchestration with request-order results and a shared deadline
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cep_browser::{BrowserConfig, ChromeDriverFactory, RegionResolver};
//! use cep_core::ScraperConfig;
//!
//! let config = ScraperConfig::default();
//! let factory = ChromeDriverFactory::new(BrowserConfig::from(&config));
//! let resolver = RegionResolver::new(Arc::new(factory), &config);
//!
//! let resolution = resolver.resolve(&["AC", "SP"]).await?;
//! ```

pub mod automation;
pub mod context;
pub mod error;
pub mod extract;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;
pub mod orchestrator;
pub mod pagination;
pub mod selectors;
pub mod session;

pub use automation::{DriverFactory, PageDriver};
pub use context::{CancelFlag, MAX_DEADLINE, RunContext, deadline_after};
pub use error::{BrowserError, Result};
pub use extract::PageSnapshot;
pub use orchestrator::RegionResolver;
pub use pagination::{ScrapeSettings, ScrapeState, scrape_region};
pub use session::{BrowserConfig, BrowserSession, ChromeDriverFactory};
