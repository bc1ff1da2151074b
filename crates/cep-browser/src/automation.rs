//! Browser automation seam
//!
//! The scraping logic only talks to these traits, so it can run against
//! headless Chrome in production and against scripted pages in tests.

use std::time::Duration;

use cep_core::Region;

use crate::context::RunContext;
use crate::error::Result;

/// The automation primitives the lookup flow needs from one browser session.
///
/// All calls block the current thread.
pub trait PageDriver {
    /// Load a URL and wait for the navigation to finish
    fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait until the element exists and is rendered
    fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Mark an `<option>` as selected
    fn select_option(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Wait until an `<option>` reports itself as selected
    fn wait_selected(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Click the element
    fn click(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Outer HTML of the element
    fn outer_html(&self, selector: &str, timeout: Duration) -> Result<String>;
}

/// Opens one exclusive browser session per region run.
///
/// The session may hold on to `ctx` so its waits stop once the run is
/// abandoned.
pub trait DriverFactory: Send + Sync {
    fn open(&self, region: Region, ctx: &RunContext) -> Result<Box<dyn PageDriver>>;
}
