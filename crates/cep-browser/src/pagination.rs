//! Pagination driver
//!
//! Runs the lookup flow for one region over one browser session:
//!
//! ```text
//! Navigating -> FormSubmitted -> ExtractingPage(first)
//!            -> (CheckNext -> ExtractingPage(continuation))* -> Done
//! ```
//!
//! Any failure moves the run to `Failed` and discards what was collected.

use std::time::{Duration, Instant};

use cep_core::{Error, LocalityRecord, Region, Result, ScraperConfig};
use tracing::{debug, info, warn};

use crate::automation::PageDriver;
use crate::context::RunContext;
use crate::extract::PageSnapshot;
use crate::selectors::{
    CONTENT_PANEL, NEXT_BUTTON, NEXT_FORM, REGION_SELECT, RESULT_TABLE, SEARCH_BUTTON,
    region_option,
};

/// Timing and limits of a region run
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub target_url: String,
    pub element_timeout: Duration,
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    pub max_pages: usize,
}

impl From<&ScraperConfig> for ScrapeSettings {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            target_url: config.target_url.clone(),
            element_timeout: config.element_timeout(),
            settle_delay: config.settle_delay(),
            poll_interval: config.poll_interval(),
            max_pages: config.max_pages.max(1),
        }
    }
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self::from(&ScraperConfig::default())
    }
}

/// States of a region run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    Navigating,
    FormSubmitted,
    ExtractingPage { continuation: bool },
    CheckNext,
    Done,
    Failed,
}

/// Scrape every results page of one region.
///
/// Returns the records of all pages in page then row order, or the first
/// error hit on the way.
pub fn scrape_region(
    driver: &dyn PageDriver,
    region: Region,
    settings: &ScrapeSettings,
    ctx: &RunContext,
) -> Result<Vec<LocalityRecord>> {
    RegionScrape::new(driver, region, settings, ctx).run()
}

struct RegionScrape<'a> {
    driver: &'a dyn PageDriver,
    region: Region,
    settings: &'a ScrapeSettings,
    ctx: &'a RunContext,
    state: ScrapeState,
    /// Last captured content panel
    snapshot: String,
    has_next: bool,
    pages: usize,
    records: Vec<LocalityRecord>,
}

impl<'a> RegionScrape<'a> {
    fn new(
        driver: &'a dyn PageDriver,
        region: Region,
        settings: &'a ScrapeSettings,
        ctx: &'a RunContext,
    ) -> Self {
        Self {
            driver,
            region,
            settings,
            ctx,
            state: ScrapeState::Navigating,
            snapshot: String::new(),
            has_next: false,
            pages: 0,
            records: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<LocalityRecord>> {
        let started = Instant::now();

        while self.state != ScrapeState::Done {
            let next = self.ctx.checkpoint().and_then(|()| self.step());
            match next {
                Ok(next) => {
                    debug!("{}: {:?} -> {:?}", self.region, self.state, next);
                    self.state = next;
                }
                Err(e) => {
                    // waits are clamped to the deadline, so a timeout after it is the deadline
                    let e = if self.ctx.is_expired() {
                        Error::DeadlineExceeded
                    } else {
                        e
                    };
                    warn!(
                        "{}: failed in {:?} after {} pages: {}",
                        self.region, self.state, self.pages, e
                    );
                    self.state = ScrapeState::Failed;
                    return Err(e);
                }
            }
        }

        info!(
            "{}: {} localities from {} pages in {:?}",
            self.region,
            self.records.len(),
            self.pages,
            started.elapsed()
        );
        Ok(self.records)
    }

    fn step(&mut self) -> Result<ScrapeState> {
        match self.state {
            ScrapeState::Navigating => {
                self.driver.navigate(&self.settings.target_url, self.wait())?;
                Ok(ScrapeState::FormSubmitted)
            }
            ScrapeState::FormSubmitted => {
                self.submit_search()?;
                Ok(ScrapeState::ExtractingPage {
                    continuation: false,
                })
            }
            ScrapeState::ExtractingPage { continuation } => {
                self.extract_page(continuation)?;
                Ok(ScrapeState::CheckNext)
            }
            ScrapeState::CheckNext => {
                if !self.has_next {
                    return Ok(ScrapeState::Done);
                }
                if self.pages >= self.settings.max_pages {
                    return Err(Error::Automation(format!(
                        "{}: still paging after {} pages",
                        self.region, self.pages
                    )));
                }
                self.open_next_page()?;
                Ok(ScrapeState::ExtractingPage { continuation: true })
            }
            ScrapeState::Done | ScrapeState::Failed => Ok(self.state),
        }
    }

    fn submit_search(&mut self) -> Result<()> {
        let option = region_option(self.region.as_str());

        self.driver.wait_visible(REGION_SELECT, self.wait())?;
        self.driver.select_option(&option, self.wait())?;
        self.driver.wait_selected(&option, self.wait())?;

        let baseline = self.driver.outer_html(CONTENT_PANEL, self.wait())?;
        self.driver.click(SEARCH_BUTTON, self.wait())?;
        self.snapshot = self.await_fresh_panel(&baseline, None)?;
        Ok(())
    }

    fn extract_page(&mut self, continuation: bool) -> Result<()> {
        let page = PageSnapshot::parse(&self.snapshot);
        let records = std::mem::take(&mut self.records);
        self.records = page.extract_localities(continuation, records)?;
        self.has_next = page.has_next_page()?;
        self.pages += 1;

        debug!(
            "{}: page {} done, {} localities so far, next page: {}",
            self.region,
            self.pages,
            self.records.len(),
            self.has_next
        );
        Ok(())
    }

    fn open_next_page(&mut self) -> Result<()> {
        self.driver.wait_visible(NEXT_FORM, self.wait())?;
        self.driver.click(NEXT_BUTTON, self.wait())?;

        let previous = std::mem::take(&mut self.snapshot);
        self.snapshot = self.await_fresh_panel(&previous, Some(RESULT_TABLE))?;
        Ok(())
    }

    /// Wait for the content panel to change after a click, then capture it.
    ///
    /// The remote page gives no precise "done" signal: a bounded settle delay
    /// comes first, then the panel is polled until it differs from `previous`
    /// (and, if given, `ready` is visible).
    fn await_fresh_panel(&self, previous: &str, ready: Option<&str>) -> Result<String> {
        self.ctx
            .sleep(self.settings.settle_delay, self.settings.poll_interval);

        let limit = Instant::now() + self.wait();
        loop {
            self.ctx.checkpoint()?;

            match self.driver.outer_html(CONTENT_PANEL, self.poll()) {
                Ok(html) if html != previous => {
                    let Some(ready) = ready else {
                        return Ok(html);
                    };
                    self.driver.wait_visible(ready, self.remaining(limit))?;
                    return Ok(self.driver.outer_html(CONTENT_PANEL, self.wait())?);
                }
                Ok(_) => {}
                Err(e) => debug!("{}: content panel not readable yet: {}", self.region, e),
            }

            if Instant::now() >= limit {
                return Err(Error::Automation(format!(
                    "{}: content panel did not change within {:?}",
                    self.region, self.settings.element_timeout
                )));
            }
            self.ctx
                .sleep(self.settings.poll_interval, self.settings.poll_interval);
        }
    }

    fn wait(&self) -> Duration {
        self.ctx.clamp(self.settings.element_timeout)
    }

    fn poll(&self) -> Duration {
        self.ctx.clamp(self.settings.poll_interval)
    }

    fn remaining(&self, limit: Instant) -> Duration {
        self.ctx.clamp(limit.saturating_duration_since(Instant::now()))
    }
}
