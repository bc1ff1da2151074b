//! Browser session management
//!
//! Provides a headless Chrome instance driving a single tab. Dropping the
//! session closes the browser process. Waits poll the page and give up as
//! soon as the run's deadline passes or the run is cancelled.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use cep_core::{Region, ScraperConfig};
use headless_chrome::{Browser, Element, LaunchOptionsBuilder, Tab};
use serde_json::Value;
use tracing::{debug, info};

use crate::automation::{DriverFactory, PageDriver};
use crate::context::{MAX_DEADLINE, RunContext};
use crate::error::{BrowserError, Result};

/// Chrome launch settings shared by every region run
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    /// Window size in pixels
    pub window: (u32, u32),
    /// How long Chrome may stay idle before the connection is dropped
    pub idle_timeout: Duration,
    /// Interval between readiness checks
    pub poll_interval: Duration,
}

impl From<&ScraperConfig> for BrowserConfig {
    fn from(config: &ScraperConfig) -> Self {
        let idle = config.deadline_secs.max(1).saturating_mul(2);
        Self {
            headless: config.headless,
            window: (1280, 1024),
            idle_timeout: Duration::from_secs(idle).min(MAX_DEADLINE),
            poll_interval: config.poll_interval(),
        }
    }
}

/// One Chrome process driving a single tab for one region run
pub struct BrowserSession {
    browser: Browser,
    poll_interval: Duration,
    ctx: RunContext,
}

impl BrowserSession {
    /// Launch Chrome; every wait of the session ends once `ctx` does
    pub fn launch(config: &BrowserConfig, ctx: RunContext) -> Result<Self> {
        info!("Creating browser session (headless: {})", config.headless);

        let (width, height) = config.window;
        let args = [
            format!("--window-size={},{}", width, height),
            "--no-sandbox".to_string(),
            "--disable-setuid-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
        ];
        let os_args: Vec<&OsStr> = args.iter().map(OsStr::new).collect();

        let launch_options = LaunchOptionsBuilder::default()
            .headless(config.headless)
            .args(os_args)
            .idle_browser_timeout(config.idle_timeout)
            .build()
            .map_err(|e| {
                BrowserError::Initialization(format!("Failed to build launch options: {}", e))
            })?;

        let browser = Browser::new(launch_options).map_err(|e| {
            BrowserError::Initialization(format!("Failed to launch browser: {}", e))
        })?;

        debug!("Browser session created");

        Ok(Self {
            browser,
            poll_interval: config.poll_interval,
            ctx,
        })
    }

    /// Get the active tab
    pub fn active_tab(&self) -> Result<Arc<Tab>> {
        let tabs = self.browser.get_tabs();
        let tabs_guard = tabs
            .lock()
            .map_err(|e| BrowserError::TabError(format!("Failed to lock tabs: {}", e)))?;

        tabs_guard
            .first()
            .cloned()
            .ok_or_else(|| BrowserError::TabError("No active tab available".to_string()))
    }

    /// Evaluate a boolean script until it yields `true`.
    ///
    /// Evaluation errors (e.g. while a new document is loading) count as `false`.
    fn poll_js(&self, tab: &Tab, script: &str, timeout: Duration, what: &str) -> Result<()> {
        self.ctx
            .poll_until(timeout, self.poll_interval, what, || {
                match tab.evaluate(script, false) {
                    Ok(object) => object.value == Some(Value::Bool(true)),
                    Err(e) => {
                        debug!("Readiness check for {} failed: {}", what, e);
                        false
                    }
                }
            })
    }

    /// Wait for `selector` to exist, then look it up
    fn element<'a>(&self, tab: &'a Tab, selector: &str, timeout: Duration) -> Result<Element<'a>> {
        self.ctx
            .poll_until(timeout, self.poll_interval, selector, || {
                tab.find_element(selector).is_ok()
            })?;

        tab.find_element(selector).map_err(|e| {
            BrowserError::ElementNotFound(format!("Element '{}' not found: {}", selector, e))
        })
    }
}

/// Quote a CSS selector as a JavaScript string literal
fn js_string(selector: &str) -> Result<String> {
    serde_json::to_string(selector)
        .map_err(|e| BrowserError::Interaction(format!("Bad selector {}: {}", selector, e)))
}

impl PageDriver for BrowserSession {
    fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let tab = self.active_tab()?;
        tab.set_default_timeout(self.ctx.clamp(timeout));

        info!("Navigating to: {}", url);

        tab.navigate_to(url).map_err(|e| {
            BrowserError::Navigation(format!("Failed to navigate to {}: {}", url, e))
        })?;

        tab.wait_until_navigated()
            .map_err(|e| BrowserError::Navigation(format!("Navigation timeout: {}", e)))?;

        Ok(())
    }

    fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let tab = self.active_tab()?;

        debug!("Waiting for visible element: {} (timeout: {:?})", selector, timeout);

        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             if (!el) return false; \
             const style = window.getComputedStyle(el); \
             const rect = el.getBoundingClientRect(); \
             return style.display !== 'none' && style.visibility !== 'hidden' \
                 && rect.width > 0 && rect.height > 0; }})()",
            js_string(selector)?
        );
        self.poll_js(&tab, &script, timeout, selector)
    }

    fn select_option(&self, selector: &str, timeout: Duration) -> Result<()> {
        let tab = self.active_tab()?;

        debug!("Selecting option: {}", selector);

        self.element(&tab, selector, timeout)?
            .call_js_fn(
                "function() { this.setAttribute('selected', 'true'); this.selected = true; }",
                vec![],
                false,
            )
            .map_err(|e| {
                BrowserError::Interaction(format!("Failed to select '{}': {}", selector, e))
            })?;

        Ok(())
    }

    fn wait_selected(&self, selector: &str, timeout: Duration) -> Result<()> {
        let tab = self.active_tab()?;

        let script = format!(
            "(() => {{ const el = document.querySelector({}); return !!el && el.selected === true; }})()",
            js_string(selector)?
        );
        self.poll_js(&tab, &script, timeout, selector)
    }

    fn click(&self, selector: &str, timeout: Duration) -> Result<()> {
        let tab = self.active_tab()?;

        info!("Clicking element: {}", selector);

        self.element(&tab, selector, timeout)?
            .click()
            .map_err(|e| {
                BrowserError::Interaction(format!("Failed to click '{}': {}", selector, e))
            })?;

        Ok(())
    }

    fn outer_html(&self, selector: &str, timeout: Duration) -> Result<String> {
        let tab = self.active_tab()?;

        let html = self
            .element(&tab, selector, timeout)?
            .get_content()
            .map_err(|e| BrowserError::Extraction(format!("Failed to read '{}': {}", selector, e)))?;

        debug!("Captured {} bytes from: {}", html.len(), selector);

        Ok(html)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        info!("Closing browser session");
        // Browser will be automatically closed when dropped
    }
}

/// Launches a fresh headless Chrome for every region run
#[derive(Debug, Clone)]
pub struct ChromeDriverFactory {
    config: BrowserConfig,
}

impl ChromeDriverFactory {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

impl DriverFactory for ChromeDriverFactory {
    fn open(&self, region: Region, ctx: &RunContext) -> Result<Box<dyn PageDriver>> {
        debug!("Opening browser session for {}", region);
        Ok(Box::new(BrowserSession::launch(&self.config, ctx.clone())?))
    }
}
