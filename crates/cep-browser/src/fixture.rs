//! Scripted lookup site for offline runs
//!
//! `FixtureDriver` answers the automation primitives from canned HTML
//! pages, moving from the search form to the results pages the way the
//! remote site does. Element lookups go through the same CSS selectors as
//! the real session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cep_core::Region;
use scraper::{Html, Selector};

use crate::automation::{DriverFactory, PageDriver};
use crate::context::RunContext;
use crate::error::{BrowserError, Result};
use crate::selectors::{NEXT_BUTTON, SEARCH_BUTTON};

/// Search form listing every region, inside the content panel
pub fn form_page() -> String {
    let options: String = Region::ALL
        .iter()
        .map(|r| format!(r#"<option value="{r}">{r}</option>"#))
        .collect();

    format!(
        r#"<html><body><div class="ctrlcontent">
             <form id="Geral" name="Geral">
               <select name="UF"><option value=""></option>{options}</select>
               <input type="button" value="Buscar">
             </form>
           </div></body></html>"#
    )
}

/// A results page as the lookup site renders it.
///
/// The first page carries a region summary table before the locality table;
/// continuation pages carry the locality table only.
pub fn results_page(rows: &[(&str, &str)], continuation: bool, has_next: bool) -> String {
    let body: String = rows
        .iter()
        .map(|(name, range)| format!("<tr><td>{name}</td><td>{range}</td></tr>"))
        .collect();

    let summary = if continuation {
        ""
    } else {
        r#"<table class="tmptabela"><tr><th>UF</th><th>Faixa de CEP</th></tr>
           <tr><td>--</td><td>00000-000 a 99999-999</td></tr></table>"#
    };

    let next = if has_next {
        r#"<div style="float:left"><a href="javascript:void(0)">Anterior</a></div>
           <div style="float:left"><form name="Proxima"><a href="javascript:void(0)">Próxima</a></form></div>"#
    } else {
        ""
    };

    format!(
        r#"<html><body><div class="ctrlcontent">{summary}
             <table class="tmptabela"><tr><th>Localidade</th><th>Faixa de CEP</th></tr>{body}</table>
             {next}
           </div></body></html>"#
    )
}

/// The pages one region run walks through
#[derive(Debug, Clone)]
pub struct FixtureSite {
    form_page: String,
    pages: Vec<String>,
    delay: Duration,
    failure: Option<String>,
}

impl FixtureSite {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            form_page: form_page(),
            pages,
            delay: Duration::ZERO,
            failure: None,
        }
    }

    /// Hold every navigation for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every navigation with `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Blank,
    Form,
    Results(usize),
}

#[derive(Debug)]
struct DriverState {
    location: Location,
    selected: Option<String>,
}

/// One scripted browser session
pub struct FixtureDriver {
    site: FixtureSite,
    state: Mutex<DriverState>,
    navigations: AtomicUsize,
    next_clicks: AtomicUsize,
}

impl FixtureDriver {
    pub fn new(site: FixtureSite) -> Self {
        Self {
            site,
            state: Mutex::new(DriverState {
                location: Location::Blank,
                selected: None,
            }),
            navigations: AtomicUsize::new(0),
            next_clicks: AtomicUsize::new(0),
        }
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn next_clicks(&self) -> usize {
        self.next_clicks.load(Ordering::SeqCst)
    }

    /// Value of the selected drop-down option
    pub fn selected_region(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.selected.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, DriverState>> {
        self.state
            .lock()
            .map_err(|e| BrowserError::TabError(format!("Fixture state poisoned: {}", e)))
    }

    fn current_page(&self, location: Location) -> &str {
        match location {
            Location::Blank => "<html><body></body></html>",
            Location::Form => &self.site.form_page,
            Location::Results(i) => self
                .site
                .pages
                .get(i)
                .map(String::as_str)
                .unwrap_or_default(),
        }
    }

    /// Outer HTML and `value` attribute of the first element matching `selector`
    fn find(&self, selector: &str) -> Result<Option<(String, Option<String>)>> {
        let sel = Selector::parse(selector).map_err(|e| {
            BrowserError::Interaction(format!("Bad selector {}: {:?}", selector, e))
        })?;
        let location = self.lock()?.location;
        let document = Html::parse_document(self.current_page(location));

        Ok(document
            .select(&sel)
            .next()
            .map(|el| (el.html(), el.value().attr("value").map(str::to_string))))
    }

    fn require(&self, selector: &str) -> Result<(String, Option<String>)> {
        self.find(selector)?.ok_or_else(|| {
            BrowserError::ElementNotFound(format!("Element '{}' not found", selector))
        })
    }
}

impl PageDriver for FixtureDriver {
    fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        if !self.site.delay.is_zero() {
            std::thread::sleep(self.site.delay);
        }
        if let Some(ref message) = self.site.failure {
            return Err(BrowserError::Navigation(format!(
                "Failed to navigate to {}: {}",
                url, message
            )));
        }

        let mut state = self.lock()?;
        state.location = Location::Form;
        state.selected = None;
        Ok(())
    }

    fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        match self.find(selector)? {
            Some(_) => Ok(()),
            None => Err(BrowserError::Timeout(format!(
                "{} not ready within {:?}",
                selector, timeout
            ))),
        }
    }

    fn select_option(&self, selector: &str, _timeout: Duration) -> Result<()> {
        let (_, value) = self.require(selector)?;
        self.lock()?.selected = value;
        Ok(())
    }

    fn wait_selected(&self, selector: &str, timeout: Duration) -> Result<()> {
        let (_, value) = self.require(selector)?;
        if value.is_some() && self.lock()?.selected == value {
            return Ok(());
        }
        Err(BrowserError::Timeout(format!(
            "{} not ready within {:?}",
            selector, timeout
        )))
    }

    fn click(&self, selector: &str, _timeout: Duration) -> Result<()> {
        self.require(selector)?;

        let mut state = self.lock()?;
        match (selector, state.location) {
            (SEARCH_BUTTON, Location::Form) if state.selected.is_some() => {
                if !self.site.pages.is_empty() {
                    state.location = Location::Results(0);
                }
            }
            (NEXT_BUTTON, Location::Results(i)) => {
                self.next_clicks.fetch_add(1, Ordering::SeqCst);
                if i + 1 < self.site.pages.len() {
                    state.location = Location::Results(i + 1);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn outer_html(&self, selector: &str, _timeout: Duration) -> Result<String> {
        self.require(selector).map(|(html, _)| html)
    }
}

/// Hands out scripted sessions per region and counts them
#[derive(Debug, Clone, Default)]
pub struct FixtureDriverFactory {
    sites: HashMap<Region, FixtureSite>,
    opened: Arc<AtomicUsize>,
}

impl FixtureDriverFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(mut self, region: Region, site: FixtureSite) -> Self {
        self.sites.insert(region, site);
        self
    }

    /// Sessions opened so far, across clones of this factory
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl DriverFactory for FixtureDriverFactory {
    fn open(&self, region: Region, _ctx: &RunContext) -> Result<Box<dyn PageDriver>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let site = self.sites.get(&region).cloned().ok_or_else(|| {
            BrowserError::Initialization(format!("No fixture site for {}", region))
        })?;
        Ok(Box::new(FixtureDriver::new(site)))
    }
}
