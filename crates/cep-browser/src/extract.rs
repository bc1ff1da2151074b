//! Result table extraction
//!
//! The lookup page renders two tables with the result class. On the page
//! reached by submitting the search form the results live in the second one;
//! on every page reached through "next" the layout changes and the results
//! live in the first one.

use cep_core::{Error, LocalityRecord, Result};
use scraper::{ElementRef, Html, Selector};

use crate::selectors::{NAME_CELL, NEXT_FORM, RANGE_CELL, RESULT_TABLE, TABLE_ROWS};

/// A parsed capture of the content panel
pub struct PageSnapshot {
    document: Html,
}

impl PageSnapshot {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Append the rows of the result table to `acc`.
    ///
    /// A missing table leaves `acc` untouched. Rows with an empty name
    /// (the header row) are skipped.
    pub fn extract_localities(
        &self,
        continuation: bool,
        mut acc: Vec<LocalityRecord>,
    ) -> Result<Vec<LocalityRecord>> {
        let table_sel = create_selector(RESULT_TABLE)?;
        let row_sel = create_selector(TABLE_ROWS)?;
        let name_sel = create_selector(NAME_CELL)?;
        let range_sel = create_selector(RANGE_CELL)?;

        let index = if continuation { 0 } else { 1 };
        let Some(table) = self.document.select(&table_sel).nth(index) else {
            return Ok(acc);
        };

        for row in table.select(&row_sel) {
            let locality_name = cell_text(row, &name_sel);
            if locality_name.is_empty() {
                continue;
            }
            let cep_range = cell_text(row, &range_sel);
            acc.push(LocalityRecord {
                locality_name,
                cep_range,
            });
        }

        Ok(acc)
    }

    /// Whether the page offers a "next page" form
    pub fn has_next_page(&self) -> Result<bool> {
        let next_sel = create_selector(NEXT_FORM)?;
        Ok(self.document.select(&next_sel).next().is_some())
    }
}

/// Text of the first matching cell with surrounding whitespace removed.
///
/// Whitespace around a cell comes from the page markup, not the listing, so
/// a name that is blank after trimming counts as empty.
fn cell_text(row: ElementRef<'_>, selector: &Selector) -> String {
    row.select(selector)
        .next()
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|e| Error::Parse(format!("bad selector {sel_str}: {e:?}")))
}
