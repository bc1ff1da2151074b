//! CSS selectors of the remote lookup page

/// Region drop-down of the search form
pub const REGION_SELECT: &str = "#Geral select";

/// Search submit button
pub const SEARCH_BUTTON: &str = r#"#Geral input[value="Buscar"]"#;

/// Panel wrapping the form, the result tables and the paging controls
pub const CONTENT_PANEL: &str = r#"div[class*="ctrlcontent"]"#;

/// Tables sharing the result class; which one holds the results depends on the page
pub const RESULT_TABLE: &str = r#"table[class*="tmptabela"]"#;

/// Rows of a result table
pub const TABLE_ROWS: &str = "tbody tr";

/// Locality name cell of a row
pub const NAME_CELL: &str = "td:nth-child(1)";

/// CEP range cell of a row
pub const RANGE_CELL: &str = "td:nth-child(2)";

/// Form present only while another results page exists
pub const NEXT_FORM: &str = r#"form[name="Proxima"]"#;

/// Clickable "next page" control
pub const NEXT_BUTTON: &str = r#"div[class*="ctrlcontent"] div[style="float:left"]:nth-of-type(2)"#;

/// Option of the region drop-down for one code
pub fn region_option(code: &str) -> String {
    format!(r#"{REGION_SELECT} option[value="{code}"]"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_option() {
        assert_eq!(region_option("AC"), r#"#Geral select option[value="AC"]"#);
    }
}
