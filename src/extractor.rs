// Table extractor - scrapes (name, market cap USD) rows out of the ranking page

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::error::EtlError;
use crate::logger::ProgressLog;
use crate::model::ExtractedBank;

// ============================================================================
// TABLE SELECTION
// ============================================================================

/// Which table on the page holds the ranking
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableSelector {
    /// The first table body on the page
    #[default]
    First,
    /// The first table after a heading whose text contains this string (case-insensitive)
    #[serde(rename = "heading")]
    ByHeading(String),
}

fn selector(css: &str) -> Result<Selector, EtlError> {
    Selector::parse(css).map_err(|e| EtlError::Parse(format!("bad selector '{}': {:?}", css, e)))
}

fn find_table_body<'a>(
    document: &'a Html,
    table_selector: &TableSelector,
) -> Result<ElementRef<'a>, EtlError> {
    let tbody = selector("tbody")?;

    match table_selector {
        TableSelector::First => document
            .select(&tbody)
            .next()
            .ok_or_else(|| EtlError::Parse("no table found".to_string())),

        TableSelector::ByHeading(heading) => {
            let wanted = heading.to_lowercase();
            let headings_and_tables = selector("h1, h2, h3, h4, h5, h6, table")?;

            // Document order: remember the heading, take the next table after it
            let mut heading_seen = false;
            for element in document.select(&headings_and_tables) {
                if element.value().name() == "table" {
                    if heading_seen {
                        return element.select(&tbody).next().ok_or_else(|| {
                            EtlError::Parse(format!("table under '{}' has no body", heading))
                        });
                    }
                } else if text_of(element).to_lowercase().contains(&wanted) {
                    heading_seen = true;
                }
            }

            Err(EtlError::Parse(format!("no table found under heading '{}'", heading)))
        }
    }
}

// ============================================================================
// CELL PARSING
// ============================================================================

/// Trimmed text content of an element, text nodes joined by single spaces
fn text_of(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == tag)
}

/// Bank name from the name cell
///
/// The cell usually holds a flag link followed by the bank link; with two or
/// more links the second link's `title` is the name. Otherwise it's the text.
pub fn bank_name(cell: ElementRef) -> Result<String, String> {
    let anchor = selector("a").map_err(|e| e.to_string())?;
    let links: Vec<ElementRef> = cell.select(&anchor).collect();

    let name = if links.len() >= 2 {
        links[1]
            .value()
            .attr("title")
            .ok_or_else(|| "bank link has no title".to_string())?
            .trim()
            .to_string()
    } else {
        text_of(cell)
    };

    if name.is_empty() {
        return Err("empty bank name".to_string());
    }
    Ok(name)
}

fn is_currency_symbol(c: char) -> bool {
    matches!(c, '$' | '£' | '€' | '¥' | '₹')
}

/// Drop bracketed footnote markers such as "[1]" or "[a]"
fn strip_footnotes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Market cap (billions) from cell text like "$1,234.56" or "432.92\n"
pub fn parse_market_cap(raw: &str) -> Result<f64, String> {
    let without_notes = strip_footnotes(raw);

    // Trailing junk: footnote markers, stray symbols, whitespace
    let trimmed = without_notes
        .trim_end_matches(|c: char| !c.is_ascii_digit())
        .trim_start_matches(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'));

    let cleaned: String = trimmed
        .chars()
        .filter(|&c| c != ',' && !c.is_whitespace() && !is_currency_symbol(c))
        .collect();

    if cleaned.is_empty() {
        return Err(format!("no market cap in '{}'", raw.trim()));
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(format!("cannot parse market cap '{}'", raw.trim())),
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Extract the ranking table from `html`
///
/// Rows without data cells are skipped silently. Rows that fail to parse are
/// logged and skipped. Only an unusable page structure fails the whole call.
pub fn extract(
    html: &str,
    table_selector: &TableSelector,
    log: &ProgressLog,
) -> Result<Vec<ExtractedBank>, EtlError> {
    log.log_progress("Data extraction started")?;

    match scrape(html, table_selector, log) {
        Ok(banks) => {
            log.log_progress(&format!("Data extraction completed ({} records)", banks.len()))?;
            Ok(banks)
        }
        Err(e) => Err(log.failed("Data extraction", e)),
    }
}

fn scrape(
    html: &str,
    table_selector: &TableSelector,
    log: &ProgressLog,
) -> Result<Vec<ExtractedBank>, EtlError> {
    let document = Html::parse_document(html);
    let body = find_table_body(&document, table_selector)?;

    let mut banks = Vec::new();

    for (index, row) in child_elements(body, "tr").enumerate() {
        let cells: Vec<ElementRef> = child_elements(row, "td").collect();

        // Header and separator rows
        if cells.is_empty() {
            continue;
        }

        match parse_row(&cells) {
            Ok(bank) => banks.push(bank),
            Err(reason) => {
                let err = EtlError::RowParse { row: index + 1, reason };
                log.log_failure(&format!("Row parsing error: {}", err))?;
            }
        }
    }

    Ok(banks)
}

fn parse_row(cells: &[ElementRef]) -> Result<ExtractedBank, String> {
    let name_cell = cells.get(1).ok_or("missing name cell")?;
    let cap_cell = cells.get(2).ok_or("missing market cap cell")?;

    Ok(ExtractedBank {
        name: bank_name(*name_cell)?,
        mc_usd_billion: parse_market_cap(&text_of(*cap_cell))?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(rank: u32, name_cell: &str, cap: &str) -> String {
        format!("<tr><td>{}</td><td>{}</td><td>{}</td></tr>", rank, name_cell, cap)
    }

    fn page(rows: &[String]) -> String {
        format!(
            "<html><body><table><tbody>\
             <tr><th>Rank</th><th>Bank name</th><th>Market cap (US$ billion)</th></tr>\
             {}</tbody></table></body></html>",
            rows.join("")
        )
    }

    fn flagged(name: &str) -> String {
        format!(
            r#"<span class="flagicon"><a href="/wiki/USA" title="United States">US</a></span> <a href="/wiki/{0}" title="{0}">{0}</a>"#,
            name
        )
    }

    fn log_in(dir: &tempfile::TempDir) -> ProgressLog {
        ProgressLog::new(dir.path().join("log.txt"))
    }

    #[test]
    fn test_extract_takes_title_of_second_link() {
        let dir = tempdir().unwrap();
        let html = page(&[
            row(1, &flagged("JPMorgan Chase"), "432.92\n"),
            row(2, &flagged("Bank of America"), "231.52"),
        ]);

        let banks = extract(&html, &TableSelector::First, &log_in(&dir)).unwrap();

        assert_eq!(banks.len(), 2);
        assert_eq!(banks[0].name, "JPMorgan Chase");
        assert_eq!(banks[0].mc_usd_billion, 432.92);
        assert_eq!(banks[1].name, "Bank of America");
    }

    #[test]
    fn test_extract_falls_back_to_cell_text() {
        let dir = tempdir().unwrap();
        let html = page(&[row(1, "  Plain Bank  ", "100.0")]);

        let banks = extract(&html, &TableSelector::First, &log_in(&dir)).unwrap();

        assert_eq!(banks[0].name, "Plain Bank");
    }

    #[test]
    fn test_extract_preserves_row_order() {
        let dir = tempdir().unwrap();
        let names = ["A", "B", "C", "D", "E"];
        let rows: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, n)| row(i as u32 + 1, &flagged(n), &format!("{}", 100 - i * 10)))
            .collect();

        let banks = extract(&page(&rows), &TableSelector::First, &log_in(&dir)).unwrap();

        let got: Vec<&str> = banks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(got, names);
    }

    #[test]
    fn test_bad_row_is_logged_and_skipped() {
        let dir = tempdir().unwrap();
        let log = log_in(&dir);
        let html = page(&[
            row(1, &flagged("Good Bank"), "120.5"),
            row(2, &flagged("Broken Bank"), "n/a"),
            row(3, &flagged("Other Bank"), "99"),
        ]);

        let banks = extract(&html, &TableSelector::First, &log).unwrap();

        assert_eq!(banks.len(), 2);
        assert_eq!(banks[1].name, "Other Bank");
        let entries = log.read_entries().unwrap();
        assert!(entries
            .iter()
            .any(|e| e.message.starts_with("Row parsing error: row 3")));
        assert!(entries.last().unwrap().message.starts_with("Data extraction completed"));
    }

    #[test]
    fn test_short_row_is_skipped() {
        let dir = tempdir().unwrap();
        let html = page(&["<tr><td>1</td><td>Lonely</td></tr>".to_string()]);

        let banks = extract(&html, &TableSelector::First, &log_in(&dir)).unwrap();

        assert!(banks.is_empty());
    }

    #[test]
    fn test_no_table_is_parse_error() {
        let dir = tempdir().unwrap();
        let log = log_in(&dir);

        let html = "<html><body><p>nothing</p></body></html>";

        let result = extract(html, &TableSelector::First, &log);

        assert!(matches!(result, Err(EtlError::Parse(ref m)) if m == "no table found"));
        let entries = log.read_entries().unwrap();
        assert_eq!(
            entries.last().unwrap().message,
            "Data extraction failed: parse error: no table found"
        );
    }

    #[test]
    fn test_first_selector_uses_first_table() {
        let dir = tempdir().unwrap();
        let html = format!(
            "<table><tbody>{}</tbody></table><table><tbody>{}</tbody></table>",
            row(1, "First Table Bank", "10"),
            row(1, "Second Table Bank", "20"),
        );

        let banks = extract(&html, &TableSelector::First, &log_in(&dir)).unwrap();

        assert_eq!(banks[0].name, "First Table Bank");
    }

    #[test]
    fn test_heading_selector_finds_table_after_heading() {
        let dir = tempdir().unwrap();
        let html = format!(
            "<h2>By total assets</h2><table><tbody>{}</tbody></table>\
             <h2><span class=\"mw-headline\">By market capitalization</span></h2>\
             <table><tbody>{}</tbody></table>",
            row(1, "Asset Bank", "10"),
            row(1, "Cap Bank", "20"),
        );
        let selector = TableSelector::ByHeading("by market capitalization".to_string());

        let banks = extract(&html, &selector, &log_in(&dir)).unwrap();

        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].name, "Cap Bank");
    }

    #[test]
    fn test_heading_selector_without_match_fails() {
        let dir = tempdir().unwrap();
        let html = page(&[row(1, "Bank", "10")]);
        let selector = TableSelector::ByHeading("By market capitalization".to_string());

        let result = extract(&html, &selector, &log_in(&dir));

        assert!(matches!(result, Err(EtlError::Parse(_))));
    }

    #[test]
    fn test_parse_market_cap_cleans_text() {
        assert_eq!(parse_market_cap("432.92\n").unwrap(), 432.92);
        assert_eq!(parse_market_cap("$1,234.5").unwrap(), 1234.5);
        assert_eq!(parse_market_cap("180.00*").unwrap(), 180.0);
        assert_eq!(parse_market_cap("205.9[3]").unwrap(), 205.9);
        assert_eq!(parse_market_cap("US$ 75").unwrap(), 75.0);
    }

    #[test]
    fn test_parse_market_cap_rejects_garbage() {
        assert!(parse_market_cap("").is_err());
        assert!(parse_market_cap("n/a").is_err());
        assert!(parse_market_cap("1.2.3").is_err());
    }

    #[test]
    fn test_bank_name_requires_title_on_second_link() {
        let html = Html::parse_fragment(
            r#"<table><tr><td><a href="/a">flag</a><a href="/b">No title</a></td></tr></table>"#,
        );
        let td = Selector::parse("td").unwrap();
        let cell = html.select(&td).next().unwrap();

        assert!(bank_name(cell).is_err());
    }

    #[test]
    fn test_heading_selector_table_without_body_fails() {
        let dir = tempdir().unwrap();
        // A table with no rows gets no implicit tbody
        let html = "<h2>By market capitalization</h2><table></table>";
        let selector = TableSelector::ByHeading("By market capitalization".to_string());

        let result = extract(html, &selector, &log_in(&dir));

        assert!(matches!(result, Err(EtlError::Parse(ref m)) if m.contains("has no body")));
    }

    #[test]
    fn test_empty_name_cell_row_is_skipped() {
        let dir = tempdir().unwrap();
        let log = log_in(&dir);
        let html = page(&[row(1, "   ", "120.5"), row(2, &flagged("Named Bank"), "99")]);

        let banks = extract(&html, &TableSelector::First, &log).unwrap();

        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].name, "Named Bank");
        let entries = log.read_entries().unwrap();
        assert!(entries
            .iter()
            .any(|e| e.message == "Row parsing error: row 2: empty bank name"));
    }
}
