//! Pages read without a field map.
//!
//! Secondary pages (weekly schedule, messages, registration, thesis, ...) vary
//! between deployments, so they are returned as every data table on the page
//! with header-keyed rows. The student home page is scanned for links to the
//! online-education platforms instead.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use log::debug;
use scraper::{ElementRef, Html, Selector};

use super::normalize::{clean_text, fold_text};
use super::table::{row_cells, table_rows};
use super::{ExtractionWarning, PageRecords};
use crate::models::{DataTable, NavLink};
use crate::utils::{element_text, parse_selector_unsafe};

static TABLE: LazyLock<Selector> = LazyLock::new(|| parse_selector_unsafe("table", "data table"));
static CELL: LazyLock<Selector> = LazyLock::new(|| parse_selector_unsafe("td, th", "table cell"));
static LINK: LazyLock<Selector> = LazyLock::new(|| parse_selector_unsafe("a[href]", "page link"));

/// Every data table on a page.
#[derive(Debug, Clone)]
pub struct TablesRule {
    /// A row is kept only if one of its cells has at least this many characters
    pub min_cell_chars: usize,
}

impl Default for TablesRule {
    fn default() -> Self {
        Self { min_cell_chars: 1 }
    }
}

impl TablesRule {
    /// Rule for the message list, where short status cells pad empty rows.
    pub fn messages() -> Self {
        Self { min_cell_chars: 3 }
    }

    /// Reads every table that holds data rows.
    ///
    /// Layout tables (a cell wrapping another table) are skipped; the inner
    /// tables are read on their own. A page without tables yields no records.
    pub fn build(&self, document: &Html) -> (PageRecords, Vec<ExtractionWarning>) {
        let tables: Vec<DataTable> = document
            .select(&TABLE)
            .filter(|table| !is_layout_table(*table))
            .filter_map(|table| self.read(table))
            .collect();
        debug!("Read {} data tables", tables.len());
        (PageRecords::Tables(tables), Vec::new())
    }

    fn read(&self, table: ElementRef<'_>) -> Option<DataTable> {
        let mut rows = table_rows(table).into_iter().map(row_cells).peekable();
        let headers = if rows.peek().is_some_and(|first| first.all_headers) {
            rows.next().map(|first| first.texts).unwrap_or_default()
        } else {
            Vec::new()
        };

        let data: Vec<BTreeMap<String, String>> = rows
            .filter(|cells| !cells.all_headers)
            .filter(|cells| cells.texts.iter().any(|t| t.chars().count() >= self.min_cell_chars))
            .map(|cells| keyed_row(&headers, cells.texts))
            .collect();
        if data.is_empty() {
            return None;
        }
        Some(DataTable {
            id: table.value().attr("id").map(str::to_string),
            headers,
            rows: data,
        })
    }
}

fn is_layout_table(table: ElementRef<'_>) -> bool {
    table_rows(table)
        .into_iter()
        .flat_map(|row| row.select(&CELL).collect::<Vec<_>>())
        .any(|cell| cell.select(&TABLE).next().is_some())
}

fn keyed_row(headers: &[String], texts: Vec<String>) -> BTreeMap<String, String> {
    let mut row: BTreeMap<String, String> = BTreeMap::new();
    for (i, text) in texts.into_iter().enumerate() {
        if text.is_empty() {
            continue;
        }
        let key = headers
            .get(i)
            .filter(|h| !h.is_empty() && !row.contains_key(h.as_str()))
            .cloned()
            .unwrap_or_else(|| format!("col_{i}"));
        row.insert(key, text);
    }
    row
}

/// Links whose text or target mentions one of the keywords.
#[derive(Debug, Clone)]
pub struct KeywordLinkRule {
    /// Matched against folded (lowercase, ASCII) link text and href
    pub keywords: Vec<String>,
}

impl Default for KeywordLinkRule {
    /// Distance-learning platforms linked from the student menu.
    fn default() -> Self {
        Self::new(&["uzaktan", "moodle", "lms", "uzem", "canvas", "online egitim", "ogrenme"])
    }
}

impl KeywordLinkRule {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| fold_text(k)).collect(),
        }
    }

    /// Matching links in document order, each text/target pair once.
    pub fn build(&self, document: &Html) -> (PageRecords, Vec<ExtractionWarning>) {
        let mut seen = BTreeSet::new();
        let links: Vec<NavLink> = document
            .select(&LINK)
            .filter_map(|link| {
                let text = clean_text(&element_text(link));
                let href = link.value().attr("href")?.trim();
                if text.is_empty() || href.is_empty() || href == "#" {
                    return None;
                }
                let haystack = format!("{} {}", fold_text(&text), href.to_ascii_lowercase());
                self.keywords
                    .iter()
                    .any(|k| haystack.contains(k.as_str()))
                    .then(|| NavLink { text, href: href.to_string() })
            })
            .filter(|link| seen.insert((link.text.clone(), link.href.clone())))
            .collect();
        (PageRecords::Links(links), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(rule: &TablesRule, html: &str) -> Vec<DataTable> {
        match rule.build(&Html::parse_document(html)) {
            (PageRecords::Tables(tables), warnings) => {
                assert!(warnings.is_empty());
                tables
            }
            _ => panic!("tables"),
        }
    }

    fn links(rule: &KeywordLinkRule, html: &str) -> Vec<NavLink> {
        match rule.build(&Html::parse_document(html)) {
            (PageRecords::Links(links), _) => links,
            _ => panic!("links"),
        }
    }

    #[test]
    fn test_rows_keyed_by_header() {
        let html = "<table id='gridKayit'>
            <tr><th>Ders Kodu</th><th>Durum</th><th></th></tr>
            <tr><td>BIL301</td><td>Onaylandı</td><td>x</td></tr>
            <tr><td>&nbsp;</td><td></td><td></td></tr>
            <tr><td>MAT201</td><td>Beklemede</td></tr>
          </table>";
        let found = tables(&TablesRule::default(), html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_deref(), Some("gridKayit"));
        assert_eq!(found[0].headers, vec!["Ders Kodu", "Durum", ""]);
        assert_eq!(found[0].rows.len(), 2);
        assert_eq!(found[0].rows[0]["Durum"], "Onaylandı");
        assert_eq!(found[0].rows[0]["col_2"], "x");
        assert_eq!(found[0].column("Ders Kodu"), vec!["BIL301", "MAT201"]);
    }

    #[test]
    fn test_headerless_tables_use_positions() {
        let found = tables(&TablesRule::default(), "<table><tr><td>a</td><td>b</td></tr></table>");
        assert!(found[0].headers.is_empty());
        assert_eq!(found[0].rows[0]["col_0"], "a");
        assert_eq!(found[0].rows[0]["col_1"], "b");
    }

    #[test]
    fn test_layout_and_empty_tables_skipped() {
        let html = "<table id='layout'><tr><td>
              <table id='inner'><tr><th>Başlık</th></tr><tr><td>Tez önerisi</td></tr></table>
            </td></tr></table>
            <table id='empty'><tr><th>Başlık</th></tr></table>";
        let found = tables(&TablesRule::default(), html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_deref(), Some("inner"));
    }

    #[test]
    fn test_message_rule_drops_short_rows() {
        let html = "<table><tr><th>Konu</th><th>Okundu</th></tr>
            <tr><td>Danışman görüşmesi</td><td>E</td></tr>
            <tr><td>-</td><td>H</td></tr></table>";
        assert_eq!(tables(&TablesRule::messages(), html)[0].rows.len(), 1);
        assert_eq!(tables(&TablesRule::default(), html)[0].rows.len(), 2);
    }

    #[test]
    fn test_no_tables_is_empty_not_an_error() {
        assert!(tables(&TablesRule::default(), "<p>Kayıt bulunamadı</p>").is_empty());
    }

    #[test]
    fn test_keyword_links_match_text_and_href() {
        let html = "<ul>
            <li><a href='https://uzem.example.edu.tr'>UZAKTAN EĞİTİM</a></li>
            <li><a href='https://lms.example.edu.tr/login'>Ders Platformu</a></li>
            <li><a href='/Birimler/Ogrenci/Transkript.aspx'>Transkript</a></li>
            <li><a href='#'>Moodle</a></li>
            <li><a href='https://uzem.example.edu.tr'>UZAKTAN EĞİTİM</a></li>
          </ul>";
        let found = links(&KeywordLinkRule::default(), html);
        let texts: Vec<_> = found.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["UZAKTAN EĞİTİM", "Ders Platformu"]);
    }

    #[test]
    fn test_custom_keywords_are_folded() {
        let rule = KeywordLinkRule::new(&["Kütüphane"]);
        let found = links(&rule, "<a href='/kutuphane'>KÜTÜPHANE</a><a href='/x'>Diğer</a>");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].href, "/kutuphane");
    }
}
