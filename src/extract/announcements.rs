//! Announcement lists: one link per row, with a printed date.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::normalize::{clean_text, parse_date};
use super::table::{find_table, table_rows, Anchor};
use super::{ExtractionWarning, PageRecords};
use crate::error_handling::WarningKind;
use crate::models::{Announcement, Provenance};
use crate::utils::{element_text, parse_selector_unsafe};

static LINK: LazyLock<Selector> = LazyLock::new(|| parse_selector_unsafe("a", "announcement link"));
static DATE: LazyLock<Selector> = LazyLock::new(|| parse_selector_unsafe("span", "announcement date"));

/// Rule for a table whose rows each hold one link.
#[derive(Debug, Clone)]
pub struct LinkRule {
    pub anchors: Vec<Anchor>,
    /// Maximum number of rows returned (None = all)
    pub limit: Option<usize>,
}

impl Default for LinkRule {
    fn default() -> Self {
        Self {
            anchors: vec![
                Anchor::selector("[id$='Duyurular1_gridDuyuru']"),
                Anchor::selector("[id$='gridDuyuru']"),
                Anchor::table_containing("duyuru"),
            ],
            limit: None,
        }
    }
}

impl LinkRule {
    pub fn find<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        find_table(document, &self.anchors)
    }

    /// Reads announcements from the located table.
    ///
    /// Rows without a link are layout rows and are skipped silently; a link
    /// without a title is a malformed row.
    pub fn build(&self, table: ElementRef<'_>) -> (PageRecords, Vec<ExtractionWarning>) {
        let mut announcements = Vec::new();
        let mut warnings = Vec::new();

        for (index, row) in table_rows(table).into_iter().enumerate() {
            if self.limit.is_some_and(|limit| announcements.len() >= limit) {
                break;
            }
            let Some(link) = row.select(&LINK).next() else {
                continue;
            };
            let title = clean_text(&element_text(link));
            if title.is_empty() {
                warnings.push(ExtractionWarning::new(
                    WarningKind::MalformedRow,
                    Some(index),
                    Some("title"),
                    &clean_text(&element_text(row)),
                ));
                continue;
            }

            let href = link
                .value()
                .attr("href")
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string);
            let id = href
                .as_deref()
                .and_then(id_from_href)
                .or_else(|| link.value().attr("id").map(str::to_string));

            let date_text = row
                .select(&DATE)
                .map(|span| clean_text(&element_text(span)))
                .find(|text| !text.is_empty());
            let date = date_text.as_deref().and_then(parse_date);
            let partial = match (&date_text, date) {
                (None, _) => {
                    warnings.push(ExtractionWarning::new(WarningKind::MissingField, Some(index), Some("date"), &title));
                    true
                }
                (Some(text), None) => {
                    warnings.push(ExtractionWarning::new(WarningKind::UnparseableValue, Some(index), Some("date"), text));
                    true
                }
                (Some(_), Some(_)) => false,
            };

            announcements.push(Announcement {
                id,
                title,
                href,
                date,
                date_text,
                provenance: Provenance::from_missing(partial),
            });
        }
        (PageRecords::Announcements(announcements), warnings)
    }
}

/// The `id` query parameter of a detail link such as `DuyuruDetay.aspx?id=101`.
fn id_from_href(href: &str) -> Option<String> {
    let (_, query) = href.split_once('?')?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key.eq_ignore_ascii_case("id"))
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "<table id='x_Duyurular1_gridDuyuru'>
        <tr><th>Duyurular</th></tr>
        <tr><td><a id='l1' href='DuyuruDetay.aspx?id=7'>Kayıt yenileme</a> <span>01.02.2025</span></td></tr>
        <tr><td><a id='l2' href='Detay.aspx'>Burs sonuçları</a></td></tr>
        <tr><td><a id='l3' href='#'> </a><span>03.02.2025</span></td></tr>
      </table>";

    fn build(rule: &LinkRule, html: &str) -> (Vec<Announcement>, Vec<ExtractionWarning>) {
        let document = Html::parse_document(html);
        let table = rule.find(&document).expect("table");
        match rule.build(table) {
            (PageRecords::Announcements(list), warnings) => (list, warnings),
            _ => panic!("announcements"),
        }
    }

    #[test]
    fn test_reads_links_and_dates() {
        let (list, warnings) = build(&LinkRule::default(), LIST);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id.as_deref(), Some("7"));
        assert_eq!(list[0].date, chrono::NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(list[1].id.as_deref(), Some("l2"));
        assert!(list[1].provenance.is_partial());
        let kinds: Vec<_> = warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::MissingField, WarningKind::MalformedRow]);
    }

    #[test]
    fn test_limit_caps_results() {
        let rule = LinkRule { limit: Some(1), ..Default::default() };
        let (list, warnings) = build(&rule, LIST);
        assert_eq!(list.len(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_falls_back_to_table_mentioning_announcements() {
        let html = "<div><table><tr><td>Menü</td></tr></table>
            <table class='liste'><tr><th>Son Duyurular</th></tr>
            <tr><td><a href='d.aspx?id=3'>Sınav</a><span>2025-01-10</span></td></tr></table></div>";
        let (list, _) = build(&LinkRule::default(), html);
        assert_eq!(list[0].title, "Sınav");
        assert_eq!(list[0].id.as_deref(), Some("3"));
    }
}
