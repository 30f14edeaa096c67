//! Declarative table extraction.
//!
//! A `TableRule` names how to find a table (anchors, tried in order) and which
//! columns it carries (`FieldSpec`: header aliases, positional fallback and how
//! much the field matters). `read_table` turns the table into `TableRow`s keyed
//! by field name; page-specific builders then read typed values through a
//! `RowReader`, which records anything missing or unparseable.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};

use super::normalize::{
    clean_text, fold_text, header_key, parse_date, parse_decimal, parse_number, truncate_chars,
};
use super::ExtractionWarning;
use crate::error_handling::WarningKind;
use crate::models::Provenance;
use crate::utils::{element_text, parse_selector_unsafe, parse_selector_with_fallback};

static TABLE: LazyLock<Selector> = LazyLock::new(|| parse_selector_unsafe("table", "table lookup"));

/// How much a field matters to its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Without it the row is skipped (`MalformedRow`)
    Key,
    /// Without it the record is `Partial` (`MissingField`)
    Expected,
    /// May be absent without consequence
    Optional,
}

/// One column of a table rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: &'static str,
    /// Header labels, already folded (lowercase, ASCII letters), most specific first
    pub headers: &'static [&'static str],
    /// Column position used when the table has no recognisable header row
    pub index: Option<usize>,
    pub requirement: Requirement,
}

impl FieldSpec {
    pub const fn key(field: &'static str, headers: &'static [&'static str], index: Option<usize>) -> Self {
        Self { field, headers, index, requirement: Requirement::Key }
    }

    pub const fn expected(field: &'static str, headers: &'static [&'static str], index: Option<usize>) -> Self {
        Self { field, headers, index, requirement: Requirement::Expected }
    }

    pub const fn optional(field: &'static str, headers: &'static [&'static str], index: Option<usize>) -> Self {
        Self { field, headers, index, requirement: Requirement::Optional }
    }
}

/// Where a table (or other region) is expected to be.
#[derive(Debug, Clone)]
pub enum Anchor {
    /// A CSS selector; if it matches a non-table element, the first table inside it is used
    Selector(Selector),
    /// The innermost table whose text contains this (folded) fragment
    TableContaining(String),
}

impl Anchor {
    pub fn selector(css: &str) -> Self {
        Anchor::Selector(parse_selector_with_fallback(css, "extraction anchor"))
    }

    pub fn table_containing(text: &str) -> Self {
        Anchor::TableContaining(fold_text(text))
    }

    /// The element this anchor designates, if present.
    pub fn locate<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        match self {
            Anchor::Selector(selector) => document.select(selector).next(),
            Anchor::TableContaining(fragment) => innermost_table_containing(document, fragment),
        }
    }
}

fn table_text_contains(table: ElementRef<'_>, fragment: &str) -> bool {
    fold_text(&element_text(table)).contains(fragment)
}

fn innermost_table_containing<'a>(document: &'a Html, fragment: &str) -> Option<ElementRef<'a>> {
    document.select(&TABLE).find(|table| {
        table_text_contains(*table, fragment)
            && !table
                .select(&TABLE)
                .any(|inner| inner.id() != table.id() && table_text_contains(inner, fragment))
    })
}

/// The table designated by the first anchor present: the anchored element
/// itself, or the first table inside it.
pub fn find_table<'a>(document: &'a Html, anchors: &[Anchor]) -> Option<ElementRef<'a>> {
    anchors.iter().find_map(|anchor| {
        let element = anchor.locate(document)?;
        if element.value().name() == "table" {
            Some(element)
        } else {
            element.select(&TABLE).next()
        }
    })
}

/// A table-shaped region of a page.
#[derive(Debug, Clone)]
pub struct TableRule {
    pub anchors: Vec<Anchor>,
    pub columns: Vec<FieldSpec>,
    /// Single-cell rows label the rows below them (e.g. a term heading)
    pub section_rows: bool,
}

impl TableRule {
    pub fn find<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        find_table(document, &self.anchors)
    }

    fn column(&self, field: &str) -> Option<&FieldSpec> {
        self.columns.iter().find(|c| c.field == field)
    }
}

/// A data row, with non-empty cell text keyed by field.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Position among the table's rows (header included)
    pub index: usize,
    /// Label of the last section row above this one
    pub section: Option<String>,
    pub values: BTreeMap<&'static str, String>,
    /// Cell texts joined, for warnings
    pub raw: String,
}

/// Rows read from a table, with the problems found on the way.
#[derive(Debug, Clone, Default)]
pub struct TableRows {
    pub rows: Vec<TableRow>,
    pub warnings: Vec<ExtractionWarning>,
    /// Fields whose column could not be located
    pub missing_columns: Vec<&'static str>,
}

/// Direct rows of a table, ignoring rows of nested tables.
pub(crate) fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| c.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

pub(crate) struct Cells {
    pub(crate) texts: Vec<String>,
    pub(crate) all_headers: bool,
}

pub(crate) fn row_cells(row: ElementRef<'_>) -> Cells {
    let cells: Vec<ElementRef<'_>> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect();
    Cells {
        all_headers: !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th"),
        texts: cells.into_iter().map(|c| clean_text(&element_text(c))).collect(),
    }
}

/// Maps fields to column positions using the header row.
///
/// Exact label matches are claimed first, then labels containing an alias.
fn resolve_columns(header: &[String], columns: &[FieldSpec]) -> BTreeMap<&'static str, usize> {
    let keys: Vec<String> = header.iter().map(|h| header_key(h)).collect();
    let mut resolved: BTreeMap<&'static str, usize> = BTreeMap::new();

    for exact in [true, false] {
        for spec in columns {
            if resolved.contains_key(spec.field) {
                continue;
            }
            let position = spec.headers.iter().find_map(|alias| {
                keys.iter().enumerate().position(|(i, key)| {
                    let claimed = resolved.values().any(|&p| p == i);
                    let hit = if exact { key.as_str() == *alias } else { key.contains(*alias) };
                    !claimed && !key.is_empty() && hit
                })
            });
            if let Some(position) = position {
                resolved.insert(spec.field, position);
            }
        }
    }
    resolved
}

fn positional_columns(columns: &[FieldSpec]) -> BTreeMap<&'static str, usize> {
    columns
        .iter()
        .filter_map(|spec| spec.index.map(|i| (spec.field, i)))
        .collect()
}

fn looks_like_header(texts: &[String], columns: &[FieldSpec]) -> bool {
    texts.iter().any(|text| {
        let key = header_key(text);
        columns.iter().any(|spec| spec.headers.contains(&key.as_str()))
    })
}

/// Reads a located table according to `rule`.
///
/// All-empty rows, repeated header rows and single-cell decoration rows are
/// skipped; rows without a `Key` field are skipped with a `MalformedRow`
/// warning.
pub fn read_table(table: ElementRef<'_>, rule: &TableRule) -> TableRows {
    let rows: Vec<Cells> = table_rows(table).into_iter().map(row_cells).collect();
    let header_index = rows
        .iter()
        .position(|r| r.all_headers)
        .or_else(|| rows.first().filter(|r| looks_like_header(&r.texts, &rule.columns)).map(|_| 0));

    let mut positions = header_index
        .map(|i| resolve_columns(&rows[i].texts, &rule.columns))
        .unwrap_or_default();
    if positions.is_empty() {
        debug!("No header labels recognised, using column positions");
        positions = positional_columns(&rule.columns);
    }

    let mut out = TableRows::default();
    for spec in &rule.columns {
        if !positions.contains_key(spec.field) && spec.requirement != Requirement::Optional {
            out.missing_columns.push(spec.field);
            out.warnings.push(ExtractionWarning::new(
                WarningKind::MissingField,
                None,
                Some(spec.field),
                "column not found",
            ));
        }
    }

    let header_texts = header_index.map(|i| rows[i].texts.clone());
    let mut section: Option<String> = None;
    for (index, cells) in rows.into_iter().enumerate() {
        if Some(index) == header_index || cells.texts.iter().all(String::is_empty) {
            continue;
        }
        if header_texts.as_ref() == Some(&cells.texts) {
            continue;
        }
        if cells.texts.len() == 1 && rule.columns.len() > 1 {
            if rule.section_rows {
                section = Some(cells.texts[0].clone());
            }
            continue;
        }

        let raw = cells.texts.join(" | ");
        let values: BTreeMap<&'static str, String> = positions
            .iter()
            .filter_map(|(&field, &i)| {
                cells
                    .texts
                    .get(i)
                    .filter(|text| !text.is_empty())
                    .map(|text| (field, text.clone()))
            })
            .collect();

        let missing_key = rule
            .columns
            .iter()
            .find(|spec| spec.requirement == Requirement::Key && !values.contains_key(spec.field));
        if let Some(spec) = missing_key {
            warn!("Skipping row {}: no {} ({})", index, spec.field, truncate_chars(&raw, 80));
            out.warnings.push(ExtractionWarning::new(
                WarningKind::MalformedRow,
                Some(index),
                Some(spec.field),
                &raw,
            ));
            continue;
        }

        out.rows.push(TableRow {
            index,
            section: section.clone(),
            values,
            raw,
        });
    }
    out
}

/// Typed access to one row's fields, collecting warnings as it goes.
pub struct RowReader<'r> {
    row: &'r TableRow,
    rule: &'r TableRule,
    missing_columns: &'r [&'static str],
    warnings: Vec<ExtractionWarning>,
    partial: bool,
}

impl<'r> RowReader<'r> {
    pub fn new(row: &'r TableRow, rule: &'r TableRule, missing_columns: &'r [&'static str]) -> Self {
        Self {
            row,
            rule,
            missing_columns,
            warnings: Vec::new(),
            partial: false,
        }
    }

    pub fn section(&self) -> Option<String> {
        self.row.section.clone()
    }

    /// Cell text of a field; an absent `Expected` field marks the record partial.
    pub fn text(&mut self, field: &'static str) -> Option<String> {
        let value = self.row.values.get(field).cloned();
        if value.is_none() {
            self.note_missing(field);
        }
        value
    }

    pub fn number(&mut self, field: &'static str) -> Option<f64> {
        let text = self.text(field)?;
        let value = parse_number(&text);
        if value.is_none() {
            self.note_unparseable(field, &text);
        }
        value
    }

    /// Number where a lone separator is always decimal (grade points, averages).
    pub fn decimal(&mut self, field: &'static str) -> Option<f64> {
        let text = self.text(field)?;
        let value = parse_decimal(&text);
        if value.is_none() {
            self.note_unparseable(field, &text);
        }
        value
    }

    pub fn date(&mut self, field: &'static str) -> Option<NaiveDate> {
        let text = self.text(field)?;
        let value = parse_date(&text);
        if value.is_none() {
            self.note_unparseable(field, &text);
        }
        value
    }

    /// Records a value the builder could not interpret.
    pub fn note_unparseable(&mut self, field: &'static str, raw: &str) {
        self.partial = true;
        self.warnings.push(ExtractionWarning::new(
            WarningKind::UnparseableValue,
            Some(self.row.index),
            Some(field),
            raw,
        ));
    }

    fn note_missing(&mut self, field: &'static str) {
        let expected = self
            .rule
            .column(field)
            .is_some_and(|spec| spec.requirement == Requirement::Expected);
        if !expected {
            return;
        }
        self.partial = true;
        // A missing column is reported once for the whole table.
        if !self.missing_columns.contains(&field) {
            self.warnings.push(ExtractionWarning::new(
                WarningKind::MissingField,
                Some(self.row.index),
                Some(field),
                &self.row.raw,
            ));
        }
    }

    pub fn provenance(&self) -> Provenance {
        Provenance::from_missing(self.partial)
    }

    pub fn into_warnings(self) -> Vec<ExtractionWarning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[FieldSpec] = &[
        FieldSpec::key("code", &["ders kodu", "kod"], Some(0)),
        FieldSpec::expected("name", &["ders adi", "ders"], Some(1)),
        FieldSpec::expected("credit", &["akts", "kredi"], Some(2)),
        FieldSpec::optional("note", &["aciklama"], None),
    ];

    fn rule(section_rows: bool) -> TableRule {
        TableRule {
            anchors: vec![Anchor::selector("[id$='gridDersler']"), Anchor::table_containing("ders kodu")],
            columns: COLUMNS.to_vec(),
            section_rows,
        }
    }

    fn read(html: &str, rule: &TableRule) -> TableRows {
        let document = Html::parse_document(html);
        let table = rule.find(&document).expect("table");
        read_table(table, rule)
    }

    #[test]
    fn test_columns_resolved_by_header_in_any_order() {
        let rows = read(
            "<table id='x_gridDersler'><tr><th>AKTS</th><th>Ders Adı</th><th>Ders Kodu</th></tr>
             <tr><td>6</td><td>Algoritmalar</td><td>BIL301</td></tr></table>",
            &rule(false),
        );
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0].values["code"], "BIL301");
        assert_eq!(rows.rows[0].values["credit"], "6");
        assert!(rows.warnings.is_empty());
    }

    #[test]
    fn test_exact_match_wins_over_contains() {
        let rows = read(
            "<table id='gridDersler'><tr><th>Ders</th><th>Ders Kodu</th></tr>
             <tr><td>Fizik</td><td>FIZ101</td></tr></table>",
            &rule(false),
        );
        assert_eq!(rows.rows[0].values["name"], "Fizik");
        assert_eq!(rows.rows[0].values["code"], "FIZ101");
    }

    #[test]
    fn test_positional_fallback_without_header() {
        let rows = read(
            "<table id='gridDersler'><tr><td>BIL101</td><td>Programlama</td><td>6</td></tr></table>",
            &rule(false),
        );
        assert_eq!(rows.rows[0].values["name"], "Programlama");
    }

    #[test]
    fn test_missing_key_skips_row_with_warning() {
        let rows = read(
            "<table id='gridDersler'><tr><th>Ders Kodu</th><th>Ders Adı</th><th>AKTS</th></tr>
             <tr><td>&nbsp;</td><td>Seçmeli</td><td>4</td></tr>
             <tr><td>BIL101</td><td>Programlama</td><td>6</td></tr></table>",
            &rule(false),
        );
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.warnings.len(), 1);
        assert_eq!(rows.warnings[0].kind, WarningKind::MalformedRow);
        assert_eq!(rows.warnings[0].row, Some(1));
        assert_eq!(rows.warnings[0].field.as_deref(), Some("code"));
    }

    #[test]
    fn test_section_rows_label_following_rows() {
        let rows = read(
            "<table id='gridDersler'><tr><th>Ders Kodu</th><th>Ders Adı</th><th>AKTS</th></tr>
             <tr><td colspan='3'>2023 Güz</td></tr>
             <tr><td>BIL101</td><td>A</td><td>6</td></tr>
             <tr><td colspan='3'>2024 Bahar</td></tr>
             <tr><td>BIL102</td><td>B</td><td>6</td></tr></table>",
            &rule(true),
        );
        assert_eq!(rows.rows[0].section.as_deref(), Some("2023 Güz"));
        assert_eq!(rows.rows[1].section.as_deref(), Some("2024 Bahar"));
    }

    #[test]
    fn test_nested_tables_are_not_walked() {
        let rows = read(
            "<table id='gridDersler'><tr><th>Ders Kodu</th><th>Ders Adı</th><th>AKTS</th></tr>
             <tr><td>BIL101</td><td><table><tr><td>X</td><td>Y</td><td>Z</td></tr></table></td><td>6</td></tr>
             </table>",
            &rule(false),
        );
        assert_eq!(rows.rows.len(), 1);
    }

    #[test]
    fn test_table_containing_picks_innermost() {
        let html = "<table id='layout'><tr><td>
            <table id='inner'><tr><th>Ders Kodu</th><th>Ders Adı</th></tr></table>
            </td></tr></table>";
        let document = Html::parse_document(html);
        let found = Anchor::table_containing("Ders Kodu").locate(&document).unwrap();
        assert_eq!(found.value().attr("id"), Some("inner"));
    }

    #[test]
    fn test_missing_column_reported_once() {
        let rule = rule(false);
        let document = Html::parse_document(
            "<table id='gridDersler'><tr><th>Ders Kodu</th><th>Ders Adı</th></tr>
             <tr><td>BIL101</td><td>A</td></tr><tr><td>BIL102</td><td>B</td></tr></table>",
        );
        let rows = read_table(rule.find(&document).unwrap(), &rule);
        assert_eq!(rows.missing_columns, vec!["credit"]);
        assert_eq!(rows.warnings.len(), 1);

        let mut reader = RowReader::new(&rows.rows[0], &rule, &rows.missing_columns);
        assert_eq!(reader.number("credit"), None);
        assert_eq!(reader.text("note"), None);
        assert!(reader.provenance().is_partial());
        assert!(reader.into_warnings().is_empty());
    }

    #[test]
    fn test_reader_flags_unparseable_values() {
        let rule = rule(false);
        let rows = read(
            "<table id='gridDersler'><tr><th>Ders Kodu</th><th>Ders Adı</th><th>AKTS</th></tr>
             <tr><td>BIL101</td><td>A</td><td>—</td></tr></table>",
            &rule,
        );
        let mut reader = RowReader::new(&rows.rows[0], &rule, &rows.missing_columns);
        assert_eq!(reader.text("code").as_deref(), Some("BIL101"));
        assert_eq!(reader.number("credit"), None);
        assert!(reader.provenance().is_partial());
        let warnings = reader.into_warnings();
        assert_eq!(warnings[0].kind, WarningKind::UnparseableValue);
        assert_eq!(warnings[0].raw, "—");
    }

    #[test]
    fn test_reader_number_and_decimal_separators() {
        let rule = rule(false);
        let rows = read(
            "<table id='gridDersler'><tr><th>Ders Kodu</th><th>Ders Adı</th><th>AKTS</th></tr>
             <tr><td>BIL101</td><td>A</td><td>1.500</td></tr></table>",
            &rule,
        );
        let mut reader = RowReader::new(&rows.rows[0], &rule, &rows.missing_columns);
        assert_eq!(reader.number("credit"), Some(1500.0));
        assert_eq!(reader.decimal("credit"), Some(1.5));
        assert!(!reader.provenance().is_partial());
    }
}
