//! Student profile: labelled WebForms controls plus the academic summary grid.

use log::debug;
use scraper::{Html, Selector};

use super::normalize::clean_text;
use super::table::{read_table, Anchor, FieldSpec, RowReader, TableRule};
use super::{ExtractionWarning, PageRecords};
use crate::error_handling::WarningKind;
use crate::models::{AcademicSummary, NavLink, Profile, Provenance};
use crate::utils::{element_text, id_suffix_selector, parse_selector_with_fallback};

/// A profile attribute the rule can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSlot {
    StudentId,
    FirstName,
    LastName,
    /// Name printed in one control; wins over first/last
    FullName,
    Faculty,
    Department,
    Program,
    ClassLevel,
    Advisor,
    Status,
    Email,
}

impl ProfileSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileSlot::StudentId => "student_id",
            ProfileSlot::FirstName => "first_name",
            ProfileSlot::LastName => "last_name",
            ProfileSlot::FullName => "name",
            ProfileSlot::Faculty => "faculty",
            ProfileSlot::Department => "department",
            ProfileSlot::Program => "program",
            ProfileSlot::ClassLevel => "class_level",
            ProfileSlot::Advisor => "advisor",
            ProfileSlot::Status => "status",
            ProfileSlot::Email => "email",
        }
    }
}

/// Where one attribute is printed: controls whose id ends with one of the suffixes.
#[derive(Debug, Clone)]
pub struct ProfileField {
    pub slot: ProfileSlot,
    pub selectors: Vec<Selector>,
}

impl ProfileField {
    pub fn new(slot: ProfileSlot, id_suffixes: &[&str]) -> Self {
        Self {
            slot,
            selectors: id_suffixes
                .iter()
                .map(|suffix| id_suffix_selector(suffix, "profile field"))
                .collect(),
        }
    }

    fn read(&self, document: &Html) -> Option<String> {
        self.selectors.iter().find_map(|selector| {
            document
                .select(selector)
                .map(|element| clean_text(&element_text(element)))
                .find(|text| !text.is_empty())
        })
    }
}

/// Rule for the profile page.
#[derive(Debug, Clone)]
pub struct ProfileRule {
    pub anchors: Vec<Anchor>,
    pub fields: Vec<ProfileField>,
    /// Per-term academic summary grid
    pub summary: Option<TableRule>,
    /// Links of the navigation menu
    pub nav_links: Option<Selector>,
}

impl Default for ProfileRule {
    fn default() -> Self {
        const PREFIX: &str = "OgrenciTemelBilgiler1_";
        let field = |slot, suffix: &str| {
            ProfileField::new(slot, &[format!("{PREFIX}{suffix}").as_str(), suffix])
        };
        Self {
            anchors: vec![
                Anchor::selector("[id*='OgrenciTemelBilgiler']"),
                Anchor::selector("[id$='textOgrenciNo']"),
            ],
            fields: vec![
                field(ProfileSlot::StudentId, "textOgrenciNo"),
                field(ProfileSlot::FirstName, "textAdi"),
                field(ProfileSlot::LastName, "textSoyadi"),
                field(ProfileSlot::FullName, "textAdiSoyadi"),
                field(ProfileSlot::Faculty, "textFakulte"),
                field(ProfileSlot::Department, "textBolum"),
                field(ProfileSlot::Program, "textAltProgram"),
                field(ProfileSlot::ClassLevel, "textSinif"),
                field(ProfileSlot::Advisor, "textDanisman"),
                field(ProfileSlot::Status, "textDurum"),
                field(ProfileSlot::Email, "textSDUMail"),
            ],
            summary: Some(summary_rule()),
            nav_links: Some(parse_selector_with_fallback("div#anamenu a", "navigation menu")),
        }
    }
}

fn summary_rule() -> TableRule {
    TableRule {
        anchors: vec![Anchor::selector("[id$='gridOgrenciKnt']")],
        columns: vec![
            FieldSpec::expected("class_level", &["sinif", "class"], Some(3)),
            FieldSpec::optional("yearly_credits", &["yillik kredi", "yillik"], Some(4)),
            FieldSpec::optional("fall_credits", &["guz kredi", "guz"], Some(5)),
            FieldSpec::optional("spring_credits", &["bahar kredi", "bahar"], Some(6)),
            FieldSpec::expected("total_credits", &["toplam kredi", "toplam"], Some(7)),
            FieldSpec::expected("gpa", &["gno", "agno", "genel not ortalamasi", "ortalama", "gpa"], Some(8)),
        ],
        section_rows: false,
    }
}

impl ProfileRule {
    /// Extracts the profile; the caller has already checked an anchor is present.
    pub fn build(&self, document: &Html) -> (PageRecords, Vec<ExtractionWarning>) {
        let mut warnings = Vec::new();
        let mut profile = Profile::default();
        let mut first_name = None;
        let mut last_name = None;

        for field in &self.fields {
            let value = field.read(document);
            match field.slot {
                ProfileSlot::StudentId => profile.student_id = value,
                ProfileSlot::FirstName => first_name = value,
                ProfileSlot::LastName => last_name = value,
                ProfileSlot::FullName => profile.name = value,
                ProfileSlot::Faculty => profile.faculty = value,
                ProfileSlot::Department => profile.department = value,
                ProfileSlot::Program => profile.program = value,
                ProfileSlot::ClassLevel => profile.class_level = value,
                ProfileSlot::Advisor => profile.advisor = value,
                ProfileSlot::Status => profile.status = value,
                ProfileSlot::Email => profile.email = value,
            }
        }
        if profile.name.is_none() {
            let parts: Vec<String> = [first_name, last_name].into_iter().flatten().collect();
            profile.name = (!parts.is_empty()).then(|| parts.join(" "));
        }

        let expected = [
            (ProfileSlot::StudentId, profile.student_id.is_some()),
            (ProfileSlot::FullName, profile.name.is_some()),
            (ProfileSlot::Faculty, profile.faculty.is_some()),
            (ProfileSlot::Department, profile.department.is_some()),
            (ProfileSlot::ClassLevel, profile.class_level.is_some()),
        ];
        for (slot, _) in expected.iter().filter(|(_, found)| !found) {
            warnings.push(ExtractionWarning::new(
                WarningKind::MissingField,
                None,
                Some(slot.as_str()),
                "",
            ));
        }
        profile.provenance = Provenance::from_missing(expected.iter().any(|(_, found)| !found));

        if let Some(rule) = &self.summary {
            let (summaries, mut summary_warnings) = academic_summaries(document, rule);
            profile.academic_summaries = summaries;
            warnings.append(&mut summary_warnings);
        }
        if let Some(selector) = &self.nav_links {
            profile.nav_links = nav_links(document, selector);
        }

        debug!(
            "Profile: {} warnings, {} summary rows, {} links",
            warnings.len(),
            profile.academic_summaries.len(),
            profile.nav_links.len()
        );
        (PageRecords::Profile(Box::new(profile)), warnings)
    }
}

fn academic_summaries(document: &Html, rule: &TableRule) -> (Vec<AcademicSummary>, Vec<ExtractionWarning>) {
    let Some(table) = rule.find(document) else {
        let warning = ExtractionWarning::new(
            WarningKind::MissingField,
            None,
            Some("academic_summaries"),
            "summary table not found",
        );
        return (Vec::new(), vec![warning]);
    };

    let rows = read_table(table, rule);
    let mut warnings = rows.warnings.clone();
    let summaries = rows
        .rows
        .iter()
        .map(|row| {
            let mut reader = RowReader::new(row, rule, &rows.missing_columns);
            let summary = AcademicSummary {
                class_level: reader.text("class_level"),
                yearly_credits: reader.number("yearly_credits"),
                fall_credits: reader.number("fall_credits"),
                spring_credits: reader.number("spring_credits"),
                total_credits: reader.number("total_credits"),
                gpa: reader.decimal("gpa"),
                provenance: reader.provenance(),
            };
            warnings.extend(reader.into_warnings());
            summary
        })
        .collect();
    (summaries, warnings)
}

fn nav_links(document: &Html, selector: &Selector) -> Vec<NavLink> {
    document
        .select(selector)
        .filter_map(|link| {
            let text = clean_text(&element_text(link));
            let href = link.value().attr("href")?.trim();
            (!text.is_empty() && !href.is_empty()).then(|| NavLink {
                text,
                href: href.to_string(),
            })
        })
        .collect()
}
