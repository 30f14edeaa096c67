//! HTML extraction.
//!
//! `ExtractorRegistry` maps each `PageKind` to a declarative `PageRule`.
//! Extraction is pure: the same markup always yields the same records and
//! warnings. Only a missing structural anchor is an error; everything else
//! degrades to partial records with `ExtractionWarning`s.

mod announcements;
mod generic;
pub mod normalize;
mod profile;
mod records;
mod table;

use std::collections::BTreeMap;

use log::{debug, warn};
use scraper::Html;
use serde::Serialize;

pub use announcements::LinkRule;
pub use generic::{KeywordLinkRule, TablesRule};
pub use profile::{ProfileField, ProfileRule, ProfileSlot};
pub use records::{attendance_rule, courses_rule, fees_rule, transcript_rule, TableKind};
pub use table::{find_table, read_table, Anchor, FieldSpec, Requirement, RowReader, TableRow, TableRows, TableRule};

use crate::config::MAX_WARNING_RAW_CHARS;
use crate::error_handling::{ObsError, StructureReason, WarningKind};
use crate::models::{
    AttendanceRecord, Announcement, CourseEntry, DataTable, FeeRecord, NavLink, Profile, TranscriptEntry,
};
use crate::pages::PageKind;
use normalize::truncate_chars;

/// A non-fatal extraction problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionWarning {
    pub kind: WarningKind,
    /// Row position in the source table, when the problem is row-specific
    pub row: Option<usize>,
    pub field: Option<String>,
    /// Offending text, truncated
    pub raw: String,
}

impl ExtractionWarning {
    pub fn new(kind: WarningKind, row: Option<usize>, field: Option<&str>, raw: &str) -> Self {
        Self {
            kind,
            row,
            field: field.map(str::to_string),
            raw: truncate_chars(raw, MAX_WARNING_RAW_CHARS),
        }
    }
}

/// Records extracted from one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "records", rename_all = "snake_case")]
pub enum PageRecords {
    Profile(Box<Profile>),
    Transcript(Vec<TranscriptEntry>),
    Courses(Vec<CourseEntry>),
    Fees(Vec<FeeRecord>),
    Attendance(Vec<AttendanceRecord>),
    Announcements(Vec<Announcement>),
    Tables(Vec<DataTable>),
    Links(Vec<NavLink>),
}

impl PageRecords {
    pub fn len(&self) -> usize {
        match self {
            PageRecords::Profile(_) => 1,
            PageRecords::Transcript(v) => v.len(),
            PageRecords::Courses(v) => v.len(),
            PageRecords::Fees(v) => v.len(),
            PageRecords::Attendance(v) => v.len(),
            PageRecords::Announcements(v) => v.len(),
            PageRecords::Tables(v) => v.len(),
            PageRecords::Links(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of extracting one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub page: PageKind,
    pub records: PageRecords,
    pub warnings: Vec<ExtractionWarning>,
}

impl ExtractionResult {
    /// Whether anything was skipped or could not be located.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn profile(&self) -> Option<&Profile> {
        match &self.records {
            PageRecords::Profile(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn transcript(&self) -> Option<&[TranscriptEntry]> {
        match &self.records {
            PageRecords::Transcript(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn courses(&self) -> Option<&[CourseEntry]> {
        match &self.records {
            PageRecords::Courses(courses) => Some(courses),
            _ => None,
        }
    }

    pub fn fees(&self) -> Option<&[FeeRecord]> {
        match &self.records {
            PageRecords::Fees(fees) => Some(fees),
            _ => None,
        }
    }

    pub fn attendance(&self) -> Option<&[AttendanceRecord]> {
        match &self.records {
            PageRecords::Attendance(records) => Some(records),
            _ => None,
        }
    }

    pub fn announcements(&self) -> Option<&[Announcement]> {
        match &self.records {
            PageRecords::Announcements(list) => Some(list),
            _ => None,
        }
    }

    pub fn tables(&self) -> Option<&[DataTable]> {
        match &self.records {
            PageRecords::Tables(tables) => Some(tables),
            _ => None,
        }
    }

    pub fn links(&self) -> Option<&[NavLink]> {
        match &self.records {
            PageRecords::Links(links) => Some(links),
            _ => None,
        }
    }
}

/// How a page is extracted.
#[derive(Debug, Clone)]
pub enum PageRule {
    /// Labelled controls located by id suffix
    Profile(ProfileRule),
    /// A data table
    Table { kind: TableKind, rule: TableRule },
    /// A table of links
    Links(LinkRule),
    /// Every data table, rows keyed by header
    Tables(TablesRule),
    /// Links anywhere on the page that mention a keyword
    KeywordLinks(KeywordLinkRule),
    /// Content rendered client-side; never extractable
    ScriptRendered,
}

/// Extraction rules by page.
#[derive(Debug, Clone)]
pub struct ExtractorRegistry {
    rules: BTreeMap<PageKind, PageRule>,
}

impl Default for ExtractorRegistry {
    /// Registry with the rules for every built-in page.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PageKind::Profile, PageRule::Profile(ProfileRule::default()));
        registry.register(
            PageKind::Transcript,
            PageRule::Table { kind: TableKind::Transcript, rule: transcript_rule() },
        );
        registry.register(
            PageKind::Courses,
            PageRule::Table { kind: TableKind::Courses, rule: courses_rule() },
        );
        registry.register(PageKind::Fees, PageRule::Table { kind: TableKind::Fees, rule: fees_rule() });
        registry.register(
            PageKind::Attendance,
            PageRule::Table { kind: TableKind::Attendance, rule: attendance_rule() },
        );
        registry.register(PageKind::Announcements, PageRule::Links(LinkRule::default()));
        for page in [
            PageKind::WeeklySchedule,
            PageKind::Library,
            PageKind::Registration,
            PageKind::Thesis,
            PageKind::Internships,
            PageKind::Petitions,
            PageKind::Materials,
            PageKind::Events,
        ] {
            registry.register(page, PageRule::Tables(TablesRule::default()));
        }
        registry.register(PageKind::Messages, PageRule::Tables(TablesRule::messages()));
        registry.register(PageKind::OnlineEducation, PageRule::KeywordLinks(KeywordLinkRule::default()));
        registry.register(PageKind::ExamSchedule, PageRule::ScriptRendered);
        registry.register(PageKind::GpaCalculator, PageRule::ScriptRendered);
        registry
    }
}

impl ExtractorRegistry {
    /// Registry without any rules.
    pub fn empty() -> Self {
        Self { rules: BTreeMap::new() }
    }

    /// Adds or replaces the rule for `page`, returning the previous one.
    pub fn register(&mut self, page: PageKind, rule: PageRule) -> Option<PageRule> {
        self.rules.insert(page, rule)
    }

    pub fn rule(&self, page: PageKind) -> Option<&PageRule> {
        self.rules.get(&page)
    }

    /// Sets the row limit of every link-list rule.
    pub fn with_link_limit(mut self, limit: Option<usize>) -> Self {
        for rule in self.rules.values_mut() {
            if let PageRule::Links(links) = rule {
                links.limit = limit;
            }
        }
        self
    }

    /// Whether the page can only be rendered by a browser.
    pub fn is_script_rendered(&self, page: PageKind) -> bool {
        matches!(self.rules.get(&page), Some(PageRule::ScriptRendered))
    }

    /// Extracts typed records from a page's markup.
    ///
    /// # Errors
    ///
    /// Returns `ObsError::StructureNotFound` when the page has no rule, is
    /// script-rendered, or none of the rule's anchors occur in the markup.
    /// Table-dump and keyword-link rules have no anchor and never fail.
    pub fn extract(&self, page: PageKind, raw_html: &str) -> Result<ExtractionResult, ObsError> {
        let not_found = |reason| ObsError::StructureNotFound { page, reason };
        let rule = self.rules.get(&page).ok_or_else(|| not_found(StructureReason::NoRule))?;

        let document = Html::parse_document(raw_html);
        let (records, warnings) = match rule {
            PageRule::ScriptRendered => return Err(not_found(StructureReason::ScriptRendered)),
            PageRule::Profile(profile) => {
                if profile.anchors.iter().all(|a| a.locate(&document).is_none()) {
                    return Err(not_found(StructureReason::AnchorMissing));
                }
                profile.build(&document)
            }
            PageRule::Table { kind, rule } => {
                let table = rule
                    .find(&document)
                    .ok_or_else(|| not_found(StructureReason::AnchorMissing))?;
                let rows = read_table(table, rule);
                let (records, mut built) = kind.build(&rows, rule);
                let mut warnings = rows.warnings;
                warnings.append(&mut built);
                (records, warnings)
            }
            PageRule::Links(links) => {
                let table = links
                    .find(&document)
                    .ok_or_else(|| not_found(StructureReason::AnchorMissing))?;
                links.build(table)
            }
            PageRule::Tables(tables) => tables.build(&document),
            PageRule::KeywordLinks(links) => links.build(&document),
        };

        if warnings.is_empty() {
            debug!("Extracted {} records from {} page", records.len(), page);
        } else {
            warn!(
                "Extracted {} records from {} page with {} warnings",
                records.len(),
                page,
                warnings.len()
            );
        }
        Ok(ExtractionResult { page, records, warnings })
    }
}
