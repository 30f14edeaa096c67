//! Typed records extracted from the records system's pages.
//!
//! Every field that a page may not carry is an `Option`; `None` means "not
//! found on the page", never zero or an empty string. Each record carries a
//! `Provenance` telling whether all expected fields were located.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Whether a record was extracted with all expected fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    Complete,
    Partial,
}

impl Provenance {
    pub fn from_missing(any_missing: bool) -> Self {
        if any_missing {
            Provenance::Partial
        } else {
            Provenance::Complete
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Provenance::Partial)
    }
}

/// A link from the student panel's navigation menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub text: String,
    pub href: String,
}

/// One row of the per-term academic summary on the profile page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AcademicSummary {
    pub class_level: Option<String>,
    pub yearly_credits: Option<f64>,
    pub fall_credits: Option<f64>,
    pub spring_credits: Option<f64>,
    pub total_credits: Option<f64>,
    pub gpa: Option<f64>,
    pub provenance: Provenance,
}

/// Student identity and affiliation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub student_id: Option<String>,
    pub name: Option<String>,
    pub faculty: Option<String>,
    pub department: Option<String>,
    pub program: Option<String>,
    pub class_level: Option<String>,
    pub advisor: Option<String>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub academic_summaries: Vec<AcademicSummary>,
    pub nav_links: Vec<NavLink>,
    pub provenance: Provenance,
}

impl Profile {
    /// GPA of the most recent summary row that has one.
    pub fn current_gpa(&self) -> Option<f64> {
        self.academic_summaries.iter().rev().find_map(|s| s.gpa)
    }
}

/// Letter grades that pass without carrying a grade point (exempt, satisfactory).
const PASS_WITHOUT_POINT: &[&str] = &["G", "YT", "MU", "BL", "S", "P"];

/// One completed course on the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub term: Option<String>,
    pub course_code: String,
    pub course_name: Option<String>,
    pub credit: Option<f64>,
    pub grade: Option<String>,
    pub grade_point: Option<f64>,
    pub provenance: Provenance,
}

impl TranscriptEntry {
    /// Whether the course counts as passed.
    ///
    /// A grade point must be strictly above `pass_grade_point`; pass-only
    /// grades without a point (e.g. `G`, `YT`) also count.
    pub fn is_passed(&self, pass_grade_point: f64) -> bool {
        match self.grade_point {
            Some(point) => point > pass_grade_point,
            None => self
                .grade
                .as_deref()
                .is_some_and(|g| PASS_WITHOUT_POINT.contains(&g.trim().to_uppercase().as_str())),
        }
    }
}

/// A weekly meeting of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    /// Two slots overlap when they share a day and their intervals intersect.
    /// Back-to-back slots (one ends when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }
}

/// A currently registered (or candidate) course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseEntry {
    pub code: String,
    pub name: Option<String>,
    pub instructor: Option<String>,
    /// Schedule as printed on the page
    pub schedule_text: Option<String>,
    pub schedule: Vec<TimeSlot>,
    pub credit: Option<f64>,
    /// Codes of courses that must be passed first
    pub prerequisites: Vec<String>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    Unknown,
}

/// A tuition or fee line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
    pub term: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub paid_amount: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub status: PaymentStatus,
    pub provenance: Provenance,
}

impl FeeRecord {
    /// Whether money is still owed on this line.
    pub fn is_outstanding(&self) -> bool {
        match self.status {
            PaymentStatus::Paid => false,
            PaymentStatus::Unpaid => true,
            PaymentStatus::Unknown => match (self.amount, self.paid_amount) {
                (Some(amount), Some(paid)) => paid + f64::EPSILON < amount,
                _ => false,
            },
        }
    }
}

/// Absence counts for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub course_code: String,
    pub course_name: Option<String>,
    pub total_hours: Option<f64>,
    pub absent_hours: Option<f64>,
    pub absence_limit: Option<f64>,
    pub provenance: Provenance,
}

impl AttendanceRecord {
    /// Absent hours over total hours, when both are known and total is positive.
    pub fn absence_ratio(&self) -> Option<f64> {
        match (self.absent_hours, self.total_hours) {
            (Some(absent), Some(total)) if total > 0.0 => Some(absent / total),
            _ => None,
        }
    }

    /// Whether the page's own absence limit has been reached.
    pub fn limit_reached(&self) -> bool {
        matches!((self.absent_hours, self.absence_limit), (Some(a), Some(l)) if a >= l)
    }
}

/// An announcement listed on the student panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Option<String>,
    pub title: String,
    /// Link target as written in the page (may be relative)
    pub href: Option<String>,
    pub date: Option<NaiveDate>,
    /// Date text as printed, kept when it does not parse
    pub date_text: Option<String>,
    pub provenance: Provenance,
}

/// A table read without a field map, from pages whose layout varies too much
/// between deployments to type (registration, thesis, petitions, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataTable {
    /// Element id of the table, when it has one
    pub id: Option<String>,
    /// Header labels in column order; empty when the table has no header row
    pub headers: Vec<String>,
    /// Non-empty cell text keyed by header label, or `col_<n>` for unlabelled columns
    pub rows: Vec<BTreeMap<String, String>>,
}

impl DataTable {
    /// Values of one column, in row order.
    pub fn column(&self, key: &str) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|row| row.get(key).map(String::as_str))
            .collect()
    }
}

/// Canonical form of a course code for comparisons: uppercase, no whitespace.
///
/// Pages print the same course as `BIL 101`, `bil101` or `BIL-101`.
pub fn normalize_course_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}
