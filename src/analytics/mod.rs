//! Derived academic analytics.
//!
//! Every function here is pure: it reads already-extracted records and
//! returns a value, so calls are safe to run concurrently with fetches as
//! long as they work on their own snapshots. Missing data never fails a
//! computation; it yields `None` fields or empty results instead.

mod advisory;
mod gpa;
mod notifications;
mod projection;

use std::collections::BTreeMap;

use serde::Serialize;

pub use advisory::{compute_course_advisory, CourseAdvisory};
pub use gpa::{compute_gpa_trend, cumulative_gpa, GpaTrend, TermGpa, TrendDirection};
pub use notifications::{
    compute_notifications, AbsenceRule, LowGpaRule, Notification, NotificationEngine, NotificationInput,
    NotificationKind, NotificationRule, Priority, UnpaidFeeRule,
};
pub use projection::{compute_credit_projection, earned_credits, CreditProjection};

use crate::models::{normalize_course_code, TranscriptEntry};

/// Output of one analytics operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum AnalyticsResult {
    GpaTrend(GpaTrend),
    CreditProjection(CreditProjection),
    CourseAdvisory(Vec<CourseAdvisory>),
    Notifications(Vec<Notification>),
}

/// The latest attempt of every course, in order of first appearance.
///
/// Transcript entries are ordered by term, so a later entry for the same
/// course code is a retake and replaces the earlier grade.
pub(crate) fn latest_attempts(entries: &[TranscriptEntry]) -> Vec<&TranscriptEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: BTreeMap<String, &TranscriptEntry> = BTreeMap::new();
    for entry in entries {
        let code = normalize_course_code(&entry.course_code);
        if latest.insert(code.clone(), entry).is_none() {
            order.push(code);
        }
    }
    order.iter().filter_map(|code| latest.get(code).copied()).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{Provenance, TranscriptEntry};

    pub fn entry(term: &str, code: &str, credit: Option<f64>, grade_point: Option<f64>) -> TranscriptEntry {
        TranscriptEntry {
            term: Some(term.to_string()),
            course_code: code.to_string(),
            course_name: None,
            credit,
            grade: None,
            grade_point,
            provenance: Provenance::Complete,
        }
    }
}
