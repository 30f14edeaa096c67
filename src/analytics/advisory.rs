//! Course-selection feasibility: prerequisites and schedule conflicts.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::AnalyticsConfig;
use crate::models::{normalize_course_code, CourseEntry, TranscriptEntry};

/// Feasibility of one candidate course.
///
/// Eligibility and conflict are independent: a course can be eligible and
/// still clash with the current schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseAdvisory {
    pub code: String,
    pub eligible: bool,
    /// Prerequisites not found among passed courses, as printed
    pub missing_prerequisites: Vec<String>,
    pub conflict: bool,
    /// Codes of current courses sharing a time slot with the candidate
    pub conflicts_with: Vec<String>,
}

/// Evaluates each candidate against the transcript and the current schedule.
pub fn compute_course_advisory(
    candidates: &[CourseEntry],
    transcript: &[TranscriptEntry],
    current_schedule: &[CourseEntry],
    config: &AnalyticsConfig,
) -> Vec<CourseAdvisory> {
    let passed: BTreeSet<String> = transcript
        .iter()
        .filter(|entry| entry.is_passed(config.pass_grade_point))
        .map(|entry| normalize_course_code(&entry.course_code))
        .collect();

    candidates
        .iter()
        .map(|candidate| {
            let missing_prerequisites: Vec<String> = candidate
                .prerequisites
                .iter()
                .filter(|code| !passed.contains(&normalize_course_code(code)))
                .cloned()
                .collect();
            let conflicts_with = conflicts(candidate, current_schedule);
            CourseAdvisory {
                code: candidate.code.clone(),
                eligible: missing_prerequisites.is_empty(),
                missing_prerequisites,
                conflict: !conflicts_with.is_empty(),
                conflicts_with,
            }
        })
        .collect()
}

fn conflicts(candidate: &CourseEntry, current_schedule: &[CourseEntry]) -> Vec<String> {
    let own_code = normalize_course_code(&candidate.code);
    let mut codes: Vec<String> = Vec::new();
    for course in current_schedule {
        if normalize_course_code(&course.code) == own_code || codes.contains(&course.code) {
            continue;
        }
        let clash = candidate
            .schedule
            .iter()
            .any(|slot| course.schedule.iter().any(|other| slot.overlaps(other)));
        if clash {
            codes.push(course.code.clone());
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::super::test_support::entry;
    use super::*;
    use crate::models::{Provenance, TimeSlot};
    use chrono::{NaiveTime, Weekday};

    fn course(code: &str, prerequisites: &[&str], slots: &[(Weekday, u32, u32)]) -> CourseEntry {
        CourseEntry {
            code: code.to_string(),
            name: None,
            instructor: None,
            schedule_text: None,
            schedule: slots
                .iter()
                .map(|(day, start, end)| TimeSlot {
                    day: *day,
                    start: NaiveTime::from_hms_opt(*start, 0, 0).unwrap(),
                    end: NaiveTime::from_hms_opt(*end, 0, 0).unwrap(),
                })
                .collect(),
            credit: Some(5.0),
            prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
            provenance: Provenance::Complete,
        }
    }

    fn transcript() -> Vec<TranscriptEntry> {
        vec![
            entry("A", "BIL101", Some(6.0), Some(3.0)),
            entry("A", "MAT101", Some(6.0), Some(0.5)),
            entry("A", "BIL 102", Some(6.0), Some(1.0)),
        ]
    }

    #[test]
    fn test_one_missing_prerequisite_blocks() {
        let candidates = vec![course("BIL201", &["BIL101", "MAT101"], &[])];
        let advisory = compute_course_advisory(&candidates, &transcript(), &[], &AnalyticsConfig::default());
        assert!(!advisory[0].eligible);
        assert_eq!(advisory[0].missing_prerequisites, vec!["MAT101"]);
    }

    #[test]
    fn test_prerequisite_codes_are_normalized() {
        let candidates = vec![course("BIL303", &["bil102", "BIL-101"], &[])];
        let advisory = compute_course_advisory(&candidates, &transcript(), &[], &AnalyticsConfig::default());
        assert!(advisory[0].eligible);
        assert!(advisory[0].missing_prerequisites.is_empty());
    }

    #[test]
    fn test_eligible_course_can_still_conflict() {
        let current = vec![
            course("BIL301", &[], &[(Weekday::Mon, 9, 11)]),
            course("MAT201", &[], &[(Weekday::Tue, 9, 11)]),
            course("BIL303", &[], &[(Weekday::Mon, 10, 12)]),
        ];
        let candidates = vec![
            course("BIL303", &["BIL102"], &[(Weekday::Mon, 10, 12)]),
            course("BIL305", &[], &[(Weekday::Mon, 11, 12)]),
        ];
        let advisory = compute_course_advisory(&candidates, &transcript(), &current, &AnalyticsConfig::default());

        assert!(advisory[0].eligible);
        assert!(advisory[0].conflict);
        assert_eq!(advisory[0].conflicts_with, vec!["BIL301"]);

        // Back-to-back with BIL301, overlapping BIL303
        assert!(advisory[1].conflict);
        assert_eq!(advisory[1].conflicts_with, vec!["BIL303"]);
    }

    #[test]
    fn test_course_without_schedule_never_conflicts() {
        let current = vec![course("BIL301", &[], &[(Weekday::Mon, 9, 11)])];
        let candidates = vec![course("BIL499", &[], &[])];
        let advisory = compute_course_advisory(&candidates, &[], &current, &AnalyticsConfig::default());
        assert!(advisory[0].eligible);
        assert!(!advisory[0].conflict);
    }
}
