//! Rule-based notifications.
//!
//! A `NotificationEngine` runs an ordered list of independent rules. Each
//! rule looks at the extracted records and yields at most one notification;
//! a rule whose data is missing simply yields nothing.

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use super::gpa::cumulative_gpa;
use crate::config::AnalyticsConfig;
use crate::models::{AttendanceRecord, FeeRecord, Profile, TranscriptEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AcademicWarning,
    AttendanceWarning,
    PaymentReminder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub priority: Priority,
    pub message: String,
    pub action_required: bool,
}

/// Records a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct NotificationInput<'a> {
    pub profile: Option<&'a Profile>,
    pub transcript: &'a [TranscriptEntry],
    pub fees: &'a [FeeRecord],
    pub attendance: &'a [AttendanceRecord],
    /// Reference date for due-date checks
    pub as_of: NaiveDate,
}

/// One independent notification trigger.
pub trait NotificationRule: Send + Sync {
    /// Stable identifier, used to disable a rule.
    fn name(&self) -> &'static str;

    fn evaluate(&self, input: &NotificationInput<'_>, config: &AnalyticsConfig) -> Option<Notification>;
}

/// GPA below the configured threshold.
///
/// Uses the GPA printed on the profile, else the cumulative GPA computed
/// from the transcript.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowGpaRule;

impl NotificationRule for LowGpaRule {
    fn name(&self) -> &'static str {
        "low_gpa"
    }

    fn evaluate(&self, input: &NotificationInput<'_>, config: &AnalyticsConfig) -> Option<Notification> {
        let gpa = input
            .profile
            .and_then(Profile::current_gpa)
            .or_else(|| cumulative_gpa(input.transcript))?;
        (gpa < config.low_gpa_threshold).then(|| Notification {
            kind: NotificationKind::AcademicWarning,
            priority: Priority::High,
            message: format!(
                "GPA {:.2} is below the academic warning threshold of {:.2}",
                gpa, config.low_gpa_threshold
            ),
            action_required: true,
        })
    }
}

/// Absence ratio approaching or reaching the limit, reported for the worst course.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsenceRule;

impl NotificationRule for AbsenceRule {
    fn name(&self) -> &'static str {
        "absence"
    }

    fn evaluate(&self, input: &NotificationInput<'_>, config: &AnalyticsConfig) -> Option<Notification> {
        let at_limit: Vec<&str> = input
            .attendance
            .iter()
            .filter(|record| {
                record.limit_reached()
                    || record.absence_ratio().is_some_and(|r| r >= config.absence_limit_ratio)
            })
            .map(|record| record.course_code.as_str())
            .collect();

        if !at_limit.is_empty() {
            return Some(Notification {
                kind: NotificationKind::AttendanceWarning,
                priority: Priority::High,
                message: format!("Absence limit reached in {}", at_limit.join(", ")),
                action_required: true,
            });
        }

        let (worst, ratio) = input
            .attendance
            .iter()
            .filter_map(|record| record.absence_ratio().map(|ratio| (record, ratio)))
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;
        (ratio >= config.absence_warning_ratio).then(|| Notification {
            kind: NotificationKind::AttendanceWarning,
            priority: Priority::Medium,
            message: format!(
                "Absence at {:.0}% of hours in {}",
                ratio * 100.0,
                worst.course_code
            ),
            action_required: false,
        })
    }
}

/// Unpaid fees whose due date has passed.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnpaidFeeRule;

impl NotificationRule for UnpaidFeeRule {
    fn name(&self) -> &'static str {
        "unpaid_fee"
    }

    fn evaluate(&self, input: &NotificationInput<'_>, _config: &AnalyticsConfig) -> Option<Notification> {
        let overdue: Vec<&FeeRecord> = input
            .fees
            .iter()
            .filter(|fee| fee.is_outstanding() && fee.due_date.is_some_and(|due| due < input.as_of))
            .collect();
        if overdue.is_empty() {
            return None;
        }
        let owed: f64 = overdue
            .iter()
            .filter_map(|fee| fee.amount.map(|amount| amount - fee.paid_amount.unwrap_or(0.0)))
            .sum();
        Some(Notification {
            kind: NotificationKind::PaymentReminder,
            priority: Priority::High,
            message: format!("{} overdue payment(s), {:.2} outstanding", overdue.len(), owed),
            action_required: true,
        })
    }
}

/// Ordered list of notification rules.
pub struct NotificationEngine {
    rules: Vec<Box<dyn NotificationRule>>,
}

impl Default for NotificationEngine {
    /// Low GPA, then absences, then overdue fees.
    fn default() -> Self {
        Self::with_rules(vec![
            Box::new(LowGpaRule),
            Box::new(AbsenceRule),
            Box::new(UnpaidFeeRule),
        ])
    }
}

impl std::fmt::Debug for NotificationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.rules.iter().map(|rule| rule.name())).finish()
    }
}

impl NotificationEngine {
    pub fn with_rules(rules: Vec<Box<dyn NotificationRule>>) -> Self {
        Self { rules }
    }

    /// Appends a rule; it runs after the existing ones.
    pub fn push(&mut self, rule: Box<dyn NotificationRule>) {
        self.rules.push(rule);
    }

    /// Removes the rule named `name`, if present.
    pub fn disable(&mut self, name: &str) {
        self.rules.retain(|rule| rule.name() != name);
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Runs every rule in order.
    pub fn evaluate(&self, input: &NotificationInput<'_>, config: &AnalyticsConfig) -> Vec<Notification> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let notification = rule.evaluate(input, config);
                if notification.is_none() {
                    debug!("Notification rule {} did not fire", rule.name());
                }
                notification
            })
            .collect()
    }
}

/// Runs the default rules.
pub fn compute_notifications(
    profile: Option<&Profile>,
    transcript: &[TranscriptEntry],
    fees: &[FeeRecord],
    attendance: &[AttendanceRecord],
    as_of: NaiveDate,
    config: &AnalyticsConfig,
) -> Vec<Notification> {
    let input = NotificationInput {
        profile,
        transcript,
        fees,
        attendance,
        as_of,
    };
    NotificationEngine::default().evaluate(&input, config)
}
