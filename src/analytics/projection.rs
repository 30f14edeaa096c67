//! Graduation credit projection.

use serde::Serialize;

use super::latest_attempts;
use crate::models::TranscriptEntry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditProjection {
    pub earned_credits: f64,
    pub total_required_credits: f64,
    pub remaining_credits: f64,
    /// Earned over required, clamped to [0, 1]
    pub completion_rate: f64,
    /// Terms needed at the per-term cap; None when the cap is not positive
    pub estimated_terms: Option<u32>,
}

/// Credits of passed courses, counting each course's latest attempt once.
pub fn earned_credits(entries: &[TranscriptEntry], pass_grade_point: f64) -> f64 {
    latest_attempts(entries)
        .into_iter()
        .filter(|entry| entry.is_passed(pass_grade_point))
        .filter_map(|entry| entry.credit)
        .filter(|credit| *credit > 0.0)
        .sum()
}

/// Projects how far the student is from the credit requirement.
pub fn compute_credit_projection(
    entries: &[TranscriptEntry],
    total_required_credits: f64,
    credits_per_term_cap: f64,
    pass_grade_point: f64,
) -> CreditProjection {
    let earned = earned_credits(entries, pass_grade_point);
    let remaining = (total_required_credits - earned).max(0.0);
    let completion_rate = if total_required_credits > 0.0 {
        (earned / total_required_credits).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let estimated_terms = (credits_per_term_cap > 0.0).then(|| (remaining / credits_per_term_cap).ceil() as u32);

    CreditProjection {
        earned_credits: earned,
        total_required_credits,
        remaining_credits: remaining,
        completion_rate,
        estimated_terms,
    }
}
