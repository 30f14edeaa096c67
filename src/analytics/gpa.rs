//! GPA per term, cumulative GPA and trend direction.

use serde::Serialize;

use super::latest_attempts;
use super::projection::earned_credits;
use crate::config::AnalyticsConfig;
use crate::models::TranscriptEntry;

/// Tolerance for comparing a GPA delta against the trend threshold.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

/// Credit-weighted GPA of one term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermGpa {
    pub term: Option<String>,
    pub gpa: f64,
    /// Graded credits the GPA is weighted over
    pub credits: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpaTrend {
    /// Cumulative GPA over the latest attempt of each course
    pub current_gpa: Option<f64>,
    /// Terms in transcript order; terms without graded credits are omitted
    pub term_gpas: Vec<TermGpa>,
    pub direction: TrendDirection,
    /// Latest term GPA minus the previous one
    pub delta: Option<f64>,
    /// Highest reachable cumulative GPA minus the current one
    pub improvement_potential: f64,
}

/// Sum of credit × grade point and of credits, over entries carrying both.
fn weighted<'a>(entries: impl IntoIterator<Item = &'a TranscriptEntry>) -> (f64, f64) {
    entries
        .into_iter()
        .filter_map(|entry| match (entry.credit, entry.grade_point) {
            (Some(credit), Some(point)) if credit > 0.0 => Some((credit * point, credit)),
            _ => None,
        })
        .fold((0.0, 0.0), |(points, credits), (p, c)| (points + p, credits + c))
}

/// Cumulative GPA counting only the latest attempt of each course.
pub fn cumulative_gpa(entries: &[TranscriptEntry]) -> Option<f64> {
    let (points, credits) = weighted(latest_attempts(entries));
    (credits > 0.0).then(|| points / credits)
}

fn term_gpas(entries: &[TranscriptEntry]) -> Vec<TermGpa> {
    let mut terms: Vec<Option<String>> = Vec::new();
    for entry in entries {
        if !terms.contains(&entry.term) {
            terms.push(entry.term.clone());
        }
    }
    terms
        .into_iter()
        .filter_map(|term| {
            let (points, credits) = weighted(entries.iter().filter(|e| e.term == term));
            (credits > 0.0).then(|| TermGpa { term, gpa: points / credits, credits })
        })
        .collect()
}

/// Computes per-term GPAs and classifies the latest change.
pub fn compute_gpa_trend(entries: &[TranscriptEntry], config: &AnalyticsConfig) -> GpaTrend {
    let term_gpas = term_gpas(entries);
    let delta = match term_gpas.as_slice() {
        [.., previous, latest] => Some(latest.gpa - previous.gpa),
        _ => None,
    };
    let direction = match delta {
        Some(d) if d >= config.trend_threshold - EPSILON => TrendDirection::Improving,
        Some(d) if d <= -config.trend_threshold + EPSILON => TrendDirection::Declining,
        _ => TrendDirection::Stable,
    };

    let current_gpa = cumulative_gpa(entries);
    let improvement_potential = current_gpa.map_or(0.0, |gpa| {
        let (_, graded) = weighted(latest_attempts(entries));
        let remaining = (config.total_required_credits - earned_credits(entries, config.pass_grade_point)).max(0.0);
        if remaining <= 0.0 {
            return 0.0;
        }
        let best = (gpa * graded + config.top_grade_point * remaining) / (graded + remaining);
        (best - gpa).max(0.0)
    });

    GpaTrend {
        current_gpa,
        term_gpas,
        direction,
        delta,
        improvement_potential,
    }
}
