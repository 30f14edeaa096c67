//! Value normalization for cell text.
//!
//! The records system prints numbers with either decimal separator, dates in
//! several locale formats, and pads cells with non-breaking spaces.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime, Weekday};
use regex::Regex;

use crate::models::TimeSlot;

const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d.%m.%y"];

static SCHEDULE_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(pazartesi|sali|carsamba|persembe|cumartesi|cuma|pazar|monday|mon|tuesday|tue|wednesday|wed|thursday|thu|friday|fri|saturday|sat|sunday|sun)\.?[\s,]*(\d{1,2})[:.](\d{2})\s*[-–]\s*(\d{1,2})[:.](\d{2})",
    )
    .unwrap_or_else(|e| panic!("schedule slot pattern must compile: {e}"))
});

/// Replaces non-breaking and zero-width spaces, collapses runs of whitespace, trims.
pub fn clean_text(text: &str) -> String {
    text.replace(['\u{a0}', '\u{202f}'], " ")
        .replace('\u{200b}', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Folds Turkish letters to ASCII and lowercases, for comparing labels.
pub fn fold_text(text: &str) -> String {
    clean_text(text)
        .chars()
        .map(|c| match c {
            'ı' | 'İ' | 'I' => 'i',
            'ş' | 'Ş' => 's',
            'ğ' | 'Ğ' => 'g',
            'ü' | 'Ü' => 'u',
            'ö' | 'Ö' => 'o',
            'ç' | 'Ç' => 'c',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Header cell text as a lookup key: folded, without trailing colons or dots.
pub fn header_key(text: &str) -> String {
    fold_text(text)
        .trim_end_matches([':', '.', '*'])
        .trim()
        .to_string()
}

/// Parses a number printed with comma or period decimals.
///
/// When both separators occur, the last one is the decimal separator and the
/// other is grouping (`1.250,50` and `1,250.50` are both 1250.5). A lone
/// separator that repeats is grouping (`1.250.000`), as is one followed by
/// exactly three digits after a non-zero integer part (`1.250 TL`). Otherwise
/// it is a decimal separator (`3,45`). Currency and unit suffixes are ignored.
pub fn parse_number(text: &str) -> Option<f64> {
    parse_with(text, true)
}

/// Like [`parse_number`], but a separator that occurs once is always a decimal
/// separator, for grade points and averages printed as `2.750`.
pub fn parse_decimal(text: &str) -> Option<f64> {
    parse_with(text, false)
}

fn parse_with(text: &str, thousands: bool) -> Option<f64> {
    let kept: String = clean_text(text)
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let (negative, digits) = match kept.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, kept.as_str()),
    };
    if digits.contains('-') {
        return None;
    }

    let last_comma = digits.rfind(',');
    let last_dot = digits.rfind('.');
    let normalized = match (last_comma, last_dot) {
        (Some(c), Some(d)) => {
            let (decimal, grouping) = if c > d { (',', '.') } else { ('.', ',') };
            digits.replace(grouping, "").replace(decimal, ".")
        }
        (Some(_), None) => single_separator(digits, ',', thousands),
        (None, Some(_)) => single_separator(digits, '.', thousands),
        (None, None) => digits.to_string(),
    };

    let value: f64 = normalized.parse().ok()?;
    Some(if negative { -value } else { value })
}

fn single_separator(digits: &str, sep: char, thousands: bool) -> String {
    if digits.matches(sep).count() > 1 || (thousands && is_thousands_group(digits, sep)) {
        digits.replace(sep, "")
    } else {
        digits.replace(sep, ".")
    }
}

fn is_thousands_group(digits: &str, sep: char) -> bool {
    match digits.split_once(sep) {
        Some((int, frac)) => {
            !int.is_empty() && !int.starts_with('0') && int.len() <= 3 && frac.len() == 3
        }
        None => false,
    }
}

/// Parses a date in one of the accepted locale formats; a trailing time is ignored.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let cleaned = clean_text(text);
    let first = cleaned.split(' ').next().unwrap_or_default();
    let found = [cleaned.as_str(), first].into_iter().find_map(|candidate| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
    });
    found
}

/// Grade point of a letter grade on the 4.0 scale.
///
/// Covers the Turkish two-letter scale (`AA`…`FF`, `DZ` for failed on
/// attendance) and plus/minus US letters.
pub fn letter_grade_point(grade: &str) -> Option<f64> {
    let point = match clean_text(grade).to_uppercase().as_str() {
        "AA" | "A" => 4.0,
        "A-" => 3.7,
        "BA" => 3.5,
        "B+" => 3.3,
        "BB" | "B" => 3.0,
        "B-" => 2.7,
        "CB" => 2.5,
        "C+" => 2.3,
        "CC" | "C" => 2.0,
        "C-" => 1.7,
        "DC" => 1.5,
        "D+" => 1.3,
        "DD" | "D" => 1.0,
        "FD" => 0.5,
        "FF" | "DZ" | "F" => 0.0,
        _ => return None,
    };
    Some(point)
}

/// Extracts weekly meeting slots such as `Pazartesi 09:00-10:50` or `Wed 13.00 - 14.50`.
///
/// Day names are matched on folded text, so `PAZARTESİ` and `Çarşamba` match too.
pub fn parse_schedule(text: &str) -> Vec<TimeSlot> {
    let folded = fold_text(text);
    SCHEDULE_SLOT
        .captures_iter(&folded)
        .filter_map(|caps| {
            let day = weekday(&caps[1])?;
            let start = time(&caps[2], &caps[3])?;
            let end = time(&caps[4], &caps[5])?;
            (start < end).then_some(TimeSlot { day, start, end })
        })
        .collect()
}

fn weekday(name: &str) -> Option<Weekday> {
    let day = match fold_text(name).as_str() {
        "pazartesi" | "monday" | "mon" => Weekday::Mon,
        "sali" | "tuesday" | "tue" => Weekday::Tue,
        "carsamba" | "wednesday" | "wed" => Weekday::Wed,
        "persembe" | "thursday" | "thu" => Weekday::Thu,
        "cuma" | "friday" | "fri" => Weekday::Fri,
        "cumartesi" | "saturday" | "sat" => Weekday::Sat,
        "pazar" | "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

fn time(hour: &str, minute: &str) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)
}

/// Splits a prerequisite cell into course codes.
pub fn split_codes(text: &str) -> Vec<String> {
    clean_text(text)
        .split([',', ';', '/', '\n'])
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .filter(|code| !matches!(fold_text(code).as_str(), "-" | "yok" | "none" | "n/a"))
        .map(str::to_string)
        .collect()
}

/// Cuts text to at most `max` characters, marking the cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max).collect();
        cut.push('…');
        cut
    }
}
