//! Extraction from pages saved to disk: the same file always yields the same
//! records and warnings, and the JSON output is stable.

use std::io::Write;

use obs_client::{ExtractorRegistry, ObsError, PageKind, StructureReason};
use tempfile::{NamedTempFile, TempDir};

/// Helper function to save a page to a temporary file
fn save_page(html: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(html.as_bytes()).expect("Failed to write page");
    file.flush().expect("Failed to flush file");
    file
}

#[test]
fn test_saved_pages_extract_deterministically() {
    let pages = [
        (PageKind::Profile, include_str!("fixtures/profile.html")),
        (PageKind::Announcements, include_str!("fixtures/profile.html")),
        (PageKind::Transcript, include_str!("fixtures/transcript.html")),
        (PageKind::Courses, include_str!("fixtures/courses.html")),
        (PageKind::Fees, include_str!("fixtures/fees.html")),
        (PageKind::Attendance, include_str!("fixtures/attendance.html")),
        (PageKind::WeeklySchedule, include_str!("fixtures/schedule.html")),
        (PageKind::Messages, include_str!("fixtures/messages.html")),
        (PageKind::OnlineEducation, include_str!("fixtures/home.html")),
    ];
    let registry = ExtractorRegistry::default();

    for (page, html) in pages {
        let file = save_page(html);
        let saved = std::fs::read_to_string(file.path()).expect("Failed to read page back");

        let first = registry.extract(page, &saved).expect("extract");
        let second = registry.extract(page, &saved).expect("extract again");
        assert_eq!(first, second, "{page} extraction is not deterministic");
        assert!(!first.records.is_empty(), "{page} produced no records");

        let first_json = serde_json::to_string(&first).expect("serialize");
        let second_json = serde_json::to_string(&second).expect("serialize");
        assert_eq!(first_json, second_json);
    }
}

#[test]
fn test_json_output_shape() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("fees.json");

    let result = ExtractorRegistry::default()
        .extract(PageKind::Fees, include_str!("fixtures/fees.html"))
        .expect("extract");
    std::fs::write(&path, serde_json::to_vec_pretty(&result).expect("serialize")).expect("write");

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("parse");
    assert_eq!(json["page"], "fees");
    assert_eq!(json["records"]["type"], "fees");
    let fees = json["records"]["records"].as_array().expect("records array");
    assert_eq!(fees.len(), 3);
    assert_eq!(fees[1]["status"], "unpaid");
    assert_eq!(fees[1]["due_date"], "2025-02-15");
    assert_eq!(fees[2]["paid_amount"], serde_json::Value::Null);
}

#[test]
fn test_saved_login_page_is_not_a_transcript() {
    let file = save_page(include_str!("fixtures/login.html"));
    let saved = std::fs::read_to_string(file.path()).expect("read");
    let err = ExtractorRegistry::default()
        .extract(PageKind::Transcript, &saved)
        .unwrap_err();
    assert!(matches!(
        err,
        ObsError::StructureNotFound { reason: StructureReason::AnchorMissing, .. }
    ));
}

#[test]
fn test_table_dump_json_shape() {
    let file = save_page(include_str!("fixtures/messages.html"));
    let saved = std::fs::read_to_string(file.path()).expect("read");
    let result = ExtractorRegistry::default()
        .extract(PageKind::Messages, &saved)
        .expect("extract");

    let json = serde_json::to_value(&result).expect("serialize");
    assert_eq!(json["page"], "messages");
    assert_eq!(json["records"]["type"], "tables");
    let table = &json["records"]["records"][0];
    assert_eq!(table["headers"][1], "Konu");
    assert_eq!(table["rows"][0]["Gönderen"], "Dr. Öğr. Üyesi Mehmet KAYA");
    assert_eq!(table["rows"].as_array().map(Vec::len), Some(2));
}
