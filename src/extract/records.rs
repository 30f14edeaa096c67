//! Table-backed pages: transcript, courses, fees and attendance.

use super::normalize::{fold_text, letter_grade_point, parse_schedule, split_codes};
use super::table::{Anchor, FieldSpec, RowReader, TableRows, TableRule};
use super::{ExtractionWarning, PageRecords};
use crate::models::{AttendanceRecord, CourseEntry, FeeRecord, PaymentStatus, TranscriptEntry};

const CODE: &[&str] = &["ders kodu", "kod", "course code", "code"];
const COURSE_NAME: &[&str] = &["ders adi", "ders", "course name", "course"];
const CREDIT: &[&str] = &["akts", "kredi", "ects", "credit"];
const TERM: &[&str] = &["donem", "yariyil", "term", "semester"];

/// Which record type a table rule produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Transcript,
    Courses,
    Fees,
    Attendance,
}

impl TableKind {
    /// Builds typed records from the rows `rule` read.
    pub fn build(self, rows: &TableRows, rule: &TableRule) -> (PageRecords, Vec<ExtractionWarning>) {
        let mut warnings = Vec::new();
        let records = match self {
            TableKind::Transcript => {
                PageRecords::Transcript(build_rows(rows, rule, &mut warnings, transcript_entry, ordered_by_term))
            }
            TableKind::Courses => PageRecords::Courses(build_rows(rows, rule, &mut warnings, course_entry, |v| v)),
            TableKind::Fees => PageRecords::Fees(build_rows(rows, rule, &mut warnings, fee_record, |v| v)),
            TableKind::Attendance => {
                PageRecords::Attendance(build_rows(rows, rule, &mut warnings, attendance_record, |v| v))
            }
        };
        (records, warnings)
    }
}

fn build_rows<R>(
    rows: &TableRows,
    rule: &TableRule,
    warnings: &mut Vec<ExtractionWarning>,
    build: fn(&mut RowReader<'_>) -> Option<R>,
    finish: fn(Vec<R>) -> Vec<R>,
) -> Vec<R> {
    let mut records = Vec::with_capacity(rows.rows.len());
    for row in &rows.rows {
        let mut reader = RowReader::new(row, rule, &rows.missing_columns);
        if let Some(record) = build(&mut reader) {
            warnings.extend(reader.into_warnings());
            records.push(record);
        }
    }
    finish(records)
}

pub fn transcript_rule() -> TableRule {
    TableRule {
        anchors: vec![
            Anchor::selector("[id$='gridTranskript']"),
            Anchor::selector("[id$='gridNotlar']"),
            Anchor::table_containing("ders kodu"),
        ],
        columns: vec![
            FieldSpec::key("course_code", CODE, Some(0)),
            FieldSpec::optional("term", TERM, None),
            FieldSpec::expected("course_name", COURSE_NAME, Some(1)),
            FieldSpec::expected("credit", CREDIT, Some(2)),
            FieldSpec::expected("grade", &["harf notu", "basari notu", "not", "letter grade", "grade"], Some(3)),
            FieldSpec::optional("grade_point", &["katsayi", "not puani", "grade point", "points"], None),
        ],
        section_rows: true,
    }
}

fn transcript_entry(row: &mut RowReader<'_>) -> Option<TranscriptEntry> {
    let course_code = row.text("course_code")?;
    let term = row.text("term").or_else(|| row.section());
    let course_name = row.text("course_name");
    let credit = row.number("credit");
    let grade = row.text("grade");
    let grade_point = row
        .decimal("grade_point")
        .or_else(|| grade.as_deref().and_then(letter_grade_point));
    Some(TranscriptEntry {
        term,
        course_code,
        course_name,
        credit,
        grade,
        grade_point,
        provenance: row.provenance(),
    })
}

/// Groups entries by term in order of first appearance, keeping row order within a term.
fn ordered_by_term(mut entries: Vec<TranscriptEntry>) -> Vec<TranscriptEntry> {
    let mut terms: Vec<Option<String>> = Vec::new();
    for entry in &entries {
        if !terms.contains(&entry.term) {
            terms.push(entry.term.clone());
        }
    }
    entries.sort_by_key(|entry| terms.iter().position(|t| *t == entry.term));
    entries
}

pub fn courses_rule() -> TableRule {
    TableRule {
        anchors: vec![
            Anchor::selector("[id$='gridDersler']"),
            Anchor::selector("[id$='gridDersProgrami']"),
            Anchor::table_containing("ders kodu"),
        ],
        columns: vec![
            FieldSpec::key("code", CODE, Some(0)),
            FieldSpec::expected("name", COURSE_NAME, Some(1)),
            FieldSpec::expected("instructor", &["ogretim elemani", "ogretim uyesi", "instructor", "hoca"], Some(2)),
            FieldSpec::expected("schedule", &["gun/saat", "ders saati", "gun", "saat", "schedule", "time"], Some(3)),
            FieldSpec::expected("credit", CREDIT, Some(4)),
            FieldSpec::optional(
                "prerequisites",
                &["on kosul", "onkosul", "on sart", "prerequisites", "prerequisite"],
                None,
            ),
        ],
        section_rows: false,
    }
}

fn course_entry(row: &mut RowReader<'_>) -> Option<CourseEntry> {
    let code = row.text("code")?;
    let name = row.text("name");
    let instructor = row.text("instructor");
    let schedule_text = row.text("schedule");
    let schedule = schedule_text.as_deref().map(parse_schedule).unwrap_or_default();
    if let Some(text) = schedule_text.as_deref().filter(|_| schedule.is_empty()) {
        row.note_unparseable("schedule", text);
    }
    let credit = row.number("credit");
    let prerequisites = row
        .text("prerequisites")
        .map(|text| split_codes(&text))
        .unwrap_or_default();
    Some(CourseEntry {
        code,
        name,
        instructor,
        schedule_text,
        schedule,
        credit,
        prerequisites,
        provenance: row.provenance(),
    })
}

pub fn fees_rule() -> TableRule {
    TableRule {
        anchors: vec![
            Anchor::selector("[id$='gridHarc']"),
            Anchor::selector("[id$='gridOdemeler']"),
            Anchor::table_containing("tutar"),
        ],
        columns: vec![
            FieldSpec::optional("term", TERM, Some(0)),
            FieldSpec::expected("description", &["aciklama", "odeme turu", "ucret turu", "description"], Some(1)),
            FieldSpec::key("amount", &["tutar", "borc", "ucret", "amount"], Some(2)),
            FieldSpec::optional("paid_amount", &["odenen", "odenen tutar", "paid"], Some(3)),
            FieldSpec::expected("due_date", &["son odeme tarihi", "son odeme", "vade", "due date", "due"], Some(4)),
            FieldSpec::optional("status", &["durum", "odeme durumu", "status"], Some(5)),
        ],
        section_rows: false,
    }
}

/// Interprets a payment status cell.
fn payment_status(text: &str) -> Option<PaymentStatus> {
    let folded = fold_text(text);
    if contains_any(&folded, &["odenmedi", "odenmemis", "unpaid", "borclu", "bekliyor"]) {
        Some(PaymentStatus::Unpaid)
    } else if contains_any(&folded, &["odendi", "odenmis", "paid", "tamam"]) {
        Some(PaymentStatus::Paid)
    } else {
        None
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn is_total_row(text: Option<&str>) -> bool {
    text.map(fold_text)
        .is_some_and(|t| t.starts_with("toplam") || t.starts_with("genel toplam") || t.starts_with("total"))
}

fn fee_record(row: &mut RowReader<'_>) -> Option<FeeRecord> {
    let term = row.text("term");
    if is_total_row(term.as_deref()) {
        return None;
    }
    let description = row.text("description");
    if is_total_row(description.as_deref()) {
        return None;
    }
    let amount = row.number("amount");
    let paid_amount = row.number("paid_amount");
    let due_date = row.date("due_date");
    let status = match row.text("status") {
        Some(text) => payment_status(&text).unwrap_or_else(|| {
            row.note_unparseable("status", &text);
            PaymentStatus::Unknown
        }),
        None => PaymentStatus::Unknown,
    };
    Some(FeeRecord {
        term,
        description,
        amount,
        paid_amount,
        due_date,
        status,
        provenance: row.provenance(),
    })
}

pub fn attendance_rule() -> TableRule {
    TableRule {
        anchors: vec![
            Anchor::selector("[id$='gridDevamsizlik']"),
            Anchor::selector("[id$='gridYoklama']"),
            Anchor::table_containing("devamsizlik"),
        ],
        columns: vec![
            FieldSpec::key("course_code", CODE, Some(0)),
            FieldSpec::expected("course_name", COURSE_NAME, Some(1)),
            FieldSpec::expected(
                "total_hours",
                &["toplam saat", "toplam ders saati", "ders saati", "total hours", "total"],
                Some(2),
            ),
            FieldSpec::expected(
                "absent_hours",
                &["devamsizlik", "devamsiz saat", "devamsizlik saati", "absent", "absence"],
                Some(3),
            ),
            FieldSpec::optional(
                "absence_limit",
                &["devamsizlik siniri", "devamsizlik hakki", "sinir", "limit"],
                Some(4),
            ),
        ],
        section_rows: false,
    }
}

fn attendance_record(row: &mut RowReader<'_>) -> Option<AttendanceRecord> {
    let course_code = row.text("course_code")?;
    Some(AttendanceRecord {
        course_code,
        course_name: row.text("course_name"),
        total_hours: row.number("total_hours"),
        absent_hours: row.number("absent_hours"),
        absence_limit: row.number("absence_limit"),
        provenance: row.provenance(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::table::read_table;
    use scraper::Html;

    fn build(kind: TableKind, rule: TableRule, html: &str) -> (PageRecords, Vec<ExtractionWarning>) {
        let document = Html::parse_document(html);
        let table = rule.find(&document).expect("table");
        let rows = read_table(table, &rule);
        let (records, mut warnings) = kind.build(&rows, &rule);
        let mut all = rows.warnings;
        all.append(&mut warnings);
        (records, all)
    }

    #[test]
    fn test_transcript_grade_points_from_letters() {
        let (records, _) = build(
            TableKind::Transcript,
            transcript_rule(),
            "<table id='gridNotlar'><tr><th>Ders Kodu</th><th>Ders Adı</th><th>Kredi</th><th>Not</th></tr>
             <tr><td>BIL101</td><td>Programlama</td><td>6</td><td>BA</td></tr></table>",
        );
        let PageRecords::Transcript(entries) = records else { panic!("transcript") };
        assert_eq!(entries[0].grade_point, Some(3.5));
        assert_eq!(entries[0].credit, Some(6.0));
        assert!(!entries[0].provenance.is_partial());
    }

    #[test]
    fn test_transcript_prefers_printed_grade_point() {
        let (records, _) = build(
            TableKind::Transcript,
            transcript_rule(),
            "<table id='gridNotlar'><tr><th>Ders Kodu</th><th>Ders Adı</th><th>Kredi</th><th>Harf Notu</th><th>Katsayı</th></tr>
             <tr><td>BIL101</td><td>Programlama</td><td>6</td><td>BA</td><td>3,40</td></tr></table>",
        );
        let PageRecords::Transcript(entries) = records else { panic!("transcript") };
        assert_eq!(entries[0].grade_point, Some(3.4));
    }

    #[test]
    fn test_transcript_groups_interleaved_terms() {
        let entries = ordered_by_term(
            ["A", "B", "A"]
                .iter()
                .enumerate()
                .map(|(i, term)| TranscriptEntry {
                    term: Some(term.to_string()),
                    course_code: format!("C{i}"),
                    course_name: None,
                    credit: None,
                    grade: None,
                    grade_point: None,
                    provenance: Default::default(),
                })
                .collect(),
        );
        let codes: Vec<_> = entries.iter().map(|e| e.course_code.as_str()).collect();
        assert_eq!(codes, vec!["C0", "C2", "C1"]);
    }

    #[test]
    fn test_unparseable_schedule_marks_course_partial() {
        let (records, warnings) = build(
            TableKind::Courses,
            courses_rule(),
            "<table id='gridDersler'><tr><th>Ders Kodu</th><th>Ders Adı</th><th>Öğretim Elemanı</th><th>Gün/Saat</th><th>AKTS</th></tr>
             <tr><td>BIL401</td><td>Proje</td><td>Dr. X</td><td>Belirtilmemiş</td><td>4</td></tr></table>",
        );
        let PageRecords::Courses(courses) = records else { panic!("courses") };
        assert!(courses[0].schedule.is_empty());
        assert_eq!(courses[0].schedule_text.as_deref(), Some("Belirtilmemiş"));
        assert!(courses[0].provenance.is_partial());
        assert!(warnings
            .iter()
            .any(|w| w.field.as_deref() == Some("schedule")));
    }

    #[test]
    fn test_payment_status_words() {
        assert_eq!(payment_status("Ödendi"), Some(PaymentStatus::Paid));
        assert_eq!(payment_status("ÖDENMEDİ"), Some(PaymentStatus::Unpaid));
        assert_eq!(payment_status("Unpaid"), Some(PaymentStatus::Unpaid));
        assert_eq!(payment_status("?"), None);
    }

    #[test]
    fn test_fee_total_rows_are_dropped() {
        let (records, warnings) = build(
            TableKind::Fees,
            fees_rule(),
            "<table id='gridHarc'><tr><th>Dönem</th><th>Açıklama</th><th>Tutar</th><th>Son Ödeme Tarihi</th></tr>
             <tr><td>2024 Güz</td><td>Katkı Payı</td><td>1.250,00 TL</td><td>15.09.2024</td></tr>
             <tr><td>Toplam</td><td></td><td>1.250,00 TL</td><td></td></tr></table>",
        );
        let PageRecords::Fees(fees) = records else { panic!("fees") };
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].amount, Some(1250.0));
        assert_eq!(fees[0].status, PaymentStatus::Unknown);
        assert!(warnings.is_empty());
    }
}
