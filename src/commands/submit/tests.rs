use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rusqlite::Connection;

use super::mapper::{RawSubmission, map_submission, parse_entry_json};
use super::persist::{persist_record, submit_entry};
use super::run::{results_url, run_with_output};
use crate::cli::{StoreArgs, SubmitArgs};
use crate::commands::handled_failure;
use crate::error::LpaError;
use crate::field_map::FieldMap;
use crate::store::{count_rows, open_store, open_test_store};

fn dana_lee_entry(entry_id: &str) -> RawSubmission {
    RawSubmission::from_pairs([
        ("id", entry_id),
        ("24.3", "Dana"),
        ("24.6", "Lee"),
        ("3", "dana@example.com"),
        ("4", "VP Engineering"),
        ("5", "201-500"),
        ("6", "42"),
        ("7", "B2B SaaS"),
        ("8", "High"),
        ("38", "Hybrid"),
        ("10", "10"),
        ("25", "20"),
        ("36", "30"),
        ("27", "5"),
        ("28", "2"),
        ("40", "72.5"),
        ("41", "81.0"),
        ("42", "15.0"),
        ("43", "60.0"),
        ("44", "45.5"),
    ])
}

fn table_counts(connection: &Connection) -> (i64, i64, i64) {
    (
        count_rows(connection, "SELECT COUNT(*) FROM lpa_assessments").expect("count"),
        count_rows(connection, "SELECT COUNT(*) FROM lpa_metrics").expect("count"),
        count_rows(connection, "SELECT COUNT(*) FROM lpa_results").expect("count"),
    )
}

#[test]
fn submit_writes_one_row_per_table_under_a_shared_id() {
    let mut connection = open_test_store();
    let field_map = FieldMap::canonical();

    let stored = submit_entry(&mut connection, &dana_lee_entry("501"), &field_map)
        .expect("submission should store");

    assert_eq!(table_counts(&connection), (1, 1, 1));
    assert_eq!(stored.entry_id, "501");

    let (metrics_id, results_id): (i64, i64) = connection
        .query_row(
            "SELECT m.assessment_id, r.assessment_id
             FROM lpa_metrics m JOIN lpa_results r ON r.assessment_id = m.assessment_id",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("joined row");
    assert_eq!(metrics_id, stored.assessment_id);
    assert_eq!(results_id, stored.assessment_id);

    let (name, workforce, team_size): (String, String, i64) = connection
        .query_row(
            "SELECT respondent_name, workforce_deployment, tech_team_size
             FROM lpa_assessments WHERE assessment_id = ?1",
            [stored.assessment_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("assessment row");
    assert_eq!(name, "Dana Lee");
    assert_eq!(workforce, "Hybrid");
    assert_eq!(team_size, 42);
}

#[test]
fn resubmitting_the_same_entry_creates_a_second_assessment() {
    let mut connection = open_test_store();
    let field_map = FieldMap::canonical();

    let first = submit_entry(&mut connection, &dana_lee_entry("501"), &field_map)
        .expect("first submission");
    let second = submit_entry(&mut connection, &dana_lee_entry("501"), &field_map)
        .expect("second submission");

    assert_ne!(first.assessment_id, second.assessment_id);
    assert_eq!(table_counts(&connection), (2, 2, 2));
}

#[test]
fn missing_numeric_fields_coerce_to_zero() {
    let raw = RawSubmission::from_pairs([("id", "77"), ("24.3", "Sam"), ("6", "lots")]);

    let record = map_submission(&raw, &FieldMap::canonical()).expect("should map");

    assert_eq!(record.assessment.tech_team_size, 0);
    assert_eq!(record.metrics.decision_effectiveness, 0);
    assert_eq!(record.metrics.dependencies, 0);
    assert_eq!(record.results.pipeline_health, 0.0);
    assert_eq!(record.results.leadership_density, 0.0);
    assert_eq!(record.assessment.respondent_name, "Sam");
    assert_eq!(record.assessment.respondent_email, "");
}

#[test]
fn negative_team_size_is_clamped() {
    let raw = RawSubmission::from_pairs([("id", "78"), ("6", "-4")]);
    let record = map_submission(&raw, &FieldMap::canonical()).expect("should map");
    assert_eq!(record.assessment.tech_team_size, 0);
}

#[test]
fn respondent_name_is_trimmed_when_a_part_is_missing() {
    let raw = RawSubmission::from_pairs([("id", "9"), ("24.6", " Lee ")]);
    let record = map_submission(&raw, &FieldMap::canonical()).expect("should map");
    assert_eq!(record.assessment.respondent_name, "Lee");
}

#[test]
fn missing_entry_id_is_a_validation_error_and_writes_nothing() {
    let mut connection = open_test_store();
    let raw = RawSubmission::from_pairs([("id", "   "), ("24.3", "Dana")]);

    let err = submit_entry(&mut connection, &raw, &FieldMap::canonical())
        .expect_err("blank entry id should fail");

    assert!(matches!(err, LpaError::Validation { .. }));
    assert_eq!(table_counts(&connection), (0, 0, 0));
}

#[test]
fn failed_results_insert_rolls_back_the_whole_submission() {
    let mut connection = open_test_store();
    connection
        .execute_batch("DROP TABLE lpa_results")
        .expect("drop results table");

    let record = map_submission(&dana_lee_entry("501"), &FieldMap::canonical())
        .expect("should map");
    let err = persist_record(&mut connection, &record).expect_err("insert should fail");

    match &err {
        LpaError::StorageWrite { entry_id, step, .. } => {
            assert_eq!(entry_id, "501");
            assert_eq!(*step, "insert results");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        err.user_message(),
        "An error occurred processing your submission. Please contact support."
    );

    let assessments = count_rows(&connection, "SELECT COUNT(*) FROM lpa_assessments")
        .expect("count assessments");
    let metrics =
        count_rows(&connection, "SELECT COUNT(*) FROM lpa_metrics").expect("count metrics");
    assert_eq!(assessments, 0);
    assert_eq!(metrics, 0);
}

#[test]
fn custom_field_map_changes_the_source_identifier() {
    let mut field_map = FieldMap::canonical();
    field_map.workforce_deployment = "9".to_string();
    field_map.validate().expect("remapped map is valid");

    let raw = RawSubmission::from_pairs([("id", "3"), ("9", "Remote"), ("38", "Hybrid")]);
    let record = map_submission(&raw, &field_map).expect("should map");
    assert_eq!(record.assessment.workforce_deployment, "Remote");
}

#[test]
fn parse_entry_json_stringifies_scalars_and_skips_nulls() {
    let raw = br#"{"id": 501, "24.3": "Dana", "40": 72.5, "8": null, "12": true}"#;

    let submission = parse_entry_json(raw).expect("entry should parse");

    assert_eq!(submission.get("id"), Some("501"));
    assert_eq!(submission.get("40"), Some("72.5"));
    assert_eq!(submission.get("8"), None);
    assert_eq!(submission.get("12"), Some("1"));
    assert_eq!(submission.sha256.len(), 64);
}

#[test]
fn parse_entry_json_rejects_nested_and_non_object_input() {
    assert!(matches!(
        parse_entry_json(br#"{"id": "1", "24": {"3": "Dana"}}"#),
        Err(LpaError::Validation { .. })
    ));
    assert!(matches!(
        parse_entry_json(b"[1, 2]"),
        Err(LpaError::Validation { .. })
    ));
    assert!(matches!(
        parse_entry_json(b"not json"),
        Err(LpaError::Validation { .. })
    ));
}

#[test]
fn results_url_appends_assessment_parameter() {
    assert_eq!(results_url("/lpa-results/", 17), "/lpa-results/?assessment=17");
    assert_eq!(
        results_url("https://example.com/r?lang=en", 3),
        "https://example.com/r?lang=en&assessment=3"
    );
}

fn submit_args(root: &Path, entry: PathBuf, handoff_path: Option<PathBuf>) -> SubmitArgs {
    SubmitArgs {
        store: StoreArgs {
            data_root: root.to_path_buf(),
            db_path: None,
        },
        entry,
        field_map_path: None,
        handoff_path,
        results_url: "/lpa-results/".to_string(),
        json: false,
    }
}

fn write_entry(root: &Path, body: &str) -> PathBuf {
    let path = root.join("entry.json");
    fs::write(&path, body).expect("write entry file");
    path
}

const DANA_LEE_JSON: &str = r#"{"id": "501", "24.3": "Dana", "24.6": "Lee", "40": "72.5"}"#;

#[test]
fn run_prints_receipt_and_writes_handoff_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let entry = write_entry(dir.path(), DANA_LEE_JSON);

    let mut output = Vec::new();
    let code = run_with_output(submit_args(dir.path(), entry, None), &mut output)
        .expect("submit should run");

    assert_eq!(code, ExitCode::SUCCESS);
    let printed = String::from_utf8(output).expect("utf8");
    assert!(printed.contains("assessment_id: 1\n"));
    assert!(printed.contains("results_url: /lpa-results/?assessment=1\n"));

    let handoff = fs::read_to_string(dir.path().join("handoff").join("last_submission.json"))
        .expect("hand-off file");
    let handoff: serde_json::Value = serde_json::from_str(&handoff).expect("hand-off json");
    assert_eq!(handoff["assessment_id"], 1);
    assert_eq!(handoff["entry_id"], "501");
    assert_eq!(handoff["results_url"], "/lpa-results/?assessment=1");
}

#[test]
fn unwritable_handoff_still_reports_the_stored_assessment() {
    let dir = tempfile::tempdir().expect("temp dir");
    let entry = write_entry(dir.path(), DANA_LEE_JSON);
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").expect("write blocker file");

    let mut output = Vec::new();
    let code = run_with_output(
        submit_args(dir.path(), entry, Some(blocker.join("last_submission.json"))),
        &mut output,
    )
    .expect("a failed hand-off is not a tool failure");

    assert_eq!(code, ExitCode::SUCCESS);
    assert!(
        String::from_utf8(output)
            .expect("utf8")
            .contains("assessment_id: 1\n")
    );
    let connection = open_store(&dir.path().join("lpa.sqlite")).expect("store");
    assert_eq!(table_counts(&connection), (1, 1, 1));
}

#[test]
fn run_reports_rejected_entry_in_prose_with_exit_code_two() {
    let dir = tempfile::tempdir().expect("temp dir");
    let entry = write_entry(dir.path(), "[1, 2]");

    let mut output = Vec::new();
    let code = run_with_output(submit_args(dir.path(), entry, None), &mut output)
        .expect("rejection is handled");

    assert_eq!(code, handled_failure());
    assert_eq!(
        String::from_utf8(output).expect("utf8"),
        "Submission rejected: entry must be a JSON object.\n"
    );
    assert!(!dir.path().join("lpa.sqlite").exists());
    assert!(!dir.path().join("handoff").exists());
}
