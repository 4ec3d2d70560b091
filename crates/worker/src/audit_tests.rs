use super::*;

#[test]
fn writes_header_once_then_appends_rows() {
    let dir = tempfile::tempdir().unwrap();
    let log = WorkerAuditLog::new(dir.path().join("processed.csv"));

    log.record_success("abc123", "en", 12.5, 3.2);
    log.record_failure("def456", "es", 1.0, 0.5, "transcribe failed: boom");

    let contents = std::fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "file_id,language,time_taken,audio_minutes,status,reason");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("abc123,en,12.500,3.200,success,"));
    assert!(lines[2].contains(",failure,"));
}

#[test]
fn escapes_commas_in_reason_field() {
    let dir = tempfile::tempdir().unwrap();
    let log = WorkerAuditLog::new(dir.path().join("processed.csv"));

    log.record_failure("abc123", "en", 0.0, 0.0, "boom, and more");

    let contents = std::fs::read_to_string(log.path()).unwrap();
    assert!(contents.contains("\"boom, and more\""));
}
