use super::*;
use td_core::FakeClock;

#[test]
fn writes_header_once_then_appends_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = AuditLog::new(dir.path().join("processed.csv"));
    let clock = FakeClock::new(1_000);

    log.record(&clock, "/a/clip.mp3", "abc", "10.0.0.1", "")
        .unwrap();
    log.record(&clock, "/a/clip2.mp3", "def", "10.0.0.1", "boom")
        .unwrap();

    let contents = std::fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "filepath,fileid,ip,datetime,error");
    assert_eq!(lines.len(), 3);
    assert!(lines[2].ends_with(",boom"));
}

#[test]
fn escapes_commas_in_error_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = AuditLog::new(dir.path().join("processed.csv"));
    let clock = FakeClock::new(1_000);

    log.record(&clock, "/a/clip.mp3", "abc", "10.0.0.1", "missing, malformed")
        .unwrap();

    let contents = std::fs::read_to_string(log.path()).unwrap();
    assert!(contents.contains("\"missing, malformed\""));
}
