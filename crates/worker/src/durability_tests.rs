use super::*;

#[test]
fn ensure_creates_all_three_bins() {
    let dir = tempfile::tempdir().unwrap();
    let bins = DurabilityBins::ensure(dir.path()).unwrap();
    assert!(bins.uploaded_dir().is_dir());
    assert!(bins.not_uploaded_dir().is_dir());
    assert!(bins.failed_report_dir().is_dir());
}

#[test]
fn move_to_uploaded_relocates_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let bins = DurabilityBins::ensure(dir.path()).unwrap();
    let src = dir.path().join("abc123.vtt");
    std::fs::write(&src, "WEBVTT").unwrap();

    let dest = bins.move_to_uploaded(&src, "abc123").unwrap();
    assert!(!src.exists());
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "WEBVTT");
    assert_eq!(dest, bins.uploaded_dir().join("abc123.vtt"));
}

#[test]
fn failed_report_marker_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let bins = DurabilityBins::ensure(dir.path()).unwrap();

    assert!(!bins.has_failed_report("abc123"));
    bins.mark_failed_report("abc123").unwrap();
    assert!(bins.has_failed_report("abc123"));
    bins.clear_failed_report("abc123").unwrap();
    assert!(!bins.has_failed_report("abc123"));
}

#[test]
fn clear_failed_report_is_idempotent_when_absent() {
    let dir = tempfile::tempdir().unwrap();
    let bins = DurabilityBins::ensure(dir.path()).unwrap();
    bins.clear_failed_report("never-marked").unwrap();
}

#[test]
fn list_not_uploaded_finds_only_vtt_files() {
    let dir = tempfile::tempdir().unwrap();
    let bins = DurabilityBins::ensure(dir.path()).unwrap();
    std::fs::write(bins.not_uploaded_dir().join("a.vtt"), "WEBVTT").unwrap();
    std::fs::write(bins.not_uploaded_dir().join(".gitkeep"), "").unwrap();

    let found = bins.list_not_uploaded().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, "a");
}

#[test]
fn list_failed_report_lists_marker_names() {
    let dir = tempfile::tempdir().unwrap();
    let bins = DurabilityBins::ensure(dir.path()).unwrap();
    bins.mark_failed_report("a").unwrap();
    bins.mark_failed_report("b").unwrap();

    let mut found = bins.list_failed_report().unwrap();
    found.sort();
    assert_eq!(found, vec!["a".to_string(), "b".to_string()]);
}
