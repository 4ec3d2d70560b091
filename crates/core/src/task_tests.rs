use super::*;

#[test]
fn status_round_trips_through_str() {
    for status in [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ] {
        let s = status.as_str();
        assert_eq!(TaskStatus::from_str(s), Some(status));
    }
}

#[test]
fn unknown_status_string_is_none() {
    assert_eq!(TaskStatus::from_str("bogus"), None);
}

#[test]
fn new_pending_row_has_no_lease_or_assignee() {
    let row = TaskRow::new_pending("/a/clip.mp3");
    assert_eq!(row.status, TaskStatus::Pending);
    assert!(row.lease_expiry.is_none());
    assert!(row.assignee.is_none());
    assert!(row.task_id.is_none());
}
