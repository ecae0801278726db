use super::common::{faculty, student, tag, Env};
use nfc_attendance::directory::TagDirectory;
use nfc_attendance::model::{SessionId, TagId};
use nfc_attendance::AttendanceError;
use std::time::Duration;

#[test]
fn test_unbound_tag_creates_no_record() {
    let env = Env::new(1);
    let session = env.manager.open_session("CS101", &faculty("F1")).unwrap();

    let result = env
        .recorder
        .record_scan(&TagId::new("DEADBEEF").unwrap(), session.id);
    match result {
        Err(AttendanceError::UnknownTag(t)) => assert_eq!(t.as_str(), "DEADBEEF"),
        other => panic!("Expected UnknownTag, got {:?}", other),
    }
    assert_eq!(env.ledger_rows(session.id.0), 0);
}

#[test]
fn test_unknown_tag_checked_before_session() {
    let env = Env::new(0);
    assert!(matches!(
        env.recorder
            .record_scan(&TagId::new("DEADBEEF").unwrap(), SessionId(1_000)),
        Err(AttendanceError::UnknownTag(_))
    ));
}

#[test]
fn test_scan_missing_session() {
    let env = Env::new(1);
    assert!(matches!(
        env.recorder.record_scan(&tag(1), SessionId(1_000)),
        Err(AttendanceError::NotFound(_))
    ));
}

#[test]
fn test_tag_case_is_ignored() {
    let env = Env::new(1);
    let session = env.manager.open_session("CS101", &faculty("F1")).unwrap();

    let lower = TagId::new("t001").unwrap();
    assert!(env
        .recorder
        .record_scan(&lower, session.id)
        .unwrap()
        .is_accepted());
    assert!(!env
        .recorder
        .record_scan(&tag(1), session.id)
        .unwrap()
        .is_accepted());
}

#[test]
fn test_rebound_tag_counts_new_student() {
    let env = Env::new(2);
    let session = env.manager.open_session("CS101", &faculty("F1")).unwrap();
    env.recorder.record_scan(&tag(1), session.id).unwrap();

    // Student 1 gets a replacement tag; the old tag is freed.
    let directory = env.recorder.directory();
    directory
        .register_student(&student(1), "Student 1", &TagId::new("NEW1").unwrap())
        .unwrap();
    assert_eq!(directory.resolve_tag(&tag(1)).unwrap(), None);

    // The replacement tag still maps to the already-recorded student.
    assert!(!env
        .recorder
        .record_scan(&TagId::new("NEW1").unwrap(), session.id)
        .unwrap()
        .is_accepted());
    assert_eq!(env.manager.get_session(session.id).unwrap().scan_count, 1);
}

#[test]
fn test_removed_student_keeps_recorded_scan() {
    let env = Env::new(1);
    let session = env.manager.open_session("CS101", &faculty("F1")).unwrap();
    env.recorder.record_scan(&tag(1), session.id).unwrap();

    env.recorder.directory().remove_student(&student(1)).unwrap();

    assert_eq!(env.manager.get_session(session.id).unwrap().scan_count, 1);
    assert!(matches!(
        env.recorder.record_scan(&tag(1), session.id),
        Err(AttendanceError::UnknownTag(_))
    ));
}

#[test]
fn test_scan_count_read_from_ledger() {
    let env = Env::new(3);
    let session = env.manager.open_session("CS101", &faculty("F1")).unwrap();
    for i in 1..=3 {
        env.recorder.record_scan(&tag(i), session.id).unwrap();
        assert_eq!(
            env.manager.get_session(session.id).unwrap().scan_count,
            i as u64
        );
    }
}

#[test]
fn test_scan_under_held_write_lock_is_unavailable_and_retryable() {
    let env = Env::new(1);
    let session = env.manager.open_session("CS101", &faculty("F1")).unwrap();
    let (_, recorder) = env.impatient(Duration::from_millis(50));

    let lock = env.hold_write_lock();
    let err = recorder.record_scan(&tag(1), session.id).unwrap_err();
    assert!(matches!(err, AttendanceError::Unavailable(_)), "got {err:?}");
    assert!(err.is_retryable());
    assert_eq!(env.ledger_rows(session.id.0), 0);

    lock.execute_batch("ROLLBACK").unwrap();
    assert!(recorder.record_scan(&tag(1), session.id).unwrap().is_accepted());
    assert_eq!(env.ledger_rows(session.id.0), 1);
}
