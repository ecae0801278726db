use super::common::{faculty, tag, Env};
use nfc_attendance::directory::SqliteTagDirectory;
use nfc_attendance::model::ScanOutcome;
use nfc_attendance::scan::ScanRecorder;
use nfc_attendance::store::Database;
use nfc_attendance::AttendanceError;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

#[test]
fn test_fifty_concurrent_taps_record_once() {
    let env = Env::new(1);
    let session = env.manager.open_session("CS101", &faculty("F1")).unwrap();
    let barrier = Barrier::new(50);

    let outcomes: Vec<ScanOutcome> = thread::scope(|s| {
        let handles: Vec<_> = (0..50)
            .map(|_| {
                // Each thread gets its own handle, as a separate process would.
                let db = Database::open_with_timeout(env.db.path(), Duration::from_secs(30))
                    .unwrap();
                let recorder = ScanRecorder::new(db.clone(), SqliteTagDirectory::new(db));
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    recorder.record_scan(&tag(1), session.id).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let accepted: Vec<_> = outcomes.iter().filter(|o| o.is_accepted()).collect();
    assert_eq!(accepted.len(), 1);
    assert_eq!(outcomes.len() - accepted.len(), 49);

    let first = accepted[0].recorded_at();
    assert!(outcomes.iter().all(|o| o.recorded_at() == first));
    assert_eq!(env.ledger_rows(session.id.0), 1);
}

#[test]
fn test_concurrent_taps_from_many_students() {
    let env = Env::new(20);
    let session = env.manager.open_session("CS101", &faculty("F1")).unwrap();

    // Every student taps three times, all at once.
    let outcomes: Vec<ScanOutcome> = thread::scope(|s| {
        let handles: Vec<_> = (1..=20)
            .flat_map(|i| std::iter::repeat(i).take(3))
            .map(|i| {
                let recorder = env.recorder.clone();
                s.spawn(move || recorder.record_scan(&tag(i), session.id).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|o| o.is_accepted()).count(), 20);
    assert_eq!(env.manager.get_session(session.id).unwrap().scan_count, 20);
}

#[test]
fn test_close_racing_scans_never_loses_accepted_records() {
    let env = Env::new(30);
    let f1 = faculty("F1");
    let session = env.manager.open_session("CS101", &f1).unwrap();
    let barrier = Barrier::new(31);

    let (results, closed) = thread::scope(|s| {
        let scans: Vec<_> = (1..=30)
            .map(|i| {
                let recorder = env.recorder.clone();
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    (i, recorder.record_scan(&tag(i), session.id))
                })
            })
            .collect();

        let manager = env.manager.clone();
        let f1 = f1.clone();
        let barrier = &barrier;
        let closer = s.spawn(move || {
            barrier.wait();
            manager.close_session(session.id, &f1).unwrap()
        });

        let results: Vec<_> = scans.into_iter().map(|h| h.join().unwrap()).collect();
        (results, closer.join().unwrap())
    });

    let mut accepted = 0;
    for (i, result) in &results {
        match result {
            Ok(outcome) => {
                assert!(outcome.is_accepted(), "student {i} should be first tap");
                assert!(outcome.recorded_at() <= closed.closed_at.unwrap());
                accepted += 1;
            }
            Err(AttendanceError::SessionClosed(_)) => {}
            Err(other) => panic!("Unexpected error for student {i}: {other:?}"),
        }
    }

    // Every accepted scan is visible, and nothing else is.
    let view = env.manager.get_session(session.id).unwrap();
    assert_eq!(view.scan_count, accepted);
    assert_eq!(closed.scan_count, accepted);
    assert_eq!(env.ledger_rows(session.id.0), accepted as i64);
}

#[test]
fn test_delete_after_racing_close_leaves_no_orphans() {
    let env = Env::new(10);
    let f1 = faculty("F1");
    let session = env.manager.open_session("CS101", &f1).unwrap();

    thread::scope(|s| {
        for i in 1..=10 {
            let recorder = env.recorder.clone();
            s.spawn(move || {
                let _ = recorder.record_scan(&tag(i), session.id);
            });
        }
        let manager = env.manager.clone();
        let f1 = f1.clone();
        s.spawn(move || {
            manager.close_session(session.id, &f1).unwrap();
        });
    });

    let before = env.ledger_rows(session.id.0);
    let removed = env.manager.delete_session(session.id, &f1).unwrap();
    assert_eq!(removed as i64, before);
    assert_eq!(env.ledger_rows(session.id.0), 0);
}

#[test]
fn test_concurrent_close_only_one_wins() {
    let env = Env::new(0);
    let f1 = faculty("F1");
    let session = env.manager.open_session("CS101", &f1).unwrap();

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = env.manager.clone();
                let f1 = f1.clone();
                s.spawn(move || manager.close_session(session.id, &f1))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AttendanceError::AlreadyClosed(_))));
}
