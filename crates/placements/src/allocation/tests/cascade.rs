use std::sync::Arc;

use chrono::Utc;

use super::common::*;
use crate::allocation::checks::student_assigned_elsewhere;
use crate::allocation::coordinator::{reconcile, AllocationService, CoordinatorConfig};
use crate::allocation::domain::StudentId;
use crate::allocation::store::{CleanupIntent, RecordStore};

#[test]
fn delete_cascades_over_every_assigned_student() {
    let store = seeded_store();
    let (service, _) = build_service(store.clone());
    let id = approved_posting(&service, 3);
    let students = ["s1", "s2", "s3"].map(|s| StudentId(s.to_string()));
    for sid in &students {
        service
            .assign_student(&actor(), &id, sid)
            .expect("assignment succeeds");
    }

    service.delete(&actor(), &id).expect("delete succeeds");

    for sid in &students {
        assert!(
            !store.student(sid).expect("student").has_active_internship,
            "cascade must clear {sid}"
        );
        assert_eq!(store.active_assignment(sid).expect("index readable"), None);
    }
    assert!(
        store.pending_cleanups().expect("log readable").is_empty(),
        "a finished cascade leaves no pending intent"
    );
    assert_eq!(
        student_assigned_elsewhere(
            &store.internships().expect("listing works"),
            &students[0],
            None
        ),
        None
    );
}

#[test]
fn delete_releases_an_assignment_that_raced_the_cascade() {
    let seeded = seeded_store();
    let sid = StudentId("s1".to_string());
    let (setup, _) = build_service(seeded.clone());
    let id = approved_posting(&setup, 2);

    // The wrapper lands one more assignment after delete has read the
    // posting but before the removal executes.
    let racing = Arc::new(RacingDeleteStore::racing((*seeded).clone(), sid.clone()));
    let service = AllocationService::new(
        racing,
        Arc::new(MemoryNotifier::default()),
        CoordinatorConfig::default(),
    );
    service.delete(&actor(), &id).expect("delete succeeds");

    assert!(
        !seeded.student(&sid).expect("student").has_active_internship,
        "the late assignment must be released with the posting"
    );
    assert_eq!(seeded.active_assignment(&sid).expect("index readable"), None);
    assert!(seeded.pending_cleanups().expect("log readable").is_empty());
}

#[test]
fn reconciliation_sweeps_claims_left_by_an_unlogged_delete() {
    let store = seeded_store();
    let (service, _) = build_service(store.clone());
    let id = approved_posting(&service, 1);
    let sid = StudentId("s1".to_string());
    service.assign_student(&actor(), &id, &sid).expect("assign");

    // The posting vanished and no intent names the student.
    store.remove_internship(&id).expect("posting removed");
    assert!(store.pending_cleanups().expect("log readable").is_empty());

    let repaired = reconcile(&*store).expect("reconciliation runs");
    assert_eq!(repaired, 1);
    assert!(!store.student(&sid).expect("student").has_active_internship);
    assert_eq!(store.active_assignment(&sid).expect("index readable"), None);

    // The student is assignable again.
    let next = approved_posting(&service, 1);
    service
        .assign_student(&actor(), &next, &sid)
        .expect("swept student is free");
}

#[test]
fn an_interrupted_cascade_is_repaired_by_reconciliation() {
    let store = seeded_store();
    let (service, _) = build_service(store.clone());
    let id = approved_posting(&service, 2);
    let s1 = StudentId("s1".to_string());
    let s2 = StudentId("s2".to_string());
    service.assign_student(&actor(), &id, &s1).expect("assign s1");
    service.assign_student(&actor(), &id, &s2).expect("assign s2");

    // Simulate a crash between the removal and the claim cleanup: the
    // intent is logged and the posting is gone, but the claims dangle.
    store
        .log_cleanup(CleanupIntent {
            internship: id.clone(),
            students: vec![s1.clone(), s2.clone()],
            logged_at: Utc::now(),
        })
        .expect("intent logged");
    store.remove_internship(&id).expect("posting removed");
    assert!(store.student(&s1).expect("student").has_active_internship);

    let repaired = reconcile(&*store).expect("reconciliation runs");
    assert_eq!(repaired, 1);

    for sid in [&s1, &s2] {
        assert!(!store.student(sid).expect("student").has_active_internship);
        assert_eq!(store.active_assignment(sid).expect("index readable"), None);
    }
    assert!(store.pending_cleanups().expect("log readable").is_empty());
}

#[test]
fn reconciliation_resolves_intents_whose_delete_never_happened() {
    let store = seeded_store();
    let (service, _) = build_service(store.clone());
    let id = approved_posting(&service, 1);
    let sid = StudentId("s1".to_string());
    service.assign_student(&actor(), &id, &sid).expect("assign");

    // The crash happened before the removal: posting and claim are intact.
    store
        .log_cleanup(CleanupIntent {
            internship: id.clone(),
            students: vec![sid.clone()],
            logged_at: Utc::now(),
        })
        .expect("intent logged");

    let repaired = reconcile(&*store).expect("reconciliation runs");
    assert_eq!(repaired, 0);
    assert!(store.pending_cleanups().expect("log readable").is_empty());
    assert!(
        store.student(&sid).expect("student").has_active_internship,
        "an intact posting keeps its assignments"
    );
}

#[test]
fn reconciliation_is_idempotent() {
    let store = seeded_store();
    assert_eq!(reconcile(&*store).expect("empty log reconciles"), 0);
    assert_eq!(reconcile(&*store).expect("still empty"), 0);
}
