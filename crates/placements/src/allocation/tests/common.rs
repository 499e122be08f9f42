use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::allocation::coordinator::{AllocationService, CoordinatorConfig};
use crate::allocation::domain::{
    AcademicRank, Actor, DepartmentId, Faculty, FacultyId, Internship, InternshipDraft,
    InternshipId, LifecycleState, LocationKind, PartnerId, Role, Student, StudentId,
};
use crate::allocation::notify::{Notification, NotificationSender, NotifyError};
use crate::allocation::store::{
    ClaimOp, CleanupIntent, MemoryStore, RecordStore, StoreError, Versioned,
};

pub(super) fn actor() -> Actor {
    Actor::new("coordinator@university.edu", Role::Coordinator)
}

pub(super) fn student(id: &str) -> Student {
    Student {
        id: StudentId(id.to_string()),
        name: format!("Student {id}"),
        department: DepartmentId("cs".to_string()),
        batch: "2023".to_string(),
        section: "A".to_string(),
        registration_number: format!("REG-{id}"),
        has_active_internship: false,
    }
}

pub(super) fn faculty(id: &str) -> Faculty {
    Faculty {
        id: FacultyId(id.to_string()),
        name: format!("Dr. {id}"),
        department: DepartmentId("cs".to_string()),
        rank: AcademicRank::AssistantProfessor,
        email: format!("{id}@university.edu"),
    }
}

pub(super) fn draft(capacity: u32) -> InternshipDraft {
    InternshipDraft {
        title: "Platform Engineering Intern".to_string(),
        host_institution: "Acme Systems".to_string(),
        category: "Software".to_string(),
        location: LocationKind::OnSite,
        start_date: NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2026, 8, 31).expect("valid date"),
        compensation: Some("Monthly stipend".to_string()),
        supervisor_contact: Some("mentor@acme.example".to_string()),
        number_of_students: capacity,
        department: DepartmentId("cs".to_string()),
        partner: PartnerId("acme".to_string()),
    }
}

/// Store pre-loaded with five students and one faculty member.
pub(super) fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::default());
    for id in ["s1", "s2", "s3", "s4", "s5"] {
        store.insert_student(student(id)).expect("student inserted");
    }
    store.insert_faculty(faculty("f1")).expect("faculty inserted");
    store
}

pub(super) fn build_service(
    store: Arc<MemoryStore>,
) -> (
    AllocationService<MemoryStore, MemoryNotifier>,
    Arc<MemoryNotifier>,
) {
    build_service_with_config(store, CoordinatorConfig::default())
}

pub(super) fn build_service_with_config(
    store: Arc<MemoryStore>,
    config: CoordinatorConfig,
) -> (
    AllocationService<MemoryStore, MemoryNotifier>,
    Arc<MemoryNotifier>,
) {
    let notifier = Arc::new(MemoryNotifier::default());
    let service = AllocationService::new(store, notifier.clone(), config);
    (service, notifier)
}

/// Create a posting through the coordinator and walk it to `Approved`.
pub(super) fn approved_posting(
    service: &AllocationService<MemoryStore, MemoryNotifier>,
    capacity: u32,
) -> InternshipId {
    let actor = actor();
    let stored = service.create(&actor, draft(capacity)).expect("create succeeds");
    let id = stored.record.id;
    service.submit(&actor, &id).expect("submit succeeds");
    service.approve(&actor, &id).expect("approve succeeds");
    id
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationSender for MemoryNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Wrapper that fails the first `failures` compare-and-swap calls with a
/// version conflict, then behaves normally. Exercises the retry loop
/// deterministically.
pub(super) struct FlakyStore {
    inner: MemoryStore,
    failures: AtomicU32,
}

impl FlakyStore {
    pub(super) fn failing(inner: MemoryStore, failures: u32) -> Self {
        Self {
            inner,
            failures: AtomicU32::new(failures),
        }
    }
}

impl RecordStore for FlakyStore {
    fn insert_internship(
        &self,
        internship: Internship,
    ) -> Result<Versioned<Internship>, StoreError> {
        self.inner.insert_internship(internship)
    }

    fn internship(&self, id: &InternshipId) -> Result<Versioned<Internship>, StoreError> {
        self.inner.internship(id)
    }

    fn internships(&self) -> Result<Vec<Internship>, StoreError> {
        self.inner.internships()
    }

    fn internships_by_department(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<Internship>, StoreError> {
        self.inner.internships_by_department(department)
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        internship: Internship,
        claims: &[ClaimOp],
    ) -> Result<Versioned<Internship>, StoreError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                (left > 0).then(|| left - 1)
            })
            .is_ok()
        {
            return Err(StoreError::VersionConflict);
        }
        self.inner.compare_and_swap(expected_version, internship, claims)
    }

    fn remove_internship(&self, id: &InternshipId) -> Result<Internship, StoreError> {
        self.inner.remove_internship(id)
    }

    fn insert_student(&self, student: Student) -> Result<(), StoreError> {
        self.inner.insert_student(student)
    }

    fn student(&self, id: &StudentId) -> Result<Student, StoreError> {
        self.inner.student(id)
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        self.inner.students()
    }

    fn students_by_department(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<Student>, StoreError> {
        self.inner.students_by_department(department)
    }

    fn insert_faculty(&self, faculty: Faculty) -> Result<(), StoreError> {
        self.inner.insert_faculty(faculty)
    }

    fn faculty(&self, id: &FacultyId) -> Result<Faculty, StoreError> {
        self.inner.faculty(id)
    }

    fn active_assignment(&self, student: &StudentId) -> Result<Option<InternshipId>, StoreError> {
        self.inner.active_assignment(student)
    }

    fn release_assignments(
        &self,
        internship: &InternshipId,
        students: &[StudentId],
    ) -> Result<(), StoreError> {
        self.inner.release_assignments(internship, students)
    }

    fn log_cleanup(&self, intent: CleanupIntent) -> Result<(), StoreError> {
        self.inner.log_cleanup(intent)
    }

    fn pending_cleanups(&self) -> Result<Vec<CleanupIntent>, StoreError> {
        self.inner.pending_cleanups()
    }

    fn resolve_cleanup(&self, internship: &InternshipId) -> Result<(), StoreError> {
        self.inner.resolve_cleanup(internship)
    }
}

/// Wrapper that commits one last student assignment at the moment a posting
/// is removed, after the delete path has already read the record. Reproduces
/// a writer racing the delete cascade.
pub(super) struct RacingDeleteStore {
    inner: MemoryStore,
    student: StudentId,
    fired: AtomicBool,
}

impl RacingDeleteStore {
    pub(super) fn racing(inner: MemoryStore, student: StudentId) -> Self {
        Self {
            inner,
            student,
            fired: AtomicBool::new(false),
        }
    }
}

impl RecordStore for RacingDeleteStore {
    fn insert_internship(
        &self,
        internship: Internship,
    ) -> Result<Versioned<Internship>, StoreError> {
        self.inner.insert_internship(internship)
    }

    fn internship(&self, id: &InternshipId) -> Result<Versioned<Internship>, StoreError> {
        self.inner.internship(id)
    }

    fn internships(&self) -> Result<Vec<Internship>, StoreError> {
        self.inner.internships()
    }

    fn internships_by_department(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<Internship>, StoreError> {
        self.inner.internships_by_department(department)
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        internship: Internship,
        claims: &[ClaimOp],
    ) -> Result<Versioned<Internship>, StoreError> {
        self.inner.compare_and_swap(expected_version, internship, claims)
    }

    fn remove_internship(&self, id: &InternshipId) -> Result<Internship, StoreError> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            let current = self.inner.internship(id)?;
            let mut record = current.record;
            record.assigned_students.push(self.student.clone());
            self.inner.compare_and_swap(
                current.version,
                record,
                &[ClaimOp::Claim {
                    student: self.student.clone(),
                }],
            )?;
        }
        self.inner.remove_internship(id)
    }

    fn insert_student(&self, student: Student) -> Result<(), StoreError> {
        self.inner.insert_student(student)
    }

    fn student(&self, id: &StudentId) -> Result<Student, StoreError> {
        self.inner.student(id)
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        self.inner.students()
    }

    fn students_by_department(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<Student>, StoreError> {
        self.inner.students_by_department(department)
    }

    fn insert_faculty(&self, faculty: Faculty) -> Result<(), StoreError> {
        self.inner.insert_faculty(faculty)
    }

    fn faculty(&self, id: &FacultyId) -> Result<Faculty, StoreError> {
        self.inner.faculty(id)
    }

    fn active_assignment(&self, student: &StudentId) -> Result<Option<InternshipId>, StoreError> {
        self.inner.active_assignment(student)
    }

    fn release_assignments(
        &self,
        internship: &InternshipId,
        students: &[StudentId],
    ) -> Result<(), StoreError> {
        self.inner.release_assignments(internship, students)
    }

    fn log_cleanup(&self, intent: CleanupIntent) -> Result<(), StoreError> {
        self.inner.log_cleanup(intent)
    }

    fn pending_cleanups(&self) -> Result<Vec<CleanupIntent>, StoreError> {
        self.inner.pending_cleanups()
    }

    fn resolve_cleanup(&self, internship: &InternshipId) -> Result<(), StoreError> {
        self.inner.resolve_cleanup(internship)
    }
}

/// Store whose every operation reports the backend as unreachable.
pub(super) struct UnavailableStore;

impl UnavailableStore {
    fn err<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

impl RecordStore for UnavailableStore {
    fn insert_internship(
        &self,
        _internship: Internship,
    ) -> Result<Versioned<Internship>, StoreError> {
        Self::err()
    }

    fn internship(&self, _id: &InternshipId) -> Result<Versioned<Internship>, StoreError> {
        Self::err()
    }

    fn internships(&self) -> Result<Vec<Internship>, StoreError> {
        Self::err()
    }

    fn internships_by_department(
        &self,
        _department: &DepartmentId,
    ) -> Result<Vec<Internship>, StoreError> {
        Self::err()
    }

    fn compare_and_swap(
        &self,
        _expected_version: u64,
        _internship: Internship,
        _claims: &[ClaimOp],
    ) -> Result<Versioned<Internship>, StoreError> {
        Self::err()
    }

    fn remove_internship(&self, _id: &InternshipId) -> Result<Internship, StoreError> {
        Self::err()
    }

    fn insert_student(&self, _student: Student) -> Result<(), StoreError> {
        Self::err()
    }

    fn student(&self, _id: &StudentId) -> Result<Student, StoreError> {
        Self::err()
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        Self::err()
    }

    fn students_by_department(
        &self,
        _department: &DepartmentId,
    ) -> Result<Vec<Student>, StoreError> {
        Self::err()
    }

    fn insert_faculty(&self, _faculty: Faculty) -> Result<(), StoreError> {
        Self::err()
    }

    fn faculty(&self, _id: &FacultyId) -> Result<Faculty, StoreError> {
        Self::err()
    }

    fn active_assignment(
        &self,
        _student: &StudentId,
    ) -> Result<Option<InternshipId>, StoreError> {
        Self::err()
    }

    fn release_assignments(
        &self,
        _internship: &InternshipId,
        _students: &[StudentId],
    ) -> Result<(), StoreError> {
        Self::err()
    }

    fn log_cleanup(&self, _intent: CleanupIntent) -> Result<(), StoreError> {
        Self::err()
    }

    fn pending_cleanups(&self) -> Result<Vec<CleanupIntent>, StoreError> {
        Self::err()
    }

    fn resolve_cleanup(&self, _internship: &InternshipId) -> Result<(), StoreError> {
        Self::err()
    }
}

pub(super) fn lifecycle_of(store: &MemoryStore, id: &InternshipId) -> LifecycleState {
    store.internship(id).expect("posting exists").record.lifecycle
}
