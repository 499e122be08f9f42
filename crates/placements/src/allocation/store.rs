//! Record store: versioned, keyed storage for the allocation entities.
//!
//! Every internship write goes through [`RecordStore::compare_and_swap`],
//! which checks the caller's expected version and applies the accompanying
//! claim operations in the same critical section. The claim index
//! (`student -> internship`) is the store-enforced uniqueness constraint: a
//! student can hold at most one live assignment, and the
//! `has_active_internship` flag is maintained alongside the index so the two
//! can never drift apart within a commit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DepartmentId, Faculty, FacultyId, Internship, InternshipId, Student, StudentId};

/// A record together with the version the store will require on the next write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub record: T,
    pub version: u64,
}

/// Index mutation applied atomically with a compare-and-swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOp {
    /// Reserve the student's single live-assignment slot for this posting
    /// and flip `has_active_internship` on.
    Claim { student: StudentId },
    /// Give the slot back. `clear_flag` distinguishes unassignment (the
    /// student never did the internship) from completion (the flag stays on
    /// as a historical marker).
    Release { student: StudentId, clear_flag: bool },
}

/// Durable intent record for a delete cascade, so an interrupted cascade is
/// detectable and repairable rather than silent corruption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupIntent {
    pub internship: InternshipId,
    pub students: Vec<StudentId>,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("write conflicted with a concurrent update")]
    VersionConflict,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("student {student} already holds an active assignment on internship {holder}")]
    StudentAlreadyClaimed {
        student: StudentId,
        holder: InternshipId,
    },
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction so the coordinator and aggregation can be exercised
/// against in-memory or fault-injecting backends.
pub trait RecordStore: Send + Sync {
    fn insert_internship(&self, internship: Internship) -> Result<Versioned<Internship>, StoreError>;
    fn internship(&self, id: &InternshipId) -> Result<Versioned<Internship>, StoreError>;
    fn internships(&self) -> Result<Vec<Internship>, StoreError>;
    fn internships_by_department(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<Internship>, StoreError>;

    /// The per-posting linearization point. Fails `VersionConflict` when the
    /// record moved since `expected_version` was read, and
    /// `StudentAlreadyClaimed` when a claim would give a student a second
    /// live assignment. No partial effects on failure.
    fn compare_and_swap(
        &self,
        expected_version: u64,
        internship: Internship,
        claims: &[ClaimOp],
    ) -> Result<Versioned<Internship>, StoreError>;

    fn remove_internship(&self, id: &InternshipId) -> Result<Internship, StoreError>;

    fn insert_student(&self, student: Student) -> Result<(), StoreError>;
    fn student(&self, id: &StudentId) -> Result<Student, StoreError>;
    fn students(&self) -> Result<Vec<Student>, StoreError>;
    fn students_by_department(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<Student>, StoreError>;

    fn insert_faculty(&self, faculty: Faculty) -> Result<(), StoreError>;
    fn faculty(&self, id: &FacultyId) -> Result<Faculty, StoreError>;

    /// Read the uniqueness index: the posting currently holding this student.
    fn active_assignment(&self, student: &StudentId) -> Result<Option<InternshipId>, StoreError>;

    /// Cascade cleanup after a delete: drop each student's claim if, and only
    /// if, the index still points at `internship`.
    fn release_assignments(
        &self,
        internship: &InternshipId,
        students: &[StudentId],
    ) -> Result<(), StoreError>;

    fn log_cleanup(&self, intent: CleanupIntent) -> Result<(), StoreError>;
    fn pending_cleanups(&self) -> Result<Vec<CleanupIntent>, StoreError>;
    fn resolve_cleanup(&self, internship: &InternshipId) -> Result<(), StoreError>;
}

/// In-process store used by the service and tests. One mutex over the whole
/// state keeps compare-and-swap plus claims in a single critical section.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    internships: HashMap<InternshipId, Versioned<Internship>>,
    students: HashMap<StudentId, Student>,
    faculty: HashMap<FacultyId, Faculty>,
    active: HashMap<StudentId, InternshipId>,
    cleanups: Vec<CleanupIntent>,
}

impl StoreState {
    fn apply_claims(
        &mut self,
        internship: &InternshipId,
        claims: &[ClaimOp],
    ) -> Result<(), StoreError> {
        // Validate before mutating so a failed commit has no partial effects.
        for claim in claims {
            match claim {
                ClaimOp::Claim { student } => {
                    if !self.students.contains_key(student) {
                        return Err(StoreError::NotFound("student"));
                    }
                    if let Some(holder) = self.active.get(student) {
                        if holder != internship {
                            return Err(StoreError::StudentAlreadyClaimed {
                                student: student.clone(),
                                holder: holder.clone(),
                            });
                        }
                    }
                }
                ClaimOp::Release { student, .. } => {
                    if !self.students.contains_key(student) {
                        return Err(StoreError::NotFound("student"));
                    }
                }
            }
        }

        for claim in claims {
            match claim {
                ClaimOp::Claim { student } => {
                    self.active.insert(student.clone(), internship.clone());
                    if let Some(record) = self.students.get_mut(student) {
                        record.has_active_internship = true;
                    }
                }
                ClaimOp::Release {
                    student,
                    clear_flag,
                } => {
                    // Consistency assertion: only touch the index when it
                    // actually points at this posting.
                    if self.active.get(student) == Some(internship) {
                        self.active.remove(student);
                        if *clear_flag {
                            if let Some(record) = self.students.get_mut(student) {
                                record.has_active_internship = false;
                            }
                        }
                    } else {
                        tracing::warn!(
                            %student,
                            %internship,
                            "release skipped: claim index does not point at this posting"
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("record store mutex poisoned")
    }
}

impl RecordStore for MemoryStore {
    fn insert_internship(
        &self,
        internship: Internship,
    ) -> Result<Versioned<Internship>, StoreError> {
        let mut state = self.lock();
        let stored = Versioned {
            record: internship.clone(),
            version: 1,
        };
        state.internships.insert(internship.id.clone(), stored.clone());
        Ok(stored)
    }

    fn internship(&self, id: &InternshipId) -> Result<Versioned<Internship>, StoreError> {
        let state = self.lock();
        state
            .internships
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound("internship"))
    }

    fn internships(&self) -> Result<Vec<Internship>, StoreError> {
        let state = self.lock();
        let mut all: Vec<Internship> = state
            .internships
            .values()
            .map(|versioned| versioned.record.clone())
            .collect();
        all.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(all)
    }

    fn internships_by_department(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<Internship>, StoreError> {
        Ok(self
            .internships()?
            .into_iter()
            .filter(|internship| &internship.department == department)
            .collect())
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        internship: Internship,
        claims: &[ClaimOp],
    ) -> Result<Versioned<Internship>, StoreError> {
        let mut state = self.lock();
        let current = state
            .internships
            .get(&internship.id)
            .ok_or(StoreError::NotFound("internship"))?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict);
        }
        state.apply_claims(&internship.id, claims)?;
        let stored = Versioned {
            record: internship.clone(),
            version: expected_version + 1,
        };
        state.internships.insert(internship.id.clone(), stored.clone());
        Ok(stored)
    }

    fn remove_internship(&self, id: &InternshipId) -> Result<Internship, StoreError> {
        let mut state = self.lock();
        state
            .internships
            .remove(id)
            .map(|versioned| versioned.record)
            .ok_or(StoreError::NotFound("internship"))
    }

    fn insert_student(&self, student: Student) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.students.insert(student.id.clone(), student);
        Ok(())
    }

    fn student(&self, id: &StudentId) -> Result<Student, StoreError> {
        let state = self.lock();
        state
            .students
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound("student"))
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        let state = self.lock();
        let mut all: Vec<Student> = state.students.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    fn students_by_department(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<Student>, StoreError> {
        Ok(self
            .students()?
            .into_iter()
            .filter(|student| &student.department == department)
            .collect())
    }

    fn insert_faculty(&self, faculty: Faculty) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.faculty.insert(faculty.id.clone(), faculty);
        Ok(())
    }

    fn faculty(&self, id: &FacultyId) -> Result<Faculty, StoreError> {
        let state = self.lock();
        state
            .faculty
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound("faculty"))
    }

    fn active_assignment(&self, student: &StudentId) -> Result<Option<InternshipId>, StoreError> {
        let state = self.lock();
        Ok(state.active.get(student).cloned())
    }

    fn release_assignments(
        &self,
        internship: &InternshipId,
        students: &[StudentId],
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        for student in students {
            if state.active.get(student) == Some(internship) {
                state.active.remove(student);
                if let Some(record) = state.students.get_mut(student) {
                    record.has_active_internship = false;
                }
            }
        }
        Ok(())
    }

    fn log_cleanup(&self, intent: CleanupIntent) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.cleanups.push(intent);
        Ok(())
    }

    fn pending_cleanups(&self) -> Result<Vec<CleanupIntent>, StoreError> {
        let state = self.lock();
        Ok(state.cleanups.clone())
    }

    fn resolve_cleanup(&self, internship: &InternshipId) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.cleanups.retain(|intent| &intent.internship != internship);
        Ok(())
    }
}
