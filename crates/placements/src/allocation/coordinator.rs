//! Assignment coordinator: turns assignment requests into atomic state
//! changes. Every mutation runs an optimistic read-validate-CAS loop against
//! the record store; version conflicts are retried with a short backoff
//! before surfacing, and uniqueness violations come back from the store's
//! claim index rather than from an application-level scan.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::aggregation::{batch_summary, dashboard_counts, BatchSummary, DashboardCounts};
use super::checks::{can_add_student, AssignmentDenied};
use super::domain::{
    Actor, DepartmentId, FacultyId, Internship, InternshipDraft, InternshipId, LifecycleState,
    StudentId, ValidationError,
};
use super::lifecycle::LifecycleError;
use super::notify::{Notification, NotificationSender};
use super::store::{ClaimOp, CleanupIntent, RecordStore, StoreError, Versioned};

/// When faculty may be attached to a posting. Some intake flows want a
/// supervisor lined up before approval, so this is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacultyGate {
    ApprovedOnly,
    PreApprovalAllowed,
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Bounded retries for version conflicts before giving up.
    pub retry_limit: u32,
    pub faculty_gate: FacultyGate,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            retry_limit: 4,
            faculty_gate: FacultyGate::ApprovedOnly,
        }
    }
}

/// Typed failures surfaced to the API layer; see the router for the status
/// code mapping.
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("internship is already at capacity ({capacity} students)")]
    CapacityExceeded { capacity: u32 },
    #[error("student already holds an active assignment on internship {internship}")]
    AlreadyAssignedElsewhere { internship: InternshipId },
    #[error("internship has not been approved for assignments")]
    NotApproved,
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("write abandoned after {attempts} conflicting updates")]
    Conflict { attempts: u32 },
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AssignmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::StudentAlreadyClaimed { holder, .. } => {
                Self::AlreadyAssignedElsewhere { internship: holder }
            }
            other => Self::Store(other),
        }
    }
}

/// What an optimistic mutation did. `Unchanged` is the idempotent path: the
/// record already satisfied the request, so nothing was written and no
/// side effects (logs, notifications) may fire.
enum WriteOutcome {
    Committed(Internship),
    Unchanged(Internship),
}

static INTERNSHIP_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_internship_id() -> InternshipId {
    let id = INTERNSHIP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InternshipId(format!("int-{id:06}"))
}

/// Stateless arbitration service over the record store. Holds no state of
/// its own beyond configuration; every request reads, validates, and commits.
pub struct AllocationService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    config: CoordinatorConfig,
}

impl<S, N> AllocationService<S, N>
where
    S: RecordStore + 'static,
    N: NotificationSender + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: CoordinatorConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a posting in `Draft` after field validation.
    pub fn create(
        &self,
        actor: &Actor,
        draft: InternshipDraft,
    ) -> Result<Versioned<Internship>, AssignmentError> {
        draft.validate()?;
        let internship = draft.into_internship(next_internship_id());
        let stored = self.store.insert_internship(internship)?;
        info!(
            actor = %actor.email,
            internship = %stored.record.id,
            capacity = stored.record.capacity,
            "internship created"
        );
        Ok(stored)
    }

    /// Assign a student to a posting. Idempotent for a (posting, student)
    /// pair that already succeeded: the unchanged record is returned rather
    /// than a duplicate appended.
    pub fn assign_student(
        &self,
        actor: &Actor,
        internship_id: &InternshipId,
        student_id: &StudentId,
    ) -> Result<Internship, AssignmentError> {
        self.store.student(student_id)?;

        let outcome = self.with_retries(internship_id, |record| {
            match can_add_student(record, student_id) {
                Ok(()) => {}
                Err(AssignmentDenied::AlreadyAssigned) => {
                    // Retried request for a slot the student already holds.
                    return Ok(None);
                }
                Err(AssignmentDenied::CapacityExceeded { capacity }) => {
                    return Err(AssignmentError::CapacityExceeded { capacity });
                }
                Err(AssignmentDenied::NotApproved) => {
                    return Err(AssignmentError::NotApproved);
                }
            }
            record.assigned_students.push(student_id.clone());
            Ok(Some(vec![ClaimOp::Claim {
                student: student_id.clone(),
            }]))
        })?;
        let record = match outcome {
            WriteOutcome::Unchanged(record) => return Ok(record),
            WriteOutcome::Committed(record) => record,
        };

        info!(
            actor = %actor.email,
            internship = %internship_id,
            student = %student_id,
            "student assigned"
        );
        self.dispatch(Notification::StudentAssigned {
            internship: internship_id.clone(),
            student: student_id.clone(),
        });
        Ok(record)
    }

    /// Remove a student from a posting. Permitted in every state except
    /// `Completed`; a no-op when the student is not on the posting.
    pub fn unassign_student(
        &self,
        actor: &Actor,
        internship_id: &InternshipId,
        student_id: &StudentId,
    ) -> Result<Internship, AssignmentError> {
        let outcome = self.with_retries(internship_id, |record| {
            if record.lifecycle.is_terminal() {
                return Err(AssignmentError::Lifecycle(
                    LifecycleError::InvalidTransition {
                        action: "unassign a student from",
                        state: record.lifecycle.label(),
                    },
                ));
            }
            if !record.has_student(student_id) {
                return Ok(None);
            }
            record.assigned_students.retain(|held| held != student_id);
            Ok(Some(vec![ClaimOp::Release {
                student: student_id.clone(),
                clear_flag: true,
            }]))
        })?;
        let record = match outcome {
            WriteOutcome::Unchanged(record) => return Ok(record),
            WriteOutcome::Committed(record) => record,
        };

        info!(
            actor = %actor.email,
            internship = %internship_id,
            student = %student_id,
            "student unassigned"
        );
        Ok(record)
    }

    /// Attach (or replace) the faculty supervisor. Single slot, no
    /// cross-posting exclusivity; the approval gate depends on configuration.
    pub fn assign_faculty(
        &self,
        actor: &Actor,
        internship_id: &InternshipId,
        faculty_id: &FacultyId,
    ) -> Result<Internship, AssignmentError> {
        self.store.faculty(faculty_id)?;
        let gate = self.config.faculty_gate;

        let outcome = self.with_retries(internship_id, |record| {
            let permitted = match gate {
                FacultyGate::ApprovedOnly => record.lifecycle.accepts_assignments(),
                FacultyGate::PreApprovalAllowed => record.lifecycle.holds_students(),
            };
            if !permitted {
                return Err(AssignmentError::NotApproved);
            }
            if record.assigned_faculty.as_ref() == Some(faculty_id) {
                return Ok(None);
            }
            record.assigned_faculty = Some(faculty_id.clone());
            Ok(Some(Vec::new()))
        })?;
        let record = match outcome {
            WriteOutcome::Unchanged(record) => return Ok(record),
            WriteOutcome::Committed(record) => record,
        };

        info!(
            actor = %actor.email,
            internship = %internship_id,
            faculty = %faculty_id,
            "faculty assigned"
        );
        self.dispatch(Notification::FacultyAssigned {
            internship: internship_id.clone(),
            faculty: faculty_id.clone(),
        });
        Ok(record)
    }

    pub fn submit(
        &self,
        actor: &Actor,
        internship_id: &InternshipId,
    ) -> Result<Internship, AssignmentError> {
        self.transition(actor, internship_id, "submitted", |record| {
            Ok((record.lifecycle.submit()?, Vec::new()))
        })
    }

    pub fn approve(
        &self,
        actor: &Actor,
        internship_id: &InternshipId,
    ) -> Result<Internship, AssignmentError> {
        self.transition(actor, internship_id, "approved", |record| {
            Ok((record.lifecycle.approve()?, Vec::new()))
        })
    }

    pub fn reject(
        &self,
        actor: &Actor,
        internship_id: &InternshipId,
        comment: &str,
    ) -> Result<Internship, AssignmentError> {
        self.transition(actor, internship_id, "rejected", |record| {
            Ok((record.lifecycle.reject(comment)?, Vec::new()))
        })
    }

    /// Mark a posting completed. Releases every uniqueness claim so the
    /// students may take a later internship, but leaves
    /// `has_active_internship` set as the historical did-an-internship
    /// marker consumed by the batch summaries.
    pub fn complete(
        &self,
        actor: &Actor,
        internship_id: &InternshipId,
    ) -> Result<Internship, AssignmentError> {
        self.transition(actor, internship_id, "completed", |record| {
            let next = record.lifecycle.complete()?;
            let releases = record
                .assigned_students
                .iter()
                .map(|student| ClaimOp::Release {
                    student: student.clone(),
                    clear_flag: false,
                })
                .collect();
            Ok((next, releases))
        })
    }

    /// Hard-remove a posting and cascade-clear its students' claims. The
    /// intent is logged first so a crash between removal and cleanup leaves
    /// repairable state for [`reconcile`], never silent dangling claims.
    pub fn delete(
        &self,
        actor: &Actor,
        internship_id: &InternshipId,
    ) -> Result<(), AssignmentError> {
        let Versioned { record, .. } = self.store.internship(internship_id)?;

        if !record.assigned_students.is_empty() {
            self.store.log_cleanup(CleanupIntent {
                internship: internship_id.clone(),
                students: record.assigned_students.clone(),
                logged_at: Utc::now(),
            })?;
        }
        // The removal is the linearization point: an assignment can still
        // commit after the read above, so the released claims come from the
        // record the store actually removed, not from the earlier snapshot.
        let removed = self.store.remove_internship(internship_id)?;
        self.store
            .release_assignments(internship_id, &removed.assigned_students)?;
        self.store.resolve_cleanup(internship_id)?;

        info!(
            actor = %actor.email,
            internship = %internship_id,
            released = removed.assigned_students.len(),
            "internship deleted"
        );
        Ok(())
    }

    pub fn internship(&self, id: &InternshipId) -> Result<Internship, AssignmentError> {
        Ok(self.store.internship(id)?.record)
    }

    pub fn internships(
        &self,
        department: Option<&DepartmentId>,
    ) -> Result<Vec<Internship>, AssignmentError> {
        let listed = match department {
            Some(department) => self.store.internships_by_department(department)?,
            None => self.store.internships()?,
        };
        Ok(listed)
    }

    /// Batch summaries for one department; recomputed from student records
    /// on every call, nothing cached.
    pub fn batches(&self, department: &DepartmentId) -> Result<Vec<BatchSummary>, AssignmentError> {
        let students = self.store.students_by_department(department)?;
        Ok(batch_summary(&students))
    }

    pub fn dashboard(&self) -> Result<DashboardCounts, AssignmentError> {
        let internships = self.store.internships()?;
        Ok(dashboard_counts(&internships))
    }

    /// Optimistic concurrency loop shared by every mutation. `mutate`
    /// inspects and edits a fresh copy of the record; returning `Ok(None)`
    /// short-circuits as an idempotent success without writing, and the
    /// caller learns which case happened through the [`WriteOutcome`].
    fn with_retries<F>(
        &self,
        internship_id: &InternshipId,
        mutate: F,
    ) -> Result<WriteOutcome, AssignmentError>
    where
        F: Fn(&mut Internship) -> Result<Option<Vec<ClaimOp>>, AssignmentError>,
    {
        let mut attempts = 0;
        loop {
            let Versioned { mut record, version } = self.store.internship(internship_id)?;
            let claims = match mutate(&mut record)? {
                Some(claims) => claims,
                None => return Ok(WriteOutcome::Unchanged(record)),
            };
            match self.store.compare_and_swap(version, record, &claims) {
                Ok(stored) => return Ok(WriteOutcome::Committed(stored.record)),
                Err(StoreError::VersionConflict) => {
                    attempts += 1;
                    if attempts > self.config.retry_limit {
                        warn!(
                            internship = %internship_id,
                            attempts,
                            "abandoning write after repeated version conflicts"
                        );
                        return Err(AssignmentError::Conflict { attempts });
                    }
                    thread::sleep(Duration::from_millis(u64::from(attempts)));
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    fn transition<F>(
        &self,
        actor: &Actor,
        internship_id: &InternshipId,
        verb: &'static str,
        next: F,
    ) -> Result<Internship, AssignmentError>
    where
        F: Fn(&Internship) -> Result<(LifecycleState, Vec<ClaimOp>), AssignmentError>,
    {
        let record = match self.with_retries(internship_id, |record| {
            let (state, claims) = next(record)?;
            record.lifecycle = state;
            Ok(Some(claims))
        })? {
            WriteOutcome::Committed(record) | WriteOutcome::Unchanged(record) => record,
        };
        info!(
            actor = %actor.email,
            internship = %internship_id,
            state = record.lifecycle.label(),
            "internship {verb}"
        );
        Ok(record)
    }

    fn dispatch(&self, notification: Notification) {
        if let Err(err) = self.notifier.send(notification) {
            warn!(%err, "registration notification dropped");
        }
    }
}

/// Finish interrupted delete cascades. For each pending intent: if the
/// posting is gone, release the students it named and resolve the intent; if
/// the posting still exists the delete never happened, so the intent is
/// simply resolved. The claim index is then swept for entries whose posting
/// no longer exists, since an assignment that committed while a cascade was
/// in flight can dangle without any intent naming it. Returns the number of
/// repairs performed.
pub fn reconcile<S: RecordStore>(store: &S) -> Result<usize, StoreError> {
    let mut repaired = 0;
    for intent in store.pending_cleanups()? {
        match store.internship(&intent.internship) {
            Ok(_) => {
                store.resolve_cleanup(&intent.internship)?;
            }
            Err(StoreError::NotFound(_)) => {
                store.release_assignments(&intent.internship, &intent.students)?;
                store.resolve_cleanup(&intent.internship)?;
                repaired += 1;
                info!(internship = %intent.internship, "repaired interrupted delete cascade");
            }
            Err(other) => return Err(other),
        }
    }

    for student in store.students()? {
        let Some(holder) = store.active_assignment(&student.id)? else {
            continue;
        };
        match store.internship(&holder) {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                store.release_assignments(&holder, std::slice::from_ref(&student.id))?;
                repaired += 1;
                info!(
                    student = %student.id,
                    internship = %holder,
                    "released dangling claim on a removed posting"
                );
            }
            Err(other) => return Err(other),
        }
    }
    Ok(repaired)
}
