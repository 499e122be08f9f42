//! Pure assignment predicates: no side effects, no locking, safe to call
//! from any thread. The coordinator re-runs these inside its compare-and-swap
//! loop so the answers are evaluated against the record it is about to write.

use super::domain::{Internship, InternshipId, StudentId};

/// Reasons a student cannot be added to a posting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentDenied {
    #[error("internship is already at capacity ({capacity} students)")]
    CapacityExceeded { capacity: u32 },
    #[error("student is already assigned to this internship")]
    AlreadyAssigned,
    #[error("internship has not been approved for assignments")]
    NotApproved,
}

/// Capacity validator: can `student` take a slot on `internship` right now?
///
/// The duplicate check runs before the capacity check so a retried request
/// for a student who already holds a slot on a full posting reads as a
/// duplicate, not as a capacity failure.
pub fn can_add_student(
    internship: &Internship,
    student: &StudentId,
) -> Result<(), AssignmentDenied> {
    if !internship.lifecycle.accepts_assignments() {
        return Err(AssignmentDenied::NotApproved);
    }
    if internship.has_student(student) {
        return Err(AssignmentDenied::AlreadyAssigned);
    }
    if internship.is_full() {
        return Err(AssignmentDenied::CapacityExceeded {
            capacity: internship.capacity,
        });
    }
    Ok(())
}

/// Global uniqueness checker: scan every posting that still holds its
/// students (neither completed nor rejected) for membership of `student`,
/// skipping `exclude`. Returns the conflicting posting id when found.
///
/// The hot path enforces uniqueness through the store's claim index; this
/// scan is the ground truth used by reconciliation and tests.
pub fn student_assigned_elsewhere(
    postings: &[Internship],
    student: &StudentId,
    exclude: Option<&InternshipId>,
) -> Option<InternshipId> {
    postings
        .iter()
        .filter(|posting| Some(&posting.id) != exclude)
        .filter(|posting| posting.lifecycle.holds_students())
        .find(|posting| posting.has_student(student))
        .map(|posting| posting.id.clone())
}
