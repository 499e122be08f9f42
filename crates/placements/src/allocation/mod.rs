//! Internship allocation subsystem: the one part of the portal with
//! invariants that must hold under concurrent, partial, retryable writes.
//!
//! - no posting is ever over-filled,
//! - no student holds two simultaneous live assignments,
//! - assignment only happens once a posting has passed approval,
//! - completion is a one-way terminal transition.

pub mod aggregation;
pub mod checks;
pub mod coordinator;
pub mod domain;
pub mod lifecycle;
pub mod notify;
pub mod router;
pub mod store;

#[cfg(test)]
mod tests;

pub use aggregation::{batch_summary, dashboard_counts, BatchSummary, DashboardCounts};
pub use checks::{can_add_student, student_assigned_elsewhere, AssignmentDenied};
pub use coordinator::{
    reconcile, AllocationService, AssignmentError, CoordinatorConfig, FacultyGate,
};
pub use domain::{
    AcademicRank, Actor, DepartmentId, Faculty, FacultyId, Internship, InternshipDraft,
    InternshipId, LifecycleState, LocationKind, PartnerId, Role, Student, StudentId,
    ValidationError,
};
pub use lifecycle::LifecycleError;
pub use notify::{Notification, NotificationSender, NotifyError};
pub use router::allocation_router;
pub use store::{ClaimOp, CleanupIntent, MemoryStore, RecordStore, StoreError, Versioned};
