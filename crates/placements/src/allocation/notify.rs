use serde::{Deserialize, Serialize};

use super::domain::{FacultyId, InternshipId, StudentId};

/// Outbound registration notices, dispatched fire-and-forget after a
/// successful assignment. Delivery transports (e-mail and friends) live
/// behind this trait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    StudentAssigned {
        internship: InternshipId,
        student: StudentId,
    },
    FacultyAssigned {
        internship: InternshipId,
        faculty: FacultyId,
    },
}

pub trait NotificationSender: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
