//! Posting lifecycle transitions.
//!
//! ```text
//! Draft ──submit──▶ PendingApproval ──approve──▶ Approved ──complete──▶ Completed
//!                        │    ▲
//!                   reject    └──submit (resubmission, comment cleared)
//!                        ▼    │
//!                      Rejected
//! ```
//!
//! Completed has no outgoing transitions. Capacity and completion are
//! independent: a posting is completed explicitly, never by filling up.

use super::domain::LifecycleState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot {action} an internship in the {state} state")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("rejecting an internship requires a non-empty comment")]
    EmptyRejectionComment,
}

impl LifecycleState {
    /// Submit a draft for approval, or resubmit a rejected posting. A
    /// resubmission discards the previous rejection comment.
    pub fn submit(&self) -> Result<Self, LifecycleError> {
        match self {
            Self::Draft | Self::Rejected { .. } => Ok(Self::PendingApproval),
            other => Err(LifecycleError::InvalidTransition {
                action: "submit",
                state: other.label(),
            }),
        }
    }

    pub fn approve(&self) -> Result<Self, LifecycleError> {
        match self {
            Self::PendingApproval => Ok(Self::Approved),
            other => Err(LifecycleError::InvalidTransition {
                action: "approve",
                state: other.label(),
            }),
        }
    }

    pub fn reject(&self, comment: &str) -> Result<Self, LifecycleError> {
        match self {
            Self::PendingApproval => {
                let comment = comment.trim();
                if comment.is_empty() {
                    return Err(LifecycleError::EmptyRejectionComment);
                }
                Ok(Self::Rejected {
                    comment: comment.to_string(),
                })
            }
            other => Err(LifecycleError::InvalidTransition {
                action: "reject",
                state: other.label(),
            }),
        }
    }

    /// Explicit completion by an authorized actor; an under-filled posting
    /// may be completed.
    pub fn complete(&self) -> Result<Self, LifecycleError> {
        match self {
            Self::Approved => Ok(Self::Completed),
            other => Err(LifecycleError::InvalidTransition {
                action: "complete",
                state: other.label(),
            }),
        }
    }
}
