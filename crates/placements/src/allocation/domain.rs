use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for internship postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InternshipId(pub String);

/// Identifier wrapper for students; mirrors the registration number on import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for faculty supervisors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacultyId(pub String);

/// Identifier wrapper for academic departments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub String);

/// Identifier wrapper for industry partners owning a posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnerId(pub String);

macro_rules! display_id {
    ($($id:ident),+) => {
        $(impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

display_id!(InternshipId, StudentId, FacultyId, DepartmentId, PartnerId);

/// Approval and completion status of a posting.
///
/// The rejection comment only exists in the `Rejected` variant, so a comment
/// cannot linger on a posting that was resubmitted or approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LifecycleState {
    Draft,
    PendingApproval,
    Approved,
    Rejected { comment: String },
    Completed,
}

impl LifecycleState {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected { .. } => "rejected",
            Self::Completed => "completed",
        }
    }

    /// Student and faculty assignment is gated on approval.
    pub const fn accepts_assignments(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Completed is the one terminal state; nothing mutates past it.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether membership in this posting blocks a student from being
    /// assigned elsewhere.
    pub const fn holds_students(&self) -> bool {
        !matches!(self, Self::Completed | Self::Rejected { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    OnSite,
    Remote,
    Hybrid,
}

impl LocationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::OnSite => "On-site",
            Self::Remote => "Remote",
            Self::Hybrid => "Hybrid",
        }
    }
}

/// One internship opportunity with a bounded number of student slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Internship {
    pub id: InternshipId,
    pub title: String,
    pub host_institution: String,
    pub category: String,
    pub location: LocationKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub compensation: Option<String>,
    pub supervisor_contact: Option<String>,
    pub capacity: u32,
    pub assigned_students: Vec<StudentId>,
    pub assigned_faculty: Option<FacultyId>,
    pub lifecycle: LifecycleState,
    pub department: DepartmentId,
    pub partner: PartnerId,
}

impl Internship {
    pub fn is_full(&self) -> bool {
        self.assigned_students.len() >= self.capacity as usize
    }

    pub fn seats_remaining(&self) -> usize {
        (self.capacity as usize).saturating_sub(self.assigned_students.len())
    }

    pub fn has_student(&self, student: &StudentId) -> bool {
        self.assigned_students.iter().any(|held| held == student)
    }
}

/// Payload an industry partner submits to create a posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternshipDraft {
    pub title: String,
    pub host_institution: String,
    pub category: String,
    pub location: LocationKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub compensation: Option<String>,
    #[serde(default)]
    pub supervisor_contact: Option<String>,
    pub number_of_students: u32,
    pub department: DepartmentId,
    pub partner: PartnerId,
}

impl InternshipDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "title" });
        }
        if self.host_institution.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "hostInstitution",
            });
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "category" });
        }
        if self.number_of_students == 0 {
            return Err(ValidationError::ZeroCapacity);
        }
        if self.start_date > self.end_date {
            return Err(ValidationError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }

    /// Build the stored record; postings always start in `Draft`.
    pub fn into_internship(self, id: InternshipId) -> Internship {
        Internship {
            id,
            title: self.title,
            host_institution: self.host_institution,
            category: self.category,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            compensation: self.compensation,
            supervisor_contact: self.supervisor_contact,
            capacity: self.number_of_students,
            assigned_students: Vec::new(),
            assigned_faculty: None,
            lifecycle: LifecycleState::Draft,
            department: self.department,
            partner: self.partner,
        }
    }
}

/// Field-level problems with a create payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("numberOfStudents must be at least 1")]
    ZeroCapacity,
    #[error("start date {start} falls after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Roster entry for a student eligible for allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub department: DepartmentId,
    pub batch: String,
    pub section: String,
    pub registration_number: String,
    pub has_active_internship: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicRank {
    Lecturer,
    AssistantProfessor,
    AssociateProfessor,
    Professor,
}

impl AcademicRank {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lecturer => "Lecturer",
            Self::AssistantProfessor => "Assistant Professor",
            Self::AssociateProfessor => "Associate Professor",
            Self::Professor => "Professor",
        }
    }
}

/// Faculty supervisor; may oversee any number of postings at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
    pub id: FacultyId,
    pub name: String,
    pub department: DepartmentId,
    pub rank: AcademicRank,
    pub email: String,
}

/// Portal role of the caller, supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Coordinator,
    FocalPerson,
    IndustryPartner,
    SuperAdmin,
}

impl Role {
    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "coordinator" => Self::Coordinator,
            "industry_partner" | "industry-partner" => Self::IndustryPartner,
            "super_admin" | "super-admin" | "admin" => Self::SuperAdmin,
            _ => Self::FocalPerson,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Coordinator => "coordinator",
            Self::FocalPerson => "focal_person",
            Self::IndustryPartner => "industry_partner",
            Self::SuperAdmin => "super_admin",
        }
    }
}

/// Authenticated request context carried into every coordinator call for
/// attribution; permission modeling stays with the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }
}
