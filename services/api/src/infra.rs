use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use placements::allocation::{
    AcademicRank, DepartmentId, Faculty, FacultyId, MemoryStore, Notification,
    NotificationSender, NotifyError, RecordStore,
};
use placements::error::AppError;
use placements::roster::RosterImporter;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notification sink for deployments without a mail gateway: assignments are
/// recorded in the service log instead of being pushed anywhere.
#[derive(Default, Clone)]
pub(crate) struct LogNotifier;

impl NotificationSender for LogNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        match notification {
            Notification::StudentAssigned {
                internship,
                student,
            } => info!(%internship, %student, "assignment notification"),
            Notification::FacultyAssigned {
                internship,
                faculty,
            } => info!(%internship, %faculty, "supervision notification"),
        }
        Ok(())
    }
}

pub(crate) const SAMPLE_ROSTER: &str = "\
Registration No,Name,Department,Batch,Section
REG-1001,Amina Yusuf,cs,2023,A
REG-1002,Jonas Weber,cs,2023,A
REG-1003,Priya Nair,cs,2023,B
REG-1004,Tomas Silva,cs,2022,A
REG-1005,Lin Hui,ee,2023,A
";

pub(crate) fn sample_faculty() -> Vec<Faculty> {
    vec![
        Faculty {
            id: FacultyId("f-chen".to_string()),
            name: "Dr. Chen".to_string(),
            department: DepartmentId("cs".to_string()),
            rank: AcademicRank::AssociateProfessor,
            email: "chen@university.edu".to_string(),
        },
        Faculty {
            id: FacultyId("f-okafor".to_string()),
            name: "Dr. Okafor".to_string(),
            department: DepartmentId("ee".to_string()),
            rank: AcademicRank::Professor,
            email: "okafor@university.edu".to_string(),
        },
    ]
}

/// Load the bundled sample roster and faculty into a fresh store.
pub(crate) fn seed_sample_records(store: &MemoryStore) -> Result<usize, AppError> {
    let loaded = RosterImporter::load_into(SAMPLE_ROSTER.as_bytes(), store)?;
    for member in sample_faculty() {
        store.insert_faculty(member)?;
    }
    Ok(loaded)
}
