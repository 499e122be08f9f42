use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use crate::infra::{seed_sample_records, LogNotifier};
use placements::allocation::{
    Actor, AllocationService, AssignmentError, CoordinatorConfig, DepartmentId, FacultyId,
    InternshipDraft, LocationKind, MemoryStore, PartnerId, RecordStore, Role,
};
use placements::error::AppError;
use placements::roster::RosterImporter;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Roster CSV to load instead of the bundled sample
    #[arg(long)]
    pub(crate) roster_csv: Option<PathBuf>,
    /// Department whose batch summary is printed at the end
    #[arg(long, default_value = "cs")]
    pub(crate) department: String,
    /// Skip the reporting portion of the demo output
    #[arg(long)]
    pub(crate) skip_reports: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        roster_csv,
        department,
        skip_reports,
    } = args;

    println!("Internship allocation demo");

    let store = Arc::new(MemoryStore::default());
    let loaded = match roster_csv {
        Some(path) => {
            let students = RosterImporter::from_path(path)?;
            let count = students.len();
            for student in students {
                store.insert_student(student)?;
            }
            for member in crate::infra::sample_faculty() {
                store.insert_faculty(member)?;
            }
            count
        }
        None => seed_sample_records(&store)?,
    };
    println!("Loaded {loaded} students from the roster");

    let service = AllocationService::new(
        store.clone(),
        Arc::new(LogNotifier),
        CoordinatorConfig::default(),
    );
    let partner = Actor::new("hr@northwind.example", Role::IndustryPartner);
    let coordinator = Actor::new("coordinator@university.edu", Role::Coordinator);
    let department = DepartmentId(department);

    let draft = InternshipDraft {
        title: "Backend Engineering Intern".to_string(),
        host_institution: "Northwind Robotics".to_string(),
        category: "Software".to_string(),
        location: LocationKind::Hybrid,
        start_date: chrono::Local::now().date_naive(),
        end_date: chrono::Local::now().date_naive() + chrono::Duration::days(90),
        compensation: Some("Monthly stipend".to_string()),
        supervisor_contact: Some("lab@northwind.example".to_string()),
        number_of_students: 2,
        department: department.clone(),
        partner: PartnerId("northwind".to_string()),
    };

    let stored = match service.create(&partner, draft) {
        Ok(stored) => stored,
        Err(err) => {
            println!("  Posting rejected: {err}");
            return Ok(());
        }
    };
    let id = stored.record.id;
    println!("- Created posting {id} in state {}", stored.record.lifecycle.label());

    if let Err(err) = service
        .submit(&partner, &id)
        .and_then(|_| service.approve(&coordinator, &id))
    {
        println!("  Intake failed: {err}");
        return Ok(());
    }
    println!("- Posting {id} submitted and approved");

    let students = store.students_by_department(&department)?;
    let mut seated = 0;
    for student in &students {
        match service.assign_student(&coordinator, &id, &student.id) {
            Ok(record) => {
                seated += 1;
                println!(
                    "- Assigned {} ({}/{} seats filled)",
                    student.id,
                    record.assigned_students.len(),
                    record.capacity
                );
            }
            Err(AssignmentError::CapacityExceeded { capacity }) => {
                println!("- Posting full at {capacity} seats, stopping intake");
                break;
            }
            Err(err) => {
                println!("  Assignment failed for {}: {err}", student.id);
            }
        }
    }

    match service.assign_faculty(&coordinator, &id, &FacultyId("f-chen".to_string())) {
        Ok(record) => {
            if let Some(faculty) = record.assigned_faculty {
                println!("- Supervisor {faculty} attached");
            }
        }
        Err(err) => println!("  Supervisor assignment failed: {err}"),
    }

    if seated > 0 {
        match service.complete(&coordinator, &id) {
            Ok(record) => println!(
                "- Posting {id} completed with {} placements",
                record.assigned_students.len()
            ),
            Err(err) => println!("  Completion failed: {err}"),
        }
    }

    if skip_reports {
        return Ok(());
    }

    let batches = match service.batches(&department) {
        Ok(batches) => batches,
        Err(err) => {
            println!("  Reporting unavailable: {err}");
            return Ok(());
        }
    };
    println!("\nBatch summary for department {department}");
    for summary in batches {
        println!(
            "  {}: {} students, {} placed, {} missing, {} sections",
            summary.batch,
            summary.total,
            summary.did_internship,
            summary.missing_internship,
            summary.total_sections
        );
    }

    let dashboard = match service.dashboard() {
        Ok(counts) => counts,
        Err(err) => {
            println!("  Reporting unavailable: {err}");
            return Ok(());
        }
    };
    println!("\nDashboard");
    println!("  postings without students: {}", dashboard.missing_students);
    println!("  postings without faculty:  {}", dashboard.missing_faculty);
    for (category, count) in &dashboard.by_category {
        println!("  {category}: {count}");
    }

    Ok(())
}
