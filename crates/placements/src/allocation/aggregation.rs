//! Read-only summary derivation for dashboards. Everything here recomputes
//! from a snapshot of the record store on each call: no caches, no locks,
//! and best-effort consistency with in-flight writes.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::domain::{Internship, Student};

/// Per-batch rollup inside one department. `did_internship` counts the
/// students whose `has_active_internship` flag is set, which covers both
/// live and completed assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub batch: String,
    pub total: usize,
    pub did_internship: usize,
    pub missing_internship: usize,
    pub total_sections: usize,
}

/// Group an already department-filtered roster by batch. Output is sorted by
/// batch so repeated calls render identically.
pub fn batch_summary(students: &[Student]) -> Vec<BatchSummary> {
    let mut groups: BTreeMap<&str, (usize, usize, BTreeSet<&str>)> = BTreeMap::new();
    for student in students {
        let entry = groups.entry(student.batch.as_str()).or_default();
        entry.0 += 1;
        if student.has_active_internship {
            entry.1 += 1;
        }
        entry.2.insert(student.section.as_str());
    }

    groups
        .into_iter()
        .map(|(batch, (total, did_internship, sections))| BatchSummary {
            batch: batch.to_string(),
            total,
            did_internship,
            missing_internship: total - did_internship,
            total_sections: sections.len(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub missing_students: usize,
    pub missing_faculty: usize,
    pub by_category: BTreeMap<String, usize>,
}

/// Posting-level gaps and a category histogram for the landing dashboard.
pub fn dashboard_counts(internships: &[Internship]) -> DashboardCounts {
    let missing_students = internships
        .iter()
        .filter(|internship| internship.assigned_students.is_empty())
        .count();
    let missing_faculty = internships
        .iter()
        .filter(|internship| internship.assigned_faculty.is_none())
        .count();

    let mut by_category = BTreeMap::new();
    for internship in internships {
        *by_category.entry(internship.category.clone()).or_insert(0) += 1;
    }

    DashboardCounts {
        missing_students,
        missing_faculty,
        by_category,
    }
}
