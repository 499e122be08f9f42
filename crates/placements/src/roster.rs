//! CSV roster import. Registrars hand over batch rosters as spreadsheet
//! exports; this module parses them into [`Student`] records and loads them
//! into a record store.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::allocation::domain::{DepartmentId, Student, StudentId};
use crate::allocation::store::{RecordStore, StoreError};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Store(StoreError),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster export: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::Store(err) => {
                write!(f, "could not load roster into the record store: {}", err)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<StoreError> for RosterImportError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Student>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a roster export. Rows without a registration number are padding
    /// left behind by the spreadsheet tool and are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Student>, RosterImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut students = Vec::new();

        for record in csv_reader.deserialize::<RosterRow>() {
            let RosterRow {
                registration_number,
                name,
                department,
                batch,
                section,
            } = record?;
            let Some(registration) = registration_number else {
                continue;
            };
            students.push(Student {
                id: StudentId(registration.clone()),
                name,
                department: DepartmentId(department),
                batch,
                section,
                registration_number: registration,
                has_active_internship: false,
            });
        }

        Ok(students)
    }

    /// Parse and insert in one pass; returns the number of students loaded.
    pub fn load_into<R: Read, S: RecordStore>(
        reader: R,
        store: &S,
    ) -> Result<usize, RosterImportError> {
        let students = Self::from_reader(reader)?;
        let loaded = students.len();
        for student in students {
            store.insert_student(student)?;
        }
        Ok(loaded)
    }
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(
        rename = "Registration No",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    registration_number: Option<String>,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Department", default)]
    department: String,
    #[serde(rename = "Batch", default)]
    batch: String,
    #[serde(rename = "Section", default)]
    section: String,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::store::MemoryStore;
    use std::io::Cursor;

    const HEADER: &str = "Registration No,Name,Department,Batch,Section\n";

    #[test]
    fn roster_rows_become_students() {
        let csv = format!("{HEADER}REG-001,Amina Yusuf,cs,2023,A\nREG-002,Jonas Weber,cs,2023,B\n");
        let students = RosterImporter::from_reader(Cursor::new(csv)).expect("parse succeeds");

        assert_eq!(students.len(), 2);
        assert_eq!(students[0].id, StudentId("REG-001".to_string()));
        assert_eq!(students[0].name, "Amina Yusuf");
        assert_eq!(students[0].section, "A");
        assert!(!students[0].has_active_internship);
    }

    #[test]
    fn blank_registration_rows_are_skipped() {
        let csv = format!("{HEADER}REG-001,Amina Yusuf,cs,2023,A\n  ,Leftover Row,cs,2023,A\n");
        let students = RosterImporter::from_reader(Cursor::new(csv)).expect("parse succeeds");
        assert_eq!(students.len(), 1);
    }

    #[test]
    fn load_into_populates_the_store() {
        let csv = format!("{HEADER}REG-001,Amina Yusuf,ee,2024,C\n");
        let store = MemoryStore::default();
        let loaded =
            RosterImporter::load_into(Cursor::new(csv), &store).expect("import succeeds");

        assert_eq!(loaded, 1);
        let student = store
            .student(&StudentId("REG-001".to_string()))
            .expect("student present");
        assert_eq!(student.department, DepartmentId("ee".to_string()));
        assert_eq!(student.batch, "2024");
    }

    #[test]
    fn from_path_propagates_io_errors() {
        let error =
            RosterImporter::from_path("./does-not-exist.csv").expect_err("expected io error");
        match error {
            RosterImportError::Io(_) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
