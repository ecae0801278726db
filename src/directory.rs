//! Tag directory: resolves a physical NFC tag to a student.
//!
//! The scan recorder only needs [`TagDirectory::resolve_tag`]. Writes belong
//! to the student roster; [`SqliteTagDirectory`] carries a minimal roster API
//! (register, remove, list) so the binary can stand alone.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::error::AttendanceError;
use crate::model::{StudentId, TagId};
use crate::store::{is_unique_violation, Database};

/// Lookup capability consumed by the scan recorder.
pub trait TagDirectory {
    /// Returns the student bound to `tag_id`, or `None` if the tag is unbound.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory itself could not be consulted.
    fn resolve_tag(&self, tag_id: &TagId) -> Result<Option<StudentId>, AttendanceError>;
}

impl TagDirectory for HashMap<TagId, StudentId> {
    fn resolve_tag(&self, tag_id: &TagId) -> Result<Option<StudentId>, AttendanceError> {
        Ok(self.get(tag_id).cloned())
    }
}

/// A registered student and the tag bound to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: StudentId,
    pub name: String,
    pub tag_id: TagId,
}

/// Tag directory backed by the `students` table.
#[derive(Debug, Clone)]
pub struct SqliteTagDirectory {
    db: Database,
}

impl SqliteTagDirectory {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Registers a student with a tag, or re-binds an existing student to a
    /// new tag and name.
    ///
    /// # Errors
    ///
    /// [`AttendanceError::TagAlreadyBound`] if another student holds the tag.
    pub fn register_student(
        &self,
        student_id: &StudentId,
        name: &str,
        tag_id: &TagId,
    ) -> Result<Student, AttendanceError> {
        self.db.write(|tx| {
            let result = tx.execute(
                "INSERT INTO students (student_id, name, tag_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT (student_id) DO UPDATE SET name = excluded.name, tag_id = excluded.tag_id",
                params![student_id, name.trim(), tag_id],
            );
            match result {
                Ok(_) => Ok(()),
                Err(err) if is_unique_violation(&err) => {
                    let holder: StudentId = tx.query_row(
                        "SELECT student_id FROM students WHERE tag_id = ?1",
                        params![tag_id],
                        |row| row.get(0),
                    )?;
                    Err(AttendanceError::TagAlreadyBound {
                        tag_id: tag_id.clone(),
                        student_id: holder,
                    })
                }
                Err(err) => Err(err.into()),
            }
        })?;

        log::info!("Bound tag {} to student {}", tag_id, student_id);
        Ok(Student {
            student_id: student_id.clone(),
            name: name.trim().to_string(),
            tag_id: tag_id.clone(),
        })
    }

    /// Removes a student and their tag binding.
    ///
    /// Scans already recorded for the student are kept.
    ///
    /// # Errors
    ///
    /// [`AttendanceError::StudentNotFound`] if the student is not registered.
    pub fn remove_student(&self, student_id: &StudentId) -> Result<(), AttendanceError> {
        let removed = self.db.write(|tx| {
            Ok(tx.execute(
                "DELETE FROM students WHERE student_id = ?1",
                params![student_id],
            )?)
        })?;
        if removed == 0 {
            return Err(AttendanceError::StudentNotFound(student_id.clone()));
        }
        log::info!("Removed student {}", student_id);
        Ok(())
    }

    /// All registered students ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the roster cannot be read.
    pub fn list_students(&self) -> Result<Vec<Student>, AttendanceError> {
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT student_id, name, tag_id FROM students ORDER BY student_id ASC",
            )?;
            let students = stmt
                .query_map([], |row| {
                    Ok(Student {
                        student_id: row.get(0)?,
                        name: row.get(1)?,
                        tag_id: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(students)
        })
    }
}

impl TagDirectory for SqliteTagDirectory {
    fn resolve_tag(&self, tag_id: &TagId) -> Result<Option<StudentId>, AttendanceError> {
        let conn = self.db.connect()?;
        let student = conn
            .query_row(
                "SELECT student_id FROM students WHERE tag_id = ?1",
                params![tag_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(student)
    }
}
