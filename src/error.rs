use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{0} does not exist")]
    MissingReference(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} is still referenced by other records")]
    InUse(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Unique,
    ForeignKey,
    Other,
}

pub fn constraint_of(err: &rusqlite::Error) -> Option<Constraint> {
    let rusqlite::Error::SqliteFailure(e, _) = err else {
        return None;
    };
    if e.code != ErrorCode::ConstraintViolation {
        return None;
    }
    Some(match e.extended_code {
        rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
            Constraint::Unique
        }
        rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Constraint::ForeignKey,
        _ => Constraint::Other,
    })
}

/// Classify an INSERT/UPDATE failure. `entity` names the row being written and
/// `parent` the row(s) its foreign keys point at.
pub fn on_write(err: rusqlite::Error, entity: &str, parent: &str) -> StoreError {
    match constraint_of(&err) {
        Some(Constraint::Unique) => StoreError::Duplicate(entity.to_string()),
        Some(Constraint::ForeignKey) => StoreError::MissingReference(parent.to_string()),
        _ => StoreError::Sqlite(err),
    }
}

/// Classify a DELETE failure: a foreign key hit means children still point at the row.
pub fn on_delete(err: rusqlite::Error, entity: &str) -> StoreError {
    match constraint_of(&err) {
        Some(Constraint::ForeignKey) => StoreError::InUse(entity.to_string()),
        _ => StoreError::Sqlite(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::seeded_db;

    #[test]
    fn constraint_failures_are_classified() {
        let conn = seeded_db();

        let dup = conn
            .execute("INSERT INTO department(dept_id, dept_name) VALUES (1, 'Again')", [])
            .expect_err("duplicate key");
        assert_eq!(constraint_of(&dup), Some(Constraint::Unique));
        assert!(matches!(on_write(dup, "department", "-"), StoreError::Duplicate(_)));

        let orphan = conn
            .execute("INSERT INTO major(major_name, dept_id) VALUES ('Orphan', 999)", [])
            .expect_err("missing parent");
        assert!(matches!(
            on_write(orphan, "major", "department"),
            StoreError::MissingReference(_)
        ));

        let range = conn
            .execute(
                "INSERT INTO score(student_id, course_id, score) VALUES ('20210004', 4, 101)",
                [],
            )
            .expect_err("check constraint");
        assert_eq!(constraint_of(&range), Some(Constraint::Other));
        assert!(matches!(on_write(range, "score", "student"), StoreError::Sqlite(_)));

        let in_use = conn
            .execute("DELETE FROM department WHERE dept_id = 1", [])
            .expect_err("referenced parent");
        assert!(matches!(on_delete(in_use, "department"), StoreError::InUse(_)));
    }
}
