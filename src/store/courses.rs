use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{fetch_page, optional_text, required_text, Filter, ListQuery, Page, Pagination};
use crate::error::{on_delete, on_write, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub course_id: i64,
    pub course_name: String,
    pub credits: Option<f64>,
    pub course_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseInput {
    pub course_name: String,
    #[serde(default)]
    pub credits: Option<f64>,
    #[serde(default)]
    pub course_type: Option<String>,
}

impl CourseInput {
    fn validate(&self) -> Result<(String, Option<f64>, Option<String>), StoreError> {
        let name = required_text("course_name", &self.course_name)?;
        if let Some(c) = self.credits {
            if !c.is_finite() || c < 0.0 {
                return Err(StoreError::validation(
                    "credits",
                    "credits must be a non-negative number",
                ));
            }
        }
        Ok((name, self.credits, optional_text(self.course_type.as_deref())))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseFilter {
    pub name: Option<String>,
    pub course_type: Option<String>,
}

const COURSES: ListQuery = ListQuery {
    columns: "course_id, course_name, credits, course_type",
    from: "course",
    order_by: "course_id",
};

fn course_row(r: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        course_id: r.get(0)?,
        course_name: r.get(1)?,
        credits: r.get(2)?,
        course_type: r.get(3)?,
    })
}

pub fn list(
    conn: &Connection,
    filter: &CourseFilter,
    pagination: Option<Pagination>,
) -> Result<Page<Course>, StoreError> {
    let f = Filter::new()
        .contains("course_name", filter.name.as_deref())
        .eq("course_type", optional_text(filter.course_type.as_deref()));
    fetch_page(conn, &COURSES, &f, pagination, course_row)
}

pub fn get(conn: &Connection, course_id: i64) -> Result<Course, StoreError> {
    conn.query_row(
        "SELECT course_id, course_name, credits, course_type FROM course WHERE course_id = ?",
        [course_id],
        course_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("course"))
}

pub fn create(conn: &Connection, input: &CourseInput) -> Result<i64, StoreError> {
    let (name, credits, course_type) = input.validate()?;
    conn.execute(
        "INSERT INTO course(course_name, credits, course_type) VALUES(?, ?, ?)",
        (&name, credits, &course_type),
    )
    .map_err(|e| on_write(e, "course", "course"))?;
    Ok(conn.last_insert_rowid())
}

pub fn update(conn: &Connection, course_id: i64, input: &CourseInput) -> Result<(), StoreError> {
    let (name, credits, course_type) = input.validate()?;
    let changed = conn
        .execute(
            "UPDATE course SET course_name = ?, credits = ?, course_type = ? WHERE course_id = ?",
            (&name, credits, &course_type, course_id),
        )
        .map_err(|e| on_write(e, "course", "course"))?;
    if changed == 0 {
        return Err(StoreError::not_found("course"));
    }
    Ok(())
}

pub fn delete(conn: &Connection, course_id: i64) -> Result<(), StoreError> {
    let changed = conn
        .execute("DELETE FROM course WHERE course_id = ?", [course_id])
        .map_err(|e| on_delete(e, "course"))?;
    if changed == 0 {
        return Err(StoreError::not_found("course"));
    }
    Ok(())
}
