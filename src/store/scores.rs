use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{fetch_page, optional_text, required_text, Filter, ListQuery, Page, Pagination};
use crate::error::{on_write, StoreError};

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub student_id: String,
    pub student_name: Option<String>,
    pub course_id: i64,
    pub course_name: Option<String>,
    pub score: i64,
    pub term: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewScore {
    pub student_id: String,
    pub course_id: i64,
    pub score: i64,
    #[serde(default)]
    pub term: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreUpdate {
    pub score: i64,
    #[serde(default)]
    pub term: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreFilter {
    pub student_id: Option<String>,
    pub course_id: Option<i64>,
    pub term: Option<String>,
}

pub fn check_score(value: i64) -> Result<(), StoreError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
        return Err(StoreError::validation(
            "score",
            format!("score must be between {MIN_SCORE} and {MAX_SCORE}"),
        ));
    }
    Ok(())
}

const SCORES: ListQuery = ListQuery {
    columns: "sc.student_id, s.name, sc.course_id, c.course_name, sc.score, sc.term",
    from: "score sc
           LEFT JOIN student s ON sc.student_id = s.student_id
           LEFT JOIN course c ON sc.course_id = c.course_id",
    order_by: "sc.student_id, sc.course_id",
};

fn score_row(r: &Row<'_>) -> rusqlite::Result<Score> {
    Ok(Score {
        student_id: r.get(0)?,
        student_name: r.get(1)?,
        course_id: r.get(2)?,
        course_name: r.get(3)?,
        score: r.get(4)?,
        term: r.get(5)?,
    })
}

pub fn list(
    conn: &Connection,
    filter: &ScoreFilter,
    pagination: Option<Pagination>,
) -> Result<Page<Score>, StoreError> {
    let f = Filter::new()
        .eq("sc.student_id", optional_text(filter.student_id.as_deref()))
        .eq("sc.course_id", filter.course_id)
        .eq("sc.term", optional_text(filter.term.as_deref()));
    fetch_page(conn, &SCORES, &f, pagination, score_row)
}

pub fn get(conn: &Connection, student_id: &str, course_id: i64) -> Result<Score, StoreError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE sc.student_id = ? AND sc.course_id = ?",
        SCORES.columns, SCORES.from
    );
    conn.query_row(&sql, (student_id, course_id), score_row)
        .optional()?
        .ok_or_else(|| StoreError::not_found("score"))
}

pub fn create(conn: &Connection, input: &NewScore) -> Result<(), StoreError> {
    check_score(input.score)?;
    let student_id = required_text("student_id", &input.student_id)?;
    conn.execute(
        "INSERT INTO score(student_id, course_id, score, term) VALUES(?, ?, ?, ?)",
        (
            &student_id,
            input.course_id,
            input.score,
            optional_text(input.term.as_deref()),
        ),
    )
    .map_err(|e| on_write(e, "score for this student and course", "student or course"))?;
    Ok(())
}

pub fn update(
    conn: &Connection,
    student_id: &str,
    course_id: i64,
    input: &ScoreUpdate,
) -> Result<(), StoreError> {
    check_score(input.score)?;
    let changed = conn.execute(
        "UPDATE score SET score = ?, term = ? WHERE student_id = ? AND course_id = ?",
        (
            input.score,
            optional_text(input.term.as_deref()),
            student_id,
            course_id,
        ),
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("score"));
    }
    Ok(())
}

pub fn delete(conn: &Connection, student_id: &str, course_id: i64) -> Result<(), StoreError> {
    let changed = conn.execute(
        "DELETE FROM score WHERE student_id = ? AND course_id = ?",
        (student_id, course_id),
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("score"));
    }
    Ok(())
}
