use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{fetch_page, required_text, Filter, ListQuery, Page, Pagination};
use crate::error::{on_write, StoreError};

pub const MAX_STUDENT_ID_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Older clients send the Chinese literals.
        match s.trim() {
            "male" | "男" => Ok(Gender::Male),
            "female" | "女" => Ok(Gender::Female),
            _ => Err(StoreError::validation(
                "gender",
                "gender must be \"male\" or \"female\"",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub class_id: i64,
    pub admission_year: Option<i32>,
    pub class_name: Option<String>,
    pub major_name: Option<String>,
    pub dept_name: Option<String>,
}

/// Request body for create (id required) and update (id taken from the path).
#[derive(Debug, Clone, Deserialize)]
pub struct StudentInput {
    #[serde(default, alias = "id")]
    pub student_id: Option<String>,
    pub name: String,
    pub gender: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub class_id: i64,
    #[serde(default)]
    pub admission_year: Option<i32>,
}

struct ValidStudent {
    name: String,
    gender: Gender,
    birth_date: Option<NaiveDate>,
    class_id: i64,
    admission_year: Option<i32>,
}

impl StudentInput {
    fn validate(&self) -> Result<ValidStudent, StoreError> {
        let name = required_text("name", &self.name)?;
        let gender: Gender = self.gender.parse()?;
        if let Some(y) = self.admission_year {
            if !(1900..=9999).contains(&y) {
                return Err(StoreError::validation(
                    "admission_year",
                    "admission_year must be a four-digit year",
                ));
            }
        }
        Ok(ValidStudent {
            name,
            gender,
            birth_date: self.birth_date,
            class_id: self.class_id,
            admission_year: self.admission_year,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentFilter {
    pub name: Option<String>,
    pub class_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentSummary {
    pub student_id: String,
    pub name: String,
    pub class_name: Option<String>,
    pub major_name: Option<String>,
    pub dept_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptLine {
    pub course_id: i64,
    pub course_name: String,
    pub credits: Option<f64>,
    pub course_type: Option<String>,
    pub score: i64,
    pub term: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub student_id: String,
    pub name: String,
    pub transcript: Vec<TranscriptLine>,
    pub average_score: Option<f64>,
    pub credits_earned: f64,
}

pub const PASSING_SCORE: i64 = 60;

const STUDENTS: ListQuery = ListQuery {
    columns: "s.student_id, s.name, s.gender, s.birth_date, s.class_id, s.admission_year,
              c.class_name, m.major_name, d.dept_name",
    from: "student s
           LEFT JOIN class c ON s.class_id = c.class_id
           LEFT JOIN major m ON c.major_id = m.major_id
           LEFT JOIN department d ON m.dept_id = d.dept_id",
    order_by: "s.student_id",
};

fn student_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    let gender: String = r.get(2)?;
    let gender = gender.parse::<Gender>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Student {
        student_id: r.get(0)?,
        name: r.get(1)?,
        gender,
        birth_date: r.get(3)?,
        class_id: r.get(4)?,
        admission_year: r.get(5)?,
        class_name: r.get(6)?,
        major_name: r.get(7)?,
        dept_name: r.get(8)?,
    })
}

fn check_student_id(raw: &str) -> Result<String, StoreError> {
    let id = required_text("student_id", raw)?;
    if id.chars().count() > MAX_STUDENT_ID_LEN {
        return Err(StoreError::validation(
            "student_id",
            format!("student_id must be at most {MAX_STUDENT_ID_LEN} characters"),
        ));
    }
    Ok(id)
}

pub fn list(
    conn: &Connection,
    filter: &StudentFilter,
    pagination: Pagination,
) -> Result<Page<Student>, StoreError> {
    let f = Filter::new()
        .contains("s.name", filter.name.as_deref())
        .eq("s.class_id", filter.class_id);
    fetch_page(conn, &STUDENTS, &f, Some(pagination), student_row)
}

pub fn get(conn: &Connection, student_id: &str) -> Result<Student, StoreError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE s.student_id = ?",
        STUDENTS.columns, STUDENTS.from
    );
    conn.query_row(&sql, [student_id], student_row)
        .optional()?
        .ok_or_else(|| StoreError::not_found("student"))
}

pub fn create(conn: &Connection, input: &StudentInput) -> Result<String, StoreError> {
    let raw_id = input
        .student_id
        .as_deref()
        .ok_or_else(|| StoreError::validation("student_id", "student_id is required"))?;
    let student_id = check_student_id(raw_id)?;
    let v = input.validate()?;

    conn.execute(
        "INSERT INTO student(student_id, name, gender, birth_date, class_id, admission_year)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &student_id,
            &v.name,
            v.gender.as_str(),
            v.birth_date,
            v.class_id,
            v.admission_year,
        ),
    )
    .map_err(|e| on_write(e, "student id", "class"))?;

    Ok(student_id)
}

pub fn update(conn: &Connection, student_id: &str, input: &StudentInput) -> Result<(), StoreError> {
    let v = input.validate()?;
    let changed = conn
        .execute(
            "UPDATE student
             SET name = ?, gender = ?, birth_date = ?, class_id = ?, admission_year = ?
             WHERE student_id = ?",
            (
                &v.name,
                v.gender.as_str(),
                v.birth_date,
                v.class_id,
                v.admission_year,
                student_id,
            ),
        )
        .map_err(|e| on_write(e, "student id", "class"))?;
    if changed == 0 {
        return Err(StoreError::not_found("student"));
    }
    Ok(())
}

/// Remove a student together with the rows that reference it, atomically.
pub fn delete(conn: &mut Connection, student_id: &str) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM reward_punishment WHERE student_id = ?",
        [student_id],
    )?;
    tx.execute("DELETE FROM score WHERE student_id = ?", [student_id])?;
    let changed = tx.execute("DELETE FROM student WHERE student_id = ?", [student_id])?;
    if changed == 0 {
        // Dropping the transaction rolls back; nothing was removed anyway.
        return Err(StoreError::not_found("student"));
    }
    tx.commit()?;
    Ok(())
}

pub fn summary(conn: &Connection, student_id: &str) -> Result<StudentSummary, StoreError> {
    let s = get(conn, student_id)?;
    Ok(StudentSummary {
        student_id: s.student_id,
        name: s.name,
        class_name: s.class_name,
        major_name: s.major_name,
        dept_name: s.dept_name,
    })
}

pub fn transcript(conn: &Connection, student_id: &str) -> Result<Transcript, StoreError> {
    let name: String = conn
        .query_row(
            "SELECT name FROM student WHERE student_id = ?",
            [student_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("student"))?;

    let mut stmt = conn.prepare(
        "SELECT c.course_id, c.course_name, c.credits, c.course_type, sc.score, sc.term
         FROM score sc
         JOIN course c ON sc.course_id = c.course_id
         WHERE sc.student_id = ?
         ORDER BY sc.term, c.course_name",
    )?;
    let lines = stmt
        .query_map([student_id], |r| {
            Ok(TranscriptLine {
                course_id: r.get(0)?,
                course_name: r.get(1)?,
                credits: r.get(2)?,
                course_type: r.get(3)?,
                score: r.get(4)?,
                term: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let (average_score, credits_earned) = transcript_totals(&lines);
    Ok(Transcript {
        student_id: student_id.to_string(),
        name,
        transcript: lines,
        average_score,
        credits_earned,
    })
}

fn transcript_totals(lines: &[TranscriptLine]) -> (Option<f64>, f64) {
    if lines.is_empty() {
        return (None, 0.0);
    }
    let sum: i64 = lines.iter().map(|l| l.score).sum();
    let avg = sum as f64 / lines.len() as f64;
    let credits = lines
        .iter()
        .filter(|l| l.score >= PASSING_SCORE)
        .filter_map(|l| l.credits)
        .sum();
    (Some((avg * 100.0).round() / 100.0), credits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::seeded_db;

    fn input(id: &str, gender: &str) -> StudentInput {
        StudentInput {
            student_id: Some(id.to_string()),
            name: "Test".into(),
            gender: gender.into(),
            birth_date: NaiveDate::from_ymd_opt(2003, 1, 1),
            class_id: 1,
            admission_year: Some(2021),
        }
    }

    #[test]
    fn gender_accepts_english_and_chinese_literals() {
        assert_eq!("male".parse::<Gender>().expect("male"), Gender::Male);
        assert_eq!("女".parse::<Gender>().expect("female"), Gender::Female);
        assert!(matches!(
            "other".parse::<Gender>(),
            Err(StoreError::Validation { field: "gender", .. })
        ));
    }

    #[test]
    fn create_then_get_returns_same_fields() {
        let conn = seeded_db();
        let id = create(&conn, &input("20210099", "male")).expect("create");
        assert_eq!(id, "20210099");

        let s = get(&conn, "20210099").expect("get");
        assert_eq!(s.name, "Test");
        assert_eq!(s.gender, Gender::Male);
        assert_eq!(s.birth_date, NaiveDate::from_ymd_opt(2003, 1, 1));
        assert_eq!(s.class_id, 1);
        assert_eq!(s.admission_year, Some(2021));
        assert_eq!(s.class_name.as_deref(), Some("CS 2021-1"));
    }

    #[test]
    fn chinese_gender_is_stored_canonically() {
        let conn = seeded_db();
        create(&conn, &input("20210100", "女")).expect("create");
        let raw: String = conn
            .query_row(
                "SELECT gender FROM student WHERE student_id = '20210100'",
                [],
                |r| r.get(0),
            )
            .expect("raw gender");
        assert_eq!(raw, "female");
    }

    #[test]
    fn invalid_gender_writes_nothing() {
        let conn = seeded_db();
        let err = create(&conn, &input("20210101", "unknown")).expect_err("invalid gender");
        assert!(matches!(err, StoreError::Validation { field: "gender", .. }));
        assert!(matches!(get(&conn, "20210101"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn duplicate_id_and_missing_class_are_distinct() {
        let conn = seeded_db();
        let err = create(&conn, &input("20210001", "male")).expect_err("duplicate");
        assert!(matches!(err, StoreError::Duplicate(_)));

        let mut orphan = input("20210102", "male");
        orphan.class_id = 999;
        let err = create(&conn, &orphan).expect_err("missing class");
        assert!(matches!(err, StoreError::MissingReference(ref p) if p == "class"));
    }

    #[test]
    fn overlong_id_is_rejected() {
        let conn = seeded_db();
        let err = create(&conn, &input("20210000001", "male")).expect_err("too long");
        assert!(matches!(err, StoreError::Validation { field: "student_id", .. }));
    }

    #[test]
    fn delete_cascades_scores_and_rewards() {
        let mut conn = seeded_db();
        delete(&mut conn, "20210001").expect("delete");

        let scores: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM score WHERE student_id = '20210001'",
                [],
                |r| r.get(0),
            )
            .expect("count scores");
        let rewards: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM reward_punishment WHERE student_id = '20210001'",
                [],
                |r| r.get(0),
            )
            .expect("count rewards");
        assert_eq!((scores, rewards), (0, 0));
        assert!(matches!(get(&conn, "20210001"), Err(StoreError::NotFound(_))));

        assert!(matches!(
            delete(&mut conn, "20210001"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn transcript_totals_only_count_passed_credits() {
        let conn = seeded_db();
        conn.execute(
            "INSERT INTO score(student_id, course_id, score, term) VALUES('20210001', 4, 40, '2024 Spring')",
            [],
        )
        .expect("insert failing score");
        let t = transcript(&conn, "20210001").expect("transcript");
        assert_eq!(t.transcript.len(), 2);
        assert_eq!(t.average_score, Some(66.0));
        assert_eq!(t.credits_earned, 5.0);
    }

    #[test]
    fn transcript_for_unknown_student_is_not_found() {
        let conn = seeded_db();
        assert!(matches!(
            transcript(&conn, "nobody"),
            Err(StoreError::NotFound(_))
        ));
    }
}
