use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{fetch_page, required_text, Filter, ListQuery, Page, Pagination};
use crate::error::{on_delete, on_write, StoreError};

/// Which level of the department > major > class hierarchy a request targets.
/// Listing without a type lists classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicKind {
    #[serde(alias = "departments")]
    Department,
    #[serde(alias = "majors")]
    Major,
    #[default]
    #[serde(alias = "classes")]
    Class,
}

impl AcademicKind {
    pub fn plural(self) -> &'static str {
        match self {
            AcademicKind::Department => "departments",
            AcademicKind::Major => "majors",
            AcademicKind::Class => "classes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Department {
    pub dept_id: i64,
    pub dept_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Major {
    pub major_id: i64,
    pub major_name: String,
    pub dept_id: i64,
    pub dept_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Class {
    pub class_id: i64,
    pub class_name: String,
    pub major_id: i64,
    pub major_name: Option<String>,
    pub dept_name: Option<String>,
    pub student_count: i64,
}

/// Writable fields of one hierarchy row, tagged by level.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AcademicInput {
    Department {
        dept_name: String,
    },
    Major {
        major_name: String,
        dept_id: i64,
    },
    Class {
        class_name: String,
        major_id: i64,
        #[serde(default)]
        student_count: i64,
    },
}

impl AcademicInput {
    pub fn kind(&self) -> AcademicKind {
        match self {
            AcademicInput::Department { .. } => AcademicKind::Department,
            AcademicInput::Major { .. } => AcademicKind::Major,
            AcademicInput::Class { .. } => AcademicKind::Class,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcademicFilter {
    pub name: Option<String>,
    pub dept_id: Option<i64>,
    pub major_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AcademicRow {
    Department(Department),
    Major(Major),
    Class(Class),
}

const DEPARTMENTS: ListQuery = ListQuery {
    columns: "d.dept_id, d.dept_name",
    from: "department d",
    order_by: "d.dept_id",
};

const MAJORS: ListQuery = ListQuery {
    columns: "m.major_id, m.major_name, m.dept_id, d.dept_name",
    from: "major m LEFT JOIN department d ON m.dept_id = d.dept_id",
    order_by: "m.major_id",
};

const CLASSES: ListQuery = ListQuery {
    columns: "c.class_id, c.class_name, c.major_id, m.major_name, d.dept_name, c.student_count",
    from: "class c
           LEFT JOIN major m ON c.major_id = m.major_id
           LEFT JOIN department d ON m.dept_id = d.dept_id",
    order_by: "c.class_id",
};

fn department_row(r: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        dept_id: r.get(0)?,
        dept_name: r.get(1)?,
    })
}

fn major_row(r: &Row<'_>) -> rusqlite::Result<Major> {
    Ok(Major {
        major_id: r.get(0)?,
        major_name: r.get(1)?,
        dept_id: r.get(2)?,
        dept_name: r.get(3)?,
    })
}

fn class_row(r: &Row<'_>) -> rusqlite::Result<Class> {
    Ok(Class {
        class_id: r.get(0)?,
        class_name: r.get(1)?,
        major_id: r.get(2)?,
        major_name: r.get(3)?,
        dept_name: r.get(4)?,
        student_count: r.get(5)?,
    })
}

pub fn list(
    conn: &Connection,
    kind: AcademicKind,
    filter: &AcademicFilter,
    pagination: Option<Pagination>,
) -> Result<Page<AcademicRow>, StoreError> {
    let name = filter.name.as_deref();
    match kind {
        AcademicKind::Department => {
            let f = Filter::new().contains("d.dept_name", name);
            fetch_page(conn, &DEPARTMENTS, &f, pagination, |r| {
                department_row(r).map(AcademicRow::Department)
            })
        }
        AcademicKind::Major => {
            let f = Filter::new()
                .contains("m.major_name", name)
                .eq("m.dept_id", filter.dept_id);
            fetch_page(conn, &MAJORS, &f, pagination, |r| {
                major_row(r).map(AcademicRow::Major)
            })
        }
        AcademicKind::Class => {
            let f = Filter::new()
                .contains("c.class_name", name)
                .eq("c.major_id", filter.major_id)
                .eq("m.dept_id", filter.dept_id);
            fetch_page(conn, &CLASSES, &f, pagination, |r| {
                class_row(r).map(AcademicRow::Class)
            })
        }
    }
}

pub fn get(conn: &Connection, kind: AcademicKind, id: i64) -> Result<AcademicRow, StoreError> {
    let (query, key) = match kind {
        AcademicKind::Department => (&DEPARTMENTS, "d.dept_id"),
        AcademicKind::Major => (&MAJORS, "m.major_id"),
        AcademicKind::Class => (&CLASSES, "c.class_id"),
    };
    let sql = format!(
        "SELECT {} FROM {} WHERE {key} = ?",
        query.columns, query.from
    );
    let row = conn
        .query_row(&sql, [id], |r| match kind {
            AcademicKind::Department => department_row(r).map(AcademicRow::Department),
            AcademicKind::Major => major_row(r).map(AcademicRow::Major),
            AcademicKind::Class => class_row(r).map(AcademicRow::Class),
        })
        .optional()?;
    row.ok_or_else(|| StoreError::not_found(entity_label(kind)))
}

pub fn create(conn: &Connection, input: &AcademicInput) -> Result<i64, StoreError> {
    let kind = input.kind();
    match input {
        AcademicInput::Department { dept_name } => {
            let name = required_text("dept_name", dept_name)?;
            conn.execute("INSERT INTO department(dept_name) VALUES(?)", [&name])
                .map_err(|e| on_write(e, "department", "department"))?;
        }
        AcademicInput::Major {
            major_name,
            dept_id,
        } => {
            let name = required_text("major_name", major_name)?;
            conn.execute(
                "INSERT INTO major(major_name, dept_id) VALUES(?, ?)",
                (&name, dept_id),
            )
            .map_err(|e| on_write(e, "major", parent_label(kind)))?;
        }
        AcademicInput::Class {
            class_name,
            major_id,
            student_count,
        } => {
            let name = required_text("class_name", class_name)?;
            check_student_count(*student_count)?;
            conn.execute(
                "INSERT INTO class(class_name, major_id, student_count) VALUES(?, ?, ?)",
                (&name, major_id, student_count),
            )
            .map_err(|e| on_write(e, "class", parent_label(kind)))?;
        }
    }
    Ok(conn.last_insert_rowid())
}

pub fn update(conn: &Connection, id: i64, input: &AcademicInput) -> Result<(), StoreError> {
    let kind = input.kind();
    let changed = match input {
        AcademicInput::Department { dept_name } => {
            let name = required_text("dept_name", dept_name)?;
            conn.execute(
                "UPDATE department SET dept_name = ? WHERE dept_id = ?",
                (&name, id),
            )
            .map_err(|e| on_write(e, "department", "department"))?
        }
        AcademicInput::Major {
            major_name,
            dept_id,
        } => {
            let name = required_text("major_name", major_name)?;
            conn.execute(
                "UPDATE major SET major_name = ?, dept_id = ? WHERE major_id = ?",
                (&name, dept_id, id),
            )
            .map_err(|e| on_write(e, "major", parent_label(kind)))?
        }
        AcademicInput::Class {
            class_name,
            major_id,
            student_count,
        } => {
            let name = required_text("class_name", class_name)?;
            check_student_count(*student_count)?;
            conn.execute(
                "UPDATE class SET class_name = ?, major_id = ?, student_count = ? WHERE class_id = ?",
                (&name, major_id, student_count, id),
            )
            .map_err(|e| on_write(e, "class", parent_label(kind)))?
        }
    };
    if changed == 0 {
        return Err(StoreError::not_found(entity_label(kind)));
    }
    Ok(())
}

pub fn delete(conn: &Connection, kind: AcademicKind, id: i64) -> Result<(), StoreError> {
    let sql = match kind {
        AcademicKind::Department => "DELETE FROM department WHERE dept_id = ?",
        AcademicKind::Major => "DELETE FROM major WHERE major_id = ?",
        AcademicKind::Class => "DELETE FROM class WHERE class_id = ?",
    };
    let changed = conn
        .execute(sql, [id])
        .map_err(|e| on_delete(e, entity_label(kind)))?;
    if changed == 0 {
        return Err(StoreError::not_found(entity_label(kind)));
    }
    Ok(())
}

fn check_student_count(n: i64) -> Result<(), StoreError> {
    if n < 0 {
        return Err(StoreError::validation(
            "student_count",
            "student_count must not be negative",
        ));
    }
    Ok(())
}

fn entity_label(kind: AcademicKind) -> &'static str {
    match kind {
        AcademicKind::Department => "department",
        AcademicKind::Major => "major",
        AcademicKind::Class => "class",
    }
}

fn parent_label(kind: AcademicKind) -> &'static str {
    match kind {
        AcademicKind::Department => "department",
        AcademicKind::Major => "department",
        AcademicKind::Class => "major",
    }
}
