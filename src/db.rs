use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde::Serialize;

use crate::config::DbConfig;
use crate::error::StoreError;

/// Pooled handle to the records database.
///
/// Built once at startup and cloned into request state; every clone shares the
/// same pool. Dropping the last clone closes the pooled connections.
#[derive(Clone)]
pub struct Db {
    pool: Pool<SqliteConnectionManager>,
}

impl Db {
    pub fn open(config: &DbConfig) -> anyhow::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(&config.path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(0))
            .idle_timeout(Some(config.idle_timeout))
            .build(manager)?;

        Ok(Self { pool })
    }

    /// Run blocking SQL on a pooled connection off the async executor.
    pub async fn run<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }

    pub fn pool_state(&self) -> (u32, u32) {
        let s = self.pool.state();
        (s.connections, s.idle_connections)
    }
}

pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS department(
            dept_id INTEGER PRIMARY KEY AUTOINCREMENT,
            dept_name TEXT NOT NULL CHECK(length(trim(dept_name)) > 0)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS major(
            major_id INTEGER PRIMARY KEY AUTOINCREMENT,
            major_name TEXT NOT NULL,
            dept_id INTEGER NOT NULL,
            FOREIGN KEY(dept_id) REFERENCES department(dept_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_major_dept ON major(dept_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class(
            class_id INTEGER PRIMARY KEY AUTOINCREMENT,
            class_name TEXT NOT NULL,
            major_id INTEGER NOT NULL,
            student_count INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(major_id) REFERENCES major(major_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_class_major ON class(major_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS student(
            student_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            gender TEXT NOT NULL CHECK(gender IN ('male', 'female')),
            birth_date TEXT,
            class_id INTEGER NOT NULL,
            admission_year INTEGER,
            FOREIGN KEY(class_id) REFERENCES class(class_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_student_class ON student(class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS course(
            course_id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_name TEXT NOT NULL,
            credits REAL,
            course_type TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS score(
            student_id TEXT NOT NULL,
            course_id INTEGER NOT NULL,
            score INTEGER NOT NULL CHECK(score BETWEEN 0 AND 100),
            term TEXT,
            PRIMARY KEY(student_id, course_id),
            FOREIGN KEY(student_id) REFERENCES student(student_id),
            FOREIGN KEY(course_id) REFERENCES course(course_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_score_course ON score(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS reward_punishment(
            rp_id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL,
            type TEXT NOT NULL CHECK(type IN ('reward', 'punishment')),
            reason TEXT,
            date TEXT,
            FOREIGN KEY(student_id) REFERENCES student(student_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reward_punishment_student ON reward_punishment(student_id)",
        [],
    )?;

    Ok(())
}

/// Sample data set; every insert is keyed so re-running is a no-op.
pub fn seed_demo_data(conn: &mut Connection) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "INSERT OR IGNORE INTO department(dept_id, dept_name) VALUES
           (1, 'School of Computer Science'),
           (2, 'School of Electronic Engineering'),
           (3, 'School of Mechanical Engineering'),
           (4, 'School of Economics and Management');

         INSERT OR IGNORE INTO major(major_id, major_name, dept_id) VALUES
           (1, 'Computer Science and Technology', 1),
           (2, 'Software Engineering', 1),
           (3, 'Network Engineering', 1),
           (4, 'Electronic Information Engineering', 2);

         INSERT OR IGNORE INTO class(class_id, class_name, major_id) VALUES
           (1, 'CS 2021-1', 1),
           (2, 'CS 2021-2', 1),
           (3, 'SE 2021-1', 2),
           (4, 'NE 2021-1', 3);

         INSERT OR IGNORE INTO student(student_id, name, gender, birth_date, class_id, admission_year) VALUES
           ('20210001', 'Zhang San', 'male', '2003-05-12', 1, 2021),
           ('20210002', 'Li Si', 'female', '2003-11-08', 1, 2021),
           ('20210003', 'Wang Wu', 'male', '2003-03-25', 2, 2021),
           ('20210004', 'Zhao Liu', 'female', '2003-07-30', 3, 2021);

         INSERT OR IGNORE INTO course(course_id, course_name, credits, course_type) VALUES
           (1, 'Advanced Mathematics', 5, 'required'),
           (2, 'College English', 4, 'required'),
           (3, 'Data Structures', 4, 'required'),
           (4, 'Operating Systems', 3, 'elective');

         INSERT OR IGNORE INTO score(student_id, course_id, score, term) VALUES
           ('20210001', 1, 92, '2024 Spring'),
           ('20210002', 3, 86, '2024 Spring'),
           ('20210003', 2, 78, '2024 Spring');

         INSERT OR IGNORE INTO reward_punishment(rp_id, student_id, type, reason, date) VALUES
           (1, '20210001', 'reward', 'National scholarship', '2024-04-20'),
           (2, '20210003', 'punishment', 'Ten hours of unexcused absence', '2024-03-15');",
    )?;
    tx.commit()?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct DbStatus {
    pub tables: Vec<String>,
    pub student_count: i64,
}

pub fn status(conn: &Connection) -> Result<DbStatus, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let student_count = if tables.iter().any(|t| t == "student") {
        conn.query_row("SELECT COUNT(*) FROM student", [], |r| r.get(0))?
    } else {
        0
    };

    Ok(DbStatus {
        tables,
        student_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open memory db");
        conn.execute("PRAGMA foreign_keys = ON", [])
            .expect("enable foreign keys");
        init_schema(&conn).expect("init schema");
        conn
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = memory_db();
        init_schema(&conn).expect("second init");
        let st = status(&conn).expect("status");
        for t in [
            "class",
            "course",
            "department",
            "major",
            "reward_punishment",
            "score",
            "student",
        ] {
            assert!(st.tables.iter().any(|x| x == t), "missing table {t}");
        }
    }

    #[test]
    fn seeding_twice_keeps_one_copy() {
        let mut conn = memory_db();
        seed_demo_data(&mut conn).expect("seed");
        seed_demo_data(&mut conn).expect("seed again");
        let st = status(&conn).expect("status");
        assert_eq!(st.student_count, 4);
    }

    #[test]
    fn check_constraints_guard_enum_columns() {
        let mut conn = memory_db();
        seed_demo_data(&mut conn).expect("seed");
        let res = conn.execute(
            "INSERT INTO student(student_id, name, gender, class_id) VALUES('x1', 'X', 'other', 1)",
            [],
        );
        assert!(res.is_err());
        let res = conn.execute(
            "INSERT INTO score(student_id, course_id, score) VALUES('20210004', 1, 101)",
            [],
        );
        assert!(res.is_err());
    }
}
