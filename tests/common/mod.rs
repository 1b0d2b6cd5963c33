#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use recordsd::{create_router, db, AppState, BackupStore, Db, DbConfig};
use serde_json::Value;

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct TestApp {
    pub server: TestServer,
    pub db: Db,
    pub dir: PathBuf,
}

impl TestApp {
    pub fn backup_dir(&self) -> PathBuf {
        self.dir.join("backups")
    }
}

/// Fresh database file with the demo records, served through the full router.
pub async fn seeded_app(prefix: &str) -> TestApp {
    let dir = temp_dir(prefix);
    let db = Db::open(&DbConfig::new(dir.join("records.sqlite3"))).expect("open db");
    db.run(|conn| {
        db::init_schema(conn)?;
        db::seed_demo_data(conn)
    })
    .await
    .expect("seed db");

    let state = AppState::new(db.clone(), BackupStore::new(dir.join("backups")));
    let server = TestServer::new(create_router(state)).expect("test server");
    TestApp { server, db, dir }
}

pub fn assert_error(resp: &TestResponse, status: StatusCode, code: &str) {
    resp.assert_status(status);
    let body: Value = resp.json();
    assert_eq!(body["code"], code, "unexpected body: {body}");
    assert!(body["error"].as_str().is_some_and(|s| !s.is_empty()));
}

pub async fn count(db: &Db, sql: &'static str) -> i64 {
    db.run(move |conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
        .await
        .expect("count query")
}
