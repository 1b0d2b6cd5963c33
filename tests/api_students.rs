mod common;

use axum::http::StatusCode;
use common::{assert_error, count, seeded_app};
use serde_json::{json, Value};

fn new_student(id: &str, gender: &str) -> Value {
    json!({
        "student_id": id,
        "name": "Test",
        "gender": gender,
        "birth_date": "2003-01-01",
        "class_id": 1,
        "admission_year": 2021,
    })
}

#[tokio::test]
async fn created_student_reads_back_with_class_major_and_department() {
    let app = seeded_app("recordsd-students-create").await;

    let resp = app
        .server
        .post("/students")
        .json(&json!({
            "id": "20210099",
            "name": "Test",
            "gender": "male",
            "birth_date": "2003-01-01",
            "class_id": 1,
            "admission_year": 2021,
        }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    let body: Value = resp.json();
    assert_eq!(body["student_id"], "20210099");

    let resp = app.server.get("/students/20210099").await;
    resp.assert_status_ok();
    let student = &resp.json::<Value>()["student"];
    assert_eq!(student["student_id"], "20210099");
    assert_eq!(student["name"], "Test");
    assert_eq!(student["gender"], "male");
    assert_eq!(student["birth_date"], "2003-01-01");
    assert_eq!(student["class_id"], 1);
    assert_eq!(student["admission_year"], 2021);
    assert_eq!(student["class_name"], "CS 2021-1");
    assert_eq!(student["major_name"], "Computer Science and Technology");
    assert_eq!(student["dept_name"], "School of Computer Science");
}

#[tokio::test]
async fn chinese_gender_literal_is_stored_canonically() {
    let app = seeded_app("recordsd-students-gender-alias").await;
    app.server
        .post("/students")
        .json(&new_student("20210100", "女"))
        .await
        .assert_status(StatusCode::CREATED);

    let resp = app.server.get("/students/20210100").await;
    assert_eq!(resp.json::<Value>()["student"]["gender"], "female");
}

#[tokio::test]
async fn invalid_gender_is_rejected_without_writing() {
    let app = seeded_app("recordsd-students-bad-gender").await;
    let before = count(&app.db, "SELECT COUNT(*) FROM student").await;

    let resp = app
        .server
        .post("/students")
        .json(&new_student("20210101", "other"))
        .await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "VALIDATION_ERROR");
    assert!(resp.json::<Value>()["error"]
        .as_str()
        .is_some_and(|m| m.contains("gender")));

    assert_eq!(count(&app.db, "SELECT COUNT(*) FROM student").await, before);
    app.server
        .get("/students/20210101")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn duplicate_id_and_unknown_class_are_distinct_errors() {
    let app = seeded_app("recordsd-students-dup").await;

    let resp = app
        .server
        .post("/students")
        .json(&new_student("20210001", "male"))
        .await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "DUPLICATE");

    let mut body = new_student("20210102", "male");
    body["class_id"] = json!(999);
    let resp = app.server.post("/students").json(&body).await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "MISSING_REFERENCE");

    let resp = app
        .server
        .post("/students")
        .json(&new_student("20210102345", "male"))
        .await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "VALIDATION_ERROR");
}

#[tokio::test]
async fn deleting_student_removes_scores_and_records() {
    let app = seeded_app("recordsd-students-delete").await;

    app.server
        .delete("/students/20210001")
        .await
        .assert_status_ok();

    app.server
        .get("/students/20210001")
        .await
        .assert_status_not_found();
    assert_eq!(
        count(&app.db, "SELECT COUNT(*) FROM score WHERE student_id = '20210001'").await,
        0
    );
    assert_eq!(
        count(
            &app.db,
            "SELECT COUNT(*) FROM reward_punishment WHERE student_id = '20210001'"
        )
        .await,
        0
    );

    let resp = app.server.delete("/students/20210001").await;
    assert_error(&resp, StatusCode::NOT_FOUND, "NOT_FOUND");
}

#[tokio::test]
async fn update_replaces_the_whole_row() {
    let app = seeded_app("recordsd-students-update").await;

    app.server
        .put("/students/20210004")
        .json(&json!({
            "name": "Zhao Liu",
            "gender": "female",
            "class_id": 2,
        }))
        .await
        .assert_status_ok();

    let student = app.server.get("/students/20210004").await.json::<Value>()["student"].clone();
    assert_eq!(student["class_name"], "CS 2021-2");
    assert_eq!(student["birth_date"], Value::Null);
    assert_eq!(student["admission_year"], Value::Null);

    let resp = app
        .server
        .put("/students/nobody")
        .json(&new_student("nobody", "male"))
        .await;
    resp.assert_status_not_found();
}

#[tokio::test]
async fn list_filters_and_paginates() {
    let app = seeded_app("recordsd-students-list").await;

    let resp = app
        .server
        .get("/students")
        .add_query_param("class_id", 1)
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["students"][0]["student_id"], "20210001");

    let body: Value = app
        .server
        .get("/students")
        .add_query_param("page", 2)
        .add_query_param("limit", 3)
        .await
        .json();
    assert_eq!(body["page"], 2);
    assert_eq!(body["limit"], 3);
    assert_eq!(body["total"], 4);
    assert_eq!(body["students"].as_array().map(Vec::len), Some(1));

    let body: Value = app
        .server
        .get("/students")
        .add_query_param("name", "Si")
        .await
        .json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["students"][0]["name"], "Li Si");

    let resp = app
        .server
        .get("/students")
        .add_query_param("limit", 0)
        .await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "VALIDATION_ERROR");
}

#[tokio::test]
async fn summary_and_transcript() {
    let app = seeded_app("recordsd-students-transcript").await;

    let summary = app.server.get("/students/20210003/summary").await.json::<Value>();
    assert_eq!(summary["summary"]["class_name"], "CS 2021-2");
    assert_eq!(summary["summary"]["dept_name"], "School of Computer Science");

    let resp = app.server.get("/students/20210001/transcript").await;
    resp.assert_status_ok();
    let t: Value = resp.json();
    assert_eq!(t["transcript"][0]["course_name"], "Advanced Mathematics");
    assert_eq!(t["transcript"][0]["score"], 92);
    assert_eq!(t["average_score"], 92.0);
    assert_eq!(t["credits_earned"], 5.0);

    app.server
        .get("/students/nobody/transcript")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn malformed_body_uses_error_shape() {
    let app = seeded_app("recordsd-students-malformed").await;
    let resp = app
        .server
        .post("/students")
        .json(&json!({ "name": "No class" }))
        .await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "BAD_REQUEST");
}
