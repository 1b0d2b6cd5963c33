mod common;

use axum::http::StatusCode;
use common::{assert_error, seeded_app};
use serde_json::{json, Value};

#[tokio::test]
async fn classes_list_carries_major_and_department_names() {
    let app = seeded_app("recordsd-academics-classes").await;

    let resp = app
        .server
        .get("/academics")
        .add_query_param("type", "classes")
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["total"], 4);
    let first = &body["classes"][0];
    assert_eq!(first["class_name"], "CS 2021-1");
    assert_eq!(first["major_name"], "Computer Science and Technology");
    assert_eq!(first["dept_name"], "School of Computer Science");
}

#[tokio::test]
async fn majors_filter_by_department() {
    let app = seeded_app("recordsd-academics-majors").await;

    let body: Value = app
        .server
        .get("/academics")
        .add_query_param("type", "major")
        .add_query_param("dept_id", 2)
        .await
        .json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["majors"][0]["major_name"], "Electronic Information Engineering");
    assert_eq!(body["majors"][0]["dept_name"], "School of Electronic Engineering");
}

#[tokio::test]
async fn missing_type_lists_classes() {
    let app = seeded_app("recordsd-academics-default-type").await;

    let resp = app.server.get("/academics").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["total"], 4);
    assert_eq!(body["classes"].as_array().map(Vec::len), Some(4));
    assert!(body.get("departments").is_none());
}

#[tokio::test]
async fn unpaged_class_list_returns_every_class() {
    let app = seeded_app("recordsd-academics-unpaged").await;

    for n in 0..11 {
        app.server
            .post("/academics")
            .json(&json!({ "type": "class", "class_name": format!("CS 2024-{n}"), "major_id": 1 }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let body: Value = app
        .server
        .get("/academics")
        .add_query_param("type", "class")
        .await
        .json();
    assert_eq!(body["total"], 15);
    assert_eq!(body["classes"].as_array().map(Vec::len), Some(15));
    assert!(body["page"].is_null());
    assert!(body["limit"].is_null());

    let body: Value = app
        .server
        .get("/academics")
        .add_query_param("type", "class")
        .add_query_param("limit", 10)
        .await
        .json();
    assert_eq!(body["total"], 15);
    assert_eq!(body["classes"].as_array().map(Vec::len), Some(10));
    assert_eq!(body["page"], 1);
}

#[tokio::test]
async fn unknown_type_is_rejected() {
    let app = seeded_app("recordsd-academics-bad-type").await;

    let resp = app
        .server
        .get("/academics")
        .add_query_param("type", "teachers")
        .await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "BAD_REQUEST");

    let resp = app
        .server
        .post("/academics")
        .json(&json!({ "type": "teacher", "name": "x" }))
        .await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "BAD_REQUEST");
}

#[tokio::test]
async fn department_major_class_lifecycle() {
    let app = seeded_app("recordsd-academics-lifecycle").await;

    let resp = app
        .server
        .post("/academics")
        .json(&json!({ "type": "department", "dept_name": "School of Physics" }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    let dept_id = resp.json::<Value>()["id"].as_i64().expect("dept id");

    let resp = app
        .server
        .post("/academics")
        .json(&json!({ "type": "major", "major_name": "Applied Physics", "dept_id": dept_id }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    let major_id = resp.json::<Value>()["id"].as_i64().expect("major id");

    app.server
        .put("/academics")
        .json(&json!({
            "type": "major",
            "id": major_id,
            "major_name": "Engineering Physics",
            "dept_id": dept_id,
        }))
        .await
        .assert_status_ok();

    let resp = app.server.get(&format!("/academics/major/{major_id}")).await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["data"]["major_name"], "Engineering Physics");
    assert_eq!(body["data"]["dept_name"], "School of Physics");

    // The department still owns the major.
    let resp = app
        .server
        .delete("/academics")
        .add_query_param("type", "department")
        .add_query_param("id", dept_id)
        .await;
    assert_error(&resp, StatusCode::CONFLICT, "IN_USE");

    app.server
        .delete("/academics")
        .add_query_param("type", "major")
        .add_query_param("id", major_id)
        .await
        .assert_status_ok();
    app.server
        .delete("/academics")
        .add_query_param("type", "department")
        .add_query_param("id", dept_id)
        .await
        .assert_status_ok();

    let resp = app.server.get(&format!("/academics/department/{dept_id}")).await;
    assert_error(&resp, StatusCode::NOT_FOUND, "NOT_FOUND");
}

#[tokio::test]
async fn class_requires_existing_major() {
    let app = seeded_app("recordsd-academics-class-fk").await;

    let resp = app
        .server
        .post("/academics")
        .json(&json!({ "type": "class", "class_name": "Ghost 2024", "major_id": 999 }))
        .await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "MISSING_REFERENCE");

    let resp = app
        .server
        .post("/academics")
        .json(&json!({ "type": "department", "dept_name": "   " }))
        .await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "VALIDATION_ERROR");

    let resp = app
        .server
        .put("/academics")
        .json(&json!({ "type": "class", "id": 999, "class_name": "Nowhere", "major_id": 1 }))
        .await;
    assert_error(&resp, StatusCode::NOT_FOUND, "NOT_FOUND");
}
