use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::api::extract::{Params, PathArgs, Payload};
use crate::api::state::AppState;
use crate::store::courses::{self, CourseFilter, CourseInput};
use crate::store::PageParams;

pub async fn list(
    State(state): State<AppState>,
    Params(filter): Params<CourseFilter>,
    Params(page): Params<PageParams>,
) -> ApiResult<Json<Value>> {
    let pagination = page.pagination_or_all()?;
    let page = state
        .db
        .run(move |conn| courses::list(conn, &filter, pagination))
        .await?;
    Ok(Json(json!({
        "courses": page.items,
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
    })))
}

pub async fn get(
    State(state): State<AppState>,
    PathArgs(course_id): PathArgs<i64>,
) -> ApiResult<Json<Value>> {
    let course = state.db.run(move |conn| courses::get(conn, course_id)).await?;
    Ok(Json(json!({ "course": course })))
}

pub async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<CourseInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let id = state.db.run(move |conn| courses::create(conn, &input)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "course created", "course_id": id })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    PathArgs(course_id): PathArgs<i64>,
    Payload(input): Payload<CourseInput>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .run(move |conn| courses::update(conn, course_id, &input))
        .await?;
    Ok(Json(json!({ "message": "course updated" })))
}

pub async fn delete(
    State(state): State<AppState>,
    PathArgs(course_id): PathArgs<i64>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .run(move |conn| courses::delete(conn, course_id))
        .await?;
    Ok(Json(json!({ "message": "course deleted" })))
}
