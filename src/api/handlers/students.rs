use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::api::extract::{Params, PathArgs, Payload};
use crate::api::state::AppState;
use crate::store::students::{self, StudentFilter, StudentInput, Transcript};
use crate::store::PageParams;

pub async fn list(
    State(state): State<AppState>,
    Params(filter): Params<StudentFilter>,
    Params(page): Params<PageParams>,
) -> ApiResult<Json<Value>> {
    let pagination = page.pagination()?;
    let page = state
        .db
        .run(move |conn| students::list(conn, &filter, pagination))
        .await?;
    Ok(Json(json!({
        "students": page.items,
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
    })))
}

pub async fn get(
    State(state): State<AppState>,
    PathArgs(id): PathArgs<String>,
) -> ApiResult<Json<Value>> {
    let student = state.db.run(move |conn| students::get(conn, &id)).await?;
    Ok(Json(json!({ "student": student })))
}

pub async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<StudentInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let id = state
        .db
        .run(move |conn| students::create(conn, &input))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "student created", "student_id": id })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    PathArgs(id): PathArgs<String>,
    Payload(input): Payload<StudentInput>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .run(move |conn| students::update(conn, &id, &input))
        .await?;
    Ok(Json(json!({ "message": "student updated" })))
}

pub async fn delete(
    State(state): State<AppState>,
    PathArgs(id): PathArgs<String>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .run(move |conn| students::delete(conn, &id))
        .await?;
    Ok(Json(json!({ "message": "student deleted" })))
}

pub async fn summary(
    State(state): State<AppState>,
    PathArgs(id): PathArgs<String>,
) -> ApiResult<Json<Value>> {
    let summary = state.db.run(move |conn| students::summary(conn, &id)).await?;
    Ok(Json(json!({ "summary": summary })))
}

pub async fn transcript(
    State(state): State<AppState>,
    PathArgs(id): PathArgs<String>,
) -> ApiResult<Json<Transcript>> {
    let transcript = state
        .db
        .run(move |conn| students::transcript(conn, &id))
        .await?;
    Ok(Json(transcript))
}
