use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::api::extract::{Params, PathArgs, Payload};
use crate::api::state::AppState;
use crate::store::scores::{self, NewScore, ScoreFilter, ScoreUpdate};
use crate::store::PageParams;

pub async fn list(
    State(state): State<AppState>,
    Params(filter): Params<ScoreFilter>,
    Params(page): Params<PageParams>,
) -> ApiResult<Json<Value>> {
    let pagination = page.pagination_or_all()?;
    let page = state
        .db
        .run(move |conn| scores::list(conn, &filter, pagination))
        .await?;
    Ok(Json(json!({
        "scores": page.items,
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
    })))
}

pub async fn get(
    State(state): State<AppState>,
    PathArgs((student_id, course_id)): PathArgs<(String, i64)>,
) -> ApiResult<Json<Value>> {
    let score = state
        .db
        .run(move |conn| scores::get(conn, &student_id, course_id))
        .await?;
    Ok(Json(json!({ "score": score })))
}

pub async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<NewScore>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (student_id, course_id) = (input.student_id.clone(), input.course_id);
    state.db.run(move |conn| scores::create(conn, &input)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "score recorded",
            "student_id": student_id,
            "course_id": course_id,
        })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    PathArgs((student_id, course_id)): PathArgs<(String, i64)>,
    Payload(input): Payload<ScoreUpdate>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .run(move |conn| scores::update(conn, &student_id, course_id, &input))
        .await?;
    Ok(Json(json!({ "message": "score updated" })))
}

pub async fn delete(
    State(state): State<AppState>,
    PathArgs((student_id, course_id)): PathArgs<(String, i64)>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .run(move |conn| scores::delete(conn, &student_id, course_id))
        .await?;
    Ok(Json(json!({ "message": "score deleted" })))
}
