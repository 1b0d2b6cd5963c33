use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::api::extract::{Params, PathArgs, Payload};
use crate::api::state::AppState;
use crate::store::rewards::{self, RewardFilter, RewardInput};
use crate::store::PageParams;

#[derive(Debug, Deserialize)]
pub struct RecordRef {
    pub rp_id: i64,
}

pub async fn list(
    State(state): State<AppState>,
    Params(filter): Params<RewardFilter>,
    Params(page): Params<PageParams>,
) -> ApiResult<Json<Value>> {
    let pagination = page.pagination_or_all()?;
    let page = state
        .db
        .run(move |conn| rewards::list(conn, &filter, pagination))
        .await?;
    Ok(Json(json!({
        "rewards_punishments": page.items,
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
    })))
}

pub async fn get(
    State(state): State<AppState>,
    PathArgs(rp_id): PathArgs<i64>,
) -> ApiResult<Json<Value>> {
    let record = state.db.run(move |conn| rewards::get(conn, rp_id)).await?;
    Ok(Json(json!({ "record": record })))
}

pub async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<RewardInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let rp_id = state.db.run(move |conn| rewards::create(conn, &input)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "record created", "rp_id": rp_id })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    PathArgs(rp_id): PathArgs<i64>,
    Payload(input): Payload<RewardInput>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .run(move |conn| rewards::update(conn, rp_id, &input))
        .await?;
    Ok(Json(json!({ "message": "record updated" })))
}

pub async fn delete(
    State(state): State<AppState>,
    PathArgs(rp_id): PathArgs<i64>,
) -> ApiResult<Json<Value>> {
    remove(&state, rp_id).await
}

/// `DELETE /rewards-punishments?rp_id=…`, the query-string form of [`delete`].
pub async fn delete_by_query(
    State(state): State<AppState>,
    Params(RecordRef { rp_id }): Params<RecordRef>,
) -> ApiResult<Json<Value>> {
    remove(&state, rp_id).await
}

async fn remove(state: &AppState, rp_id: i64) -> ApiResult<Json<Value>> {
    state
        .db
        .run(move |conn| rewards::delete(conn, rp_id))
        .await?;
    Ok(Json(json!({ "message": "record deleted" })))
}
