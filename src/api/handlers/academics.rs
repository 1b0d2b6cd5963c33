use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::api::extract::{Params, PathArgs, Payload};
use crate::api::state::AppState;
use crate::store::academics::{self, AcademicFilter, AcademicInput, AcademicKind};
use crate::store::PageParams;

#[derive(Debug, Deserialize)]
pub struct KindParam {
    #[serde(rename = "type", default)]
    pub kind: AcademicKind,
}

#[derive(Debug, Deserialize)]
pub struct AcademicRef {
    #[serde(rename = "type")]
    pub kind: AcademicKind,
    pub id: i64,
}

/// Update body: the tagged entity fields plus the row id.
#[derive(Debug, Deserialize)]
pub struct AcademicUpdate {
    pub id: i64,
    #[serde(flatten)]
    pub input: AcademicInput,
}

pub async fn list(
    State(state): State<AppState>,
    Params(KindParam { kind }): Params<KindParam>,
    Params(filter): Params<AcademicFilter>,
    Params(page): Params<PageParams>,
) -> ApiResult<Json<Value>> {
    let pagination = page.pagination_or_all()?;
    let page = state
        .db
        .run(move |conn| academics::list(conn, kind, &filter, pagination))
        .await?;
    Ok(Json(json!({
        kind.plural(): page.items,
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
    })))
}

pub async fn get(
    State(state): State<AppState>,
    PathArgs((kind, id)): PathArgs<(AcademicKind, i64)>,
) -> ApiResult<Json<Value>> {
    let row = state.db.run(move |conn| academics::get(conn, kind, id)).await?;
    Ok(Json(json!({ "type": kind, "data": row })))
}

pub async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<AcademicInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let kind = input.kind();
    let id = state.db.run(move |conn| academics::create(conn, &input)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "type": kind, "id": id })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Payload(AcademicUpdate { id, input }): Payload<AcademicUpdate>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .run(move |conn| academics::update(conn, id, &input))
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn delete(
    State(state): State<AppState>,
    Params(AcademicRef { kind, id }): Params<AcademicRef>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .run(move |conn| academics::delete(conn, kind, id))
        .await?;
    Ok(Json(json!({ "success": true })))
}
