use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::db;

pub async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = state
        .db
        .run(|conn| db::status(conn))
        .await
        .map_err(|e| ApiError::from_store(e, "database check failed"))?;
    Ok(Json(json!({
        "status": "ok",
        "version": state.version,
        "tables": status.tables,
        "student_count": status.student_count,
    })))
}

/// Create the schema if needed and load the demo records. Safe to repeat.
pub async fn setup_demo(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = state
        .db
        .run(|conn| {
            db::init_schema(conn)?;
            db::seed_demo_data(conn)?;
            db::status(conn)
        })
        .await
        .map_err(|e| ApiError::from_store(e, "demo setup failed"))?;
    info!(students = status.student_count, "demo data loaded");
    Ok(Json(json!({
        "message": "demo data loaded",
        "tables": status.tables,
        "student_count": status.student_count,
    })))
}
