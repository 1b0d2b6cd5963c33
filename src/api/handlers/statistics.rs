use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::Params;
use crate::api::state::AppState;
use crate::reports::{self, ReportKind, ReportPlan};

#[derive(Debug, Deserialize)]
pub struct ReportParams {
    #[serde(rename = "type")]
    pub kind: ReportKind,
}

pub async fn report(
    State(state): State<AppState>,
    Params(ReportParams { kind }): Params<ReportParams>,
) -> ApiResult<Json<Value>> {
    let report = match kind.plan() {
        ReportPlan::Overview => {
            let overview = reports::overview(&state.db).await;
            if overview.all_failed() {
                return Err(ApiError::internal("overview statistics query failed"));
            }
            return Ok(Json(json!({ "type": kind, "data": overview })));
        }
        ReportPlan::Tabular(report) => report,
    };

    let rows = state
        .db
        .run(move |conn| reports::run_tabular(conn, report))
        .await
        .map_err(|e| ApiError::from_store(e, "statistics query failed"))?;
    Ok(Json(json!({
        "type": kind,
        "total": rows.len(),
        "data": rows,
    })))
}
