use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::Payload;
use crate::api::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BackupAction {
    Backup,
    Restore {
        #[serde(rename = "backupFile", alias = "backup_file")]
        backup_file: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct BackupFileRef {
    #[serde(rename = "backupFile", alias = "backup_file")]
    pub backup_file: String,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let backups = state
        .backups
        .list()
        .await
        .map_err(|e| ApiError::from_store(e, "failed to list backups"))?;
    Ok(Json(json!({ "backups": backups })))
}

pub async fn run(
    State(state): State<AppState>,
    Payload(action): Payload<BackupAction>,
) -> ApiResult<Json<Value>> {
    match action {
        BackupAction::Backup => {
            let snap = state
                .backups
                .create(&state.db)
                .await
                .map_err(|e| ApiError::from_store(e, "backup failed"))?;
            Ok(Json(json!({
                "message": "backup created",
                "backupFile": snap.filename,
                "size": snap.size,
                "sha256": snap.sha256,
            })))
        }
        BackupAction::Restore { backup_file } => {
            state
                .backups
                .restore(&state.db, &backup_file)
                .await
                .map_err(|e| ApiError::from_store(e, "restore failed"))?;
            Ok(Json(json!({
                "message": "database restored",
                "backupFile": backup_file,
            })))
        }
    }
}

pub async fn delete(
    State(state): State<AppState>,
    Payload(BackupFileRef { backup_file }): Payload<BackupFileRef>,
) -> ApiResult<Json<Value>> {
    state
        .backups
        .delete(&backup_file)
        .await
        .map_err(|e| ApiError::from_store(e, "failed to delete backup"))?;
    Ok(Json(json!({
        "message": "backup deleted",
        "deletedFile": backup_file,
    })))
}
