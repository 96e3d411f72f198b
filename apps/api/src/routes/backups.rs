use axum::{extract::State, http::StatusCode, Json};

use crate::errors::AppError;
use crate::store::BackupReport;
use crate::state::AppState;

/// POST /api/v1/backups
pub async fn handle_backup(State(state): State<AppState>) -> Result<(StatusCode, Json<BackupReport>), AppError> {
    let report = state.store.backup().await?;
    Ok((StatusCode::CREATED, Json(report)))
}
