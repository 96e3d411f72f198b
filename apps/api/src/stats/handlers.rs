use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::stats::Stats;
use crate::store::CounterSnapshot;
use crate::state::AppState;

/// GET /api/v1/stats
/// Full scan of every entity directory; cost grows with the data set.
pub async fn handle_stats(State(state): State<AppState>) -> Result<Json<Stats>, AppError> {
    Ok(Json(state.aggregator.stats().await?))
}

/// GET /api/v1/stats/counters
pub async fn handle_counters(State(state): State<AppState>) -> Json<CounterSnapshot> {
    Json(state.aggregator.counters())
}
