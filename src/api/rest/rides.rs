use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::engine::queue::request_snapshot;
use crate::error::AppError;
use crate::models::ride::ActiveRide;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/rides", get(list_rides))
}

async fn list_rides(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ActiveRide>>, AppError> {
    let snapshot = request_snapshot(&state).await?;
    Ok(Json(snapshot.rides))
}
