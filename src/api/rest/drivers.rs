use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::engine::dispatch::DriverView;
use crate::engine::queue::request_snapshot;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", get(list_drivers))
        .route("/drivers/:id", get(get_driver))
}

async fn list_drivers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DriverView>>, AppError> {
    let snapshot = request_snapshot(&state).await?;
    Ok(Json(snapshot.drivers))
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DriverView>, AppError> {
    let snapshot = request_snapshot(&state).await?;

    snapshot
        .drivers
        .into_iter()
        .find(|driver| driver.driver_id == id)
        .map(Json)
        .ok_or_else(|| AppError::UnresolvedIdentity(format!("driver {id} not found")))
}
