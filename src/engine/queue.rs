use tokio::sync::oneshot;

use crate::engine::dispatch::{Command, DispatchSnapshot};
use crate::error::AppError;
use crate::state::AppState;

pub async fn submit(state: &AppState, command: Command) -> Result<(), AppError> {
    state
        .command_tx
        .send(command)
        .await
        .map_err(|err| AppError::Unavailable(format!("command queue send failed: {err}")))
}

pub async fn request_snapshot(state: &AppState) -> Result<DispatchSnapshot, AppError> {
    let (reply, response) = oneshot::channel();
    submit(state, Command::Snapshot { reply }).await?;

    response
        .await
        .map_err(|err| AppError::Unavailable(format!("snapshot reply dropped: {err}")))
}
