use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::{DeskError, router::DeskState};

pub async fn health(State(state): State<DeskState>) -> Result<Json<Value>, DeskError> {
    state.db.ping().await?;
    Ok(Json(json!({ "status": "ok", "database": "ok" })))
}
