use axum::{
    Json,
    extract::{Path, State},
};

use crate::db::models::flight_log::FlightLog;
use crate::middleware::ValidatedJson;
use crate::service::completion::{self, CompletionResult};
use crate::service::meter::MeterReadings;
use crate::{DeskError, router::DeskState};

pub async fn show(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<FlightLog>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let log = FlightLog::find(&mut conn, id)
        .await?
        .ok_or(DeskError::not_found("flight_log", id))?;
    Ok(Json(log))
}

/// Meter correction on a completed flight.
pub async fn correct(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(readings): ValidatedJson<MeterReadings>,
) -> Result<Json<CompletionResult>, DeskError> {
    let result = completion::correct(&state.db, &state.config, id, readings).await?;
    Ok(Json(result))
}
