use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::models::aircraft::{Aircraft, CreateAircraft, UpdateAircraft};
use crate::db::models::component::AircraftComponent;
use crate::db::models::flight_log::FlightLog;
use crate::middleware::json::require_text;
use crate::middleware::{Validate, ValidatedJson};
use crate::service::maintenance::{ComponentDue, airworthy, component_due};
use crate::{DeskError, router::DeskState};

impl Validate for CreateAircraft {
    fn validate(&self) -> Result<(), DeskError> {
        require_text("registration", &self.registration)?;
        require_text("aircraft_type", &self.aircraft_type)?;
        for (field, value) in [
            ("hourly_rate", self.hourly_rate),
            ("current_hobbs", self.current_hobbs),
            ("current_tacho", self.current_tacho),
            ("total_hours", self.total_hours),
        ] {
            if value.is_sign_negative() {
                return Err(DeskError::validation(format!("{field} must not be negative")));
            }
        }
        Ok(())
    }
}

impl Validate for UpdateAircraft {
    fn validate(&self) -> Result<(), DeskError> {
        if self.hourly_rate.is_some_and(|r| r.is_sign_negative()) {
            return Err(DeskError::validation("hourly_rate must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct AircraftDetail {
    #[serde(flatten)]
    pub aircraft: Aircraft,
    pub components: Vec<ComponentDue>,
    pub airworthy: bool,
}

pub async fn list(State(state): State<DeskState>) -> Result<Json<Vec<Aircraft>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(Aircraft::list(&mut conn).await?))
}

/// Aircraft with the due state of each maintenance component.
pub async fn show(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<AircraftDetail>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let aircraft = Aircraft::find(&mut conn, id)
        .await?
        .ok_or(DeskError::not_found("aircraft", id))?;
    let now = Utc::now();
    let components: Vec<ComponentDue> = AircraftComponent::list(&mut conn, Some(id))
        .await?
        .iter()
        .map(|c| component_due(c, aircraft.total_hours, now, &state.config.maintenance))
        .collect();
    let airworthy = airworthy(&components);
    Ok(Json(AircraftDetail {
        aircraft,
        components,
        airworthy,
    }))
}

pub async fn create(
    State(state): State<DeskState>,
    ValidatedJson(data): ValidatedJson<CreateAircraft>,
) -> Result<(StatusCode, Json<Aircraft>), DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let aircraft = Aircraft::create(&mut conn, &data).await?;
    Ok((StatusCode::CREATED, Json(aircraft)))
}

pub async fn update(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<UpdateAircraft>,
) -> Result<Json<Aircraft>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let aircraft = Aircraft::update(&mut conn, id, &data)
        .await?
        .ok_or(DeskError::not_found("aircraft", id))?;
    Ok(Json(aircraft))
}

pub async fn flight_logs(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<FlightLog>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    if Aircraft::find(&mut conn, id).await?.is_none() {
        return Err(DeskError::not_found("aircraft", id));
    }
    Ok(Json(FlightLog::list_for_aircraft(&mut conn, id).await?))
}

pub(crate) fn non_negative(field: &str, value: Option<Decimal>) -> Result<(), DeskError> {
    if value.is_some_and(|v| v.is_sign_negative()) {
        return Err(DeskError::validation(format!("{field} must not be negative")));
    }
    Ok(())
}
