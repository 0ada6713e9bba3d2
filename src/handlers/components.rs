use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::db::models::aircraft::Aircraft;
use crate::db::models::component::{
    AircraftComponent, CompleteComponent, CreateComponent, UpdateComponent,
};
use crate::handlers::aircraft::non_negative;
use crate::middleware::json::require_text;
use crate::middleware::{Validate, ValidatedJson};
use crate::{DeskError, router::DeskState};

impl Validate for CreateComponent {
    fn validate(&self) -> Result<(), DeskError> {
        require_text("name", &self.name)?;
        if self.interval_hours.is_none() && self.interval_days.is_none() {
            return Err(DeskError::validation(
                "a component needs interval_hours or interval_days",
            ));
        }
        non_negative("interval_hours", self.interval_hours)?;
        non_negative("last_completed_hours", self.last_completed_hours)?;
        if self.interval_days.is_some_and(|d| d <= 0) {
            return Err(DeskError::validation("interval_days must be positive"));
        }
        Ok(())
    }
}

impl Validate for UpdateComponent {
    fn validate(&self) -> Result<(), DeskError> {
        non_negative("interval_hours", self.interval_hours)?;
        non_negative("extension_hours", self.extension_hours)?;
        if self.interval_days.is_some_and(|d| d <= 0) {
            return Err(DeskError::validation("interval_days must be positive"));
        }
        Ok(())
    }
}

impl Validate for CompleteComponent {
    fn validate(&self) -> Result<(), DeskError> {
        non_negative("completed_hours", self.completed_hours)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ComponentQuery {
    pub aircraft_id: Option<i64>,
}

pub async fn list(
    State(state): State<DeskState>,
    Query(query): Query<ComponentQuery>,
) -> Result<Json<Vec<AircraftComponent>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(AircraftComponent::list(&mut conn, query.aircraft_id).await?))
}

pub async fn create(
    State(state): State<DeskState>,
    ValidatedJson(data): ValidatedJson<CreateComponent>,
) -> Result<(StatusCode, Json<AircraftComponent>), DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    if Aircraft::find(&mut conn, data.aircraft_id).await?.is_none() {
        return Err(DeskError::not_found("aircraft", data.aircraft_id));
    }
    let component = AircraftComponent::create(&mut conn, &data).await?;
    Ok((StatusCode::CREATED, Json(component)))
}

pub async fn update(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<UpdateComponent>,
) -> Result<Json<AircraftComponent>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let component = AircraftComponent::update(&mut conn, id, &data)
        .await?
        .ok_or(DeskError::not_found("aircraft_component", id))?;
    Ok(Json(component))
}

pub async fn remove(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    if !AircraftComponent::soft_delete(&mut conn, id).await? {
        return Err(DeskError::not_found("aircraft_component", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Signs a component off. Hours default to the aircraft's current total.
pub async fn complete(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<CompleteComponent>,
) -> Result<Json<AircraftComponent>, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let component = AircraftComponent::find(&mut tx, id)
        .await?
        .ok_or(DeskError::not_found("aircraft_component", id))?;
    let completed_hours = match data.completed_hours {
        Some(hours) => hours,
        None => {
            Aircraft::find(&mut tx, component.aircraft_id)
                .await?
                .ok_or(DeskError::not_found("aircraft", component.aircraft_id))?
                .total_hours
        }
    };
    let completed_at = data.completed_at.unwrap_or_else(Utc::now);
    let component = AircraftComponent::mark_completed(&mut tx, id, completed_hours, completed_at)
        .await?
        .ok_or(DeskError::not_found("aircraft_component", id))?;
    tx.commit().await?;
    info!(component_id = id, hours = %completed_hours, "component completed");
    Ok(Json(component))
}
