use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::info;

use crate::db::models::equipment::{
    CreateEquipment, Equipment, EquipmentIssuance, EquipmentStatus, IssuanceFilter,
    IssueEquipment, UpdateEquipment,
};
use crate::db::models::user::User;
use crate::middleware::json::require_text;
use crate::middleware::{Validate, ValidatedJson};
use crate::{DeskError, router::DeskState};

impl Validate for CreateEquipment {
    fn validate(&self) -> Result<(), DeskError> {
        require_text("name", &self.name)?;
        require_text("kind", &self.kind)
    }
}

impl Validate for UpdateEquipment {
    fn validate(&self) -> Result<(), DeskError> {
        if self.status == Some(EquipmentStatus::Issued) {
            return Err(DeskError::validation(
                "equipment is marked issued through the issue endpoint",
            ));
        }
        Ok(())
    }
}

impl Validate for IssueEquipment {}

pub async fn list(State(state): State<DeskState>) -> Result<Json<Vec<Equipment>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(Equipment::list(&mut conn).await?))
}

pub async fn show(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<Equipment>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let item = Equipment::find(&mut conn, id)
        .await?
        .ok_or(DeskError::not_found("equipment", id))?;
    Ok(Json(item))
}

pub async fn create(
    State(state): State<DeskState>,
    ValidatedJson(data): ValidatedJson<CreateEquipment>,
) -> Result<(StatusCode, Json<Equipment>), DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let item = Equipment::create(&mut conn, &data).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<UpdateEquipment>,
) -> Result<Json<Equipment>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let item = Equipment::update(&mut conn, id, &data)
        .await?
        .ok_or(DeskError::not_found("equipment", id))?;
    Ok(Json(item))
}

pub async fn remove(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    if EquipmentIssuance::outstanding_for(&mut tx, id).await?.is_some() {
        return Err(DeskError::Conflict(format!(
            "equipment {id} is issued and cannot be removed"
        )));
    }
    if !Equipment::soft_delete(&mut tx, id).await? {
        return Err(DeskError::not_found("equipment", id));
    }
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn issue(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<IssueEquipment>,
) -> Result<(StatusCode, Json<EquipmentIssuance>), DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let item = Equipment::find(&mut tx, id)
        .await?
        .ok_or(DeskError::not_found("equipment", id))?;
    if let Some(open) = EquipmentIssuance::outstanding_for(&mut tx, id).await? {
        return Err(DeskError::Conflict(format!(
            "equipment {id} is already issued (issuance {})",
            open.id
        )));
    }
    if item.status != EquipmentStatus::Available {
        return Err(DeskError::InvalidState(format!(
            "equipment {id} is {}",
            item.status
        )));
    }
    if User::find(&mut tx, data.user_id).await?.is_none() {
        return Err(DeskError::not_found("user", data.user_id));
    }
    let now = Utc::now();
    if data.expected_return_at.is_some_and(|at| at <= now) {
        return Err(DeskError::validation(
            "expected_return_at must be in the future",
        ));
    }

    let issuance = EquipmentIssuance::create(&mut tx, id, &data, now).await?;
    Equipment::set_status(&mut tx, id, EquipmentStatus::Issued).await?;
    tx.commit().await?;

    info!(equipment_id = id, user_id = data.user_id, "equipment issued");
    Ok((StatusCode::CREATED, Json(issuance)))
}

pub async fn return_item(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<EquipmentIssuance>, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let issuance = EquipmentIssuance::find(&mut tx, id)
        .await?
        .ok_or(DeskError::not_found("equipment_issuance", id))?;
    if issuance.returned_at.is_some() {
        return Err(DeskError::Conflict(format!(
            "issuance {id} was already returned"
        )));
    }
    let issuance = EquipmentIssuance::mark_returned(&mut tx, id, Utc::now())
        .await?
        .ok_or(DeskError::not_found("equipment_issuance", id))?;
    Equipment::set_status(&mut tx, issuance.equipment_id, EquipmentStatus::Available).await?;
    tx.commit().await?;

    info!(equipment_id = issuance.equipment_id, issuance_id = id, "equipment returned");
    Ok(Json(issuance))
}

pub async fn list_issuance(
    State(state): State<DeskState>,
    Query(filter): Query<IssuanceFilter>,
) -> Result<Json<Vec<EquipmentIssuance>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(
        EquipmentIssuance::list(&mut conn, &filter, Utc::now()).await?,
    ))
}
