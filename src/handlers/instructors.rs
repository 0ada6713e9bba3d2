use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::db::models::instructor::{CreateInstructor, Instructor, UpdateInstructor};
use crate::db::models::user::User;
use crate::middleware::{Validate, ValidatedJson};
use crate::{DeskError, router::DeskState};

fn check_rate(rate: Decimal) -> Result<(), DeskError> {
    if rate.is_sign_negative() {
        return Err(DeskError::validation("hourly_rate must not be negative"));
    }
    Ok(())
}

impl Validate for CreateInstructor {
    fn validate(&self) -> Result<(), DeskError> {
        check_rate(self.hourly_rate)
    }
}

impl Validate for UpdateInstructor {
    fn validate(&self) -> Result<(), DeskError> {
        self.hourly_rate.map_or(Ok(()), check_rate)
    }
}

pub async fn list(State(state): State<DeskState>) -> Result<Json<Vec<Instructor>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(Instructor::list(&mut conn).await?))
}

pub async fn show(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<Instructor>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let instructor = Instructor::find(&mut conn, id)
        .await?
        .ok_or(DeskError::not_found("instructor", id))?;
    Ok(Json(instructor))
}

pub async fn create(
    State(state): State<DeskState>,
    ValidatedJson(data): ValidatedJson<CreateInstructor>,
) -> Result<(StatusCode, Json<Instructor>), DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    if User::find(&mut conn, data.user_id).await?.is_none() {
        return Err(DeskError::validation(format!(
            "user {} does not exist",
            data.user_id
        )));
    }
    let instructor = Instructor::create(&mut conn, &data).await?;
    Ok((StatusCode::CREATED, Json(instructor)))
}

pub async fn update(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<UpdateInstructor>,
) -> Result<Json<Instructor>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let instructor = Instructor::update(&mut conn, id, &data)
        .await?
        .ok_or(DeskError::not_found("instructor", id))?;
    Ok(Json(instructor))
}

pub async fn remove(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    if !Instructor::soft_delete(&mut conn, id).await? {
        return Err(DeskError::not_found("instructor", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
