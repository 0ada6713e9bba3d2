use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::db::models::user::{CreateUser, UpdateUser, User};
use crate::middleware::json::require_text;
use crate::middleware::{Validate, ValidatedJson};
use crate::{DeskError, router::DeskState};

impl Validate for CreateUser {
    fn validate(&self) -> Result<(), DeskError> {
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        validate_email(&self.email)
    }
}

impl Validate for UpdateUser {
    fn validate(&self) -> Result<(), DeskError> {
        match &self.email {
            Some(email) => validate_email(email),
            None => Ok(()),
        }
    }
}

fn validate_email(email: &str) -> Result<(), DeskError> {
    if !email.contains('@') {
        return Err(DeskError::validation("email must contain '@'"));
    }
    Ok(())
}

pub async fn list(State(state): State<DeskState>) -> Result<Json<Vec<User>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(User::list(&mut conn).await?))
}

pub async fn show(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let user = User::find(&mut conn, id)
        .await?
        .ok_or(DeskError::not_found("user", id))?;
    Ok(Json(user))
}

pub async fn create(
    State(state): State<DeskState>,
    ValidatedJson(data): ValidatedJson<CreateUser>,
) -> Result<(StatusCode, Json<User>), DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let user = User::create(&mut conn, &data).await?;
    info!(user_id = user.id, role = %user.role, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<UpdateUser>,
) -> Result<Json<User>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let user = User::update(&mut conn, id, &data)
        .await?
        .ok_or(DeskError::not_found("user", id))?;
    Ok(Json(user))
}

pub async fn remove(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    if !User::soft_delete(&mut conn, id).await? {
        return Err(DeskError::not_found("user", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
