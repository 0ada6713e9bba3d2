//! Debriefs and solo flight authorizations.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::info;

use crate::db::models::authorization::{
    ApproveAuthorization, AuthorizationStatus, CreateAuthorization, FlightAuthorization,
    RejectAuthorization,
};
use crate::db::models::booking::{Booking, BookingStatus};
use crate::db::models::instructor::Instructor;
use crate::db::models::lesson::{
    CreateLessonProgress, LessonFilter, LessonProgress, UpdateLessonProgress,
};
use crate::middleware::json::require_text;
use crate::middleware::{Validate, ValidatedJson};
use crate::{DeskError, router::DeskState};

impl Validate for CreateLessonProgress {
    fn validate(&self) -> Result<(), DeskError> {
        require_text("lesson", &self.lesson)
    }
}

impl Validate for UpdateLessonProgress {}

impl Validate for CreateAuthorization {
    fn validate(&self) -> Result<(), DeskError> {
        require_text("purpose", &self.purpose)
    }
}

impl Validate for ApproveAuthorization {}

impl Validate for RejectAuthorization {
    fn validate(&self) -> Result<(), DeskError> {
        require_text("reason", &self.reason)
    }
}

pub async fn list_lessons(
    State(state): State<DeskState>,
    Query(filter): Query<LessonFilter>,
) -> Result<Json<Vec<LessonProgress>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(LessonProgress::list(&mut conn, &filter).await?))
}

pub async fn record_lesson(
    State(state): State<DeskState>,
    ValidatedJson(data): ValidatedJson<CreateLessonProgress>,
) -> Result<(StatusCode, Json<LessonProgress>), DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let booking = Booking::find(&mut tx, data.booking_id)
        .await?
        .ok_or(DeskError::not_found("booking", data.booking_id))?;
    if booking.status == BookingStatus::Cancelled {
        return Err(DeskError::InvalidState(format!(
            "booking {} is cancelled",
            booking.id
        )));
    }
    let lesson =
        LessonProgress::create(&mut tx, booking.user_id, booking.instructor_id, &data).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

pub async fn update_lesson(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<UpdateLessonProgress>,
) -> Result<Json<LessonProgress>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let lesson = LessonProgress::update(&mut conn, id, &data)
        .await?
        .ok_or(DeskError::not_found("lesson_progress", id))?;
    Ok(Json(lesson))
}

pub async fn request_authorization(
    State(state): State<DeskState>,
    ValidatedJson(data): ValidatedJson<CreateAuthorization>,
) -> Result<(StatusCode, Json<FlightAuthorization>), DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let booking = Booking::find(&mut tx, data.booking_id)
        .await?
        .ok_or(DeskError::not_found("booking", data.booking_id))?;
    if !matches!(
        booking.status,
        BookingStatus::Unconfirmed | BookingStatus::Confirmed
    ) {
        return Err(DeskError::InvalidState(format!(
            "booking {} is {}",
            booking.id, booking.status
        )));
    }
    if FlightAuthorization::find_by_booking(&mut tx, booking.id)
        .await?
        .is_some()
    {
        return Err(DeskError::Conflict(format!(
            "booking {} already has an authorization",
            booking.id
        )));
    }
    let auth = FlightAuthorization::create(&mut tx, booking.user_id, &data).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(auth)))
}

pub async fn show_authorization(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<FlightAuthorization>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    let auth = FlightAuthorization::find(&mut conn, id)
        .await?
        .ok_or(DeskError::not_found("flight_authorization", id))?;
    Ok(Json(auth))
}

async fn decide(
    state: &DeskState,
    id: i64,
    status: AuthorizationStatus,
    instructor_id: i64,
    reason: Option<&str>,
) -> Result<FlightAuthorization, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let auth = FlightAuthorization::find(&mut tx, id)
        .await?
        .ok_or(DeskError::not_found("flight_authorization", id))?;
    if auth.status != AuthorizationStatus::Pending {
        return Err(DeskError::InvalidState(format!(
            "authorization {id} is already {}",
            auth.status
        )));
    }
    if Instructor::find(&mut tx, instructor_id).await?.is_none() {
        return Err(DeskError::not_found("instructor", instructor_id));
    }
    let auth = FlightAuthorization::decide(&mut tx, id, status, instructor_id, reason)
        .await?
        .ok_or(DeskError::not_found("flight_authorization", id))?;
    tx.commit().await?;
    info!(authorization_id = id, status = %status, instructor_id, "authorization decided");
    Ok(auth)
}

pub async fn approve_authorization(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<ApproveAuthorization>,
) -> Result<Json<FlightAuthorization>, DeskError> {
    let auth = decide(
        &state,
        id,
        AuthorizationStatus::Approved,
        data.instructor_id,
        None,
    )
    .await?;
    Ok(Json(auth))
}

pub async fn reject_authorization(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<RejectAuthorization>,
) -> Result<Json<FlightAuthorization>, DeskError> {
    let auth = decide(
        &state,
        id,
        AuthorizationStatus::Rejected,
        data.instructor_id,
        Some(&data.reason),
    )
    .await?;
    Ok(Json(auth))
}
