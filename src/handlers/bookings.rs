use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqliteConnection;
use tracing::info;

use crate::config::Config;
use crate::db::models::aircraft::{Aircraft, AircraftStatus};
use crate::db::models::authorization::{AuthorizationStatus, FlightAuthorization};
use crate::db::models::booking::{
    Booking, BookingFilter, BookingStatus, BookingType, CreateBooking, UpdateBooking,
};
use crate::db::models::component::AircraftComponent;
use crate::db::models::instructor::{Instructor, InstructorStatus};
use crate::db::models::user::User;
use crate::middleware::{Validate, ValidatedJson};
use crate::service::completion::{self, CompletionResult};
use crate::service::maintenance::{DueStatus, component_due};
use crate::service::meter::MeterReadings;
use crate::service::schedule::{ensure_transition, validate_window};
use crate::{DeskError, router::DeskState};

impl Validate for CreateBooking {
    fn validate(&self) -> Result<(), DeskError> {
        validate_window(self.start_time, self.end_time)?;
        if !matches!(
            self.status,
            BookingStatus::Unconfirmed | BookingStatus::Confirmed
        ) {
            return Err(DeskError::validation(
                "new bookings must be unconfirmed or confirmed",
            ));
        }
        require_aircraft(self.booking_type, self.aircraft_id)
    }
}

fn require_aircraft(booking_type: BookingType, aircraft_id: Option<i64>) -> Result<(), DeskError> {
    if booking_type == BookingType::Flight && aircraft_id.is_none() {
        return Err(DeskError::validation("flight bookings need an aircraft"));
    }
    Ok(())
}

impl Validate for UpdateBooking {}

impl Validate for MeterReadings {}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBooking {
    pub reason: Option<String>,
}

impl Validate for CancelBooking {}

/// Resources a booking holds must exist and be usable.
async fn check_resources(
    conn: &mut SqliteConnection,
    aircraft_id: Option<i64>,
    instructor_id: Option<i64>,
) -> Result<(), DeskError> {
    if let Some(id) = aircraft_id {
        let aircraft = Aircraft::find(&mut *conn, id)
            .await?
            .ok_or(DeskError::not_found("aircraft", id))?;
        if aircraft.status != AircraftStatus::Active {
            return Err(DeskError::InvalidState(format!(
                "aircraft {} is {}",
                aircraft.registration, aircraft.status
            )));
        }
    }
    if let Some(id) = instructor_id {
        let instructor = Instructor::find(&mut *conn, id)
            .await?
            .ok_or(DeskError::not_found("instructor", id))?;
        if instructor.status != InstructorStatus::Active {
            return Err(DeskError::InvalidState(format!(
                "instructor {id} is not active"
            )));
        }
    }
    Ok(())
}

async fn check_conflicts(
    conn: &mut SqliteConnection,
    aircraft_id: Option<i64>,
    instructor_id: Option<i64>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_id: Option<i64>,
) -> Result<(), DeskError> {
    let conflicts =
        Booking::find_conflicts(conn, aircraft_id, instructor_id, start, end, exclude_id).await?;
    if !conflicts.is_empty() {
        return Err(DeskError::BookingConflict(conflicts));
    }
    Ok(())
}

async fn load(conn: &mut SqliteConnection, id: i64) -> Result<Booking, DeskError> {
    Booking::find(conn, id)
        .await?
        .ok_or(DeskError::not_found("booking", id))
}

pub async fn list(
    State(state): State<DeskState>,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<Booking>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(Booking::list(&mut conn, &filter).await?))
}

pub async fn show(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(load(&mut conn, id).await?))
}

pub async fn create(
    State(state): State<DeskState>,
    ValidatedJson(data): ValidatedJson<CreateBooking>,
) -> Result<(StatusCode, Json<Booking>), DeskError> {
    let mut tx = state.db.pool().begin().await?;
    if User::find(&mut tx, data.user_id).await?.is_none() {
        return Err(DeskError::not_found("user", data.user_id));
    }
    check_resources(&mut tx, data.aircraft_id, data.instructor_id).await?;
    check_conflicts(
        &mut tx,
        data.aircraft_id,
        data.instructor_id,
        data.start_time,
        data.end_time,
        None,
    )
    .await?;
    let booking = Booking::create(&mut tx, &data).await?;
    tx.commit().await?;

    info!(
        booking_id = booking.id,
        aircraft_id = ?booking.aircraft_id,
        instructor_id = ?booking.instructor_id,
        "booking created"
    );
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn update(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<UpdateBooking>,
) -> Result<Json<Booking>, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let mut booking = load(&mut tx, id).await?;
    if !matches!(
        booking.status,
        BookingStatus::Unconfirmed | BookingStatus::Confirmed
    ) {
        return Err(DeskError::InvalidState(format!(
            "booking {id} is {} and can no longer be edited",
            booking.status
        )));
    }

    if let Some(aircraft_id) = data.aircraft_id {
        booking.aircraft_id = Some(aircraft_id);
    }
    if let Some(instructor_id) = data.instructor_id {
        booking.instructor_id = Some(instructor_id);
    }
    if let Some(start) = data.start_time {
        booking.start_time = start;
    }
    if let Some(end) = data.end_time {
        booking.end_time = end;
    }
    if let Some(booking_type) = data.booking_type {
        booking.booking_type = booking_type;
    }
    if data.purpose.is_some() {
        booking.purpose = data.purpose.clone();
    }
    if data.remarks.is_some() {
        booking.remarks = data.remarks.clone();
    }
    if data.confirm && booking.status == BookingStatus::Unconfirmed {
        ensure_transition(booking.status, BookingStatus::Confirmed)?;
        booking.status = BookingStatus::Confirmed;
    }

    validate_window(booking.start_time, booking.end_time)?;
    require_aircraft(booking.booking_type, booking.aircraft_id)?;
    check_resources(&mut tx, booking.aircraft_id, booking.instructor_id).await?;
    check_conflicts(
        &mut tx,
        booking.aircraft_id,
        booking.instructor_id,
        booking.start_time,
        booking.end_time,
        Some(id),
    )
    .await?;
    let booking = Booking::save(&mut tx, &booking).await?;
    tx.commit().await?;
    Ok(Json(booking))
}

pub async fn remove(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let booking = load(&mut tx, id).await?;
    if matches!(
        booking.status,
        BookingStatus::Flying | BookingStatus::Complete
    ) {
        return Err(DeskError::InvalidState(format!(
            "booking {id} is {} and cannot be deleted",
            booking.status
        )));
    }
    Booking::soft_delete(&mut tx, id).await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<CancelBooking>,
) -> Result<Json<Booking>, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let mut booking = load(&mut tx, id).await?;
    ensure_transition(booking.status, BookingStatus::Cancelled)?;
    booking.status = BookingStatus::Cancelled;
    booking.cancellation_reason = data.reason;
    let booking = Booking::save(&mut tx, &booking).await?;
    tx.commit().await?;

    info!(booking_id = id, "booking cancelled");
    Ok(Json(booking))
}

/// A student flying without an instructor.
fn is_solo(booking: &Booking) -> bool {
    booking.booking_type == BookingType::Flight
        && booking.aircraft_id.is_some()
        && booking.instructor_id.is_none()
}

async fn check_dispatch(
    conn: &mut SqliteConnection,
    config: &Config,
    booking: &Booking,
) -> Result<(), DeskError> {
    if let Some(aircraft_id) = booking.aircraft_id {
        let aircraft = Aircraft::find(&mut *conn, aircraft_id)
            .await?
            .ok_or(DeskError::not_found("aircraft", aircraft_id))?;
        if aircraft.status != AircraftStatus::Active {
            return Err(DeskError::InvalidState(format!(
                "aircraft {} is {}",
                aircraft.registration, aircraft.status
            )));
        }
        let now = Utc::now();
        let overdue: Vec<String> = AircraftComponent::list(&mut *conn, Some(aircraft_id))
            .await?
            .iter()
            .map(|c| component_due(c, aircraft.total_hours, now, &config.maintenance))
            .filter(|d| d.status == DueStatus::Overdue)
            .map(|d| d.name)
            .collect();
        if !overdue.is_empty() {
            return Err(DeskError::InvalidState(format!(
                "aircraft {} has overdue maintenance: {}",
                aircraft.registration,
                overdue.join(", ")
            )));
        }
    }

    if config.bookings.require_solo_authorization && is_solo(booking) {
        let approved = FlightAuthorization::find_by_booking(&mut *conn, booking.id)
            .await?
            .is_some_and(|a| a.status == AuthorizationStatus::Approved);
        if !approved {
            return Err(DeskError::InvalidState(format!(
                "solo booking {} has no approved flight authorization",
                booking.id
            )));
        }
    }
    Ok(())
}

pub async fn checkout(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let booking = load(&mut tx, id).await?;
    ensure_transition(booking.status, BookingStatus::Flying)?;
    check_dispatch(&mut tx, &state.config, &booking).await?;
    Booking::set_status(&mut tx, id, BookingStatus::Flying).await?;
    let booking = load(&mut tx, id).await?;
    tx.commit().await?;

    info!(booking_id = id, "booking checked out");
    Ok(Json(booking))
}

pub async fn calculate(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(readings): ValidatedJson<MeterReadings>,
) -> Result<Json<CompletionResult>, DeskError> {
    let result = completion::calculate(&state.db, &state.config, id, readings).await?;
    Ok(Json(result))
}

pub async fn complete(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(readings): ValidatedJson<MeterReadings>,
) -> Result<Json<CompletionResult>, DeskError> {
    let result = completion::complete(&state.db, &state.config, id, readings).await?;
    Ok(Json(result))
}
