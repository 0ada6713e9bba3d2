//! Booking check-in: meter readings in, flight log, aircraft hours and
//! invoice out. Each entry point runs in a single transaction.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::db::models::aircraft::Aircraft;
use crate::db::models::booking::{Booking, BookingStatus};
use crate::db::models::flight_log::FlightLog;
use crate::db::models::instructor::Instructor;
use crate::db::models::invoice::{Invoice, InvoiceItem, InvoiceStatus, InvoiceWithItems};
use crate::db::models::tax_rate::TaxRate;
use crate::error::DeskError;
use crate::service::billing::{
    HourlyCharge, flight_charges, invoice_totals, line_amounts, status_after_payment,
};
use crate::service::meter::{
    FlightTimes, HoursProgression, Meter, MeterReadings, advance_meter, apply_credit,
    compute_flight_times, start_mismatch_warnings,
};
use crate::service::reconcile::{ItemChange, reconcile};
use crate::service::schedule::ensure_transition;

#[derive(Debug, Serialize)]
pub struct CompletionResult {
    pub booking_id: i64,
    pub flight_log: FlightLog,
    pub times: FlightTimes,
    /// Applied progression after `complete`/`correct`, a preview after `calculate`.
    pub progression: HoursProgression,
    pub aircraft_total_hours: Decimal,
    pub warnings: Vec<String>,
    pub invoice: Option<InvoiceWithItems>,
    /// False when the invoice was paid or cancelled and left as it was.
    pub invoice_updated: bool,
}

struct FlightContext {
    booking: Booking,
    aircraft: Aircraft,
    instructor: Option<Instructor>,
}

async fn load_context(
    conn: &mut SqliteConnection,
    booking: Booking,
) -> Result<FlightContext, DeskError> {
    let aircraft_id = booking
        .aircraft_id
        .ok_or_else(|| DeskError::validation(format!("booking {} has no aircraft", booking.id)))?;
    let aircraft = Aircraft::find(&mut *conn, aircraft_id)
        .await?
        .ok_or(DeskError::not_found("aircraft", aircraft_id))?;
    let instructor = match booking.instructor_id {
        Some(id) => Some(
            Instructor::find(&mut *conn, id)
                .await?
                .ok_or(DeskError::not_found("instructor", id))?,
        ),
        None => None,
    };
    Ok(FlightContext {
        booking,
        aircraft,
        instructor,
    })
}

async fn load_booking(conn: &mut SqliteConnection, booking_id: i64) -> Result<Booking, DeskError> {
    let booking = Booking::find(conn, booking_id)
        .await?
        .ok_or(DeskError::not_found("booking", booking_id))?;
    if !matches!(
        booking.status,
        BookingStatus::Flying | BookingStatus::Complete
    ) {
        return Err(DeskError::InvalidState(format!(
            "booking {} is {}, expected flying or complete",
            booking.id, booking.status
        )));
    }
    Ok(booking)
}

fn times_for(ctx: &FlightContext, readings: &MeterReadings) -> Result<FlightTimes, DeskError> {
    Ok(compute_flight_times(
        readings,
        ctx.aircraft.charge_basis,
        ctx.aircraft.total_time_method,
        ctx.instructor.is_some(),
    )?)
}

/// Default tax rate for new invoices: the default `tax_rates` row, else config.
pub async fn default_tax_rate(
    conn: &mut SqliteConnection,
    config: &Config,
) -> Result<Decimal, DeskError> {
    Ok(TaxRate::find_default(conn)
        .await?
        .map(|r| r.rate)
        .unwrap_or(config.billing.default_tax_rate))
}

/// Recomputes and stores an invoice's totals from its live items. An issued
/// invoice whose payments now cover the total is settled as paid; a
/// negative balance is a credit owed to the member.
pub async fn refresh_totals(
    conn: &mut SqliteConnection,
    invoice_id: i64,
) -> Result<InvoiceWithItems, DeskError> {
    let invoice = Invoice::find(&mut *conn, invoice_id)
        .await?
        .ok_or(DeskError::not_found("invoice", invoice_id))?;
    let items = InvoiceItem::list_live(&mut *conn, invoice_id).await?;
    let totals = invoice_totals(&items, invoice.total_paid);
    Invoice::save_totals(&mut *conn, invoice_id, &totals).await?;
    if matches!(invoice.status, InvoiceStatus::Pending | InvoiceStatus::Overdue) {
        let status = status_after_payment(invoice.status, &totals);
        if status != invoice.status {
            Invoice::set_status(&mut *conn, invoice_id, status).await?;
            info!(invoice_id, status = %status, balance_due = %totals.balance_due, "invoice settled");
        }
    }
    let invoice = Invoice::find(&mut *conn, invoice_id)
        .await?
        .ok_or(DeskError::not_found("invoice", invoice_id))?;
    Ok(InvoiceWithItems { invoice, items })
}

pub async fn load_invoice(
    conn: &mut SqliteConnection,
    invoice_id: i64,
) -> Result<InvoiceWithItems, DeskError> {
    let invoice = Invoice::find(&mut *conn, invoice_id)
        .await?
        .ok_or(DeskError::not_found("invoice", invoice_id))?;
    let items = InvoiceItem::list_live(conn, invoice_id).await?;
    Ok(InvoiceWithItems { invoice, items })
}

/// Brings the generated lines of the booking's invoice in line with `times`.
/// Returns the invoice and whether it could be changed.
async fn sync_invoice(
    conn: &mut SqliteConnection,
    config: &Config,
    ctx: &FlightContext,
    times: &FlightTimes,
    create_if_missing: bool,
) -> Result<(Option<InvoiceWithItems>, bool), DeskError> {
    let invoice = match Invoice::find_by_booking(&mut *conn, ctx.booking.id).await? {
        Some(invoice) => invoice,
        None if create_if_missing => {
            let rate = default_tax_rate(&mut *conn, config).await?;
            let invoice = Invoice::create(
                &mut *conn,
                ctx.booking.user_id,
                Some(ctx.booking.id),
                rate,
                None,
                &config.billing.invoice_prefix,
            )
            .await?;
            info!(invoice_id = invoice.id, booking_id = ctx.booking.id, "created flight invoice");
            invoice
        }
        None => return Ok((None, false)),
    };

    if !invoice.status.is_editable() {
        warn!(
            invoice_id = invoice.id,
            status = %invoice.status,
            "invoice not editable, generated lines left unchanged"
        );
        return Ok((Some(load_invoice(conn, invoice.id).await?), false));
    }

    let aircraft = HourlyCharge {
        id: ctx.aircraft.id,
        label: ctx.aircraft.registration.clone(),
        hourly_rate: ctx.aircraft.hourly_rate,
    };
    let instructor = ctx.instructor.as_ref().map(|i| HourlyCharge {
        id: i.id,
        label: i.full_name(),
        hourly_rate: i.hourly_rate,
    });
    let desired = flight_charges(&aircraft, instructor.as_ref(), times);
    let existing = InvoiceItem::list_live(&mut *conn, invoice.id).await?;
    let rate = invoice.tax_rate;

    for change in reconcile(&desired, &existing, rate) {
        match change {
            ItemChange::Delete { id } => {
                InvoiceItem::soft_delete(&mut *conn, id).await?;
            }
            ItemChange::Update { id, item } => {
                let amounts = line_amounts(item.quantity, item.unit_price, rate);
                InvoiceItem::update(
                    &mut *conn,
                    id,
                    &item.description,
                    item.quantity,
                    item.unit_price,
                    rate,
                    &amounts,
                )
                .await?;
            }
            ItemChange::Insert(item) => {
                let amounts = line_amounts(item.quantity, item.unit_price, rate);
                InvoiceItem::insert(
                    &mut *conn,
                    invoice.id,
                    Some(&item.source),
                    &item.description,
                    item.quantity,
                    item.unit_price,
                    rate,
                    &amounts,
                )
                .await?;
            }
        }
    }

    Ok((Some(refresh_totals(conn, invoice.id).await?), true))
}

/// Credits the log's hours to its aircraft and advances the current meters.
async fn apply_to_aircraft(
    conn: &mut SqliteConnection,
    aircraft: &Aircraft,
    previous: Option<&FlightLog>,
    log: &FlightLog,
    times: &FlightTimes,
) -> Result<(HoursProgression, Decimal), DeskError> {
    let prev_applied = previous.filter(|p| p.applied);
    let outcome = apply_credit(
        aircraft.total_hours,
        prev_applied.and_then(FlightLog::applied_credit),
        times.credited_hours,
    );
    let prev_end = |meter| prev_applied.and_then(|p| p.readings.end(meter));
    let hobbs = advance_meter(
        aircraft.current_hobbs,
        prev_end(Meter::Hobbs),
        log.readings.end(Meter::Hobbs),
    );
    let tacho = advance_meter(
        aircraft.current_tacho,
        prev_end(Meter::Tacho),
        log.readings.end(Meter::Tacho),
    );

    Aircraft::set_hours_and_meters(
        &mut *conn,
        aircraft.id,
        outcome.aircraft_total_hours,
        hobbs,
        tacho,
    )
    .await?;
    FlightLog::mark_applied(conn, log.id, &outcome.progression).await?;

    info!(
        aircraft_id = aircraft.id,
        flight_log_id = log.id,
        credited = %times.credited_hours,
        total_hours = %outcome.aircraft_total_hours,
        "applied flight hours"
    );
    Ok((outcome.progression, outcome.aircraft_total_hours))
}

/// Computes times, stores the flight log and prepares the invoice without
/// touching the aircraft. Once the log has been applied this is a read-only
/// preview; changes go through `correct`.
pub async fn calculate(
    db: &Database,
    config: &Config,
    booking_id: i64,
    readings: MeterReadings,
) -> Result<CompletionResult, DeskError> {
    let mut tx = db.pool().begin().await?;

    let booking = load_booking(&mut tx, booking_id).await?;
    let ctx = load_context(&mut tx, booking).await?;
    let times = times_for(&ctx, &readings)?;
    let previous = FlightLog::find_by_booking(&mut tx, booking_id).await?;
    let preview = apply_credit(
        ctx.aircraft.total_hours,
        previous.as_ref().and_then(FlightLog::applied_credit),
        times.credited_hours,
    );

    if let Some(applied) = previous.filter(|p| p.applied) {
        let invoice = match Invoice::find_by_booking(&mut tx, booking_id).await? {
            Some(invoice) => Some(load_invoice(&mut tx, invoice.id).await?),
            None => None,
        };
        return Ok(CompletionResult {
            booking_id,
            flight_log: applied.previewed(readings, &times),
            times,
            progression: preview.progression,
            aircraft_total_hours: preview.aircraft_total_hours,
            warnings: Vec::new(),
            invoice,
            invoice_updated: false,
        });
    }

    let warnings = start_mismatch_warnings(
        &readings,
        ctx.aircraft.current_hobbs,
        ctx.aircraft.current_tacho,
    );
    let log =
        FlightLog::upsert_readings(&mut tx, booking_id, ctx.aircraft.id, &readings, &times).await?;
    let (invoice, invoice_updated) = sync_invoice(&mut tx, config, &ctx, &times, true).await?;

    tx.commit().await?;

    Ok(CompletionResult {
        booking_id,
        flight_log: log,
        times,
        progression: preview.progression,
        aircraft_total_hours: preview.aircraft_total_hours,
        warnings,
        invoice,
        invoice_updated,
    })
}

/// Check-in. On a booking that is already complete this acts as a correction.
pub async fn complete(
    db: &Database,
    config: &Config,
    booking_id: i64,
    readings: MeterReadings,
) -> Result<CompletionResult, DeskError> {
    let mut tx = db.pool().begin().await?;

    let booking = load_booking(&mut tx, booking_id).await?;
    if booking.status != BookingStatus::Complete {
        ensure_transition(booking.status, BookingStatus::Complete)?;
    }
    let ctx = load_context(&mut tx, booking).await?;
    let times = times_for(&ctx, &readings)?;
    let previous = FlightLog::find_by_booking(&mut tx, booking_id).await?;
    let warnings = match &previous {
        Some(p) if p.applied => Vec::new(),
        _ => start_mismatch_warnings(
            &readings,
            ctx.aircraft.current_hobbs,
            ctx.aircraft.current_tacho,
        ),
    };

    let log =
        FlightLog::upsert_readings(&mut tx, booking_id, ctx.aircraft.id, &readings, &times).await?;
    let (invoice, invoice_updated) = sync_invoice(&mut tx, config, &ctx, &times, true).await?;
    let (progression, aircraft_total_hours) =
        apply_to_aircraft(&mut tx, &ctx.aircraft, previous.as_ref(), &log, &times).await?;

    Booking::set_status(&mut tx, booking_id, BookingStatus::Complete).await?;

    let invoice = match invoice {
        Some(inv) if inv.invoice.status == InvoiceStatus::Draft => {
            let now = Utc::now();
            let due = now + Duration::days(config.billing.payment_terms_days);
            Invoice::issue(&mut tx, inv.invoice.id, now, due).await?;
            Some(load_invoice(&mut tx, inv.invoice.id).await?)
        }
        other => other,
    };
    let log = FlightLog::find(&mut tx, log.id)
        .await?
        .ok_or(DeskError::not_found("flight_log", log.id))?;

    tx.commit().await?;
    info!(booking_id, "booking completed");

    Ok(CompletionResult {
        booking_id,
        flight_log: log,
        times,
        progression,
        aircraft_total_hours,
        warnings,
        invoice,
        invoice_updated,
    })
}

/// Meter correction on a completed flight log. The aircraft moves by the
/// difference in credited hours only.
pub async fn correct(
    db: &Database,
    config: &Config,
    flight_log_id: i64,
    readings: MeterReadings,
) -> Result<CompletionResult, DeskError> {
    let mut tx = db.pool().begin().await?;

    let previous = FlightLog::find(&mut tx, flight_log_id)
        .await?
        .ok_or(DeskError::not_found("flight_log", flight_log_id))?;
    if !previous.applied {
        return Err(DeskError::InvalidState(format!(
            "flight log {flight_log_id} has not been completed"
        )));
    }
    let booking = Booking::find(&mut tx, previous.booking_id)
        .await?
        .ok_or(DeskError::not_found("booking", previous.booking_id))?;
    let booking_id = booking.id;
    let ctx = load_context(&mut tx, booking).await?;
    if ctx.aircraft.id != previous.aircraft_id {
        return Err(DeskError::InvalidState(format!(
            "flight log {flight_log_id} belongs to aircraft {}",
            previous.aircraft_id
        )));
    }
    let times = times_for(&ctx, &readings)?;

    let log =
        FlightLog::upsert_readings(&mut tx, booking_id, ctx.aircraft.id, &readings, &times).await?;
    let (invoice, invoice_updated) = sync_invoice(&mut tx, config, &ctx, &times, false).await?;
    let (progression, aircraft_total_hours) =
        apply_to_aircraft(&mut tx, &ctx.aircraft, Some(&previous), &log, &times).await?;
    let log = FlightLog::find(&mut tx, log.id)
        .await?
        .ok_or(DeskError::not_found("flight_log", log.id))?;

    tx.commit().await?;
    info!(
        flight_log_id,
        old_credited = %previous.credited_hours,
        new_credited = %times.credited_hours,
        invoice_updated,
        "flight log corrected"
    );

    Ok(CompletionResult {
        booking_id,
        flight_log: log,
        times,
        progression,
        aircraft_total_hours,
        warnings: Vec::new(),
        invoice,
        invoice_updated,
    })
}
