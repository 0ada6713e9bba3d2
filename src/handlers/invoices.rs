use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::info;

use crate::db::models::invoice::{
    CreateInvoice, CreateInvoiceItem, Invoice, InvoiceFilter, InvoiceItem, InvoiceStatus,
    InvoiceWithItems, UpdateInvoiceItem,
};
use crate::db::models::payment::{CreatePayment, Payment};
use crate::db::models::user::User;
use crate::middleware::json::require_text;
use crate::middleware::{Validate, ValidatedJson};
use crate::service::billing::{invoice_totals, line_amounts, status_after_payment};
use crate::service::completion::{default_tax_rate, load_invoice, refresh_totals};
use crate::{DeskError, router::DeskState};

pub(crate) fn check_tax_rate(rate: Decimal) -> Result<(), DeskError> {
    if rate.is_sign_negative() || rate > Decimal::ONE {
        return Err(DeskError::validation("tax rate must be between 0 and 1"));
    }
    Ok(())
}

impl Validate for CreateInvoice {
    fn validate(&self) -> Result<(), DeskError> {
        self.tax_rate.map_or(Ok(()), check_tax_rate)
    }
}

impl Validate for CreateInvoiceItem {
    fn validate(&self) -> Result<(), DeskError> {
        require_text("description", &self.description)?;
        if self.quantity <= Decimal::ZERO {
            return Err(DeskError::validation("quantity must be positive"));
        }
        Ok(())
    }
}

impl Validate for UpdateInvoiceItem {
    fn validate(&self) -> Result<(), DeskError> {
        if self.quantity.is_some_and(|q| q <= Decimal::ZERO) {
            return Err(DeskError::validation("quantity must be positive"));
        }
        Ok(())
    }
}

impl Validate for CreatePayment {
    fn validate(&self) -> Result<(), DeskError> {
        require_text("method", &self.method)?;
        if self.amount <= Decimal::ZERO {
            return Err(DeskError::validation("payment amount must be positive"));
        }
        Ok(())
    }
}

/// Totals after a hand edit; a manual change may not take the total below
/// what has already been paid.
async fn refresh_after_edit(
    conn: &mut SqliteConnection,
    invoice_id: i64,
) -> Result<InvoiceWithItems, DeskError> {
    let result = refresh_totals(conn, invoice_id).await?;
    if result.invoice.balance_due < Decimal::ZERO {
        return Err(DeskError::Conflict(format!(
            "invoice {invoice_id} total {} would fall below the {} already paid",
            result.invoice.total_amount, result.invoice.total_paid
        )));
    }
    Ok(result)
}

async fn editable_invoice(
    conn: &mut SqliteConnection,
    invoice_id: i64,
) -> Result<Invoice, DeskError> {
    let invoice = Invoice::find(conn, invoice_id)
        .await?
        .ok_or(DeskError::not_found("invoice", invoice_id))?;
    if !invoice.status.is_editable() {
        return Err(DeskError::Conflict(format!(
            "invoice {invoice_id} is {} and its items cannot change",
            invoice.status
        )));
    }
    Ok(invoice)
}

pub async fn list(
    State(state): State<DeskState>,
    Query(filter): Query<InvoiceFilter>,
) -> Result<Json<Vec<Invoice>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(Invoice::list(&mut conn, &filter).await?))
}

pub async fn show(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceWithItems>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    Ok(Json(load_invoice(&mut conn, id).await?))
}

/// Manual invoice, not tied to a booking.
pub async fn create(
    State(state): State<DeskState>,
    ValidatedJson(data): ValidatedJson<CreateInvoice>,
) -> Result<(StatusCode, Json<InvoiceWithItems>), DeskError> {
    let mut tx = state.db.pool().begin().await?;
    if User::find(&mut tx, data.user_id).await?.is_none() {
        return Err(DeskError::not_found("user", data.user_id));
    }
    let rate = match data.tax_rate {
        Some(rate) => rate,
        None => default_tax_rate(&mut tx, &state.config).await?,
    };
    let invoice = Invoice::create(
        &mut tx,
        data.user_id,
        None,
        rate,
        data.notes.as_deref(),
        &state.config.billing.invoice_prefix,
    )
    .await?;
    tx.commit().await?;

    info!(invoice_id = invoice.id, user_id = data.user_id, "invoice created");
    Ok((
        StatusCode::CREATED,
        Json(InvoiceWithItems {
            invoice,
            items: Vec::new(),
        }),
    ))
}

pub async fn add_item(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<CreateInvoiceItem>,
) -> Result<(StatusCode, Json<InvoiceWithItems>), DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let invoice = editable_invoice(&mut tx, id).await?;
    let amounts = line_amounts(data.quantity, data.unit_price, invoice.tax_rate);
    InvoiceItem::insert(
        &mut tx,
        id,
        None,
        &data.description,
        data.quantity,
        data.unit_price,
        invoice.tax_rate,
        &amounts,
    )
    .await?;
    let result = refresh_after_edit(&mut tx, id).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn update_item(
    State(state): State<DeskState>,
    Path(item_id): Path<i64>,
    ValidatedJson(data): ValidatedJson<UpdateInvoiceItem>,
) -> Result<Json<InvoiceWithItems>, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let item = InvoiceItem::find(&mut tx, item_id)
        .await?
        .ok_or(DeskError::not_found("invoice_item", item_id))?;
    let invoice = editable_invoice(&mut tx, item.invoice_id).await?;

    let description = data.description.as_deref().unwrap_or(&item.description);
    let quantity = data.quantity.unwrap_or(item.quantity);
    let unit_price = data.unit_price.unwrap_or(item.unit_price);
    let amounts = line_amounts(quantity, unit_price, invoice.tax_rate);
    InvoiceItem::update(
        &mut tx,
        item_id,
        description,
        quantity,
        unit_price,
        invoice.tax_rate,
        &amounts,
    )
    .await?;
    let result = refresh_after_edit(&mut tx, invoice.id).await?;
    tx.commit().await?;
    Ok(Json(result))
}

pub async fn remove_item(
    State(state): State<DeskState>,
    Path(item_id): Path<i64>,
) -> Result<Json<InvoiceWithItems>, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let item = InvoiceItem::find(&mut tx, item_id)
        .await?
        .ok_or(DeskError::not_found("invoice_item", item_id))?;
    let invoice = editable_invoice(&mut tx, item.invoice_id).await?;
    InvoiceItem::soft_delete(&mut tx, item_id).await?;
    let result = refresh_after_edit(&mut tx, invoice.id).await?;
    tx.commit().await?;
    Ok(Json(result))
}

pub async fn issue(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceWithItems>, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let current = load_invoice(&mut tx, id).await?;
    if current.invoice.status != InvoiceStatus::Draft {
        return Err(DeskError::InvalidState(format!(
            "invoice {id} is {}, only drafts can be issued",
            current.invoice.status
        )));
    }
    if current.items.is_empty() {
        return Err(DeskError::InvalidState(format!(
            "invoice {id} has no items"
        )));
    }
    let now = Utc::now();
    let due = now + Duration::days(state.config.billing.payment_terms_days);
    Invoice::issue(&mut tx, id, now, due).await?;
    let result = load_invoice(&mut tx, id).await?;
    tx.commit().await?;

    info!(invoice_id = id, due_date = %due, "invoice issued");
    Ok(Json(result))
}

pub async fn void(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceWithItems>, DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let invoice = Invoice::find(&mut tx, id)
        .await?
        .ok_or(DeskError::not_found("invoice", id))?;
    if matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
        return Err(DeskError::InvalidState(format!(
            "invoice {id} is {} and cannot be voided",
            invoice.status
        )));
    }
    if invoice.total_paid > Decimal::ZERO {
        return Err(DeskError::InvalidState(format!(
            "invoice {id} has payments recorded"
        )));
    }
    Invoice::void(&mut tx, id, Utc::now()).await?;
    let result = load_invoice(&mut tx, id).await?;
    tx.commit().await?;

    info!(invoice_id = id, "invoice voided");
    Ok(Json(result))
}

pub async fn payments(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Payment>>, DeskError> {
    let mut conn = state.db.pool().acquire().await?;
    if Invoice::find(&mut conn, id).await?.is_none() {
        return Err(DeskError::not_found("invoice", id));
    }
    Ok(Json(Payment::list_for_invoice(&mut conn, id).await?))
}

#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub invoice: InvoiceWithItems,
}

pub async fn record_payment(
    State(state): State<DeskState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<CreatePayment>,
) -> Result<(StatusCode, Json<PaymentReceipt>), DeskError> {
    let mut tx = state.db.pool().begin().await?;
    let current = load_invoice(&mut tx, id).await?;
    let invoice = &current.invoice;
    if !matches!(invoice.status, InvoiceStatus::Pending | InvoiceStatus::Overdue) {
        return Err(DeskError::InvalidState(format!(
            "invoice {id} is {} and cannot take payments",
            invoice.status
        )));
    }
    if data.amount > invoice.balance_due {
        return Err(DeskError::validation(format!(
            "payment {} exceeds balance due {}",
            data.amount, invoice.balance_due
        )));
    }

    let payment = Payment::create(&mut tx, id, &data).await?;
    let totals = invoice_totals(&current.items, invoice.total_paid + data.amount);
    Invoice::save_totals(&mut tx, id, &totals).await?;
    let status = status_after_payment(invoice.status, &totals);
    if status != invoice.status {
        Invoice::set_status(&mut tx, id, status).await?;
    }
    let invoice = load_invoice(&mut tx, id).await?;
    tx.commit().await?;

    info!(
        invoice_id = id,
        amount = %payment.amount,
        balance_due = %totals.balance_due,
        "payment recorded"
    );
    Ok((StatusCode::CREATED, Json(PaymentReceipt { payment, invoice })))
}
