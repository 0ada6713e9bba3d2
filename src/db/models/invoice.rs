use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use strum_macros::{Display, EnumString};

use crate::db::codec::{dec, get_decimal, get_enum, get_opt_time, get_time, ts};
use crate::service::billing::{InvoiceTotals, LineAmounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Whether line items may still change.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Pending | Self::Overdue)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: Option<String>,
    pub user_id: i64,
    pub booking_id: Option<i64>,
    pub status: InvoiceStatus,
    pub tax_rate: Decimal,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub balance_due: Decimal,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub voided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    /// Set on generated items; `None` for lines added by hand.
    pub source: Option<String>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub rate_inclusive: Decimal,
    pub amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoice {
    pub user_id: i64,
    pub tax_rate: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInvoiceItem {
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceFilter {
    pub user_id: Option<i64>,
    pub status: Option<InvoiceStatus>,
}

/// Invoice with its live line items.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

impl Invoice {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            invoice_number: row.try_get("invoice_number")?,
            user_id: row.try_get("user_id")?,
            booking_id: row.try_get("booking_id")?,
            status: get_enum(&row, "status")?,
            tax_rate: get_decimal(&row, "tax_rate")?,
            subtotal: get_decimal(&row, "subtotal")?,
            tax_total: get_decimal(&row, "tax_total")?,
            total_amount: get_decimal(&row, "total_amount")?,
            total_paid: get_decimal(&row, "total_paid")?,
            balance_due: get_decimal(&row, "balance_due")?,
            issue_date: get_opt_time(&row, "issue_date")?,
            due_date: get_opt_time(&row, "due_date")?,
            notes: row.try_get("notes")?,
            created_at: get_time(&row, "created_at")?,
            updated_at: get_time(&row, "updated_at")?,
            voided_at: get_opt_time(&row, "voided_at")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM invoices WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn find_by_booking(
        conn: &mut SqliteConnection,
        booking_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM invoices WHERE booking_id = ?")
            .bind(booking_id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn list(
        conn: &mut SqliteConnection,
        filter: &InvoiceFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let status = filter.status.map(|s| s.to_string());
        sqlx::query(
            r#"SELECT * FROM invoices
               WHERE (? IS NULL OR user_id = ?) AND (? IS NULL OR status = ?)
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(&status)
        .bind(&status)
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(Self::from_row)
        .collect()
    }

    /// Creates a draft and assigns its number from the row id.
    pub async fn create(
        conn: &mut SqliteConnection,
        user_id: i64,
        booking_id: Option<i64>,
        tax_rate: Decimal,
        notes: Option<&str>,
        number_prefix: &str,
    ) -> Result<Self, sqlx::Error> {
        let now = ts(Utc::now());
        let id = sqlx::query(
            r#"INSERT INTO invoices (user_id, booking_id, status, tax_rate, notes, created_at, updated_at)
               VALUES (?, ?, 'draft', ?, ?, ?, ?)"#,
        )
        .bind(user_id)
        .bind(booking_id)
        .bind(dec(tax_rate))
        .bind(notes)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        sqlx::query("UPDATE invoices SET invoice_number = ? WHERE id = ?")
            .bind(crate::service::billing::invoice_number(number_prefix, id))
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Self::find(conn, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn save_totals(
        conn: &mut SqliteConnection,
        id: i64,
        totals: &InvoiceTotals,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE invoices SET subtotal = ?, tax_total = ?, total_amount = ?, total_paid = ?,
                balance_due = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(dec(totals.subtotal))
        .bind(dec(totals.tax_total))
        .bind(dec(totals.total_amount))
        .bind(dec(totals.total_paid))
        .bind(dec(totals.balance_due))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: i64,
        status: InvoiceStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE invoices SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(ts(Utc::now()))
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn issue(
        conn: &mut SqliteConnection,
        id: i64,
        issue_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE invoices SET status = 'pending', issue_date = ?, due_date = ?, updated_at = ? WHERE id = ?",
        )
        .bind(ts(issue_date))
        .bind(ts(due_date))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn void(
        conn: &mut SqliteConnection,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE invoices SET status = 'cancelled', voided_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(ts(at))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Marks pending invoices past their due date as overdue.
    pub async fn mark_overdue(
        conn: &mut SqliteConnection,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let res = sqlx::query(
            "UPDATE invoices SET status = 'overdue', updated_at = ? WHERE status = 'pending' AND due_date < ?",
        )
        .bind(ts(now))
        .bind(ts(now))
        .execute(conn)
        .await?;
        Ok(res.rows_affected())
    }
}

impl InvoiceItem {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            invoice_id: row.try_get("invoice_id")?,
            source: row.try_get("source")?,
            description: row.try_get("description")?,
            quantity: get_decimal(&row, "quantity")?,
            unit_price: get_decimal(&row, "unit_price")?,
            rate_inclusive: get_decimal(&row, "rate_inclusive")?,
            amount: get_decimal(&row, "amount")?,
            tax_rate: get_decimal(&row, "tax_rate")?,
            tax_amount: get_decimal(&row, "tax_amount")?,
            line_total: get_decimal(&row, "line_total")?,
            created_at: get_time(&row, "created_at")?,
            updated_at: get_time(&row, "updated_at")?,
            deleted_at: get_opt_time(&row, "deleted_at")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM invoice_items WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn list_live(
        conn: &mut SqliteConnection,
        invoice_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query(
            "SELECT * FROM invoice_items WHERE invoice_id = ? AND deleted_at IS NULL ORDER BY id",
        )
        .bind(invoice_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(Self::from_row)
        .collect()
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        conn: &mut SqliteConnection,
        invoice_id: i64,
        source: Option<&str>,
        description: &str,
        quantity: Decimal,
        unit_price: Decimal,
        tax_rate: Decimal,
        amounts: &LineAmounts,
    ) -> Result<i64, sqlx::Error> {
        let now = ts(Utc::now());
        let id = sqlx::query(
            r#"INSERT INTO invoice_items (
                invoice_id, source, description, quantity, unit_price, rate_inclusive,
                amount, tax_rate, tax_amount, line_total, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(invoice_id)
        .bind(source)
        .bind(description)
        .bind(dec(quantity))
        .bind(dec(unit_price))
        .bind(dec(amounts.rate_inclusive))
        .bind(dec(amounts.amount))
        .bind(dec(tax_rate))
        .bind(dec(amounts.tax_amount))
        .bind(dec(amounts.line_total))
        .bind(&now)
        .bind(&now)
        .execute(conn)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    pub async fn update(
        conn: &mut SqliteConnection,
        id: i64,
        description: &str,
        quantity: Decimal,
        unit_price: Decimal,
        tax_rate: Decimal,
        amounts: &LineAmounts,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE invoice_items SET description = ?, quantity = ?, unit_price = ?, rate_inclusive = ?,
                amount = ?, tax_rate = ?, tax_amount = ?, line_total = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(description)
        .bind(dec(quantity))
        .bind(dec(unit_price))
        .bind(dec(amounts.rate_inclusive))
        .bind(dec(amounts.amount))
        .bind(dec(tax_rate))
        .bind(dec(amounts.tax_amount))
        .bind(dec(amounts.line_total))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn soft_delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query(
            "UPDATE invoice_items SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
