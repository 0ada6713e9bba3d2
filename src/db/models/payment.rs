use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::codec::{dec, get_decimal, get_time, ts};

#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: i64,
    pub invoice_id: i64,
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePayment {
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            invoice_id: row.try_get("invoice_id")?,
            amount: get_decimal(&row, "amount")?,
            method: row.try_get("method")?,
            reference: row.try_get("reference")?,
            paid_at: get_time(&row, "paid_at")?,
            created_at: get_time(&row, "created_at")?,
        })
    }

    pub async fn list_for_invoice(
        conn: &mut SqliteConnection,
        invoice_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM payments WHERE invoice_id = ? ORDER BY paid_at, id")
            .bind(invoice_id)
            .fetch_all(conn)
            .await?
            .into_iter()
            .map(Self::from_row)
            .collect()
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        invoice_id: i64,
        data: &CreatePayment,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let id = sqlx::query(
            r#"INSERT INTO payments (invoice_id, amount, method, reference, paid_at, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(invoice_id)
        .bind(dec(data.amount))
        .bind(&data.method)
        .bind(&data.reference)
        .bind(ts(data.paid_at.unwrap_or(now)))
        .bind(ts(now))
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        let row = sqlx::query("SELECT * FROM payments WHERE id = ?")
            .bind(id)
            .fetch_one(conn)
            .await?;
        Self::from_row(row)
    }
}
