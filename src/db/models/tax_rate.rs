use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::codec::{dec, get_decimal, get_time, ts};

#[derive(Debug, Clone, Serialize)]
pub struct TaxRate {
    pub id: i64,
    pub name: String,
    /// Fraction, e.g. `0.15` for 15%.
    pub rate: Decimal,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaxRate {
    pub name: String,
    pub rate: Decimal,
    #[serde(default)]
    pub is_default: bool,
}

impl TaxRate {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            rate: get_decimal(&row, "rate")?,
            is_default: row.try_get("is_default")?,
            created_at: get_time(&row, "created_at")?,
        })
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM tax_rates ORDER BY is_default DESC, name")
            .fetch_all(conn)
            .await?
            .into_iter()
            .map(Self::from_row)
            .collect()
    }

    pub async fn find_default(conn: &mut SqliteConnection) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM tax_rates WHERE is_default = 1 ORDER BY id DESC LIMIT 1")
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    /// A new default replaces the previous one.
    pub async fn create(
        conn: &mut SqliteConnection,
        data: &CreateTaxRate,
    ) -> Result<Self, sqlx::Error> {
        if data.is_default {
            sqlx::query("UPDATE tax_rates SET is_default = 0 WHERE is_default = 1")
                .execute(&mut *conn)
                .await?;
        }
        let id = sqlx::query(
            "INSERT INTO tax_rates (name, rate, is_default, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&data.name)
        .bind(dec(data.rate))
        .bind(data.is_default)
        .bind(ts(Utc::now()))
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        let row = sqlx::query("SELECT * FROM tax_rates WHERE id = ?")
            .bind(id)
            .fetch_one(conn)
            .await?;
        Self::from_row(row)
    }
}
