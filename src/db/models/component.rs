use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::codec::{dec, get_opt_decimal, get_opt_time, get_time, opt_dec, opt_ts, ts};

/// A maintenance item tracked against an aircraft, due by hours, by
/// calendar days, or both.
#[derive(Debug, Clone, Serialize)]
pub struct AircraftComponent {
    pub id: i64,
    pub aircraft_id: i64,
    pub name: String,
    pub interval_hours: Option<Decimal>,
    pub interval_days: Option<i64>,
    pub last_completed_hours: Option<Decimal>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub extension_hours: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateComponent {
    pub aircraft_id: i64,
    pub name: String,
    pub interval_hours: Option<Decimal>,
    pub interval_days: Option<i64>,
    pub last_completed_hours: Option<Decimal>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateComponent {
    pub name: Option<String>,
    pub interval_hours: Option<Decimal>,
    pub interval_days: Option<i64>,
    pub extension_hours: Option<Decimal>,
    pub notes: Option<String>,
}

/// Records maintenance done; both fields default to "now" on the aircraft.
#[derive(Debug, Default, Deserialize)]
pub struct CompleteComponent {
    pub completed_hours: Option<Decimal>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AircraftComponent {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            aircraft_id: row.try_get("aircraft_id")?,
            name: row.try_get("name")?,
            interval_hours: get_opt_decimal(&row, "interval_hours")?,
            interval_days: row.try_get("interval_days")?,
            last_completed_hours: get_opt_decimal(&row, "last_completed_hours")?,
            last_completed_at: get_opt_time(&row, "last_completed_at")?,
            extension_hours: get_opt_decimal(&row, "extension_hours")?,
            notes: row.try_get("notes")?,
            created_at: get_time(&row, "created_at")?,
            updated_at: get_time(&row, "updated_at")?,
            deleted_at: get_opt_time(&row, "deleted_at")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM aircraft_components WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn list(
        conn: &mut SqliteConnection,
        aircraft_id: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query(
            r#"SELECT * FROM aircraft_components
               WHERE deleted_at IS NULL AND (? IS NULL OR aircraft_id = ?)
               ORDER BY aircraft_id, name"#,
        )
        .bind(aircraft_id)
        .bind(aircraft_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(Self::from_row)
        .collect()
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        data: &CreateComponent,
    ) -> Result<Self, sqlx::Error> {
        let now = ts(Utc::now());
        let id = sqlx::query(
            r#"INSERT INTO aircraft_components (
                aircraft_id, name, interval_hours, interval_days, last_completed_hours,
                last_completed_at, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(data.aircraft_id)
        .bind(&data.name)
        .bind(opt_dec(data.interval_hours))
        .bind(data.interval_days)
        .bind(opt_dec(data.last_completed_hours))
        .bind(opt_ts(data.last_completed_at))
        .bind(&data.notes)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        Self::find(conn, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        conn: &mut SqliteConnection,
        id: i64,
        data: &UpdateComponent,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(existing) = Self::find(&mut *conn, id).await? else {
            return Ok(None);
        };
        sqlx::query(
            r#"UPDATE aircraft_components SET name = ?, interval_hours = ?, interval_days = ?,
                extension_hours = ?, notes = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(data.name.as_ref().unwrap_or(&existing.name))
        .bind(opt_dec(data.interval_hours.or(existing.interval_hours)))
        .bind(data.interval_days.or(existing.interval_days))
        .bind(opt_dec(data.extension_hours.or(existing.extension_hours)))
        .bind(data.notes.as_ref().or(existing.notes.as_ref()))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Self::find(conn, id).await
    }

    /// Resets the interval from the given point; any extension is consumed.
    pub async fn mark_completed(
        conn: &mut SqliteConnection,
        id: i64,
        completed_hours: Decimal,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query(
            r#"UPDATE aircraft_components SET last_completed_hours = ?, last_completed_at = ?,
                extension_hours = NULL, updated_at = ?
               WHERE id = ? AND deleted_at IS NULL"#,
        )
        .bind(dec(completed_hours))
        .bind(ts(completed_at))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Self::find(conn, id).await
    }

    pub async fn soft_delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query(
            "UPDATE aircraft_components SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
