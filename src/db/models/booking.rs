use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use strum_macros::{Display, EnumString};

use crate::db::codec::{get_enum, get_opt_time, get_time, opt_ts, ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Unconfirmed,
    Confirmed,
    Flying,
    Complete,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BookingType {
    #[default]
    Flight,
    Groundwork,
    Maintenance,
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub instructor_id: Option<i64>,
    pub aircraft_id: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub booking_type: BookingType,
    pub purpose: Option<String>,
    pub remarks: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBooking {
    pub user_id: i64,
    pub instructor_id: Option<i64>,
    pub aircraft_id: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub booking_type: BookingType,
    #[serde(default)]
    pub status: BookingStatus,
    pub purpose: Option<String>,
    pub remarks: Option<String>,
}

/// Status changes go through the lifecycle endpoints, except confirming.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBooking {
    pub instructor_id: Option<i64>,
    pub aircraft_id: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub booking_type: Option<BookingType>,
    pub purpose: Option<String>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub aircraft_id: Option<i64>,
    pub instructor_id: Option<i64>,
    pub user_id: Option<i64>,
    pub status: Option<BookingStatus>,
}

impl Booking {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            instructor_id: row.try_get("instructor_id")?,
            aircraft_id: row.try_get("aircraft_id")?,
            start_time: get_time(&row, "start_time")?,
            end_time: get_time(&row, "end_time")?,
            status: get_enum(&row, "status")?,
            booking_type: get_enum(&row, "booking_type")?,
            purpose: row.try_get("purpose")?,
            remarks: row.try_get("remarks")?,
            cancellation_reason: row.try_get("cancellation_reason")?,
            created_at: get_time(&row, "created_at")?,
            updated_at: get_time(&row, "updated_at")?,
            deleted_at: get_opt_time(&row, "deleted_at")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM bookings WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn list(
        conn: &mut SqliteConnection,
        filter: &BookingFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let from = opt_ts(filter.from);
        let to = opt_ts(filter.to);
        let status = filter.status.map(|s| s.to_string());
        sqlx::query(
            r#"SELECT * FROM bookings
               WHERE deleted_at IS NULL
                 AND (? IS NULL OR end_time > ?)
                 AND (? IS NULL OR start_time < ?)
                 AND (? IS NULL OR aircraft_id = ?)
                 AND (? IS NULL OR instructor_id = ?)
                 AND (? IS NULL OR user_id = ?)
                 AND (? IS NULL OR status = ?)
               ORDER BY start_time, id"#,
        )
        .bind(&from)
        .bind(&from)
        .bind(&to)
        .bind(&to)
        .bind(filter.aircraft_id)
        .bind(filter.aircraft_id)
        .bind(filter.instructor_id)
        .bind(filter.instructor_id)
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

    /// Ids of live bookings overlapping `[start, end)` on the same aircraft or
    /// the same instructor.
    pub async fn find_conflicts(
        conn: &mut SqliteConnection,
        aircraft_id: Option<i64>,
        instructor_id: Option<i64>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<i64>,
    ) -> Result<Vec<i64>, sqlx::Error> {
        if aircraft_id.is_none() && instructor_id.is_none() {
            return Ok(Vec::new());
        }
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"SELECT id FROM bookings
               WHERE deleted_at IS NULL AND status != 'cancelled'
                 AND (aircraft_id = ? OR instructor_id = ?)
                 AND start_time < ? AND ? < end_time
                 AND (? IS NULL OR id != ?)
               ORDER BY start_time, id"#,
        )
        .bind(aircraft_id)
        .bind(instructor_id)
        .bind(ts(end))
        .bind(ts(start))
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_all(conn)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        data: &CreateBooking,
    ) -> Result<Self, sqlx::Error> {
        let now = ts(Utc::now());
        let id = sqlx::query(
            r#"INSERT INTO bookings (
                user_id, instructor_id, aircraft_id, start_time, end_time, status,
                booking_type, purpose, remarks, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(data.user_id)
        .bind(data.instructor_id)
        .bind(data.aircraft_id)
        .bind(ts(data.start_time))
        .bind(ts(data.end_time))
        .bind(data.status.to_string())
        .bind(data.booking_type.to_string())
        .bind(&data.purpose)
        .bind(&data.remarks)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        Self::find(conn, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Writes every mutable column of `booking` back.
    pub async fn save(conn: &mut SqliteConnection, booking: &Booking) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"UPDATE bookings SET instructor_id = ?, aircraft_id = ?, start_time = ?, end_time = ?,
                status = ?, booking_type = ?, purpose = ?, remarks = ?, cancellation_reason = ?,
                updated_at = ?
               WHERE id = ?"#,
        )
        .bind(booking.instructor_id)
        .bind(booking.aircraft_id)
        .bind(ts(booking.start_time))
        .bind(ts(booking.end_time))
        .bind(booking.status.to_string())
        .bind(booking.booking_type.to_string())
        .bind(&booking.purpose)
        .bind(&booking.remarks)
        .bind(&booking.cancellation_reason)
        .bind(ts(Utc::now()))
        .bind(booking.id)
        .execute(&mut *conn)
        .await?;
        Self::find(conn, booking.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: i64,
        status: BookingStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bookings SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(ts(Utc::now()))
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn soft_delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("UPDATE bookings SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(ts(Utc::now()))
            .bind(id)
            .execute(conn)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
