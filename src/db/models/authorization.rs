use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use strum_macros::{Display, EnumString};

use crate::db::codec::{get_enum, get_opt_time, get_time, ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuthorizationStatus {
    Pending,
    Approved,
    Rejected,
}

/// An instructor's sign-off for a student's solo flight.
#[derive(Debug, Clone, Serialize)]
pub struct FlightAuthorization {
    pub id: i64,
    pub booking_id: i64,
    pub user_id: i64,
    pub purpose: String,
    pub status: AuthorizationStatus,
    pub approved_by: Option<i64>,
    pub decided_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAuthorization {
    pub booking_id: i64,
    pub purpose: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveAuthorization {
    pub instructor_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct RejectAuthorization {
    pub instructor_id: i64,
    pub reason: String,
}

impl FlightAuthorization {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            booking_id: row.try_get("booking_id")?,
            user_id: row.try_get("user_id")?,
            purpose: row.try_get("purpose")?,
            status: get_enum(&row, "status")?,
            approved_by: row.try_get("approved_by")?,
            decided_at: get_opt_time(&row, "decided_at")?,
            rejection_reason: row.try_get("rejection_reason")?,
            created_at: get_time(&row, "created_at")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM flight_authorizations WHERE id = ?")
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
        sqlx::query("SELECT * FROM flight_authorizations WHERE booking_id = ?")
            .bind(booking_id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        user_id: i64,
        data: &CreateAuthorization,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            r#"INSERT INTO flight_authorizations (booking_id, user_id, purpose, status, created_at)
               VALUES (?, ?, ?, 'pending', ?)"#,
        )
        .bind(data.booking_id)
        .bind(user_id)
        .bind(&data.purpose)
        .bind(ts(Utc::now()))
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        Self::find(conn, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn decide(
        conn: &mut SqliteConnection,
        id: i64,
        status: AuthorizationStatus,
        instructor_id: i64,
        rejection_reason: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query(
            r#"UPDATE flight_authorizations SET status = ?, approved_by = ?, decided_at = ?, rejection_reason = ?
               WHERE id = ?"#,
        )
        .bind(status.to_string())
        .bind(instructor_id)
        .bind(ts(Utc::now()))
        .bind(rejection_reason)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Self::find(conn, id).await
    }
}
