use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use strum_macros::{Display, EnumString};

use crate::db::codec::{dec, get_decimal, get_enum, get_time, ts};
use crate::service::meter::{Meter, TotalTimeMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AircraftStatus {
    #[default]
    Active,
    Grounded,
    Retired,
}

#[derive(Debug, Clone, Serialize)]
pub struct Aircraft {
    pub id: i64,
    pub registration: String,
    pub aircraft_type: String,
    pub hourly_rate: Decimal,
    pub charge_basis: Meter,
    pub total_time_method: TotalTimeMethod,
    pub current_hobbs: Decimal,
    pub current_tacho: Decimal,
    pub total_hours: Decimal,
    pub status: AircraftStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAircraft {
    pub registration: String,
    pub aircraft_type: String,
    pub hourly_rate: Decimal,
    pub charge_basis: Meter,
    pub total_time_method: TotalTimeMethod,
    #[serde(default)]
    pub current_hobbs: Decimal,
    #[serde(default)]
    pub current_tacho: Decimal,
    #[serde(default)]
    pub total_hours: Decimal,
}

/// Meters and total hours are only moved by flight completion and
/// corrections, so they are not editable here.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAircraft {
    pub aircraft_type: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub charge_basis: Option<Meter>,
    pub total_time_method: Option<TotalTimeMethod>,
    pub status: Option<AircraftStatus>,
}

impl Aircraft {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            registration: row.try_get("registration")?,
            aircraft_type: row.try_get("aircraft_type")?,
            hourly_rate: get_decimal(&row, "hourly_rate")?,
            charge_basis: get_enum(&row, "charge_basis")?,
            total_time_method: get_enum(&row, "total_time_method")?,
            current_hobbs: get_decimal(&row, "current_hobbs")?,
            current_tacho: get_decimal(&row, "current_tacho")?,
            total_hours: get_decimal(&row, "total_hours")?,
            status: get_enum(&row, "status")?,
            created_at: get_time(&row, "created_at")?,
            updated_at: get_time(&row, "updated_at")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM aircraft WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM aircraft ORDER BY registration")
            .fetch_all(conn)
            .await?
            .into_iter()
            .map(Self::from_row)
            .collect()
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        data: &CreateAircraft,
    ) -> Result<Self, sqlx::Error> {
        let now = ts(Utc::now());
        let id = sqlx::query(
            r#"INSERT INTO aircraft (
                registration, aircraft_type, hourly_rate, charge_basis, total_time_method,
                current_hobbs, current_tacho, total_hours, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(data.registration.trim().to_uppercase())
        .bind(&data.aircraft_type)
        .bind(dec(data.hourly_rate))
        .bind(data.charge_basis.to_string())
        .bind(data.total_time_method.to_string())
        .bind(dec(data.current_hobbs))
        .bind(dec(data.current_tacho))
        .bind(dec(data.total_hours))
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
        data: &UpdateAircraft,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(existing) = Self::find(&mut *conn, id).await? else {
            return Ok(None);
        };
        sqlx::query(
            r#"UPDATE aircraft SET aircraft_type = ?, hourly_rate = ?, charge_basis = ?,
                total_time_method = ?, status = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(data.aircraft_type.as_ref().unwrap_or(&existing.aircraft_type))
        .bind(dec(data.hourly_rate.unwrap_or(existing.hourly_rate)))
        .bind(data.charge_basis.unwrap_or(existing.charge_basis).to_string())
        .bind(
            data.total_time_method
                .unwrap_or(existing.total_time_method)
                .to_string(),
        )
        .bind(data.status.unwrap_or(existing.status).to_string())
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Self::find(conn, id).await
    }

    /// Writes the hours and meters derived by flight completion.
    pub async fn set_hours_and_meters(
        conn: &mut SqliteConnection,
        id: i64,
        total_hours: Decimal,
        current_hobbs: Decimal,
        current_tacho: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE aircraft SET total_hours = ?, current_hobbs = ?, current_tacho = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(dec(total_hours))
        .bind(dec(current_hobbs))
        .bind(dec(current_tacho))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }
}
