use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::codec::{dec, get_decimal, get_opt_decimal, get_time, opt_dec, ts};
use crate::service::meter::{AppliedCredit, FlightTimes, HoursProgression, MeterReadings};

/// Tech log entry for one booking.
#[derive(Debug, Clone, Serialize)]
pub struct FlightLog {
    pub id: i64,
    pub booking_id: i64,
    pub aircraft_id: i64,
    #[serde(flatten)]
    pub readings: MeterReadings,
    pub billing_hours: Decimal,
    pub dual_time: Decimal,
    pub solo_time: Decimal,
    pub credited_hours: Decimal,
    pub total_hours_start: Option<Decimal>,
    pub total_hours_end: Option<Decimal>,
    /// Whether `credited_hours` has been added to the aircraft.
    pub applied: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlightLog {
    /// The credit this log has already contributed to its aircraft.
    pub fn applied_credit(&self) -> Option<AppliedCredit> {
        match (self.applied, self.total_hours_start) {
            (true, Some(total_hours_start)) => Some(AppliedCredit {
                total_hours_start,
                credited_hours: self.credited_hours,
            }),
            _ => None,
        }
    }

    /// This log with other readings, as it would read if they were stored.
    /// The applied progression is kept.
    pub fn previewed(mut self, readings: MeterReadings, times: &FlightTimes) -> Self {
        self.readings = readings;
        self.billing_hours = times.billing_hours;
        self.dual_time = times.dual_time;
        self.solo_time = times.solo_time;
        self.credited_hours = times.credited_hours;
        self
    }

    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            booking_id: row.try_get("booking_id")?,
            aircraft_id: row.try_get("aircraft_id")?,
            readings: MeterReadings {
                hobbs_start: get_opt_decimal(&row, "hobbs_start")?,
                hobbs_end: get_opt_decimal(&row, "hobbs_end")?,
                tacho_start: get_opt_decimal(&row, "tacho_start")?,
                tacho_end: get_opt_decimal(&row, "tacho_end")?,
                airswitch_start: get_opt_decimal(&row, "airswitch_start")?,
                airswitch_end: get_opt_decimal(&row, "airswitch_end")?,
                solo_end_hobbs: get_opt_decimal(&row, "solo_end_hobbs")?,
                solo_end_tacho: get_opt_decimal(&row, "solo_end_tacho")?,
            },
            billing_hours: get_decimal(&row, "billing_hours")?,
            dual_time: get_decimal(&row, "dual_time")?,
            solo_time: get_decimal(&row, "solo_time")?,
            credited_hours: get_decimal(&row, "credited_hours")?,
            total_hours_start: get_opt_decimal(&row, "total_hours_start")?,
            total_hours_end: get_opt_decimal(&row, "total_hours_end")?,
            applied: row.try_get("applied")?,
            created_at: get_time(&row, "created_at")?,
            updated_at: get_time(&row, "updated_at")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM flight_logs WHERE id = ?")
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
        sqlx::query("SELECT * FROM flight_logs WHERE booking_id = ?")
            .bind(booking_id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn list_for_aircraft(
        conn: &mut SqliteConnection,
        aircraft_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM flight_logs WHERE aircraft_id = ? ORDER BY created_at DESC, id DESC")
            .bind(aircraft_id)
            .fetch_all(conn)
            .await?
            .into_iter()
            .map(Self::from_row)
            .collect()
    }

    /// Inserts or replaces the readings and computed times for a booking.
    /// `applied` and the stored progression are left as they are.
    pub async fn upsert_readings(
        conn: &mut SqliteConnection,
        booking_id: i64,
        aircraft_id: i64,
        readings: &MeterReadings,
        times: &FlightTimes,
    ) -> Result<Self, sqlx::Error> {
        let now = ts(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO flight_logs (
                booking_id, aircraft_id, hobbs_start, hobbs_end, tacho_start, tacho_end,
                airswitch_start, airswitch_end, solo_end_hobbs, solo_end_tacho,
                billing_hours, dual_time, solo_time, credited_hours, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(booking_id) DO UPDATE SET
                aircraft_id=excluded.aircraft_id,
                hobbs_start=excluded.hobbs_start,
                hobbs_end=excluded.hobbs_end,
                tacho_start=excluded.tacho_start,
                tacho_end=excluded.tacho_end,
                airswitch_start=excluded.airswitch_start,
                airswitch_end=excluded.airswitch_end,
                solo_end_hobbs=excluded.solo_end_hobbs,
                solo_end_tacho=excluded.solo_end_tacho,
                billing_hours=excluded.billing_hours,
                dual_time=excluded.dual_time,
                solo_time=excluded.solo_time,
                credited_hours=excluded.credited_hours,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(booking_id)
        .bind(aircraft_id)
        .bind(opt_dec(readings.hobbs_start))
        .bind(opt_dec(readings.hobbs_end))
        .bind(opt_dec(readings.tacho_start))
        .bind(opt_dec(readings.tacho_end))
        .bind(opt_dec(readings.airswitch_start))
        .bind(opt_dec(readings.airswitch_end))
        .bind(opt_dec(readings.solo_end_hobbs))
        .bind(opt_dec(readings.solo_end_tacho))
        .bind(dec(times.billing_hours))
        .bind(dec(times.dual_time))
        .bind(dec(times.solo_time))
        .bind(dec(times.credited_hours))
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        Self::find_by_booking(conn, booking_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn mark_applied(
        conn: &mut SqliteConnection,
        id: i64,
        progression: &HoursProgression,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE flight_logs SET applied = 1, total_hours_start = ?, total_hours_end = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(dec(progression.total_hours_start))
        .bind(dec(progression.total_hours_end))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }
}
