use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use strum_macros::{Display, EnumString};

use crate::db::codec::{get_enum, get_opt_time, get_time, opt_ts, ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EquipmentStatus {
    #[default]
    Available,
    Issued,
    Maintenance,
    Retired,
}

#[derive(Debug, Clone, Serialize)]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub serial_number: Option<String>,
    pub status: EquipmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEquipment {
    pub name: String,
    pub kind: String,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

/// `issued` is owned by the issuance workflow and cannot be set directly.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEquipment {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<EquipmentStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentIssuance {
    pub id: i64,
    pub equipment_id: i64,
    pub user_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expected_return_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueEquipment {
    pub user_id: i64,
    pub expected_return_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssuanceFilter {
    pub equipment_id: Option<i64>,
    pub user_id: Option<i64>,
    /// Only items not yet returned.
    #[serde(default)]
    pub outstanding: bool,
    /// Only outstanding items past their expected return.
    #[serde(default)]
    pub overdue: bool,
}

impl Equipment {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            serial_number: row.try_get("serial_number")?,
            status: get_enum(&row, "status")?,
            notes: row.try_get("notes")?,
            created_at: get_time(&row, "created_at")?,
            updated_at: get_time(&row, "updated_at")?,
            deleted_at: get_opt_time(&row, "deleted_at")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM equipment WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM equipment WHERE deleted_at IS NULL ORDER BY kind, name")
            .fetch_all(conn)
            .await?
            .into_iter()
            .map(Self::from_row)
            .collect()
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        data: &CreateEquipment,
    ) -> Result<Self, sqlx::Error> {
        let now = ts(Utc::now());
        let id = sqlx::query(
            r#"INSERT INTO equipment (name, kind, serial_number, notes, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&data.name)
        .bind(&data.kind)
        .bind(&data.serial_number)
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
        data: &UpdateEquipment,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(existing) = Self::find(&mut *conn, id).await? else {
            return Ok(None);
        };
        sqlx::query(
            r#"UPDATE equipment SET name = ?, kind = ?, serial_number = ?, status = ?, notes = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(data.name.as_ref().unwrap_or(&existing.name))
        .bind(data.kind.as_ref().unwrap_or(&existing.kind))
        .bind(data.serial_number.as_ref().or(existing.serial_number.as_ref()))
        .bind(data.status.unwrap_or(existing.status).to_string())
        .bind(data.notes.as_ref().or(existing.notes.as_ref()))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Self::find(conn, id).await
    }

    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: i64,
        status: EquipmentStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE equipment SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(ts(Utc::now()))
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn soft_delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query(
            "UPDATE equipment SET deleted_at = ?, status = 'retired' WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}

impl EquipmentIssuance {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            equipment_id: row.try_get("equipment_id")?,
            user_id: row.try_get("user_id")?,
            issued_at: get_time(&row, "issued_at")?,
            expected_return_at: get_opt_time(&row, "expected_return_at")?,
            returned_at: get_opt_time(&row, "returned_at")?,
            notes: row.try_get("notes")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM equipment_issuance WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn outstanding_for(
        conn: &mut SqliteConnection,
        equipment_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query(
            "SELECT * FROM equipment_issuance WHERE equipment_id = ? AND returned_at IS NULL",
        )
        .bind(equipment_id)
        .fetch_optional(conn)
        .await?
        .map(Self::from_row)
        .transpose()
    }

    pub async fn list(
        conn: &mut SqliteConnection,
        filter: &IssuanceFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let overdue_before = filter.overdue.then(|| ts(now));
        sqlx::query(
            r#"SELECT * FROM equipment_issuance
               WHERE (? IS NULL OR equipment_id = ?)
                 AND (? IS NULL OR user_id = ?)
                 AND (? = 0 OR returned_at IS NULL)
                 AND (? IS NULL OR (returned_at IS NULL AND expected_return_at < ?))
               ORDER BY issued_at DESC, id DESC"#,
        )
        .bind(filter.equipment_id)
        .bind(filter.equipment_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.outstanding)
        .bind(&overdue_before)
        .bind(&overdue_before)
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(Self::from_row)
        .collect()
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        equipment_id: i64,
        data: &IssueEquipment,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            r#"INSERT INTO equipment_issuance (equipment_id, user_id, issued_at, expected_return_at, notes)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(equipment_id)
        .bind(data.user_id)
        .bind(ts(issued_at))
        .bind(opt_ts(data.expected_return_at))
        .bind(&data.notes)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        Self::find(conn, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn mark_returned(
        conn: &mut SqliteConnection,
        id: i64,
        returned_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("UPDATE equipment_issuance SET returned_at = ? WHERE id = ? AND returned_at IS NULL")
            .bind(ts(returned_at))
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Self::find(conn, id).await
    }
}
