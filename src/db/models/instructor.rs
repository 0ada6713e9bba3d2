use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use strum_macros::{Display, EnumString};

use crate::db::codec::{dec, get_decimal, get_enum, get_opt_time, get_time, ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InstructorStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    #[default]
    Contractor,
    Volunteer,
}

/// Instructor profile joined with the owning user's name.
#[derive(Debug, Clone, Serialize)]
pub struct Instructor {
    pub id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub rating: Option<String>,
    pub hourly_rate: Decimal,
    pub employment_type: EmploymentType,
    pub status: InstructorStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInstructor {
    pub user_id: i64,
    pub rating: Option<String>,
    pub hourly_rate: Decimal,
    #[serde(default)]
    pub employment_type: EmploymentType,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInstructor {
    pub rating: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub employment_type: Option<EmploymentType>,
    pub status: Option<InstructorStatus>,
    pub notes: Option<String>,
}

const SELECT: &str = r#"SELECT i.*, u.first_name, u.last_name, u.email
    FROM instructors i JOIN users u ON u.id = i.user_id"#;

impl Instructor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            rating: row.try_get("rating")?,
            hourly_rate: get_decimal(&row, "hourly_rate")?,
            employment_type: get_enum(&row, "employment_type")?,
            status: get_enum(&row, "status")?,
            notes: row.try_get("notes")?,
            created_at: get_time(&row, "created_at")?,
            updated_at: get_time(&row, "updated_at")?,
            deleted_at: get_opt_time(&row, "deleted_at")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query(&format!("{SELECT} WHERE i.id = ? AND i.deleted_at IS NULL"))
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query(&format!(
            "{SELECT} WHERE i.deleted_at IS NULL ORDER BY u.last_name, u.first_name"
        ))
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(Self::from_row)
        .collect()
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        data: &CreateInstructor,
    ) -> Result<Self, sqlx::Error> {
        let now = ts(Utc::now());
        let id = sqlx::query(
            r#"INSERT INTO instructors (user_id, rating, hourly_rate, employment_type, notes, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(data.user_id)
        .bind(&data.rating)
        .bind(dec(data.hourly_rate))
        .bind(data.employment_type.to_string())
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
        data: &UpdateInstructor,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(existing) = Self::find(&mut *conn, id).await? else {
            return Ok(None);
        };
        sqlx::query(
            r#"UPDATE instructors SET rating = ?, hourly_rate = ?, employment_type = ?, status = ?, notes = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(data.rating.as_ref().or(existing.rating.as_ref()))
        .bind(dec(data.hourly_rate.unwrap_or(existing.hourly_rate)))
        .bind(data.employment_type.unwrap_or(existing.employment_type).to_string())
        .bind(data.status.unwrap_or(existing.status).to_string())
        .bind(data.notes.as_ref().or(existing.notes.as_ref()))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Self::find(conn, id).await
    }

    pub async fn soft_delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query(
            "UPDATE instructors SET deleted_at = ?, status = 'inactive' WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
