use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use strum_macros::{Display, EnumString};

use crate::db::codec::{get_enum, get_time, ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LessonOutcome {
    Pass,
    NotYetCompetent,
    Incomplete,
}

/// Debrief outcome recorded against a booking.
#[derive(Debug, Clone, Serialize)]
pub struct LessonProgress {
    pub id: i64,
    pub booking_id: i64,
    pub user_id: i64,
    pub instructor_id: Option<i64>,
    pub lesson: String,
    pub status: LessonOutcome,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLessonProgress {
    pub booking_id: i64,
    pub lesson: String,
    pub status: LessonOutcome,
    pub comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLessonProgress {
    pub lesson: Option<String>,
    pub status: Option<LessonOutcome>,
    pub comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LessonFilter {
    pub user_id: Option<i64>,
    pub booking_id: Option<i64>,
}

impl LessonProgress {
    fn from_row(row: SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            booking_id: row.try_get("booking_id")?,
            user_id: row.try_get("user_id")?,
            instructor_id: row.try_get("instructor_id")?,
            lesson: row.try_get("lesson")?,
            status: get_enum(&row, "status")?,
            comments: row.try_get("comments")?,
            created_at: get_time(&row, "created_at")?,
            updated_at: get_time(&row, "updated_at")?,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM lesson_progress WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Self::from_row)
            .transpose()
    }

    pub async fn list(
        conn: &mut SqliteConnection,
        filter: &LessonFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query(
            r#"SELECT * FROM lesson_progress
               WHERE (? IS NULL OR user_id = ?) AND (? IS NULL OR booking_id = ?)
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.booking_id)
        .bind(filter.booking_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(Self::from_row)
        .collect()
    }

    /// Student and instructor are taken from the booking.
    pub async fn create(
        conn: &mut SqliteConnection,
        user_id: i64,
        instructor_id: Option<i64>,
        data: &CreateLessonProgress,
    ) -> Result<Self, sqlx::Error> {
        let now = ts(Utc::now());
        let id = sqlx::query(
            r#"INSERT INTO lesson_progress (booking_id, user_id, instructor_id, lesson, status, comments, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(data.booking_id)
        .bind(user_id)
        .bind(instructor_id)
        .bind(&data.lesson)
        .bind(data.status.to_string())
        .bind(&data.comments)
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
        data: &UpdateLessonProgress,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(existing) = Self::find(&mut *conn, id).await? else {
            return Ok(None);
        };
        sqlx::query(
            "UPDATE lesson_progress SET lesson = ?, status = ?, comments = ?, updated_at = ? WHERE id = ?",
        )
        .bind(data.lesson.as_ref().unwrap_or(&existing.lesson))
        .bind(data.status.unwrap_or(existing.status).to_string())
        .bind(data.comments.as_ref().or(existing.comments.as_ref()))
        .bind(ts(Utc::now()))
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Self::find(conn, id).await
    }
}
