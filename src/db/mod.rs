//! Persistent storage.
//!
//! Layout:
//! - `schema.rs`: SQLite DDL, including the booking overlap triggers
//! - `models/`: one module per table; row structs, payloads and queries
//! - `codec.rs`: decoding of TEXT-stored decimals, timestamps and enums
//!
//! Queries take `&mut SqliteConnection` so the same call works on a pooled
//! connection or inside a transaction.

pub mod codec;
pub mod models;
pub mod schema;

pub use schema::SCHEMA;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::DeskError;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, DeskError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(connect_opts)
            .await?;
        let db = Self { pool };
        db.init_schema().await?;
        info!(database_url, "database ready");
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL in order.
    pub async fn init_schema(&self) -> Result<(), DeskError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), DeskError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
