//! SQLite persistence layer for the workshop intake platform.
//!
//! This crate provides async database operations for conversations,
//! maintenance requests, work orders, workshop appointments, users and
//! vehicles using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:workshop.db?mode=rwc").await?;
//!     db.migrate().await?;
//!     Ok(())
//! }
//! ```

pub mod appointment;
pub mod conversation;
pub mod error;
pub mod message_history;
pub mod models;
pub mod request;
pub mod user;
pub mod vehicle;
pub mod work_order;

pub use error::{DatabaseError, Result};
pub use models::{
    Appointment, AppointmentOrigin, AppointmentStatus, Conversation, ConversationStatus,
    IntakeState, MaintenanceRequest, MessageDirection, MessageEntry, RequestStatus, Role, User,
    Vehicle, WorkOrder, WorkOrderStatus,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    ///
    /// Use a pool size of 1 with `sqlite::memory:` — each pooled connection
    /// would otherwise get its own empty in-memory database.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to database: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is
    /// up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_and_migrate_in_memory() {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();

        // Schema is queryable after migration.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
