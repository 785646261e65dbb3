//! PostgreSQL database operations for chiptrack.
//!
//! This module provides functions for interacting with the PostgreSQL
//! database, organized by entity. Animal mutations run against a
//! transaction so the caller controls locking and atomicity; catalog
//! lookups and single-statement catalog writes take the pool directly.

pub mod account;
pub mod animal;
pub mod animal_type;
pub mod location;
pub mod visit;

/// Result type for database operations.
pub type SqlResult<T> = Result<T, crate::AppError>;

#[cfg(test)]
/// Test utilities for PostgreSQL database operations.
pub mod tests {
    use sqlx::PgPool;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Creates a unique test database for each test invocation, or `None`
    /// when `TEST_DATABASE_URL` is unset so database-backed tests skip on
    /// machines without PostgreSQL.
    ///
    /// The database is created by:
    /// 1. Connecting to the base database URL
    /// 2. Creating a new database with a unique name
    /// 3. Running migrations on the new database
    /// 4. Returning a connection pool to the new database
    pub async fn setup_test_db() -> Option<PgPool> {
        let Ok(base_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping database test");
            return None;
        };

        let pid = std::process::id();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let db_name = format!("chiptrack_test_{}_{}_{}", pid, timestamp, counter);

        let mut parsed_url = url::Url::parse(&base_url).expect("Invalid database URL");

        let admin_pool = PgPool::connect(&base_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::query(&format!("CREATE DATABASE {}", db_name))
            .execute(&admin_pool)
            .await
            .expect("Failed to create test database");

        admin_pool.close().await;

        parsed_url.set_path(&format!("/{}", db_name));
        let test_db_url = parsed_url.as_str();

        let pool = PgPool::connect(test_db_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(pool)
    }
}
