//! Location point operations for PostgreSQL database.

use sqlx::{PgPool, Postgres, Transaction};

use super::SqlResult;
use crate::location::Location;
use crate::AppError;

/// Inserts a new location point.
///
/// # Returns
/// * `Ok(Location)` - The stored point with its assigned id
/// * `Err(AppError::AlreadyExists)` - Another point has these coordinates
pub async fn insert(pool: &PgPool, latitude: f64, longitude: f64) -> SqlResult<Location> {
    let result = sqlx::query_as::<_, Location>(
        r#"
        INSERT INTO locations (latitude, longitude)
        VALUES ($1, $2)
        RETURNING id, latitude, longitude
        "#,
    )
    .bind(latitude)
    .bind(longitude)
    .fetch_one(pool)
    .await;

    match result {
        Ok(location) => Ok(location),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::already_exists("location with these coordinates already exists"),
        ),
        Err(e) => {
            eprintln!("Database error inserting location: {}", e);
            Err(AppError::from(e))
        }
    }
}

/// Fetches a location point by id.
pub async fn get(pool: &PgPool, id: i32) -> SqlResult<Option<Location>> {
    sqlx::query_as::<_, Location>("SELECT id, latitude, longitude FROM locations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            eprintln!("Database error fetching location: {}", e);
            AppError::from(e)
        })
}

/// Checks that a location point exists, inside the caller's transaction.
pub async fn exists(tx: &mut Transaction<'_, Postgres>, id: i32) -> SqlResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM locations WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            eprintln!("Database error checking location existence: {}", e);
            AppError::from(e)
        })
}

/// Updates a location point's coordinates. Returns false when the id does not
/// exist.
///
/// # Returns
/// * `Err(AppError::AlreadyExists)` - The new coordinates belong to another point
pub async fn update(pool: &PgPool, location: &Location) -> SqlResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE locations
        SET latitude = $2, longitude = $3, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(location.id)
    .bind(location.latitude)
    .bind(location.longitude)
    .execute(pool)
    .await;

    match result {
        Ok(result) => Ok(result.rows_affected() > 0),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::already_exists("location with these coordinates already exists"),
        ),
        Err(e) => {
            eprintln!("Database error updating location: {}", e);
            Err(AppError::from(e))
        }
    }
}

/// Deletes a location point. Returns false when the id does not exist.
pub async fn delete(pool: &PgPool, id: i32) -> SqlResult<bool> {
    let result = sqlx::query("DELETE FROM locations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            eprintln!("Database error deleting location: {}", e);
            AppError::from(e)
        })?;
    Ok(result.rows_affected() > 0)
}

/// True when any animal was chipped at this point or has visited it.
pub async fn is_referenced(pool: &PgPool, id: i32) -> SqlResult<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (SELECT 1 FROM animals WHERE chipping_location_id = $1)
            OR EXISTS (SELECT 1 FROM visited_locations WHERE location_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        eprintln!("Database error checking location references: {}", e);
        AppError::from(e)
    })
}
