//! Animal type operations for PostgreSQL database.

use sqlx::{PgPool, Postgres, Transaction};

use super::SqlResult;
use crate::animal_type::AnimalType;
use crate::AppError;

/// Inserts a new animal type.
///
/// # Returns
/// * `Ok(AnimalType)` - The stored type with its assigned id
/// * `Err(AppError::AlreadyExists)` - The name is taken
pub async fn insert(pool: &PgPool, name: &str) -> SqlResult<AnimalType> {
    let result = sqlx::query_as::<_, AnimalType>(
        "INSERT INTO animal_types (name) VALUES ($1) RETURNING id, name",
    )
    .bind(name)
    .fetch_one(pool)
    .await;

    match result {
        Ok(animal_type) => Ok(animal_type),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::already_exists("animal type with this name already exists"),
        ),
        Err(e) => {
            eprintln!("Database error inserting animal type: {}", e);
            Err(AppError::from(e))
        }
    }
}

/// Fetches an animal type by id.
pub async fn get(pool: &PgPool, id: i32) -> SqlResult<Option<AnimalType>> {
    sqlx::query_as::<_, AnimalType>("SELECT id, name FROM animal_types WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            eprintln!("Database error fetching animal type: {}", e);
            AppError::from(e)
        })
}

/// Checks that an animal type exists, inside the caller's transaction.
pub async fn exists(tx: &mut Transaction<'_, Postgres>, id: i32) -> SqlResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM animal_types WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            eprintln!("Database error checking animal type existence: {}", e);
            AppError::from(e)
        })
}

/// Renames an animal type. Returns false when the id does not exist.
///
/// # Returns
/// * `Err(AppError::AlreadyExists)` - The new name belongs to another type
pub async fn update(pool: &PgPool, animal_type: &AnimalType) -> SqlResult<bool> {
    let result = sqlx::query(
        "UPDATE animal_types SET name = $2, updated_at = now() WHERE id = $1",
    )
    .bind(animal_type.id)
    .bind(&animal_type.name)
    .execute(pool)
    .await;

    match result {
        Ok(result) => Ok(result.rows_affected() > 0),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::already_exists("animal type with this name already exists"),
        ),
        Err(e) => {
            eprintln!("Database error updating animal type: {}", e);
            Err(AppError::from(e))
        }
    }
}

/// Deletes an animal type. Returns false when the id does not exist.
pub async fn delete(pool: &PgPool, id: i32) -> SqlResult<bool> {
    let result = sqlx::query("DELETE FROM animal_types WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            eprintln!("Database error deleting animal type: {}", e);
            AppError::from(e)
        })?;
    Ok(result.rows_affected() > 0)
}

/// True when any animal carries this type.
pub async fn is_attached(pool: &PgPool, id: i32) -> SqlResult<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM animal_type_links WHERE type_id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        eprintln!("Database error checking animal type attachments: {}", e);
        AppError::from(e)
    })
}
