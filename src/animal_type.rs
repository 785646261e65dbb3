//! The animal type catalog and its HTTP surface.
//!
//! Types classify animals (predator, herbivore, species tags). On the wire
//! the name travels under the key `type`; internally it is just `name`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{CurrentAccount, OptionalAuth};
use crate::{ensure_positive_id, AppError};

///////////////////////////////////////////// AnimalType ////////////////////////////////////////////

/// A named classification animals carry. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AnimalType {
    pub id: i32,
    pub name: String,
}

//////////////////////////////////////////////// Wire ///////////////////////////////////////////////

/// Request body for creating or renaming a type.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnimalTypeRequest {
    #[serde(rename = "type")]
    pub name: Option<String>,
}

impl AnimalTypeRequest {
    pub fn validate(&self) -> Result<&str, AppError> {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(AppError::invalid_input("type must not be blank")),
        }
    }
}

/// Animal type as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalTypeResponse {
    pub id: i32,
    #[serde(rename = "type")]
    pub name: String,
}

impl From<&AnimalType> for AnimalTypeResponse {
    fn from(animal_type: &AnimalType) -> Self {
        AnimalTypeResponse {
            id: animal_type.id,
            name: animal_type.name.clone(),
        }
    }
}

/////////////////////////////////////////////// Routes //////////////////////////////////////////////

async fn get_type(
    State(pool): State<PgPool>,
    OptionalAuth(_): OptionalAuth,
    Path(type_id): Path<i32>,
) -> Result<Json<AnimalTypeResponse>, AppError> {
    ensure_positive_id(type_id, "typeId")?;
    match crate::sql::animal_type::get(&pool, type_id).await? {
        Some(animal_type) => Ok(Json(AnimalTypeResponse::from(&animal_type))),
        None => Err(AppError::not_found("animal type not found by id")),
    }
}

async fn create_type(
    State(pool): State<PgPool>,
    CurrentAccount(_): CurrentAccount,
    Json(body): Json<AnimalTypeRequest>,
) -> Result<(StatusCode, Json<AnimalTypeResponse>), AppError> {
    let name = body.validate()?;
    let animal_type = crate::sql::animal_type::insert(&pool, name).await?;
    Ok((
        StatusCode::CREATED,
        Json(AnimalTypeResponse::from(&animal_type)),
    ))
}

async fn update_type(
    State(pool): State<PgPool>,
    CurrentAccount(_): CurrentAccount,
    Path(type_id): Path<i32>,
    Json(body): Json<AnimalTypeRequest>,
) -> Result<Json<AnimalTypeResponse>, AppError> {
    ensure_positive_id(type_id, "typeId")?;
    let name = body.validate()?;
    let animal_type = AnimalType {
        id: type_id,
        name: name.to_string(),
    };
    if !crate::sql::animal_type::update(&pool, &animal_type).await? {
        return Err(AppError::not_found("animal type not found by id"));
    }
    Ok(Json(AnimalTypeResponse::from(&animal_type)))
}

/// Deletes a type that no animal carries.
async fn delete_type(
    State(pool): State<PgPool>,
    CurrentAccount(_): CurrentAccount,
    Path(type_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    ensure_positive_id(type_id, "typeId")?;
    if crate::sql::animal_type::get(&pool, type_id).await?.is_none() {
        return Err(AppError::not_found("animal type not found by id"));
    }
    if crate::sql::animal_type::is_attached(&pool, type_id).await? {
        return Err(AppError::invalid_input(
            "animal type is attached to an animal",
        ));
    }
    if !crate::sql::animal_type::delete(&pool, type_id).await? {
        return Err(AppError::not_found("animal type not found by id"));
    }
    Ok(StatusCode::OK)
}

/// Creates a router with animal type endpoints.
///
/// # Arguments
/// * `pool` - PostgreSQL connection pool
pub fn create_animal_type_router(pool: PgPool) -> Router {
    Router::new()
        .route("/animals/types", post(create_type))
        .route(
            "/animals/types/:type_id",
            get(get_type).put(update_type).delete(delete_type),
        )
        .with_state(pool)
}
