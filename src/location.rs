//! Geographic location points and their HTTP surface.
//!
//! Points are shared reference data: animals are chipped at one and visits
//! reference them, so a point cannot be deleted while any animal still
//! references it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{CurrentAccount, OptionalAuth};
use crate::{ensure_positive_id, AppError};

////////////////////////////////////////////// Location /////////////////////////////////////////////

/// A geographic point animals are chipped at or visit. Coordinate pairs are
/// unique.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: i32,
    pub latitude: f64,
    pub longitude: f64,
}

//////////////////////////////////////////////// Wire ///////////////////////////////////////////////

/// Request body for creating or moving a point. Both coordinates are
/// required.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct LocationRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationRequest {
    pub fn validate(&self) -> Result<(f64, f64), AppError> {
        let latitude = match self.latitude {
            Some(v) if (-90.0..=90.0).contains(&v) => v,
            Some(_) => {
                return Err(AppError::invalid_input(
                    "latitude must be between -90 and 90",
                ));
            }
            None => return Err(AppError::invalid_input("latitude is required")),
        };
        let longitude = match self.longitude {
            Some(v) if (-180.0..=180.0).contains(&v) => v,
            Some(_) => {
                return Err(AppError::invalid_input(
                    "longitude must be between -180 and 180",
                ));
            }
            None => return Err(AppError::invalid_input("longitude is required")),
        };
        Ok((latitude, longitude))
    }
}

/////////////////////////////////////////////// Routes //////////////////////////////////////////////

async fn get_location(
    State(pool): State<PgPool>,
    OptionalAuth(_): OptionalAuth,
    Path(point_id): Path<i32>,
) -> Result<Json<Location>, AppError> {
    ensure_positive_id(point_id, "pointId")?;
    match crate::sql::location::get(&pool, point_id).await? {
        Some(location) => Ok(Json(location)),
        None => Err(AppError::not_found("location point not found by id")),
    }
}

async fn create_location(
    State(pool): State<PgPool>,
    CurrentAccount(_): CurrentAccount,
    Json(body): Json<LocationRequest>,
) -> Result<(StatusCode, Json<Location>), AppError> {
    let (latitude, longitude) = body.validate()?;
    let location = crate::sql::location::insert(&pool, latitude, longitude).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn update_location(
    State(pool): State<PgPool>,
    CurrentAccount(_): CurrentAccount,
    Path(point_id): Path<i32>,
    Json(body): Json<LocationRequest>,
) -> Result<Json<Location>, AppError> {
    ensure_positive_id(point_id, "pointId")?;
    let (latitude, longitude) = body.validate()?;
    let location = Location {
        id: point_id,
        latitude,
        longitude,
    };
    if !crate::sql::location::update(&pool, &location).await? {
        return Err(AppError::not_found("location point not found by id"));
    }
    Ok(Json(location))
}

/// Deletes a point that no animal references.
async fn delete_location(
    State(pool): State<PgPool>,
    CurrentAccount(_): CurrentAccount,
    Path(point_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    ensure_positive_id(point_id, "pointId")?;
    if crate::sql::location::get(&pool, point_id).await?.is_none() {
        return Err(AppError::not_found("location point not found by id"));
    }
    if crate::sql::location::is_referenced(&pool, point_id).await? {
        return Err(AppError::invalid_input(
            "location point is referenced by an animal",
        ));
    }
    if !crate::sql::location::delete(&pool, point_id).await? {
        return Err(AppError::not_found("location point not found by id"));
    }
    Ok(StatusCode::OK)
}

/// Creates a router with location point endpoints.
///
/// # Arguments
/// * `pool` - PostgreSQL connection pool
pub fn create_location_router(pool: PgPool) -> Router {
    Router::new()
        .route("/locations", post(create_location))
        .route(
            "/locations/:point_id",
            get(get_location).put(update_location).delete(delete_location),
        )
        .with_state(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_the_poles_and_antimeridian() {
        for (lat, lon) in [(90.0, 180.0), (-90.0, -180.0), (0.0, 0.0)] {
            let body = LocationRequest {
                latitude: Some(lat),
                longitude: Some(lon),
            };
            assert_eq!(body.validate().unwrap(), (lat, lon));
        }
    }

    #[test]
    fn validate_rejects_out_of_range_coordinates() {
        let body = LocationRequest {
            latitude: Some(90.5),
            longitude: Some(0.0),
        };
        assert!(body.validate().is_err());
        let body = LocationRequest {
            latitude: Some(0.0),
            longitude: Some(-180.5),
        };
        assert!(body.validate().is_err());
        let body = LocationRequest {
            latitude: Some(f64::NAN),
            longitude: Some(0.0),
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_coordinates() {
        assert!(LocationRequest::default().validate().is_err());
        let body = LocationRequest {
            latitude: Some(10.0),
            longitude: None,
        };
        let err = body.validate().unwrap_err();
        assert_eq!(err, AppError::invalid_input("longitude is required"));
    }

    #[test]
    fn wire_shape() {
        let location = Location {
            id: 3,
            latitude: 55.75,
            longitude: 37.61,
        };
        let serialized = serde_json::to_value(location).unwrap();
        assert_eq!(
            serialized,
            serde_json::json!({"id": 3, "latitude": 55.75, "longitude": 37.61})
        );
    }
}
