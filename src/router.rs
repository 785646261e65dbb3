use axum::Router;
use sqlx::PgPool;

use crate::account::create_account_router;
use crate::animal::create_animal_router;
use crate::animal_type::create_animal_type_router;
use crate::location::create_location_router;
use crate::visit::create_visit_router;

/// Assembles the full API router over a shared connection pool.
pub fn create_router(pool: PgPool) -> Router {
    Router::new()
        .merge(create_account_router(pool.clone()))
        .merge(create_location_router(pool.clone()))
        .merge(create_animal_type_router(pool.clone()))
        .merge(create_animal_router(pool.clone()))
        .merge(create_visit_router(pool))
}
