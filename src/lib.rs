//! # Chiptrack: An Animal Tracking Service
//!
//! Chiptrack is the backend for a wildlife chipping program. Field accounts
//! register animals at the moment a chip is implanted, then record every
//! subsequent sighting as the animal moves between known location points.
//! The result is a queryable movement history per animal, with the integrity
//! rules a paper logbook cannot enforce.
//!
//! This crate provides:
//!
//! - **Account Management**: Registration and Basic-auth protected account
//!   maintenance, with substring search over names and emails
//! - **Location Points**: A catalog of coordinates animals are observed at,
//!   validated to real latitude/longitude ranges
//! - **Animal Types**: A catalog of classifications (species, habitat, and
//!   so on) that every animal carries at least one of
//! - **Animal Records**: Physical attributes, a terminal ALIVE → DEAD
//!   lifecycle, and references to the chipping account and location
//! - **Visit Sequences**: An append-only-in-spirit movement log with
//!   adjacency rules that keep consecutive entries distinct
//! - **HTTP API**: RESTful endpoints over PostgreSQL, plus a CLI client
//!
//! ## Core Concepts
//!
//! ### Animals
//! An animal is created by "chipping": it starts ALIVE at its chipping
//! location with a non-empty set of animal types. DEAD is terminal; the
//! death timestamp is stamped on the first transition and never rewritten.
//!
//! ### Visits
//! A visit records that an animal moved to a location point. The sequence
//! is ordered by visit time, and the chipping location acts as an implicit
//! predecessor of the first entry: an animal cannot "move" to the point it
//! is already standing on, and edits that would put the same point twice in
//! a row are rejected.
//!
//! ### Authorization
//! Requests authenticate with HTTP Basic credentials. Reads accept valid
//! credentials or none at all; writes require them; registration is only
//! open to anonymous callers.
//!
//! ## Architecture
//!
//! The system follows a layered architecture:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ HTTP API Layer (Axum routes)            │
//! ├─────────────────────────────────────────┤
//! │ Domain Rules (Animal aggregate)         │
//! ├─────────────────────────────────────────┤
//! │ SQL Layer (sqlx over PostgreSQL)        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage Examples
//!
//! ### Chipping an Animal and Recording Movement
//!
//! ```rust
//! use chiptrack::{Animal, Gender, LifeStatus, NewAnimal};
//! use chrono::Utc;
//!
//! let mut animal = Animal::chip(
//!     NewAnimal {
//!         types: vec![1, 2],
//!         length: 120.0,
//!         weight: 35.5,
//!         height: 60.0,
//!         gender: Gender::Female,
//!         chipper_id: 1,
//!         chipping_location_id: 5,
//!     },
//!     Utc::now(),
//! );
//! assert_eq!(animal.life_status(), LifeStatus::Alive);
//!
//! // A first "visit" to the chipping point itself is not movement.
//! assert!(animal.append_visit(5, Utc::now()).is_err());
//!
//! animal.append_visit(9, Utc::now()).unwrap();
//! assert_eq!(animal.visits().len(), 1);
//! ```
//!
//! ### Validating Wire Input
//!
//! ```rust
//! use chiptrack::AccountRequest;
//!
//! let request = AccountRequest {
//!     first_name: Some("Ada".to_string()),
//!     last_name: Some("Lovelace".to_string()),
//!     email: Some("ada@example.org".to_string()),
//!     password: Some("s3cret".to_string()),
//! };
//! let new_account = request.validate().unwrap();
//! assert_eq!(new_account.email, "ada@example.org");
//! ```

mod account;
mod animal;
mod animal_type;
mod auth;
mod config;
mod errors;
mod location;
mod router;
mod search;
mod sql;
mod visit;

// CLI utility modules

/// Command-line interface utilities for program termination and output formatting.
///
/// This module provides common CLI utilities for chiptrack binaries, including
/// error handling, formatted output, and program termination functions.
pub mod cli_utils;

/// Command-line interface command handlers.
///
/// This module contains organized command handlers for the chipctl CLI application,
/// with each command type implemented in a dedicated submodule.
pub mod commands;

/// HTTP client utilities for interacting with the animal tracking service.
///
/// This module provides a standardized HTTP client for communicating with
/// the chiptrackd HTTP API, handling requests, responses, authentication,
/// and error conditions.
pub mod http_utils;

pub use account::{
    Account, AccountFilter, AccountRequest, AccountResponse, AccountSearchQuery, NewAccount,
    create_account_router,
};
pub use animal::{
    Animal, AnimalFilter, AnimalResponse, AnimalSearchQuery, AnimalUpdate, CreateAnimalRequest,
    Gender, LifeStatus, NewAnimal, ReplaceTypeRequest, UpdateAnimalRequest, create_animal_router,
};
pub use animal_type::{
    AnimalType, AnimalTypeRequest, AnimalTypeResponse, create_animal_type_router,
};
pub use auth::{AnonymousOnly, Credentials, CurrentAccount, OptionalAuth, basic_auth_header};
pub use config::ServerConfig;
pub use errors::AppError;
pub use location::{Location, LocationRequest, create_location_router};
pub use router::create_router;
pub use search::{Page, TimeRange};
pub use visit::{
    UpdateVisitRequest, VisitFilter, VisitSearchQuery, VisitedLocation, VisitedLocationResponse,
    create_visit_router,
};

/// Rejects the non-positive identifiers the wire format can carry.
///
/// # Arguments
/// * `id` - The identifier from the request path or body
/// * `field` - The wire name of the field for the error message
pub fn ensure_positive_id(id: i32, field: &str) -> Result<(), AppError> {
    if id <= 0 {
        return Err(AppError::invalid_input(format!(
            "{} must be a positive id",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_ids_pass() {
        assert!(ensure_positive_id(1, "animalId").is_ok());
        assert!(ensure_positive_id(i32::MAX, "animalId").is_ok());
    }

    #[test]
    fn zero_and_negative_ids_fail() {
        assert_eq!(
            ensure_positive_id(0, "accountId").unwrap_err(),
            AppError::invalid_input("accountId must be a positive id")
        );
        assert!(ensure_positive_id(-3, "pointId").is_err());
    }
}
