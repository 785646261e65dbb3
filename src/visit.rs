//! Visited-location records and the movement rules of the visit sequence.
//!
//! The sequence is a list with positions `0..n-1`; the chipping location
//! acts as an implicit predecessor at position -1. It is a computed view
//! used only for adjacency checks against position 0, never a stored entry.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{CurrentAccount, OptionalAuth};
use crate::search::{Page, TimeRange};
use crate::{ensure_positive_id, Animal, AppError, LifeStatus};

////////////////////////////////////////// VisitedLocation /////////////////////////////////////////

/// A timestamped observation of an animal at a location point.
///
/// Owned exclusively by its animal; addressable from outside only by its
/// own ID for update/delete targeting.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct VisitedLocation {
    pub id: i32,
    pub location_id: i32,
    pub visited_at: DateTime<Utc>,
}

impl VisitedLocation {
    /// A not-yet-persisted visit at `location_id`, stamped with the request
    /// time. Storage assigns the real ID on insert.
    pub fn new(location_id: i32, now: DateTime<Utc>) -> VisitedLocation {
        VisitedLocation {
            id: 0,
            location_id,
            visited_at: now,
        }
    }
}

//////////////////////////////////////////// Sequence ops ///////////////////////////////////////////

impl Animal {
    /// Checks that a new visit at `location_id` is admissible: the animal
    /// must be alive and must actually move.
    pub fn validate_append(&self, location_id: i32) -> Result<(), AppError> {
        if self.life_status() == LifeStatus::Dead {
            return Err(AppError::invalid_input(
                "dead animal cannot visit a new location",
            ));
        }
        match self.visits().last() {
            None if location_id == self.chipping_location_id => Err(AppError::invalid_input(
                "animal is stationary at its chipping location",
            )),
            Some(last) if last.location_id == location_id => Err(AppError::invalid_input(
                "animal is already at this location",
            )),
            _ => Ok(()),
        }
    }

    /// Appends a visit at the tail of the sequence, stamped `now`.
    pub fn append_visit(
        &mut self,
        location_id: i32,
        now: DateTime<Utc>,
    ) -> Result<&VisitedLocation, AppError> {
        self.validate_append(location_id)?;
        let pos = self.visits.len();
        self.visits.push(VisitedLocation::new(location_id, now));
        Ok(&self.visits[pos])
    }

    /// Re-points the visit `visited_location_id` at `new_location_id`,
    /// keeping its timestamp and position.
    ///
    /// Rejects no-op updates and any move that would place two identical
    /// location points next to each other, counting the chipping location
    /// as the predecessor of position 0. Predecessor and successor checks
    /// are bounds-guarded for every position.
    pub fn move_visit(
        &mut self,
        visited_location_id: i32,
        new_location_id: i32,
    ) -> Result<&VisitedLocation, AppError> {
        let pos = self
            .visit_position(visited_location_id)
            .ok_or_else(|| AppError::not_found("animal has no visited location with this id"))?;
        if self.visits[pos].location_id == new_location_id {
            return Err(AppError::invalid_input(
                "visited location already references this point",
            ));
        }
        if pos == 0 && new_location_id == self.chipping_location_id {
            return Err(AppError::invalid_input(
                "first visited location cannot equal the chipping location",
            ));
        }
        if pos > 0 && self.visits[pos - 1].location_id == new_location_id {
            return Err(AppError::invalid_input(
                "new location point equals the preceding visit",
            ));
        }
        if pos + 1 < self.visits.len() && self.visits[pos + 1].location_id == new_location_id {
            return Err(AppError::invalid_input(
                "new location point equals the following visit",
            ));
        }
        self.visits[pos].location_id = new_location_id;
        Ok(&self.visits[pos])
    }

    /// Removes the visit `visited_location_id` and returns the IDs of every
    /// entry removed, in removal order.
    ///
    /// Removing position 0 also removes position 1 when that successor
    /// references the chipping location: once the real origin precedes it
    /// again, the entry restates where the animal already was.
    pub fn remove_visit(&mut self, visited_location_id: i32) -> Result<Vec<i32>, AppError> {
        let pos = self
            .visit_position(visited_location_id)
            .ok_or_else(|| AppError::not_found("animal has no visited location with this id"))?;
        let mut removed = vec![self.visits[pos].id];
        if pos == 0
            && self.visits.len() >= 2
            && self.visits[1].location_id == self.chipping_location_id
        {
            removed.push(self.visits[1].id);
        }
        // The cascade target is always the immediate successor.
        self.visits.drain(pos..pos + removed.len());
        Ok(removed)
    }

    fn visit_position(&self, visited_location_id: i32) -> Option<usize> {
        self.visits
            .iter()
            .position(|visit| visit.id == visited_location_id)
    }
}

////////////////////////////////////////////// Filters //////////////////////////////////////////////

/// Raw visit-search query parameters as they arrive on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSearchQuery {
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
    pub from: Option<i64>,
    pub size: Option<i64>,
}

/// Normalized visit-search filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisitFilter {
    pub range: TimeRange,
}

impl VisitSearchQuery {
    pub fn normalize(&self) -> Result<(VisitFilter, Page), AppError> {
        let range = TimeRange::parse(self.start_date_time.as_deref(), self.end_date_time.as_deref())?;
        let page = Page::new(self.from, self.size)?;
        Ok((VisitFilter { range }, page))
    }
}

/////////////////////////////////////////////// Wire ////////////////////////////////////////////////

/// Body of a visit update: which visit to re-point, and where.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVisitRequest {
    pub visited_location_point_id: Option<i32>,
    pub location_point_id: Option<i32>,
}

impl UpdateVisitRequest {
    fn validate(&self) -> Result<(i32, i32), AppError> {
        let visit_id = self
            .visited_location_point_id
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                AppError::invalid_input("visitedLocationPointId must be a positive id")
            })?;
        let location_id = self
            .location_point_id
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::invalid_input("locationPointId must be a positive id"))?;
        Ok((visit_id, location_id))
    }
}

/// Wire shape of a visited location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitedLocationResponse {
    pub id: i32,
    pub date_time_of_visit_location_point: DateTime<Utc>,
    pub location_point_id: i32,
}

impl From<&VisitedLocation> for VisitedLocationResponse {
    fn from(visit: &VisitedLocation) -> Self {
        VisitedLocationResponse {
            id: visit.id,
            date_time_of_visit_location_point: visit.visited_at,
            location_point_id: visit.location_id,
        }
    }
}

////////////////////////////////////////////// Handlers /////////////////////////////////////////////

/// Lists an animal's visits, filtered and paginated.
async fn search_visits(
    State(pool): State<PgPool>,
    OptionalAuth(_auth): OptionalAuth,
    Path(animal_id): Path<i32>,
    Query(query): Query<VisitSearchQuery>,
) -> Result<Json<Vec<VisitedLocationResponse>>, AppError> {
    ensure_positive_id(animal_id, "animalId")?;
    let (filter, page) = query.normalize()?;
    if !crate::sql::animal::exists(&pool, animal_id).await? {
        return Err(AppError::not_found("animal not found by id"));
    }
    let visits = crate::sql::visit::search(&pool, animal_id, &filter, page).await?;
    Ok(Json(visits.iter().map(VisitedLocationResponse::from).collect()))
}

/// Records that an animal moved to a new location point.
async fn add_visit(
    State(pool): State<PgPool>,
    CurrentAccount(_account): CurrentAccount,
    Path((animal_id, point_id)): Path<(i32, i32)>,
) -> Result<(StatusCode, Json<VisitedLocationResponse>), AppError> {
    ensure_positive_id(animal_id, "animalId")?;
    ensure_positive_id(point_id, "pointId")?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let animal = crate::sql::animal::get_for_update(&mut tx, animal_id)
        .await?
        .ok_or_else(|| AppError::not_found("animal not found by id"))?;
    if !crate::sql::location::exists(&mut tx, point_id).await? {
        return Err(AppError::not_found("location point not found by id"));
    }
    animal.validate_append(point_id)?;

    let visit = VisitedLocation::new(point_id, Utc::now());
    let visit = crate::sql::visit::insert(&mut tx, animal_id, &visit).await?;
    tx.commit().await.map_err(AppError::from)?;
    Ok((
        StatusCode::CREATED,
        Json(VisitedLocationResponse::from(&visit)),
    ))
}

/// Re-points one of an animal's visits at a different location.
async fn update_visit(
    State(pool): State<PgPool>,
    CurrentAccount(_account): CurrentAccount,
    Path(animal_id): Path<i32>,
    Json(request): Json<UpdateVisitRequest>,
) -> Result<Json<VisitedLocationResponse>, AppError> {
    ensure_positive_id(animal_id, "animalId")?;
    let (visit_id, location_id) = request.validate()?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let mut animal = crate::sql::animal::get_for_update(&mut tx, animal_id)
        .await?
        .ok_or_else(|| AppError::not_found("animal not found by id"))?;
    if !crate::sql::location::exists(&mut tx, location_id).await? {
        return Err(AppError::not_found("location point not found by id"));
    }
    let visit = animal.move_visit(visit_id, location_id)?;
    let response = VisitedLocationResponse::from(visit);
    crate::sql::visit::update_location(&mut tx, visit_id, location_id).await?;
    tx.commit().await.map_err(AppError::from)?;
    Ok(Json(response))
}

/// Removes a visit, cascading onto a now-redundant chipping-point restatement.
async fn delete_visit(
    State(pool): State<PgPool>,
    CurrentAccount(_account): CurrentAccount,
    Path((animal_id, visited_point_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    ensure_positive_id(animal_id, "animalId")?;
    ensure_positive_id(visited_point_id, "visitedPointId")?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let mut animal = crate::sql::animal::get_for_update(&mut tx, animal_id)
        .await?
        .ok_or_else(|| AppError::not_found("animal not found by id"))?;
    let removed = animal.remove_visit(visited_point_id)?;
    crate::sql::visit::delete_many(&mut tx, &removed).await?;
    tx.commit().await.map_err(AppError::from)?;
    Ok(StatusCode::OK)
}

/////////////////////////////////////////////// Router //////////////////////////////////////////////

pub fn create_visit_router(pool: PgPool) -> Router {
    Router::new()
        .route(
            "/animals/:animal_id/locations",
            get(search_visits).put(update_visit),
        )
        .route(
            "/animals/:animal_id/locations/:point_id",
            axum::routing::post(add_visit).delete(delete_visit),
        )
        .with_state(pool)
}
