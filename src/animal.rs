//! The animal aggregate: lifecycle state machine, type membership, and the
//! HTTP surface for chipping, updating, deleting, and searching animals.
//!
//! All list state (`types`, `visits`) is mutated only through methods on
//! [`Animal`] so every write path runs the same invariant checks.

use std::collections::HashSet;
use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{CurrentAccount, OptionalAuth};
use crate::search::{parse_enum_filter, parse_id_filter, Page, TimeRange};
use crate::visit::VisitedLocation;
use crate::{ensure_positive_id, AppError};

/////////////////////////////////////////////// Gender //////////////////////////////////////////////

/// Recorded gender of an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
            Gender::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Gender {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Gender::Male),
            "FEMALE" => Ok(Gender::Female),
            "OTHER" => Ok(Gender::Other),
            _ => Err(AppError::invalid_input(format!(
                "{} is not a recognized gender",
                s
            ))),
        }
    }
}

///////////////////////////////////////////// LifeStatus ////////////////////////////////////////////

/// Life status of an animal. DEAD is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifeStatus {
    Alive,
    Dead,
}

impl LifeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifeStatus::Alive => "ALIVE",
            LifeStatus::Dead => "DEAD",
        }
    }
}

impl std::fmt::Display for LifeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LifeStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALIVE" => Ok(LifeStatus::Alive),
            "DEAD" => Ok(LifeStatus::Dead),
            _ => Err(AppError::invalid_input(format!(
                "{} is not a recognized life status",
                s
            ))),
        }
    }
}

/////////////////////////////////////////////// Animal //////////////////////////////////////////////

/// A chipped animal: physical attributes, life status, references to its
/// chipper and chipping location, the attached type set, and the ordered
/// visit sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Animal {
    pub id: i32,
    pub length: f64,
    pub weight: f64,
    pub height: f64,
    pub gender: Gender,
    pub chipping_at: DateTime<Utc>,
    pub chipper_id: i32,
    pub chipping_location_id: i32,
    pub(crate) life_status: LifeStatus,
    pub(crate) death_at: Option<DateTime<Utc>>,
    pub(crate) types: Vec<i32>,
    pub(crate) visits: Vec<VisitedLocation>,
}

/// Validated parameters for chipping a new animal.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnimal {
    pub types: Vec<i32>,
    pub length: f64,
    pub weight: f64,
    pub height: f64,
    pub gender: Gender,
    pub chipper_id: i32,
    pub chipping_location_id: i32,
}

/// Validated parameters for an animal update. Every field is required on
/// the wire; absence is a validation failure, not "keep the old value".
#[derive(Debug, Clone, PartialEq)]
pub struct AnimalUpdate {
    pub length: f64,
    pub weight: f64,
    pub height: f64,
    pub gender: Gender,
    pub life_status: LifeStatus,
    pub chipper_id: i32,
    pub chipping_location_id: i32,
}

impl Animal {
    /// Chips a new animal: alive, at its chipping location, no visits yet.
    /// Storage assigns the real ID on insert.
    pub fn chip(params: NewAnimal, now: DateTime<Utc>) -> Animal {
        Animal {
            id: 0,
            length: params.length,
            weight: params.weight,
            height: params.height,
            gender: params.gender,
            chipping_at: now,
            chipper_id: params.chipper_id,
            chipping_location_id: params.chipping_location_id,
            life_status: LifeStatus::Alive,
            death_at: None,
            types: params.types,
            visits: Vec::new(),
        }
    }

    pub fn life_status(&self) -> LifeStatus {
        self.life_status
    }

    pub fn death_at(&self) -> Option<DateTime<Utc>> {
        self.death_at
    }

    /// Attached type IDs, in attachment order.
    pub fn types(&self) -> &[i32] {
        &self.types
    }

    /// The visit sequence, ordered by visit timestamp ascending.
    pub fn visits(&self) -> &[VisitedLocation] {
        &self.visits
    }

    /// Applies an update to the aggregate.
    ///
    /// DEAD is terminal: a DEAD animal cannot be set back to ALIVE. The
    /// first transition to DEAD stamps the death timestamp; later DEAD
    /// updates leave it untouched. The chipping location cannot be moved
    /// onto the first recorded visit's point.
    pub fn apply_update(
        &mut self,
        update: &AnimalUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if self.life_status == LifeStatus::Dead && update.life_status == LifeStatus::Alive {
            return Err(AppError::invalid_input("dead animal cannot return to life"));
        }
        if let Some(first) = self.visits.first() {
            if update.chipping_location_id == first.location_id {
                return Err(AppError::invalid_input(
                    "new chipping location collides with first recorded visit",
                ));
            }
        }
        self.length = update.length;
        self.weight = update.weight;
        self.height = update.height;
        self.gender = update.gender;
        self.chipper_id = update.chipper_id;
        self.chipping_location_id = update.chipping_location_id;
        if update.life_status == LifeStatus::Dead && self.death_at.is_none() {
            self.death_at = Some(now);
        }
        self.life_status = update.life_status;
        Ok(())
    }

    /// An animal that has left its chipping point carries history that
    /// record deletion must not discard.
    pub fn ensure_deletable(&self) -> Result<(), AppError> {
        if !self.visits.is_empty() {
            return Err(AppError::invalid_input("animal has left its chipping point"));
        }
        Ok(())
    }

    pub fn has_type(&self, type_id: i32) -> bool {
        self.types.contains(&type_id)
    }

    /// Appends a type to the membership set.
    pub fn attach_type(&mut self, type_id: i32) -> Result<(), AppError> {
        if self.has_type(type_id) {
            return Err(AppError::already_exists("animal already has this type"));
        }
        self.types.push(type_id);
        Ok(())
    }

    /// Substitutes one type for another in place, preserving position.
    pub fn replace_type(&mut self, old_type_id: i32, new_type_id: i32) -> Result<(), AppError> {
        if self.has_type(new_type_id) {
            return Err(AppError::already_exists("animal already has the new type"));
        }
        let pos = self
            .types
            .iter()
            .position(|t| *t == old_type_id)
            .ok_or_else(|| AppError::not_found("animal does not have the old type"))?;
        self.types[pos] = new_type_id;
        Ok(())
    }

    /// Removes a type from the membership set, which must stay non-empty.
    pub fn detach_type(&mut self, type_id: i32) -> Result<(), AppError> {
        if self.types.len() == 1 && self.types[0] == type_id {
            return Err(AppError::invalid_input("animal must keep at least one type"));
        }
        let pos = self
            .types
            .iter()
            .position(|t| *t == type_id)
            .ok_or_else(|| AppError::not_found("animal does not have this type"))?;
        self.types.remove(pos);
        Ok(())
    }
}

/////////////////////////////////////////////// Wire ////////////////////////////////////////////////

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnimalRequest {
    pub animal_types: Option<Vec<i32>>,
    pub length: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub gender: Option<String>,
    pub chipper_id: Option<i32>,
    pub chipping_location_id: Option<i32>,
}

impl CreateAnimalRequest {
    /// Structural validation: presence, positivity, enumeration membership,
    /// and a duplicate-free non-empty type list.
    pub fn validate(&self) -> Result<NewAnimal, AppError> {
        let types = self
            .animal_types
            .as_ref()
            .filter(|types| !types.is_empty())
            .ok_or_else(|| AppError::invalid_input("animalTypes must be a non-empty array"))?;
        if types.iter().any(|t| *t <= 0) {
            return Err(AppError::invalid_input(
                "animalTypes must contain positive ids",
            ));
        }
        let mut seen = HashSet::new();
        if !types.iter().all(|t| seen.insert(*t)) {
            return Err(AppError::invalid_input(
                "animalTypes must not contain duplicates",
            ));
        }
        Ok(NewAnimal {
            types: types.clone(),
            length: positive_measure(self.length, "length")?,
            weight: positive_measure(self.weight, "weight")?,
            height: positive_measure(self.height, "height")?,
            gender: required_enum(self.gender.as_deref(), "gender")?,
            chipper_id: positive_ref(self.chipper_id, "chipperId")?,
            chipping_location_id: positive_ref(self.chipping_location_id, "chippingLocationId")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnimalRequest {
    pub length: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub gender: Option<String>,
    pub life_status: Option<String>,
    pub chipper_id: Option<i32>,
    pub chipping_location_id: Option<i32>,
}

impl UpdateAnimalRequest {
    pub fn validate(&self) -> Result<AnimalUpdate, AppError> {
        Ok(AnimalUpdate {
            length: positive_measure(self.length, "length")?,
            weight: positive_measure(self.weight, "weight")?,
            height: positive_measure(self.height, "height")?,
            gender: required_enum(self.gender.as_deref(), "gender")?,
            life_status: required_enum(self.life_status.as_deref(), "lifeStatus")?,
            chipper_id: positive_ref(self.chipper_id, "chipperId")?,
            chipping_location_id: positive_ref(self.chipping_location_id, "chippingLocationId")?,
        })
    }
}

/// Body of a type replacement.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTypeRequest {
    pub old_type_id: Option<i32>,
    pub new_type_id: Option<i32>,
}

impl ReplaceTypeRequest {
    fn validate(&self) -> Result<(i32, i32), AppError> {
        Ok((
            positive_ref(self.old_type_id, "oldTypeId")?,
            positive_ref(self.new_type_id, "newTypeId")?,
        ))
    }
}

/// Wire shape of an animal. Types and visits are referenced by ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalResponse {
    pub id: i32,
    pub animal_types: Vec<i32>,
    pub length: f64,
    pub weight: f64,
    pub height: f64,
    pub gender: Gender,
    pub life_status: LifeStatus,
    pub chipping_date_time: DateTime<Utc>,
    pub chipper_id: i32,
    pub chipping_location_id: i32,
    pub visited_locations: Vec<i32>,
    pub death_date_time: Option<DateTime<Utc>>,
}

impl From<&Animal> for AnimalResponse {
    fn from(animal: &Animal) -> Self {
        AnimalResponse {
            id: animal.id,
            animal_types: animal.types().to_vec(),
            length: animal.length,
            weight: animal.weight,
            height: animal.height,
            gender: animal.gender,
            life_status: animal.life_status(),
            chipping_date_time: animal.chipping_at,
            chipper_id: animal.chipper_id,
            chipping_location_id: animal.chipping_location_id,
            visited_locations: animal.visits().iter().map(|v| v.id).collect(),
            death_date_time: animal.death_at(),
        }
    }
}

fn positive_measure(value: Option<f64>, field: &str) -> Result<f64, AppError> {
    match value {
        Some(v) if v > 0.0 => Ok(v),
        _ => Err(AppError::invalid_input(format!(
            "{} must be a positive number",
            field
        ))),
    }
}

fn positive_ref(value: Option<i32>, field: &str) -> Result<i32, AppError> {
    match value {
        Some(id) if id > 0 => Ok(id),
        _ => Err(AppError::invalid_input(format!(
            "{} must be a positive id",
            field
        ))),
    }
}

fn required_enum<T: FromStr<Err = AppError>>(
    value: Option<&str>,
    field: &str,
) -> Result<T, AppError> {
    value
        .ok_or_else(|| AppError::invalid_input(format!("{} is required", field)))?
        .parse()
}

////////////////////////////////////////////// Filters //////////////////////////////////////////////

/// Raw animal-search query parameters as they arrive on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalSearchQuery {
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
    pub chipper_id: Option<i32>,
    pub chipping_location_id: Option<i32>,
    pub life_status: Option<String>,
    pub gender: Option<String>,
    pub from: Option<i64>,
    pub size: Option<i64>,
}

/// Normalized animal-search filter. Absent fields never reach the SQL
/// predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimalFilter {
    pub range: TimeRange,
    pub chipper_id: Option<i32>,
    pub chipping_location_id: Option<i32>,
    pub life_status: Option<LifeStatus>,
    pub gender: Option<Gender>,
}

impl AnimalSearchQuery {
    pub fn normalize(&self) -> Result<(AnimalFilter, Page), AppError> {
        let filter = AnimalFilter {
            range: TimeRange::parse(self.start_date_time.as_deref(), self.end_date_time.as_deref())?,
            chipper_id: parse_id_filter(self.chipper_id, "chipperId")?,
            chipping_location_id: parse_id_filter(
                self.chipping_location_id,
                "chippingLocationId",
            )?,
            life_status: parse_enum_filter(self.life_status.as_deref(), "life status")?,
            gender: parse_enum_filter(self.gender.as_deref(), "gender")?,
        };
        let page = Page::new(self.from, self.size)?;
        Ok((filter, page))
    }
}

////////////////////////////////////////////// Handlers /////////////////////////////////////////////

async fn get_animal(
    State(pool): State<PgPool>,
    OptionalAuth(_auth): OptionalAuth,
    Path(animal_id): Path<i32>,
) -> Result<Json<AnimalResponse>, AppError> {
    ensure_positive_id(animal_id, "animalId")?;
    let animal = crate::sql::animal::get(&pool, animal_id)
        .await?
        .ok_or_else(|| AppError::not_found("animal not found by id"))?;
    Ok(Json(AnimalResponse::from(&animal)))
}

async fn search_animals(
    State(pool): State<PgPool>,
    OptionalAuth(_auth): OptionalAuth,
    Query(query): Query<AnimalSearchQuery>,
) -> Result<Json<Vec<AnimalResponse>>, AppError> {
    let (filter, page) = query.normalize()?;
    let animals = crate::sql::animal::search(&pool, &filter, page).await?;
    Ok(Json(animals.iter().map(AnimalResponse::from).collect()))
}

/// Chips a new animal after resolving every reference it carries.
async fn create_animal(
    State(pool): State<PgPool>,
    CurrentAccount(_account): CurrentAccount,
    Json(request): Json<CreateAnimalRequest>,
) -> Result<(StatusCode, Json<AnimalResponse>), AppError> {
    let params = request.validate()?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    if !crate::sql::account::exists(&mut tx, params.chipper_id).await? {
        return Err(AppError::not_found("chipper account not found"));
    }
    if !crate::sql::location::exists(&mut tx, params.chipping_location_id).await? {
        return Err(AppError::not_found("chipping location not found"));
    }
    for type_id in &params.types {
        if !crate::sql::animal_type::exists(&mut tx, *type_id).await? {
            return Err(AppError::not_found("animal type not found"));
        }
    }

    let animal = Animal::chip(params, Utc::now());
    let animal = crate::sql::animal::insert(&mut tx, animal).await?;
    tx.commit().await.map_err(AppError::from)?;
    Ok((StatusCode::CREATED, Json(AnimalResponse::from(&animal))))
}

async fn update_animal(
    State(pool): State<PgPool>,
    CurrentAccount(_account): CurrentAccount,
    Path(animal_id): Path<i32>,
    Json(request): Json<UpdateAnimalRequest>,
) -> Result<Json<AnimalResponse>, AppError> {
    ensure_positive_id(animal_id, "animalId")?;
    let update = request.validate()?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let mut animal = crate::sql::animal::get_for_update(&mut tx, animal_id)
        .await?
        .ok_or_else(|| AppError::not_found("animal not found by id"))?;
    animal.apply_update(&update, Utc::now())?;
    if !crate::sql::account::exists(&mut tx, update.chipper_id).await? {
        return Err(AppError::not_found("chipper account not found"));
    }
    if !crate::sql::location::exists(&mut tx, update.chipping_location_id).await? {
        return Err(AppError::not_found("chipping location not found"));
    }
    crate::sql::animal::update(&mut tx, &animal).await?;
    tx.commit().await.map_err(AppError::from)?;
    Ok(Json(AnimalResponse::from(&animal)))
}

async fn delete_animal(
    State(pool): State<PgPool>,
    CurrentAccount(_account): CurrentAccount,
    Path(animal_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    ensure_positive_id(animal_id, "animalId")?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let animal = crate::sql::animal::get_for_update(&mut tx, animal_id)
        .await?
        .ok_or_else(|| AppError::not_found("animal not found by id"))?;
    animal.ensure_deletable()?;
    crate::sql::animal::delete(&mut tx, animal_id).await?;
    tx.commit().await.map_err(AppError::from)?;
    Ok(StatusCode::OK)
}

async fn attach_type(
    State(pool): State<PgPool>,
    CurrentAccount(_account): CurrentAccount,
    Path((animal_id, type_id)): Path<(i32, i32)>,
) -> Result<(StatusCode, Json<AnimalResponse>), AppError> {
    ensure_positive_id(animal_id, "animalId")?;
    ensure_positive_id(type_id, "typeId")?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let mut animal = crate::sql::animal::get_for_update(&mut tx, animal_id)
        .await?
        .ok_or_else(|| AppError::not_found("animal not found by id"))?;
    if !crate::sql::animal_type::exists(&mut tx, type_id).await? {
        return Err(AppError::not_found("animal type not found"));
    }
    animal.attach_type(type_id)?;
    crate::sql::animal::attach_type(&mut tx, animal_id, type_id).await?;
    tx.commit().await.map_err(AppError::from)?;
    Ok((StatusCode::CREATED, Json(AnimalResponse::from(&animal))))
}

async fn replace_type(
    State(pool): State<PgPool>,
    CurrentAccount(_account): CurrentAccount,
    Path(animal_id): Path<i32>,
    Json(request): Json<ReplaceTypeRequest>,
) -> Result<Json<AnimalResponse>, AppError> {
    ensure_positive_id(animal_id, "animalId")?;
    let (old_type_id, new_type_id) = request.validate()?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let mut animal = crate::sql::animal::get_for_update(&mut tx, animal_id)
        .await?
        .ok_or_else(|| AppError::not_found("animal not found by id"))?;
    if !crate::sql::animal_type::exists(&mut tx, old_type_id).await? {
        return Err(AppError::not_found("old animal type not found"));
    }
    if !crate::sql::animal_type::exists(&mut tx, new_type_id).await? {
        return Err(AppError::not_found("new animal type not found"));
    }
    animal.replace_type(old_type_id, new_type_id)?;
    crate::sql::animal::replace_type(&mut tx, animal_id, old_type_id, new_type_id).await?;
    tx.commit().await.map_err(AppError::from)?;
    Ok(Json(AnimalResponse::from(&animal)))
}

async fn detach_type(
    State(pool): State<PgPool>,
    CurrentAccount(_account): CurrentAccount,
    Path((animal_id, type_id)): Path<(i32, i32)>,
) -> Result<Json<AnimalResponse>, AppError> {
    ensure_positive_id(animal_id, "animalId")?;
    ensure_positive_id(type_id, "typeId")?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let mut animal = crate::sql::animal::get_for_update(&mut tx, animal_id)
        .await?
        .ok_or_else(|| AppError::not_found("animal not found by id"))?;
    animal.detach_type(type_id)?;
    crate::sql::animal::detach_type(&mut tx, animal_id, type_id).await?;
    tx.commit().await.map_err(AppError::from)?;
    Ok(Json(AnimalResponse::from(&animal)))
}

/////////////////////////////////////////////// Router //////////////////////////////////////////////

pub fn create_animal_router(pool: PgPool) -> Router {
    Router::new()
        .route("/animals", post(create_animal))
        .route("/animals/search", get(search_animals))
        .route(
            "/animals/:animal_id",
            get(get_animal).put(update_animal).delete(delete_animal),
        )
        .route(
            "/animals/:animal_id/types/:type_id",
            post(attach_type).delete(detach_type),
        )
        .route("/animals/:animal_id/types", put(replace_type))
        .with_state(pool)
}
