//! Animal aggregate persistence for PostgreSQL database.
//!
//! Mutations load the aggregate through [`get_for_update`], which takes a row
//! lock on the animals row so concurrent writers to one animal serialize for
//! the life of the caller's transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::SqlResult;
use crate::animal::{Animal, AnimalFilter, Gender, LifeStatus};
use crate::search::Page;
use crate::visit::VisitedLocation;
use crate::AppError;

//////////////////////////////////////////////// rows ///////////////////////////////////////////////

#[derive(sqlx::FromRow)]
struct AnimalRow {
    id: i32,
    length: f64,
    weight: f64,
    height: f64,
    gender: String,
    life_status: String,
    chipping_at: DateTime<Utc>,
    chipper_id: i32,
    chipping_location_id: i32,
    death_at: Option<DateTime<Utc>>,
}

impl AnimalRow {
    /// Rehydrates the aggregate. The enum columns are only ever written from
    /// [`Gender`] and [`LifeStatus`], so a parse failure here means the row
    /// was altered outside this crate.
    fn into_animal(self, types: Vec<i32>, visits: Vec<VisitedLocation>) -> SqlResult<Animal> {
        let gender = self.gender.parse::<Gender>().map_err(|_| {
            AppError::Internal(format!(
                "animal {} has unrecognized gender {:?}",
                self.id, self.gender
            ))
        })?;
        let life_status = self.life_status.parse::<LifeStatus>().map_err(|_| {
            AppError::Internal(format!(
                "animal {} has unrecognized life status {:?}",
                self.id, self.life_status
            ))
        })?;
        Ok(Animal {
            id: self.id,
            length: self.length,
            weight: self.weight,
            height: self.height,
            gender,
            chipping_at: self.chipping_at,
            chipper_id: self.chipper_id,
            chipping_location_id: self.chipping_location_id,
            life_status,
            death_at: self.death_at,
            types,
            visits,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VisitRow {
    id: i32,
    animal_id: i32,
    location_id: i32,
    visited_at: DateTime<Utc>,
}

impl From<VisitRow> for VisitedLocation {
    fn from(row: VisitRow) -> Self {
        VisitedLocation {
            id: row.id,
            location_id: row.location_id,
            visited_at: row.visited_at,
        }
    }
}

/// Attached type ids in attachment order. The link table's serial id records
/// that order.
async fn types_for<'e, E: sqlx::PgExecutor<'e>>(executor: E, animal_id: i32) -> SqlResult<Vec<i32>> {
    sqlx::query_scalar::<_, i32>(
        "SELECT type_id FROM animal_type_links WHERE animal_id = $1 ORDER BY id ASC",
    )
    .bind(animal_id)
    .fetch_all(executor)
    .await
    .map_err(|e| {
        eprintln!("Database error fetching animal types: {}", e);
        AppError::from(e)
    })
}

/// The visit sequence ordered by timestamp, with the serial id breaking ties.
async fn visits_for<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    animal_id: i32,
) -> SqlResult<Vec<VisitedLocation>> {
    let rows = sqlx::query_as::<_, VisitRow>(
        r#"
        SELECT id, animal_id, location_id, visited_at
        FROM visited_locations
        WHERE animal_id = $1
        ORDER BY visited_at ASC, id ASC
        "#,
    )
    .bind(animal_id)
    .fetch_all(executor)
    .await
    .map_err(|e| {
        eprintln!("Database error fetching visited locations: {}", e);
        AppError::from(e)
    })?;
    Ok(rows.into_iter().map(VisitedLocation::from).collect())
}

/////////////////////////////////////////////// queries /////////////////////////////////////////////

/// Checks that an animal exists.
pub async fn exists(pool: &PgPool, id: i32) -> SqlResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM animals WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            eprintln!("Database error checking animal existence: {}", e);
            AppError::from(e)
        })
}

/// Fetches the full aggregate by id.
pub async fn get(pool: &PgPool, id: i32) -> SqlResult<Option<Animal>> {
    let row = sqlx::query_as::<_, AnimalRow>(
        r#"
        SELECT id, length, weight, height, gender, life_status,
               chipping_at, chipper_id, chipping_location_id, death_at
        FROM animals
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        eprintln!("Database error fetching animal: {}", e);
        AppError::from(e)
    })?;
    let Some(row) = row else {
        return Ok(None);
    };
    let types = types_for(pool, row.id).await?;
    let visits = visits_for(pool, row.id).await?;
    Ok(Some(row.into_animal(types, visits)?))
}

/// Fetches the full aggregate by id and locks its row for the transaction.
pub async fn get_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: i32,
) -> SqlResult<Option<Animal>> {
    let row = sqlx::query_as::<_, AnimalRow>(
        r#"
        SELECT id, length, weight, height, gender, life_status,
               chipping_at, chipper_id, chipping_location_id, death_at
        FROM animals
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| {
        eprintln!("Database error locking animal: {}", e);
        AppError::from(e)
    })?;
    let Some(row) = row else {
        return Ok(None);
    };
    let types = types_for(&mut **tx, row.id).await?;
    let visits = visits_for(&mut **tx, row.id).await?;
    Ok(Some(row.into_animal(types, visits)?))
}

/// Inserts a freshly chipped animal along with its type links.
///
/// # Returns
/// * `Ok(Animal)` - The aggregate with its assigned id
pub async fn insert(tx: &mut Transaction<'_, Postgres>, mut animal: Animal) -> SqlResult<Animal> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO animals (length, weight, height, gender, life_status,
                             chipping_at, chipper_id, chipping_location_id, death_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(animal.length)
    .bind(animal.weight)
    .bind(animal.height)
    .bind(animal.gender.as_str())
    .bind(animal.life_status().as_str())
    .bind(animal.chipping_at)
    .bind(animal.chipper_id)
    .bind(animal.chipping_location_id)
    .bind(animal.death_at())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
        eprintln!("Database error inserting animal: {}", e);
        AppError::from(e)
    })?;
    animal.id = id;
    for type_id in animal.types().to_vec() {
        attach_type(tx, id, type_id).await?;
    }
    Ok(animal)
}

/// Writes the aggregate's scalar fields back. The chipping timestamp never
/// changes after the initial insert.
pub async fn update(tx: &mut Transaction<'_, Postgres>, animal: &Animal) -> SqlResult<()> {
    sqlx::query(
        r#"
        UPDATE animals
        SET length = $2, weight = $3, height = $4, gender = $5, life_status = $6,
            chipper_id = $7, chipping_location_id = $8, death_at = $9
        WHERE id = $1
        "#,
    )
    .bind(animal.id)
    .bind(animal.length)
    .bind(animal.weight)
    .bind(animal.height)
    .bind(animal.gender.as_str())
    .bind(animal.life_status().as_str())
    .bind(animal.chipper_id)
    .bind(animal.chipping_location_id)
    .bind(animal.death_at())
    .execute(&mut **tx)
    .await
    .map(|_| ())
    .map_err(|e| {
        eprintln!("Database error updating animal: {}", e);
        AppError::from(e)
    })
}

/// Deletes an animal. Type links and visited locations cascade.
pub async fn delete(tx: &mut Transaction<'_, Postgres>, id: i32) -> SqlResult<()> {
    sqlx::query("DELETE FROM animals WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await
        .map(|_| ())
        .map_err(|e| {
            eprintln!("Database error deleting animal: {}", e);
            AppError::from(e)
        })
}

/// Adds a type link at the end of the attachment order.
pub async fn attach_type(
    tx: &mut Transaction<'_, Postgres>,
    animal_id: i32,
    type_id: i32,
) -> SqlResult<()> {
    let result = sqlx::query("INSERT INTO animal_type_links (animal_id, type_id) VALUES ($1, $2)")
        .bind(animal_id)
        .bind(type_id)
        .execute(&mut **tx)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(AppError::Conflict("animal already has this type".to_string()))
        }
        Err(e) => {
            eprintln!("Database error attaching animal type: {}", e);
            Err(AppError::from(e))
        }
    }
}

/// Rewrites one type link in place. The link row keeps its serial id, so the
/// replacement occupies the old type's position in the attachment order.
pub async fn replace_type(
    tx: &mut Transaction<'_, Postgres>,
    animal_id: i32,
    old_type_id: i32,
    new_type_id: i32,
) -> SqlResult<()> {
    let result =
        sqlx::query("UPDATE animal_type_links SET type_id = $3 WHERE animal_id = $1 AND type_id = $2")
            .bind(animal_id)
            .bind(old_type_id)
            .bind(new_type_id)
            .execute(&mut **tx)
            .await;

    match result {
        Ok(result) if result.rows_affected() > 0 => Ok(()),
        Ok(_) => Err(AppError::not_found("animal does not have the old type")),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::Conflict("animal already has the new type".to_string()),
        ),
        Err(e) => {
            eprintln!("Database error replacing animal type: {}", e);
            Err(AppError::from(e))
        }
    }
}

/// Removes a type link.
pub async fn detach_type(
    tx: &mut Transaction<'_, Postgres>,
    animal_id: i32,
    type_id: i32,
) -> SqlResult<()> {
    let result = sqlx::query("DELETE FROM animal_type_links WHERE animal_id = $1 AND type_id = $2")
        .bind(animal_id)
        .bind(type_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            eprintln!("Database error detaching animal type: {}", e);
            AppError::from(e)
        })?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("animal does not have this type"));
    }
    Ok(())
}

/// Searches animals by the normalized filter.
///
/// Results are ordered by id ascending, or by chipping timestamp (id breaking
/// ties) when the filter constrains time.
pub async fn search(pool: &PgPool, filter: &AnimalFilter, page: Page) -> SqlResult<Vec<Animal>> {
    let mut query = sqlx::QueryBuilder::<Postgres>::new(
        "SELECT id, length, weight, height, gender, life_status, \
         chipping_at, chipper_id, chipping_location_id, death_at FROM animals",
    );
    let mut prefix = " WHERE ";
    if let Some(start) = filter.range.start {
        query.push(prefix).push("chipping_at > ");
        query.push_bind(start);
        prefix = " AND ";
    }
    if let Some(end) = filter.range.end {
        query.push(prefix).push("chipping_at < ");
        query.push_bind(end);
        prefix = " AND ";
    }
    if let Some(chipper_id) = filter.chipper_id {
        query.push(prefix).push("chipper_id = ");
        query.push_bind(chipper_id);
        prefix = " AND ";
    }
    if let Some(chipping_location_id) = filter.chipping_location_id {
        query.push(prefix).push("chipping_location_id = ");
        query.push_bind(chipping_location_id);
        prefix = " AND ";
    }
    if let Some(life_status) = filter.life_status {
        query.push(prefix).push("life_status = ");
        query.push_bind(life_status.as_str());
        prefix = " AND ";
    }
    if let Some(gender) = filter.gender {
        query.push(prefix).push("gender = ");
        query.push_bind(gender.as_str());
    }
    if filter.range.is_constrained() {
        query.push(" ORDER BY chipping_at ASC, id ASC");
    } else {
        query.push(" ORDER BY id ASC");
    }
    query.push(" LIMIT ");
    query.push_bind(page.size);
    query.push(" OFFSET ");
    query.push_bind(page.from);

    let rows = query
        .build_query_as::<AnimalRow>()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            eprintln!("Database error searching animals: {}", e);
            AppError::from(e)
        })?;
    hydrate_all(pool, rows).await
}

/// Attaches type and visit lists to a page of rows with two batch queries.
async fn hydrate_all(pool: &PgPool, rows: Vec<AnimalRow>) -> SqlResult<Vec<Animal>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();

    let mut types: HashMap<i32, Vec<i32>> = HashMap::new();
    let link_rows = sqlx::query_as::<_, (i32, i32)>(
        "SELECT animal_id, type_id FROM animal_type_links WHERE animal_id = ANY($1) ORDER BY id ASC",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        eprintln!("Database error fetching animal types: {}", e);
        AppError::from(e)
    })?;
    for (animal_id, type_id) in link_rows {
        types.entry(animal_id).or_default().push(type_id);
    }

    let mut visits: HashMap<i32, Vec<VisitedLocation>> = HashMap::new();
    let visit_rows = sqlx::query_as::<_, VisitRow>(
        r#"
        SELECT id, animal_id, location_id, visited_at
        FROM visited_locations
        WHERE animal_id = ANY($1)
        ORDER BY visited_at ASC, id ASC
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        eprintln!("Database error fetching visited locations: {}", e);
        AppError::from(e)
    })?;
    for row in visit_rows {
        visits
            .entry(row.animal_id)
            .or_default()
            .push(VisitedLocation::from(row));
    }

    let mut animals = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id;
        animals.push(row.into_animal(
            types.remove(&id).unwrap_or_default(),
            visits.remove(&id).unwrap_or_default(),
        )?);
    }
    Ok(animals)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::account::NewAccount;
    use crate::animal::{AnimalUpdate, NewAnimal};
    use crate::search::TimeRange;
    use crate::sql::tests::setup_test_db;

    async fn seed(pool: &PgPool) -> (i32, i32, Vec<i32>) {
        let chipper = crate::sql::account::insert(
            pool,
            &NewAccount {
                first_name: "Field".to_string(),
                last_name: "Tech".to_string(),
                email: "tech@example.com".to_string(),
                password: "secret".to_string(),
            },
        )
        .await
        .unwrap();
        let point = crate::sql::location::insert(pool, 50.0, 60.0).await.unwrap();
        let wolf = crate::sql::animal_type::insert(pool, "wolf").await.unwrap();
        let lynx = crate::sql::animal_type::insert(pool, "lynx").await.unwrap();
        (chipper.id, point.id, vec![wolf.id, lynx.id])
    }

    fn chipped(chipper_id: i32, location_id: i32, types: Vec<i32>) -> Animal {
        Animal::chip(
            NewAnimal {
                types,
                length: 120.0,
                weight: 35.0,
                height: 80.0,
                gender: Gender::Female,
                chipper_id,
                chipping_location_id: location_id,
            },
            Utc::now(),
        )
    }

    async fn insert_committed(pool: &PgPool, animal: Animal) -> Animal {
        let mut tx = pool.begin().await.unwrap();
        let stored = insert(&mut tx, animal).await.unwrap();
        tx.commit().await.unwrap();
        stored
    }

    #[tokio::test]
    async fn insert_get_roundtrip() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let (chipper_id, location_id, types) = seed(&pool).await;
        let stored = insert_committed(&pool, chipped(chipper_id, location_id, types.clone())).await;
        assert!(stored.id > 0);

        let fetched = get(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, stored.id);
        assert_eq!(fetched.types(), &types[..]);
        assert_eq!(fetched.life_status(), LifeStatus::Alive);
        assert_eq!(fetched.chipper_id, chipper_id);
        assert!(fetched.visits().is_empty());
        assert!(fetched.death_at().is_none());

        assert!(exists(&pool, stored.id).await.unwrap());
        assert!(!exists(&pool, stored.id + 1).await.unwrap());
        assert_eq!(get(&pool, stored.id + 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_for_update_returns_the_aggregate() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let (chipper_id, location_id, types) = seed(&pool).await;
        let stored = insert_committed(&pool, chipped(chipper_id, location_id, types.clone())).await;

        let mut tx = pool.begin().await.unwrap();
        let locked = get_for_update(&mut tx, stored.id).await.unwrap().unwrap();
        assert_eq!(locked.id, stored.id);
        assert_eq!(locked.types(), &types[..]);
        assert_eq!(get_for_update(&mut tx, stored.id + 1).await.unwrap(), None);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn update_persists_lifecycle() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let (chipper_id, location_id, types) = seed(&pool).await;
        let stored = insert_committed(&pool, chipped(chipper_id, location_id, types)).await;

        let mut tx = pool.begin().await.unwrap();
        let mut animal = get_for_update(&mut tx, stored.id).await.unwrap().unwrap();
        animal
            .apply_update(
                &AnimalUpdate {
                    length: 121.0,
                    weight: 36.0,
                    height: 81.0,
                    gender: Gender::Male,
                    life_status: LifeStatus::Dead,
                    chipper_id,
                    chipping_location_id: location_id,
                },
                Utc::now(),
            )
            .unwrap();
        update(&mut tx, &animal).await.unwrap();
        tx.commit().await.unwrap();

        let fetched = get(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.life_status(), LifeStatus::Dead);
        assert!(fetched.death_at().is_some());
        assert_eq!(fetched.gender, Gender::Male);
        assert_eq!(fetched.length, 121.0);
    }

    #[tokio::test]
    async fn type_links_keep_attachment_order() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let (chipper_id, location_id, types) = seed(&pool).await;
        let stored = insert_committed(&pool, chipped(chipper_id, location_id, types.clone())).await;
        let bear = crate::sql::animal_type::insert(&pool, "bear").await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        replace_type(&mut tx, stored.id, types[0], bear.id).await.unwrap();
        tx.commit().await.unwrap();
        let fetched = get(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.types(), &[bear.id, types[1]]);

        let mut tx = pool.begin().await.unwrap();
        attach_type(&mut tx, stored.id, types[0]).await.unwrap();
        tx.commit().await.unwrap();
        let fetched = get(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.types(), &[bear.id, types[1], types[0]]);

        let mut tx = pool.begin().await.unwrap();
        let err = attach_type(&mut tx, stored.id, bear.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        tx.rollback().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        detach_type(&mut tx, stored.id, types[1]).await.unwrap();
        let err = detach_type(&mut tx, stored.id, types[1]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn delete_cascades_links() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let (chipper_id, location_id, types) = seed(&pool).await;
        let stored = insert_committed(&pool, chipped(chipper_id, location_id, types.clone())).await;

        let mut tx = pool.begin().await.unwrap();
        delete(&mut tx, stored.id).await.unwrap();
        tx.commit().await.unwrap();

        assert!(!exists(&pool, stored.id).await.unwrap());
        for type_id in types {
            assert!(!crate::sql::animal_type::is_attached(&pool, type_id)
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn search_filters_and_orders() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let (chipper_id, location_id, types) = seed(&pool).await;
        let mut early = chipped(chipper_id, location_id, vec![types[0]]);
        early.chipping_at = "2024-01-01T00:00:00Z".parse().unwrap();
        let early = insert_committed(&pool, early).await;
        let mut late = chipped(chipper_id, location_id, vec![types[1]]);
        late.chipping_at = "2024-06-01T00:00:00Z".parse().unwrap();
        late.gender = Gender::Male;
        let late = insert_committed(&pool, late).await;

        let all = search(&pool, &AnimalFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, early.id);
        assert_eq!(all[0].types(), &[types[0]]);

        let males = search(
            &pool,
            &AnimalFilter {
                gender: Some(Gender::Male),
                ..AnimalFilter::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
        assert_eq!(males.len(), 1);
        assert_eq!(males[0].id, late.id);

        let ranged = search(
            &pool,
            &AnimalFilter {
                range: TimeRange {
                    start: Some("2024-03-01T00:00:00Z".parse().unwrap()),
                    end: None,
                },
                ..AnimalFilter::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].id, late.id);

        let paged = search(
            &pool,
            &AnimalFilter::default(),
            Page { from: 1, size: 10 },
        )
        .await
        .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id, late.id);
    }
}
